//! Bang-suffix priority in task titles.
//!
//! Each trailing `!` on a title adds one to the base priority, up to
//! [`MAX_PRIORITY`]: `"Pay rent!!"` is `("Pay rent", 2)`.

/// Highest user-assigned priority.
pub const MAX_PRIORITY: u8 = 5;

/// Clamp an arbitrary integer into [0, MAX_PRIORITY].
pub fn clamp_priority(value: i64) -> u8 {
    value.clamp(0, i64::from(MAX_PRIORITY)) as u8
}

/// Split trailing `!`s off a title.
///
/// Only the contiguous run at the very end counts; whitespace left before the
/// run is trimmed from the returned title.
pub fn parse_priority(text: &str) -> (String, u8) {
    let text = text.trim();
    if text.is_empty() {
        return (String::new(), 0);
    }

    let title = text.trim_end_matches('!');
    let bangs = text.len() - title.len();

    (title.trim_end().to_string(), clamp_priority(bangs as i64))
}

/// Render a title with its priority as trailing `!`s.
pub fn render_title_with_priority(title: &str, priority: u8) -> String {
    let bangs = priority.min(MAX_PRIORITY) as usize;
    format!("{}{}", title, "!".repeat(bangs))
}
