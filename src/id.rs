//! ID generation utilities for taskpulse
//!
//! Job IDs are caller-generated; these helpers produce the canonical form.

use uuid::Uuid;

/// Generate a unique job ID
///
/// Format: hyphenated lowercase UUID v4
/// Example: `6f1c2a9e-3b1d-4c8e-9a57-0d4b2f1e7c3a`
pub fn generate_job_id() -> String {
    Uuid::new_v4().to_string()
}
