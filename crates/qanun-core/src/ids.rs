//! ID and timestamp utilities: audit/report ids and ISO-8601 stamps.

use chrono::{SecondsFormat, Utc};
use uuid::Uuid;

/// Generate a fresh audit identifier (UUID v4, `aud-` prefix).
pub fn new_audit_id() -> String {
    format!("aud-{}", Uuid::new_v4())
}

/// Generate a fresh compliance report identifier (UUID v4, `rpt-` prefix).
pub fn new_report_id() -> String {
    format!("rpt-{}", Uuid::new_v4())
}

/// Current UTC time as ISO-8601 with millisecond precision, e.g.
/// `2026-08-01T09:15:42.123Z`. Timestamps in this form compare
/// chronologically as plain strings.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
