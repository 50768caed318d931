//! Compliance report shapes: framework tags, per-control checks and the
//! aggregate bilingual report embedded into decisions and audit entries.

use crate::canon;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;

/// Jurisdictional rule families a checker can cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Framework {
    Pdpl,
    UaeAiEthics,
    Nesa,
    DubaiAiLaw,
    Adgm,
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Framework::Pdpl => "PDPL",
            Framework::UaeAiEthics => "UAE_AI_ETHICS",
            Framework::Nesa => "NESA",
            Framework::DubaiAiLaw => "DUBAI_AI_LAW",
            Framework::Adgm => "ADGM",
        };
        f.write_str(s)
    }
}

/// Status of a single control check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckStatus {
    Compliant,
    NonCompliant,
    ReviewRequired,
}

/// One bilingual framework control result. `passed` holds exactly when the
/// status is COMPLIANT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceCheck {
    pub framework: Framework,
    /// Control identifier, e.g. `"Art. 6"` or `"AC-01"`.
    pub article: String,
    pub status: CheckStatus,
    pub requirement: String,
    pub requirement_ar: String,
    pub passed: bool,
    /// Evidence for the status.
    pub details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation_ar: Option<String>,
}

/// Aggregate of all checks produced for one decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceReport {
    pub report_id: String,
    pub timestamp: String,
    pub overall_status: CheckStatus,
    pub frameworks: Vec<Framework>,
    pub checks: Vec<ComplianceCheck>,
    /// Percentage of passed checks, rounded half-up; 100 when empty.
    pub score: u8,
    pub summary: String,
    pub summary_ar: String,
    pub audit_hash: String,
}

/// Derive the aggregate status: any NON_COMPLIANT wins, then any
/// REVIEW_REQUIRED, else COMPLIANT.
#[must_use]
pub fn overall_status(checks: &[ComplianceCheck]) -> CheckStatus {
    if checks.iter().any(|c| c.status == CheckStatus::NonCompliant) {
        CheckStatus::NonCompliant
    } else if checks.iter().any(|c| c.status == CheckStatus::ReviewRequired) {
        CheckStatus::ReviewRequired
    } else {
        CheckStatus::Compliant
    }
}

/// Percentage of passed checks, rounded half-up; 100 when there are none.
#[must_use]
pub fn report_score(checks: &[ComplianceCheck]) -> u8 {
    if checks.is_empty() {
        return 100;
    }
    let passed = checks.iter().filter(|c| c.passed).count();
    let pct = (100.0 * passed as f64 / checks.len() as f64).round();
    pct as u8
}

/// The tamper-evidence hash over the report identity, timestamp, checks and
/// framework list, in canonical form.
#[must_use]
pub fn report_audit_hash(
    report_id: &str,
    timestamp: &str,
    checks: &[ComplianceCheck],
    frameworks: &[Framework],
) -> String {
    let image = json!({
        "reportId": report_id,
        "timestamp": timestamp,
        "checks": checks,
        "frameworks": frameworks,
    });
    canon::sha256_hex(canon::canonical_json(&image).as_bytes())
}
