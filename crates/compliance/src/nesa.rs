//! NESA (UAE national cybersecurity) controls over the audit entry and the
//! data it carries.

use crate::detect::{
    contains_any, haystack, scan_pii, squash, ACCESS_MARKERS, ENCRYPTION_MARKERS, SECRET_MARKERS,
};
use crate::{control, CheckContext, ComplianceError, FrameworkChecker};
use qanun_core::canon::is_hex_sha256;
use qanun_core::report::{CheckStatus, ComplianceCheck, Framework};
use qanun_core::types::Action;
use serde_json::Value;

/// Five controls: audit integrity, incident classification, data
/// classification, access control and cryptography.
pub struct NesaChecker;

const FW: Framework = Framework::Nesa;

impl FrameworkChecker for NesaChecker {
    fn framework(&self) -> Framework {
        FW
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Result<Vec<ComplianceCheck>, ComplianceError> {
        let hay = haystack(ctx.input);
        let squashed = squash(&hay);
        let mut checks = Vec::new();

        // AU-01: audit integrity; both chain hashes present and well-formed.
        let (au_status, au_details) = match ctx.entry {
            Some(entry) => {
                if is_hex_sha256(&entry.hash) && is_hex_sha256(&entry.previous_hash) {
                    (CheckStatus::Compliant, "hash chain fields well-formed".to_string())
                } else {
                    (CheckStatus::NonCompliant, "malformed hash chain fields".to_string())
                }
            }
            None => (CheckStatus::ReviewRequired, "no audit entry available".to_string()),
        };
        checks.push(control(
            FW,
            "AU-01",
            au_status,
            (
                "Every decision must be anchored in the tamper-evident audit chain.",
                "يجب أن يُرسى كل قرار في سلسلة التدقيق المانعة للعبث.",
            ),
            au_details,
            (
                "Persist the decision through the audit log before acting on it.",
                "سجّل القرار في سجل التدقيق قبل التصرف بناءً عليه.",
            ),
        ));

        // IR-02: incident classification derived from the decision.
        let score = ctx.decision.score;
        let (level, ir_status) = if ctx.decision.result == Action::Rejected && score <= 20 {
            ("CRITICAL", CheckStatus::ReviewRequired)
        } else if ctx.decision.result == Action::Rejected || score < 40 {
            ("HIGH", CheckStatus::ReviewRequired)
        } else if ctx.decision.result == Action::Review || score < 70 {
            ("MEDIUM", CheckStatus::Compliant)
        } else {
            ("LOW", CheckStatus::Compliant)
        };
        checks.push(control(
            FW,
            "IR-02",
            ir_status,
            (
                "Adverse decisions must be classified for incident response.",
                "يجب تصنيف القرارات السلبية لأغراض الاستجابة للحوادث.",
            ),
            format!("incident level {level} (result {}, score {score})", ctx.decision.result),
            (
                "Open an incident ticket for HIGH and CRITICAL classifications.",
                "افتح تذكرة حادث للتصنيفين المرتفع والحرج.",
            ),
        ));

        // DS-01: data classification of the input.
        let secrets = contains_any(&squashed, SECRET_MARKERS);
        let pii = !scan_pii(&hay).is_empty();
        let data_class = if secrets {
            "SECRET"
        } else if pii {
            "CONFIDENTIAL"
        } else if is_non_empty(ctx.input) {
            "INTERNAL"
        } else {
            "PUBLIC"
        };
        checks.push(control(
            FW,
            "DS-01",
            CheckStatus::Compliant,
            (
                "Input data must carry a classification level.",
                "يجب أن تحمل بيانات الإدخال مستوى تصنيف.",
            ),
            format!("data classified as {data_class}"),
            ("", ""),
        ));

        // AC-01: access control marker.
        let access = contains_any(&squashed, ACCESS_MARKERS);
        checks.push(control(
            FW,
            "AC-01",
            if access { CheckStatus::Compliant } else { CheckStatus::ReviewRequired },
            (
                "Requests must identify the authenticated actor or role.",
                "يجب أن تحدد الطلبات الجهة أو الدور الموثق.",
            ),
            if access { "role/auth marker present".into() } else { "no role/auth marker".into() },
            (
                "Include the caller's role or authentication context.",
                "ضمّن دور المستدعي أو سياق المصادقة.",
            ),
        ));

        // CR-01: cryptography for CONFIDENTIAL and SECRET data.
        let needs_encryption = data_class == "CONFIDENTIAL" || data_class == "SECRET";
        let encrypted = contains_any(&squashed, ENCRYPTION_MARKERS);
        let cr_status = if !needs_encryption || encrypted {
            CheckStatus::Compliant
        } else {
            CheckStatus::NonCompliant
        };
        checks.push(control(
            FW,
            "CR-01",
            cr_status,
            (
                "Confidential and secret data must be encrypted.",
                "يجب تشفير البيانات السرية وذات الخصوصية.",
            ),
            if needs_encryption {
                format!(
                    "{data_class} data, encryption marker {}",
                    if encrypted { "present" } else { "absent" }
                )
            } else {
                format!("no encryption requirement for {data_class} data")
            },
            (
                "Encrypt the payload or reference the key-management envelope.",
                "شفّر الحمولة أو أشر إلى غلاف إدارة المفاتيح.",
            ),
        ));

        Ok(checks)
    }
}

fn is_non_empty(input: &Value) -> bool {
    match input {
        Value::Null => false,
        Value::Object(m) => !m.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ComplianceConfig;
    use audit_log::AuditLog;
    use qanun_core::types::{Decision, Rule};
    use serde_json::json;

    fn rejected(score: u8) -> Decision {
        let rule = Rule {
            id: "R1".into(),
            name: "block".into(),
            condition: "risk > 0.8".into(),
            action: Action::Rejected,
            reason: "too risky".into(),
            priority: 1,
            score: Some(score),
        };
        Decision::from_rule(&rule)
    }

    fn run_nesa(input: serde_json::Value, decision: &Decision, with_entry: bool) -> Vec<ComplianceCheck> {
        let config = ComplianceConfig::default();
        if with_entry {
            let dir = tempfile::tempdir().unwrap();
            let log = AuditLog::open(dir.path().join("a.jsonl")).unwrap();
            let entry = log.append(decision, &input);
            let ctx =
                CheckContext { input: &input, decision, entry: Some(&entry), config: &config };
            NesaChecker.check(&ctx).unwrap()
        } else {
            let ctx = CheckContext { input: &input, decision, entry: None, config: &config };
            NesaChecker.check(&ctx).unwrap()
        }
    }

    fn by_article<'a>(checks: &'a [ComplianceCheck], article: &str) -> &'a ComplianceCheck {
        checks.iter().find(|c| c.article == article).expect("article missing")
    }

    #[test]
    fn audit_integrity_passes_with_real_entry() {
        let checks = run_nesa(json!({"role": "analyst"}), &Decision::no_match(), true);
        let au = by_article(&checks, "AU-01");
        assert_eq!(au.status, CheckStatus::Compliant);
        assert!(au.passed);
    }

    #[test]
    fn missing_entry_requires_review() {
        let checks = run_nesa(json!({}), &Decision::no_match(), false);
        assert_eq!(by_article(&checks, "AU-01").status, CheckStatus::ReviewRequired);
    }

    #[test]
    fn incident_levels_follow_decision() {
        let checks = run_nesa(json!({}), &rejected(10), false);
        assert!(by_article(&checks, "IR-02").details.contains("CRITICAL"));

        let checks = run_nesa(json!({}), &rejected(35), false);
        assert!(by_article(&checks, "IR-02").details.contains("HIGH"));

        let checks = run_nesa(json!({}), &Decision::no_match(), false);
        assert!(by_article(&checks, "IR-02").details.contains("MEDIUM"));

        let mut approved = Decision::no_match();
        approved.result = Action::Approved;
        approved.score = 85;
        let checks = run_nesa(json!({}), &approved, false);
        assert!(by_article(&checks, "IR-02").details.contains("LOW"));
    }

    #[test]
    fn data_classification_tiers() {
        let checks = run_nesa(json!({"password": "hunter2"}), &Decision::no_match(), false);
        assert!(by_article(&checks, "DS-01").details.contains("SECRET"));

        let checks = run_nesa(json!({"email": "a@b.ae"}), &Decision::no_match(), false);
        assert!(by_article(&checks, "DS-01").details.contains("CONFIDENTIAL"));

        let checks = run_nesa(json!({"amount": 4}), &Decision::no_match(), false);
        assert!(by_article(&checks, "DS-01").details.contains("INTERNAL"));

        let checks = run_nesa(json!({}), &Decision::no_match(), false);
        assert!(by_article(&checks, "DS-01").details.contains("PUBLIC"));
    }

    #[test]
    fn confidential_data_requires_encryption_marker() {
        let checks = run_nesa(json!({"email": "a@b.ae"}), &Decision::no_match(), false);
        assert_eq!(by_article(&checks, "CR-01").status, CheckStatus::NonCompliant);

        let checks =
            run_nesa(json!({"email": "a@b.ae", "encrypted": true}), &Decision::no_match(), false);
        assert_eq!(by_article(&checks, "CR-01").status, CheckStatus::Compliant);

        let checks = run_nesa(json!({"amount": 4}), &Decision::no_match(), false);
        assert_eq!(by_article(&checks, "CR-01").status, CheckStatus::Compliant);
    }

    #[test]
    fn access_marker_satisfies_ac01() {
        let checks = run_nesa(json!({"role": "analyst"}), &Decision::no_match(), false);
        assert_eq!(by_article(&checks, "AC-01").status, CheckStatus::Compliant);

        let checks = run_nesa(json!({"amount": 4}), &Decision::no_match(), false);
        assert_eq!(by_article(&checks, "AC-01").status, CheckStatus::ReviewRequired);
    }
}
