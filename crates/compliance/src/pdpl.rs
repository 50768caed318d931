//! UAE Personal Data Protection Law (PDPL) checks.

use crate::detect::{
    self, any_key_contains, contains_any, haystack, scan_pii, squash, CONSENT_MARKERS,
    DPO_MARKERS, EXPLICIT_CONSENT_MARKERS, RIGHTS_MARKERS, SENSITIVE_MARKERS,
};
use crate::{control, AuditLevel, CheckContext, ComplianceError, DataResidency, FrameworkChecker};
use qanun_core::report::{CheckStatus, ComplianceCheck, Framework};

/// Personal-data checks across PDPL Articles 3, 4, 6, 10, 14, 16 and 18.
pub struct PdplChecker;

const FW: Framework = Framework::Pdpl;

impl FrameworkChecker for PdplChecker {
    fn framework(&self) -> Framework {
        FW
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Result<Vec<ComplianceCheck>, ComplianceError> {
        Ok(run(ctx))
    }
}

/// Shared with the AI-Ethics privacy principle, which aggregates these
/// results.
pub(crate) fn run(ctx: &CheckContext<'_>) -> Vec<ComplianceCheck> {
    let hay = haystack(ctx.input);
    let squashed = squash(&hay);
    let pii = scan_pii(&hay);
    let full = ctx.config.audit_level == AuditLevel::Full;
    let mut checks = Vec::new();

    // Art. 3: data-subject rights markers. Low severity; full level only.
    if full {
        let status = if pii.is_empty() || contains_any(&squashed, RIGHTS_MARKERS) {
            CheckStatus::Compliant
        } else {
            CheckStatus::ReviewRequired
        };
        checks.push(control(
            FW,
            "Art. 3",
            status,
            (
                "Data subject rights must be supported when personal data is processed.",
                "يجب دعم حقوق أصحاب البيانات عند معالجة البيانات الشخصية.",
            ),
            if pii.is_empty() {
                "no personal data detected".into()
            } else {
                format!("personal data present ({})", join_pii(&pii))
            },
            (
                "Record how access, rectification and erasure requests are handled.",
                "وثّق كيفية التعامل مع طلبات الوصول والتصحيح والمسح.",
            ),
        ));
    }

    // Art. 4: explicit, documented purpose.
    let has_purpose = any_key_contains(ctx.input, &["purpose", "action", "usecase"]);
    checks.push(control(
        FW,
        "Art. 4",
        if has_purpose { CheckStatus::Compliant } else { CheckStatus::ReviewRequired },
        (
            "Processing requires an explicit, documented purpose.",
            "تتطلب المعالجة غرضاً صريحاً وموثقاً.",
        ),
        if has_purpose {
            "purpose indicator found".into()
        } else {
            "no purpose, action or useCase field present".into()
        },
        (
            "Add a purpose, action or useCase field stating why the data is processed.",
            "أضف حقل غرض أو إجراء يوضح سبب معالجة البيانات.",
        ),
    ));

    // Art. 6: consent when personal data is present.
    let consent = contains_any(&squashed, CONSENT_MARKERS);
    let art6_status = if pii.is_empty() || consent {
        CheckStatus::Compliant
    } else {
        CheckStatus::NonCompliant
    };
    checks.push(control(
        FW,
        "Art. 6",
        art6_status,
        (
            "Personal data processing requires the data subject's consent or another lawful basis.",
            "تتطلب معالجة البيانات الشخصية موافقة صاحب البيانات أو أساساً قانونياً آخر.",
        ),
        if pii.is_empty() {
            "no personal data detected".into()
        } else if consent {
            format!("consent marker present for {}", join_pii(&pii))
        } else {
            format!("personal data present ({}) without a consent marker", join_pii(&pii))
        },
        (
            "Capture consent before processing personal data.",
            "احصل على الموافقة قبل معالجة البيانات الشخصية.",
        ),
    ));

    // Art. 10: data minimisation; three or more PII families is excessive.
    checks.push(control(
        FW,
        "Art. 10",
        if pii.len() >= 3 { CheckStatus::ReviewRequired } else { CheckStatus::Compliant },
        (
            "Only the personal data necessary for the stated purpose may be processed.",
            "لا تجوز معالجة سوى البيانات الشخصية اللازمة للغرض المعلن.",
        ),
        format!("{} distinct personal-data patterns detected ({})", pii.len(), join_pii(&pii)),
        (
            "Reduce the personal data in the request to what the purpose requires.",
            "قلّص البيانات الشخصية في الطلب إلى ما يتطلبه الغرض.",
        ),
    ));

    // Art. 14: residency, only binding when configured to the UAE.
    let residency = detect::residency_indicator(ctx.input);
    let art14_status = if ctx.config.data_residency == DataResidency::Uae {
        match &residency {
            Some(value) if !is_uae_region(value) => CheckStatus::NonCompliant,
            _ => CheckStatus::Compliant,
        }
    } else {
        CheckStatus::Compliant
    };
    checks.push(control(
        FW,
        "Art. 14",
        art14_status,
        (
            "Personal data subject to residency rules must remain in the UAE.",
            "يجب أن تبقى البيانات الشخصية الخاضعة لقواعد الإقامة داخل الإمارات.",
        ),
        match (&residency, ctx.config.data_residency) {
            (_, DataResidency::Any) => "no residency constraint configured".into(),
            (Some(v), DataResidency::Uae) => format!("residency indicator '{v}'"),
            (None, DataResidency::Uae) => "no contrary residency indicator".into(),
        },
        (
            "Move storage and processing into a UAE region.",
            "انقل التخزين والمعالجة إلى منطقة داخل الإمارات.",
        ),
    ));

    // Art. 16: special-category data needs explicit separate consent.
    // Emitted only when sensitive markers appear.
    if contains_any(&squashed, SENSITIVE_MARKERS) {
        let explicit = contains_any(&squashed, EXPLICIT_CONSENT_MARKERS);
        checks.push(control(
            FW,
            "Art. 16",
            if explicit { CheckStatus::Compliant } else { CheckStatus::NonCompliant },
            (
                "Sensitive data requires explicit, separate consent.",
                "تتطلب البيانات الحساسة موافقة صريحة ومنفصلة.",
            ),
            if explicit {
                "sensitive markers with explicit consent".into()
            } else {
                "sensitive markers present without explicit separate consent".into()
            },
            (
                "Obtain explicit separate consent for sensitive data categories.",
                "احصل على موافقة صريحة ومنفصلة لفئات البيانات الحساسة.",
            ),
        ));
    }

    // Art. 18: breach notification / DPO contact. Full level only.
    if full {
        let dpo = contains_any(&squashed, DPO_MARKERS);
        checks.push(control(
            FW,
            "Art. 18",
            if dpo { CheckStatus::Compliant } else { CheckStatus::ReviewRequired },
            (
                "A breach-notification path or DPO contact must be identified.",
                "يجب تحديد مسار للإبلاغ عن الاختراقات أو جهة اتصال مسؤول حماية البيانات.",
            ),
            if dpo { "breach/DPO marker present".into() } else { "no breach/DPO marker".into() },
            (
                "Reference the DPO contact or breach-notification procedure.",
                "أشر إلى جهة اتصال مسؤول حماية البيانات أو إجراء الإبلاغ عن الاختراق.",
            ),
        ));
    }

    checks
}

fn join_pii(pii: &[detect::PiiType]) -> String {
    if pii.is_empty() {
        return "none".into();
    }
    pii.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

fn is_uae_region(value: &str) -> bool {
    let v = value.trim();
    v == "ae" || ["uae", "dubai", "abu dhabi", "abudhabi", "sharjah"].iter().any(|h| v.contains(h))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ComplianceConfig;
    use qanun_core::types::Decision;
    use serde_json::json;

    fn ctx_config() -> ComplianceConfig {
        ComplianceConfig { frameworks: vec![Framework::Pdpl], ..ComplianceConfig::default() }
    }

    fn run_on(input: serde_json::Value, config: &ComplianceConfig) -> Vec<ComplianceCheck> {
        let decision = Decision::no_match();
        let ctx = CheckContext { input: &input, decision: &decision, entry: None, config };
        run(&ctx)
    }

    fn by_article<'a>(checks: &'a [ComplianceCheck], article: &str) -> &'a ComplianceCheck {
        checks.iter().find(|c| c.article == article).expect("article missing")
    }

    #[test]
    fn sensitive_data_with_consent_passes_art16() {
        let config = ctx_config();
        let checks = run_on(
            json!({"healthRecord": "diabetes", "sensitiveDataConsent": true, "purpose": "care"}),
            &config,
        );
        let art16 = by_article(&checks, "Art. 16");
        assert!(art16.passed);
        assert_eq!(art16.status, CheckStatus::Compliant);
        assert!(art16.remediation.is_none());
    }

    #[test]
    fn sensitive_data_without_consent_fails_art16() {
        let config = ctx_config();
        let checks = run_on(json!({"healthRecord": "diabetes", "purpose": "care"}), &config);
        let art16 = by_article(&checks, "Art. 16");
        assert_eq!(art16.status, CheckStatus::NonCompliant);
        assert!(!art16.passed);
        assert!(art16.remediation.is_some());
        assert!(art16.remediation_ar.is_some());
    }

    #[test]
    fn art16_absent_without_sensitive_markers() {
        let config = ctx_config();
        let checks = run_on(json!({"purpose": "kyc", "amount": 5}), &config);
        assert!(checks.iter().all(|c| c.article != "Art. 16"));
    }

    #[test]
    fn pii_without_consent_fails_art6() {
        let config = ctx_config();
        let checks = run_on(json!({"email": "a@b.ae", "purpose": "kyc"}), &config);
        assert_eq!(by_article(&checks, "Art. 6").status, CheckStatus::NonCompliant);

        let checks = run_on(
            json!({"email": "a@b.ae", "purpose": "kyc", "consentGiven": true}),
            &config,
        );
        assert_eq!(by_article(&checks, "Art. 6").status, CheckStatus::Compliant);
    }

    #[test]
    fn minimisation_flags_three_pii_families() {
        let config = ctx_config();
        let checks = run_on(
            json!({
                "email": "a@b.ae",
                "eid": "784-1990-1234567-1",
                "phone": "+971501234567",
                "purpose": "kyc",
            }),
            &config,
        );
        assert_eq!(by_article(&checks, "Art. 10").status, CheckStatus::ReviewRequired);
    }

    #[test]
    fn missing_purpose_flags_art4() {
        let config = ctx_config();
        let checks = run_on(json!({"amount": 10}), &config);
        assert_eq!(by_article(&checks, "Art. 4").status, CheckStatus::ReviewRequired);
    }

    #[test]
    fn residency_enforced_only_when_configured() {
        let mut config = ctx_config();
        let input = json!({"purpose": "kyc", "dataResidency": "eu-west-1"});
        assert_eq!(by_article(&run_on(input.clone(), &config), "Art. 14").status, CheckStatus::Compliant);

        config.data_residency = DataResidency::Uae;
        assert_eq!(by_article(&run_on(input, &config), "Art. 14").status, CheckStatus::NonCompliant);
        let local = json!({"purpose": "kyc", "dataResidency": "uae-north"});
        assert_eq!(by_article(&run_on(local, &config), "Art. 14").status, CheckStatus::Compliant);
    }

    #[test]
    fn basic_level_omits_low_severity_articles() {
        let mut config = ctx_config();
        config.audit_level = AuditLevel::Basic;
        let checks = run_on(json!({"purpose": "kyc"}), &config);
        assert!(checks.iter().all(|c| c.article != "Art. 3" && c.article != "Art. 18"));
        // Full level emits them.
        config.audit_level = AuditLevel::Full;
        let checks = run_on(json!({"purpose": "kyc"}), &config);
        assert!(checks.iter().any(|c| c.article == "Art. 3"));
        assert!(checks.iter().any(|c| c.article == "Art. 18"));
    }
}
