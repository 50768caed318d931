//! UAE AI Ethics principles: inclusiveness, reliability, transparency,
//! security, accountability and privacy.

use crate::detect::{
    contains_any, haystack, squash, BIAS_MARKERS, EXPLANATION_MARKERS, OVERSIGHT_MARKERS,
    SECRET_MARKERS,
};
use crate::{control, pdpl, CheckContext, ComplianceError, FrameworkChecker};
use qanun_core::report::{CheckStatus, ComplianceCheck, Framework};
use qanun_core::types::Action;

/// Six-principle ethics review of one decision.
pub struct AiEthicsChecker;

const FW: Framework = Framework::UaeAiEthics;

/// Minimum confidence for a reliable automated decision.
const RELIABILITY_THRESHOLD: f64 = 0.60;
/// Below this confidence even approvals need a named human overseer.
const OVERSIGHT_THRESHOLD: f64 = 0.75;

impl FrameworkChecker for AiEthicsChecker {
    fn framework(&self) -> Framework {
        FW
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Result<Vec<ComplianceCheck>, ComplianceError> {
        let hay = haystack(ctx.input);
        let squashed = squash(&hay);
        let confidence = ctx.decision.effective_confidence();
        let mut checks = Vec::new();

        // Principle 1: inclusiveness.
        let biased = contains_any(&squashed, BIAS_MARKERS);
        checks.push(control(
            FW,
            "Principle 1",
            if biased { CheckStatus::ReviewRequired } else { CheckStatus::Compliant },
            (
                "Decisions must not discriminate on demographic attributes.",
                "يجب ألا تميز القرارات على أساس الخصائص الديموغرافية.",
            ),
            if biased {
                "bias-sensitive demographic tokens present in input".into()
            } else {
                "no bias-sensitive tokens detected".into()
            },
            (
                "Review whether demographic attributes influence the outcome.",
                "راجع ما إذا كانت الخصائص الديموغرافية تؤثر في النتيجة.",
            ),
        ));

        // Principle 2: reliability.
        let reliable = confidence >= RELIABILITY_THRESHOLD;
        checks.push(control(
            FW,
            "Principle 2",
            if reliable { CheckStatus::Compliant } else { CheckStatus::ReviewRequired },
            (
                "Automated decisions must meet a minimum confidence level.",
                "يجب أن تحقق القرارات الآلية حداً أدنى من الثقة.",
            ),
            format!("decision confidence {confidence:.2} (threshold {RELIABILITY_THRESHOLD:.2})"),
            (
                "Route low-confidence decisions to manual review.",
                "حوّل القرارات منخفضة الثقة إلى المراجعة اليدوية.",
            ),
        ));

        // Principle 3: transparency.
        let explainable = !ctx.decision.audit_id.is_empty()
            && (contains_any(&squashed, EXPLANATION_MARKERS) || ctx.decision.reason.len() > 10);
        checks.push(control(
            FW,
            "Principle 3",
            if explainable { CheckStatus::Compliant } else { CheckStatus::ReviewRequired },
            (
                "Decisions must be auditable and explainable.",
                "يجب أن تكون القرارات قابلة للتدقيق والتفسير.",
            ),
            if explainable {
                "audit id and explanation present".into()
            } else {
                "missing audit id or a substantive explanation".into()
            },
            (
                "Attach a reason of substance to every decision.",
                "أرفق سبباً وافياً بكل قرار.",
            ),
        ));

        // Principle 4: security.
        let leaked = contains_any(&squashed, SECRET_MARKERS);
        checks.push(control(
            FW,
            "Principle 4",
            if leaked { CheckStatus::NonCompliant } else { CheckStatus::Compliant },
            (
                "Inputs must not carry credentials or key material.",
                "يجب ألا تحمل المدخلات بيانات اعتماد أو مواد مفاتيح.",
            ),
            if leaked {
                "credential-like tokens detected in input".into()
            } else {
                "no credential-like tokens detected".into()
            },
            (
                "Strip secrets from the request and rotate any exposed credentials.",
                "أزل الأسرار من الطلب وبدّل أي بيانات اعتماد مكشوفة.",
            ),
        ));

        // Principle 5: accountability.
        let needs_oversight =
            ctx.decision.result != Action::Approved || confidence < OVERSIGHT_THRESHOLD;
        let overseen = !needs_oversight || contains_any(&squashed, OVERSIGHT_MARKERS);
        checks.push(control(
            FW,
            "Principle 5",
            if overseen { CheckStatus::Compliant } else { CheckStatus::ReviewRequired },
            (
                "Non-approved or low-confidence outcomes need named human oversight.",
                "تتطلب النتائج غير المعتمدة أو منخفضة الثقة إشرافاً بشرياً محدداً.",
            ),
            format!(
                "result {}, confidence {confidence:.2}, oversight marker {}",
                ctx.decision.result,
                if contains_any(&squashed, OVERSIGHT_MARKERS) { "present" } else { "absent" }
            ),
            (
                "Name a human overseer for this class of decision.",
                "عيّن مشرفاً بشرياً لهذه الفئة من القرارات.",
            ),
        ));

        // Principle 6: privacy, aggregated from the PDPL checks.
        let pdpl_checks = pdpl::run(ctx);
        let passed = pdpl_checks.iter().filter(|c| c.passed).count();
        let private = passed == pdpl_checks.len();
        let status = if private {
            CheckStatus::Compliant
        } else if pdpl_checks.iter().any(|c| c.status == CheckStatus::NonCompliant) {
            CheckStatus::NonCompliant
        } else {
            CheckStatus::ReviewRequired
        };
        checks.push(control(
            FW,
            "Principle 6",
            status,
            (
                "Personal data handling must satisfy the PDPL controls.",
                "يجب أن تستوفي معالجة البيانات الشخصية ضوابط قانون حماية البيانات.",
            ),
            format!("PDPL sub-checks passed {passed}/{}", pdpl_checks.len()),
            (
                "Resolve the failing PDPL checks.",
                "عالج فحوص قانون حماية البيانات غير المستوفاة.",
            ),
        ));

        Ok(checks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ComplianceConfig;
    use qanun_core::types::{Decision, Rule};
    use serde_json::json;

    fn approved_decision(score: u8) -> Decision {
        let rule = Rule {
            id: "R1".into(),
            name: "approve".into(),
            condition: "x > 0".into(),
            action: Action::Approved,
            reason: "well within configured limits".into(),
            priority: 1,
            score: Some(score),
        };
        Decision::from_rule(&rule)
    }

    fn run_ethics(input: serde_json::Value, decision: &Decision) -> Vec<ComplianceCheck> {
        let config = ComplianceConfig::default();
        let ctx = CheckContext { input: &input, decision, entry: None, config: &config };
        AiEthicsChecker.check(&ctx).unwrap()
    }

    fn by_article<'a>(checks: &'a [ComplianceCheck], article: &str) -> &'a ComplianceCheck {
        checks.iter().find(|c| c.article == article).expect("article missing")
    }

    #[test]
    fn reliability_uses_score_when_no_confidence() {
        let d = approved_decision(55); // 0.55 < 0.60
        let checks = run_ethics(json!({"purpose": "kyc"}), &d);
        assert_eq!(by_article(&checks, "Principle 2").status, CheckStatus::ReviewRequired);

        let d = approved_decision(80);
        let checks = run_ethics(json!({"purpose": "kyc"}), &d);
        assert_eq!(by_article(&checks, "Principle 2").status, CheckStatus::Compliant);
    }

    #[test]
    fn explicit_confidence_overrides_score() {
        let mut d = approved_decision(90);
        d.confidence = Some(0.2);
        let checks = run_ethics(json!({"purpose": "kyc"}), &d);
        assert_eq!(by_article(&checks, "Principle 2").status, CheckStatus::ReviewRequired);
    }

    #[test]
    fn secrets_fail_security() {
        let d = approved_decision(90);
        let checks = run_ethics(json!({"api_key": "sk-123", "purpose": "kyc"}), &d);
        let p4 = by_article(&checks, "Principle 4");
        assert_eq!(p4.status, CheckStatus::NonCompliant);
        assert!(!p4.passed);
    }

    #[test]
    fn bias_tokens_require_review() {
        let d = approved_decision(90);
        let checks = run_ethics(json!({"gender": "f", "purpose": "hiring"}), &d);
        assert_eq!(by_article(&checks, "Principle 1").status, CheckStatus::ReviewRequired);
    }

    #[test]
    fn rejected_without_oversight_flagged() {
        let mut d = approved_decision(90);
        d.result = Action::Rejected;
        let checks = run_ethics(json!({"purpose": "kyc"}), &d);
        assert_eq!(by_article(&checks, "Principle 5").status, CheckStatus::ReviewRequired);

        let checks = run_ethics(json!({"purpose": "kyc", "humanOversight": "fatima"}), &d);
        assert_eq!(by_article(&checks, "Principle 5").status, CheckStatus::Compliant);
    }

    #[test]
    fn high_confidence_approval_needs_no_overseer() {
        let d = approved_decision(90);
        let checks = run_ethics(json!({"purpose": "kyc"}), &d);
        assert_eq!(by_article(&checks, "Principle 5").status, CheckStatus::Compliant);
    }

    #[test]
    fn transparency_accepts_long_reason() {
        let d = approved_decision(90); // reason is > 10 chars
        let checks = run_ethics(json!({"purpose": "kyc"}), &d);
        assert_eq!(by_article(&checks, "Principle 3").status, CheckStatus::Compliant);

        let mut terse = approved_decision(90);
        terse.reason = "ok".into();
        let checks = run_ethics(json!({"purpose": "kyc"}), &terse);
        assert_eq!(by_article(&checks, "Principle 3").status, CheckStatus::ReviewRequired);
    }

    #[test]
    fn privacy_mirrors_pdpl_outcome() {
        let d = approved_decision(90);
        let clean = run_ethics(json!({"purpose": "kyc", "dpoContact": "x", "dataSubjectRights": true}), &d);
        assert_eq!(by_article(&clean, "Principle 6").status, CheckStatus::Compliant);

        let dirty = run_ethics(json!({"email": "a@b.ae", "purpose": "kyc"}), &d);
        assert_eq!(by_article(&dirty, "Principle 6").status, CheckStatus::NonCompliant);
    }
}
