//! Dubai AI Law articles: prohibited uses, registration, disclosure, human
//! oversight and data governance.

use crate::detect::{
    contains_any, haystack, squash, DISCLOSURE_MARKERS, GOVERNANCE_MARKERS, HIGH_RISK_MARKERS,
    OVERSIGHT_MARKERS, PROHIBITED_USE_MARKERS, REGISTRATION_MARKERS,
};
use crate::{control, CheckContext, ComplianceError, FrameworkChecker};
use qanun_core::report::{CheckStatus, ComplianceCheck, Framework};

/// Article checks for AI systems operating in the Emirate of Dubai.
pub struct DubaiAiLawChecker;

const FW: Framework = Framework::DubaiAiLaw;

impl FrameworkChecker for DubaiAiLawChecker {
    fn framework(&self) -> Framework {
        FW
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Result<Vec<ComplianceCheck>, ComplianceError> {
        let hay = haystack(ctx.input);
        let squashed = squash(&hay);
        let high_risk = contains_any(&squashed, HIGH_RISK_MARKERS);
        let mut checks = Vec::new();

        // Art. 3: prohibited uses.
        let prohibited = PROHIBITED_USE_MARKERS.iter().find(|m| squashed.contains(*m));
        checks.push(control(
            FW,
            "Art. 3",
            if prohibited.is_some() { CheckStatus::NonCompliant } else { CheckStatus::Compliant },
            (
                "AI must not be used for prohibited purposes such as deepfakes, social scoring or mass surveillance.",
                "يجب ألا يُستخدم الذكاء الاصطناعي لأغراض محظورة كالتزييف العميق أو التقييم الاجتماعي أو المراقبة الجماعية.",
            ),
            prohibited.map_or_else(
                || "no prohibited-use tokens detected".to_string(),
                |m| format!("prohibited-use token '{m}' detected"),
            ),
            (
                "Remove the prohibited use case from scope.",
                "أزل حالة الاستخدام المحظورة من النطاق.",
            ),
        ));

        // Art. 5: registration for high-risk systems.
        let registered = contains_any(&squashed, REGISTRATION_MARKERS);
        let art5_status = if high_risk && !registered {
            CheckStatus::ReviewRequired
        } else {
            CheckStatus::Compliant
        };
        checks.push(control(
            FW,
            "Art. 5",
            art5_status,
            (
                "High-risk AI systems must be registered with a conformity identifier.",
                "يجب تسجيل أنظمة الذكاء الاصطناعي عالية المخاطر بمعرّف مطابقة.",
            ),
            format!(
                "high-risk category {}, registration marker {}",
                if high_risk { "present" } else { "absent" },
                if registered { "present" } else { "absent" }
            ),
            (
                "Provide aiRegistrationId or conformityId for the system.",
                "قدّم معرّف تسجيل الذكاء الاصطناعي أو معرّف المطابقة للنظام.",
            ),
        ));

        // Art. 8: AI disclosure to affected persons.
        let disclosed = contains_any(&squashed, DISCLOSURE_MARKERS);
        checks.push(control(
            FW,
            "Art. 8",
            if disclosed { CheckStatus::Compliant } else { CheckStatus::ReviewRequired },
            (
                "People interacting with AI must be told they are dealing with AI.",
                "يجب إخبار المتعاملين مع الذكاء الاصطناعي بأنهم يتعاملون مع نظام ذكاء اصطناعي.",
            ),
            if disclosed { "AI-disclosure marker present".into() } else { "no AI-disclosure marker".into() },
            (
                "Set an AI-disclosure marker on the interaction.",
                "فعّل مؤشر الإفصاح عن الذكاء الاصطناعي في التفاعل.",
            ),
        ));

        // Art. 10: human oversight for high-risk systems.
        let overseen = contains_any(&squashed, OVERSIGHT_MARKERS);
        let art10_status = if high_risk && !overseen {
            CheckStatus::NonCompliant
        } else {
            CheckStatus::Compliant
        };
        checks.push(control(
            FW,
            "Art. 10",
            art10_status,
            (
                "High-risk AI decisions require a human in the loop.",
                "تتطلب قرارات الذكاء الاصطناعي عالية المخاطر وجود إنسان في حلقة القرار.",
            ),
            format!(
                "high-risk category {}, oversight marker {}",
                if high_risk { "present" } else { "absent" },
                if overseen { "present" } else { "absent" }
            ),
            (
                "Assign a human reviewer before acting on the decision.",
                "عيّن مراجعاً بشرياً قبل التصرف بناءً على القرار.",
            ),
        ));

        // Art. 12: data governance reference.
        let governed = contains_any(&squashed, GOVERNANCE_MARKERS);
        checks.push(control(
            FW,
            "Art. 12",
            if governed { CheckStatus::Compliant } else { CheckStatus::ReviewRequired },
            (
                "AI systems must reference their data-governance policy.",
                "يجب أن تشير أنظمة الذكاء الاصطناعي إلى سياسة حوكمة البيانات الخاصة بها.",
            ),
            if governed { "data-governance reference present".into() } else { "no data-governance reference".into() },
            (
                "Link the applicable data-governance policy.",
                "اربط سياسة حوكمة البيانات المعمول بها.",
            ),
        ));

        Ok(checks)
    }
}
