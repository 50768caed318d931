//! Multi-framework compliance evaluation.
//!
//! For each pipeline decision a configurable set of framework checkers runs
//! over the input, the decision and its audit entry, producing bilingual
//! control results aggregated into a signed report. Checkers are
//! pattern-matching heuristics, not legal opinions; see [`detect`] for the
//! matching contract and its known approximations.

#![deny(unsafe_code)]

pub mod detect;
mod dubai;
mod ethics;
mod nesa;
mod pdpl;

pub use dubai::DubaiAiLawChecker;
pub use ethics::AiEthicsChecker;
pub use nesa::NesaChecker;
pub use pdpl::PdplChecker;

use audit_log::AuditEntry;
use qanun_core::ids;
use qanun_core::report::{
    overall_status, report_audit_hash, report_score, CheckStatus, ComplianceCheck,
    ComplianceReport, Framework,
};
use qanun_core::types::Decision;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Error surfaced by a misbehaving checker. Never aborts a pipeline; the
/// aggregator degrades the report instead.
#[derive(Debug, Error)]
pub enum ComplianceError {
    #[error("checker {framework} failed: {message}")]
    Checker { framework: Framework, message: String },
}

/// Which summary languages a report populates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Ar,
    Both,
}

/// How thorough the checkers are: `Basic` may omit low-severity checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditLevel {
    Basic,
    Full,
}

/// Where personal data must stay at rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataResidency {
    Uae,
    Any,
}

/// Evaluation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceConfig {
    pub frameworks: Vec<Framework>,
    pub language: Language,
    pub audit_level: AuditLevel,
    pub data_residency: DataResidency,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            frameworks: vec![
                Framework::Pdpl,
                Framework::UaeAiEthics,
                Framework::Nesa,
                Framework::DubaiAiLaw,
            ],
            language: Language::Both,
            audit_level: AuditLevel::Full,
            data_residency: DataResidency::Any,
        }
    }
}

/// Everything a checker sees for one evaluation.
pub struct CheckContext<'a> {
    pub input: &'a Value,
    pub decision: &'a Decision,
    pub entry: Option<&'a AuditEntry>,
    pub config: &'a ComplianceConfig,
}

/// A single framework's rule family.
pub trait FrameworkChecker: Send + Sync {
    /// The framework this checker covers.
    fn framework(&self) -> Framework;
    /// Produce the control results for one evaluation, in article order.
    fn check(&self, ctx: &CheckContext<'_>) -> Result<Vec<ComplianceCheck>, ComplianceError>;
}

/// Result of [`ComplianceEngine::quick_check`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickCheck {
    pub passed: bool,
    /// NON_COMPLIANT findings only, one line each.
    pub issues: Vec<String>,
}

/// Aggregates the configured checkers into one report per decision. The
/// four concrete checkers are wired in by default; additional ones join
/// the framework set via [`register`](Self::register), later registrations
/// shadowing earlier ones for the same framework.
#[derive(Clone)]
pub struct ComplianceEngine {
    config: ComplianceConfig,
    checkers: Vec<Arc<dyn FrameworkChecker>>,
}

impl Default for ComplianceEngine {
    fn default() -> Self {
        Self::new(ComplianceConfig::default())
    }
}

impl ComplianceEngine {
    #[must_use]
    pub fn new(config: ComplianceConfig) -> Self {
        let checkers: Vec<Arc<dyn FrameworkChecker>> = vec![
            Arc::new(PdplChecker),
            Arc::new(AiEthicsChecker),
            Arc::new(NesaChecker),
            Arc::new(DubaiAiLawChecker),
        ];
        Self { config, checkers }
    }

    /// Add (or replace) the checker for a framework.
    pub fn register(&mut self, checker: Arc<dyn FrameworkChecker>) {
        self.checkers.push(checker);
    }

    #[must_use]
    pub fn config(&self) -> &ComplianceConfig {
        &self.config
    }

    /// Run every configured framework in order and assemble the bilingual
    /// report. A checker error degrades the whole report to a zero-check
    /// REVIEW_REQUIRED rather than failing the caller.
    #[must_use]
    pub fn evaluate(
        &self,
        input: &Value,
        decision: &Decision,
        entry: Option<&AuditEntry>,
    ) -> ComplianceReport {
        let ctx = CheckContext { input, decision, entry, config: &self.config };
        let mut checks = Vec::new();
        for framework in &self.config.frameworks {
            let Some(checker) = self.checker_for(*framework) else { continue };
            match checker.check(&ctx) {
                Ok(mut produced) => checks.append(&mut produced),
                Err(e) => {
                    debug!(framework = %framework, error = %e, "checker failed; degrading report");
                    return self.degenerate_report(&e);
                }
            }
        }
        debug!(checks = checks.len(), "compliance evaluated");
        self.assemble(checks)
    }

    /// PDPL + AI-Ethics only, collecting NON_COMPLIANT findings.
    #[must_use]
    pub fn quick_check(&self, input: &Value, decision: &Decision) -> QuickCheck {
        let ctx = CheckContext { input, decision, entry: None, config: &self.config };
        let mut issues = Vec::new();
        for checker in [
            Box::new(PdplChecker) as Box<dyn FrameworkChecker>,
            Box::new(AiEthicsChecker) as Box<dyn FrameworkChecker>,
        ] {
            let Ok(checks) = checker.check(&ctx) else { continue };
            for c in checks {
                if c.status == CheckStatus::NonCompliant {
                    issues.push(format!("{} {}: {}", c.framework, c.article, c.requirement));
                }
            }
        }
        QuickCheck { passed: issues.is_empty(), issues }
    }

    fn assemble(&self, checks: Vec<ComplianceCheck>) -> ComplianceReport {
        let report_id = ids::new_report_id();
        let timestamp = ids::now_iso();
        let total = checks.len();
        let passed = checks.iter().filter(|c| c.passed).count();
        let non_compliant =
            checks.iter().filter(|c| c.status == CheckStatus::NonCompliant).count();
        let review =
            checks.iter().filter(|c| c.status == CheckStatus::ReviewRequired).count();

        let summary_en = format!(
            "Passed {passed}/{total} checks. Non-compliant: {non_compliant}. Review-required: {review}."
        );
        let summary_ar = format!(
            "اجتاز {passed} من {total} فحصاً. غير متوافق: {non_compliant}. يتطلب مراجعة: {review}."
        );
        let (summary, summary_ar) = match self.config.language {
            Language::En => (summary_en, String::new()),
            Language::Ar => (String::new(), summary_ar),
            Language::Both => (summary_en, summary_ar),
        };

        let audit_hash =
            report_audit_hash(&report_id, &timestamp, &checks, &self.config.frameworks);
        ComplianceReport {
            overall_status: overall_status(&checks),
            score: report_score(&checks),
            frameworks: self.config.frameworks.clone(),
            report_id,
            timestamp,
            checks,
            summary,
            summary_ar,
            audit_hash,
        }
    }

    fn degenerate_report(&self, error: &ComplianceError) -> ComplianceReport {
        let report_id = ids::new_report_id();
        let timestamp = ids::now_iso();
        let audit_hash = report_audit_hash(&report_id, &timestamp, &[], &self.config.frameworks);
        ComplianceReport {
            report_id,
            timestamp,
            overall_status: CheckStatus::ReviewRequired,
            frameworks: self.config.frameworks.clone(),
            checks: Vec::new(),
            score: 0,
            summary: format!("compliance evaluation failed: {error}"),
            summary_ar: format!("فشل تقييم الامتثال: {error}"),
            audit_hash,
        }
    }

    // No checker is registered for ADGM by default; the framework is
    // accepted in configuration and contributes zero checks until one is
    // registered.
    fn checker_for(&self, framework: Framework) -> Option<&dyn FrameworkChecker> {
        self.checkers.iter().rev().find(|c| c.framework() == framework).map(AsRef::as_ref)
    }
}

/// Shared constructor for a control result. `passed` tracks the status;
/// remediation strings are attached only on failure.
pub(crate) fn control(
    framework: Framework,
    article: &str,
    status: CheckStatus,
    requirement: (&str, &str),
    details: String,
    remediation: (&str, &str),
) -> ComplianceCheck {
    let passed = status == CheckStatus::Compliant;
    ComplianceCheck {
        framework,
        article: article.to_string(),
        status,
        requirement: requirement.0.to_string(),
        requirement_ar: requirement.1.to_string(),
        passed,
        details,
        remediation: (!passed).then(|| remediation.0.to_string()),
        remediation_ar: (!passed).then(|| remediation.1.to_string()),
    }
}
