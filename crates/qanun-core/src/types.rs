//! Rules and decisions: the policy vocabulary shared across the workspace.
//!
//! Wire names are camelCase to match the journal format; rule snapshots are
//! embedded into decisions and audit entries by value, never by reference.

use crate::ids;
use crate::report::ComplianceReport;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Action taken when a rule matches, and the result type of a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Approved,
    Rejected,
    Review,
}

impl Action {
    /// Decision score applied when the matching rule carries no override.
    #[must_use]
    pub fn default_score(self) -> u8 {
        match self {
            Action::Approved => 85,
            Action::Rejected => 15,
            Action::Review => 50,
        }
    }

    /// The SCREAMING_SNAKE_CASE wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Approved => "APPROVED",
            Action::Rejected => "REJECTED",
            Action::Review => "REVIEW",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single predicate-with-action policy unit.
///
/// The `condition` string must parse under the restricted predicate grammar;
/// rule sets containing a condition that does not compile are rejected at
/// load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Stable identifier.
    pub id: String,
    /// Human label.
    #[serde(default)]
    pub name: String,
    /// Predicate expression over the facts.
    pub condition: String,
    /// Action taken when the predicate holds.
    pub action: Action,
    /// Human explanation attached to decisions this rule produces.
    #[serde(default)]
    pub reason: String,
    /// Lower numeric value wins; ties keep load order.
    #[serde(default)]
    pub priority: i64,
    /// Optional 0-100 override for the decision score.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
}

/// Reason attached to the default decision when no rule matches.
pub const NO_MATCH_REASON: &str = "No matching rule found — manual review required";

/// Outcome of evaluating facts against a rule set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    /// APPROVED, REJECTED or REVIEW.
    pub result: Action,
    /// Snapshot of the matching rule; `None` only for the default REVIEW.
    pub matched_rule: Option<Rule>,
    /// Human explanation.
    pub reason: String,
    /// 0-100; the rule override or the action default.
    pub score: u8,
    /// Unique identifier carried into the audit entry.
    pub audit_id: String,
    /// Caller-supplied model confidence in `[0, 1]`, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Compliance report attached by the pipeline, when evaluated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance_report: Option<ComplianceReport>,
}

impl Decision {
    /// Decision produced by a matching rule, with a fresh audit id.
    #[must_use]
    pub fn from_rule(rule: &Rule) -> Self {
        Self {
            result: rule.action,
            matched_rule: Some(rule.clone()),
            reason: rule.reason.clone(),
            score: rule.score.unwrap_or_else(|| rule.action.default_score()),
            audit_id: ids::new_audit_id(),
            confidence: None,
            compliance_report: None,
        }
    }

    /// The default REVIEW decision returned when no rule matches.
    #[must_use]
    pub fn no_match() -> Self {
        Self {
            result: Action::Review,
            matched_rule: None,
            reason: NO_MATCH_REASON.to_string(),
            score: 50,
            audit_id: ids::new_audit_id(),
            confidence: None,
            compliance_report: None,
        }
    }

    /// Model confidence: the explicit value when present, otherwise the
    /// decision score scaled into `[0, 1]`.
    #[must_use]
    pub fn effective_confidence(&self) -> f64 {
        self.confidence.unwrap_or(f64::from(self.score) / 100.0)
    }
}
