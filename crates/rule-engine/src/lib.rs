//! Deterministic rule engine.
//!
//! Rules carry a textual condition in the restricted predicate grammar; the
//! engine compiles every condition at load time (failures raise, fail fast)
//! and evaluates facts against the compiled set in ascending priority
//! order, first match winning. Ties keep load order. When nothing matches,
//! the default REVIEW decision is returned.
//!
//! The loaded set is replaced atomically: readers observe either the old
//! complete set or the new complete set, never a torn state, so `evaluate`
//! and `detect_conflicts` are safe to call concurrently with a reload.

#![deny(unsafe_code)]

use expr::Predicate;
use qanun_core::types::{Decision, Rule};
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::debug;

/// Errors raised while loading rules.
#[derive(Debug, Error)]
pub enum RuleEngineError {
    #[error("rule '{id}': condition failed to compile: {source}")]
    InvalidCondition {
        id: String,
        #[source]
        source: expr::ExprError,
    },
    #[error("rule '{id}': score {score} exceeds 100")]
    ScoreOutOfRange { id: String, score: u8 },
    #[error("rule '{id}': empty id")]
    EmptyId { id: String },
}

/// A rule paired with its compiled predicate.
#[derive(Debug, Clone)]
struct CompiledRule {
    rule: Rule,
    predicate: Predicate,
}

/// Kind of relationship reported by conflict detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Byte-equal conditions (after trimming) with differing actions.
    ContradictoryActions,
    /// Byte-equal conditions with the same action; informational.
    Duplicate,
}

/// One pairwise finding from [`RuleEngine::detect_conflicts`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleConflict {
    pub rule_a: String,
    pub rule_b: String,
    pub kind: ConflictKind,
    pub description: String,
}

/// Compiles and evaluates a replaceable set of rules.
#[derive(Debug, Default)]
pub struct RuleEngine {
    rules: RwLock<Arc<Vec<CompiledRule>>>,
}

impl RuleEngine {
    /// An engine with no rules loaded; every evaluation yields the default
    /// REVIEW decision until [`load_rules`](Self::load_rules) succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and compile `rules`, replacing any previously loaded set.
    /// The first invalid rule aborts the load and leaves the old set
    /// untouched.
    pub fn load_rules(&self, rules: Vec<Rule>) -> Result<(), RuleEngineError> {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            compiled.push(compile_rule(rule)?);
        }
        // Stable sort: equal priorities keep their load order.
        compiled.sort_by_key(|c| c.rule.priority);
        let count = compiled.len();
        *self.rules.write().expect("rule set lock poisoned") = Arc::new(compiled);
        debug!(rules = count, "rule set loaded");
        Ok(())
    }

    /// Append a single rule and re-sort, keeping insertion order among
    /// equal priorities.
    pub fn add_rule(&self, rule: Rule) -> Result<(), RuleEngineError> {
        let compiled = compile_rule(rule)?;
        let mut guard = self.rules.write().expect("rule set lock poisoned");
        let mut next = guard.as_ref().clone();
        next.push(compiled);
        next.sort_by_key(|c| c.rule.priority);
        *guard = Arc::new(next);
        Ok(())
    }

    /// Evaluate facts against the loaded set in priority order. The first
    /// rule whose predicate holds produces the decision; otherwise the
    /// default REVIEW decision is returned.
    #[must_use]
    pub fn evaluate(&self, facts: &Value) -> Decision {
        let rules = self.snapshot();
        for compiled in rules.iter() {
            if compiled.predicate.test(facts) {
                debug!(rule = %compiled.rule.id, action = %compiled.rule.action, "rule matched");
                return Decision::from_rule(&compiled.rule);
            }
        }
        debug!("no rule matched");
        Decision::no_match()
    }

    /// Pairwise scan for contradictory and duplicate conditions. O(n²)
    /// over the rule count, which stays in the hundreds.
    #[must_use]
    pub fn detect_conflicts(&self) -> Vec<RuleConflict> {
        let rules = self.snapshot();
        let mut findings = Vec::new();
        for (i, a) in rules.iter().enumerate() {
            for b in rules.iter().skip(i + 1) {
                let ca = a.rule.condition.trim();
                let cb = b.rule.condition.trim();
                if ca != cb {
                    continue;
                }
                if a.rule.action != b.rule.action {
                    findings.push(RuleConflict {
                        rule_a: a.rule.id.clone(),
                        rule_b: b.rule.id.clone(),
                        kind: ConflictKind::ContradictoryActions,
                        description: format!(
                            "same condition '{ca}' maps to {} and {}",
                            a.rule.action, b.rule.action
                        ),
                    });
                } else {
                    findings.push(RuleConflict {
                        rule_a: a.rule.id.clone(),
                        rule_b: b.rule.id.clone(),
                        kind: ConflictKind::Duplicate,
                        description: format!("duplicate condition '{ca}'"),
                    });
                }
            }
        }
        findings
    }

    /// Snapshot of the loaded rules in evaluation order.
    #[must_use]
    pub fn rules(&self) -> Vec<Rule> {
        self.snapshot().iter().map(|c| c.rule.clone()).collect()
    }

    /// Number of loaded rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// True when no rules are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    fn snapshot(&self) -> Arc<Vec<CompiledRule>> {
        self.rules.read().expect("rule set lock poisoned").clone()
    }
}

fn compile_rule(rule: Rule) -> Result<CompiledRule, RuleEngineError> {
    if rule.id.trim().is_empty() {
        return Err(RuleEngineError::EmptyId { id: rule.id });
    }
    if let Some(score) = rule.score {
        if score > 100 {
            return Err(RuleEngineError::ScoreOutOfRange { id: rule.id, score });
        }
    }
    let predicate = expr::compile(&rule.condition)
        .map_err(|source| RuleEngineError::InvalidCondition { id: rule.id.clone(), source })?;
    Ok(CompiledRule { rule, predicate })
}
