//! Governed-agent pipeline.
//!
//! Every invocation runs pre-check → LM call → post-check. Both checks
//! evaluate the rule engine, append to the hash-chained audit log and
//! attach a compliance report; a REJECTED pre-check short-circuits before
//! the model is ever called. The streaming variant delivers chunks in a
//! prefix-stable total order and hands back the completed run record after
//! the last chunk.
//!
//! There is no inheritance here: a concrete pipeline is a value composing
//! the engine, the log, the compliance layer and either an [`LmAdapter`]
//! or a custom think function.
//!
//! Failure discipline: LM errors propagate after the pre-check entry is
//! already persisted; compliance failures degrade to a synthetic report;
//! journal write failures degrade the log but never the decision; and
//! cancellation is data (`cancelled = true` on the run record), not an
//! error. Audit appends are never reverted.

#![deny(unsafe_code)]

mod adapter;
mod observer;

pub use adapter::{LmAdapter, LmError};
pub use observer::{decision_metrics, set_observer, DecisionMetrics, DecisionObserver};

use audit_log::{AuditEntry, AuditLog};
use compliance::ComplianceEngine;
use qanun_core::canon::canonical_json;
use qanun_core::facts::with_fact;
use qanun_core::ids;
use qanun_core::types::{Action, Decision};
use rule_engine::RuleEngine;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info_span};

/// Errors that make the pipeline unable to produce a run record.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("language model call failed: {0}")]
    Lm(#[from] LmError),
}

/// Cooperative cancellation signal, optionally carrying a deadline.
/// Exceeding the deadline is indistinguishable from cancellation.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that auto-cancels once `timeout` has elapsed.
    #[must_use]
    pub fn with_deadline(timeout: Duration) -> Self {
        Self { flag: Arc::new(AtomicBool::new(false)), deadline: Some(Instant::now() + timeout) }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// Custom think function; replaces the default `complete(canonical(facts))`.
pub type ThinkFn = Arc<dyn Fn(&Value, &CancelToken) -> Result<String, LmError> + Send + Sync>;

/// Result record of one pipeline invocation.
#[derive(Debug, Clone)]
pub struct AgentRun {
    /// The model output, the accumulated stream, or the block message.
    pub output: String,
    /// Pre decision, then post decision when one was taken.
    pub decisions: Vec<Decision>,
    /// The appended audit entries, in order.
    pub audit_trail: Vec<AuditEntry>,
    /// True when cancellation or deadline expiry cut the run short.
    pub cancelled: bool,
}

/// A pipeline instance owning its engine, log and compliance layer.
pub struct GovernedAgent {
    engine: Arc<RuleEngine>,
    audit: Arc<AuditLog>,
    compliance: Arc<ComplianceEngine>,
    lm: Arc<dyn LmAdapter>,
    think: Option<ThinkFn>,
}

impl GovernedAgent {
    #[must_use]
    pub fn new(
        engine: Arc<RuleEngine>,
        audit: Arc<AuditLog>,
        compliance: Arc<ComplianceEngine>,
        lm: Arc<dyn LmAdapter>,
    ) -> Self {
        Self { engine, audit, compliance, lm, think: None }
    }

    /// Replace the default LM prompt construction with a custom think
    /// function. Streaming falls back to whitespace-token simulation.
    #[must_use]
    pub fn with_think(mut self, think: ThinkFn) -> Self {
        self.think = Some(think);
        self
    }

    /// Shared audit log handle.
    #[must_use]
    pub fn audit_log(&self) -> &Arc<AuditLog> {
        &self.audit
    }

    /// Run pre-check, LM call and post-check.
    pub fn run(&self, facts: &Value) -> Result<AgentRun, PipelineError> {
        self.run_cancellable(facts, &CancelToken::new())
    }

    /// [`run`](Self::run) with a caller-controlled cancellation signal.
    pub fn run_cancellable(
        &self,
        facts: &Value,
        cancel: &CancelToken,
    ) -> Result<AgentRun, PipelineError> {
        let (pre, pre_entry) = self.checked("pre", facts);
        if pre.result == Action::Rejected {
            return Ok(blocked_run(pre, pre_entry));
        }
        if cancel.is_cancelled() {
            return Ok(self.cancelled_run(String::new(), facts, pre, pre_entry));
        }
        let output = match self.think_once(facts, cancel) {
            Ok(output) => output,
            Err(LmError::Cancelled) => {
                return Ok(self.cancelled_run(String::new(), facts, pre, pre_entry))
            }
            Err(e) => return Err(PipelineError::Lm(e)),
        };
        let post_facts = with_fact(facts, "llmOutput", Value::String(output.clone()));
        let (post, post_entry) = self.checked("post", &post_facts);
        Ok(AgentRun {
            output,
            decisions: vec![pre, post],
            audit_trail: vec![pre_entry, post_entry],
            cancelled: false,
        })
    }

    /// Streaming variant: forwards chunks to `on_chunk` in order and
    /// returns the completed run record after the final chunk.
    pub fn run_stream(
        &self,
        facts: &Value,
        on_chunk: &mut dyn FnMut(&str),
    ) -> Result<AgentRun, PipelineError> {
        self.run_stream_cancellable(facts, &CancelToken::new(), on_chunk)
    }

    /// [`run_stream`](Self::run_stream) with cancellation. Once the token
    /// fires no further chunks are emitted; the post decision is taken
    /// over the output accumulated so far.
    pub fn run_stream_cancellable(
        &self,
        facts: &Value,
        cancel: &CancelToken,
        on_chunk: &mut dyn FnMut(&str),
    ) -> Result<AgentRun, PipelineError> {
        let (pre, pre_entry) = self.checked("pre", facts);
        if pre.result == Action::Rejected {
            let run = blocked_run(pre, pre_entry);
            on_chunk(&run.output);
            return Ok(run);
        }
        if cancel.is_cancelled() {
            return Ok(self.cancelled_run(String::new(), facts, pre, pre_entry));
        }

        let mut accumulated = String::new();
        if self.think.is_none() && self.lm.supports_streaming() {
            let result = {
                let mut forward = |chunk: &str| {
                    if !cancel.is_cancelled() {
                        accumulated.push_str(chunk);
                        on_chunk(chunk);
                    }
                };
                let _span = info_span!("llm.complete_stream").entered();
                self.lm.complete_stream(&canonical_json(facts), cancel, &mut forward)
            };
            match result {
                Err(LmError::Cancelled) => {
                    return Ok(self.cancelled_run(accumulated, facts, pre, pre_entry))
                }
                Err(e) => return Err(PipelineError::Lm(e)),
                Ok(_) => {
                    if cancel.is_cancelled() {
                        return Ok(self.cancelled_run(accumulated, facts, pre, pre_entry));
                    }
                }
            }
        } else {
            let full = match self.think_once(facts, cancel) {
                Ok(output) => output,
                Err(LmError::Cancelled) => {
                    return Ok(self.cancelled_run(String::new(), facts, pre, pre_entry))
                }
                Err(e) => return Err(PipelineError::Lm(e)),
            };
            // Simulated streaming: one whitespace token per chunk, each
            // followed by a space, order preserved.
            for token in full.split_whitespace() {
                if cancel.is_cancelled() {
                    return Ok(self.cancelled_run(accumulated, facts, pre, pre_entry));
                }
                let chunk = format!("{token} ");
                accumulated.push_str(&chunk);
                on_chunk(&chunk);
            }
        }

        let post_facts = with_fact(facts, "llmOutput", Value::String(accumulated.clone()));
        let (post, post_entry) = self.checked("post", &post_facts);
        Ok(AgentRun {
            output: accumulated,
            decisions: vec![pre, post],
            audit_trail: vec![pre_entry, post_entry],
            cancelled: false,
        })
    }

    /// Evaluate, persist and attach compliance for one phase.
    fn checked(&self, phase: &str, facts: &Value) -> (Decision, AuditEntry) {
        let _span = info_span!("policy.check", phase = phase).entered();
        let mut decision = self.engine.evaluate(facts);
        let mut entry = self.audit.append(&decision, facts);
        let report = self.compliance.evaluate(facts, &decision, Some(&entry));
        decision.compliance_report = Some(report.clone());
        entry.compliance = Some(report.clone());
        self.audit.attach_compliance(&entry.id, report);
        observer::notify(phase, &decision);
        debug!(phase, result = %decision.result, audit = %entry.id, "phase decided");
        (decision, entry)
    }

    fn think_once(&self, facts: &Value, cancel: &CancelToken) -> Result<String, LmError> {
        if let Some(think) = &self.think {
            return think(facts, cancel);
        }
        let _span = info_span!("llm.complete").entered();
        self.lm.complete(&canonical_json(facts), cancel)
    }

    /// Close out a cancelled run: a synthetic REVIEW post decision over
    /// whatever output accumulated, persisted like any other (appends are
    /// never reverted).
    fn cancelled_run(
        &self,
        output: String,
        facts: &Value,
        pre: Decision,
        pre_entry: AuditEntry,
    ) -> AgentRun {
        let post_facts = if output.is_empty() {
            facts.clone()
        } else {
            with_fact(facts, "llmOutput", Value::String(output.clone()))
        };
        let post = Decision {
            result: Action::Review,
            matched_rule: None,
            reason: "cancelled".to_string(),
            score: 50,
            audit_id: ids::new_audit_id(),
            confidence: None,
            compliance_report: None,
        };
        let post_entry = self.audit.append(&post, &post_facts);
        observer::notify("post", &post);
        debug!(audit = %post_entry.id, "run cancelled");
        AgentRun {
            output,
            decisions: vec![pre, post],
            audit_trail: vec![pre_entry, post_entry],
            cancelled: true,
        }
    }
}

fn blocked_run(pre: Decision, pre_entry: AuditEntry) -> AgentRun {
    AgentRun {
        output: format!("Blocked by rule: {}", pre.reason),
        decisions: vec![pre],
        audit_trail: vec![pre_entry],
        cancelled: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_token_expires() {
        let token = CancelToken::with_deadline(Duration::from_millis(0));
        assert!(token.is_cancelled());
        let fresh = CancelToken::with_deadline(Duration::from_secs(3600));
        assert!(!fresh.is_cancelled());
        fresh.cancel();
        assert!(fresh.is_cancelled());
    }

    #[test]
    fn cloned_tokens_share_the_flag() {
        let token = CancelToken::new();
        let clone = token.clone();
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
