//! In-process decision observability.
//!
//! The pipeline reports every pre/post decision here twice over: to a
//! process-global observer hook, and into a small counter table keyed by
//! evaluation phase and decision result. Nothing persists across a
//! restart; embedders wanting durable telemetry subscribe an observer and
//! forward the callbacks themselves.

use qanun_core::types::{Action, Decision};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Observer invoked for each decision the pipeline emits.
///
/// Callbacks run on the pipeline's own thread between the audit append
/// and the next phase, so implementations should return quickly and must
/// not re-enter the audit log.
pub trait DecisionObserver: Send + Sync {
    /// Called with the evaluation phase (`"pre"` or `"post"`).
    fn on_decision(&self, phase: &str, decision: &Decision);
}

static OBSERVER: RwLock<Option<Arc<dyn DecisionObserver>>> = RwLock::new(None);

/// Install a global decision observer, or clear it with `None`.
pub fn set_observer(observer: Option<Box<dyn DecisionObserver>>) {
    let installed = observer.map(Arc::from);
    *OBSERVER.write().unwrap_or_else(PoisonError::into_inner) = installed;
}

/// Counters of decisions seen per `(phase, result)` pair.
///
/// The table stays tiny (two phases times three results), so it is a
/// plain vector scanned under a mutex; a recorder that panicked mid-update
/// only ever leaves a stale count behind, so poisoning is ignored.
pub struct DecisionMetrics {
    counts: Mutex<Vec<(String, Action, u64)>>,
}

static METRICS: DecisionMetrics = DecisionMetrics { counts: Mutex::new(Vec::new()) };

/// The process-wide decision counters.
#[must_use]
pub fn decision_metrics() -> &'static DecisionMetrics {
    &METRICS
}

impl DecisionMetrics {
    /// How many decisions this process has recorded for `phase` with the
    /// given result.
    #[must_use]
    pub fn decision_counter(&self, phase: &str, result: Action) -> u64 {
        let counts = self.counts.lock().unwrap_or_else(PoisonError::into_inner);
        counts.iter().find(|(p, r, _)| p == phase && *r == result).map_or(0, |(_, _, n)| *n)
    }

    fn record(&self, phase: &str, result: Action) {
        let mut counts = self.counts.lock().unwrap_or_else(PoisonError::into_inner);
        match counts.iter_mut().find(|(p, r, _)| p == phase && *r == result) {
            Some((_, _, n)) => *n += 1,
            None => counts.push((phase.to_string(), result, 1)),
        }
    }
}

pub(crate) fn notify(phase: &str, decision: &Decision) {
    decision_metrics().record(phase, decision.result);
    let observer = OBSERVER.read().unwrap_or_else(PoisonError::into_inner);
    if let Some(observer) = observer.as_ref() {
        observer.on_decision(phase, decision);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_per_phase_and_result() {
        let d = Decision::no_match();
        let before = decision_metrics().decision_counter("observer-test", Action::Review);
        notify("observer-test", &d);
        notify("observer-test", &d);
        let after = decision_metrics().decision_counter("observer-test", Action::Review);
        assert_eq!(after, before + 2);
        assert_eq!(decision_metrics().decision_counter("observer-test", Action::Rejected), 0);
    }

    #[test]
    fn unknown_pair_reads_zero() {
        assert_eq!(decision_metrics().decision_counter("never-recorded", Action::Approved), 0);
    }
}
