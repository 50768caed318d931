//! Priority ordering and first-match semantics.

use qanun_core::types::{Action, Rule};
use rule_engine::RuleEngine;
use serde_json::json;

fn rule(id: &str, condition: &str, action: Action, priority: i64, reason: &str) -> Rule {
    Rule {
        id: id.into(),
        name: id.into(),
        condition: condition.into(),
        action,
        reason: reason.into(),
        priority,
        score: None,
    }
}

#[test]
fn high_score_approves() {
    let engine = RuleEngine::new();
    engine
        .load_rules(vec![
            rule("R1", "score >= 80", Action::Approved, 1, "High"),
            rule("R2", "score < 30", Action::Rejected, 2, "Low"),
            rule("R3", "score >= 30 && score < 80", Action::Review, 3, "Mid"),
        ])
        .unwrap();

    let d = engine.evaluate(&json!({"score": 90}));
    assert_eq!(d.result, Action::Approved);
    assert_eq!(d.matched_rule.as_ref().unwrap().id, "R1");
    assert_eq!(d.score, 85);

    let d = engine.evaluate(&json!({"score": 10}));
    assert_eq!(d.result, Action::Rejected);
    assert_eq!(d.score, 15);

    let d = engine.evaluate(&json!({"score": 55}));
    assert_eq!(d.result, Action::Review);
    assert_eq!(d.matched_rule.as_ref().unwrap().id, "R3");
}

#[test]
fn uae_large_investment() {
    let engine = RuleEngine::new();
    engine
        .load_rules(vec![rule(
            "R1",
            "country === \"AE\" && amount > 500000",
            Action::Approved,
            1,
            "UAE large investment",
        )])
        .unwrap();

    let d = engine.evaluate(&json!({"country": "AE", "amount": 1_000_000}));
    assert_eq!(d.result, Action::Approved);

    let d = engine.evaluate(&json!({"country": "US", "amount": 1_000_000}));
    assert_eq!(d.result, Action::Review);
    assert!(d.matched_rule.is_none());
}

#[test]
fn lowest_priority_value_wins() {
    let engine = RuleEngine::new();
    engine
        .load_rules(vec![
            rule("LOOSE", "x > 0", Action::Review, 20, "loose"),
            rule("TIGHT", "x > 0", Action::Rejected, 5, "tight"),
        ])
        .unwrap();
    let d = engine.evaluate(&json!({"x": 1}));
    assert_eq!(d.matched_rule.unwrap().id, "TIGHT");
}

#[test]
fn equal_priority_keeps_load_order() {
    let engine = RuleEngine::new();
    engine
        .load_rules(vec![
            rule("FIRST", "x > 0", Action::Approved, 7, "first"),
            rule("SECOND", "x > 0", Action::Rejected, 7, "second"),
        ])
        .unwrap();
    let d = engine.evaluate(&json!({"x": 1}));
    assert_eq!(d.matched_rule.unwrap().id, "FIRST");
    assert_eq!(d.result, Action::Approved);
}

#[test]
fn score_override_applies() {
    let engine = RuleEngine::new();
    let mut r = rule("R1", "x > 0", Action::Approved, 1, "override");
    r.score = Some(60);
    engine.load_rules(vec![r]).unwrap();
    assert_eq!(engine.evaluate(&json!({"x": 1})).score, 60);
}

#[test]
fn non_matching_rule_is_skipped() {
    let engine = RuleEngine::new();
    engine
        .load_rules(vec![
            // Ordering against a non-numeric fact is simply false.
            rule("NOISY", "amount > 10", Action::Rejected, 1, "noisy"),
            rule("CATCH", "country === 'AE'", Action::Approved, 2, "catch"),
        ])
        .unwrap();
    let d = engine.evaluate(&json!({"amount": "not-a-number", "country": "AE"}));
    assert_eq!(d.matched_rule.unwrap().id, "CATCH");
}
