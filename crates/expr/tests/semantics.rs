//! End-to-end semantics of representative policy conditions.

use serde_json::json;

#[test]
fn uae_large_investment_condition() {
    let p = expr::compile("country === \"AE\" && amount > 500000").unwrap();
    assert!(p.test(&json!({"country": "AE", "amount": 1_000_000})));
    assert!(!p.test(&json!({"country": "US", "amount": 1_000_000})));
    assert!(!p.test(&json!({"country": "AE", "amount": 500_000})));
    assert!(!p.test(&json!({"amount": 1_000_000})));
}

#[test]
fn score_banding_conditions() {
    let high = expr::compile("score >= 80").unwrap();
    let low = expr::compile("score < 30").unwrap();
    let mid = expr::compile("score >= 30 && score < 80").unwrap();

    let facts = json!({"score": 90});
    assert!(high.test(&facts));
    assert!(!low.test(&facts));
    assert!(!mid.test(&facts));

    let facts = json!({"score": 45});
    assert!(!high.test(&facts));
    assert!(!low.test(&facts));
    assert!(mid.test(&facts));
}

#[test]
fn risk_threshold_with_decimals() {
    let p = expr::compile("risk > 0.8").unwrap();
    assert!(p.test(&json!({"risk": 0.9})));
    assert!(!p.test(&json!({"risk": 0.8})));
    assert!(!p.test(&json!({"risk": "not a number"})));
    assert!(!p.test(&json!({})));
}

#[test]
fn nested_role_checks() {
    let p = expr::compile("user.role === 'admin' || user.role === 'auditor'").unwrap();
    assert!(p.test(&json!({"user": {"role": "admin"}})));
    assert!(p.test(&json!({"user": {"role": "auditor"}})));
    assert!(!p.test(&json!({"user": {"role": "guest"}})));
    assert!(!p.test(&json!({"user": "admin"})));
}

#[test]
fn negation_over_markers() {
    let p = expr::compile("!consent && containsPii").unwrap();
    assert!(p.test(&json!({"containsPii": true})));
    assert!(!p.test(&json!({"consent": true, "containsPii": true})));
    assert!(!p.test(&json!({"containsPii": false})));
}

#[test]
fn undefined_keyword_matches_missing_fact() {
    let p = expr::compile("approver == undefined").unwrap();
    assert!(p.test(&json!({})));
    assert!(p.test(&json!({"approver": null})));
    assert!(!p.test(&json!({"approver": "dana"})));
}
