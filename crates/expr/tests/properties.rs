//! Property tests: compilation either succeeds or fails cleanly, and
//! evaluation of any compiled predicate is deterministic and total.

use proptest::prelude::*;
use serde_json::{json, Value};

fn ident() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("score".to_string()),
        Just("amount".to_string()),
        Just("country".to_string()),
        Just("user.role".to_string()),
        Just("user.profile.age".to_string()),
        Just("missing".to_string()),
        Just("flag".to_string()),
    ]
}

fn literal() -> impl Strategy<Value = String> {
    prop_oneof![
        (-1000i64..1000).prop_map(|n| n.unsigned_abs().to_string()),
        Just("0.5".to_string()),
        Just("'AE'".to_string()),
        Just("\"admin\"".to_string()),
        Just("true".to_string()),
        Just("false".to_string()),
        Just("null".to_string()),
        Just("undefined".to_string()),
    ]
}

fn operand() -> impl Strategy<Value = String> {
    prop_oneof![ident(), literal()]
}

fn cmp_op() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just(">"),
        Just(">="),
        Just("<"),
        Just("<="),
        Just("==="),
        Just("=="),
        Just("!=="),
        Just("!="),
    ]
}

fn comparison() -> impl Strategy<Value = String> {
    (operand(), cmp_op(), operand()).prop_map(|(l, op, r)| format!("{l} {op} {r}"))
}

/// Well-formed expressions assembled from the grammar.
fn expression() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![comparison(), operand()];
    leaf.prop_recursive(3, 24, 2, |inner| {
        (inner.clone(), prop_oneof![Just("&&"), Just("||")], inner)
            .prop_map(|(l, op, r)| format!("({l}) {op} ({r})"))
    })
}

fn facts() -> impl Strategy<Value = Value> {
    (
        -100i64..200,
        -1000i64..1_000_000,
        prop_oneof![Just("AE"), Just("US"), Just("")],
        any::<bool>(),
    )
        .prop_map(|(score, amount, country, flag)| {
            json!({
                "score": score,
                "amount": amount,
                "country": country,
                "flag": flag,
                "user": {"role": "admin", "profile": {"age": 30}},
            })
        })
}

proptest! {
    #[test]
    fn well_formed_expressions_compile(src in expression()) {
        expr::compile(&src).unwrap();
    }

    #[test]
    fn evaluation_is_deterministic(src in expression(), f in facts()) {
        let p = expr::compile(&src).unwrap();
        let first = p.test(&f);
        for _ in 0..3 {
            prop_assert_eq!(p.test(&f), first);
        }
        prop_assert_eq!(expr::evaluate(&src, &f), first);
    }

    #[test]
    fn arbitrary_input_never_panics(src in "\\PC{0,60}", f in facts()) {
        // Either a clean syntax error at compile time or a boolean; the
        // convenience wrapper must always return.
        let _ = expr::evaluate(&src, &f);
        match expr::compile(&src) {
            Ok(p) => {
                let _ = p.test(&f);
            }
            Err(expr::ExprError::Syntax { .. }) => {}
        }
    }
}
