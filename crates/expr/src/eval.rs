//! Evaluation of compiled predicates against facts.
//!
//! The coercion table:
//! - `===` / `!==` compare by value and type, no coercion.
//! - `==` / `!=`: null and undefined equal each other and nothing else;
//!   booleans coerce to 0/1; a number against a string converts the string
//!   to a number (unparseable strings compare unequal).
//! - `<` `<=` `>` `>=` require both sides numeric after coercion; anything
//!   non-numeric makes the comparison false.
//! - Objects and arrays are truthy but compare equal to nothing.

use crate::parse::{CmpOp, Expr, Lit};
use qanun_core::facts::lookup_path;
use serde_json::Value;

/// A resolved operand. `Undefined` marks a missing fact; `Composite` an
/// object or array value.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Scalar {
    Undefined,
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    Composite,
}

pub(crate) fn eval_value(expr: &Expr, facts: &Value) -> Scalar {
    match expr {
        Expr::Lit(lit) => match lit {
            Lit::Null => Scalar::Null,
            Lit::Bool(b) => Scalar::Bool(*b),
            Lit::Num(n) => Scalar::Num(*n),
            Lit::Str(s) => Scalar::Str(s.clone()),
        },
        Expr::Path(path) => resolve(facts, path),
        Expr::Not(inner) => Scalar::Bool(!truthy(&eval_value(inner, facts))),
        // Short-circuit, yielding the deciding operand like the source
        // language so nested truthiness composes.
        Expr::And(lhs, rhs) => {
            let l = eval_value(lhs, facts);
            if truthy(&l) {
                eval_value(rhs, facts)
            } else {
                l
            }
        }
        Expr::Or(lhs, rhs) => {
            let l = eval_value(lhs, facts);
            if truthy(&l) {
                l
            } else {
                eval_value(rhs, facts)
            }
        }
        Expr::Cmp(op, lhs, rhs) => {
            let l = eval_value(lhs, facts);
            let r = eval_value(rhs, facts);
            Scalar::Bool(compare(*op, &l, &r))
        }
    }
}

fn resolve(facts: &Value, path: &[String]) -> Scalar {
    let dotted = path.join(".");
    match lookup_path(facts, &dotted) {
        None => Scalar::Undefined,
        Some(Value::Null) => Scalar::Null,
        Some(Value::Bool(b)) => Scalar::Bool(*b),
        Some(Value::Number(n)) => n.as_f64().map_or(Scalar::Undefined, Scalar::Num),
        Some(Value::String(s)) => Scalar::Str(s.clone()),
        Some(Value::Array(_) | Value::Object(_)) => Scalar::Composite,
    }
}

pub(crate) fn truthy(v: &Scalar) -> bool {
    match v {
        Scalar::Undefined | Scalar::Null => false,
        Scalar::Bool(b) => *b,
        Scalar::Num(n) => *n != 0.0 && !n.is_nan(),
        Scalar::Str(s) => !s.is_empty(),
        Scalar::Composite => true,
    }
}

fn compare(op: CmpOp, lhs: &Scalar, rhs: &Scalar) -> bool {
    match op {
        CmpOp::StrictEq => strict_eq(lhs, rhs),
        CmpOp::StrictNe => !strict_eq(lhs, rhs),
        CmpOp::LooseEq => loose_eq(lhs, rhs),
        CmpOp::LooseNe => !loose_eq(lhs, rhs),
        CmpOp::Gt => order(lhs, rhs).is_some_and(|(l, r)| l > r),
        CmpOp::Ge => order(lhs, rhs).is_some_and(|(l, r)| l >= r),
        CmpOp::Lt => order(lhs, rhs).is_some_and(|(l, r)| l < r),
        CmpOp::Le => order(lhs, rhs).is_some_and(|(l, r)| l <= r),
    }
}

fn strict_eq(lhs: &Scalar, rhs: &Scalar) -> bool {
    match (lhs, rhs) {
        (Scalar::Null, Scalar::Null) | (Scalar::Undefined, Scalar::Undefined) => true,
        (Scalar::Bool(a), Scalar::Bool(b)) => a == b,
        (Scalar::Num(a), Scalar::Num(b)) => a == b,
        (Scalar::Str(a), Scalar::Str(b)) => a == b,
        _ => false,
    }
}

fn loose_eq(lhs: &Scalar, rhs: &Scalar) -> bool {
    match (lhs, rhs) {
        (Scalar::Null | Scalar::Undefined, Scalar::Null | Scalar::Undefined) => true,
        (Scalar::Null | Scalar::Undefined, _) | (_, Scalar::Null | Scalar::Undefined) => false,
        (Scalar::Bool(a), other) => loose_eq(&Scalar::Num(f64::from(u8::from(*a))), other),
        (other, Scalar::Bool(b)) => loose_eq(other, &Scalar::Num(f64::from(u8::from(*b)))),
        (Scalar::Num(a), Scalar::Num(b)) => a == b,
        (Scalar::Str(a), Scalar::Str(b)) => a == b,
        (Scalar::Num(a), Scalar::Str(s)) | (Scalar::Str(s), Scalar::Num(a)) => {
            numeric_str(s).is_some_and(|b| *a == b)
        }
        _ => false,
    }
}

/// Numeric coercion for ordering: numbers pass through, booleans become
/// 0/1, strings parse. Null, undefined and composites do not order.
fn order(lhs: &Scalar, rhs: &Scalar) -> Option<(f64, f64)> {
    Some((to_number(lhs)?, to_number(rhs)?))
}

fn to_number(v: &Scalar) -> Option<f64> {
    match v {
        Scalar::Num(n) => Some(*n),
        Scalar::Bool(b) => Some(f64::from(u8::from(*b))),
        Scalar::Str(s) => numeric_str(s),
        Scalar::Null | Scalar::Undefined | Scalar::Composite => None,
    }
}

fn numeric_str(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| !n.is_nan())
}
