//! Restricted predicate language over facts.
//!
//! Conditions such as `country === "AE" && amount > 500000` compile into
//! reusable predicates without any host-language dynamic evaluation: a
//! self-contained tokenizer and recursive-descent parser build an AST which
//! is then walked against a facts value.
//!
//! Grammar, precedence low to high:
//!
//! ```text
//! expr      = orExpr
//! orExpr    = andExpr ( "||" andExpr )*
//! andExpr   = notExpr ( "&&" notExpr )*
//! notExpr   = "!" notExpr | cmpExpr
//! cmpExpr   = primary ( cmpOp primary )?
//! cmpOp     = ">" | ">=" | "<" | "<=" | "===" | "==" | "!==" | "!="
//! primary   = "(" expr ")" | number | string | bool | null | identifier
//! ```
//!
//! Parse errors are raised at compile time (fail fast on load); evaluation
//! of a compiled predicate never fails. A dotted identifier resolves against
//! the facts; a missing segment yields a distinguished undefined value which
//! is falsy and loosely equal only to null.

#![deny(unsafe_code)]

mod eval;
mod parse;
mod token;

use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Error raised when a condition fails to parse.
#[derive(Debug, Error)]
pub enum ExprError {
    #[error("syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },
}

/// A compiled predicate. Stateless and safe for concurrent reuse.
#[derive(Debug, Clone)]
pub struct Predicate {
    source: String,
    expr: Arc<parse::Expr>,
}

impl Predicate {
    /// The original condition text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against `facts`. Never fails: any missing key or type
    /// mismatch collapses to `false`.
    #[must_use]
    pub fn test(&self, facts: &Value) -> bool {
        eval::truthy(&eval::eval_value(&self.expr, facts))
    }
}

/// Compile a condition, raising on syntax error.
pub fn compile(source: &str) -> Result<Predicate, ExprError> {
    let tokens = token::lex(source)?;
    let expr = parse::parse(&tokens)?;
    Ok(Predicate { source: source.to_string(), expr: Arc::new(expr) })
}

/// Convenience wrapper: compile and evaluate in one step, returning `false`
/// on any error including a syntax error.
#[must_use]
pub fn evaluate(source: &str, facts: &Value) -> bool {
    compile(source).map(|p| p.test(facts)).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn compile_rejects_garbage() {
        assert!(compile("").is_err());
        assert!(compile("score >").is_err());
        assert!(compile("score > 1 > 2").is_err());
        assert!(compile("(a && b").is_err());
        assert!(compile("a ? b : c").is_err());
        assert!(compile("'unterminated").is_err());
    }

    #[test]
    fn evaluate_swallows_syntax_errors() {
        assert!(!evaluate("score >", &json!({"score": 1})));
    }

    #[test]
    fn predicate_is_reusable() {
        let p = compile("score >= 80").unwrap();
        assert!(p.test(&json!({"score": 90})));
        assert!(!p.test(&json!({"score": 10})));
        assert!(p.test(&json!({"score": 90})));
        assert_eq!(p.source(), "score >= 80");
    }
}
