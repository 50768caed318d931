//! Recursive-descent parser building the predicate AST.

use crate::token::{Spanned, Token};
use crate::ExprError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Lit(Lit),
    /// Dotted identifier path resolved against the facts.
    Path(Vec<String>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Cmp(CmpOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Lit {
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CmpOp {
    Gt,
    Ge,
    Lt,
    Le,
    StrictEq,
    LooseEq,
    StrictNe,
    LooseNe,
}

pub(crate) fn parse(tokens: &[Spanned]) -> Result<Expr, ExprError> {
    let mut p = Parser { tokens, pos: 0 };
    let expr = p.or_expr()?;
    if let Some((_, offset)) = p.peek() {
        return Err(syntax(*offset, "unexpected trailing tokens"));
    }
    Ok(expr)
}

fn syntax(offset: usize, message: impl Into<String>) -> ExprError {
    ExprError::Syntax { offset, message: message.into() }
}

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Spanned> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<&'a Spanned> {
        let t = self.tokens.get(self.pos);
        self.pos += 1;
        t
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek().map(|(t, _)| t) == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn end_offset(&self) -> usize {
        self.tokens.last().map_or(0, |(_, o)| o + 1)
    }

    fn or_expr(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.and_expr()?;
        while self.eat(&Token::Or) {
            let rhs = self.and_expr()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.not_expr()?;
        while self.eat(&Token::And) {
            let rhs = self.not_expr()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn not_expr(&mut self) -> Result<Expr, ExprError> {
        if self.eat(&Token::Not) {
            return Ok(Expr::Not(Box::new(self.not_expr()?)));
        }
        self.cmp_expr()
    }

    /// At most one comparison per level; `a > b > c` is a parse error
    /// surfaced as trailing tokens.
    fn cmp_expr(&mut self) -> Result<Expr, ExprError> {
        let lhs = self.primary()?;
        let op = match self.peek() {
            Some((Token::Gt, _)) => Some(CmpOp::Gt),
            Some((Token::Ge, _)) => Some(CmpOp::Ge),
            Some((Token::Lt, _)) => Some(CmpOp::Lt),
            Some((Token::Le, _)) => Some(CmpOp::Le),
            Some((Token::StrictEq, _)) => Some(CmpOp::StrictEq),
            Some((Token::LooseEq, _)) => Some(CmpOp::LooseEq),
            Some((Token::StrictNe, _)) => Some(CmpOp::StrictNe),
            Some((Token::LooseNe, _)) => Some(CmpOp::LooseNe),
            _ => None,
        };
        let Some(op) = op else { return Ok(lhs) };
        self.pos += 1;
        let rhs = self.primary()?;
        Ok(Expr::Cmp(op, Box::new(lhs), Box::new(rhs)))
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        let end = self.end_offset();
        let Some((token, offset)) = self.bump() else {
            return Err(syntax(end, "unexpected end of expression"));
        };
        match token {
            Token::LParen => {
                let inner = self.or_expr()?;
                if !self.eat(&Token::RParen) {
                    return Err(syntax(*offset, "unclosed parenthesis"));
                }
                Ok(inner)
            }
            Token::Num(n) => Ok(Expr::Lit(Lit::Num(*n))),
            Token::Str(s) => Ok(Expr::Lit(Lit::Str(s.clone()))),
            Token::Ident(name) => match name.as_str() {
                "true" => Ok(Expr::Lit(Lit::Bool(true))),
                "false" => Ok(Expr::Lit(Lit::Bool(false))),
                // `undefined` as a literal compares like null.
                "null" | "undefined" => Ok(Expr::Lit(Lit::Null)),
                _ => {
                    let mut path = vec![name.clone()];
                    while self.eat(&Token::Dot) {
                        match self.bump() {
                            Some((Token::Ident(seg), _)) => path.push(seg.clone()),
                            Some((_, o)) => {
                                return Err(syntax(*o, "expected identifier after '.'"))
                            }
                            None => {
                                return Err(syntax(end, "expected identifier after '.'"))
                            }
                        }
                    }
                    Ok(Expr::Path(path))
                }
            },
            _ => Err(syntax(*offset, "expected a value or '('")),
        }
    }
}
