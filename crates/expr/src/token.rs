//! Tokenizer for the predicate language.

use crate::ExprError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Num(f64),
    Str(String),
    Ident(String),
    Dot,
    LParen,
    RParen,
    Or,
    And,
    Not,
    Gt,
    Ge,
    Lt,
    Le,
    StrictEq,
    LooseEq,
    StrictNe,
    LooseNe,
}

/// A token plus its byte offset in the source, for error reporting.
pub(crate) type Spanned = (Token, usize);

fn err(offset: usize, message: impl Into<String>) -> ExprError {
    ExprError::Syntax { offset, message: message.into() }
}

pub(crate) fn lex(source: &str) -> Result<Vec<Spanned>, ExprError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let start = i;
        let b = bytes[i];
        match b {
            b' ' | b'\t' | b'\r' | b'\n' => i += 1,
            b'(' => {
                tokens.push((Token::LParen, start));
                i += 1;
            }
            b')' => {
                tokens.push((Token::RParen, start));
                i += 1;
            }
            b'.' => {
                tokens.push((Token::Dot, start));
                i += 1;
            }
            b'|' => {
                if bytes.get(i + 1) == Some(&b'|') {
                    tokens.push((Token::Or, start));
                    i += 2;
                } else {
                    return Err(err(start, "expected '||'"));
                }
            }
            b'&' => {
                if bytes.get(i + 1) == Some(&b'&') {
                    tokens.push((Token::And, start));
                    i += 2;
                } else {
                    return Err(err(start, "expected '&&'"));
                }
            }
            b'>' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push((Token::Ge, start));
                    i += 2;
                } else {
                    tokens.push((Token::Gt, start));
                    i += 1;
                }
            }
            b'<' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push((Token::Le, start));
                    i += 2;
                } else {
                    tokens.push((Token::Lt, start));
                    i += 1;
                }
            }
            b'=' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    if bytes.get(i + 2) == Some(&b'=') {
                        tokens.push((Token::StrictEq, start));
                        i += 3;
                    } else {
                        tokens.push((Token::LooseEq, start));
                        i += 2;
                    }
                } else {
                    return Err(err(start, "assignment is not supported; use '==' or '==='"));
                }
            }
            b'!' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    if bytes.get(i + 2) == Some(&b'=') {
                        tokens.push((Token::StrictNe, start));
                        i += 3;
                    } else {
                        tokens.push((Token::LooseNe, start));
                        i += 2;
                    }
                } else {
                    tokens.push((Token::Not, start));
                    i += 1;
                }
            }
            b'\'' | b'"' => {
                let (s, next) = lex_string(source, i)?;
                tokens.push((Token::Str(s), start));
                i = next;
            }
            b'0'..=b'9' => {
                let (n, next) = lex_number(source, i)?;
                tokens.push((Token::Num(n), start));
                i = next;
            }
            b'A'..=b'Z' | b'a'..=b'z' | b'_' | b'$' => {
                let mut j = i + 1;
                while j < bytes.len()
                    && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'_' || bytes[j] == b'$')
                {
                    j += 1;
                }
                tokens.push((Token::Ident(source[i..j].to_string()), start));
                i = j;
            }
            other => {
                return Err(err(start, format!("unexpected character '{}'", other as char)));
            }
        }
    }
    Ok(tokens)
}

/// String literal: `'` or `"` delimited, backslash escapes the next
/// character verbatim.
fn lex_string(source: &str, start: usize) -> Result<(String, usize), ExprError> {
    let bytes = source.as_bytes();
    let delim = bytes[start];
    let mut out = String::new();
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                let Some(escaped) = source[i + 1..].chars().next() else {
                    return Err(err(start, "unterminated string literal"));
                };
                out.push(escaped);
                i += 1 + escaped.len_utf8();
            }
            b if b == delim => return Ok((out, i + 1)),
            _ => {
                // Multi-byte UTF-8 sequences pass through untouched.
                let ch = source[i..].chars().next().unwrap_or('\u{fffd}');
                out.push(ch);
                i += ch.len_utf8();
            }
        }
    }
    Err(err(start, "unterminated string literal"))
}

/// Integer or decimal literal. No sign, no exponent.
fn lex_number(source: &str, start: usize) -> Result<(f64, usize), ExprError> {
    let bytes = source.as_bytes();
    let mut i = start;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if bytes.get(i) == Some(&b'.') && bytes.get(i + 1).is_some_and(u8::is_ascii_digit) {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }
    source[start..i]
        .parse::<f64>()
        .map(|n| (n, i))
        .map_err(|_| err(start, "invalid number literal"))
}
