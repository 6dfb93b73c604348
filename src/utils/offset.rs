//! Evaluation of the load offset given on the command line.
//!
//! Besides plain numbers, small expressions are accepted so that addresses can
//! be written the way they appear in linker scripts and memory maps:
//!
//! ```text
//! 4096    0x1000    0o10000    0b1_0000_0000_0000
//! 0x8000_0000 + 64 * 1024      1 << 12      (0x100 + 0x10) * 2
//! ```
//!
//! The operators are, from the tightest binding to the loosest: unary `-`,
//! `*` `/` `//` `%`, `+` `-`, `<<` `>>`, `&`, `^`, `|`. Division rounds down
//! and `%` takes the sign of the divisor. Intermediate values may be negative
//! but the result must fit in 32 bits.

use std::convert::TryFrom;

use crate::error::{Error, Result};

// =============================================================================
// Public Interface
// =============================================================================

/// Evaluates `input` to a load offset.
pub fn parse_offset(input: &str) -> Result<u32> {
    let invalid = || Error::InvalidOffset(input.to_owned());

    let tokens = tokenize(input).ok_or_else(invalid)?;
    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.expr().ok_or_else(invalid)?;
    if parser.pos != parser.tokens.len() || value < 0 || value > u32::MAX as i64 {
        return Err(invalid());
    }
    Ok(value as u32)
}

// =============================================================================
// Private stuff
// =============================================================================

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Token {
    Num(i64),
    Plus,
    Minus,
    Star,
    Div,
    Mod,
    Shl,
    Shr,
    And,
    Xor,
    Or,
    Open,
    Close,
}

fn tokenize(input: &str) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' => {
                chars.next();
            }
            '+' | '-' | '*' | '%' | '&' | '^' | '|' | '(' | ')' => {
                chars.next();
                tokens.push(match c {
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '*' => Token::Star,
                    '%' => Token::Mod,
                    '&' => Token::And,
                    '^' => Token::Xor,
                    '|' => Token::Or,
                    '(' => Token::Open,
                    _ => Token::Close,
                });
            }
            '/' => {
                // `/` and `//` both divide rounding down.
                chars.next();
                if chars.peek() == Some(&'/') {
                    chars.next();
                }
                tokens.push(Token::Div);
            }
            '<' | '>' => {
                chars.next();
                if chars.next() != Some(c) {
                    return None;
                }
                tokens.push(if c == '<' { Token::Shl } else { Token::Shr });
            }
            '0'..='9' => {
                let mut literal = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_alphanumeric() || d == '_' {
                        literal.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Num(parse_literal(&literal)?));
            }
            _ => return None,
        }
    }
    Some(tokens)
}

fn parse_literal(literal: &str) -> Option<i64> {
    let digits = literal.replace('_', "");
    let lower = digits.to_ascii_lowercase();
    let (radix, body) = if let Some(hex) = lower.strip_prefix("0x") {
        (16, hex)
    } else if let Some(oct) = lower.strip_prefix("0o") {
        (8, oct)
    } else if let Some(bin) = lower.strip_prefix("0b") {
        (2, bin)
    } else {
        (10, lower.as_str())
    };
    if body.is_empty() {
        return None;
    }
    i64::from_str_radix(body, radix).ok()
}

fn floor_div(lhs: i64, rhs: i64) -> Option<i64> {
    let quotient = lhs.checked_div(rhs)?;
    if lhs % rhs != 0 && (lhs < 0) != (rhs < 0) {
        quotient.checked_sub(1)
    } else {
        Some(quotient)
    }
}

fn floor_mod(lhs: i64, rhs: i64) -> Option<i64> {
    let rem = lhs.checked_rem(rhs)?;
    if rem != 0 && (rem < 0) != (rhs < 0) {
        Some(rem + rhs)
    } else {
        Some(rem)
    }
}

/// Recursive descent over the tokens, one method per precedence level, from
/// the loosest (`|`) to the tightest (unary minus).
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}
impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn expr(&mut self) -> Option<i64> {
        let mut value = self.xor()?;
        while let Some(Token::Or) = self.peek() {
            self.pos += 1;
            value |= self.xor()?;
        }
        Some(value)
    }

    fn xor(&mut self) -> Option<i64> {
        let mut value = self.and()?;
        while let Some(Token::Xor) = self.peek() {
            self.pos += 1;
            value ^= self.and()?;
        }
        Some(value)
    }

    fn and(&mut self) -> Option<i64> {
        let mut value = self.shift()?;
        while let Some(Token::And) = self.peek() {
            self.pos += 1;
            value &= self.shift()?;
        }
        Some(value)
    }

    fn shift(&mut self) -> Option<i64> {
        let mut value = self.sum()?;
        while let Some(op @ (Token::Shl | Token::Shr)) = self.peek() {
            self.pos += 1;
            let amount = u32::try_from(self.sum()?).ok().filter(|a| *a < 64)?;
            value = if op == Token::Shl {
                value.checked_shl(amount)?
            } else {
                value.checked_shr(amount)?
            };
        }
        Some(value)
    }

    fn sum(&mut self) -> Option<i64> {
        let mut value = self.product()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.pos += 1;
            let rhs = self.product()?;
            value = if op == Token::Plus {
                value.checked_add(rhs)?
            } else {
                value.checked_sub(rhs)?
            };
        }
        Some(value)
    }

    fn product(&mut self) -> Option<i64> {
        let mut value = self.unary()?;
        while let Some(op @ (Token::Star | Token::Div | Token::Mod)) = self.peek() {
            self.pos += 1;
            let rhs = self.unary()?;
            value = match op {
                Token::Star => value.checked_mul(rhs)?,
                Token::Div => floor_div(value, rhs)?,
                _ => floor_mod(value, rhs)?,
            };
        }
        Some(value)
    }

    fn unary(&mut self) -> Option<i64> {
        if let Some(Token::Minus) = self.peek() {
            self.pos += 1;
            return self.unary()?.checked_neg();
        }
        self.atom()
    }

    fn atom(&mut self) -> Option<i64> {
        let token = self.peek()?;
        self.pos += 1;
        match token {
            Token::Num(n) => Some(n),
            Token::Open => {
                let value = self.expr()?;
                if self.peek()? != Token::Close {
                    return None;
                }
                self.pos += 1;
                Some(value)
            }
            _ => None,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[test]
fn plain_numbers() {
    assert_eq!(parse_offset("0").unwrap(), 0);
    assert_eq!(parse_offset("4096").unwrap(), 4096);
    assert_eq!(parse_offset("0x1000").unwrap(), 0x1000);
    assert_eq!(parse_offset("0X1000").unwrap(), 0x1000);
    assert_eq!(parse_offset("0o17").unwrap(), 0o17);
    assert_eq!(parse_offset("0b101").unwrap(), 5);
    assert_eq!(parse_offset("0x8000_0000").unwrap(), 0x8000_0000);
    assert_eq!(parse_offset("  42 ").unwrap(), 42);
}

#[test]
fn expressions() {
    assert_eq!(parse_offset("0x1000 + 0x200").unwrap(), 0x1200);
    assert_eq!(parse_offset("0x80000000 + 64 * 1024").unwrap(), 0x8001_0000);
    assert_eq!(parse_offset("1 << 12").unwrap(), 4096);
    assert_eq!(parse_offset("1 << 4 + 4").unwrap(), 256);
    assert_eq!(parse_offset("(0x100 + 0x10) * 2").unwrap(), 0x220);
    assert_eq!(parse_offset("0x2000 - 0x1000").unwrap(), 0x1000);
    assert_eq!(parse_offset("0x100 >> 4").unwrap(), 0x10);
}

#[test]
fn division_and_bitwise_operators() {
    assert_eq!(parse_offset("0x2000 / 2").unwrap(), 0x1000);
    assert_eq!(parse_offset("7 // 2").unwrap(), 3);
    assert_eq!(parse_offset("7 / 2 * 2").unwrap(), 6);
    assert_eq!(parse_offset("0x1234 % 0x100").unwrap(), 0x34);
    assert_eq!(parse_offset("-7 % 3").unwrap(), 2);
    assert_eq!(parse_offset("(-7 // 2) + 5").unwrap(), 1);
    assert_eq!(parse_offset("0x8000_0000 | 0x100").unwrap(), 0x8000_0100);
    assert!(parse_offset("0x1fff & ~0").is_err());
    assert_eq!(parse_offset("0x12345 & 0xfff0_0000 | 0x80").unwrap(), 0x80);
    assert_eq!(parse_offset("0xff ^ 0x0f").unwrap(), 0xf0);
    assert_eq!(parse_offset("1 | 2 ^ 3 & 4").unwrap(), 1 | (2 ^ (3 & 4)));
    assert_eq!(parse_offset("0x100 + -0x10").unwrap(), 0xf0);
    assert_eq!(parse_offset("1 << 2 & 0xff").unwrap(), 4);
}

#[test]
fn rejects_garbage() {
    for input in &[
        "", "abc", "0x", "1 +", "(1", "1)", "1 < 2", "0x1_0000_0000", "1 - 2", "4 ** 2", "1 << 64",
        "1 / 0", "1 % 0", "-1", "1 && 2", "1 /// 2",
    ] {
        match parse_offset(input) {
            Err(Error::InvalidOffset(s)) => assert_eq!(&s, input),
            other => panic!("`{}` gave {:?}", input, other),
        }
    }
}
