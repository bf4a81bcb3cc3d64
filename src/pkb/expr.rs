//! Arithmetic expression normalisation for pattern matching.
//!
//! Expressions are reduced to postfix token sequences with a shunting-yard
//! pass. Two expressions are a full match when their postfix forms are equal;
//! a sub-expression matches when its postfix form appears contiguously inside
//! the other.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while normalising an expression.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExprError {
    /// Input contained no tokens.
    #[error("expression is empty")]
    Empty,
    /// A character outside the expression grammar.
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar {
        /// Offending character.
        ch: char,
        /// Byte offset in the input.
        offset: usize,
    },
    /// Parentheses do not pair up.
    #[error("unbalanced parentheses")]
    UnbalancedParens,
    /// An operator is missing an operand, or operands lack an operator.
    #[error("malformed expression")]
    Malformed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token {
    Operand(String),
    Operator(char),
    Open,
    Close,
}

fn precedence(op: char) -> u8 {
    match op {
        '*' | '/' | '%' => 2,
        _ => 1,
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();
    while let Some(&(offset, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
        } else if ch.is_ascii_alphanumeric() {
            let mut word = String::new();
            while let Some(&(_, c)) = chars.peek() {
                if !c.is_ascii_alphanumeric() {
                    break;
                }
                word.push(c);
                chars.next();
            }
            let starts_with_digit = word.starts_with(|c: char| c.is_ascii_digit());
            if starts_with_digit && !word.chars().all(|c| c.is_ascii_digit()) {
                return Err(ExprError::UnexpectedChar { ch, offset });
            }
            tokens.push(Token::Operand(word));
        } else {
            let token = match ch {
                '+' | '-' | '*' | '/' | '%' => Token::Operator(ch),
                '(' => Token::Open,
                ')' => Token::Close,
                _ => return Err(ExprError::UnexpectedChar { ch, offset }),
            };
            tokens.push(token);
            chars.next();
        }
    }
    Ok(tokens)
}

/// Expression in postfix order.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Postfix(Vec<String>);

impl Postfix {
    /// Parses and normalises an infix expression.
    pub fn parse(input: &str) -> Result<Self, ExprError> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Err(ExprError::Empty);
        }
        let mut output = Vec::with_capacity(tokens.len());
        let mut ops: Vec<Token> = Vec::new();
        // Alternates between expecting an operand and an operator.
        let mut expect_operand = true;
        for token in tokens {
            match token {
                Token::Operand(name) => {
                    if !expect_operand {
                        return Err(ExprError::Malformed);
                    }
                    output.push(name);
                    expect_operand = false;
                }
                Token::Operator(op) => {
                    if expect_operand {
                        return Err(ExprError::Malformed);
                    }
                    while let Some(Token::Operator(top)) = ops.last() {
                        if precedence(*top) < precedence(op) {
                            break;
                        }
                        output.push(top.to_string());
                        ops.pop();
                    }
                    ops.push(Token::Operator(op));
                    expect_operand = true;
                }
                Token::Open => {
                    if !expect_operand {
                        return Err(ExprError::Malformed);
                    }
                    ops.push(Token::Open);
                }
                Token::Close => {
                    if expect_operand {
                        return Err(ExprError::Malformed);
                    }
                    loop {
                        match ops.pop() {
                            Some(Token::Operator(op)) => output.push(op.to_string()),
                            Some(Token::Open) => break,
                            _ => return Err(ExprError::UnbalancedParens),
                        }
                    }
                }
            }
        }
        if expect_operand {
            return Err(ExprError::Malformed);
        }
        while let Some(token) = ops.pop() {
            match token {
                Token::Operator(op) => output.push(op.to_string()),
                _ => return Err(ExprError::UnbalancedParens),
            }
        }
        Ok(Self(output))
    }

    /// Postfix tokens.
    pub fn tokens(&self) -> &[String] {
        &self.0
    }

    /// True when `sub` is a complete sub-expression of `self`.
    pub fn contains(&self, sub: &Postfix) -> bool {
        if sub.0.is_empty() {
            return true;
        }
        self.0.windows(sub.0.len()).any(|window| window == sub.0.as_slice())
    }
}

impl fmt::Display for Postfix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

/// Right-hand-side constraint of an assignment pattern.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExprMatch {
    /// Any right-hand side.
    #[default]
    Any,
    /// Whole right-hand side equals the expression.
    Full(Postfix),
    /// Expression occurs as a sub-expression.
    Partial(Postfix),
}

impl ExprMatch {
    /// True when `rhs` satisfies the constraint.
    pub fn matches(&self, rhs: &Postfix) -> bool {
        match self {
            ExprMatch::Any => true,
            ExprMatch::Full(expected) => rhs == expected,
            ExprMatch::Partial(sub) => rhs.contains(sub),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn postfix(input: &str) -> String {
        Postfix::parse(input).expect("parse").to_string()
    }

    #[test]
    fn respects_precedence_and_associativity() {
        assert_eq!(postfix("x + 1"), "x 1 +");
        assert_eq!(postfix("x * 2 - 3 % 1"), "x 2 * 3 1 % -");
        assert_eq!(postfix("a - b - c"), "a b - c -");
        assert_eq!(postfix("(a + b) * c"), "a b + c *");
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(Postfix::parse("   "), Err(ExprError::Empty));
        assert_eq!(Postfix::parse("a +"), Err(ExprError::Malformed));
        assert_eq!(Postfix::parse("(a + b"), Err(ExprError::UnbalancedParens));
        assert_eq!(Postfix::parse("a + b)"), Err(ExprError::UnbalancedParens));
        assert!(matches!(
            Postfix::parse("a = b"),
            Err(ExprError::UnexpectedChar { ch: '=', .. })
        ));
        assert!(Postfix::parse("1a").is_err());
    }

    #[test]
    fn partial_match_respects_tree_shape() {
        let rhs = Postfix::parse("a + b * c").expect("parse");
        assert!(rhs.contains(&Postfix::parse("b * c").expect("parse")));
        assert!(!rhs.contains(&Postfix::parse("a + b").expect("parse")));
        assert!(rhs.contains(&Postfix::parse("a").expect("parse")));
    }

    #[test]
    fn tokens_compare_whole_names() {
        let rhs = Postfix::parse("number / 10").expect("parse");
        assert!(!rhs.contains(&Postfix::parse("num").expect("parse")));
        assert!(rhs.contains(&Postfix::parse("10").expect("parse")));
    }

    #[test]
    fn full_match_requires_equal_tree() {
        let rhs = Postfix::parse("sum + digit").expect("parse");
        let full = ExprMatch::Full(Postfix::parse("(sum) + (digit)").expect("parse"));
        assert!(full.matches(&rhs));
        let other = ExprMatch::Full(Postfix::parse("sum").expect("parse"));
        assert!(!other.matches(&rhs));
        assert!(ExprMatch::Any.matches(&rhs));
    }
}
