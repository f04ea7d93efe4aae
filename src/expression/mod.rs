//! Rule expression compiler.
//!
//! A rule expression is a boolean combination of predicate calls:
//!
//! ```text
//! matchAnySource('table') AND NOT matchUpdatedBy('ingestion-bot')
//! ```
//!
//! [`compile`] turns the text into a [`CompiledExpression`]: an immutable tree
//! whose calls already hold a resolved [`Predicate`]. Compiling is a pure
//! function of the input text; there is no shared parser state.

mod lexer;
mod parser;

pub use parser::MAX_NESTING;

use itertools::Itertools;
use std::fmt;
use thiserror::Error;

use crate::event::ChangeEvent;
use crate::functions::Predicate;

/// Reasons a rule expression fails to compile. Columns are 1-based.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("rule expression is empty")]
    Empty,

    #[error("unexpected character '{ch}' at column {column}")]
    UnexpectedCharacter { ch: char, column: usize },

    #[error("unterminated string literal starting at column {column}")]
    UnterminatedString { column: usize },

    #[error("unbalanced parentheses at column {column}")]
    UnbalancedParentheses { column: usize },

    #[error("unknown function '{name}' at column {column}")]
    UnknownFunction { name: String, column: usize },

    #[error("malformed argument list for '{function}' at column {column}: {reason}")]
    MalformedArguments {
        function: String,
        column: usize,
        reason: String,
    },

    #[error("unexpected {found} at column {column}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: &'static str,
        column: usize,
    },

    #[error("unexpected end of expression, expected {expected}")]
    UnexpectedEnd { expected: &'static str },

    #[error("expression nested too deeply at column {column} (limit {})", MAX_NESTING)]
    NestingTooDeep { column: usize },
}

/// A node of a compiled rule expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(bool),
    Call { predicate: Predicate, args: Vec<String> },
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    fn precedence(&self) -> u8 {
        match self {
            Self::Or(..) => 1,
            Self::And(..) => 2,
            Self::Not(_) => 3,
            Self::Literal(_) | Self::Call { .. } => 4,
        }
    }

    fn write_operand(&self, f: &mut fmt::Formatter<'_>, min_precedence: u8) -> fmt::Result {
        if self.precedence() < min_precedence {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }

    fn collect_predicates(&self, out: &mut Vec<Predicate>) {
        match self {
            Self::Literal(_) => {}
            Self::Call { predicate, .. } => {
                if !out.contains(predicate) {
                    out.push(*predicate);
                }
            }
            Self::Not(inner) => inner.collect_predicates(out),
            Self::And(left, right) | Self::Or(left, right) => {
                left.collect_predicates(out);
                right.collect_predicates(out);
            }
        }
    }
}

/// Renders the canonical form, which compiles back to an equal tree.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => write!(f, "{value}"),
            Self::Call { predicate, args } => {
                let args = args
                    .iter()
                    .map(|arg| format!("'{}'", arg.replace('\'', "''")))
                    .join(", ");
                write!(f, "{}({})", predicate.name(), args)
            }
            Self::Not(inner) => {
                f.write_str("NOT ")?;
                inner.write_operand(f, 3)
            }
            Self::And(left, right) => {
                left.write_operand(f, 2)?;
                f.write_str(" AND ")?;
                right.write_operand(f, 3)
            }
            Self::Or(left, right) => {
                left.write_operand(f, 1)?;
                f.write_str(" OR ")?;
                right.write_operand(f, 2)
            }
        }
    }
}

/// A compiled rule expression, reusable across any number of events.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpression {
    source: String,
    root: Expr,
}

impl CompiledExpression {
    /// The rule text this expression was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &Expr {
        &self.root
    }

    /// The distinct predicates referenced, in order of first appearance.
    pub fn predicates(&self) -> Vec<Predicate> {
        let mut predicates = Vec::new();
        self.root.collect_predicates(&mut predicates);
        predicates
    }

    /// Shorthand for [`crate::evaluator::evaluate`].
    pub fn evaluate(&self, event: &ChangeEvent) -> bool {
        crate::evaluator::evaluate(self, event)
    }
}

impl fmt::Display for CompiledExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)
    }
}

/// Compiles a rule expression.
///
/// # Returns
/// * `Ok(CompiledExpression)` if the text is well formed and only calls known
///   predicates
/// * `Err(CompileError)` describing the first problem found
pub fn compile(rule: &str) -> Result<CompiledExpression, CompileError> {
    let tokens = lexer::tokenize(rule)?;
    let root = parser::Parser::new(&tokens).parse()?;
    Ok(CompiledExpression {
        source: rule.to_string(),
        root,
    })
}
