//! Recursive-descent parser for rule expressions.
//!
//! Precedence, tightest first: `NOT`, `AND`, `OR`. Binary operators are
//! left-associative.
//!
//! Both the parser's recursion and the height of the resulting tree are
//! bounded by [`MAX_NESTING`]; evaluation, rendering and dropping of an
//! [`Expr`] all recurse over the tree.

use super::lexer::{Spanned, Token};
use super::{CompileError, Expr};
use crate::functions::Predicate;

/// The deepest nesting of `(`, `NOT` and binary operators a rule may use.
pub const MAX_NESTING: usize = 256;

/// A parsed subtree and its height.
struct Node {
    expr: Expr,
    height: usize,
}

impl Node {
    fn leaf(expr: Expr) -> Self {
        Self { expr, height: 1 }
    }
}

pub(crate) struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    nesting: usize,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(tokens: &'a [Spanned]) -> Self {
        Self {
            tokens,
            pos: 0,
            nesting: 0,
        }
    }

    /// Parses the whole token stream as one expression.
    pub(crate) fn parse(mut self) -> Result<Expr, CompileError> {
        if self.tokens.is_empty() {
            return Err(CompileError::Empty);
        }

        let node = self.parse_or()?;

        if let Some(extra) = self.peek() {
            return Err(match extra.token {
                Token::RParen => CompileError::UnbalancedParentheses {
                    column: extra.column,
                },
                _ => CompileError::UnexpectedToken {
                    found: extra.token.to_string(),
                    expected: "AND, OR or end of expression",
                    column: extra.column,
                },
            });
        }

        Ok(node.expr)
    }

    fn peek(&self) -> Option<&'a Spanned> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Spanned> {
        let spanned = self.tokens.get(self.pos);
        if spanned.is_some() {
            self.pos += 1;
        }
        spanned
    }

    /// Consumes `token` if it is next, returning its column.
    fn eat(&mut self, token: &Token) -> Option<usize> {
        match self.peek() {
            Some(spanned) if &spanned.token == token => {
                self.pos += 1;
                Some(spanned.column)
            }
            _ => None,
        }
    }

    fn enter(&mut self, column: usize) -> Result<(), CompileError> {
        self.nesting += 1;
        if self.nesting > MAX_NESTING {
            return Err(CompileError::NestingTooDeep { column });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.nesting -= 1;
    }

    fn parse_or(&mut self) -> Result<Node, CompileError> {
        let mut left = self.parse_and()?;
        while let Some(column) = self.eat(&Token::Or) {
            let right = self.parse_and()?;
            left = join(Expr::Or, left, right, column)?;
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Node, CompileError> {
        let mut left = self.parse_unary()?;
        while let Some(column) = self.eat(&Token::And) {
            let right = self.parse_unary()?;
            left = join(Expr::And, left, right, column)?;
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Node, CompileError> {
        let Some(column) = self.eat(&Token::Not) else {
            return self.parse_primary();
        };

        self.enter(column)?;
        let inner = self.parse_unary()?;
        self.leave();

        let height = inner.height + 1;
        if height > MAX_NESTING {
            return Err(CompileError::NestingTooDeep { column });
        }
        Ok(Node {
            expr: Expr::Not(Box::new(inner.expr)),
            height,
        })
    }

    fn parse_primary(&mut self) -> Result<Node, CompileError> {
        let Some(spanned) = self.next() else {
            return Err(CompileError::UnexpectedEnd {
                expected: "a function call, '(' or NOT",
            });
        };

        match &spanned.token {
            Token::LParen => {
                self.enter(spanned.column)?;
                let inner = self.parse_or()?;
                if self.eat(&Token::RParen).is_none() {
                    return Err(CompileError::UnbalancedParentheses {
                        column: spanned.column,
                    });
                }
                self.leave();
                Ok(inner)
            }
            Token::True => Ok(Node::leaf(Expr::Literal(true))),
            Token::False => Ok(Node::leaf(Expr::Literal(false))),
            Token::Ident(name) => self.parse_call(name, spanned.column).map(Node::leaf),
            other => Err(CompileError::UnexpectedToken {
                found: other.to_string(),
                expected: "a function call, '(' or NOT",
                column: spanned.column,
            }),
        }
    }

    fn parse_call(&mut self, name: &str, column: usize) -> Result<Expr, CompileError> {
        let predicate = Predicate::from_name(name).ok_or_else(|| CompileError::UnknownFunction {
            name: name.to_string(),
            column,
        })?;

        if self.eat(&Token::LParen).is_none() {
            return Err(malformed(name, column, "expected '(' after function name"));
        }

        let mut args = Vec::new();
        if self.eat(&Token::RParen).is_some() {
            return Ok(Expr::Call { predicate, args });
        }

        loop {
            match self.next() {
                Some(Spanned {
                    token: Token::Str(value),
                    ..
                }) => args.push(value.clone()),
                Some(Spanned {
                    token: Token::RParen,
                    ..
                }) => return Err(malformed(name, column, "trailing ',' before ')'")),
                Some(other) => {
                    return Err(malformed(
                        name,
                        column,
                        &format!("expected a quoted string, found {}", other.token),
                    ))
                }
                None => return Err(CompileError::UnbalancedParentheses { column }),
            }

            match self.next() {
                Some(Spanned {
                    token: Token::Comma,
                    ..
                }) => continue,
                Some(Spanned {
                    token: Token::RParen,
                    ..
                }) => break,
                Some(other) => {
                    return Err(malformed(
                        name,
                        column,
                        &format!("expected ',' or ')', found {}", other.token),
                    ))
                }
                None => return Err(CompileError::UnbalancedParentheses { column }),
            }
        }

        Ok(Expr::Call { predicate, args })
    }
}

/// Builds a binary node, rejecting it if the tree would grow too tall.
fn join(
    op: fn(Box<Expr>, Box<Expr>) -> Expr,
    left: Node,
    right: Node,
    column: usize,
) -> Result<Node, CompileError> {
    let height = left.height.max(right.height) + 1;
    if height > MAX_NESTING {
        return Err(CompileError::NestingTooDeep { column });
    }
    Ok(Node {
        expr: op(Box::new(left.expr), Box::new(right.expr)),
        height,
    })
}

fn malformed(function: &str, column: usize, reason: &str) -> CompileError {
    CompileError::MalformedArguments {
        function: function.to_string(),
        column,
        reason: reason.to_string(),
    }
}
