use std::fmt;

use super::CompileError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Ident(String),
    Str(String),
    Number(String),
    LParen,
    RParen,
    Comma,
    And,
    Or,
    Not,
    True,
    False,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(name) => write!(f, "identifier '{name}'"),
            Self::Str(value) => write!(f, "string '{value}'"),
            Self::Number(value) => write!(f, "number {value}"),
            Self::LParen => write!(f, "'('"),
            Self::RParen => write!(f, "')'"),
            Self::Comma => write!(f, "','"),
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
            Self::Not => write!(f, "NOT"),
            Self::True => write!(f, "true"),
            Self::False => write!(f, "false"),
        }
    }
}

/// A token and the 1-based column where it starts.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub column: usize,
}

pub(crate) fn tokenize(input: &str) -> Result<Vec<Spanned>, CompileError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let ch = chars[pos];
        let column = pos + 1;

        if ch.is_whitespace() {
            pos += 1;
            continue;
        }

        let token = match ch {
            '(' => single(&mut pos, Token::LParen),
            ')' => single(&mut pos, Token::RParen),
            ',' => single(&mut pos, Token::Comma),
            '!' => single(&mut pos, Token::Not),
            '&' | '|' => {
                if chars.get(pos + 1) != Some(&ch) {
                    return Err(CompileError::UnexpectedCharacter { ch, column });
                }
                pos += 2;
                if ch == '&' {
                    Token::And
                } else {
                    Token::Or
                }
            }
            '\'' | '"' => Token::Str(parse_string(&chars, &mut pos)?),
            c if c.is_ascii_digit() => Token::Number(take_while(&chars, &mut pos, |c| {
                c.is_ascii_digit() || c == '.'
            })),
            c if c.is_alphabetic() || c == '_' => {
                let word = take_while(&chars, &mut pos, |c| c.is_alphanumeric() || c == '_');
                keyword(&word).unwrap_or(Token::Ident(word))
            }
            _ => return Err(CompileError::UnexpectedCharacter { ch, column }),
        };

        tokens.push(Spanned { token, column });
    }

    Ok(tokens)
}

fn single(pos: &mut usize, token: Token) -> Token {
    *pos += 1;
    token
}

fn take_while(chars: &[char], pos: &mut usize, accept: impl Fn(char) -> bool) -> String {
    let start = *pos;
    while *pos < chars.len() && accept(chars[*pos]) {
        *pos += 1;
    }
    chars[start..*pos].iter().collect()
}

/// Operators and literals are case-insensitive.
fn keyword(word: &str) -> Option<Token> {
    match word.to_ascii_lowercase().as_str() {
        "and" => Some(Token::And),
        "or" => Some(Token::Or),
        "not" => Some(Token::Not),
        "true" => Some(Token::True),
        "false" => Some(Token::False),
        _ => None,
    }
}

/// Reads a quoted literal starting at `pos`. A doubled quote character
/// inside the literal stands for one quote.
fn parse_string(chars: &[char], pos: &mut usize) -> Result<String, CompileError> {
    let quote = chars[*pos];
    let column = *pos + 1;
    *pos += 1;

    let mut value = String::new();
    loop {
        match chars.get(*pos) {
            None => return Err(CompileError::UnterminatedString { column }),
            Some(&c) if c == quote => {
                if chars.get(*pos + 1) == Some(&quote) {
                    value.push(quote);
                    *pos += 2;
                } else {
                    *pos += 1;
                    return Ok(value);
                }
            }
            Some(&c) => {
                value.push(c);
                *pos += 1;
            }
        }
    }
}
