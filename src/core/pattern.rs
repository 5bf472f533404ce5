//! Layout patterns
//!
//! A pattern string is compiled once into a token sequence which the
//! [`Formatter`](super::formatter::Formatter) walks on every render.
//!
//! | Token   | Renders                                   |
//! |---------|-------------------------------------------|
//! | `{ts}`  | local time as `[HH:MM:SS]`                |
//! | `{lvl}` | level keyword as `[INFO]`                 |
//! | `{tag}` | logger tag as `[tag]`                     |
//! | `{msg}` | a separating space, then the message body |
//! | `{}`    | the next call argument                    |
//! | `{{` `}}` | literal braces                          |
//!
//! Anything else is literal text.

use super::error::{LoggerError, Result};
use std::fmt;
use std::str::FromStr;

/// Layout used when no pattern (or an empty one) is configured
pub const DEFAULT_PATTERN: &str = "{ts}{lvl}{tag}{msg}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Literal(String),
    Timestamp,
    Level,
    Tag,
    Message,
    Argument,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    tokens: Vec<Token>,
}

impl Pattern {
    /// Compile a pattern string. An empty string yields the default pattern.
    pub fn compile(source: &str) -> Result<Self> {
        if source.is_empty() {
            return Ok(Self::default());
        }

        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' if chars.peek().map(|&(_, n)| n) == Some('{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek().map(|&(_, n)| n) == Some('}') => {
                    chars.next();
                    literal.push('}');
                }
                '}' => {
                    return Err(LoggerError::pattern(
                        source,
                        format!("unmatched '}}' at byte {}", pos),
                    ));
                }
                '{' => {
                    let rest = &source[pos + 1..];
                    let close = rest.find('}').ok_or_else(|| {
                        LoggerError::pattern(source, format!("unterminated token at byte {}", pos))
                    })?;
                    let token = match &rest[..close] {
                        "ts" => Token::Timestamp,
                        "lvl" => Token::Level,
                        "tag" => Token::Tag,
                        "msg" => Token::Message,
                        "" => Token::Argument,
                        other => {
                            return Err(LoggerError::pattern(
                                source,
                                format!("unknown token '{{{}}}'", other),
                            ))
                        }
                    };
                    if !literal.is_empty() {
                        tokens.push(Token::Literal(std::mem::take(&mut literal)));
                    }
                    tokens.push(token);
                    // skip the token name and its closing brace
                    for _ in 0..=close {
                        chars.next();
                    }
                }
                other => literal.push(other),
            }
        }

        if !literal.is_empty() {
            tokens.push(Token::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            tokens,
        })
    }

    /// Compile `source`, silently falling back to the default pattern when it
    /// does not parse.
    pub fn compile_or_default(source: &str) -> Self {
        Self::compile(source).unwrap_or_default()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_default(&self) -> bool {
        self.source == DEFAULT_PATTERN
    }

    /// Whether rendering needs the wall clock
    pub fn has_timestamp(&self) -> bool {
        self.tokens.contains(&Token::Timestamp)
    }

    pub fn has_message(&self) -> bool {
        self.tokens.contains(&Token::Message)
    }
}

impl Default for Pattern {
    fn default() -> Self {
        Self {
            source: DEFAULT_PATTERN.to_string(),
            tokens: vec![Token::Timestamp, Token::Level, Token::Tag, Token::Message],
        }
    }
}

impl FromStr for Pattern {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::compile(s)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
