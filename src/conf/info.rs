//! Reader for the INFO configuration syntax.
//!
//! ```text
//! ; comment
//! rule
//! {
//!   id "Simple rule"
//!   for data
//!   filter
//!   {
//!     type name
//!     name /a
//!     relation is-prefix-of
//!   }
//! }
//! ```
//!
//! Each entry is `key [value]` optionally followed by a `{ ... }` block, which
//! may start on the next line. Values containing whitespace or any of
//! `{ } ; "` must be quoted; quoted values understand C-style escapes.

use crate::conf::section::ConfigSection;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (line {line})")]
pub struct InfoParseError {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Text(String),
    Open,
    Close,
    Newline,
}

/// Parse INFO text into an unnamed root section.
pub fn parse_info(input: &str) -> Result<ConfigSection, InfoParseError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        position: 0,
    };
    let mut root = ConfigSection::default();
    for (key, child) in parser.parse_block(0)? {
        root.push(key, child);
    }
    Ok(root)
}

fn error(line: usize, message: impl Into<String>) -> InfoParseError {
    InfoParseError {
        line,
        message: message.into(),
    }
}

fn tokenize(input: &str) -> Result<Vec<(Token, usize)>, InfoParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    let mut line = 1;

    while let Some(c) = chars.next() {
        match c {
            '\n' => {
                tokens.push((Token::Newline, line));
                line += 1;
            }
            ';' => {
                while chars.next_if(|&next| next != '\n').is_some() {}
            }
            '{' => tokens.push((Token::Open, line)),
            '}' => tokens.push((Token::Close, line)),
            '"' => {
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => {
                            let escaped = match chars.next() {
                                Some('0') => '\0',
                                Some('a') => '\u{07}',
                                Some('b') => '\u{08}',
                                Some('f') => '\u{0C}',
                                Some('n') => '\n',
                                Some('r') => '\r',
                                Some('t') => '\t',
                                Some('v') => '\u{0B}',
                                Some(other @ ('"' | '\'' | '\\')) => other,
                                Some(other) => {
                                    return Err(error(line, format!("invalid escape sequence \\{}", other)))
                                }
                                None => return Err(error(line, "unterminated string")),
                            };
                            text.push(escaped);
                        }
                        Some('\n') | None => return Err(error(line, "unterminated string")),
                        Some(other) => text.push(other),
                    }
                }
                tokens.push((Token::Text(text), line));
            }
            c if c.is_whitespace() => {}
            c => {
                let mut text = String::from(c);
                while let Some(next) = chars.next_if(|&next| {
                    !next.is_whitespace() && !matches!(next, '{' | '}' | ';' | '"')
                }) {
                    text.push(next);
                }
                tokens.push((Token::Text(text), line));
            }
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    position: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position).map(|(token, _)| token)
    }

    fn last_line(&self) -> usize {
        self.tokens.last().map(|(_, line)| *line).unwrap_or(1)
    }

    fn parse_block(&mut self, depth: usize) -> Result<Vec<(String, ConfigSection)>, InfoParseError> {
        let mut entries = Vec::new();
        loop {
            let Some((token, line)) = self.tokens.get(self.position).cloned() else {
                if depth == 0 {
                    return Ok(entries);
                }
                return Err(error(self.last_line(), "unexpected end of input, expected '}'"));
            };
            self.position += 1;

            match token {
                Token::Newline => continue,
                Token::Close if depth > 0 => return Ok(entries),
                Token::Close => return Err(error(line, "unmatched '}'")),
                Token::Open => return Err(error(line, "unexpected '{' without a key")),
                Token::Text(key) => {
                    let value = match self.peek() {
                        Some(Token::Text(value)) => {
                            let value = value.clone();
                            self.position += 1;
                            value
                        }
                        _ => String::new(),
                    };
                    if let Some(Token::Text(extra)) = self.peek() {
                        return Err(error(line, format!("unexpected {} after value of {}", extra, key)));
                    }

                    let mut section = ConfigSection::new(value);
                    let resume = self.position;
                    while self.peek() == Some(&Token::Newline) {
                        self.position += 1;
                    }
                    if self.peek() == Some(&Token::Open) {
                        self.position += 1;
                        for (child_key, child) in self.parse_block(depth + 1)? {
                            section.push(child_key, child);
                        }
                    } else {
                        self.position = resume;
                    }
                    entries.push((key, section));
                }
            }
        }
    }
}
