use crate::{
    lexer::{LexError, Lexer},
    token::{Token, TokenKind},
    value::Value,
};
use indexmap::IndexMap;
use std::mem;

/// Errors produced while assembling tokens into a document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Lexical failure surfaced while pulling the next token
    Lex(LexError),

    /// A token that does not fit the grammar at this point
    UnexpectedToken {
        expected: &'static str,
        found: String,
        pos: usize,
    },

    /// A complete value followed by more non-whitespace input
    TrailingContent { pos: usize },
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Lex(e) => write!(f, "{}", e),
            ParseError::UnexpectedToken {
                expected,
                found,
                pos,
            } => write!(f, "expected {}, got {} at position {}", expected, found, pos),
            ParseError::TrailingContent { pos } => {
                write!(f, "trailing content after document at position {}", pos)
            }
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::Lex(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        ParseError::Lex(e)
    }
}

/// Recursive-descent parser with one token of lookahead.
pub struct Parser {
    lexer: Lexer,
    current: Token,
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> Result<Self, ParseError> {
        let current = lexer.next_token()?;
        Ok(Parser { lexer, current })
    }

    fn advance(&mut self) -> Result<(), ParseError> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    fn check(&self, kind: &TokenKind) -> bool {
        mem::discriminant(&self.current.kind) == mem::discriminant(kind)
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), ParseError> {
        if !self.check(&kind) {
            return Err(self.unexpected(kind.describe()));
        }
        self.advance()
    }

    fn unexpected(&self, expected: &'static str) -> ParseError {
        ParseError::UnexpectedToken {
            expected,
            found: self.current.kind.describe().to_string(),
            pos: self.current.pos,
        }
    }

    /// Parse one value: object, array, string, number or keyword.
    pub fn parse_value(&mut self) -> Result<Value, ParseError> {
        match mem::replace(&mut self.current.kind, TokenKind::Eof) {
            TokenKind::String(s) => {
                self.advance()?;
                Ok(Value::String(s))
            }
            TokenKind::Integer(n) => {
                self.advance()?;
                Ok(Value::Integer(n))
            }
            TokenKind::Float(n) => {
                self.advance()?;
                Ok(Value::Float(n))
            }
            TokenKind::Boolean(b) => {
                self.advance()?;
                Ok(Value::Boolean(b))
            }
            TokenKind::Null => {
                self.advance()?;
                Ok(Value::Null)
            }
            TokenKind::LBrace => {
                self.advance()?;
                self.parse_object()
            }
            TokenKind::LBracket => {
                self.advance()?;
                self.parse_array()
            }
            other => {
                // put the token back so the error names what was found
                self.current.kind = other;
                Err(self.unexpected("a value"))
            }
        }
    }

    fn parse_object(&mut self) -> Result<Value, ParseError> {
        let mut map = IndexMap::new();

        if self.check(&TokenKind::RBrace) {
            self.advance()?;
            return Ok(Value::Object(map));
        }

        loop {
            let key = match mem::replace(&mut self.current.kind, TokenKind::Eof) {
                TokenKind::String(s) => {
                    self.advance()?;
                    s
                }
                other => {
                    self.current.kind = other;
                    return Err(self.unexpected("string key"));
                }
            };

            self.expect(TokenKind::Colon)?;
            let value = self.parse_value()?;
            map.insert(key, value); // duplicate keys: last write wins

            if self.check(&TokenKind::Comma) {
                self.advance()?;
            } else {
                self.expect(TokenKind::RBrace)?;
                return Ok(Value::Object(map));
            }
        }
    }

    fn parse_array(&mut self) -> Result<Value, ParseError> {
        let mut items = Vec::new();

        if self.check(&TokenKind::RBracket) {
            self.advance()?;
            return Ok(Value::Array(items));
        }

        loop {
            items.push(self.parse_value()?);

            if self.check(&TokenKind::Comma) {
                self.advance()?;
            } else {
                self.expect(TokenKind::RBracket)?;
                return Ok(Value::Array(items));
            }
        }
    }

    /// Parse a complete document, requiring the whole input be consumed.
    pub fn parse(&mut self) -> Result<Value, ParseError> {
        let value = self.parse_value()?;
        if !self.check(&TokenKind::Eof) {
            return Err(ParseError::TrailingContent {
                pos: self.current.pos,
            });
        }
        Ok(value)
    }
}

/// Parse `text` as one JSON document.
///
/// Fails on the first lexical or structural error; no partial document is
/// ever returned.
pub fn parse(text: &str) -> Result<Value, ParseError> {
    let mut parser = Parser::new(Lexer::new(text))?;
    parser.parse()
}
