//! Lexer for JSONPath expressions

use std::iter::Peekable;
use std::str::Chars;

use crate::ErrorKind;

/// Token types for the JSONPath dialect
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Root identifier `$`
    Root,
    /// Current node `@`
    At,
    /// Single dot `.`
    Dot,
    /// Double dot `..`
    DotDot,
    /// Opening bracket `[`
    BracketOpen,
    /// Closing bracket `]`
    BracketClose,
    /// Opening parenthesis `(`
    ParenOpen,
    /// Closing parenthesis `)`
    ParenClose,
    /// Wildcard `*`
    Wildcard,
    /// Colon `:`
    Colon,
    /// Comma `,`
    Comma,
    /// Question mark `?` (filter indicator)
    Question,
    /// Less than `<`
    LessThan,
    /// Greater than `>`
    GreaterThan,
    /// Less than or equal `<=`
    LessEq,
    /// Greater than or equal `>=`
    GreaterEq,
    /// Equal `==`
    Equal,
    /// Not equal `!=`
    NotEqual,
    /// Logical AND `&&`
    And,
    /// Logical OR `||`
    Or,
    /// Logical NOT `!`
    Not,
    /// Boolean `true` literal
    True,
    /// Boolean `false` literal
    False,
    /// Identifier (unquoted key name)
    Ident(String),
    /// String literal (single or double quoted, escapes decoded)
    String(String),
    /// Signed decimal integer
    Number(i64),
}

/// Token with its byte offset into the expression
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

/// Lexical error: structured kind plus byte offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexError {
    pub kind: ErrorKind,
    pub position: usize,
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "at byte {}: {}", self.position, self.kind)
    }
}

/// Lexer for tokenizing JSONPath expressions
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            position: 0,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }

        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        self.skip_whitespace();

        let Some(&ch) = self.chars.peek() else {
            return Ok(None);
        };

        let start_pos = self.position;

        let kind = match ch {
            '$' => {
                self.advance();
                TokenKind::Root
            }
            '@' => {
                self.advance();
                TokenKind::At
            }
            '.' => {
                self.advance();
                if self.chars.peek() == Some(&'.') {
                    self.advance();
                    TokenKind::DotDot
                } else {
                    TokenKind::Dot
                }
            }
            '[' => {
                self.advance();
                TokenKind::BracketOpen
            }
            ']' => {
                self.advance();
                TokenKind::BracketClose
            }
            '(' => {
                self.advance();
                TokenKind::ParenOpen
            }
            ')' => {
                self.advance();
                TokenKind::ParenClose
            }
            '*' => {
                self.advance();
                TokenKind::Wildcard
            }
            ':' => {
                self.advance();
                TokenKind::Colon
            }
            ',' => {
                self.advance();
                TokenKind::Comma
            }
            '?' => {
                self.advance();
                TokenKind::Question
            }
            '<' => {
                self.advance();
                if self.chars.peek() == Some(&'=') {
                    self.advance();
                    TokenKind::LessEq
                } else {
                    TokenKind::LessThan
                }
            }
            '>' => {
                self.advance();
                if self.chars.peek() == Some(&'=') {
                    self.advance();
                    TokenKind::GreaterEq
                } else {
                    TokenKind::GreaterThan
                }
            }
            '=' => {
                self.advance();
                if self.chars.peek() == Some(&'=') {
                    self.advance();
                    TokenKind::Equal
                } else {
                    return Err(LexError {
                        kind: ErrorKind::UnexpectedChar,
                        position: start_pos,
                    });
                }
            }
            '!' => {
                self.advance();
                if self.chars.peek() == Some(&'=') {
                    self.advance();
                    TokenKind::NotEqual
                } else {
                    TokenKind::Not
                }
            }
            '&' => {
                self.advance();
                if self.chars.peek() == Some(&'&') {
                    self.advance();
                    TokenKind::And
                } else {
                    return Err(LexError {
                        kind: ErrorKind::UnexpectedChar,
                        position: start_pos,
                    });
                }
            }
            '|' => {
                self.advance();
                if self.chars.peek() == Some(&'|') {
                    self.advance();
                    TokenKind::Or
                } else {
                    return Err(LexError {
                        kind: ErrorKind::UnexpectedChar,
                        position: start_pos,
                    });
                }
            }
            '\'' | '"' => self.read_string()?,
            '-' | '0'..='9' => self.read_number()?,
            _ if is_ident_start(ch) => self.read_ident_or_keyword(),
            _ => {
                return Err(LexError {
                    kind: ErrorKind::UnexpectedChar,
                    position: self.position,
                });
            }
        };

        Ok(Some(Token {
            kind,
            position: start_pos,
        }))
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.chars.next();
        if let Some(c) = ch {
            self.position += c.len_utf8();
        }
        ch
    }

    fn skip_whitespace(&mut self) {
        while let Some(&ch) = self.chars.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_string(&mut self) -> Result<TokenKind, LexError> {
        let start_pos = self.position;
        let Some(quote) = self.advance() else {
            return Err(LexError {
                kind: ErrorKind::UnterminatedString,
                position: start_pos,
            });
        };

        let mut value = String::new();

        loop {
            match self.advance() {
                Some(ch) if ch == quote => break,
                Some('\\') => {
                    // the backslash is a single byte
                    let esc_pos = self.position - 1;
                    match self.advance() {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('r') => value.push('\r'),
                        Some('b') => value.push('\u{0008}'),
                        Some('f') => value.push('\u{000C}'),
                        Some('/') => value.push('/'),
                        Some('\\') => value.push('\\'),
                        Some('\'') => value.push('\''),
                        Some('"') => value.push('"'),
                        Some('u') => value.push(self.read_unicode_escape(start_pos, esc_pos)?),
                        Some(_) => {
                            return Err(LexError {
                                kind: ErrorKind::BadEscape,
                                position: esc_pos,
                            });
                        }
                        None => {
                            return Err(LexError {
                                kind: ErrorKind::UnterminatedString,
                                position: start_pos,
                            });
                        }
                    }
                }
                Some(ch) => value.push(ch),
                None => {
                    return Err(LexError {
                        kind: ErrorKind::UnterminatedString,
                        position: start_pos,
                    });
                }
            }
        }

        Ok(TokenKind::String(value))
    }

    fn read_unicode_escape(&mut self, start_pos: usize, esc_pos: usize) -> Result<char, LexError> {
        let mut code = 0u32;

        for _ in 0..4 {
            let Some(ch) = self.advance() else {
                return Err(LexError {
                    kind: ErrorKind::UnterminatedString,
                    position: start_pos,
                });
            };
            let Some(digit) = ch.to_digit(16) else {
                return Err(LexError {
                    kind: ErrorKind::BadEscape,
                    position: esc_pos,
                });
            };
            code = code * 16 + digit;
        }

        char::from_u32(code).ok_or(LexError {
            kind: ErrorKind::BadEscape,
            position: esc_pos,
        })
    }

    fn read_number(&mut self) -> Result<TokenKind, LexError> {
        let start_pos = self.position;
        let mut num_str = String::new();

        if self.chars.peek() == Some(&'-') {
            if let Some(ch) = self.advance() {
                num_str.push(ch);
            }
        }

        while let Some(&ch) = self.chars.peek() {
            if ch.is_ascii_digit() {
                if let Some(digit) = self.advance() {
                    num_str.push(digit);
                }
            } else {
                break;
            }
        }

        if num_str.is_empty() || num_str == "-" {
            return Err(LexError {
                kind: ErrorKind::BadNumber,
                position: start_pos,
            });
        }

        let value: i64 = num_str.parse().map_err(|_| LexError {
            kind: ErrorKind::BadNumber,
            position: start_pos,
        })?;

        Ok(TokenKind::Number(value))
    }

    fn read_ident_or_keyword(&mut self) -> TokenKind {
        let mut ident = String::new();

        while let Some(&ch) = self.chars.peek() {
            if is_ident_char(ch) {
                if let Some(c) = self.advance() {
                    ident.push(c);
                }
            } else {
                break;
            }
        }

        match ident.as_str() {
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            _ => TokenKind::Ident(ident),
        }
    }
}

/// Check if character can start an identifier: `[A-Za-z_]`
fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

/// Check if character can continue an identifier: `[A-Za-z0-9_]`
fn is_ident_char(ch: char) -> bool {
    is_ident_start(ch) || ch.is_ascii_digit()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn kinds(tokens: &[Token]) -> Vec<&TokenKind> {
        tokens.iter().map(|t| &t.kind).collect()
    }

    #[test]
    fn test_basic_tokens() {
        let tokens = Lexer::new("$.foo").tokenize().unwrap();
        assert_eq!(
            kinds(&tokens),
            vec![
                &TokenKind::Root,
                &TokenKind::Dot,
                &TokenKind::Ident("foo".to_string())
            ]
        );
    }

    #[test]
    fn test_bracket_notation() {
        let tokens = Lexer::new("$['foo']").tokenize().unwrap();
        assert_eq!(
            kinds(&tokens),
            vec![
                &TokenKind::Root,
                &TokenKind::BracketOpen,
                &TokenKind::String("foo".to_string()),
                &TokenKind::BracketClose
            ]
        );
    }

    #[test]
    fn test_negative_index() {
        let tokens = Lexer::new("$[-1]").tokenize().unwrap();
        assert_eq!(
            kinds(&tokens),
            vec![
                &TokenKind::Root,
                &TokenKind::BracketOpen,
                &TokenKind::Number(-1),
                &TokenKind::BracketClose
            ]
        );
    }

    #[test]
    fn test_descendant() {
        let tokens = Lexer::new("$..foo").tokenize().unwrap();
        assert_eq!(
            kinds(&tokens),
            vec![
                &TokenKind::Root,
                &TokenKind::DotDot,
                &TokenKind::Ident("foo".to_string())
            ]
        );
    }

    #[test]
    fn test_slice_tokens() {
        let tokens = Lexer::new("$[1:3:2]").tokenize().unwrap();
        assert_eq!(
            kinds(&tokens),
            vec![
                &TokenKind::Root,
                &TokenKind::BracketOpen,
                &TokenKind::Number(1),
                &TokenKind::Colon,
                &TokenKind::Number(3),
                &TokenKind::Colon,
                &TokenKind::Number(2),
                &TokenKind::BracketClose
            ]
        );
    }

    #[test]
    fn test_token_positions_are_byte_offsets() {
        let tokens = Lexer::new("$.foo[0]").tokenize().unwrap();
        assert_eq!(tokens[0].position, 0); // $
        assert_eq!(tokens[1].position, 1); // .
        assert_eq!(tokens[2].position, 2); // foo
        assert_eq!(tokens[3].position, 5); // [
        assert_eq!(tokens[4].position, 6); // 0
        assert_eq!(tokens[5].position, 7); // ]
    }

    #[test]
    fn test_positions_after_multibyte_string() {
        // "日" is three bytes; the closing bracket must account for them
        let tokens = Lexer::new("$['日']").tokenize().unwrap();
        assert_eq!(tokens[2].kind, TokenKind::String("日".to_string()));
        assert_eq!(tokens[3].kind, TokenKind::BracketClose);
        assert_eq!(tokens[3].position, 7);
    }

    #[test]
    fn test_filter_tokens() {
        let tokens = Lexer::new("$[?(@.price < 10)]").tokenize().unwrap();
        assert_eq!(
            kinds(&tokens),
            vec![
                &TokenKind::Root,
                &TokenKind::BracketOpen,
                &TokenKind::Question,
                &TokenKind::ParenOpen,
                &TokenKind::At,
                &TokenKind::Dot,
                &TokenKind::Ident("price".to_string()),
                &TokenKind::LessThan,
                &TokenKind::Number(10),
                &TokenKind::ParenClose,
                &TokenKind::BracketClose
            ]
        );
    }

    #[test]
    fn test_comparison_operators() {
        let tokens = Lexer::new("< > <= >= == !=").tokenize().unwrap();
        assert_eq!(
            kinds(&tokens),
            vec![
                &TokenKind::LessThan,
                &TokenKind::GreaterThan,
                &TokenKind::LessEq,
                &TokenKind::GreaterEq,
                &TokenKind::Equal,
                &TokenKind::NotEqual
            ]
        );
    }

    #[test]
    fn test_logical_operators() {
        let tokens = Lexer::new("&& || !").tokenize().unwrap();
        assert_eq!(
            kinds(&tokens),
            vec![&TokenKind::And, &TokenKind::Or, &TokenKind::Not]
        );
    }

    #[test]
    fn test_bool_keywords() {
        let tokens = Lexer::new("true false").tokenize().unwrap();
        assert_eq!(kinds(&tokens), vec![&TokenKind::True, &TokenKind::False]);
    }

    #[test]
    fn test_null_is_plain_ident() {
        // no null literal in this dialect
        let tokens = Lexer::new("null").tokenize().unwrap();
        assert_eq!(kinds(&tokens), vec![&TokenKind::Ident("null".to_string())]);
    }

    #[test]
    fn test_string_escapes() {
        let tokens = Lexer::new(r#""a\n\t\\\"b""#).tokenize().unwrap();
        assert_eq!(
            tokens[0].kind,
            TokenKind::String("a\n\t\\\"b".to_string())
        );
    }

    #[test]
    fn test_unicode_escape() {
        let tokens = Lexer::new("'\\u00e9'").tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::String("é".to_string()));
    }

    #[test]
    fn test_unterminated_string() {
        let err = Lexer::new("$['abc").tokenize().unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnterminatedString);
        assert_eq!(err.position, 2);
    }

    #[test]
    fn test_bad_escape() {
        let err = Lexer::new(r#"$["a\qb"]"#).tokenize().unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadEscape);
        assert_eq!(err.position, 4);
    }

    #[test]
    fn test_bad_escape_in_unicode() {
        let err = Lexer::new(r#"$["\uZZZZ"]"#).tokenize().unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadEscape);
    }

    #[test]
    fn test_bad_number_lone_minus() {
        let err = Lexer::new("$[-]").tokenize().unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadNumber);
        assert_eq!(err.position, 2);
    }

    #[test]
    fn test_bad_number_overflow() {
        let err = Lexer::new("$[99999999999999999999]").tokenize().unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadNumber);
    }

    #[test]
    fn test_unexpected_char() {
        let err = Lexer::new("$.#").tokenize().unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnexpectedChar);
        assert_eq!(err.position, 2);
    }

    #[test]
    fn test_invalid_single_ampersand() {
        let err = Lexer::new("&").tokenize().unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnexpectedChar);
    }

    #[test]
    fn test_invalid_single_pipe() {
        let err = Lexer::new("|").tokenize().unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnexpectedChar);
    }

    #[test]
    fn test_invalid_single_equals() {
        let err = Lexer::new("=").tokenize().unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnexpectedChar);
    }
}
