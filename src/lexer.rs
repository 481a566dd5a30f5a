use crate::io::Reader;
use crate::pos::Pos;
use crate::token::{Token, TokenPayload};
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum LexerError {
    #[error("{pos}: invalid character: {c}")]
    InvalidCharacter { pos: Pos, c: char },
    #[error("{pos}: missing terminating \" character")]
    UnterminatedLiteral { pos: Pos },
    #[error("{pos}: invalid escape sequence")]
    InvalidEscape { pos: Pos },
    #[error("{pos}: unknown escape sequence")]
    UnknownEscape { pos: Pos },
}

fn is_whitespace(c: u8) -> bool {
    c == b' ' || c == b'\t' || c == b'\r' || c == b'\n'
}

fn is_id_begin(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

fn is_id_trail(c: u8) -> bool {
    is_id_begin(c) || c.is_ascii_digit()
}

fn hex_value(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        _ => c - b'A' + 10,
    }
}

fn keyword_or_ident(data: String) -> TokenPayload {
    match data.as_str() {
        "break" => TokenPayload::Break,
        "continue" => TokenPayload::Continue,
        "else" => TokenPayload::Else,
        "false" => TokenPayload::False,
        "for" => TokenPayload::For,
        "function" => TokenPayload::Function,
        "if" => TokenPayload::If,
        "let" => TokenPayload::Let,
        "return" => TokenPayload::Return,
        "true" => TokenPayload::True,
        "var" => TokenPayload::Var,
        "while" => TokenPayload::While,
        _ => TokenPayload::Ident(data),
    }
}

#[derive(Debug)]
pub struct Lexer {
    reader: Reader,
    current: Option<u8>,
    token_pos: Pos,
}

impl Lexer {
    pub fn new(mut reader: Reader) -> Lexer {
        let token_pos = reader.position().clone();
        let current = reader.read();
        Lexer {
            reader,
            current,
            token_pos,
        }
    }

    fn bump(&mut self) {
        self.current = self.reader.read();
    }

    fn token(&self, payload: TokenPayload) -> Token {
        Token {
            payload,
            pos: self.token_pos.clone(),
        }
    }

    /// Read the next token. Once the input is exhausted this returns
    /// `END OF FILE` forever.
    pub fn read(&mut self) -> Result<Token, LexerError> {
        // discard whitespace and #-comments, tracking the token start
        while matches!(self.current, Some(c) if is_whitespace(c) || c == b'#') {
            while matches!(self.current, Some(c) if is_whitespace(c)) {
                self.token_pos = self.reader.position().clone();
                self.bump();
            }

            if self.current == Some(b'#') {
                self.token_pos = self.reader.position().clone();
                while let Some(c) = self.current {
                    if c == b'\n' {
                        break;
                    }
                    self.token_pos = self.reader.position().clone();
                    self.bump();
                }
            }
        }

        let Some(c) = self.current else {
            return Ok(self.token(TokenPayload::Eof));
        };

        if is_id_begin(c) {
            let mut data = String::new();
            while let Some(c) = self.current {
                if !is_id_trail(c) {
                    break;
                }
                data.push(c as char);
                self.bump();
            }
            return Ok(self.token(keyword_or_ident(data)));
        }

        if c.is_ascii_digit() {
            let mut data = String::new();
            while let Some(c) = self.current {
                if !c.is_ascii_digit() {
                    break;
                }
                data.push(c as char);
                self.bump();
            }
            return Ok(self.token(TokenPayload::Numeral(data)));
        }

        if c == b'"' {
            return self.read_literal();
        }

        let last = c;
        self.bump();

        let payload = match last {
            b'{' => TokenPayload::BraceLeft,
            b'}' => TokenPayload::BraceRight,
            b'(' => TokenPayload::ParenLeft,
            b')' => TokenPayload::ParenRight,
            b',' => TokenPayload::Comma,
            b';' => TokenPayload::Semicolon,
            b'+' => TokenPayload::Plus,
            b'-' => TokenPayload::Minus,
            b'*' => TokenPayload::Mul,
            b'/' => TokenPayload::Div,
            b'%' => TokenPayload::Mod,
            b'~' => TokenPayload::BitNot,
            b'^' => TokenPayload::BitXor,
            b'&' => {
                if self.current == Some(b'&') {
                    self.bump();
                    TokenPayload::LogAnd
                } else {
                    TokenPayload::BitAnd
                }
            }
            b'|' => {
                if self.current == Some(b'|') {
                    self.bump();
                    TokenPayload::LogOr
                } else {
                    TokenPayload::BitOr
                }
            }
            b'=' => {
                if self.current == Some(b'=') {
                    self.bump();
                    TokenPayload::Eq
                } else {
                    TokenPayload::Assign
                }
            }
            b'!' => {
                if self.current == Some(b'=') {
                    self.bump();
                    TokenPayload::Ne
                } else {
                    TokenPayload::LogNot
                }
            }
            b'<' => {
                if self.current == Some(b'=') {
                    self.bump();
                    TokenPayload::Le
                } else {
                    TokenPayload::Lt
                }
            }
            b'>' => {
                if self.current == Some(b'=') {
                    self.bump();
                    TokenPayload::Ge
                } else {
                    TokenPayload::Gt
                }
            }
            _ => {
                return Err(LexerError::InvalidCharacter {
                    pos: self.reader.position().clone(),
                    c: last as char,
                })
            }
        };

        Ok(self.token(payload))
    }

    fn read_literal(&mut self) -> Result<Token, LexerError> {
        // opening quote
        self.bump();

        let mut data = Vec::new();
        loop {
            let Some(c) = self.current else {
                return Err(LexerError::UnterminatedLiteral {
                    pos: self.reader.position().clone(),
                });
            };

            if c == b'"' {
                break;
            }

            if c == b'\\' {
                self.bump();
                match self.current {
                    Some(b'\\') => data.push(b'\\'),
                    Some(b'"') => data.push(b'"'),
                    Some(b'n') => data.push(b'\n'),
                    Some(b'r') => data.push(b'\r'),
                    Some(b't') => data.push(b'\t'),
                    Some(b'x') => {
                        self.bump();
                        let Some(hi) = self.current.filter(u8::is_ascii_hexdigit) else {
                            return Err(LexerError::InvalidEscape {
                                pos: self.reader.position().clone(),
                            });
                        };
                        self.bump();
                        let Some(lo) = self.current.filter(u8::is_ascii_hexdigit) else {
                            return Err(LexerError::InvalidEscape {
                                pos: self.reader.position().clone(),
                            });
                        };
                        data.push(16 * hex_value(hi) + hex_value(lo));
                    }
                    _ => {
                        return Err(LexerError::UnknownEscape {
                            pos: self.reader.position().clone(),
                        })
                    }
                }
            } else {
                data.push(c);
            }

            self.bump();
        }

        // closing quote
        self.bump();
        Ok(self.token(TokenPayload::Str(data)))
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexerError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.read()?;
            let eof = matches!(token.payload, TokenPayload::Eof);
            tokens.push(token);
            if eof {
                return Ok(tokens);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str) -> Result<Vec<Token>, LexerError> {
        let reader = Reader::new("test".to_string(), input.as_bytes().to_vec());
        Lexer::new(reader).tokenize()
    }

    fn payloads(input: &str) -> Vec<TokenPayload> {
        lex(input)
            .unwrap()
            .into_iter()
            .map(|token| token.payload)
            .collect()
    }

    #[test]
    fn keywords_are_not_identifiers() {
        for (spelling, expected) in [
            ("break", TokenPayload::Break),
            ("continue", TokenPayload::Continue),
            ("else", TokenPayload::Else),
            ("false", TokenPayload::False),
            ("for", TokenPayload::For),
            ("function", TokenPayload::Function),
            ("if", TokenPayload::If),
            ("let", TokenPayload::Let),
            ("return", TokenPayload::Return),
            ("true", TokenPayload::True),
            ("var", TokenPayload::Var),
            ("while", TokenPayload::While),
        ] {
            assert_eq!(payloads(spelling), vec![expected, TokenPayload::Eof]);
        }

        assert_eq!(
            payloads("break2"),
            vec![TokenPayload::Ident("break2".to_string()), TokenPayload::Eof]
        );
    }

    #[test]
    fn two_character_operators() {
        assert_eq!(
            payloads("&& || == != <= >="),
            vec![
                TokenPayload::LogAnd,
                TokenPayload::LogOr,
                TokenPayload::Eq,
                TokenPayload::Ne,
                TokenPayload::Le,
                TokenPayload::Ge,
                TokenPayload::Eof,
            ]
        );

        assert_eq!(
            payloads("& | = ! < >"),
            vec![
                TokenPayload::BitAnd,
                TokenPayload::BitOr,
                TokenPayload::Assign,
                TokenPayload::LogNot,
                TokenPayload::Lt,
                TokenPayload::Gt,
                TokenPayload::Eof,
            ]
        );
    }

    #[test]
    fn numerals_keep_their_spelling() {
        assert_eq!(
            payloads("0 007 4294967296"),
            vec![
                TokenPayload::Numeral("0".to_string()),
                TokenPayload::Numeral("007".to_string()),
                TokenPayload::Numeral("4294967296".to_string()),
                TokenPayload::Eof,
            ]
        );
    }

    #[test]
    fn string_escapes_decode_to_bytes() {
        assert_eq!(
            payloads(r#""a\nb\x41""#),
            vec![
                TokenPayload::Str(vec![b'a', b'\n', b'b', b'A']),
                TokenPayload::Eof,
            ]
        );

        assert_eq!(
            payloads(r#""\\\"\r\t\xfF""#),
            vec![
                TokenPayload::Str(vec![b'\\', b'"', b'\r', b'\t', 0xff]),
                TokenPayload::Eof,
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            payloads("1 # one\n2 # two"),
            vec![
                TokenPayload::Numeral("1".to_string()),
                TokenPayload::Numeral("2".to_string()),
                TokenPayload::Eof,
            ]
        );
    }

    #[test]
    fn eof_is_returned_forever() {
        let reader = Reader::new("test".to_string(), b"x".to_vec());
        let mut lexer = Lexer::new(reader);
        assert!(matches!(
            lexer.read().unwrap().payload,
            TokenPayload::Ident(_)
        ));
        assert!(matches!(lexer.read().unwrap().payload, TokenPayload::Eof));
        assert!(matches!(lexer.read().unwrap().payload, TokenPayload::Eof));
    }

    #[test]
    fn token_positions_are_column_of_first_byte() {
        let tokens = lex("foo\n  bar").unwrap();
        assert_eq!((tokens[0].pos.line, tokens[0].pos.col), (1, 0));
        assert_eq!((tokens[1].pos.line, tokens[1].pos.col), (2, 2));
    }

    #[test]
    fn unterminated_literal_is_an_error() {
        assert!(matches!(
            lex("\"abc"),
            Err(LexerError::UnterminatedLiteral { .. })
        ));
    }

    #[test]
    fn unknown_escape_is_an_error() {
        assert!(matches!(lex(r#""\q""#), Err(LexerError::UnknownEscape { .. })));
    }

    #[test]
    fn invalid_hex_escape_is_an_error() {
        assert!(matches!(
            lex(r#""\xg1""#),
            Err(LexerError::InvalidEscape { .. })
        ));
        assert!(matches!(lex(r#""\x4"#), Err(LexerError::InvalidEscape { .. })));
    }

    #[test]
    fn unexpected_character_is_an_error() {
        assert!(matches!(
            lex("@"),
            Err(LexerError::InvalidCharacter { c: '@', .. })
        ));
    }
}
