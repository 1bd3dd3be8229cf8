use crate::error::GenifestError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Integer(i64),
    /// Quoted string, already unescaped. `single` records the quote style.
    String { value: String, single: bool },
    Ident(String),

    Dot,      // .
    Pipe,     // |
    Comma,    // ,
    Colon,    // :
    LParen,   // (
    RParen,   // )
    LBracket, // [
    RBracket, // ]

    Eq, // ==
    Ne, // !=

    Eof,
}

/// A token and the character offset where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub position: usize,
}

#[derive(Debug, Clone)]
pub struct Lexer<'s> {
    source: &'s str,
    input: Vec<char>,
    pos: usize,
    pub tokens: Vec<Spanned>,
}

impl<'s> Lexer<'s> {
    pub fn new(source: &'s str) -> Self {
        Lexer {
            source,
            input: source.chars().collect(),
            pos: 0,
            tokens: Vec::new(),
        }
    }

    pub fn tokenize(&mut self) -> Result<&[Spanned], GenifestError> {
        while self.pos < self.input.len() {
            self.skip_whitespace();
            if self.pos >= self.input.len() {
                break;
            }

            let start = self.pos;
            let ch = self.input[self.pos];
            match ch {
                '.' => self.single(Token::Dot),
                '|' => self.single(Token::Pipe),
                ',' => self.single(Token::Comma),
                ':' => self.single(Token::Colon),
                '(' => self.single(Token::LParen),
                ')' => self.single(Token::RParen),
                '[' => self.single(Token::LBracket),
                ']' => self.single(Token::RBracket),
                '=' => {
                    if self.peek_next() == Some('=') {
                        self.pos += 2;
                        self.push(Token::Eq, start);
                    } else {
                        return Err(self.error(start, "unexpected '=', did you mean '=='?"));
                    }
                }
                '!' => {
                    if self.peek_next() == Some('=') {
                        self.pos += 2;
                        self.push(Token::Ne, start);
                    } else {
                        return Err(self.error(start, "unexpected '!', did you mean '!='?"));
                    }
                }
                '"' | '\'' => self.read_string(ch)?,
                '-' if self.peek_next().is_some_and(|c| c.is_ascii_digit()) => {
                    self.read_integer()?;
                }
                c if c.is_ascii_digit() => self.read_integer()?,
                c if c.is_ascii_alphabetic() || c == '_' => self.read_ident(),
                _ => {
                    return Err(self.error(start, &format!("unexpected character: '{ch}'")));
                }
            }
        }

        let end = self.input.len();
        self.push(Token::Eof, end);
        Ok(&self.tokens)
    }

    fn error(&self, position: usize, message: &str) -> GenifestError {
        GenifestError::Parse {
            selector: self.source.to_string(),
            position,
            message: message.to_string(),
        }
    }

    fn push(&mut self, token: Token, position: usize) {
        self.tokens.push(Spanned { token, position });
    }

    fn single(&mut self, token: Token) {
        let start = self.pos;
        self.pos += 1;
        self.push(token, start);
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.input.len() && self.input[self.pos].is_whitespace() {
            self.pos += 1;
        }
    }

    fn peek_next(&self) -> Option<char> {
        self.input.get(self.pos + 1).copied()
    }

    fn read_integer(&mut self) -> Result<(), GenifestError> {
        let start = self.pos;
        if self.input[self.pos] == '-' {
            self.pos += 1;
        }
        while self.pos < self.input.len() && self.input[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        let num_str: String = self.input[start..self.pos].iter().collect();
        let n: i64 = num_str
            .parse()
            .map_err(|_| self.error(start, &format!("invalid integer: {num_str}")))?;
        self.push(Token::Integer(n), start);
        Ok(())
    }

    fn read_string(&mut self, quote: char) -> Result<(), GenifestError> {
        let start = self.pos;
        self.pos += 1; // skip opening quote
        let mut s = String::new();
        while self.pos < self.input.len() {
            match self.input[self.pos] {
                c if c == quote => {
                    self.pos += 1;
                    self.push(
                        Token::String {
                            value: s,
                            single: quote == '\'',
                        },
                        start,
                    );
                    return Ok(());
                }
                '\\' => {
                    self.pos += 1;
                    let Some(&escaped) = self.input.get(self.pos) else {
                        break;
                    };
                    match escaped {
                        'n' => s.push('\n'),
                        'r' => s.push('\r'),
                        't' => s.push('\t'),
                        '\\' => s.push('\\'),
                        '"' => s.push('"'),
                        '\'' => s.push('\''),
                        c => {
                            return Err(self.error(
                                self.pos,
                                &format!("invalid escape character: '\\{c}'"),
                            ));
                        }
                    }
                    self.pos += 1;
                }
                c => {
                    s.push(c);
                    self.pos += 1;
                }
            }
        }
        Err(self.error(start, "unterminated string literal"))
    }

    fn read_ident(&mut self) {
        let start = self.pos;
        while self.pos < self.input.len()
            && (self.input[self.pos].is_ascii_alphanumeric()
                || self.input[self.pos] == '_'
                || self.input[self.pos] == '-')
        {
            self.pos += 1;
        }
        let word: String = self.input[start..self.pos].iter().collect();
        self.push(Token::Ident(word), start);
    }
}
