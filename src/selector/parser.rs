use crate::error::GenifestError;

use super::ast::*;
use super::lexer::{Spanned, Token};

/// Functions a selector may call.
const KNOWN_FUNCTIONS: &[&str] = &["select"];

pub struct Parser<'s> {
    source: &'s str,
    tokens: Vec<Spanned>,
    pos: usize,
}

impl<'s> Parser<'s> {
    pub fn new(source: &'s str, tokens: Vec<Spanned>) -> Self {
        Parser {
            source,
            tokens,
            pos: 0,
        }
    }

    pub fn parse(&mut self) -> Result<Expression, GenifestError> {
        let mut steps = Vec::new();
        if self.at_eof() {
            steps.push(Step::Path(Path::default()));
        } else {
            steps.push(self.parse_step()?);
            while matches!(self.current(), Token::Pipe) {
                self.advance();
                steps.push(self.parse_step()?);
            }
        }
        if !self.at_eof() {
            return Err(self.error(format!("unexpected token: {:?}", self.current())));
        }
        Ok(Expression {
            source: self.source.to_string(),
            steps,
        })
    }

    fn current(&self) -> &Token {
        self.tokens.get(self.pos).map_or(&Token::Eof, |s| &s.token)
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos + 1).map_or(&Token::Eof, |s| &s.token)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(0, |s| s.position)
    }

    fn at_eof(&self) -> bool {
        matches!(self.current(), Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let tok = self.current().clone();
        self.pos += 1;
        tok
    }

    fn expect(&mut self, expected: &Token) -> Result<(), GenifestError> {
        if self.current() == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!(
                "expected {:?}, got {:?}",
                expected,
                self.current()
            )))
        }
    }

    fn error(&self, message: String) -> GenifestError {
        GenifestError::Parse {
            selector: self.source.to_string(),
            position: self.position(),
            message,
        }
    }

    /// step: path | ident '(' args ')'
    fn parse_step(&mut self) -> Result<Step, GenifestError> {
        if matches!(self.current(), Token::Ident(_)) {
            return Ok(Step::Function(self.parse_function_call()?));
        }
        Ok(Step::Path(self.parse_path()?))
    }

    /// path: component+ | '.'
    fn parse_path(&mut self) -> Result<Path, GenifestError> {
        let mut components = Vec::new();
        loop {
            match self.current() {
                Token::Dot => match self.peek() {
                    Token::Ident(_) => {
                        self.advance();
                        if let Token::Ident(name) = self.advance() {
                            components.push(Component::Field(name));
                        }
                    }
                    Token::LBracket => {
                        self.advance();
                        components.push(self.parse_bracket()?);
                    }
                    _ if components.is_empty() => {
                        // A lone `.` is the identity path.
                        self.advance();
                        return Ok(Path::default());
                    }
                    _ => {
                        self.advance();
                        return Err(self.error("expected field name or '[' after '.'".into()));
                    }
                },
                Token::LBracket => components.push(self.parse_bracket()?),
                _ => break,
            }
        }
        if components.is_empty() {
            return Err(self.error(format!("expected a path, got {:?}", self.current())));
        }
        Ok(Path { components })
    }

    /// bracket: '[' ( ']' | quoted ']' | int? ':' int? ']' | int ']' )
    fn parse_bracket(&mut self) -> Result<Component, GenifestError> {
        self.expect(&Token::LBracket)?;
        let component = match self.advance() {
            Token::RBracket => return Ok(Component::Iterate),
            Token::String { value, .. } => Component::Bracket(Bracket::Key(value)),
            Token::Colon => Component::Bracket(Bracket::Slice {
                start: None,
                end: self.parse_optional_integer(),
            }),
            Token::Integer(n) => {
                if matches!(self.current(), Token::Colon) {
                    self.advance();
                    Component::Bracket(Bracket::Slice {
                        start: Some(n),
                        end: self.parse_optional_integer(),
                    })
                } else {
                    Component::Bracket(Bracket::Index(n))
                }
            }
            other => {
                self.pos -= 1;
                return Err(self.error(format!("malformed bracket content: {other:?}")));
            }
        };
        self.expect(&Token::RBracket)?;
        Ok(component)
    }

    fn parse_optional_integer(&mut self) -> Option<i64> {
        if let Token::Integer(n) = *self.current() {
            self.advance();
            Some(n)
        } else {
            None
        }
    }

    fn parse_function_call(&mut self) -> Result<FunctionCall, GenifestError> {
        let name_pos = self.pos;
        let name = match self.advance() {
            Token::Ident(name) => name,
            other => return Err(self.error(format!("expected function name, got {other:?}"))),
        };
        self.expect(&Token::LParen)?;
        let mut args = Vec::new();
        if !matches!(self.current(), Token::RParen) {
            args.push(self.parse_func_arg()?);
            while matches!(self.current(), Token::Comma) {
                self.advance();
                args.push(self.parse_func_arg()?);
            }
        }
        self.expect(&Token::RParen)?;

        let call = FunctionCall { name, args };
        if let Err(message) = check_call(&call) {
            self.pos = name_pos;
            return Err(self.error(message));
        }
        Ok(call)
    }

    /// func_arg: literal | path (('==' | '!=') literal)?
    fn parse_func_arg(&mut self) -> Result<FuncArg, GenifestError> {
        if let Some(literal) = self.parse_literal() {
            return Ok(FuncArg::Literal(literal));
        }
        let left = self.parse_path()?;
        let op = match self.current() {
            Token::Eq => CompareOp::Eq,
            Token::Ne => CompareOp::Ne,
            _ => return Ok(FuncArg::Path(left)),
        };
        self.advance();
        let right = self
            .parse_literal()
            .ok_or_else(|| self.error("expected a string or number after comparison".into()))?;
        Ok(FuncArg::Comparison(Comparison { left, op, right }))
    }

    fn parse_literal(&mut self) -> Option<Literal> {
        let literal = match self.current() {
            Token::String { value, .. } => Literal::String(value.clone()),
            Token::Integer(n) => Literal::Number(*n),
            _ => return None,
        };
        self.advance();
        Some(literal)
    }
}

fn check_call(call: &FunctionCall) -> Result<(), String> {
    if !KNOWN_FUNCTIONS.contains(&call.name.as_str()) {
        return Err(format!("unknown function: {}", call.name));
    }
    match call.args.as_slice() {
        [FuncArg::Comparison(_)] => Ok(()),
        _ => Err(format!("{} expects exactly one comparison argument", call.name)),
    }
}
