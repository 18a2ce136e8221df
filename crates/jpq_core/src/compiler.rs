//! Compiler from JSONPath expressions to opcode trees

use smallvec::SmallVec;

use crate::ErrorKind;
use crate::lexer::{LexError, Lexer, Token, TokenKind};
use crate::opcode::{OpId, OpKind, Pool, Program, SLICE_START_UNSET, SLICE_STOP_UNSET};

/// Longest accepted expression, in bytes.
const MAX_EXPR_LEN: usize = 64 * 1024;

/// Compile error: structured kind plus byte offset into the expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseError {
    pub kind: ErrorKind,
    pub position: usize,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "at byte {}: {}", self.position, self.kind)
    }
}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        Self {
            kind: e.kind,
            position: e.position,
        }
    }
}

/// Sibling-linked chain of path steps under construction
#[derive(Default)]
struct Chain {
    head: Option<OpId>,
    tail: Option<OpId>,
}

impl Chain {
    fn push(&mut self, pool: &mut Pool, op: OpId) {
        match self.tail {
            Some(tail) => pool.set_sibling(tail, op),
            None => self.head = Some(op),
        }
        self.tail = Some(op);
    }
}

/// Compiler for JSONPath expressions
pub struct Compiler {
    tokens: Vec<Token>,
    index: usize,
    end: usize,
    pool: Pool,
}

impl Compiler {
    /// Compile an expression into a [`Program`]
    pub fn compile(input: &str) -> Result<Program, ParseError> {
        if input.len() > MAX_EXPR_LEN {
            return Err(ParseError {
                kind: ErrorKind::Overlong,
                position: MAX_EXPR_LEN,
            });
        }

        let tokens = Lexer::new(input).tokenize()?;
        let mut compiler = Self {
            tokens,
            index: 0,
            end: input.len(),
            pool: Pool::default(),
        };
        let head = compiler.parse_path()?;
        Ok(Program::new(compiler.pool, head))
    }

    fn parse_path(&mut self) -> Result<Option<OpId>, ParseError> {
        // leading $ (or @) is consumed and not compiled; the chain starts
        // with the first step
        match self.current_kind() {
            Some(TokenKind::Root) | Some(TokenKind::At) => self.advance(),
            _ => return Err(self.error_here()),
        }

        let head = self.parse_steps()?;

        if self.current().is_some() {
            return Err(self.error_here());
        }

        Ok(head)
    }

    /// Parse `step*`, linking the steps through their siblings.
    ///
    /// Stops at the first token that cannot begin a step, so the same routine
    /// serves top-level paths and sub-paths inside filter expressions.
    fn parse_steps(&mut self) -> Result<Option<OpId>, ParseError> {
        let mut chain = Chain::default();

        loop {
            match self.current_kind() {
                Some(TokenKind::Dot) => {
                    self.advance();
                    let op = self.parse_dot_selector()?;
                    chain.push(&mut self.pool, op);
                }
                Some(TokenKind::DotDot) => {
                    self.advance();
                    let deep = self.pool.alloc(OpKind::Deep, 0, None);
                    chain.push(&mut self.pool, deep);
                    let op = match self.current_kind() {
                        Some(TokenKind::BracketOpen) => self.parse_bracket()?,
                        _ => self.parse_dot_selector()?,
                    };
                    chain.push(&mut self.pool, op);
                }
                Some(TokenKind::BracketOpen) => {
                    let op = self.parse_bracket()?;
                    chain.push(&mut self.pool, op);
                }
                _ => break,
            }
        }

        Ok(chain.head)
    }

    fn parse_dot_selector(&mut self) -> Result<OpId, ParseError> {
        match self.current_kind().cloned() {
            Some(TokenKind::Ident(name)) => {
                self.advance();
                Ok(self.pool.alloc(OpKind::Label, 0, Some(name.into_boxed_str())))
            }
            Some(TokenKind::Wildcard) => {
                self.advance();
                Ok(self.pool.alloc(OpKind::Wildcard, 0, None))
            }
            _ => Err(self.error_here()),
        }
    }

    fn parse_bracket(&mut self) -> Result<OpId, ParseError> {
        self.expect(&TokenKind::BracketOpen)?;

        let op = match self.current_kind().cloned() {
            Some(TokenKind::Wildcard) => {
                self.advance();
                self.pool.alloc(OpKind::Wildcard, 0, None)
            }
            Some(TokenKind::Question) => {
                self.advance();
                self.expect(&TokenKind::ParenOpen)?;
                let expr = self.parse_expression()?;
                self.expect(&TokenKind::ParenClose)?;
                expr
            }
            // bare identifiers in brackets behave like quoted keys
            Some(TokenKind::String(first)) | Some(TokenKind::Ident(first)) => {
                self.advance();
                self.parse_key_selector(first)?
            }
            Some(TokenKind::Number(_)) | Some(TokenKind::Colon) => self.parse_index_selector()?,
            _ => return Err(self.error_here()),
        };

        self.expect(&TokenKind::BracketClose)?;
        Ok(op)
    }

    /// One quoted key, or a union of them: `['a']`, `['a','b']`
    fn parse_key_selector(&mut self, first: String) -> Result<OpId, ParseError> {
        let mut members: SmallVec<[OpId; 4]> = SmallVec::new();
        members.push(
            self.pool
                .alloc(OpKind::String, 0, Some(first.into_boxed_str())),
        );

        while self.current_kind() == Some(&TokenKind::Comma) {
            self.advance();
            match self.current_kind().cloned() {
                Some(TokenKind::String(name)) | Some(TokenKind::Ident(name)) => {
                    self.advance();
                    members.push(
                        self.pool
                            .alloc(OpKind::String, 0, Some(name.into_boxed_str())),
                    );
                }
                _ => return Err(self.error_here()),
            }
        }

        Ok(self.collapse_union(members))
    }

    /// Index, slice, or a union of indices
    fn parse_index_selector(&mut self) -> Result<OpId, ParseError> {
        let first = self.parse_index_or_slice()?;

        // only plain indices can form a union; a comma after a slice is left
        // for the caller to reject at the ']'
        if self.pool.op(first).kind != OpKind::Number
            || self.current_kind() != Some(&TokenKind::Comma)
        {
            return Ok(first);
        }

        let mut members: SmallVec<[OpId; 4]> = SmallVec::new();
        members.push(first);

        while self.current_kind() == Some(&TokenKind::Comma) {
            self.advance();
            match self.current_kind().cloned() {
                Some(TokenKind::Number(n)) => {
                    self.advance();
                    members.push(self.pool.alloc(OpKind::Number, n, None));
                }
                _ => return Err(self.error_here()),
            }
        }

        Ok(self.collapse_union(members))
    }

    fn parse_index_or_slice(&mut self) -> Result<OpId, ParseError> {
        let start = self.try_parse_number();

        if self.current_kind() != Some(&TokenKind::Colon) {
            return match start {
                Some(n) => Ok(self.pool.alloc(OpKind::Number, n, None)),
                None => Err(self.error_here()),
            };
        }

        self.advance(); // first ':'
        let stop = self.try_parse_number();

        let step = if self.current_kind() == Some(&TokenKind::Colon) {
            self.advance(); // second ':'
            self.try_parse_number()
        } else {
            None
        };

        // omitted bounds keep their sentinel encoding; step 0 means auto
        let slice = self.pool.alloc(OpKind::Slice, 0, None);
        let start_op = self
            .pool
            .alloc(OpKind::Number, start.unwrap_or(SLICE_START_UNSET), None);
        let stop_op = self
            .pool
            .alloc(OpKind::Number, stop.unwrap_or(SLICE_STOP_UNSET), None);
        let step_op = self.pool.alloc(OpKind::Number, step.unwrap_or(0), None);
        self.pool.push_child(slice, start_op);
        self.pool.push_child(slice, stop_op);
        self.pool.push_child(slice, step_op);

        Ok(slice)
    }

    fn try_parse_number(&mut self) -> Option<i64> {
        if let Some(TokenKind::Number(n)) = self.current_kind() {
            let n = *n;
            self.advance();
            Some(n)
        } else {
            None
        }
    }

    fn collapse_union(&mut self, members: SmallVec<[OpId; 4]>) -> OpId {
        if members.len() == 1 {
            return members[0];
        }
        let union = self.pool.alloc(OpKind::Union, 0, None);
        for member in members {
            self.pool.push_child(union, member);
        }
        union
    }

    // ========== Filter Expression Parsing ==========

    /// Entry point: `||` binds loosest
    fn parse_expression(&mut self) -> Result<OpId, ParseError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<OpId, ParseError> {
        let mut left = self.parse_and()?;

        while self.current_kind() == Some(&TokenKind::Or) {
            self.advance();
            let right = self.parse_and()?;
            let op = self.pool.alloc(OpKind::Or, 0, None);
            self.pool.push_child(op, left);
            self.pool.push_child(op, right);
            left = op;
        }

        Ok(left)
    }

    fn parse_and(&mut self) -> Result<OpId, ParseError> {
        let mut left = self.parse_not()?;

        while self.current_kind() == Some(&TokenKind::And) {
            self.advance();
            let right = self.parse_not()?;
            let op = self.pool.alloc(OpKind::And, 0, None);
            self.pool.push_child(op, left);
            self.pool.push_child(op, right);
            left = op;
        }

        Ok(left)
    }

    /// `!` applies to a whole comparison: `!@.a == 1` negates `@.a == 1`
    fn parse_not(&mut self) -> Result<OpId, ParseError> {
        if self.current_kind() == Some(&TokenKind::Not) {
            self.advance();
            let inner = self.parse_not()?;
            let op = self.pool.alloc(OpKind::Not, 0, None);
            self.pool.push_child(op, inner);
            return Ok(op);
        }

        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<OpId, ParseError> {
        let left = self.parse_operand()?;

        let kind = match self.current_kind() {
            Some(TokenKind::Equal) => OpKind::Eq,
            Some(TokenKind::NotEqual) => OpKind::Ne,
            Some(TokenKind::LessThan) => OpKind::Lt,
            Some(TokenKind::LessEq) => OpKind::Le,
            Some(TokenKind::GreaterThan) => OpKind::Gt,
            Some(TokenKind::GreaterEq) => OpKind::Ge,
            _ => return Ok(left),
        };

        self.advance();
        let right = self.parse_operand()?;
        let op = self.pool.alloc(kind, 0, None);
        self.pool.push_child(op, left);
        self.pool.push_child(op, right);
        Ok(op)
    }

    /// Operand: sub-path, literal, wildcard, or parenthesized expression
    fn parse_operand(&mut self) -> Result<OpId, ParseError> {
        match self.current_kind().cloned() {
            Some(TokenKind::At) => {
                self.advance();
                let op = self.pool.alloc(OpKind::This, 0, None);
                if let Some(chain) = self.parse_steps()? {
                    self.pool.push_child(op, chain);
                }
                Ok(op)
            }
            Some(TokenKind::Root) => {
                self.advance();
                let op = self.pool.alloc(OpKind::Root, 0, None);
                if let Some(chain) = self.parse_steps()? {
                    self.pool.push_child(op, chain);
                }
                Ok(op)
            }
            Some(TokenKind::Number(n)) => {
                self.advance();
                Ok(self.pool.alloc(OpKind::Number, n, None))
            }
            Some(TokenKind::String(s)) => {
                self.advance();
                Ok(self.pool.alloc(OpKind::String, 0, Some(s.into_boxed_str())))
            }
            Some(TokenKind::True) => {
                self.advance();
                Ok(self.pool.alloc(OpKind::Bool, 1, None))
            }
            Some(TokenKind::False) => {
                self.advance();
                Ok(self.pool.alloc(OpKind::Bool, 0, None))
            }
            Some(TokenKind::Wildcard) => {
                self.advance();
                Ok(self.pool.alloc(OpKind::Wildcard, 0, None))
            }
            Some(TokenKind::ParenOpen) => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(&TokenKind::ParenClose)?;
                Ok(expr)
            }
            _ => Err(self.error_here()),
        }
    }

    // ========== Token Cursor ==========

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    fn current_kind(&self) -> Option<&TokenKind> {
        self.current().map(|t| &t.kind)
    }

    fn current_position(&self) -> usize {
        self.current().map(|t| t.position).unwrap_or(self.end)
    }

    fn advance(&mut self) {
        self.index += 1;
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), ParseError> {
        if self.current_kind() == Some(kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.error_here())
        }
    }

    fn error_here(&self) -> ParseError {
        ParseError {
            kind: ErrorKind::ParseError,
            position: self.current_position(),
        }
    }
}
