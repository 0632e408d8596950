//! Parser for the Kestrel language
//!
//! A recursive descent parser that produces an AST from a token stream.

use std::rc::Rc;

use crate::ast::*;
use crate::common::Span;
use crate::diagnostics::SyntaxError;
use crate::lexer::{Token, TokenKind};
use miette::Result;

/// Parse a token stream into a program
pub fn parse(tokens: &[Token], source: &str) -> Result<Program> {
    parse_tokens(tokens)
        .map_err(|e| miette::Report::new(e).with_source_code(source.to_string()))
}

pub(crate) fn parse_tokens(tokens: &[Token]) -> Result<Program, SyntaxError> {
    let mut parser = Parser::new(tokens);
    parser.parse_program()
}

type PResult<T> = std::result::Result<T, SyntaxError>;

/// Parser state
struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn current(&self) -> &'a Token {
        match self.tokens.get(self.pos).or_else(|| self.tokens.last()) {
            Some(tok) => tok,
            None => &EOF,
        }
    }

    fn peek(&self) -> TokenKind {
        self.current().kind
    }

    fn peek_n(&self, n: usize) -> TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek() == kind
    }

    fn at_any(&self, kinds: &[TokenKind]) -> bool {
        kinds.contains(&self.peek())
    }

    fn advance(&mut self) -> &'a Token {
        let tok = self.current();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> PResult<&'a Token> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(kind.as_str()))
        }
    }

    fn unexpected(&self, expected: &str) -> SyntaxError {
        let tok = self.current();
        if tok.kind == TokenKind::Eof {
            SyntaxError::UnexpectedEof {
                expected: expected.to_string(),
                span: tok.span.into(),
            }
        } else {
            SyntaxError::UnexpectedToken {
                expected: expected.to_string(),
                found: format!("`{}`", tok.text),
                line: tok.span.line,
                span: tok.span.into(),
            }
        }
    }

    fn span(&self) -> Span {
        self.current().span
    }

    /// Span of the most recently consumed token
    fn prev_span(&self) -> Span {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|t| t.span)
            .unwrap_or_default()
    }

    fn span_from(&self, start: Span) -> Span {
        start.merge(self.prev_span())
    }

    /// True if the current token sits on the same line as the previous one
    fn on_same_line(&self) -> bool {
        self.span().line == self.prev_span().line
    }

    // ==================== PROGRAM ====================

    fn parse_program(&mut self) -> PResult<Program> {
        let mut stmts = Vec::new();
        while !self.at(TokenKind::Eof) {
            if self.eat(TokenKind::Semi) {
                continue;
            }
            stmts.push(self.parse_stmt()?);
        }
        Ok(Program { stmts })
    }

    // ==================== STATEMENTS ====================

    fn parse_block(&mut self) -> PResult<Block> {
        self.expect(TokenKind::LBrace)?;
        let mut stmts = Vec::new();

        while !self.at(TokenKind::RBrace) {
            if self.at(TokenKind::Eof) {
                return Err(self.unexpected("`}`"));
            }
            if self.eat(TokenKind::Semi) {
                continue;
            }
            stmts.push(self.parse_stmt()?);
        }

        self.expect(TokenKind::RBrace)?;
        Ok(Block { stmts })
    }

    fn parse_stmt(&mut self) -> PResult<Stmt> {
        let stmt = self.parse_simple_stmt()?;
        self.eat(TokenKind::Semi);
        Ok(stmt)
    }

    /// A statement without its optional trailing `;`
    fn parse_simple_stmt(&mut self) -> PResult<Stmt> {
        let start = self.span();

        let kind = match self.peek() {
            TokenKind::Let => {
                self.advance();
                let name = self.parse_ident()?;
                self.expect(TokenKind::Eq)?;
                let value = self.parse_expr()?;
                StmtKind::Let { name, value }
            }
            TokenKind::Const => {
                self.advance();
                let name = self.parse_ident()?;
                self.expect(TokenKind::Eq)?;
                let value = self.parse_expr()?;
                StmtKind::Const { name, value }
            }
            TokenKind::Fn if self.peek_n(1) == TokenKind::Ident => {
                StmtKind::Fn(Rc::new(self.parse_fn()?))
            }
            TokenKind::Return => {
                self.advance();
                let value = if self.at_any(&[TokenKind::RBrace, TokenKind::Semi, TokenKind::Eof])
                    || !self.on_same_line()
                {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                StmtKind::Return(value)
            }
            TokenKind::Defer => {
                self.advance();
                StmtKind::Defer(self.parse_expr()?)
            }
            TokenKind::Enum => StmtKind::Enum(self.parse_enum()?),
            TokenKind::Break => {
                self.advance();
                StmtKind::Break
            }
            TokenKind::Continue => {
                self.advance();
                StmtKind::Continue
            }
            TokenKind::Throw => {
                self.advance();
                StmtKind::Throw(self.parse_expr()?)
            }
            _ => {
                let expr = self.parse_expr()?;

                if let Some(op) = self.assignment_op() {
                    if !matches!(expr.kind, ExprKind::Ident(_) | ExprKind::Index { .. }) {
                        return Err(SyntaxError::InvalidAssignTarget {
                            line: expr.span.line,
                            span: expr.span.into(),
                        });
                    }
                    self.advance();
                    let value = self.parse_expr()?;
                    StmtKind::Assign {
                        target: expr,
                        op,
                        value,
                    }
                } else {
                    StmtKind::Expr(expr)
                }
            }
        };

        Ok(Stmt {
            kind,
            span: self.span_from(start),
        })
    }

    fn assignment_op(&self) -> Option<AssignOp> {
        match self.peek() {
            TokenKind::Eq => Some(AssignOp::Assign),
            TokenKind::PlusEq => Some(AssignOp::AddAssign),
            TokenKind::MinusEq => Some(AssignOp::SubAssign),
            TokenKind::StarEq => Some(AssignOp::MulAssign),
            TokenKind::SlashEq => Some(AssignOp::DivAssign),
            TokenKind::PercentEq => Some(AssignOp::RemAssign),
            _ => None,
        }
    }

    // ==================== DECLARATIONS ====================

    /// `fn [name](params) { body }`
    fn parse_fn(&mut self) -> PResult<FnDecl> {
        let start = self.span();
        self.expect(TokenKind::Fn)?;

        let name = if self.at(TokenKind::Ident) {
            self.parse_ident()?
        } else {
            "<anonymous>".to_string()
        };

        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        while !self.at(TokenKind::RParen) {
            params.push(self.parse_ident()?);
            if !self.at(TokenKind::RParen) {
                self.expect(TokenKind::Comma)?;
            }
        }
        self.expect(TokenKind::RParen)?;

        let body = self.parse_block()?;
        let end_line = self.prev_span().line;

        Ok(FnDecl {
            name,
            params,
            body,
            span: self.span_from(start),
            end_line,
        })
    }

    fn parse_enum(&mut self) -> PResult<EnumDecl> {
        self.expect(TokenKind::Enum)?;
        let name = self.parse_ident()?;

        self.expect(TokenKind::LBrace)?;
        let mut variants = Vec::new();
        while !self.at(TokenKind::RBrace) {
            variants.push(self.parse_ident()?);
            if !self.at(TokenKind::RBrace) {
                self.expect(TokenKind::Comma)?;
            }
        }
        self.expect(TokenKind::RBrace)?;

        Ok(EnumDecl { name, variants })
    }

    // ==================== EXPRESSIONS ====================

    fn parse_expr(&mut self) -> PResult<Expr> {
        let start = self.span();
        let left = self.parse_expr_with_precedence(1)?;

        if self.eat(TokenKind::DotDot) {
            let right = self.parse_expr_with_precedence(1)?;
            return Ok(Expr {
                kind: ExprKind::Range {
                    start: Box::new(left),
                    end: Box::new(right),
                },
                span: self.span_from(start),
            });
        }

        Ok(left)
    }

    fn parse_expr_with_precedence(&mut self, min_prec: u8) -> PResult<Expr> {
        let start = self.span();
        let mut left = self.parse_unary()?;

        while let Some((op, prec)) = self.binary_op_info() {
            if prec < min_prec {
                break;
            }

            self.advance();
            let right = self.parse_expr_with_precedence(prec + 1)?;

            left = Expr {
                kind: ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span: self.span_from(start),
            };
        }

        Ok(left)
    }

    fn binary_op_info(&self) -> Option<(BinaryOp, u8)> {
        let info = match self.peek() {
            TokenKind::PipePipe => (BinaryOp::Or, 1),
            TokenKind::AmpAmp => (BinaryOp::And, 2),
            TokenKind::EqEq => (BinaryOp::Eq, 3),
            TokenKind::Ne => (BinaryOp::Ne, 3),
            TokenKind::Lt => (BinaryOp::Lt, 4),
            TokenKind::Le => (BinaryOp::Le, 4),
            TokenKind::Gt => (BinaryOp::Gt, 4),
            TokenKind::Ge => (BinaryOp::Ge, 4),
            TokenKind::Plus => (BinaryOp::Add, 5),
            TokenKind::Minus => (BinaryOp::Sub, 5),
            TokenKind::Star => (BinaryOp::Mul, 6),
            TokenKind::Slash => (BinaryOp::Div, 6),
            TokenKind::Percent => (BinaryOp::Rem, 6),
            _ => return None,
        };
        Some(info)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        let start = self.span();
        let op = match self.peek() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Bang => UnaryOp::Not,
            _ => return self.parse_postfix(),
        };
        self.advance();
        let expr = self.parse_unary()?;
        Ok(Expr {
            kind: ExprKind::Unary {
                op,
                expr: Box::new(expr),
            },
            span: self.span_from(start),
        })
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let start = self.span();
        let mut expr = self.parse_primary()?;

        // A `(` or `[` on a new line starts a new statement, not a call or index
        while self.on_same_line() {
            match self.peek() {
                TokenKind::LParen => {
                    self.advance();
                    let mut args = Vec::new();
                    while !self.at(TokenKind::RParen) {
                        args.push(self.parse_expr()?);
                        if !self.at(TokenKind::RParen) {
                            self.expect(TokenKind::Comma)?;
                        }
                    }
                    self.expect(TokenKind::RParen)?;
                    expr = Expr {
                        kind: ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        span: self.span_from(start),
                    };
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect(TokenKind::RBracket)?;
                    expr = Expr {
                        kind: ExprKind::Index {
                            base: Box::new(expr),
                            index: Box::new(index),
                        },
                        span: self.span_from(start),
                    };
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let start = self.span();

        let kind = match self.peek() {
            // Literals
            TokenKind::IntLit => {
                let tok = self.advance();
                let value: i64 = tok.text.replace('_', "").parse().map_err(|_| {
                    SyntaxError::InvalidNumber {
                        text: tok.text.clone(),
                        line: tok.span.line,
                        span: tok.span.into(),
                    }
                })?;
                ExprKind::Literal(Literal::Int(value))
            }
            TokenKind::FloatLit => {
                let tok = self.advance();
                let value: f64 = tok.text.replace('_', "").parse().map_err(|_| {
                    SyntaxError::InvalidNumber {
                        text: tok.text.clone(),
                        line: tok.span.line,
                        span: tok.span.into(),
                    }
                })?;
                ExprKind::Literal(Literal::Float(value))
            }
            TokenKind::StringLit => {
                let text = &self.advance().text;
                ExprKind::Literal(Literal::String(unescape(&text[1..text.len() - 1])))
            }
            TokenKind::True => {
                self.advance();
                ExprKind::Literal(Literal::Bool(true))
            }
            TokenKind::False => {
                self.advance();
                ExprKind::Literal(Literal::Bool(false))
            }
            TokenKind::Nil => {
                self.advance();
                ExprKind::Literal(Literal::Nil)
            }

            // Identifiers and enum paths
            TokenKind::Ident => {
                let name = self.parse_ident()?;
                if self.eat(TokenKind::ColonColon) {
                    let variant = self.parse_ident()?;
                    ExprKind::Path {
                        enum_name: name,
                        variant,
                    }
                } else {
                    ExprKind::Ident(name)
                }
            }

            // Grouped expression
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                return Ok(expr);
            }

            // Array literal
            TokenKind::LBracket => {
                self.advance();
                let mut elements = Vec::new();
                while !self.at(TokenKind::RBracket) {
                    elements.push(self.parse_expr()?);
                    if !self.at(TokenKind::RBracket) {
                        self.expect(TokenKind::Comma)?;
                    }
                }
                self.expect(TokenKind::RBracket)?;
                ExprKind::Array(elements)
            }

            // Map literal
            TokenKind::LBrace => {
                self.advance();
                let mut entries = Vec::new();
                while !self.at(TokenKind::RBrace) {
                    let key = self.parse_expr()?;
                    self.expect(TokenKind::Colon)?;
                    let value = self.parse_expr()?;
                    entries.push((key, value));
                    if !self.at(TokenKind::RBrace) {
                        self.expect(TokenKind::Comma)?;
                    }
                }
                self.expect(TokenKind::RBrace)?;
                ExprKind::Map(entries)
            }

            TokenKind::Fn => ExprKind::Function(Rc::new(self.parse_fn()?)),

            TokenKind::If => return self.parse_if(),
            TokenKind::Unless => self.parse_unless()?,
            TokenKind::Case => self.parse_case()?,
            TokenKind::While => {
                self.advance();
                let condition = Box::new(self.parse_expr()?);
                let body = self.parse_block()?;
                ExprKind::While { condition, body }
            }
            TokenKind::Loop => {
                self.advance();
                ExprKind::Loop(self.parse_block()?)
            }
            TokenKind::For => self.parse_for()?,
            TokenKind::Try => self.parse_try()?,

            _ => return Err(self.unexpected("expression")),
        };

        Ok(Expr {
            kind,
            span: self.span_from(start),
        })
    }

    fn parse_if(&mut self) -> PResult<Expr> {
        let start = self.span();
        self.expect(TokenKind::If)?;
        let condition = Box::new(self.parse_expr()?);
        let then_branch = self.parse_block()?;

        let else_branch = if self.eat(TokenKind::Else) {
            if self.at(TokenKind::If) {
                Some(Box::new(self.parse_if()?))
            } else {
                let else_start = self.span();
                let block = self.parse_block()?;
                Some(Box::new(Expr {
                    kind: ExprKind::Block(block),
                    span: self.span_from(else_start),
                }))
            }
        } else {
            None
        };

        Ok(Expr {
            kind: ExprKind::If {
                condition,
                then_branch,
                else_branch,
            },
            span: self.span_from(start),
        })
    }

    fn parse_unless(&mut self) -> PResult<ExprKind> {
        self.expect(TokenKind::Unless)?;
        let condition = Box::new(self.parse_expr()?);
        let body = self.parse_block()?;
        let else_branch = if self.eat(TokenKind::Else) {
            Some(self.parse_block()?)
        } else {
            None
        };
        Ok(ExprKind::Unless {
            condition,
            body,
            else_branch,
        })
    }

    /// `case subject { 1, 2 => { ... } else => { ... } }`
    fn parse_case(&mut self) -> PResult<ExprKind> {
        self.expect(TokenKind::Case)?;
        let subject = Box::new(self.parse_expr()?);
        self.expect(TokenKind::LBrace)?;

        let mut arms = Vec::new();
        let mut default = None;
        while !self.at(TokenKind::RBrace) {
            if self.eat(TokenKind::Else) {
                self.expect(TokenKind::FatArrow)?;
                default = Some(self.parse_block()?);
            } else {
                let mut patterns = vec![self.parse_expr()?];
                while self.eat(TokenKind::Comma) {
                    patterns.push(self.parse_expr()?);
                }
                self.expect(TokenKind::FatArrow)?;
                let body = self.parse_block()?;
                arms.push(CaseArm { patterns, body });
            }
            self.eat(TokenKind::Comma);
        }
        self.expect(TokenKind::RBrace)?;

        Ok(ExprKind::Case {
            subject,
            arms,
            default,
        })
    }

    fn parse_for(&mut self) -> PResult<ExprKind> {
        self.expect(TokenKind::For)?;

        if self.eat(TokenKind::LParen) {
            let init = if self.at(TokenKind::Semi) {
                None
            } else {
                Some(Box::new(self.parse_simple_stmt()?))
            };
            self.expect(TokenKind::Semi)?;
            let condition = if self.at(TokenKind::Semi) {
                None
            } else {
                Some(Box::new(self.parse_expr()?))
            };
            self.expect(TokenKind::Semi)?;
            let update = if self.at(TokenKind::RParen) {
                None
            } else {
                Some(Box::new(self.parse_simple_stmt()?))
            };
            self.expect(TokenKind::RParen)?;
            let body = self.parse_block()?;
            return Ok(ExprKind::For {
                init,
                condition,
                update,
                body,
            });
        }

        let first = self.parse_ident()?;
        if self.eat(TokenKind::Comma) {
            let value = self.parse_ident()?;
            self.expect(TokenKind::In)?;
            let map = Box::new(self.parse_expr()?);
            let body = self.parse_block()?;
            return Ok(ExprKind::ForMap {
                key: first,
                value,
                map,
                body,
            });
        }

        self.expect(TokenKind::In)?;
        let iterable = self.parse_expr()?;
        let body = self.parse_block()?;

        Ok(match iterable.kind {
            ExprKind::Range { start, end } => ExprKind::ForRange {
                var: first,
                start,
                end,
                body,
            },
            _ => ExprKind::ForEach {
                var: first,
                iterable: Box::new(iterable),
                body,
            },
        })
    }

    fn parse_try(&mut self) -> PResult<ExprKind> {
        self.expect(TokenKind::Try)?;
        let body = self.parse_block()?;

        let catch = if self.eat(TokenKind::Catch) {
            let binding = if self.at(TokenKind::Ident) {
                Some(self.parse_ident()?)
            } else {
                None
            };
            Some(CatchClause {
                binding,
                body: self.parse_block()?,
            })
        } else {
            None
        };

        let finally = if self.eat(TokenKind::Finally) {
            Some(self.parse_block()?)
        } else {
            None
        };

        if catch.is_none() && finally.is_none() {
            return Err(self.unexpected("`catch` or `finally`"));
        }

        Ok(ExprKind::Try {
            body,
            catch,
            finally,
        })
    }

    // ==================== HELPERS ====================

    fn parse_ident(&mut self) -> PResult<String> {
        if self.at(TokenKind::Ident) {
            Ok(self.advance().text.clone())
        } else {
            Err(self.unexpected("identifier"))
        }
    }
}

static EOF: Token = Token {
    kind: TokenKind::Eof,
    span: Span {
        start: 0,
        end: 0,
        line: 1,
    },
    text: String::new(),
};

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_str(source: &str) -> Program {
        let tokens = tokenize(source).unwrap();
        parse_tokens(&tokens).unwrap()
    }

    #[test]
    fn unescape_handles_common_sequences() {
        assert_eq!(unescape(r#"a\nb\t\"c\"\\"#), "a\nb\t\"c\"\\");
    }

    #[test]
    fn function_records_closing_line() {
        let program = parse_str("fn add(a, b) {\n  let c = a + b\n  return c\n}\n");
        let functions = program.functions();
        let add = &functions["add"];
        assert_eq!(add.begin_line(), 1);
        assert_eq!(add.end_line, 4);
        assert_eq!(add.params, vec!["a", "b"]);
    }

    #[test]
    fn call_on_next_line_is_a_new_statement() {
        let program = parse_str("let a = b\n(c)");
        assert_eq!(program.stmts.len(), 2);
    }

    #[test]
    fn range_iteration_becomes_for_range() {
        let program = parse_str("for i in 0..3 { println(i) }");
        let StmtKind::Expr(expr) = &program.stmts[0].kind else {
            panic!("expected expression statement");
        };
        assert_eq!(expr.node_kind(), NodeKind::ForRange);
    }

    #[test]
    fn literal_assignment_target_is_rejected() {
        let tokens = tokenize("1 = 2").unwrap();
        let err = parse_tokens(&tokens).unwrap_err();
        assert!(matches!(err, SyntaxError::InvalidAssignTarget { line: 1, .. }));
    }
}
