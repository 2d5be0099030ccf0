//! Statement parsing implementation
//!
//! This module handles parsing of all Python statement types:
//!
//! - Simple statements, several per line when separated by `;`
//! - Assignment forms: plain, chained, unpacking, augmented, annotated
//! - Control flow: `if`/`elif`/`else`, `while`, `for`, `try`
//! - Jump statements: `return`, `break`, `continue`, `raise`
//! - Indented blocks and single-line suites (`if x: y = 1`)
//!
//! # Grammar
//!
//! ```text
//! statement   ::= compound_stmt | simple_stmt (";" simple_stmt)* NEWLINE
//! block       ::= NEWLINE INDENT statement+ DEDENT | simple_stmt_line
//! ```
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::{ParseError, Parser};

impl Parser {
    /// Parse one logical statement line (or compound statement) into `out`
    pub(crate) fn parse_statement(&mut self, out: &mut Vec<Stmt>) -> Result<(), ParseError> {
        let loc = self.current_location();

        match self.peek_kind() {
            TokenKind::If => {
                self.advance();
                out.push(self.parse_if_statement(loc)?);
            }
            TokenKind::While => {
                self.advance();
                out.push(self.parse_while_statement(loc)?);
            }
            TokenKind::For => {
                self.advance();
                out.push(self.parse_for_statement(loc)?);
            }
            TokenKind::Try => {
                self.advance();
                out.push(self.parse_try_statement(loc)?);
            }
            TokenKind::Def => {
                self.advance();
                out.push(self.parse_function_definition(loc)?);
            }
            TokenKind::Class => {
                self.advance();
                out.push(self.parse_class_definition(loc)?);
            }
            TokenKind::At => {
                return Err(ParseError::new(
                    "decorators are not supported in this Python subset",
                    loc,
                ));
            }
            _ => self.parse_simple_statement_line(out)?,
        }
        Ok(())
    }

    /// `small (';' small)* [';'] NEWLINE`
    fn parse_simple_statement_line(&mut self, out: &mut Vec<Stmt>) -> Result<(), ParseError> {
        loop {
            out.push(self.parse_simple_statement()?);
            if !self.match_token(&TokenKind::Semicolon) {
                break;
            }
            if self.check(&TokenKind::Newline) || self.is_at_end() {
                break;
            }
        }
        if !self.match_token(&TokenKind::Newline) && !self.is_at_end() {
            return Err(self.error_here("expected end of line"));
        }
        Ok(())
    }

    /// Parse the suite after a `:`
    pub(crate) fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut body = Vec::new();

        if !self.match_token(&TokenKind::Newline) {
            self.parse_simple_statement_line(&mut body)?;
            return Ok(body);
        }

        if !self.match_token(&TokenKind::Indent) {
            return Err(ParseError::new(
                "expected an indented block",
                self.current_location(),
            ));
        }

        while !self.check(&TokenKind::Dedent) && !self.is_at_end() {
            if self.match_token(&TokenKind::Newline) {
                continue;
            }
            if self.check(&TokenKind::Indent) {
                return Err(ParseError::new("unexpected indent", self.current_location()));
            }
            self.parse_statement(&mut body)?;
        }
        self.match_token(&TokenKind::Dedent);

        Ok(body)
    }

    fn parse_simple_statement(&mut self) -> Result<Stmt, ParseError> {
        let loc = self.current_location();

        let kind = match self.peek_kind() {
            TokenKind::Pass => {
                self.advance();
                StmtKind::Pass
            }
            TokenKind::Break => {
                self.advance();
                StmtKind::Break
            }
            TokenKind::Continue => {
                self.advance();
                StmtKind::Continue
            }
            TokenKind::Return => {
                self.advance();
                if self.at_statement_end() {
                    StmtKind::Return(None)
                } else {
                    StmtKind::Return(Some(self.parse_expression_list()?))
                }
            }
            TokenKind::Raise => {
                self.advance();
                if self.at_statement_end() {
                    StmtKind::Raise(None)
                } else {
                    let exc = self.parse_expression()?;
                    if self.check(&TokenKind::From) {
                        return Err(self.error_here("'raise ... from' is not supported"));
                    }
                    StmtKind::Raise(Some(exc))
                }
            }
            TokenKind::Global => {
                self.advance();
                StmtKind::Global(self.parse_name_list()?)
            }
            TokenKind::Nonlocal => {
                self.advance();
                StmtKind::Nonlocal(self.parse_name_list()?)
            }
            TokenKind::Del => {
                self.advance();
                let mut targets = vec![self.parse_bitwise_or()?];
                while self.match_token(&TokenKind::Comma) {
                    if self.at_statement_end() {
                        break;
                    }
                    targets.push(self.parse_bitwise_or()?);
                }
                for target in &targets {
                    check_delete_target(target)?;
                }
                StmtKind::Delete(targets)
            }
            TokenKind::Assert => {
                self.advance();
                let test = self.parse_expression()?;
                let message = if self.match_token(&TokenKind::Comma) {
                    Some(self.parse_expression()?)
                } else {
                    None
                };
                StmtKind::Assert { test, message }
            }
            TokenKind::Import => {
                self.advance();
                let module = self.parse_dotted_name()?;
                let alias = if self.match_token(&TokenKind::As) {
                    Some(self.expect_identifier()?)
                } else {
                    None
                };
                if self.check(&TokenKind::Comma) {
                    return Err(self.error_here("import one module per statement"));
                }
                StmtKind::Import { module, alias }
            }
            TokenKind::From => {
                self.advance();
                let module = self.parse_dotted_name()?;
                self.expect_token(&TokenKind::Import, "expected 'import'")?;
                let parenthesized = self.match_token(&TokenKind::LParen);
                let mut names = Vec::new();
                if self.match_token(&TokenKind::Star) {
                    names.push(("*".to_string(), None));
                } else {
                    loop {
                        let name = self.expect_identifier()?;
                        let alias = if self.match_token(&TokenKind::As) {
                            Some(self.expect_identifier()?)
                        } else {
                            None
                        };
                        names.push((name, alias));
                        if !self.match_token(&TokenKind::Comma) {
                            break;
                        }
                        if parenthesized && self.check(&TokenKind::RParen) {
                            break;
                        }
                    }
                }
                if parenthesized {
                    self.expect_token(&TokenKind::RParen, "expected ')'")?;
                }
                StmtKind::ImportFrom { module, names }
            }
            _ => return self.parse_expression_statement(loc),
        };

        Ok(Stmt::new(kind, loc))
    }

    /// Expression statement, or one of the assignment forms
    fn parse_expression_statement(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        let first = self.parse_expression_list()?;

        if self.check(&TokenKind::Eq) {
            let mut targets = vec![first];
            let mut value = None;
            while self.match_token(&TokenKind::Eq) {
                let next = self.parse_expression_list()?;
                if let Some(previous) = value.replace(next) {
                    targets.push(previous);
                }
            }
            for target in &targets {
                check_assign_target(target)?;
            }
            let value = value.ok_or_else(|| self.error_here("expected expression"))?;
            return Ok(Stmt::new(StmtKind::Assign { targets, value }, loc));
        }

        if let Some(op) = self.match_augmented_operator() {
            if !matches!(
                first.kind,
                ExprKind::Name(_) | ExprKind::Attribute { .. } | ExprKind::Subscript { .. }
            ) {
                return Err(ParseError::new(
                    "'expression' is an illegal expression for augmented assignment",
                    first.location,
                ));
            }
            let value = self.parse_expression_list()?;
            return Ok(Stmt::new(
                StmtKind::AugAssign {
                    target: first,
                    op,
                    value,
                },
                loc,
            ));
        }

        if self.match_token(&TokenKind::Colon) {
            if matches!(first.kind, ExprKind::Tuple(_) | ExprKind::List(_)) {
                return Err(ParseError::new(
                    "only single target (not tuple) can be annotated",
                    first.location,
                ));
            }
            check_assign_target(&first)?;
            // The annotation is evaluated by nothing; parse and drop it
            self.parse_expression()?;
            let value = if self.match_token(&TokenKind::Eq) {
                Some(self.parse_expression_list()?)
            } else {
                None
            };
            return Ok(Stmt::new(
                StmtKind::AnnAssign {
                    target: first,
                    value,
                },
                loc,
            ));
        }

        Ok(Stmt::new(StmtKind::Expr(first), loc))
    }

    fn match_augmented_operator(&mut self) -> Option<BinOp> {
        let op = match self.peek_kind() {
            TokenKind::PlusEq => BinOp::Add,
            TokenKind::MinusEq => BinOp::Sub,
            TokenKind::StarEq => BinOp::Mul,
            TokenKind::SlashEq => BinOp::Div,
            TokenKind::DoubleSlashEq => BinOp::FloorDiv,
            TokenKind::PercentEq => BinOp::Mod,
            TokenKind::DoubleStarEq => BinOp::Pow,
            TokenKind::AmpEq => BinOp::BitAnd,
            TokenKind::PipeEq => BinOp::BitOr,
            TokenKind::CaretEq => BinOp::BitXor,
            TokenKind::ShlEq => BinOp::Shl,
            TokenKind::ShrEq => BinOp::Shr,
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    fn parse_if_statement(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        let condition = self.parse_expression()?;
        self.expect_colon()?;
        let body = self.parse_block()?;

        let elif_loc = self.current_location();
        let orelse = if self.match_token(&TokenKind::Elif) {
            vec![self.parse_if_statement(elif_loc)?]
        } else if self.match_token(&TokenKind::Else) {
            self.expect_colon()?;
            self.parse_block()?
        } else {
            Vec::new()
        };

        Ok(Stmt::new(
            StmtKind::If {
                condition,
                body,
                orelse,
            },
            loc,
        ))
    }

    fn parse_while_statement(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        let condition = self.parse_expression()?;
        self.expect_colon()?;
        let body = self.parse_block()?;
        let orelse = self.parse_else_block()?;

        Ok(Stmt::new(
            StmtKind::While {
                condition,
                body,
                orelse,
            },
            loc,
        ))
    }

    fn parse_for_statement(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        let target = self.parse_target_list()?;
        self.expect_token(&TokenKind::In, "expected 'in'")?;
        let iter = self.parse_expression_list()?;
        self.expect_colon()?;
        let body = self.parse_block()?;
        let orelse = self.parse_else_block()?;

        Ok(Stmt::new(
            StmtKind::For {
                target,
                iter,
                body,
                orelse,
            },
            loc,
        ))
    }

    fn parse_else_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        if self.match_token(&TokenKind::Else) {
            self.expect_colon()?;
            self.parse_block()
        } else {
            Ok(Vec::new())
        }
    }

    fn parse_try_statement(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        self.expect_colon()?;
        let body = self.parse_block()?;

        let mut handlers = Vec::new();
        while self.check(&TokenKind::Except) {
            let handler_loc = self.current_location();
            self.advance();
            let (kind, name) = if self.check(&TokenKind::Colon) {
                (None, None)
            } else {
                let kind = self.parse_expression()?;
                let name = if self.match_token(&TokenKind::As) {
                    Some(self.expect_identifier()?)
                } else {
                    None
                };
                (Some(kind), name)
            };
            self.expect_colon()?;
            let handler_body = self.parse_block()?;
            if handlers.last().is_some_and(|h: &ExceptHandler| h.kind.is_none()) {
                return Err(ParseError::new("default 'except:' must be last", handler_loc));
            }
            handlers.push(ExceptHandler {
                kind,
                name,
                body: handler_body,
                location: handler_loc,
            });
        }

        let orelse = if !handlers.is_empty() {
            self.parse_else_block()?
        } else {
            Vec::new()
        };

        let finalbody = if self.match_token(&TokenKind::Finally) {
            self.expect_colon()?;
            self.parse_block()?
        } else {
            Vec::new()
        };

        if handlers.is_empty() && finalbody.is_empty() {
            return Err(self.error_here("expected 'except' or 'finally' block"));
        }

        Ok(Stmt::new(
            StmtKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            },
            loc,
        ))
    }

    pub(crate) fn at_statement_end(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Newline | TokenKind::Semicolon | TokenKind::Eof
        )
    }

    fn parse_name_list(&mut self) -> Result<Vec<String>, ParseError> {
        let mut names = vec![self.expect_identifier()?];
        while self.match_token(&TokenKind::Comma) {
            names.push(self.expect_identifier()?);
        }
        Ok(names)
    }

    fn parse_dotted_name(&mut self) -> Result<String, ParseError> {
        let mut name = self.expect_identifier()?;
        while self.match_token(&TokenKind::Dot) {
            name.push('.');
            name.push_str(&self.expect_identifier()?);
        }
        Ok(name)
    }
}

/// Reject assignment targets that are not names, attributes, subscripts or
/// (nested) unpacking lists of those
pub(crate) fn check_assign_target(target: &Expr) -> Result<(), ParseError> {
    match &target.kind {
        ExprKind::Name(_) | ExprKind::Attribute { .. } | ExprKind::Subscript { .. } => Ok(()),
        ExprKind::Tuple(items) | ExprKind::List(items) => {
            items.iter().try_for_each(check_assign_target)
        }
        ExprKind::Call { .. } => Err(ParseError::new(
            "cannot assign to function call here. Maybe you meant '==' instead of '='?",
            target.location,
        )),
        ExprKind::Int(_)
        | ExprKind::Float(_)
        | ExprKind::Str(_)
        | ExprKind::Bool(_)
        | ExprKind::NoneLiteral
        | ExprKind::FString(_) => Err(ParseError::new(
            "cannot assign to literal here. Maybe you meant '==' instead of '='?",
            target.location,
        )),
        _ => Err(ParseError::new(
            "cannot assign to expression here. Maybe you meant '==' instead of '='?",
            target.location,
        )),
    }
}

fn check_delete_target(target: &Expr) -> Result<(), ParseError> {
    match &target.kind {
        ExprKind::Name(_) | ExprKind::Attribute { .. } | ExprKind::Subscript { .. } => Ok(()),
        ExprKind::Tuple(items) | ExprKind::List(items) => {
            items.iter().try_for_each(check_delete_target)
        }
        _ => Err(ParseError::new("cannot delete expression", target.location)),
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::parse::parse_source;

    fn parse(source: &str) -> Vec<Stmt> {
        parse_source(source, CodeOrigin::Submitted).unwrap().body
    }

    #[test]
    fn test_elif_chain_nests_in_orelse() {
        let body = parse("if a:\n    x = 1\nelif b:\n    x = 2\nelse:\n    x = 3\n");
        assert_eq!(body.len(), 1);
        match &body[0].kind {
            StmtKind::If { orelse, .. } => {
                assert_eq!(orelse.len(), 1);
                assert_eq!(orelse[0].location.line, 3);
                assert!(matches!(orelse[0].kind, StmtKind::If { .. }));
            }
            _ => panic!("Expected if statement"),
        }
    }

    #[test]
    fn test_chained_and_unpacking_assignment() {
        let body = parse("a = b = 0\nx, y = 1, 2\n");
        match &body[0].kind {
            StmtKind::Assign { targets, .. } => assert_eq!(targets.len(), 2),
            _ => panic!("Expected assignment"),
        }
        match &body[1].kind {
            StmtKind::Assign { targets, value } => {
                assert!(matches!(targets[0].kind, ExprKind::Tuple(_)));
                assert!(matches!(value.kind, ExprKind::Tuple(_)));
            }
            _ => panic!("Expected assignment"),
        }
    }

    #[test]
    fn test_augmented_and_annotated_assignment() {
        let body = parse("total += 1\ncount: int = 0\n");
        assert!(matches!(body[0].kind, StmtKind::AugAssign { op: BinOp::Add, .. }));
        assert!(matches!(body[1].kind, StmtKind::AnnAssign { value: Some(_), .. }));
    }

    #[test]
    fn test_try_except_else_finally() {
        let source = "try:\n    x = 1\nexcept ValueError as e:\n    pass\nexcept:\n    pass\nelse:\n    y = 2\nfinally:\n    z = 3\n";
        let body = parse(source);
        match &body[0].kind {
            StmtKind::Try {
                handlers,
                orelse,
                finalbody,
                ..
            } => {
                assert_eq!(handlers.len(), 2);
                assert_eq!(handlers[0].name.as_deref(), Some("e"));
                assert!(handlers[1].kind.is_none());
                assert_eq!(orelse.len(), 1);
                assert_eq!(finalbody.len(), 1);
            }
            _ => panic!("Expected try statement"),
        }
    }

    #[test]
    fn test_single_line_suite() {
        let body = parse("for i in range(3): print(i)\n");
        match &body[0].kind {
            StmtKind::For { body, .. } => assert_eq!(body.len(), 1),
            _ => panic!("Expected for statement"),
        }
    }

    #[test]
    fn test_assign_to_literal_is_error() {
        let err = parse_source("1 = x\n", CodeOrigin::Submitted).unwrap_err();
        assert!(err.message.contains("cannot assign to literal"));
    }

    #[test]
    fn test_missing_block() {
        let err = parse_source("if x:\ny = 1\n", CodeOrigin::Submitted).unwrap_err();
        assert_eq!(err.message, "expected an indented block");
        assert_eq!(err.location.line, 2);
    }
}
