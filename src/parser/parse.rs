//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct and core parsing infrastructure,
//! including error types, helper methods, and the main parse entry point.
//!
//! # Parser Architecture
//!
//! The Parser uses a recursive descent approach with the following organization:
//! - This module: Parser struct, helper methods, and coordination
//! - `declarations`: `def`, `class`, `lambda` and the per-function name analysis
//! - `statements`: simple and compound statements, indented blocks
//! - `expressions`: expressions with one method per precedence level
//!
//! # Implementation
//!
//! Parser methods are split across multiple files using `impl Parser` blocks,
//! allowing each module to extend the Parser with related functionality while
//! maintaining access to the shared parser state.

use crate::parser::ast::*;
use crate::parser::lexer::{LexError, Lexer, Token, TokenKind};
use thiserror::Error;

/// Deepest expression nesting accepted. Brackets, unary operators and every
/// link of an operator or postfix chain count one level each, so the AST and
/// the evaluator's recursion over it stay shallow.
pub(crate) const MAX_NESTING_DEPTH: usize = 100;

/// Parser error type. Lexer failures are folded into it so callers see one
/// syntax-error shape with a line and a message.
#[derive(Debug, Clone, Error)]
#[error("Parse error at line {}, column {}: {message}", .location.line, .location.column)]
pub struct ParseError {
    pub message: String,
    pub location: SourceLocation,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>, location: SourceLocation) -> Self {
        ParseError {
            message: message.into(),
            location,
        }
    }
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError {
            message: err.message,
            location: err.location,
        }
    }
}

/// Recursive descent parser for the Python subset
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) position: usize,
    /// Current expression nesting, bounded by [`MAX_NESTING_DEPTH`]
    pub(crate) depth: usize,
}

impl Parser {
    pub fn new(source: &str) -> Result<Self, ParseError> {
        let tokens = Lexer::new(source).tokenize()?;
        Ok(Self {
            tokens,
            position: 0,
            depth: 0,
        })
    }

    /// Parser for a fragment nested `depth` levels inside another expression
    pub(crate) fn from_tokens(tokens: Vec<Token>, depth: usize) -> Self {
        Self {
            tokens,
            position: 0,
            depth,
        }
    }

    /// Parse the entire module body
    pub fn parse_program(&mut self, origin: CodeOrigin) -> Result<Program, ParseError> {
        let mut program = Program::new(origin);

        while !self.is_at_end() {
            if self.match_token(&TokenKind::Newline) {
                continue;
            }
            if self.check(&TokenKind::Indent) {
                return Err(ParseError::new("unexpected indent", self.current_location()));
            }
            self.parse_statement(&mut program.body)?;
        }

        check_block(&program.body, BlockContext::MODULE)?;
        Ok(program)
    }

    // ===== Helper methods =====

    pub(crate) fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.peek_kind()) == std::mem::discriminant(kind)
    }

    pub(crate) fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.position += 1;
        }
        self.previous()
    }

    pub(crate) fn is_at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    pub(crate) fn peek(&self) -> &Token {
        // The lexer always terminates the stream with Eof and `advance`
        // never moves past it.
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    pub(crate) fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    pub(crate) fn peek_ahead(&self, n: usize) -> Option<&TokenKind> {
        self.tokens.get(self.position + n).map(|t| &t.kind)
    }

    pub(crate) fn previous(&self) -> &Token {
        &self.tokens[self.position.saturating_sub(1)]
    }

    pub(crate) fn current_location(&self) -> SourceLocation {
        self.peek().location
    }

    pub(crate) fn expect_token(&mut self, kind: &TokenKind, message: &str) -> Result<(), ParseError> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.error_here(message))
        }
    }

    pub(crate) fn expect_colon(&mut self) -> Result<(), ParseError> {
        self.expect_token(&TokenKind::Colon, "expected ':'")
    }

    pub(crate) fn expect_identifier(&mut self) -> Result<String, ParseError> {
        if let TokenKind::Name(name) = self.peek_kind() {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.error_here("expected identifier"))
        }
    }

    /// Enter one more level of expression nesting
    pub(crate) fn descend(&mut self) -> Result<(), ParseError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ParseError::new(
                "expression is too deeply nested",
                self.current_location(),
            ));
        }
        self.depth += 1;
        Ok(())
    }

    /// Leave `levels` levels entered with [`Parser::descend`]
    pub(crate) fn ascend(&mut self, levels: usize) {
        self.depth = self.depth.saturating_sub(levels);
    }

    /// Build an error at the current token, naming what was found
    pub(crate) fn error_here(&self, message: &str) -> ParseError {
        let found = self.peek_kind();
        let message = match found {
            TokenKind::Unsupported(word) => {
                format!("'{}' is not supported in this Python subset", word)
            }
            TokenKind::Indent => "unexpected indent".to_string(),
            _ => format!("invalid syntax: {}, found {}", message, found),
        };
        ParseError::new(message, self.current_location())
    }
}

/// Where a block sits, for the statements only valid inside a loop or function
#[derive(Debug, Clone, Copy)]
struct BlockContext {
    in_function: bool,
    in_loop: bool,
    at_module: bool,
}

impl BlockContext {
    const MODULE: BlockContext = BlockContext {
        in_function: false,
        in_loop: false,
        at_module: true,
    };
}

/// Reject `break`/`continue`/`return`/`nonlocal` where Python's compiler does
fn check_block(body: &[Stmt], ctx: BlockContext) -> Result<(), ParseError> {
    for stmt in body {
        let misplaced = match &stmt.kind {
            StmtKind::Break if !ctx.in_loop => Some("'break' outside loop"),
            StmtKind::Continue if !ctx.in_loop => Some("'continue' not properly in loop"),
            StmtKind::Return(_) if !ctx.in_function => Some("'return' outside function"),
            StmtKind::Nonlocal(_) if ctx.at_module => {
                Some("nonlocal declaration not allowed at module level")
            }
            _ => None,
        };
        if let Some(message) = misplaced {
            return Err(ParseError::new(message, stmt.location));
        }

        match &stmt.kind {
            StmtKind::If { body, orelse, .. } => {
                check_block(body, ctx)?;
                check_block(orelse, ctx)?;
            }
            StmtKind::While { body, orelse, .. } | StmtKind::For { body, orelse, .. } => {
                check_block(body, BlockContext { in_loop: true, ..ctx })?;
                check_block(orelse, ctx)?;
            }
            StmtKind::FunctionDef(def) => {
                let inner = BlockContext {
                    in_function: true,
                    in_loop: false,
                    at_module: false,
                };
                check_block(&def.body, inner)?;
            }
            StmtKind::ClassDef { body, .. } => {
                let inner = BlockContext {
                    in_function: false,
                    in_loop: false,
                    ..ctx
                };
                check_block(body, inner)?;
            }
            StmtKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => {
                check_block(body, ctx)?;
                for handler in handlers {
                    check_block(&handler.body, ctx)?;
                }
                check_block(orelse, ctx)?;
                check_block(finalbody, ctx)?;
            }
            _ => {}
        }
    }
    Ok(())
}

/// Parse a complete module in one call
pub fn parse_source(source: &str, origin: CodeOrigin) -> Result<Program, ParseError> {
    Parser::new(source)?.parse_program(origin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_function() {
        let source = "def main():\n    return 0\n";
        let program = parse_source(source, CodeOrigin::Submitted).unwrap();

        assert_eq!(program.body.len(), 1);
        match &program.body[0].kind {
            StmtKind::FunctionDef(def) => {
                assert_eq!(def.name, "main");
                assert_eq!(def.params.len(), 0);
                assert_eq!(def.body.len(), 1);
            }
            _ => panic!("Expected function definition"),
        }
    }

    #[test]
    fn test_statement_lines() {
        let source = "x = 1\n\ny = 2; z = 3\n";
        let program = parse_source(source, CodeOrigin::Submitted).unwrap();

        let lines: Vec<usize> = program.body.iter().map(|s| s.location.line).collect();
        assert_eq!(lines, vec![1, 3, 3]);
    }

    #[test]
    fn test_syntax_error_reports_line() {
        let err = parse_source("def f(:", CodeOrigin::Submitted).unwrap_err();
        assert_eq!(err.location.line, 1);
        assert!(err.message.contains("invalid syntax"));
    }

    #[test]
    fn test_unexpected_indent() {
        let err = parse_source("x = 1\n    y = 2\n", CodeOrigin::Submitted).unwrap_err();
        assert_eq!(err.message, "unexpected indent");
        assert_eq!(err.location.line, 2);
    }

    #[test]
    fn test_unsupported_keyword() {
        let err = parse_source("with open('f') as f:\n    pass\n", CodeOrigin::Submitted)
            .unwrap_err();
        assert!(err.message.contains("'with'"));
    }

    #[test]
    fn test_misplaced_control_flow() {
        let cases = [
            ("break\n", "'break' outside loop", 1),
            ("while True:\n    def f():\n        continue\n", "'continue' not properly in loop", 3),
            ("if True:\n    return 1\n", "'return' outside function", 2),
            ("class A:\n    return 1\n", "'return' outside function", 2),
            ("nonlocal x\n", "nonlocal declaration not allowed at module level", 1),
        ];
        for (source, message, line) in cases {
            let err = parse_source(source, CodeOrigin::Submitted).unwrap_err();
            assert_eq!(err.message, message, "{}", source);
            assert_eq!(err.location.line, line, "{}", source);
        }
        assert!(parse_source("for i in range(3):\n    try:\n        break\n    finally:\n        pass\n", CodeOrigin::Submitted).is_ok());
    }
}
