//! Expression parsing implementation
//!
//! This module handles parsing of Python expressions with one recursive
//! descent method per precedence level.
//!
//! # Supported Expressions
//!
//! - Literals: integers, floats, strings (adjacent literals concatenate), f-strings
//! - Displays: list, tuple, dict, set and their comprehensions, generator expressions
//! - Operators: arithmetic, bitwise, chained comparisons, `and`/`or`/`not`
//! - Conditional expressions and `lambda`
//! - Postfix: calls with keyword arguments, subscripts and slices, attributes
//!
//! # Precedence (lowest to highest)
//!
//! ```text
//! lambda, if-else, or, and, not, comparison, |, ^, &, << >>, + -, * / // % @,
//! unary - + ~, **, primary
//! ```
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::{FStringSegment, Lexer, TokenKind};
use crate::parser::parse::{ParseError, Parser};
use std::sync::Arc;

impl Parser {
    /// Parse expression (top-level entry point, no bare tuples)
    pub(crate) fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.descend()?;
        let expr = self.parse_conditional();
        self.ascend(1);
        expr
    }

    fn parse_conditional(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_location();
        if self.match_token(&TokenKind::Lambda) {
            return self.parse_lambda(loc);
        }

        let expr = self.parse_or()?;
        if self.match_token(&TokenKind::If) {
            let test = self.parse_or()?;
            self.expect_token(&TokenKind::Else, "expected 'else' in conditional expression")?;
            let orelse = self.parse_expression()?;
            return Ok(Expr::new(
                ExprKind::IfExp {
                    test: Box::new(test),
                    body: Box::new(expr),
                    orelse: Box::new(orelse),
                },
                loc,
            ));
        }
        Ok(expr)
    }

    /// `expr (',' expr)* [',']`, producing a tuple when a comma is present
    pub(crate) fn parse_expression_list(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_location();
        let first = self.parse_expression()?;
        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }

        let mut items = vec![first];
        while self.match_token(&TokenKind::Comma) {
            if self.ends_expression_list() {
                break;
            }
            items.push(self.parse_expression()?);
        }
        Ok(Expr::new(ExprKind::Tuple(items), loc))
    }

    /// Targets of `for`/comprehension clauses, which stop before `in`
    pub(crate) fn parse_target_list(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_location();
        let first = self.parse_bitwise_or()?;
        let target = if self.check(&TokenKind::Comma) {
            let mut items = vec![first];
            while self.match_token(&TokenKind::Comma) {
                if self.check(&TokenKind::In) {
                    break;
                }
                items.push(self.parse_bitwise_or()?);
            }
            Expr::new(ExprKind::Tuple(items), loc)
        } else {
            first
        };
        crate::parser::statements::check_assign_target(&target)?;
        Ok(target)
    }

    fn ends_expression_list(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Newline
                | TokenKind::Eof
                | TokenKind::Semicolon
                | TokenKind::Eq
                | TokenKind::Colon
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
        ) || self.peek_is_augmented_assign()
    }

    fn peek_is_augmented_assign(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::PlusEq
                | TokenKind::MinusEq
                | TokenKind::StarEq
                | TokenKind::SlashEq
                | TokenKind::DoubleSlashEq
                | TokenKind::PercentEq
                | TokenKind::DoubleStarEq
                | TokenKind::AmpEq
                | TokenKind::PipeEq
                | TokenKind::CaretEq
                | TokenKind::ShlEq
                | TokenKind::ShrEq
        )
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        let mut chain = 0;
        while self.check(&TokenKind::Or) {
            self.descend()?;
            chain += 1;
            let loc = self.current_location();
            self.advance();
            let right = self.parse_and()?;
            left = Expr::new(
                ExprKind::BoolOp {
                    op: BoolOp::Or,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                loc,
            );
        }
        self.ascend(chain);
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_not()?;
        let mut chain = 0;
        while self.check(&TokenKind::And) {
            self.descend()?;
            chain += 1;
            let loc = self.current_location();
            self.advance();
            let right = self.parse_not()?;
            left = Expr::new(
                ExprKind::BoolOp {
                    op: BoolOp::And,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                loc,
            );
        }
        self.ascend(chain);
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_location();
        if self.match_token(&TokenKind::Not) {
            self.descend()?;
            let operand = self.parse_not()?;
            self.ascend(1);
            return Ok(Expr::new(
                ExprKind::UnaryOp {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                },
                loc,
            ));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_location();
        let left = self.parse_bitwise_or()?;
        let mut comparisons = Vec::new();

        loop {
            let op = match self.peek_kind() {
                TokenKind::EqEq => CmpOp::Eq,
                TokenKind::NotEq => CmpOp::NotEq,
                TokenKind::Lt => CmpOp::Lt,
                TokenKind::LtE => CmpOp::LtE,
                TokenKind::Gt => CmpOp::Gt,
                TokenKind::GtE => CmpOp::GtE,
                TokenKind::In => CmpOp::In,
                TokenKind::Is => {
                    if self.peek_ahead(1) == Some(&TokenKind::Not) {
                        self.advance();
                        CmpOp::IsNot
                    } else {
                        CmpOp::Is
                    }
                }
                TokenKind::Not if self.peek_ahead(1) == Some(&TokenKind::In) => {
                    self.advance();
                    CmpOp::NotIn
                }
                _ => break,
            };
            self.advance();
            comparisons.push((op, self.parse_bitwise_or()?));
        }

        if comparisons.is_empty() {
            Ok(left)
        } else {
            Ok(Expr::new(
                ExprKind::Compare {
                    left: Box::new(left),
                    comparisons,
                },
                loc,
            ))
        }
    }

    pub(crate) fn parse_bitwise_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_bitwise_xor()?;
        let mut chain = 0;
        while self.check(&TokenKind::Pipe) {
            self.descend()?;
            chain += 1;
            let loc = self.current_location();
            self.advance();
            let right = self.parse_bitwise_xor()?;
            left = binary(BinOp::BitOr, left, right, loc);
        }
        self.ascend(chain);
        Ok(left)
    }

    fn parse_bitwise_xor(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_bitwise_and()?;
        let mut chain = 0;
        while self.check(&TokenKind::Caret) {
            self.descend()?;
            chain += 1;
            let loc = self.current_location();
            self.advance();
            let right = self.parse_bitwise_and()?;
            left = binary(BinOp::BitXor, left, right, loc);
        }
        self.ascend(chain);
        Ok(left)
    }

    fn parse_bitwise_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_shift()?;
        let mut chain = 0;
        while self.check(&TokenKind::Amp) {
            self.descend()?;
            chain += 1;
            let loc = self.current_location();
            self.advance();
            let right = self.parse_shift()?;
            left = binary(BinOp::BitAnd, left, right, loc);
        }
        self.ascend(chain);
        Ok(left)
    }

    fn parse_shift(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;
        let mut chain = 0;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Shl => BinOp::Shl,
                TokenKind::Shr => BinOp::Shr,
                _ => break,
            };
            self.descend()?;
            chain += 1;
            let loc = self.current_location();
            self.advance();
            let right = self.parse_additive()?;
            left = binary(op, left, right, loc);
        }
        self.ascend(chain);
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_term()?;
        let mut chain = 0;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.descend()?;
            chain += 1;
            let loc = self.current_location();
            self.advance();
            let right = self.parse_term()?;
            left = binary(op, left, right, loc);
        }
        self.ascend(chain);
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_factor()?;
        let mut chain = 0;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::DoubleSlash => BinOp::FloorDiv,
                TokenKind::Percent => BinOp::Mod,
                TokenKind::At => {
                    return Err(self.error_here("matrix multiplication is not supported"))
                }
                _ => break,
            };
            self.descend()?;
            chain += 1;
            let loc = self.current_location();
            self.advance();
            let right = self.parse_factor()?;
            left = binary(op, left, right, loc);
        }
        self.ascend(chain);
        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_location();
        let op = match self.peek_kind() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Pos,
            TokenKind::Tilde => UnaryOp::Invert,
            _ => return self.parse_power(),
        };
        self.advance();
        self.descend()?;
        let operand = self.parse_factor()?;
        self.ascend(1);

        // Negative numeric literals fold into constants
        if op == UnaryOp::Neg {
            match operand.kind {
                ExprKind::Int(n) if n != i64::MIN => return Ok(Expr::new(ExprKind::Int(-n), loc)),
                ExprKind::Float(x) => return Ok(Expr::new(ExprKind::Float(-x), loc)),
                _ => {}
            }
        }

        Ok(Expr::new(
            ExprKind::UnaryOp {
                op,
                operand: Box::new(operand),
            },
            loc,
        ))
    }

    /// `primary ['**' factor]` (right associative, binds tighter than unary on the left)
    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_primary()?;
        if self.check(&TokenKind::DoubleStar) {
            let loc = self.current_location();
            self.advance();
            self.descend()?;
            let exponent = self.parse_factor()?;
            self.ascend(1);
            return Ok(binary(BinOp::Pow, base, exponent, loc));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_atom()?;

        let mut chain = 0;
        loop {
            if !matches!(
                self.peek_kind(),
                TokenKind::LParen | TokenKind::LBracket | TokenKind::Dot
            ) {
                break;
            }
            self.descend()?;
            chain += 1;
            let loc = self.current_location();
            if self.match_token(&TokenKind::LParen) {
                let (args, keywords) = self.parse_call_arguments()?;
                self.expect_token(&TokenKind::RParen, "expected ')' after arguments")?;
                expr = Expr::new(
                    ExprKind::Call {
                        func: Box::new(expr),
                        args,
                        keywords,
                    },
                    loc,
                );
            } else if self.match_token(&TokenKind::LBracket) {
                let index = self.parse_subscript()?;
                self.expect_token(&TokenKind::RBracket, "expected ']'")?;
                expr = Expr::new(
                    ExprKind::Subscript {
                        value: Box::new(expr),
                        index: Box::new(index),
                    },
                    loc,
                );
            } else {
                self.advance();
                let name = self.expect_identifier()?;
                expr = Expr::new(
                    ExprKind::Attribute {
                        value: Box::new(expr),
                        name,
                    },
                    loc,
                );
            }
        }
        self.ascend(chain);

        Ok(expr)
    }

    fn parse_call_arguments(&mut self) -> Result<(Vec<Expr>, Vec<(String, Expr)>), ParseError> {
        let mut args = Vec::new();
        let mut keywords: Vec<(String, Expr)> = Vec::new();

        while !self.check(&TokenKind::RParen) {
            if matches!(self.peek_kind(), TokenKind::Star | TokenKind::DoubleStar) {
                return Err(self.error_here("argument unpacking is not supported"));
            }

            let is_keyword = matches!(self.peek_kind(), TokenKind::Name(_))
                && self.peek_ahead(1) == Some(&TokenKind::Eq);
            if is_keyword {
                let loc = self.current_location();
                let name = self.expect_identifier()?;
                self.advance();
                if keywords.iter().any(|(k, _)| *k == name) {
                    return Err(ParseError::new(
                        format!("keyword argument repeated: {}", name),
                        loc,
                    ));
                }
                keywords.push((name, self.parse_expression()?));
            } else {
                let loc = self.current_location();
                if !keywords.is_empty() {
                    return Err(ParseError::new(
                        "positional argument follows keyword argument",
                        loc,
                    ));
                }
                let arg = self.parse_expression()?;
                if self.check(&TokenKind::For) {
                    // f(x for x in xs)
                    let clauses = self.parse_comprehension_clauses()?;
                    args.push(Expr::new(
                        ExprKind::Comprehension {
                            kind: ComprehensionKind::Generator,
                            element: Box::new(arg),
                            value: None,
                            clauses,
                        },
                        loc,
                    ));
                } else {
                    args.push(arg);
                }
            }

            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        Ok((args, keywords))
    }

    /// Index inside `[...]`: an expression, a slice, or a tuple of them
    fn parse_subscript(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_location();
        let first = self.parse_slice_item()?;
        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.match_token(&TokenKind::Comma) {
            if self.check(&TokenKind::RBracket) {
                break;
            }
            items.push(self.parse_slice_item()?);
        }
        Ok(Expr::new(ExprKind::Tuple(items), loc))
    }

    fn parse_slice_item(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_location();
        let lower = if self.check(&TokenKind::Colon) {
            None
        } else {
            let expr = self.parse_expression()?;
            if !self.check(&TokenKind::Colon) {
                return Ok(expr);
            }
            Some(Box::new(expr))
        };

        self.expect_colon()?;
        let upper = if self.slice_part_ends() {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        let step = if self.match_token(&TokenKind::Colon) && !self.slice_part_ends() {
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };

        Ok(Expr::new(ExprKind::Slice { lower, upper, step }, loc))
    }

    fn slice_part_ends(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Colon | TokenKind::Comma | TokenKind::RBracket
        )
    }

    fn parse_atom(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_location();

        let kind = match self.peek_kind().clone() {
            TokenKind::Int(n) => {
                self.advance();
                ExprKind::Int(n)
            }
            TokenKind::Float(x) => {
                self.advance();
                ExprKind::Float(x)
            }
            TokenKind::True => {
                self.advance();
                ExprKind::Bool(true)
            }
            TokenKind::False => {
                self.advance();
                ExprKind::Bool(false)
            }
            TokenKind::None => {
                self.advance();
                ExprKind::NoneLiteral
            }
            TokenKind::Name(name) => {
                self.advance();
                ExprKind::Name(name)
            }
            TokenKind::Str(_) | TokenKind::FString(_) => return self.parse_string_literals(),
            TokenKind::LParen => {
                self.advance();
                return self.parse_parenthesized(loc);
            }
            TokenKind::LBracket => {
                self.advance();
                return self.parse_list_display(loc);
            }
            TokenKind::LBrace => {
                self.advance();
                return self.parse_brace_display(loc);
            }
            _ => return Err(self.error_here("expected expression")),
        };

        Ok(Expr::new(kind, loc))
    }

    /// Adjacent string literals concatenate; any f-string makes the whole run an f-string
    fn parse_string_literals(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_location();
        let mut parts: Vec<FStringPart> = Vec::new();
        let mut is_fstring = false;

        loop {
            match self.peek_kind().clone() {
                TokenKind::Str(text) => {
                    self.advance();
                    push_literal(&mut parts, text);
                }
                TokenKind::FString(segments) => {
                    let token_loc = self.current_location();
                    self.advance();
                    is_fstring = true;
                    for segment in segments {
                        match segment {
                            FStringSegment::Literal(text) => push_literal(&mut parts, text),
                            FStringSegment::Field {
                                source,
                                conversion,
                                format_spec,
                            } => {
                                let expr = parse_fstring_field(&source, token_loc, self.depth)?;
                                parts.push(FStringPart::Field {
                                    expr: Box::new(expr),
                                    conversion,
                                    format_spec,
                                });
                            }
                        }
                    }
                }
                _ => break,
            }
        }

        if is_fstring {
            return Ok(Expr::new(ExprKind::FString(parts), loc));
        }
        let text: String = parts
            .into_iter()
            .map(|part| match part {
                FStringPart::Literal(text) => text,
                FStringPart::Field { .. } => String::new(),
            })
            .collect();
        Ok(Expr::new(ExprKind::Str(Arc::from(text)), loc))
    }

    fn parse_parenthesized(&mut self, loc: SourceLocation) -> Result<Expr, ParseError> {
        if self.match_token(&TokenKind::RParen) {
            return Ok(Expr::new(ExprKind::Tuple(Vec::new()), loc));
        }

        let first = self.parse_expression()?;

        if self.check(&TokenKind::For) {
            let clauses = self.parse_comprehension_clauses()?;
            self.expect_token(&TokenKind::RParen, "expected ')'")?;
            return Ok(Expr::new(
                ExprKind::Comprehension {
                    kind: ComprehensionKind::Generator,
                    element: Box::new(first),
                    value: None,
                    clauses,
                },
                loc,
            ));
        }

        if self.match_token(&TokenKind::RParen) {
            return Ok(first);
        }

        let mut items = vec![first];
        while self.match_token(&TokenKind::Comma) {
            if self.check(&TokenKind::RParen) {
                break;
            }
            items.push(self.parse_expression()?);
        }
        self.expect_token(&TokenKind::RParen, "expected ')'")?;
        Ok(Expr::new(ExprKind::Tuple(items), loc))
    }

    fn parse_list_display(&mut self, loc: SourceLocation) -> Result<Expr, ParseError> {
        if self.match_token(&TokenKind::RBracket) {
            return Ok(Expr::new(ExprKind::List(Vec::new()), loc));
        }

        let first = self.parse_expression()?;
        if self.check(&TokenKind::For) {
            let clauses = self.parse_comprehension_clauses()?;
            self.expect_token(&TokenKind::RBracket, "expected ']'")?;
            return Ok(Expr::new(
                ExprKind::Comprehension {
                    kind: ComprehensionKind::List,
                    element: Box::new(first),
                    value: None,
                    clauses,
                },
                loc,
            ));
        }

        let mut items = vec![first];
        while self.match_token(&TokenKind::Comma) {
            if self.check(&TokenKind::RBracket) {
                break;
            }
            items.push(self.parse_expression()?);
        }
        self.expect_token(&TokenKind::RBracket, "expected ']'")?;
        Ok(Expr::new(ExprKind::List(items), loc))
    }

    /// `{}` dict, `{k: v}` dict, `{a, b}` set, or one of their comprehensions
    fn parse_brace_display(&mut self, loc: SourceLocation) -> Result<Expr, ParseError> {
        if self.match_token(&TokenKind::RBrace) {
            return Ok(Expr::new(ExprKind::Dict(Vec::new()), loc));
        }
        if self.check(&TokenKind::DoubleStar) {
            return Err(self.error_here("dict unpacking is not supported"));
        }

        let first = self.parse_expression()?;

        if self.match_token(&TokenKind::Colon) {
            let first_value = self.parse_expression()?;
            if self.check(&TokenKind::For) {
                let clauses = self.parse_comprehension_clauses()?;
                self.expect_token(&TokenKind::RBrace, "expected '}'")?;
                return Ok(Expr::new(
                    ExprKind::Comprehension {
                        kind: ComprehensionKind::Dict,
                        element: Box::new(first),
                        value: Some(Box::new(first_value)),
                        clauses,
                    },
                    loc,
                ));
            }

            let mut entries = vec![(first, first_value)];
            while self.match_token(&TokenKind::Comma) {
                if self.check(&TokenKind::RBrace) {
                    break;
                }
                let key = self.parse_expression()?;
                self.expect_colon()?;
                let value = self.parse_expression()?;
                entries.push((key, value));
            }
            self.expect_token(&TokenKind::RBrace, "expected '}'")?;
            return Ok(Expr::new(ExprKind::Dict(entries), loc));
        }

        if self.check(&TokenKind::For) {
            let clauses = self.parse_comprehension_clauses()?;
            self.expect_token(&TokenKind::RBrace, "expected '}'")?;
            return Ok(Expr::new(
                ExprKind::Comprehension {
                    kind: ComprehensionKind::Set,
                    element: Box::new(first),
                    value: None,
                    clauses,
                },
                loc,
            ));
        }

        let mut items = vec![first];
        while self.match_token(&TokenKind::Comma) {
            if self.check(&TokenKind::RBrace) {
                break;
            }
            items.push(self.parse_expression()?);
        }
        self.expect_token(&TokenKind::RBrace, "expected '}'")?;
        Ok(Expr::new(ExprKind::Set(items), loc))
    }

    /// One or more `for target in iter [if cond]*` clauses
    fn parse_comprehension_clauses(&mut self) -> Result<Vec<ComprehensionClause>, ParseError> {
        let mut clauses = Vec::new();
        while self.match_token(&TokenKind::For) {
            let target = self.parse_target_list()?;
            self.expect_token(&TokenKind::In, "expected 'in'")?;
            let iter = self.parse_or()?;
            let mut conditions = Vec::new();
            while self.match_token(&TokenKind::If) {
                conditions.push(self.parse_or()?);
            }
            clauses.push(ComprehensionClause {
                target,
                iter,
                conditions,
            });
        }
        Ok(clauses)
    }
}

fn binary(op: BinOp, left: Expr, right: Expr, location: SourceLocation) -> Expr {
    Expr::new(
        ExprKind::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        location,
    )
}

fn push_literal(parts: &mut Vec<FStringPart>, text: String) {
    if let Some(FStringPart::Literal(last)) = parts.last_mut() {
        last.push_str(&text);
    } else {
        parts.push(FStringPart::Literal(text));
    }
}

/// Parse the expression source of one f-string field found `depth` levels deep
fn parse_fstring_field(
    source: &str,
    location: SourceLocation,
    depth: usize,
) -> Result<Expr, ParseError> {
    let tokens = Lexer::fragment(source, location).tokenize()?;
    let mut parser = Parser::from_tokens(tokens, depth);
    let expr = parser.parse_expression_list()?;
    if !parser.is_at_end() {
        return Err(ParseError::new("f-string: invalid syntax", location));
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::parse::parse_source;

    fn expr(source: &str) -> Expr {
        let program = parse_source(source, CodeOrigin::Submitted).unwrap();
        match program.body.into_iter().next().map(|s| s.kind) {
            Some(StmtKind::Expr(e)) => e,
            other => panic!("Expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        // 1 + 2 * 3 parses as 1 + (2 * 3)
        match expr("1 + 2 * 3").kind {
            ExprKind::BinaryOp { op, right, .. } => {
                assert_eq!(op, BinOp::Add);
                assert!(matches!(right.kind, ExprKind::BinaryOp { op: BinOp::Mul, .. }));
            }
            _ => panic!("Expected binary op"),
        }
    }

    #[test]
    fn test_power_is_right_associative_and_binds_tighter_than_neg() {
        match expr("-2 ** 2").kind {
            ExprKind::UnaryOp { op, operand } => {
                assert_eq!(op, UnaryOp::Neg);
                assert!(matches!(operand.kind, ExprKind::BinaryOp { op: BinOp::Pow, .. }));
            }
            _ => panic!("Expected unary op"),
        }
    }

    #[test]
    fn test_chained_comparison() {
        match expr("0 <= x < 10").kind {
            ExprKind::Compare { comparisons, .. } => {
                assert_eq!(comparisons.len(), 2);
                assert_eq!(comparisons[0].0, CmpOp::LtE);
                assert_eq!(comparisons[1].0, CmpOp::Lt);
            }
            _ => panic!("Expected comparison"),
        }
        assert!(matches!(
            expr("a not in b").kind,
            ExprKind::Compare { ref comparisons, .. } if comparisons[0].0 == CmpOp::NotIn
        ));
        assert!(matches!(
            expr("a is not None").kind,
            ExprKind::Compare { ref comparisons, .. } if comparisons[0].0 == CmpOp::IsNot
        ));
    }

    #[test]
    fn test_displays_and_comprehensions() {
        assert!(matches!(expr("{}").kind, ExprKind::Dict(ref e) if e.is_empty()));
        assert!(matches!(expr("{1, 2}").kind, ExprKind::Set(_)));
        assert!(matches!(expr("(1,)").kind, ExprKind::Tuple(ref t) if t.len() == 1));
        assert!(matches!(
            expr("[x * 2 for x in xs if x]").kind,
            ExprKind::Comprehension { kind: ComprehensionKind::List, .. }
        ));
        assert!(matches!(
            expr("{k: v for k, v in pairs}").kind,
            ExprKind::Comprehension { kind: ComprehensionKind::Dict, .. }
        ));
        assert!(matches!(
            expr("sum(x for x in xs)").kind,
            ExprKind::Call { ref args, .. }
                if matches!(args[0].kind, ExprKind::Comprehension { kind: ComprehensionKind::Generator, .. })
        ));
    }

    #[test]
    fn test_call_keywords_and_slices() {
        match expr("print(a, b, sep='-')").kind {
            ExprKind::Call { args, keywords, .. } => {
                assert_eq!(args.len(), 2);
                assert_eq!(keywords[0].0, "sep");
            }
            _ => panic!("Expected call"),
        }
        match expr("xs[1:-1:2]").kind {
            ExprKind::Subscript { index, .. } => {
                assert!(matches!(
                    index.kind,
                    ExprKind::Slice { lower: Some(_), upper: Some(_), step: Some(_) }
                ));
            }
            _ => panic!("Expected subscript"),
        }
    }

    #[test]
    fn test_fstring_fields_are_parsed() {
        match expr("f'{name!r:>8} has {n + 1} items'").kind {
            ExprKind::FString(parts) => {
                assert_eq!(parts.len(), 4);
                assert!(matches!(
                    parts[0],
                    FStringPart::Field { conversion: Some('r'), .. }
                ));
                assert!(matches!(&parts[2], FStringPart::Field { expr, .. }
                    if matches!(expr.kind, ExprKind::BinaryOp { op: BinOp::Add, .. })));
            }
            _ => panic!("Expected f-string"),
        }
    }

    #[test]
    fn test_adjacent_strings_concatenate() {
        assert!(matches!(expr("'ab' \"cd\"").kind, ExprKind::Str(ref s) if &**s == "abcd"));
    }

    #[test]
    fn test_conditional_expression() {
        assert!(matches!(expr("a if c else b").kind, ExprKind::IfExp { .. }));
    }

    fn deep_forms(levels: usize) -> Vec<String> {
        vec![
            format!("{}1", "-".repeat(levels)),
            format!("{}x", "not ".repeat(levels)),
            format!("2{}", "**2".repeat(levels)),
            vec!["1"; levels + 1].join(" + "),
            vec!["a"; levels + 1].join(" or "),
            format!("f{}", "()".repeat(levels)),
            format!("a{}", ".b".repeat(levels)),
            format!("{}1{}", "(".repeat(levels), ")".repeat(levels)),
            format!("f'{{{}1}}'", "-".repeat(levels)),
        ]
    }

    #[test]
    fn test_excessive_nesting_is_a_syntax_error() {
        for source in deep_forms(150) {
            let err = parse_source(&format!("x = {}\n", source), CodeOrigin::Submitted)
                .expect_err("nesting past the limit is rejected");
            assert_eq!(err.message, "expression is too deeply nested");
            assert_eq!(err.location.line, 1);
        }
    }

    #[test]
    fn test_unary_chain_far_past_the_limit() {
        let source = format!("x = {}1\n", "-".repeat(400_000));
        let err = parse_source(&source, CodeOrigin::Submitted).unwrap_err();
        assert_eq!(err.message, "expression is too deeply nested");
    }

    #[test]
    fn test_nesting_depth_resets_between_statements() {
        for form in deep_forms(40) {
            let source = format!("x = {}\n", form).repeat(10);
            assert!(
                parse_source(&source, CodeOrigin::Submitted).is_ok(),
                "{}",
                form
            );
        }
    }
}
