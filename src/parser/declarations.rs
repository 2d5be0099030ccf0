//! Declaration parsing implementation
//!
//! This module handles the constructs that create new code objects:
//!
//! - Function definitions: `def name(params): block`
//! - Class definitions: `class Name(Base): block`
//! - Lambdas: `lambda params: expr`
//!
//! It also computes, once per function, which names are local to it. A name
//! is local when the body binds it anywhere (assignment, `for` target, `def`,
//! `class`, `import`, `except ... as`, `del`) and it is not declared `global`
//! or `nonlocal`. Nested function and class bodies are not descended into.
//!
//! # Grammar
//!
//! ```text
//! function_def ::= "def" identifier "(" [param ("," param)*] ")" ["->" expr] ":" block
//! param        ::= identifier [":" expr] ["=" expr]
//! class_def    ::= "class" identifier ["(" [expr] ")"] ":" block
//! lambda       ::= "lambda" [param ("," param)*] ":" expr
//! ```
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::{ParseError, Parser};
use indexmap::IndexSet;
use std::sync::Arc;

impl Parser {
    /// Parse a function definition (after `def`)
    pub(crate) fn parse_function_definition(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        let name = self.expect_identifier()?;
        self.expect_token(&TokenKind::LParen, "expected '(' after function name")?;
        let params = self.parse_parameters(&TokenKind::RParen, true)?;
        self.expect_token(&TokenKind::RParen, "expected ')' after parameters")?;

        if self.match_token(&TokenKind::Arrow) {
            self.parse_expression()?;
        }
        self.expect_colon()?;
        let body = self.parse_block()?;

        let def = build_function(name, params, body, loc)?;
        Ok(Stmt::new(StmtKind::FunctionDef(Arc::new(def)), loc))
    }

    /// Parse a class definition (after `class`)
    pub(crate) fn parse_class_definition(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        let name = self.expect_identifier()?;
        let mut base = None;
        if self.match_token(&TokenKind::LParen) {
            if !self.check(&TokenKind::RParen) {
                base = Some(self.parse_expression()?);
                if self.match_token(&TokenKind::Comma) && !self.check(&TokenKind::RParen) {
                    return Err(self.error_here("multiple inheritance is not supported"));
                }
            }
            self.expect_token(&TokenKind::RParen, "expected ')' after base class")?;
        }
        self.expect_colon()?;
        let body = self.parse_block()?;

        Ok(Stmt::new(StmtKind::ClassDef { name, base, body }, loc))
    }

    /// Parse a lambda (after `lambda`) into a one-statement function
    pub(crate) fn parse_lambda(&mut self, loc: SourceLocation) -> Result<Expr, ParseError> {
        let params = self.parse_parameters(&TokenKind::Colon, false)?;
        self.expect_colon()?;
        let body_expr = self.parse_expression()?;
        let body = vec![Stmt::new(StmtKind::Return(Some(body_expr)), loc)];

        let def = build_function("<lambda>".to_string(), params, body, loc)?;
        Ok(Expr::new(ExprKind::Lambda(Arc::new(def)), loc))
    }

    /// Parameter list up to (not including) `terminator`
    fn parse_parameters(
        &mut self,
        terminator: &TokenKind,
        allow_annotations: bool,
    ) -> Result<Vec<Param>, ParseError> {
        let mut params: Vec<Param> = Vec::new();

        while !self.check(terminator) {
            if matches!(
                self.peek_kind(),
                TokenKind::Star | TokenKind::DoubleStar | TokenKind::Slash
            ) {
                return Err(self.error_here("'*args', '**kwargs' and '/' parameters are not supported"));
            }

            let param_loc = self.current_location();
            let name = self.expect_identifier()?;
            if params.iter().any(|p| p.name == name) {
                return Err(ParseError::new(
                    format!("duplicate argument '{}' in function definition", name),
                    param_loc,
                ));
            }
            if allow_annotations && self.match_token(&TokenKind::Colon) {
                self.parse_expression()?;
            }
            let default = if self.match_token(&TokenKind::Eq) {
                Some(self.parse_expression()?)
            } else {
                None
            };
            if default.is_none() && params.last().is_some_and(|p| p.default.is_some()) {
                return Err(ParseError::new(
                    "parameter without a default follows parameter with a default",
                    param_loc,
                ));
            }
            params.push(Param { name, default });

            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        Ok(params)
    }
}

fn build_function(
    name: String,
    params: Vec<Param>,
    body: Vec<Stmt>,
    location: SourceLocation,
) -> Result<FunctionDef, ParseError> {
    let mut scope = ScopeNames::default();
    for param in &params {
        scope.bound.insert(param.name.clone());
    }
    scope.visit_block(&body);

    for name in &scope.globals {
        if params.iter().any(|p| &p.name == name) {
            return Err(ParseError::new(
                format!("name '{}' is parameter and global", name),
                location,
            ));
        }
    }
    for name in &scope.nonlocals {
        if params.iter().any(|p| &p.name == name) {
            return Err(ParseError::new(
                format!("name '{}' is parameter and nonlocal", name),
                location,
            ));
        }
    }

    let local_names = scope
        .bound
        .iter()
        .filter(|n| !scope.globals.contains(*n) && !scope.nonlocals.contains(*n))
        .cloned()
        .collect();

    Ok(FunctionDef {
        name,
        params,
        body,
        location,
        local_names,
        global_names: scope.globals.into_iter().collect(),
        nonlocal_names: scope.nonlocals.into_iter().collect(),
    })
}

/// Names bound and declared within one function body
#[derive(Default)]
struct ScopeNames {
    bound: IndexSet<String>,
    globals: IndexSet<String>,
    nonlocals: IndexSet<String>,
}

impl ScopeNames {
    fn visit_block(&mut self, body: &[Stmt]) {
        for stmt in body {
            self.visit_stmt(stmt);
        }
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Assign { targets, .. } => {
                for target in targets {
                    self.bind_target(target);
                }
            }
            StmtKind::AugAssign { target, .. } | StmtKind::AnnAssign { target, .. } => {
                self.bind_target(target)
            }
            StmtKind::Delete(targets) => {
                for target in targets {
                    self.bind_target(target);
                }
            }
            StmtKind::If { body, orelse, .. } | StmtKind::While { body, orelse, .. } => {
                self.visit_block(body);
                self.visit_block(orelse);
            }
            StmtKind::For {
                target,
                body,
                orelse,
                ..
            } => {
                self.bind_target(target);
                self.visit_block(body);
                self.visit_block(orelse);
            }
            StmtKind::FunctionDef(def) => {
                self.bound.insert(def.name.clone());
            }
            StmtKind::ClassDef { name, .. } => {
                self.bound.insert(name.clone());
            }
            StmtKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => {
                self.visit_block(body);
                for handler in handlers {
                    if let Some(name) = &handler.name {
                        self.bound.insert(name.clone());
                    }
                    self.visit_block(&handler.body);
                }
                self.visit_block(orelse);
                self.visit_block(finalbody);
            }
            StmtKind::Global(names) => self.globals.extend(names.iter().cloned()),
            StmtKind::Nonlocal(names) => self.nonlocals.extend(names.iter().cloned()),
            StmtKind::Import { module, alias } => {
                let bound = alias
                    .clone()
                    .unwrap_or_else(|| module.split('.').next().unwrap_or(module).to_string());
                self.bound.insert(bound);
            }
            StmtKind::ImportFrom { names, .. } => {
                for (name, alias) in names {
                    if name != "*" {
                        self.bound.insert(alias.clone().unwrap_or_else(|| name.clone()));
                    }
                }
            }
            StmtKind::Expr(_)
            | StmtKind::Pass
            | StmtKind::Break
            | StmtKind::Continue
            | StmtKind::Return(_)
            | StmtKind::Raise(_)
            | StmtKind::Assert { .. } => {}
        }
    }

    fn bind_target(&mut self, target: &Expr) {
        match &target.kind {
            ExprKind::Name(name) => {
                self.bound.insert(name.clone());
            }
            ExprKind::Tuple(items) | ExprKind::List(items) => {
                for item in items {
                    self.bind_target(item);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::parse::parse_source;

    fn first_function(source: &str) -> std::sync::Arc<FunctionDef> {
        let program = parse_source(source, CodeOrigin::Submitted).unwrap();
        match &program.body[0].kind {
            StmtKind::FunctionDef(def) => def.clone(),
            _ => panic!("Expected function definition"),
        }
    }

    #[test]
    fn test_local_names_exclude_globals() {
        let def = first_function(
            "def f(a, b=2):\n    global counter\n    counter = 1\n    total = a + b\n    for i in range(3):\n        pass\n    return total\n",
        );
        assert_eq!(def.params.len(), 2);
        assert!(def.params[1].default.is_some());
        assert_eq!(def.local_names, vec!["a", "b", "total", "i"]);
        assert_eq!(def.global_names, vec!["counter"]);
    }

    #[test]
    fn test_nested_function_body_not_scanned() {
        let def = first_function("def outer():\n    def inner():\n        x = 1\n    return inner\n");
        assert_eq!(def.local_names, vec!["inner"]);
    }

    #[test]
    fn test_class_with_base() {
        let program =
            parse_source("class Err(ValueError):\n    pass\n", CodeOrigin::Submitted).unwrap();
        match &program.body[0].kind {
            StmtKind::ClassDef { name, base, body } => {
                assert_eq!(name, "Err");
                assert!(base.is_some());
                assert_eq!(body.len(), 1);
            }
            _ => panic!("Expected class definition"),
        }
    }

    #[test]
    fn test_lambda_is_single_return() {
        let program = parse_source("f = lambda x, y=1: x + y\n", CodeOrigin::Submitted).unwrap();
        match &program.body[0].kind {
            StmtKind::Assign { value, .. } => match &value.kind {
                ExprKind::Lambda(def) => {
                    assert_eq!(def.name, "<lambda>");
                    assert_eq!(def.params.len(), 2);
                    assert!(matches!(def.body[0].kind, StmtKind::Return(Some(_))));
                }
                _ => panic!("Expected lambda"),
            },
            _ => panic!("Expected assignment"),
        }
    }

    #[test]
    fn test_star_args_rejected() {
        let err = parse_source("def f(*args):\n    pass\n", CodeOrigin::Submitted).unwrap_err();
        assert!(err.message.contains("not supported"));
    }

    #[test]
    fn test_non_default_after_default_rejected() {
        let err = parse_source("def f(a=1, b):\n    pass\n", CodeOrigin::Submitted).unwrap_err();
        assert!(err.message.contains("parameter without a default"));
    }
}
