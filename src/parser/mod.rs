//! Python source code parser
//!
//! This module transforms Python source text into an Abstract Syntax Tree (AST):
//! - [`lexer`]: Tokenization (source text → tokens, with INDENT/DEDENT)
//! - [`parse`]: Parser state, helpers and the [`parse::parse_source`] entry point
//! - [`ast`]: AST node definitions
//!
//! # Supported Python Subset
//!
//! - Literals: `int`, `float`, `str` (including f-strings), `True`/`False`/`None`
//! - Displays and comprehensions for lists, tuples, dicts and sets
//! - Statements: assignment forms, `if`/`while`/`for`, `def`, `class`, `try`,
//!   `raise`, `assert`, `global`/`nonlocal`, `import math`
//! - No `with`, `yield`, `async`, decorators, `*args`/`**kwargs` or walrus
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent parser with one method per precedence level.
//! No external parser generator dependencies.

pub mod ast;
mod declarations;
mod expressions;
pub mod lexer;
pub mod parse;
mod statements;
