//! Statement execution implementation
//!
//! This module handles the execution of all statement types, including:
//!
//! - Assignments (plain, chained, unpacking, augmented, annotated) and `del`
//! - Control flow (`if`/`elif`/`else`, `while`, `for`, `break`, `continue`)
//! - Definitions (`def`, `class`) and `return`
//! - Exceptions (`try`/`except`/`else`/`finally`, `raise`, `assert`)
//! - `import math` and `from math import ...`
//!
//! # Implementation
//!
//! All statement execution methods are implemented as `pub(crate)` methods
//! on the [`Interpreter`] struct. Every statement first passes through
//! [`Interpreter::before_statement`], which moves the frame to the statement's
//! line and emits the `line` event; loop headers emit it again before each
//! re-evaluation.
//!
//! # Control Flow
//!
//! `break`, `continue`, `return` and raised exceptions travel up as
//! `Err(Flow::..)` until the construct that consumes them.

use super::builtins::class_base;
use super::engine::Interpreter;
use super::errors::{raise, type_error, value_error, ExceptionKind, ExecResult, Flow, PyException};
use crate::memory::stack::{Frame, FrameKind, Namespace};
use crate::memory::value::{ClassBase, ClassObject, ExceptionObject, Function, Value};
use crate::parser::ast::*;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

impl Interpreter<'_> {
    pub(crate) fn execute_block(&mut self, body: &[Stmt]) -> ExecResult<()> {
        for stmt in body {
            self.execute_statement(stmt)?;
        }
        Ok(())
    }

    /// Execute one statement, reporting any exception that escapes it
    pub(crate) fn execute_statement(&mut self, stmt: &Stmt) -> ExecResult<()> {
        self.before_statement(stmt.location.line)?;
        match self.execute_statement_kind(stmt) {
            Err(Flow::Raise(mut exc)) => {
                self.report_exception(&mut exc)?;
                Err(Flow::Raise(exc))
            }
            other => other,
        }
    }

    fn execute_statement_kind(&mut self, stmt: &Stmt) -> ExecResult<()> {
        let line = stmt.location.line;
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.evaluate_expr(expr)?;
                Ok(())
            }
            StmtKind::Assign { targets, value } => {
                let value = self.evaluate_expr(value)?;
                for target in targets {
                    self.assign_target(target, value.clone())?;
                }
                Ok(())
            }
            StmtKind::AugAssign { target, op, value } => self.execute_aug_assign(target, *op, value),
            StmtKind::AnnAssign { target, value } => match value {
                Some(value) => {
                    let value = self.evaluate_expr(value)?;
                    self.assign_target(target, value)
                }
                None => Ok(()),
            },
            StmtKind::Delete(targets) => {
                for target in targets {
                    self.delete_target(target)?;
                }
                Ok(())
            }
            StmtKind::Pass | StmtKind::Global(_) | StmtKind::Nonlocal(_) => Ok(()),
            StmtKind::Break => Err(Flow::Break),
            StmtKind::Continue => Err(Flow::Continue),
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.evaluate_expr(expr)?,
                    None => Value::None,
                };
                Err(Flow::Return(value))
            }
            StmtKind::If {
                condition,
                body,
                orelse,
            } => {
                let condition = self.evaluate_expr(condition)?;
                if self.truthy(&condition)? {
                    self.execute_block(body)
                } else {
                    self.execute_block(orelse)
                }
            }
            StmtKind::While {
                condition,
                body,
                orelse,
            } => self.execute_while(line, condition, body, orelse),
            StmtKind::For {
                target,
                iter,
                body,
                orelse,
            } => self.execute_for(line, target, iter, body, orelse),
            StmtKind::FunctionDef(def) => {
                let function = self.make_function(def)?;
                self.assign_name(&def.name, function)
            }
            StmtKind::ClassDef { name, base, body } => {
                self.execute_class_def(line, name, base.as_ref(), body)
            }
            StmtKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => self.execute_try(body, handlers, orelse, finalbody),
            StmtKind::Raise(expr) => self.execute_raise(expr.as_ref()),
            StmtKind::Assert { test, message } => {
                let test = self.evaluate_expr(test)?;
                if self.truthy(&test)? {
                    return Ok(());
                }
                let args = match message {
                    Some(message) => vec![self.evaluate_expr(message)?],
                    None => Vec::new(),
                };
                Err(Flow::Raise(Box::new(PyException::new(Rc::new(
                    ExceptionObject::new(ExceptionKind::AssertionError, args),
                )))))
            }
            StmtKind::Import { module, alias } => {
                let value = self.import_module(module)?;
                self.assign_name(alias.as_deref().unwrap_or(module), value)
            }
            StmtKind::ImportFrom { module, names } => self.execute_import_from(module, names),
        }
    }

    /// Bind a value to an assignment target
    pub(crate) fn assign_target(&mut self, target: &Expr, value: Value) -> ExecResult<()> {
        match &target.kind {
            ExprKind::Name(name) => self.assign_name(name, value),
            ExprKind::Tuple(targets) | ExprKind::List(targets) => {
                let items = self.unpack(value, targets.len())?;
                for (target, item) in targets.iter().zip(items) {
                    self.assign_target(target, item)?;
                }
                Ok(())
            }
            ExprKind::Attribute { value: object, name } => {
                let object = self.evaluate_expr(object)?;
                self.set_attribute(&object, name, value)
            }
            ExprKind::Subscript {
                value: object,
                index,
            } => {
                let object = self.evaluate_expr(object)?;
                match &index.kind {
                    ExprKind::Slice { lower, upper, step } => {
                        let bounds = self.evaluate_slice(lower, upper, step)?;
                        self.set_slice(&object, bounds, value)
                    }
                    _ => {
                        let index = self.evaluate_expr(index)?;
                        self.set_item(&object, index, value)
                    }
                }
            }
            _ => Err(type_error("cannot assign to expression")),
        }
    }

    /// Unpack exactly `count` values for a tuple/list target
    pub(crate) fn unpack(&mut self, value: Value, count: usize) -> ExecResult<Vec<Value>> {
        if !value.is_iterable() {
            return Err(type_error(format!(
                "cannot unpack non-iterable {} object",
                value.type_name()
            )));
        }
        let items = self.collect_iterable(&value)?;
        if items.len() < count {
            return Err(value_error(format!(
                "not enough values to unpack (expected {}, got {})",
                count,
                items.len()
            )));
        }
        if items.len() > count {
            return Err(value_error(format!(
                "too many values to unpack (expected {})",
                count
            )));
        }
        Ok(items)
    }

    fn execute_aug_assign(&mut self, target: &Expr, op: BinOp, value: &Expr) -> ExecResult<()> {
        match &target.kind {
            ExprKind::Name(name) => {
                let current = self.lookup_name(name)?;
                let operand = self.evaluate_expr(value)?;
                let result = self.inplace_op(op, &current, &operand)?;
                self.assign_name(name, result)
            }
            ExprKind::Attribute {
                value: object,
                name,
            } => {
                let object = self.evaluate_expr(object)?;
                let current = self.get_attribute(&object, name)?;
                let operand = self.evaluate_expr(value)?;
                let result = self.inplace_op(op, &current, &operand)?;
                self.set_attribute(&object, name, result)
            }
            ExprKind::Subscript {
                value: object,
                index,
            } if !matches!(index.kind, ExprKind::Slice { .. }) => {
                let object = self.evaluate_expr(object)?;
                let index = self.evaluate_expr(index)?;
                let current = self.get_item(&object, &index)?;
                let operand = self.evaluate_expr(value)?;
                let result = self.inplace_op(op, &current, &operand)?;
                self.set_item(&object, index, result)
            }
            _ => Err(type_error(
                "illegal expression for augmented assignment",
            )),
        }
    }

    /// `x op= y`: lists extend in place, everything else rebinds
    fn inplace_op(&mut self, op: BinOp, current: &Value, operand: &Value) -> ExecResult<Value> {
        if let (BinOp::Add, Value::List(items)) = (op, current) {
            if operand.is_iterable() {
                let extra = self.collect_iterable(operand)?;
                self.check_sequence_len(items.borrow().len() + extra.len())?;
                items.borrow_mut().extend(extra);
                return Ok(current.clone());
            }
        }
        self.binary_op(op, current, operand)
    }

    fn delete_target(&mut self, target: &Expr) -> ExecResult<()> {
        match &target.kind {
            ExprKind::Name(name) => self.delete_name(name),
            ExprKind::Tuple(targets) | ExprKind::List(targets) => {
                for target in targets {
                    self.delete_target(target)?;
                }
                Ok(())
            }
            ExprKind::Attribute { value, name } => {
                let object = self.evaluate_expr(value)?;
                self.delete_attribute(&object, name)
            }
            ExprKind::Subscript { value, index } => {
                let object = self.evaluate_expr(value)?;
                match &index.kind {
                    ExprKind::Slice { lower, upper, step } => {
                        let bounds = self.evaluate_slice(lower, upper, step)?;
                        self.delete_slice(&object, bounds)
                    }
                    _ => {
                        let index = self.evaluate_expr(index)?;
                        self.delete_item(&object, &index)
                    }
                }
            }
            _ => Err(type_error("cannot delete expression")),
        }
    }

    fn execute_while(
        &mut self,
        line: usize,
        condition: &Expr,
        body: &[Stmt],
        orelse: &[Stmt],
    ) -> ExecResult<()> {
        let mut first = true;
        loop {
            if !first {
                self.before_statement(line)?;
            }
            first = false;

            let test = self.evaluate_expr(condition)?;
            if !self.truthy(&test)? {
                return self.execute_block(orelse);
            }
            match self.execute_block(body) {
                Ok(()) | Err(Flow::Continue) => {}
                Err(Flow::Break) => return Ok(()),
                Err(flow) => return Err(flow),
            }
        }
    }

    fn execute_for(
        &mut self,
        line: usize,
        target: &Expr,
        iter: &Expr,
        body: &[Stmt],
        orelse: &[Stmt],
    ) -> ExecResult<()> {
        let iterable = self.evaluate_expr(iter)?;
        let mut iterator = self.make_iter(&iterable)?;
        let mut first = true;
        loop {
            if !first {
                self.before_statement(line)?;
            }
            first = false;

            let Some(item) = iterator.next_item()? else {
                return self.execute_block(orelse);
            };
            self.assign_target(target, item)?;
            match self.execute_block(body) {
                Ok(()) | Err(Flow::Continue) => {}
                Err(Flow::Break) => return Ok(()),
                Err(flow) => return Err(flow),
            }
        }
    }

    /// Create a function object, evaluating its defaults now
    pub(crate) fn make_function(&mut self, def: &Arc<FunctionDef>) -> ExecResult<Value> {
        let mut defaults = Vec::new();
        for param in &def.params {
            if let Some(default) = &param.default {
                defaults.push(self.evaluate_expr(default)?);
            }
        }
        let frame = self.current_frame()?;
        Ok(Value::Function(Rc::new(Function {
            def: def.clone(),
            defaults,
            globals: frame.globals.clone(),
            closure: frame.closure_for_definitions(),
            origin: frame.origin,
            class_name: RefCell::new(None),
        })))
    }

    /// Run a class body in its own frame and bind the resulting class
    fn execute_class_def(
        &mut self,
        line: usize,
        name: &str,
        base: Option<&Expr>,
        body: &[Stmt],
    ) -> ExecResult<()> {
        let base = match base {
            Some(expr) => {
                let value = self.evaluate_expr(expr)?;
                class_base(&value)?
            }
            None => ClassBase::Object,
        };
        let (enclosing, globals, origin) = {
            let frame = self.current_frame()?;
            (frame.closure_for_definitions(), frame.globals.clone(), frame.origin)
        };
        let namespace = Namespace::new_scope(None);
        self.enter_frame(Frame {
            function_name: Rc::from(name),
            kind: FrameKind::ClassBody,
            origin,
            locals: namespace.clone(),
            enclosing,
            globals,
            code: None,
            line,
            traced: false,
            comprehension_scopes: Vec::new(),
        });
        if let Err(flow) = self.execute_block(body) {
            self.stack.pop_frame();
            return Err(flow);
        }
        self.leave_frame(Value::None)?;

        let attrs = std::mem::take(&mut namespace.borrow_mut().vars);
        for value in attrs.values() {
            if let Value::Function(function) = value {
                *function.class_name.borrow_mut() = Some(name.to_string());
            }
        }
        let class = ClassObject {
            name: name.to_string(),
            base,
            attrs: RefCell::new(attrs),
        };
        self.assign_name(name, Value::Class(Rc::new(class)))
    }

    fn execute_try(
        &mut self,
        body: &[Stmt],
        handlers: &[ExceptHandler],
        orelse: &[Stmt],
        finalbody: &[Stmt],
    ) -> ExecResult<()> {
        let outcome = match self.execute_block(body) {
            Ok(()) => self.execute_block(orelse),
            Err(Flow::Raise(exc)) => self.handle_exception(exc, handlers),
            Err(flow) => Err(flow),
        };
        if finalbody.is_empty() || matches!(outcome, Err(Flow::Halt(_))) {
            return outcome;
        }
        // A finally block that exits abruptly replaces the pending outcome.
        self.execute_block(finalbody)?;
        outcome
    }

    fn handle_exception(
        &mut self,
        exc: Box<PyException>,
        handlers: &[ExceptHandler],
    ) -> ExecResult<()> {
        for handler in handlers {
            if !self.handler_matches(handler, &exc)? {
                continue;
            }
            if let Some(name) = &handler.name {
                self.assign_name(name, Value::Exception(exc.value.clone()))?;
            }
            self.handling.push(exc);
            let result = self.execute_block(&handler.body);
            self.handling.pop();
            if let Some(name) = &handler.name {
                // The handler may already have deleted or rebound it.
                self.delete_name(name).ok();
            }
            return result;
        }
        Err(Flow::Raise(exc))
    }

    fn handler_matches(&mut self, handler: &ExceptHandler, exc: &PyException) -> ExecResult<bool> {
        let Some(kind) = &handler.kind else {
            return Ok(true);
        };
        let filter = self.evaluate_expr(kind)?;
        exception_matches(&exc.value, &filter)
    }

    fn execute_raise(&mut self, expr: Option<&Expr>) -> ExecResult<()> {
        let Some(expr) = expr else {
            return match self.handling.last() {
                Some(active) => {
                    let mut exc = active.clone();
                    exc.reported_depth = None;
                    Err(Flow::Raise(exc))
                }
                None => Err(raise(
                    ExceptionKind::RuntimeError,
                    "No active exception to reraise",
                )),
            };
        };
        let value = self.evaluate_expr(expr)?;
        let object = match &value {
            Value::Exception(object) => object.clone(),
            Value::ExceptionType(_) => self.instantiate_exception(&value)?,
            Value::Class(class) if class.exception_kind().is_some() => {
                self.instantiate_exception(&value)?
            }
            _ => return Err(type_error("exceptions must derive from BaseException")),
        };
        Err(Flow::Raise(Box::new(PyException::new(object))))
    }

    fn instantiate_exception(&mut self, class: &Value) -> ExecResult<Rc<ExceptionObject>> {
        match self.call_value(class, Vec::new(), Vec::new())? {
            Value::Exception(object) => Ok(object),
            _ => Err(type_error("exceptions must derive from BaseException")),
        }
    }

    fn execute_import_from(&mut self, module: &str, names: &[(String, Option<String>)]) -> ExecResult<()> {
        let Value::Module(loaded) = self.import_module(module)? else {
            return Ok(());
        };
        for (name, alias) in names {
            if name == "*" {
                for (attr, value) in loaded.attrs.iter() {
                    self.assign_name(attr, value.clone())?;
                }
                continue;
            }
            let value = loaded.attrs.get(name).cloned().ok_or_else(|| {
                raise(
                    ExceptionKind::ImportError,
                    format!(
                        "cannot import name '{}' from '{}' (unknown location)",
                        name, module
                    ),
                )
            })?;
            self.assign_name(alias.as_deref().unwrap_or(name), value)?;
        }
        Ok(())
    }
}

/// Whether an `except` clause's filter catches the exception
pub(crate) fn exception_matches(exc: &ExceptionObject, filter: &Value) -> ExecResult<bool> {
    match filter {
        Value::ExceptionType(kind) => Ok(exc.kind.is_subclass_of(*kind)),
        Value::Class(class) if class.exception_kind().is_some() => Ok(exc
            .class
            .as_ref()
            .is_some_and(|own| own.is_subclass_of(class))),
        Value::Tuple(options) => {
            for option in options.iter() {
                if exception_matches(exc, option)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        _ => Err(type_error(
            "catching classes that do not inherit from BaseException is not allowed",
        )),
    }
}

#[cfg(test)]
mod tests {
    use crate::config::TracerLimits;
    use crate::interpreter::engine::Interpreter;
    use crate::interpreter::errors::{ExecResult, Flow};
    use crate::interpreter::hook::NoHook;
    use crate::parser::ast::CodeOrigin;
    use crate::parser::parse::parse_source;

    fn run(source: &str) -> (ExecResult<()>, String) {
        let program = parse_source(source, CodeOrigin::Submitted).unwrap();
        let mut hook = NoHook;
        let mut interpreter = Interpreter::new(&mut hook, TracerLimits::default());
        let result = interpreter.run_program(&program);
        let (stdout, _) = interpreter.take_console().into_streams();
        (result, stdout)
    }

    fn output(source: &str) -> String {
        let (result, out) = run(source);
        if let Err(Flow::Raise(exc)) = &result {
            panic!("Unexpected exception: {}", exc.summary());
        }
        assert!(result.is_ok());
        out
    }

    #[test]
    fn test_while_else_and_break() {
        let source = "\
i = 0
while i < 3:
    i += 1
else:
    print('done', i)
for n in range(10):
    if n == 2:
        break
else:
    print('never')
print(n)
";
        assert_eq!(output(source), "done 3\n2\n");
    }

    #[test]
    fn test_unpacking_assignment() {
        assert_eq!(output("a, (b, c) = 1, [2, 3]\nx = y = a + c\nprint(a, b, c, x, y)\n"), "1 2 3 4 4\n");
    }

    #[test]
    fn test_unpacking_errors() {
        let (result, _) = run("a, b = [1, 2, 3]\n");
        match result {
            Err(Flow::Raise(exc)) => {
                assert_eq!(exc.summary(), "ValueError: too many values to unpack (expected 2)")
            }
            _ => panic!("Expected ValueError"),
        }
    }

    #[test]
    fn test_list_augmented_add_is_in_place() {
        assert_eq!(output("a = [1]\nb = a\nb += [2]\nprint(a)\n"), "[1, 2]\n");
    }

    #[test]
    fn test_try_except_else_finally() {
        let source = "\
def check(d, k):
    try:
        v = d[k]
    except KeyError as e:
        print('missing', e)
        return -1
    else:
        print('found')
        return v
    finally:
        print('finally')
print(check({'a': 1}, 'a'))
print(check({}, 'b'))
";
        assert_eq!(output(source), "found\nfinally\n1\nmissing 'b'\nfinally\n-1\n");
    }

    #[test]
    fn test_except_tuple_and_hierarchy() {
        let source = "\
try:
    1 / 0
except (ValueError, ArithmeticError) as e:
    print(type(e).__name__, e)
";
        assert_eq!(output(source), "ZeroDivisionError division by zero\n");
    }

    #[test]
    fn test_bare_reraise() {
        let (result, out) = run("try:\n    [][0]\nexcept IndexError:\n    print('seen')\n    raise\n");
        assert_eq!(out, "seen\n");
        match result {
            Err(Flow::Raise(exc)) => assert_eq!(exc.summary(), "IndexError: list index out of range"),
            _ => panic!("Expected IndexError"),
        }
    }

    #[test]
    fn test_user_exception_class() {
        let source = "\
class InsufficientFunds(ValueError):
    def __init__(self, amount):
        self.amount = amount
try:
    raise InsufficientFunds(30)
except ValueError as e:
    print('short by', e.amount, e.args)
";
        assert_eq!(output(source), "short by 30 (30,)\n");
    }

    #[test]
    fn test_class_with_methods_and_inheritance() {
        let source = "\
class Animal:
    sound = '...'
    def __init__(self, name):
        self.name = name
    def speak(self):
        return self.name + ' says ' + self.sound
class Dog(Animal):
    sound = 'woof'
d = Dog('rex')
print(d.speak())
print(isinstance(d, Animal), isinstance(d, Dog))
";
        assert_eq!(output(source), "rex says woof\nTrue True\n");
    }

    #[test]
    fn test_assert_message() {
        let (result, _) = run("assert 1 > 2, 'math is broken'\n");
        match result {
            Err(Flow::Raise(exc)) => assert_eq!(exc.summary(), "AssertionError: math is broken"),
            _ => panic!("Expected AssertionError"),
        }
    }

    #[test]
    fn test_del_statement() {
        assert_eq!(
            output("d = {'a': 1, 'b': 2}\ndel d['a']\nxs = [1, 2, 3, 4]\ndel xs[1:3]\nprint(d, xs)\n"),
            "{'b': 2} [1, 4]\n"
        );
    }

    #[test]
    fn test_except_name_is_cleared_after_handler() {
        let (result, _) = run("try:\n    raise ValueError('x')\nexcept ValueError as err:\n    pass\nprint(err)\n");
        match result {
            Err(Flow::Raise(exc)) => assert_eq!(exc.type_name(), "NameError"),
            _ => panic!("Expected NameError"),
        }
    }
}
