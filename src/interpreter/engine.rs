//! Interpreter core
//!
//! [`Interpreter`] owns the call stack and the captured console of one run and
//! drives the [`Hook`] as it executes: `on_call` when a frame is pushed, a
//! `line` event before every statement, `return` when a frame completes
//! normally and `exception` the first time an exception reaches a frame.
//!
//! Name resolution follows Python's rules for the supported subset: running
//! comprehensions, then the frame's locals (a name assigned anywhere in a
//! function is local for the whole function), then enclosing function scopes,
//! then the module globals, then the builtins namespace.

use super::builtins::{math_module, BuiltinFunction};
use super::console::Console;
use super::constants::ABORT_POLL_INTERVAL;
use super::errors::{ExceptionKind, ExecResult, Flow, HaltReason, PyException, TracebackEntry, raise};
use super::hook::{Hook, HookControl, TraceEvent};
use crate::config::TracerLimits;
use crate::memory::stack::{find_in_chain, CallStack, Frame, FrameKind, Namespace, Scope};
use crate::memory::value::Value;
use crate::parser::ast::Program;
use rustc_hash::FxHashMap;

pub struct Interpreter<'h> {
    pub(crate) stack: CallStack,
    pub(crate) hook: &'h mut dyn Hook,
    pub(crate) console: Console,
    pub(crate) limits: TracerLimits,
    builtins: FxHashMap<String, Value>,
    /// Exceptions caught by the `except` blocks currently running, innermost last
    pub(crate) handling: Vec<Box<PyException>>,
    /// Module namespaces created by this interpreter, cleared on drop
    module_scopes: Vec<Scope>,
    math: Option<Value>,
    statements_since_poll: u32,
}

impl<'h> Interpreter<'h> {
    pub fn new(hook: &'h mut dyn Hook, limits: TracerLimits) -> Self {
        let mut builtins = FxHashMap::default();
        for builtin in BuiltinFunction::GLOBALS {
            builtins.insert(builtin.name().to_string(), Value::Builtin(builtin));
        }
        for kind in ExceptionKind::ALL {
            builtins.insert(kind.name().to_string(), Value::ExceptionType(kind));
        }
        builtins.insert("object".to_string(), Value::OtherType("object"));

        Interpreter {
            stack: CallStack::new(),
            hook,
            console: Console::new(),
            limits,
            builtins,
            handling: Vec::new(),
            module_scopes: Vec::new(),
            math: None,
            statements_since_poll: 0,
        }
    }

    /// Execute library code and publish its public names as builtins
    pub fn load_prelude(&mut self, prelude: &Program) -> ExecResult<()> {
        let globals = self.new_module_scope();
        self.execute_module(prelude, &globals)?;
        let exported: Vec<(String, Value)> = globals
            .borrow()
            .vars
            .iter()
            .filter(|(name, _)| !name.starts_with('_'))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        self.builtins.extend(exported);
        Ok(())
    }

    /// Execute a program in a fresh module namespace
    pub fn run_program(&mut self, program: &Program) -> ExecResult<()> {
        let globals = self.new_module_scope();
        self.execute_module(program, &globals)
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    pub fn take_console(&mut self) -> Console {
        std::mem::take(&mut self.console)
    }

    fn new_module_scope(&mut self) -> Scope {
        let scope = Namespace::new_scope(None);
        self.module_scopes.push(scope.clone());
        scope
    }

    fn execute_module(&mut self, program: &Program, globals: &Scope) -> ExecResult<()> {
        self.enter_frame(Frame::module(program.origin, globals.clone()));
        match self.execute_block(&program.body) {
            Ok(()) => self.leave_frame(Value::None).map(|_| ()),
            Err(flow) => {
                self.stack.pop_frame();
                Err(flow)
            }
        }
    }

    /// Push a frame, letting the hook decide whether to subscribe to it
    pub(crate) fn enter_frame(&mut self, mut frame: Frame) {
        frame.traced = self.hook.on_call(&frame);
        self.stack.push_frame(frame);
    }

    /// Emit the frame's `return` event and pop it
    pub(crate) fn leave_frame(&mut self, value: Value) -> ExecResult<Value> {
        let control = match self.stack.current_frame() {
            Some(frame) if frame.traced => self.hook.on_event(frame, TraceEvent::Return(&value)),
            _ => HookControl::Continue,
        };
        self.stack.pop_frame();
        match control {
            HookControl::Continue => Ok(value),
            HookControl::Stop => Err(Flow::Halt(HaltReason::HookStopped)),
        }
    }

    /// Move the current frame to `line` and emit a `line` event
    pub(crate) fn before_statement(&mut self, line: usize) -> ExecResult<()> {
        self.poll_abort()?;
        let Some(frame) = self.stack.current_frame_mut() else {
            return Ok(());
        };
        frame.line = line;
        if !frame.traced {
            return Ok(());
        }
        match self.hook.on_event(frame, TraceEvent::Line) {
            HookControl::Continue => Ok(()),
            HookControl::Stop => Err(Flow::Halt(HaltReason::HookStopped)),
        }
    }

    fn poll_abort(&mut self) -> ExecResult<()> {
        self.statements_since_poll += 1;
        if self.statements_since_poll < ABORT_POLL_INTERVAL {
            return Ok(());
        }
        self.statements_since_poll = 0;
        if self.hook.should_abort() {
            return Err(Flow::Halt(HaltReason::Aborted));
        }
        Ok(())
    }

    /// Record that an exception reached the current frame.
    ///
    /// Each frame appends one traceback entry and emits one `exception` event
    /// per raise, however many nested statements the exception unwinds.
    pub(crate) fn report_exception(&mut self, exc: &mut PyException) -> ExecResult<()> {
        let depth = self.stack.depth();
        if exc.reported_depth == Some(depth) {
            return Ok(());
        }
        exc.reported_depth = Some(depth);
        let Some(frame) = self.stack.current_frame() else {
            return Ok(());
        };
        exc.traceback.push(TracebackEntry {
            function: frame.function_name.clone(),
            line: frame.line,
            origin: frame.origin,
        });
        if frame.traced && self.hook.on_event(frame, TraceEvent::Exception(&*exc)) == HookControl::Stop {
            return Err(Flow::Halt(HaltReason::HookStopped));
        }
        Ok(())
    }

    pub(crate) fn current_frame(&self) -> ExecResult<&Frame> {
        self.stack
            .current_frame()
            .ok_or_else(|| raise(ExceptionKind::RuntimeError, "no frame is executing"))
    }

    pub(crate) fn lookup_name(&self, name: &str) -> ExecResult<Value> {
        let frame = self.current_frame()?;
        if let Some(value) = frame.comprehension_variable(name) {
            return Ok(value);
        }
        if !frame.is_declared_global(name) {
            if let Some(value) = frame.locals.borrow().vars.get(name) {
                return Ok(value.clone());
            }
            if frame.kind == FrameKind::Function && frame.is_local_name(name) {
                return Err(raise(
                    ExceptionKind::UnboundLocalError,
                    format!(
                        "cannot access local variable '{}' where it is not associated with a value",
                        name
                    ),
                ));
            }
            if let Some(scope) = find_in_chain(&frame.enclosing, name) {
                if let Some(value) = scope.borrow().vars.get(name) {
                    return Ok(value.clone());
                }
            }
        }
        if let Some(value) = frame.globals.borrow().vars.get(name) {
            return Ok(value.clone());
        }
        self.builtins.get(name).cloned().ok_or_else(|| {
            raise(
                ExceptionKind::NameError,
                format!("name '{}' is not defined", name),
            )
        })
    }

    pub(crate) fn assign_name(&mut self, name: &str, value: Value) -> ExecResult<()> {
        let frame = self.current_frame()?;
        let scope = if frame.is_declared_global(name) {
            frame.globals.clone()
        } else if frame.is_declared_nonlocal(name) {
            find_in_chain(&frame.enclosing, name).ok_or_else(|| {
                raise(
                    ExceptionKind::NameError,
                    format!("no binding for nonlocal '{}' found", name),
                )
            })?
        } else {
            frame.locals.clone()
        };
        scope.borrow_mut().vars.insert(name.to_string(), value);
        Ok(())
    }

    pub(crate) fn delete_name(&mut self, name: &str) -> ExecResult<()> {
        let frame = self.current_frame()?;
        let scope = if frame.is_declared_global(name) {
            Some(frame.globals.clone())
        } else if frame.is_declared_nonlocal(name) {
            find_in_chain(&frame.enclosing, name)
        } else {
            Some(frame.locals.clone())
        };
        let removed = scope.and_then(|scope| scope.borrow_mut().vars.shift_remove(name));
        match removed {
            Some(_) => Ok(()),
            None => Err(raise(
                ExceptionKind::NameError,
                format!("name '{}' is not defined", name),
            )),
        }
    }

    pub(crate) fn import_module(&mut self, name: &str) -> ExecResult<Value> {
        if name != "math" {
            return Err(raise(
                ExceptionKind::ModuleNotFoundError,
                format!("No module named '{}'", name),
            ));
        }
        Ok(self.math.get_or_insert_with(math_module).clone())
    }

    /// Refuse to materialize sequences beyond the configured length
    pub(crate) fn check_sequence_len(&self, len: usize) -> ExecResult<()> {
        if len > self.limits.max_sequence_len {
            return Err(raise(ExceptionKind::MemoryError, "sequence too large"));
        }
        Ok(())
    }
}

impl Drop for Interpreter<'_> {
    fn drop(&mut self) {
        // Functions hold their module namespace; clearing it releases the cycle.
        for scope in self.module_scopes.drain(..) {
            if let Ok(mut namespace) = scope.try_borrow_mut() {
                namespace.vars.clear();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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

    fn raised_kind(result: ExecResult<()>) -> ExceptionKind {
        match result {
            Err(Flow::Raise(exc)) => exc.kind(),
            other => panic!("Expected an exception, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_print_and_arithmetic() {
        let (result, out) = run("x = 2\ny = x * 3 + 1\nprint(x, y)\n");
        assert!(result.is_ok());
        assert_eq!(out, "2 7\n");
    }

    #[test]
    fn test_unbound_local() {
        let (result, _) = run("x = 1\ndef f():\n    print(x)\n    x = 2\nf()\n");
        assert_eq!(raised_kind(result), ExceptionKind::UnboundLocalError);
    }

    #[test]
    fn test_global_and_nonlocal() {
        let source = "\
count = 0
def bump():
    global count
    count += 1
def outer():
    total = 0
    def add(n):
        nonlocal total
        total += n
    add(2)
    add(3)
    return total
bump()
bump()
print(count, outer())
";
        let (result, out) = run(source);
        assert!(result.is_ok());
        assert_eq!(out, "2 5\n");
    }

    #[test]
    fn test_undefined_name() {
        let (result, _) = run("print(missing)\n");
        match result {
            Err(Flow::Raise(exc)) => assert_eq!(exc.summary(), "NameError: name 'missing' is not defined"),
            _ => panic!("Expected NameError"),
        }
    }

    #[test]
    fn test_unknown_module() {
        let (result, _) = run("import os\n");
        assert_eq!(raised_kind(result), ExceptionKind::ModuleNotFoundError);
    }

    #[test]
    fn test_math_module() {
        let (result, out) = run("import math\nfrom math import sqrt\nprint(math.floor(2.7), sqrt(16))\n");
        assert!(result.is_ok());
        assert_eq!(out, "2 4.0\n");
    }
}
