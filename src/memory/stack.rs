//! Call stack implementation
//!
//! This module provides the call stack of the traced interpreter:
//! - [`Namespace`] / [`Scope`]: a shared, insertion-ordered variable table
//! - [`Frame`]: one activation record (module body, function call or class body)
//! - [`CallStack`]: the frames of the running program, innermost last
//!
//! # Name Resolution
//!
//! Function namespaces link to the namespace of the function they were defined
//! in through [`Namespace::parent`], which gives closures and `nonlocal` their
//! variables. Module frames use the globals namespace as their locals.

use super::value::Value;
use crate::parser::ast::{CodeOrigin, FunctionDef};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

/// Variables of one scope, in the order they were first bound
#[derive(Debug, Default)]
pub struct Namespace {
    pub vars: IndexMap<String, Value, rustc_hash::FxBuildHasher>,
    pub parent: Option<Scope>,
}

pub type Scope = Rc<RefCell<Namespace>>;

impl Namespace {
    pub fn new_scope(parent: Option<Scope>) -> Scope {
        Rc::new(RefCell::new(Namespace {
            vars: IndexMap::default(),
            parent,
        }))
    }
}

/// Find the innermost scope along a parent chain that binds `name`
pub fn find_in_chain(start: &Option<Scope>, name: &str) -> Option<Scope> {
    let mut current = start.clone();
    while let Some(scope) = current {
        if scope.borrow().vars.contains_key(name) {
            return Some(scope);
        }
        current = scope.borrow().parent.clone();
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Module,
    Function,
    ClassBody,
}

/// Activation record of a module body, function call or class body
#[derive(Debug)]
pub struct Frame {
    pub function_name: Rc<str>,
    pub kind: FrameKind,
    pub origin: CodeOrigin,
    pub locals: Scope,
    /// Scope chain searched for free variables after `locals`
    pub enclosing: Option<Scope>,
    pub globals: Scope,
    /// Function being executed, for its local/global/nonlocal name sets
    pub code: Option<Arc<FunctionDef>>,
    /// Line of the statement currently executing
    pub line: usize,
    /// Whether the instrumentation hook subscribed to this frame
    pub traced: bool,
    /// Loop variables of the comprehensions currently running, innermost last
    pub comprehension_scopes: Vec<IndexMap<String, Value, rustc_hash::FxBuildHasher>>,
}

impl Frame {
    pub fn module(origin: CodeOrigin, globals: Scope) -> Self {
        Frame {
            function_name: Rc::from("<module>"),
            kind: FrameKind::Module,
            origin,
            locals: globals.clone(),
            enclosing: None,
            globals,
            code: None,
            line: 0,
            traced: false,
            comprehension_scopes: Vec::new(),
        }
    }

    /// Variable bound by a running comprehension, innermost first
    pub fn comprehension_variable(&self, name: &str) -> Option<Value> {
        self.comprehension_scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).cloned())
    }

    /// Whether assignments to `name` in this frame bind locally
    pub fn is_local_name(&self, name: &str) -> bool {
        match &self.code {
            Some(code) => code.local_names.iter().any(|n| n == name),
            None => true,
        }
    }

    pub fn is_declared_global(&self, name: &str) -> bool {
        self.code
            .as_ref()
            .is_some_and(|code| code.global_names.iter().any(|n| n == name))
    }

    pub fn is_declared_nonlocal(&self, name: &str) -> bool {
        self.code
            .as_ref()
            .is_some_and(|code| code.nonlocal_names.iter().any(|n| n == name))
    }

    /// Closure captured by functions defined while this frame runs
    pub fn closure_for_definitions(&self) -> Option<Scope> {
        match self.kind {
            FrameKind::Module => None,
            FrameKind::Function => Some(self.locals.clone()),
            FrameKind::ClassBody => self.enclosing.clone(),
        }
    }

    /// Snapshot of the frame's own variables in binding order
    pub fn local_variables(&self) -> Vec<(String, Value)> {
        match self.locals.try_borrow() {
            Ok(ns) => ns
                .vars
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

/// The call stack
#[derive(Debug, Default)]
pub struct CallStack {
    frames: Vec<Frame>,
}

impl CallStack {
    pub fn new() -> Self {
        CallStack { frames: Vec::new() }
    }

    pub fn push_frame(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn pop_frame(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    pub fn current_frame(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn current_frame_mut(&mut self) -> Option<&mut Frame> {
        self.frames.last_mut()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_in_chain_returns_innermost_binding() {
        let outer = Namespace::new_scope(None);
        outer
            .borrow_mut()
            .vars
            .insert("x".to_string(), Value::Int(1));
        let inner = Namespace::new_scope(Some(outer.clone()));
        inner
            .borrow_mut()
            .vars
            .insert("y".to_string(), Value::Int(2));

        let found = find_in_chain(&Some(inner.clone()), "x").unwrap();
        assert!(Rc::ptr_eq(&found, &outer));
        assert!(find_in_chain(&Some(inner), "z").is_none());
    }

    #[test]
    fn test_module_frame_locals_are_globals() {
        let globals = Namespace::new_scope(None);
        let frame = Frame::module(CodeOrigin::Submitted, globals.clone());
        assert!(Rc::ptr_eq(&frame.locals, &globals));
        assert!(frame.is_local_name("anything"));
        assert!(frame.closure_for_definitions().is_none());
    }

    #[test]
    fn test_stack_depth() {
        let mut stack = CallStack::new();
        stack.push_frame(Frame::module(CodeOrigin::Submitted, Namespace::new_scope(None)));
        assert_eq!(stack.depth(), 1);
        assert_eq!(&*stack.current_frame().unwrap().function_name, "<module>");
        stack.pop_frame();
        assert!(stack.is_empty());
    }
}
