//! Calling functions, classes and bound methods
//!
//! Calls to user functions push a new [`Frame`] whose namespace links to the
//! function's closure, bind the arguments with CPython's error messages, run
//! the body and pop the frame again. Native callables dispatch to
//! [`builtins`](super::builtins) and [`methods`](super::methods).

use super::engine::Interpreter;
use super::errors::{raise, type_error, ExceptionKind, ExecResult, Flow};
use crate::memory::stack::{Frame, FrameKind, Namespace};
use crate::memory::value::{
    AttrMap, ClassObject, ExceptionObject, Function, Instance, Method, Value,
};
use std::cell::RefCell;
use std::rc::Rc;

impl Interpreter<'_> {
    /// Call any callable value
    pub(crate) fn call_value(
        &mut self,
        callee: &Value,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> ExecResult<Value> {
        match callee {
            Value::Function(function) => self.call_function(function, args, kwargs),
            Value::Builtin(builtin) => self.call_builtin(*builtin, args, kwargs),
            Value::BoundMethod(bound) => match &bound.method {
                Method::Function(function) => {
                    let mut full = Vec::with_capacity(args.len() + 1);
                    full.push(bound.receiver.clone());
                    full.extend(args);
                    self.call_function(function, full, kwargs)
                }
                Method::Native(name) => self.call_method(&bound.receiver, name, args, kwargs),
            },
            Value::Class(class) => self.instantiate(class, args, kwargs),
            Value::ExceptionType(kind) => {
                if let Some((name, _)) = kwargs.first() {
                    return Err(type_error(format!(
                        "{}() got an unexpected keyword argument '{}'",
                        kind.name(),
                        name
                    )));
                }
                Ok(Value::Exception(Rc::new(ExceptionObject::new(*kind, args))))
            }
            Value::OtherType(name) => Err(type_error(format!(
                "cannot create '{}' instances",
                name
            ))),
            other => Err(type_error(format!(
                "'{}' object is not callable",
                other.type_name()
            ))),
        }
    }

    /// Run a user function in a new frame
    pub(crate) fn call_function(
        &mut self,
        function: &Rc<Function>,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> ExecResult<Value> {
        if self.stack.depth() >= self.limits.max_call_depth {
            return Err(raise(
                ExceptionKind::RecursionError,
                "maximum recursion depth exceeded",
            ));
        }
        let locals = Namespace::new_scope(function.closure.clone());
        bind_arguments(function, args, kwargs, &mut locals.borrow_mut().vars)?;

        let def = &function.def;
        self.enter_frame(Frame {
            function_name: Rc::from(def.name.as_str()),
            kind: FrameKind::Function,
            origin: function.origin,
            locals,
            enclosing: function.closure.clone(),
            globals: function.globals.clone(),
            code: Some(def.clone()),
            line: def.location.line,
            traced: false,
            comprehension_scopes: Vec::new(),
        });
        match self.execute_block(&def.body) {
            Ok(()) => self.leave_frame(Value::None),
            Err(Flow::Return(value)) => self.leave_frame(value),
            Err(flow) => {
                self.stack.pop_frame();
                Err(flow)
            }
        }
    }

    /// Call a dunder method defined on the receiver's class, if there is one
    pub(crate) fn call_dunder(
        &mut self,
        receiver: &Value,
        name: &str,
        args: Vec<Value>,
    ) -> ExecResult<Option<Value>> {
        let class = match receiver {
            Value::Instance(instance) => &instance.class,
            Value::Exception(exc) => match &exc.class {
                Some(class) => class,
                None => return Ok(None),
            },
            _ => return Ok(None),
        };
        let Some(method) = class.lookup(name) else {
            return Ok(None);
        };
        let result = match &method {
            Value::Function(function) => {
                let mut full = Vec::with_capacity(args.len() + 1);
                full.push(receiver.clone());
                full.extend(args);
                self.call_function(function, full, Vec::new())?
            }
            other => self.call_value(other, args, Vec::new())?,
        };
        Ok(Some(result))
    }

    /// `Class(...)`: create the object, then run `__init__`
    fn instantiate(
        &mut self,
        class: &Rc<ClassObject>,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> ExecResult<Value> {
        let exception_kind = class.exception_kind();
        let object = match exception_kind {
            // Exception args are the constructor arguments, whatever __init__ does.
            Some(kind) => Value::Exception(Rc::new(ExceptionObject {
                kind,
                class: Some(class.clone()),
                args: args.clone(),
                attrs: RefCell::new(AttrMap::default()),
            })),
            None => Value::Instance(Rc::new(Instance {
                class: class.clone(),
                attrs: RefCell::new(AttrMap::default()),
            })),
        };

        match class.lookup("__init__") {
            Some(Value::Function(init)) => {
                let mut full = Vec::with_capacity(args.len() + 1);
                full.push(object.clone());
                full.extend(args);
                let returned = self.call_function(&init, full, kwargs)?;
                if !matches!(returned, Value::None) {
                    return Err(type_error(format!(
                        "__init__() should return None, not '{}'",
                        returned.type_name()
                    )));
                }
            }
            Some(other) => {
                self.call_value(&other, args, kwargs)?;
            }
            None if exception_kind.is_none() && (!args.is_empty() || !kwargs.is_empty()) => {
                return Err(type_error(format!("{}() takes no arguments", class.name)));
            }
            None => {
                if let Some((name, _)) = kwargs.first() {
                    return Err(type_error(format!(
                        "{}() got an unexpected keyword argument '{}'",
                        class.name, name
                    )));
                }
            }
        }
        Ok(object)
    }
}

/// Bind call arguments to parameters the way CPython does, with its messages
fn bind_arguments(
    function: &Function,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
    vars: &mut indexmap::IndexMap<String, Value, rustc_hash::FxBuildHasher>,
) -> ExecResult<()> {
    let params = &function.def.params;
    let name = function.qualified_name();
    let first_default = params.len() - function.defaults.len();

    if args.len() > params.len() {
        let takes = if first_default < params.len() {
            format!("from {} to {}", first_default, params.len())
        } else {
            params.len().to_string()
        };
        return Err(type_error(format!(
            "{}() takes {} positional argument{} but {} {} given",
            name,
            takes,
            if params.len() == 1 && first_default == params.len() { "" } else { "s" },
            args.len(),
            if args.len() == 1 { "was" } else { "were" }
        )));
    }

    let mut slots: Vec<Option<Value>> = vec![None; params.len()];
    for (slot, value) in slots.iter_mut().zip(args) {
        *slot = Some(value);
    }
    for (keyword, value) in kwargs {
        let Some(index) = params.iter().position(|p| p.name == keyword) else {
            return Err(type_error(format!(
                "{}() got an unexpected keyword argument '{}'",
                name, keyword
            )));
        };
        if slots[index].is_some() {
            return Err(type_error(format!(
                "{}() got multiple values for argument '{}'",
                name, keyword
            )));
        }
        slots[index] = Some(value);
    }

    let mut missing = Vec::new();
    for (index, slot) in slots.iter_mut().enumerate() {
        if slot.is_none() {
            match index.checked_sub(first_default) {
                Some(offset) => *slot = function.defaults.get(offset).cloned(),
                None => missing.push(format!("'{}'", params[index].name)),
            }
        }
    }
    if !missing.is_empty() {
        return Err(type_error(format!(
            "{}() missing {} required positional argument{}: {}",
            name,
            missing.len(),
            if missing.len() == 1 { "" } else { "s" },
            join_names(&missing)
        )));
    }

    for (param, slot) in params.iter().zip(slots) {
        if let Some(value) = slot {
            vars.insert(param.name.clone(), value);
        }
    }
    Ok(())
}

/// `'a'`, `'a' and 'b'`, `'a', 'b', and 'c'`
fn join_names(names: &[String]) -> String {
    match names {
        [] => String::new(),
        [one] => one.clone(),
        [first, second] => format!("{} and {}", first, second),
        [rest @ .., last] => format!("{}, and {}", rest.join(", "), last),
    }
}

#[cfg(test)]
mod tests {
    use super::join_names;
    use crate::config::TracerLimits;
    use crate::interpreter::engine::Interpreter;
    use crate::interpreter::errors::{ExecResult, Flow};
    use crate::interpreter::hook::NoHook;
    use crate::parser::ast::CodeOrigin;
    use crate::parser::parse::parse_source;

    fn run(source: &str) -> (ExecResult<()>, String) {
        let program = parse_source(source, CodeOrigin::Submitted).unwrap();
        let mut hook = NoHook;
        // Test threads have small stacks; keep recursion shallow.
        let limits = TracerLimits {
            max_call_depth: 40,
            ..TracerLimits::default()
        };
        let mut interpreter = Interpreter::new(&mut hook, limits);
        let result = interpreter.run_program(&program);
        let (stdout, _) = interpreter.take_console().into_streams();
        (result, stdout)
    }

    fn error_summary(source: &str) -> String {
        match run(source).0 {
            Err(Flow::Raise(exc)) => exc.summary(),
            _ => panic!("Expected an exception"),
        }
    }

    #[test]
    fn test_join_names() {
        let names: Vec<String> = ["'a'", "'b'", "'c'"].iter().map(|s| s.to_string()).collect();
        assert_eq!(join_names(&names[..1]), "'a'");
        assert_eq!(join_names(&names[..2]), "'a' and 'b'");
        assert_eq!(join_names(&names), "'a', 'b', and 'c'");
    }

    #[test]
    fn test_defaults_and_keywords() {
        let (result, out) = run("def f(a, b=2, c=3):\n    return a + b * c\nprint(f(1), f(1, c=10), f(b=0, a=5))\n");
        assert!(result.is_ok());
        assert_eq!(out, "7 21 5\n");
    }

    #[test]
    fn test_argument_errors() {
        assert_eq!(
            error_summary("def f(a, b):\n    pass\nf(1)\n"),
            "TypeError: f() missing 1 required positional argument: 'b'"
        );
        assert_eq!(
            error_summary("def f(a):\n    pass\nf(1, 2)\n"),
            "TypeError: f() takes 1 positional argument but 2 were given"
        );
        assert_eq!(
            error_summary("def f(a):\n    pass\nf(1, a=2)\n"),
            "TypeError: f() got multiple values for argument 'a'"
        );
        assert_eq!(
            error_summary("def f(a):\n    pass\nf(z=2)\n"),
            "TypeError: f() got an unexpected keyword argument 'z'"
        );
    }

    #[test]
    fn test_recursion_limit() {
        assert_eq!(
            error_summary("def f(n):\n    return f(n + 1)\nf(0)\n"),
            "RecursionError: maximum recursion depth exceeded"
        );
    }

    #[test]
    fn test_closures_capture_enclosing_scope() {
        let source = "\
def make_counter():
    count = 0
    def step():
        nonlocal count
        count += 1
        return count
    return step
c = make_counter()
c()
print(c(), c())
";
        let (result, out) = run(source);
        assert!(result.is_ok());
        assert_eq!(out, "2 3\n");
    }

    #[test]
    fn test_class_without_init_rejects_arguments() {
        assert_eq!(
            error_summary("class A:\n    pass\nA(1)\n"),
            "TypeError: A() takes no arguments"
        );
    }

    #[test]
    fn test_calling_non_callable() {
        assert_eq!(error_summary("x = 5\nx()\n"), "TypeError: 'int' object is not callable");
    }

    #[test]
    fn test_dunder_methods() {
        let source = "\
class Vec:
    def __init__(self, x, y):
        self.x = x
        self.y = y
    def __add__(self, other):
        return Vec(self.x + other.x, self.y + other.y)
    def __eq__(self, other):
        return self.x == other.x and self.y == other.y
    def __repr__(self):
        return f'Vec({self.x}, {self.y})'
v = Vec(1, 2) + Vec(3, 4)
print(v, v == Vec(4, 6))
";
        let (result, out) = run(source);
        assert!(result.is_ok());
        assert_eq!(out, "Vec(4, 6) True\n");
    }
}
