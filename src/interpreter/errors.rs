//! Runtime error types for the Python interpreter
//!
//! This module defines:
//! - [`ExceptionKind`]: the built-in exception hierarchy
//! - [`PyException`]: an exception in flight, with the traceback it collected
//! - [`Flow`]: non-local control flow (`return`, `break`, `continue`, raise, halt)
//!
//! Python exceptions are values of the traced program, not Rust errors: they
//! propagate as `Err(Flow::Raise(..))` and can be caught by `try`/`except`.
//! [`Flow::Halt`] is the only variant user code cannot intercept.

use crate::memory::value::{ExceptionObject, Value};
use crate::parser::ast::CodeOrigin;
use std::rc::Rc;

/// Built-in exception classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExceptionKind {
    BaseException,
    Exception,
    ArithmeticError,
    ZeroDivisionError,
    OverflowError,
    LookupError,
    IndexError,
    KeyError,
    NameError,
    UnboundLocalError,
    TypeError,
    ValueError,
    AttributeError,
    RuntimeError,
    RecursionError,
    NotImplementedError,
    AssertionError,
    StopIteration,
    ImportError,
    ModuleNotFoundError,
    MemoryError,
    EOFError,
}

impl ExceptionKind {
    pub const ALL: [ExceptionKind; 22] = [
        ExceptionKind::BaseException,
        ExceptionKind::Exception,
        ExceptionKind::ArithmeticError,
        ExceptionKind::ZeroDivisionError,
        ExceptionKind::OverflowError,
        ExceptionKind::LookupError,
        ExceptionKind::IndexError,
        ExceptionKind::KeyError,
        ExceptionKind::NameError,
        ExceptionKind::UnboundLocalError,
        ExceptionKind::TypeError,
        ExceptionKind::ValueError,
        ExceptionKind::AttributeError,
        ExceptionKind::RuntimeError,
        ExceptionKind::RecursionError,
        ExceptionKind::NotImplementedError,
        ExceptionKind::AssertionError,
        ExceptionKind::StopIteration,
        ExceptionKind::ImportError,
        ExceptionKind::ModuleNotFoundError,
        ExceptionKind::MemoryError,
        ExceptionKind::EOFError,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ExceptionKind::BaseException => "BaseException",
            ExceptionKind::Exception => "Exception",
            ExceptionKind::ArithmeticError => "ArithmeticError",
            ExceptionKind::ZeroDivisionError => "ZeroDivisionError",
            ExceptionKind::OverflowError => "OverflowError",
            ExceptionKind::LookupError => "LookupError",
            ExceptionKind::IndexError => "IndexError",
            ExceptionKind::KeyError => "KeyError",
            ExceptionKind::NameError => "NameError",
            ExceptionKind::UnboundLocalError => "UnboundLocalError",
            ExceptionKind::TypeError => "TypeError",
            ExceptionKind::ValueError => "ValueError",
            ExceptionKind::AttributeError => "AttributeError",
            ExceptionKind::RuntimeError => "RuntimeError",
            ExceptionKind::RecursionError => "RecursionError",
            ExceptionKind::NotImplementedError => "NotImplementedError",
            ExceptionKind::AssertionError => "AssertionError",
            ExceptionKind::StopIteration => "StopIteration",
            ExceptionKind::ImportError => "ImportError",
            ExceptionKind::ModuleNotFoundError => "ModuleNotFoundError",
            ExceptionKind::MemoryError => "MemoryError",
            ExceptionKind::EOFError => "EOFError",
        }
    }

    pub fn parent(self) -> Option<ExceptionKind> {
        use ExceptionKind::*;
        match self {
            BaseException => None,
            Exception => Some(BaseException),
            ArithmeticError | LookupError | NameError | TypeError | ValueError
            | AttributeError | RuntimeError | AssertionError | StopIteration | ImportError
            | MemoryError | EOFError => Some(Exception),
            ZeroDivisionError | OverflowError => Some(ArithmeticError),
            IndexError | KeyError => Some(LookupError),
            UnboundLocalError => Some(NameError),
            RecursionError | NotImplementedError => Some(RuntimeError),
            ModuleNotFoundError => Some(ImportError),
        }
    }

    pub fn is_subclass_of(self, other: ExceptionKind) -> bool {
        let mut current = Some(self);
        while let Some(kind) = current {
            if kind == other {
                return true;
            }
            current = kind.parent();
        }
        false
    }

    pub fn from_name(name: &str) -> Option<ExceptionKind> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }
}

/// One frame an exception propagated through
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracebackEntry {
    pub function: Rc<str>,
    pub line: usize,
    pub origin: CodeOrigin,
}

/// An exception propagating through the interpreter
#[derive(Debug, Clone)]
pub struct PyException {
    pub value: Rc<ExceptionObject>,
    /// Frames passed through so far, innermost first
    pub traceback: Vec<TracebackEntry>,
    /// Call depth of the frame that last reported this exception
    pub(crate) reported_depth: Option<usize>,
}

impl PyException {
    pub fn new(value: Rc<ExceptionObject>) -> Self {
        PyException {
            value,
            traceback: Vec::new(),
            reported_depth: None,
        }
    }

    pub fn type_name(&self) -> String {
        self.value.type_name()
    }

    pub fn message(&self) -> String {
        self.value.message()
    }

    pub fn kind(&self) -> ExceptionKind {
        self.value.kind
    }

    /// Line of the innermost traceback entry that belongs to submitted code
    pub fn submitted_line(&self) -> Option<usize> {
        self.traceback
            .iter()
            .find(|entry| entry.origin == CodeOrigin::Submitted)
            .map(|entry| entry.line)
    }

    /// `Kind: message` (or just `Kind` when the message is empty)
    pub fn summary(&self) -> String {
        let message = self.message();
        if message.is_empty() {
            self.type_name()
        } else {
            format!("{}: {}", self.type_name(), message)
        }
    }
}

/// Why the interpreter stopped without finishing the program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// The instrumentation hook asked to stop
    HookStopped,
    /// The external abort signal fired
    Aborted,
}

/// Non-local exits from statement and expression evaluation
#[derive(Debug, Clone)]
pub enum Flow {
    Return(Value),
    Break,
    Continue,
    Raise(Box<PyException>),
    Halt(HaltReason),
}

pub type ExecResult<T> = Result<T, Flow>;

/// Build a raise of a built-in exception with a message
pub fn raise(kind: ExceptionKind, message: impl Into<String>) -> Flow {
    Flow::Raise(Box::new(PyException::new(Rc::new(
        ExceptionObject::with_message(kind, message),
    ))))
}

pub fn type_error(message: impl Into<String>) -> Flow {
    raise(ExceptionKind::TypeError, message)
}

pub fn value_error(message: impl Into<String>) -> Flow {
    raise(ExceptionKind::ValueError, message)
}

pub fn index_error(message: impl Into<String>) -> Flow {
    raise(ExceptionKind::IndexError, message)
}

pub fn zero_division(message: impl Into<String>) -> Flow {
    raise(ExceptionKind::ZeroDivisionError, message)
}

pub fn overflow_error(message: impl Into<String>) -> Flow {
    raise(ExceptionKind::OverflowError, message)
}

pub fn attribute_error(type_name: &str, attr: &str) -> Flow {
    raise(
        ExceptionKind::AttributeError,
        format!("'{}' object has no attribute '{}'", type_name, attr),
    )
}

pub fn key_error(key: Value) -> Flow {
    Flow::Raise(Box::new(PyException::new(Rc::new(ExceptionObject::new(
        ExceptionKind::KeyError,
        vec![key],
    )))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hierarchy() {
        assert!(ExceptionKind::IndexError.is_subclass_of(ExceptionKind::LookupError));
        assert!(ExceptionKind::ZeroDivisionError.is_subclass_of(ExceptionKind::Exception));
        assert!(!ExceptionKind::KeyError.is_subclass_of(ExceptionKind::IndexError));
        assert!(ExceptionKind::Exception.is_subclass_of(ExceptionKind::BaseException));
    }

    #[test]
    fn test_every_kind_round_trips_by_name() {
        for kind in ExceptionKind::ALL {
            assert_eq!(ExceptionKind::from_name(kind.name()), Some(kind));
        }
    }

    #[test]
    fn test_key_error_message_is_repr_of_key() {
        match key_error(Value::str("missing")) {
            Flow::Raise(exc) => {
                assert_eq!(exc.message(), "'missing'");
                assert_eq!(exc.summary(), "KeyError: 'missing'");
            }
            _ => panic!("Expected raise"),
        }
    }

    #[test]
    fn test_submitted_line_skips_prelude_frames() {
        let mut exc = PyException::new(Rc::new(ExceptionObject::with_message(
            ExceptionKind::TypeError,
            "bad",
        )));
        exc.traceback.push(TracebackEntry {
            function: Rc::from("map"),
            line: 4,
            origin: CodeOrigin::Prelude,
        });
        exc.traceback.push(TracebackEntry {
            function: Rc::from("<module>"),
            line: 2,
            origin: CodeOrigin::Submitted,
        });
        assert_eq!(exc.submitted_line(), Some(2));
    }
}
