//! Runtime value representation
//!
//! This module defines the [`Value`] enum, which represents all possible runtime values
//! of the traced Python subset. Mutable containers are shared through `Rc<RefCell<..>>`
//! so aliasing behaves like Python references (`b = a; b.append(1)` changes `a`).
//!
//! # Value Types
//!
//! - Scalars: [`Value::None`], [`Value::Bool`], [`Value::Int`] (64-bit), [`Value::Float`]
//! - Text: [`Value::Str`] (immutable, shared)
//! - Containers: [`Value::List`], [`Value::Tuple`], [`Value::Dict`], [`Value::Set`], [`Value::Range`]
//! - Callables: [`Value::Function`], [`Value::Builtin`], [`Value::BoundMethod`], [`Value::Class`]
//! - Objects: [`Value::Instance`], [`Value::ExceptionType`], [`Value::Exception`], [`Value::Module`]
//!
//! # Hashing
//!
//! Dict keys and set members are stored under a [`HashKey`], a hashable projection
//! in which `True == 1 == 1.0` the same way Python's numeric tower compares. Dicts keep
//! the original key value next to the entry so iteration yields what was inserted.

use super::stack::Scope;
use crate::interpreter::builtins::BuiltinFunction;
use crate::interpreter::errors::ExceptionKind;
use crate::parser::ast::{CodeOrigin, FunctionDef};
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;
use std::sync::Arc;

/// Attribute namespace of classes, instances and exceptions
pub type AttrMap = IndexMap<String, Value, FxBuildHasher>;

/// Dict storage: hash key -> (original key, value), in insertion order
pub type DictMap = IndexMap<HashKey, (Value, Value), FxBuildHasher>;

/// Set storage: hash key -> original member, in insertion order
pub type SetMap = IndexMap<HashKey, Value, FxBuildHasher>;

/// Runtime values in the interpreter
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(Rc<RefCell<Vec<Value>>>),
    Tuple(Rc<[Value]>),
    Dict(Rc<RefCell<DictMap>>),
    Set(Rc<RefCell<SetMap>>),
    Range(RangeValue),
    Function(Rc<Function>),
    Builtin(BuiltinFunction),
    BoundMethod(Rc<BoundMethod>),
    Class(Rc<ClassObject>),
    Instance(Rc<Instance>),
    ExceptionType(ExceptionKind),
    Exception(Rc<ExceptionObject>),
    Module(Rc<Module>),
    /// Type objects with no constructor of their own (`type(None)`, `type(len)`, ...)
    OtherType(&'static str),
}

/// `range(start, stop, step)`; `step` is never zero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeValue {
    pub start: i64,
    pub stop: i64,
    pub step: i64,
}

impl RangeValue {
    pub fn len(&self) -> usize {
        let (start, stop, step) = (self.start as i128, self.stop as i128, self.step as i128);
        let len = if step > 0 && start < stop {
            (stop - start + step - 1) / step
        } else if step < 0 && start > stop {
            (start - stop - step - 1) / (-step)
        } else {
            0
        };
        usize::try_from(len).unwrap_or(usize::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at a non-negative position
    pub fn get(&self, index: usize) -> Option<i64> {
        if index >= self.len() {
            return None;
        }
        let value = self.start as i128 + index as i128 * self.step as i128;
        i64::try_from(value).ok()
    }

    pub fn contains(&self, n: i64) -> bool {
        let offset = n as i128 - self.start as i128;
        let step = self.step as i128;
        let in_bounds = if step > 0 {
            n >= self.start && n < self.stop
        } else {
            n <= self.start && n > self.stop
        };
        in_bounds && offset % step == 0
    }
}

/// A user-defined function or lambda
#[derive(Debug)]
pub struct Function {
    pub def: Arc<FunctionDef>,
    /// Evaluated defaults, aligned with the trailing parameters that have one
    pub defaults: Vec<Value>,
    pub globals: Scope,
    /// Namespace of the enclosing function, if any
    pub closure: Option<Scope>,
    pub origin: CodeOrigin,
    /// Owning class name for methods, used in reprs
    pub class_name: RefCell<Option<String>>,
}

impl Function {
    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn qualified_name(&self) -> String {
        match self.class_name.borrow().as_deref() {
            Some(class) => format!("{}.{}", class, self.def.name),
            None => self.def.name.clone(),
        }
    }
}

/// A method bound to its receiver
#[derive(Debug)]
pub struct BoundMethod {
    pub receiver: Value,
    pub method: Method,
}

#[derive(Debug, Clone)]
pub enum Method {
    /// A `def` found on the receiver's class
    Function(Rc<Function>),
    /// A native method of a built-in type (`list.append`, `str.split`, ...)
    Native(&'static str),
}

/// Base of a user class
#[derive(Debug, Clone)]
pub enum ClassBase {
    Object,
    Class(Rc<ClassObject>),
    Exception(ExceptionKind),
}

#[derive(Debug)]
pub struct ClassObject {
    pub name: String,
    pub base: ClassBase,
    pub attrs: RefCell<AttrMap>,
}

impl ClassObject {
    /// Look up an attribute along the base chain
    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.attrs.borrow().get(name) {
            return Some(value.clone());
        }
        match &self.base {
            ClassBase::Class(base) => base.lookup(name),
            _ => None,
        }
    }

    /// The built-in exception this class ultimately derives from
    pub fn exception_kind(&self) -> Option<ExceptionKind> {
        match &self.base {
            ClassBase::Object => None,
            ClassBase::Class(base) => base.exception_kind(),
            ClassBase::Exception(kind) => Some(*kind),
        }
    }

    pub fn is_subclass_of(self: &Rc<Self>, other: &Rc<ClassObject>) -> bool {
        if Rc::ptr_eq(self, other) {
            return true;
        }
        match &self.base {
            ClassBase::Class(base) => base.is_subclass_of(other),
            _ => false,
        }
    }
}

#[derive(Debug)]
pub struct Instance {
    pub class: Rc<ClassObject>,
    pub attrs: RefCell<AttrMap>,
}

/// A raised or raisable exception value
#[derive(Debug)]
pub struct ExceptionObject {
    pub kind: ExceptionKind,
    /// Set when the exception is an instance of a user subclass
    pub class: Option<Rc<ClassObject>>,
    pub args: Vec<Value>,
    pub attrs: RefCell<AttrMap>,
}

impl ExceptionObject {
    pub fn new(kind: ExceptionKind, args: Vec<Value>) -> Self {
        ExceptionObject {
            kind,
            class: None,
            args,
            attrs: RefCell::new(AttrMap::default()),
        }
    }

    pub fn with_message(kind: ExceptionKind, message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self::new(kind, vec![Value::str(message)])
    }

    pub fn type_name(&self) -> String {
        match &self.class {
            Some(class) => class.name.clone(),
            None => self.kind.name().to_string(),
        }
    }

    /// `str(exc)`: empty, the single argument, or the argument tuple
    pub fn message(&self) -> String {
        match self.args.as_slice() {
            [] => String::new(),
            [single] if self.kind == ExceptionKind::KeyError && self.class.is_none() => {
                single.repr()
            }
            [single] => single.to_str(),
            many => Value::Tuple(Rc::from(many.to_vec())).repr(),
        }
    }
}

/// An imported module (only built-in modules exist)
#[derive(Debug)]
pub struct Module {
    pub name: String,
    pub attrs: AttrMap,
}

/// Hashable projection of a value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HashKey {
    None,
    Int(i64),
    Float(u64),
    Str(Rc<str>),
    Tuple(Rc<[HashKey]>),
    Range(i64, i64, i64),
    Builtin(&'static str),
    ExceptionType(ExceptionKind),
    Identity(usize),
}

impl Value {
    pub fn str(text: impl Into<Rc<str>>) -> Value {
        Value::Str(text.into())
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn tuple(items: Vec<Value>) -> Value {
        Value::Tuple(Rc::from(items))
    }

    pub fn dict(map: DictMap) -> Value {
        Value::Dict(Rc::new(RefCell::new(map)))
    }

    pub fn set(map: SetMap) -> Value {
        Value::Set(Rc::new(RefCell::new(map)))
    }

    /// The Python type name used in error messages and opaque markers
    pub fn type_name(&self) -> String {
        match self {
            Value::None => "NoneType".to_string(),
            Value::Bool(_) => "bool".to_string(),
            Value::Int(_) => "int".to_string(),
            Value::Float(_) => "float".to_string(),
            Value::Str(_) => "str".to_string(),
            Value::List(_) => "list".to_string(),
            Value::Tuple(_) => "tuple".to_string(),
            Value::Dict(_) => "dict".to_string(),
            Value::Set(_) => "set".to_string(),
            Value::Range(_) => "range".to_string(),
            Value::Function(_) => "function".to_string(),
            Value::Builtin(b) if b.is_type() => "type".to_string(),
            Value::Builtin(_) => "builtin_function_or_method".to_string(),
            Value::BoundMethod(m) => match m.method {
                Method::Function(_) => "method".to_string(),
                Method::Native(_) => "builtin_function_or_method".to_string(),
            },
            Value::Class(_) | Value::ExceptionType(_) | Value::OtherType(_) => "type".to_string(),
            Value::Instance(inst) => inst.class.name.clone(),
            Value::Exception(exc) => exc.type_name(),
            Value::Module(_) => "module".to_string(),
        }
    }

    /// Native truthiness; user classes are always truthy
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(x) => *x != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => items.try_borrow().map_or(true, |v| !v.is_empty()),
            Value::Tuple(items) => !items.is_empty(),
            Value::Dict(map) => map.try_borrow().map_or(true, |m| !m.is_empty()),
            Value::Set(set) => set.try_borrow().map_or(true, |s| !s.is_empty()),
            Value::Range(r) => !r.is_empty(),
            _ => true,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            Value::Int(n) => Some(*n as f64),
            Value::Bool(b) => Some(*b as i64 as f64),
            _ => None,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_) | Value::Bool(_))
    }

    pub fn is_iterable(&self) -> bool {
        matches!(
            self,
            Value::Str(_)
                | Value::List(_)
                | Value::Tuple(_)
                | Value::Dict(_)
                | Value::Set(_)
                | Value::Range(_)
        )
    }

    /// Hash key for dict/set membership, or the type name when unhashable
    pub fn hash_key(&self) -> Result<HashKey, String> {
        Ok(match self {
            Value::None => HashKey::None,
            Value::Bool(b) => HashKey::Int(*b as i64),
            Value::Int(n) => HashKey::Int(*n),
            Value::Float(x) => {
                if x.fract() == 0.0 && *x >= i64::MIN as f64 && *x < i64::MAX as f64 {
                    HashKey::Int(*x as i64)
                } else {
                    HashKey::Float(x.to_bits())
                }
            }
            Value::Str(s) => HashKey::Str(s.clone()),
            Value::Tuple(items) => HashKey::Tuple(
                items
                    .iter()
                    .map(Value::hash_key)
                    .collect::<Result<Vec<_>, _>>()?
                    .into(),
            ),
            Value::Range(r) => HashKey::Range(r.start, r.stop, r.step),
            Value::Builtin(b) => HashKey::Builtin(b.name()),
            Value::OtherType(name) => HashKey::Builtin(name),
            Value::ExceptionType(kind) => HashKey::ExceptionType(*kind),
            Value::Function(f) => HashKey::Identity(Rc::as_ptr(f) as *const () as usize),
            Value::BoundMethod(m) => HashKey::Identity(Rc::as_ptr(m) as *const () as usize),
            Value::Class(c) => HashKey::Identity(Rc::as_ptr(c) as *const () as usize),
            Value::Instance(i) => HashKey::Identity(Rc::as_ptr(i) as *const () as usize),
            Value::Exception(e) => HashKey::Identity(Rc::as_ptr(e) as *const () as usize),
            Value::Module(m) => HashKey::Identity(Rc::as_ptr(m) as *const () as usize),
            Value::List(_) | Value::Dict(_) | Value::Set(_) => return Err(self.type_name()),
        })
    }

    /// `is`: identity for shared objects, value identity for immutable scalars
    pub fn is_same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => Rc::ptr_eq(a, b) || (a.len() <= 1 && a == b),
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Tuple(a), Value::Tuple(b)) => Rc::ptr_eq(a, b) || (a.is_empty() && b.is_empty()),
            (Value::Dict(a), Value::Dict(b)) => Rc::ptr_eq(a, b),
            (Value::Set(a), Value::Set(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::BoundMethod(a), Value::BoundMethod(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::Exception(a), Value::Exception(b)) => Rc::ptr_eq(a, b),
            (Value::Module(a), Value::Module(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            (Value::ExceptionType(a), Value::ExceptionType(b)) => a == b,
            (Value::OtherType(a), Value::OtherType(b)) => a == b,
            (Value::Range(a), Value::Range(b)) => a == b,
            _ => false,
        }
    }

    /// Structural `==` for built-in types; objects compare by identity
    pub fn py_eq(&self, other: &Value) -> bool {
        if self.is_same(other) {
            return !matches!(self, Value::Float(x) if x.is_nan());
        }
        match (self, other) {
            (a, b) if a.is_number() && b.is_number() => match (a, b) {
                (Value::Float(_), _) | (_, Value::Float(_)) => a.as_float() == b.as_float(),
                _ => a.as_int() == b.as_int(),
            },
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => match (a.try_borrow(), b.try_borrow()) {
                (Ok(a), Ok(b)) => sequences_equal(&a, &b),
                _ => false,
            },
            (Value::Tuple(a), Value::Tuple(b)) => sequences_equal(a, b),
            (Value::Dict(a), Value::Dict(b)) => match (a.try_borrow(), b.try_borrow()) {
                (Ok(a), Ok(b)) => {
                    a.len() == b.len()
                        && a.iter().all(|(key, (_, value))| {
                            b.get(key).is_some_and(|(_, other)| value.py_eq(other))
                        })
                }
                _ => false,
            },
            (Value::Set(a), Value::Set(b)) => match (a.try_borrow(), b.try_borrow()) {
                (Ok(a), Ok(b)) => a.len() == b.len() && a.keys().all(|k| b.contains_key(k)),
                _ => false,
            },
            (Value::Range(a), Value::Range(b)) => {
                let (la, lb) = (a.len(), b.len());
                la == lb && (la == 0 || (a.start == b.start && (la == 1 || a.step == b.step)))
            }
            _ => false,
        }
    }

    /// `str(value)` without user `__str__` methods
    pub fn to_str(&self) -> String {
        match self {
            Value::Str(s) => s.to_string(),
            Value::Exception(exc) => exc.message(),
            _ => self.repr(),
        }
    }

    /// `repr(value)` without user `__repr__` methods
    pub fn repr(&self) -> String {
        match self.repr_with::<Infallible>(&mut |v| Ok(v.repr())) {
            Ok(text) => text,
            Err(never) => match never {},
        }
    }

    /// Render one layer of `repr`, delegating container elements to `element`.
    ///
    /// Containers that are already being rendered further up the call chain
    /// render as `[...]` / `{...}`, so self-referencing structures terminate.
    pub fn repr_with<E>(
        &self,
        element: &mut dyn FnMut(&Value) -> Result<String, E>,
    ) -> Result<String, E> {
        let identity = match self {
            Value::List(items) => Some(Rc::as_ptr(items) as *const () as usize),
            Value::Dict(map) => Some(Rc::as_ptr(map) as *const () as usize),
            Value::Set(set) => Some(Rc::as_ptr(set) as *const () as usize),
            _ => None,
        };
        let _guard = match identity {
            Some(id) => match ReprGuard::enter(id) {
                Some(guard) => Some(guard),
                None => {
                    return Ok(match self {
                        Value::List(_) => "[...]".to_string(),
                        _ => "{...}".to_string(),
                    })
                }
            },
            None => None,
        };

        Ok(match self {
            Value::None => "None".to_string(),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(x) => format_float(*x),
            Value::Str(s) => quote_str(s),
            Value::List(items) => {
                let items = items.borrow().clone();
                format!("[{}]", join_with(&items, element)?)
            }
            Value::Tuple(items) => {
                if items.len() == 1 {
                    format!("({},)", element(&items[0])?)
                } else {
                    format!("({})", join_with(items, element)?)
                }
            }
            Value::Dict(map) => {
                let entries: Vec<(Value, Value)> = map.borrow().values().cloned().collect();
                let mut parts = Vec::with_capacity(entries.len());
                for (key, value) in &entries {
                    parts.push(format!("{}: {}", element(key)?, element(value)?));
                }
                format!("{{{}}}", parts.join(", "))
            }
            Value::Set(set) => {
                let members: Vec<Value> = set.borrow().values().cloned().collect();
                if members.is_empty() {
                    "set()".to_string()
                } else {
                    format!("{{{}}}", join_with(&members, element)?)
                }
            }
            Value::Range(r) => {
                if r.step == 1 {
                    format!("range({}, {})", r.start, r.stop)
                } else {
                    format!("range({}, {}, {})", r.start, r.stop, r.step)
                }
            }
            Value::Function(f) => format!(
                "<function {} at {:#x}>",
                f.qualified_name(),
                Rc::as_ptr(f) as *const () as usize
            ),
            Value::Builtin(b) if b.is_type() => format!("<class '{}'>", b.name()),
            Value::Builtin(b) => format!("<built-in function {}>", b.name()),
            Value::BoundMethod(m) => match &m.method {
                Method::Function(f) => format!(
                    "<bound method {} of {}>",
                    f.qualified_name(),
                    element(&m.receiver)?
                ),
                Method::Native(name) => format!(
                    "<built-in method {} of {} object>",
                    name,
                    m.receiver.type_name()
                ),
            },
            Value::Class(c) => format!("<class '__main__.{}'>", c.name),
            Value::Instance(inst) => format!(
                "<__main__.{} object at {:#x}>",
                inst.class.name,
                Rc::as_ptr(inst) as *const () as usize
            ),
            Value::ExceptionType(kind) => format!("<class '{}'>", kind.name()),
            Value::Exception(exc) => {
                let args = if exc.args.len() == 1 {
                    element(&exc.args[0])?
                } else {
                    join_with(&exc.args, element)?
                };
                format!("{}({})", exc.type_name(), args)
            }
            Value::Module(m) => format!("<module '{}' (built-in)>", m.name),
            Value::OtherType(name) => format!("<class '{}'>", name),
        })
    }
}

fn sequences_equal(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.py_eq(y))
}

fn join_with<E>(
    items: &[Value],
    element: &mut dyn FnMut(&Value) -> Result<String, E>,
) -> Result<String, E> {
    let mut parts = Vec::with_capacity(items.len());
    for item in items {
        parts.push(element(item)?);
    }
    Ok(parts.join(", "))
}

thread_local! {
    static REPR_ACTIVE: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Marks a container as being rendered for the lifetime of the guard
struct ReprGuard(usize);

impl ReprGuard {
    fn enter(id: usize) -> Option<ReprGuard> {
        REPR_ACTIVE.with(|active| {
            let mut active = active.borrow_mut();
            if active.contains(&id) {
                None
            } else {
                active.push(id);
                Some(ReprGuard(id))
            }
        })
    }
}

impl Drop for ReprGuard {
    fn drop(&mut self) {
        REPR_ACTIVE.with(|active| {
            let mut active = active.borrow_mut();
            if let Some(pos) = active.iter().rposition(|&id| id == self.0) {
                active.remove(pos);
            }
        });
    }
}

/// Python's float repr: shortest round-trip digits, scientific outside 1e-4..1e16
pub fn format_float(x: f64) -> String {
    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if x == 0.0 {
        return if x.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }

    let sci = format!("{:e}", x);
    let (mantissa, exponent) = match sci.split_once('e') {
        Some((mantissa, exp)) => (mantissa.to_string(), exp.parse::<i32>().unwrap_or(0)),
        None => (sci.clone(), 0),
    };
    if (-4..16).contains(&exponent) {
        let text = format!("{}", x);
        if text.contains('.') {
            text
        } else {
            format!("{}.0", text)
        }
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exponent.abs())
    }
}

/// Python string repr with its quote selection rule
pub fn quote_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_repr_matches_python() {
        assert_eq!(format_float(1.0), "1.0");
        assert_eq!(format_float(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_float(1e16), "1e+16");
        assert_eq!(format_float(1.5e-7), "1.5e-07");
        assert_eq!(format_float(0.0001), "0.0001");
        assert_eq!(format_float(-2.5), "-2.5");
    }

    #[test]
    fn test_str_repr_quoting() {
        assert_eq!(quote_str("abc"), "'abc'");
        assert_eq!(quote_str("it's"), "\"it's\"");
        assert_eq!(quote_str("a\nb"), "'a\\nb'");
    }

    #[test]
    fn test_container_repr() {
        let list = Value::list(vec![Value::Int(1), Value::str("a"), Value::None]);
        assert_eq!(list.repr(), "[1, 'a', None]");
        assert_eq!(Value::tuple(vec![Value::Int(1)]).repr(), "(1,)");
        assert_eq!(Value::set(SetMap::default()).repr(), "set()");
    }

    #[test]
    fn test_self_referencing_list_repr_terminates() {
        let list = Value::list(vec![Value::Int(1)]);
        if let Value::List(items) = &list {
            items.borrow_mut().push(list.clone());
        }
        assert_eq!(list.repr(), "[1, [...]]");
    }

    #[test]
    fn test_numeric_keys_unify() {
        assert_eq!(Value::Bool(true).hash_key(), Value::Int(1).hash_key());
        assert_eq!(Value::Float(2.0).hash_key(), Value::Int(2).hash_key());
        assert!(Value::list(vec![]).hash_key().is_err());
    }

    #[test]
    fn test_range_len_and_contains() {
        let r = RangeValue {
            start: 10,
            stop: 0,
            step: -3,
        };
        assert_eq!(r.len(), 4);
        assert_eq!(r.get(3), Some(1));
        assert!(r.contains(4));
        assert!(!r.contains(5));
    }

    #[test]
    fn test_numeric_equality_across_types() {
        assert!(Value::Int(1).py_eq(&Value::Float(1.0)));
        assert!(Value::Bool(true).py_eq(&Value::Int(1)));
        assert!(!Value::Float(f64::NAN).py_eq(&Value::Float(f64::NAN)));
    }
}
