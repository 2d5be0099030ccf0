//! Built-in function implementations
//!
//! This module provides the built-in functions that are handled natively by
//! the interpreter rather than being defined in the prelude.
//!
//! # Supported Built-ins
//!
//! - Output: `print(*args, sep=' ', end='\n')`, `input()` (always `EOFError`)
//! - Constructors: `int`, `float`, `str`, `bool`, `list`, `tuple`, `dict`, `set`, `range`
//! - Sequences: `len`, `min`, `max`, `sum`, `sorted`, `enumerate`, `zip`
//! - Numbers: `abs`, `round`, `divmod`, `pow`, `chr`, `ord`, `hex`, `bin`, `oct`
//! - Introspection: `repr`, `type`, `isinstance`
//! - The `math` module functions
//!
//! # Implementation Notes
//!
//! - `enumerate` and `zip` return lists; lazy iterators are not modelled
//! - All built-ins are implemented as methods on the [`Interpreter`] struct

use super::engine::Interpreter;
use super::errors::{
    overflow_error, raise, type_error, value_error, ExceptionKind, ExecResult,
};
use super::ops;
use crate::memory::value::{AttrMap, ClassBase, DictMap, Module, RangeValue, SetMap, Value};
use crate::parser::ast::BinOp;
use std::cmp::Ordering;
use std::rc::Rc;

/// Functions and type objects implemented in Rust
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinFunction {
    Print,
    Input,
    Len,
    Range,
    Str,
    Repr,
    Int,
    Float,
    Bool,
    List,
    Tuple,
    Dict,
    Set,
    Abs,
    Min,
    Max,
    Sum,
    Sorted,
    Enumerate,
    Zip,
    Round,
    Type,
    Isinstance,
    Chr,
    Ord,
    Divmod,
    Pow,
    Hex,
    Bin,
    Oct,
    MathSqrt,
    MathFloor,
    MathCeil,
    MathGcd,
    MathLog,
    MathFabs,
    MathIsqrt,
    MathFactorial,
}

impl BuiltinFunction {
    /// Built-ins bound in every program's builtins namespace
    pub const GLOBALS: [BuiltinFunction; 30] = [
        BuiltinFunction::Print,
        BuiltinFunction::Input,
        BuiltinFunction::Len,
        BuiltinFunction::Range,
        BuiltinFunction::Str,
        BuiltinFunction::Repr,
        BuiltinFunction::Int,
        BuiltinFunction::Float,
        BuiltinFunction::Bool,
        BuiltinFunction::List,
        BuiltinFunction::Tuple,
        BuiltinFunction::Dict,
        BuiltinFunction::Set,
        BuiltinFunction::Abs,
        BuiltinFunction::Min,
        BuiltinFunction::Max,
        BuiltinFunction::Sum,
        BuiltinFunction::Sorted,
        BuiltinFunction::Enumerate,
        BuiltinFunction::Zip,
        BuiltinFunction::Round,
        BuiltinFunction::Type,
        BuiltinFunction::Isinstance,
        BuiltinFunction::Chr,
        BuiltinFunction::Ord,
        BuiltinFunction::Divmod,
        BuiltinFunction::Pow,
        BuiltinFunction::Hex,
        BuiltinFunction::Bin,
        BuiltinFunction::Oct,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BuiltinFunction::Print => "print",
            BuiltinFunction::Input => "input",
            BuiltinFunction::Len => "len",
            BuiltinFunction::Range => "range",
            BuiltinFunction::Str => "str",
            BuiltinFunction::Repr => "repr",
            BuiltinFunction::Int => "int",
            BuiltinFunction::Float => "float",
            BuiltinFunction::Bool => "bool",
            BuiltinFunction::List => "list",
            BuiltinFunction::Tuple => "tuple",
            BuiltinFunction::Dict => "dict",
            BuiltinFunction::Set => "set",
            BuiltinFunction::Abs => "abs",
            BuiltinFunction::Min => "min",
            BuiltinFunction::Max => "max",
            BuiltinFunction::Sum => "sum",
            BuiltinFunction::Sorted => "sorted",
            BuiltinFunction::Enumerate => "enumerate",
            BuiltinFunction::Zip => "zip",
            BuiltinFunction::Round => "round",
            BuiltinFunction::Type => "type",
            BuiltinFunction::Isinstance => "isinstance",
            BuiltinFunction::Chr => "chr",
            BuiltinFunction::Ord => "ord",
            BuiltinFunction::Divmod => "divmod",
            BuiltinFunction::Pow => "pow",
            BuiltinFunction::Hex => "hex",
            BuiltinFunction::Bin => "bin",
            BuiltinFunction::Oct => "oct",
            BuiltinFunction::MathSqrt => "sqrt",
            BuiltinFunction::MathFloor => "floor",
            BuiltinFunction::MathCeil => "ceil",
            BuiltinFunction::MathGcd => "gcd",
            BuiltinFunction::MathLog => "log",
            BuiltinFunction::MathFabs => "fabs",
            BuiltinFunction::MathIsqrt => "isqrt",
            BuiltinFunction::MathFactorial => "factorial",
        }
    }

    /// Whether this built-in is a type object (`int`, `list`, ...)
    pub fn is_type(self) -> bool {
        matches!(
            self,
            BuiltinFunction::Str
                | BuiltinFunction::Int
                | BuiltinFunction::Float
                | BuiltinFunction::Bool
                | BuiltinFunction::List
                | BuiltinFunction::Tuple
                | BuiltinFunction::Dict
                | BuiltinFunction::Set
                | BuiltinFunction::Range
        )
    }
}

/// The `math` module
pub fn math_module() -> Value {
    let mut attrs = AttrMap::default();
    for function in [
        BuiltinFunction::MathSqrt,
        BuiltinFunction::MathFloor,
        BuiltinFunction::MathCeil,
        BuiltinFunction::MathGcd,
        BuiltinFunction::MathLog,
        BuiltinFunction::MathFabs,
        BuiltinFunction::MathIsqrt,
        BuiltinFunction::MathFactorial,
    ] {
        attrs.insert(function.name().to_string(), Value::Builtin(function));
    }
    attrs.insert("pi".to_string(), Value::Float(std::f64::consts::PI));
    attrs.insert("e".to_string(), Value::Float(std::f64::consts::E));
    attrs.insert("tau".to_string(), Value::Float(std::f64::consts::TAU));
    attrs.insert("inf".to_string(), Value::Float(f64::INFINITY));
    attrs.insert("nan".to_string(), Value::Float(f64::NAN));
    Value::Module(Rc::new(Module {
        name: "math".to_string(),
        attrs,
    }))
}

/// Keyword arguments of a native call, consumed by name
pub(crate) struct KeywordArgs {
    function: &'static str,
    entries: Vec<(String, Value)>,
}

impl KeywordArgs {
    pub(crate) fn new(function: &'static str, entries: Vec<(String, Value)>) -> Self {
        KeywordArgs { function, entries }
    }

    pub(crate) fn take(&mut self, name: &str) -> Option<Value> {
        let pos = self.entries.iter().position(|(key, _)| key == name)?;
        Some(self.entries.remove(pos).1)
    }

    /// Hand over every remaining keyword
    pub(crate) fn take_all(&mut self) -> Vec<(String, Value)> {
        std::mem::take(&mut self.entries)
    }

    /// Fail on any keyword nobody asked for
    pub(crate) fn finish(self) -> ExecResult<()> {
        match self.entries.first() {
            None => Ok(()),
            Some((key, _)) => Err(type_error(format!(
                "'{}' is an invalid keyword argument for {}()",
                key, self.function
            ))),
        }
    }
}

/// Check a native call's positional argument count
pub(crate) fn expect_args(
    function: &str,
    args: &[Value],
    min: usize,
    max: usize,
) -> ExecResult<()> {
    let given = args.len();
    if given >= min && given <= max {
        return Ok(());
    }
    if min == 1 && max == 1 {
        return Err(type_error(format!(
            "{}() takes exactly one argument ({} given)",
            function, given
        )));
    }
    if min == max {
        return Err(type_error(format!(
            "{}() takes exactly {} arguments ({} given)",
            function, min, given
        )));
    }
    if given < min {
        Err(type_error(format!(
            "{} expected at least {} argument{}, got {}",
            function,
            min,
            if min == 1 { "" } else { "s" },
            given
        )))
    } else {
        Err(type_error(format!(
            "{} expected at most {} argument{}, got {}",
            function,
            max,
            if max == 1 { "" } else { "s" },
            given
        )))
    }
}

/// An argument used as an integer (`range`, `chr`, repetition counts)
pub(crate) fn index_arg(value: &Value) -> ExecResult<i64> {
    value.as_int().ok_or_else(|| {
        type_error(format!(
            "'{}' object cannot be interpreted as an integer",
            value.type_name()
        ))
    })
}

fn number_arg(value: &Value) -> ExecResult<f64> {
    value
        .as_float()
        .ok_or_else(|| type_error(format!("must be real number, not {}", value.type_name())))
}

/// Float to int the way `int()` truncates
pub(crate) fn float_to_int(x: f64) -> ExecResult<i64> {
    if x.is_nan() {
        return Err(value_error("cannot convert float NaN to integer"));
    }
    if x.is_infinite() {
        return Err(overflow_error("cannot convert float infinity to integer"));
    }
    let truncated = x.trunc();
    if truncated < i64::MIN as f64 || truncated >= i64::MAX as f64 {
        return Err(overflow_error("int too large to convert to 64-bit integer"));
    }
    Ok(truncated as i64)
}

/// `int(text, base)`
pub(crate) fn parse_int(text: &str, base: u32) -> Option<i64> {
    let trimmed = text.trim();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits = match base {
        16 => strip_radix_prefix(digits, "0x"),
        8 => strip_radix_prefix(digits, "0o"),
        2 => strip_radix_prefix(digits, "0b"),
        _ => digits,
    };
    if digits.is_empty()
        || digits.starts_with('_')
        || digits.ends_with('_')
        || digits.contains("__")
    {
        return None;
    }
    let cleaned: String = digits.chars().filter(|&c| c != '_').collect();
    let magnitude = i128::from_str_radix(&cleaned, base).ok()?;
    let value = if negative { -magnitude } else { magnitude };
    i64::try_from(value).ok()
}

fn strip_radix_prefix<'a>(digits: &'a str, prefix: &str) -> &'a str {
    if digits.len() >= 2 && digits[..2].eq_ignore_ascii_case(prefix) {
        &digits[2..]
    } else {
        digits
    }
}

/// `float(text)`
pub(crate) fn parse_float(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let lowered = trimmed.to_ascii_lowercase();
    let unsigned = lowered.trim_start_matches(['+', '-']);
    let negative = lowered.starts_with('-');
    let special = match unsigned {
        "inf" | "infinity" => Some(f64::INFINITY),
        "nan" => Some(f64::NAN),
        _ => None,
    };
    if let Some(x) = special {
        if lowered.len() - unsigned.len() > 1 {
            return None;
        }
        return Some(if negative { -x } else { x });
    }
    if trimmed.is_empty() || trimmed.contains("__") || trimmed.ends_with('_') {
        return None;
    }
    let cleaned: String = trimmed.chars().filter(|&c| c != '_').collect();
    if cleaned
        .chars()
        .any(|c| !(c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-')))
    {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

fn format_radix(n: i64, prefix: &str, radix: u32) -> String {
    let magnitude = n.unsigned_abs();
    let digits = match radix {
        16 => format!("{:x}", magnitude),
        8 => format!("{:o}", magnitude),
        _ => format!("{:b}", magnitude),
    };
    if n < 0 {
        format!("-{}{}", prefix, digits)
    } else {
        format!("{}{}", prefix, digits)
    }
}

/// Python's `round(x)`: half to even
fn round_half_even(x: f64, ndigits: i64) -> f64 {
    if !x.is_finite() {
        return x;
    }
    if ndigits >= 0 {
        let digits = ndigits.min(300) as usize;
        format!("{:.*}", digits, x).parse().unwrap_or(x)
    } else {
        let factor = 10f64.powi(ndigits.unsigned_abs().min(308) as i32);
        (x / factor).round_ties_even() * factor
    }
}

fn gcd(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a.unsigned_abs(), b.unsigned_abs());
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    i64::try_from(a).unwrap_or(i64::MAX)
}

impl Interpreter<'_> {
    pub(crate) fn call_builtin(
        &mut self,
        builtin: BuiltinFunction,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> ExecResult<Value> {
        let mut keywords = KeywordArgs::new(builtin.name(), kwargs);
        let result = self.dispatch_builtin(builtin, &args, &mut keywords)?;
        keywords.finish()?;
        Ok(result)
    }

    fn dispatch_builtin(
        &mut self,
        builtin: BuiltinFunction,
        args: &[Value],
        keywords: &mut KeywordArgs,
    ) -> ExecResult<Value> {
        let name = builtin.name();
        match builtin {
            BuiltinFunction::Print => self.builtin_print(args, keywords),
            BuiltinFunction::Sorted => self.builtin_sorted(args, keywords),
            BuiltinFunction::Min => self.builtin_min_max(args, keywords, false),
            BuiltinFunction::Max => self.builtin_min_max(args, keywords, true),
            BuiltinFunction::Enumerate => self.builtin_enumerate(args, keywords),
            BuiltinFunction::Dict => self.builtin_dict(args, keywords),
            BuiltinFunction::Sum => self.builtin_sum(args, keywords),
            BuiltinFunction::Input => {
                expect_args(name, args, 0, 1)?;
                if let Some(prompt) = args.first() {
                    let text = self.str_value(prompt)?;
                    self.console.print(&text);
                }
                Err(raise(ExceptionKind::EOFError, "EOF when reading a line"))
            }
            BuiltinFunction::Len => {
                expect_args(name, args, 1, 1)?;
                self.builtin_len(&args[0])
            }
            BuiltinFunction::Range => self.builtin_range(args),
            BuiltinFunction::Str => {
                expect_args(name, args, 0, 1)?;
                match args.first() {
                    Some(value) => Ok(Value::str(self.str_value(value)?)),
                    None => Ok(Value::str("")),
                }
            }
            BuiltinFunction::Repr => {
                expect_args(name, args, 1, 1)?;
                Ok(Value::str(self.repr_value(&args[0])?))
            }
            BuiltinFunction::Int => self.builtin_int(args),
            BuiltinFunction::Float => {
                expect_args(name, args, 0, 1)?;
                match args.first() {
                    None => Ok(Value::Float(0.0)),
                    Some(Value::Str(s)) => parse_float(s).map(Value::Float).ok_or_else(|| {
                        value_error(format!(
                            "could not convert string to float: {}",
                            Value::Str(s.clone()).repr()
                        ))
                    }),
                    Some(value) => value.as_float().map(Value::Float).ok_or_else(|| {
                        type_error(format!(
                            "float() argument must be a string or a real number, not '{}'",
                            value.type_name()
                        ))
                    }),
                }
            }
            BuiltinFunction::Bool => {
                expect_args(name, args, 0, 1)?;
                match args.first() {
                    Some(value) => Ok(Value::Bool(self.truthy(value)?)),
                    None => Ok(Value::Bool(false)),
                }
            }
            BuiltinFunction::List => {
                expect_args(name, args, 0, 1)?;
                match args.first() {
                    Some(value) => Ok(Value::list(self.collect_iterable(value)?)),
                    None => Ok(Value::list(Vec::new())),
                }
            }
            BuiltinFunction::Tuple => {
                expect_args(name, args, 0, 1)?;
                match args.first() {
                    Some(Value::Tuple(items)) => Ok(Value::Tuple(items.clone())),
                    Some(value) => Ok(Value::tuple(self.collect_iterable(value)?)),
                    None => Ok(Value::tuple(Vec::new())),
                }
            }
            BuiltinFunction::Set => {
                expect_args(name, args, 0, 1)?;
                let mut members = SetMap::default();
                if let Some(value) = args.first() {
                    for item in self.collect_iterable(value)? {
                        members.insert(ops::hash_key(&item)?, item);
                    }
                }
                Ok(Value::set(members))
            }
            BuiltinFunction::Abs => {
                expect_args(name, args, 1, 1)?;
                match &args[0] {
                    Value::Float(x) => Ok(Value::Float(x.abs())),
                    value => match value.as_int() {
                        Some(n) => n
                            .checked_abs()
                            .map(Value::Int)
                            .ok_or_else(|| overflow_error("integer overflow in abs()")),
                        None => Err(type_error(format!(
                            "bad operand type for abs(): '{}'",
                            value.type_name()
                        ))),
                    },
                }
            }
            BuiltinFunction::Zip => {
                let mut columns = Vec::with_capacity(args.len());
                for arg in args {
                    columns.push(self.collect_iterable(arg)?);
                }
                let rows = columns.iter().map(Vec::len).min().unwrap_or(0);
                Ok(Value::list(
                    (0..rows)
                        .map(|i| Value::tuple(columns.iter().map(|c| c[i].clone()).collect()))
                        .collect(),
                ))
            }
            BuiltinFunction::Round => {
                expect_args(name, args, 1, 2)?;
                let ndigits = match args.get(1) {
                    None | Some(Value::None) => None,
                    Some(value) => Some(index_arg(value)?),
                };
                match (&args[0], ndigits) {
                    (Value::Float(x), None) => float_to_int(x.round_ties_even()).map(Value::Int),
                    (Value::Float(x), Some(digits)) => Ok(Value::Float(round_half_even(*x, digits))),
                    (value, digits) => match value.as_int() {
                        Some(n) => match digits {
                            Some(d) if d < 0 => {
                                Ok(Value::Int(round_half_even(n as f64, d) as i64))
                            }
                            _ => Ok(Value::Int(n)),
                        },
                        None => Err(type_error(format!(
                            "type {} doesn't define __round__ method",
                            value.type_name()
                        ))),
                    },
                }
            }
            BuiltinFunction::Type => {
                expect_args(name, args, 1, 1)?;
                Ok(type_of(&args[0]))
            }
            BuiltinFunction::Isinstance => {
                expect_args(name, args, 2, 2)?;
                is_instance(&args[0], &args[1]).map(Value::Bool)
            }
            BuiltinFunction::Chr => {
                expect_args(name, args, 1, 1)?;
                let code = index_arg(&args[0])?;
                u32::try_from(code)
                    .ok()
                    .and_then(char::from_u32)
                    .map(|c| Value::str(c.to_string()))
                    .ok_or_else(|| value_error("chr() arg not in range(0x110000)"))
            }
            BuiltinFunction::Ord => {
                expect_args(name, args, 1, 1)?;
                match &args[0] {
                    Value::Str(s) => {
                        let mut chars = s.chars();
                        match (chars.next(), chars.next()) {
                            (Some(c), None) => Ok(Value::Int(c as i64)),
                            _ => Err(type_error(format!(
                                "ord() expected a character, but string of length {} found",
                                s.chars().count()
                            ))),
                        }
                    }
                    value => Err(type_error(format!(
                        "ord() expected string of length 1, but {} found",
                        value.type_name()
                    ))),
                }
            }
            BuiltinFunction::Divmod => {
                expect_args(name, args, 2, 2)?;
                let quotient = self.binary_op(BinOp::FloorDiv, &args[0], &args[1])?;
                let remainder = self.binary_op(BinOp::Mod, &args[0], &args[1])?;
                Ok(Value::tuple(vec![quotient, remainder]))
            }
            BuiltinFunction::Pow => {
                expect_args(name, args, 2, 3)?;
                match args.get(2) {
                    None | Some(Value::None) => self.binary_op(BinOp::Pow, &args[0], &args[1]),
                    Some(modulus) => {
                        let (base, exp, modulus) =
                            (index_arg(&args[0])?, index_arg(&args[1])?, index_arg(modulus)?);
                        ops::modular_pow(base, exp, modulus).map(Value::Int)
                    }
                }
            }
            BuiltinFunction::Hex | BuiltinFunction::Bin | BuiltinFunction::Oct => {
                expect_args(name, args, 1, 1)?;
                let n = index_arg(&args[0])?;
                Ok(Value::str(match builtin {
                    BuiltinFunction::Hex => format_radix(n, "0x", 16),
                    BuiltinFunction::Oct => format_radix(n, "0o", 8),
                    _ => format_radix(n, "0b", 2),
                }))
            }
            BuiltinFunction::MathSqrt => {
                expect_args(name, args, 1, 1)?;
                let x = number_arg(&args[0])?;
                if x < 0.0 {
                    return Err(value_error("math domain error"));
                }
                Ok(Value::Float(x.sqrt()))
            }
            BuiltinFunction::MathFloor | BuiltinFunction::MathCeil => {
                expect_args(name, args, 1, 1)?;
                if let Some(n) = args[0].as_int() {
                    return Ok(Value::Int(n));
                }
                let x = number_arg(&args[0])?;
                let rounded = if builtin == BuiltinFunction::MathFloor {
                    x.floor()
                } else {
                    x.ceil()
                };
                float_to_int(rounded).map(Value::Int)
            }
            BuiltinFunction::MathGcd => {
                let mut result = 0;
                for arg in args {
                    result = gcd(result, index_arg(arg)?);
                }
                Ok(Value::Int(result))
            }
            BuiltinFunction::MathLog => {
                expect_args(name, args, 1, 2)?;
                let x = number_arg(&args[0])?;
                if x <= 0.0 {
                    return Err(value_error("math domain error"));
                }
                match args.get(1) {
                    None => Ok(Value::Float(x.ln())),
                    Some(base) => {
                        let base = number_arg(base)?;
                        if base <= 0.0 {
                            return Err(value_error("math domain error"));
                        }
                        if base == 1.0 {
                            return Err(super::errors::zero_division("float division by zero"));
                        }
                        Ok(Value::Float(x.ln() / base.ln()))
                    }
                }
            }
            BuiltinFunction::MathFabs => {
                expect_args(name, args, 1, 1)?;
                Ok(Value::Float(number_arg(&args[0])?.abs()))
            }
            BuiltinFunction::MathIsqrt => {
                expect_args(name, args, 1, 1)?;
                let n = index_arg(&args[0])?;
                if n < 0 {
                    return Err(value_error("isqrt() argument must be nonnegative"));
                }
                let mut root = (n as f64).sqrt() as i64;
                while root.saturating_mul(root) > n {
                    root -= 1;
                }
                while (root + 1).saturating_mul(root + 1) <= n {
                    root += 1;
                }
                Ok(Value::Int(root))
            }
            BuiltinFunction::MathFactorial => {
                expect_args(name, args, 1, 1)?;
                let n = index_arg(&args[0])?;
                if n < 0 {
                    return Err(value_error("factorial() not defined for negative values"));
                }
                let mut result: i64 = 1;
                for k in 2..=n {
                    result = result
                        .checked_mul(k)
                        .ok_or_else(|| overflow_error("int too large to represent (64-bit limit)"))?;
                }
                Ok(Value::Int(result))
            }
        }
    }

    fn builtin_print(&mut self, args: &[Value], keywords: &mut KeywordArgs) -> ExecResult<Value> {
        let sep = self.separator_keyword(keywords.take("sep"), "sep", " ")?;
        let end = self.separator_keyword(keywords.take("end"), "end", "\n")?;
        let mut parts = Vec::with_capacity(args.len());
        for arg in args {
            parts.push(self.str_value(arg)?);
        }
        let mut line = parts.join(&sep);
        line.push_str(&end);
        self.console.print(&line);
        Ok(Value::None)
    }

    fn separator_keyword(
        &self,
        value: Option<Value>,
        name: &str,
        default: &str,
    ) -> ExecResult<String> {
        match value {
            None | Some(Value::None) => Ok(default.to_string()),
            Some(Value::Str(s)) => Ok(s.to_string()),
            Some(other) => Err(type_error(format!(
                "{} must be None or a string, not {}",
                name,
                other.type_name()
            ))),
        }
    }

    pub(crate) fn builtin_len(&mut self, value: &Value) -> ExecResult<Value> {
        let len = match value {
            Value::Str(s) => s.chars().count(),
            Value::List(items) => items.borrow().len(),
            Value::Tuple(items) => items.len(),
            Value::Dict(map) => map.borrow().len(),
            Value::Set(set) => set.borrow().len(),
            Value::Range(r) => r.len(),
            Value::Instance(_) => {
                return match self.call_dunder(value, "__len__", vec![])? {
                    Some(Value::Int(n)) if n >= 0 => Ok(Value::Int(n)),
                    Some(Value::Int(_)) => Err(value_error("__len__() should return >= 0")),
                    Some(other) => Err(type_error(format!(
                        "'{}' object cannot be interpreted as an integer",
                        other.type_name()
                    ))),
                    None => Err(type_error(format!(
                        "object of type '{}' has no len()",
                        value.type_name()
                    ))),
                }
            }
            other => {
                return Err(type_error(format!(
                    "object of type '{}' has no len()",
                    other.type_name()
                )))
            }
        };
        Ok(Value::Int(len as i64))
    }

    fn builtin_range(&mut self, args: &[Value]) -> ExecResult<Value> {
        expect_args("range", args, 1, 3)?;
        let mut bounds = [0i64; 3];
        for (slot, arg) in bounds.iter_mut().zip(args) {
            *slot = index_arg(arg)?;
        }
        let (start, stop, step) = match args.len() {
            1 => (0, bounds[0], 1),
            2 => (bounds[0], bounds[1], 1),
            _ => (bounds[0], bounds[1], bounds[2]),
        };
        if step == 0 {
            return Err(value_error("range() arg 3 must not be zero"));
        }
        Ok(Value::Range(RangeValue { start, stop, step }))
    }

    fn builtin_int(&mut self, args: &[Value]) -> ExecResult<Value> {
        expect_args("int", args, 0, 2)?;
        let Some(value) = args.first() else {
            return Ok(Value::Int(0));
        };
        if let Some(base) = args.get(1) {
            let base = index_arg(base)?;
            let Value::Str(s) = value else {
                return Err(type_error("int() can't convert non-string with explicit base"));
            };
            if !(2..=36).contains(&base) {
                return Err(value_error("int() base must be >= 2 and <= 36, or 0"));
            }
            return parse_int(s, base as u32).map(Value::Int).ok_or_else(|| {
                value_error(format!(
                    "invalid literal for int() with base {}: {}",
                    base,
                    Value::Str(s.clone()).repr()
                ))
            });
        }
        match value {
            Value::Int(n) => Ok(Value::Int(*n)),
            Value::Bool(b) => Ok(Value::Int(*b as i64)),
            Value::Float(x) => float_to_int(*x).map(Value::Int),
            Value::Str(s) => parse_int(s, 10).map(Value::Int).ok_or_else(|| {
                value_error(format!(
                    "invalid literal for int() with base 10: {}",
                    Value::Str(s.clone()).repr()
                ))
            }),
            other => Err(type_error(format!(
                "int() argument must be a string, a bytes-like object or a real number, not '{}'",
                other.type_name()
            ))),
        }
    }

    fn builtin_dict(&mut self, args: &[Value], keywords: &mut KeywordArgs) -> ExecResult<Value> {
        expect_args("dict", args, 0, 1)?;
        let mut map = DictMap::default();
        match args.first() {
            None => {}
            Some(Value::Dict(source)) => map = source.borrow().clone(),
            Some(iterable) => {
                for (index, item) in self.collect_iterable(iterable)?.into_iter().enumerate() {
                    let pair = match &item {
                        Value::Tuple(items) => items.to_vec(),
                        Value::List(items) => items.borrow().clone(),
                        _ => {
                            return Err(type_error(format!(
                                "cannot convert dictionary update sequence element #{} to a sequence",
                                index
                            )))
                        }
                    };
                    if pair.len() != 2 {
                        return Err(value_error(format!(
                            "dictionary update sequence element #{} has length {}; 2 is required",
                            index,
                            pair.len()
                        )));
                    }
                    let mut pair = pair.into_iter();
                    if let (Some(key), Some(value)) = (pair.next(), pair.next()) {
                        map.insert(ops::hash_key(&key)?, (key, value));
                    }
                }
            }
        }
        for (key, value) in keywords.take_all() {
            let key = Value::str(key);
            map.insert(ops::hash_key(&key)?, (key, value));
        }
        Ok(Value::dict(map))
    }

    fn builtin_sum(&mut self, args: &[Value], keywords: &mut KeywordArgs) -> ExecResult<Value> {
        expect_args("sum", args, 1, 2)?;
        let start = args
            .get(1)
            .cloned()
            .or_else(|| keywords.take("start"))
            .unwrap_or(Value::Int(0));
        if matches!(start, Value::Str(_)) {
            return Err(type_error(
                "sum() can't sum strings [use ''.join(seq) instead]",
            ));
        }
        let mut total = start;
        for item in self.collect_iterable(&args[0])? {
            total = self.binary_op(BinOp::Add, &total, &item)?;
        }
        Ok(total)
    }

    fn builtin_sorted(&mut self, args: &[Value], keywords: &mut KeywordArgs) -> ExecResult<Value> {
        expect_args("sorted", args, 1, 1)?;
        let key = keywords.take("key");
        let reverse = match keywords.take("reverse") {
            Some(flag) => self.truthy(&flag)?,
            None => false,
        };
        let items = self.collect_iterable(&args[0])?;
        let sorted = self.sort_values(items, key, reverse)?;
        Ok(Value::list(sorted))
    }

    /// Stable sort using `<`, with an optional key function
    pub(crate) fn sort_values(
        &mut self,
        items: Vec<Value>,
        key: Option<Value>,
        reverse: bool,
    ) -> ExecResult<Vec<Value>> {
        let mut keyed = Vec::with_capacity(items.len());
        for item in items {
            let sort_key = match &key {
                Some(Value::None) | None => item.clone(),
                Some(function) => self.call_value(function, vec![item.clone()], Vec::new())?,
            };
            keyed.push((sort_key, item));
        }
        if reverse {
            keyed.reverse();
        }
        let mut failure = None;
        keyed.sort_by(|(a, _), (b, _)| {
            if failure.is_some() {
                return Ordering::Equal;
            }
            match self.sort_order(a, b) {
                Ok(order) => order,
                Err(flow) => {
                    failure = Some(flow);
                    Ordering::Equal
                }
            }
        });
        if let Some(flow) = failure {
            return Err(flow);
        }
        if reverse {
            keyed.reverse();
        }
        Ok(keyed.into_iter().map(|(_, item)| item).collect())
    }

    fn sort_order(&mut self, a: &Value, b: &Value) -> ExecResult<Ordering> {
        if self.less_than(a, b)? {
            Ok(Ordering::Less)
        } else if self.less_than(b, a)? {
            Ok(Ordering::Greater)
        } else {
            Ok(Ordering::Equal)
        }
    }

    fn builtin_min_max(
        &mut self,
        args: &[Value],
        keywords: &mut KeywordArgs,
        want_max: bool,
    ) -> ExecResult<Value> {
        let name = if want_max { "max" } else { "min" };
        let key = keywords.take("key").filter(|k| !matches!(k, Value::None));
        let default = keywords.take("default");
        let candidates = match args {
            [] => {
                return Err(type_error(format!(
                    "{} expected at least 1 argument, got 0",
                    name
                )))
            }
            [iterable] => self.collect_iterable(iterable)?,
            many => {
                if default.is_some() {
                    return Err(type_error(format!(
                        "Cannot specify a default for {}() with multiple positional arguments",
                        name
                    )));
                }
                many.to_vec()
            }
        };
        let mut best: Option<(Value, Value)> = None;
        for item in candidates {
            let item_key = match &key {
                Some(function) => self.call_value(function, vec![item.clone()], Vec::new())?,
                None => item.clone(),
            };
            let replace = match &best {
                None => true,
                Some((best_key, _)) if want_max => self.less_than(best_key, &item_key)?,
                Some((best_key, _)) => self.less_than(&item_key, best_key)?,
            };
            if replace {
                best = Some((item_key, item));
            }
        }
        match (best, default) {
            (Some((_, item)), _) => Ok(item),
            (None, Some(default)) => Ok(default),
            (None, None) => Err(value_error(format!("{}() arg is an empty sequence", name))),
        }
    }

    fn builtin_enumerate(&mut self, args: &[Value], keywords: &mut KeywordArgs) -> ExecResult<Value> {
        expect_args("enumerate", args, 1, 2)?;
        let start = match args.get(1).cloned().or_else(|| keywords.take("start")) {
            Some(start) => index_arg(&start)?,
            None => 0,
        };
        let items = self.collect_iterable(&args[0])?;
        let mut pairs = Vec::with_capacity(items.len());
        for (offset, item) in items.into_iter().enumerate() {
            let index = start
                .checked_add(offset as i64)
                .ok_or_else(|| overflow_error("int too large to represent (64-bit limit)"))?;
            pairs.push(Value::tuple(vec![Value::Int(index), item]));
        }
        Ok(Value::list(pairs))
    }
}

/// `type(value)`
pub(crate) fn type_of(value: &Value) -> Value {
    match value {
        Value::Int(_) => Value::Builtin(BuiltinFunction::Int),
        Value::Bool(_) => Value::Builtin(BuiltinFunction::Bool),
        Value::Float(_) => Value::Builtin(BuiltinFunction::Float),
        Value::Str(_) => Value::Builtin(BuiltinFunction::Str),
        Value::List(_) => Value::Builtin(BuiltinFunction::List),
        Value::Tuple(_) => Value::Builtin(BuiltinFunction::Tuple),
        Value::Dict(_) => Value::Builtin(BuiltinFunction::Dict),
        Value::Set(_) => Value::Builtin(BuiltinFunction::Set),
        Value::Range(_) => Value::Builtin(BuiltinFunction::Range),
        Value::Instance(inst) => Value::Class(inst.class.clone()),
        Value::Exception(exc) => match &exc.class {
            Some(class) => Value::Class(class.clone()),
            None => Value::ExceptionType(exc.kind),
        },
        Value::None => Value::OtherType("NoneType"),
        Value::Function(_) => Value::OtherType("function"),
        Value::BoundMethod(_) => Value::OtherType("method"),
        Value::Module(_) => Value::OtherType("module"),
        Value::Builtin(b) if !b.is_type() => Value::OtherType("builtin_function_or_method"),
        Value::Builtin(_) | Value::Class(_) | Value::ExceptionType(_) | Value::OtherType(_) => {
            Value::OtherType("type")
        }
    }
}

/// `isinstance(value, classinfo)`
pub(crate) fn is_instance(value: &Value, classinfo: &Value) -> ExecResult<bool> {
    Ok(match classinfo {
        Value::Tuple(options) => {
            for option in options.iter() {
                if is_instance(value, option)? {
                    return Ok(true);
                }
            }
            false
        }
        Value::Builtin(b) if b.is_type() => match (b, value) {
            (BuiltinFunction::Int, Value::Int(_) | Value::Bool(_)) => true,
            (BuiltinFunction::Bool, Value::Bool(_)) => true,
            (BuiltinFunction::Float, Value::Float(_)) => true,
            (BuiltinFunction::Str, Value::Str(_)) => true,
            (BuiltinFunction::List, Value::List(_)) => true,
            (BuiltinFunction::Tuple, Value::Tuple(_)) => true,
            (BuiltinFunction::Dict, Value::Dict(_)) => true,
            (BuiltinFunction::Set, Value::Set(_)) => true,
            (BuiltinFunction::Range, Value::Range(_)) => true,
            _ => false,
        },
        Value::Class(class) => match value {
            Value::Instance(inst) => inst.class.is_subclass_of(class),
            Value::Exception(exc) => exc.class.as_ref().is_some_and(|c| c.is_subclass_of(class)),
            _ => false,
        },
        Value::ExceptionType(kind) => match value {
            Value::Exception(exc) => exc.kind.is_subclass_of(*kind),
            _ => false,
        },
        Value::OtherType(name) => match *name {
            "type" => matches!(
                value,
                Value::Class(_) | Value::ExceptionType(_) | Value::OtherType(_)
            ) || matches!(value, Value::Builtin(b) if b.is_type()),
            "object" => true,
            other => value.type_name() == other,
        },
        _ => {
            return Err(type_error(
                "isinstance() arg 2 must be a type, a tuple of types, or a union",
            ))
        }
    })
}

/// Base a `class` statement may name
pub(crate) fn class_base(value: &Value) -> ExecResult<ClassBase> {
    match value {
        Value::Class(class) => Ok(ClassBase::Class(class.clone())),
        Value::ExceptionType(kind) => Ok(ClassBase::Exception(*kind)),
        Value::OtherType("object") => Ok(ClassBase::Object),
        other => Err(type_error(format!(
            "inheriting from '{}' is not supported",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_int_accepts_python_forms() {
        assert_eq!(parse_int(" 42 ", 10), Some(42));
        assert_eq!(parse_int("-1_000", 10), Some(-1000));
        assert_eq!(parse_int("ff", 16), Some(255));
        assert_eq!(parse_int("0b101", 2), Some(5));
        assert_eq!(parse_int("4.5", 10), None);
        assert_eq!(parse_int("", 10), None);
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(parse_float("3.5"), Some(3.5));
        assert_eq!(parse_float(" -inf "), Some(f64::NEG_INFINITY));
        assert!(parse_float("nan").is_some_and(f64::is_nan));
        assert_eq!(parse_float("abc"), None);
        assert_eq!(parse_float("1e3"), Some(1000.0));
    }

    #[test]
    fn test_round_half_even() {
        assert_eq!(round_half_even(2.675, 2), 2.67);
        assert_eq!(round_half_even(1250.0, -2), 1200.0);
        assert_eq!(2.5f64.round_ties_even(), 2.0);
    }

    #[test]
    fn test_radix_formatting() {
        assert_eq!(format_radix(255, "0x", 16), "0xff");
        assert_eq!(format_radix(-5, "0b", 2), "-0b101");
    }

    #[test]
    fn test_isinstance_bool_is_int() {
        let int_type = Value::Builtin(BuiltinFunction::Int);
        assert!(is_instance(&Value::Bool(true), &int_type).unwrap());
        assert!(!is_instance(&Value::Float(1.0), &int_type).unwrap());
        assert!(is_instance(&Value::Int(3), &Value::tuple(vec![Value::Builtin(BuiltinFunction::Str), int_type])).unwrap());
    }

    #[test]
    fn test_type_of_exception_instance() {
        let exc = crate::memory::value::ExceptionObject::with_message(ExceptionKind::ValueError, "x");
        let ty = type_of(&Value::Exception(Rc::new(exc)));
        assert!(matches!(ty, Value::ExceptionType(ExceptionKind::ValueError)));
    }
}
