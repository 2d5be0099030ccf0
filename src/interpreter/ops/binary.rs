//! Binary operator evaluation

use super::{hash_key, INT_OVERFLOW};
use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::{
    overflow_error, raise, type_error, value_error, zero_division, ExceptionKind, ExecResult,
};
use crate::memory::value::{DictMap, SetMap, Value};
use crate::parser::ast::BinOp;

/// Dunder method implementing each operator, where user classes may define one
fn dunder_for(op: BinOp) -> Option<&'static str> {
    match op {
        BinOp::Add => Some("__add__"),
        BinOp::Sub => Some("__sub__"),
        BinOp::Mul => Some("__mul__"),
        _ => None,
    }
}

impl Interpreter<'_> {
    pub(crate) fn binary_op(&mut self, op: BinOp, left: &Value, right: &Value) -> ExecResult<Value> {
        if let Some(dunder) = dunder_for(op) {
            if let Some(result) = self.call_dunder(left, dunder, vec![right.clone()])? {
                return Ok(result);
            }
        }
        if let (BinOp::Mod, Value::Str(template)) = (op, left) {
            return self.percent_format(template, right).map(Value::str);
        }
        match native_binary(op, left, right, self.limits.max_sequence_len)? {
            Some(result) => Ok(result),
            None => Err(unsupported_operands(op, left, right)),
        }
    }
}

/// The `TypeError` Python raises for an operator that does not apply
pub(crate) fn unsupported_operands(op: BinOp, left: &Value, right: &Value) -> crate::interpreter::errors::Flow {
    let message = match (op, left) {
        (BinOp::Add, Value::Str(_)) => format!(
            "can only concatenate str (not \"{}\") to str",
            right.type_name()
        ),
        (BinOp::Add, Value::List(_)) => format!(
            "can only concatenate list (not \"{}\") to list",
            right.type_name()
        ),
        (BinOp::Add, Value::Tuple(_)) => format!(
            "can only concatenate tuple (not \"{}\") to tuple",
            right.type_name()
        ),
        (BinOp::Mul, Value::Str(_) | Value::List(_) | Value::Tuple(_)) if !right.is_number() => {
            format!(
                "can't multiply sequence by non-int of type '{}'",
                right.type_name()
            )
        }
        (BinOp::Mul, _) if matches!(right, Value::Str(_) | Value::List(_) | Value::Tuple(_)) => {
            format!(
                "can't multiply sequence by non-int of type '{}'",
                left.type_name()
            )
        }
        _ => format!(
            "unsupported operand type(s) for {}: '{}' and '{}'",
            op.symbol(),
            left.type_name(),
            right.type_name()
        ),
    };
    type_error(message)
}

/// Built-in semantics of a binary operator; `None` when the types don't support it
pub(crate) fn native_binary(
    op: BinOp,
    left: &Value,
    right: &Value,
    max_len: usize,
) -> ExecResult<Option<Value>> {
    if let (Some(a), Some(b)) = (left.as_int(), right.as_int()) {
        if let (Value::Bool(x), Value::Bool(y)) = (left, right) {
            match op {
                BinOp::BitAnd => return Ok(Some(Value::Bool(*x & *y))),
                BinOp::BitOr => return Ok(Some(Value::Bool(*x | *y))),
                BinOp::BitXor => return Ok(Some(Value::Bool(*x ^ *y))),
                _ => {}
            }
        }
        return int_binary(op, a, b).map(Some);
    }
    if left.is_number() && right.is_number() {
        let (a, b) = (left.as_float().unwrap_or(0.0), right.as_float().unwrap_or(0.0));
        return float_binary(op, a, b);
    }

    Ok(match (op, left, right) {
        (BinOp::Add, Value::Str(a), Value::Str(b)) => {
            check_len(a.len() + b.len(), max_len)?;
            Some(Value::str(format!("{}{}", a, b)))
        }
        (BinOp::Add, Value::List(a), Value::List(b)) => {
            let mut items = a.borrow().clone();
            items.extend(b.borrow().iter().cloned());
            check_len(items.len(), max_len)?;
            Some(Value::list(items))
        }
        (BinOp::Add, Value::Tuple(a), Value::Tuple(b)) => {
            check_len(a.len() + b.len(), max_len)?;
            Some(Value::tuple(a.iter().chain(b.iter()).cloned().collect()))
        }
        (BinOp::Mul, sequence, count) | (BinOp::Mul, count, sequence)
            if matches!(sequence, Value::Str(_) | Value::List(_) | Value::Tuple(_))
                && count.as_int().is_some() =>
        {
            let times = count.as_int().unwrap_or(0).max(0) as usize;
            Some(repeat_sequence(sequence, times, max_len)?)
        }
        (BinOp::Sub, Value::Set(a), Value::Set(b)) => {
            let b = b.borrow();
            Some(Value::set(
                a.borrow()
                    .iter()
                    .filter(|(key, _)| !b.contains_key(*key))
                    .map(|(key, member)| (key.clone(), member.clone()))
                    .collect(),
            ))
        }
        (BinOp::BitAnd, Value::Set(a), Value::Set(b)) => {
            let b = b.borrow();
            Some(Value::set(
                a.borrow()
                    .iter()
                    .filter(|(key, _)| b.contains_key(*key))
                    .map(|(key, member)| (key.clone(), member.clone()))
                    .collect(),
            ))
        }
        (BinOp::BitOr, Value::Set(a), Value::Set(b)) => {
            let mut members: SetMap = a.borrow().clone();
            for (key, member) in b.borrow().iter() {
                members.entry(key.clone()).or_insert_with(|| member.clone());
            }
            Some(Value::set(members))
        }
        (BinOp::BitXor, Value::Set(a), Value::Set(b)) => {
            let (a, b) = (a.borrow(), b.borrow());
            let mut members = SetMap::default();
            for (key, member) in a.iter().filter(|(key, _)| !b.contains_key(*key)) {
                members.insert(key.clone(), member.clone());
            }
            for (key, member) in b.iter().filter(|(key, _)| !a.contains_key(*key)) {
                members.insert(key.clone(), member.clone());
            }
            Some(Value::set(members))
        }
        (BinOp::BitOr, Value::Dict(a), Value::Dict(b)) => {
            let mut merged: DictMap = a.borrow().clone();
            for (key, entry) in b.borrow().iter() {
                merged.insert(key.clone(), entry.clone());
            }
            Some(Value::dict(merged))
        }
        _ => None,
    })
}

fn check_len(len: usize, max_len: usize) -> ExecResult<()> {
    if len > max_len {
        return Err(raise(ExceptionKind::MemoryError, "sequence too large"));
    }
    Ok(())
}

fn repeat_sequence(sequence: &Value, times: usize, max_len: usize) -> ExecResult<Value> {
    Ok(match sequence {
        Value::Str(s) => {
            check_len(s.len().saturating_mul(times), max_len)?;
            Value::str(s.repeat(times))
        }
        Value::List(items) => {
            let items = items.borrow();
            check_len(items.len().saturating_mul(times), max_len)?;
            Value::list(items.iter().cloned().cycle().take(items.len() * times).collect())
        }
        Value::Tuple(items) => {
            check_len(items.len().saturating_mul(times), max_len)?;
            Value::tuple(items.iter().cloned().cycle().take(items.len() * times).collect())
        }
        other => other.clone(),
    })
}

fn int_binary(op: BinOp, a: i64, b: i64) -> ExecResult<Value> {
    let overflow = || overflow_error(INT_OVERFLOW);
    Ok(match op {
        BinOp::Add => Value::Int(a.checked_add(b).ok_or_else(overflow)?),
        BinOp::Sub => Value::Int(a.checked_sub(b).ok_or_else(overflow)?),
        BinOp::Mul => Value::Int(a.checked_mul(b).ok_or_else(overflow)?),
        BinOp::Div => {
            if b == 0 {
                return Err(zero_division("division by zero"));
            }
            Value::Float(a as f64 / b as f64)
        }
        BinOp::FloorDiv => {
            if b == 0 {
                return Err(zero_division("integer division or modulo by zero"));
            }
            Value::Int(floor_div(a, b).ok_or_else(overflow)?)
        }
        BinOp::Mod => {
            if b == 0 {
                return Err(zero_division("integer modulo by zero"));
            }
            Value::Int(floor_mod(a, b))
        }
        BinOp::Pow => {
            if b < 0 {
                if a == 0 {
                    return Err(zero_division("0.0 cannot be raised to a negative power"));
                }
                Value::Float((a as f64).powf(b as f64))
            } else {
                let exp = u32::try_from(b).map_err(|_| overflow())?;
                Value::Int(a.checked_pow(exp).ok_or_else(overflow)?)
            }
        }
        BinOp::BitAnd => Value::Int(a & b),
        BinOp::BitOr => Value::Int(a | b),
        BinOp::BitXor => Value::Int(a ^ b),
        BinOp::Shl => {
            if b < 0 {
                return Err(value_error("negative shift count"));
            }
            if a == 0 {
                return Ok(Value::Int(0));
            }
            if b >= 63 {
                return Err(overflow());
            }
            let shifted = a << b;
            if shifted >> b != a {
                return Err(overflow());
            }
            Value::Int(shifted)
        }
        BinOp::Shr => {
            if b < 0 {
                return Err(value_error("negative shift count"));
            }
            Value::Int(if b >= 64 { if a < 0 { -1 } else { 0 } } else { a >> b })
        }
    })
}

/// Python's `//` on integers: rounds toward negative infinity
pub(crate) fn floor_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        Some(q - 1)
    } else {
        Some(q)
    }
}

/// Python's `%` on integers: the result takes the divisor's sign
pub(crate) fn floor_mod(a: i64, b: i64) -> i64 {
    let r = a.wrapping_rem(b);
    if r != 0 && ((r < 0) != (b < 0)) {
        r + b
    } else {
        r
    }
}

fn float_binary(op: BinOp, a: f64, b: f64) -> ExecResult<Option<Value>> {
    Ok(Some(Value::Float(match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => {
            if b == 0.0 {
                return Err(zero_division("division by zero"));
            }
            a / b
        }
        BinOp::FloorDiv => {
            if b == 0.0 {
                return Err(zero_division("float floor division by zero"));
            }
            (a / b).floor()
        }
        BinOp::Mod => {
            if b == 0.0 {
                return Err(zero_division("float modulo by zero"));
            }
            let r = a % b;
            if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
                r + b
            } else if r == 0.0 {
                0.0f64.copysign(b)
            } else {
                r
            }
        }
        BinOp::Pow => {
            if a == 0.0 && b < 0.0 {
                return Err(zero_division("0.0 cannot be raised to a negative power"));
            }
            if a < 0.0 && b.fract() != 0.0 {
                return Err(value_error(
                    "negative number cannot be raised to a fractional power",
                ));
            }
            let result = a.powf(b);
            if result.is_infinite() && a.is_finite() && b.is_finite() {
                return Err(overflow_error("(34, 'Numerical result out of range')"));
            }
            result
        }
        BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor | BinOp::Shl | BinOp::Shr => {
            return Ok(None)
        }
    })))
}

/// Three-argument `pow(base, exp, modulus)`
pub(crate) fn modular_pow(base: i64, exp: i64, modulus: i64) -> ExecResult<i64> {
    if modulus == 0 {
        return Err(value_error("pow() 3rd argument cannot be 0"));
    }
    if exp < 0 {
        return Err(value_error(
            "pow() 2nd argument cannot be negative when 3rd argument specified",
        ));
    }
    let m = modulus as i128;
    let mut result: i128 = 1;
    let mut base = (base as i128).rem_euclid(m.abs());
    let mut exp = exp;
    while exp > 0 {
        if exp & 1 == 1 {
            result = (result * base).rem_euclid(m.abs());
        }
        base = (base * base).rem_euclid(m.abs());
        exp >>= 1;
    }
    let result = floor_mod(result as i64, modulus);
    Ok(result)
}

/// Members of a set built from arbitrary values
pub(crate) fn set_from(items: Vec<Value>) -> ExecResult<SetMap> {
    let mut members = SetMap::default();
    for item in items {
        members.insert(hash_key(&item)?, item);
    }
    Ok(members)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::errors::Flow;

    fn eval(op: BinOp, a: Value, b: Value) -> Value {
        native_binary(op, &a, &b, 1_000_000).unwrap().unwrap()
    }

    #[test]
    fn test_floor_semantics() {
        assert_eq!(floor_div(-7, 2), Some(-4));
        assert_eq!(floor_div(7, -2), Some(-4));
        assert_eq!(floor_mod(-7, 2), 1);
        assert_eq!(floor_mod(7, -2), -1);
        assert_eq!(floor_div(i64::MIN, -1), None);
        assert_eq!(floor_mod(i64::MIN, -1), 0);
    }

    #[test]
    fn test_true_division_is_float() {
        assert!(matches!(eval(BinOp::Div, Value::Int(7), Value::Int(2)), Value::Float(x) if x == 3.5));
    }

    #[test]
    fn test_division_by_zero_message() {
        match native_binary(BinOp::Div, &Value::Int(1), &Value::Int(0), 10) {
            Err(Flow::Raise(exc)) => assert_eq!(exc.summary(), "ZeroDivisionError: division by zero"),
            _ => panic!("Expected ZeroDivisionError"),
        }
    }

    #[test]
    fn test_overflow_is_reported() {
        let result = native_binary(BinOp::Pow, &Value::Int(10), &Value::Int(30), 10);
        match result {
            Err(Flow::Raise(exc)) => assert_eq!(exc.kind(), ExceptionKind::OverflowError),
            _ => panic!("Expected OverflowError"),
        }
    }

    #[test]
    fn test_sequence_repetition() {
        assert_eq!(eval(BinOp::Mul, Value::str("ab"), Value::Int(3)).to_str(), "ababab");
        assert_eq!(eval(BinOp::Mul, Value::Int(2), Value::list(vec![Value::Int(0)])).repr(), "[0, 0]");
        assert_eq!(eval(BinOp::Mul, Value::str("x"), Value::Int(-1)).to_str(), "");
    }

    #[test]
    fn test_repetition_respects_length_limit() {
        let result = native_binary(BinOp::Mul, &Value::str("abc"), &Value::Int(1000), 100);
        assert!(matches!(result, Err(Flow::Raise(exc)) if exc.kind() == ExceptionKind::MemoryError));
    }

    #[test]
    fn test_bool_arithmetic_promotes_to_int() {
        assert!(matches!(eval(BinOp::Add, Value::Bool(true), Value::Int(1)), Value::Int(2)));
        assert!(matches!(eval(BinOp::BitAnd, Value::Bool(true), Value::Bool(false)), Value::Bool(false)));
    }

    #[test]
    fn test_str_plus_int_message() {
        let flow = unsupported_operands(BinOp::Add, &Value::str("a"), &Value::Int(1));
        match flow {
            Flow::Raise(exc) => assert_eq!(exc.message(), "can only concatenate str (not \"int\") to str"),
            _ => panic!("Expected TypeError"),
        }
    }

    #[test]
    fn test_modular_pow() {
        assert_eq!(modular_pow(3, 4, 5).unwrap(), 1);
        assert_eq!(modular_pow(-2, 3, 7).unwrap(), 6);
    }
}
