//! Comparison and membership evaluation

use super::hash_key;
use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::{type_error, ExecResult};
use crate::memory::value::Value;
use crate::parser::ast::CmpOp;
use std::cmp::Ordering;

/// Reflection of an ordering operator (`a < b` is `b > a`)
fn reflected(op: CmpOp) -> CmpOp {
    match op {
        CmpOp::Lt => CmpOp::Gt,
        CmpOp::Gt => CmpOp::Lt,
        CmpOp::LtE => CmpOp::GtE,
        CmpOp::GtE => CmpOp::LtE,
        other => other,
    }
}

fn dunder_for(op: CmpOp) -> &'static str {
    match op {
        CmpOp::Lt => "__lt__",
        CmpOp::LtE => "__le__",
        CmpOp::Gt => "__gt__",
        CmpOp::GtE => "__ge__",
        CmpOp::NotEq => "__ne__",
        _ => "__eq__",
    }
}

impl Interpreter<'_> {
    /// Evaluate one link of a comparison chain
    pub(crate) fn compare_op(&mut self, op: CmpOp, left: &Value, right: &Value) -> ExecResult<bool> {
        match op {
            CmpOp::Is => Ok(left.is_same(right)),
            CmpOp::IsNot => Ok(!left.is_same(right)),
            CmpOp::In => self.contains_op(right, left),
            CmpOp::NotIn => Ok(!self.contains_op(right, left)?),
            CmpOp::Eq => self.values_equal(left, right),
            CmpOp::NotEq => {
                if let Some(result) = self.call_dunder(left, "__ne__", vec![right.clone()])? {
                    return self.truthy(&result);
                }
                Ok(!self.values_equal(left, right)?)
            }
            CmpOp::Lt | CmpOp::LtE | CmpOp::Gt | CmpOp::GtE => {
                if let Some(result) = self.call_dunder(left, dunder_for(op), vec![right.clone()])? {
                    return self.truthy(&result);
                }
                let mirrored = reflected(op);
                if let Some(result) =
                    self.call_dunder(right, dunder_for(mirrored), vec![left.clone()])?
                {
                    return self.truthy(&result);
                }
                native_order(op, left, right)?.ok_or_else(|| {
                    type_error(format!(
                        "'{}' not supported between instances of '{}' and '{}'",
                        op.symbol(),
                        left.type_name(),
                        right.type_name()
                    ))
                })
            }
        }
    }

    pub(crate) fn less_than(&mut self, left: &Value, right: &Value) -> ExecResult<bool> {
        self.compare_op(CmpOp::Lt, left, right)
    }

    /// `==`, honouring a user `__eq__` on either side
    pub(crate) fn values_equal(&mut self, left: &Value, right: &Value) -> ExecResult<bool> {
        if let Some(result) = self.call_dunder(left, "__eq__", vec![right.clone()])? {
            return self.truthy(&result);
        }
        if let Some(result) = self.call_dunder(right, "__eq__", vec![left.clone()])? {
            return self.truthy(&result);
        }
        Ok(left.py_eq(right))
    }

    /// `item in container`
    pub(crate) fn contains_op(&mut self, container: &Value, item: &Value) -> ExecResult<bool> {
        if let Some(result) = self.call_dunder(container, "__contains__", vec![item.clone()])? {
            return self.truthy(&result);
        }
        match container {
            Value::List(items) => {
                let items = items.borrow().clone();
                for candidate in &items {
                    if self.values_equal(candidate, item)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Value::Tuple(items) => {
                for candidate in items.iter() {
                    if self.values_equal(candidate, item)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            _ => native_contains(container, item),
        }
    }
}

/// Ordering comparison on built-in values; `None` when the types are unordered
pub(crate) fn native_order(op: CmpOp, left: &Value, right: &Value) -> ExecResult<Option<bool>> {
    if let (Value::Set(a), Value::Set(b)) = (left, right) {
        let (a, b) = (a.borrow(), b.borrow());
        let a_in_b = a.keys().all(|k| b.contains_key(k));
        let b_in_a = b.keys().all(|k| a.contains_key(k));
        return Ok(Some(match op {
            CmpOp::Lt => a_in_b && a.len() < b.len(),
            CmpOp::LtE => a_in_b,
            CmpOp::Gt => b_in_a && a.len() > b.len(),
            _ => b_in_a,
        }));
    }
    Ok(ordering(left, right)?.map(|order| match (op, order) {
        (_, None) => false,
        (CmpOp::Lt, Some(order)) => order == Ordering::Less,
        (CmpOp::LtE, Some(order)) => order != Ordering::Greater,
        (CmpOp::Gt, Some(order)) => order == Ordering::Greater,
        (_, Some(order)) => order != Ordering::Less,
    }))
}

/// `Some(None)` means comparable types but unordered values (NaN)
fn ordering(left: &Value, right: &Value) -> ExecResult<Option<Option<Ordering>>> {
    if let (Some(a), Some(b)) = (left.as_int(), right.as_int()) {
        return Ok(Some(Some(a.cmp(&b))));
    }
    if left.is_number() && right.is_number() {
        let (a, b) = (left.as_float().unwrap_or(0.0), right.as_float().unwrap_or(0.0));
        return Ok(Some(a.partial_cmp(&b)));
    }
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => Ok(Some(Some(a.cmp(b)))),
        (Value::List(a), Value::List(b)) => {
            let (a, b) = (a.borrow().clone(), b.borrow().clone());
            sequence_ordering(&a, &b)
        }
        (Value::Tuple(a), Value::Tuple(b)) => sequence_ordering(a, b),
        _ => Ok(None),
    }
}

fn sequence_ordering(a: &[Value], b: &[Value]) -> ExecResult<Option<Option<Ordering>>> {
    for (x, y) in a.iter().zip(b.iter()) {
        if x.py_eq(y) {
            continue;
        }
        return match ordering(x, y)? {
            Some(order) => Ok(Some(order)),
            None => Err(type_error(format!(
                "'<' not supported between instances of '{}' and '{}'",
                x.type_name(),
                y.type_name()
            ))),
        };
    }
    Ok(Some(Some(a.len().cmp(&b.len()))))
}

/// Membership on built-in containers
pub(crate) fn native_contains(container: &Value, item: &Value) -> ExecResult<bool> {
    match container {
        Value::Str(text) => match item {
            Value::Str(needle) => Ok(text.contains(&**needle)),
            other => Err(type_error(format!(
                "'in <string>' requires string as left operand, not {}",
                other.type_name()
            ))),
        },
        Value::List(items) => Ok(items.borrow().iter().any(|v| v.py_eq(item))),
        Value::Tuple(items) => Ok(items.iter().any(|v| v.py_eq(item))),
        Value::Dict(map) => Ok(map.borrow().contains_key(&hash_key(item)?)),
        Value::Set(set) => Ok(set.borrow().contains_key(&hash_key(item)?)),
        Value::Range(range) => Ok(match item {
            Value::Float(x) if x.fract() == 0.0 && x.is_finite() => range.contains(*x as i64),
            other => other.as_int().is_some_and(|n| range.contains(n)),
        }),
        other => Err(type_error(format!(
            "argument of type '{}' is not iterable",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lexicographic_sequences() {
        let a = Value::list(vec![Value::Int(1), Value::Int(2)]);
        let b = Value::list(vec![Value::Int(1), Value::Int(3)]);
        assert_eq!(native_order(CmpOp::Lt, &a, &b).unwrap(), Some(true));
        let shorter = Value::tuple(vec![Value::Int(1)]);
        let longer = Value::tuple(vec![Value::Int(1), Value::Int(0)]);
        assert_eq!(native_order(CmpOp::Lt, &shorter, &longer).unwrap(), Some(true));
    }

    #[test]
    fn test_mixed_numeric_ordering() {
        assert_eq!(native_order(CmpOp::GtE, &Value::Float(2.0), &Value::Int(2)).unwrap(), Some(true));
        assert_eq!(native_order(CmpOp::Lt, &Value::Float(f64::NAN), &Value::Int(2)).unwrap(), Some(false));
    }

    #[test]
    fn test_unordered_types() {
        assert_eq!(native_order(CmpOp::Lt, &Value::Int(1), &Value::str("a")).unwrap(), None);
    }

    #[test]
    fn test_membership() {
        assert!(native_contains(&Value::str("hello"), &Value::str("ell")).unwrap());
        assert!(native_contains(&Value::str("hello"), &Value::Int(1)).is_err());
        let r = Value::Range(crate::memory::value::RangeValue { start: 0, stop: 10, step: 2 });
        assert!(native_contains(&r, &Value::Int(4)).unwrap());
        assert!(!native_contains(&r, &Value::Int(5)).unwrap());
    }
}
