//! Unary operator evaluation

use super::INT_OVERFLOW;
use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::{overflow_error, type_error, ExecResult};
use crate::memory::value::Value;
use crate::parser::ast::UnaryOp;

impl Interpreter<'_> {
    pub(crate) fn unary_op(&mut self, op: UnaryOp, operand: &Value) -> ExecResult<Value> {
        match op {
            UnaryOp::Not => Ok(Value::Bool(!self.truthy(operand)?)),
            _ => native_unary(op, operand),
        }
    }
}

pub(crate) fn native_unary(op: UnaryOp, operand: &Value) -> ExecResult<Value> {
    match (op, operand) {
        (UnaryOp::Not, value) => Ok(Value::Bool(!value.is_truthy())),
        (UnaryOp::Neg, Value::Float(x)) => Ok(Value::Float(-x)),
        (UnaryOp::Pos, Value::Float(x)) => Ok(Value::Float(*x)),
        (UnaryOp::Neg, value) if value.as_int().is_some() => value
            .as_int()
            .and_then(i64::checked_neg)
            .map(Value::Int)
            .ok_or_else(|| overflow_error(INT_OVERFLOW)),
        (UnaryOp::Pos, value) if value.as_int().is_some() => {
            Ok(Value::Int(value.as_int().unwrap_or(0)))
        }
        (UnaryOp::Invert, value) if value.as_int().is_some() => {
            Ok(Value::Int(!value.as_int().unwrap_or(0)))
        }
        (op, value) => Err(type_error(format!(
            "bad operand type for unary {}: '{}'",
            match op {
                UnaryOp::Neg => "-",
                UnaryOp::Pos => "+",
                _ => "~",
            },
            value.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negation() {
        assert!(matches!(native_unary(UnaryOp::Neg, &Value::Int(5)).unwrap(), Value::Int(-5)));
        assert!(matches!(native_unary(UnaryOp::Neg, &Value::Bool(true)).unwrap(), Value::Int(-1)));
        assert!(native_unary(UnaryOp::Neg, &Value::Int(i64::MIN)).is_err());
    }

    #[test]
    fn test_invert() {
        assert!(matches!(native_unary(UnaryOp::Invert, &Value::Int(0)).unwrap(), Value::Int(-1)));
    }

    #[test]
    fn test_bad_operand_message() {
        match native_unary(UnaryOp::Neg, &Value::str("x")) {
            Err(crate::interpreter::errors::Flow::Raise(exc)) => {
                assert_eq!(exc.message(), "bad operand type for unary -: 'str'")
            }
            _ => panic!("Expected TypeError"),
        }
    }
}
