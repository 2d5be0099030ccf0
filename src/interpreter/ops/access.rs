//! Subscript, slice and attribute access

use super::hash_key;
use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::{
    attribute_error, index_error, key_error, raise, type_error, value_error, ExceptionKind,
    ExecResult,
};
use crate::interpreter::methods::native_method_name;
use crate::memory::value::{BoundMethod, Method, RangeValue, Value};
use crate::parser::ast::Expr;
use std::rc::Rc;

/// `[lower:upper:step]` with each part already evaluated
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SliceBounds {
    pub lower: Option<i64>,
    pub upper: Option<i64>,
    pub step: Option<i64>,
}

impl SliceBounds {
    /// Clamp the bounds to a sequence of `len` items: `(start, stop, step)`
    pub(crate) fn adjust(&self, len: usize) -> ExecResult<(i64, i64, i64)> {
        let step = self.step.unwrap_or(1);
        if step == 0 {
            return Err(value_error("slice step cannot be zero"));
        }
        let len = len as i64;
        let clamp = |bound: i64| {
            let bound = if bound < 0 { bound.saturating_add(len) } else { bound };
            if step > 0 {
                bound.clamp(0, len)
            } else {
                bound.clamp(-1, len - 1)
            }
        };
        let start = match self.lower {
            Some(lower) => clamp(lower),
            None if step > 0 => 0,
            None => len - 1,
        };
        let stop = match self.upper {
            Some(upper) => clamp(upper),
            None if step > 0 => len,
            None => -1,
        };
        Ok((start, stop, step))
    }

    /// Positions selected from a sequence of `len` items, in slice order
    pub(crate) fn positions(&self, len: usize) -> ExecResult<Vec<usize>> {
        let (start, stop, step) = self.adjust(len)?;
        let mut positions = Vec::new();
        let mut i = start;
        while (step > 0 && i < stop) || (step < 0 && i > stop) {
            positions.push(i as usize);
            i = match i.checked_add(step) {
                Some(next) => next,
                None => break,
            };
        }
        Ok(positions)
    }
}

/// Resolve a possibly negative index against a length
fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let index = if index < 0 { index + len } else { index };
    (0..len).contains(&index).then_some(index as usize)
}

fn sequence_index(container: &str, index: &Value) -> ExecResult<i64> {
    index.as_int().ok_or_else(|| {
        type_error(format!(
            "{} indices must be integers or slices, not {}",
            container,
            index.type_name()
        ))
    })
}

impl Interpreter<'_> {
    pub(crate) fn evaluate_slice(
        &mut self,
        lower: &Option<Box<Expr>>,
        upper: &Option<Box<Expr>>,
        step: &Option<Box<Expr>>,
    ) -> ExecResult<SliceBounds> {
        let mut parts = [None; 3];
        for (slot, expr) in parts.iter_mut().zip([lower, upper, step]) {
            let Some(expr) = expr else { continue };
            match self.evaluate_expr(expr)? {
                Value::None => {}
                value => {
                    *slot = Some(value.as_int().ok_or_else(|| {
                        type_error(
                            "slice indices must be integers or None or have an __index__ method",
                        )
                    })?)
                }
            }
        }
        Ok(SliceBounds {
            lower: parts[0],
            upper: parts[1],
            step: parts[2],
        })
    }

    /// `object[index]`
    pub(crate) fn get_item(&mut self, object: &Value, index: &Value) -> ExecResult<Value> {
        match object {
            Value::List(items) => {
                let position = sequence_index("list", index)?;
                let items = items.borrow();
                normalize_index(position, items.len())
                    .map(|i| items[i].clone())
                    .ok_or_else(|| index_error("list index out of range"))
            }
            Value::Tuple(items) => {
                let position = sequence_index("tuple", index)?;
                normalize_index(position, items.len())
                    .map(|i| items[i].clone())
                    .ok_or_else(|| index_error("tuple index out of range"))
            }
            Value::Str(text) => {
                let position = index.as_int().ok_or_else(|| {
                    type_error(format!(
                        "string indices must be integers, not '{}'",
                        index.type_name()
                    ))
                })?;
                let len = text.chars().count();
                normalize_index(position, len)
                    .and_then(|i| text.chars().nth(i))
                    .map(|c| Value::str(c.to_string()))
                    .ok_or_else(|| index_error("string index out of range"))
            }
            Value::Range(range) => {
                let position = sequence_index("range", index)?;
                normalize_index(position, range.len())
                    .and_then(|i| range.get(i))
                    .map(Value::Int)
                    .ok_or_else(|| index_error("range object index out of range"))
            }
            Value::Dict(map) => {
                let key = hash_key(index)?;
                let found = map.borrow().get(&key).map(|(_, value)| value.clone());
                found.ok_or_else(|| key_error(index.clone()))
            }
            Value::Instance(_) => match self.call_dunder(object, "__getitem__", vec![index.clone()])? {
                Some(value) => Ok(value),
                None => Err(not_subscriptable(object)),
            },
            _ => Err(not_subscriptable(object)),
        }
    }

    /// `object[lower:upper:step]`
    pub(crate) fn get_slice(&mut self, object: &Value, bounds: SliceBounds) -> ExecResult<Value> {
        match object {
            Value::List(items) => {
                let items = items.borrow();
                let positions = bounds.positions(items.len())?;
                Ok(Value::list(positions.into_iter().map(|i| items[i].clone()).collect()))
            }
            Value::Tuple(items) => {
                let positions = bounds.positions(items.len())?;
                Ok(Value::tuple(positions.into_iter().map(|i| items[i].clone()).collect()))
            }
            Value::Str(text) => {
                let chars: Vec<char> = text.chars().collect();
                let positions = bounds.positions(chars.len())?;
                Ok(Value::str(positions.into_iter().map(|i| chars[i]).collect::<String>()))
            }
            Value::Range(range) => {
                let (start, stop, step) = bounds.adjust(range.len())?;
                let at = |position: i64| range.start.saturating_add(position.saturating_mul(range.step));
                Ok(Value::Range(RangeValue {
                    start: at(start),
                    stop: at(stop),
                    step: range.step.saturating_mul(step),
                }))
            }
            _ => Err(not_subscriptable(object)),
        }
    }

    /// `object[index] = value`
    pub(crate) fn set_item(&mut self, object: &Value, index: Value, value: Value) -> ExecResult<()> {
        match object {
            Value::List(items) => {
                let position = sequence_index("list", &index)?;
                let mut items = items.borrow_mut();
                let len = items.len();
                match normalize_index(position, len) {
                    Some(i) => {
                        items[i] = value;
                        Ok(())
                    }
                    None => Err(index_error("list assignment index out of range")),
                }
            }
            Value::Dict(map) => {
                let key = hash_key(&index)?;
                map.borrow_mut().insert(key, (index, value));
                Ok(())
            }
            Value::Instance(_) => {
                match self.call_dunder(object, "__setitem__", vec![index, value])? {
                    Some(_) => Ok(()),
                    None => Err(no_item_assignment(object)),
                }
            }
            _ => Err(no_item_assignment(object)),
        }
    }

    /// `object[lower:upper:step] = iterable`
    pub(crate) fn set_slice(&mut self, object: &Value, bounds: SliceBounds, value: Value) -> ExecResult<()> {
        let Value::List(items) = object else {
            return Err(no_item_assignment(object));
        };
        if !value.is_iterable() {
            return Err(type_error("can only assign an iterable"));
        }
        let replacement = self.collect_iterable(&value)?;
        let len = items.borrow().len();
        let (start, stop, step) = bounds.adjust(len)?;
        if step == 1 {
            let start = start as usize;
            let stop = (stop.max(start as i64)) as usize;
            self.check_sequence_len(len - (stop - start) + replacement.len())?;
            items.borrow_mut().splice(start..stop, replacement);
            return Ok(());
        }
        let positions = bounds.positions(len)?;
        if positions.len() != replacement.len() {
            return Err(value_error(format!(
                "attempt to assign sequence of size {} to extended slice of size {}",
                replacement.len(),
                positions.len()
            )));
        }
        let mut items = items.borrow_mut();
        for (position, item) in positions.into_iter().zip(replacement) {
            items[position] = item;
        }
        Ok(())
    }

    /// `del object[index]`
    pub(crate) fn delete_item(&mut self, object: &Value, index: &Value) -> ExecResult<()> {
        match object {
            Value::List(items) => {
                let position = sequence_index("list", index)?;
                let mut items = items.borrow_mut();
                let len = items.len();
                match normalize_index(position, len) {
                    Some(i) => {
                        items.remove(i);
                        Ok(())
                    }
                    None => Err(index_error("list assignment index out of range")),
                }
            }
            Value::Dict(map) => {
                let key = hash_key(index)?;
                let removed = map.borrow_mut().shift_remove(&key);
                removed.map(|_| ()).ok_or_else(|| key_error(index.clone()))
            }
            _ => Err(type_error(format!(
                "'{}' object doesn't support item deletion",
                object.type_name()
            ))),
        }
    }

    /// `del object[lower:upper:step]`
    pub(crate) fn delete_slice(&mut self, object: &Value, bounds: SliceBounds) -> ExecResult<()> {
        let Value::List(items) = object else {
            return Err(type_error(format!(
                "'{}' object doesn't support item deletion",
                object.type_name()
            )));
        };
        let mut positions = bounds.positions(items.borrow().len())?;
        positions.sort_unstable();
        let mut items = items.borrow_mut();
        for position in positions.into_iter().rev() {
            items.remove(position);
        }
        Ok(())
    }

    /// `object.name`
    pub(crate) fn get_attribute(&mut self, object: &Value, name: &str) -> ExecResult<Value> {
        match object {
            Value::Instance(instance) => {
                if let Some(value) = instance.attrs.borrow().get(name) {
                    return Ok(value.clone());
                }
                if name == "__class__" {
                    return Ok(Value::Class(instance.class.clone()));
                }
                match instance.class.lookup(name) {
                    Some(value) => Ok(bind_method(object, value)),
                    None => Err(attribute_error(&instance.class.name, name)),
                }
            }
            Value::Class(class) => {
                if name == "__name__" {
                    return Ok(Value::str(class.name.as_str()));
                }
                class.lookup(name).ok_or_else(|| {
                    raise(
                        ExceptionKind::AttributeError,
                        format!("type object '{}' has no attribute '{}'", class.name, name),
                    )
                })
            }
            Value::Exception(exc) => {
                if name == "args" {
                    return Ok(Value::tuple(exc.args.clone()));
                }
                if let Some(value) = exc.attrs.borrow().get(name) {
                    return Ok(value.clone());
                }
                match exc.class.as_ref().and_then(|class| class.lookup(name)) {
                    Some(value) => Ok(bind_method(object, value)),
                    None => Err(attribute_error(&exc.type_name(), name)),
                }
            }
            Value::Module(module) => module.attrs.get(name).cloned().ok_or_else(|| {
                raise(
                    ExceptionKind::AttributeError,
                    format!("module '{}' has no attribute '{}'", module.name, name),
                )
            }),
            Value::Function(function) if name == "__name__" => Ok(Value::str(function.name())),
            Value::Builtin(builtin) if name == "__name__" => Ok(Value::str(builtin.name())),
            Value::ExceptionType(kind) if name == "__name__" => Ok(Value::str(kind.name())),
            Value::OtherType(type_name) if name == "__name__" => Ok(Value::str(*type_name)),
            _ => match native_method_name(object, name) {
                Some(method) => Ok(Value::BoundMethod(Rc::new(BoundMethod {
                    receiver: object.clone(),
                    method: Method::Native(method),
                }))),
                None => Err(attribute_error(&object.type_name(), name)),
            },
        }
    }

    /// `object.name = value`
    pub(crate) fn set_attribute(&mut self, object: &Value, name: &str, value: Value) -> ExecResult<()> {
        let attrs = match object {
            Value::Instance(instance) => &instance.attrs,
            Value::Class(class) => &class.attrs,
            Value::Exception(exc) => &exc.attrs,
            _ => return Err(attribute_error(&object.type_name(), name)),
        };
        if let Value::Function(function) = &value {
            if let Value::Class(class) = object {
                *function.class_name.borrow_mut() = Some(class.name.clone());
            }
        }
        attrs.borrow_mut().insert(name.to_string(), value);
        Ok(())
    }

    /// `del object.name`
    pub(crate) fn delete_attribute(&mut self, object: &Value, name: &str) -> ExecResult<()> {
        let removed = match object {
            Value::Instance(instance) => instance.attrs.borrow_mut().shift_remove(name),
            Value::Class(class) => class.attrs.borrow_mut().shift_remove(name),
            Value::Exception(exc) => exc.attrs.borrow_mut().shift_remove(name),
            _ => None,
        };
        removed
            .map(|_| ())
            .ok_or_else(|| attribute_error(&object.type_name(), name))
    }
}

/// Functions found on a class bind to the receiver
fn bind_method(receiver: &Value, value: Value) -> Value {
    match value {
        Value::Function(function) => Value::BoundMethod(Rc::new(BoundMethod {
            receiver: receiver.clone(),
            method: Method::Function(function),
        })),
        other => other,
    }
}

fn not_subscriptable(object: &Value) -> crate::interpreter::errors::Flow {
    type_error(format!("'{}' object is not subscriptable", object.type_name()))
}

fn no_item_assignment(object: &Value) -> crate::interpreter::errors::Flow {
    type_error(format!(
        "'{}' object does not support item assignment",
        object.type_name()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(lower: Option<i64>, upper: Option<i64>, step: Option<i64>) -> SliceBounds {
        SliceBounds { lower, upper, step }
    }

    #[test]
    fn test_slice_positions() {
        assert_eq!(bounds(Some(1), Some(3), None).positions(5).unwrap(), vec![1, 2]);
        assert_eq!(bounds(None, None, Some(-1)).positions(3).unwrap(), vec![2, 1, 0]);
        assert_eq!(bounds(Some(-2), None, None).positions(5).unwrap(), vec![3, 4]);
        assert_eq!(bounds(Some(10), Some(20), None).positions(5).unwrap(), Vec::<usize>::new());
        assert_eq!(bounds(None, None, Some(2)).positions(5).unwrap(), vec![0, 2, 4]);
    }

    #[test]
    fn test_zero_step_is_rejected() {
        assert!(bounds(None, None, Some(0)).positions(3).is_err());
    }

    #[test]
    fn test_normalize_index() {
        assert_eq!(normalize_index(-1, 3), Some(2));
        assert_eq!(normalize_index(3, 3), None);
        assert_eq!(normalize_index(-4, 3), None);
    }
}
