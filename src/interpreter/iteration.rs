//! Iteration over built-in containers
//!
//! `for` loops and comprehensions pull items one at a time from a [`PyIter`].
//! Lists are read by index on every step, so appending inside the loop is
//! observed the way Python observes it. Dicts and sets refuse to continue
//! once their size changes mid-iteration.

use super::engine::Interpreter;
use super::errors::{raise, type_error, ExceptionKind, ExecResult};
use crate::memory::value::{DictMap, RangeValue, SetMap, Value};
use std::cell::RefCell;
use std::rc::Rc;

pub(crate) enum PyIter {
    Range { range: RangeValue, index: usize },
    List { items: Rc<RefCell<Vec<Value>>>, index: usize },
    Tuple { items: Rc<[Value]>, index: usize },
    Chars { text: Rc<str>, offset: usize },
    Dict { map: Rc<RefCell<DictMap>>, index: usize, len: usize },
    Set { set: Rc<RefCell<SetMap>>, index: usize, len: usize },
}

impl PyIter {
    pub(crate) fn next_item(&mut self) -> ExecResult<Option<Value>> {
        Ok(match self {
            PyIter::Range { range, index } => {
                let item = range.get(*index).map(Value::Int);
                *index += 1;
                item
            }
            PyIter::List { items, index } => {
                let item = items.borrow().get(*index).cloned();
                *index += 1;
                item
            }
            PyIter::Tuple { items, index } => {
                let item = items.get(*index).cloned();
                *index += 1;
                item
            }
            PyIter::Chars { text, offset } => {
                let item = text[*offset..].chars().next();
                if let Some(c) = item {
                    *offset += c.len_utf8();
                }
                item.map(|c| Value::str(c.to_string()))
            }
            PyIter::Dict { map, index, len } => {
                let map = map.borrow();
                if map.len() != *len {
                    return Err(raise(
                        ExceptionKind::RuntimeError,
                        "dictionary changed size during iteration",
                    ));
                }
                let item = map.get_index(*index).map(|(_, (key, _))| key.clone());
                *index += 1;
                item
            }
            PyIter::Set { set, index, len } => {
                let set = set.borrow();
                if set.len() != *len {
                    return Err(raise(
                        ExceptionKind::RuntimeError,
                        "Set changed size during iteration",
                    ));
                }
                let item = set.get_index(*index).map(|(_, member)| member.clone());
                *index += 1;
                item
            }
        })
    }
}

impl Interpreter<'_> {
    pub(crate) fn make_iter(&mut self, value: &Value) -> ExecResult<PyIter> {
        Ok(match value {
            Value::Range(range) => PyIter::Range {
                range: *range,
                index: 0,
            },
            Value::List(items) => PyIter::List {
                items: items.clone(),
                index: 0,
            },
            Value::Tuple(items) => PyIter::Tuple {
                items: items.clone(),
                index: 0,
            },
            Value::Str(text) => PyIter::Chars {
                text: text.clone(),
                offset: 0,
            },
            Value::Dict(map) => PyIter::Dict {
                len: map.borrow().len(),
                map: map.clone(),
                index: 0,
            },
            Value::Set(set) => PyIter::Set {
                len: set.borrow().len(),
                set: set.clone(),
                index: 0,
            },
            other => {
                return Err(type_error(format!(
                    "'{}' object is not iterable",
                    other.type_name()
                )))
            }
        })
    }

    /// Materialize every item of an iterable, bounded by the sequence limit
    pub(crate) fn collect_iterable(&mut self, value: &Value) -> ExecResult<Vec<Value>> {
        if let Value::Range(range) = value {
            self.check_sequence_len(range.len())?;
        }
        let mut iterator = self.make_iter(value)?;
        let mut items = Vec::new();
        while let Some(item) = iterator.next_item()? {
            self.check_sequence_len(items.len() + 1)?;
            items.push(item);
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(mut iter: PyIter) -> Vec<Value> {
        let mut out = Vec::new();
        while let Some(item) = iter.next_item().unwrap() {
            out.push(item);
        }
        out
    }

    #[test]
    fn test_chars_iterates_code_points() {
        let items = drain(PyIter::Chars {
            text: Rc::from("hé!"),
            offset: 0,
        });
        let texts: Vec<String> = items.iter().map(Value::to_str).collect();
        assert_eq!(texts, vec!["h", "é", "!"]);
    }

    #[test]
    fn test_list_iteration_sees_appends() {
        let items = Rc::new(RefCell::new(vec![Value::Int(1)]));
        let mut iter = PyIter::List {
            items: items.clone(),
            index: 0,
        };
        assert!(iter.next_item().unwrap().is_some());
        items.borrow_mut().push(Value::Int(2));
        assert!(matches!(iter.next_item().unwrap(), Some(Value::Int(2))));
        assert!(iter.next_item().unwrap().is_none());
    }

    #[test]
    fn test_dict_size_change_is_an_error() {
        let map = Rc::new(RefCell::new(DictMap::default()));
        let key = Value::str("a");
        map.borrow_mut()
            .insert(key.hash_key().unwrap(), (key, Value::Int(1)));
        let mut iter = PyIter::Dict {
            len: 1,
            map: map.clone(),
            index: 0,
        };
        assert!(iter.next_item().unwrap().is_some());
        let extra = Value::str("b");
        map.borrow_mut()
            .insert(extra.hash_key().unwrap(), (extra, Value::Int(2)));
        assert!(iter.next_item().is_err());
    }
}
