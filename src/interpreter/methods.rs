//! Native methods of the built-in types
//!
//! `value.name` on a built-in value produces a bound method when `name` is
//! listed for its type in [`native_method_name`]; calling it lands in
//! [`Interpreter::call_method`].
//!
//! # Notes
//!
//! - `dict.keys()`, `dict.values()` and `dict.items()` return lists
//! - `str` positions are in characters, not bytes

use super::builtins::{expect_args, index_arg, BuiltinFunction, KeywordArgs};
use super::engine::Interpreter;
use super::errors::{index_error, key_error, raise, type_error, value_error, ExceptionKind, ExecResult};
use super::ops::binary::set_from;
use super::ops::hash_key;
use crate::memory::value::{SetMap, Value};
use std::cell::RefCell;
use std::rc::Rc;

const LIST_METHODS: &[&str] = &[
    "append", "extend", "insert", "pop", "remove", "index", "count", "sort", "reverse", "clear",
    "copy",
];

const DICT_METHODS: &[&str] = &[
    "keys", "values", "items", "get", "pop", "setdefault", "update", "clear", "copy", "popitem",
];

const STR_METHODS: &[&str] = &[
    "split", "rsplit", "join", "strip", "lstrip", "rstrip", "replace", "startswith", "endswith",
    "find", "rfind", "index", "rindex", "count", "upper", "lower", "title", "capitalize",
    "swapcase", "isdigit", "isalpha", "isalnum", "isspace", "isupper", "islower", "center",
    "ljust", "rjust", "zfill", "splitlines", "partition", "format",
];

const SET_METHODS: &[&str] = &[
    "add", "remove", "discard", "pop", "clear", "copy", "union", "intersection", "difference",
    "symmetric_difference", "update", "issubset", "issuperset", "isdisjoint",
];

const TUPLE_METHODS: &[&str] = &["count", "index"];

/// The native method `name` of a built-in value, as a `'static` name
pub(crate) fn native_method_name(value: &Value, name: &str) -> Option<&'static str> {
    let table: &[&'static str] = match value {
        Value::List(_) => LIST_METHODS,
        Value::Dict(_) => DICT_METHODS,
        Value::Str(_) => STR_METHODS,
        Value::Set(_) => SET_METHODS,
        Value::Tuple(_) => TUPLE_METHODS,
        Value::Float(_) => &["is_integer"],
        Value::Int(_) | Value::Bool(_) => &["bit_length"],
        _ => &[],
    };
    table.iter().copied().find(|method| *method == name)
}

impl Interpreter<'_> {
    pub(crate) fn call_method(
        &mut self,
        receiver: &Value,
        name: &'static str,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> ExecResult<Value> {
        let mut keywords = KeywordArgs::new(name, kwargs);
        let result = match receiver {
            Value::List(items) => self.list_method(items, name, &args, &mut keywords)?,
            Value::Dict(_) => self.dict_method(receiver, name, args, &mut keywords)?,
            Value::Str(text) => self.str_method(text, name, &args, &mut keywords)?,
            Value::Set(set) => self.set_method(set, name, &args)?,
            Value::Tuple(items) => self.sequence_search(items, name, &args, "tuple")?,
            Value::Float(x) => {
                expect_args(name, &args, 0, 0)?;
                Value::Bool(x.is_finite() && x.fract() == 0.0)
            }
            other => {
                expect_args(name, &args, 0, 0)?;
                let n = other.as_int().unwrap_or(0);
                Value::Int((64 - n.unsigned_abs().leading_zeros()) as i64)
            }
        };
        keywords.finish()?;
        Ok(result)
    }

    fn list_method(
        &mut self,
        items: &Rc<RefCell<Vec<Value>>>,
        name: &'static str,
        args: &[Value],
        keywords: &mut KeywordArgs,
    ) -> ExecResult<Value> {
        match name {
            "append" => {
                expect_args(name, args, 1, 1)?;
                self.check_sequence_len(items.borrow().len() + 1)?;
                items.borrow_mut().push(args[0].clone());
            }
            "extend" => {
                expect_args(name, args, 1, 1)?;
                let extra = self.collect_iterable(&args[0])?;
                self.check_sequence_len(items.borrow().len() + extra.len())?;
                items.borrow_mut().extend(extra);
            }
            "insert" => {
                expect_args(name, args, 2, 2)?;
                let len = items.borrow().len() as i64;
                let index = index_arg(&args[0])?;
                let index = if index < 0 { (index + len).max(0) } else { index.min(len) };
                self.check_sequence_len(len as usize + 1)?;
                items.borrow_mut().insert(index as usize, args[1].clone());
            }
            "pop" => {
                expect_args(name, args, 0, 1)?;
                let mut items = items.borrow_mut();
                if items.is_empty() {
                    return Err(index_error("pop from empty list"));
                }
                let len = items.len() as i64;
                let index = match args.first() {
                    Some(index) => index_arg(index)?,
                    None => -1,
                };
                let index = if index < 0 { index + len } else { index };
                if !(0..len).contains(&index) {
                    return Err(index_error("pop index out of range"));
                }
                return Ok(items.remove(index as usize));
            }
            "remove" => {
                expect_args(name, args, 1, 1)?;
                let snapshot = items.borrow().clone();
                for (position, candidate) in snapshot.iter().enumerate() {
                    if self.values_equal(candidate, &args[0])? {
                        items.borrow_mut().remove(position);
                        return Ok(Value::None);
                    }
                }
                return Err(value_error("list.remove(x): x not in list"));
            }
            "index" | "count" => {
                let snapshot: Rc<[Value]> = Rc::from(items.borrow().clone());
                return self.sequence_search(&snapshot, name, args, "list");
            }
            "sort" => {
                expect_args(name, args, 0, 0)?;
                let key = keywords.take("key");
                let reverse = match keywords.take("reverse") {
                    Some(flag) => self.truthy(&flag)?,
                    None => false,
                };
                let snapshot = items.borrow().clone();
                let sorted = self.sort_values(snapshot, key, reverse)?;
                *items.borrow_mut() = sorted;
            }
            "reverse" => {
                expect_args(name, args, 0, 0)?;
                items.borrow_mut().reverse();
            }
            "clear" => {
                expect_args(name, args, 0, 0)?;
                items.borrow_mut().clear();
            }
            _ => {
                expect_args(name, args, 0, 0)?;
                return Ok(Value::list(items.borrow().clone()));
            }
        }
        Ok(Value::None)
    }

    /// `index` and `count` on lists and tuples
    fn sequence_search(
        &mut self,
        items: &Rc<[Value]>,
        name: &'static str,
        args: &[Value],
        type_name: &str,
    ) -> ExecResult<Value> {
        if name == "count" {
            expect_args(name, args, 1, 1)?;
            let mut count = 0;
            for candidate in items.iter() {
                if self.values_equal(candidate, &args[0])? {
                    count += 1;
                }
            }
            return Ok(Value::Int(count));
        }
        expect_args(name, args, 1, 3)?;
        let len = items.len() as i64;
        let bound = |value: Option<&Value>, default: i64| -> ExecResult<usize> {
            let n = match value {
                Some(value) => index_arg(value)?,
                None => default,
            };
            let n = if n < 0 { (n + len).max(0) } else { n.min(len) };
            Ok(n as usize)
        };
        let start = bound(args.get(1), 0)?;
        let stop = bound(args.get(2), len)?;
        for position in start..stop.max(start) {
            if self.values_equal(&items[position], &args[0])? {
                return Ok(Value::Int(position as i64));
            }
        }
        Err(value_error(if type_name == "list" {
            format!("{} is not in list", self.repr_value(&args[0])?)
        } else {
            "tuple.index(x): x not in tuple".to_string()
        }))
    }

    fn dict_method(
        &mut self,
        receiver: &Value,
        name: &'static str,
        args: Vec<Value>,
        keywords: &mut KeywordArgs,
    ) -> ExecResult<Value> {
        let Value::Dict(map) = receiver else {
            return Ok(Value::None);
        };
        match name {
            "keys" | "values" | "items" => {
                expect_args(name, &args, 0, 0)?;
                let map = map.borrow();
                Ok(Value::list(
                    map.values()
                        .map(|(key, value)| match name {
                            "keys" => key.clone(),
                            "values" => value.clone(),
                            _ => Value::tuple(vec![key.clone(), value.clone()]),
                        })
                        .collect(),
                ))
            }
            "get" => {
                expect_args(name, &args, 1, 2)?;
                let key = hash_key(&args[0])?;
                let found = map.borrow().get(&key).map(|(_, value)| value.clone());
                Ok(found.unwrap_or_else(|| args.get(1).cloned().unwrap_or(Value::None)))
            }
            "pop" => {
                expect_args(name, &args, 1, 2)?;
                let key = hash_key(&args[0])?;
                let removed = map.borrow_mut().shift_remove(&key);
                match (removed, args.get(1)) {
                    (Some((_, value)), _) => Ok(value),
                    (None, Some(default)) => Ok(default.clone()),
                    (None, None) => Err(key_error(args[0].clone())),
                }
            }
            "setdefault" => {
                expect_args(name, &args, 1, 2)?;
                let key = hash_key(&args[0])?;
                let default = args.get(1).cloned().unwrap_or(Value::None);
                let mut map = map.borrow_mut();
                let (_, value) = map.entry(key).or_insert_with(|| (args[0].clone(), default));
                Ok(value.clone())
            }
            "update" => {
                expect_args(name, &args, 0, 1)?;
                let entries = keywords.take_all();
                let Value::Dict(other) = self.call_builtin(BuiltinFunction::Dict, args, entries)? else {
                    return Ok(Value::None);
                };
                let other = other.borrow().clone();
                map.borrow_mut().extend(other);
                Ok(Value::None)
            }
            "clear" => {
                expect_args(name, &args, 0, 0)?;
                map.borrow_mut().clear();
                Ok(Value::None)
            }
            "popitem" => {
                expect_args(name, &args, 0, 0)?;
                match map.borrow_mut().pop() {
                    Some((_, (key, value))) => Ok(Value::tuple(vec![key, value])),
                    None => Err(raise(
                        ExceptionKind::KeyError,
                        "popitem(): dictionary is empty",
                    )),
                }
            }
            _ => {
                expect_args(name, &args, 0, 0)?;
                Ok(Value::dict(map.borrow().clone()))
            }
        }
    }

    fn set_method(
        &mut self,
        set: &Rc<RefCell<SetMap>>,
        name: &'static str,
        args: &[Value],
    ) -> ExecResult<Value> {
        match name {
            "add" => {
                expect_args(name, args, 1, 1)?;
                let key = hash_key(&args[0])?;
                set.borrow_mut().entry(key).or_insert_with(|| args[0].clone());
                Ok(Value::None)
            }
            "remove" | "discard" => {
                expect_args(name, args, 1, 1)?;
                let key = hash_key(&args[0])?;
                let removed = set.borrow_mut().shift_remove(&key);
                if removed.is_none() && name == "remove" {
                    return Err(key_error(args[0].clone()));
                }
                Ok(Value::None)
            }
            "pop" => {
                expect_args(name, args, 0, 0)?;
                let popped = set.borrow_mut().shift_remove_index(0);
                popped
                    .map(|(_, member)| member)
                    .ok_or_else(|| raise(ExceptionKind::KeyError, "pop from an empty set"))
            }
            "clear" => {
                expect_args(name, args, 0, 0)?;
                set.borrow_mut().clear();
                Ok(Value::None)
            }
            "copy" => {
                expect_args(name, args, 0, 0)?;
                Ok(Value::set(set.borrow().clone()))
            }
            "update" => {
                for arg in args {
                    let members = set_from(self.collect_iterable(arg)?)?;
                    let mut set = set.borrow_mut();
                    for (key, member) in members {
                        set.entry(key).or_insert(member);
                    }
                }
                Ok(Value::None)
            }
            "union" | "intersection" | "difference" | "symmetric_difference" => {
                let mut result = set.borrow().clone();
                for arg in args {
                    let other = set_from(self.collect_iterable(arg)?)?;
                    result = match name {
                        "union" => {
                            let mut merged = result;
                            for (key, member) in other {
                                merged.entry(key).or_insert(member);
                            }
                            merged
                        }
                        "intersection" => result
                            .into_iter()
                            .filter(|(key, _)| other.contains_key(key))
                            .collect(),
                        "difference" => result
                            .into_iter()
                            .filter(|(key, _)| !other.contains_key(key))
                            .collect(),
                        _ => {
                            let mut merged: SetMap = result
                                .iter()
                                .filter(|(key, _)| !other.contains_key(*key))
                                .map(|(key, member)| (key.clone(), member.clone()))
                                .collect();
                            for (key, member) in other {
                                if !result.contains_key(&key) {
                                    merged.insert(key, member);
                                }
                            }
                            merged
                        }
                    };
                }
                Ok(Value::set(result))
            }
            _ => {
                expect_args(name, args, 1, 1)?;
                let other = set_from(self.collect_iterable(&args[0])?)?;
                let own = set.borrow();
                Ok(Value::Bool(match name {
                    "issubset" => own.keys().all(|key| other.contains_key(key)),
                    "issuperset" => other.keys().all(|key| own.contains_key(key)),
                    _ => !own.keys().any(|key| other.contains_key(key)),
                }))
            }
        }
    }

    fn str_method(
        &mut self,
        text: &Rc<str>,
        name: &'static str,
        args: &[Value],
        keywords: &mut KeywordArgs,
    ) -> ExecResult<Value> {
        let text: &str = text;
        match name {
            "format" => {
                let entries = keywords.take_all();
                return self.str_format(text, args, &entries).map(Value::str);
            }
            "join" => {
                expect_args(name, args, 1, 1)?;
                let mut parts = Vec::new();
                for (index, item) in self.collect_iterable(&args[0])?.into_iter().enumerate() {
                    match item {
                        Value::Str(s) => parts.push(s),
                        other => {
                            return Err(type_error(format!(
                                "sequence item {}: expected str instance, {} found",
                                index,
                                other.type_name()
                            )))
                        }
                    }
                }
                let joined = parts.iter().map(|s| &**s).collect::<Vec<&str>>().join(text);
                self.check_sequence_len(joined.len())?;
                return Ok(Value::str(joined));
            }
            "split" | "rsplit" => {
                expect_args(name, args, 0, 2)?;
                let sep = args.first().cloned().or_else(|| keywords.take("sep"));
                let maxsplit = match args.get(1).cloned().or_else(|| keywords.take("maxsplit")) {
                    Some(value) => index_arg(&value)?,
                    None => -1,
                };
                let sep = match sep {
                    None | Some(Value::None) => None,
                    Some(Value::Str(s)) if s.is_empty() => return Err(value_error("empty separator")),
                    Some(Value::Str(s)) => Some(s),
                    Some(other) => {
                        return Err(type_error(format!(
                            "must be str or None, not {}",
                            other.type_name()
                        )))
                    }
                };
                let parts = split_text(text, sep.as_deref(), maxsplit, name == "rsplit");
                return Ok(Value::list(parts.into_iter().map(Value::str).collect()));
            }
            _ => {}
        }

        let strings = string_args(name, args)?;
        Ok(match name {
            "strip" | "lstrip" | "rstrip" => {
                expect_args(name, args, 0, 1)?;
                let chars: Option<Vec<char>> = strings.first().map(|s| s.chars().collect());
                let matches = |c: char| match &chars {
                    Some(set) => set.contains(&c),
                    None => c.is_whitespace(),
                };
                Value::str(match name {
                    "strip" => text.trim_matches(matches),
                    "lstrip" => text.trim_start_matches(matches),
                    _ => text.trim_end_matches(matches),
                })
            }
            "replace" => {
                expect_args(name, args, 2, 3)?;
                let count = match args.get(2) {
                    Some(count) => index_arg(count)?,
                    None => -1,
                };
                let replaced = if count < 0 {
                    text.replace(&*strings[0], &strings[1])
                } else {
                    text.replacen(&*strings[0], &strings[1], count as usize)
                };
                self.check_sequence_len(replaced.len())?;
                Value::str(replaced)
            }
            "startswith" | "endswith" => {
                expect_args(name, args, 1, 1)?;
                let candidates: Vec<Value> = match &args[0] {
                    Value::Tuple(options) => options.to_vec(),
                    other => vec![other.clone()],
                };
                let mut found = false;
                for candidate in candidates {
                    let Value::Str(affix) = candidate else {
                        return Err(type_error(format!(
                            "{} first arg must be str or a tuple of str, not {}",
                            name,
                            candidate.type_name()
                        )));
                    };
                    found |= if name == "startswith" {
                        text.starts_with(&*affix)
                    } else {
                        text.ends_with(&*affix)
                    };
                }
                Value::Bool(found)
            }
            "find" | "rfind" | "index" | "rindex" => {
                expect_args(name, args, 1, 1)?;
                let needle = &*strings[0];
                let byte = if name.starts_with('r') {
                    text.rfind(needle)
                } else {
                    text.find(needle)
                };
                match byte {
                    Some(byte) => Value::Int(text[..byte].chars().count() as i64),
                    None if name.ends_with("index") => {
                        return Err(value_error("substring not found"))
                    }
                    None => Value::Int(-1),
                }
            }
            "count" => {
                expect_args(name, args, 1, 1)?;
                let needle = &*strings[0];
                if needle.is_empty() {
                    Value::Int(text.chars().count() as i64 + 1)
                } else {
                    Value::Int(text.matches(needle).count() as i64)
                }
            }
            "upper" => Value::str(text.to_uppercase()),
            "lower" => Value::str(text.to_lowercase()),
            "swapcase" => Value::str(
                text.chars()
                    .flat_map(|c| {
                        if c.is_uppercase() {
                            c.to_lowercase().collect::<Vec<_>>()
                        } else {
                            c.to_uppercase().collect::<Vec<_>>()
                        }
                    })
                    .collect::<String>(),
            ),
            "title" => Value::str(title_case(text)),
            "capitalize" => {
                let mut chars = text.chars();
                Value::str(match chars.next() {
                    Some(first) => {
                        let rest = chars.as_str().to_lowercase();
                        first.to_uppercase().chain(rest.chars()).collect::<String>()
                    }
                    None => String::new(),
                })
            }
            "isdigit" => Value::Bool(!text.is_empty() && text.chars().all(|c| c.is_ascii_digit())),
            "isalpha" => Value::Bool(!text.is_empty() && text.chars().all(char::is_alphabetic)),
            "isalnum" => Value::Bool(!text.is_empty() && text.chars().all(char::is_alphanumeric)),
            "isspace" => Value::Bool(!text.is_empty() && text.chars().all(char::is_whitespace)),
            "isupper" => Value::Bool(
                text.chars().any(char::is_uppercase) && !text.chars().any(char::is_lowercase),
            ),
            "islower" => Value::Bool(
                text.chars().any(char::is_lowercase) && !text.chars().any(char::is_uppercase),
            ),
            "center" | "ljust" | "rjust" => {
                expect_args(name, args, 1, 2)?;
                let width = index_arg(&args[0])?.max(0) as usize;
                self.check_sequence_len(width)?;
                let fill = match args.get(1) {
                    Some(Value::Str(fill)) if fill.chars().count() == 1 => fill.chars().next().unwrap_or(' '),
                    Some(_) => {
                        return Err(type_error(
                            "The fill character must be exactly one character long",
                        ))
                    }
                    None => ' ',
                };
                Value::str(pad(text, width, fill, name))
            }
            "zfill" => {
                expect_args(name, args, 1, 1)?;
                let width = index_arg(&args[0])?.max(0) as usize;
                self.check_sequence_len(width)?;
                let len = text.chars().count();
                if len >= width {
                    Value::str(text)
                } else {
                    let (sign, digits) = match text.chars().next() {
                        Some(c @ ('+' | '-')) => (c.to_string(), &text[1..]),
                        _ => (String::new(), text),
                    };
                    Value::str(format!("{}{}{}", sign, "0".repeat(width - len), digits))
                }
            }
            "splitlines" => Value::list(text.lines().map(Value::str).collect()),
            _ => {
                expect_args(name, args, 1, 1)?;
                let sep = &*strings[0];
                if sep.is_empty() {
                    return Err(value_error("empty separator"));
                }
                let parts = match text.split_once(sep) {
                    Some((head, tail)) => [head, sep, tail],
                    None => [text, "", ""],
                };
                Value::tuple(parts.into_iter().map(Value::str).collect())
            }
        })
    }
}

/// Positional arguments of string methods that take strings, checked up front
fn string_args(name: &str, args: &[Value]) -> ExecResult<Vec<Rc<str>>> {
    let takes_strings = matches!(
        name,
        "strip" | "lstrip" | "rstrip" | "replace" | "find" | "rfind" | "index" | "rindex"
            | "count" | "partition"
    );
    if !takes_strings {
        if !matches!(name, "center" | "ljust" | "rjust" | "zfill" | "startswith" | "endswith") {
            expect_args(name, args, 0, 0)?;
        }
        return Ok(Vec::new());
    }
    let limit = if name == "replace" { 2 } else { args.len() };
    args.iter()
        .take(limit)
        .map(|arg| match arg {
            Value::Str(s) => Ok(s.clone()),
            Value::None if name.ends_with("strip") => Ok(Rc::from(" \t\n\r\x0b\x0c")),
            other => Err(type_error(format!(
                "must be str, not {}",
                other.type_name()
            ))),
        })
        .collect()
}

/// `str.split` / `str.rsplit`; `None` separator splits on whitespace runs
fn split_text(text: &str, sep: Option<&str>, maxsplit: i64, from_right: bool) -> Vec<String> {
    let limit = if maxsplit < 0 { usize::MAX } else { maxsplit as usize };
    match sep {
        Some(sep) => {
            let mut parts: Vec<String> = if from_right {
                text.rsplitn(limit.saturating_add(1), sep).map(str::to_string).collect()
            } else {
                text.splitn(limit.saturating_add(1), sep).map(str::to_string).collect()
            };
            if from_right {
                parts.reverse();
            }
            parts
        }
        None => {
            let words: Vec<&str> = text.split_whitespace().collect();
            if words.len() <= limit.saturating_add(1) || limit == usize::MAX {
                return words.into_iter().map(str::to_string).collect();
            }
            if from_right {
                let keep = words.len() - limit;
                let head_end = word_boundary(text, keep);
                let mut parts = vec![text[..head_end].trim_end().to_string()];
                parts.extend(words[keep..].iter().map(|w| w.to_string()));
                parts
            } else {
                let tail_start = word_boundary(text, limit);
                let mut parts: Vec<String> = words[..limit].iter().map(|w| w.to_string()).collect();
                parts.push(text[tail_start..].trim_start().to_string());
                parts
            }
        }
    }
}

/// Byte offset just after the `count`-th whitespace-separated word
fn word_boundary(text: &str, count: usize) -> usize {
    let mut seen = 0;
    let mut in_word = false;
    for (offset, c) in text.char_indices() {
        if c.is_whitespace() {
            if in_word {
                seen += 1;
                if seen == count {
                    return offset;
                }
            }
            in_word = false;
        } else {
            in_word = true;
        }
    }
    text.len()
}

fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_cased = false;
    for c in text.chars() {
        if previous_cased {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        previous_cased = c.is_alphabetic();
    }
    out
}

fn pad(text: &str, width: usize, fill: char, mode: &str) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }
    let total = width - len;
    let (left, right) = match mode {
        "ljust" => (0, total),
        "rjust" => (total, 0),
        // CPython puts the odd fill character on the left when the width is odd.
        _ => {
            let left = total / 2 + (total & width & 1);
            (left, total - left)
        }
    };
    let fill = fill.to_string();
    format!("{}{}{}", fill.repeat(left), text, fill.repeat(right))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_lookup() {
        assert_eq!(native_method_name(&Value::list(vec![]), "append"), Some("append"));
        assert_eq!(native_method_name(&Value::str("x"), "append"), None);
        assert_eq!(native_method_name(&Value::Int(1), "bit_length"), Some("bit_length"));
    }

    #[test]
    fn test_split_text() {
        assert_eq!(split_text("  a  b c ", None, -1, false), vec!["a", "b", "c"]);
        assert_eq!(split_text("a,b,,c", Some(","), -1, false), vec!["a", "b", "", "c"]);
        assert_eq!(split_text("a,b,c", Some(","), 1, false), vec!["a", "b,c"]);
        assert_eq!(split_text("a,b,c", Some(","), 1, true), vec!["a,b", "c"]);
        assert_eq!(split_text("a b  c d", None, 2, false), vec!["a", "b", "c d"]);
    }

    #[test]
    fn test_title_and_pad() {
        assert_eq!(title_case("hello wORLD"), "Hello World");
        assert_eq!(pad("ab", 5, '*', "ljust"), "ab***");
        assert_eq!(pad("ab", 5, '*', "rjust"), "***ab");
        assert_eq!(pad("abc", 6, '-', "center"), "-abc--");
    }
}
