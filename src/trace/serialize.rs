//! Bounded, JSON-safe projection of runtime values
//!
//! [`serialize_value`] never fails. Three independent bounds keep the output
//! small whatever the program builds:
//!
//! - nesting: anything below depth [`MAX_DEPTH`] becomes `"..."`
//! - breadth: containers keep [`MAX_COLLECTION_SIZE`] entries plus an overflow count
//! - strings: text keeps [`MAX_STRING_LENGTH`] characters plus `"..."`
//!
//! Values are inspected through [`ValueShape`], a closed set of adapters. No
//! user code runs during serialization, and a container that cannot be
//! borrowed yields [`SerializedValue::Unserializable`] for that entry only.
//!
//! # JSON form
//!
//! | Variant | JSON |
//! |---|---|
//! | list | `[..., "...(+N)"]` |
//! | tuple, set | `{"__type": "tuple", "items": [...]}` |
//! | dict | `{"k": ..., "__more": "...(+N)"}` |
//! | opaque with text | `{"__type": "range", "repr": "range(0, 3)"}` |
//! | opaque | `"<function>"` |

use crate::memory::value::Value;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number};
use std::fmt;
use std::rc::Rc;

pub const MAX_COLLECTION_SIZE: usize = 10;
pub const MAX_STRING_LENGTH: usize = 50;
pub const MAX_DEPTH: usize = 2;

pub const ELLIPSIS: &str = "...";
pub const UNSERIALIZABLE: &str = "<unserializable>";
const TYPE_KEY: &str = "__type";
const ITEMS_KEY: &str = "items";
const REPR_KEY: &str = "repr";
const MORE_KEY: &str = "__more";

/// Notation tag of a non-list sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceTag {
    Tuple,
    Set,
}

impl SequenceTag {
    pub fn name(self) -> &'static str {
        match self {
            SequenceTag::Tuple => "tuple",
            SequenceTag::Set => "set",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "serde_json::Value", from = "serde_json::Value")]
pub enum SerializedValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Already truncated to the length bound
    Str(String),
    Sequence {
        tag: Option<SequenceTag>,
        items: Vec<SerializedValue>,
        /// Elements beyond the breadth bound
        overflow: usize,
    },
    Mapping {
        entries: Vec<(String, SerializedValue)>,
        overflow: usize,
    },
    /// Depth cutoff
    Ellipsis,
    OpaqueText {
        type_name: String,
        text: String,
    },
    Opaque {
        type_name: String,
    },
    Unserializable,
}

/// How the serializer sees a runtime value
#[derive(Debug)]
pub enum ValueShape {
    Primitive(SerializedValue),
    Text(Rc<str>),
    Sequence {
        tag: Option<SequenceTag>,
        head: Vec<Value>,
        len: usize,
    },
    Mapping {
        head: Vec<(String, Value)>,
        len: usize,
    },
    OpaqueText {
        type_name: String,
        text: String,
    },
    Opaque {
        type_name: String,
    },
}

/// A container was mutably borrowed while being inspected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Uninspectable;

impl Value {
    /// Map the value onto the serializer's adapter set.
    ///
    /// Only the first [`MAX_COLLECTION_SIZE`] elements of a container are
    /// cloned out.
    pub fn shape(&self) -> Result<ValueShape, Uninspectable> {
        let shape = match self {
            Value::None => ValueShape::Primitive(SerializedValue::None),
            Value::Bool(b) => ValueShape::Primitive(SerializedValue::Bool(*b)),
            Value::Int(n) => ValueShape::Primitive(SerializedValue::Int(*n)),
            Value::Float(x) => ValueShape::Primitive(SerializedValue::Float(*x)),
            Value::Str(text) => ValueShape::Text(text.clone()),
            Value::List(items) => {
                let items = items.try_borrow().map_err(|_| Uninspectable)?;
                sequence(None, items.iter(), items.len())
            }
            Value::Tuple(items) => sequence(Some(SequenceTag::Tuple), items.iter(), items.len()),
            Value::Set(members) => {
                let members = members.try_borrow().map_err(|_| Uninspectable)?;
                sequence(Some(SequenceTag::Set), members.values(), members.len())
            }
            Value::Dict(map) => {
                let map = map.try_borrow().map_err(|_| Uninspectable)?;
                ValueShape::Mapping {
                    head: map
                        .values()
                        .take(MAX_COLLECTION_SIZE)
                        .map(|(key, value)| (key.to_str(), value.clone()))
                        .collect(),
                    len: map.len(),
                }
            }
            Value::Range(_) | Value::Exception(_) => ValueShape::OpaqueText {
                type_name: self.type_name(),
                text: self.repr(),
            },
            Value::Instance(instance) if instance.class.lookup("to_json").is_some() => {
                ValueShape::OpaqueText {
                    type_name: instance.class.name.clone(),
                    text: format!("<{} object>", instance.class.name),
                }
            }
            other => ValueShape::Opaque {
                type_name: other.type_name(),
            },
        };
        Ok(shape)
    }
}

fn sequence<'a>(
    tag: Option<SequenceTag>,
    items: impl Iterator<Item = &'a Value>,
    len: usize,
) -> ValueShape {
    ValueShape::Sequence {
        tag,
        head: items.take(MAX_COLLECTION_SIZE).cloned().collect(),
        len,
    }
}

/// Serialize a top-level value
pub fn serialize_value(value: &Value) -> SerializedValue {
    serialize_at(value, 0)
}

pub fn serialize_at(value: &Value, depth: usize) -> SerializedValue {
    if depth > MAX_DEPTH {
        return SerializedValue::Ellipsis;
    }
    let Ok(shape) = value.shape() else {
        return SerializedValue::Unserializable;
    };
    match shape {
        ValueShape::Primitive(primitive) => primitive,
        ValueShape::Text(text) => SerializedValue::Str(truncate_text(&text)),
        ValueShape::Sequence { tag, head, len } => SerializedValue::Sequence {
            tag,
            items: head.iter().map(|item| serialize_at(item, depth + 1)).collect(),
            overflow: len.saturating_sub(MAX_COLLECTION_SIZE),
        },
        ValueShape::Mapping { head, len } => SerializedValue::Mapping {
            entries: head
                .iter()
                .map(|(key, value)| (key.clone(), serialize_at(value, depth + 1)))
                .collect(),
            overflow: len.saturating_sub(MAX_COLLECTION_SIZE),
        },
        ValueShape::OpaqueText { type_name, text } => SerializedValue::OpaqueText {
            type_name,
            text: truncate_text(&text),
        },
        ValueShape::Opaque { type_name } => SerializedValue::Opaque { type_name },
    }
}

/// Keep the first [`MAX_STRING_LENGTH`] characters, marking the cut with `...`
pub fn truncate_text(text: &str) -> String {
    match text.char_indices().nth(MAX_STRING_LENGTH) {
        Some((cut, _)) => format!("{}{}", &text[..cut], ELLIPSIS),
        None => text.to_string(),
    }
}

fn overflow_marker(count: usize) -> String {
    format!("...(+{})", count)
}

fn parse_overflow_marker(text: &str) -> Option<usize> {
    text.strip_prefix("...(+")?.strip_suffix(')')?.parse().ok()
}

impl From<SerializedValue> for serde_json::Value {
    fn from(value: SerializedValue) -> Self {
        use serde_json::Value as Json;
        match value {
            SerializedValue::None => Json::Null,
            SerializedValue::Bool(b) => Json::Bool(b),
            SerializedValue::Int(n) => Json::from(n),
            SerializedValue::Float(x) => match Number::from_f64(x) {
                Some(number) => Json::Number(number),
                None if x.is_nan() => Json::from("nan"),
                None if x > 0.0 => Json::from("inf"),
                None => Json::from("-inf"),
            },
            SerializedValue::Str(text) => Json::String(text),
            SerializedValue::Sequence {
                tag,
                items,
                overflow,
            } => {
                let mut items: Vec<Json> = items.into_iter().map(Json::from).collect();
                if overflow > 0 {
                    items.push(Json::String(overflow_marker(overflow)));
                }
                match tag {
                    None => Json::Array(items),
                    Some(tag) => {
                        let mut object = Map::new();
                        object.insert(TYPE_KEY.to_string(), Json::from(tag.name()));
                        object.insert(ITEMS_KEY.to_string(), Json::Array(items));
                        Json::Object(object)
                    }
                }
            }
            SerializedValue::Mapping { entries, overflow } => {
                let mut object = Map::new();
                for (key, value) in entries {
                    object.insert(key, Json::from(value));
                }
                if overflow > 0 {
                    object.insert(MORE_KEY.to_string(), Json::String(overflow_marker(overflow)));
                }
                Json::Object(object)
            }
            SerializedValue::Ellipsis => Json::from(ELLIPSIS),
            SerializedValue::OpaqueText { type_name, text } => {
                let mut object = Map::new();
                object.insert(TYPE_KEY.to_string(), Json::String(type_name));
                object.insert(REPR_KEY.to_string(), Json::String(text));
                Json::Object(object)
            }
            SerializedValue::Opaque { type_name } => Json::String(format!("<{}>", type_name)),
            SerializedValue::Unserializable => Json::from(UNSERIALIZABLE),
        }
    }
}

/// Decoding is best-effort: the JSON form does not distinguish a string that
/// looks like a marker from the marker itself.
impl From<serde_json::Value> for SerializedValue {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Null => SerializedValue::None,
            Json::Bool(b) => SerializedValue::Bool(b),
            Json::Number(number) => match number.as_i64() {
                Some(n) => SerializedValue::Int(n),
                None => SerializedValue::Float(number.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(text) => decode_marker(text),
            Json::Array(items) => {
                let (items, overflow) = decode_items(items);
                SerializedValue::Sequence {
                    tag: None,
                    items,
                    overflow,
                }
            }
            Json::Object(mut object) => {
                let type_name = match object.get(TYPE_KEY) {
                    Some(Json::String(name)) => Some(name.clone()),
                    _ => None,
                };
                let sequence_tag = match type_name.as_deref() {
                    Some("tuple") => Some(SequenceTag::Tuple),
                    Some("set") => Some(SequenceTag::Set),
                    _ => None,
                };
                let items = object.remove(ITEMS_KEY);
                let repr = object.remove(REPR_KEY);
                match (sequence_tag, items, repr, type_name) {
                    (Some(tag), Some(Json::Array(items)), _, _) => {
                        let (items, overflow) = decode_items(items);
                        SerializedValue::Sequence {
                            tag: Some(tag),
                            items,
                            overflow,
                        }
                    }
                    (None, None, Some(Json::String(text)), Some(type_name)) => {
                        SerializedValue::OpaqueText { type_name, text }
                    }
                    (_, items, repr, _) => {
                        // Not a tagged form after all; put the keys back.
                        if let Some(items) = items {
                            object.insert(ITEMS_KEY.to_string(), items);
                        }
                        if let Some(repr) = repr {
                            object.insert(REPR_KEY.to_string(), repr);
                        }
                        let overflow = match object.remove(MORE_KEY) {
                            Some(Json::String(marker)) => parse_overflow_marker(&marker).unwrap_or(0),
                            _ => 0,
                        };
                        SerializedValue::Mapping {
                            entries: object
                                .into_iter()
                                .map(|(key, value)| (key, SerializedValue::from(value)))
                                .collect(),
                            overflow,
                        }
                    }
                }
            }
        }
    }
}

fn decode_items(mut items: Vec<serde_json::Value>) -> (Vec<SerializedValue>, usize) {
    let overflow = match items.last() {
        Some(serde_json::Value::String(marker)) => parse_overflow_marker(marker),
        _ => None,
    };
    if overflow.is_some() {
        items.pop();
    }
    (
        items.into_iter().map(SerializedValue::from).collect(),
        overflow.unwrap_or(0),
    )
}

fn decode_marker(text: String) -> SerializedValue {
    if text == ELLIPSIS {
        return SerializedValue::Ellipsis;
    }
    if text == UNSERIALIZABLE {
        return SerializedValue::Unserializable;
    }
    let opaque = text
        .strip_prefix('<')
        .and_then(|rest| rest.strip_suffix('>'))
        .filter(|name| !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_'));
    match opaque {
        Some(name) => SerializedValue::Opaque {
            type_name: name.to_string(),
        },
        None => SerializedValue::Str(text),
    }
}

/// Python-like rendering for display
impl fmt::Display for SerializedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializedValue::None => write!(f, "None"),
            SerializedValue::Bool(true) => write!(f, "True"),
            SerializedValue::Bool(false) => write!(f, "False"),
            SerializedValue::Int(n) => write!(f, "{}", n),
            SerializedValue::Float(x) => write!(f, "{}", crate::memory::value::format_float(*x)),
            SerializedValue::Str(text) => write!(f, "{}", crate::memory::value::quote_str(text)),
            SerializedValue::Sequence {
                tag,
                items,
                overflow,
            } => {
                let (open, close) = match tag {
                    None => ("[", "]"),
                    Some(SequenceTag::Tuple) => ("(", ")"),
                    Some(SequenceTag::Set) => ("{", "}"),
                };
                write!(f, "{}", open)?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                if *overflow > 0 {
                    write!(f, ", {}", overflow_marker(*overflow))?;
                }
                if *tag == Some(SequenceTag::Tuple) && items.len() == 1 && *overflow == 0 {
                    write!(f, ",")?;
                }
                write!(f, "{}", close)
            }
            SerializedValue::Mapping { entries, overflow } => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                if *overflow > 0 {
                    write!(f, ", {}", overflow_marker(*overflow))?;
                }
                write!(f, "}}")
            }
            SerializedValue::Ellipsis => write!(f, "{}", ELLIPSIS),
            SerializedValue::OpaqueText { text, .. } => write!(f, "{}", text),
            SerializedValue::Opaque { type_name } => write!(f, "<{}>", type_name),
            SerializedValue::Unserializable => write!(f, "{}", UNSERIALIZABLE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::errors::ExceptionKind;
    use crate::memory::value::{DictMap, ExceptionObject, RangeValue, SetMap};
    use proptest::prelude::*;
    use serde_json::json;

    fn ints(range: std::ops::Range<i64>) -> Value {
        Value::list(range.map(Value::Int).collect())
    }

    fn to_json(value: &Value) -> serde_json::Value {
        serde_json::to_value(serialize_value(value)).unwrap()
    }

    #[test]
    fn test_primitives_pass_through() {
        assert_eq!(to_json(&Value::Int(3)), json!(3));
        assert_eq!(to_json(&Value::Float(2.5)), json!(2.5));
        assert_eq!(to_json(&Value::Bool(true)), json!(true));
        assert_eq!(to_json(&Value::None), json!(null));
        assert_eq!(to_json(&Value::Float(f64::INFINITY)), json!("inf"));
    }

    #[test]
    fn test_collection_overflow_marker() {
        assert_eq!(
            to_json(&ints(0..12)),
            json!([0, 1, 2, 3, 4, 5, 6, 7, 8, 9, "...(+2)"])
        );
        assert_eq!(to_json(&ints(0..3)), json!([0, 1, 2]));
    }

    #[test]
    fn test_tuple_and_set_are_tagged() {
        let tuple = Value::tuple(vec![Value::Int(1), Value::str("a")]);
        assert_eq!(to_json(&tuple), json!({"__type": "tuple", "items": [1, "a"]}));

        let mut members = SetMap::default();
        members.insert(Value::Int(7).hash_key().unwrap(), Value::Int(7));
        let set = Value::set(members);
        assert_eq!(to_json(&set), json!({"__type": "set", "items": [7]}));
    }

    #[test]
    fn test_dict_keys_become_text() {
        let mut map = DictMap::default();
        for n in 0..12 {
            let key = Value::Int(n);
            map.insert(key.hash_key().unwrap(), (key, Value::Int(n * n)));
        }
        let json = to_json(&Value::dict(map));
        assert_eq!(json["3"], json!(9));
        assert_eq!(json["__more"], json!("...(+2)"));
        assert_eq!(json.as_object().unwrap().len(), 11);
    }

    #[test]
    fn test_depth_cutoff() {
        let nested = Value::list(vec![Value::list(vec![Value::list(vec![Value::list(vec![
            Value::Int(1),
        ])])])]);
        assert_eq!(to_json(&nested), json!([[["..."]]]));
    }

    #[test]
    fn test_string_truncation() {
        let long = "x".repeat(60);
        let SerializedValue::Str(text) = serialize_value(&Value::str(long)) else {
            panic!("expected a string");
        };
        assert_eq!(text.chars().count(), 53);
        assert!(text.ends_with("..."));
    }

    #[test]
    fn test_opaque_values() {
        let range = Value::Range(RangeValue {
            start: 0,
            stop: 3,
            step: 1,
        });
        assert_eq!(to_json(&range), json!({"__type": "range", "repr": "range(0, 3)"}));
        assert_eq!(to_json(&Value::ExceptionType(ExceptionKind::ValueError)), json!("<type>"));

        let exc = Value::Exception(Rc::new(ExceptionObject::with_message(
            ExceptionKind::ValueError,
            "bad",
        )));
        assert_eq!(to_json(&exc)["__type"], json!("ValueError"));
    }

    #[test]
    fn test_borrowed_container_is_unserializable() {
        let list = ints(0..2);
        let Value::List(items) = &list else { unreachable!() };
        let _guard = items.borrow_mut();
        assert_eq!(serialize_value(&list), SerializedValue::Unserializable);
    }

    #[test]
    fn test_self_referencing_list_terminates() {
        let list = ints(0..1);
        if let Value::List(items) = &list {
            items.borrow_mut().push(list.clone());
        }
        // Everything below the depth bound is cut, primitives included.
        assert_eq!(to_json(&list), json!([0, [0, ["...", "..."]]]));
    }

    #[test]
    fn test_json_decodes_back_for_display() {
        let value = Value::tuple(vec![Value::str("a"), ints(0..11)]);
        let json = serde_json::to_string(&serialize_value(&value)).unwrap();
        let decoded: SerializedValue = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.to_string(), "('a', [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, ...(+1)])");
    }

    fn str_key(name: &str) -> (crate::memory::value::HashKey, Value) {
        let key = Value::str(name);
        (key.hash_key().unwrap(), key)
    }

    /// A dict holding `value` and itself
    fn cyclic_dict(value: Value) -> Value {
        let dict = Value::dict(DictMap::default());
        if let Value::Dict(map) = &dict {
            let mut map = map.borrow_mut();
            for (name, entry) in [("value", value), ("self", dict.clone())] {
                let (hash, key) = str_key(name);
                map.insert(hash, (key, entry));
            }
        }
        dict
    }

    fn cyclic_list(items: Vec<Value>) -> Value {
        let list = Value::list(items);
        if let Value::List(items) = &list {
            items.borrow_mut().push(list.clone());
        }
        list
    }

    fn set_of(members: Vec<i64>) -> Value {
        let mut set = SetMap::default();
        for n in members {
            let member = Value::Int(n);
            set.insert(member.hash_key().unwrap(), member);
        }
        Value::set(set)
    }

    fn arb_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            any::<i64>().prop_map(Value::Int),
            any::<f64>().prop_map(Value::Float),
            any::<bool>().prop_map(Value::Bool),
            ".{0,80}".prop_map(|text: String| Value::str(text)),
            Just(Value::None),
            prop::collection::vec(any::<i64>(), 0..16).prop_map(set_of),
        ];
        leaf.prop_recursive(5, 64, 16, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..16).prop_map(Value::list),
                prop::collection::vec(inner.clone(), 0..16).prop_map(Value::tuple),
                prop::collection::vec(inner.clone(), 0..4).prop_map(cyclic_list),
                inner.prop_map(cyclic_dict),
            ]
        })
    }

    /// Container nesting of the JSON form; tagged tuples and sets count once
    fn depth_of(json: &serde_json::Value) -> usize {
        match json {
            serde_json::Value::Array(items) => 1 + items.iter().map(depth_of).max().unwrap_or(0),
            serde_json::Value::Object(map) => match (map.get(TYPE_KEY), map.get(ITEMS_KEY)) {
                (Some(_), Some(items)) => depth_of(items),
                (Some(_), None) => 0,
                _ => 1 + map.values().map(depth_of).max().unwrap_or(0),
            },
            _ => 0,
        }
    }

    #[test]
    fn test_depth_metric_counts_tagged_sequences_once() {
        let nested = Value::tuple(vec![Value::tuple(Vec::new())]);
        assert_eq!(depth_of(&to_json(&nested)), 2);
        assert_eq!(depth_of(&to_json(&cyclic_dict(Value::Int(1)))), MAX_DEPTH + 1);
    }

    proptest! {
        #[test]
        fn prop_breadth_is_bounded(len in 0usize..40) {
            let json = to_json(&ints(0..len as i64));
            let items = json.as_array().unwrap();
            if len > MAX_COLLECTION_SIZE {
                prop_assert_eq!(items.len(), MAX_COLLECTION_SIZE + 1);
                prop_assert_eq!(items[MAX_COLLECTION_SIZE].clone(), json!(format!("...(+{})", len - MAX_COLLECTION_SIZE)));
            } else {
                prop_assert_eq!(items.len(), len);
            }
        }

        #[test]
        fn prop_strings_are_bounded(text in ".{0,120}") {
            let SerializedValue::Str(out) = serialize_value(&Value::str(text.as_str())) else {
                panic!("expected a string");
            };
            let len = text.chars().count();
            if len > MAX_STRING_LENGTH {
                prop_assert_eq!(out.chars().count(), MAX_STRING_LENGTH + 3);
            } else {
                prop_assert_eq!(out, text);
            }
        }

        #[test]
        fn prop_serialization_is_total_and_shallow(value in arb_value()) {
            let json = to_json(&value);
            prop_assert!(serde_json::to_string(&json).is_ok());
            prop_assert!(depth_of(&json) <= MAX_DEPTH + 1);
        }
    }
}
