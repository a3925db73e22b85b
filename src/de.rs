//! Path-aware deserializer over a parsed JSON tree.
//!
//! [`Node`] is a `serde::Deserializer` for a borrowed `serde_json::Value` that
//! knows where in the document it sits. Scalars are decoded by `serde_json`'s
//! own `&Value` deserializer; objects, arrays and enum variants are walked
//! here so that every child gets its own path.
//!
//! [`Tracked`] fields find their path through a private struct name: when a
//! `Node` is asked for that struct it answers with a two-entry map holding the
//! path and the value, instead of the value's own contents.

use serde::de::value::BorrowedStrDeserializer;
use serde::de::{
    self, Deserialize, DeserializeSeed, Deserializer, EnumAccess, MapAccess, SeqAccess, Unexpected,
    VariantAccess, Visitor,
};
use serde::forward_to_deserialize_any;
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::outcome::Nullable;
use crate::path::{Path, PathSegment};
use crate::result::resolve;
use crate::scope;
use crate::tracked::Tracked;

pub(crate) const TRACKED_TOKEN: &str = "$__json_decoded_private_Tracked";
pub(crate) const TRACKED_PATH: &str = "$__json_decoded_private_path";
pub(crate) const TRACKED_VALUE: &str = "$__json_decoded_private_value";
pub(crate) const TRACKED_FIELDS: &[&str] = &[TRACKED_PATH, TRACKED_VALUE];

/// Error type raised while walking a tree; the raw decoder error.
type RawError = serde_json::Error;

// ————————————————————————————————————————————————————————————————————————————
// NODE
// ————————————————————————————————————————————————————————————————————————————

/// A value inside a JSON document, together with its path.
#[derive(Debug, Clone)]
pub struct Node<'a> {
    value: &'a Value,
    path: Path,
}

impl<'a> Node<'a> {
    pub fn root(value: &'a Value) -> Self {
        Self { value, path: Path::root() }
    }

    pub fn new(value: &'a Value, path: Path) -> Self {
        Self { value, path }
    }

    pub fn value(&self) -> &'a Value {
        self.value
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The child at `segment`, if this node is a container holding it.
    pub fn child(&self, segment: &PathSegment) -> Option<Node<'a>> {
        let value = match (segment, self.value) {
            (PathSegment::Key(key), Value::Object(map)) => map.get(key)?,
            (PathSegment::Index(index), Value::Array(items)) => items.get(*index)?,
            _ => return None,
        };
        Some(Node::new(value, self.path.join(segment.clone())))
    }

    /// Decode this node as any `T`. Tracked values inside `T` capture their
    /// own failures; anything else that fails aborts with [`Error::Decode`].
    pub fn decode_as<T: Deserialize<'a>>(self) -> Result<T> {
        let session = scope::Session::begin();
        let fallback = self.path.clone();
        T::deserialize(self).map_err(|source| {
            let path = session.failure_location().unwrap_or(fallback);
            debug!(path = %path, error = %source, "decode aborted by an unabsorbed error");
            Error::Decode { path, source }
        })
    }

    /// Decode this node as a tracked `T` at its own path.
    pub fn decode<T>(self) -> Result<Tracked<T>>
    where
        T: Deserialize<'a> + Nullable,
    {
        self.decode_as()
    }

    /// Decode the value under `key` of this object.
    pub fn field<T>(&self, key: &str) -> Result<Tracked<T>>
    where
        T: Deserialize<'a> + Nullable,
    {
        self.step(&PathSegment::key(key))
    }

    /// Decode the element at `index` of this array.
    pub fn element<T>(&self, index: usize) -> Result<Tracked<T>>
    where
        T: Deserialize<'a> + Nullable,
    {
        self.step(&PathSegment::Index(index))
    }

    /// Decode the child at `segment`. A missing child, or a node that is not
    /// the right kind of container, goes through the decision table like any
    /// other raw failure.
    pub fn step<T>(&self, segment: &PathSegment) -> Result<Tracked<T>>
    where
        T: Deserialize<'a> + Nullable,
    {
        if let Some(child) = self.child(segment) {
            return child.decode();
        }
        let path = self.path.join(segment.clone());
        match resolve::<T, _>(self.lookup_error(segment), &path) {
            Ok(result) => Ok(Tracked::new(path, result)),
            Err(source) => Err(Error::Decode { path, source }),
        }
    }

    fn lookup_error(&self, segment: &PathSegment) -> RawError {
        match (segment, self.value) {
            (PathSegment::Key(key), Value::Object(_)) => {
                de::Error::custom(format_args!("missing field `{key}`"))
            }
            (PathSegment::Index(index), Value::Array(items)) => de::Error::custom(format_args!(
                "missing element at index {index} of an array of length {}",
                items.len()
            )),
            (PathSegment::Key(_), other) => de::Error::invalid_type(unexpected(other), &"an object"),
            (PathSegment::Index(_), other) => de::Error::invalid_type(unexpected(other), &"an array"),
        }
    }

    /// Keep the failure-location slot in step with this call's result.
    fn locate<R>(&self, result: std::result::Result<R, RawError>) -> std::result::Result<R, RawError> {
        match &result {
            Ok(_) => scope::clear_failure(),
            Err(_) => scope::note_failure(&self.path),
        }
        result
    }

    fn visit_array<'de, V: Visitor<'de>>(
        &self,
        items: &'de [Value],
        visitor: V,
    ) -> std::result::Result<V::Value, RawError> {
        let mut access = ArrayAccess { items: items.iter().enumerate(), path: &self.path };
        let out = visitor.visit_seq(&mut access)?;
        if access.items.len() == 0 {
            Ok(out)
        } else {
            Err(de::Error::invalid_length(items.len(), &"fewer elements in array"))
        }
    }

    fn visit_object<'de, V: Visitor<'de>>(
        &self,
        map: &'de serde_json::Map<String, Value>,
        visitor: V,
    ) -> std::result::Result<V::Value, RawError> {
        let mut access = ObjectAccess { entries: map.iter(), pending: None, path: &self.path };
        let out = visitor.visit_map(&mut access)?;
        if access.entries.len() == 0 {
            Ok(out)
        } else {
            Err(de::Error::invalid_length(map.len(), &"fewer elements in map"))
        }
    }
}

fn unexpected(value: &Value) -> Unexpected<'_> {
    match value {
        Value::Null => Unexpected::Unit,
        Value::Bool(b) => Unexpected::Bool(*b),
        Value::Number(n) => match (n.as_u64(), n.as_i64(), n.as_f64()) {
            (Some(u), _, _) => Unexpected::Unsigned(u),
            (_, Some(i), _) => Unexpected::Signed(i),
            (_, _, Some(f)) => Unexpected::Float(f),
            _ => Unexpected::Other("number"),
        },
        Value::String(s) => Unexpected::Str(s),
        Value::Array(_) => Unexpected::Seq,
        Value::Object(_) => Unexpected::Map,
    }
}

// ————————————————————————————————————————————————————————————————————————————
// DESERIALIZER
// ————————————————————————————————————————————————————————————————————————————

// scalars never nest, so serde_json's own `&Value` deserializer does the work
macro_rules! forward_to_value {
    ($($method:ident)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> std::result::Result<V::Value, RawError> {
                let result = self.value.$method(visitor);
                self.locate(result)
            }
        )*
    };
}

impl<'de> Deserializer<'de> for Node<'de> {
    type Error = RawError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> std::result::Result<V::Value, RawError> {
        let result = match self.value {
            Value::Array(items) => self.visit_array(items, visitor),
            Value::Object(map) => self.visit_object(map, visitor),
            scalar => scalar.deserialize_any(visitor),
        };
        self.locate(result)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> std::result::Result<V::Value, RawError> {
        if self.value.is_null() {
            let result = visitor.visit_none();
            return self.locate(result);
        }
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> std::result::Result<V::Value, RawError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> std::result::Result<V::Value, RawError> {
        let result = self.value.deserialize_unit_struct(name, visitor);
        self.locate(result)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> std::result::Result<V::Value, RawError> {
        let result = match self.value {
            Value::Array(items) => self.visit_array(items, visitor),
            other => other.deserialize_seq(visitor),
        };
        self.locate(result)
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> std::result::Result<V::Value, RawError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> std::result::Result<V::Value, RawError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> std::result::Result<V::Value, RawError> {
        let result = match self.value {
            Value::Object(map) => self.visit_object(map, visitor),
            other => other.deserialize_map(visitor),
        };
        self.locate(result)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> std::result::Result<V::Value, RawError> {
        if name == TRACKED_TOKEN {
            let access = TrackedAccess { value: self.value, path: self.path.clone(), step: TrackedStep::Path };
            let result = visitor.visit_map(access);
            return self.locate(result);
        }
        let result = match self.value {
            Value::Object(map) => {
                let _container = scope::enter_container(&self.path);
                self.visit_object(map, visitor)
            }
            Value::Array(items) => self.visit_array(items, visitor),
            other => other.deserialize_struct(name, fields, visitor),
        };
        self.locate(result)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> std::result::Result<V::Value, RawError> {
        let result = match self.value {
            Value::String(variant) => visitor.visit_enum(BorrowedStrDeserializer::<RawError>::new(variant)),
            Value::Object(map) => match (map.len(), map.iter().next()) {
                (1, Some((variant, value))) => visitor.visit_enum(VariantNode {
                    variant,
                    node: Node::new(value, self.path.join(variant.as_str())),
                }),
                _ => Err(de::Error::invalid_value(Unexpected::Map, &"map with a single key")),
            },
            other => Err(de::Error::invalid_type(unexpected(other), &"string or map")),
        };
        self.locate(result)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> std::result::Result<V::Value, RawError> {
        let result = visitor.visit_unit();
        self.locate(result)
    }

    forward_to_value! {
        deserialize_bool
        deserialize_i8 deserialize_i16 deserialize_i32 deserialize_i64 deserialize_i128
        deserialize_u8 deserialize_u16 deserialize_u32 deserialize_u64 deserialize_u128
        deserialize_f32 deserialize_f64
        deserialize_char deserialize_str deserialize_string
        deserialize_bytes deserialize_byte_buf
        deserialize_unit deserialize_identifier
    }
}

// ————————————————————————————————————————————————————————————————————————————
// ACCESSORS
// ————————————————————————————————————————————————————————————————————————————

struct ArrayAccess<'de, 'p> {
    items: std::iter::Enumerate<std::slice::Iter<'de, Value>>,
    path: &'p Path,
}

impl<'de> SeqAccess<'de> for ArrayAccess<'de, '_> {
    type Error = RawError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> std::result::Result<Option<T::Value>, RawError> {
        match self.items.next() {
            Some((index, value)) => seed.deserialize(Node::new(value, self.path.join(index))).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.items.len())
    }
}

struct ObjectAccess<'de, 'p> {
    entries: serde_json::map::Iter<'de>,
    pending: Option<(&'de str, &'de Value)>,
    path: &'p Path,
}

impl<'de> MapAccess<'de> for ObjectAccess<'de, '_> {
    type Error = RawError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> std::result::Result<Option<K::Value>, RawError> {
        match self.entries.next() {
            Some((key, value)) => {
                self.pending = Some((key.as_str(), value));
                seed.deserialize(KeyDeserializer { key }).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> std::result::Result<V::Value, RawError> {
        match self.pending.take() {
            Some((key, value)) => seed.deserialize(Node::new(value, self.path.join(key))),
            None => Err(de::Error::custom("map value requested before its key")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.entries.len())
    }
}

enum TrackedStep {
    Path,
    Value,
    Done,
}

/// The two-entry map a `Tracked` visitor sees: its path, then its value.
struct TrackedAccess<'de> {
    value: &'de Value,
    path: Path,
    step: TrackedStep,
}

impl<'de> MapAccess<'de> for TrackedAccess<'de> {
    type Error = RawError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> std::result::Result<Option<K::Value>, RawError> {
        let key = match self.step {
            TrackedStep::Path => TRACKED_PATH,
            TrackedStep::Value => TRACKED_VALUE,
            TrackedStep::Done => return Ok(None),
        };
        seed.deserialize(BorrowedStrDeserializer::<RawError>::new(key)).map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> std::result::Result<V::Value, RawError> {
        match self.step {
            TrackedStep::Path => {
                self.step = TrackedStep::Value;
                seed.deserialize(serde_json::to_value(&self.path)?)
            }
            TrackedStep::Value => {
                self.step = TrackedStep::Done;
                seed.deserialize(Node::new(self.value, std::mem::take(&mut self.path)))
            }
            TrackedStep::Done => Err(de::Error::custom("tracked value read twice")),
        }
    }
}

/// Object keys; integer-keyed maps parse them.
struct KeyDeserializer<'de> {
    key: &'de str,
}

macro_rules! parse_key {
    ($($method:ident => $visit:ident)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> std::result::Result<V::Value, RawError> {
                match self.key.parse() {
                    Ok(number) => visitor.$visit(number),
                    Err(_) => Err(de::Error::invalid_value(Unexpected::Str(self.key), &visitor)),
                }
            }
        )*
    };
}

impl<'de> Deserializer<'de> for KeyDeserializer<'de> {
    type Error = RawError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> std::result::Result<V::Value, RawError> {
        visitor.visit_borrowed_str(self.key)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> std::result::Result<V::Value, RawError> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> std::result::Result<V::Value, RawError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> std::result::Result<V::Value, RawError> {
        visitor.visit_enum(BorrowedStrDeserializer::<RawError>::new(self.key))
    }

    parse_key! {
        deserialize_i8 => visit_i8
        deserialize_i16 => visit_i16
        deserialize_i32 => visit_i32
        deserialize_i64 => visit_i64
        deserialize_u8 => visit_u8
        deserialize_u16 => visit_u16
        deserialize_u32 => visit_u32
        deserialize_u64 => visit_u64
    }

    forward_to_deserialize_any! {
        bool i128 u128 f32 f64 char str string bytes byte_buf unit unit_struct
        seq tuple tuple_struct map struct identifier ignored_any
    }
}

/// An externally tagged variant `{"Variant": value}`.
struct VariantNode<'de> {
    variant: &'de str,
    node: Node<'de>,
}

impl<'de> EnumAccess<'de> for VariantNode<'de> {
    type Error = RawError;
    type Variant = Node<'de>;

    fn variant_seed<V: DeserializeSeed<'de>>(self, seed: V) -> std::result::Result<(V::Value, Node<'de>), RawError> {
        let variant = seed.deserialize(KeyDeserializer { key: self.variant })?;
        Ok((variant, self.node))
    }
}

impl<'de> VariantAccess<'de> for Node<'de> {
    type Error = RawError;

    fn unit_variant(self) -> std::result::Result<(), RawError> {
        <()>::deserialize(self)
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> std::result::Result<T::Value, RawError> {
        seed.deserialize(self)
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> std::result::Result<V::Value, RawError> {
        Deserializer::deserialize_seq(self, visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        fields: &'static [&'static str],
        visitor: V,
    ) -> std::result::Result<V::Value, RawError> {
        Deserializer::deserialize_struct(self, "", fields, visitor)
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::FailureKind;
    use crate::outcome::Outcome;
    use serde::Deserialize;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[derive(Debug, Deserialize)]
    enum Shape {
        Circle { radius: Tracked<f64> },
        Square(Tracked<u32>),
        Empty,
    }

    #[test]
    fn array_elements_carry_their_index() {
        let doc = json!(["a", null, 3]);
        let items: Vec<Tracked<Option<String>>> = Node::root(&doc).decode_as().unwrap();

        assert_eq!(items[0].path(), &Path::from_steps([0usize]));
        assert_eq!(items[0].result(), &Ok(Outcome::Value(Some("a".to_owned()))));
        assert_eq!(items[1].result(), &Ok(Outcome::Null));
        let failure = items[2].failure().unwrap();
        assert_eq!(failure.kind(), FailureKind::TypeMismatch);
        assert_eq!(failure.path(), &Path::from_steps([2usize]));
    }

    #[test]
    fn map_values_carry_their_key() {
        let doc = json!({"x": 1, "y": "two"});
        let values: BTreeMap<String, Tracked<i64>> = Node::root(&doc).decode_as().unwrap();
        assert_eq!(values["x"].path(), &Path::from_steps(["x"]));
        assert_eq!(values["x"].value(), Some(&1));
        assert_eq!(values["y"].failure().map(|f| f.kind()), Some(FailureKind::TypeMismatch));
    }

    #[test]
    fn integer_keys_are_parsed() {
        let doc = json!({"7": "seven"});
        let values: BTreeMap<u32, Tracked<String>> = Node::root(&doc).decode_as().unwrap();
        assert_eq!(values[&7].path(), &Path::from_steps(["7"]));
    }

    #[test]
    fn enum_variants_extend_the_path() {
        let doc = json!([{"Circle": {"radius": "wide"}}, {"Square": 4}, "Empty"]);
        let shapes: Vec<Shape> = Node::root(&doc).decode_as().unwrap();

        let Shape::Circle { radius } = &shapes[0] else { panic!("expected a circle") };
        assert_eq!(radius.path(), &Path::from_steps([PathSegment::index(0), "Circle".into(), "radius".into()]));
        assert_eq!(radius.failure().map(|f| f.kind()), Some(FailureKind::TypeMismatch));

        let Shape::Square(side) = &shapes[1] else { panic!("expected a square") };
        assert_eq!(side.path(), &Path::from_steps([PathSegment::index(1), "Square".into()]));
        assert_eq!(side.value(), Some(&4));

        assert!(matches!(shapes[2], Shape::Empty));
    }

    #[test]
    fn container_lookups_classify_missing_children() {
        let doc = json!({"items": [1], "none": null, "n": 5});
        let root = Node::root(&doc);

        let absent: Tracked<Option<i32>> = root.field("missing").unwrap();
        assert_eq!(absent.result(), &Ok(Outcome::Absent));
        assert_eq!(absent.path(), &Path::from_steps(["missing"]));

        let items = root.child(&PathSegment::key("items")).unwrap();
        let past_end: Tracked<i32> = items.element(3).unwrap();
        assert_eq!(past_end.failure().map(|f| f.kind()), Some(FailureKind::KeyNotFound));
        assert_eq!(past_end.path(), &Path::from_steps([PathSegment::key("items"), PathSegment::index(3)]));

        let in_scalar: Tracked<i32> = root.child(&PathSegment::key("n")).unwrap().field("x").unwrap();
        assert_eq!(in_scalar.failure().map(|f| f.kind()), Some(FailureKind::TypeMismatch));

        let in_null: Tracked<i32> = root.child(&PathSegment::key("none")).unwrap().field("x").unwrap();
        assert_eq!(in_null.failure().map(|f| f.kind()), Some(FailureKind::ValueNotFound));
    }

    #[test]
    fn escaped_errors_are_located_at_the_innermost_node() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Inner {
            count: u8,
        }
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Outer {
            ok: Tracked<String>,
            inner: Vec<Inner>,
        }

        let doc = json!({"ok": 5, "inner": [{"count": 1}, {"count": "x"}]});
        let err = Node::root(&doc).decode_as::<Outer>().unwrap_err();
        assert_eq!(err.path(), Some(&Path::from_steps([PathSegment::key("inner"), 1usize.into(), "count".into()])));
    }

    #[test]
    fn nullable_values_keep_failures_found_inside_them() {
        let doc = json!({"bytes": [1, null], "none": null});
        let root = Node::root(&doc);

        let bytes: Tracked<Option<Vec<u8>>> = root.field("bytes").unwrap();
        assert_eq!(bytes.failure().map(|f| f.kind()), Some(FailureKind::ValueNotFound));
        assert_eq!(bytes.failure().map(|f| f.path()), Some(&Path::from_steps(["bytes"])));

        let none: Tracked<Option<Vec<u8>>> = root.field("none").unwrap();
        assert_eq!(none.result(), &Ok(Outcome::Null));
    }

    #[test]
    fn trailing_elements_are_rejected() {
        let doc = json!([1, 2, 3]);
        let tracked: Tracked<(u8, u8)> = Node::root(&doc).decode().unwrap();
        assert_eq!(tracked.failure().map(|f| f.kind()), Some(FailureKind::DataCorrupted));
    }
}
