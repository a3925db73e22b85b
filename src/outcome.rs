//! Successful decode states and the "no value" capability.

use std::any::type_name;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;
use std::marker::PhantomData;

use serde::de::{self, Deserialize, Deserializer, Visitor};

// ————————————————————————————————————————————————————————————————————————————
// CAPABILITY
// ————————————————————————————————————————————————————————————————————————————

/// Whether a type's domain includes a "no value" representation.
///
/// `Option<T>` has one (`None`); every other decodable type implements the
/// trait with the default body and has none. Decoding a missing key or a null
/// into a type without a representation is a failure, never an outcome.
///
/// ```
/// use json_decoded::Nullable;
///
/// #[derive(serde::Deserialize)]
/// struct Address {
///     city: String,
/// }
///
/// impl Nullable for Address {}
///
/// assert!(Option::<Address>::is_nullable());
/// assert!(!Address::is_nullable());
/// ```
pub trait Nullable: Sized {
    /// The "no value" representation, if the domain has one.
    fn no_value() -> Option<Self> {
        None
    }

    fn is_nullable() -> bool {
        Self::no_value().is_some()
    }
}

impl<T> Nullable for Option<T> {
    fn no_value() -> Option<Self> {
        Some(None)
    }
}

impl<T: Nullable> Nullable for Box<T> {
    fn no_value() -> Option<Self> {
        T::no_value().map(Box::new)
    }
}

macro_rules! without_no_value {
    ($($ty:ty),* $(,)?) => {
        $(impl Nullable for $ty {})*
    };
}

without_no_value!(
    bool, char, String, (),
    i8, i16, i32, i64, i128, isize,
    u8, u16, u32, u64, u128, usize,
    f32, f64,
    serde_json::Value, serde_json::Number, serde_json::Map<String, serde_json::Value>,
);

impl Nullable for &str {}
impl<T> Nullable for Vec<T> {}
impl<T> Nullable for VecDeque<T> {}
impl<T> Nullable for BTreeSet<T> {}
impl<T, S> Nullable for HashSet<T, S> {}
impl<K, V> Nullable for BTreeMap<K, V> {}
impl<K, V, S> Nullable for HashMap<K, V, S> {}
impl<K, V, S> Nullable for indexmap::IndexMap<K, V, S> {}
impl<T, const N: usize> Nullable for [T; N] {}
impl<A, B> Nullable for (A, B) {}
impl<A, B, C> Nullable for (A, B, C) {}

/// The no-value representation of `T`.
///
/// # Panics
/// When `T` has none. The decision table never produces `Absent` or `Null`
/// for such a type, so reaching this is a broken invariant.
pub(crate) fn no_value_of<T: Nullable>() -> T {
    match T::no_value() {
        Some(value) => value,
        None => panic!("`{}` has no \"no value\" representation", type_name::<T>()),
    }
}

// ————————————————————————————————————————————————————————————————————————————
// OUTCOME
// ————————————————————————————————————————————————————————————————————————————

/// The three ways a decode attempt can succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome<T> {
    /// The key was not present at all.
    Absent,
    /// The key was present with an explicit `null`.
    Null,
    /// A value was decoded.
    Value(T),
}

impl<T> Outcome<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn has_value(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    /// The decoded value, only for [`Outcome::Value`].
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Value(value) => Some(value),
            Self::Absent | Self::Null => None,
        }
    }

    pub fn as_ref(&self) -> Outcome<&T> {
        match self {
            Self::Absent => Outcome::Absent,
            Self::Null => Outcome::Null,
            Self::Value(value) => Outcome::Value(value),
        }
    }

    /// Map the carried value, keeping `Absent` and `Null` as they are.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Absent => Outcome::Absent,
            Self::Null => Outcome::Null,
            Self::Value(value) => Outcome::Value(f(value)),
        }
    }

    /// The value, with `Absent` and `Null` materialized as `T`'s no-value
    /// representation.
    ///
    /// # Panics
    /// If the state is `Absent` or `Null` and `T` has no such representation.
    pub fn into_value(self) -> T
    where
        T: Nullable,
    {
        match self {
            Self::Value(value) => value,
            Self::Absent | Self::Null => no_value_of::<T>(),
        }
    }
}

/// A present `null` becomes [`Outcome::Null`] when `T` is nullable; otherwise
/// `T` itself decides what a null means (usually an `invalid type` error).
/// A decoder never reports a key as absent here: that is the container's call.
impl<'de, T> Deserialize<'de> for Outcome<T>
where
    T: Deserialize<'de> + Nullable,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_option(OutcomeVisitor(PhantomData))
    }
}

struct OutcomeVisitor<T>(PhantomData<T>);

impl<T: Nullable> OutcomeVisitor<T> {
    fn null<'de, E: de::Error>(self) -> Result<Outcome<T>, E>
    where
        T: Deserialize<'de>,
    {
        if T::is_nullable() {
            return Ok(Outcome::Null);
        }
        T::deserialize(serde_json::Value::Null)
            .map(Outcome::Value)
            .map_err(E::custom)
    }
}

impl<'de, T> Visitor<'de> for OutcomeVisitor<T>
where
    T: Deserialize<'de> + Nullable,
{
    type Value = Outcome<T>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a `{}` or null", type_name::<T>())
    }

    fn visit_none<E: de::Error>(self) -> Result<Outcome<T>, E> {
        self.null()
    }

    fn visit_unit<E: de::Error>(self) -> Result<Outcome<T>, E> {
        self.null()
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Outcome<T>, D::Error> {
        T::deserialize(deserializer).map(Outcome::Value)
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accessors_follow_the_state() {
        let absent = Outcome::<Option<i32>>::Absent;
        let null = Outcome::<Option<i32>>::Null;
        let value = Outcome::Value(Some(4));

        assert!(absent.is_absent() && !absent.is_null() && !absent.has_value());
        assert!(null.is_null() && !null.has_value());
        assert_eq!(value.value(), Some(&Some(4)));
        assert_eq!(absent.value(), None);
    }

    #[test]
    fn missing_states_materialize_as_none() {
        assert_eq!(Outcome::<Option<String>>::Absent.into_value(), None);
        assert_eq!(Outcome::<Option<String>>::Null.into_value(), None);
        assert_eq!(Outcome::Value(Some("a".to_owned())).into_value(), Some("a".to_owned()));
        assert_eq!(Outcome::<Box<Option<u8>>>::Null.into_value(), Box::new(None));
    }

    #[test]
    #[should_panic(expected = "has no \"no value\" representation")]
    fn missing_state_of_a_plain_type_is_an_invariant_violation() {
        let _ = Outcome::<String>::Absent.into_value();
    }

    #[test]
    fn map_keeps_missing_states() {
        assert_eq!(Outcome::<i32>::Null.map(|n| n * 2), Outcome::Null);
        assert_eq!(Outcome::Value(3).map(|n| n * 2), Outcome::Value(6));
    }

    #[test]
    fn deserializes_null_by_nullability() {
        let nullable: Outcome<Option<String>> = serde_json::from_value(json!(null)).unwrap();
        assert_eq!(nullable, Outcome::Null);

        let plain = serde_json::from_value::<Outcome<String>>(json!(null)).unwrap_err();
        assert!(plain.to_string().starts_with("invalid type: "), "{plain}");

        // null is an ordinary value of a JSON tree
        let tree: Outcome<serde_json::Value> = serde_json::from_value(json!(null)).unwrap();
        assert_eq!(tree, Outcome::Value(serde_json::Value::Null));

        let some: Outcome<Option<String>> = serde_json::from_value(json!("a")).unwrap();
        assert_eq!(some, Outcome::Value(Some("a".to_owned())));
    }
}
