//! The path-carrying decode wrapper.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{self, Deserialize, Deserializer, MapAccess, Visitor};
use tracing::trace;

use crate::de::{TRACKED_FIELDS, TRACKED_PATH, TRACKED_TOKEN, TRACKED_VALUE};
use crate::failure::{DecodingFailure, FailureKind};
use crate::outcome::{no_value_of, Nullable, Outcome};
use crate::path::Path;
use crate::result::{reject, resolve, DecodeResult};
use crate::scope;

/// A decode result together with the path it was decoded at.
///
/// Use it as a field type to keep decoding past a bad field and to tell an
/// absent key from an explicit `null`:
///
/// ```
/// use json_decoded::{Outcome, Path, Tracked};
///
/// #[derive(serde::Deserialize)]
/// struct Optionals {
///     a: Tracked<Option<i32>>,
///     b: Tracked<Option<i32>>,
///     c: Tracked<Option<i32>>,
/// }
///
/// let doc: Optionals = json_decoded::from_str(r#"{"a": 1, "b": null}"#).unwrap();
/// assert_eq!(doc.a.result(), &Ok(Outcome::Value(Some(1))));
/// assert_eq!(doc.b.result(), &Ok(Outcome::Null));
/// assert_eq!(doc.c.result(), &Ok(Outcome::Absent));
/// assert_eq!(doc.c.path(), &Path::from_steps(["c"]));
/// ```
///
/// Tracked values only capture paths when decoded through this crate's entry
/// points ([`from_str`](crate::from_str) and friends, or [`Node`](crate::Node)).
///
/// Inside an internally tagged (`#[serde(tag = "...")]`) or `#[serde(untagged)]`
/// enum, and under `#[serde(flatten)]`, serde buffers the input before the
/// wrapper sees it. The path handshake cannot cross that buffer, so the
/// wrapper fails to decode there: a plain decode call aborts with
/// [`Error::Decode`](crate::Error::Decode), and an enclosing `Tracked` records
/// the whole enum as a failure. Externally tagged enums are fine.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tracked<T> {
    path: Path,
    result: DecodeResult<T>,
}

impl<T> Tracked<T> {
    pub fn new(path: Path, result: DecodeResult<T>) -> Self {
        Self { path, result }
    }

    /// Build from a raw decoder error via the decision table. Unclassified
    /// errors come back untouched.
    pub fn from_raw<E: fmt::Display>(path: Path, raw: E) -> Result<Self, E>
    where
        T: Nullable,
    {
        let result = resolve::<T, E>(raw, &path)?;
        Ok(Self { path, result })
    }

    /// Shorthand for a failure of `kind` at `path`.
    pub fn failed(path: Path, kind: FailureKind, message: impl Into<String>) -> Self {
        let failure = DecodingFailure::new(kind, path.clone(), message);
        Self::new(path, Err(failure))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn result(&self) -> &DecodeResult<T> {
        &self.result
    }

    pub fn into_result(self) -> DecodeResult<T> {
        self.result
    }

    pub fn into_parts(self) -> (Path, DecodeResult<T>) {
        (self.path, self.result)
    }

    pub fn outcome(&self) -> Option<&Outcome<T>> {
        self.result.as_ref().ok()
    }

    pub fn failure(&self) -> Option<&DecodingFailure> {
        self.result.as_ref().err()
    }

    /// The decoded value; `None` for absent, null and failed fields.
    pub fn value(&self) -> Option<&T> {
        self.outcome().and_then(Outcome::value)
    }

    pub fn is_failure(&self) -> bool {
        self.result.is_err()
    }

    /// Transform: derive a plain value from the decoded one.
    ///
    /// The result keeps this wrapper's path, since a derived value has no
    /// path of its own. A failure is carried over without calling `f`.
    pub fn map<U>(&self, f: impl FnOnce(&T) -> U) -> Tracked<U>
    where
        T: Nullable,
    {
        match &self.result {
            Err(failure) => Tracked::new(self.path.clone(), Err(failure.clone())),
            Ok(outcome) => Tracked::new(self.path.clone(), Ok(Outcome::Value(with_value(outcome, f)))),
        }
    }

    /// Compose: step into a sub-field that was tracked when it was decoded.
    ///
    /// On success the sub-field comes back as it is, with the path it was
    /// decoded at. A failure is carried over, under this wrapper's path,
    /// without calling `f`.
    ///
    /// `f` has to hand back a borrow, so it cannot compose through a parent
    /// such as `Option<Address>` that may hold no sub-field at all. Use
    /// [`and_then_with`](Self::and_then_with) there.
    pub fn and_then<U: Clone>(&self, f: impl FnOnce(&T) -> &Tracked<U>) -> Tracked<U>
    where
        T: Nullable,
    {
        self.and_then_with(|value| f(value).clone())
    }

    /// Compose with an accessor that returns an owned wrapper.
    ///
    /// Same failure passthrough as [`and_then`](Self::and_then). The
    /// accessor decides what a missing sub-field means:
    ///
    /// ```
    /// use json_decoded::{Outcome, Tracked};
    ///
    /// #[derive(Clone, serde::Deserialize)]
    /// struct Address {
    ///     city: Tracked<String>,
    /// }
    ///
    /// #[derive(serde::Deserialize)]
    /// struct Customer {
    ///     address: Tracked<Option<Address>>,
    /// }
    ///
    /// let customer: Customer = json_decoded::from_str(r#"{"address": null}"#).unwrap();
    /// let city = customer.address.and_then_with(|address| match address {
    ///     Some(address) => address.city.map(|city| Some(city.clone())),
    ///     None => Tracked::new(customer.address.path().join("city"), Ok(Outcome::Absent)),
    /// });
    /// assert_eq!(city.result(), &Ok(Outcome::Absent));
    /// ```
    pub fn and_then_with<U>(&self, f: impl FnOnce(&T) -> Tracked<U>) -> Tracked<U>
    where
        T: Nullable,
    {
        match &self.result {
            Err(failure) => Tracked::new(self.path.clone(), Err(failure.clone())),
            Ok(outcome) => with_value(outcome, f),
        }
    }
}

/// Run `f` on the carried value, or on `T`'s no-value representation.
fn with_value<T: Nullable, R>(outcome: &Outcome<T>, f: impl FnOnce(&T) -> R) -> R {
    match outcome {
        Outcome::Value(value) => f(value),
        Outcome::Absent | Outcome::Null => f(&no_value_of::<T>()),
    }
}

// ————————————————————————————————————————————————————————————————————————————
// SERDE
// ————————————————————————————————————————————————————————————————————————————

impl<'de, T> Deserialize<'de> for Tracked<T>
where
    T: Deserialize<'de> + Nullable,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match deserializer.deserialize_struct(TRACKED_TOKEN, TRACKED_FIELDS, TrackedVisitor(PhantomData)) {
            Ok(tracked) => Ok(tracked),
            Err(raw) => missing_field(raw),
        }
    }
}

/// serde reports a field missing from a struct through its own stand-in
/// deserializer, which fails with `missing field`. The path comes from the
/// struct being visited.
fn missing_field<T: Nullable, E: de::Error>(raw: E) -> Result<Tracked<T>, E> {
    let message = raw.to_string();
    let Some(key) = message.strip_prefix("missing field `").and_then(|rest| rest.strip_suffix('`')) else {
        return Err(raw);
    };
    let Some(container) = scope::current_container() else {
        return Err(raw);
    };
    let path = container.join(key);
    trace!(path = %path, "tracked field missing from its container");
    Tracked::from_raw(path, raw)
}

struct TrackedVisitor<T>(PhantomData<T>);

impl<'de, T> Visitor<'de> for TrackedVisitor<T>
where
    T: Deserialize<'de> + Nullable,
{
    type Value = Tracked<T>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a tracked value")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Tracked<T>, A::Error> {
        if map.next_key::<String>()?.as_deref() != Some(TRACKED_PATH) {
            return Err(de::Error::custom(
                "tracked values can only be decoded through json_decoded's path-aware deserializer",
            ));
        }
        let path: Path = map.next_value()?;

        if map.next_key::<String>()?.as_deref() != Some(TRACKED_VALUE) {
            return Err(de::Error::missing_field(TRACKED_VALUE));
        }
        // a null here is already `Outcome::Null`; any error comes from inside
        // a value that is present
        let result = match map.next_value::<Outcome<T>>() {
            Ok(outcome) => Ok(outcome),
            Err(raw) => reject::<T, _>(raw, &path)?,
        };
        Ok(Tracked::new(path, result))
    }
}

// ------------------------------- Tests ------------------------------------ //
