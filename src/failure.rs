//! Classified decode failures.
//!
//! Raw serde errors are opaque `Display` values. The decision table only needs
//! to know which of four classes a raw error belongs to, so classification
//! works on the standard `serde::de::Error` messages. Anything that does not
//! match one of the known classes (typically `de::Error::custom` raised by
//! hand-written `Deserialize` impls) stays unclassified and is handed back to
//! the caller untouched.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;
use thiserror::Error;

use crate::path::{location, Path};

/// The closed set of failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    /// Corrupted or out-of-range data: invalid values, lengths, variants.
    DataCorrupted,
    /// The container did not hold the expected key or element.
    KeyNotFound,
    /// The value present has the wrong JSON type.
    TypeMismatch,
    /// A null was found where a value was required.
    ValueNotFound,
}

// ordered: the null-specific prefixes must win over the generic `invalid type`
const MESSAGE_PREFIXES: &[(&str, FailureKind)] = &[
    ("missing field", FailureKind::KeyNotFound),
    ("missing element", FailureKind::KeyNotFound),
    ("invalid type: null", FailureKind::ValueNotFound),
    ("invalid type: unit value", FailureKind::ValueNotFound),
    ("invalid type", FailureKind::TypeMismatch),
    ("invalid value", FailureKind::DataCorrupted),
    ("invalid length", FailureKind::DataCorrupted),
    ("unknown variant", FailureKind::DataCorrupted),
    ("unknown field", FailureKind::DataCorrupted),
    ("duplicate field", FailureKind::DataCorrupted),
];

impl FailureKind {
    /// Map a raw serde error message onto a failure class.
    pub fn classify(message: &str) -> Option<Self> {
        MESSAGE_PREFIXES
            .iter()
            .find(|(prefix, _)| message.starts_with(prefix))
            .map(|(_, kind)| *kind)
    }

    /// Nullability rescues only these classes.
    pub fn is_missing(self) -> bool {
        matches!(self, Self::KeyNotFound | Self::ValueNotFound)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DataCorrupted => "dataCorrupted",
            Self::KeyNotFound => "keyNotFound",
            Self::TypeMismatch => "typeMismatch",
            Self::ValueNotFound => "valueNotFound",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decode error normalized into a [`FailureKind`], with the path it
/// occurred at.
///
/// Equality and hashing only look at the kind and the message, so two
/// failures raised for the same reason compare equal wherever they occurred.
#[derive(Debug, Clone, Error, Serialize)]
#[error("{kind} at {}: {message}", location(.path))]
pub struct DecodingFailure {
    kind: FailureKind,
    path: Path,
    message: String,
}

impl DecodingFailure {
    pub fn new(kind: FailureKind, path: Path, message: impl Into<String>) -> Self {
        Self { kind, path, message: message.into() }
    }

    /// Classify a raw decode error raised at `path`.
    ///
    /// Errors outside the four known classes come back as `Err(raw)`; they
    /// are a contract violation of the decoder and must not be absorbed.
    pub fn classify<E: fmt::Display>(raw: E, path: Path) -> Result<Self, E> {
        let message = raw.to_string();
        match FailureKind::classify(&message) {
            Some(kind) => Ok(Self { kind, path, message }),
            None => Err(raw),
        }
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The raw decoder's message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl PartialEq for DecodingFailure {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.message == other.message
    }
}

impl Eq for DecodingFailure {}

impl Hash for DecodingFailure {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.message.hash(state);
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PathSegment;
    use std::collections::HashSet;

    #[test]
    fn classifies_standard_serde_messages() {
        let cases = [
            ("missing field `name`", FailureKind::KeyNotFound),
            ("invalid type: null, expected a string", FailureKind::ValueNotFound),
            ("invalid type: unit value, expected i32", FailureKind::ValueNotFound),
            ("invalid type: integer `5`, expected a string", FailureKind::TypeMismatch),
            ("invalid value: integer `300`, expected u8", FailureKind::DataCorrupted),
            ("invalid length 3, expected a tuple of size 2", FailureKind::DataCorrupted),
            ("unknown variant `Blue`, expected `Red` or `Green`", FailureKind::DataCorrupted),
        ];
        for (message, kind) in cases {
            assert_eq!(FailureKind::classify(message), Some(kind), "{message}");
        }
    }

    #[test]
    fn custom_errors_stay_unclassified() {
        assert_eq!(FailureKind::classify("checksum does not match"), None);
        let raw = "checksum does not match".to_owned();
        let back = DecodingFailure::classify(raw.clone(), Path::root()).unwrap_err();
        assert_eq!(back, raw);
    }

    #[test]
    fn equality_ignores_path() {
        let a = DecodingFailure::new(FailureKind::KeyNotFound, Path::from_steps(["a"]), "missing field `x`");
        let b = DecodingFailure::new(FailureKind::KeyNotFound, Path::from_steps(["b"]), "missing field `x`");
        let c = DecodingFailure::new(FailureKind::ValueNotFound, Path::from_steps(["a"]), "missing field `x`");
        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn display_names_kind_and_location() {
        let failure = DecodingFailure::new(
            FailureKind::TypeMismatch,
            Path::from_steps([PathSegment::key("tags"), PathSegment::index(2)]),
            "invalid type: integer `1`, expected a string",
        );
        assert_eq!(
            failure.to_string(),
            "typeMismatch at `tags.2`: invalid type: integer `1`, expected a string"
        );
        let root = DecodingFailure::new(FailureKind::ValueNotFound, Path::root(), "invalid type: null, expected i32");
        assert!(root.to_string().starts_with("valueNotFound at <root>:"));
    }
}
