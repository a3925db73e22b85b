//! Field expectations and the per-document probe behind the CLI.
use std::fmt;
use std::str::FromStr;

use colored::Colorize;
use json_decoded::{
    DecodingFailure, FailureKind, Node, Nullable, Outcome, Path, PathSegment, Tracked, unwrap_all,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

// ————————————————————————————————————————————————————————————————————————————
// EXPECTATIONS
// ————————————————————————————————————————————————————————————————————————————

/// The JSON type a field is expected to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Any,
    Bool,
    Integer,
    Number,
    String,
    Array,
    Object,
}

impl FieldKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Bool => "bool",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

/// `PATH:KIND[?]`, e.g. `items.0.price:number?`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expectation {
    pub path: Path,
    pub kind: FieldKind,
    pub nullable: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExpectationError {
    #[error("expected PATH:KIND, got `{0}`")]
    MissingKind(String),
    #[error("unknown field kind `{0}` (expected any, bool, integer, number, string, array or object)")]
    UnknownKind(String),
}

impl FromStr for Expectation {
    type Err = ExpectationError;

    fn from_str(src: &str) -> Result<Self, Self::Err> {
        let (path, kind) = src
            .rsplit_once(':')
            .ok_or_else(|| ExpectationError::MissingKind(src.to_owned()))?;
        let (kind, nullable) = match kind.strip_suffix('?') {
            Some(kind) => (kind, true),
            None => (kind, false),
        };
        let kind = match kind {
            "any" => FieldKind::Any,
            "bool" => FieldKind::Bool,
            "integer" => FieldKind::Integer,
            "number" => FieldKind::Number,
            "string" => FieldKind::String,
            "array" => FieldKind::Array,
            "object" => FieldKind::Object,
            other => return Err(ExpectationError::UnknownKind(other.to_owned())),
        };
        Ok(Self { path: Path::parse_dotted(path), kind, nullable })
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}{}", self.path, self.kind.as_str(), if self.nullable { "?" } else { "" })
    }
}

// ————————————————————————————————————————————————————————————————————————————
// PROBING
// ————————————————————————————————————————————————————————————————————————————

/// Decode `expectation` against a document. Intermediate steps are followed
/// as plain lookups; the first one that is missing is the reported failure.
///
/// The field comes back as an optional tree value, so absent and null stay
/// representable whatever kind was asked for.
pub fn probe(root: &Node<'_>, expectation: &Expectation) -> json_decoded::Result<Tracked<Option<Value>>> {
    let Some((last, parents)) = expectation.path.segments().split_last() else {
        return probe_kind(root, None, expectation);
    };
    let mut node = root.clone();
    for segment in parents {
        node = match node.child(segment) {
            Some(child) => child,
            None => return node.step::<Value>(segment).map(into_tree),
        };
    }
    probe_kind(&node, Some(last), expectation)
}

fn probe_kind(
    node: &Node<'_>,
    last: Option<&PathSegment>,
    expectation: &Expectation,
) -> json_decoded::Result<Tracked<Option<Value>>> {
    macro_rules! as_kind {
        ($ty:ty) => {
            if expectation.nullable {
                probe_as::<Option<$ty>>(node, last)
            } else {
                probe_as::<$ty>(node, last)
            }
        };
    }
    match expectation.kind {
        FieldKind::Any => as_kind!(Value),
        FieldKind::Bool => as_kind!(bool),
        FieldKind::Integer => as_kind!(i64),
        FieldKind::Number => as_kind!(f64),
        FieldKind::String => as_kind!(String),
        FieldKind::Array => as_kind!(Vec<Value>),
        FieldKind::Object => as_kind!(Map<String, Value>),
    }
}

fn probe_as<'a, T>(node: &Node<'a>, last: Option<&PathSegment>) -> json_decoded::Result<Tracked<Option<Value>>>
where
    T: Deserialize<'a> + Nullable + Into<Value>,
{
    let tracked: Tracked<T> = match last {
        Some(segment) => node.step(segment)?,
        None => node.clone().decode()?,
    };
    Ok(into_tree(tracked))
}

/// Re-type a decoded field as an optional tree value. Absent and null carry
/// over as they are; `Option<X>` converts into `Value::Null` for `None`.
fn into_tree<T: Into<Value>>(tracked: Tracked<T>) -> Tracked<Option<Value>> {
    let (path, result) = tracked.into_parts();
    let result = result.map(|outcome| match outcome {
        Outcome::Value(value) => Outcome::Value(Some(value.into())),
        Outcome::Null => Outcome::Null,
        Outcome::Absent => Outcome::Absent,
    });
    Tracked::new(path, result)
}

/// Every expectation against one document, in order.
pub fn probe_all(
    root: &Node<'_>,
    expectations: &[Expectation],
) -> json_decoded::Result<Vec<Tracked<Option<Value>>>> {
    expectations.iter().map(|expectation| probe(root, expectation)).collect()
}

/// Collapse probed fields into values, raising the first failure. Absent and
/// null fields come out as `Value::Null`.
pub fn check(fields: &[Tracked<Option<Value>>]) -> Result<Vec<Value>, DecodingFailure> {
    let values = unwrap_all(fields)?;
    Ok(values.into_iter().map(Option::unwrap_or_default).collect())
}

// ————————————————————————————————————————————————————————————————————————————
// REPORTS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Serialize)]
pub struct FieldReport {
    pub document: String,
    pub path: Path,
    #[serde(flatten)]
    pub state: FieldState,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum FieldState {
    Value { value: Value },
    Null,
    Absent,
    Failure { kind: FailureKind, message: String },
}

impl FieldReport {
    pub fn new(document: &str, field: Tracked<Option<Value>>) -> Self {
        let (path, result) = field.into_parts();
        let state = match result {
            Ok(Outcome::Value(Some(value))) => FieldState::Value { value },
            Ok(Outcome::Value(None) | Outcome::Null) => FieldState::Null,
            Ok(Outcome::Absent) => FieldState::Absent,
            Err(failure) => FieldState::Failure { kind: failure.kind(), message: failure.message().to_owned() },
        };
        Self { document: document.to_owned(), path, state }
    }

    /// One coloured report line.
    pub fn render(&self) -> String {
        let path = if self.path.is_empty() { "<root>".to_owned() } else { self.path.to_string() };
        let state = match &self.state {
            FieldState::Value { value } => format!("{} {}", "value".green(), value),
            FieldState::Null => "null".yellow().to_string(),
            FieldState::Absent => "absent".yellow().to_string(),
            FieldState::Failure { kind, message } => format!("{} {}", kind.as_str().red().bold(), message),
        };
        format!("{} {} {}", self.document.dimmed(), path.bold(), state)
    }
}

// ------------------------------- Tests ------------------------------------ //
