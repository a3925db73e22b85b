//! Type-erased locations inside a JSON document.
//!
//! A [`Path`] is the ordered list of steps taken from the document root to the
//! point where a value was decoded. Paths are plain values: they hash, compare
//! and render, so they can key a map of diagnostics.

use std::fmt;
use std::ops::Index;

use serde::de::{self, Deserialize, Deserializer, Visitor};
use serde::{Serialize, Serializer};

// ————————————————————————————————————————————————————————————————————————————
// SEGMENT
// ————————————————————————————————————————————————————————————————————————————

/// One step of a [`Path`]: an object key or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl PathSegment {
    pub fn key(key: impl Into<String>) -> Self {
        Self::Key(key.into())
    }

    pub fn index(index: usize) -> Self {
        Self::Index(index)
    }

    /// The numeric position, for index steps.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Index(index) => Some(*index),
            Self::Key(_) => None,
        }
    }

    /// The object key, for key steps.
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Self::Key(key) => Some(key),
            Self::Index(_) => None,
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_owned())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

// keys travel as strings, indices as unsigned integers
impl Serialize for PathSegment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Key(key) => serializer.serialize_str(key),
            Self::Index(index) => serializer.serialize_u64(*index as u64),
        }
    }
}

impl<'de> Deserialize<'de> for PathSegment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SegmentVisitor;

        impl<'de> Visitor<'de> for SegmentVisitor {
            type Value = PathSegment;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object key or an array index")
            }

            fn visit_str<E: de::Error>(self, key: &str) -> Result<PathSegment, E> {
                Ok(PathSegment::Key(key.to_owned()))
            }

            fn visit_string<E: de::Error>(self, key: String) -> Result<PathSegment, E> {
                Ok(PathSegment::Key(key))
            }

            fn visit_u64<E: de::Error>(self, index: u64) -> Result<PathSegment, E> {
                usize::try_from(index)
                    .map(PathSegment::Index)
                    .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(index), &self))
            }

            fn visit_i64<E: de::Error>(self, index: i64) -> Result<PathSegment, E> {
                usize::try_from(index)
                    .map(PathSegment::Index)
                    .map_err(|_| E::invalid_value(de::Unexpected::Signed(index), &self))
            }
        }

        deserializer.deserialize_any(SegmentVisitor)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// PATH
// ————————————————————————————————————————————————————————————————————————————

/// The steps taken from the document root to a decode point.
///
/// The empty path is the root itself. A path never changes once built;
/// [`Path::join`] returns an extended copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Path {
    segments: Vec<PathSegment>,
}

impl Path {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_steps<I, S>(steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<PathSegment>,
    {
        Self { segments: steps.into_iter().map(Into::into).collect() }
    }

    /// Parse a dotted path; steps made only of ASCII digits become indices.
    pub fn parse_dotted(src: &str) -> Self {
        if src.is_empty() {
            return Self::root();
        }
        Self::from_steps(src.split('.').map(|step| match step.parse::<usize>() {
            Ok(index) if step.bytes().all(|b| b.is_ascii_digit()) => PathSegment::Index(index),
            _ => PathSegment::Key(step.to_owned()),
        }))
    }

    /// A new path with `segment` appended.
    pub fn join(&self, segment: impl Into<PathSegment>) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend(self.segments.iter().cloned());
        segments.push(segment.into());
        Self { segments }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathSegment> {
        self.segments.iter()
    }

    pub fn last(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl Index<usize> for Path {
    type Output = PathSegment;

    fn index(&self, index: usize) -> &PathSegment {
        &self.segments[index]
    }
}

impl FromIterator<PathSegment> for Path {
    fn from_iter<I: IntoIterator<Item = PathSegment>>(iter: I) -> Self {
        Self { segments: iter.into_iter().collect() }
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a PathSegment;
    type IntoIter = std::slice::Iter<'a, PathSegment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}

/// Dotted rendering: `items.0.name`. The root renders as the empty string.
impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

/// Human label for diagnostics, where an empty rendering would be confusing.
pub(crate) fn location(path: &Path) -> String {
    if path.is_empty() { "<root>".to_owned() } else { format!("`{path}`") }
}

// ------------------------------- Tests ------------------------------------ //
