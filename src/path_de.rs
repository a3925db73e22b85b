//! Entry points: parse JSON, then decode it through the path-aware [`Node`].
//!
//! Input is parsed into a `serde_json::Value` first, so every decode walks a
//! complete tree and every error can be located by path.

use std::io::Read;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::de::Node;
use crate::error::{Error, Result};

/// Parse JSON text without decoding it further.
pub fn parse(src: &str) -> Result<Value> {
    serde_json::from_str(src).map_err(Error::parse)
}

/// Decode `T` from JSON text.
///
/// ```
/// use json_decoded::{FailureKind, Tracked};
///
/// let age: Tracked<i32> = json_decoded::from_str("null").unwrap();
/// assert_eq!(age.failure().map(|f| f.kind()), Some(FailureKind::ValueNotFound));
/// ```
pub fn from_str<T: DeserializeOwned>(src: &str) -> Result<T> {
    from_value(&parse(src)?)
}

pub fn from_slice<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let value: Value = serde_json::from_slice(bytes).map_err(Error::parse)?;
    from_value(&value)
}

pub fn from_reader<R: Read, T: DeserializeOwned>(reader: R) -> Result<T> {
    let value: Value = serde_json::from_reader(reader).map_err(Error::parse)?;
    from_value(&value)
}

/// Decode `T` from an already parsed tree; `T` may borrow from it.
pub fn from_value<'a, T: Deserialize<'a>>(value: &'a Value) -> Result<T> {
    Node::root(value).decode_as()
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::Path;
    use crate::tracked::Tracked;

    #[derive(Debug, Deserialize)]
    struct Config<'a> {
        name: &'a str,
        port: Tracked<Option<u16>>,
    }

    #[test]
    fn malformed_input_is_a_syntax_error() {
        let err = from_str::<Tracked<i32>>("{\"a\": ").unwrap_err();
        assert!(matches!(err, Error::Syntax(_)), "{err}");
        assert_eq!(err.path(), None);
    }

    #[test]
    fn slices_and_readers_decode_alike() {
        let src = br#"{"name": "api", "port": 8080}"#;
        let a: Tracked<Value> = from_slice(src).unwrap();
        let b: Tracked<Value> = from_reader(&src[..]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.path(), &Path::root());
    }

    #[test]
    fn borrowed_values_decode_from_a_tree() {
        let tree = parse(r#"{"name": "api", "port": "eighty"}"#).unwrap();
        let config: Config<'_> = from_value(&tree).unwrap();
        assert_eq!(config.name, "api");
        assert!(config.port.is_failure());
        assert_eq!(config.port.path(), &Path::from_steps(["port"]));
    }

    #[test]
    fn untracked_failures_abort_with_their_path() {
        let tree = parse(r#"{"name": 7, "port": 1}"#).unwrap();
        let err = from_value::<Config<'_>>(&tree).unwrap_err();
        assert_eq!(err.path(), Some(&Path::from_steps(["name"])));
        assert!(err.to_string().starts_with("at JSON path `name` → invalid type"), "{err}");
    }
}
