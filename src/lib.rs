//! Decode JSON with per-field diagnostics.
//!
//! Wrapping a field in [`Tracked`] turns its decode into data: the path it
//! was decoded at, plus either an [`Outcome`] (`Absent`, `Null` or `Value`)
//! or a classified [`DecodingFailure`]. A bad field no longer aborts the
//! whole document, and an absent key is told apart from an explicit `null`.
//!
//! ```
//! use json_decoded::{FailureKind, Outcome, Tracked, Unwrap};
//!
//! #[derive(serde::Deserialize)]
//! struct User {
//!     name: Tracked<String>,
//!     email: Tracked<Option<String>>,
//!     tags: Vec<Tracked<String>>,
//! }
//!
//! let user: User = json_decoded::from_str(r#"{"name": null, "tags": ["a", 2]}"#).unwrap();
//!
//! assert_eq!(user.name.failure().map(|f| f.kind()), Some(FailureKind::ValueNotFound));
//! assert_eq!(user.email.result(), &Ok(Outcome::Absent));
//! assert_eq!(user.tags[1].path().to_string(), "tags.1");
//! assert!(user.tags.unwrapped().is_err());
//! ```
//!
//! Decoding goes through a path-aware deserializer ([`Node`]) over a parsed
//! `serde_json::Value`; use the `from_*` entry points or a `Node` directly.

mod de;
mod error;
mod failure;
mod outcome;
mod path;
mod path_de;
mod result;
mod scope;
mod tracked;
mod unwrap;

pub use de::Node;
pub use error::{Error, Result};
pub use failure::{DecodingFailure, FailureKind};
pub use outcome::{Nullable, Outcome};
pub use path::{Path, PathSegment};
pub use path_de::{from_reader, from_slice, from_str, from_value, parse};
pub use result::{resolve, DecodeResult};
pub use tracked::Tracked;
pub use unwrap::{unwrap_all, Unwrap};
