//! The result of one decode attempt, and the table that produces it from a
//! raw decoder error.

use std::fmt;

use tracing::{debug, trace};

use crate::failure::{DecodingFailure, FailureKind};
use crate::outcome::{Nullable, Outcome};
use crate::path::Path;

/// What decoding a single field or value produced.
pub type DecodeResult<T> = Result<Outcome<T>, DecodingFailure>;

/// Turn a raw decode error raised at `path` into a [`DecodeResult`].
///
/// | raw class                          | `T` nullable | result            |
/// |------------------------------------|--------------|-------------------|
/// | `valueNotFound`                    | yes          | `Ok(Null)`        |
/// | `keyNotFound`                      | yes          | `Ok(Absent)`      |
/// | `valueNotFound` / `keyNotFound`    | no           | `Err(failure)`    |
/// | `typeMismatch` / `dataCorrupted`   | either       | `Err(failure)`    |
///
/// The table applies to the lookup of the value at `path`: a key that is not
/// there, or a `null` standing in its place. Errors raised while decoding a
/// value that is present go through [`reject`] instead.
///
/// A raw error outside the four classes is returned as the outer `Err` and
/// must be propagated by the caller.
pub fn resolve<T, E>(raw: E, path: &Path) -> Result<DecodeResult<T>, E>
where
    T: Nullable,
    E: fmt::Display,
{
    let failure = DecodingFailure::classify(raw, path.clone())?;
    let rescued = match failure.kind() {
        FailureKind::ValueNotFound if T::is_nullable() => Outcome::Null,
        FailureKind::KeyNotFound if T::is_nullable() => Outcome::Absent,
        _ => return Ok(failed(failure)),
    };
    trace!(path = %path, kind = %failure.kind(), "missing value rescued by nullability");
    Ok(Ok(rescued))
}

/// Turn a raw error raised while decoding a value present at `path` into a
/// failure. Nullability never applies here: whatever went missing is inside
/// the value, not the value itself.
pub(crate) fn reject<T, E>(raw: E, path: &Path) -> Result<DecodeResult<T>, E>
where
    E: fmt::Display,
{
    let failure = DecodingFailure::classify(raw, path.clone())?;
    Ok(failed(failure))
}

fn failed<T>(failure: DecodingFailure) -> DecodeResult<T> {
    debug!(path = %failure.path(), kind = %failure.kind(), message = failure.message(), "decode failure classified");
    Err(failure)
}

// ------------------------------- Tests ------------------------------------ //
