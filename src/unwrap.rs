//! Collapsing decode results back into plain values.
//!
//! Missing states become the type's no-value representation; a failure is
//! raised as the error. Collections stop at their first failure in iteration
//! order, which makes the reported failure deterministic for `Vec`, slices,
//! `BTreeMap` and `IndexMap` but not for `HashMap`.

use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};

use indexmap::IndexMap;

use crate::failure::DecodingFailure;
use crate::outcome::Nullable;
use crate::result::DecodeResult;
use crate::tracked::Tracked;

pub trait Unwrap {
    type Output;

    fn unwrapped(self) -> Result<Self::Output, DecodingFailure>;
}

impl<T: Nullable> Unwrap for DecodeResult<T> {
    type Output = T;

    fn unwrapped(self) -> Result<T, DecodingFailure> {
        self.map(|outcome| outcome.into_value())
    }
}

impl<T: Nullable> Unwrap for Tracked<T> {
    type Output = T;

    fn unwrapped(self) -> Result<T, DecodingFailure> {
        self.into_result().unwrapped()
    }
}

impl<T: Nullable + Clone> Unwrap for &Tracked<T> {
    type Output = T;

    fn unwrapped(self) -> Result<T, DecodingFailure> {
        self.result().clone().unwrapped()
    }
}

impl<U: Unwrap> Unwrap for Vec<U> {
    type Output = Vec<U::Output>;

    fn unwrapped(self) -> Result<Self::Output, DecodingFailure> {
        unwrap_all(self)
    }
}

impl<'a, U> Unwrap for &'a [U]
where
    &'a U: Unwrap,
{
    type Output = Vec<<&'a U as Unwrap>::Output>;

    fn unwrapped(self) -> Result<Self::Output, DecodingFailure> {
        unwrap_all(self)
    }
}

impl<K: Ord, V: Unwrap> Unwrap for BTreeMap<K, V> {
    type Output = BTreeMap<K, V::Output>;

    fn unwrapped(self) -> Result<Self::Output, DecodingFailure> {
        self.into_iter().map(|(key, value)| Ok((key, value.unwrapped()?))).collect()
    }
}

impl<K, V, S> Unwrap for HashMap<K, V, S>
where
    K: Eq + Hash,
    V: Unwrap,
    S: BuildHasher + Default,
{
    type Output = HashMap<K, V::Output, S>;

    fn unwrapped(self) -> Result<Self::Output, DecodingFailure> {
        self.into_iter().map(|(key, value)| Ok((key, value.unwrapped()?))).collect()
    }
}

impl<K, V, S> Unwrap for IndexMap<K, V, S>
where
    K: Eq + Hash,
    V: Unwrap,
    S: BuildHasher + Default,
{
    type Output = IndexMap<K, V::Output, S>;

    fn unwrapped(self) -> Result<Self::Output, DecodingFailure> {
        self.into_iter().map(|(key, value)| Ok((key, value.unwrapped()?))).collect()
    }
}

/// Unwrap every item in order, stopping at the first failure. Items after it
/// are never pulled from the iterator.
pub fn unwrap_all<I>(items: I) -> Result<Vec<<I::Item as Unwrap>::Output>, DecodingFailure>
where
    I: IntoIterator,
    I::Item: Unwrap,
{
    items.into_iter().map(Unwrap::unwrapped).collect()
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::FailureKind;
    use crate::outcome::Outcome;
    use crate::path::Path;
    use std::cell::Cell;

    fn ok(index: usize, value: u8) -> Tracked<u8> {
        Tracked::new(Path::from_steps([index]), Ok(Outcome::Value(value)))
    }

    fn bad(index: usize) -> Tracked<u8> {
        Tracked::failed(Path::from_steps([index]), FailureKind::DataCorrupted, "invalid value: integer `300`, expected u8")
    }

    #[test]
    fn scalars_materialize_missing_states() {
        let absent: DecodeResult<Option<u8>> = Ok(Outcome::Absent);
        let null: DecodeResult<Option<u8>> = Ok(Outcome::Null);
        assert_eq!(absent.unwrapped(), Ok(None));
        assert_eq!(null.unwrapped(), Ok(None));
        assert_eq!(ok(0, 7).unwrapped(), Ok(7));
        assert_eq!((&ok(0, 7)).unwrapped(), Ok(7));
    }

    #[test]
    fn sequences_stop_at_the_first_failure() {
        let pulled = Cell::new(0);
        let items = vec![ok(0, 1), bad(1), ok(2, 3)];
        let failure = unwrap_all(items.into_iter().inspect(|_| pulled.set(pulled.get() + 1))).unwrap_err();

        assert_eq!(failure.kind(), FailureKind::DataCorrupted);
        assert_eq!(failure.path(), &Path::from_steps([1usize]));
        assert_eq!(pulled.get(), 2);
    }

    #[test]
    fn slices_unwrap_by_reference() {
        let items = vec![ok(0, 1), ok(1, 2)];
        assert_eq!(items.as_slice().unwrapped(), Ok(vec![1, 2]));
        assert_eq!(items.unwrapped(), Ok(vec![1, 2]));
    }

    #[test]
    fn ordered_maps_report_the_first_failure_by_key_order() {
        let map: BTreeMap<&str, Tracked<u8>> = [("b", bad(1)), ("a", ok(0, 1)), ("c", bad(2))].into_iter().collect();
        let failure = map.unwrapped().unwrap_err();
        assert_eq!(failure.path(), &Path::from_steps([1usize]));

        let map: IndexMap<&str, Tracked<u8>> = [("c", bad(2)), ("a", ok(0, 1)), ("b", bad(1))].into_iter().collect();
        let failure = map.unwrapped().unwrap_err();
        assert_eq!(failure.path(), &Path::from_steps([2usize]));
    }

    #[test]
    fn keyed_collections_keep_their_keys() {
        let map: HashMap<String, Tracked<u8>> = [("x".to_owned(), ok(0, 4)), ("y".to_owned(), ok(1, 5))].into_iter().collect();
        let plain = map.unwrapped().unwrap();
        assert_eq!(plain["x"], 4);
        assert_eq!(plain["y"], 5);
    }
}
