use json_decoded::{FailureKind, Node, Outcome, Path, Tracked, Unwrap};
use proptest::prelude::*;
use serde_json::{Map, Value, json};

fn key() -> impl Strategy<Value = String> {
    "[a-z_][a-z0-9_]{0,11}"
}

fn object(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_owned(), value);
    Value::Object(map)
}

/// Values that can never decode as a `u8`.
fn not_a_byte() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::from),
        "[a-z ]{0,8}".prop_map(Value::from),
        (256u64..).prop_map(Value::from),
        (i64::MIN..0).prop_map(Value::from),
        prop::collection::vec(any::<u8>(), 0..4).prop_map(|bytes| json!(bytes)),
    ]
}

fn failure_kind() -> impl Strategy<Value = FailureKind> {
    prop_oneof![
        Just(FailureKind::DataCorrupted),
        Just(FailureKind::KeyNotFound),
        Just(FailureKind::TypeMismatch),
        Just(FailureKind::ValueNotFound),
    ]
}

proptest! {
    #[test]
    fn null_for_a_plain_type_is_never_an_outcome(key in key()) {
        let doc = object(&key, Value::Null);
        let field: Tracked<i64> = Node::root(&doc).field(&key).unwrap();

        prop_assert_eq!(field.path(), &Path::from_steps([key.as_str()]));
        prop_assert_eq!(field.failure().map(|f| f.kind()), Some(FailureKind::ValueNotFound));
    }

    #[test]
    fn nullable_types_tell_null_from_absent(key in key(), other in key()) {
        prop_assume!(key != other);
        let doc = object(&key, Value::Null);
        let root = Node::root(&doc);

        let null: Tracked<Option<String>> = root.field(&key).unwrap();
        let absent: Tracked<Option<String>> = root.field(&other).unwrap();
        prop_assert_eq!(null.result(), &Ok(Outcome::Null));
        prop_assert_eq!(absent.result(), &Ok(Outcome::Absent));
        prop_assert_eq!(absent.path(), &Path::from_steps([other.as_str()]));
        prop_assert_eq!(null.unwrapped(), Ok(None));
        prop_assert_eq!(absent.unwrapped(), Ok(None));
    }

    #[test]
    fn wrong_data_fails_regardless_of_nullability(key in key(), value in not_a_byte()) {
        let doc = object(&key, value);
        let root = Node::root(&doc);

        let plain: Tracked<u8> = root.field(&key).unwrap();
        let nullable: Tracked<Option<u8>> = root.field(&key).unwrap();
        let plain = plain.failure().cloned().unwrap();
        let nullable = nullable.failure().cloned().unwrap();

        prop_assert!(matches!(plain.kind(), FailureKind::TypeMismatch | FailureKind::DataCorrupted));
        prop_assert_eq!(&plain, &nullable);
        prop_assert_eq!(plain.path(), nullable.path());
    }

    #[test]
    fn unwrapping_returns_the_value_or_the_failure(value in any::<i64>(), kind in failure_kind()) {
        let at = Path::from_steps(["n"]);
        let decoded = Tracked::new(at.clone(), Ok(Outcome::Value(value)));
        prop_assert_eq!(decoded.unwrapped(), Ok(value));

        let failed = Tracked::<i64>::failed(at, kind, "raw decoder message");
        prop_assert_eq!(failed.unwrapped().unwrap_err().kind(), kind);
    }

    #[test]
    fn array_elements_are_tracked_by_position(values in prop::collection::vec(any::<i32>(), 0..8)) {
        let items: Vec<Tracked<i32>> = json_decoded::from_value(&json!(values)).unwrap();
        prop_assert_eq!(items.len(), values.len());
        for (index, item) in items.iter().enumerate() {
            prop_assert_eq!(item.path(), &Path::from_steps([index]));
            prop_assert_eq!(item.value(), Some(&values[index]));
        }
    }
}
