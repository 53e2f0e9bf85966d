//! End-to-end decoding tests: binary payloads against schemas, rendered as JSON.

use avro_json_udf::error::DecodeErrorKind;
use avro_json_udf::reader::*;
use avro_json_udf::schema::parse_schema;
use avro_json_udf::{decode_byte_string, encode_json, encode_value, AvroJsonDecoder, Error};

const USER_SCHEMA: &str = r#"{"namespace": "example.avro", "type": "record", "name": "User",
    "fields": [
        {"name": "name", "type": "string"},
        {"name": "favorite_number", "type": ["int", "null"]},
        {"name": "favorite_color", "type": ["string", "null"]}
    ]}"#;

const TREE_SCHEMA: &str = r#"{"type": "record", "name": "Tree", "fields": [
    {"name": "label", "type": "string"},
    {"name": "children", "type": {"type": "array", "items": "Tree"}}
]}"#;

fn decoder(schema: &str) -> AvroJsonDecoder {
    AvroJsonDecoder::new(schema, DecoderConfig::default()).unwrap()
}

/// A chain of `depth` trees, each holding the next as its only child.
fn nested_tree(depth: usize) -> AvroValue {
    let mut tree = AvroValue::Record(vec!["leaf".into(), AvroValue::Array(vec![])]);
    for _ in 1..depth {
        tree = AvroValue::Record(vec!["node".into(), AvroValue::Array(vec![tree])]);
    }
    tree
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_simple_record() {
    let d = decoder(
        r#"{"type": "record", "name": "User", "fields": [
            {"name": "id", "type": "long"},
            {"name": "name", "type": "string"}
        ]}"#,
    );
    assert_eq!(d.decode_hex("02046162").unwrap(), r#"{"id":1,"name":"ab"}"#);
}

#[test]
fn test_nullable_long() {
    let d = decoder(r#"["null", "long"]"#);
    assert_eq!(d.decode_hex("00").unwrap(), "null");
    assert_eq!(d.decode_hex("0202").unwrap(), r#"{"long":1}"#);
    assert_eq!(d.decode_hex("0201").unwrap(), r#"{"long":-1}"#);
}

#[test]
fn test_example_user() {
    let d = decoder(USER_SCHEMA);
    let value = AvroValue::Record(vec![
        "Moiraine".into(),
        AvroValue::union(0, 4i32.into()),
        AvroValue::union(0, "Blue".into()),
    ]);
    let bytes = encode_value(&value, d.schema()).unwrap();
    assert_eq!(
        d.decode_bytes(&bytes).unwrap(),
        r#"{"name":"Moiraine","favorite_number":{"int":4},"favorite_color":{"string":"Blue"}}"#
    );
}

#[test]
fn test_example_user_with_nulls() {
    let d = decoder(USER_SCHEMA);
    // "Min", favorite_number null (branch 1), favorite_color null (branch 1)
    assert_eq!(
        d.decode_hex("064d696e0202").unwrap(),
        r#"{"name":"Min","favorite_number":null,"favorite_color":null}"#
    );
}

#[test]
fn test_sequence_of_records_via_array_schema() {
    let schema = format!(r#"{{"type": "array", "items": {}}}"#, USER_SCHEMA);
    let d = decoder(&schema);
    // Two users in one block: "A"/null/null and "B"/7/null
    let json = d.decode_hex("04024102020242000e0200").unwrap();
    assert_eq!(
        json,
        r#"[{"name":"A","favorite_number":null,"favorite_color":null},{"name":"B","favorite_number":{"int":7},"favorite_color":null}]"#
    );
}

#[test]
fn test_all_primitive_kinds() {
    let d = decoder(
        r#"{"type": "record", "name": "P", "fields": [
            {"name": "n", "type": "null"},
            {"name": "b", "type": "boolean"},
            {"name": "i", "type": "int"},
            {"name": "l", "type": "long"},
            {"name": "f", "type": "float"},
            {"name": "d", "type": "double"},
            {"name": "y", "type": "bytes"},
            {"name": "s", "type": "string"}
        ]}"#,
    );
    let mut bytes = vec![0x01, 0x7F, 0x80, 0x01];
    bytes.extend_from_slice(&1.5f32.to_le_bytes());
    bytes.extend_from_slice(&(-0.25f64).to_le_bytes());
    bytes.extend_from_slice(&[0x04, 0x00, 0xFF]);
    bytes.extend_from_slice(&[0x06, b'x', b'y', b'z']);
    assert_eq!(
        d.decode_bytes(&bytes).unwrap(),
        r#"{"n":null,"b":true,"i":-64,"l":64,"f":1.5,"d":-0.25,"y":"\u0000ÿ","s":"xyz"}"#
    );
}

#[test]
fn test_enum_fixed_and_map() {
    let d = decoder(
        r#"{"type": "record", "name": "R", "fields": [
            {"name": "suit", "type": {"type": "enum", "name": "Suit", "symbols": ["SPADES", "HEARTS"]}},
            {"name": "id", "type": {"type": "fixed", "name": "Id", "size": 2}},
            {"name": "attrs", "type": {"type": "map", "values": "long"}}
        ]}"#,
    );
    // HEARTS, fixed 0x80 0x41, map {"a": 1, "b": 2}
    let json = d.decode_hex("0280410402610202620400").unwrap();
    assert_eq!(json, "{\"suit\":\"HEARTS\",\"id\":\"\u{80}A\",\"attrs\":{\"a\":1,\"b\":2}}");

    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    let id = parsed["id"].as_str().unwrap();
    assert_eq!(decode_byte_string(id).unwrap(), vec![0x80, 0x41]);
}

#[test]
fn test_union_of_named_types_uses_fullnames() {
    let d = decoder(
        r#"["null",
            {"type": "record", "name": "Point", "namespace": "geo", "fields": [{"name": "x", "type": "int"}]},
            {"type": "array", "items": "geo.Point"}]"#,
    );
    assert_eq!(d.decode_hex("0206").unwrap(), r#"{"geo.Point":{"x":3}}"#);
    assert_eq!(d.decode_hex("0404040000").unwrap(), r#"{"array":[{"x":2},{"x":0}]}"#);
}

#[test]
fn test_json_escaping() {
    let d = decoder(r#""string""#);
    // "a\"\n" followed by U+0001
    assert_eq!(d.decode_hex("0861220a01").unwrap(), r#""a\"\n\u0001""#);
}

// ============================================================================
// Blocks
// ============================================================================

#[test]
fn test_multiple_blocks_concatenate() {
    let schema = parse_schema(r#"{"type": "array", "items": "long"}"#).unwrap();
    // block of 1, sized block of 2, terminator
    let data: &[u8] = &[0x02, 0x02, 0x03, 0x04, 0x04, 0x06, 0x00];
    let (value, consumed) = decode(data, &schema).unwrap();
    assert_eq!(
        value,
        AvroValue::Array(vec![1i64.into(), 2i64.into(), 3i64.into()])
    );
    assert_eq!(consumed, data.len());
}

#[test]
fn test_negative_block_byte_size() {
    let schema = parse_schema(r#"{"type": "map", "values": "int"}"#).unwrap();
    let err = decode(&[0x01, 0x01, 0x02, 0x61, 0x00, 0x00], &schema).unwrap_err();
    assert!(matches!(err.kind, DecodeErrorKind::InvalidEncoding(_)));
    assert_eq!(err.offset, 1);
}

#[test]
fn test_map_count_bounded_by_remaining_bytes() {
    let schema = parse_schema(r#"{"type": "map", "values": "null"}"#).unwrap();
    // 3 entries need at least 3 key-length bytes; only 2 follow
    let err = decode(&[0x06, 0x00, 0x00], &schema).unwrap_err();
    assert!(err.is_truncated());
}

// ============================================================================
// Truncation and errors
// ============================================================================

#[test]
fn test_every_prefix_is_truncated() {
    let d = decoder(USER_SCHEMA);
    let value = AvroValue::Record(vec![
        "Moiraine".into(),
        AvroValue::union(0, 4i32.into()),
        AvroValue::union(0, "Blue".into()),
    ]);
    let bytes = encode_value(&value, d.schema()).unwrap();
    for cut in 0..bytes.len() {
        let err = decode(&bytes[..cut], d.schema()).unwrap_err();
        assert!(err.is_truncated(), "prefix {} gave {}", cut, err);
    }
}

#[test]
fn test_error_offset_and_path() {
    let d = decoder(USER_SCHEMA);
    // name "ab", favorite_number branch index 5
    let Error::Decode(err) = d.decode_hex("0461620a").unwrap_err() else {
        panic!("expected decode error");
    };
    assert!(matches!(err.kind, DecodeErrorKind::InvalidEncoding(_)));
    assert_eq!(err.offset, 3);
    assert_eq!(err.path, "$.favorite_number");
}

#[test]
fn test_invalid_utf8_string() {
    let d = decoder(r#""string""#);
    let Error::Decode(err) = d.decode_hex("04c328").unwrap_err() else {
        panic!("expected decode error");
    };
    assert!(matches!(err.kind, DecodeErrorKind::InvalidUtf8(_)));
}

#[test]
fn test_enum_index_out_of_range() {
    let d = decoder(r#"{"type": "enum", "name": "E", "symbols": ["A"]}"#);
    assert!(matches!(d.decode_hex("02"), Err(Error::Decode(_))));
}

// ============================================================================
// Recursion
// ============================================================================

const SPAWNED_THREAD_STACK: usize = 2 * 1024 * 1024;
const MAIN_THREAD_STACK: usize = 8 * 1024 * 1024;

/// Run `f` on a thread with exactly `stack_size` bytes of stack.
fn with_stack<T, F>(stack_size: usize, f: F) -> T
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    std::thread::Builder::new()
        .stack_size(stack_size)
        .spawn(f)
        .unwrap()
        .join()
        .unwrap()
}

#[test]
fn test_deep_self_reference() {
    with_stack(SPAWNED_THREAD_STACK, || {
        let schema = parse_schema(TREE_SCHEMA).unwrap();
        let value = nested_tree(100);
        let bytes = encode_value(&value, &schema).unwrap();
        let (decoded, consumed) = decode(&bytes, &schema).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(consumed, bytes.len());

        let json = encode_json(&decoded, &schema).unwrap();
        assert!(json.starts_with(r#"{"label":"node","children":[{"label":"node""#));
    });
}

#[test]
fn test_default_depth_limit_fits_spawned_thread_stack() {
    with_stack(SPAWNED_THREAD_STACK, || {
        let d = decoder(TREE_SCHEMA);
        // Each level is a record and an array: exactly the default limit
        let at_limit = encode_value(&nested_tree(DEFAULT_MAX_DEPTH / 2), d.schema()).unwrap();
        let json = d.decode_bytes(&at_limit).unwrap();
        assert!(json.ends_with("]}]}"));

        let past_limit =
            encode_value(&nested_tree(DEFAULT_MAX_DEPTH / 2 + 1), d.schema()).unwrap();
        let Error::Decode(err) = d.decode_bytes(&past_limit).unwrap_err() else {
            panic!("expected decode error");
        };
        assert_eq!(
            err.kind,
            DecodeErrorKind::DepthLimitExceeded {
                limit: DEFAULT_MAX_DEPTH
            }
        );
        assert!(err.path.starts_with("$.children[0].children[0]"));
    });
}

#[test]
fn test_depth_ceiling_fits_main_thread_stack() {
    with_stack(MAIN_THREAD_STACK, || {
        let schema = parse_schema(TREE_SCHEMA).unwrap();
        // Requests above the ceiling are clamped to it
        let config = DecoderConfig::default().with_max_depth(usize::MAX);

        let at_limit = encode_value(&nested_tree(MAX_DEPTH_CEILING / 2), &schema).unwrap();
        assert!(decode_with_config(&at_limit, &schema, &config).is_ok());

        let past_limit = encode_value(&nested_tree(MAX_DEPTH_CEILING / 2 + 1), &schema).unwrap();
        let err = decode_with_config(&past_limit, &schema, &config).unwrap_err();
        assert_eq!(
            err.kind,
            DecodeErrorKind::DepthLimitExceeded {
                limit: MAX_DEPTH_CEILING
            }
        );
    });
}

#[test]
fn test_directly_set_depth_is_clamped() {
    with_stack(MAIN_THREAD_STACK, || {
        let schema = parse_schema(TREE_SCHEMA).unwrap();
        let config = DecoderConfig {
            max_depth: usize::MAX,
            ..DecoderConfig::default()
        };
        // Every three bytes open another level: label "\x02", one child
        let err = decode_with_config(&[0x02; 4096], &schema, &config).unwrap_err();
        assert_eq!(
            err.kind,
            DecodeErrorKind::DepthLimitExceeded {
                limit: MAX_DEPTH_CEILING
            }
        );
    });
}

#[test]
fn test_determinism() {
    let d = decoder(USER_SCHEMA);
    let first = d.decode_hex("064d696e0202").unwrap();
    for _ in 0..10 {
        assert_eq!(d.decode_hex("064d696e0202").unwrap(), first);
    }
}
