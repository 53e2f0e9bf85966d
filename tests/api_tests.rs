//! Integration tests for the public host-facing API.
//!
//! These tests drive `AvroJsonDecoder` and `SchemaCache` the way a host
//! function would: schema text and hex rows in, JSON text or errors out.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::thread;

use avro_json_udf::error::ConfigError;
use avro_json_udf::{AvroJsonDecoder, AvroValue, DecoderConfig, Error, Framing, SchemaCache};

const NULLABLE_LONG: &str = r#"["null", "long"]"#;

const POINT_SCHEMA: &str = r#"{"type": "record", "name": "Point", "fields": [
    {"name": "x", "type": "int"},
    {"name": "y", "type": "int"}
]}"#;

// =============================================================================
// AvroJsonDecoder Tests
// =============================================================================

#[test]
fn test_decoder_accepts_whitespace_and_case() {
    let d = AvroJsonDecoder::new(POINT_SCHEMA, DecoderConfig::default()).unwrap();
    assert_eq!(d.decode_hex("  0204\n").unwrap(), r#"{"x":1,"y":2}"#);
    assert_eq!(d.decode_hex("0A0B").unwrap(), r#"{"x":5,"y":-6}"#);
}

#[test]
fn test_decoder_rejects_bad_hex() {
    let d = AvroJsonDecoder::new(POINT_SCHEMA, DecoderConfig::default()).unwrap();
    assert!(matches!(d.decode_hex("020"), Err(Error::Input(_))));
    assert!(matches!(d.decode_hex("02zz"), Err(Error::Input(_))));
}

#[test]
fn test_decoder_framing() {
    let single = AvroJsonDecoder::new(NULLABLE_LONG, DecoderConfig::default()).unwrap();
    assert!(matches!(
        single.decode_hex("020200"),
        Err(Error::TrailingBytes {
            consumed: 2,
            trailing: 1
        })
    ));

    let config = DecoderConfig::default().with_framing(Framing::AllowTrailing);
    let lenient = AvroJsonDecoder::new(NULLABLE_LONG, config).unwrap();
    assert_eq!(lenient.decode_hex("020200").unwrap(), r#"{"long":1}"#);
}

#[test]
fn test_decode_value_tree() {
    let d = AvroJsonDecoder::new(POINT_SCHEMA, DecoderConfig::default()).unwrap();
    assert_eq!(
        d.decode_value(&[0x02, 0x04]).unwrap(),
        AvroValue::Record(vec![AvroValue::Long(1), AvroValue::Long(2)])
    );
}

#[test]
fn test_decode_rows_are_independent() {
    let d = AvroJsonDecoder::new(NULLABLE_LONG, DecoderConfig::default()).unwrap();
    let results = d.decode_rows(["00", "0x", "0202", "04", "0201"]);

    assert_eq!(results.len(), 5);
    assert_eq!(results[0].as_deref().unwrap(), "null");
    assert!(matches!(results[1], Err(Error::Input(_))));
    assert_eq!(results[2].as_deref().unwrap(), r#"{"long":1}"#);
    assert!(matches!(results[3], Err(Error::Decode(_))));
    assert_eq!(results[4].as_deref().unwrap(), r#"{"long":-1}"#);
}

#[test]
fn test_strict_schema_config() {
    let schema = r#"{"type": "record", "name": "R", "fields": [{"name": "a-b", "type": "int"}]}"#;
    assert!(AvroJsonDecoder::new(schema, DecoderConfig::default()).is_ok());
    assert!(matches!(
        AvroJsonDecoder::new(schema, DecoderConfig::default().with_strict_schema(true)),
        Err(Error::Schema(_))
    ));
}

#[test]
fn test_decoders_share_schema_across_threads() {
    let d = AvroJsonDecoder::new(POINT_SCHEMA, DecoderConfig::default()).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|i: i64| {
            let d = d.clone();
            thread::spawn(move || {
                let hex = format!("{:02x}00", (i * 2) as u8);
                d.decode_hex(&hex).unwrap()
            })
        })
        .collect();

    let outputs: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(
        outputs,
        [
            r#"{"x":0,"y":0}"#,
            r#"{"x":1,"y":0}"#,
            r#"{"x":2,"y":0}"#,
            r#"{"x":3,"y":0}"#
        ]
    );
    assert!(Arc::strong_count(d.schema()) >= 1);
}

// =============================================================================
// SchemaCache Tests
// =============================================================================

#[test]
fn test_cache_returns_shared_schema() {
    let cache = SchemaCache::new();
    let first = cache.get_or_parse(POINT_SCHEMA).unwrap();
    let second = cache.get_or_parse(POINT_SCHEMA).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.len(), 1);

    let d = AvroJsonDecoder::from_schema(first, DecoderConfig::default());
    assert_eq!(d.decode_hex("0204").unwrap(), r#"{"x":1,"y":2}"#);
}

#[test]
fn test_cache_evicts_least_recently_used() {
    let cache = SchemaCache::with_capacity(NonZeroUsize::new(2).unwrap());
    let long = cache.get_or_parse(r#""long""#).unwrap();
    cache.get_or_parse(r#""string""#).unwrap();
    // Touch "long" so "string" is the eviction candidate
    cache.get_or_parse(r#""long""#).unwrap();
    cache.get_or_parse(r#""bytes""#).unwrap();

    assert_eq!(cache.len(), 2);
    assert!(Arc::ptr_eq(&long, &cache.get_or_parse(r#""long""#).unwrap()));
}

#[test]
fn test_cache_does_not_store_failures() {
    let cache = SchemaCache::new();
    assert!(cache.get_or_parse("not json").is_err());
    assert!(cache.is_empty());
}

#[test]
fn test_cache_concurrent_access() {
    let cache = Arc::new(SchemaCache::new());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || cache.get_or_parse(NULLABLE_LONG).unwrap())
        })
        .collect();
    let schemas: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(cache.len(), 1);
    let cached = cache.get_or_parse(NULLABLE_LONG).unwrap();
    assert!(schemas.iter().all(|s| **s == *cached));
}

// =============================================================================
// Configuration Tests
// =============================================================================

fn config_from(pairs: &[(&str, &str)]) -> Result<DecoderConfig, ConfigError> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    DecoderConfig::from_lookup(|key| vars.get(key).cloned())
}

#[test]
fn test_config_from_lookup() {
    let config = config_from(&[
        (DecoderConfig::ENV_MAX_DEPTH, "12"),
        (DecoderConfig::ENV_FRAMING, "allow-trailing"),
        (DecoderConfig::ENV_STRICT_SCHEMA, "yes"),
    ])
    .unwrap();
    assert_eq!(config.max_depth, 12);
    assert_eq!(config.framing, Framing::AllowTrailing);
    assert!(config.strict_schema);
    assert!(config.validate_block_sizes);
}

#[test]
fn test_config_rejects_bad_values() {
    assert!(config_from(&[(DecoderConfig::ENV_MAX_DEPTH, "deep")]).is_err());
    assert!(config_from(&[(DecoderConfig::ENV_VALIDATE_BLOCK_SIZES, "maybe")]).is_err());
}

#[test]
fn test_config_drives_decoder_limits() {
    let schema = r#"{"type": "array", "items": {"type": "array", "items": "long"}}"#;
    let config = config_from(&[(DecoderConfig::ENV_MAX_DEPTH, "1")]).unwrap();
    let d = AvroJsonDecoder::new(schema, config).unwrap();
    // Outer array with one inner array of one long
    assert!(matches!(d.decode_hex("0202020000"), Err(Error::Decode(_))));

    let d = AvroJsonDecoder::new(schema, DecoderConfig::default()).unwrap();
    assert_eq!(d.decode_hex("0202020000").unwrap(), "[[1]]");
}
