// tests/parser_tests.rs

use indexmap::IndexMap;
use quarry::{LexError, ParseError, Value, parse, to_json, to_json_pretty};

fn obj(pairs: Vec<(&str, Value)>) -> Value {
    let mut map = IndexMap::new();
    for (k, v) in pairs {
        map.insert(k.to_string(), v);
    }
    Value::Object(map)
}

// ============================================================================
// Round-trip
// ============================================================================

#[test]
fn test_round_trip_scalars() {
    let values = vec![
        Value::Null,
        Value::Boolean(true),
        Value::Boolean(false),
        Value::Integer(0),
        Value::Integer(42),
        Value::Integer(-7),
        Value::Float(3.5),
        Value::Float(-0.25),
        Value::Float(2.0), // whole floats keep their decimal point
        Value::String("hello".to_string()),
        Value::String(String::new()),
    ];

    for value in values {
        let compact = parse(&to_json(&value)).unwrap();
        assert_eq!(compact, value, "compact round-trip for {:?}", value);
        let pretty = parse(&to_json_pretty(&value)).unwrap();
        assert_eq!(pretty, value, "pretty round-trip for {:?}", value);
    }
}

#[test]
fn test_round_trip_string_escapes() {
    let value = Value::String("a\"b\\c\nd\te\rf\u{0008}g\u{000c}h/i".to_string());
    assert_eq!(parse(&to_json(&value)).unwrap(), value);
}

#[test]
fn test_round_trip_nested() {
    let value = obj(vec![
        ("name", Value::String("Alice".to_string())),
        (
            "scores",
            Value::Array(vec![
                Value::Integer(1),
                Value::Float(2.5),
                Value::Null,
                Value::Boolean(false),
            ]),
        ),
        (
            "address",
            obj(vec![
                ("city", Value::String("NYC".to_string())),
                ("zip", Value::String("10001".to_string())),
            ]),
        ),
        ("empty_list", Value::Array(vec![])),
        ("empty_map", obj(vec![])),
    ]);

    assert_eq!(parse(&to_json(&value)).unwrap(), value);
    assert_eq!(parse(&to_json_pretty(&value)).unwrap(), value);
}

#[test]
fn test_object_key_order_preserved() {
    let doc = parse(r#"{"z": 1, "a": 2, "m": 3}"#).unwrap();
    let Value::Object(map) = &doc else {
        panic!("expected object");
    };
    let keys: Vec<&String> = map.keys().collect();
    assert_eq!(keys, ["z", "a", "m"]);
    assert_eq!(to_json(&doc), r#"{"z":1,"a":2,"m":3}"#);
}

// ============================================================================
// Acceptance
// ============================================================================

#[test]
fn test_parse_with_arbitrary_whitespace() {
    let doc = parse(" \t\r\n{ \"a\" : [ 1 , 2.5 , null ] }\n").unwrap();
    assert_eq!(
        doc,
        obj(vec![(
            "a",
            Value::Array(vec![Value::Integer(1), Value::Float(2.5), Value::Null]),
        )])
    );
}

#[test]
fn test_duplicate_keys_last_write_wins() {
    let doc = parse(r#"{"a": 1, "b": 2, "a": 3}"#).unwrap();
    let Value::Object(map) = &doc else {
        panic!("expected object");
    };
    assert_eq!(map.len(), 2);
    assert_eq!(map.get("a"), Some(&Value::Integer(3)));
}

#[test]
fn test_parse_negative_and_zero_numbers() {
    assert_eq!(parse("-0.5").unwrap(), Value::Float(-0.5));
    assert_eq!(parse("0").unwrap(), Value::Integer(0));
    assert_eq!(parse("-12").unwrap(), Value::Integer(-12));
}

// ============================================================================
// Rejection
// ============================================================================

#[test]
fn test_rejects_missing_value() {
    // {"a":}  -- '}' sits at offset 5
    let err = parse(r#"{"a":}"#).unwrap_err();
    assert!(
        matches!(err, ParseError::UnexpectedToken { pos: 5, .. }),
        "got {:?}",
        err
    );
}

#[test]
fn test_rejects_trailing_comma_in_array() {
    // [1,2,]  -- ']' sits at offset 5
    let err = parse("[1,2,]").unwrap_err();
    assert!(
        matches!(err, ParseError::UnexpectedToken { pos: 5, .. }),
        "got {:?}",
        err
    );
}

#[test]
fn test_rejects_single_quoted_strings() {
    let err = parse("{'a':1}").unwrap_err();
    assert!(
        matches!(err, ParseError::Lex(LexError::UnexpectedChar { ch: '\'', pos: 1 })),
        "got {:?}",
        err
    );
}

#[test]
fn test_rejects_unterminated_string() {
    let err = parse("\"abc").unwrap_err();
    assert!(
        matches!(err, ParseError::Lex(LexError::UnterminatedString { start: 0 })),
        "got {:?}",
        err
    );
}

#[test]
fn test_rejects_bad_escape() {
    let err = parse(r#""\q""#).unwrap_err();
    assert!(
        matches!(err, ParseError::Lex(LexError::BadEscape { ch: 'q', start: 0 })),
        "got {:?}",
        err
    );
}

#[test]
fn test_rejects_trailing_content() {
    let err = parse("{} {}").unwrap_err();
    assert!(
        matches!(err, ParseError::TrailingContent { pos: 3 }),
        "got {:?}",
        err
    );
}

#[test]
fn test_rejects_exponent_notation() {
    assert!(parse("1e5").is_err());
    assert!(parse("2.5E3").is_err());
}

#[test]
fn test_rejects_unknown_literal() {
    let err = parse("nil").unwrap_err();
    assert!(
        matches!(err, ParseError::Lex(LexError::UnknownLiteral { pos: 0 })),
        "got {:?}",
        err
    );
}

#[test]
fn test_rejects_missing_colon() {
    let err = parse(r#"{"a" 1}"#).unwrap_err();
    assert!(
        matches!(err, ParseError::UnexpectedToken { pos: 5, .. }),
        "got {:?}",
        err
    );
}

#[test]
fn test_rejects_non_string_key() {
    let err = parse("{1: 2}").unwrap_err();
    assert!(
        matches!(err, ParseError::UnexpectedToken { pos: 1, .. }),
        "got {:?}",
        err
    );
}

#[test]
fn test_rejects_unclosed_containers() {
    assert!(parse("[1, 2").is_err());
    assert!(parse(r#"{"a": 1"#).is_err());
}

#[test]
fn test_rejects_empty_input() {
    assert!(parse("").is_err());
    assert!(parse("   \n  ").is_err());
}

#[test]
fn test_rejects_bare_fraction() {
    assert!(parse("1.").is_err());
    assert!(parse("-.5").is_err());
}

#[test]
fn test_no_partial_document_on_failure() {
    // the error carries a position, never a partially built tree
    let err = parse(r#"{"a": 1, "b": }"#).unwrap_err();
    assert!(matches!(err, ParseError::UnexpectedToken { pos: 14, .. }));
}
