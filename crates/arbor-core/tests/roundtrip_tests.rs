use arbor_core::{
    deep_eq_across, from_value, parse, to_json_string, to_value, ArborError, JsonTree, NodeKind,
    Scalar,
};
use chrono::{Duration, TimeZone, Utc};
use serde_json::json;
use url::Url;
use uuid::Uuid;

/// Assert that parse -> serialize -> parse reproduces the same tree and the
/// same JSON value.
fn assert_roundtrip(json: &str) {
    let (tree, root) = parse(json).expect("parse failed");
    let text = to_json_string(&tree, root).expect("serialize failed");
    let (tree2, root2) = parse(&text).expect("reparse failed");
    assert!(
        deep_eq_across(&tree, root, &tree2, root2),
        "roundtrip mismatch:\n  input: {json}\n  text:  {text}"
    );
    let original: serde_json::Value = serde_json::from_str(json).unwrap();
    let emitted: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(original, emitted, "value mismatch for input {json}");
}

// ============================================================================
// Primitive roundtrips
// ============================================================================

#[test]
fn roundtrip_null() {
    assert_roundtrip("null");
}

#[test]
fn roundtrip_bools() {
    assert_roundtrip("true");
    assert_roundtrip("false");
}

#[test]
fn roundtrip_integers() {
    assert_roundtrip("0");
    assert_roundtrip("42");
    assert_roundtrip("-7");
    assert_roundtrip("9223372036854775807");
}

#[test]
fn roundtrip_large_unsigned() {
    assert_roundtrip("18446744073709551615");
}

#[test]
fn roundtrip_floats() {
    assert_roundtrip("3.14");
    assert_roundtrip("-0.5");
    assert_roundtrip("1e3");
}

#[test]
fn roundtrip_strings() {
    assert_roundtrip(r#""hello""#);
    assert_roundtrip(r#""""#);
    assert_roundtrip(r#""line1\nline2""#);
    assert_roundtrip(r#""tab\there""#);
    assert_roundtrip(r#""say \"hi\"""#);
    assert_roundtrip(r#""back\\slash""#);
    assert_roundtrip(r#""café 你好""#);
    assert_roundtrip(r#""control""#);
}

// ============================================================================
// Structure roundtrips
// ============================================================================

#[test]
fn roundtrip_flat_object() {
    assert_roundtrip(r#"{"name":"Alice","age":30,"active":true}"#);
}

#[test]
fn roundtrip_nested_object() {
    assert_roundtrip(r#"{"server":{"host":"localhost","port":8080},"debug":false}"#);
}

#[test]
fn roundtrip_empty_containers() {
    assert_roundtrip("{}");
    assert_roundtrip("[]");
    assert_roundtrip(r#"{"meta":{},"items":[]}"#);
}

#[test]
fn roundtrip_arrays() {
    assert_roundtrip("[1,2,3]");
    assert_roundtrip(r#"["a",null,true,2.5]"#);
    assert_roundtrip(r#"[[1,2],[3,[4]]]"#);
}

#[test]
fn roundtrip_mixed_document() {
    assert_roundtrip(
        r#"{"users":[{"id":1,"name":"Alice","tags":["admin"]},{"id":2,"name":"Bob","tags":[]}],"total":2}"#,
    );
}

#[test]
fn roundtrip_quoted_keys() {
    assert_roundtrip(r#"{"my key":"v","with\"quote":1,"bell":2}"#);
}

#[test]
fn roundtrip_preserves_property_order() {
    let (tree, root) = parse(r#"{"z":1,"a":2,"m":3}"#).unwrap();
    assert_eq!(to_json_string(&tree, root).unwrap(), r#"{"z":1,"a":2,"m":3}"#);
}

// ============================================================================
// Number tagging
// ============================================================================

#[test]
fn integer_and_float_tags_survive_text() {
    let (tree, root) = parse("[3,3.0]").unwrap();
    let int_node = tree.get_item(root, 0).unwrap();
    let float_node = tree.get_item(root, 1).unwrap();
    assert_eq!(tree.kind(int_node), NodeKind::Integer);
    assert_eq!(tree.kind(float_node), NodeKind::Float);

    let text = to_json_string(&tree, root).unwrap();
    assert_eq!(text, "[3,3.0]");
}

#[test]
fn nan_float_serializes_as_null() {
    let mut tree = JsonTree::new();
    let root = tree.new_value(f64::NAN);
    assert_eq!(to_json_string(&tree, root).unwrap(), "null");
}

// ============================================================================
// Extended scalar text forms
// ============================================================================

#[test]
fn date_serializes_as_rfc3339() {
    let mut tree = JsonTree::new();
    let root = tree.new_value(Scalar::Date(
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap(),
    ));
    assert_eq!(
        to_json_string(&tree, root).unwrap(),
        r#""2024-01-15T10:00:00Z""#
    );
}

#[test]
fn bytes_serialize_as_base64() {
    let mut tree = JsonTree::new();
    let root = tree.new_value(b"hi".to_vec());
    assert_eq!(to_json_string(&tree, root).unwrap(), r#""aGk=""#);
}

#[test]
fn guid_serializes_hyphenated() {
    let mut tree = JsonTree::new();
    let guid = Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
    let root = tree.new_value(guid);
    assert_eq!(
        to_json_string(&tree, root).unwrap(),
        r#""67e55044-10b1-426f-9247-bb680e5fe0c8""#
    );
}

#[test]
fn uri_serializes_as_string() {
    let mut tree = JsonTree::new();
    let url = Url::parse("https://example.com/a?b=1").unwrap();
    let root = tree.new_value(url);
    assert_eq!(
        to_json_string(&tree, root).unwrap(),
        r#""https://example.com/a?b=1""#
    );
}

#[test]
fn timespan_text_forms() {
    let cases = [
        (Duration::seconds(3661), "01:01:01"),
        (Duration::seconds(-90), "-00:01:30"),
        (Duration::seconds(90_061), "1.01:01:01"),
        (Duration::milliseconds(1500), "00:00:01.5"),
    ];
    for (span, expected) in cases {
        let mut tree = JsonTree::new();
        let root = tree.new_value(span);
        assert_eq!(
            to_json_string(&tree, root).unwrap(),
            format!("\"{expected}\""),
            "timespan {span:?}"
        );
    }
}

#[test]
fn undefined_serializes_as_null() {
    let mut tree = JsonTree::new();
    let root = tree.new_value(Scalar::Undefined);
    assert_eq!(to_json_string(&tree, root).unwrap(), "null");
}

#[test]
fn raw_text_splices_verbatim() {
    let mut tree = JsonTree::new();
    let arr = tree.new_array();
    let one = tree.new_value(1i64);
    tree.add(arr, one).unwrap();
    let raw = tree.new_raw(r#"{"pre":"rendered"}"#);
    tree.add(arr, raw).unwrap();
    assert_eq!(
        to_json_string(&tree, arr).unwrap(),
        r#"[1,{"pre":"rendered"}]"#
    );
}

#[test]
fn comments_are_omitted_from_text() {
    let mut tree = JsonTree::new();
    let arr = tree.new_array();
    let one = tree.new_value(1i64);
    tree.add(arr, one).unwrap();
    let note = tree.new_comment("between");
    tree.add(arr, note).unwrap();
    let two = tree.new_value(2i64);
    tree.add(arr, two).unwrap();
    assert_eq!(to_json_string(&tree, arr).unwrap(), "[1,2]");
}

#[test]
fn constructor_text_form() {
    let mut tree = JsonTree::new();
    let call = tree.new_constructor("Date");
    let arg = tree.new_value(1700000000i64);
    tree.add(call, arg).unwrap();
    assert_eq!(to_json_string(&tree, call).unwrap(), "new Date(1700000000)");

    let obj = tree.new_object();
    tree.insert_property(obj, "at", call).unwrap();
    assert_eq!(
        to_json_string(&tree, obj).unwrap(),
        r#"{"at":new Date(1700000000)}"#
    );
}

// ============================================================================
// Value bridge
// ============================================================================

#[test]
fn from_value_matches_parse() {
    let value = json!({"a":[1,{"b":null}],"c":"text"});
    let (ta, ra) = from_value(&value).unwrap();
    let (tb, rb) = parse(&value.to_string()).unwrap();
    assert!(deep_eq_across(&ta, ra, &tb, rb));
}

#[test]
fn to_value_roundtrips() {
    let value = json!({"k":[true,2,"three",4.5,null]});
    let (tree, root) = from_value(&value).unwrap();
    assert_eq!(to_value(&tree, root).unwrap(), value);
}

#[test]
fn to_value_renders_extended_scalars_as_strings() {
    let mut tree = JsonTree::new();
    let obj = tree.new_object();
    let when = tree.new_value(Scalar::Date(
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap(),
    ));
    tree.insert_property(obj, "when", when).unwrap();
    assert_eq!(
        to_value(&tree, obj).unwrap(),
        json!({"when":"2024-01-15T10:00:00Z"})
    );
}

#[test]
fn to_value_rejects_constructors() {
    let mut tree = JsonTree::new();
    let call = tree.new_constructor("Date");
    assert!(matches!(
        to_value(&tree, call),
        Err(ArborError::WrongType(_))
    ));
}

// ============================================================================
// Entry-point errors
// ============================================================================

#[test]
fn parse_error_carries_position() {
    match parse("{\"a\":\n  fail}") {
        Err(ArborError::Parse { line, column, .. }) => {
            assert_eq!(line, 2);
            assert!(column > 0);
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn load_reads_from_byte_reader() {
    let bytes: &[u8] = br#"{"ok":true}"#;
    let (tree, root) = arbor_core::load(bytes).unwrap();
    assert_eq!(tree.as_bool(tree.get(root, "ok").unwrap()), Some(true));
}
