use crate::context::{Convert, Helper, Helpers};
use serde_json::Value;

pub(crate) fn register(helpers: &mut Helpers) {
    helpers.insert("upcase", Helper::new(val_upcase));
    helpers.insert("downcase", Helper::new(val_downcase));
    helpers.insert("reverse", Helper::new(val_reverse));
    helpers.insert("length", Helper::new(val_length));
    helpers.insert("is_empty", Helper::new(val_is_empty));
    helpers.insert("json", Helper::new(val_stringify));
}

pub fn val_upcase(val: Value) -> Value {
    match val {
        Value::String(s) => Value::from(s.to_uppercase()),
        _ => Value::from(""),
    }
}

pub fn val_downcase(val: Value) -> Value {
    match val {
        Value::String(s) => Value::from(s.to_lowercase()),
        _ => Value::from(""),
    }
}

pub fn val_reverse(val: Value) -> Value {
    Value::from(val.to_str().chars().rev().collect::<String>())
}

pub fn val_length(val: Value) -> Value {
    match val {
        Value::String(s) => Value::from(s.chars().count()),
        Value::Array(arr) => Value::from(arr.len()),
        Value::Object(map) => Value::from(map.len()),
        _ => Value::from(0),
    }
}

pub fn val_is_empty(val: Value) -> Value {
    match val {
        Value::Null => Value::from(true),
        Value::String(s) => Value::from(s.is_empty()),
        Value::Array(arr) => Value::from(arr.is_empty()),
        Value::Object(map) => Value::from(map.is_empty()),
        _ => Value::from(false),
    }
}

pub fn val_stringify(val: Value) -> Value {
    Value::from(val.to_string())
}

#[test]
fn case_helpers_only_change_strings() {
    assert_eq!(val_upcase(Value::from("Mary")), "MARY");
    assert_eq!(val_downcase(Value::from("MARY")), "mary");
    assert_eq!(val_upcase(Value::Null), "");
    assert_eq!(val_upcase(Value::from(true)), "");
}

#[test]
fn reverse_helper() {
    assert_eq!(val_reverse(Value::from("Mary")), "yraM");
    assert_eq!(val_reverse(Value::from(123)), "321");
    assert_eq!(val_reverse(Value::Null), "");
}

#[test]
fn length_and_is_empty() {
    assert_eq!(val_length(serde_json::json!([1, 2, 3])), 3);
    assert_eq!(val_length(Value::from("héllo")), 5);
    assert_eq!(val_is_empty(serde_json::json!([])), true);
    assert_eq!(val_is_empty(serde_json::json!({ "a": 1 })), false);
}

#[test]
fn stringify_helper() {
    assert_eq!(
        val_stringify(serde_json::json!({ "a": [1, "b"] })),
        r#"{"a":[1,"b"]}"#
    );
}
