// List of traits needed for wrapping regular functions into a Helper.

use crate::context::Helper;
use serde_json::{Map, Value};

/// Conversion from a template value into a helper argument.
///
/// Values of the wrong type become the type's empty value instead of failing.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Self;
}

/// Conversion from a helper's return value into a template value.
pub trait IntoValue {
    fn into_value(self) -> Value;
}

impl Helper {
    /// Wraps a function with typed argument and return value.
    ///
    /// # Examples
    ///
    /// ```
    /// use tern::Helper;
    ///
    /// let shout = Helper::typed(|s: String| format!("{}!", s.to_uppercase()));
    /// assert_eq!(shout.call(serde_json::json!("hey")), serde_json::json!("HEY!"));
    /// ```
    pub fn typed<A, R, F>(function: F) -> Helper
    where
        A: FromValue,
        R: IntoValue,
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        Helper::new(move |value| function(A::from_value(value)).into_value())
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Self {
        value
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Self {
        value.as_bool().unwrap_or(false)
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Self {
        value.as_i64().unwrap_or(0)
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Self {
        value.as_f64().unwrap_or(0.)
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Self {
        match value {
            Value::String(s) => s,
            _ => String::new(),
        }
    }
}

impl FromValue for Vec<Value> {
    fn from_value(value: Value) -> Self {
        match value {
            Value::Array(arr) => arr,
            _ => Vec::new(),
        }
    }
}

impl FromValue for Map<String, Value> {
    fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Self {
        match value {
            Value::Null => None,
            v => Some(T::from_value(v)),
        }
    }
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::from(self)
    }
}

impl IntoValue for i64 {
    fn into_value(self) -> Value {
        Value::from(self)
    }
}

impl IntoValue for usize {
    fn into_value(self) -> Value {
        Value::from(self)
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::from(self)
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::from(self)
    }
}

impl IntoValue for &'static str {
    fn into_value(self) -> Value {
        Value::from(self)
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        self.map_or(Value::Null, IntoValue::into_value)
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::Array(self.into_iter().map(IntoValue::into_value).collect())
    }
}

#[test]
fn typed_helper_converts_arguments() {
    let double = Helper::typed(|n: i64| n * 2);

    assert_eq!(double.call(Value::from(21)), Value::from(42));
    assert_eq!(double.call(Value::from("x")), Value::from(0));
}

#[test]
fn typed_helper_with_options() {
    let greet = Helper::typed(|name: Option<String>| match name {
        Some(name) => format!("Hello, {}", name),
        None => "Hello, stranger".to_string(),
    });

    assert_eq!(greet.call(Value::Null), Value::from("Hello, stranger"));
    assert_eq!(greet.call(Value::from("Ann")), Value::from("Hello, Ann"));
}

#[test]
fn typed_helper_reading_keyword_arguments() {
    let link = Helper::typed(|args: Map<String, Value>| {
        format!(
            "{}:{}",
            String::from_value(args.get("href").cloned().unwrap_or_default()),
            bool::from_value(args.get("external").cloned().unwrap_or_default())
        )
    });

    assert_eq!(
        link.call(serde_json::json!({ "href": "/about", "external": true })),
        Value::from("/about:true")
    );
}
