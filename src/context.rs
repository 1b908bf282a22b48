use crate::default_functions;
use crate::error::RenderError;
use crate::exec::*;
use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use std::fmt;

static NULL: Value = Value::Null;

/// A function that templates can pipe values through or call with keyword arguments.
pub struct Helper(Box<dyn Fn(Value) -> Value + Send + Sync>);

impl Helper {
    pub fn new<F>(function: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        Helper(Box::new(function))
    }

    pub fn call(&self, value: Value) -> Value {
        (self.0)(value)
    }
}

impl fmt::Debug for Helper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Helper")
    }
}

/// Named helpers available while rendering.
#[derive(Debug, Default)]
pub struct Helpers {
    helpers: HashMap<String, Helper>,
}

impl Helpers {
    /// An empty registry.
    pub fn new() -> Self {
        Helpers::default()
    }

    /// A registry with the built-in helpers (`upcase`, `downcase`, `reverse`, `length`,
    /// `is_empty` and `json`).
    pub fn with_defaults() -> Self {
        let mut helpers = Helpers::new();
        default_functions::register(&mut helpers);
        helpers
    }

    /// Adds a helper, returning the one it replaces.
    pub fn insert(&mut self, name: impl Into<String>, helper: Helper) -> Option<Helper> {
        self.helpers.insert(name.into(), helper)
    }

    pub fn get(&self, name: &str) -> Option<&Helper> {
        self.helpers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.helpers.contains_key(name)
    }
}

// Values bound by one running `each` block.
#[derive(Debug)]
struct Frame {
    key: Option<String>,
    item: String,
    index: String,
    entries: Vec<(Value, Value)>,
    position: usize,
    position_value: Value,
}

impl Frame {
    fn get(&self, name: &str) -> Option<&Value> {
        let (key, item) = self.entries.get(self.position)?;

        if name == self.item {
            Some(item)
        } else if self.key.as_deref() == Some(name) {
            Some(key)
        } else if name == self.index {
            Some(&self.position_value)
        } else {
            None
        }
    }
}

/// State of a single render: the data, the helpers and the running loops.
#[derive(Debug)]
pub struct Context<'a> {
    data: &'a Value,
    helpers: &'a Helpers,
    frames: Vec<Frame>,
}

impl<'a> Context<'a> {
    pub fn new(data: &'a Value, helpers: &'a Helpers) -> Self {
        Context {
            data,
            helpers,
            frames: Vec::new(),
        }
    }

    /// Resolves a path. Loop bindings shadow the data; anything missing is `null`.
    pub fn get_value(&self, path: &Path) -> &Value {
        let root = path.root();
        let mut value = match self.frames.iter().rev().find_map(|frame| frame.get(root)) {
            Some(v) => v,
            None => match self.data.get(root) {
                Some(v) => v,
                None => return &NULL,
            },
        };

        for segment in path.segments.iter().skip(1) {
            let child = match value {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment
                    .parse::<usize>()
                    .ok()
                    .filter(|i| i.to_string() == *segment)
                    .and_then(|i| items.get(i)),
                _ => None,
            };

            match child {
                Some(v) => value = v,
                None => return &NULL,
            }
        }

        value
    }

    fn eval(&self, source: &Source) -> Value {
        match source {
            Source::Path(path) => self.get_value(path).clone(),
            Source::Literal(value) => value.clone(),
        }
    }

    fn helper(&self, name: &str) -> Result<&'a Helper, RenderError> {
        self.helpers.get(name).ok_or_else(|| RenderError::MissingHelper {
            name: name.to_string(),
        })
    }

    pub fn pipe(&self, piped: &Piped) -> Result<Value, RenderError> {
        let mut value = self.eval(&piped.source);
        for name in &piped.helpers {
            value = self.helper(name)?.call(value);
        }

        Ok(value)
    }

    pub fn call(&self, call: &Call) -> Result<Value, RenderError> {
        let helper = self.helper(&call.function)?;

        let mut arguments = Map::new();
        for (name, source) in &call.arguments {
            arguments.insert(name.clone(), self.eval(source));
        }

        Ok(helper.call(Value::Object(arguments)))
    }

    pub fn test(&self, test: &Test) -> Result<bool, RenderError> {
        match test {
            Test::Truthy(piped) => Ok(self.pipe(piped)?.is_true()),
            Test::Falsy(piped) => Ok(!self.pipe(piped)?.is_true()),
            Test::Equals(path, source) => Ok(strict_equals(self.get_value(path), &self.eval(source))),
        }
    }

    /// Starts a loop. Returns false when there is nothing to iterate.
    pub fn enter_loop(&mut self, each: &Loop) -> Result<bool, RenderError> {
        let keyed = each.key.is_some();
        let entries: Vec<(Value, Value)> = match self.get_value(&each.iterable) {
            // `null`, `false`, `0` and `""` iterate zero times.
            falsy if !falsy.is_true() => Vec::new(),
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    let key = if keyed {
                        Value::from(i.to_string())
                    } else {
                        Value::from(i)
                    };
                    (key, item.clone())
                })
                .collect(),
            Value::Object(map) if keyed => map
                .iter()
                .map(|(key, value)| (Value::from(key.as_str()), value.clone()))
                .collect(),
            other => {
                return Err(RenderError::NotIterable {
                    path: each.iterable.to_string(),
                    found: type_name(other),
                })
            }
        };

        if entries.is_empty() {
            return Ok(false);
        }

        self.frames.push(Frame {
            key: each.key.clone(),
            item: each.item.clone(),
            index: each.index.clone(),
            entries,
            position: 0,
            position_value: Value::from(0),
        });

        Ok(true)
    }

    /// Moves the innermost loop forward. Returns false, and drops the loop, once it is done.
    pub fn next_iteration(&mut self) -> bool {
        let Some(frame) = self.frames.last_mut() else {
            return false;
        };

        frame.position += 1;
        if frame.position < frame.entries.len() {
            frame.position_value = Value::from(frame.position);
            return true;
        }

        self.frames.pop();
        false
    }
}

// `===`, except that arrays and objects compare by value.
fn strict_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => l.as_f64() == r.as_f64(),
        (l, r) => l == r,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

pub trait Convert {
    fn is_true(&self) -> bool;
    fn to_str(&self) -> String;
}

impl Convert for Value {
    fn is_true(&self) -> bool {
        match self {
            Value::Bool(v) => *v,
            Value::String(s) => !s.is_empty(),
            Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.),
            Value::Array(_) => true,
            Value::Object(_) => true,
            Value::Null => false,
        }
    }

    /// Prints like JavaScript's `String()`, except that `null` prints nothing.
    fn to_str(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => js_number(n),
            Value::String(s) => s.clone(),
            Value::Array(items) => items
                .iter()
                .map(Convert::to_str)
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => "[object Object]".to_string(),
        }
    }
}

// `1.0` prints as `1`, `-0` as `0`.
fn js_number(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }

    match n.as_f64() {
        Some(f) if f == 0. => "0".to_string(),
        Some(f) if f.fract() == 0. && f.abs() < 1e21 => format!("{:.0}", f),
        Some(f) if (1e-7..1e21).contains(&f.abs()) => f.to_string(),
        _ => n.to_string(),
    }
}

#[cfg(test)]
fn path(path: &str) -> Path {
    Path::parse(path)
}

#[test]
fn get_nested_value() {
    let data = serde_json::json!({ "user": { "name": "Jane", "tags": ["a", "b"] } });
    let helpers = Helpers::new();
    let context = Context::new(&data, &helpers);

    assert_eq!(context.get_value(&path("user.name")), "Jane");
    assert_eq!(context.get_value(&path("user.tags.1")), "b");
    assert_eq!(context.get_value(&path("user.missing.deeper")), &Value::Null);
    assert_eq!(context.get_value(&path("nobody")), &Value::Null);
}

#[test]
fn loop_bindings_shadow_data() {
    let data = serde_json::json!({ "person": "outer", "people": [{ "name": "John" }] });
    let helpers = Helpers::new();
    let mut context = Context::new(&data, &helpers);

    let each = Loop {
        iterable: path("people"),
        key: None,
        item: "person".to_string(),
        index: "i".to_string(),
    };

    assert!(context.enter_loop(&each).unwrap());
    assert_eq!(context.get_value(&path("person.name")), "John");
    assert_eq!(context.get_value(&path("i")), 0);

    assert!(!context.next_iteration());
    assert_eq!(context.get_value(&path("person")), "outer");
}

#[test]
fn keyed_loop_follows_insertion_order() {
    let data = serde_json::json!({ "colors": { "red": "#f00", "green": "#0f0", "blue": "#00f" } });
    let helpers = Helpers::new();
    let mut context = Context::new(&data, &helpers);

    let each = Loop {
        iterable: path("colors"),
        key: Some("name".to_string()),
        item: "hex".to_string(),
        index: "_index".to_string(),
    };

    let mut seen = Vec::new();
    let mut running = context.enter_loop(&each).unwrap();
    while running {
        seen.push(format!(
            "{}={}",
            context.get_value(&path("name")).to_str(),
            context.get_value(&path("hex")).to_str()
        ));
        running = context.next_iteration();
    }

    assert_eq!(seen, ["red=#f00", "green=#0f0", "blue=#00f"]);
}

#[test]
fn iterating_a_scalar_fails() {
    let data = serde_json::json!({ "count": 3, "colors": { "red": "#f00" } });
    let helpers = Helpers::new();
    let mut context = Context::new(&data, &helpers);

    let each = |iterable: &str| Loop {
        iterable: path(iterable),
        key: None,
        item: "x".to_string(),
        index: "_index".to_string(),
    };

    assert_eq!(
        context.enter_loop(&each("count")),
        Err(RenderError::NotIterable {
            path: "count".to_string(),
            found: "a number",
        })
    );
    assert!(context.enter_loop(&each("colors")).is_err());
    assert_eq!(context.enter_loop(&each("missing")), Ok(false));
}

#[test]
fn missing_helper_fails() {
    let data = serde_json::json!({ "name": "Mary" });
    let helpers = Helpers::new();
    let context = Context::new(&data, &helpers);

    let piped = Piped {
        source: Source::Path(path("name")),
        helpers: vec!["shout".to_string()],
    };

    assert_eq!(
        context.pipe(&piped),
        Err(RenderError::MissingHelper {
            name: "shout".to_string()
        })
    );
}

#[test]
fn truthiness() {
    assert!(!Value::Null.is_true());
    assert!(!serde_json::json!("").is_true());
    assert!(!serde_json::json!(0).is_true());
    assert!(serde_json::json!([]).is_true());
    assert!(serde_json::json!({}).is_true());
    assert!(serde_json::json!(0.5).is_true());
    assert!(serde_json::json!("no").is_true());
}

#[test]
fn printing_follows_javascript() {
    use serde_json::json;

    assert_eq!(Value::Null.to_str(), "");
    assert_eq!(json!(true).to_str(), "true");
    assert_eq!(json!(1.0).to_str(), "1");
    assert_eq!(json!(-0.0).to_str(), "0");
    assert_eq!(json!(2.5).to_str(), "2.5");
    assert_eq!(json!(-7).to_str(), "-7");
    assert_eq!(json!(["a", 1, null, [2, 3]]).to_str(), "a,1,,2,3");
    assert_eq!(json!({ "a": 1 }).to_str(), "[object Object]");
}

#[test]
fn array_index_must_be_canonical() {
    let data = serde_json::json!({ "tags": ["a", "b"] });
    let helpers = Helpers::new();
    let context = Context::new(&data, &helpers);

    assert_eq!(context.get_value(&path("tags.1")), "b");
    assert_eq!(context.get_value(&path("tags.01")), &Value::Null);
}

#[test]
fn numbers_compare_by_value() {
    assert!(strict_equals(&serde_json::json!(1), &serde_json::json!(1.0)));
    assert!(!strict_equals(&serde_json::json!(1), &serde_json::json!("1")));
    assert!(strict_equals(&Value::Null, &Value::Null));
}
