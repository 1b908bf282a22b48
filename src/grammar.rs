//! The expressions a template understands.
//!
//! Each [`ExpressionForm`] recognizes one shape of `{...}` expression and compiles it into an
//! instruction for the [`Executer`](crate::exec::Executer) plus the matching fragment of the
//! generated JavaScript function. Forms are tried in the order of [`EXPRESSION_FORMS`] and the
//! first match wins, since some shapes overlap (`{when a=b}` would also read as a call to `when`).

use crate::error::CompileError;
use crate::exec::*;
use crate::scope::{BlockKind, Scope};
use regex::{Captures, Match, Regex};
use serde_json::Value;
use std::sync::LazyLock;

fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("expression pattern is valid")
}

// A JavaScript identifier; roots of paths, loop bindings and helper names.
const IDENT: &str = r"[A-Za-z_$][A-Za-z0-9_$]*";

// A dotted path. Segments after the root may be numeric, `items.0`.
const PATH: &str = r"[A-Za-z_$][A-Za-z0-9_$]*(?:\.[A-Za-z0-9_$]+)*";

const NUMBER: &str = r"-?(?:0|[1-9][0-9]*)(?:\.[0-9]+)?";

// `| helper | helper`
fn helpers_pattern() -> String {
    format!(r"(?: *\| *{})+", IDENT)
}

// A quoted string, a number, `true`, `false`, `null` or a path.
fn value_pattern() -> String {
    format!(r#"(?:"([^"]*)"|'([^']*)'|({}|{}))"#, NUMBER, PATH)
}

static VARIABLE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(&format!(r"^\{{({})({})?\}}$", PATH, helpers_pattern()))
});

static IF: LazyLock<Regex> = LazyLock::new(|| {
    pattern(&format!(r"^\{{if ({})({})?\}}$", PATH, helpers_pattern()))
});

static UNLESS: LazyLock<Regex> = LazyLock::new(|| {
    pattern(&format!(r"^\{{unless ({})({})?\}}$", PATH, helpers_pattern()))
});

static WHEN: LazyLock<Regex> = LazyLock::new(|| {
    pattern(&format!(r"^\{{when ({}) *= *{}\}}$", PATH, value_pattern()))
});

static EACH_ARRAY: LazyLock<Regex> = LazyLock::new(|| {
    pattern(&format!(
        r"^\{{each ({0})(?:, *({0}))? +in +({1})\}}$",
        IDENT, PATH
    ))
});

static EACH_MAP: LazyLock<Regex> = LazyLock::new(|| {
    pattern(&format!(
        r"^\{{each ({0}) *=> *({0})(?:, *({0}))? +in +({1})\}}$",
        IDENT, PATH
    ))
});

static QUOTED_PIPE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(&format!(
        r#"^\{{(?:"([^"]*)"|'([^']*)')({})\}}$"#,
        helpers_pattern()
    ))
});

static FUNCTION_CALL: LazyLock<Regex> = LazyLock::new(|| {
    pattern(&format!(
        r"^\{{({})((?: +[A-Za-z0-9_]+={})+) *\}}$",
        IDENT,
        value_pattern()
    ))
});

static ATTRIBUTE: LazyLock<Regex> =
    LazyLock::new(|| pattern(&format!(r"([A-Za-z0-9_]+)={}", value_pattern())));

static NUMBER_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| pattern(&format!("^{}$", NUMBER)));

static JS_IDENT: LazyLock<Regex> = LazyLock::new(|| pattern(&format!("^{}$", IDENT)));

// Names the generated function cannot destructure or bind.
const RESERVED: &[&str] = &[
    "_encode", "arguments", "await", "break", "case", "catch", "class", "const", "continue",
    "debugger", "default", "delete", "do", "else", "enum", "eval", "export", "extends", "false",
    "finally", "for", "function", "if", "implements", "import", "in", "instanceof", "interface",
    "let", "new", "null", "package", "private", "protected", "public", "return", "static",
    "super", "switch", "this", "throw", "true", "try", "typeof", "var", "void", "while", "with",
    "yield",
];

/// Name bound to the loop position when an `each` block does not name it.
pub const DEFAULT_INDEX: &str = "_index";

/// What compiling an expression does to the local captures.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum ScopeChange {
    Keep,
    /// The expression opens a block; its local captures form a new scope.
    Push,
    /// The expression closes a block.
    Pop,
}

/// Result of compiling one expression.
#[derive(PartialEq, Debug, Clone)]
pub struct Compiled {
    /// Fragment of the generated JavaScript function.
    pub output: String,
    pub inst: Inst,
    /// Names the caller has to provide. Only their root segment matters.
    pub global_captures: Vec<String>,
    /// Names bound by the expression itself.
    pub local_captures: Vec<String>,
    pub scope_change: ScopeChange,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum ExpressionForm {
    /// `{path}` or `{path | helper | ...}`
    Variable,
    /// `{if path}` with optional helpers
    If,
    /// `{unless path}` with optional helpers
    Unless,
    /// `{when path="value"}`, `{when path='value'}` or `{when path=other.path}`
    When,
    /// `{each item in iterable}` or `{each item, index in iterable}`
    EachArray,
    /// `{each key => value in mapping}` or `{each key => value, index in mapping}`
    EachMap,
    /// `{/if}`, `{/unless}`, `{/when}` and `{/each}`
    Close(BlockKind),
    /// `{"text" | helper}` or `{'text' | helper}`
    QuotedPipe,
    /// `{name key=value ...}`
    FunctionCall,
}

/// Every expression form, in the order they are tried.
pub const EXPRESSION_FORMS: [ExpressionForm; 12] = [
    ExpressionForm::Variable,
    ExpressionForm::If,
    ExpressionForm::Close(BlockKind::If),
    ExpressionForm::Unless,
    ExpressionForm::Close(BlockKind::Unless),
    ExpressionForm::When,
    ExpressionForm::Close(BlockKind::When),
    ExpressionForm::EachArray,
    ExpressionForm::EachMap,
    ExpressionForm::Close(BlockKind::Each),
    ExpressionForm::QuotedPipe,
    ExpressionForm::FunctionCall,
];

impl ExpressionForm {
    fn pattern(&self) -> Option<&'static Regex> {
        match self {
            ExpressionForm::Variable => Some(&*VARIABLE),
            ExpressionForm::If => Some(&*IF),
            ExpressionForm::Unless => Some(&*UNLESS),
            ExpressionForm::When => Some(&*WHEN),
            ExpressionForm::EachArray => Some(&*EACH_ARRAY),
            ExpressionForm::EachMap => Some(&*EACH_MAP),
            ExpressionForm::QuotedPipe => Some(&*QUOTED_PIPE),
            ExpressionForm::FunctionCall => Some(&*FUNCTION_CALL),
            ExpressionForm::Close(_) => None,
        }
    }

    pub fn matches(&self, expression: &str) -> bool {
        match self {
            ExpressionForm::Close(kind) => is_closing_tag(expression, *kind),
            form => form
                .pattern()
                .is_some_and(|pattern| pattern.is_match(expression)),
        }
    }

    pub fn compile(&self, expression: &str, scope: &mut Scope) -> Result<Compiled, CompileError> {
        if let ExpressionForm::Close(kind) = self {
            if !is_closing_tag(expression, *kind) {
                return Err(malformed(expression, scope));
            }
            return compile_close(*kind, scope);
        }

        let caps = self
            .pattern()
            .and_then(|pattern| pattern.captures(expression))
            .ok_or_else(|| malformed(expression, scope))?;

        match self {
            ExpressionForm::Variable => Ok(compile_variable(&caps, scope)),
            ExpressionForm::If => Ok(compile_condition(BlockKind::If, &caps, scope)),
            ExpressionForm::Unless => Ok(compile_condition(BlockKind::Unless, &caps, scope)),
            ExpressionForm::When => Ok(compile_when(&caps, scope)),
            ExpressionForm::EachArray => Ok(compile_each_array(&caps, scope)),
            ExpressionForm::EachMap => Ok(compile_each_map(&caps, scope)),
            ExpressionForm::QuotedPipe => Ok(compile_quoted_pipe(&caps)),
            ExpressionForm::FunctionCall => Ok(compile_function_call(&caps, scope)),
            ExpressionForm::Close(_) => Err(malformed(expression, scope)),
        }
    }
}

/// Compiles an expression with the first form that matches it.
pub fn compile_expression(expression: &str, scope: &mut Scope) -> Result<Compiled, CompileError> {
    let unknown = |scope: &Scope| CompileError::UnknownExpression {
        expression: expression.to_string(),
        location: scope.location(),
    };

    let form = EXPRESSION_FORMS
        .iter()
        .find(|form| form.matches(expression))
        .ok_or_else(|| unknown(scope))?;

    let compiled = form.compile(expression, scope)?;
    if binds_invalid_name(&compiled) {
        return Err(unknown(scope));
    }

    Ok(compiled)
}

// Reserved words cannot be destructured, and a loop cannot bind one name twice.
fn binds_invalid_name(compiled: &Compiled) -> bool {
    let reserved = compiled
        .global_captures
        .iter()
        .chain(&compiled.local_captures)
        .any(|name| RESERVED.contains(&name.as_str()));

    let duplicated = matches!(compiled.inst, Inst::Each(_))
        && compiled
            .local_captures
            .iter()
            .enumerate()
            .any(|(i, name)| compiled.local_captures[..i].contains(name));

    reserved || duplicated
}

fn is_closing_tag(expression: &str, kind: BlockKind) -> bool {
    expression
        .strip_prefix("{/")
        .and_then(|rest| rest.strip_suffix('}'))
        == Some(kind.as_str())
}

fn malformed(expression: &str, scope: &Scope) -> CompileError {
    CompileError::MalformedExpression {
        expression: expression.to_string(),
        location: scope.location(),
    }
}

fn helper_names(raw: Option<Match>) -> Vec<String> {
    raw.map(|raw| {
        raw.as_str()
            .split('|')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

// `h2(h1(input))`
fn js_helper_chain(input: String, helpers: &[String]) -> String {
    helpers
        .iter()
        .fold(input, |buffer, helper| format!("{}({})", helper, buffer))
}

/// A JavaScript string literal.
pub(crate) fn js_string(text: &str) -> String {
    Value::from(text).to_string()
}

// `user?.tags?.["0"]`. Missing parents give `undefined` instead of throwing.
fn js_path(path: &Path) -> String {
    let mut js = path.root().to_string();

    for segment in path.segments.iter().skip(1) {
        if JS_IDENT.is_match(segment) {
            js.push_str("?.");
            js.push_str(segment);
        } else {
            js.push_str("?.[");
            js.push_str(&js_string(segment));
            js.push(']');
        }
    }

    js
}

fn js_source(source: &Source) -> String {
    match source {
        Source::Path(path) => js_path(path),
        Source::Literal(value) => value.to_string(),
    }
}

// Missing values compare as `null`.
fn js_operand(source: &Source) -> String {
    match source {
        Source::Path(path) => format!("({} ?? null)", js_path(path)),
        Source::Literal(value) => value.to_string(),
    }
}

// Splits the captures of a path into the caller provided and the locally bound ones.
fn capture_path(
    path: &Path,
    scope: &Scope,
    global_captures: &mut Vec<String>,
    local_captures: &mut Vec<String>,
) {
    let root = path.root().to_string();
    if scope.has_local_capture(&root) {
        local_captures.push(root);
    } else {
        global_captures.push(root);
    }
}

fn compile_variable(caps: &Captures, scope: &mut Scope) -> Compiled {
    let path = Path::parse(&caps[1]);
    let helpers = helper_names(caps.get(2));

    let mut global_captures = Vec::new();
    let mut local_captures = Vec::new();
    capture_path(&path, scope, &mut global_captures, &mut local_captures);
    global_captures.extend(helpers.iter().cloned());

    let input = js_helper_chain(js_path(&path), &helpers);

    Compiled {
        output: format!(" + _encode({})", input),
        inst: Inst::Print(Piped {
            source: Source::Path(path),
            helpers,
        }),
        global_captures,
        local_captures,
        scope_change: ScopeChange::Keep,
    }
}

fn compile_quoted_pipe(caps: &Captures) -> Compiled {
    let text = caps
        .get(1)
        .or_else(|| caps.get(2))
        .map_or("", |text| text.as_str());
    let helpers = helper_names(caps.get(3));

    let input = js_helper_chain(js_string(text), &helpers);

    Compiled {
        output: format!(" + _encode({})", input),
        inst: Inst::Print(Piped {
            source: Source::Literal(Value::from(text)),
            helpers: helpers.clone(),
        }),
        global_captures: helpers,
        local_captures: Vec::new(),
        scope_change: ScopeChange::Keep,
    }
}

// `{if ...}` and `{unless ...}`
fn compile_condition(kind: BlockKind, caps: &Captures, scope: &mut Scope) -> Compiled {
    let path = Path::parse(&caps[1]);
    let helpers = helper_names(caps.get(2));

    let mut global_captures = Vec::new();
    let mut local_captures = Vec::new();
    capture_path(&path, scope, &mut global_captures, &mut local_captures);
    global_captures.extend(helpers.iter().cloned());

    scope.open_block(kind);

    let input = js_helper_chain(js_path(&path), &helpers);
    let piped = Piped {
        source: Source::Path(path),
        helpers,
    };

    let (output, test) = if kind == BlockKind::Unless {
        (format!(" + (!{} ? ( \"\"", input), Test::Falsy(piped))
    } else {
        (format!(" + ({} ? ( \"\"", input), Test::Truthy(piped))
    };

    Compiled {
        output,
        inst: Inst::If(test),
        global_captures,
        // A conditional binds nothing for its body.
        local_captures: Vec::new(),
        scope_change: ScopeChange::Push,
    }
}

fn compile_when(caps: &Captures, scope: &mut Scope) -> Compiled {
    let path = Path::parse(&caps[1]);

    let mut global_captures = Vec::new();
    let mut local_captures = Vec::new();
    capture_path(&path, scope, &mut global_captures, &mut local_captures);

    let expected = value_source(caps, 2);
    if let Source::Path(other) = &expected {
        capture_path(other, scope, &mut global_captures, &mut local_captures);
    }

    scope.open_block(BlockKind::When);

    let left = js_operand(&Source::Path(path.clone()));

    Compiled {
        output: format!(" + ({} === {} ? ( \"\"", left, js_operand(&expected)),
        inst: Inst::If(Test::Equals(path, expected)),
        global_captures,
        local_captures: Vec::new(),
        scope_change: ScopeChange::Push,
    }
}

fn iterable_captures(iterable: &Path, scope: &Scope) -> Vec<String> {
    if scope.has_local_capture(iterable.root()) {
        Vec::new()
    } else {
        vec![iterable.root().to_string()]
    }
}

fn compile_each_array(caps: &Captures, scope: &mut Scope) -> Compiled {
    let item = caps[1].to_string();
    let index = caps.get(2).map_or(DEFAULT_INDEX, |index| index.as_str());
    let iterable = Path::parse(&caps[3]);

    let global_captures = iterable_captures(&iterable, scope);
    scope.open_block(BlockKind::Each);

    Compiled {
        output: format!(
            " + ({} || []).map(({}, {}) => {{ return \"\"",
            js_path(&iterable),
            item,
            index
        ),
        global_captures,
        local_captures: vec![item.clone(), index.to_string()],
        inst: Inst::Each(Loop {
            iterable,
            key: None,
            item,
            index: index.to_string(),
        }),
        scope_change: ScopeChange::Push,
    }
}

fn compile_each_map(caps: &Captures, scope: &mut Scope) -> Compiled {
    let key = caps[1].to_string();
    let value = caps[2].to_string();
    let index = caps.get(3).map_or(DEFAULT_INDEX, |index| index.as_str());
    let iterable = Path::parse(&caps[4]);

    let global_captures = iterable_captures(&iterable, scope);
    scope.open_block(BlockKind::Each);

    Compiled {
        output: format!(
            " + Object.entries({} || {{}}).map(([{}, {}], {}) => {{ return \"\"",
            js_path(&iterable),
            key,
            value,
            index
        ),
        global_captures,
        local_captures: vec![key.clone(), value.clone(), index.to_string()],
        inst: Inst::Each(Loop {
            iterable,
            key: Some(key),
            item: value,
            index: index.to_string(),
        }),
        scope_change: ScopeChange::Push,
    }
}

fn compile_close(kind: BlockKind, scope: &mut Scope) -> Result<Compiled, CompileError> {
    scope.close_block(kind)?;

    let output = match kind {
        BlockKind::Each => "; }).join(\"\")",
        _ => ") : \"\")",
    };

    Ok(Compiled {
        output: output.to_string(),
        inst: Inst::End(kind),
        global_captures: Vec::new(),
        local_captures: Vec::new(),
        scope_change: ScopeChange::Pop,
    })
}

// A value written in an expression, its groups starting at `first`: double quoted, single
// quoted, then bare.
fn value_source(caps: &Captures, first: usize) -> Source {
    if let Some(text) = caps.get(first).or_else(|| caps.get(first + 1)) {
        return Source::Literal(Value::from(text.as_str()));
    }

    match caps.get(first + 2).map_or("", |raw| raw.as_str()) {
        "true" => Source::Literal(Value::Bool(true)),
        "false" => Source::Literal(Value::Bool(false)),
        "null" => Source::Literal(Value::Null),
        number if NUMBER_LITERAL.is_match(number) => Source::Literal(number_value(number)),
        path => Source::Path(Path::parse(path)),
    }
}

fn number_value(number: &str) -> Value {
    number
        .parse::<i64>()
        .map(Value::from)
        .or_else(|_| number.parse::<f64>().map(Value::from))
        .unwrap_or(Value::Null)
}

fn compile_function_call(caps: &Captures, scope: &mut Scope) -> Compiled {
    let function = caps[1].to_string();

    let mut global_captures = Vec::new();
    let mut local_captures = Vec::new();
    capture_path(
        &Path::parse(&function),
        scope,
        &mut global_captures,
        &mut local_captures,
    );

    let mut arguments = Vec::new();
    for attribute in ATTRIBUTE.captures_iter(&caps[2]) {
        let value = value_source(&attribute, 2);
        if let Source::Path(path) = &value {
            capture_path(path, scope, &mut global_captures, &mut local_captures);
        }
        arguments.push((attribute[1].to_string(), value));
    }

    let js_arguments = arguments
        .iter()
        .map(|(name, value)| format!("{}: {}", js_string(name), js_source(value)))
        .collect::<Vec<_>>()
        .join(", ");

    Compiled {
        output: format!(" + _encode({}({{{}}}))", function, js_arguments),
        inst: Inst::Call(Call {
            function,
            arguments,
        }),
        global_captures,
        local_captures,
        scope_change: ScopeChange::Keep,
    }
}

#[cfg(test)]
fn form_of(expression: &str) -> Option<ExpressionForm> {
    EXPRESSION_FORMS
        .iter()
        .find(|form| form.matches(expression))
        .copied()
}

#[cfg(test)]
fn piped(path: &str, helpers: &[&str]) -> Piped {
    Piped {
        source: Source::Path(Path::parse(path)),
        helpers: helpers.iter().map(|h| h.to_string()).collect(),
    }
}

#[test]
fn dispatch_picks_first_matching_form() {
    assert_eq!(form_of("{name}"), Some(ExpressionForm::Variable));
    assert_eq!(form_of("{user.name | upcase}"), Some(ExpressionForm::Variable));
    assert_eq!(form_of("{if ready}"), Some(ExpressionForm::If));
    assert_eq!(form_of("{/if}"), Some(ExpressionForm::Close(BlockKind::If)));
    assert_eq!(form_of("{unless ready | is_empty}"), Some(ExpressionForm::Unless));
    assert_eq!(form_of("{when status=\"ready\"}"), Some(ExpressionForm::When));
    assert_eq!(form_of("{each p in people}"), Some(ExpressionForm::EachArray));
    assert_eq!(form_of("{each p, i in people}"), Some(ExpressionForm::EachArray));
    assert_eq!(form_of("{each k => v in colors}"), Some(ExpressionForm::EachMap));
    assert_eq!(form_of("{/each}"), Some(ExpressionForm::Close(BlockKind::Each)));
    assert_eq!(form_of("{'hi' | upcase}"), Some(ExpressionForm::QuotedPipe));
    assert_eq!(form_of("{fn name=user.name}"), Some(ExpressionForm::FunctionCall));
    assert_eq!(form_of("{foo bar baz}"), None);
    assert_eq!(form_of("{\"hi\"}"), None);
    assert_eq!(form_of("{}"), None);
}

#[test]
fn compile_variable_with_helpers() {
    let mut scope = Scope::new("");
    let compiled = compile_expression("{user.name | upcase | reverse}", &mut scope).unwrap();

    assert_eq!(
        compiled,
        Compiled {
            output: " + _encode(reverse(upcase(user?.name)))".to_string(),
            inst: Inst::Print(piped("user.name", &["upcase", "reverse"])),
            global_captures: vec![
                "user".to_string(),
                "upcase".to_string(),
                "reverse".to_string()
            ],
            local_captures: vec![],
            scope_change: ScopeChange::Keep,
        }
    );
}

#[test]
fn compile_local_variable() {
    let mut scope = Scope::new("");
    scope.push_local_captures(vec!["person".to_string()]);
    let compiled = compile_expression("{person.name}", &mut scope).unwrap();

    assert!(compiled.global_captures.is_empty());
    assert_eq!(compiled.local_captures, ["person"]);
}

#[test]
fn compile_quoted_pipe_form() {
    let mut scope = Scope::new("");
    let compiled = compile_expression("{'it\"s' | upcase}", &mut scope).unwrap();

    assert_eq!(compiled.output, r#" + _encode(upcase("it\"s"))"#);
    assert_eq!(compiled.global_captures, ["upcase"]);
    assert_eq!(
        compiled.inst,
        Inst::Print(Piped {
            source: Source::Literal(Value::from("it\"s")),
            helpers: vec!["upcase".to_string()],
        })
    );
}

#[test]
fn compile_unless_opens_block() {
    let mut scope = Scope::new("");
    let compiled = compile_expression("{unless list | is_empty}", &mut scope).unwrap();

    assert_eq!(compiled.output, " + (!is_empty(list) ? ( \"\"");
    assert_eq!(compiled.inst, Inst::If(Test::Falsy(piped("list", &["is_empty"]))));
    assert_eq!(compiled.scope_change, ScopeChange::Push);
    assert_eq!(scope.open_blocks().len(), 1);

    let closing = compile_expression("{/unless}", &mut scope).unwrap();
    assert_eq!(closing.output, ") : \"\")");
    assert_eq!(closing.inst, Inst::End(BlockKind::Unless));
    assert!(scope.open_blocks().is_empty());
}

#[test]
fn compile_when_with_literal_and_path() {
    let mut scope = Scope::new("");

    let compiled = compile_expression("{when status='ready'}", &mut scope).unwrap();
    assert_eq!(compiled.output, r#" + ((status ?? null) === "ready" ? ( """#);
    assert_eq!(
        compiled.inst,
        Inst::If(Test::Equals(
            Path::parse("status"),
            Source::Literal(Value::from("ready"))
        ))
    );

    let compiled = compile_expression("{when user.role=roles.admin}", &mut scope).unwrap();
    assert_eq!(compiled.global_captures, ["user", "roles"]);
    assert_eq!(
        compiled.output,
        " + ((user?.role ?? null) === (roles?.admin ?? null) ? ( \"\""
    );
}

#[test]
fn compile_when_with_bare_literals() {
    let mut scope = Scope::new("");

    for (expression, expected) in [
        ("{when n=1}", Value::from(1)),
        ("{when n=-2.5}", Value::from(-2.5)),
        ("{when n=true}", Value::Bool(true)),
        ("{when n=null}", Value::Null),
    ] {
        let compiled = compile_expression(expression, &mut scope).unwrap();
        assert_eq!(compiled.global_captures, ["n"], "{}", expression);
        assert_eq!(
            compiled.inst,
            Inst::If(Test::Equals(Path::parse("n"), Source::Literal(expected)))
        );
    }

    let compiled = compile_expression("{when n=1}", &mut scope).unwrap();
    assert_eq!(compiled.output, " + ((n ?? null) === 1 ? ( \"\"");
}

#[test]
fn compile_each_binds_locals() {
    let mut scope = Scope::new("");
    let compiled = compile_expression("{each person in people}", &mut scope).unwrap();

    assert_eq!(
        compiled.output,
        " + (people || []).map((person, _index) => { return \"\""
    );
    assert_eq!(compiled.global_captures, ["people"]);
    assert_eq!(compiled.local_captures, ["person", "_index"]);

    let compiled = compile_expression("{each name => hex, i in theme.colors}", &mut scope).unwrap();
    assert_eq!(
        compiled.inst,
        Inst::Each(Loop {
            iterable: Path::parse("theme.colors"),
            key: Some("name".to_string()),
            item: "hex".to_string(),
            index: "i".to_string(),
        })
    );
    assert_eq!(compiled.local_captures, ["name", "hex", "i"]);
    assert_eq!(
        compiled.output,
        " + Object.entries(theme?.colors || {}).map(([name, hex], i) => { return \"\""
    );
}

#[test]
fn compile_numeric_path_segment() {
    let mut scope = Scope::new("");
    let compiled = compile_expression("{rows.0.name}", &mut scope).unwrap();

    assert_eq!(compiled.output, r#" + _encode(rows?.["0"]?.name)"#);
    assert_eq!(compiled.global_captures, ["rows"]);
}

#[test]
fn expressions_that_would_break_the_function_are_unknown() {
    for expression in [
        "{user.}",
        "{a..b}",
        "{.name}",
        "{1st}",
        "{f x=a-b}",
        "{f x=1abc}",
        "{if true}",
        "{null}",
        "{name | delete}",
        "{each x, x in xs}",
        "{each k => k in m}",
        "{each class in xs}",
        "{when this=1}",
    ] {
        let mut scope = Scope::new("");
        assert!(
            matches!(
                compile_expression(expression, &mut scope),
                Err(CompileError::UnknownExpression { .. })
            ),
            "{} compiled",
            expression
        );
    }
}

#[test]
fn compile_function_call_arguments() {
    let mut scope = Scope::new("");
    let compiled = compile_expression(
        r#"{link href=page.url title="Home" count=3 ratio=-0.5 external=false}"#,
        &mut scope,
    )
    .unwrap();

    assert_eq!(
        compiled.output,
        r#" + _encode(link({"href": page?.url, "title": "Home", "count": 3, "ratio": -0.5, "external": false}))"#
    );
    assert_eq!(compiled.global_captures, ["link", "page"]);
    assert_eq!(
        compiled.inst,
        Inst::Call(Call {
            function: "link".to_string(),
            arguments: vec![
                ("href".to_string(), Source::Path(Path::parse("page.url"))),
                ("title".to_string(), Source::Literal(Value::from("Home"))),
                ("count".to_string(), Source::Literal(Value::from(3))),
                ("ratio".to_string(), Source::Literal(Value::from(-0.5))),
                ("external".to_string(), Source::Literal(Value::Bool(false))),
            ],
        })
    );
}

#[test]
fn unknown_expression_reports_location() {
    let mut scope = Scope::new("ab\ncd{foo bar baz}");
    scope.consume(5);

    assert_eq!(
        compile_expression("{foo bar baz}", &mut scope),
        Err(CompileError::UnknownExpression {
            expression: "{foo bar baz}".to_string(),
            location: crate::location::Location { line: 2, column: 3 },
        })
    );
}

#[test]
fn form_compiled_with_wrong_expression_is_malformed() {
    let mut scope = Scope::new("");

    assert!(matches!(
        ExpressionForm::EachArray.compile("{name}", &mut scope),
        Err(CompileError::MalformedExpression { .. })
    ));
    assert!(matches!(
        ExpressionForm::Close(BlockKind::If).compile("{/each}", &mut scope),
        Err(CompileError::MalformedExpression { .. })
    ));
}
