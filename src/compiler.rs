use crate::context::*;
use crate::error::{CompileError, RenderError};
use crate::escape::ENCODE_HELPER;
use crate::exec::*;
use crate::grammar::*;
use crate::parser::*;
use crate::scope::Scope;
use serde_json::Value;
use tracing::{debug, trace};

/// Options for [`compile`].
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct CompileOptions {
    /// Embeds the `_encode` helper into the generated function source.
    ///
    /// Turn it off when the helper is provided once for many functions, as in generated modules.
    pub include_escape_helper: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            include_escape_helper: true,
        }
    }
}

/// The generated JavaScript function body and the names it destructures from its argument.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct CompiledTemplate {
    /// The function body, e.g. `return ("" + "Hello, " + _encode(name));`.
    pub output: String,

    /// Root names the caller must provide, in order of first use.
    pub captures: Vec<String>,
}

/// A compiled template, ready to render any number of times.
#[derive(Debug)]
pub struct Template {
    executer: Executer,
    captures: Vec<String>,
    source: String,
}

impl Template {
    /// Root names looked up in the render data. Includes helper names.
    pub fn captures(&self) -> &[String] {
        &self.captures
    }

    /// The equivalent JavaScript function.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn insts(&self) -> &[Inst] {
        self.executer.insts()
    }

    /// Renders the template.
    ///
    /// Names missing from `data` are `null`: falsy, printed as an empty string, iterated zero
    /// times and passed to helpers as is.
    ///
    /// # Examples
    ///
    /// ```
    /// use tern::{compile, CompileOptions, Helpers};
    ///
    /// let template = compile("{if user}Hi {user.name | upcase}{/if}", &CompileOptions::default()).unwrap();
    /// let data = serde_json::json!({ "user": { "name": "Jane" } });
    ///
    /// assert_eq!(template.render(&data, &Helpers::with_defaults()).unwrap(), "Hi JANE");
    /// ```
    pub fn render(&self, data: &Value, helpers: &Helpers) -> Result<String, RenderError> {
        self.executer.render(&mut Context::new(data, helpers))
    }
}

struct Program {
    insts: Vec<Inst>,
    compiled: CompiledTemplate,
}

fn compile_program(template: &str) -> Result<Program, CompileError> {
    let mut scope = Scope::new(template);
    let mut insts = Vec::new();
    let mut output = String::from("\"\"");

    for token in tokenize(template) {
        match token {
            Token::Literal(text) => {
                output.push_str(" + ");
                output.push_str(&js_string(text));
                insts.push(Inst::Text(text.to_string()));
            }
            Token::Expression(expression) => {
                let compiled = compile_expression(expression, &mut scope)?;
                trace!(expression, inst = ?compiled.inst, "compiled expression");

                for capture in &compiled.global_captures {
                    scope.add_global_capture(capture);
                }

                match compiled.scope_change {
                    ScopeChange::Push => scope.push_local_captures(compiled.local_captures),
                    ScopeChange::Pop => scope.pop_local_captures(),
                    ScopeChange::Keep => {}
                }

                output.push_str(&compiled.output);
                insts.push(compiled.inst);
            }
        }

        scope.consume(token.as_str().len());
    }

    if let Some(&(kind, location)) = scope.open_blocks().last() {
        return Err(CompileError::UnclosedBlock { kind, location });
    }

    Ok(Program {
        insts,
        compiled: CompiledTemplate {
            output: format!("return ({});", output),
            captures: scope.into_global_captures(),
        },
    })
}

fn function_source(name: &str, compiled: &CompiledTemplate, include_escape_helper: bool) -> String {
    let body = if include_escape_helper {
        format!("{}\n{}", ENCODE_HELPER, compiled.output)
    } else {
        compiled.output.clone()
    };

    format!(
        "function {}({{{}}}) {{ {} }}",
        name,
        compiled.captures.join(", "),
        body
    )
}

/// Compiles a template into the generated function body and its captures.
///
/// # Examples
///
/// ```
/// let compiled = tern::compile_to_string("Hello, {user.name}!").unwrap();
///
/// assert_eq!(compiled.output, r#"return ("" + "Hello, " + _encode(user?.name) + "!");"#);
/// assert_eq!(compiled.captures, ["user"]);
/// ```
pub fn compile_to_string(template: &str) -> Result<CompiledTemplate, CompileError> {
    Ok(compile_program(template)?.compiled)
}

/// Compiles a template into a named JavaScript function.
pub fn compile_to_function_string(
    name: &str,
    template: &str,
    include_escape_helper: bool,
) -> Result<String, CompileError> {
    let compiled = compile_to_string(template)?;
    Ok(function_source(name, &compiled, include_escape_helper))
}

/// Compiles a template into a [`Template`] that renders in process.
pub fn compile(template: &str, options: &CompileOptions) -> Result<Template, CompileError> {
    let Program { insts, compiled } = compile_program(template)?;
    let source = function_source("anonymous", &compiled, options.include_escape_helper);

    let executer = match Executer::new(insts) {
        Ok(executer) => executer,
        Err(reason) => {
            return Err(CompileError::InvalidProgram {
                reason,
                template: template.to_string(),
                output: source,
                captures: compiled.captures,
            })
        }
    };

    debug!(
        captures = ?compiled.captures,
        insts = executer.insts().len(),
        "compiled template"
    );

    Ok(Template {
        executer,
        captures: compiled.captures,
        source,
    })
}

#[cfg(test)]
fn render(template: &str, data: Value) -> String {
    compile(template, &CompileOptions::default())
        .unwrap()
        .render(&data, &Helpers::with_defaults())
        .unwrap()
}

#[test]
fn compile_escaped_literals() {
    assert_eq!(
        compile_to_string("\"\n\r\t\\").unwrap().output,
        r#"return ("" + "\"\n\r\t\\");"#
    );
    assert_eq!(render("\"\n\r\t", Value::Null), "\"\n\r\t");
}

#[test]
fn compile_function_string() {
    assert_eq!(
        compile_to_function_string("hello", "Hello there, {name}.\n", false).unwrap(),
        r#"function hello({name}) { return ("" + "Hello there, " + _encode(name) + ".\n"); }"#
    );
}

#[test]
fn compile_function_string_with_helper() {
    let source = compile_to_function_string("hello", "{name}", true).unwrap();

    assert!(source.starts_with("function hello({name}) { \nconst _encode"));
    assert!(source.ends_with("return (\"\" + _encode(name)); }"));
}

#[test]
fn compile_each_output() {
    assert_eq!(
        compile_to_string("{each p, i in people}{i}:{p.name}{/each}")
            .unwrap()
            .output,
        r#"return ("" + (people || []).map((p, i) => { return "" + _encode(i) + ":" + _encode(p?.name); }).join(""));"#
    );
}

// Each case pairs the rendered output with the generated JavaScript that must produce it.
#[test]
fn rendering_agrees_with_generated_function() {
    use serde_json::json;

    let cases = [
        ("{if list}X{/if}", json!({ "list": [] }), "X", "(list ? ("),
        ("[{name}]", json!({}), "[]", "_encode(name)"),
        ("{each x in xs}{x}{/each}", json!({}), "", "(xs || []).map("),
        ("{each x in xs}{x}{/each}", json!({ "xs": 0 }), "", "(xs || []).map("),
        ("{each k => v in m}{k}{/each}", json!({}), "", "Object.entries(m || {})"),
        ("{v}", json!({ "v": 1.0 }), "1", "_encode(v)"),
        ("{v}", json!({ "v": [1, "a"] }), "1&#0044;a", "_encode(v)"),
        ("{a.b.c}", json!({ "a": 1 }), "", "_encode(a?.b?.c)"),
        ("{when n=1}Y{/when}", json!({ "n": 1.0 }), "Y", "((n ?? null) === 1 ?"),
        ("{when n=null}Y{/when}", json!({}), "Y", "((n ?? null) === null ?"),
    ];

    for (template, data, rendered, js) in cases {
        assert_eq!(render(template, data), rendered, "{}", template);
        assert!(
            compile_to_string(template).unwrap().output.contains(js),
            "{} does not contain {}",
            template,
            js
        );
    }

    assert!(ENCODE_HELPER.contains(r#"String(unsafe ?? "")"#));
}

#[test]
fn loop_variables_are_not_captured() {
    let compiled =
        compile_to_string("{each person in people}<p>{person.name}</p>{/each}{person}").unwrap();

    // Outside the loop `person` comes from the caller again.
    assert_eq!(compiled.captures, ["people", "person"]);
}

#[test]
fn captures_keep_first_use_order() {
    let compiled = compile_to_string(
        "{title | upcase}{each k => v in colors}{k}{v | json}{/each}{if user.admin}{link to=page.url}{/if}",
    )
    .unwrap();

    assert_eq!(
        compiled.captures,
        ["title", "upcase", "colors", "json", "user", "link", "page"]
    );
}

#[test]
fn unclosed_block_is_an_error() {
    assert_eq!(
        compile_to_string("a\n  {if ready}\n  {each x in xs}{/each}").unwrap_err(),
        CompileError::UnclosedBlock {
            kind: crate::scope::BlockKind::If,
            location: crate::location::Location { line: 2, column: 3 },
        }
    );
}

#[test]
fn template_source_names_anonymous_function() {
    let template = compile("{name}", &CompileOptions {
        include_escape_helper: false,
    })
    .unwrap();

    assert_eq!(
        template.source(),
        r#"function anonymous({name}) { return ("" + _encode(name)); }"#
    );
    assert_eq!(template.captures(), ["name"]);
}

#[test]
fn render_when_blocks_independently() {
    let template = "{when status=\"ready\"}Ready!{/when}{when status='pending'}Pending!{/when}";

    assert_eq!(render(template, serde_json::json!({ "status": "ready" })), "Ready!");
    assert_eq!(render(template, serde_json::json!({ "status": "pending" })), "Pending!");
    assert_eq!(render(template, serde_json::json!({})), "");
}

#[cfg(test)]
fn mismatch(template: &str) -> String {
    compile_to_string(template).unwrap_err().to_string()
}

#[test]
fn mismatched_if_inside_each() {
    assert_eq!(
        mismatch(
            "\n            {if isReady}\n              {each person in people}\n                <p>{person.name}</p>\n              {/if}\n            {/each}\n          "
        ),
        "Expected {/each}, got {/if} (line: 5, column: 15)"
    );
    assert_eq!(
        mismatch(
            "\n            {unless isReady}\n              {each person in people}\n                <p>{person.name}</p>\n              {/unless}\n            {/each}\n          "
        ),
        "Expected {/each}, got {/unless} (line: 5, column: 15)"
    );
}

#[test]
fn mismatched_each_inside_unless() {
    assert_eq!(
        mismatch(
            "\n        {each person in people}\n          {unless person.hidden}\n            <p>{person.name}</p>\n          {/each}\n        {/unless}\n      "
        ),
        "Expected {/unless}, got {/each} (line: 5, column: 11)"
    );
}

#[test]
fn mismatched_three_levels_deep() {
    assert_eq!(
        mismatch(
            "\n        {each person in people}\n          {unless person.hidden}\n            {if person.name}\n              <p>{person.name}</p>\n            {/unless}\n          {/if}\n        {/each}\n      "
        ),
        "Expected {/if}, got {/unless} (line: 6, column: 13)"
    );
    assert_eq!(
        mismatch(
            "\n        {each person in people}\n          {when person.role=\"admin\"}\n            {if person.name}\n              <p>{person.name}</p>\n            {/when}\n          {/if}\n        {/each}\n      "
        ),
        "Expected {/if}, got {/when} (line: 6, column: 13)"
    );
    assert_eq!(
        mismatch(
            "\n        {each person in people}\n          {when person.role=\"admin\"}\n            {if person.name}\n              <p>{person.name}</p>\n            {/if}\n          {/if}\n        {/each}\n      "
        ),
        "Expected {/when}, got {/if} (line: 7, column: 11)"
    );
}

#[test]
fn compiling_twice_gives_the_same_output() {
    let template = "{each k => v, n in map}{n}{k | upcase}={v}{/each}{if ok}yes{/if}";

    assert_eq!(
        compile_to_string(template).unwrap(),
        compile_to_string(template).unwrap()
    );
}
