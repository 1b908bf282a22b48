use serde_json::{json, Value};
use tern::*;

fn render(template: &str, data: Value) -> String {
    compile(template, &CompileOptions::default())
        .unwrap()
        .render(&data, &Helpers::with_defaults())
        .unwrap()
}

#[test]
fn render_variables_and_pipes() {
    assert_eq!(render("{name}", json!({ "name": "Mary" })), "Mary");
    assert_eq!(render("{name | upcase}", json!({ "name": "Mary" })), "MARY");
    assert_eq!(
        render("{name | upcase | reverse}", json!({ "name": "Mary" })),
        "YRAM"
    );
    assert_eq!(render("{'Mary' | reverse}", Value::Null), "yraM");
}

#[test]
fn dotted_path_captures_only_its_root() {
    let compiled = compile_to_string("{user.name}").unwrap();
    assert_eq!(compiled.captures, ["user"]);

    assert_eq!(
        render("{user.name}", json!({ "user": { "name": "Jane" } })),
        "Jane"
    );
}

#[test]
fn unless_negates_if() {
    for (value, expected) in [
        (json!(true), "X"),
        (json!(1), "X"),
        (json!("yes"), "X"),
        (json!(false), ""),
        (json!(0), ""),
        (json!(""), ""),
        (Value::Null, ""),
        (json!([]), "X"),
        (json!({}), "X"),
    ] {
        let data = json!({ "cond": value });
        assert_eq!(render("{if cond}X{/if}", data.clone()), expected);

        let negated = if expected.is_empty() { "X" } else { "" };
        assert_eq!(render("{unless cond}X{/unless}", data), negated);
    }
}

#[test]
fn each_over_list_keeps_order_and_locals() {
    let template = "{each item in list}<p>{item.name}</p>{/each}";

    assert_eq!(
        render(template, json!({ "list": [{ "name": "John" }, { "name": "Jane" }] })),
        "<p>John</p><p>Jane</p>"
    );
    assert_eq!(compile_to_string(template).unwrap().captures, ["list"]);
}

#[test]
fn each_with_index() {
    assert_eq!(
        render(
            "{each n, i in numbers}{i}={n} {/each}",
            json!({ "numbers": ["a", "b", "c"] })
        ),
        "0=a 1=b 2=c "
    );
    assert_eq!(
        render("{each n in numbers}{_index}{/each}", json!({ "numbers": [7, 8] })),
        "01"
    );
}

#[test]
fn each_over_mapping_in_insertion_order() {
    let template = "{each k => v in colors}[{k}:{v}]{/each}";

    assert_eq!(
        render(template, json!({ "colors": { "red": "#f00", "green": "#0f0" } })),
        "[red:&#0035;f00][green:&#0035;0f0]"
    );
}

#[test]
fn each_over_mapping_with_index() {
    let template = "{each k => v, i in m}{i}:{k}={v};{/each}";

    assert_eq!(
        render(template, json!({ "m": { "a": 1, "b": 2 } })),
        "0:a=1;1:b=2;"
    );
    assert_eq!(
        compile_to_string(template).unwrap().output,
        r#"return ("" + Object.entries(m || {}).map(([k, v], i) => { return "" + _encode(i) + ":" + _encode(k) + "=" + _encode(v) + ";"; }).join(""));"#
    );
}

#[test]
fn nested_loops_see_outer_bindings() {
    let template = "{each row in rows}{each cell in row.cells}{row.name}{cell};{/each}{/each}";
    let data = json!({
        "rows": [
            { "name": "a", "cells": [1, 2] },
            { "name": "b", "cells": [] },
            { "name": "c", "cells": [3] },
        ]
    });

    assert_eq!(render(template, data), "a1;a2;c3;");
}

#[test]
fn when_compares_values() {
    let template = "{when role=\"admin\"}A{/when}{when role=expected}E{/when}";

    assert_eq!(render(template, json!({ "role": "admin" })), "A");
    assert_eq!(
        render(template, json!({ "role": "guest", "expected": "guest" })),
        "E"
    );
    assert_eq!(render(template, json!({ "role": "guest" })), "");
}

#[test]
fn escape_printed_values() {
    let text = "<script>alert('x');</script>";
    let rendered = render("{text}", json!({ "text": text }));

    for c in ['<', '>', '\'', '(', ')', ';', '/'] {
        let entity = format!("&#{:04};", c as u32);
        assert!(rendered.contains(&entity), "{} is not escaped", c);
    }
    assert_eq!(decode(&rendered), text);
}

#[test]
fn decoding_restores_every_interpolation() {
    let data = json!({
        "title": "Tom & Jerry's \"show\"",
        "tags": ["<b>", "a/b", "50%"],
    });
    let rendered = render("{title}|{each tag in tags}{tag},{/each}", data);

    assert_eq!(decode(&rendered), "Tom & Jerry's \"show\"|<b>,a/b,50%,");
}

#[test]
fn missing_values_render_empty() {
    assert_eq!(
        render(
            "[{name}][{user.name}][{if user}x{/if}][{each x in xs}{x}{/each}][{name | upcase}]",
            json!({})
        ),
        "[][][][][]"
    );
}

#[test]
fn function_call_with_keyword_arguments() {
    let mut helpers = Helpers::with_defaults();
    helpers.insert(
        "link",
        Helper::typed(|args: serde_json::Map<String, Value>| {
            format!(
                "{} -> {}",
                String::from_value(args.get("title").cloned().unwrap_or_default()),
                String::from_value(args.get("href").cloned().unwrap_or_default())
            )
        }),
    );

    let template = compile(
        "{link href=page.url title=\"Home\"}",
        &CompileOptions::default(),
    )
    .unwrap();
    let rendered = template
        .render(&json!({ "page": { "url": "/home" } }), &helpers)
        .unwrap();

    assert_eq!(decode(&rendered), "Home -> /home");
}

#[test]
fn missing_helper_fails_render() {
    let template = compile("{name | shout}", &CompileOptions::default()).unwrap();

    assert_eq!(
        template.render(&json!({ "name": "x" }), &Helpers::with_defaults()),
        Err(RenderError::MissingHelper {
            name: "shout".to_string()
        })
    );
}

#[test]
fn iterating_a_number_fails_render() {
    let template = compile("{each x in count}{x}{/each}", &CompileOptions::default()).unwrap();

    assert!(matches!(
        template.render(&json!({ "count": 3 }), &Helpers::with_defaults()),
        Err(RenderError::NotIterable { .. })
    ));
}

#[test]
fn mismatched_closers_fail() {
    let err = compile_to_string("{if ready}\n  {each x in xs}\n  {/if}\n{/each}").unwrap_err();

    assert_eq!(
        err,
        CompileError::UnmatchedBlock {
            expected: Some(BlockKind::Each),
            actual: BlockKind::If,
            location: Location { line: 3, column: 3 },
        }
    );
}

#[test]
fn unknown_expression_names_its_text() {
    let err = compile_to_string("Hi {foo bar baz}").unwrap_err();

    assert_eq!(
        err,
        CompileError::UnknownExpression {
            expression: "{foo bar baz}".to_string(),
            location: Location { line: 1, column: 4 },
        }
    );
    assert_eq!(
        err.to_string(),
        "Unknown expression: {foo bar baz} (line: 1, column: 4)"
    );
}

#[test]
fn braces_spanning_lines_are_text() {
    assert_eq!(
        render("function() {\n  return 1;\n}", Value::Null),
        "function() {\n  return 1;\n}"
    );
}

#[test]
fn engine_loads_fixture_templates() {
    let mut tern = Tern::new();
    tern.load("tests/templates").unwrap();

    assert_eq!(
        tern.render(
            "people",
            &json!({ "people": [{ "name": "John" }, { "name": "Mary" }] })
        )
        .unwrap(),
        "\n<p>0: JOHN</p>\n\n<p>1: MARY</p>\n\n"
    );
    assert_eq!(
        tern.render("greeting", &json!({ "user": { "name": "Ann" } }))
            .unwrap(),
        "Hello, Ann!\n"
    );
    assert_eq!(
        tern.render("greeting", &json!({})).unwrap(),
        "Hello, stranger.\n"
    );
    assert_eq!(
        tern.render("colors", &json!({ "colors": { "red": "#f00" } }))
            .unwrap(),
        "<ul><li>red=&#0035;f00</li></ul>\n"
    );
}
