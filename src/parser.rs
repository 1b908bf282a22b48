/// A piece of template text.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Token<'a> {
    /// Raw text that is copied to the output.
    Literal(&'a str),
    /// An expression including its surrounding braces, e.g. `{user.name}`.
    Expression(&'a str),
}

impl<'a> Token<'a> {
    pub fn as_str(&self) -> &'a str {
        match self {
            Token::Literal(text) | Token::Expression(text) => text,
        }
    }
}

/// Splits the template into literal text and `{...}` expressions.
///
/// An expression spans from a `{` up to the first `}` after it. A `{` that meets a line break
/// before any `}` is plain text. Concatenating the tokens gives back the template.
pub fn tokenize(template: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut rest = template;

    while let Some((start, end)) = find_expression(rest) {
        if start > 0 {
            tokens.push(Token::Literal(&rest[..start]));
        }

        tokens.push(Token::Expression(&rest[start..end]));
        rest = &rest[end..];
    }

    if !rest.is_empty() {
        tokens.push(Token::Literal(rest));
    }

    tokens
}

// Byte range of the next expression in the text.
fn find_expression(text: &str) -> Option<(usize, usize)> {
    let mut offset = 0;

    while let Some(open) = text[offset..].find('{') {
        let start = offset + open;
        let after_open = &text[start + 1..];

        match after_open.find(['}', '\n', '\r']) {
            Some(close) if after_open[close..].starts_with('}') => {
                return Some((start, start + 1 + close + 1));
            }
            Some(_) => {
                offset = start + 1;
            }
            None => return None,
        }
    }

    None
}

#[test]
fn tokenize_text_only() {
    assert_eq!(tokenize("hello"), vec![Token::Literal("hello")]);
    assert_eq!(tokenize(""), vec![]);
}

#[test]
fn tokenize_expressions() {
    assert_eq!(
        tokenize("Hello {name}, {if admin}root{/if}!"),
        vec![
            Token::Literal("Hello "),
            Token::Expression("{name}"),
            Token::Literal(", "),
            Token::Expression("{if admin}"),
            Token::Literal("root"),
            Token::Expression("{/if}"),
            Token::Literal("!"),
        ]
    );
}

#[test]
fn tokenize_takes_shortest_span() {
    assert_eq!(
        tokenize("{{x}}"),
        vec![Token::Expression("{{x}"), Token::Literal("}")]
    );
    assert_eq!(tokenize("{}"), vec![Token::Expression("{}")]);
}

#[test]
fn tokenize_ignores_braces_across_lines() {
    assert_eq!(
        tokenize("a {\nb} {c}"),
        vec![Token::Literal("a {\nb} "), Token::Expression("{c}")]
    );
    assert_eq!(tokenize("x { y"), vec![Token::Literal("x { y")]);
}

#[test]
fn tokenize_is_lossless() {
    let template = "\n  {each p in people}\n    <p>{p.name | upcase}</p>{ \n  {/each}}\n";
    let joined: String = tokenize(template).iter().map(Token::as_str).collect();

    assert_eq!(joined, template);
}
