use regex::{Captures, Regex};
use std::borrow::Cow;
use std::fmt::Write;
use std::sync::LazyLock;

/// JavaScript source of the `_encode` helper called by generated template functions.
///
/// It escapes exactly like [`encode`].
pub const ENCODE_HELPER: &str = r#"
const _encode = (unsafe) =>
  String(unsafe ?? "").replace(
    /(?![0-9A-Za-z ])[\u0000-\u00FF]/g,
    (c) => "&#" + c.charCodeAt(0).toString().padStart(4, "0") + ";"
  );
"#;

static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(\d+);").expect("entity pattern is valid"));

/// Escapes a printed value.
///
/// Every character in the `U+0000..=U+00FF` range other than ASCII letters, digits and the space
/// becomes a numeric entity with a zero padded, four digit code (`<` becomes `&#0060;`).
/// Characters above that range are kept as they are.
pub fn encode(unsafe_text: &str) -> String {
    let mut encoded = String::with_capacity(unsafe_text.len());

    for c in unsafe_text.chars() {
        if needs_encoding(c) {
            let _ = write!(encoded, "&#{:04};", c as u32);
        } else {
            encoded.push(c);
        }
    }

    encoded
}

fn needs_encoding(c: char) -> bool {
    (c as u32) <= 0xFF && !(c.is_ascii_alphanumeric() || c == ' ')
}

/// Turns numeric entities back into characters.
///
/// Meant for tests and diagnostics; it is not a way around the escaping of rendered values.
/// Entities that do not name a valid character are left untouched.
pub fn decode(input: &str) -> Cow<'_, str> {
    ENTITY.replace_all(input, |caps: &Captures| {
        caps[1]
            .parse::<u32>()
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    })
}

#[test]
fn encode_script_tag() {
    assert_eq!(
        encode("<script>alert('pwd');</script>"),
        "&#0060;script&#0062;alert&#0040;&#0039;pwd&#0039;&#0041;&#0059;&#0060;&#0047;script&#0062;"
    );
}

#[test]
fn encode_keeps_alphanumerics_and_spaces() {
    assert_eq!(encode("Hello World 42"), "Hello World 42");
    assert_eq!(encode("a\nb"), "a&#0010;b");
    assert_eq!(encode("é"), "&#0233;");
    assert_eq!(encode("日本"), "日本");
}

#[test]
fn decode_entities() {
    assert_eq!(decode("&#0060;p&#0062;"), "<p>");
    assert_eq!(decode("&#233;"), "é");
    assert_eq!(decode("no entities"), "no entities");
    assert_eq!(decode("&#55296;"), "&#55296;");
}

#[test]
fn decode_reverses_encode() {
    let original = "<a href=\"/x?y=1&z=2\">Tom & Jerry's</a>\t#f00";
    assert_eq!(decode(&encode(original)), original);
}
