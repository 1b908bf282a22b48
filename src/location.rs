use std::fmt;

/// Line and column of a position inside a template, both 1-indexed.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line: {}, column: {}", self.line, self.column)
    }
}

/// Computes where the next character would land once `consumed` has been read.
///
/// Columns count characters, not bytes. A `\r` right before the `\n` belongs to the line break.
pub fn locate(consumed: &str) -> Location {
    let line = consumed.matches('\n').count() + 1;
    let last_line = consumed.rsplit('\n').next().unwrap_or_default();

    Location {
        line,
        column: last_line.chars().count() + 1,
    }
}

#[test]
fn locate_start_of_template() {
    assert_eq!(locate(""), Location { line: 1, column: 1 });
}

#[test]
fn locate_after_line_breaks() {
    assert_eq!(locate("ab\ncd"), Location { line: 2, column: 3 });
    assert_eq!(locate("ab\r\n    "), Location { line: 2, column: 5 });
    assert_eq!(locate("\n\n"), Location { line: 3, column: 1 });
}

#[test]
fn locate_counts_characters() {
    assert_eq!(locate("héllo "), Location { line: 1, column: 7 });
}
