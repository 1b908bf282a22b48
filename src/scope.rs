use crate::error::CompileError;
use crate::location::{locate, Location};
use std::collections::HashSet;
use std::fmt;

/// Kind of a block expression that needs a closing tag.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Hash)]
pub enum BlockKind {
    If,
    Unless,
    When,
    Each,
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::If => "if",
            BlockKind::Unless => "unless",
            BlockKind::When => "when",
            BlockKind::Each => "each",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compiler state for a single pass over one template.
#[derive(Debug)]
pub struct Scope<'a> {
    template: &'a str,

    // Byte offset of the text compiled so far.
    consumed: usize,

    // Open blocks along with the location of their opening tag.
    blocks: Vec<(BlockKind, Location)>,

    // Names bound by the enclosing blocks. One set per open block.
    local_captures: Vec<HashSet<String>>,

    // Root names the caller must provide, in order of first use.
    global_captures: Vec<String>,
}

impl<'a> Scope<'a> {
    pub fn new(template: &'a str) -> Self {
        Scope {
            template,
            consumed: 0,
            blocks: Vec::new(),
            local_captures: Vec::new(),
            global_captures: Vec::new(),
        }
    }

    /// Marks the next `len` bytes of the template as compiled.
    pub fn consume(&mut self, len: usize) {
        self.consumed = (self.consumed + len).min(self.template.len());
    }

    /// Text compiled so far.
    pub fn buffer(&self) -> &'a str {
        &self.template[..self.consumed]
    }

    /// Location of the next token to compile.
    pub fn location(&self) -> Location {
        locate(self.buffer())
    }

    pub fn open_block(&mut self, kind: BlockKind) {
        let location = self.location();
        self.blocks.push((kind, location));
    }

    /// Pops the innermost block and checks that `kind` closes it.
    pub fn close_block(&mut self, kind: BlockKind) -> Result<(), CompileError> {
        match self.blocks.pop() {
            Some((expected, _)) if expected == kind => Ok(()),
            expected => Err(CompileError::UnmatchedBlock {
                expected: expected.map(|(expected, _)| expected),
                actual: kind,
                location: self.location(),
            }),
        }
    }

    /// Blocks that are still open, innermost last.
    pub fn open_blocks(&self) -> &[(BlockKind, Location)] {
        &self.blocks
    }

    /// True if `name` is bound by any of the enclosing blocks.
    pub fn has_local_capture(&self, name: &str) -> bool {
        self.local_captures
            .iter()
            .any(|captures| captures.contains(name))
    }

    pub fn push_local_captures(&mut self, names: Vec<String>) {
        self.local_captures.push(names.into_iter().collect());
    }

    pub fn pop_local_captures(&mut self) {
        self.local_captures.pop();
    }

    /// Records a capture by the root of its path; `user.name` records `user`.
    pub fn add_global_capture(&mut self, name: &str) {
        let root = root_of(name);
        if !root.is_empty() && !self.global_captures.iter().any(|c| c == root) {
            self.global_captures.push(root.to_string());
        }
    }

    pub fn global_captures(&self) -> &[String] {
        &self.global_captures
    }

    pub fn into_global_captures(self) -> Vec<String> {
        self.global_captures
    }
}

/// First segment of a dotted path.
pub fn root_of(path: &str) -> &str {
    path.split('.').next().unwrap_or_default()
}

#[test]
fn global_captures_keep_first_use_order() {
    let mut scope = Scope::new("");
    scope.add_global_capture("user.name");
    scope.add_global_capture("people");
    scope.add_global_capture("user");

    assert_eq!(scope.global_captures(), ["user", "people"]);
}

#[test]
fn local_captures_are_searched_in_every_open_block() {
    let mut scope = Scope::new("");
    scope.push_local_captures(vec!["person".to_string(), "_index".to_string()]);
    scope.push_local_captures(vec![]);

    assert!(scope.has_local_capture("person"));
    assert!(!scope.has_local_capture("people"));

    scope.pop_local_captures();
    scope.pop_local_captures();
    assert!(!scope.has_local_capture("person"));
}

#[test]
fn close_block_reports_expected_and_actual() {
    let template = "{if a}\n  {each x in y}\n  {/if}";
    let mut scope = Scope::new(template);
    scope.open_block(BlockKind::If);
    scope.consume(9);
    scope.open_block(BlockKind::Each);
    scope.consume(16);

    assert_eq!(
        scope.close_block(BlockKind::If),
        Err(CompileError::UnmatchedBlock {
            expected: Some(BlockKind::Each),
            actual: BlockKind::If,
            location: Location { line: 3, column: 3 },
        })
    );
}

#[test]
fn close_block_without_open_block() {
    let mut scope = Scope::new("{/when}");

    assert_eq!(
        scope.close_block(BlockKind::When),
        Err(CompileError::UnmatchedBlock {
            expected: None,
            actual: BlockKind::When,
            location: Location { line: 1, column: 1 },
        })
    );
}
