//! Error types for compiling and rendering templates.

use crate::location::Location;
use crate::scope::BlockKind;
use std::path::PathBuf;
use thiserror::Error;

/// Structural problems found while compiling a template.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// A closing tag does not close the innermost open block.
    ///
    /// `expected` is `None` when no block was open at all.
    #[error(
        "Expected {{/{}}}, got {{/{actual}}} ({location})",
        .expected.map_or("unknown", |kind| kind.as_str())
    )]
    UnmatchedBlock {
        expected: Option<BlockKind>,
        actual: BlockKind,
        location: Location,
    },

    /// The template ended while a block was still open. The location is the opening tag's.
    #[error("Unclosed {{{kind}}} block, expected {{/{kind}}} ({location})")]
    UnclosedBlock { kind: BlockKind, location: Location },

    /// No expression form matches.
    #[error("Unknown expression: {expression} ({location})")]
    UnknownExpression {
        expression: String,
        location: Location,
    },

    /// An expression form was selected but could not extract its parts.
    #[error("Malformed expression: {expression} ({location})")]
    MalformedExpression {
        expression: String,
        location: Location,
    },

    /// The compiled instructions do not form a runnable program.
    #[error("The template generated an invalid program: {reason}")]
    InvalidProgram {
        reason: String,
        template: String,
        output: String,
        captures: Vec<String>,
    },
}

impl CompileError {
    /// Position in the template the error refers to, if any.
    pub fn location(&self) -> Option<Location> {
        match self {
            CompileError::UnmatchedBlock { location, .. }
            | CompileError::UnclosedBlock { location, .. }
            | CompileError::UnknownExpression { location, .. }
            | CompileError::MalformedExpression { location, .. } => Some(*location),
            CompileError::InvalidProgram { .. } => None,
        }
    }
}

/// Failures while rendering a compiled template.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("helper '{name}' is not registered")]
    MissingHelper { name: String },

    #[error("cannot iterate over '{path}': found {found}")]
    NotIterable { path: String, found: &'static str },
}

/// Errors of the template engine and the bundle layer.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("{0} is already added as a template")]
    DuplicateTemplate(String),

    #[error("{0} is already added as a helper")]
    DuplicateHelper(String),

    #[error("template {0} is not found")]
    TemplateNotFound(String),

    /// A template file failed to compile.
    #[error("{}: {source}", .path.display())]
    Template {
        path: PathBuf,
        #[source]
        source: CompileError,
    },

    #[error("cannot name a template after {}", .0.display())]
    TemplateName(PathBuf),

    #[error("failed to access {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid input pattern: {0}")]
    Pattern(String),
}

/// Alias for `Result<T, tern::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[test]
fn unmatched_block_message() {
    let error = CompileError::UnmatchedBlock {
        expected: Some(BlockKind::Each),
        actual: BlockKind::If,
        location: Location { line: 5, column: 15 },
    };

    assert_eq!(
        error.to_string(),
        "Expected {/each}, got {/if} (line: 5, column: 15)"
    );
}

#[test]
fn unmatched_block_message_without_open_block() {
    let error = CompileError::UnmatchedBlock {
        expected: None,
        actual: BlockKind::When,
        location: Location { line: 1, column: 1 },
    };

    assert_eq!(
        error.to_string(),
        "Expected {/unknown}, got {/when} (line: 1, column: 1)"
    );
}

#[test]
fn unclosed_block_message() {
    let error = CompileError::UnclosedBlock {
        kind: BlockKind::Unless,
        location: Location { line: 2, column: 3 },
    };

    assert_eq!(
        error.to_string(),
        "Unclosed {unless} block, expected {/unless} (line: 2, column: 3)"
    );
    assert_eq!(error.location(), Some(Location { line: 2, column: 3 }));
}
