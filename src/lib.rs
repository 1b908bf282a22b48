//! Tern, a small brace template compiler.
//!
//! Templates are plain text with `{...}` expressions: `{user.name | upcase}` prints an escaped
//! value, `{if ready}...{/if}`, `{unless ...}`, `{when status="ok"}` and `{each item in items}`
//! open blocks, and `{link href=page.url}` calls a helper with keyword arguments.
//!
//! A template compiles either into a [`Template`] that renders in process, or into the source of
//! an equivalent JavaScript function (see [`compile_to_function_string`] and [`bundle`]).
//!
//! ```
//! let mut tern = tern::Tern::new();
//! tern.add("people", "{each person in people}<p>{person.name}</p>{/each}").unwrap();
//!
//! let data = serde_json::json!({ "people": [{ "name": "John" }, { "name": "Mary" }] });
//! assert_eq!(tern.render("people", &data).unwrap(), "<p>John</p><p>Mary</p>");
//! ```
pub mod bundle;
mod compiler;
mod context;
mod default_functions;
pub mod error;
mod escape;
pub mod exec;
pub mod func_helper;
pub mod grammar;
mod location;
mod parser;
pub mod scope;
mod tern;

pub use crate::compiler::{
    compile, compile_to_function_string, compile_to_string, CompileOptions, CompiledTemplate,
    Template,
};
pub use crate::context::{Context, Convert, Helper, Helpers};
pub use crate::error::{CompileError, Error, RenderError, Result};
pub use crate::escape::{decode, encode, ENCODE_HELPER};
pub use crate::func_helper::{FromValue, IntoValue};
pub use crate::location::{locate, Location};
pub use crate::parser::{tokenize, Token};
pub use crate::scope::BlockKind;
pub use crate::tern::Tern;
