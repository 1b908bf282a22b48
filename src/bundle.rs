//! Compiling template files into JavaScript modules.
//!
//! Every template becomes an exported function, `module.exports.<name> = function <name>(...)`,
//! where the name is the template's file name up to its first `.`. The escape helper is written
//! once per module instead of once per function.

use crate::compiler::compile_to_function_string;
use crate::error::{Error, Result};
use crate::escape::ENCODE_HELPER;
use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const GLOB_META: [char; 4] = ['*', '?', '[', '{'];

/// A template file compiled into an export statement.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct CompiledFile {
    pub path: PathBuf,
    pub name: String,
    pub compiled: String,
}

/// Finds the files matching a pattern like `templates/**/*.tern`.
///
/// A pattern without glob characters names a single file and resolves to it, if it exists. The
/// walk starts at the directory part of the pattern that precedes the first glob character.
pub fn resolve_inputs(pattern: &str) -> Result<Vec<PathBuf>> {
    let Some(meta) = pattern.find(GLOB_META) else {
        let path = PathBuf::from(pattern);
        return Ok(if path.is_file() { vec![path] } else { Vec::new() });
    };

    let (root, glob) = match pattern[..meta].rfind('/') {
        Some(slash) => (&pattern[..slash.max(1)], &pattern[slash + 1..]),
        None => (".", pattern),
    };

    // Without a slash, a glob would match at any depth.
    let glob = if glob.contains('/') {
        glob.to_string()
    } else {
        format!("/{}", glob)
    };

    let mut overrides = OverrideBuilder::new(root);
    overrides
        .add(&glob)
        .map_err(|err| Error::Pattern(format!("{}: {}", pattern, err)))?;
    let overrides = overrides
        .build()
        .map_err(|err| Error::Pattern(format!("{}: {}", pattern, err)))?;

    // Ignore files do not hide templates; only hidden entries are skipped.
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .hidden(true)
        .overrides(overrides)
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(root, error = %err, "unable to walk input");
                continue;
            }
        };

        if entry.file_type().is_some_and(|file_type| file_type.is_file()) {
            let path = entry.path();
            files.push(path.strip_prefix("./").unwrap_or(path).to_path_buf());
        }
    }

    files.sort();
    debug!(pattern, files = files.len(), "resolved inputs");

    Ok(files)
}

/// Name of the template stored in `path`: the file name up to its first `.`.
pub fn template_name(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    let name = file_name.split('.').next().unwrap_or(file_name);

    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Compiles a template file into `module.exports.<name> = function <name>(...) { ... }`.
pub fn compile_file(path: &Path) -> Result<CompiledFile> {
    let name = template_name(path).ok_or_else(|| Error::TemplateName(path.to_path_buf()))?;
    let template = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let function =
        compile_to_function_string(&name, &template, false).map_err(|source| Error::Template {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(CompiledFile {
        path: path.to_path_buf(),
        compiled: format!("module.exports.{} = {}", name, function),
        name,
    })
}

/// Source of a module holding the given exports.
pub fn module_source<S: AsRef<str>>(exports: &[S]) -> String {
    let contents = exports
        .iter()
        .map(|export| export.as_ref())
        .collect::<Vec<&str>>()
        .join("\n\n");

    ["/* eslint-disable */", "// @ts-nocheck", ENCODE_HELPER, &contents, ""].join("\n")
}

/// Writes compiled files as modules and returns the paths written.
///
/// An `output` ending with `.js` receives every export in one module. Any other `output` is a
/// directory receiving one `<name>.js` module per template. Missing directories are created.
pub fn write_modules(files: &[CompiledFile], output: &Path) -> Result<Vec<PathBuf>> {
    if output.to_string_lossy().ends_with(".js") {
        let exports = files.iter().map(|file| &file.compiled).collect::<Vec<_>>();
        write_file(output, &module_source(&exports))?;
        return Ok(vec![output.to_path_buf()]);
    }

    let mut written = Vec::with_capacity(files.len());
    for file in files {
        let path = output.join(format!("{}.js", file.name));
        write_file(&path, &module_source(&[&file.compiled]))?;
        written.push(path);
    }

    Ok(written)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    let io_error = |source| Error::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    fs::write(path, contents).map_err(io_error)?;

    debug!(path = %path.display(), "wrote module");
    Ok(())
}

#[test]
fn template_names() {
    assert_eq!(template_name(Path::new("a/b/hello.tern")), Some("hello".to_string()));
    assert_eq!(template_name(Path::new("page.html.tern")), Some("page".to_string()));
    assert_eq!(template_name(Path::new("a/.hidden")), None);
}

#[test]
fn module_source_layout() {
    let source = module_source(&["module.exports.a = 1", "module.exports.b = 2"]);

    assert!(source.starts_with("/* eslint-disable */\n// @ts-nocheck\n\nconst _encode"));
    assert!(source.ends_with("\nmodule.exports.a = 1\n\nmodule.exports.b = 2\n"));
}

#[test]
fn plain_path_resolves_to_itself() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("hello.tern");
    fs::write(&file, "Hello").unwrap();

    let pattern = file.to_str().unwrap();
    assert_eq!(resolve_inputs(pattern).unwrap(), [file.clone()]);

    let missing = dir.path().join("missing.tern");
    assert!(resolve_inputs(missing.to_str().unwrap()).unwrap().is_empty());
}
