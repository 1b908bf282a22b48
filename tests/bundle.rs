use std::fs;
use std::path::{Path, PathBuf};
use tern::bundle::*;
use tern::{CompileError, Error, ENCODE_HELPER};

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn resolve_glob_pattern() {
    let dir = tempfile::tempdir().unwrap();
    let hello = write(dir.path(), "hello.tern", "Hello, {name}!");
    let nested = write(dir.path(), "nested/bye.tern", "Bye");
    write(dir.path(), "notes.txt", "not a template");

    let root = dir.path().to_str().unwrap();

    assert_eq!(
        resolve_inputs(&format!("{}/*.tern", root)).unwrap(),
        [hello.clone()]
    );
    assert_eq!(
        resolve_inputs(&format!("{}/**/*.tern", root)).unwrap(),
        [hello, nested]
    );
}

#[test]
fn resolve_ignores_ignore_files_but_skips_hidden() {
    let dir = tempfile::tempdir().unwrap();
    let kept = write(dir.path(), "kept.tern", "Kept");
    let listed = write(dir.path(), "listed.tern", "Listed");
    write(dir.path(), ".ignore", "listed.tern\n");
    write(dir.path(), ".gitignore", "kept.tern\n");
    write(dir.path(), ".draft.tern", "Draft");

    let root = dir.path().to_str().unwrap();

    assert_eq!(
        resolve_inputs(&format!("{}/*.tern", root)).unwrap(),
        [kept, listed]
    );
}

#[test]
fn compile_file_exports_named_function() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "hello.html.tern", "Hello, {name}!");

    let compiled = compile_file(&path).unwrap();

    assert_eq!(compiled.name, "hello");
    assert_eq!(
        compiled.compiled,
        r#"module.exports.hello = function hello({name}) { return ("" + "Hello, " + _encode(name) + "!"); }"#
    );
}

#[test]
fn compile_file_reports_template_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "broken.tern", "{if a}\n  {/each}");

    match compile_file(&path) {
        Err(Error::Template { path: failed, source }) => {
            assert_eq!(failed, path);
            assert!(matches!(source, CompileError::UnmatchedBlock { .. }));
            assert_eq!(source.location().map(|l| (l.line, l.column)), Some((2, 3)));
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn write_combined_module() {
    let dir = tempfile::tempdir().unwrap();
    let a = compile_file(&write(dir.path(), "a.tern", "A")).unwrap();
    let b = compile_file(&write(dir.path(), "b.tern", "{b}")).unwrap();

    let output = dir.path().join("out/templates.js");
    let written = write_modules(&[a.clone(), b.clone()], &output).unwrap();
    assert_eq!(written, [output.clone()]);

    let module = fs::read_to_string(&output).unwrap();
    assert_eq!(
        module,
        format!(
            "/* eslint-disable */\n// @ts-nocheck\n{}\n{}\n\n{}\n",
            ENCODE_HELPER, a.compiled, b.compiled
        )
    );
}

#[test]
fn write_one_module_per_template() {
    let dir = tempfile::tempdir().unwrap();
    let a = compile_file(&write(dir.path(), "a.tern", "A")).unwrap();
    let b = compile_file(&write(dir.path(), "b.tern", "B")).unwrap();

    let output = dir.path().join("generated");
    let written = write_modules(&[a, b], &output).unwrap();
    assert_eq!(written, [output.join("a.js"), output.join("b.js")]);

    let module = fs::read_to_string(output.join("b.js")).unwrap();
    assert!(module.contains("module.exports.b = function b({}) { return (\"\" + \"B\"); }"));
    assert!(!module.contains("module.exports.a"));
}
