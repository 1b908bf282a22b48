use crate::bundle::template_name;
use crate::compiler::*;
use crate::context::*;
use crate::error::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Template engine that holds compiled templates and the helpers they call.
///
/// Construct it once and render as often as needed.
#[derive(Debug)]
pub struct Tern {
    templates: HashMap<String, Template>,
    helpers: Helpers,
    options: CompileOptions,
}

impl Default for Tern {
    fn default() -> Self {
        Tern::new()
    }
}

impl Tern {
    /// Creates an engine with the built-in helpers registered.
    pub fn new() -> Self {
        Tern::with_options(CompileOptions::default())
    }

    pub fn with_options(options: CompileOptions) -> Self {
        Tern {
            templates: HashMap::new(),
            helpers: Helpers::with_defaults(),
            options,
        }
    }

    /// Compiles and adds a template.
    ///
    /// If there is already a template with the same name, this returns an error.
    ///
    /// # Arguments
    ///
    /// * `name` - Name the template is rendered by.
    /// * `template` - Source of the template.
    ///
    /// # Examples
    ///
    /// ```
    /// let mut tern = tern::Tern::new();
    ///
    /// tern.add("greeting", "Hello, {name}!").unwrap();
    /// assert!(tern.add("greeting", "Hi").is_err());
    /// ```
    pub fn add(&mut self, name: &str, template: &str) -> Result<&mut Self> {
        if self.templates.contains_key(name) {
            return Err(Error::DuplicateTemplate(name.to_string()));
        }

        let template = compile(template, &self.options)?;
        self.templates.insert(name.to_string(), template);

        Ok(self)
    }

    /// Adds a helper that templates can pipe through (`{value | name}`) or call
    /// (`{name key=value}`).
    ///
    /// If there is already a helper with the same name, this returns an error. The built-in
    /// helpers count as well.
    ///
    /// # Examples
    ///
    /// ```
    /// use tern::Helper;
    ///
    /// let mut tern = tern::Tern::new();
    ///
    /// tern.add_helper("exclaim", Helper::typed(|s: String| format!("{}!", s))).unwrap();
    /// tern.add("shout", "{name | upcase | exclaim}").unwrap();
    ///
    /// let out = tern.render("shout", &serde_json::json!({ "name": "hey" })).unwrap();
    /// assert_eq!(tern::decode(&out), "HEY!");
    /// ```
    pub fn add_helper(&mut self, name: &str, helper: Helper) -> Result<&mut Self> {
        if self.helpers.contains(name) {
            return Err(Error::DuplicateHelper(name.to_string()));
        }

        self.helpers.insert(name, helper);
        Ok(self)
    }

    /// Loads files under the provided directory as templates.
    ///
    /// It does not visit subdirectories. A template is named by its file name up to the first
    /// `.`, so `page.html.tern` becomes `page`. Unreadable files are skipped with a warning, but a
    /// file that fails to compile fails the whole load.
    ///
    /// # Examples
    ///
    /// ```
    /// let mut tern = tern::Tern::new();
    ///
    /// // Add every file under ./tests/templates as a template.
    /// tern.load("./tests/templates").unwrap();
    /// assert!(tern.get("people").is_some());
    /// ```
    pub fn load(&mut self, dir: impl AsRef<Path>) -> Result<&mut Self> {
        let dir = dir.as_ref();
        let files = get_all_file_path_under_dir(dir).map_err(|source| Error::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        for file in files {
            let Some(name) = template_name(&file) else {
                continue;
            };

            if self.templates.contains_key(&name) {
                warn!(template = %name, "template is already added");
                continue;
            }

            let content = match fs::read_to_string(&file) {
                Ok(content) => content,
                Err(err) => {
                    warn!(file = %file.display(), error = %err, "unable to read template");
                    continue;
                }
            };

            let template = compile(&content, &self.options).map_err(|source| Error::Template {
                path: file.clone(),
                source,
            })?;

            debug!(template = %name, file = %file.display(), "loaded template");
            self.templates.insert(name, template);
        }

        Ok(self)
    }

    /// Renders a template with the provided data.
    ///
    /// # Examples
    ///
    /// ```
    /// let mut tern = tern::Tern::new();
    /// tern.add("list", "{each n in numbers}{n};{/each}").unwrap();
    ///
    /// let out = tern.render("list", &serde_json::json!({ "numbers": [1, 2, 3] })).unwrap();
    /// assert_eq!(out, "1;2;3;");
    /// ```
    pub fn render(&self, name: &str, data: &Value) -> Result<String> {
        let template = self
            .get(name)
            .ok_or_else(|| Error::TemplateNotFound(name.to_string()))?;

        Ok(template.render(data, &self.helpers)?)
    }

    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    pub fn helpers(&self) -> &Helpers {
        &self.helpers
    }
}

fn get_all_file_path_under_dir(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = fs::read_dir(dir)?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<io::Result<Vec<_>>>()?;

    files.retain(|path| path.is_file());
    files.sort();

    Ok(files)
}

#[test]
fn render() {
    let mut tern = Tern::new();
    assert!(tern.add("some_template", "{if a}Hi{/if}{unless a}{b}{/unless}").is_ok());

    assert_eq!(
        tern.render("some_template", &serde_json::json!({ "a": 1 }))
            .unwrap(),
        "Hi"
    );
    assert_eq!(
        tern.render("some_template", &serde_json::json!({ "a": 0, "b": 2 }))
            .unwrap(),
        "2"
    );
}

#[test]
fn render_missing_template() {
    let tern = Tern::new();

    assert!(matches!(
        tern.render("nope", &Value::Null),
        Err(Error::TemplateNotFound(name)) if name == "nope"
    ));
}

#[test]
fn duplicate_helper_is_rejected() {
    let mut tern = Tern::new();

    assert!(matches!(
        tern.add_helper("upcase", Helper::new(|v| v)),
        Err(Error::DuplicateHelper(_))
    ));
}

#[test]
fn compile_errors_surface_from_add() {
    let mut tern = Tern::new();

    assert!(matches!(
        tern.add("broken", "{if a}{/each}"),
        Err(Error::Compile(_))
    ));
    assert!(tern.get("broken").is_none());
}
