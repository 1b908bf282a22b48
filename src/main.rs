//! tern CLI: compiles template files into JavaScript modules, or renders one in place.

use anyhow::{bail, Context as _};
use clap::{Parser, Subcommand};
use regex::Regex;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::LazyLock;
use tern::bundle;

static POSITION_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*\(line: \d+, column: \d+\)$").expect("position pattern is valid")
});

#[derive(Parser)]
#[command(name = "tern", about = "Compile brace templates", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile template files into exported JS functions
    Compile {
        /// A pattern like `templates/**/*.tern`
        #[arg(long)]
        input: String,

        /// Either a directory path or a path ending with .js
        #[arg(long)]
        output: PathBuf,
    },

    /// Render a template with JSON data and print the result
    Render {
        /// Path to the template file
        template: PathBuf,

        /// Path to a JSON file with the data (default: no data)
        #[arg(long)]
        data: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Compile { input, output } => compile(&input, &output),
        Commands::Render { template, data } => render(&template, data.as_deref()),
    };

    if let Err(err) = result {
        print_error(&err);
        process::exit(1);
    }
}

fn compile(input: &str, output: &Path) -> anyhow::Result<()> {
    let files = bundle::resolve_inputs(input)?;
    if files.is_empty() {
        bail!("no templates match {}", input);
    }

    let compiled = files
        .iter()
        .map(|file| bundle::compile_file(file))
        .collect::<tern::Result<Vec<_>>>()?;

    for path in bundle::write_modules(&compiled, output)? {
        tracing::info!(path = %path.display(), "wrote module");
    }

    Ok(())
}

fn render(template: &Path, data: Option<&Path>) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(template)
        .with_context(|| format!("failed to read {}", template.display()))?;

    let data = match data {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str::<Value>(&json)
                .with_context(|| format!("{} is not valid JSON", path.display()))?
        }
        None => Value::Object(Default::default()),
    };

    let template = tern::compile(&text, &tern::CompileOptions::default()).map_err(|source| {
        tern::Error::Template {
            path: template.to_path_buf(),
            source,
        }
    })?;

    print!("{}", template.render(&data, &tern::Helpers::with_defaults())?);
    Ok(())
}

// Template errors read `(error) path:line:column message`, everything else `(error) message`.
fn print_error(err: &anyhow::Error) {
    if let Some(tern::Error::Template { path, source }) = err.downcast_ref::<tern::Error>() {
        if let Some(location) = source.location() {
            let message = source.to_string();
            println!(
                "(error) {}:{}:{} {}",
                relative_to_cwd(path).display(),
                location.line,
                location.column,
                POSITION_SUFFIX.replace(&message, "")
            );
            return;
        }
    }

    println!("(error) {:#}", err);
}

fn relative_to_cwd(path: &Path) -> PathBuf {
    std::env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(cwd).ok().map(Path::to_path_buf))
        .unwrap_or_else(|| path.to_path_buf())
}
