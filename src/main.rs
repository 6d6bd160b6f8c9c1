mod config;
mod diagnostics;
mod error;
mod expander;
mod resolver;
mod scanner;
mod sourcemap;
mod types;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use crate::config::{Config, FlagSet};
use crate::expander::Expander;
use crate::sourcemap::{MapData, SourceMap};

#[derive(Parser)]
#[command(
    name = "graft",
    about = "Recursive include-directive preprocessor with merged source maps"
)]
struct Cli {
    /// File to expand
    input: PathBuf,

    /// Write the flattened output here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Base directory to resolve directives against (repeatable, searched in
    /// order; overrides relative-to-including-file resolution)
    #[arg(long = "include-path", value_name = "DIR")]
    include_paths: Vec<PathBuf>,

    /// Only splice files ending in this suffix (repeatable)
    #[arg(long = "extension", value_name = "SUFFIX")]
    extensions: Vec<String>,

    /// Treat a directive that matches no files as a fatal error
    #[arg(long)]
    hard_fail: bool,

    /// Emit a position map next to the output as <OUTPUT>.map
    #[arg(long, requires = "output")]
    source_map: bool,

    /// Define a condition flag for `.is(...)` / `.not(...)` guards
    /// (repeatable)
    #[arg(short = 'D', long = "define", value_name = "FLAG")]
    defines: Vec<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::FAILURE
        },
    }
}

/// Read the input, expand it, write content and map.
///
/// # Errors
///
/// Returns errors from config loading, expansion, or output writing.
fn run(cli: &Cli) -> Result<(), error::Error> {
    let text = expander::read_source(&cli.input)?;
    let config = load_config(cli)?;
    let flags = FlagSet::new(cli.defines.iter().cloned());
    let expander = Expander::new(&config, &flags);

    // A map produced by an earlier tool, sitting next to the input, is fed
    // back in so its provenance survives this pass. Otherwise a fresh map
    // carrying the input's literal text both requests position mapping and
    // enables sources-content recording.
    let incoming = if cli.source_map {
        let prior_path = PathBuf::from(format!("{}.map", cli.input.display()));
        Some(match std::fs::read_to_string(&prior_path) {
            Ok(prior) => MapData::Json(prior),
            Err(_) => MapData::Map(SourceMap::with_source(&cli.input, &text)),
        })
    } else {
        None
    };

    let result = expander.expand(&text, &cli.input, incoming)?;

    match &cli.output {
        Some(output) => {
            std::fs::write(output, &result.content)?;
            if let Some(map) = &result.map {
                let map_path = PathBuf::from(format!("{}.map", output.display()));
                std::fs::write(map_path, map.to_json()?)?;
            }
        },
        None => print!("{}", result.content),
    }

    Ok(())
}

/// Merge `.graft.toml` with CLI overrides. CLI values win when given.
///
/// # Errors
///
/// Returns errors from reading or parsing `.graft.toml`.
fn load_config(cli: &Cli) -> Result<Config, error::Error> {
    let mut config = Config::load(std::path::Path::new("."))?;
    if !cli.include_paths.is_empty() {
        config.include_paths.clone_from(&cli.include_paths);
    }
    if !cli.extensions.is_empty() {
        config.extensions.clone_from(&cli.extensions);
    }
    if cli.hard_fail {
        config.hard_fail = true;
    }
    Ok(config)
}
