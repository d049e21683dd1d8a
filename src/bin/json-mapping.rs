//! JSON Mapping CLI
//!
//! Command-line interface for applying and linting mapping documents.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use json_mapping::{
    lint, load_document_auto, validate_output, FileStatus, JsonMapping, MappingOptions, Severity,
    TracingDiagnostics, ValidateError,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "json-mapping")]
#[command(about = "Reshape JSON/YAML documents with declarative mapping schemas")]
#[command(version)]
struct Cli {
    /// Log debug details to stderr (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Map an input document through a mapping document
    Apply {
        /// Input document: file path or URL (http:// or https://)
        input: String,

        /// Mapping document: file path or URL
        #[arg(long, short)]
        schema: String,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,

        /// JSON Schema the mapped output must satisfy
        #[arg(long)]
        validate: Option<String>,
    },

    /// Lint mapping documents for errors (syntax, malformed nodes, bad references)
    Lint {
        /// File or directory to lint
        path: PathBuf,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,

        /// Suppress progress output, only show errors
        #[arg(long, short)]
        quiet: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Apply {
            input,
            schema,
            output,
            pretty,
            validate,
        } => run_apply(&input, &schema, output, pretty, validate.as_deref()),

        Commands::Lint {
            path,
            format,
            strict,
            quiet,
        } => run_lint(&path, &format, strict, quiet),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run_apply(
    input_source: &str,
    schema_source: &str,
    output: Option<PathBuf>,
    pretty: bool,
    validate: Option<&str>,
) -> Result<(), u8> {
    let document = load_document_auto(schema_source).map_err(|e| {
        eprintln!("Error loading mapping: {}", e);
        e.exit_code() as u8
    })?;

    let options = MappingOptions::new().with_diagnostics(Arc::new(TracingDiagnostics));
    let mapping = JsonMapping::new(&document, options).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let input = load_document_auto(input_source).map_err(|e| {
        eprintln!("Error loading input: {}", e);
        e.exit_code() as u8
    })?;

    let mapped = mapping.apply(&input).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    if let Some(schema_source) = validate {
        let json_schema = load_document_auto(schema_source).map_err(|e| {
            eprintln!("Error loading output schema: {}", e);
            e.exit_code() as u8
        })?;
        match validate_output(&mapped, &json_schema) {
            Ok(()) => {}
            Err(ValidateError::Invalid { violations }) => {
                eprintln!("Validation failed:");
                for violation in violations {
                    eprintln!("  {}", violation);
                }
                return Err(1);
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                return Err(e.exit_code() as u8);
            }
        }
    }

    let json_output = if pretty {
        serde_json::to_string_pretty(&mapped)
    } else {
        serde_json::to_string(&mapped)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}

fn run_lint(path: &Path, format: &str, strict: bool, quiet: bool) -> Result<(), u8> {
    if !path.exists() {
        eprintln!("Error: path not found: {}", path.display());
        return Err(2);
    }

    let result = lint(path, strict);

    if format == "json" {
        let rendered = serde_json::to_string_pretty(&result).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?;
        println!("{}", rendered);
    } else {
        if !quiet {
            println!("Linting {} ...\n", path.display());
        }

        for file_result in &result.results {
            let status_icon = match file_result.status {
                FileStatus::Ok => "\x1b[32m✓\x1b[0m",
                FileStatus::Warning => "\x1b[33m⚠\x1b[0m",
                FileStatus::Error => "\x1b[31m✗\x1b[0m",
            };

            if !quiet || file_result.status != FileStatus::Ok {
                println!("  {} {}", status_icon, file_result.file.display());
            }

            for diag in &file_result.diagnostics {
                let (color, label) = match diag.severity {
                    Severity::Error => ("\x1b[31m", "error"),
                    Severity::Warning => ("\x1b[33m", "warning"),
                };
                if !quiet || diag.severity == Severity::Error {
                    println!(
                        "    {}{}[{}]\x1b[0m: {} - {}",
                        color, label, diag.code, diag.path, diag.message
                    );
                }
            }
        }

        println!();
        if result.is_ok() && (!strict || result.warnings == 0) {
            println!(
                "\x1b[32m✓ {} files checked, all passed\x1b[0m",
                result.files_checked
            );
        } else {
            println!(
                "\x1b[31m✗ {} files checked: {} passed, {} failed ({} errors, {} warnings)\x1b[0m",
                result.files_checked, result.passed, result.failed, result.errors, result.warnings
            );
        }
    }

    if result.is_ok() && (!strict || result.warnings == 0) {
        Ok(())
    } else {
        Err(1)
    }
}
