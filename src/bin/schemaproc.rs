//! Schema Processor CLI
//!
//! Command-line interface for validating instances, checking schemas and
//! expanding references.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use schemaproc::{
    check_files, expand_references, load_schema_auto, source_ref, validate, DefaultLoader,
    FileStatus, LogLevel, ProcessingReport, SchemaTree, ValidationConfiguration,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schemaproc")]
#[command(about = "Validate JSON documents against JSON Schemas")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Where referenced schemas are loaded from.
#[derive(clap::Args)]
struct LoaderArgs {
    /// Local directory containing schema files
    #[arg(long)]
    schema_local_base: Option<PathBuf>,

    /// URL prefix to map to the local directory (e.g., https://example.com/schemas)
    #[arg(long, requires = "schema_local_base")]
    schema_remote_base: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an instance document against a schema
    Validate {
        /// Schema source: file path or URL (http:// or https://)
        schema: String,

        /// Instance source: file path or URL
        instance: String,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,

        /// Do not check the format keyword
        #[arg(long)]
        no_format: bool,

        /// Dialect for schemas without $schema (default: draft-04)
        #[arg(long)]
        dialect: Option<String>,

        #[command(flatten)]
        loader: LoaderArgs,
    },

    /// Check schema files for errors (syntax, unknown keywords, broken refs)
    Check {
        /// File or directory to check
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

    /// Replace every non-recursive $ref of a schema by its target
    Expand {
        /// Schema source: file path or URL (http:// or https://)
        schema: String,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,

        #[command(flatten)]
        loader: LoaderArgs,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Validate {
            schema,
            instance,
            json,
            no_format,
            dialect,
            loader,
        } => run_validate(ValidateArgs {
            schema,
            instance,
            json_output: json,
            use_format: !no_format,
            dialect,
            loader,
        }),

        Commands::Check {
            path,
            format,
            strict,
            quiet,
        } => run_check(&path, &format, strict, quiet),

        Commands::Expand {
            schema,
            output,
            pretty,
            loader,
        } => run_expand(&schema, output, pretty, loader),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn configuration(
    loader: LoaderArgs,
    use_format: bool,
    dialect: Option<String>,
) -> Result<ValidationConfiguration, String> {
    let mut default_loader = DefaultLoader::new();
    if let (Some(local), Some(remote)) = (loader.schema_local_base, loader.schema_remote_base) {
        default_loader = default_loader.with_mapping(remote, local);
    }
    let mut builder = ValidationConfiguration::builder()
        .use_format(use_format)
        .loader(Arc::new(default_loader));
    if let Some(id) = dialect {
        builder = builder.default_dialect(id);
    }
    builder.build().map_err(|e| e.to_string())
}

/// Load a schema and position it at the URI it came from.
fn load_tree(source: &str) -> Result<SchemaTree, schemaproc::LoadError> {
    let schema = load_schema_auto(source)?;
    let loading_ref = source_ref(source)?;
    Ok(SchemaTree::with_loading_ref(schema, loading_ref))
}

struct ValidateArgs {
    schema: String,
    instance: String,
    json_output: bool,
    use_format: bool,
    dialect: Option<String>,
    loader: LoaderArgs,
}

fn run_validate(args: ValidateArgs) -> Result<(), u8> {
    let ValidateArgs {
        schema: schema_source,
        instance: instance_source,
        json_output,
        use_format,
        dialect,
        loader,
    } = args;

    let config = configuration(loader, use_format, dialect).map_err(|e| {
        report_error(json_output, &e);
        2u8
    })?;

    let schema = load_tree(&schema_source).map_err(|e| {
        report_error(json_output, &format!("loading schema: {}", e));
        e.exit_code() as u8
    })?;

    let instance = load_schema_auto(&instance_source).map_err(|e| {
        report_error(json_output, &format!("loading instance: {}", e));
        e.exit_code() as u8
    })?;

    let report = validate(&schema, &instance, &config);
    tracing::debug!(messages = report.len(), "validation finished");

    if json_output {
        let output = serde_json::json!({
            "valid": report.success(),
            "messages": report.messages(),
        });
        println!("{}", output);
    } else if report.success() {
        print_messages(&report, LogLevel::Warning);
        println!("Valid");
    } else {
        eprintln!("Validation failed:");
        print_messages(&report, LogLevel::Warning);
    }

    if report.has_fatal() {
        Err(2)
    } else if !report.success() {
        Err(1)
    } else {
        Ok(())
    }
}

fn print_messages(report: &ProcessingReport, level: LogLevel) {
    for message in report.at_least(level) {
        let instance = message
            .instance_pointer()
            .map(|p| format!(" at \"{}\"", p))
            .unwrap_or_default();
        eprintln!("  {}{}: {}", message.level(), instance, message.message());
    }
}

/// Output an error message in plain text or JSON format.
fn report_error(json_output: bool, msg: &str) {
    if json_output {
        println!("{}", serde_json::json!({"valid": false, "error": msg}));
    } else {
        eprintln!("Error: {}", msg);
    }
}

fn run_check(path: &Path, format: &str, strict: bool, quiet: bool) -> Result<(), u8> {
    if !path.exists() {
        eprintln!("Error: path not found: {}", path.display());
        return Err(2);
    }

    let config = ValidationConfiguration::default();
    let result = check_files(path, &config, strict);

    if format == "json" {
        let rendered = serde_json::to_string_pretty(&result).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?;
        println!("{}", rendered);
    } else {
        if !quiet {
            println!("Checking {} ...\n", path.display());
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

            for message in &file_result.report {
                let is_error = message.level() >= LogLevel::Error;
                if quiet && !is_error {
                    continue;
                }
                let color = if is_error { "\x1b[31m" } else { "\x1b[33m" };
                let pointer = message
                    .schema()
                    .map(|s| s.pointer.to_string())
                    .unwrap_or_default();
                println!(
                    "    {}{}[{}]\x1b[0m: {} - {}",
                    color,
                    message.level(),
                    message.key(),
                    pointer,
                    message.message()
                );
            }
        }

        println!();
        if result.is_ok() {
            println!("\x1b[32m✓ {} files checked, all passed\x1b[0m", result.files_checked);
        } else {
            println!(
                "\x1b[31m✗ {} files checked: {} passed, {} failed ({} errors, {} warnings)\x1b[0m",
                result.files_checked, result.passed, result.failed, result.errors, result.warnings
            );
        }
    }

    if result.is_ok() {
        Ok(())
    } else {
        Err(1)
    }
}

fn run_expand(schema_source: &str, output: Option<PathBuf>, pretty: bool, loader: LoaderArgs) -> Result<(), u8> {
    let config = configuration(loader, true, None).map_err(|e| {
        eprintln!("Error: {}", e);
        2u8
    })?;

    let schema = load_tree(schema_source).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let expanded = expand_references(&schema, &config).map_err(|e| {
        eprintln!("Error expanding refs: {}", e);
        e.exit_code() as u8
    })?;

    let json_output = if pretty {
        serde_json::to_string_pretty(expanded.root())
    } else {
        serde_json::to_string(expanded.root())
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
