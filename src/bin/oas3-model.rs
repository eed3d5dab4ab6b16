//! OpenAPI model CLI
//!
//! Compile type expressions to schemas and route manifests to documents.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use oas3_model::{
    load_manifest, render_document, render_inline, string_format, CompileOptions, RenderOptions,
    Schema, SchemaCompiler, TypeDescriptor, DEFAULT_RENDER_DEPTH,
};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "oas3-model")]
#[command(about = "Build OpenAPI 3 schemas and documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a type expression (e.g. "dict[str, list[int]]") to a schema
    Compile {
        /// Type expression
        expr: String,

        /// Schema title
        #[arg(long)]
        title: Option<String>,

        /// Schema description
        #[arg(long)]
        description: Option<String>,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Render an OpenAPI document from a route manifest
    Document {
        /// Route manifest (JSON)
        manifest: PathBuf,

        /// Render named definitions inline instead of as $ref pointers
        #[arg(long)]
        no_refs: bool,

        /// Maximum entity nesting while rendering
        #[arg(long, default_value_t = DEFAULT_RENDER_DEPTH)]
        max_depth: usize,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Compile {
            expr,
            title,
            description,
            output,
            pretty,
        } => run_compile(&expr, title, description, output, pretty),

        Commands::Document {
            manifest,
            no_refs,
            max_depth,
            output,
            pretty,
        } => run_document(&manifest, no_refs, max_depth, output, pretty),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn run_compile(
    expr: &str,
    title: Option<String>,
    description: Option<String>,
    output: Option<PathBuf>,
    pretty: bool,
) -> Result<(), u8> {
    let source: TypeDescriptor = expr.parse().map_err(|e| {
        eprintln!("Error: {}", e);
        2u8
    })?;

    let mut overrides = Schema::builder();
    if let Some(title) = title {
        overrides = overrides.title(title);
    }
    if let Some(description) = description {
        overrides = overrides.description(description);
    }
    let overrides = overrides.build().map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let schema = SchemaCompiler::new()
        .fallback(&string_format)
        .options(CompileOptions::default())
        .compile(&source, &overrides)
        .map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?;

    let rendered = render_inline(&schema).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    write_output(&rendered, output.as_deref(), pretty)
}

fn run_document(
    manifest_path: &Path,
    no_refs: bool,
    max_depth: usize,
    output: Option<PathBuf>,
    pretty: bool,
) -> Result<(), u8> {
    let manifest = load_manifest(manifest_path).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let document = manifest
        .to_document(&CompileOptions::default())
        .map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?;

    let options = RenderOptions::new().referencing(!no_refs).max_depth(max_depth);
    let rendered = render_document(&document, &options).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    write_output(&rendered, output.as_deref(), pretty)
}

fn write_output(value: &Value, output: Option<&Path>, pretty: bool) -> Result<(), u8> {
    let json_output = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(path, &json_output).map_err(|e| {
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
