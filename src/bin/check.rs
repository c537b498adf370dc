//! Formgate Check CLI
//!
//! Validates a JSON document against a declarative schema and prints the
//! cleaned fields or the errors as JSON.

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use formgate::config::OutputFormat;
use formgate::{Form, FormgateConfig, SchemaDocument};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "formgate-check")]
#[command(about = "Validate a JSON document against a formgate schema")]
struct Cli {
    /// Schema document (.json or .toml)
    #[arg(short, long)]
    schema: PathBuf,

    /// Configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Reject undeclared data regardless of the schema's own setting
    #[arg(long)]
    strict: bool,

    /// Trim surrounding whitespace from string values
    #[arg(long)]
    trim: bool,

    /// Input document; reads stdin when omitted or "-"
    input: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = FormgateConfig::load_from(cli.config.as_deref()).context("loading configuration")?;

    let mut document = SchemaDocument::load(&cli.schema)
        .with_context(|| format!("loading schema {:?}", cli.schema))?;
    config.apply_to(&mut document);
    document.strict |= cli.strict;
    document.trim |= cli.trim;

    let schema = document.to_schema().context("building schema")?;
    tracing::debug!(fields = schema.fields().len(), strict = document.strict, "schema loaded");

    let raw = match &cli.input {
        Some(path) if path.as_os_str() != "-" => {
            std::fs::read_to_string(path).with_context(|| format!("reading input {:?}", path))?
        }
        _ => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).context("reading stdin")?;
            buf
        }
    };
    let input: serde_json::Value = serde_json::from_str(&raw).context("parsing input as JSON")?;

    let mut form = Form::new(Arc::new(schema));
    form.bind_input(input);

    let report = if form.is_valid() {
        serde_json::json!({ "valid": true, "fields": form.fields() })
    } else if config.output.group_errors {
        serde_json::json!({ "valid": false, "errors": form.errors_by_field() })
    } else {
        serde_json::json!({ "valid": false, "errors": form.errors() })
    };

    let rendered = match config.output.format {
        OutputFormat::Pretty => serde_json::to_string_pretty(&report)?,
        OutputFormat::Compact => serde_json::to_string(&report)?,
    };
    println!("{}", rendered);

    if form.is_valid() {
        eprintln!("✅ Input is valid");
    } else {
        eprintln!("❌ {} error(s)", form.errors().len());
    }

    Ok(form.is_valid())
}
