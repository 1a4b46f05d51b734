//! Command implementations for the tabsearch CLI.
//!
//! Handles:
//! - insert/update/delete: load records from JSON and write them
//! - search: run a template and filter query, print one JSON line per hit
//! - compact: merge a partition's segments

use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::info;

use tabsearch_index::{DataContext, PageRequest};
use tabsearch_types::{FilterExpression, Record, RecordSchema, Settings};

use crate::cli::{Cli, Commands, WriteArgs};

/// Load settings and apply CLI overrides.
pub fn load_settings(
    config_path: Option<&str>,
    log_level: Option<&str>,
    index_root: Option<&str>,
) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    if let Some(level) = log_level {
        settings.log_level = level.to_string();
    }
    if let Some(root) = index_root {
        settings.index_root = root.to_string();
    }
    Ok(settings)
}

/// Install a stderr tracing subscriber. `RUST_LOG` wins over settings.
pub fn init_logging(settings: &Settings) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Read and validate a record schema file.
pub fn read_schema(path: &Path) -> Result<Arc<RecordSchema>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read schema {}", path.display()))?;
    let schema: RecordSchema = serde_json::from_str(&text)
        .with_context(|| format!("Invalid schema JSON in {}", path.display()))?;
    schema.validate()?;
    Ok(Arc::new(schema))
}

/// Read one record object or an array of them.
pub fn read_records(schema: &Arc<RecordSchema>, path: &Path) -> Result<Vec<Record>> {
    let json = read_json(path)?;
    let items = match json {
        Value::Array(items) => items,
        single => vec![single],
    };
    items
        .iter()
        .map(|item| Record::from_json(schema.clone(), item).map_err(Into::into))
        .collect()
}

/// Read exactly one record, used as a query template.
pub fn read_template(schema: &Arc<RecordSchema>, path: &Path) -> Result<Record> {
    let json = read_json(path)?;
    Ok(Record::from_json(schema.clone(), &json)?)
}

pub fn read_filter(path: Option<&Path>) -> Result<FilterExpression> {
    match path {
        Some(path) => Ok(serde_json::from_value(read_json(path)?)
            .with_context(|| format!("Invalid filter JSON in {}", path.display()))?),
        None => Ok(FilterExpression::new()),
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid JSON in {}", path.display()))
}

/// Run one parsed command against a context, writing results to `out`.
pub fn execute(context: &DataContext, command: Commands, out: &mut impl Write) -> Result<()> {
    match command {
        Commands::Insert(args) => {
            let records = load_write_args(&args)?;
            let count = context.insert(&records)?;
            writeln!(out, "Inserted {} records", count)?;
        }
        Commands::Update(args) => {
            let records = load_write_args(&args)?;
            let report = context.update_counted(&records)?;
            writeln!(
                out,
                "Updated {} records ({} replaced)",
                report.attempted, report.deleted
            )?;
        }
        Commands::Delete(args) => {
            let records = load_write_args(&args)?;
            let report = context.delete_counted(&records)?;
            writeln!(
                out,
                "Deleted {} records ({} documents removed)",
                report.attempted, report.deleted
            )?;
        }
        Commands::Search {
            schema,
            template,
            filter,
            page,
            page_size,
            sort,
        } => {
            let schema = read_schema(&schema)?;
            let template = read_template(&schema, &template)?;
            let filter = read_filter(filter.as_deref())?;
            let result = context.select(
                &template,
                &filter,
                PageRequest::new(page, page_size),
                sort.as_deref(),
            )?;
            for record in &result.records {
                writeln!(out, "{}", serde_json::to_string(&record.to_json())?)?;
            }
            info!(rows = result.total, matched = result.matched, "Printed search results");
        }
        Commands::Compact { schema, template } => {
            let schema = read_schema(&schema)?;
            let template = read_template(&schema, &template)?;
            if context.compact(&template)? {
                writeln!(out, "Compacted {}", schema.table_name)?;
            } else {
                writeln!(out, "No index for {}", schema.table_name)?;
            }
        }
    }
    Ok(())
}

fn load_write_args(args: &WriteArgs) -> Result<Vec<Record>> {
    let schema = read_schema(&args.schema)?;
    read_records(&schema, &args.records)
}

/// Entry point for the binary.
pub fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(
        cli.config.as_deref(),
        cli.log_level.as_deref(),
        cli.index_root.as_deref(),
    )?;
    init_logging(&settings)?;

    let context = DataContext::from_settings(&settings);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    execute(&context, cli.command, &mut out)
}
