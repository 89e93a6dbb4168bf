//! Command-line surface.
//!
//! Argument parsing (clap derive) and human-readable output live here; all
//! real work goes through an [`Orchestrator`] passed in by `main`, so command
//! handlers hold no global state. Every subcommand exits 0 on success and 1
//! on any handled error (mapped in `main`).

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value as JsonValue;

use crate::error::{Result, TabverError};
use crate::model::DatasetRef;
use crate::orchestrator::Orchestrator;

/// Manage versioned tabular datasets: imports, transforms and stats.
#[derive(Debug, Parser)]
#[command(name = "tabver", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create and inspect datasets.
    Dataset {
        #[command(subcommand)]
        command: DatasetCommands,
    },
    /// Import data (creates immutable versions).
    Import {
        #[command(subcommand)]
        command: ImportCommands,
    },
    /// Bounded preview of a version.
    Preview {
        /// Version reference, `<dataset_id>:<version>`.
        dataset_version: String,
        /// Rows to show (at most 100).
        #[arg(short, long, default_value_t = 100, value_parser = clap::value_parser!(u32).range(1..=100))]
        limit: u32,
    },
    /// Basic column profiling of a version.
    Profile {
        /// Version reference, `<dataset_id>:<version>`.
        dataset_version: String,
    },
    /// Transforms that produce new versions.
    Transform {
        #[command(subcommand)]
        command: TransformCommands,
    },
    /// Descriptive statistics over a version.
    Stats {
        #[command(subcommand)]
        command: StatsCommands,
    },
    /// Dump the in-memory metadata state.
    DebugState,
}

#[derive(Debug, Subcommand)]
pub enum DatasetCommands {
    /// Register a new logical dataset.
    Create {
        /// Logical identifier (snake_case).
        #[arg(short = 'd', long)]
        dataset_id: String,
        /// Human-readable name.
        #[arg(short, long)]
        name: String,
        /// Optional description.
        #[arg(short = 'm', long)]
        description: Option<String>,
    },
    /// List registered datasets.
    List,
    /// Show one dataset by id.
    Show { dataset_id: String },
}

#[derive(Debug, Subcommand)]
pub enum ImportCommands {
    /// Import a CSV file and create a version in Parquet.
    Csv {
        dataset_id: String,
        csv_path: PathBuf,
        /// Version to create (immutable).
        #[arg(long, default_value = "v1")]
        version: String,
    },
    /// Import an Excel workbook and create a version in Parquet.
    Xlsx {
        dataset_id: String,
        xlsx_path: PathBuf,
        /// Version to create (immutable).
        #[arg(long, default_value = "v1")]
        version: String,
        /// Sheet to read (defaults to the first one).
        #[arg(long)]
        sheet: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum TransformCommands {
    /// Filter rows and produce a new version.
    Filter {
        /// Version reference, `<dataset_id>:<version>`.
        dataset_version: String,
        /// SQL-ish predicate selecting the rows to keep.
        #[arg(long = "where")]
        where_expr: String,
        /// New version label (e.g. v2).
        #[arg(long)]
        out_version: String,
    },
    /// Clamp a column to quantile bounds and produce a new version.
    Winsorize {
        /// Version reference, `<dataset_id>:<version>`.
        dataset_version: String,
        /// Column to winsorize.
        #[arg(long = "col")]
        column: String,
        /// Lower percentile.
        #[arg(long, default_value_t = 0.01)]
        p_low: f64,
        /// Upper percentile.
        #[arg(long, default_value_t = 0.99)]
        p_high: f64,
        /// Output column (default: replace in place).
        #[arg(long = "out-col")]
        out_column: Option<String>,
        /// New version label (e.g. v2).
        #[arg(long)]
        out_version: String,
    },
    /// Recode a column through a JSON mapping and produce a new version.
    Recode {
        /// Version reference, `<dataset_id>:<version>`.
        dataset_version: String,
        /// Column to recode.
        #[arg(long = "col")]
        column: String,
        /// JSON object mapping, e.g. '{"M":1,"F":0}'.
        #[arg(long = "map")]
        mapping: String,
        /// Output column for the recoded values.
        #[arg(long = "out-col")]
        out_column: String,
        /// New version label (e.g. v2).
        #[arg(long)]
        out_version: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum StatsCommands {
    /// Mean of a column.
    Mean {
        /// Version reference, `<dataset_id>:<version>`.
        dataset_version: String,
        /// Target column.
        #[arg(long = "col")]
        column: String,
        /// Optional SQL-ish predicate.
        #[arg(long = "where")]
        where_expr: Option<String>,
    },
}

/// Dispatch a parsed command against an orchestrator.
pub fn run(cli: Cli, orc: &mut Orchestrator) -> Result<()> {
    match cli.command {
        Commands::Dataset { command } => run_dataset(command, orc),
        Commands::Import { command } => run_import(command, orc),
        Commands::Preview {
            dataset_version,
            limit,
        } => {
            let reference = DatasetRef::parse(&dataset_version)?;
            let version = orc.resolve(&reference)?;
            let rows = orc.preview(&version, limit as usize)?;
            println!("Preview of {reference} (first {limit} rows):");
            println!("{rows}");
            Ok(())
        }
        Commands::Profile { dataset_version } => {
            let reference = DatasetRef::parse(&dataset_version)?;
            let version = orc.resolve(&reference)?;
            let profile = orc.profile(&version)?;
            println!("{profile}");
            Ok(())
        }
        Commands::Transform { command } => run_transform(command, orc),
        Commands::Stats { command } => run_stats(command, orc),
        Commands::DebugState => {
            println!("{}", serde_json::to_string_pretty(&orc.debug_state())?);
            Ok(())
        }
    }
}

fn run_dataset(command: DatasetCommands, orc: &mut Orchestrator) -> Result<()> {
    match command {
        DatasetCommands::Create {
            dataset_id,
            name,
            description,
        } => {
            let dataset = orc.create_dataset(&dataset_id, &name, description.as_deref())?;
            println!("Dataset created: {} ({})", dataset.dataset_id, dataset.name);
        }
        DatasetCommands::List => {
            let datasets = orc.list_datasets();
            if datasets.is_empty() {
                println!("No datasets registered.");
            }
            for dataset in datasets {
                println!("- {}: {}", dataset.dataset_id, dataset.name);
            }
        }
        DatasetCommands::Show { dataset_id } => {
            let dataset = orc.get_dataset(&dataset_id)?;
            println!("{} :: {}", dataset.dataset_id, dataset.name);
            if let Some(description) = &dataset.description {
                println!("{description}");
            }
            for version in orc.list_versions(&dataset_id) {
                println!("  {} -> {}", version.reference(), version.path);
            }
        }
    }
    Ok(())
}

fn run_import(command: ImportCommands, orc: &mut Orchestrator) -> Result<()> {
    let version = match command {
        ImportCommands::Csv {
            dataset_id,
            csv_path,
            version,
        } => orc.import_csv(&dataset_id, &csv_path, &version)?,
        ImportCommands::Xlsx {
            dataset_id,
            xlsx_path,
            version,
            sheet,
        } => orc.import_xlsx(&dataset_id, &xlsx_path, sheet.as_deref(), &version)?,
    };
    println!("Version created: {} -> {}", version.reference(), version.path);
    Ok(())
}

fn run_transform(command: TransformCommands, orc: &mut Orchestrator) -> Result<()> {
    let new_version = match command {
        TransformCommands::Filter {
            dataset_version,
            where_expr,
            out_version,
        } => {
            let source = orc.resolve(&DatasetRef::parse(&dataset_version)?)?;
            orc.filter(&source, &where_expr, &out_version)?
        }
        TransformCommands::Winsorize {
            dataset_version,
            column,
            p_low,
            p_high,
            out_column,
            out_version,
        } => {
            let source = orc.resolve(&DatasetRef::parse(&dataset_version)?)?;
            orc.winsorize(
                &source,
                &column,
                p_low,
                p_high,
                out_column.as_deref(),
                &out_version,
            )?
        }
        TransformCommands::Recode {
            dataset_version,
            column,
            mapping,
            out_column,
            out_version,
        } => {
            let mapping = parse_mapping(&mapping)?;
            let source = orc.resolve(&DatasetRef::parse(&dataset_version)?)?;
            orc.recode(&source, &column, &mapping, Some(&out_column), &out_version)?
        }
    };
    println!("New version: {}", new_version.reference());
    Ok(())
}

fn run_stats(command: StatsCommands, orc: &mut Orchestrator) -> Result<()> {
    match command {
        StatsCommands::Mean {
            dataset_version,
            column,
            where_expr,
        } => {
            let version = orc.resolve(&DatasetRef::parse(&dataset_version)?)?;
            let mean = orc.mean(&version, &column, where_expr.as_deref())?;
            println!("Mean({column}) = {mean}");
        }
    }
    Ok(())
}

/// Parse a `--map` argument into a JSON object. A non-object or malformed
/// input is a usage error.
fn parse_mapping(raw: &str) -> Result<serde_json::Map<String, JsonValue>> {
    match serde_json::from_str::<JsonValue>(raw) {
        Ok(JsonValue::Object(map)) => Ok(map),
        Ok(_) => Err(TabverError::invalid(
            "recode mapping must be a JSON object, e.g. '{\"M\":1,\"F\":0}'",
        )),
        Err(err) => Err(TabverError::invalid(format!("invalid recode mapping: {err}"))),
    }
}
