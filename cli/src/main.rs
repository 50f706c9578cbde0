use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use tablemap_core::{TableDefinition, TableMapping, ValueCodec, create_table_sql, drop_table_sql};
use tablemap_sqlite::{Database, DatabaseConfig};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "tablemap")]
#[command(about = "Render and apply declarative table definitions", version)]
struct Cli {
    /// Increase log output (-v for info, -vv for debug).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the DDL for one or more table definition files.
    Ddl(DdlArgs),
    /// Create the defined tables in a database file.
    Apply(ApplyArgs),
    /// List the tables and indices in a database file.
    Tables(TablesArgs),
}

#[derive(Debug, Args)]
struct DdlArgs {
    /// Definition files (.json, .yaml or .yml).
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Database config; only its datetime storage affects the output.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Emit a DROP TABLE before each table.
    #[arg(long)]
    drop: bool,
}

#[derive(Debug, Args)]
struct ApplyArgs {
    /// Database file path.
    #[arg(long)]
    db: PathBuf,
    /// Database config YAML.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Definition files (.json, .yaml or .yml).
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

#[derive(Debug, Args)]
struct TablesArgs {
    /// Database file path.
    #[arg(long)]
    db: PathBuf,
    /// Also print the recorded SQL for each object.
    #[arg(long)]
    sql: bool,
}

/// A definition file holds either one table or a list of tables.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DefinitionFile {
    Many(Vec<TableDefinition>),
    One(TableDefinition),
}

impl DefinitionFile {
    fn into_vec(self) -> Vec<TableDefinition> {
        match self {
            Self::Many(definitions) => definitions,
            Self::One(definition) => vec![definition],
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Ddl(args) => run_ddl(args),
        Command::Apply(args) => run_apply(args),
        Command::Tables(args) => run_tables(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

// ---------------------------------------------------------------------------
// ddl command
// ---------------------------------------------------------------------------

fn run_ddl(args: DdlArgs) -> Result<(), String> {
    let codec = match &args.config {
        Some(path) => load_config(path)?.codec(),
        None => ValueCodec::default(),
    };
    let mappings = load_mappings(&args.inputs)?;
    for mapping in &mappings {
        if args.drop {
            println!("{};", drop_table_sql(mapping));
        }
        for sql in create_table_sql(mapping, &codec) {
            println!("{sql};");
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// apply command
// ---------------------------------------------------------------------------

fn run_apply(args: ApplyArgs) -> Result<(), String> {
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => DatabaseConfig::default(),
    };
    let mappings = load_mappings(&args.inputs)?;
    let db = Database::open_with(&args.db, &config)
        .map_err(|e| format!("Failed to open database '{}': {e}", args.db.display()))?;

    let names: Vec<String> = mappings.iter().map(|m| m.table_name().to_string()).collect();
    db.run_in_transaction(|db| {
        for mapping in mappings {
            db.create_table_from(mapping)?;
        }
        Ok(())
    })
    .map_err(|e| format!("Apply failed: {e}"))?;

    println!(
        "Applied {} table definition(s) to '{}': {}",
        names.len(),
        args.db.display(),
        names.join(", ")
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// tables command
// ---------------------------------------------------------------------------

fn run_tables(args: TablesArgs) -> Result<(), String> {
    if !args.db.exists() {
        return Err(format!("Database '{}' does not exist", args.db.display()));
    }
    let db = Database::open(&args.db)
        .map_err(|e| format!("Failed to open database '{}': {e}", args.db.display()))?;
    let objects = db
        .schema_objects()
        .map_err(|e| format!("Failed to read schema: {e}"))?;

    for object in objects
        .iter()
        .filter(|o| o.kind == "table" || o.kind == "index")
        .filter(|o| !o.name.starts_with("sqlite_"))
    {
        if object.kind == "table" {
            println!("table {}", object.name);
        } else {
            println!("index {} on {}", object.name, object.table_name);
        }
        if args.sql {
            if let Some(sql) = &object.sql {
                println!("  {sql}");
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_config(path: &Path) -> Result<DatabaseConfig, String> {
    DatabaseConfig::load(path).map_err(|e| e.to_string())
}

/// Reads every input file and validates each definition into a mapping.
fn load_mappings(inputs: &[PathBuf]) -> Result<Vec<TableMapping>, String> {
    let mut mappings = Vec::new();
    for path in inputs {
        for definition in load_definitions(path)? {
            let mapping = definition
                .to_mapping()
                .map_err(|e| format!("Invalid definition for '{}' in '{}': {e}", definition.table, path.display()))?;
            debug!(table = mapping.table_name(), file = %path.display(), "Loaded definition");
            mappings.push(mapping);
        }
    }
    Ok(mappings)
}

fn load_definitions(path: &Path) -> Result<Vec<TableDefinition>, String> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let file = fs::File::open(path)
        .map_err(|e| format!("Failed to open '{}': {e}", path.display()))?;
    let reader = BufReader::new(file);

    let parsed: DefinitionFile = match extension.as_str() {
        "json" => serde_json::from_reader(reader).map_err(|e| e.to_string()),
        "yaml" | "yml" => serde_yaml::from_reader(reader).map_err(|e| e.to_string()),
        other => {
            return Err(format!(
                "Unsupported definition format '{other}' for '{}' (expected .json, .yaml or .yml)",
                path.display()
            ));
        }
    }
    .map_err(|e| format!("Failed to parse '{}': {e}", path.display()))?;

    Ok(parsed.into_vec())
}
