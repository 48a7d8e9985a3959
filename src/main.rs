use clap::{Parser as ClapParser, Subcommand};
use quarry::cli::{self, CliError};
use quarry::{Collection, JoinMode, Value, compute_engagement_by_location, load_chunks};
use std::fs;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

#[derive(ClapParser)]
#[command(name = "quarry")]
#[command(about = "Quarry - a JSON document query engine with chunked streaming aggregation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a JSON or JSONL input and report the first error, if any
    Validate {
        /// Input file (reads from stdin if not provided)
        file: Option<PathBuf>,
    },

    /// List the distinct dotted field paths present in an input
    Fields {
        /// Input file (reads from stdin if not provided)
        file: Option<PathBuf>,
    },

    /// Filter documents by field=value equality criteria
    Find {
        /// Input file (reads from stdin if not provided)
        file: Option<PathBuf>,

        /// Criteria as field=value pairs; the value side is parsed as JSON
        /// where possible and treated as a string otherwise
        #[arg(short = 'w', long = "where", value_name = "FIELD=VALUE")]
        criteria: Vec<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Project documents onto selected dotted paths
    Project {
        /// Input file (reads from stdin if not provided)
        file: Option<PathBuf>,

        /// Comma-separated fields to keep
        #[arg(short, long, value_delimiter = ',')]
        fields: Vec<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Group by a field and aggregate each bucket
    Aggregate {
        /// Input file (reads from stdin if not provided)
        file: Option<PathBuf>,

        /// Field to group by
        #[arg(short, long)]
        group_by: String,

        /// One of count, sum, min, max or avg
        #[arg(long)]
        func: String,

        /// Field to aggregate (not used by count)
        #[arg(long)]
        field: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Hash-join two inputs on key fields
    Join {
        /// Left input file
        left: PathBuf,

        /// Right input file
        right: PathBuf,

        /// Join key path in the left documents
        #[arg(long)]
        left_key: String,

        /// Join key path in the right documents
        #[arg(long)]
        right_key: String,

        /// One of inner, left, right or full
        #[arg(short, long, default_value = "inner")]
        mode: String,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Grouped engagement ratios computed over a chunked load
    Engagement {
        /// Input file (reads from stdin if not provided)
        file: Option<PathBuf>,

        /// Documents per chunk
        #[arg(short, long, default_value_t = 5000)]
        chunk_size: usize,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { file } => run_validate(file),
        Commands::Fields { file } => run_fields(file),
        Commands::Find {
            file,
            criteria,
            pretty,
        } => run_find(file, &criteria, pretty),
        Commands::Project {
            file,
            fields,
            pretty,
        } => run_project(file, &fields, pretty),
        Commands::Aggregate {
            file,
            group_by,
            func,
            field,
            pretty,
        } => run_aggregate(file, &group_by, &func, field.as_deref(), pretty),
        Commands::Join {
            left,
            right,
            left_key,
            right_key,
            mode,
            pretty,
        } => run_join(&left, &right, &left_key, &right_key, &mode, pretty),
        Commands::Engagement {
            file,
            chunk_size,
            pretty,
        } => run_engagement(file, chunk_size, pretty),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn read_input(file: Option<PathBuf>) -> Result<String, CliError> {
    match file {
        Some(path) => Ok(fs::read_to_string(path)?),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
        None => Err(CliError::NoInput),
    }
}

/// Load every document from either input shape in one pass.
fn load_documents(text: &str) -> Result<Vec<Value>, CliError> {
    let mut docs = Vec::new();
    for chunk in load_chunks(Cursor::new(text), usize::MAX)? {
        docs.extend(chunk?);
    }
    Ok(docs)
}

fn print_documents(docs: Vec<Value>, pretty: bool) {
    print_json(cli::value_to_json(Value::Array(docs)), pretty);
}

fn print_json(value: serde_json::Value, pretty: bool) {
    let rendered = if pretty {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap();
    println!("{}", rendered);
}

fn run_validate(file: Option<PathBuf>) -> Result<(), CliError> {
    let text = read_input(file)?;
    let docs = load_documents(&text)?;
    println!("OK: {} document(s)", docs.len());
    Ok(())
}

fn run_fields(file: Option<PathBuf>) -> Result<(), CliError> {
    let text = read_input(file)?;
    let collection = Collection::from_documents(load_documents(&text)?);
    for path in collection.field_paths() {
        println!("{}", path);
    }
    Ok(())
}

fn run_find(file: Option<PathBuf>, criteria: &[String], pretty: bool) -> Result<(), CliError> {
    let text = read_input(file)?;
    let criteria = cli::parse_criteria(criteria)?;
    let collection = Collection::from_documents(load_documents(&text)?);
    let results = collection.find(&criteria);
    print_documents(results.into_documents(), pretty);
    Ok(())
}

fn run_project(file: Option<PathBuf>, fields: &[String], pretty: bool) -> Result<(), CliError> {
    let text = read_input(file)?;
    let collection = Collection::from_documents(load_documents(&text)?);
    let results = collection.project(fields);
    print_documents(results.into_documents(), pretty);
    Ok(())
}

fn run_aggregate(
    file: Option<PathBuf>,
    group_by: &str,
    func: &str,
    field: Option<&str>,
    pretty: bool,
) -> Result<(), CliError> {
    let text = read_input(file)?;
    let aggregate = cli::build_aggregate(func, field)?;
    let collection = Collection::from_documents(load_documents(&text)?);
    let results = collection.aggregate(group_by, &aggregate)?;

    let mut out = serde_json::Map::new();
    for (key, value) in results {
        out.insert(key.to_string(), cli::value_to_json(value));
    }
    print_json(serde_json::Value::Object(out), pretty);
    Ok(())
}

fn run_join(
    left: &Path,
    right: &Path,
    left_key: &str,
    right_key: &str,
    mode: &str,
    pretty: bool,
) -> Result<(), CliError> {
    let mode: JoinMode = mode.parse()?;
    let left_docs = load_documents(&fs::read_to_string(left)?)?;
    let right_docs = load_documents(&fs::read_to_string(right)?)?;

    let records = Collection::from_documents(left_docs).hash_join(
        &Collection::from_documents(right_docs),
        left_key,
        right_key,
        mode,
    );
    let docs: Vec<Value> = records.into_iter().map(|r| r.into_value()).collect();
    print_documents(docs, pretty);
    Ok(())
}

fn run_engagement(file: Option<PathBuf>, chunk_size: usize, pretty: bool) -> Result<(), CliError> {
    let text = read_input(file)?;
    let report = compute_engagement_by_location(Cursor::new(text), chunk_size)?;

    let mut out = serde_json::Map::new();
    for (key, stats) in report {
        let mut entry = serde_json::Map::new();
        entry.insert("total_count".to_string(), stats.total_count.into());
        entry.insert(
            "average_ratio".to_string(),
            serde_json::Number::from_f64(stats.average_ratio)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
        );
        out.insert(key.to_string(), serde_json::Value::Object(entry));
    }
    print_json(serde_json::Value::Object(out), pretty);
    Ok(())
}
