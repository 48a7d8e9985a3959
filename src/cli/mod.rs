//! CLI support for quarry.
//!
//! Provides the error type, argument helpers and `serde_json` interop used
//! by the `quarry` binary; the binary itself only wires arguments to the
//! library surface.

mod convert;

pub use convert::{json_to_value, value_to_json};

use std::io;

use indexmap::IndexMap;

use crate::{
    aggregate::{Aggregate, AggregateError},
    chunk::LoadError,
    collection::UnknownJoinMode,
    engagement::EngagementError,
    parser::ParseError,
    value::Value,
};

/// Errors that can occur during CLI operations.
#[derive(Debug)]
pub enum CliError {
    /// Parse error in an input document
    Parse(ParseError),
    /// Chunked load error
    Load(LoadError),
    /// Aggregation error
    Aggregate(AggregateError),
    /// Engagement computation error
    Engagement(EngagementError),
    /// IO error
    Io(io::Error),
    /// No input provided
    NoInput,
    /// A criteria argument that is not of the form `field=value`
    BadCriteria(String),
    /// Unrecognized join mode name
    JoinMode(UnknownJoinMode),
    /// Unrecognized aggregation function name
    UnknownAggregate(String),
    /// An aggregation function that needs a `--field`
    MissingAggregateField(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Parse(e) => write!(f, "Parse error: {}", e),
            CliError::Load(e) => write!(f, "Load error: {}", e),
            CliError::Aggregate(e) => write!(f, "Aggregation error: {}", e),
            CliError::Engagement(e) => write!(f, "Engagement error: {}", e),
            CliError::Io(e) => write!(f, "IO error: {}", e),
            CliError::NoInput => {
                write!(f, "No input provided. Pass a file or pipe JSON to stdin.")
            }
            CliError::BadCriteria(arg) => {
                write!(f, "Bad criteria '{}': expected field=value", arg)
            }
            CliError::JoinMode(e) => write!(f, "{}", e),
            CliError::UnknownAggregate(name) => {
                write!(
                    f,
                    "Unknown aggregation '{}': expected count, sum, min, max or avg",
                    name
                )
            }
            CliError::MissingAggregateField(name) => {
                write!(f, "Aggregation '{}' needs --field", name)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Parse(e) => Some(e),
            CliError::Load(e) => Some(e),
            CliError::Aggregate(e) => Some(e),
            CliError::Engagement(e) => Some(e),
            CliError::Io(e) => Some(e),
            CliError::JoinMode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ParseError> for CliError {
    fn from(e: ParseError) -> Self {
        CliError::Parse(e)
    }
}

impl From<LoadError> for CliError {
    fn from(e: LoadError) -> Self {
        CliError::Load(e)
    }
}

impl From<AggregateError> for CliError {
    fn from(e: AggregateError) -> Self {
        CliError::Aggregate(e)
    }
}

impl From<EngagementError> for CliError {
    fn from(e: EngagementError) -> Self {
        CliError::Engagement(e)
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}

impl From<UnknownJoinMode> for CliError {
    fn from(e: UnknownJoinMode) -> Self {
        CliError::JoinMode(e)
    }
}

/// Parse `field=value` pairs into a criteria map.
///
/// The value side is parsed as a JSON document where possible (so `30`,
/// `true` and `null` keep their types) and falls back to a bare string.
pub fn parse_criteria(pairs: &[String]) -> Result<IndexMap<String, Value>, CliError> {
    let mut criteria = IndexMap::new();
    for pair in pairs {
        let (field, raw) = pair
            .split_once('=')
            .ok_or_else(|| CliError::BadCriteria(pair.clone()))?;
        let value = crate::parser::parse(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        criteria.insert(field.to_string(), value);
    }
    Ok(criteria)
}

/// Build an [`Aggregate`] from a function name and optional field.
pub fn build_aggregate(func: &str, field: Option<&str>) -> Result<Aggregate, CliError> {
    let name = func.to_lowercase();
    if name == "count" {
        return Ok(Aggregate::Count);
    }
    let field = field
        .ok_or_else(|| CliError::MissingAggregateField(name.clone()))?
        .to_string();
    match name.as_str() {
        "sum" => Ok(Aggregate::Sum(field)),
        "min" => Ok(Aggregate::Min(field)),
        "max" => Ok(Aggregate::Max(field)),
        "avg" => Ok(Aggregate::Avg(field)),
        _ => Err(CliError::UnknownAggregate(name)),
    }
}
