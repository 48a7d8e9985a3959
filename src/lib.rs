pub mod aggregate;
pub mod chunk;
#[cfg(feature = "cli")]
pub mod cli;
pub mod collection;
pub mod engagement;
pub mod lexer;
pub mod output;
pub mod parser;
pub mod path;
pub mod token;
pub mod value;

pub use aggregate::{Aggregate, AggregateError, PartialState, SumState};
pub use chunk::{ChunkLoader, LoadError, load_chunks};
pub use collection::{
    Collection, JoinMode, JoinRecord, JoinSpec, Pipeline, PipelineOutput, UnknownJoinMode,
    values_match,
};
pub use engagement::{
    EngagementAnalyzer, EngagementError, EngagementStats, compute_engagement_by_location,
};
pub use lexer::{LexError, Lexer};
pub use output::{to_json, to_json_pretty};
pub use parser::{ParseError, Parser, parse};
pub use token::{Token, TokenKind};
pub use value::{GroupKey, Value};
