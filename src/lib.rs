// Core library for jumanpp-batch: parallel Juman++ dispatch and output parsing

pub mod analyzer;
pub mod config;
pub mod error;
pub mod parallel;
pub mod parsers;
pub mod stats;

pub use analyzer::{probe_version, AnalyzerVersion};
pub use config::{BatchConfig, PartitionStrategy, ProtocolVersion};
pub use error::{BatchError, ParseErrorKind, Result};
pub use parallel::{run_batch, BatchOutput, BatchProcessor};
pub use parsers::{
    parse_outputs, parse_outputs_with, ParseOptions, ParsedSentence, SentenceId, Sentences,
    TokenField, TokenRecord,
};
pub use stats::BatchStats;
