//! Parallel dispatch engine
//!
//! Fans an ordered sentence batch out across several analyzer processes and
//! reassembles their output in the original order.
//!
//! # Module Structure
//!
//! - `types`: Input records, worker tasks and output chunks
//! - `batching`: Splitter that partitions records into worker tasks
//! - `worker`: One analyzer subprocess with its feeding and draining threads
//! - `monitor`: Poll loop that drives workers to completion or abort
//! - `sink`: Collector that reorders blocks and writes output locations
//! - `processor`: Main BatchProcessor orchestration

mod batching;
mod monitor;
mod processor;
mod sink;
mod types;
mod worker;

// Re-export public types
pub use batching::split_records;
pub use processor::{run_batch, BatchOutput, BatchProcessor};
pub use sink::{is_sentinel, SENTINEL};
pub use types::{build_records, InputRecord, OutputChunk, WorkerTask};
