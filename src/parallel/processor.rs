//! Main batch processor
//!
//! Contains the BatchProcessor that wires splitter, workers, monitor and
//! collector together for one synchronous batch call.

use std::time::Instant;

use crossbeam_channel::unbounded;
use log::{info, warn};

use crate::config::BatchConfig;
use crate::error::{BatchError, Result};
use crate::stats::BatchStats;

use super::batching::split_records;
use super::monitor::ProgressMonitor;
use super::sink::collect_outputs;
use super::types::{build_records, InputRecord};
use super::worker::Worker;

/// Output of a successful batch: the locations to read, in order
#[derive(Debug, Clone)]
pub struct BatchOutput {
    pub locations: Vec<std::path::PathBuf>,
    pub stats: BatchStats,
}

/// Runs batches of sentences through parallel analyzer processes
pub struct BatchProcessor {
    config: BatchConfig,
}

impl BatchProcessor {
    pub fn new(config: BatchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Analyze `sentences`, optionally tagging each with an external id.
    ///
    /// Blocks until every worker finished. On any failure all analyzer
    /// processes are stopped and no locations are returned.
    pub fn run<S, I>(&self, sentences: &[S], ids: Option<&[I]>) -> Result<BatchOutput>
    where
        S: AsRef<str>,
        I: ToString,
    {
        let records = build_records(sentences, ids)?;
        if ids.is_some() && !self.config.protocol.echoes_comments() {
            warn!("analyzer protocol does not echo comments; identifiers will fall back to sequence numbers when parsing");
        }
        self.run_records(records)
    }

    pub fn run_records(&self, records: Vec<InputRecord>) -> Result<BatchOutput> {
        let started = Instant::now();
        let total = records.len();
        let num_workers = self.config.effective_workers(total);
        let command = self.config.command_args()?;
        let (program, args) = command
            .split_first()
            .ok_or_else(|| BatchError::Config("analyzer command is empty".into()))?;

        info!(
            "analyzing {} sentences with {} worker(s) using '{}'",
            total, num_workers, self.config.command
        );

        let chunks = if total == 0 {
            Vec::new()
        } else {
            let tasks = split_records(records, num_workers, self.config.partition);
            let (event_sender, event_receiver) = unbounded();

            let mut workers = Vec::with_capacity(tasks.len());
            for task in tasks {
                match Worker::spawn(task, program, args, event_sender.clone()) {
                    Ok(worker) => workers.push(worker),
                    Err(err) => {
                        for worker in workers.iter_mut() {
                            worker.abort();
                        }
                        return Err(err);
                    }
                }
            }
            // Only worker reader threads hold senders from here on
            drop(event_sender);

            ProgressMonitor::new(self.config.check_interval).run(workers, event_receiver)?
        };

        let collected = collect_outputs(&self.config, &chunks, total, num_workers)?;

        let stats = BatchStats {
            sentences: total,
            workers: if total == 0 { 0 } else { num_workers },
            bytes_written: collected.bytes_written,
            locations: collected.locations.len(),
            processing_time: started.elapsed(),
        };
        info!("{}", stats.summary());

        Ok(BatchOutput {
            locations: collected.locations,
            stats,
        })
    }
}

/// Convenience wrapper around [`BatchProcessor`]
pub fn run_batch<S, I>(
    sentences: &[S],
    ids: Option<&[I]>,
    config: &BatchConfig,
) -> Result<BatchOutput>
where
    S: AsRef<str>,
    I: ToString,
{
    BatchProcessor::new(config.clone())?.run(sentences, ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_processor_rejects_invalid_config() {
        let config = BatchConfig::new("jumanpp", "no-placeholder.txt");
        assert!(matches!(
            BatchProcessor::new(config),
            Err(BatchError::Config(_))
        ));
    }

    #[test]
    fn test_empty_batch_returns_no_locations() {
        let dir = TempDir::new().unwrap();
        let config = BatchConfig::new(
            "/nonexistent/analyzer",
            dir.path().join("{}.txt").to_string_lossy(),
        );
        let out = run_batch::<&str, String>(&[], None, &config).unwrap();
        assert!(out.locations.is_empty());
        assert_eq!(out.stats.sentences, 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_cat_analyzer_round_trips_sentinel_lines() {
        let dir = TempDir::new().unwrap();
        let config = BatchConfig::new("cat", dir.path().join("{}.txt").to_string_lossy())
            .with_workers(2)
            .with_check_interval(std::time::Duration::from_millis(10));
        // `cat` echoes input, so every sentinel sentence is its own block
        let out = run_batch::<_, String>(&["EOS", "EOS", "EOS"], None, &config).unwrap();
        assert_eq!(out.locations.len(), 2);
        let joined: String = out
            .locations
            .iter()
            .map(|p| std::fs::read_to_string(p).unwrap())
            .collect();
        assert_eq!(joined, "EOS\nEOS\nEOS\n");
    }

    #[test]
    fn test_missing_analyzer_is_invocation_error() {
        let dir = TempDir::new().unwrap();
        let config = BatchConfig::new(
            "/nonexistent/analyzer",
            dir.path().join("{}.txt").to_string_lossy(),
        );
        let err = run_batch::<_, String>(&["a"], None, &config).unwrap_err();
        assert!(matches!(err, BatchError::Invocation { .. }));
    }
}
