//! Collector: reorders worker output into global input order and writes it
//!
//! Worker chunks are split into sentinel-terminated sentence blocks, keyed by
//! sequence id and written strictly in sequence order. Location `k` receives
//! the `k`-th contiguous run of sequence ids, so reading the returned
//! locations in order reproduces single-analyzer output byte for byte.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::ops::Range;
use std::path::PathBuf;

use log::info;

use crate::config::BatchConfig;
use crate::error::{BatchError, Result};

use super::batching::contiguous_ranges;
use super::types::OutputChunk;

/// Literal line terminating each sentence block
pub const SENTINEL: &str = "EOS";

/// True if `line` (with or without its line terminator) is the sentinel
pub fn is_sentinel(line: &[u8]) -> bool {
    let trimmed = line
        .strip_suffix(b"\n")
        .map(|l| l.strip_suffix(b"\r").unwrap_or(l))
        .unwrap_or(line);
    trimmed == SENTINEL.as_bytes()
}

/// Split raw analyzer output into sentence blocks, each ending with its
/// sentinel line. Bytes after the last sentinel are returned separately.
pub(crate) fn split_blocks(bytes: &[u8]) -> (Vec<&[u8]>, &[u8]) {
    let mut blocks = Vec::new();
    let mut block_start = 0;
    let mut line_start = 0;

    while line_start < bytes.len() {
        let line_end = match bytes[line_start..].iter().position(|&b| b == b'\n') {
            Some(pos) => line_start + pos + 1,
            None => bytes.len(),
        };
        if is_sentinel(&bytes[line_start..line_end]) {
            blocks.push(&bytes[block_start..line_end]);
            block_start = line_end;
        }
        line_start = line_end;
    }

    (blocks, &bytes[block_start..])
}

/// Result of writing the reassembled output
#[derive(Debug)]
pub(crate) struct CollectedOutput {
    pub locations: Vec<PathBuf>,
    pub bytes_written: u64,
}

/// Reorder `chunks` by sequence id and write them into `num_locations`
/// output locations named by `config.output_template`.
pub(crate) fn collect_outputs(
    config: &BatchConfig,
    chunks: &[OutputChunk],
    total_records: usize,
    num_locations: usize,
) -> Result<CollectedOutput> {
    let mut pending: HashMap<u64, &[u8]> = HashMap::with_capacity(total_records);
    for chunk in chunks {
        let (blocks, trailing) = split_blocks(&chunk.bytes);
        // Output after the last sentinel is an unterminated block
        if blocks.len() != chunk.sequence_ids.len() || !trailing.is_empty() {
            return Err(BatchError::BlockMismatch {
                worker_id: chunk.worker_id,
                expected: chunk.sequence_ids.len(),
                actual: blocks.len(),
            });
        }
        pending.extend(chunk.sequence_ids.iter().copied().zip(blocks));
    }

    if total_records == 0 {
        return Ok(CollectedOutput {
            locations: Vec::new(),
            bytes_written: 0,
        });
    }

    let mut sink = OrderedSink::new(config, contiguous_ranges(total_records, num_locations));
    let mut next_expected_id = 0u64;
    while let Some(block) = pending.remove(&next_expected_id) {
        sink.write_block(next_expected_id as usize, block)?;
        next_expected_id += 1;
    }

    if next_expected_id as usize != total_records {
        return Err(BatchError::InvalidInput(format!(
            "no output collected for sentence {}",
            next_expected_id
        )));
    }

    sink.finish()
}

/// Writes blocks in sequence order, rotating to the next location at each
/// range boundary.
struct OrderedSink<'a> {
    config: &'a BatchConfig,
    ranges: Vec<Range<usize>>,
    current: Option<(usize, PathBuf, BufWriter<File>)>,
    locations: Vec<PathBuf>,
    bytes_written: u64,
}

impl<'a> OrderedSink<'a> {
    fn new(config: &'a BatchConfig, ranges: Vec<Range<usize>>) -> Self {
        Self {
            config,
            ranges,
            current: None,
            locations: Vec::new(),
            bytes_written: 0,
        }
    }

    fn write_block(&mut self, sequence_id: usize, block: &[u8]) -> Result<()> {
        let location = self
            .ranges
            .iter()
            .position(|r| r.contains(&sequence_id))
            .unwrap_or(self.ranges.len().saturating_sub(1));

        if self.current.as_ref().map(|(idx, _, _)| *idx) != Some(location) {
            self.close_current()?;
            let path = self.config.output_location(location);
            let file = File::create(&path).map_err(|source| BatchError::Write {
                path: path.clone(),
                source,
            })?;
            self.current = Some((location, path, BufWriter::new(file)));
        }

        if let Some((_, path, writer)) = self.current.as_mut() {
            writer.write_all(block).map_err(|source| BatchError::Write {
                path: path.clone(),
                source,
            })?;
            self.bytes_written += block.len() as u64;
        }
        Ok(())
    }

    fn close_current(&mut self) -> Result<()> {
        if let Some((_, path, mut writer)) = self.current.take() {
            writer.flush().map_err(|source| BatchError::Write {
                path: path.clone(),
                source,
            })?;
            info!("wrote {}", path.display());
            self.locations.push(path);
        }
        Ok(())
    }

    fn finish(mut self) -> Result<CollectedOutput> {
        self.close_current()?;
        Ok(CollectedOutput {
            locations: self.locations,
            bytes_written: self.bytes_written,
        })
    }
}
