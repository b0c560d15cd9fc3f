//! Type definitions for parallel dispatch
//!
//! Contains input records, worker task lists, worker output chunks and the
//! events exchanged between worker threads and the progress monitor.

use std::io;

use crate::error::{BatchError, Result};
use crate::parsers::outfile::COMMENT_PREFIX;

/// One sentence with its position in the original input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRecord {
    pub sequence_id: u64,
    pub external_id: Option<String>,
    pub text: String,
}

impl InputRecord {
    /// Append the analyzer input for this record: an optional `# <id>`
    /// comment line followed by the sentence line.
    pub fn write_protocol_lines(&self, buf: &mut Vec<u8>) {
        if let Some(id) = &self.external_id {
            buf.extend_from_slice(COMMENT_PREFIX.as_bytes());
            buf.extend_from_slice(id.as_bytes());
            buf.push(b'\n');
        }
        buf.extend_from_slice(self.text.as_bytes());
        buf.push(b'\n');
    }
}

/// Build globally ordered records from sentences and optional parallel ids.
///
/// Sequence ids are assigned here, 0-based, in input order.
pub fn build_records<S, I>(sentences: &[S], ids: Option<&[I]>) -> Result<Vec<InputRecord>>
where
    S: AsRef<str>,
    I: ToString,
{
    if let Some(ids) = ids {
        if ids.len() != sentences.len() {
            return Err(BatchError::InvalidInput(format!(
                "{} identifiers supplied for {} sentences",
                ids.len(),
                sentences.len()
            )));
        }
    }

    let mut records = Vec::with_capacity(sentences.len());
    for (idx, sentence) in sentences.iter().enumerate() {
        let text = sentence.as_ref();
        if text.contains(['\n', '\r']) {
            return Err(BatchError::InvalidInput(format!(
                "sentence {} contains a line break",
                idx
            )));
        }
        // The analyzer would read it as a comment and emit no block
        if text.starts_with(COMMENT_PREFIX) {
            return Err(BatchError::InvalidInput(format!(
                "sentence {} starts with the comment marker '{}'",
                idx, COMMENT_PREFIX
            )));
        }
        let external_id = match ids {
            Some(ids) => {
                let id = ids[idx].to_string();
                if id.contains(['\n', '\r']) {
                    return Err(BatchError::InvalidInput(format!(
                        "identifier for sentence {} contains a line break",
                        idx
                    )));
                }
                Some(id)
            }
            None => None,
        };
        records.push(InputRecord {
            sequence_id: idx as u64,
            external_id,
            text: text.to_string(),
        });
    }
    Ok(records)
}

/// The ordered subset of records assigned to one worker
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerTask {
    pub worker_id: usize,
    pub records: Vec<InputRecord>,
}

impl WorkerTask {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Encoded stdin payload for the analyzer
    pub fn input_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for record in &self.records {
            record.write_protocol_lines(&mut buf);
        }
        buf
    }

    pub fn sequence_ids(&self) -> Vec<u64> {
        self.records.iter().map(|r| r.sequence_id).collect()
    }
}

/// Raw analyzer output of one worker, tagged with the sequence ids it covers
#[derive(Debug, Clone)]
pub struct OutputChunk {
    pub worker_id: usize,
    pub sequence_ids: Vec<u64>,
    pub bytes: Vec<u8>,
}

/// Message sent by a worker's reader thread once the analyzer's stdout closes
#[derive(Debug)]
pub(crate) enum WorkerEvent {
    OutputClosed {
        worker_id: usize,
        output: io::Result<Vec<u8>>,
    },
}
