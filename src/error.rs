//! Error types for batch dispatch and output parsing

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BatchError>;

/// Every failure the batch engine or the output parser can surface.
///
/// Dispatch errors (`Invocation`, `WorkerFailure`, `BrokenPipe`,
/// `BlockMismatch`, `Write`) abort the whole batch; no output locations are
/// returned alongside them.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("failed to launch analyzer '{command}': {source}")]
    Invocation {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("worker {worker_id} failed ({status}){}", format_stderr(.stderr))]
    WorkerFailure {
        worker_id: usize,
        status: ExitStatus,
        stderr: String,
    },

    #[error("worker {worker_id} lost its analyzer pipe: {source}")]
    BrokenPipe {
        worker_id: usize,
        #[source]
        source: io::Error,
    },

    #[error("worker {worker_id} produced {actual} sentence blocks for {expected} sentences")]
    BlockMismatch {
        worker_id: usize,
        expected: usize,
        actual: usize,
    },

    #[error("failed to write output '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}:{line_number}: {kind} in line {line:?}", .path.display())]
    Parse {
        path: PathBuf,
        line_number: usize,
        line: String,
        kind: ParseErrorKind,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// What was wrong with an analyzer output line.
#[derive(Debug, Error)]
pub enum ParseErrorKind {
    #[error("expected {expected} fields, found {actual}")]
    FieldCount { expected: usize, actual: usize },

    #[error("missing EOS sentinel")]
    MissingSentinel,

    #[error("unbalanced quoting ({0})")]
    Tokenize(#[from] shell_words::ParseError),
}

fn format_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {}", trimmed)
    }
}

impl BatchError {
    /// True for errors raised while dispatching work to analyzer processes.
    pub fn is_worker_error(&self) -> bool {
        matches!(
            self,
            BatchError::WorkerFailure { .. }
                | BatchError::BrokenPipe { .. }
                | BatchError::BlockMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_message_has_location() {
        let err = BatchError::Parse {
            path: PathBuf::from("out/0.txt"),
            line_number: 7,
            line: "a b c".to_string(),
            kind: ParseErrorKind::FieldCount {
                expected: 12,
                actual: 3,
            },
        };
        let message = err.to_string();
        assert!(message.starts_with("out/0.txt:7:"));
        assert!(message.contains("expected 12 fields, found 3"));
        assert!(message.contains("\"a b c\""));
    }

    #[test]
    fn test_worker_error_classification() {
        let err = BatchError::BlockMismatch {
            worker_id: 1,
            expected: 3,
            actual: 2,
        };
        assert!(err.is_worker_error());
        assert!(!BatchError::InvalidInput("x".into()).is_worker_error());
    }

    #[test]
    fn test_format_stderr_skips_blank_output() {
        assert_eq!(format_stderr("  \n"), "");
        assert_eq!(format_stderr("boom\n"), ": boom");
    }
}
