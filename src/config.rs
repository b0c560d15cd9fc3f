use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;

use crate::error::{BatchError, Result};

/// Placeholder in the output template that receives the location index
pub const TEMPLATE_PLACEHOLDER: &str = "{}";

pub const DEFAULT_COMMAND: &str = "jumanpp";
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Main configuration for one batch call
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Analyzer command line, split with shell quoting rules
    pub command: String,
    /// Naming template for output locations, e.g. `out/part-{}.txt`
    pub output_template: String,
    /// Requested worker count; 0 means one per available CPU
    pub num_workers: usize,
    /// Liveness-check granularity of the progress monitor
    pub check_interval: Duration,
    pub partition: PartitionStrategy,
    pub protocol: ProtocolVersion,
}

/// How the splitter assigns sentences to workers
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PartitionStrategy {
    /// Each worker receives one contiguous run of the input
    #[default]
    Contiguous,
    /// Sentence `i` goes to worker `i % W`
    RoundRobin,
}

/// Analyzer protocol generation.
///
/// Version 1 echoes `# <id>` comment lines ahead of the following sentence's
/// block; version 2 dropped that. The token line schema is the same.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProtocolVersion {
    #[default]
    V1,
    V2,
}

impl ProtocolVersion {
    pub fn echoes_comments(self) -> bool {
        matches!(self, ProtocolVersion::V1)
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_COMMAND.to_string(),
            output_template: std::env::temp_dir()
                .join("jumanpp-batch-{}.txt")
                .to_string_lossy()
                .into_owned(),
            num_workers: 0,
            check_interval: DEFAULT_CHECK_INTERVAL,
            partition: PartitionStrategy::Contiguous,
            protocol: ProtocolVersion::V1,
        }
    }
}

impl BatchConfig {
    pub fn new(command: impl Into<String>, output_template: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            output_template: output_template.into(),
            ..Self::default()
        }
    }

    pub fn with_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers;
        self
    }

    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    pub fn with_partition(mut self, partition: PartitionStrategy) -> Self {
        self.partition = partition;
        self
    }

    pub fn with_protocol(mut self, protocol: ProtocolVersion) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.command_args()?.is_empty() {
            return Err(BatchError::Config("analyzer command is empty".to_string()));
        }
        let placeholders = self.output_template.matches(TEMPLATE_PLACEHOLDER).count();
        if placeholders != 1 {
            return Err(BatchError::Config(format!(
                "output template '{}' must contain exactly one '{}' placeholder, found {}",
                self.output_template, TEMPLATE_PLACEHOLDER, placeholders
            )));
        }
        if self.check_interval.is_zero() {
            return Err(BatchError::Config(
                "check interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Program and arguments of the analyzer command
    pub fn command_args(&self) -> Result<Vec<String>> {
        shell_words::split(&self.command).map_err(|e| {
            BatchError::Config(format!("cannot parse command '{}': {}", self.command, e))
        })
    }

    /// Get effective worker count for `num_sentences` inputs.
    ///
    /// Resolved once per batch call; never more workers than sentences and
    /// never fewer than one.
    pub fn effective_workers(&self, num_sentences: usize) -> usize {
        let requested = if self.num_workers == 0 {
            num_cpus::get()
        } else {
            self.num_workers
        };
        requested.min(num_sentences).max(1)
    }

    /// Output path for location `index`
    pub fn output_location(&self, index: usize) -> PathBuf {
        PathBuf::from(
            self.output_template
                .replacen(TEMPLATE_PLACEHOLDER, &index.to_string(), 1),
        )
    }
}
