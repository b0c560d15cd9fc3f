// CLI-specific types and structures
// This module contains the command-line interface definitions

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use jumanpp_batch::config::{DEFAULT_COMMAND, PartitionStrategy, ProtocolVersion};
use jumanpp_batch::TokenField;

/// Protocol selection for `run`; `auto` asks the analyzer for its version
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProtocolArg {
    #[default]
    Auto,
    V1,
    V2,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Jsonl,
}

#[derive(Parser)]
#[command(name = "jumanpp-batch")]
#[command(about = "Run Juman++ over large sentence batches with parallel analyzer processes")]
#[command(
    long_about = "Run Juman++ over large sentence batches with parallel analyzer processes\n\nCOMMON EXAMPLES:\n  jumanpp-batch run sentences.txt --workers 4 --output-template 'out/part-{}.txt'\n  jumanpp-batch run --with-ids ids_and_sentences.tsv\n  jumanpp-batch parse out/part-0.txt out/part-1.txt --fields surface,pos --pos 名詞"
)]
#[command(version)]
#[command(args_override_self = true)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Ignore .jppbatchrc and user configuration files
    #[arg(long, global = true, help_heading = "Configuration Options")]
    pub ignore_config: bool,

    /// Read defaults from this configuration file instead of the search path
    #[arg(
        long,
        value_name = "PATH",
        global = true,
        help_heading = "Configuration Options"
    )]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze sentences and print the output locations, one per line
    Run(RunArgs),
    /// Parse analyzer output locations into tokens
    Parse(ParseArgs),
    /// Print the analyzer version and the protocol it speaks
    Version {
        /// Analyzer command line
        #[arg(long, env = "JUMANPP_COMMAND", default_value = DEFAULT_COMMAND)]
        command: String,
    },
    /// Show configuration file locations and active defaults
    Config,
}

#[derive(Args)]
pub struct RunArgs {
    /// Sentence file, one sentence per line (stdin if not specified or "-")
    pub input: Option<PathBuf>,

    /// Analyzer command line, e.g. "jumanpp --beam 5"
    #[arg(long, env = "JUMANPP_COMMAND", default_value = DEFAULT_COMMAND)]
    pub command: String,

    /// Naming template for output locations; `{}` receives the location index
    #[arg(short = 'o', long, value_name = "TEMPLATE")]
    pub output_template: Option<String>,

    /// Number of analyzer processes (default: number of CPUs)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// How often the monitor checks on running analyzers (e.g. 500ms, 2s)
    #[arg(long, value_parser = humantime::parse_duration, default_value = "1s")]
    pub check_interval: Duration,

    /// How sentences are assigned to analyzer processes
    #[arg(long, value_enum, default_value_t = PartitionStrategy::Contiguous)]
    pub partition: PartitionStrategy,

    /// Analyzer protocol; auto runs `<command> -v` to decide
    #[arg(long, value_enum, default_value_t = ProtocolArg::Auto)]
    pub protocol: ProtocolArg,

    /// Input lines are `<id>\t<sentence>`; ids are echoed into the output
    #[arg(long)]
    pub with_ids: bool,

    /// Print batch statistics to stderr
    #[arg(short, long)]
    pub stats: bool,
}

#[derive(Args)]
pub struct ParseArgs {
    /// Output locations in order
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Token fields to print
    #[arg(long, value_delimiter = ',', default_value = "surface,pos")]
    pub fields: Vec<TokenField>,

    /// Keep only tokens with these parts of speech (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub pos: Vec<String>,

    /// Drop alternative-candidate tokens
    #[arg(long)]
    pub no_alternatives: bool,

    /// Protocol the locations were produced with
    #[arg(long, value_enum, default_value_t = ProtocolVersion::V1)]
    pub protocol: ProtocolVersion,

    /// Output format
    #[arg(short = 'F', long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}
