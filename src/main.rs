use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{debug, info};
use serde_json::{Map, Value};

mod cli;
mod config_file;

use cli::{Cli, Commands, OutputFormat, ParseArgs, ProtocolArg, RunArgs};
use config_file::ConfigFile;
use jumanpp_batch::{
    parse_outputs_with, probe_version, run_batch, BatchConfig, BatchError, ParseOptions,
    ProtocolVersion, TokenField, TokenRecord,
};

fn main() {
    let cli = match process_args_with_config() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("jumanpp-batch: Config error: {:#}", e);
            std::process::exit(1);
        }
    };
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run(args) => run_command(args),
        Commands::Parse(args) => parse_command(args),
        Commands::Version { command } => version_command(&command),
        Commands::Config => {
            ConfigFile::show_config();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("jumanpp-batch: {}: {:#}", error_prefix(&e), e);
        std::process::exit(1);
    }
}

/// Analyzer failures are reported apart from usage and I/O errors
fn error_prefix(err: &anyhow::Error) -> &'static str {
    match err.downcast_ref::<BatchError>() {
        Some(batch_err) if batch_err.is_worker_error() => "Analyzer error",
        _ => "Error",
    }
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8) {
    let log_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

/// Extract --config-file argument from raw args
fn extract_config_file_arg(args: &[String]) -> Option<PathBuf> {
    args.iter().enumerate().find_map(|(i, arg)| {
        if arg == "--config-file" {
            args.get(i + 1).map(PathBuf::from)
        } else {
            arg.strip_prefix("--config-file=").map(PathBuf::from)
        }
    })
}

/// Apply configuration file defaults, then parse the command line
fn process_args_with_config() -> Result<Cli> {
    let raw_args: Vec<String> = std::env::args().collect();

    let processed_args = if raw_args.iter().any(|arg| arg == "--ignore-config") {
        raw_args
    } else {
        let config_file_path = extract_config_file_arg(&raw_args);
        let config_file = ConfigFile::load_with_custom_path(config_file_path.as_deref())?;
        config_file.process_args(raw_args)?
    };

    Ok(Cli::parse_from(processed_args))
}

/// Read one sentence per line; with ids each line is `<id>\t<sentence>`
fn read_input(path: Option<&Path>, with_ids: bool) -> Result<(Vec<String>, Option<Vec<String>>)> {
    let reader: Box<dyn BufRead> = match path {
        Some(p) if p != Path::new("-") => Box::new(BufReader::new(
            File::open(p).with_context(|| format!("Failed to open input file: {}", p.display()))?,
        )),
        _ => Box::new(BufReader::new(io::stdin())),
    };

    let mut sentences = Vec::new();
    let mut ids = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read input")?;
        let line = line.trim_end_matches('\r');
        if with_ids {
            let Some((id, sentence)) = line.split_once('\t') else {
                bail!("line {}: expected '<id>\\t<sentence>'", index + 1);
            };
            ids.push(id.to_string());
            sentences.push(sentence.to_string());
        } else {
            sentences.push(line.to_string());
        }
    }

    Ok((sentences, with_ids.then_some(ids)))
}

fn resolve_protocol(protocol: ProtocolArg, command: &str) -> Result<ProtocolVersion> {
    Ok(match protocol {
        ProtocolArg::V1 => ProtocolVersion::V1,
        ProtocolArg::V2 => ProtocolVersion::V2,
        ProtocolArg::Auto => {
            let version = probe_version(command)
                .with_context(|| format!("Failed to detect the version of '{}'", command))?;
            info!(
                "detected Juman++ {} ({:?} protocol)",
                version.version,
                version.protocol()
            );
            version.protocol()
        }
    })
}

fn run_command(args: RunArgs) -> Result<()> {
    let (sentences, ids) = read_input(args.input.as_deref(), args.with_ids)?;
    debug!("read {} sentences", sentences.len());

    let protocol = resolve_protocol(args.protocol, &args.command)?;

    let mut config = BatchConfig::default();
    config.command = args.command;
    if let Some(template) = args.output_template {
        config.output_template = template;
    }
    let config = config
        .with_workers(args.workers.unwrap_or(0))
        .with_check_interval(args.check_interval)
        .with_partition(args.partition)
        .with_protocol(protocol);

    let output = run_batch(&sentences, ids.as_deref(), &config)?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for location in &output.locations {
        writeln!(out, "{}", location.display())?;
    }
    out.flush()?;

    if args.stats {
        eprintln!("{}", output.stats.summary());
    }
    Ok(())
}

fn token_object(token: &TokenRecord, fields: &[TokenField]) -> Map<String, Value> {
    fields
        .iter()
        .map(|field| {
            let value = match field {
                TokenField::IsAlternative => Value::Bool(token.is_alternative),
                other => Value::String(token.field(*other)),
            };
            (field.name().to_string(), value)
        })
        .collect()
}

fn parse_command(args: ParseArgs) -> Result<()> {
    let mut options = ParseOptions::default()
        .with_alternatives(!args.no_alternatives)
        .with_protocol(args.protocol);
    if !args.pos.is_empty() {
        options = options.with_pos_filter(args.pos.iter().cloned());
    }

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let fields = args.fields;

    match args.format {
        OutputFormat::Jsonl => {
            let project = |token: TokenRecord| token_object(&token, &fields);
            for sentence in parse_outputs_with(&args.files, options, project) {
                let sentence = sentence?;
                serde_json::to_writer(&mut out, &sentence)?;
                writeln!(out)?;
            }
        }
        OutputFormat::Text => {
            let project = |token: TokenRecord| {
                fields
                    .iter()
                    .map(|f| token.field(*f))
                    .collect::<Vec<_>>()
                    .join("/")
            };
            for sentence in parse_outputs_with(&args.files, options, project) {
                let sentence = sentence?;
                writeln!(out, "{}\t{}", sentence.id, sentence.tokens.join(" "))?;
            }
        }
    }

    out.flush()?;
    Ok(())
}

fn version_command(command: &str) -> Result<()> {
    let version = probe_version(command)?;
    let protocol = match version.protocol() {
        ProtocolVersion::V1 => "v1",
        ProtocolVersion::V2 => "v2",
    };
    println!("Juman++ {} (protocol {})", version.version, protocol);
    Ok(())
}
