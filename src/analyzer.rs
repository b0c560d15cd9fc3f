//! Analyzer version detection

use std::process::{Command, Stdio};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::ProtocolVersion;
use crate::error::{BatchError, Result};

const VERSION_BANNER: &str = "juman++";

static VERSION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9][.0-9]+").expect("failed to compile version regex"));

/// Version reported by `<analyzer> -v`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerVersion {
    pub version: String,
}

impl AnalyzerVersion {
    /// Parse the analyzer's version banner, e.g. `Juman++ Version: 1.02`
    pub fn from_banner(banner: &str) -> Option<Self> {
        if !banner.trim_start().to_lowercase().starts_with(VERSION_BANNER) {
            return None;
        }
        VERSION_REGEX.find(banner).map(|m| Self {
            version: m.as_str().to_string(),
        })
    }

    pub fn major(&self) -> Option<u32> {
        self.version.split('.').next()?.parse().ok()
    }

    /// Version 1 echoes identifier comments; later versions do not
    pub fn protocol(&self) -> ProtocolVersion {
        match self.major() {
            Some(1) => ProtocolVersion::V1,
            _ => ProtocolVersion::V2,
        }
    }
}

/// Run `<command> -v` and detect the analyzer version.
pub fn probe_version(command: &str) -> Result<AnalyzerVersion> {
    let args = shell_words::split(command)
        .map_err(|e| BatchError::Config(format!("cannot parse command '{}': {}", command, e)))?;
    let (program, rest) = args
        .split_first()
        .ok_or_else(|| BatchError::Config("analyzer command is empty".to_string()))?;

    let output = Command::new(program)
        .args(rest)
        .arg("-v")
        .stdin(Stdio::null())
        .output()
        .map_err(|source| BatchError::Invocation {
            command: program.clone(),
            source,
        })?;

    let banner = String::from_utf8_lossy(&output.stdout);
    AnalyzerVersion::from_banner(&banner).ok_or_else(|| {
        BatchError::Config(format!(
            "'{}' does not look like Juman++ (version output: {:?})",
            command,
            banner.trim()
        ))
    })
}
