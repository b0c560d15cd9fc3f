//! Streaming parser for analyzer output locations
//!
//! Reads the locations one line at a time and yields one parsed sentence per
//! sentinel-terminated block. Nothing beyond the current block is held in
//! memory.

use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::ProtocolVersion;
use crate::error::{BatchError, ParseErrorKind, Result};
use crate::parallel::is_sentinel;

use super::token::{split_fields, TokenRecord, TOKEN_LINE_FIELDS};

/// Prefix of an identifier comment line
pub const COMMENT_PREFIX: &str = "# ";

/// Identifier of a parsed sentence
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum SentenceId {
    /// Recovered from an echoed `# <id>` comment line
    External(String),
    /// Position of the block across all locations, 0-based
    Sequence(u64),
}

impl fmt::Display for SentenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SentenceId::External(id) => f.write_str(id),
            SentenceId::Sequence(n) => write!(f, "{}", n),
        }
    }
}

/// One sentence block with its retained tokens
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedSentence<T> {
    pub id: SentenceId,
    pub tokens: Vec<T>,
}

impl ParsedSentence<TokenRecord> {
    /// Primary segmentation, skipping alternative candidates
    pub fn primary(&self) -> impl Iterator<Item = &TokenRecord> {
        self.tokens.iter().filter(|t| !t.is_alternative)
    }

    /// Original sentence text rebuilt from the primary surfaces
    pub fn surface(&self) -> String {
        self.primary().map(|t| t.surface.as_str()).collect()
    }
}

/// Options controlling which tokens are retained
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Keep only tokens whose `pos` is in this set
    pub pos_filter: Option<HashSet<String>>,
    /// Keep alternative-candidate tokens (default: true)
    pub include_alternatives: bool,
    /// Whether a leading `# ` line may carry an identifier
    pub protocol: ProtocolVersion,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            pos_filter: None,
            include_alternatives: true,
            protocol: ProtocolVersion::V1,
        }
    }
}

impl ParseOptions {
    pub fn with_pos_filter<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pos_filter = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_alternatives(mut self, include: bool) -> Self {
        self.include_alternatives = include;
        self
    }

    pub fn with_protocol(mut self, protocol: ProtocolVersion) -> Self {
        self.protocol = protocol;
        self
    }

    fn retains(&self, token: &TokenRecord) -> bool {
        if token.is_alternative && !self.include_alternatives {
            return false;
        }
        match &self.pos_filter {
            Some(labels) => labels.contains(&token.pos),
            None => true,
        }
    }
}

/// Parse output locations into full token records.
pub fn parse_outputs<P: AsRef<Path>>(
    locations: &[P],
    options: ParseOptions,
) -> Sentences<TokenRecord, fn(TokenRecord) -> TokenRecord> {
    parse_outputs_with(
        locations,
        options,
        std::convert::identity as fn(TokenRecord) -> TokenRecord,
    )
}

/// Parse output locations, mapping each retained token through `project`.
pub fn parse_outputs_with<P, T, F>(
    locations: &[P],
    options: ParseOptions,
    project: F,
) -> Sentences<T, F>
where
    P: AsRef<Path>,
    F: FnMut(TokenRecord) -> T,
{
    Sentences {
        locations: locations.iter().map(|p| p.as_ref().to_path_buf()).collect(),
        next_location: 0,
        current: None,
        options,
        project,
        sequence: 0,
        line: String::new(),
        done: false,
        _marker: PhantomData,
    }
}

struct OpenLocation {
    path: PathBuf,
    reader: BufReader<File>,
    line_number: usize,
}

/// Lazy, single-pass iterator over parsed sentence blocks.
///
/// Stops after the first error.
pub struct Sentences<T, F> {
    locations: Vec<PathBuf>,
    next_location: usize,
    current: Option<OpenLocation>,
    options: ParseOptions,
    project: F,
    sequence: u64,
    line: String,
    done: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T, F> Sentences<T, F>
where
    F: FnMut(TokenRecord) -> T,
{
    /// Read the next line across location boundaries. Returns `false` at the
    /// end of the last location.
    fn read_line(&mut self) -> Result<bool> {
        loop {
            if let Some(location) = self.current.as_mut() {
                self.line.clear();
                if location.reader.read_line(&mut self.line)? > 0 {
                    location.line_number += 1;
                    return Ok(true);
                }
            }

            // The exhausted location stays current so errors can name it
            let Some(path) = self.locations.get(self.next_location).cloned() else {
                return Ok(false);
            };
            self.next_location += 1;
            let file = File::open(&path)?;
            self.current = Some(OpenLocation {
                path,
                reader: BufReader::new(file),
                line_number: 0,
            });
        }
    }

    fn parse_error(&self, kind: ParseErrorKind) -> BatchError {
        let (path, line_number) = match &self.current {
            Some(loc) => (loc.path.clone(), loc.line_number),
            None => (PathBuf::new(), 0),
        };
        BatchError::Parse {
            path,
            line_number,
            line: self.line.trim_end_matches(['\r', '\n']).to_string(),
            kind,
        }
    }

    fn is_identifier_comment(&self, line: &str) -> bool {
        if !self.options.protocol.echoes_comments() || !line.starts_with(COMMENT_PREFIX) {
            return false;
        }
        // A '#' token also starts with "# "; only a non-token line is a comment
        !matches!(split_fields(line), Ok(fields) if fields.len() == TOKEN_LINE_FIELDS)
    }

    fn next_sentence(&mut self) -> Result<Option<ParsedSentence<T>>> {
        let mut id: Option<String> = None;
        let mut tokens = Vec::new();
        let mut started = false;

        while self.read_line()? {
            let line = self.line.trim_end_matches(['\r', '\n']);

            if is_sentinel(line.as_bytes()) {
                let id = match id {
                    Some(external) => SentenceId::External(external),
                    None => SentenceId::Sequence(self.sequence),
                };
                self.sequence += 1;
                return Ok(Some(ParsedSentence { id, tokens }));
            }

            if !started && id.is_none() && self.is_identifier_comment(line) {
                id = Some(line[COMMENT_PREFIX.len()..].to_string());
                continue;
            }
            started = true;

            let token = TokenRecord::parse_line(line).map_err(|kind| self.parse_error(kind))?;
            if self.options.retains(&token) {
                tokens.push((self.project)(token));
            }
        }

        if started || id.is_some() {
            return Err(self.parse_error(ParseErrorKind::MissingSentinel));
        }
        Ok(None)
    }
}

impl<T, F> Iterator for Sentences<T, F>
where
    F: FnMut(TokenRecord) -> T,
{
    type Item = Result<ParsedSentence<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_sentence() {
            Ok(Some(sentence)) => Some(Ok(sentence)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl<T, F> std::iter::FusedIterator for Sentences<T, F> where F: FnMut(TokenRecord) -> T {}
