// fraglog - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// Unrecognised log lines are never errors; everything here is fatal to a run
// except `ConfigError`, which the config loader downgrades to warnings.

use crate::core::event::EventKind;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all fraglog operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum FraglogError {
    /// Reading or digesting the input log failed.
    Ingest(IngestError),

    /// Writing a report failed.
    Report(ReportError),

    /// Configuration loading or validation failed.
    Config(ConfigError),
}

impl fmt::Display for FraglogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ingest(e) => write!(f, "Ingestion error: {e}"),
            Self::Report(e) => write!(f, "Report error: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
        }
    }
}

impl std::error::Error for FraglogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Ingest(e) => Some(e),
            Self::Report(e) => Some(e),
            Self::Config(e) => Some(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Digest errors
// ---------------------------------------------------------------------------

/// A mutation step refused to apply an event to a match record.
///
/// No well-formed input produces one of these: the coordinator stops feeding a
/// record as soon as it is done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigestError {
    /// An event other than a game end reached a record that is already done.
    MatchClosed { event: EventKind },
}

impl fmt::Display for DigestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MatchClosed { event } => {
                write!(f, "{event} event applied to a match that has already ended")
            }
        }
    }
}

impl std::error::Error for DigestError {}

// ---------------------------------------------------------------------------
// Ingest errors
// ---------------------------------------------------------------------------

/// Errors raised while reading the log and digesting its matches.
#[derive(Debug)]
pub enum IngestError {
    /// The input log could not be opened.
    FileAccess { path: PathBuf, source: io::Error },

    /// Reading a line from the input failed part-way through.
    Read { line_number: u64, source: io::Error },

    /// Digesting a line group failed.
    Digest {
        group: usize,
        line_number: u64,
        source: DigestError,
    },

    /// The digestion worker pool could not be built.
    WorkerPool { reason: String },
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileAccess { path, source } => {
                write!(f, "cannot open log '{}': {source}", path.display())
            }
            Self::Read {
                line_number,
                source,
            } => write!(f, "read failed after line {line_number}: {source}"),
            Self::Digest {
                group,
                line_number,
                source,
            } => write!(
                f,
                "match group {group}, line {line_number}: digesting log: {source}"
            ),
            Self::WorkerPool { reason } => {
                write!(f, "cannot start digestion workers: {reason}")
            }
        }
    }
}

impl std::error::Error for IngestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::FileAccess { source, .. } => Some(source),
            Self::Read { source, .. } => Some(source),
            Self::Digest { source, .. } => Some(source),
            Self::WorkerPool { .. } => None,
        }
    }
}

impl From<IngestError> for FraglogError {
    fn from(e: IngestError) -> Self {
        Self::Ingest(e)
    }
}

// ---------------------------------------------------------------------------
// Report errors
// ---------------------------------------------------------------------------

/// Errors related to writing the JSON reports.
#[derive(Debug)]
pub enum ReportError {
    /// JSON serialisation error.
    Json(serde_json::Error),

    /// I/O error writing the report.
    Io(io::Error),
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(source) => write!(f, "marshalling json output: {source}"),
            Self::Io(source) => write!(f, "writing report: {source}"),
        }
    }
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(source) => Some(source),
            Self::Io(source) => Some(source),
        }
    }
}

impl From<ReportError> for FraglogError {
    fn from(e: ReportError) -> Self {
        Self::Report(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A config value is out of the allowed range.
    ValueOutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::ValueOutOfRange {
                field,
                value,
                expected,
            } => write!(
                f,
                "Config '{field}' = '{value}' is out of range. Expected: {expected}"
            ),
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for FraglogError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Convenience type alias for fraglog results.
pub type Result<T> = std::result::Result<T, FraglogError>;
