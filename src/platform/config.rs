// fraglog - platform/config.rs
//
// Config directory resolution and config.toml loading with startup
// validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::util::constants;
use crate::util::error::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Resolved platform paths for fraglog configuration.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/fraglog/ or %APPDATA%\fraglog\config\)
    pub config_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to the current directory if platform dirs cannot be determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            tracing::debug!(config = %config_dir.display(), "Platform paths resolved");
            Self { config_dir }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            Self {
                config_dir: PathBuf::from("."),
            }
        }
    }

    /// Default location of config.toml.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(constants::CONFIG_FILE_NAME)
    }
}

// =============================================================================
// config.toml loading and validation
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored for forward compatibility.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[ingest]` section.
    pub ingest: IngestSection,
    /// `[logging]` section.
    pub logging: LoggingSection,
}

/// `[ingest]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct IngestSection {
    /// Number of digestion worker threads (0 = auto).
    pub worker_threads: Option<usize>,
    /// Line groups buffered between the reader and the workers.
    pub group_queue_capacity: Option<usize>,
    /// Finished matches buffered between the workers and the collector.
    pub result_queue_capacity: Option<usize>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
}

/// Validated application configuration derived from `config.toml`.
///
/// Invalid values are reported and replaced by their defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub worker_threads: usize,
    pub group_queue_capacity: usize,
    pub result_queue_capacity: usize,
    /// Logging level string (for init before tracing is available).
    pub log_level: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            worker_threads: constants::DEFAULT_WORKER_THREADS,
            group_queue_capacity: constants::DEFAULT_GROUP_QUEUE_CAPACITY,
            result_queue_capacity: constants::DEFAULT_RESULT_QUEUE_CAPACITY,
            log_level: None,
        }
    }
}

/// Load and validate the config file at `config_path`.
///
/// Returns the validated config and every problem found. A missing file is
/// not a problem (first run). An unreadable or unparseable file yields
/// defaults plus one error; out-of-range values fall back individually.
///
/// Runs before logging is initialised, so problems are returned rather than
/// logged.
pub fn load_config(config_path: &Path) -> (AppConfig, Vec<ConfigError>) {
    let mut problems: Vec<ConfigError> = Vec::new();

    if !config_path.exists() {
        return (AppConfig::default(), problems);
    }

    let content = match std::fs::read_to_string(config_path) {
        Ok(c) => c,
        Err(source) => {
            problems.push(ConfigError::Io {
                path: config_path.to_path_buf(),
                source,
            });
            return (AppConfig::default(), problems);
        }
    };

    let raw: RawConfig = match toml::from_str(&content) {
        Ok(r) => r,
        Err(source) => {
            problems.push(ConfigError::TomlParse {
                path: config_path.to_path_buf(),
                source,
            });
            return (AppConfig::default(), problems);
        }
    };

    let mut config = AppConfig::default();

    // -- Ingest: worker_threads --
    if let Some(workers) = raw.ingest.worker_threads {
        if workers <= constants::ABSOLUTE_MAX_WORKER_THREADS {
            config.worker_threads = workers;
        } else {
            problems.push(out_of_range(
                "ingest.worker_threads",
                workers,
                format!("0-{} (0 = one per CPU)", constants::ABSOLUTE_MAX_WORKER_THREADS),
            ));
        }
    }

    // -- Ingest: queue capacities --
    let queue_range = constants::MIN_QUEUE_CAPACITY..=constants::ABSOLUTE_MAX_QUEUE_CAPACITY;
    let queue_expected = format!(
        "{}-{}",
        constants::MIN_QUEUE_CAPACITY,
        constants::ABSOLUTE_MAX_QUEUE_CAPACITY
    );
    for (field, value, slot) in [
        (
            "ingest.group_queue_capacity",
            raw.ingest.group_queue_capacity,
            &mut config.group_queue_capacity,
        ),
        (
            "ingest.result_queue_capacity",
            raw.ingest.result_queue_capacity,
            &mut config.result_queue_capacity,
        ),
    ] {
        if let Some(capacity) = value {
            if queue_range.contains(&capacity) {
                *slot = capacity;
            } else {
                problems.push(out_of_range(field, capacity, queue_expected.clone()));
            }
        }
    }

    // -- Logging: level --
    if let Some(ref level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level.to_lowercase());
        } else {
            problems.push(out_of_range(
                "logging.level",
                level,
                valid.join(", "),
            ));
        }
    }

    (config, problems)
}

fn out_of_range(field: &str, value: impl ToString, expected: String) -> ConfigError {
    ConfigError::ValueOutOfRange {
        field: field.to_string(),
        value: value.to_string(),
        expected,
    }
}
