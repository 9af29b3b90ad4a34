// fraglog - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "fraglog";

/// Application identifier used for config directories.
pub const APP_ID: &str = "fraglog";

/// Current application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Input
// =============================================================================

/// Log file read when no path is given on the command line.
pub const DEFAULT_LOG_PATH: &str = "qgames.log";

// =============================================================================
// Ingestion limits
// =============================================================================

/// Default number of digestion worker threads.
/// 0 means auto-detect (one per available CPU core).
pub const DEFAULT_WORKER_THREADS: usize = 0;

/// Hard upper bound on digestion worker threads.
pub const ABSOLUTE_MAX_WORKER_THREADS: usize = 256;

/// Number of gathered line groups that may wait for a digestion task before
/// the reader thread blocks.
pub const DEFAULT_GROUP_QUEUE_CAPACITY: usize = 16;

/// Number of finished match batches that may wait for the collector before
/// digestion tasks block.
pub const DEFAULT_RESULT_QUEUE_CAPACITY: usize = 16;

/// Minimum capacity for either hand-off queue. A zero-capacity
/// `sync_channel` is a rendezvous, which is allowed by std but makes every
/// hand-off a context switch.
pub const MIN_QUEUE_CAPACITY: usize = 1;

/// Maximum capacity for either hand-off queue.
pub const ABSOLUTE_MAX_QUEUE_CAPACITY: usize = 4_096;

// =============================================================================
// Report
// =============================================================================

/// Indentation used for both JSON documents.
pub const REPORT_INDENT: &[u8] = b"    ";

/// `chrono` format string for the report header timestamp.
pub const REPORT_DATE_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Prefix of every per-match key in the report (`game_1`, `game_2`, ...).
pub const GAME_KEY_PREFIX: &str = "game_";

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Maximum length of a log line included in debug output.
pub const DEBUG_MAX_LINE_PREVIEW: usize = 200;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";
