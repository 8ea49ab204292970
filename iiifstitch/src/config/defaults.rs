//! Default values for download and output settings.

/// Number of concurrent tile workers.
pub const DEFAULT_WORKERS: usize = 8;

/// Maximum attempts per tile, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Timeout for a single tile request attempt, in seconds.
pub const DEFAULT_ATTEMPT_TIMEOUT_SECS: u64 = 30;

/// Initial backoff after a failed attempt, in milliseconds.
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 500;

/// Upper bound for backoff delays, in seconds.
pub const DEFAULT_MAX_BACKOFF_SECS: u64 = 30;

/// Upper bound for an honoured `Retry-After` hint, in seconds.
pub const DEFAULT_MAX_RETRY_AFTER_SECS: u64 = 180;

/// Pause before each tile request, in milliseconds.
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 0;

/// Tile edge used when the service advertises none.
pub const DEFAULT_TILE_EDGE: u32 = 256;

/// JPEG quality for the assembled output.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Directory the CLI writes assembled images into.
pub const DEFAULT_OUTPUT_DIR: &str = "output";
