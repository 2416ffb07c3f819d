//! Centralized configuration for the SoundVault library.
//!
//! Configuration constants for scanning, searching and database tuning.
//! Extension-to-kind tables live in [`crate::classify`]; the seed tag
//! vocabulary lives in [`crate::index`].

/// Configuration for folder scanning.
pub struct ScanConfig;

impl ScanConfig {
    /// Emit a progress event every N processed files (plus the last one).
    pub const PROGRESS_INTERVAL: usize = 10;

    /// Directory names that are never descended into, regardless of depth.
    /// Hidden directories (leading '.') are excluded separately.
    pub const EXCLUDED_DIRS: &'static [&'static str] = &[
        "node_modules",
        "target",
        "__pycache__",
        "System Volume Information",
        "$RECYCLE.BIN",
    ];
}

/// Configuration for search queries.
pub struct SearchConfig;

impl SearchConfig {
    /// Page size when the query does not specify one.
    pub const DEFAULT_LIMIT: usize = 100;
}

/// Configuration for the SQLite store.
pub struct DbConfig;

impl DbConfig {
    /// How long a connection waits on a locked database before failing.
    pub const BUSY_TIMEOUT_MS: u32 = 30_000;
}
