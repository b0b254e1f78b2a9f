//! Error types shared by the Cadence crates

use thiserror::Error;

/// Errors raised while building hook configuration.
///
/// These are caller mistakes and surface at setup time.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Debounce and throttle were both requested for the same tracker
    #[error(
        "debounce ({debounce_ms}ms) and throttle ({throttle_ms}ms) are mutually exclusive"
    )]
    ConflictingPolicy { debounce_ms: u64, throttle_ms: u64 },

    /// Configuration file could not be parsed
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Configuration file could not be read
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reported by a key-value store.
///
/// These never escape into a render path: consumers record them and keep
/// their previous in-memory state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Writing the value would exceed the store's capacity
    #[error("storage quota of {limit} bytes exceeded while writing `{key}`")]
    QuotaExceeded { key: String, limit: usize },

    /// The backing store is not reachable, e.g. browser storage disabled by
    /// privacy settings or a remote store that is offline
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A stored value could not be decoded
    #[error("failed to decode `{key}`: {message}")]
    Decode { key: String, message: String },

    /// A value could not be encoded for storage
    #[error("failed to encode `{key}`: {message}")]
    Encode { key: String, message: String },
}

/// Result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;
