//! Database configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for opening a database.
///
/// Backend selection happens once, at [`crate::Database::open`]: the
/// relational backend is used only when [`Config::relational`] is set
/// *and* the connection attempt succeeds; in every other case the
/// embedded file store under [`Config::data_dir`] serves the process.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the embedded backend's table documents.
    pub data_dir: PathBuf,

    /// Whether to create the data directory if it doesn't exist.
    pub create_if_missing: bool,

    /// Relational backend settings; `None` pins the embedded backend.
    pub relational: Option<RelationalConfig>,
}

impl Config {
    /// Creates a configuration with default values over a data
    /// directory.
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            create_if_missing: true,
            relational: None,
        }
    }

    /// Sets whether to create the data directory if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Enables the relational backend.
    #[must_use]
    pub fn relational(mut self, relational: RelationalConfig) -> Self {
        self.relational = Some(relational);
        self
    }
}

/// Connection settings for the relational (SQLite) backend.
#[derive(Debug, Clone)]
pub struct RelationalConfig {
    /// Path of the SQLite database file.
    pub path: PathBuf,

    /// Bound on how long a connection attempt may block before the
    /// selection fails fast.
    pub connect_timeout: Duration,
}

impl RelationalConfig {
    /// Creates relational settings with the default connect timeout.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            connect_timeout: Duration::from_secs(5),
        }
    }

    /// Sets the connect timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}
