use std::path::PathBuf;
use std::time::Duration;

use crate::core::{DbError, Result};

const URL_SCHEME: &str = "sqlite:";
const MEMORY_TOKEN: &str = ":memory:";

/// Where the backing database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    File(PathBuf),
    /// Private in-memory database. Every physical connection gets its own;
    /// use a file location when several sessions must see the same data.
    Memory,
}

/// Storage configuration, parsed once at startup and shared by every
/// session through the [`Engine`].
///
/// [`Engine`]: crate::engine::Engine
///
/// # Examples
///
/// ```
/// use sqlbridge::EngineConfig;
///
/// let config = EngineConfig::from_url("sqlite://sa.db").unwrap();
/// let in_memory = EngineConfig::from_url("sqlite::memory:").unwrap();
/// # let _ = (config, in_memory);
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub location: Location,
    /// How long a connection waits on a locked database before giving up.
    pub busy_timeout: Duration,
}

impl EngineConfig {
    /// Configuration for a file-backed database.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            location: Location::File(path.into()),
            busy_timeout: Duration::from_secs(5),
        }
    }

    /// Configuration for a private in-memory database.
    pub fn memory() -> Self {
        Self {
            location: Location::Memory,
            busy_timeout: Duration::from_secs(5),
        }
    }

    /// Set the busy timeout applied to every new connection.
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Parse a connection string.
    ///
    /// Formats: `sqlite://<path>` for a file-backed database,
    /// `sqlite::memory:` for an in-memory one.
    pub fn from_url(url: &str) -> Result<Self> {
        let rest = url
            .strip_prefix(URL_SCHEME)
            .ok_or_else(|| DbError::InvalidUrl(format!("expected sqlite:// url, got '{url}'")))?;

        if rest == MEMORY_TOKEN {
            return Ok(Self::memory());
        }

        let path = rest
            .strip_prefix("//")
            .ok_or_else(|| DbError::InvalidUrl(format!("expected sqlite:// url, got '{url}'")))?;

        if path.is_empty() {
            return Err(DbError::InvalidUrl("database path is empty".into()));
        }

        Ok(Self::file(path))
    }
}
