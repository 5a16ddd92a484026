//! Process-wide storage handle.
//!
//! One [`Engine`] is constructed at startup from an [`EngineConfig`] and
//! passed (cloned) into every component that opens connections. Each
//! physical connection it hands out has the configured busy timeout applied
//! and every registered connect hook run before anyone uses it.

pub mod config;

use std::sync::{Arc, RwLock};

use log::debug;
use rusqlite::Connection;

pub use config::{EngineConfig, Location};

use crate::core::Result;

type ConnectHook = dyn Fn(&Connection) -> Result<()> + Send + Sync;

struct EngineInner {
    config: EngineConfig,
    hooks: RwLock<Vec<Box<ConnectHook>>>,
}

/// Shared factory for physical connections to one configured database.
///
/// Cloning is cheap; clones share the configuration and the connect hooks.
/// `connect` is a blocking call and belongs on a worker; async callers
/// reach it through [`Bridge::dispatch`](crate::Bridge::dispatch).
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                config,
                hooks: RwLock::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Register a hook run on every new physical connection, in
    /// registration order. A hook error fails the connect.
    ///
    /// This is where backend pragmas go; see [`enable_foreign_keys`].
    pub fn on_connect<F>(&self, hook: F) -> Result<()>
    where
        F: Fn(&Connection) -> Result<()> + Send + Sync + 'static,
    {
        self.inner.hooks.write()?.push(Box::new(hook));
        Ok(())
    }

    /// Open a new physical connection: open, apply the busy timeout, run
    /// the connect hooks. Blocking.
    pub fn connect(&self) -> Result<Connection> {
        let conn = match &self.inner.config.location {
            Location::File(path) => Connection::open(path)?,
            Location::Memory => Connection::open_in_memory()?,
        };
        conn.busy_timeout(self.inner.config.busy_timeout)?;

        let hooks = self.inner.hooks.read()?;
        for hook in hooks.iter() {
            hook(&conn)?;
        }

        debug!(
            "opened connection to {:?} ({} connect hooks applied)",
            self.inner.config.location,
            hooks.len()
        );
        Ok(conn)
    }
}

/// Connect hook enforcing referential integrity between linked tables.
///
/// SQLite leaves foreign-key checking off per connection; register this on
/// the engine so every session gets it.
pub fn enable_foreign_keys(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys=ON")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_connect_runs_hooks_per_connection() {
        let engine = Engine::new(EngineConfig::memory());
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        engine
            .on_connect(move |_conn| {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();

        engine.connect().unwrap();
        engine.connect().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_foreign_keys_pragma_is_set() {
        let engine = Engine::new(EngineConfig::memory());
        engine.on_connect(enable_foreign_keys).unwrap();

        let conn = engine.connect().unwrap();
        let enabled: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[test]
    fn test_hook_error_fails_connect() {
        let engine = Engine::new(EngineConfig::memory());
        engine
            .on_connect(|conn| {
                conn.execute_batch("PRAGMA not_a_real_pragma_statement(")?;
                Ok(())
            })
            .unwrap();

        assert!(engine.connect().is_err());
    }

    #[test]
    fn test_clones_share_hooks() {
        let engine = Engine::new(EngineConfig::memory());
        let clone = engine.clone();
        clone.on_connect(enable_foreign_keys).unwrap();

        let conn = engine.connect().unwrap();
        let enabled: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }
}
