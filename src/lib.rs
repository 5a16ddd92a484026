//! Run a blocking SQLite unit-of-work from async code without stalling the
//! event loop.
//!
//! The storage engine itself is SQLite through `rusqlite`; this crate only
//! adds the plumbing around it:
//!
//! - [`Bridge`]: submits a blocking closure to the runtime's worker pool
//!   and resumes the awaiting task with its result or error.
//! - [`Engine`]: the process-wide connection factory, holding one
//!   configuration and the connect hooks (pragmas) applied to every
//!   physical connection.
//! - [`Session`] / [`with_session`]: a transactional scope driven through
//!   the bridge, committing on success, rolling back on failure, closing
//!   always.
//! - [`schema`]: the two-table Parent/Child demo model with idempotent
//!   `create_all` / `drop_all`.
//!
//! # Examples
//!
//! ```no_run
//! use sqlbridge::{Bridge, Engine, EngineConfig, Parent, engine, schema, with_session};
//!
//! #[tokio::main]
//! async fn main() -> sqlbridge::Result<()> {
//!     let db = Engine::new(EngineConfig::from_url("sqlite://sa.db")?);
//!     db.on_connect(engine::enable_foreign_keys)?;
//!     let bridge = Bridge::current();
//!
//!     // Reset the schema, off the event loop.
//!     let setup = db.clone();
//!     bridge
//!         .dispatch(move || {
//!             let conn = setup.connect()?;
//!             schema::drop_all(&conn)?;
//!             schema::create_all(&conn)
//!         })
//!         .await?;
//!
//!     // Seed inside one commit-or-rollback scope.
//!     with_session(&bridge, &db, |session| {
//!         Box::pin(async move {
//!             session.add_all(vec![Parent::with_children(100)]).await
//!         })
//!     })
//!     .await?;
//!
//!     // Read back in another scope.
//!     let parents = with_session(&bridge, &db, |session| {
//!         Box::pin(async move { session.parents().await })
//!     })
//!     .await?;
//!     println!("{} parents", parents.len());
//!     Ok(())
//! }
//! ```

// ============================================================================
// sqlbridge Library
// ============================================================================

pub mod bridge;
pub mod core;
pub mod engine;
pub mod schema;
pub mod session;

// Re-export main types for convenience
pub use crate::bridge::Bridge;
pub use crate::core::{DbError, Result};
pub use crate::engine::{Engine, EngineConfig, Location};
pub use crate::schema::{Child, Parent, create_all, drop_all};
pub use crate::session::{Session, SessionState, UnitOfWork, with_session};
