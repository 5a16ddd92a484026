//! The two-table demo schema: `parent` rows owning `child` rows.
//!
//! A `Parent` owns its children outright; deleting a parent row cascades to
//! its children. The back-reference on `child.parent_id` is checked by the
//! backend once the foreign-key pragma is on (see
//! [`enable_foreign_keys`](crate::engine::enable_foreign_keys)).

use rusqlite::Connection;

use crate::core::Result;

const CREATE_ALL_SQL: &str = "\
CREATE TABLE IF NOT EXISTS parent (
    id INTEGER PRIMARY KEY
);
CREATE TABLE IF NOT EXISTS child (
    id INTEGER PRIMARY KEY,
    parent_id INTEGER REFERENCES parent(id) ON DELETE CASCADE
);";

const DROP_ALL_SQL: &str = "\
DROP TABLE IF EXISTS child;
DROP TABLE IF EXISTS parent;";

/// A parent record and the children it owns.
///
/// Identities are surrogate keys assigned by the store at insert; a freshly
/// constructed entity carries `id: None` until it comes back from a query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parent {
    pub id: Option<i64>,
    pub children: Vec<Child>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Child {
    pub id: Option<i64>,
    /// The owning parent, or none for a detached child.
    pub parent_id: Option<i64>,
}

impl Parent {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh parent owning `count` fresh children.
    pub fn with_children(count: usize) -> Self {
        Self {
            id: None,
            children: (0..count).map(|_| Child::new()).collect(),
        }
    }
}

impl Child {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Create both tables. Safe to run on an already-initialized database.
pub fn create_all(conn: &Connection) -> Result<()> {
    conn.execute_batch(CREATE_ALL_SQL)?;
    Ok(())
}

/// Drop both tables, children first. Safe to run on an empty database.
pub fn drop_all(conn: &Connection) -> Result<()> {
    conn.execute_batch(DROP_ALL_SQL)?;
    Ok(())
}
