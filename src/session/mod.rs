//! Transactional unit-of-work over one physical connection.
//!
//! [`UnitOfWork`] is the blocking layer: a connection with an open
//! transaction and a strict lifecycle (`Open` → `Committed` or
//! `RolledBack` → `Closed`). [`Session`] is its async facade; every
//! operation moves the unit-of-work onto a blocking worker through the
//! [`Bridge`] and back. [`with_session`] is the scope most callers want:
//! commit on success, rollback on failure, close always.

use futures::future::BoxFuture;
use log::{debug, warn};
use rusqlite::{Connection, params};

use crate::bridge::Bridge;
use crate::core::{DbError, Result};
use crate::engine::Engine;
use crate::schema::{Child, Parent};

/// Lifecycle of a unit-of-work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transaction open; records can be added and queried.
    Open,
    /// Pending changes are durable. No further operations except close.
    Committed,
    /// Pending changes are discarded. No further operations except close.
    RolledBack,
    /// Connection released. Terminal.
    Closed,
}

fn closed() -> DbError {
    DbError::Session("session is closed".into())
}

fn no_transaction() -> DbError {
    DbError::Session("no active transaction".into())
}

/// One transactional scope against the store, exclusively owned by its
/// opener. Blocking; async code drives it through [`Session`].
///
/// The pending object graph belongs to this unit-of-work until `commit`
/// makes it durable or `rollback`/drop discards it.
pub struct UnitOfWork {
    conn: Option<Connection>,
    state: SessionState,
}

impl UnitOfWork {
    /// Open a connection from the engine and begin a transaction.
    pub fn open(engine: &Engine) -> Result<Self> {
        let conn = engine.connect()?;
        conn.execute_batch("BEGIN DEFERRED")?;
        Ok(Self {
            conn: Some(conn),
            state: SessionState::Open,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn tx_conn(&self) -> Result<&Connection> {
        match self.state {
            SessionState::Open => self.conn.as_ref().ok_or_else(closed),
            SessionState::Committed | SessionState::RolledBack => Err(no_transaction()),
            SessionState::Closed => Err(closed()),
        }
    }

    /// Insert the given parents and the children they own.
    ///
    /// Every inserted row gets a fresh store-assigned identity; each
    /// child's back-reference is set to its owning parent's new id. Changes
    /// stay pending until [`commit`](Self::commit).
    pub fn add_all(&mut self, parents: &[Parent]) -> Result<()> {
        let conn = self.tx_conn()?;
        let mut insert_parent = conn.prepare_cached("INSERT INTO parent DEFAULT VALUES")?;
        let mut insert_child = conn.prepare_cached("INSERT INTO child (parent_id) VALUES (?1)")?;

        for parent in parents {
            insert_parent.execute([])?;
            let parent_id = conn.last_insert_rowid();
            for _child in &parent.children {
                insert_child.execute(params![parent_id])?;
            }
        }
        Ok(())
    }

    /// All parents, identities only. Children are not loaded.
    pub fn parents(&self) -> Result<Vec<Parent>> {
        let conn = self.tx_conn()?;
        let mut stmt = conn.prepare_cached("SELECT id FROM parent ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Parent {
                id: Some(row.get(0)?),
                children: Vec::new(),
            })
        })?;

        let mut parents = Vec::new();
        for parent in rows {
            parents.push(parent?);
        }
        Ok(parents)
    }

    /// All parents with their children eagerly loaded in one join.
    pub fn parents_with_children(&self) -> Result<Vec<Parent>> {
        let conn = self.tx_conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT p.id, c.id, c.parent_id \
             FROM parent p LEFT JOIN child c ON c.parent_id = p.id \
             ORDER BY p.id, c.id",
        )?;

        let mut parents: Vec<Parent> = Vec::new();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let parent_id: i64 = row.get(0)?;
            if parents.last().map(|p| p.id) != Some(Some(parent_id)) {
                parents.push(Parent {
                    id: Some(parent_id),
                    children: Vec::new(),
                });
            }
            let child_id: Option<i64> = row.get(1)?;
            if let (Some(parent), Some(child_id)) = (parents.last_mut(), child_id) {
                parent.children.push(Child {
                    id: Some(child_id),
                    parent_id: row.get(2)?,
                });
            }
        }
        Ok(parents)
    }

    /// Make the pending changes durable.
    pub fn commit(&mut self) -> Result<()> {
        let conn = self.tx_conn()?;
        conn.execute_batch("COMMIT")?;
        self.state = SessionState::Committed;
        debug!("unit of work committed");
        Ok(())
    }

    /// Discard the pending changes.
    pub fn rollback(&mut self) -> Result<()> {
        let conn = self.tx_conn()?;
        conn.execute_batch("ROLLBACK")?;
        self.state = SessionState::RolledBack;
        debug!("unit of work rolled back");
        Ok(())
    }

    /// Release the connection. A still-open transaction is rolled back
    /// first. Closing twice is an error.
    pub fn close(&mut self) -> Result<()> {
        let conn = self.conn.take().ok_or_else(closed)?;
        if self.state == SessionState::Open {
            let _ = conn.execute_batch("ROLLBACK");
        }
        self.state = SessionState::Closed;
        conn.close().map_err(|(_, err)| DbError::from(err))
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        if self.state == SessionState::Open {
            if let Some(conn) = &self.conn {
                let _ = conn.execute_batch("ROLLBACK");
            }
        }
    }
}

/// Async facade over a [`UnitOfWork`].
///
/// Each operation hands the unit-of-work to a blocking worker through the
/// bridge and takes it back when the worker finishes, so the event loop
/// never waits on the store. A session belongs to the task that opened it;
/// the `&mut self` surface keeps it out of concurrent use.
///
/// If a worker fails mid-call the unit-of-work is lost with it (its drop
/// guard rolls the transaction back on the worker); the session then
/// reports itself closed.
pub struct Session {
    bridge: Bridge,
    uow: Option<UnitOfWork>,
}

impl Session {
    /// Open a unit-of-work against the engine, off the event loop.
    pub async fn open(bridge: &Bridge, engine: &Engine) -> Result<Self> {
        let engine = engine.clone();
        let uow = bridge.dispatch(move || UnitOfWork::open(&engine)).await?;
        Ok(Self {
            bridge: bridge.clone(),
            uow: Some(uow),
        })
    }

    pub fn state(&self) -> SessionState {
        self.uow
            .as_ref()
            .map_or(SessionState::Closed, UnitOfWork::state)
    }

    async fn run<T, F>(&mut self, job: F) -> Result<T>
    where
        F: FnOnce(&mut UnitOfWork) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let mut uow = self.uow.take().ok_or_else(closed)?;
        let (uow, outcome) = self
            .bridge
            .dispatch(move || {
                let outcome = job(&mut uow);
                Ok((uow, outcome))
            })
            .await?;
        self.uow = Some(uow);
        outcome
    }

    /// Bridged [`UnitOfWork::add_all`].
    pub async fn add_all(&mut self, parents: Vec<Parent>) -> Result<()> {
        self.run(move |uow| uow.add_all(&parents)).await
    }

    /// Bridged [`UnitOfWork::parents`].
    pub async fn parents(&mut self) -> Result<Vec<Parent>> {
        self.run(|uow| uow.parents()).await
    }

    /// Bridged [`UnitOfWork::parents_with_children`].
    pub async fn parents_with_children(&mut self) -> Result<Vec<Parent>> {
        self.run(|uow| uow.parents_with_children()).await
    }

    /// Bridged [`UnitOfWork::commit`].
    pub async fn commit(&mut self) -> Result<()> {
        self.run(UnitOfWork::commit).await
    }

    /// Bridged [`UnitOfWork::rollback`].
    pub async fn rollback(&mut self) -> Result<()> {
        self.run(UnitOfWork::rollback).await
    }

    /// Bridged [`UnitOfWork::close`].
    pub async fn close(&mut self) -> Result<()> {
        self.run(UnitOfWork::close).await
    }
}

/// Run `body` inside a session scope: open, run, then commit on success or
/// roll back on failure, and close in every case, all off the event loop.
///
/// The body's error is re-raised after rollback. A commit failure is
/// treated like a body failure: rollback is attempted and the commit error
/// propagates. Close always runs last; its error surfaces only when the
/// scope was otherwise clean.
///
/// # Examples
///
/// ```no_run
/// use sqlbridge::{Bridge, Engine, EngineConfig, Parent, with_session};
///
/// # #[tokio::main]
/// # async fn main() -> sqlbridge::Result<()> {
/// let engine = Engine::new(EngineConfig::from_url("sqlite://sa.db")?);
/// let bridge = Bridge::current();
///
/// with_session(&bridge, &engine, |session| {
///     Box::pin(async move {
///         session.add_all(vec![Parent::with_children(10)]).await
///     })
/// })
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn with_session<T, F>(bridge: &Bridge, engine: &Engine, body: F) -> Result<T>
where
    F: for<'s> FnOnce(&'s mut Session) -> BoxFuture<'s, Result<T>>,
{
    let mut session = Session::open(bridge, engine).await?;

    let outcome = match body(&mut session).await {
        Ok(value) => session.commit().await.map(|()| value),
        Err(err) => Err(err),
    };
    let outcome = match outcome {
        Ok(value) => Ok(value),
        Err(err) => {
            if let Err(rollback_err) = session.rollback().await {
                warn!("rollback after failed session scope also failed: {rollback_err}");
            }
            Err(err)
        }
    };

    match (outcome, session.close().await) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(close_err)) => Err(close_err),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(close_err)) => {
            warn!("close after failed session scope also failed: {close_err}");
            Err(err)
        }
    }
}
