//! [`SqliteStore`] — the SQLite implementation of [`IdentityStore`].

use std::path::Path;

use rusqlite::{Connection, TransactionBehavior};
use tracing::{debug, warn};

use roster_core::store::{IdentityStore, UnitOfWork};

use crate::{Result, error::SqlResultExt as _, repo::SqliteUnitOfWork, schema::SCHEMA};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Roster identity store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. All units
/// of work run on the connection's dedicated thread, one at a time.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

/// Run `work` inside one IMMEDIATE transaction on `conn`.
///
/// Commits when `work` succeeds. On failure the transaction is rolled back
/// and the original error returned.
fn run_unit_of_work<T, F>(conn: &mut Connection, work: F) -> roster_core::Result<T>
where
  F: FnOnce(&dyn UnitOfWork) -> roster_core::Result<T>,
{
  let tx = conn
    .transaction_with_behavior(TransactionBehavior::Immediate)
    .db()?;

  let outcome = {
    let uow = SqliteUnitOfWork::new(&tx);
    work(&uow)
  };

  match outcome {
    Ok(value) => {
      tx.commit().db()?;
      debug!("unit of work committed");
      Ok(value)
    }
    Err(err) => {
      if let Err(rollback_err) = tx.rollback() {
        warn!(error = %rollback_err, "rollback failed");
      }
      debug!(error = %err, "unit of work rolled back");
      Err(err)
    }
  }
}

// ─── IdentityStore impl ──────────────────────────────────────────────────────

impl IdentityStore for SqliteStore {
  async fn unit_of_work<T, F>(&self, work: F) -> roster_core::Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&dyn UnitOfWork) -> roster_core::Result<T> + Send + 'static,
  {
    self
      .conn
      .call(move |conn| Ok(run_unit_of_work(conn, work)))
      .await
      .map_err(crate::Error::from)?
  }
}
