//! Error type for `roster-store-sqlite`.

use rusqlite::ffi;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown {column} value: {value:?}")]
  UnknownValue { column: &'static str, value: String },

  #[error("core error: {0}")]
  Core(#[from] roster_core::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Whether a SQLite failure is a UNIQUE / PRIMARY KEY violation.
fn is_uniqueness_violation(err: &rusqlite::Error) -> bool {
  matches!(
    err,
    rusqlite::Error::SqliteFailure(e, _)
      if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
        || e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
  )
}

impl From<Error> for roster_core::Error {
  fn from(err: Error) -> Self {
    match err {
      Error::Core(inner) => inner,
      Error::Sqlite(ref e) if is_uniqueness_violation(e) => {
        roster_core::Error::Conflict(e.to_string())
      }
      Error::Database(tokio_rusqlite::Error::Rusqlite(ref e))
        if is_uniqueness_violation(e) =>
      {
        roster_core::Error::Conflict(e.to_string())
      }
      other => roster_core::Error::Persistence(other.to_string()),
    }
  }
}

/// Shorthand for lifting raw rusqlite results into this crate's error, so
/// that `?` can then convert into [`roster_core::Error`].
pub(crate) trait SqlResultExt<T> {
  fn db(self) -> Result<T>;
}

impl<T> SqlResultExt<T> for rusqlite::Result<T> {
  fn db(self) -> Result<T> { self.map_err(Error::from) }
}
