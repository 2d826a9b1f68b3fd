//! Error types for `roster-core`.
//!
//! Every fallible operation in the workspace ends up as one of these
//! variants. Storage backends convert their own failures into
//! [`Error::Persistence`] or [`Error::Conflict`].

use thiserror::Error;

/// Why an authentication attempt was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
  /// No account is registered under the identifier.
  NotFound,
  /// The secret does not match the stored hash.
  BadCredential,
  /// The account exists but has no role attached.
  NoRoleAssigned,
  /// The account has been deactivated.
  Inactive,
}

impl std::fmt::Display for AuthFailure {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(match self {
      Self::NotFound => "unknown account",
      Self::BadCredential => "bad credential",
      Self::NoRoleAssigned => "no role assigned",
      Self::Inactive => "account is inactive",
    })
  }
}

#[derive(Debug, Error)]
pub enum Error {
  /// Malformed input, rejected before any storage access.
  #[error("validation failed: {0}")]
  Validation(String),

  #[error("{entity} not found: {key}")]
  NotFound { entity: &'static str, key: String },

  /// A uniqueness constraint (email, government ID, name) was violated.
  #[error("conflict: {0}")]
  Conflict(String),

  #[error("authentication failed: {0}")]
  Authentication(AuthFailure),

  #[error("permission denied: {0}")]
  Authorization(String),

  #[error("recovery code has expired")]
  Expired,

  #[error("recovery code has already been used")]
  AlreadyUsed,

  #[error("recovery code does not match")]
  Mismatch,

  #[error("persistence error: {0}")]
  Persistence(String),

  /// The password hasher itself failed (bad parameters, malformed hash).
  #[error("credential hashing failed: {0}")]
  Hashing(String),
}

impl Error {
  pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
    Self::NotFound { entity, key: key.to_string() }
  }

  pub fn validation(message: impl Into<String>) -> Self {
    Self::Validation(message.into())
  }
}

impl From<AuthFailure> for Error {
  fn from(failure: AuthFailure) -> Self { Self::Authentication(failure) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
