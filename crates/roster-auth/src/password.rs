//! Argon2id credential hashing and the password policy.

use argon2::{
  Algorithm, Argon2, Params, Version,
  password_hash::{
    PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
    rand_core::OsRng,
  },
};
use serde::Deserialize;
use tracing::debug;

use roster_core::{Error, Result};

// ─── Policy ──────────────────────────────────────────────────────────────────

/// Complexity rules a new secret must satisfy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PasswordPolicy {
  pub min_length:        usize,
  pub max_length:        usize,
  pub require_uppercase: bool,
  pub require_lowercase: bool,
  pub require_digit:     bool,
}

impl Default for PasswordPolicy {
  fn default() -> Self {
    Self {
      min_length:        8,
      max_length:        128,
      require_uppercase: true,
      require_lowercase: true,
      require_digit:     true,
    }
  }
}

impl PasswordPolicy {
  /// Every violated rule, joined into one validation error.
  pub fn check(&self, secret: &str) -> Result<()> {
    let length = secret.chars().count();
    let mut problems = Vec::new();

    if length < self.min_length {
      problems.push(format!("must be at least {} characters", self.min_length));
    }
    if length > self.max_length {
      problems.push(format!("must be at most {} characters", self.max_length));
    }
    if self.require_uppercase && !secret.chars().any(|c| c.is_uppercase()) {
      problems.push("must contain an uppercase letter".to_owned());
    }
    if self.require_lowercase && !secret.chars().any(|c| c.is_lowercase()) {
      problems.push("must contain a lowercase letter".to_owned());
    }
    if self.require_digit && !secret.chars().any(|c| c.is_ascii_digit()) {
      problems.push("must contain a digit".to_owned());
    }

    if problems.is_empty() {
      Ok(())
    } else {
      Err(Error::validation(format!("password {}", problems.join(", "))))
    }
  }

  /// Check that `secret` and `confirmation` agree, then apply the rules.
  pub fn check_confirmed(&self, secret: &str, confirmation: &str) -> Result<()> {
    if secret != confirmation {
      return Err(Error::validation("password and confirmation do not match"));
    }
    self.check(secret)
  }
}

// ─── Hashing ─────────────────────────────────────────────────────────────────

/// Argon2id cost parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HashingConfig {
  /// Memory cost in KiB.
  pub memory_cost: u32,
  /// Iterations.
  pub time_cost:   u32,
  pub parallelism: u32,
}

impl Default for HashingConfig {
  fn default() -> Self {
    Self { memory_cost: 19 * 1024, time_cost: 2, parallelism: 1 }
  }
}

impl HashingConfig {
  /// Minimal cost, for tests only.
  pub fn testing() -> Self {
    Self { memory_cost: 4096, time_cost: 1, parallelism: 1 }
  }
}

/// Hashes and verifies secrets as PHC strings (`$argon2id$v=19$…`).
///
/// Verification reads the parameters embedded in the stored hash, so
/// changing [`HashingConfig`] never invalidates existing credentials.
#[derive(Clone)]
pub struct CredentialHasher {
  argon2: Argon2<'static>,
}

impl CredentialHasher {
  pub fn new(config: &HashingConfig) -> Result<Self> {
    let params =
      Params::new(config.memory_cost, config.time_cost, config.parallelism, None)
        .map_err(|e| Error::Hashing(format!("invalid argon2 parameters: {e}")))?;
    Ok(Self { argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params) })
  }

  pub fn hash(&self, secret: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = self
      .argon2
      .hash_password(secret.as_bytes(), &salt)
      .map_err(|e| Error::Hashing(e.to_string()))?;
    Ok(hash.to_string())
  }

  /// `Ok(false)` on a wrong secret; `Err` only when the stored hash is
  /// unreadable.
  pub fn verify(&self, secret: &str, stored: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored)
      .map_err(|e| Error::Hashing(format!("malformed stored hash: {e}")))?;
    match self.argon2.verify_password(secret.as_bytes(), &parsed) {
      Ok(()) => Ok(true),
      Err(argon2::password_hash::Error::Password) => {
        debug!("secret does not match stored hash");
        Ok(false)
      }
      Err(e) => Err(Error::Hashing(e.to_string())),
    }
  }
}

impl std::fmt::Debug for CredentialHasher {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CredentialHasher").finish_non_exhaustive()
  }
}
