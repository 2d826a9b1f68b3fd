//! Service settings. Every struct deserialises with defaults for missing
//! keys, so a partial configuration file is always valid.

use chrono::Duration;
use roster_core::{Error, Result};
use serde::Deserialize;

use crate::password::{HashingConfig, PasswordPolicy};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
  /// Refuse to authenticate deactivated accounts. When false, they log in
  /// with an empty permission set.
  pub reject_inactive: bool,
}

impl Default for AuthConfig {
  fn default() -> Self { Self { reject_inactive: true } }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
  pub code_ttl_minutes: i64,
  pub code_length:      usize,
  pub mail_subject:     String,
}

impl Default for RecoveryConfig {
  fn default() -> Self {
    Self {
      code_ttl_minutes: 10,
      code_length:      6,
      mail_subject:     "Your account recovery code".to_owned(),
    }
  }
}

/// One week.
const MAX_CODE_TTL_MINUTES: i64 = 7 * 24 * 60;
const MAX_CODE_LENGTH: usize = 64;

impl RecoveryConfig {
  /// Reject settings that would issue unusable codes.
  pub fn validate(&self) -> Result<()> {
    if !(1..=MAX_CODE_TTL_MINUTES).contains(&self.code_ttl_minutes) {
      return Err(Error::validation(format!(
        "recovery.code_ttl_minutes must be between 1 and {MAX_CODE_TTL_MINUTES}, got {}",
        self.code_ttl_minutes
      )));
    }
    if !(1..=MAX_CODE_LENGTH).contains(&self.code_length) {
      return Err(Error::validation(format!(
        "recovery.code_length must be between 1 and {MAX_CODE_LENGTH}, got {}",
        self.code_length
      )));
    }
    Ok(())
  }

  pub fn ttl(&self) -> Result<Duration> {
    Duration::try_minutes(self.code_ttl_minutes).ok_or_else(|| {
      Error::validation(format!("recovery TTL of {} minutes is out of range", self.code_ttl_minutes))
    })
  }
}

/// Everything the identity services need besides a store and a mailer.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
  pub auth:     AuthConfig,
  pub recovery: RecoveryConfig,
  pub hashing:  HashingConfig,
  pub password: PasswordPolicy,
}

impl IdentityConfig {
  /// Defaults with the cheapest hashing cost.
  pub fn testing() -> Self {
    Self { hashing: HashingConfig::testing(), ..Self::default() }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn recovery_bounds() {
    assert!(RecoveryConfig::default().validate().is_ok());

    for (ttl, length) in [(0, 6), (-5, 6), (1_000_000_000_000, 6), (10, 0), (10, 65)] {
      let config = RecoveryConfig {
        code_ttl_minutes: ttl,
        code_length: length,
        ..RecoveryConfig::default()
      };
      assert!(matches!(config.validate(), Err(Error::Validation(_))), "{ttl}/{length}");
    }
  }

  #[test]
  fn ttl_never_panics() {
    let config = RecoveryConfig { code_ttl_minutes: i64::MAX, ..RecoveryConfig::default() };
    assert!(config.ttl().is_err());
    assert_eq!(RecoveryConfig::default().ttl().unwrap(), Duration::minutes(10));
  }
}
