//! Layered configuration: defaults, then `roster.toml`, then `ROSTER_*`
//! environment variables (`__` separates nested keys, e.g.
//! `ROSTER_RECOVERY__CODE_TTL_MINUTES=15`).

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use roster_auth::{
  IdentityConfig,
  config::{AuthConfig, RecoveryConfig},
  password::{HashingConfig, PasswordPolicy},
};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
  pub store_path: PathBuf,
  /// Sender shown on outgoing recovery messages.
  pub mail_from:  String,
  pub auth:       AuthConfig,
  pub recovery:   RecoveryConfig,
  pub hashing:    HashingConfig,
  pub password:   PasswordPolicy,
}

impl Default for RosterConfig {
  fn default() -> Self {
    Self {
      store_path: PathBuf::from("roster.db"),
      mail_from:  "no-reply@localhost".to_owned(),
      auth:       AuthConfig::default(),
      recovery:   RecoveryConfig::default(),
      hashing:    HashingConfig::default(),
      password:   PasswordPolicy::default(),
    }
  }
}

impl RosterConfig {
  pub fn load(file: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(file).required(false))
      .add_source(
        config::Environment::with_prefix("ROSTER")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()
      .with_context(|| format!("failed to read configuration from {}", file.display()))?;

    let mut loaded: Self = settings
      .try_deserialize()
      .context("failed to deserialise RosterConfig")?;
    loaded.store_path = expand_tilde(&loaded.store_path);
    Ok(loaded)
  }

  pub fn identity(&self) -> IdentityConfig {
    IdentityConfig {
      auth:     self.auth.clone(),
      recovery: self.recovery.clone(),
      hashing:  self.hashing.clone(),
      password: self.password.clone(),
    }
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_file_yields_defaults() {
    let loaded = RosterConfig::load(Path::new("does-not-exist.toml")).unwrap();
    assert_eq!(loaded.recovery.code_length, 6);
    assert_eq!(loaded.recovery.code_ttl_minutes, 10);
    assert!(loaded.auth.reject_inactive);
    assert_eq!(loaded.password.min_length, 8);
  }

  #[test]
  fn partial_file_keeps_other_defaults() {
    let path = std::env::temp_dir().join(format!("roster-{}.toml", std::process::id()));
    std::fs::write(
      &path,
      "store_path = \"/tmp/r.db\"\n[recovery]\ncode_ttl_minutes = 30\n[auth]\nreject_inactive = false\n",
    )
    .unwrap();

    let loaded = RosterConfig::load(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded.store_path, PathBuf::from("/tmp/r.db"));
    assert_eq!(loaded.recovery.code_ttl_minutes, 30);
    assert_eq!(loaded.recovery.code_length, 6);
    assert!(!loaded.auth.reject_inactive);
    assert_eq!(loaded.identity().hashing.time_cost, HashingConfig::default().time_cost);
  }
}
