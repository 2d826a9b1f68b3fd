//! Account — the credentialed login entity.
//!
//! An account owns at most one profile reference, recorded as an explicit
//! discriminator ([`AccountProfile`]) at creation time. Resolving the
//! concrete role-type of an account is therefore a single lookup keyed by
//! that discriminator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

/// Which role-type profile, if any, an account is bound to.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProfileKind {
  None,
  Administrator,
  Teacher,
  Director,
  Guardian,
}

/// The profile reference held by an account.
///
/// The administrator profile shares the account's own id. Teacher, director
/// and guardian profiles live on a separate [`Person`](crate::person::Person)
/// and are referenced by that person's id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "person_id", rename_all = "lowercase")]
pub enum AccountProfile {
  None,
  Administrator,
  Teacher(Uuid),
  Director(Uuid),
  Guardian(Uuid),
}

impl AccountProfile {
  pub fn kind(&self) -> ProfileKind {
    match self {
      Self::None => ProfileKind::None,
      Self::Administrator => ProfileKind::Administrator,
      Self::Teacher(_) => ProfileKind::Teacher,
      Self::Director(_) => ProfileKind::Director,
      Self::Guardian(_) => ProfileKind::Guardian,
    }
  }

  /// The person id for association profiles; `None` otherwise.
  pub fn person_id(&self) -> Option<Uuid> {
    match self {
      Self::Teacher(id) | Self::Director(id) | Self::Guardian(id) => Some(*id),
      Self::None | Self::Administrator => None,
    }
  }

  /// Rebuild a profile reference from its stored parts.
  pub fn from_parts(kind: ProfileKind, person_id: Option<Uuid>) -> Result<Self> {
    match (kind, person_id) {
      (ProfileKind::None, None) => Ok(Self::None),
      (ProfileKind::Administrator, None) => Ok(Self::Administrator),
      (ProfileKind::Teacher, Some(id)) => Ok(Self::Teacher(id)),
      (ProfileKind::Director, Some(id)) => Ok(Self::Director(id)),
      (ProfileKind::Guardian, Some(id)) => Ok(Self::Guardian(id)),
      (kind, person_id) => Err(Error::validation(format!(
        "profile kind {kind} is inconsistent with person reference {person_id:?}"
      ))),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
  pub account_id:          Uuid,
  /// Stored as entered; compared case-insensitively.
  pub email:               String,
  /// PHC-formatted adaptive hash. Never serialised.
  #[serde(skip_serializing, default)]
  pub password_hash:       String,
  pub role_id:             Option<Uuid>,
  pub profile:             AccountProfile,
  pub active:              bool,
  /// Required (non-empty) whenever `active` is false.
  pub deactivation_reason: Option<String>,
  pub created_at:          DateTime<Utc>,
  pub last_login_at:       Option<DateTime<Utc>>,
}

impl Account {
  pub fn new(
    email: impl Into<String>,
    password_hash: impl Into<String>,
    role_id: Option<Uuid>,
    profile: AccountProfile,
  ) -> Self {
    Self {
      account_id: Uuid::new_v4(),
      email: email.into().trim().to_owned(),
      password_hash: password_hash.into(),
      role_id,
      profile,
      active: true,
      deactivation_reason: None,
      created_at: Utc::now(),
      last_login_at: None,
    }
  }

  /// Deactivate with a mandatory justification.
  pub fn deactivate(&mut self, reason: &str) -> Result<()> {
    let reason = reason.trim();
    if reason.is_empty() {
      return Err(Error::validation("a deactivation reason is required"));
    }
    self.active = false;
    self.deactivation_reason = Some(reason.to_owned());
    Ok(())
  }

  pub fn reactivate(&mut self) {
    self.active = true;
    self.deactivation_reason = None;
  }

  /// Check the active/justification invariant.
  pub fn check_invariants(&self) -> Result<()> {
    let has_reason = self
      .deactivation_reason
      .as_deref()
      .is_some_and(|r| !r.trim().is_empty());
    if !self.active && !has_reason {
      return Err(Error::validation(format!(
        "account {} is inactive without a deactivation reason",
        self.account_id
      )));
    }
    Ok(())
  }
}

/// Lower-case and trim an email address for comparisons.
pub fn normalize_email(email: &str) -> String { email.trim().to_lowercase() }

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn deactivation_requires_reason() {
    let mut account = Account::new("a@x.edu", "hash", None, AccountProfile::None);
    assert!(account.deactivate("   ").is_err());
    assert!(account.active);

    account.deactivate("left the institution").unwrap();
    assert!(!account.active);
    assert!(account.check_invariants().is_ok());

    account.reactivate();
    assert!(account.active);
    assert!(account.deactivation_reason.is_none());
  }

  #[test]
  fn inactive_without_reason_violates_invariant() {
    let mut account = Account::new("a@x.edu", "hash", None, AccountProfile::None);
    account.active = false;
    assert!(matches!(account.check_invariants(), Err(Error::Validation(_))));
  }

  #[test]
  fn normalized_email_folds_unicode_case() {
    assert_eq!(normalize_email("  ÁNGELA@School.EDU "), "ángela@school.edu");
    assert_eq!(normalize_email("Ángela@school.edu"), normalize_email("ángela@SCHOOL.edu"));
  }

  #[test]
  fn profile_parts_must_agree() {
    let id = Uuid::new_v4();
    assert_eq!(
      AccountProfile::from_parts(ProfileKind::Teacher, Some(id)).unwrap(),
      AccountProfile::Teacher(id)
    );
    assert!(AccountProfile::from_parts(ProfileKind::Administrator, Some(id)).is_err());
    assert!(AccountProfile::from_parts(ProfileKind::Guardian, None).is_err());
  }

  #[test]
  fn password_hash_is_not_serialised() {
    let account = Account::new("a@x.edu", "$argon2id$secret", None, AccountProfile::None);
    let json = serde_json::to_string(&account).unwrap();
    assert!(!json.contains("argon2id"));
    assert!(json.contains("\"kind\":\"none\""));
  }
}
