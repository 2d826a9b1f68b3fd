//! Recovery codes — short-lived one-time secrets used to regain access to
//! an account.
//!
//! State machine: `active → used` on successful password reset,
//! `active → expired` when superseded by a newer code or observed past its
//! TTL. `used` and `expired` are terminal.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RecoveryState {
  Active,
  Used,
  Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryCode {
  pub code_id:      Uuid,
  pub account_id:   Uuid,
  pub code:         String,
  pub created_at:   DateTime<Utc>,
  pub expires_at:   DateTime<Utc>,
  pub state:        RecoveryState,
  /// Hex SHA-256 of the last redemption token issued for this code.
  #[serde(skip_serializing, default)]
  pub token_digest: Option<String>,
}

impl RecoveryCode {
  /// Fails when `created_at + ttl` leaves the representable date range.
  pub fn issue(account_id: Uuid, code: String, ttl: Duration) -> Result<Self> {
    let created_at = Utc::now();
    let expires_at = created_at
      .checked_add_signed(ttl)
      .ok_or_else(|| Error::validation(format!("recovery code TTL {ttl} is out of range")))?;
    Ok(Self {
      code_id: Uuid::new_v4(),
      account_id,
      code,
      created_at,
      expires_at,
      state: RecoveryState::Active,
      token_digest: None,
    })
  }

  pub fn is_active(&self) -> bool { self.state == RecoveryState::Active }

  /// Whether the TTL has elapsed at `now`, regardless of the stored state.
  pub fn is_past_ttl(&self, now: DateTime<Utc>) -> bool { now >= self.expires_at }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn issued_code_is_active_until_ttl() {
    let code =
      RecoveryCode::issue(Uuid::new_v4(), "AB12CD".into(), Duration::minutes(10)).unwrap();
    assert!(code.is_active());
    assert_eq!(code.expires_at - code.created_at, Duration::minutes(10));
    assert!(!code.is_past_ttl(code.created_at + Duration::minutes(9)));
    assert!(code.is_past_ttl(code.created_at + Duration::minutes(10)));
  }

  #[test]
  fn overflowing_ttl_is_an_error() {
    let ttl = Duration::days(100_000_000);
    let issued = RecoveryCode::issue(Uuid::new_v4(), "AB12CD".into(), ttl);
    assert!(matches!(issued, Err(Error::Validation(_))));
  }

  #[test]
  fn state_storage_form() {
    assert_eq!(RecoveryState::Expired.as_ref(), "expired");
    assert_eq!("used".parse::<RecoveryState>().unwrap(), RecoveryState::Used);
  }
}
