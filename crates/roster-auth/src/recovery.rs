//! Credential recovery: request a code by email, redeem it for a one-time
//! token, then set a new password with the token.
//!
//! Each step is one unit of work. An account holds at most one active code;
//! requesting a new one expires the previous code in the same transaction.
//! Expiry observed during redemption or finalisation is committed before
//! the caller sees [`Error::Expired`].

use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use rand_core::{OsRng, RngCore};
use serde::Serialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::{info, warn};
use uuid::Uuid;

use roster_core::{
  AuthFailure, Error, Result,
  recovery::{RecoveryCode, RecoveryState},
  store::IdentityStore,
};

use crate::{
  authentication::validate_email,
  config::RecoveryConfig,
  mail::{Delivery, Mailer},
  password::{CredentialHasher, PasswordPolicy},
};

const ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

// Largest multiple of 36 that fits in a byte; higher values are resampled.
const ACCEPT_BELOW: u8 = 252;

// ─── Secrets ─────────────────────────────────────────────────────────────────

/// A uniformly random uppercase alphanumeric code.
pub fn generate_code(length: usize) -> String {
  let mut code = String::with_capacity(length);
  let mut buf = [0u8; 16];
  while code.len() < length {
    OsRng.fill_bytes(&mut buf);
    for &byte in buf.iter().filter(|&&b| b < ACCEPT_BELOW) {
      if code.len() == length {
        break;
      }
      code.push(ALPHABET[usize::from(byte % 36)] as char);
    }
  }
  code
}

/// Case-insensitive, constant-time comparison of a stored code with user
/// input. Codes of different length never match.
pub fn codes_match(stored: &str, submitted: &str) -> bool {
  let submitted = submitted.trim().to_ascii_uppercase();
  let (stored, submitted) = (stored.as_bytes(), submitted.as_bytes());
  stored.len() == submitted.len() && bool::from(stored.ct_eq(submitted))
}

fn token_digest(token: &str) -> String { hex::encode(Sha256::digest(token.as_bytes())) }

/// Opaque proof that a recovery code was redeemed. Only its digest is
/// stored.
#[derive(Clone, PartialEq, Eq)]
pub struct RedemptionToken(String);

impl RedemptionToken {
  fn generate() -> Self {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    Self(URL_SAFE_NO_PAD.encode(bytes))
  }

  pub fn as_str(&self) -> &str { &self.0 }

  fn digest(&self) -> String { token_digest(&self.0) }
}

impl std::fmt::Debug for RedemptionToken {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str("RedemptionToken(..)")
  }
}

// ─── Results ─────────────────────────────────────────────────────────────────

/// What `request_recovery` did. Returned even when delivery failed; the
/// code exists either way.
#[derive(Debug, Clone, Serialize)]
pub struct RecoveryIssued {
  pub account_id: Uuid,
  pub code_id:    Uuid,
  pub expires_at: DateTime<Utc>,
  /// How many previously active codes were expired.
  pub superseded: usize,
  pub delivery:   Delivery,
}

enum Observed<T> {
  Done(T),
  Expired,
}

impl<T> Observed<T> {
  fn into_result(self) -> Result<T> {
    match self {
      Self::Done(value) => Ok(value),
      Self::Expired => Err(Error::Expired),
    }
  }
}

// ─── Service ─────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct RecoveryService<S> {
  store:  S,
  mailer: Arc<dyn Mailer>,
  hasher: CredentialHasher,
  policy: PasswordPolicy,
  config: RecoveryConfig,
}

impl<S: IdentityStore> RecoveryService<S> {
  pub fn new(
    store: S,
    mailer: Arc<dyn Mailer>,
    hasher: CredentialHasher,
    policy: PasswordPolicy,
    config: RecoveryConfig,
  ) -> Result<Self> {
    config.validate()?;
    Ok(Self { store, mailer, hasher, policy, config })
  }

  /// Issue a fresh code for the account and mail it.
  pub async fn request_recovery(&self, identifier: &str) -> Result<RecoveryIssued> {
    validate_email(identifier)?;
    let email = identifier.trim().to_owned();
    let code = generate_code(self.config.code_length);
    let ttl = self.config.ttl()?;

    let (recipient, issued, superseded) = self
      .store
      .unit_of_work(move |uow| {
        let account = uow
          .accounts()
          .get_by_email(&email)?
          .ok_or_else(|| Error::not_found("account", &email))?;
        if !account.active {
          return Err(AuthFailure::Inactive.into());
        }
        let superseded = uow.recovery_codes().expire_active(account.account_id)?;
        let issued = RecoveryCode::issue(account.account_id, code, ttl)?;
        uow.recovery_codes().add(&issued)?;
        Ok((account.email, issued, superseded))
      })
      .await?;

    let body = format!(
      "Your recovery code is {}. It expires at {} UTC.",
      issued.code,
      issued.expires_at.format("%Y-%m-%d %H:%M")
    );
    let delivery = Delivery::from(self.mailer.send(&recipient, &self.config.mail_subject, &body));
    if delivery == Delivery::Failed {
      warn!(account = %issued.account_id, "recovery code could not be delivered");
    }
    info!(
      account = %issued.account_id,
      code_id = %issued.code_id,
      superseded,
      "recovery code issued"
    );

    Ok(RecoveryIssued {
      account_id: issued.account_id,
      code_id: issued.code_id,
      expires_at: issued.expires_at,
      superseded,
      delivery,
    })
  }

  /// Exchange a code for a redemption token. The code stays active until
  /// the password is actually reset.
  pub async fn redeem_recovery(&self, identifier: &str, code: &str) -> Result<RedemptionToken> {
    validate_email(identifier)?;
    if code.trim().is_empty() {
      return Err(Error::validation("recovery code is required"));
    }
    let email = identifier.trim().to_owned();
    let submitted = code.to_owned();
    let token = RedemptionToken::generate();
    let digest = token.digest();

    let observed = self
      .store
      .unit_of_work(move |uow| {
        let account = uow
          .accounts()
          .get_by_email(&email)?
          .ok_or_else(|| Error::not_found("account", &email))?;
        let codes = uow.recovery_codes();

        let active = codes.active_for(account.account_id)?;
        let had_active = active.is_some();
        if let Some(mut current) = active {
          if current.is_past_ttl(Utc::now()) {
            current.state = RecoveryState::Expired;
            codes.update(&current)?;
            return Ok(Observed::Expired);
          }
          if codes_match(&current.code, &submitted) {
            current.token_digest = Some(digest);
            codes.update(&current)?;
            return Ok(Observed::Done(current.code_id));
          }
        }

        // Not the active code: report a spent one for what it is.
        let spent = codes
          .list_for(account.account_id)?
          .into_iter()
          .rev()
          .find(|c| !c.is_active() && codes_match(&c.code, &submitted));
        match spent.map(|c| c.state) {
          Some(RecoveryState::Used) => Err(Error::AlreadyUsed),
          Some(_) => Err(Error::Expired),
          None if had_active => Err(Error::Mismatch),
          None => Err(Error::not_found("active recovery code", &email)),
        }
      })
      .await;

    match observed.and_then(Observed::into_result) {
      Ok(code_id) => {
        info!(code_id = %code_id, "recovery code redeemed");
        Ok(token)
      }
      Err(e) => {
        warn!(identifier = %identifier.trim(), error = %e, "recovery redemption refused");
        Err(e)
      }
    }
  }

  /// Replace the account's password and consume the code, atomically.
  pub async fn finalize_recovery(
    &self,
    token: &str,
    new_secret: &str,
    confirmation: &str,
  ) -> Result<()> {
    let token = token.trim();
    if token.is_empty() {
      return Err(Error::validation("redemption token is required"));
    }
    self.policy.check_confirmed(new_secret, confirmation)?;
    let digest = token_digest(token);
    let new_hash = self.hasher.hash(new_secret)?;

    let observed = self
      .store
      .unit_of_work(move |uow| {
        let codes = uow.recovery_codes();
        let mut code = codes
          .get_by_token_digest(&digest)?
          .ok_or_else(|| Error::not_found("redemption token", &digest[..12]))?;

        match code.state {
          RecoveryState::Used => return Err(Error::AlreadyUsed),
          RecoveryState::Expired => return Err(Error::Expired),
          RecoveryState::Active => {}
        }
        if code.is_past_ttl(Utc::now()) {
          code.state = RecoveryState::Expired;
          codes.update(&code)?;
          return Ok(Observed::Expired);
        }

        let mut account = uow
          .accounts()
          .get(code.account_id)?
          .ok_or_else(|| Error::not_found("account", code.account_id))?;
        account.password_hash = new_hash;
        uow.accounts().update(&account)?;

        code.state = RecoveryState::Used;
        codes.update(&code)?;
        Ok(Observed::Done(account.account_id))
      })
      .await;

    match observed.and_then(Observed::into_result) {
      Ok(account_id) => {
        info!(account = %account_id, "password reset through recovery");
        Ok(())
      }
      Err(e) => {
        warn!(error = %e, "recovery finalisation refused");
        Err(e)
      }
    }
  }
}
