//! Credential verification and identity resolution.
//!
//! A successful [`Authenticator::authenticate`] runs in a single unit of
//! work: it loads the account, checks the secret, follows the account's
//! profile discriminator to exactly one profile row, computes the role's
//! permissions and stamps the login time.

use std::collections::BTreeSet;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use roster_core::{
  AuthFailure, Error, Result,
  account::{Account, AccountProfile, ProfileKind},
  person::Person,
  profile::{LinkedProfile, ResolvedProfile},
  role::Role,
  store::{IdentityStore, ProfileRepository, UnitOfWork},
};

use crate::{
  authorization::compute_permissions,
  config::AuthConfig,
  password::CredentialHasher,
};

// ─── Validation ──────────────────────────────────────────────────────────────

/// Structural email check: one `@`, a non-empty local part, a dotted domain
/// and no whitespace.
pub fn validate_email(identifier: &str) -> Result<()> {
  let identifier = identifier.trim();
  if identifier.is_empty() {
    return Err(Error::validation("email is required"));
  }
  let well_formed = match identifier.split_once('@') {
    Some((local, domain)) => {
      !local.is_empty()
        && !domain.contains('@')
        && domain.split('.').count() >= 2
        && domain.split('.').all(|label| !label.is_empty())
        && !identifier.chars().any(char::is_whitespace)
    }
    None => false,
  };
  if well_formed {
    Ok(())
  } else {
    Err(Error::validation(format!("'{identifier}' is not a valid email address")))
  }
}

/// Input checks performed before any storage access.
pub fn validate_credentials(identifier: &str, secret: &str) -> Result<()> {
  validate_email(identifier)?;
  if secret.is_empty() {
    return Err(Error::validation("password is required"));
  }
  Ok(())
}

// ─── Identity ────────────────────────────────────────────────────────────────

/// The detached result of a successful login. Holds no storage handles.
#[derive(Debug, Clone, Serialize)]
pub struct Identity {
  pub account:     Account,
  pub profile:     ResolvedProfile,
  pub role:        Role,
  pub permissions: BTreeSet<String>,
}

impl Identity {
  pub fn account_id(&self) -> Uuid { self.account.account_id }

  pub fn display_name(&self) -> String { self.profile.display_name(&self.account) }
}

// ─── Profile resolution ──────────────────────────────────────────────────────

/// Follow the account's discriminator to its single profile row.
///
/// A discriminator that points at a missing or foreign row is reported as
/// [`Error::NotFound`] rather than treated as "no profile".
pub fn resolve_profile(uow: &dyn UnitOfWork, account: &Account) -> Result<ResolvedProfile> {
  Ok(match account.profile {
    AccountProfile::None => ResolvedProfile::None,
    AccountProfile::Administrator => {
      let admin = uow
        .administrators()
        .get(account.account_id)?
        .ok_or_else(|| Error::not_found("administrator profile", account.account_id))?;
      ResolvedProfile::Administrator(admin)
    }
    AccountProfile::Teacher(person_id) => {
      let (person, teacher) = linked(uow, uow.teachers(), account, person_id)?;
      ResolvedProfile::Teacher { person, teacher }
    }
    AccountProfile::Director(person_id) => {
      let (person, director) = linked(uow, uow.directors(), account, person_id)?;
      ResolvedProfile::Director { person, director }
    }
    AccountProfile::Guardian(person_id) => {
      let (person, guardian) = linked(uow, uow.guardians(), account, person_id)?;
      ResolvedProfile::Guardian { person, guardian }
    }
  })
}

fn linked<P: LinkedProfile>(
  uow: &dyn UnitOfWork,
  profiles: &dyn ProfileRepository<P>,
  account: &Account,
  person_id: Uuid,
) -> Result<(Person, P)> {
  let entity = match P::KIND {
    ProfileKind::Teacher => "teacher profile",
    ProfileKind::Director => "director profile",
    _ => "guardian profile",
  };
  let profile = profiles
    .get(person_id)?
    .filter(|p| p.account_id() == account.account_id)
    .ok_or_else(|| Error::not_found(entity, person_id))?;
  let person = uow
    .persons()
    .get(person_id)?
    .ok_or_else(|| Error::not_found("person", person_id))?;
  Ok((person, profile))
}

// ─── Service ─────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct Authenticator<S> {
  store:  S,
  hasher: CredentialHasher,
  config: AuthConfig,
}

impl<S: IdentityStore> Authenticator<S> {
  pub fn new(store: S, hasher: CredentialHasher, config: AuthConfig) -> Self {
    Self { store, hasher, config }
  }

  /// Verify `secret` for the account registered under `identifier` and
  /// resolve its identity.
  pub async fn authenticate(&self, identifier: &str, secret: &str) -> Result<Identity> {
    validate_credentials(identifier, secret)?;

    let email = identifier.trim().to_owned();
    let secret = secret.to_owned();
    let hasher = self.hasher.clone();
    let reject_inactive = self.config.reject_inactive;

    let result = self
      .store
      .unit_of_work(move |uow| {
        let mut account = uow
          .accounts()
          .get_by_email(&email)?
          .ok_or(AuthFailure::NotFound)?;

        if !hasher.verify(&secret, &account.password_hash)? {
          return Err(AuthFailure::BadCredential.into());
        }
        if !account.active && reject_inactive {
          return Err(AuthFailure::Inactive.into());
        }

        let role_id = account.role_id.ok_or(AuthFailure::NoRoleAssigned)?;
        let role = uow.roles().get(role_id)?.ok_or(AuthFailure::NoRoleAssigned)?;
        let profile = resolve_profile(uow, &account)?;
        let permissions = if account.active {
          compute_permissions(uow, &account)?
        } else {
          BTreeSet::new()
        };

        let now = Utc::now();
        uow.accounts().record_login(account.account_id, now)?;
        account.last_login_at = Some(now);

        Ok(Identity { account, profile, role, permissions })
      })
      .await;

    match &result {
      Ok(identity) => info!(
        account = %identity.account.account_id,
        role = %identity.role.name,
        profile = %identity.profile.kind(),
        "authenticated"
      ),
      Err(Error::Authentication(failure)) => {
        warn!(identifier = %identifier.trim(), %failure, "authentication refused")
      }
      Err(e) => warn!(identifier = %identifier.trim(), error = %e, "authentication failed"),
    }
    result
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn email_shapes() {
    assert!(validate_email("ana@school.edu").is_ok());
    assert!(validate_email("  ana@school.edu ").is_ok());
    assert!(validate_email("").is_err());
    assert!(validate_email("ana").is_err());
    assert!(validate_email("@school.edu").is_err());
    assert!(validate_email("ana@school").is_err());
    assert!(validate_email("ana@@school.edu").is_err());
    assert!(validate_email("ana@school..edu").is_err());
    assert!(validate_email("a na@school.edu").is_err());
  }

  #[test]
  fn empty_secret_is_rejected() {
    assert!(matches!(
      validate_credentials("ana@school.edu", ""),
      Err(Error::Validation(_))
    ));
  }
}
