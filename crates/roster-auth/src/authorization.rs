//! Role-based permission checks.
//!
//! Permissions are computed once at login and cached in a per-session
//! [`SessionContext`]. Revoking a grant takes effect the next time the
//! account authenticates. Contexts live in [`Sessions`], a concurrent map
//! keyed by [`SessionKey`]; there is no process-wide "current user".

use std::{
  collections::{BTreeSet, HashSet},
  sync::Arc,
};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use roster_core::{Error, Result, account::Account, store::UnitOfWork};

use crate::authentication::Identity;

/// Names of every permission granted to the account's role. An account
/// without a role has none.
pub fn compute_permissions(uow: &dyn UnitOfWork, account: &Account) -> Result<BTreeSet<String>> {
  match account.role_id {
    Some(role_id) => uow.roles().permissions_of(role_id),
    None => Ok(BTreeSet::new()),
  }
}

// ─── Session context ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct SessionContext {
  account_id:  Option<Uuid>,
  email:       Option<String>,
  role:        Option<String>,
  permissions: HashSet<String>,
}

impl SessionContext {
  pub fn is_authenticated(&self) -> bool { self.account_id.is_some() }

  pub fn account_id(&self) -> Option<Uuid> { self.account_id }

  pub fn email(&self) -> Option<&str> { self.email.as_deref() }

  pub fn role(&self) -> Option<&str> { self.role.as_deref() }

  /// Fill the context from a fresh login. A context is populated at most
  /// once; log out first to switch accounts.
  pub fn populate(&mut self, identity: &Identity) -> Result<()> {
    if let Some(current) = self.account_id {
      return Err(Error::Conflict(format!(
        "session is already populated for account {current}"
      )));
    }
    self.account_id = Some(identity.account.account_id);
    self.email = Some(identity.account.email.clone());
    self.role = Some(identity.role.name.clone());
    self.permissions = identity.permissions.iter().cloned().collect();
    Ok(())
  }

  pub fn clear(&mut self) { *self = Self::default(); }

  pub fn has_permission(&self, name: &str) -> bool { self.permissions.contains(name) }

  /// False for an empty list.
  pub fn has_any(&self, names: &[&str]) -> bool {
    names.iter().any(|n| self.has_permission(n))
  }

  /// True for an empty list.
  pub fn has_all(&self, names: &[&str]) -> bool {
    names.iter().all(|n| self.has_permission(n))
  }
}

// ─── Denials ─────────────────────────────────────────────────────────────────

/// Opaque handle for one client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SessionKey(Uuid);

impl std::fmt::Display for SessionKey {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { self.0.fmt(f) }
}

/// A guarded check that failed.
#[derive(Debug, Clone, Serialize)]
pub struct Denial {
  pub session:    SessionKey,
  /// `None` when the session never authenticated.
  pub account_id: Option<Uuid>,
  pub permission: String,
  pub at:         DateTime<Utc>,
}

/// Receives every denial raised by [`Sessions::guard`].
pub trait DenialListener: Send + Sync {
  fn denied(&self, denial: &Denial);
}

impl DenialListener for () {
  fn denied(&self, _: &Denial) {}
}

// ─── Registry ────────────────────────────────────────────────────────────────

pub struct Sessions {
  contexts: DashMap<SessionKey, SessionContext>,
  listener: Arc<dyn DenialListener>,
}

impl Default for Sessions {
  fn default() -> Self { Self::new(Arc::new(())) }
}

impl Sessions {
  pub fn new(listener: Arc<dyn DenialListener>) -> Self {
    Self { contexts: DashMap::new(), listener }
  }

  /// Start a session with an empty context.
  pub fn begin(&self) -> SessionKey {
    let key = SessionKey(Uuid::new_v4());
    self.contexts.insert(key, SessionContext::default());
    debug!(session = %key, "session started");
    key
  }

  /// Fail unless `key` names an open session that nobody is logged into.
  pub fn ensure_vacant(&self, key: SessionKey) -> Result<()> {
    let context = self.contexts.get(&key).ok_or_else(|| Error::not_found("session", key))?;
    match context.account_id() {
      Some(current) => Err(Error::Conflict(format!(
        "session is already populated for account {current}"
      ))),
      None => Ok(()),
    }
  }

  pub fn populate(&self, key: SessionKey, identity: &Identity) -> Result<()> {
    let mut context = self
      .contexts
      .get_mut(&key)
      .ok_or_else(|| Error::not_found("session", key))?;
    context.populate(identity)?;
    debug!(session = %key, account = %identity.account.account_id, "session populated");
    Ok(())
  }

  /// Clear the context; the session itself stays open. Returns false for an
  /// unknown key.
  pub fn logout(&self, key: SessionKey) -> bool {
    match self.contexts.get_mut(&key) {
      Some(mut context) => {
        context.clear();
        debug!(session = %key, "logged out");
        true
      }
      None => false,
    }
  }

  /// Drop the session entirely.
  pub fn end(&self, key: SessionKey) -> bool { self.contexts.remove(&key).is_some() }

  /// A snapshot of the session's context.
  pub fn context(&self, key: SessionKey) -> Option<SessionContext> {
    self.contexts.get(&key).map(|c| c.value().clone())
  }

  pub fn len(&self) -> usize { self.contexts.len() }

  pub fn is_empty(&self) -> bool { self.contexts.is_empty() }

  /// Unknown sessions hold no permissions.
  pub fn has_permission(&self, key: SessionKey, name: &str) -> bool {
    self.contexts.get(&key).is_some_and(|c| c.has_permission(name))
  }

  pub fn has_any(&self, key: SessionKey, names: &[&str]) -> bool {
    self.contexts.get(&key).is_some_and(|c| c.has_any(names))
  }

  pub fn has_all(&self, key: SessionKey, names: &[&str]) -> bool {
    self.contexts.get(&key).is_some_and(|c| c.has_all(names))
  }

  /// Like [`has_permission`](Self::has_permission), but a denial is logged
  /// and handed to the listener.
  pub fn guard(&self, key: SessionKey, name: &str) -> bool {
    let (allowed, account_id) = match self.contexts.get(&key) {
      Some(c) => (c.has_permission(name), c.account_id()),
      None => (false, None),
    };
    if !allowed {
      let denial = Denial {
        session: key,
        account_id,
        permission: name.to_owned(),
        at: Utc::now(),
      };
      warn!(
        session = %key,
        account = ?account_id,
        permission = %name,
        "permission denied"
      );
      self.listener.denied(&denial);
    }
    allowed
  }

  /// [`guard`](Self::guard) as a `Result`.
  pub fn require(&self, key: SessionKey, name: &str) -> Result<()> {
    if self.guard(key, name) {
      Ok(())
    } else {
      Err(Error::Authorization(name.to_owned()))
    }
  }
}
