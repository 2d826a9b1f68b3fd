//! Authentication, authorization, credential recovery and provisioning for
//! Roster, generic over any [`IdentityStore`].

pub mod authentication;
pub mod authorization;
pub mod config;
pub mod directory;
pub mod mail;
pub mod password;
pub mod recovery;
pub mod seed;


use std::sync::Arc;

use roster_core::{Result, store::IdentityStore};

pub use authentication::{Authenticator, Identity};
pub use authorization::{Denial, DenialListener, SessionContext, SessionKey, Sessions};
pub use config::IdentityConfig;
pub use directory::Directory;
pub use mail::{Delivery, Mailer, TracingMailer};
pub use password::CredentialHasher;
pub use recovery::{RecoveryService, RedemptionToken};

/// Every service wired to one store, one mailer and one denial listener.
pub struct IdentityServices<S> {
  pub authenticator: Authenticator<S>,
  pub recovery:      RecoveryService<S>,
  pub directory:     Directory<S>,
  pub sessions:      Sessions,
}

impl<S: IdentityStore> IdentityServices<S> {
  pub fn new(
    store: S,
    config: &IdentityConfig,
    mailer: Arc<dyn Mailer>,
    listener: Arc<dyn DenialListener>,
  ) -> Result<Self> {
    let hasher = CredentialHasher::new(&config.hashing)?;
    Ok(Self {
      authenticator: Authenticator::new(store.clone(), hasher.clone(), config.auth.clone()),
      recovery:      RecoveryService::new(
        store.clone(),
        mailer,
        hasher.clone(),
        config.password.clone(),
        config.recovery.clone(),
      )?,
      directory:     Directory::new(store, hasher, config.password.clone()),
      sessions:      Sessions::new(listener),
    })
  }

  /// Authenticate and populate `key` with the resulting identity. The
  /// session must be open and empty before credentials are checked.
  pub async fn login(&self, key: SessionKey, identifier: &str, secret: &str) -> Result<Identity> {
    self.sessions.ensure_vacant(key)?;
    let identity = self.authenticator.authenticate(identifier, secret).await?;
    self.sessions.populate(key, &identity)?;
    Ok(identity)
  }
}
