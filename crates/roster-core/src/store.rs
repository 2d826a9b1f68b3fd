//! Repository contracts and the Unit of Work boundary.
//!
//! Repositories are synchronous and only ever reachable through a
//! [`UnitOfWork`], which a backend hands to the closure passed to
//! [`IdentityStore::unit_of_work`]. Nothing a repository does becomes
//! visible to other units of work until the closure returns `Ok` and the
//! backend commits. Returning `Err` rolls every change back.

use std::{collections::BTreeSet, future::Future};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  Result,
  account::Account,
  person::{DocumentKind, Person},
  profile::{Administrator, Applicant, Director, Guardian, Student, Teacher},
  recovery::RecoveryCode,
  role::{Permission, Role},
};

// ─── Generic contract ────────────────────────────────────────────────────────

/// Basic persistence operations shared by every aggregate.
pub trait Repository<T> {
  /// Stage a new aggregate. Uniqueness violations yield
  /// [`Error::Conflict`](crate::Error::Conflict).
  fn add(&self, entity: &T) -> Result<()>;

  /// Fetch by primary key. Returns `None` if not found.
  fn get(&self, id: Uuid) -> Result<Option<T>>;

  fn get_all(&self) -> Result<Vec<T>>;

  /// Overwrite the stored aggregate with the same id.
  /// Returns [`Error::NotFound`](crate::Error::NotFound) if it does not exist.
  fn update(&self, entity: &T) -> Result<()>;

  fn delete(&self, entity: &T) -> Result<()>;
}

// ─── Per-aggregate queries ───────────────────────────────────────────────────

pub trait PersonRepository: Repository<Person> {
  fn get_by_document_number(
    &self,
    kind: DocumentKind,
    number: &str,
  ) -> Result<Option<Person>>;
}

pub trait AccountRepository: Repository<Account> {
  /// Case-insensitive email lookup.
  fn get_by_email(&self, email: &str) -> Result<Option<Account>>;

  fn get_by_role(&self, role_id: Uuid) -> Result<Vec<Account>>;

  fn record_login(&self, account_id: Uuid, at: DateTime<Utc>) -> Result<()>;
}

pub trait RoleRepository: Repository<Role> {
  fn get_by_name(&self, name: &str) -> Result<Option<Role>>;

  /// Names of every permission granted to `role_id`
  /// (role → role_permissions → permission).
  fn permissions_of(&self, role_id: Uuid) -> Result<BTreeSet<String>>;

  /// Idempotent.
  fn grant(&self, role_id: Uuid, permission_id: Uuid) -> Result<()>;

  fn revoke(&self, role_id: Uuid, permission_id: Uuid) -> Result<()>;
}

pub trait PermissionRepository: Repository<Permission> {
  fn get_by_name(&self, name: &str) -> Result<Option<Permission>>;
}

/// Repository for person-keyed profiles that reference an account.
/// `get` takes the person id.
pub trait ProfileRepository<P>: Repository<P> {
  fn get_by_account(&self, account_id: Uuid) -> Result<Option<P>>;
}

pub trait StudentRepository: Repository<Student> {
  fn get_by_guardian(&self, guardian_id: Uuid) -> Result<Vec<Student>>;
}

pub trait ApplicantRepository: Repository<Applicant> {
  fn get_by_guardian(&self, guardian_id: Uuid) -> Result<Vec<Applicant>>;
}

pub trait RecoveryCodeRepository: Repository<RecoveryCode> {
  /// The single active code for an account, if any.
  fn active_for(&self, account_id: Uuid) -> Result<Option<RecoveryCode>>;

  /// Transition every active code of `account_id` to expired; returns how
  /// many were changed.
  fn expire_active(&self, account_id: Uuid) -> Result<usize>;

  fn get_by_token_digest(&self, digest: &str) -> Result<Option<RecoveryCode>>;

  /// All codes ever issued for an account, oldest first.
  fn list_for(&self, account_id: Uuid) -> Result<Vec<RecoveryCode>>;
}

// ─── Unit of Work ────────────────────────────────────────────────────────────

/// The fixed set of repository facades bound to one open transaction.
pub trait UnitOfWork {
  fn persons(&self) -> &dyn PersonRepository;
  fn accounts(&self) -> &dyn AccountRepository;
  fn roles(&self) -> &dyn RoleRepository;
  fn permissions(&self) -> &dyn PermissionRepository;
  /// Keyed by account id.
  fn administrators(&self) -> &dyn Repository<Administrator>;
  fn teachers(&self) -> &dyn ProfileRepository<Teacher>;
  fn directors(&self) -> &dyn ProfileRepository<Director>;
  fn guardians(&self) -> &dyn ProfileRepository<Guardian>;
  fn students(&self) -> &dyn StudentRepository;
  fn applicants(&self) -> &dyn ApplicantRepository;
  fn recovery_codes(&self) -> &dyn RecoveryCodeRepository;
}

/// Abstraction over a Roster storage backend.
///
/// A backend opens exactly one transaction per call, runs `work` against
/// it, commits on `Ok` and rolls back on `Err`, closing the transaction on
/// every path. Units of work are never nested and never shared between
/// callers.
pub trait IdentityStore: Clone + Send + Sync + 'static {
  fn unit_of_work<T, F>(&self, work: F) -> impl Future<Output = Result<T>> + Send
  where
    T: Send + 'static,
    F: FnOnce(&dyn UnitOfWork) -> Result<T> + Send + 'static;
}
