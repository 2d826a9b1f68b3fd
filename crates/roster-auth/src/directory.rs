//! Provisioning: the catalog of roles and permissions, and registration of
//! the people and accounts that use it.
//!
//! Every operation here is a single unit of work. A registration either
//! leaves a complete person/account/profile triple behind or nothing.

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use roster_core::{
  AuthFailure, Error, Result,
  account::{Account, AccountProfile},
  person::{GovernmentId, NewPerson, Person},
  profile::{Administrator, Applicant, Director, Guardian, StaffDetails, Student, Teacher},
  role::{Permission, Role},
  store::{IdentityStore, UnitOfWork},
};

use crate::{
  authentication::validate_email,
  password::{CredentialHasher, PasswordPolicy},
  seed::Catalog,
};

// ─── Inputs ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct NewAdministrator {
  pub email:        String,
  pub password:     String,
  pub given_names:  String,
  pub family_names: String,
  #[serde(default)]
  pub phone:        Option<String>,
}

/// A teacher, director or guardian with a login.
#[derive(Debug, Clone, Deserialize)]
pub struct NewStaff {
  pub email:    String,
  pub password: String,
  pub person:   NewPerson,
  pub details:  StaffDetails,
  /// Defaults to the role named after the profile kind.
  #[serde(default)]
  pub role:     Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewStudent {
  pub person:          NewPerson,
  pub enrollment_code: String,
  pub grade_level:     String,
  /// Government ID of an already registered guardian.
  #[serde(default)]
  pub guardian:        Option<GovernmentId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewApplicant {
  pub person:          NewPerson,
  pub requested_grade: String,
  #[serde(default)]
  pub guardian:        Option<GovernmentId>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CatalogReport {
  pub permissions_created: usize,
  pub roles_created:       usize,
  pub grants:              usize,
}

// ─── Unit-of-work helpers ────────────────────────────────────────────────────

fn role_named(uow: &dyn UnitOfWork, name: &str) -> Result<Role> {
  uow.roles().get_by_name(name)?.ok_or_else(|| Error::not_found("role", name))
}

fn account_by_email(uow: &dyn UnitOfWork, email: &str) -> Result<Account> {
  uow.accounts().get_by_email(email)?.ok_or_else(|| Error::not_found("account", email))
}

/// The stored person with this government ID, or a newly added one.
fn find_or_add_person(uow: &dyn UnitOfWork, new: NewPerson) -> Result<Person> {
  let existing = uow
    .persons()
    .get_by_document_number(new.document.kind, &new.document.number)?;
  match existing {
    Some(person) => Ok(person),
    None => {
      let person = new.into_person();
      uow.persons().add(&person)?;
      Ok(person)
    }
  }
}

/// Person id of the registered guardian holding `document`.
fn guardian_person(uow: &dyn UnitOfWork, document: Option<&GovernmentId>) -> Result<Option<Uuid>> {
  let Some(document) = document else { return Ok(None) };
  let person = uow
    .persons()
    .get_by_document_number(document.kind, &document.number)?
    .ok_or_else(|| Error::not_found("guardian", document))?;
  uow
    .guardians()
    .get(person.person_id)?
    .ok_or_else(|| Error::not_found("guardian", document))?;
  Ok(Some(person.person_id))
}

// ─── Service ─────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct Directory<S> {
  store:  S,
  hasher: CredentialHasher,
  policy: PasswordPolicy,
}

impl<S: IdentityStore> Directory<S> {
  pub fn new(store: S, hasher: CredentialHasher, policy: PasswordPolicy) -> Self {
    Self { store, hasher, policy }
  }

  /// Create whatever part of `catalog` is missing. Safe to run repeatedly.
  pub async fn install_catalog(&self, catalog: Catalog) -> Result<CatalogReport> {
    let report = self
      .store
      .unit_of_work(move |uow| {
        let mut report = CatalogReport::default();

        for spec in &catalog.permissions {
          if uow.permissions().get_by_name(&spec.name)?.is_none() {
            uow.permissions().add(&Permission::new(&spec.name, &spec.description))?;
            report.permissions_created += 1;
          }
        }

        for spec in &catalog.roles {
          let role = match uow.roles().get_by_name(&spec.name)? {
            Some(role) => role,
            None => {
              let role = Role::new(&spec.name, &spec.description);
              uow.roles().add(&role)?;
              report.roles_created += 1;
              role
            }
          };
          for name in &spec.permissions {
            let permission = uow
              .permissions()
              .get_by_name(name)?
              .ok_or_else(|| Error::not_found("permission", name))?;
            uow.roles().grant(role.role_id, permission.permission_id)?;
            report.grants += 1;
          }
        }

        Ok(report)
      })
      .await?;

    info!(
      permissions = report.permissions_created,
      roles = report.roles_created,
      grants = report.grants,
      "catalog installed"
    );
    Ok(report)
  }

  fn prepare_credentials(&self, email: &str, password: &str) -> Result<String> {
    validate_email(email)?;
    self.policy.check(password)?;
    self.hasher.hash(password)
  }

  pub async fn register_administrator(&self, new: NewAdministrator) -> Result<Account> {
    let hash = self.prepare_credentials(&new.email, &new.password)?;
    if new.given_names.trim().is_empty() || new.family_names.trim().is_empty() {
      return Err(Error::validation("given and family names are required"));
    }

    let account = self
      .store
      .unit_of_work(move |uow| {
        let role = role_named(uow, "administrator")?;
        let account =
          Account::new(new.email, hash, Some(role.role_id), AccountProfile::Administrator);
        uow.accounts().add(&account)?;
        uow.administrators().add(&Administrator {
          account_id:   account.account_id,
          given_names:  new.given_names.trim().to_owned(),
          family_names: new.family_names.trim().to_owned(),
          phone:        new.phone,
        })?;
        Ok(account)
      })
      .await?;

    info!(account = %account.account_id, "administrator registered");
    Ok(account)
  }

  /// Register a teacher, director or guardian. An existing person with the
  /// same government ID is reused.
  pub async fn register_staff(&self, new: NewStaff) -> Result<(Account, Person)> {
    let hash = self.prepare_credentials(&new.email, &new.password)?;
    new.person.validate()?;
    let kind = new.details.kind();
    let role_name = new.role.unwrap_or_else(|| kind.to_string());

    let (account, person) = self
      .store
      .unit_of_work(move |uow| {
        let role = role_named(uow, &role_name)?;
        let person = find_or_add_person(uow, new.person)?;
        let person_id = person.person_id;

        let profile = match &new.details {
          StaffDetails::Teacher { .. } => AccountProfile::Teacher(person_id),
          StaffDetails::Director { .. } => AccountProfile::Director(person_id),
          StaffDetails::Guardian { .. } => AccountProfile::Guardian(person_id),
        };
        let account = Account::new(new.email, hash, Some(role.role_id), profile);
        uow.accounts().add(&account)?;
        let account_id = account.account_id;

        match new.details {
          StaffDetails::Teacher { specialty, hired_on } => uow
            .teachers()
            .add(&Teacher { person_id, account_id, specialty, hired_on })?,
          StaffDetails::Director { office, appointed_on } => uow
            .directors()
            .add(&Director { person_id, account_id, office, appointed_on })?,
          StaffDetails::Guardian { occupation, workplace } => uow
            .guardians()
            .add(&Guardian { person_id, account_id, occupation, workplace })?,
        }
        Ok((account, person))
      })
      .await?;

    info!(account = %account.account_id, person = %person.person_id, %kind, "staff registered");
    Ok((account, person))
  }

  pub async fn register_student(&self, new: NewStudent) -> Result<Student> {
    new.person.validate()?;
    let enrollment_code = new.enrollment_code.trim().to_owned();
    if enrollment_code.is_empty() {
      return Err(Error::validation("enrollment code is required"));
    }

    let student = self
      .store
      .unit_of_work(move |uow| {
        let guardian_id = guardian_person(uow, new.guardian.as_ref())?;
        let person = find_or_add_person(uow, new.person)?;
        let student = Student {
          person_id: person.person_id,
          enrollment_code,
          grade_level: new.grade_level,
          guardian_id,
          enrolled_at: chrono::Utc::now(),
        };
        uow.students().add(&student)?;
        Ok(student)
      })
      .await?;

    info!(person = %student.person_id, code = %student.enrollment_code, "student enrolled");
    Ok(student)
  }

  pub async fn register_applicant(&self, new: NewApplicant) -> Result<Applicant> {
    new.person.validate()?;

    let applicant = self
      .store
      .unit_of_work(move |uow| {
        let guardian_id = guardian_person(uow, new.guardian.as_ref())?;
        let person = find_or_add_person(uow, new.person)?;
        let applicant = Applicant {
          person_id: person.person_id,
          requested_grade: new.requested_grade,
          guardian_id,
          applied_at: chrono::Utc::now(),
        };
        uow.applicants().add(&applicant)?;
        Ok(applicant)
      })
      .await?;

    info!(person = %applicant.person_id, "applicant registered");
    Ok(applicant)
  }

  pub async fn assign_role(&self, email: &str, role_name: &str) -> Result<Account> {
    validate_email(email)?;
    let email = email.trim().to_owned();
    let name = role_name.trim().to_owned();

    let account = self
      .store
      .unit_of_work(move |uow| {
        let role = role_named(uow, &name)?;
        let mut account = account_by_email(uow, &email)?;
        account.role_id = Some(role.role_id);
        uow.accounts().update(&account)?;
        Ok(account)
      })
      .await?;

    info!(account = %account.account_id, role = %role_name.trim(), "role assigned");
    Ok(account)
  }

  /// Deactivate the account and expire its active recovery code.
  pub async fn deactivate_account(&self, email: &str, reason: &str) -> Result<Account> {
    validate_email(email)?;
    let email = email.trim().to_owned();
    let reason = reason.to_owned();

    let account = self
      .store
      .unit_of_work(move |uow| {
        let mut account = account_by_email(uow, &email)?;
        account.deactivate(&reason)?;
        uow.accounts().update(&account)?;
        uow.recovery_codes().expire_active(account.account_id)?;
        Ok(account)
      })
      .await?;

    info!(account = %account.account_id, "account deactivated");
    Ok(account)
  }

  pub async fn reactivate_account(&self, email: &str) -> Result<Account> {
    validate_email(email)?;
    let email = email.trim().to_owned();

    let account = self
      .store
      .unit_of_work(move |uow| {
        let mut account = account_by_email(uow, &email)?;
        account.reactivate();
        uow.accounts().update(&account)?;
        Ok(account)
      })
      .await?;

    info!(account = %account.account_id, "account reactivated");
    Ok(account)
  }

  /// Replace a password the caller still knows.
  pub async fn change_password(
    &self,
    email: &str,
    current: &str,
    new_secret: &str,
    confirmation: &str,
  ) -> Result<()> {
    validate_email(email)?;
    self.policy.check_confirmed(new_secret, confirmation)?;
    let email = email.trim().to_owned();
    let current = current.to_owned();
    let new_hash = self.hasher.hash(new_secret)?;
    let hasher = self.hasher.clone();

    let account_id = self
      .store
      .unit_of_work(move |uow| {
        let mut account = uow
          .accounts()
          .get_by_email(&email)?
          .ok_or(AuthFailure::NotFound)?;
        if !hasher.verify(&current, &account.password_hash)? {
          return Err(AuthFailure::BadCredential.into());
        }
        account.password_hash = new_hash;
        uow.accounts().update(&account)?;
        Ok(account.account_id)
      })
      .await?;

    info!(account = %account_id, "password changed");
    Ok(())
  }
}
