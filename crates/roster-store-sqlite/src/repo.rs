//! Repository facades bound to one open SQLite transaction.
//!
//! Each facade borrows the transaction's connection; none of them commits.
//! [`SqliteUnitOfWork`] bundles them behind the [`UnitOfWork`] trait.

use std::{collections::BTreeSet, marker::PhantomData};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension as _, params};
use uuid::Uuid;

use roster_core::{
  Error as CoreError,
  Result,
  account::{Account, normalize_email},
  person::{DocumentKind, Person},
  profile::{Administrator, Applicant, Director, Guardian, LinkedProfile, Student, Teacher},
  recovery::{RecoveryCode, RecoveryState},
  role::{Permission, Role},
  store::{
    AccountRepository, ApplicantRepository, PermissionRepository, PersonRepository,
    ProfileRepository, RecoveryCodeRepository, Repository, RoleRepository, StudentRepository,
    UnitOfWork,
  },
};

use crate::{
  encode::{
    ACCOUNT_COLUMNS, PERSON_COLUMNS, ProfileTable, RECOVERY_COLUMNS, RawAccount, RawApplicant,
    RawPerson, RawProfile, RawRecoveryCode, RawStudent, administrator_from_row, encode_date,
    encode_dt, encode_uuid, into_permission, into_role, named_from_row,
  },
  error::SqlResultExt as _,
};

/// Turn a zero-row UPDATE/DELETE into a not-found error.
fn expect_row(changed: usize, entity: &'static str, id: Uuid) -> Result<()> {
  if changed == 0 {
    return Err(CoreError::not_found(entity, id));
  }
  Ok(())
}

// ─── Persons ─────────────────────────────────────────────────────────────────

pub struct Persons<'t> {
  conn: &'t Connection,
}

impl Persons<'_> {
  fn select_one(&self, clause: &str, params: impl rusqlite::Params) -> Result<Option<Person>> {
    let sql = format!("SELECT {PERSON_COLUMNS} FROM persons WHERE {clause}");
    let raw = self
      .conn
      .query_row(&sql, params, RawPerson::from_row)
      .optional()
      .db()?;
    Ok(raw.map(RawPerson::into_person).transpose()?)
  }
}

impl Repository<Person> for Persons<'_> {
  fn add(&self, p: &Person) -> Result<()> {
    self
      .conn
      .execute(
        &format!("INSERT INTO persons ({PERSON_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"),
        params![
          encode_uuid(p.person_id),
          p.document.kind.as_ref(),
          p.document.number,
          p.given_names,
          p.family_names,
          encode_date(p.birth_date),
          p.gender.as_ref(),
          p.address,
          p.phone,
          encode_dt(p.created_at),
        ],
      )
      .db()?;
    Ok(())
  }

  fn get(&self, id: Uuid) -> Result<Option<Person>> {
    self.select_one("person_id = ?1", params![encode_uuid(id)])
  }

  fn get_all(&self) -> Result<Vec<Person>> {
    let mut stmt = self
      .conn
      .prepare(&format!("SELECT {PERSON_COLUMNS} FROM persons ORDER BY created_at"))
      .db()?;
    let raws = stmt
      .query_map([], RawPerson::from_row)
      .db()?
      .collect::<rusqlite::Result<Vec<_>>>()
      .db()?;
    Ok(raws.into_iter().map(RawPerson::into_person).collect::<crate::Result<_>>()?)
  }

  fn update(&self, p: &Person) -> Result<()> {
    let changed = self
      .conn
      .execute(
        "UPDATE persons SET
           document_kind = ?2, document_number = ?3, given_names = ?4, family_names = ?5,
           birth_date = ?6, gender = ?7, address = ?8, phone = ?9
         WHERE person_id = ?1",
        params![
          encode_uuid(p.person_id),
          p.document.kind.as_ref(),
          p.document.number,
          p.given_names,
          p.family_names,
          encode_date(p.birth_date),
          p.gender.as_ref(),
          p.address,
          p.phone,
        ],
      )
      .db()?;
    expect_row(changed, "person", p.person_id)
  }

  fn delete(&self, p: &Person) -> Result<()> {
    Err(CoreError::validation(format!(
      "person {} cannot be deleted; persons are permanent records",
      p.person_id
    )))
  }
}

impl PersonRepository for Persons<'_> {
  fn get_by_document_number(&self, kind: DocumentKind, number: &str) -> Result<Option<Person>> {
    self.select_one(
      "document_kind = ?1 AND document_number = ?2",
      params![kind.as_ref(), number.trim()],
    )
  }
}

// ─── Accounts ────────────────────────────────────────────────────────────────

pub struct Accounts<'t> {
  conn: &'t Connection,
}

impl Accounts<'_> {
  fn select(&self, clause: &str, params: impl rusqlite::Params) -> Result<Vec<Account>> {
    let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts {clause}");
    let mut stmt = self.conn.prepare(&sql).db()?;
    let raws = stmt
      .query_map(params, RawAccount::from_row)
      .db()?
      .collect::<rusqlite::Result<Vec<_>>>()
      .db()?;
    Ok(raws.into_iter().map(RawAccount::into_account).collect::<crate::Result<_>>()?)
  }
}

impl Repository<Account> for Accounts<'_> {
  fn add(&self, a: &Account) -> Result<()> {
    a.check_invariants()?;
    self
      .conn
      .execute(
        &format!(
          "INSERT INTO accounts ({ACCOUNT_COLUMNS}, email_key)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
        ),
        params![
          encode_uuid(a.account_id),
          a.email,
          a.password_hash,
          a.role_id.map(encode_uuid),
          a.profile.kind().as_ref(),
          a.profile.person_id().map(encode_uuid),
          a.active,
          a.deactivation_reason,
          encode_dt(a.created_at),
          a.last_login_at.map(encode_dt),
          normalize_email(&a.email),
        ],
      )
      .db()?;
    Ok(())
  }

  fn get(&self, id: Uuid) -> Result<Option<Account>> {
    Ok(self.select("WHERE account_id = ?1", params![encode_uuid(id)])?.pop())
  }

  fn get_all(&self) -> Result<Vec<Account>> { self.select("ORDER BY created_at", []) }

  fn update(&self, a: &Account) -> Result<()> {
    a.check_invariants()?;
    let changed = self
      .conn
      .execute(
        "UPDATE accounts SET
           email = ?2, password_hash = ?3, role_id = ?4, profile_kind = ?5,
           profile_person_id = ?6, active = ?7, deactivation_reason = ?8, last_login_at = ?9,
           email_key = ?10
         WHERE account_id = ?1",
        params![
          encode_uuid(a.account_id),
          a.email,
          a.password_hash,
          a.role_id.map(encode_uuid),
          a.profile.kind().as_ref(),
          a.profile.person_id().map(encode_uuid),
          a.active,
          a.deactivation_reason,
          a.last_login_at.map(encode_dt),
          normalize_email(&a.email),
        ],
      )
      .db()?;
    expect_row(changed, "account", a.account_id)
  }

  fn delete(&self, a: &Account) -> Result<()> {
    let changed = self
      .conn
      .execute("DELETE FROM accounts WHERE account_id = ?1", params![encode_uuid(a.account_id)])
      .db()?;
    expect_row(changed, "account", a.account_id)
  }
}

impl AccountRepository for Accounts<'_> {
  fn get_by_email(&self, email: &str) -> Result<Option<Account>> {
    Ok(self.select("WHERE email_key = ?1", params![normalize_email(email)])?.pop())
  }

  fn get_by_role(&self, role_id: Uuid) -> Result<Vec<Account>> {
    self.select("WHERE role_id = ?1 ORDER BY email", params![encode_uuid(role_id)])
  }

  fn record_login(&self, account_id: Uuid, at: DateTime<Utc>) -> Result<()> {
    let changed = self
      .conn
      .execute(
        "UPDATE accounts SET last_login_at = ?2 WHERE account_id = ?1",
        params![encode_uuid(account_id), encode_dt(at)],
      )
      .db()?;
    expect_row(changed, "account", account_id)
  }
}

// ─── Roles and permissions ───────────────────────────────────────────────────

pub struct Roles<'t> {
  conn: &'t Connection,
}

impl Roles<'_> {
  fn select(&self, clause: &str, params: impl rusqlite::Params) -> Result<Vec<Role>> {
    let sql = format!("SELECT role_id, name, description FROM roles {clause}");
    let mut stmt = self.conn.prepare(&sql).db()?;
    let raws = stmt
      .query_map(params, named_from_row)
      .db()?
      .collect::<rusqlite::Result<Vec<_>>>()
      .db()?;
    Ok(raws.into_iter().map(into_role).collect::<crate::Result<_>>()?)
  }
}

impl Repository<Role> for Roles<'_> {
  fn add(&self, r: &Role) -> Result<()> {
    self
      .conn
      .execute(
        "INSERT INTO roles (role_id, name, description) VALUES (?1, ?2, ?3)",
        params![encode_uuid(r.role_id), r.name, r.description],
      )
      .db()?;
    Ok(())
  }

  fn get(&self, id: Uuid) -> Result<Option<Role>> {
    Ok(self.select("WHERE role_id = ?1", params![encode_uuid(id)])?.pop())
  }

  fn get_all(&self) -> Result<Vec<Role>> { self.select("ORDER BY name", []) }

  fn update(&self, r: &Role) -> Result<()> {
    let changed = self
      .conn
      .execute(
        "UPDATE roles SET name = ?2, description = ?3 WHERE role_id = ?1",
        params![encode_uuid(r.role_id), r.name, r.description],
      )
      .db()?;
    expect_row(changed, "role", r.role_id)
  }

  fn delete(&self, r: &Role) -> Result<()> {
    let changed = self
      .conn
      .execute("DELETE FROM roles WHERE role_id = ?1", params![encode_uuid(r.role_id)])
      .db()?;
    expect_row(changed, "role", r.role_id)
  }
}

impl RoleRepository for Roles<'_> {
  fn get_by_name(&self, name: &str) -> Result<Option<Role>> {
    Ok(self.select("WHERE name = ?1", params![name])?.pop())
  }

  fn permissions_of(&self, role_id: Uuid) -> Result<BTreeSet<String>> {
    let mut stmt = self
      .conn
      .prepare(
        "SELECT p.name
         FROM roles r
         JOIN role_permissions rp ON rp.role_id = r.role_id
         JOIN permissions p       ON p.permission_id = rp.permission_id
         WHERE r.role_id = ?1",
      )
      .db()?;
    let names = stmt
      .query_map(params![encode_uuid(role_id)], |row| row.get::<_, String>(0))
      .db()?
      .collect::<rusqlite::Result<BTreeSet<_>>>()
      .db()?;
    Ok(names)
  }

  fn grant(&self, role_id: Uuid, permission_id: Uuid) -> Result<()> {
    self
      .conn
      .execute(
        "INSERT OR IGNORE INTO role_permissions (role_id, permission_id) VALUES (?1, ?2)",
        params![encode_uuid(role_id), encode_uuid(permission_id)],
      )
      .db()?;
    Ok(())
  }

  fn revoke(&self, role_id: Uuid, permission_id: Uuid) -> Result<()> {
    self
      .conn
      .execute(
        "DELETE FROM role_permissions WHERE role_id = ?1 AND permission_id = ?2",
        params![encode_uuid(role_id), encode_uuid(permission_id)],
      )
      .db()?;
    Ok(())
  }
}

pub struct Permissions<'t> {
  conn: &'t Connection,
}

impl Permissions<'_> {
  fn select(&self, clause: &str, params: impl rusqlite::Params) -> Result<Vec<Permission>> {
    let sql = format!("SELECT permission_id, name, description FROM permissions {clause}");
    let mut stmt = self.conn.prepare(&sql).db()?;
    let raws = stmt
      .query_map(params, named_from_row)
      .db()?
      .collect::<rusqlite::Result<Vec<_>>>()
      .db()?;
    Ok(raws.into_iter().map(into_permission).collect::<crate::Result<_>>()?)
  }
}

impl Repository<Permission> for Permissions<'_> {
  fn add(&self, p: &Permission) -> Result<()> {
    self
      .conn
      .execute(
        "INSERT INTO permissions (permission_id, name, description) VALUES (?1, ?2, ?3)",
        params![encode_uuid(p.permission_id), p.name, p.description],
      )
      .db()?;
    Ok(())
  }

  fn get(&self, id: Uuid) -> Result<Option<Permission>> {
    Ok(self.select("WHERE permission_id = ?1", params![encode_uuid(id)])?.pop())
  }

  fn get_all(&self) -> Result<Vec<Permission>> { self.select("ORDER BY name", []) }

  fn update(&self, p: &Permission) -> Result<()> {
    let changed = self
      .conn
      .execute(
        "UPDATE permissions SET name = ?2, description = ?3 WHERE permission_id = ?1",
        params![encode_uuid(p.permission_id), p.name, p.description],
      )
      .db()?;
    expect_row(changed, "permission", p.permission_id)
  }

  fn delete(&self, p: &Permission) -> Result<()> {
    let changed = self
      .conn
      .execute(
        "DELETE FROM permissions WHERE permission_id = ?1",
        params![encode_uuid(p.permission_id)],
      )
      .db()?;
    expect_row(changed, "permission", p.permission_id)
  }
}

impl PermissionRepository for Permissions<'_> {
  fn get_by_name(&self, name: &str) -> Result<Option<Permission>> {
    Ok(self.select("WHERE name = ?1", params![name])?.pop())
  }
}

// ─── Administrators ──────────────────────────────────────────────────────────

pub struct Administrators<'t> {
  conn: &'t Connection,
}

impl Administrators<'_> {
  fn select(&self, clause: &str, params: impl rusqlite::Params) -> Result<Vec<Administrator>> {
    let sql = format!(
      "SELECT account_id, given_names, family_names, phone FROM administrators {clause}"
    );
    let mut stmt = self.conn.prepare(&sql).db()?;
    let raws = stmt
      .query_map(params, administrator_from_row)
      .db()?
      .collect::<rusqlite::Result<Vec<_>>>()
      .db()?;
    Ok(
      raws
        .into_iter()
        .map(|raw| raw.into_administrator())
        .collect::<crate::Result<_>>()?,
    )
  }
}

impl Repository<Administrator> for Administrators<'_> {
  fn add(&self, a: &Administrator) -> Result<()> {
    self
      .conn
      .execute(
        "INSERT INTO administrators (account_id, given_names, family_names, phone)
         VALUES (?1, ?2, ?3, ?4)",
        params![encode_uuid(a.account_id), a.given_names, a.family_names, a.phone],
      )
      .db()?;
    Ok(())
  }

  fn get(&self, id: Uuid) -> Result<Option<Administrator>> {
    Ok(self.select("WHERE account_id = ?1", params![encode_uuid(id)])?.pop())
  }

  fn get_all(&self) -> Result<Vec<Administrator>> {
    self.select("ORDER BY family_names, given_names", [])
  }

  fn update(&self, a: &Administrator) -> Result<()> {
    let changed = self
      .conn
      .execute(
        "UPDATE administrators SET given_names = ?2, family_names = ?3, phone = ?4
         WHERE account_id = ?1",
        params![encode_uuid(a.account_id), a.given_names, a.family_names, a.phone],
      )
      .db()?;
    expect_row(changed, "administrator", a.account_id)
  }

  fn delete(&self, a: &Administrator) -> Result<()> {
    let changed = self
      .conn
      .execute(
        "DELETE FROM administrators WHERE account_id = ?1",
        params![encode_uuid(a.account_id)],
      )
      .db()?;
    expect_row(changed, "administrator", a.account_id)
  }
}

// ─── Person-linked profiles ──────────────────────────────────────────────────

/// One facade type serves teachers, directors and guardians; the table and
/// detail columns come from [`ProfileTable`].
pub struct Profiles<'t, P> {
  conn:    &'t Connection,
  _marker: PhantomData<P>,
}

impl<'t, P> Profiles<'t, P> {
  fn new(conn: &'t Connection) -> Self { Self { conn, _marker: PhantomData } }
}

impl<P: ProfileTable + LinkedProfile> Profiles<'_, P> {
  fn select(&self, clause: &str, params: impl rusqlite::Params) -> Result<Vec<P>> {
    let [a, b] = P::DETAIL_COLUMNS;
    let sql = format!("SELECT person_id, account_id, {a}, {b} FROM {} {clause}", P::TABLE);
    let mut stmt = self.conn.prepare(&sql).db()?;
    let raws = stmt
      .query_map(params, RawProfile::from_row)
      .db()?
      .collect::<rusqlite::Result<Vec<_>>>()
      .db()?;
    Ok(raws.into_iter().map(P::from_raw).collect::<crate::Result<_>>()?)
  }
}

impl<P: ProfileTable + LinkedProfile> Repository<P> for Profiles<'_, P> {
  fn add(&self, p: &P) -> Result<()> {
    let [a, b] = P::DETAIL_COLUMNS;
    let [d0, d1] = p.details();
    self
      .conn
      .execute(
        &format!(
          "INSERT INTO {} (person_id, account_id, {a}, {b}) VALUES (?1, ?2, ?3, ?4)",
          P::TABLE
        ),
        params![encode_uuid(p.person_id()), encode_uuid(p.account_id()), d0, d1],
      )
      .db()?;
    Ok(())
  }

  fn get(&self, id: Uuid) -> Result<Option<P>> {
    Ok(self.select("WHERE person_id = ?1", params![encode_uuid(id)])?.pop())
  }

  fn get_all(&self) -> Result<Vec<P>> { self.select("", []) }

  fn update(&self, p: &P) -> Result<()> {
    let [a, b] = P::DETAIL_COLUMNS;
    let [d0, d1] = p.details();
    let changed = self
      .conn
      .execute(
        &format!(
          "UPDATE {} SET account_id = ?2, {a} = ?3, {b} = ?4 WHERE person_id = ?1",
          P::TABLE
        ),
        params![encode_uuid(p.person_id()), encode_uuid(p.account_id()), d0, d1],
      )
      .db()?;
    expect_row(changed, P::ENTITY, p.person_id())
  }

  fn delete(&self, p: &P) -> Result<()> {
    let changed = self
      .conn
      .execute(
        &format!("DELETE FROM {} WHERE person_id = ?1", P::TABLE),
        params![encode_uuid(p.person_id())],
      )
      .db()?;
    expect_row(changed, P::ENTITY, p.person_id())
  }
}

impl<P: ProfileTable + LinkedProfile> ProfileRepository<P> for Profiles<'_, P> {
  fn get_by_account(&self, account_id: Uuid) -> Result<Option<P>> {
    Ok(self.select("WHERE account_id = ?1", params![encode_uuid(account_id)])?.pop())
  }
}

// ─── Students and applicants ─────────────────────────────────────────────────

pub struct Students<'t> {
  conn: &'t Connection,
}

impl Students<'_> {
  fn select(&self, clause: &str, params: impl rusqlite::Params) -> Result<Vec<Student>> {
    let sql = format!(
      "SELECT person_id, enrollment_code, grade_level, guardian_id, enrolled_at
       FROM students {clause}"
    );
    let mut stmt = self.conn.prepare(&sql).db()?;
    let raws = stmt
      .query_map(params, RawStudent::from_row)
      .db()?
      .collect::<rusqlite::Result<Vec<_>>>()
      .db()?;
    Ok(raws.into_iter().map(RawStudent::into_student).collect::<crate::Result<_>>()?)
  }
}

impl Repository<Student> for Students<'_> {
  fn add(&self, s: &Student) -> Result<()> {
    self
      .conn
      .execute(
        "INSERT INTO students (person_id, enrollment_code, grade_level, guardian_id, enrolled_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
          encode_uuid(s.person_id),
          s.enrollment_code,
          s.grade_level,
          s.guardian_id.map(encode_uuid),
          encode_dt(s.enrolled_at),
        ],
      )
      .db()?;
    Ok(())
  }

  fn get(&self, id: Uuid) -> Result<Option<Student>> {
    Ok(self.select("WHERE person_id = ?1", params![encode_uuid(id)])?.pop())
  }

  fn get_all(&self) -> Result<Vec<Student>> { self.select("ORDER BY enrollment_code", []) }

  fn update(&self, s: &Student) -> Result<()> {
    let changed = self
      .conn
      .execute(
        "UPDATE students SET enrollment_code = ?2, grade_level = ?3, guardian_id = ?4
         WHERE person_id = ?1",
        params![
          encode_uuid(s.person_id),
          s.enrollment_code,
          s.grade_level,
          s.guardian_id.map(encode_uuid),
        ],
      )
      .db()?;
    expect_row(changed, "student", s.person_id)
  }

  fn delete(&self, s: &Student) -> Result<()> {
    let changed = self
      .conn
      .execute("DELETE FROM students WHERE person_id = ?1", params![encode_uuid(s.person_id)])
      .db()?;
    expect_row(changed, "student", s.person_id)
  }
}

impl StudentRepository for Students<'_> {
  fn get_by_guardian(&self, guardian_id: Uuid) -> Result<Vec<Student>> {
    self.select(
      "WHERE guardian_id = ?1 ORDER BY enrollment_code",
      params![encode_uuid(guardian_id)],
    )
  }
}

pub struct Applicants<'t> {
  conn: &'t Connection,
}

impl Applicants<'_> {
  fn select(&self, clause: &str, params: impl rusqlite::Params) -> Result<Vec<Applicant>> {
    let sql = format!(
      "SELECT person_id, requested_grade, guardian_id, applied_at FROM applicants {clause}"
    );
    let mut stmt = self.conn.prepare(&sql).db()?;
    let raws = stmt
      .query_map(params, RawApplicant::from_row)
      .db()?
      .collect::<rusqlite::Result<Vec<_>>>()
      .db()?;
    Ok(raws.into_iter().map(RawApplicant::into_applicant).collect::<crate::Result<_>>()?)
  }
}

impl Repository<Applicant> for Applicants<'_> {
  fn add(&self, a: &Applicant) -> Result<()> {
    self
      .conn
      .execute(
        "INSERT INTO applicants (person_id, requested_grade, guardian_id, applied_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
          encode_uuid(a.person_id),
          a.requested_grade,
          a.guardian_id.map(encode_uuid),
          encode_dt(a.applied_at),
        ],
      )
      .db()?;
    Ok(())
  }

  fn get(&self, id: Uuid) -> Result<Option<Applicant>> {
    Ok(self.select("WHERE person_id = ?1", params![encode_uuid(id)])?.pop())
  }

  fn get_all(&self) -> Result<Vec<Applicant>> { self.select("ORDER BY applied_at", []) }

  fn update(&self, a: &Applicant) -> Result<()> {
    let changed = self
      .conn
      .execute(
        "UPDATE applicants SET requested_grade = ?2, guardian_id = ?3 WHERE person_id = ?1",
        params![encode_uuid(a.person_id), a.requested_grade, a.guardian_id.map(encode_uuid)],
      )
      .db()?;
    expect_row(changed, "applicant", a.person_id)
  }

  fn delete(&self, a: &Applicant) -> Result<()> {
    let changed = self
      .conn
      .execute("DELETE FROM applicants WHERE person_id = ?1", params![encode_uuid(a.person_id)])
      .db()?;
    expect_row(changed, "applicant", a.person_id)
  }
}

impl ApplicantRepository for Applicants<'_> {
  fn get_by_guardian(&self, guardian_id: Uuid) -> Result<Vec<Applicant>> {
    self.select("WHERE guardian_id = ?1 ORDER BY applied_at", params![encode_uuid(guardian_id)])
  }
}

// ─── Recovery codes ──────────────────────────────────────────────────────────

pub struct RecoveryCodes<'t> {
  conn: &'t Connection,
}

impl RecoveryCodes<'_> {
  fn select(&self, clause: &str, params: impl rusqlite::Params) -> Result<Vec<RecoveryCode>> {
    let sql = format!("SELECT {RECOVERY_COLUMNS} FROM recovery_codes {clause}");
    let mut stmt = self.conn.prepare(&sql).db()?;
    let raws = stmt
      .query_map(params, RawRecoveryCode::from_row)
      .db()?
      .collect::<rusqlite::Result<Vec<_>>>()
      .db()?;
    Ok(raws.into_iter().map(RawRecoveryCode::into_code).collect::<crate::Result<_>>()?)
  }
}

impl Repository<RecoveryCode> for RecoveryCodes<'_> {
  fn add(&self, c: &RecoveryCode) -> Result<()> {
    self
      .conn
      .execute(
        &format!("INSERT INTO recovery_codes ({RECOVERY_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
        params![
          encode_uuid(c.code_id),
          encode_uuid(c.account_id),
          c.code,
          encode_dt(c.created_at),
          encode_dt(c.expires_at),
          c.state.as_ref(),
          c.token_digest,
        ],
      )
      .db()?;
    Ok(())
  }

  fn get(&self, id: Uuid) -> Result<Option<RecoveryCode>> {
    Ok(self.select("WHERE code_id = ?1", params![encode_uuid(id)])?.pop())
  }

  fn get_all(&self) -> Result<Vec<RecoveryCode>> { self.select("ORDER BY created_at", []) }

  fn update(&self, c: &RecoveryCode) -> Result<()> {
    let changed = self
      .conn
      .execute(
        "UPDATE recovery_codes SET code = ?2, expires_at = ?3, state = ?4, token_digest = ?5
         WHERE code_id = ?1",
        params![
          encode_uuid(c.code_id),
          c.code,
          encode_dt(c.expires_at),
          c.state.as_ref(),
          c.token_digest,
        ],
      )
      .db()?;
    expect_row(changed, "recovery code", c.code_id)
  }

  fn delete(&self, c: &RecoveryCode) -> Result<()> {
    let changed = self
      .conn
      .execute("DELETE FROM recovery_codes WHERE code_id = ?1", params![encode_uuid(c.code_id)])
      .db()?;
    expect_row(changed, "recovery code", c.code_id)
  }
}

impl RecoveryCodeRepository for RecoveryCodes<'_> {
  fn active_for(&self, account_id: Uuid) -> Result<Option<RecoveryCode>> {
    Ok(
      self
        .select(
          "WHERE account_id = ?1 AND state = ?2",
          params![encode_uuid(account_id), RecoveryState::Active.as_ref()],
        )?
        .pop(),
    )
  }

  fn expire_active(&self, account_id: Uuid) -> Result<usize> {
    let changed = self
      .conn
      .execute(
        "UPDATE recovery_codes SET state = ?2 WHERE account_id = ?1 AND state = ?3",
        params![
          encode_uuid(account_id),
          RecoveryState::Expired.as_ref(),
          RecoveryState::Active.as_ref(),
        ],
      )
      .db()?;
    Ok(changed)
  }

  fn get_by_token_digest(&self, digest: &str) -> Result<Option<RecoveryCode>> {
    Ok(self.select("WHERE token_digest = ?1", params![digest])?.pop())
  }

  fn list_for(&self, account_id: Uuid) -> Result<Vec<RecoveryCode>> {
    self.select("WHERE account_id = ?1 ORDER BY created_at, rowid", params![encode_uuid(account_id)])
  }
}

// ─── Unit of Work ────────────────────────────────────────────────────────────

/// All repository facades over one transaction.
pub struct SqliteUnitOfWork<'t> {
  persons:        Persons<'t>,
  accounts:       Accounts<'t>,
  roles:          Roles<'t>,
  permissions:    Permissions<'t>,
  administrators: Administrators<'t>,
  teachers:       Profiles<'t, Teacher>,
  directors:      Profiles<'t, Director>,
  guardians:      Profiles<'t, Guardian>,
  students:       Students<'t>,
  applicants:     Applicants<'t>,
  recovery_codes: RecoveryCodes<'t>,
}

impl<'t> SqliteUnitOfWork<'t> {
  pub fn new(conn: &'t Connection) -> Self {
    Self {
      persons:        Persons { conn },
      accounts:       Accounts { conn },
      roles:          Roles { conn },
      permissions:    Permissions { conn },
      administrators: Administrators { conn },
      teachers:       Profiles::new(conn),
      directors:      Profiles::new(conn),
      guardians:      Profiles::new(conn),
      students:       Students { conn },
      applicants:     Applicants { conn },
      recovery_codes: RecoveryCodes { conn },
    }
  }
}

impl UnitOfWork for SqliteUnitOfWork<'_> {
  fn persons(&self) -> &dyn PersonRepository { &self.persons }

  fn accounts(&self) -> &dyn AccountRepository { &self.accounts }

  fn roles(&self) -> &dyn RoleRepository { &self.roles }

  fn permissions(&self) -> &dyn PermissionRepository { &self.permissions }

  fn administrators(&self) -> &dyn Repository<Administrator> { &self.administrators }

  fn teachers(&self) -> &dyn ProfileRepository<Teacher> { &self.teachers }

  fn directors(&self) -> &dyn ProfileRepository<Director> { &self.directors }

  fn guardians(&self) -> &dyn ProfileRepository<Guardian> { &self.guardians }

  fn students(&self) -> &dyn StudentRepository { &self.students }

  fn applicants(&self) -> &dyn ApplicantRepository { &self.applicants }

  fn recovery_codes(&self) -> &dyn RecoveryCodeRepository { &self.recovery_codes }
}
