//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, calendar dates are ISO 8601 dates,
//! UUIDs are hyphenated lowercase strings and enums use their `strum`
//! snake/lower-case names.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use roster_core::{
  account::{Account, AccountProfile, ProfileKind},
  person::{GovernmentId, Person},
  profile::{Administrator, Applicant, Director, Guardian, Student, Teacher},
  recovery::RecoveryCode,
  role::{Permission, Role},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn decode_opt_uuid(s: Option<&str>) -> Result<Option<Uuid>> {
  s.map(decode_uuid).transpose()
}

/// Fixed-width RFC 3339, so stored timestamps sort lexically.
pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

/// Parse any `strum`-derived enum from its column text.
pub fn decode_enum<E: FromStr>(column: &'static str, s: &str) -> Result<E> {
  s.parse().map_err(|_| Error::UnknownValue { column, value: s.to_owned() })
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const PERSON_COLUMNS: &str = "person_id, document_kind, document_number, given_names, \
   family_names, birth_date, gender, address, phone, created_at";

/// Raw strings read directly from a `persons` row.
pub struct RawPerson {
  pub person_id:       String,
  pub document_kind:   String,
  pub document_number: String,
  pub given_names:     String,
  pub family_names:    String,
  pub birth_date:      String,
  pub gender:          String,
  pub address:         Option<String>,
  pub phone:           Option<String>,
  pub created_at:      String,
}

impl RawPerson {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      person_id:       row.get(0)?,
      document_kind:   row.get(1)?,
      document_number: row.get(2)?,
      given_names:     row.get(3)?,
      family_names:    row.get(4)?,
      birth_date:      row.get(5)?,
      gender:          row.get(6)?,
      address:         row.get(7)?,
      phone:           row.get(8)?,
      created_at:      row.get(9)?,
    })
  }

  pub fn into_person(self) -> Result<Person> {
    Ok(Person {
      person_id:    decode_uuid(&self.person_id)?,
      document:     GovernmentId {
        kind:   decode_enum("document_kind", &self.document_kind)?,
        number: self.document_number,
      },
      given_names:  self.given_names,
      family_names: self.family_names,
      birth_date:   decode_date(&self.birth_date)?,
      gender:       decode_enum("gender", &self.gender)?,
      address:      self.address,
      phone:        self.phone,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

pub const ACCOUNT_COLUMNS: &str = "account_id, email, password_hash, role_id, profile_kind, \
   profile_person_id, active, deactivation_reason, created_at, last_login_at";

/// Raw values read directly from an `accounts` row.
pub struct RawAccount {
  pub account_id:          String,
  pub email:               String,
  pub password_hash:       String,
  pub role_id:             Option<String>,
  pub profile_kind:        String,
  pub profile_person_id:   Option<String>,
  pub active:              bool,
  pub deactivation_reason: Option<String>,
  pub created_at:          String,
  pub last_login_at:       Option<String>,
}

impl RawAccount {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      account_id:          row.get(0)?,
      email:               row.get(1)?,
      password_hash:       row.get(2)?,
      role_id:             row.get(3)?,
      profile_kind:        row.get(4)?,
      profile_person_id:   row.get(5)?,
      active:              row.get(6)?,
      deactivation_reason: row.get(7)?,
      created_at:          row.get(8)?,
      last_login_at:       row.get(9)?,
    })
  }

  pub fn into_account(self) -> Result<Account> {
    let kind: ProfileKind = decode_enum("profile_kind", &self.profile_kind)?;
    let person_id = decode_opt_uuid(self.profile_person_id.as_deref())?;

    Ok(Account {
      account_id:          decode_uuid(&self.account_id)?,
      email:               self.email,
      password_hash:       self.password_hash,
      role_id:             decode_opt_uuid(self.role_id.as_deref())?,
      profile:             AccountProfile::from_parts(kind, person_id)?,
      active:              self.active,
      deactivation_reason: self.deactivation_reason,
      created_at:          decode_dt(&self.created_at)?,
      last_login_at:       self.last_login_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

pub fn named_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, String, String)> {
  Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

pub fn into_role((id, name, description): (String, String, String)) -> Result<Role> {
  Ok(Role { role_id: decode_uuid(&id)?, name, description })
}

pub fn into_permission((id, name, description): (String, String, String)) -> Result<Permission> {
  Ok(Permission { permission_id: decode_uuid(&id)?, name, description })
}

pub fn administrator_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawAdministrator> {
  Ok(RawAdministrator {
    account_id:   row.get(0)?,
    given_names:  row.get(1)?,
    family_names: row.get(2)?,
    phone:        row.get(3)?,
  })
}

pub struct RawAdministrator {
  pub account_id:   String,
  pub given_names:  String,
  pub family_names: String,
  pub phone:        Option<String>,
}

impl RawAdministrator {
  pub fn into_administrator(self) -> Result<Administrator> {
    Ok(Administrator {
      account_id:   decode_uuid(&self.account_id)?,
      given_names:  self.given_names,
      family_names: self.family_names,
      phone:        self.phone,
    })
  }
}

// ─── Person-linked staff profiles ────────────────────────────────────────────

/// The common row shape of `teachers`, `directors` and `guardians`:
/// person id, account id and two role-specific detail columns.
pub struct RawProfile {
  pub person_id:  String,
  pub account_id: String,
  pub details:    [Option<String>; 2],
}

impl RawProfile {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      person_id:  row.get(0)?,
      account_id: row.get(1)?,
      details:    [row.get(2)?, row.get(3)?],
    })
  }
}

/// Table metadata and row mapping for a person-linked profile type.
pub trait ProfileTable: Sized {
  const TABLE: &'static str;
  const ENTITY: &'static str;
  /// Names of the two detail columns, in bind order.
  const DETAIL_COLUMNS: [&'static str; 2];

  fn details(&self) -> [Option<String>; 2];
  fn from_raw(raw: RawProfile) -> Result<Self>;
}

impl ProfileTable for Teacher {
  const TABLE: &'static str = "teachers";
  const ENTITY: &'static str = "teacher";
  const DETAIL_COLUMNS: [&'static str; 2] = ["specialty", "hired_on"];

  fn details(&self) -> [Option<String>; 2] {
    [self.specialty.clone(), self.hired_on.map(encode_date)]
  }

  fn from_raw(raw: RawProfile) -> Result<Self> {
    let [specialty, hired_on] = raw.details;
    Ok(Teacher {
      person_id: decode_uuid(&raw.person_id)?,
      account_id: decode_uuid(&raw.account_id)?,
      specialty,
      hired_on: hired_on.as_deref().map(decode_date).transpose()?,
    })
  }
}

impl ProfileTable for Director {
  const TABLE: &'static str = "directors";
  const ENTITY: &'static str = "director";
  const DETAIL_COLUMNS: [&'static str; 2] = ["office", "appointed_on"];

  fn details(&self) -> [Option<String>; 2] {
    [self.office.clone(), self.appointed_on.map(encode_date)]
  }

  fn from_raw(raw: RawProfile) -> Result<Self> {
    let [office, appointed_on] = raw.details;
    Ok(Director {
      person_id: decode_uuid(&raw.person_id)?,
      account_id: decode_uuid(&raw.account_id)?,
      office,
      appointed_on: appointed_on.as_deref().map(decode_date).transpose()?,
    })
  }
}

impl ProfileTable for Guardian {
  const TABLE: &'static str = "guardians";
  const ENTITY: &'static str = "guardian";
  const DETAIL_COLUMNS: [&'static str; 2] = ["occupation", "workplace"];

  fn details(&self) -> [Option<String>; 2] {
    [self.occupation.clone(), self.workplace.clone()]
  }

  fn from_raw(raw: RawProfile) -> Result<Self> {
    let [occupation, workplace] = raw.details;
    Ok(Guardian {
      person_id: decode_uuid(&raw.person_id)?,
      account_id: decode_uuid(&raw.account_id)?,
      occupation,
      workplace,
    })
  }
}

// ─── Students and applicants ─────────────────────────────────────────────────

pub struct RawStudent {
  pub person_id:       String,
  pub enrollment_code: String,
  pub grade_level:     String,
  pub guardian_id:     Option<String>,
  pub enrolled_at:     String,
}

impl RawStudent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      person_id:       row.get(0)?,
      enrollment_code: row.get(1)?,
      grade_level:     row.get(2)?,
      guardian_id:     row.get(3)?,
      enrolled_at:     row.get(4)?,
    })
  }

  pub fn into_student(self) -> Result<Student> {
    Ok(Student {
      person_id:       decode_uuid(&self.person_id)?,
      enrollment_code: self.enrollment_code,
      grade_level:     self.grade_level,
      guardian_id:     decode_opt_uuid(self.guardian_id.as_deref())?,
      enrolled_at:     decode_dt(&self.enrolled_at)?,
    })
  }
}

pub struct RawApplicant {
  pub person_id:       String,
  pub requested_grade: String,
  pub guardian_id:     Option<String>,
  pub applied_at:      String,
}

impl RawApplicant {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      person_id:       row.get(0)?,
      requested_grade: row.get(1)?,
      guardian_id:     row.get(2)?,
      applied_at:      row.get(3)?,
    })
  }

  pub fn into_applicant(self) -> Result<Applicant> {
    Ok(Applicant {
      person_id:       decode_uuid(&self.person_id)?,
      requested_grade: self.requested_grade,
      guardian_id:     decode_opt_uuid(self.guardian_id.as_deref())?,
      applied_at:      decode_dt(&self.applied_at)?,
    })
  }
}

// ─── Recovery codes ──────────────────────────────────────────────────────────

pub const RECOVERY_COLUMNS: &str =
  "code_id, account_id, code, created_at, expires_at, state, token_digest";

pub struct RawRecoveryCode {
  pub code_id:      String,
  pub account_id:   String,
  pub code:         String,
  pub created_at:   String,
  pub expires_at:   String,
  pub state:        String,
  pub token_digest: Option<String>,
}

impl RawRecoveryCode {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      code_id:      row.get(0)?,
      account_id:   row.get(1)?,
      code:         row.get(2)?,
      created_at:   row.get(3)?,
      expires_at:   row.get(4)?,
      state:        row.get(5)?,
      token_digest: row.get(6)?,
    })
  }

  pub fn into_code(self) -> Result<RecoveryCode> {
    Ok(RecoveryCode {
      code_id:      decode_uuid(&self.code_id)?,
      account_id:   decode_uuid(&self.account_id)?,
      code:         self.code,
      created_at:   decode_dt(&self.created_at)?,
      expires_at:   decode_dt(&self.expires_at)?,
      state:        decode_enum("state", &self.state)?,
      token_digest: self.token_digest,
    })
  }
}
