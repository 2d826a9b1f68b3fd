//! Role-type profiles.
//!
//! - [`Administrator`] shares its id with the owning [`Account`].
//! - [`Teacher`], [`Director`] and [`Guardian`] are keyed by a
//!   [`Person`](crate::person::Person) and hold a reference to their account.
//! - [`Student`] and [`Applicant`] are keyed by a person and never have an
//!   account.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  account::{Account, ProfileKind},
  person::Person,
};

// ─── Account-linked profiles ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Administrator {
  /// Same value as the owning account's id.
  pub account_id:   Uuid,
  pub given_names:  String,
  pub family_names: String,
  pub phone:        Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
  pub person_id:  Uuid,
  pub account_id: Uuid,
  pub specialty:  Option<String>,
  pub hired_on:   Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Director {
  pub person_id:    Uuid,
  pub account_id:   Uuid,
  pub office:       Option<String>,
  pub appointed_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guardian {
  pub person_id:  Uuid,
  pub account_id: Uuid,
  pub occupation: Option<String>,
  pub workplace:  Option<String>,
}

/// A profile that lives on a person and references an account.
pub trait LinkedProfile {
  const KIND: ProfileKind;

  fn person_id(&self) -> Uuid;
  fn account_id(&self) -> Uuid;
}

macro_rules! linked_profile {
  ($ty:ty, $kind:expr) => {
    impl LinkedProfile for $ty {
      const KIND: ProfileKind = $kind;

      fn person_id(&self) -> Uuid { self.person_id }

      fn account_id(&self) -> Uuid { self.account_id }
    }
  };
}

linked_profile!(Teacher, ProfileKind::Teacher);
linked_profile!(Director, ProfileKind::Director);
linked_profile!(Guardian, ProfileKind::Guardian);

/// Role-specific details supplied when registering staff.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StaffDetails {
  Teacher {
    specialty: Option<String>,
    hired_on:  Option<NaiveDate>,
  },
  Director {
    office:       Option<String>,
    appointed_on: Option<NaiveDate>,
  },
  Guardian {
    occupation: Option<String>,
    workplace:  Option<String>,
  },
}

impl StaffDetails {
  pub fn kind(&self) -> ProfileKind {
    match self {
      Self::Teacher { .. } => ProfileKind::Teacher,
      Self::Director { .. } => ProfileKind::Director,
      Self::Guardian { .. } => ProfileKind::Guardian,
    }
  }
}

// ─── Person-only profiles ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
  pub person_id:       Uuid,
  /// Unique institutional enrollment code.
  pub enrollment_code: String,
  pub grade_level:     String,
  /// Person id of the responsible guardian, if registered.
  pub guardian_id:     Option<Uuid>,
  pub enrolled_at:     DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Applicant {
  pub person_id:       Uuid,
  pub requested_grade: String,
  pub guardian_id:     Option<Uuid>,
  pub applied_at:      DateTime<Utc>,
}

// ─── Resolution result ───────────────────────────────────────────────────────

/// The concrete role-type bound to an authenticated account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResolvedProfile {
  /// The account has no profile; display name falls back to the email.
  None,
  Administrator(Administrator),
  Teacher { person: Person, teacher: Teacher },
  Director { person: Person, director: Director },
  Guardian { person: Person, guardian: Guardian },
}

impl ResolvedProfile {
  pub fn kind(&self) -> ProfileKind {
    match self {
      Self::None => ProfileKind::None,
      Self::Administrator(_) => ProfileKind::Administrator,
      Self::Teacher { .. } => ProfileKind::Teacher,
      Self::Director { .. } => ProfileKind::Director,
      Self::Guardian { .. } => ProfileKind::Guardian,
    }
  }

  pub fn display_name(&self, account: &Account) -> String {
    match self {
      Self::None => account.email.clone(),
      Self::Administrator(admin) => {
        format!("{} {}", admin.given_names, admin.family_names)
      }
      Self::Teacher { person, .. }
      | Self::Director { person, .. }
      | Self::Guardian { person, .. } => person.full_name(),
    }
  }
}
