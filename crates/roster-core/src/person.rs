//! Person — the biographical record behind every human the institution
//! tracks.
//!
//! A person is created once and rarely changed. Persons are never deleted;
//! role-type records (teacher, student, …) reference them by id.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

/// The kind of government document that identifies a person.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DocumentKind {
  NationalId,
  Passport,
  ResidencePermit,
  BirthCertificate,
}

/// A government-issued identifier. `(kind, number)` is unique across the
/// store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GovernmentId {
  pub kind:   DocumentKind,
  pub number: String,
}

impl GovernmentId {
  pub fn new(kind: DocumentKind, number: impl Into<String>) -> Self {
    Self { kind, number: number.into().trim().to_owned() }
  }
}

impl std::fmt::Display for GovernmentId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}:{}", self.kind, self.number)
  }
}

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
pub enum Gender {
  Female,
  Male,
  Other,
  Undisclosed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
  pub person_id:     Uuid,
  pub document:      GovernmentId,
  pub given_names:   String,
  pub family_names:  String,
  pub birth_date:    NaiveDate,
  pub gender:        Gender,
  pub address:       Option<String>,
  pub phone:         Option<String>,
  pub created_at:    DateTime<Utc>,
}

impl Person {
  pub fn full_name(&self) -> String {
    format!("{} {}", self.given_names, self.family_names)
  }
}

/// Input for registering a person. Ids and timestamps are assigned on
/// [`NewPerson::into_person`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPerson {
  pub document:     GovernmentId,
  pub given_names:  String,
  pub family_names: String,
  pub birth_date:   NaiveDate,
  pub gender:       Gender,
  #[serde(default)]
  pub address:      Option<String>,
  #[serde(default)]
  pub phone:        Option<String>,
}

impl NewPerson {
  /// Reject records that could never be stored meaningfully.
  pub fn validate(&self) -> Result<()> {
    if self.document.number.is_empty() {
      return Err(Error::validation("document number must not be empty"));
    }
    if self.given_names.trim().is_empty() || self.family_names.trim().is_empty() {
      return Err(Error::validation("given and family names are required"));
    }
    Ok(())
  }

  pub fn into_person(self) -> Person {
    Person {
      person_id:    Uuid::new_v4(),
      document:     self.document,
      given_names:  self.given_names.trim().to_owned(),
      family_names: self.family_names.trim().to_owned(),
      birth_date:   self.birth_date,
      gender:       self.gender,
      address:      self.address,
      phone:        self.phone,
      created_at:   Utc::now(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample() -> NewPerson {
    NewPerson {
      document:     GovernmentId::new(DocumentKind::NationalId, " 0102030405 "),
      given_names:  "Ana".into(),
      family_names: "Torres".into(),
      birth_date:   NaiveDate::from_ymd_opt(1984, 3, 9).unwrap(),
      gender:       Gender::Female,
      address:      None,
      phone:        None,
    }
  }

  #[test]
  fn document_number_is_trimmed() {
    assert_eq!(sample().document.number, "0102030405");
    assert_eq!(sample().document.to_string(), "national_id:0102030405");
  }

  #[test]
  fn blank_names_are_rejected() {
    let mut input = sample();
    input.family_names = "  ".into();
    assert!(matches!(input.validate(), Err(Error::Validation(_))));
  }

  #[test]
  fn document_kind_parses_from_storage_form() {
    let kind: DocumentKind = "residence_permit".parse().unwrap();
    assert_eq!(kind, DocumentKind::ResidencePermit);
    assert_eq!(DocumentKind::BirthCertificate.as_ref(), "birth_certificate");
  }
}
