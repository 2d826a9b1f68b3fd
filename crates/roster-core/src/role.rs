//! Roles and permissions. Grants live in the `role_permissions` junction.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named category of accounts, e.g. `director`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
  pub role_id:     Uuid,
  pub name:        String,
  pub description: String,
}

impl Role {
  pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
    Self {
      role_id:     Uuid::new_v4(),
      name:        name.into(),
      description: description.into(),
    }
  }
}

/// An atomic named capability, e.g. `grades.record`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
  pub permission_id: Uuid,
  pub name:          String,
  pub description:   String,
}

impl Permission {
  pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
    Self {
      permission_id: Uuid::new_v4(),
      name:          name.into(),
      description:   description.into(),
    }
  }
}
