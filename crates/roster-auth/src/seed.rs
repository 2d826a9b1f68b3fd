//! The default role and permission catalog of an institution.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct PermissionSpec {
  pub name:        String,
  pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleSpec {
  pub name:        String,
  pub description: String,
  /// Permission names; each must be declared in the catalog.
  pub permissions: Vec<String>,
}

/// Roles, permissions and grants to install.
#[derive(Debug, Clone, Deserialize)]
pub struct Catalog {
  pub permissions: Vec<PermissionSpec>,
  pub roles:       Vec<RoleSpec>,
}

const PERMISSIONS: &[(&str, &str)] = &[
  ("accounts.view", "List accounts and their roles"),
  ("accounts.manage", "Create, deactivate and reassign accounts"),
  ("roles.manage", "Edit roles and their grants"),
  ("persons.view", "Read personal records"),
  ("persons.manage", "Correct personal records"),
  ("students.view", "Read student records"),
  ("students.enroll", "Enroll students"),
  ("admissions.apply", "Submit admission applications"),
  ("admissions.review", "Review admission applications"),
  ("admissions.approve", "Approve or reject admission applications"),
  ("grades.view", "Read grades"),
  ("grades.record", "Record grades"),
  ("attendance.record", "Record attendance"),
  ("reports.view", "Read institutional reports"),
];

const ROLES: &[(&str, &str, &[&str])] = &[
  (
    "administrator",
    "System administration",
    &[
      "accounts.view",
      "accounts.manage",
      "roles.manage",
      "persons.view",
      "persons.manage",
      "students.view",
      "students.enroll",
      "admissions.review",
      "reports.view",
    ],
  ),
  (
    "director",
    "Academic direction",
    &[
      "accounts.view",
      "persons.view",
      "students.view",
      "students.enroll",
      "admissions.review",
      "admissions.approve",
      "grades.view",
      "reports.view",
    ],
  ),
  (
    "teacher",
    "Teaching staff",
    &["students.view", "grades.view", "grades.record", "attendance.record"],
  ),
  ("guardian", "Parent or legal guardian", &["grades.view", "admissions.apply"]),
];

impl Catalog {
  /// The built-in catalog: administrator, director, teacher and guardian.
  pub fn institutional() -> Self {
    Self {
      permissions: PERMISSIONS
        .iter()
        .map(|(name, description)| PermissionSpec {
          name:        (*name).to_owned(),
          description: (*description).to_owned(),
        })
        .collect(),
      roles:       ROLES
        .iter()
        .map(|(name, description, grants)| RoleSpec {
          name:        (*name).to_owned(),
          description: (*description).to_owned(),
          permissions: grants.iter().map(|g| (*g).to_owned()).collect(),
        })
        .collect(),
    }
  }
}

impl Default for Catalog {
  fn default() -> Self { Self::institutional() }
}

#[cfg(test)]
mod tests {
  use std::collections::HashSet;

  use super::*;

  #[test]
  fn every_grant_is_declared() {
    let catalog = Catalog::institutional();
    let declared: HashSet<_> = catalog.permissions.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(declared.len(), catalog.permissions.len());
    for role in &catalog.roles {
      for grant in &role.permissions {
        assert!(declared.contains(grant.as_str()), "{} grants undeclared {grant}", role.name);
      }
    }
  }

  #[test]
  fn default_roles() {
    let names: Vec<_> = Catalog::institutional().roles.into_iter().map(|r| r.name).collect();
    assert_eq!(names, ["administrator", "director", "teacher", "guardian"]);
  }
}
