//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{Duration, NaiveDate};
use roster_core::{
  Error as CoreError,
  account::{Account, AccountProfile},
  person::{DocumentKind, Gender, GovernmentId, NewPerson, Person},
  profile::{Administrator, Student, Teacher},
  recovery::{RecoveryCode, RecoveryState},
  role::{Permission, Role},
  store::IdentityStore,
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn person(number: &str) -> Person {
  NewPerson {
    document:     GovernmentId::new(DocumentKind::NationalId, number),
    given_names:  "Lucía".into(),
    family_names: "Paredes".into(),
    birth_date:   NaiveDate::from_ymd_opt(1990, 5, 17).unwrap(),
    gender:       Gender::Female,
    address:      Some("Av. Central 12".into()),
    phone:        None,
  }
  .into_person()
}

fn account(email: &str) -> Account {
  Account::new(email, "$argon2id$placeholder", None, AccountProfile::None)
}

// ─── Persons ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_person() {
  let s = store().await;
  let p = person("0911111111");
  let id = p.person_id;

  s.unit_of_work(move |uow| uow.persons().add(&p)).await.unwrap();

  let fetched = s
    .unit_of_work(move |uow| uow.persons().get(id))
    .await
    .unwrap()
    .expect("person exists");
  assert_eq!(fetched.person_id, id);
  assert_eq!(fetched.document.number, "0911111111");
  assert_eq!(fetched.gender, Gender::Female);
  assert_eq!(fetched.address.as_deref(), Some("Av. Central 12"));
}

#[tokio::test]
async fn duplicate_government_id_conflicts() {
  let s = store().await;
  let first = person("0922222222");
  s.unit_of_work(move |uow| uow.persons().add(&first)).await.unwrap();

  let second = person("0922222222");
  let err = s
    .unit_of_work(move |uow| uow.persons().add(&second))
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::Conflict(_)), "got {err:?}");

  // Same number under a different document kind is a different identity.
  let mut passport = person("0922222222");
  passport.document.kind = DocumentKind::Passport;
  s.unit_of_work(move |uow| uow.persons().add(&passport)).await.unwrap();
}

#[tokio::test]
async fn lookup_by_document_number() {
  let s = store().await;
  let p = person("0933333333");
  let id = p.person_id;
  s.unit_of_work(move |uow| uow.persons().add(&p)).await.unwrap();

  let found = s
    .unit_of_work(|uow| {
      uow
        .persons()
        .get_by_document_number(DocumentKind::NationalId, " 0933333333 ")
    })
    .await
    .unwrap();
  assert_eq!(found.map(|p| p.person_id), Some(id));
}

#[tokio::test]
async fn persons_are_never_deleted() {
  let s = store().await;
  let p = person("0944444444");
  let err = s
    .unit_of_work(move |uow| {
      uow.persons().add(&p)?;
      uow.persons().delete(&p)
    })
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::Validation(_)));
}

#[tokio::test]
async fn update_merges_onto_stored_person() {
  let s = store().await;
  let mut p = person("0955555555");
  let id = p.person_id;
  let original = p.clone();
  s.unit_of_work(move |uow| uow.persons().add(&original)).await.unwrap();

  p.phone = Some("0999999999".into());
  s.unit_of_work(move |uow| uow.persons().update(&p)).await.unwrap();

  let fetched = s
    .unit_of_work(move |uow| uow.persons().get(id))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(fetched.phone.as_deref(), Some("0999999999"));

  let missing = person("0966666666");
  let err = s
    .unit_of_work(move |uow| uow.persons().update(&missing))
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::NotFound { entity: "person", .. }));
}

// ─── Accounts ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn email_lookup_is_case_insensitive() {
  let s = store().await;
  let a = account("Dir@X.edu");
  let id = a.account_id;
  s.unit_of_work(move |uow| uow.accounts().add(&a)).await.unwrap();

  let found = s
    .unit_of_work(|uow| uow.accounts().get_by_email("dir@x.EDU"))
    .await
    .unwrap()
    .expect("account found");
  assert_eq!(found.account_id, id);
  assert_eq!(found.email, "Dir@X.edu");
}

#[tokio::test]
async fn duplicate_email_differing_in_case_conflicts() {
  let s = store().await;
  let a = account("teacher@x.edu");
  s.unit_of_work(move |uow| uow.accounts().add(&a)).await.unwrap();

  let b = account("TEACHER@x.edu");
  let err = s
    .unit_of_work(move |uow| uow.accounts().add(&b))
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::Conflict(_)));
}

#[tokio::test]
async fn non_ascii_email_is_unique_regardless_of_case() {
  let s = store().await;
  let a = account("Ángela@school.edu");
  let id = a.account_id;
  s.unit_of_work(move |uow| uow.accounts().add(&a)).await.unwrap();

  let b = account("ángela@school.edu");
  let err = s
    .unit_of_work(move |uow| uow.accounts().add(&b))
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::Conflict(_)));

  let found = s
    .unit_of_work(|uow| uow.accounts().get_by_email("ÁNGELA@SCHOOL.EDU"))
    .await
    .unwrap()
    .expect("account found");
  assert_eq!(found.account_id, id);
}

#[tokio::test]
async fn email_change_moves_the_lookup_key() {
  let s = store().await;
  let mut a = account("old@x.edu");
  let id = a.account_id;
  {
    let a = a.clone();
    s.unit_of_work(move |uow| uow.accounts().add(&a)).await.unwrap();
  }

  a.email = "Nuevo@X.edu".into();
  s.unit_of_work(move |uow| uow.accounts().update(&a)).await.unwrap();

  let (old, new) = s
    .unit_of_work(|uow| {
      let accounts = uow.accounts();
      Ok((accounts.get_by_email("old@x.edu")?, accounts.get_by_email("nuevo@x.edu")?))
    })
    .await
    .unwrap();
  assert!(old.is_none());
  assert_eq!(new.expect("renamed account").account_id, id);
}

#[tokio::test]
async fn inactive_account_without_reason_is_rejected() {
  let s = store().await;
  let mut a = account("x@x.edu");
  a.active = false;
  let err = s
    .unit_of_work(move |uow| uow.accounts().add(&a))
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::Validation(_)));
}

#[tokio::test]
async fn profile_discriminator_roundtrip() {
  let s = store().await;
  let p = person("0977777777");
  let person_id = p.person_id;
  let a = Account::new("t@x.edu", "hash", None, AccountProfile::Teacher(person_id));
  let account_id = a.account_id;

  s.unit_of_work(move |uow| {
    uow.persons().add(&p)?;
    uow.accounts().add(&a)?;
    uow.teachers().add(&Teacher {
      person_id,
      account_id,
      specialty: Some("Mathematics".into()),
      hired_on: NaiveDate::from_ymd_opt(2019, 9, 1),
    })
  })
  .await
  .unwrap();

  let (account, teacher) = s
    .unit_of_work(move |uow| {
      let account = uow.accounts().get(account_id)?.unwrap();
      let teacher = uow.teachers().get_by_account(account_id)?;
      Ok((account, teacher))
    })
    .await
    .unwrap();

  assert_eq!(account.profile, AccountProfile::Teacher(person_id));
  let teacher = teacher.expect("teacher profile");
  assert_eq!(teacher.person_id, person_id);
  assert_eq!(teacher.specialty.as_deref(), Some("Mathematics"));
  assert_eq!(teacher.hired_on, NaiveDate::from_ymd_opt(2019, 9, 1));
}

#[tokio::test]
async fn administrator_shares_account_id() {
  let s = store().await;
  let a = Account::new("root@x.edu", "hash", None, AccountProfile::Administrator);
  let id = a.account_id;
  s.unit_of_work(move |uow| {
    uow.accounts().add(&a)?;
    uow.administrators().add(&Administrator {
      account_id:   id,
      given_names:  "Marco".into(),
      family_names: "Vega".into(),
      phone:        None,
    })
  })
  .await
  .unwrap();

  let admin = s
    .unit_of_work(move |uow| uow.administrators().get(id))
    .await
    .unwrap()
    .expect("administrator");
  assert_eq!(admin.family_names, "Vega");
}

// ─── Roles and permissions ───────────────────────────────────────────────────

#[tokio::test]
async fn permissions_join_is_restricted_to_role() {
  let s = store().await;
  let director = Role::new("director", "School director");
  let teacher = Role::new("teacher", "Teacher");
  let view = Permission::new("students.view", "");
  let approve = Permission::new("admissions.approve", "");
  let (director_id, teacher_id) = (director.role_id, teacher.role_id);

  s.unit_of_work(move |uow| {
    uow.roles().add(&director)?;
    uow.roles().add(&teacher)?;
    uow.permissions().add(&view)?;
    uow.permissions().add(&approve)?;
    uow.roles().grant(director.role_id, view.permission_id)?;
    uow.roles().grant(director.role_id, approve.permission_id)?;
    // Granting twice is a no-op.
    uow.roles().grant(director.role_id, approve.permission_id)?;
    uow.roles().grant(teacher.role_id, view.permission_id)
  })
  .await
  .unwrap();

  let (d, t, empty) = s
    .unit_of_work(move |uow| {
      Ok((
        uow.roles().permissions_of(director_id)?,
        uow.roles().permissions_of(teacher_id)?,
        uow.roles().permissions_of(Uuid::new_v4())?,
      ))
    })
    .await
    .unwrap();

  assert_eq!(
    d.into_iter().collect::<Vec<_>>(),
    ["admissions.approve", "students.view"]
  );
  assert_eq!(t.into_iter().collect::<Vec<_>>(), ["students.view"]);
  assert!(empty.is_empty());
}

#[tokio::test]
async fn accounts_by_role() {
  let s = store().await;
  let role = Role::new("guardian", "");
  let role_id = role.role_id;
  let mut a = account("g1@x.edu");
  a.role_id = Some(role_id);
  let mut b = account("g2@x.edu");
  b.role_id = Some(role_id);
  let c = account("other@x.edu");

  s.unit_of_work(move |uow| {
    uow.roles().add(&role)?;
    uow.accounts().add(&a)?;
    uow.accounts().add(&b)?;
    uow.accounts().add(&c)
  })
  .await
  .unwrap();

  let guardians = s
    .unit_of_work(move |uow| uow.accounts().get_by_role(role_id))
    .await
    .unwrap();
  assert_eq!(guardians.len(), 2);
}

// ─── Unit of Work ────────────────────────────────────────────────────────────

#[tokio::test]
async fn failure_rolls_back_every_addition() {
  let s = store().await;
  let p = person("0988888888");
  let a = account("rollback@x.edu");
  let (person_id, account_id) = (p.person_id, a.account_id);

  let err = s
    .unit_of_work(move |uow| -> roster_core::Result<()> {
      uow.persons().add(&p)?;
      uow.accounts().add(&a)?;
      Err(CoreError::validation("abort"))
    })
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::Validation(_)));

  let (p, a) = s
    .unit_of_work(move |uow| {
      Ok((uow.persons().get(person_id)?, uow.accounts().get(account_id)?))
    })
    .await
    .unwrap();
  assert!(p.is_none());
  assert!(a.is_none());
}

#[tokio::test]
async fn conflict_midway_rolls_back_earlier_writes() {
  let s = store().await;
  let existing = account("taken@x.edu");
  s.unit_of_work(move |uow| uow.accounts().add(&existing)).await.unwrap();

  let p = person("0900000001");
  let person_id = p.person_id;
  let dup = account("Taken@x.edu");
  let err = s
    .unit_of_work(move |uow| {
      uow.persons().add(&p)?;
      uow.accounts().add(&dup)
    })
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::Conflict(_)));

  let p = s
    .unit_of_work(move |uow| uow.persons().get(person_id))
    .await
    .unwrap();
  assert!(p.is_none());
}

// ─── Students ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn students_by_guardian() {
  let s = store().await;
  let guardian = person("0900000002");
  let child = person("0900000003");
  let guardian_id = guardian.person_id;
  let student = Student {
    person_id:       child.person_id,
    enrollment_code: "2024-0001".into(),
    grade_level:     "5".into(),
    guardian_id:     Some(guardian_id),
    enrolled_at:     chrono::Utc::now(),
  };

  s.unit_of_work(move |uow| {
    uow.persons().add(&guardian)?;
    uow.persons().add(&child)?;
    uow.students().add(&student)
  })
  .await
  .unwrap();

  let found = s
    .unit_of_work(move |uow| uow.students().get_by_guardian(guardian_id))
    .await
    .unwrap();
  assert_eq!(found.len(), 1);
  assert_eq!(found[0].enrollment_code, "2024-0001");
}

// ─── Recovery codes ──────────────────────────────────────────────────────────

#[tokio::test]
async fn expire_active_leaves_one_active_slot() {
  let s = store().await;
  let a = account("r@x.edu");
  let account_id = a.account_id;
  let first = RecoveryCode::issue(account_id, "AAAAAA".into(), Duration::minutes(10)).unwrap();
  let first_id = first.code_id;

  s.unit_of_work(move |uow| {
    uow.accounts().add(&a)?;
    uow.recovery_codes().add(&first)
  })
  .await
  .unwrap();

  // A second active code for the same account violates the partial index.
  let clash = RecoveryCode::issue(account_id, "BBBBBB".into(), Duration::minutes(10)).unwrap();
  let err = s
    .unit_of_work(move |uow| uow.recovery_codes().add(&clash))
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::Conflict(_)));

  let second = RecoveryCode::issue(account_id, "CCCCCC".into(), Duration::minutes(10)).unwrap();
  let second_id = second.code_id;
  let expired = s
    .unit_of_work(move |uow| {
      let n = uow.recovery_codes().expire_active(account_id)?;
      uow.recovery_codes().add(&second)?;
      Ok(n)
    })
    .await
    .unwrap();
  assert_eq!(expired, 1);

  let (active, all) = s
    .unit_of_work(move |uow| {
      Ok((
        uow.recovery_codes().active_for(account_id)?,
        uow.recovery_codes().list_for(account_id)?,
      ))
    })
    .await
    .unwrap();
  assert_eq!(active.map(|c| c.code_id), Some(second_id));
  assert_eq!(all.len(), 2);
  let first = all.iter().find(|c| c.code_id == first_id).unwrap();
  assert_eq!(first.state, RecoveryState::Expired);
}

#[tokio::test]
async fn code_lookup_by_token_digest() {
  let s = store().await;
  let a = account("d@x.edu");
  let mut code =
    RecoveryCode::issue(a.account_id, "ZZ99ZZ".into(), Duration::minutes(10)).unwrap();
  code.token_digest = Some("abc123".into());
  let code_id = code.code_id;

  s.unit_of_work(move |uow| {
    uow.accounts().add(&a)?;
    uow.recovery_codes().add(&code)
  })
  .await
  .unwrap();

  let found = s
    .unit_of_work(|uow| uow.recovery_codes().get_by_token_digest("abc123"))
    .await
    .unwrap();
  assert_eq!(found.map(|c| c.code_id), Some(code_id));
}
