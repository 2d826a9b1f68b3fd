//! SQL schema for the Roster SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Persons are never deleted.
CREATE TABLE IF NOT EXISTS persons (
    person_id       TEXT PRIMARY KEY,
    document_kind   TEXT NOT NULL,
    document_number TEXT NOT NULL,
    given_names     TEXT NOT NULL,
    family_names    TEXT NOT NULL,
    birth_date      TEXT NOT NULL,   -- ISO 8601 date
    gender          TEXT NOT NULL,
    address         TEXT,
    phone           TEXT,
    created_at      TEXT NOT NULL,
    UNIQUE (document_kind, document_number)
);

CREATE TABLE IF NOT EXISTS roles (
    role_id     TEXT PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE COLLATE NOCASE,
    description TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS permissions (
    permission_id TEXT PRIMARY KEY,
    name          TEXT NOT NULL UNIQUE COLLATE NOCASE,
    description   TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS role_permissions (
    role_id       TEXT NOT NULL REFERENCES roles(role_id) ON DELETE CASCADE,
    permission_id TEXT NOT NULL REFERENCES permissions(permission_id) ON DELETE CASCADE,
    PRIMARY KEY (role_id, permission_id)
);

-- profile_kind is the role-type discriminator; profile_person_id is set
-- exactly for the person-linked kinds.
CREATE TABLE IF NOT EXISTS accounts (
    account_id          TEXT PRIMARY KEY,
    email               TEXT NOT NULL,
    email_key           TEXT NOT NULL UNIQUE,   -- normalize_email(email)
    password_hash       TEXT NOT NULL,
    role_id             TEXT REFERENCES roles(role_id),
    profile_kind        TEXT NOT NULL DEFAULT 'none',
    profile_person_id   TEXT REFERENCES persons(person_id),
    active              INTEGER NOT NULL DEFAULT 1,
    deactivation_reason TEXT,
    created_at          TEXT NOT NULL,
    last_login_at       TEXT,
    CHECK (active = 1 OR length(trim(coalesce(deactivation_reason, ''))) > 0),
    CHECK ((profile_kind IN ('teacher', 'director', 'guardian')) = (profile_person_id IS NOT NULL))
);

CREATE TABLE IF NOT EXISTS administrators (
    account_id   TEXT PRIMARY KEY REFERENCES accounts(account_id) ON DELETE CASCADE,
    given_names  TEXT NOT NULL,
    family_names TEXT NOT NULL,
    phone        TEXT
);

CREATE TABLE IF NOT EXISTS teachers (
    person_id  TEXT PRIMARY KEY REFERENCES persons(person_id),
    account_id TEXT NOT NULL UNIQUE REFERENCES accounts(account_id),
    specialty  TEXT,
    hired_on   TEXT
);

CREATE TABLE IF NOT EXISTS directors (
    person_id    TEXT PRIMARY KEY REFERENCES persons(person_id),
    account_id   TEXT NOT NULL UNIQUE REFERENCES accounts(account_id),
    office       TEXT,
    appointed_on TEXT
);

CREATE TABLE IF NOT EXISTS guardians (
    person_id  TEXT PRIMARY KEY REFERENCES persons(person_id),
    account_id TEXT NOT NULL UNIQUE REFERENCES accounts(account_id),
    occupation TEXT,
    workplace  TEXT
);

CREATE TABLE IF NOT EXISTS students (
    person_id       TEXT PRIMARY KEY REFERENCES persons(person_id),
    enrollment_code TEXT NOT NULL UNIQUE,
    grade_level     TEXT NOT NULL,
    guardian_id     TEXT REFERENCES persons(person_id),
    enrolled_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS applicants (
    person_id       TEXT PRIMARY KEY REFERENCES persons(person_id),
    requested_grade TEXT NOT NULL,
    guardian_id     TEXT REFERENCES persons(person_id),
    applied_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS recovery_codes (
    code_id      TEXT PRIMARY KEY,
    account_id   TEXT NOT NULL REFERENCES accounts(account_id) ON DELETE CASCADE,
    code         TEXT NOT NULL,
    created_at   TEXT NOT NULL,
    expires_at   TEXT NOT NULL,
    state        TEXT NOT NULL DEFAULT 'active',   -- 'active' | 'used' | 'expired'
    token_digest TEXT UNIQUE
);

-- At most one active recovery code per account.
CREATE UNIQUE INDEX IF NOT EXISTS recovery_codes_one_active_idx
    ON recovery_codes(account_id) WHERE state = 'active';

CREATE INDEX IF NOT EXISTS accounts_role_idx          ON accounts(role_id);
CREATE INDEX IF NOT EXISTS students_guardian_idx      ON students(guardian_id);
CREATE INDEX IF NOT EXISTS applicants_guardian_idx    ON applicants(guardian_id);
CREATE INDEX IF NOT EXISTS recovery_codes_account_idx ON recovery_codes(account_id);

PRAGMA user_version = 1;
";
