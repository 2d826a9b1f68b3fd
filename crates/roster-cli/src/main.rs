//! `roster` — operator tool for a Roster identity store.
//!
//! Reads `roster.toml` (or the path given with `--config`) plus `ROSTER_*`
//! environment variables, opens the SQLite store and runs one command.
//! Secrets are always read from stdin, never from arguments.
//!
//! ```text
//! roster init
//! roster add-admin --email root@school.edu --given-names Elena --family-names Vargas
//! roster login --email root@school.edu --check accounts.manage
//! ```

mod settings;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use roster_auth::{
  CredentialHasher, IdentityServices, TracingMailer,
  directory::{NewAdministrator, NewStaff},
  seed::Catalog,
};
use roster_core::{
  person::{DocumentKind, Gender, GovernmentId, NewPerson},
  profile::StaffDetails,
};
use roster_store_sqlite::SqliteStore;
use serde::Serialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use settings::RosterConfig;

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "roster", author, version, about = "Roster identity administration")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "roster.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Print the PHC hash of a password read from stdin.
  HashPassword,

  #[command(flatten)]
  Store(StoreCommand),
}

/// Commands that operate on the store.
#[derive(Subcommand)]
enum StoreCommand {
  /// Create the schema and install the default role catalog.
  Init,

  /// Register an administrator account.
  AddAdmin {
    #[arg(long)]
    email:        String,
    #[arg(long)]
    given_names:  String,
    #[arg(long)]
    family_names: String,
    #[arg(long)]
    phone:        Option<String>,
  },

  /// Register a teacher, director or guardian with a login.
  AddStaff {
    #[arg(long, value_enum)]
    kind:            StaffKind,
    #[arg(long)]
    email:           String,
    #[arg(long, default_value = "national_id")]
    document_kind:   DocumentKind,
    #[arg(long)]
    document_number: String,
    #[arg(long)]
    given_names:     String,
    #[arg(long)]
    family_names:    String,
    /// YYYY-MM-DD
    #[arg(long)]
    birth_date:      NaiveDate,
    #[arg(long, default_value = "undisclosed")]
    gender:          Gender,
    /// Role name; defaults to the staff kind.
    #[arg(long)]
    role:            Option<String>,
    /// Specialty (teacher), office (director) or occupation (guardian).
    #[arg(long)]
    detail:          Option<String>,
  },

  /// Authenticate and print the resolved identity.
  Login {
    #[arg(long)]
    email: String,
    /// Permission to check after login; repeatable.
    #[arg(long = "check")]
    checks: Vec<String>,
  },

  /// Issue a recovery code and mail it.
  RecoverRequest {
    #[arg(long)]
    email: String,
  },

  /// Exchange a recovery code for a redemption token.
  RecoverRedeem {
    #[arg(long)]
    email: String,
    #[arg(long)]
    code:  String,
  },

  /// Set a new password with a redemption token.
  RecoverFinalize {
    #[arg(long)]
    token: String,
  },

  /// Deactivate an account.
  Deactivate {
    #[arg(long)]
    email:  String,
    #[arg(long)]
    reason: String,
  },

  Reactivate {
    #[arg(long)]
    email: String,
  },

  AssignRole {
    #[arg(long)]
    email: String,
    #[arg(long)]
    role:  String,
  },
}

#[derive(Clone, Copy, ValueEnum)]
enum StaffKind {
  Teacher,
  Director,
  Guardian,
}

impl StaffKind {
  fn details(self, detail: Option<String>) -> StaffDetails {
    match self {
      Self::Teacher => StaffDetails::Teacher { specialty: detail, hired_on: None },
      Self::Director => StaffDetails::Director { office: detail, appointed_on: None },
      Self::Guardian => StaffDetails::Guardian { occupation: detail, workplace: None },
    }
  }
}

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let config = RosterConfig::load(&cli.config)?;

  let command = match cli.command {
    Command::HashPassword => {
      let password = prompt("Password")?;
      let hasher = CredentialHasher::new(&config.hashing)?;
      println!("{}", hasher.hash(&password)?);
      return Ok(());
    }
    Command::Store(command) => command,
  };

  let store = SqliteStore::open(&config.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", config.store_path))?;
  let mailer = Arc::new(TracingMailer { from: config.mail_from.clone() });
  let services = IdentityServices::new(store, &config.identity(), mailer, Arc::new(()))?;

  run(command, &services).await
}

async fn run(command: StoreCommand, services: &IdentityServices<SqliteStore>) -> anyhow::Result<()> {
  match command {
    StoreCommand::Init => {
      let report = services.directory.install_catalog(Catalog::institutional()).await?;
      emit(&report)
    }

    StoreCommand::AddAdmin { email, given_names, family_names, phone } => {
      let password = prompt_confirmed()?;
      let account = services
        .directory
        .register_administrator(NewAdministrator {
          email,
          password,
          given_names,
          family_names,
          phone,
        })
        .await?;
      emit(&account)
    }

    StoreCommand::AddStaff {
      kind,
      email,
      document_kind,
      document_number,
      given_names,
      family_names,
      birth_date,
      gender,
      role,
      detail,
    } => {
      let password = prompt_confirmed()?;
      let (account, person) = services
        .directory
        .register_staff(NewStaff {
          email,
          password,
          person: NewPerson {
            document: GovernmentId::new(document_kind, document_number),
            given_names,
            family_names,
            birth_date,
            gender,
            address: None,
            phone: None,
          },
          details: kind.details(detail),
          role,
        })
        .await?;
      emit(&serde_json::json!({ "account": account, "person": person }))
    }

    StoreCommand::Login { email, checks } => {
      let password = prompt("Password")?;
      let key = services.sessions.begin();
      let identity = services.login(key, &email, &password).await?;
      let checks: Vec<_> = checks
        .into_iter()
        .map(|permission| {
          let allowed = services.sessions.guard(key, &permission);
          serde_json::json!({ "permission": permission, "allowed": allowed })
        })
        .collect();
      services.sessions.end(key);
      emit(&serde_json::json!({
        "display_name": identity.display_name(),
        "identity": identity,
        "checks": checks,
      }))
    }

    StoreCommand::RecoverRequest { email } => {
      let issued = services.recovery.request_recovery(&email).await?;
      emit(&issued)
    }

    StoreCommand::RecoverRedeem { email, code } => {
      let token = services.recovery.redeem_recovery(&email, &code).await?;
      println!("{}", token.as_str());
      Ok(())
    }

    StoreCommand::RecoverFinalize { token } => {
      let password = prompt("New password")?;
      let confirmation = prompt("Confirm")?;
      services
        .recovery
        .finalize_recovery(&token, &password, &confirmation)
        .await?;
      eprintln!("Password updated.");
      Ok(())
    }

    StoreCommand::Deactivate { email, reason } => {
      emit(&services.directory.deactivate_account(&email, &reason).await?)
    }

    StoreCommand::Reactivate { email } => emit(&services.directory.reactivate_account(&email).await?),

    StoreCommand::AssignRole { email, role } => {
      emit(&services.directory.assign_role(&email, &role).await?)
    }
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn emit(value: &impl Serialize) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

/// Read one line from stdin, prompting on stderr.
fn prompt(label: &str) -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  eprint!("{label}: ");
  io::stderr().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_owned())
}

fn prompt_confirmed() -> anyhow::Result<String> {
  let password = prompt("Password")?;
  if prompt("Confirm")? != password {
    anyhow::bail!("passwords do not match");
  }
  Ok(password)
}
