//! Core types and trait definitions for the Roster identity store.
//!
//! This crate is deliberately free of database and crypto dependencies.
//! Storage backends implement [`store::IdentityStore`]; the services in
//! `roster-auth` are written against that trait only.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod account;
pub mod error;
pub mod person;
pub mod profile;
pub mod recovery;
pub mod role;
pub mod store;

pub use error::{AuthFailure, Error, Result};
