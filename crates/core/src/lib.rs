//! Orchestration core for broom.
//!
//! This crate ties the parsed repository reference and the GitHub client
//! together into the decide-and-apply flow, and defines the single
//! application error type the CLI maps to exit codes.
//!
//! # Overview
//!
//! - [`Orchestrator`]: fetch, decide, optionally update and verify
//! - [`Mode`]: apply vs. dry-run
//! - [`ConfigOutcome`]: what the run found and did
//! - [`AppError`]: closed error enum with [`AppError::exit_code`]
//!
//! # State machine
//!
//! ```text
//! fetch ──► already enabled ──► done (no write, ever)
//!   │
//!   └────► disabled ──► dry-run ──► done (no write)
//!                 └───► apply ──► update ──► re-fetch ──► verified? ──► done
//!                                                  └─► SettingNotApplied
//! ```
//!
//! Any client error aborts the flow immediately and propagates unchanged.

pub mod error;
pub mod orchestrator;

pub use error::{AppError, Result};
pub use orchestrator::{ConfigOutcome, Mode, Orchestrator};
