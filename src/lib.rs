//! Declarative, idempotent machine provisioning.
//!
//! A single TOML document describes the desired state of a Debian-family
//! host: apt repositories and packages, files copied or linked from the
//! environment folder, a directory tree, and shell commands.  Each top-level
//! section is owned by one provider; providers run in priority order and the
//! first failing action halts the run.
//!
//! The public API is organised into layers:
//!
//! - **[`config`]**: macro expansion, parsing and validation of sections
//! - **[`resources`]**: idempotent `check + apply` primitives
//! - **[`providers`]**: one per section, wired to resources
//! - **[`configurator`]**: the priority-ordered pipeline
//! - **[`commands`]**: process checks and environment resolution
//!
//! Runs are not serialized against each other; two concurrent runs on the
//! same machine have undefined results.
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod configurator;
pub mod environment;
pub mod error;
pub mod exec;
pub mod logging;
pub mod operations;
pub mod platform;
pub mod providers;
pub mod remote;
pub mod resources;
