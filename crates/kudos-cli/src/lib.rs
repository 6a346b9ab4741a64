//! # kudos-cli — Operator CLI
//!
//! Thin administrative client over the kudos REST API. Subcommand
//! handlers live in their own modules and return a process exit code;
//! HTTP plumbing is shared in [`client`].

pub mod client;
pub mod reset;
pub mod status;
pub mod user;
