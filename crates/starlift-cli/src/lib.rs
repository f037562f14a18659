//! # starlift-cli — Operator CLI
//!
//! Thin terminal front-end over the coordinator's control plane. Each
//! subcommand maps to one API call and renders the response for humans;
//! nothing here holds state.

pub mod client;
pub mod exports;
pub mod logs;
pub mod transfers;
pub mod tree;

pub use client::{ClientError, CoordinatorClient};
