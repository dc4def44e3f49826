//! secretproof: provision a secret for a confidential app through a secret
//! store, then prove by digest that a consumer run received the same value.

pub mod cli;
pub mod config;
pub mod error;
pub mod execution;
pub mod fingerprint;
pub mod infra;
pub mod logging;
pub mod provisioning;
pub mod results;
pub mod secrets;
pub mod store;
pub mod verify;
pub mod workflow;

pub use error::{Error, Result};
