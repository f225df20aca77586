//! Core domain + application logic for the content publishing bot.
//!
//! This crate is framework-agnostic. Telegram and GitHub live behind ports
//! (`ChatTransport`, `RepoHost`) implemented in adapter crates.

pub mod config;
pub mod domain;
pub mod errors;
pub mod hosting;
pub mod logging;
pub mod messaging;
pub mod package;
pub mod publish;
pub mod rejection;
pub mod webhook;

pub use errors::{Error, Result};
