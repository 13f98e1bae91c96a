//! Core logic for the HEIC → JPEG Telegram bot.
//!
//! This crate is framework-agnostic. Telegram and the network live behind
//! ports (traits) implemented in the adapter crate.

pub mod config;
pub mod convert;
pub mod dispatch;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod naming;
pub mod ports;

pub use errors::{Error, Result};
