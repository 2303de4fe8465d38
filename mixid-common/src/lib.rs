//! # mixid common library
//!
//! Shared code for the mixid workspace:
//! - Error and result types
//! - Configuration loading (TOML file, defaults, validation)
//! - Run event types and the broadcast event bus
//! - Time formatting for tracklists and logs

pub mod config;
pub mod error;
pub mod events;
pub mod human_time;

pub use error::{Error, Result};
