//! mixid: identify the tracks played in a DJ mix
//!
//! A mix (local file or http(s) reference) is cut into overlapping analysis
//! windows, each window is sent to a recognition backend and the resulting
//! tracklist is written as JSON, Markdown or M3U.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use error::{IdentificationContext, ProcessingError, ProcessingResult};
pub use services::{Backends, RunReport, WorkflowOrchestrator};
