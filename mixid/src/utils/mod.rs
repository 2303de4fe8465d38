//! Utility modules for mixid

pub mod strings;

pub use strings::{file_stem_title, sanitize, sanitize_filename};
