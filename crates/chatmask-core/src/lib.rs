//! Core types and configuration for chatmask.
//!
//! This crate provides the foundational pieces shared by the conversation
//! templating and label masking crates:
//!
//! - Error handling infrastructure
//! - Masking configuration (sequence length, input training, tokenizer calibration)

#![warn(missing_docs)]

mod config;
mod error;

pub use config::*;
pub use error::*;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::*;
    pub use crate::error::{ChatMaskError, Result};
}
