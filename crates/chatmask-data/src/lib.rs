//! Conversation templating and label masking for chatmask.
//!
//! This crate provides:
//! - ShareGPT-style conversation records (JSON lines)
//! - Conversation templates (Vicuna v1.1, Airoboros v2)
//! - Prompt building with role alternation checks
//! - Tokenizer integration
//! - Assistant-only label masking for supervised fine-tuning

#![warn(missing_docs)]

pub mod conversation;
pub mod masking;
pub mod prompter;
pub mod record;
pub mod sharegpt;
pub mod tokenizer;

#[cfg(test)]
mod test_utils;

pub use conversation::*;
pub use masking::*;
pub use prompter::*;
pub use record::*;
pub use sharegpt::*;
pub use tokenizer::*;
