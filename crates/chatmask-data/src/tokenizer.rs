//! Tokenizer integration.

use chatmask_core::{ChatMaskError, Result};
use std::path::Path;
use std::sync::Arc;

/// Max length assumed when the tokenizer file carries none.
pub const DEFAULT_MODEL_MAX_LENGTH: usize = 2048;

/// Text to token id capability consumed by the tokenizing strategies.
///
/// Implementations must be pure: the same text always encodes to the same ids.
pub trait Tokenize: Send + Sync {
    /// Encode text including the tokenizer's special tokens (e.g. a leading BOS).
    fn encode(&self, text: &str) -> Result<Vec<u32>>;

    /// Encode text without special tokens.
    fn encode_without_special_tokens(&self, text: &str) -> Result<Vec<u32>>;

    /// Token id used for padding.
    fn pad_token_id(&self) -> u32;

    /// Maximum sequence length the model accepts.
    fn model_max_length(&self) -> usize;

    /// BOS token id, if the vocabulary has one.
    fn bos_token_id(&self) -> Option<u32> {
        None
    }

    /// EOS token id, if the vocabulary has one.
    fn eos_token_id(&self) -> Option<u32> {
        None
    }

    /// Encode with special tokens, truncated and right-padded to exactly `max_length`.
    fn encode_padded(&self, text: &str, max_length: usize) -> Result<Vec<u32>> {
        let mut ids = self.encode(text)?;
        ids.truncate(max_length);
        ids.resize(max_length, self.pad_token_id());
        Ok(ids)
    }
}

impl<T: Tokenize + ?Sized> Tokenize for Arc<T> {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        (**self).encode(text)
    }

    fn encode_without_special_tokens(&self, text: &str) -> Result<Vec<u32>> {
        (**self).encode_without_special_tokens(text)
    }

    fn pad_token_id(&self) -> u32 {
        (**self).pad_token_id()
    }

    fn model_max_length(&self) -> usize {
        (**self).model_max_length()
    }

    fn bos_token_id(&self) -> Option<u32> {
        (**self).bos_token_id()
    }

    fn eos_token_id(&self) -> Option<u32> {
        (**self).eos_token_id()
    }

    fn encode_padded(&self, text: &str, max_length: usize) -> Result<Vec<u32>> {
        (**self).encode_padded(text, max_length)
    }
}

/// Wrapper around the tokenizers library.
pub struct Tokenizer {
    inner: tokenizers::Tokenizer,
    pad_token_id: u32,
    model_max_length: usize,
}

impl Tokenizer {
    /// Load a tokenizer from a local file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let inner = tokenizers::Tokenizer::from_file(path)
            .map_err(|e| ChatMaskError::Tokenizer(e.to_string()))?;
        Self::from_inner(inner)
    }

    /// Load a tokenizer from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let inner = tokenizers::Tokenizer::from_bytes(bytes)
            .map_err(|e| ChatMaskError::Tokenizer(e.to_string()))?;
        Self::from_inner(inner)
    }

    /// Wrap an already loaded tokenizer.
    ///
    /// Fails when no pad token (or EOS fallback) can be found.
    pub fn from_inner(inner: tokenizers::Tokenizer) -> Result<Self> {
        let pad_token_id = find_pad_token(&inner).ok_or_else(|| {
            ChatMaskError::Tokenizer(
                "No pad token found; set one explicitly with with_pad_token_id".to_string(),
            )
        })?;
        Ok(Self {
            inner,
            pad_token_id,
            model_max_length: DEFAULT_MODEL_MAX_LENGTH,
        })
    }

    /// Set the model max length.
    pub fn with_model_max_length(mut self, model_max_length: usize) -> Self {
        self.model_max_length = model_max_length;
        self
    }

    /// Override the pad token id.
    pub fn with_pad_token_id(mut self, pad_token_id: u32) -> Self {
        self.pad_token_id = pad_token_id;
        self
    }
}

impl Tokenize for Tokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .inner
            .encode(text, true)
            .map_err(|e| ChatMaskError::Tokenizer(e.to_string()))?;
        Ok(encoding.get_ids().to_vec())
    }

    fn encode_without_special_tokens(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .inner
            .encode(text, false)
            .map_err(|e| ChatMaskError::Tokenizer(e.to_string()))?;
        Ok(encoding.get_ids().to_vec())
    }

    fn pad_token_id(&self) -> u32 {
        self.pad_token_id
    }

    fn model_max_length(&self) -> usize {
        self.model_max_length
    }

    fn bos_token_id(&self) -> Option<u32> {
        self.inner
            .token_to_id("<s>")
            .or_else(|| self.inner.token_to_id("<|begin_of_text|>"))
            .or_else(|| self.inner.token_to_id("<bos>"))
    }

    fn eos_token_id(&self) -> Option<u32> {
        self.inner
            .token_to_id("</s>")
            .or_else(|| self.inner.token_to_id("<|endoftext|>"))
            .or_else(|| self.inner.token_to_id("<|end_of_text|>"))
            .or_else(|| self.inner.token_to_id("<eos>"))
    }
}

/// Try common pad token names, falling back to EOS.
fn find_pad_token(inner: &tokenizers::Tokenizer) -> Option<u32> {
    inner
        .token_to_id("<pad>")
        .or_else(|| inner.token_to_id("[PAD]"))
        .or_else(|| inner.token_to_id("<|pad|>"))
        .or_else(|| inner.token_to_id("<|finetune_right_pad_id|>"))
        .or_else(|| inner.token_to_id("</s>"))
        .or_else(|| inner.token_to_id("<|endoftext|>"))
        .or_else(|| inner.token_to_id("<|end_of_text|>"))
}
