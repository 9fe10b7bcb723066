//! Deterministic tokenizer for unit tests.

use crate::masking::{TokenizedPrompt, IGNORE_TOKEN_ID};
use crate::tokenizer::Tokenize;
use chatmask_core::Result;
use std::io;
use std::sync::{Arc, Mutex};

pub(crate) const PAD: u32 = 0;
pub(crate) const BOS: u32 = 1;
pub(crate) const EOS: u32 = 2;
const EOS_TEXT: &str = "</s>";
const CHAR_OFFSET: u32 = 16;

/// One token per character, `</s>` as a single EOS token, BOS prepended.
pub(crate) struct CharTokenizer {
    model_max_length: usize,
    eos_as_token: bool,
}

impl CharTokenizer {
    pub(crate) fn new(model_max_length: usize) -> Self {
        Self {
            model_max_length,
            eos_as_token: true,
        }
    }

    /// Treat `</s>` as four plain characters.
    pub(crate) fn without_eos_token(mut self) -> Self {
        self.eos_as_token = false;
        self
    }
}

impl Tokenize for CharTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let mut ids = vec![BOS];
        ids.extend(self.encode_without_special_tokens(text)?);
        Ok(ids)
    }

    fn encode_without_special_tokens(&self, text: &str) -> Result<Vec<u32>> {
        let mut ids = Vec::new();
        let mut rest = text;
        while let Some(c) = rest.chars().next() {
            if self.eos_as_token && rest.starts_with(EOS_TEXT) {
                ids.push(EOS);
                rest = &rest[EOS_TEXT.len()..];
            } else {
                ids.push(c as u32 + CHAR_OFFSET);
                rest = &rest[c.len_utf8()..];
            }
        }
        Ok(ids)
    }

    fn pad_token_id(&self) -> u32 {
        PAD
    }

    fn model_max_length(&self) -> usize {
        self.model_max_length
    }

    fn bos_token_id(&self) -> Option<u32> {
        Some(BOS)
    }

    fn eos_token_id(&self) -> Option<u32> {
        Some(EOS)
    }
}

/// Text of the positions that count toward the loss.
pub(crate) fn counted_text(prompt: &TokenizedPrompt) -> String {
    prompt
        .labels
        .iter()
        .filter(|&&label| label != IGNORE_TOKEN_ID)
        .map(|&label| match label as u32 {
            BOS => "<s>".to_string(),
            EOS => EOS_TEXT.to_string(),
            id => id
                .checked_sub(CHAR_OFFSET)
                .and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_default(),
        })
        .collect()
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` under a thread-local subscriber and return everything it logged.
pub(crate) fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, String) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8_lossy(&buffer.0.lock().unwrap()).into_owned();
    (result, logs)
}
