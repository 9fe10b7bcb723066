//! Assistant-only label masking over a rendered conversation.
//!
//! The conversation is rendered to one string and tokenized once. Turn
//! boundaries are then recovered by tokenizing each exchange chunk and its
//! instruction prefix in isolation and reconciling the lengths against the
//! full encoding. When the lengths do not reconcile the record keeps its
//! input ids but contributes no loss.

use crate::conversation::ConversationTemplate;
use crate::prompter::ShareGptPrompter;
use crate::record::ConversationRecord;
use crate::tokenizer::Tokenize;
use chatmask_core::{ChatMaskError, MaskingConfig, Result};

/// Label value excluded from the loss.
pub const IGNORE_TOKEN_ID: i64 = -100;

/// Fixed-length model inputs for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizedPrompt {
    /// Token ids, padded or truncated to the sequence length.
    pub input_ids: Vec<u32>,
    /// Token ids for positions that count toward the loss, [`IGNORE_TOKEN_ID`] elsewhere.
    pub labels: Vec<i64>,
    /// True for real tokens, false for padding.
    pub attention_mask: Vec<bool>,
}

impl TokenizedPrompt {
    /// Sequence length.
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    /// Check if the prompt holds no positions.
    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }

    /// Number of positions that contribute to the loss.
    pub fn trained_token_count(&self) -> usize {
        self.labels
            .iter()
            .filter(|&&label| label != IGNORE_TOKEN_ID)
            .count()
    }

    /// Whether the record contributes no loss at all.
    pub fn is_fully_ignored(&self) -> bool {
        self.trained_token_count() == 0
    }
}

/// Turns a raw conversation record into model inputs with a label mask.
pub trait PromptTokenizingStrategy: Send + Sync {
    /// Validate, render, tokenize and mask one record.
    ///
    /// Record validation errors are returned; alignment problems are not.
    fn tokenize_prompt(&self, record: &ConversationRecord) -> Result<TokenizedPrompt>;
}

/// Vicuna-style strategy: render, tokenize once, align turns afterwards.
pub struct VicunaTokenizingStrategy<T> {
    prompter: ShareGptPrompter,
    tokenizer: T,
    config: MaskingConfig,
}

impl<T: Tokenize> VicunaTokenizingStrategy<T> {
    /// Create a strategy using the Vicuna v1.1 format.
    pub fn new(tokenizer: T, config: MaskingConfig) -> Result<Self> {
        Self::with_prompter(ShareGptPrompter::vicuna_v1_1(), tokenizer, config)
    }

    /// Create a strategy with a custom prompter.
    ///
    /// # Errors
    /// Fails when the configuration is invalid, or when the pad token is the
    /// EOS token that `sep2` encodes to. Alignment counts non-pad tokens, so
    /// every record would be masked out.
    pub fn with_prompter(
        prompter: ShareGptPrompter,
        tokenizer: T,
        config: MaskingConfig,
    ) -> Result<Self> {
        config.validate()?;
        check_pad_token(&tokenizer, &prompter.template().sep2)?;
        Ok(Self {
            prompter,
            tokenizer,
            config,
        })
    }

    /// The prompter building conversations.
    pub fn prompter(&self) -> &ShareGptPrompter {
        &self.prompter
    }

    /// Length every output is padded or truncated to.
    pub fn sequence_len(&self) -> usize {
        self.config
            .effective_sequence_len(self.tokenizer.model_max_length())
    }

    /// Tokenize and mask an already built conversation.
    pub fn tokenize_conversation(&self, conv: &ConversationTemplate) -> Result<TokenizedPrompt> {
        let text = conv.render();
        let sequence_len = self.sequence_len();
        let pad_token_id = self.tokenizer.pad_token_id();

        let input_ids = self.tokenizer.encode_padded(&text, sequence_len)?;
        let attention_mask: Vec<bool> = input_ids.iter().map(|&id| id != pad_token_id).collect();

        let labels = if self.config.train_on_inputs {
            input_ids
                .iter()
                .zip(&attention_mask)
                .map(|(&id, &real)| if real { i64::from(id) } else { IGNORE_TOKEN_ID })
                .collect()
        } else {
            self.align_labels(conv, &text, &input_ids)?
        };

        Ok(TokenizedPrompt {
            input_ids,
            labels,
            attention_mask,
        })
    }

    fn align_labels(
        &self,
        conv: &ConversationTemplate,
        text: &str,
        input_ids: &[u32],
    ) -> Result<Vec<i64>> {
        let pad_token_id = self.tokenizer.pad_token_id();
        let sequence_len = input_ids.len();
        let total_len = input_ids.iter().filter(|&&id| id != pad_token_id).count();
        let mut labels: Vec<i64> = input_ids.iter().map(|&id| i64::from(id)).collect();

        let marker = conv.assistant_marker();
        // Position 0 holds the BOS token.
        let mut cursor = 1;
        ignore_span(&mut labels, 0, cursor);

        for turn in split_turns(text, &conv.sep2) {
            if turn.is_empty() {
                break;
            }
            let turn_len = self.tokenizer.encode(turn)?.len();

            let parts: Vec<&str> = turn.split(marker.as_str()).collect();
            if parts.len() != 2 {
                tracing::debug!(parts = parts.len(), "turn does not split on assistant marker");
                break;
            }
            let instruction = format!("{}{}", parts[0], marker);
            let instruction_len = self
                .tokenizer
                .encode(&instruction)?
                .len()
                .saturating_sub(self.config.leading_token_correction);

            ignore_span(&mut labels, cursor, cursor + instruction_len);
            cursor += turn_len;
        }

        ignore_span(&mut labels, cursor, sequence_len);

        if cursor < sequence_len && cursor != total_len {
            tracing::warn!(
                cursor,
                total = total_len,
                "tokenization mismatch: {} vs. {} (ignored)",
                cursor,
                total_len
            );
            labels.fill(IGNORE_TOKEN_ID);
        }

        Ok(labels)
    }
}

impl<T: Tokenize> PromptTokenizingStrategy for VicunaTokenizingStrategy<T> {
    fn tokenize_prompt(&self, record: &ConversationRecord) -> Result<TokenizedPrompt> {
        let conv = self.prompter.build_prompt(record)?;
        self.tokenize_conversation(&conv)
    }
}

fn check_pad_token<T: Tokenize>(tokenizer: &T, sep2: &str) -> Result<()> {
    let pad_token_id = tokenizer.pad_token_id();
    if sep2.is_empty() || tokenizer.eos_token_id() != Some(pad_token_id) {
        return Ok(());
    }
    if tokenizer
        .encode_without_special_tokens(sep2)?
        .contains(&pad_token_id)
    {
        return Err(ChatMaskError::Tokenizer(format!(
            "pad token {} is also the EOS token ending each turn ({:?}); \
             set a distinct pad token with Tokenizer::with_pad_token_id",
            pad_token_id, sep2
        )));
    }
    Ok(())
}

fn split_turns<'a>(text: &'a str, sep2: &str) -> Vec<&'a str> {
    if sep2.is_empty() {
        vec![text]
    } else {
        text.split(sep2).collect()
    }
}

/// Mark `labels[start..end]` as ignored, clamped to the sequence.
fn ignore_span(labels: &mut [i64], start: usize, end: usize) {
    let end = end.min(labels.len());
    if start < end {
        labels[start..end].fill(IGNORE_TOKEN_ID);
    }
}
