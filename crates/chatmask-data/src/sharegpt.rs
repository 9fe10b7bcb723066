//! Segment-wise ShareGPT tokenization.
//!
//! Each prompt segment is encoded on its own and labeled as it is appended,
//! so no after-the-fact alignment is needed. Used with formats whose
//! separators cannot be split back reliably, such as the newline separated
//! Airoboros format.

use crate::conversation::{ConversationTemplate, SegmentKind};
use crate::masking::{PromptTokenizingStrategy, TokenizedPrompt, IGNORE_TOKEN_ID};
use crate::prompter::ShareGptPrompter;
use crate::record::ConversationRecord;
use crate::tokenizer::Tokenize;
use chatmask_core::{MaskingConfig, Result};

/// Strategy that labels tokens per segment while building the sequence.
pub struct ShareGptTokenizingStrategy<T> {
    prompter: ShareGptPrompter,
    tokenizer: T,
    config: MaskingConfig,
}

impl<T: Tokenize> ShareGptTokenizingStrategy<T> {
    /// Create a strategy using the Airoboros v2 format.
    pub fn new(tokenizer: T, config: MaskingConfig) -> Result<Self> {
        Self::with_prompter(ShareGptPrompter::airoboros_v2(), tokenizer, config)
    }

    /// Create a strategy with a custom prompter.
    pub fn with_prompter(
        prompter: ShareGptPrompter,
        tokenizer: T,
        config: MaskingConfig,
    ) -> Result<Self> {
        config.validate()?;
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
        let train_on_inputs = self.config.train_on_inputs;
        let mut input_ids = Vec::new();
        let mut labels = Vec::new();

        if let Some(bos) = self.tokenizer.bos_token_id() {
            input_ids.push(bos);
            labels.push(IGNORE_TOKEN_ID);
        }

        for segment in conv.segments() {
            let ids = self
                .tokenizer
                .encode_without_special_tokens(&segment.rendered())?;

            match segment.kind {
                SegmentKind::System => {
                    labels.extend(std::iter::repeat(IGNORE_TOKEN_ID).take(ids.len()));
                    input_ids.extend(ids);
                }
                SegmentKind::User => {
                    if train_on_inputs {
                        labels.extend(ids.iter().map(|&id| i64::from(id)));
                    } else {
                        labels.extend(std::iter::repeat(IGNORE_TOKEN_ID).take(ids.len()));
                    }
                    input_ids.extend(ids);
                }
                SegmentKind::Assistant => {
                    let label_len = self
                        .tokenizer
                        .encode_without_special_tokens(&segment.label)?
                        .len();
                    for (i, &id) in ids.iter().enumerate() {
                        if i < label_len && !train_on_inputs {
                            labels.push(IGNORE_TOKEN_ID);
                        } else {
                            labels.push(i64::from(id));
                        }
                    }
                    input_ids.extend(ids);

                    if !segment.text.is_empty() {
                        if let Some(eos) = self.tokenizer.eos_token_id() {
                            input_ids.push(eos);
                            labels.push(i64::from(eos));
                        }
                    }
                }
            }
        }

        let sequence_len = self.sequence_len();
        input_ids.truncate(sequence_len);
        labels.truncate(sequence_len);
        let real_len = input_ids.len();

        input_ids.resize(sequence_len, self.tokenizer.pad_token_id());
        labels.resize(sequence_len, IGNORE_TOKEN_ID);
        let attention_mask = (0..sequence_len).map(|i| i < real_len).collect();

        Ok(TokenizedPrompt {
            input_ids,
            labels,
            attention_mask,
        })
    }
}

impl<T: Tokenize> PromptTokenizingStrategy for ShareGptTokenizingStrategy<T> {
    fn tokenize_prompt(&self, record: &ConversationRecord) -> Result<TokenizedPrompt> {
        let conv = self.prompter.build_prompt(record)?;
        self.tokenize_conversation(&conv)
    }
}
