//! Configuration types for chatmask.

use crate::{ChatMaskError, Result};
use serde::{Deserialize, Serialize};

/// Label masking configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskingConfig {
    /// Compute loss on user turns too. When set, only padding is ignored.
    #[serde(default)]
    pub train_on_inputs: bool,

    /// Fixed sequence length. Falls back to the tokenizer's model max length.
    #[serde(default)]
    pub sequence_len: Option<usize>,

    /// Tokens to subtract from an isolated instruction prefix encoding.
    ///
    /// Encoding a fragment on its own yields tokens that do not appear when the
    /// same text is encoded in context (a BOS, a dangling space piece). The
    /// default of 2 is calibrated for LLaMA-family sentencepiece tokenizers and
    /// must be recalibrated for other tokenizer families.
    #[serde(default = "default_leading_token_correction")]
    pub leading_token_correction: usize,
}

impl Default for MaskingConfig {
    fn default() -> Self {
        Self {
            train_on_inputs: false,
            sequence_len: None,
            leading_token_correction: default_leading_token_correction(),
        }
    }
}

impl MaskingConfig {
    /// Create a config with a fixed sequence length.
    pub fn new(sequence_len: usize) -> Self {
        Self {
            sequence_len: Some(sequence_len),
            ..Self::default()
        }
    }

    /// Set whether user turns contribute to the loss.
    pub fn with_train_on_inputs(mut self, train_on_inputs: bool) -> Self {
        self.train_on_inputs = train_on_inputs;
        self
    }

    /// Set the leading token correction.
    pub fn with_leading_token_correction(mut self, correction: usize) -> Self {
        self.leading_token_correction = correction;
        self
    }

    /// Check the configuration for values that cannot produce a mask.
    pub fn validate(&self) -> Result<()> {
        if self.sequence_len == Some(0) {
            return Err(ChatMaskError::Config(
                "sequence_len must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the padded length for a tokenizer with the given max length.
    #[must_use]
    pub fn effective_sequence_len(&self, model_max_length: usize) -> usize {
        self.sequence_len.unwrap_or(model_max_length)
    }
}

fn default_leading_token_correction() -> usize {
    2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MaskingConfig::default();
        assert!(!config.train_on_inputs);
        assert_eq!(config.sequence_len, None);
        assert_eq!(config.leading_token_correction, 2);
        assert_eq!(config.effective_sequence_len(4096), 4096);
    }

    #[test]
    fn test_yaml_partial_config_uses_defaults() {
        let config: MaskingConfig = serde_yaml::from_str("sequence_len: 512\n").unwrap();
        assert_eq!(config.sequence_len, Some(512));
        assert_eq!(config.leading_token_correction, 2);
        assert_eq!(config.effective_sequence_len(4096), 512);
    }

    #[test]
    fn test_json_roundtrip_keeps_overrides() {
        let config = MaskingConfig::new(64)
            .with_train_on_inputs(true)
            .with_leading_token_correction(1);
        let json = serde_json::to_string(&config).unwrap();
        let back: MaskingConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_zero_sequence_len_rejected() {
        let err = MaskingConfig::new(0).validate().unwrap_err();
        assert!(matches!(err, ChatMaskError::Config(_)));
        assert!(MaskingConfig::new(8).validate().is_ok());
        assert!(MaskingConfig::default().validate().is_ok());
    }
}
