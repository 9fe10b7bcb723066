//! Prompt builder for ShareGPT-style records.

use crate::conversation::{ConversationTemplate, Role};
use crate::record::{ConversationRecord, Speaker, Turn};
use chatmask_core::{ChatMaskError, Result};

/// Validates raw records and fills a fresh copy of a default template.
///
/// The default template is never mutated, so one prompter can be shared
/// across worker threads.
#[derive(Debug, Clone)]
pub struct ShareGptPrompter {
    template: ConversationTemplate,
}

impl ShareGptPrompter {
    /// Create a prompter around a default template. Any messages already on
    /// the template are discarded.
    pub fn new(mut template: ConversationTemplate) -> Self {
        template.clear_messages();
        Self { template }
    }

    /// Prompter using the Vicuna v1.1 format.
    pub fn vicuna_v1_1() -> Self {
        Self::new(ConversationTemplate::vicuna_v1_1())
    }

    /// Prompter using the Airoboros v2 format.
    pub fn airoboros_v2() -> Self {
        Self::new(ConversationTemplate::airoboros_v2())
    }

    /// The default template copies are made from.
    pub fn template(&self) -> &ConversationTemplate {
        &self.template
    }

    /// Build a populated conversation from a record.
    ///
    /// A leading system turn overrides the system message. A remaining first
    /// turn that is not from the user is dropped. Everything after that must
    /// alternate user, assistant, user, ...
    ///
    /// # Errors
    /// - [`ChatMaskError::TooShortConversation`] when fewer than two turns remain
    /// - [`ChatMaskError::UnknownRole`] for a role name outside the known set
    /// - [`ChatMaskError::RoleAlternation`] when turns do not alternate
    pub fn build_prompt(&self, record: &ConversationRecord) -> Result<ConversationTemplate> {
        let mut conv = self.template.clone();
        let mut turns: &[Turn] = record.turns();
        let mut offset = 0;

        if let Some(first) = turns.first() {
            if first.speaker() == Some(Speaker::System) {
                conv.set_system_message(first.value.clone());
                turns = &turns[1..];
                offset += 1;
            }
        }

        ensure_min_turns(turns)?;

        if turns[0].speaker() != Some(Speaker::Human) {
            tracing::debug!(role = %turns[0].from, "skipping leading turn not from human");
            turns = &turns[1..];
            offset += 1;
            ensure_min_turns(turns)?;
        }

        for (j, turn) in turns.iter().enumerate() {
            let index = offset + j;
            let expected = Role::for_position(j);
            let role = match turn.speaker() {
                Some(Speaker::Human) => Role::User,
                Some(Speaker::Gpt) => Role::Assistant,
                Some(Speaker::System) => {
                    return Err(ChatMaskError::RoleAlternation {
                        index,
                        expected: conv.role_label(expected).to_string(),
                        found: Speaker::System.as_str().to_string(),
                    })
                }
                None => {
                    return Err(ChatMaskError::UnknownRole {
                        index,
                        role: turn.from.clone(),
                    })
                }
            };

            if role != expected {
                return Err(ChatMaskError::RoleAlternation {
                    index,
                    expected: conv.role_label(expected).to_string(),
                    found: conv.role_label(role).to_string(),
                });
            }
            conv.append_message(role, turn.value.clone());
        }

        Ok(conv)
    }
}

impl Default for ShareGptPrompter {
    fn default() -> Self {
        Self::vicuna_v1_1()
    }
}

fn ensure_min_turns(turns: &[Turn]) -> Result<()> {
    if turns.len() < 2 {
        return Err(ChatMaskError::TooShortConversation { turns: turns.len() });
    }
    Ok(())
}
