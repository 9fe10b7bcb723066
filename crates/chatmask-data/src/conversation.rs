//! Conversation templates for flattening multi-turn records.
//!
//! A [`ConversationTemplate`] holds the role labels, separators and system
//! preamble of one prompt format, plus the turns of a single training
//! example. Presets act as read-only defaults: clone one per record and
//! populate the clone, never the preset itself.

use std::fmt;

/// Placeholder substituted with the system message in `system_template`.
pub const SYSTEM_MESSAGE_PLACEHOLDER: &str = "{system_message}";

/// Side of the conversation a message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// The user turn.
    User,
    /// The assistant turn.
    Assistant,
}

impl Role {
    /// Role expected at a zero-based turn position in an alternating conversation.
    pub fn for_position(position: usize) -> Self {
        if position % 2 == 0 {
            Self::User
        } else {
            Self::Assistant
        }
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Which side sent the message.
    pub role: Role,
    /// Content of the message.
    pub content: String,
}

impl Message {
    /// Create a new message.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Kind of a rendered prompt segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// System preamble.
    System,
    /// User turn.
    User,
    /// Assistant turn.
    Assistant,
}

/// One labeled part of a rendered prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// What the segment holds.
    pub kind: SegmentKind,
    /// Role label including the colon, e.g. `USER:`.
    pub label: String,
    /// Body following the label, separator included.
    pub text: String,
}

impl Segment {
    /// The segment as it appears in the flattened prompt.
    ///
    /// The system label is only a divider and is not rendered.
    pub fn rendered(&self) -> String {
        match self.kind {
            SegmentKind::System => self.text.clone(),
            SegmentKind::User | SegmentKind::Assistant => format!("{}{}", self.label, self.text),
        }
    }
}

/// Role-templated prompt format holding one conversation's history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTemplate {
    /// Name of the template.
    pub name: String,
    /// Format of the system prompt, containing [`SYSTEM_MESSAGE_PLACEHOLDER`].
    pub system_template: String,
    /// System message, overridable per record.
    pub system_message: String,
    /// Role labels as (user, assistant).
    pub roles: (String, String),
    /// Separator after the system prompt and user turns.
    pub sep: String,
    /// Separator after assistant turns.
    pub sep2: String,
    messages: Vec<Message>,
}

impl ConversationTemplate {
    /// Create an empty template.
    pub fn new(
        name: impl Into<String>,
        system_message: impl Into<String>,
        roles: (impl Into<String>, impl Into<String>),
        sep: impl Into<String>,
        sep2: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            system_template: SYSTEM_MESSAGE_PLACEHOLDER.to_string(),
            system_message: system_message.into(),
            roles: (roles.0.into(), roles.1.into()),
            sep: sep.into(),
            sep2: sep2.into(),
            messages: Vec::new(),
        }
    }

    /// Vicuna v1.1 format: `SYSTEM USER: ... ASSISTANT: ...</s>`.
    pub fn vicuna_v1_1() -> Self {
        Self::new(
            "vicuna_v1.1",
            "A chat between a curious user and an artificial intelligence assistant. \
             The assistant gives helpful, detailed, and polite answers to the user's questions.",
            ("USER", "ASSISTANT"),
            " ",
            "</s>",
        )
    }

    /// Airoboros v2 format, newline separated. The EOS token is added by the
    /// tokenizing strategy rather than rendered.
    pub fn airoboros_v2() -> Self {
        Self::new("airoboros_v2", "A chat.", ("USER", "ASSISTANT"), "\n", "\n")
    }

    /// Set the system prompt format.
    pub fn with_system_template(mut self, system_template: impl Into<String>) -> Self {
        self.system_template = system_template.into();
        self
    }

    /// Set the system message.
    pub fn with_system_message(mut self, message: impl Into<String>) -> Self {
        self.system_message = message.into();
        self
    }

    /// Replace the system message in place.
    pub fn set_system_message(&mut self, message: impl Into<String>) {
        self.system_message = message.into();
    }

    /// The system prompt with the system message substituted.
    pub fn system_prompt(&self) -> String {
        self.system_template
            .replace(SYSTEM_MESSAGE_PLACEHOLDER, &self.system_message)
    }

    /// Label used for a role.
    pub fn role_label(&self, role: Role) -> &str {
        match role {
            Role::User => &self.roles.0,
            Role::Assistant => &self.roles.1,
        }
    }

    /// Separator emitted after the message at `position`.
    pub fn separator_after(&self, position: usize) -> &str {
        if position % 2 == 0 {
            &self.sep
        } else {
            &self.sep2
        }
    }

    /// Text that starts an assistant turn in the rendered prompt.
    pub fn assistant_marker(&self) -> String {
        format!("{}{}: ", self.sep, self.roles.1)
    }

    /// Append a message. Alternation is not checked here.
    pub fn append_message(&mut self, role: Role, content: impl Into<String>) {
        self.messages.push(Message::new(role, content));
    }

    /// Messages in order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Drop all messages, keeping the format.
    pub fn clear_messages(&mut self) {
        self.messages.clear();
    }

    /// The prompt as ordered labeled segments.
    ///
    /// A message with empty content yields only its label. This is the cue
    /// for continued generation, but in training data it points at a defect
    /// upstream and is logged.
    pub fn segments(&self) -> Vec<Segment> {
        let mut segments = Vec::with_capacity(self.messages.len() + 1);
        segments.push(Segment {
            kind: SegmentKind::System,
            label: "SYSTEM:".to_string(),
            text: format!("{}{}", self.system_prompt(), self.sep),
        });

        for (i, msg) in self.messages.iter().enumerate() {
            let label = format!("{}:", self.role_label(msg.role));
            let text = if msg.content.is_empty() {
                tracing::warn!(role = %self.role_label(msg.role), "role with empty message");
                String::new()
            } else {
                format!(" {}{}", msg.content, self.separator_after(i))
            };
            let kind = match msg.role {
                Role::User => SegmentKind::User,
                Role::Assistant => SegmentKind::Assistant,
            };
            segments.push(Segment { kind, label, text });
        }

        segments
    }

    /// Flatten the conversation into a single prompt string.
    pub fn render(&self) -> String {
        self.segments().iter().map(Segment::rendered).collect()
    }
}

impl fmt::Display for ConversationTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::capture_logs;

    #[test]
    fn test_vicuna_render() {
        let mut conv = ConversationTemplate::vicuna_v1_1().with_system_message("S");
        conv.append_message(Role::User, "Hi");
        conv.append_message(Role::Assistant, "Hello!");
        assert_eq!(conv.render(), "S USER: Hi ASSISTANT: Hello!</s>");
    }

    #[test]
    fn test_newline_separators_render() {
        let mut conv =
            ConversationTemplate::new("custom", "<system>", ("USER", "ASSISTANT"), "\n ", "\n");
        conv.append_message(Role::User, "Hi");
        conv.append_message(Role::Assistant, "Hello!");
        assert_eq!(conv.render(), "<system>\n USER: Hi\n ASSISTANT: Hello!\n");
    }

    #[test]
    fn test_airoboros_render_drops_system_divider() {
        let mut conv = ConversationTemplate::airoboros_v2();
        conv.append_message(Role::User, "Hi");
        conv.append_message(Role::Assistant, "Yo");
        assert_eq!(conv.render(), "A chat.\nUSER: Hi\nASSISTANT: Yo\n");

        let segments = conv.segments();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].kind, SegmentKind::System);
        assert_eq!(segments[0].label, "SYSTEM:");
        assert_eq!(segments[2].label, "ASSISTANT:");
        assert_eq!(segments[2].text, " Yo\n");
    }

    #[test]
    fn test_empty_message_renders_label_only() {
        let mut conv = ConversationTemplate::vicuna_v1_1().with_system_message("S");
        conv.append_message(Role::User, "Hi");
        conv.append_message(Role::Assistant, "");

        let (text, logs) = capture_logs(|| conv.render());
        assert_eq!(text, "S USER: Hi ASSISTANT:");
        assert!(logs.contains("WARN"), "{logs}");
        assert!(logs.contains("role with empty message"), "{logs}");
        assert!(logs.contains("role=ASSISTANT"), "{logs}");
    }

    #[test]
    fn test_non_empty_messages_log_nothing() {
        let mut conv = ConversationTemplate::vicuna_v1_1();
        conv.append_message(Role::User, "Hi");
        conv.append_message(Role::Assistant, "Hello!");
        let (_, logs) = capture_logs(|| conv.render());
        assert!(!logs.contains("empty message"), "{logs}");
    }

    #[test]
    fn test_display_matches_render() {
        let mut conv = ConversationTemplate::airoboros_v2();
        conv.append_message(Role::User, "Hi");
        conv.append_message(Role::Assistant, "Yo");
        assert_eq!(conv.to_string(), conv.render());
    }

    #[test]
    fn test_system_template_substitution() {
        let conv = ConversationTemplate::airoboros_v2()
            .with_system_template("SYSTEM: {system_message}")
            .with_system_message("Be terse.");
        assert_eq!(conv.system_prompt(), "SYSTEM: Be terse.");
    }

    #[test]
    fn test_clone_has_independent_messages() {
        let preset = ConversationTemplate::vicuna_v1_1();
        let mut first = preset.clone();
        first.append_message(Role::User, "one");
        let second = preset.clone();

        assert_eq!(first.messages().len(), 1);
        assert!(second.messages().is_empty());
        assert!(preset.messages().is_empty());
    }

    #[test]
    fn test_render_splits_back_into_turns() {
        let pairs = [("What is 2+2?", "4."), ("And 3+3?", "6."), ("Thanks", "Anytime.")];
        let mut conv = ConversationTemplate::vicuna_v1_1();
        for (user, assistant) in pairs {
            conv.append_message(Role::User, user);
            conv.append_message(Role::Assistant, assistant);
        }

        let text = conv.render();
        let marker = conv.assistant_marker();
        let chunks: Vec<&str> = text.split(conv.sep2.as_str()).collect();
        assert_eq!(chunks.len(), pairs.len() + 1);
        assert_eq!(chunks.last(), Some(&""));

        for (chunk, (user, assistant)) in chunks.iter().zip(pairs) {
            let parts: Vec<&str> = chunk.split(marker.as_str()).collect();
            assert_eq!(parts.len(), 2);
            assert!(parts[0].ends_with(&format!("USER: {}", user)));
            assert_eq!(parts[1], assistant);
        }
        assert!(chunks[0].starts_with(&conv.system_message));
    }

    #[test]
    fn test_role_for_position() {
        assert_eq!(Role::for_position(0), Role::User);
        assert_eq!(Role::for_position(1), Role::Assistant);
        assert_eq!(Role::for_position(4), Role::User);
    }
}
