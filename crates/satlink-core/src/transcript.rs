//! Chat transcript model and entry rendering

use serde::{Deserialize, Serialize};

use crate::markup::Markup;

/// Who authored a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    /// Typed by the operator
    User,
    /// Operational intelligence (chat backend)
    System,
    /// Scan result narration
    VisionSystem,
}

impl Sender {
    /// Prefix label shown above backend-authored entries
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Sender::User => None,
            Sender::System => Some("[OP_INTEL]"),
            Sender::VisionSystem => Some("[VISION_AI]"),
        }
    }

    fn classes(&self) -> &'static [&'static str] {
        match self {
            Sender::User => &["msg-user", "self-end", "ml-8"],
            Sender::System => &["msg-ai", "mr-8"],
            Sender::VisionSystem => &["msg-ai", "mr-8", "border-l-2", "border-blue-500"],
        }
    }

    fn label_class(&self) -> &'static str {
        match self {
            Sender::VisionSystem => "text-blue-400 font-mono text-xs",
            _ => "text-amber-500 font-mono text-xs",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub text: String,
    pub sender: Sender,
}

impl ChatMessage {
    pub fn new(text: impl Into<String>, sender: Sender) -> Self {
        Self {
            text: text.into(),
            sender,
        }
    }
}

const BASE_CLASSES: &[&str] = &["mb-4", "p-3", "text-sm", "font-['Chakra_Petch']"];

/// A message ready to be placed in the log
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptEntry {
    pub sender: Sender,
    pub classes: Vec<&'static str>,
    pub body: Markup,
}

impl TranscriptEntry {
    /// Render a message. All text is escaped; backend text keeps its line
    /// breaks and gets the sender's label.
    pub fn render(message: &ChatMessage) -> Self {
        let sender = message.sender;
        let mut classes = BASE_CLASSES.to_vec();
        classes.extend_from_slice(sender.classes());

        let body = match sender.label() {
            None => Markup::escape(&format!("> {}", message.text)),
            Some(label) => {
                let mut body = Markup::trusted(format!(
                    r#"<strong class="{}">{}</strong><br>"#,
                    sender.label_class(),
                    label
                ));
                body.push(&Markup::formatted(&message.text));
                body
            }
        };

        Self {
            sender,
            classes,
            body,
        }
    }

    /// Value for the `class` attribute
    pub fn class_attr(&self) -> String {
        self.classes.join(" ")
    }
}

/// Ordered, append-only message log
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn count_from(&self, sender: Sender) -> usize {
        self.messages.iter().filter(|m| m.sender == sender).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_entry_is_plain_text() {
        let entry = TranscriptEntry::render(&ChatMessage::new("<b>show tanks</b>", Sender::User));
        assert_eq!(entry.body.as_str(), "&gt; &lt;b&gt;show tanks&lt;/b&gt;");
        assert!(entry.class_attr().contains("msg-user"));
        assert!(entry.class_attr().starts_with("mb-4 p-3 text-sm"));
    }

    #[test]
    fn test_system_entry_has_label_and_escaped_text() {
        let entry = TranscriptEntry::render(&ChatMessage::new(
            "Found 3 sites\n<img src=x onerror=1>",
            Sender::System,
        ));
        let html = entry.body.as_str();
        assert!(html.starts_with(r#"<strong class="text-amber-500 font-mono text-xs">[OP_INTEL]</strong><br>"#));
        assert!(html.contains("Found 3 sites<br>&lt;img"));
        assert!(!html.contains("<img"));
        assert_eq!(entry.class_attr(), "mb-4 p-3 text-sm font-['Chakra_Petch'] msg-ai mr-8");
    }

    #[test]
    fn test_vision_entry_styling() {
        let entry = TranscriptEntry::render(&ChatMessage::new("Clear", Sender::VisionSystem));
        assert!(entry.body.as_str().contains("[VISION_AI]"));
        assert!(entry.body.as_str().contains("text-blue-400"));
        assert!(entry.classes.contains(&"border-blue-500"));
    }

    #[test]
    fn test_transcript_order() {
        let mut transcript = Transcript::new();
        transcript.push(ChatMessage::new("a", Sender::User));
        transcript.push(ChatMessage::new("b", Sender::System));
        transcript.push(ChatMessage::new("c", Sender::System));

        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript.last().unwrap().text, "c");
        assert_eq!(transcript.count_from(Sender::System), 2);
        assert_eq!(transcript.count_from(Sender::VisionSystem), 0);
    }
}
