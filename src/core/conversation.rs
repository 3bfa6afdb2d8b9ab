use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// One user message paired with its (possibly still-forming) assistant reply.
///
/// Field names match the backend's history schema so turns serialize directly
/// as request context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub user_message: String,
    pub ai_message: String,
}

impl Turn {
    pub fn new(user_message: impl Into<String>) -> Self {
        Self {
            user_message: user_message.into(),
            ai_message: String::new(),
        }
    }
}

/// Ordered, append-only sequence of turns.
///
/// The user message of a turn is immutable once appended; the assistant
/// message of the last turn is the only mutable slot, and only while a
/// stream is delivering it.
#[derive(Debug, Default)]
pub struct Conversation {
    turns: VecDeque<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.back()
    }

    /// Append a new turn with an empty assistant message. The caller is
    /// responsible for trimming and rejecting empty input first.
    pub fn append_turn(&mut self, user_message: String) {
        debug_assert!(!user_message.trim().is_empty());
        self.turns.push_back(Turn::new(user_message));
    }

    /// Concatenate one streamed fragment onto the last turn's assistant
    /// message. No-op on an empty conversation.
    pub fn append_to_last_assistant(&mut self, fragment: &str) {
        if let Some(turn) = self.turns.back_mut() {
            turn.ai_message.push_str(fragment);
        }
    }

    /// Replace the last turn's assistant message wholesale. Used only by the
    /// legacy non-streaming mode. No-op on an empty conversation.
    pub fn replace_last_assistant(&mut self, text: String) {
        if let Some(turn) = self.turns.back_mut() {
            turn.ai_message = text;
        }
    }

    /// The turns preceding the last one, cloned for use as request context.
    pub fn history_before_last(&self) -> Vec<Turn> {
        let end = self.turns.len().saturating_sub(1);
        self.turns.iter().take(end).cloned().collect()
    }

    /// All turns, cloned. Used for title generation after an exchange closes.
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_turn_grows_by_one_and_preserves_order() {
        let mut conversation = Conversation::new();
        for (i, text) in ["first", "second", "third"].iter().enumerate() {
            conversation.append_turn(text.to_string());
            assert_eq!(conversation.len(), i + 1);
        }

        let users: Vec<&str> = conversation
            .iter()
            .map(|t| t.user_message.as_str())
            .collect();
        assert_eq!(users, vec!["first", "second", "third"]);
        for turn in conversation.iter() {
            assert!(turn.ai_message.is_empty());
        }
    }

    #[test]
    fn fragments_concatenate_in_order_on_the_last_turn() {
        let mut conversation = Conversation::new();
        conversation.append_turn("earlier".to_string());
        conversation.replace_last_assistant("done".to_string());
        conversation.append_turn("current".to_string());

        for fragment in ["Hi", " there", "!"] {
            conversation.append_to_last_assistant(fragment);
        }

        assert_eq!(conversation.last().unwrap().ai_message, "Hi there!");
        // The earlier turn is untouched.
        assert_eq!(conversation.iter().next().unwrap().ai_message, "done");
    }

    #[test]
    fn mutations_on_an_empty_conversation_are_no_ops() {
        let mut conversation = Conversation::new();
        conversation.append_to_last_assistant("stray");
        conversation.replace_last_assistant("stray".to_string());
        assert!(conversation.is_empty());
    }

    #[test]
    fn replace_overwrites_prior_partial_content() {
        let mut conversation = Conversation::new();
        conversation.append_turn("question".to_string());
        conversation.append_to_last_assistant("partial");
        conversation.replace_last_assistant("X".to_string());
        assert_eq!(conversation.last().unwrap().ai_message, "X");
    }

    #[test]
    fn history_excludes_the_turn_in_flight() {
        let mut conversation = Conversation::new();
        assert!(conversation.history_before_last().is_empty());

        conversation.append_turn("one".to_string());
        assert!(conversation.history_before_last().is_empty());

        conversation.replace_last_assistant("reply".to_string());
        conversation.append_turn("two".to_string());

        let history = conversation.history_before_last();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].user_message, "one");
        assert_eq!(history[0].ai_message, "reply");
    }
}
