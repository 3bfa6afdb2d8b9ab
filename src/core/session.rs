//! Single-slot streaming session state machine.
//!
//! One `ChatSession` owns the conversation store and the state of the one
//! stream that may be mutating it. All mutations funnel through [`submit`],
//! [`apply`], and [`cancel`], so the render layer never touches turns
//! directly and the "only one stream patches the last turn" invariant holds
//! regardless of how transport events interleave.
//!
//! [`submit`]: ChatSession::submit
//! [`apply`]: ChatSession::apply
//! [`cancel`]: ChatSession::cancel

use tokio_util::sync::CancellationToken;

use crate::api::ChatRequest;
use crate::core::catalog::{self, ModelOption};
use crate::core::chat_stream::StreamEvent;
use crate::core::conversation::Conversation;

/// Lifecycle of the current stream. `Closed` and `Errored` are terminal; a
/// new submission always starts a fresh stream under a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    Idle,
    Connecting,
    Open,
    Streaming,
    Closed,
    Errored,
}

/// Everything the transport layer needs to run one accepted turn.
pub struct TurnRequest {
    pub request: ChatRequest,
    pub stream_id: u64,
    pub cancel_token: CancellationToken,
}

pub struct ChatSession {
    conversation: Conversation,
    phase: StreamPhase,
    generating: bool,
    current_stream_id: u64,
    cancel_token: Option<CancellationToken>,
    incomplete_turns: Vec<usize>,
    last_error: Option<String>,
    model_id: String,
    temperature: f32,
}

impl ChatSession {
    pub fn new(model_id: String, temperature: f32) -> Self {
        Self {
            conversation: Conversation::new(),
            phase: StreamPhase::Idle,
            generating: false,
            current_stream_id: 0,
            cancel_token: None,
            incomplete_turns: Vec::new(),
            last_error: None,
            model_id,
            temperature,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    /// The generating flag: raised the instant a submission is accepted,
    /// lowered only on a terminal event (`End`, `Error`) or user cancel.
    pub fn is_generating(&self) -> bool {
        self.generating
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Whether the turn at `index` ended without a complete reply (stream
    /// error, cancellation, or supersession).
    pub fn turn_incomplete(&self, index: usize) -> bool {
        self.incomplete_turns.contains(&index)
    }

    /// Switch to the catalog's next model. Refused while a reply is being
    /// generated so an in-flight request is never re-attributed.
    pub fn cycle_model(&mut self) -> Option<&'static ModelOption> {
        if self.generating {
            return None;
        }
        let next = catalog::next_after(&self.model_id);
        self.model_id = next.id.to_string();
        Some(next)
    }

    /// Accept one user turn. Empty (post-trim) input is rejected. Any stream
    /// still in flight is cancelled and superseded: its token is cancelled,
    /// its id invalidated, and its partial turn marked incomplete.
    pub fn submit(&mut self, raw_input: &str) -> Option<TurnRequest> {
        let trimmed = raw_input.trim();
        if trimmed.is_empty() {
            return None;
        }

        self.abort_in_flight();

        self.current_stream_id += 1;
        let token = CancellationToken::new();
        self.cancel_token = Some(token.clone());

        self.conversation.append_turn(trimmed.to_string());
        let request = ChatRequest {
            user_input: trimmed.to_string(),
            chat_history: self.conversation.history_before_last(),
            chat_model: self.model_id.clone(),
            temperature: self.temperature,
            chat_id: None,
        };

        self.generating = true;
        self.last_error = None;
        self.phase = StreamPhase::Connecting;

        Some(TurnRequest {
            request,
            stream_id: self.current_stream_id,
            cancel_token: token,
        })
    }

    /// Apply one transport event. Returns false when the event carried a
    /// stale stream id and was discarded.
    pub fn apply(&mut self, event: StreamEvent, stream_id: u64) -> bool {
        if stream_id != self.current_stream_id {
            return false;
        }

        match event {
            StreamEvent::Open => {
                if self.phase == StreamPhase::Connecting {
                    self.phase = StreamPhase::Open;
                }
            }
            StreamEvent::Fragment(text) => {
                self.phase = StreamPhase::Streaming;
                self.conversation.append_to_last_assistant(&text);
            }
            StreamEvent::Complete(text) => {
                self.phase = StreamPhase::Streaming;
                self.conversation.replace_last_assistant(text);
            }
            StreamEvent::Error(message) => {
                self.phase = StreamPhase::Errored;
                self.generating = false;
                self.cancel_token = None;
                self.last_error = Some(message);
                self.mark_last_turn_incomplete();
            }
            StreamEvent::End => {
                if self.phase != StreamPhase::Errored {
                    self.phase = StreamPhase::Closed;
                }
                self.generating = false;
                self.cancel_token = None;
            }
        }
        true
    }

    /// User-initiated abort of the current stream. Partial output stays.
    pub fn cancel(&mut self) -> bool {
        if !self.generating {
            return false;
        }
        self.abort_in_flight();
        self.phase = StreamPhase::Closed;
        true
    }

    fn abort_in_flight(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        if self.generating {
            self.generating = false;
            self.mark_last_turn_incomplete();
        }
    }

    fn mark_last_turn_incomplete(&mut self) {
        if let Some(index) = self.conversation.len().checked_sub(1) {
            if !self.incomplete_turns.contains(&index) {
                self.incomplete_turns.push(index);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> ChatSession {
        ChatSession::new("gpt-4o".to_string(), 0.8)
    }

    #[test]
    fn empty_and_whitespace_input_is_rejected() {
        let mut s = session();
        assert!(s.submit("").is_none());
        assert!(s.submit("   \n\t").is_none());
        assert!(s.conversation().is_empty());
        assert!(!s.is_generating());
        assert_eq!(s.phase(), StreamPhase::Idle);
    }

    #[test]
    fn submit_trims_input_and_builds_the_request() {
        let mut s = session();
        let turn = s.submit("  Hello  ").expect("submission accepted");

        assert_eq!(turn.request.user_input, "Hello");
        assert_eq!(turn.request.chat_model, "gpt-4o");
        assert_eq!(turn.request.temperature, 0.8);
        assert!(turn.request.chat_history.is_empty());

        assert!(s.is_generating());
        assert_eq!(s.phase(), StreamPhase::Connecting);
        assert_eq!(s.conversation().len(), 1);
        assert_eq!(s.conversation().last().unwrap().user_message, "Hello");
        assert!(s.conversation().last().unwrap().ai_message.is_empty());
    }

    #[test]
    fn streamed_fragments_assemble_the_reply() {
        let mut s = session();
        let turn = s.submit("Hello").unwrap();
        let id = turn.stream_id;

        assert!(s.apply(StreamEvent::Open, id));
        assert_eq!(s.phase(), StreamPhase::Open);

        for fragment in ["Hi", " there", "!"] {
            assert!(s.apply(StreamEvent::Fragment(fragment.to_string()), id));
            assert_eq!(s.phase(), StreamPhase::Streaming);
        }
        assert!(s.apply(StreamEvent::End, id));

        assert_eq!(s.phase(), StreamPhase::Closed);
        assert!(!s.is_generating());
        let last = s.conversation().last().unwrap();
        assert_eq!(last.user_message, "Hello");
        assert_eq!(last.ai_message, "Hi there!");
        assert!(!s.turn_incomplete(0));
    }

    #[test]
    fn mid_stream_error_preserves_partial_output() {
        let mut s = session();
        let id = s.submit("Hello").unwrap().stream_id;

        s.apply(StreamEvent::Open, id);
        s.apply(StreamEvent::Fragment("Hi".to_string()), id);
        s.apply(StreamEvent::Fragment(" the".to_string()), id);
        s.apply(StreamEvent::Error("API error: connection reset".to_string()), id);
        s.apply(StreamEvent::End, id);

        assert_eq!(s.phase(), StreamPhase::Errored);
        assert!(!s.is_generating());
        assert_eq!(s.conversation().last().unwrap().ai_message, "Hi the");
        assert!(s.turn_incomplete(0));
        assert_eq!(s.last_error(), Some("API error: connection reset"));
    }

    #[test]
    fn handshake_failure_leaves_the_reply_empty() {
        let mut s = session();
        let id = s.submit("Hello").unwrap().stream_id;

        s.apply(StreamEvent::Error("API error: 502".to_string()), id);
        s.apply(StreamEvent::End, id);

        assert_eq!(s.phase(), StreamPhase::Errored);
        assert!(!s.is_generating());
        assert!(s.conversation().last().unwrap().ai_message.is_empty());
        assert!(s.turn_incomplete(0));
    }

    #[test]
    fn second_submission_supersedes_the_first_stream() {
        let mut s = session();
        let first = s.submit("first").unwrap();
        s.apply(StreamEvent::Open, first.stream_id);
        s.apply(StreamEvent::Fragment("partial".to_string()), first.stream_id);

        let second = s.submit("second").unwrap();
        assert!(first.cancel_token.is_cancelled());
        assert_ne!(first.stream_id, second.stream_id);

        // Stale events from the superseded stream change nothing.
        assert!(!s.apply(StreamEvent::Fragment(" late".to_string()), first.stream_id));
        assert!(!s.apply(StreamEvent::End, first.stream_id));
        assert!(s.is_generating());

        // The first turn keeps its partial text and is marked incomplete.
        let first_turn = s.conversation().iter().next().unwrap();
        assert_eq!(first_turn.ai_message, "partial");
        assert!(s.turn_incomplete(0));

        // The fresh stream targets the new last turn.
        s.apply(StreamEvent::Fragment("fresh".to_string()), second.stream_id);
        s.apply(StreamEvent::End, second.stream_id);
        assert_eq!(s.conversation().last().unwrap().ai_message, "fresh");
        assert!(!s.turn_incomplete(1));
        assert!(!s.is_generating());

        // History sent with the second request included the partial first turn.
        assert_eq!(second.request.chat_history.len(), 1);
        assert_eq!(second.request.chat_history[0].user_message, "first");
    }

    #[test]
    fn non_streaming_reply_replaces_partial_content() {
        let mut s = session();
        let id = s.submit("Hello").unwrap().stream_id;

        s.apply(StreamEvent::Fragment("partial".to_string()), id);
        s.apply(StreamEvent::Complete("X".to_string()), id);
        s.apply(StreamEvent::End, id);

        assert_eq!(s.conversation().last().unwrap().ai_message, "X");
        assert_eq!(s.phase(), StreamPhase::Closed);
        assert!(!s.is_generating());
    }

    #[test]
    fn cancel_keeps_partial_output_and_marks_the_turn() {
        let mut s = session();
        let turn = s.submit("Hello").unwrap();

        s.apply(StreamEvent::Fragment("Hi".to_string()), turn.stream_id);
        assert!(s.cancel());

        assert!(turn.cancel_token.is_cancelled());
        assert!(!s.is_generating());
        assert_eq!(s.phase(), StreamPhase::Closed);
        assert_eq!(s.conversation().last().unwrap().ai_message, "Hi");
        assert!(s.turn_incomplete(0));

        assert!(!s.cancel());
    }

    #[test]
    fn model_cycling_is_blocked_while_generating() {
        let mut s = session();
        s.submit("Hello").unwrap();
        assert!(s.cycle_model().is_none());
        assert_eq!(s.model_id(), "gpt-4o");

        s.cancel();
        let next = s.cycle_model().expect("idle session may switch models");
        assert_eq!(s.model_id(), next.id);
        assert_ne!(s.model_id(), "gpt-4o");
    }

    #[test]
    fn open_event_is_ignored_outside_connecting() {
        let mut s = session();
        let id = s.submit("Hello").unwrap().stream_id;
        s.apply(StreamEvent::Fragment("Hi".to_string()), id);
        s.apply(StreamEvent::Open, id);
        assert_eq!(s.phase(), StreamPhase::Streaming);
    }

    #[test]
    fn request_history_reflects_prior_turns() {
        let mut s = session();
        let id = s.submit("one").unwrap().stream_id;
        s.apply(StreamEvent::Fragment("first reply".to_string()), id);
        s.apply(StreamEvent::End, id);

        let second = s.submit("two").unwrap();
        assert_eq!(second.request.chat_history.len(), 1);
        assert_eq!(second.request.chat_history[0].ai_message, "first reply");
        assert_eq!(second.request.user_input, "two");
    }
}
