//! Per-connection conversation flags.

/// In-memory flags that gate the widget's affordances. Reset whenever the
/// connection is lost; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationState {
    awaiting_reply: bool,
    suggestions_visible: bool,
    has_started: bool,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn awaiting_reply(&self) -> bool {
        self.awaiting_reply
    }

    pub fn suggestions_visible(&self) -> bool {
        self.suggestions_visible
    }

    pub fn has_started(&self) -> bool {
        self.has_started
    }

    /// A user turn went out.
    pub fn begin_turn(&mut self) {
        self.awaiting_reply = true;
        self.has_started = true;
        self.suggestions_visible = false;
    }

    /// Any inbound message ends the wait, whatever its kind.
    pub fn reply_received(&mut self) {
        self.awaiting_reply = false;
    }

    pub fn set_suggestions_visible(&mut self, visible: bool) {
        self.suggestions_visible = visible;
    }

    /// A user-authored message reached the transcript (live or replayed).
    pub fn user_message_rendered(&mut self) {
        self.has_started = true;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
