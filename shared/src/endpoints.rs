//! Logical destination names on the broker and HTTP paths of the chat backend.
//!
//! The broker routes client-originated frames by destination, not by a field in
//! the payload, so each outbound request kind maps to exactly one `/app/...` path.

// =============================================================================
// Application destinations (client -> server)
// =============================================================================

/// Server endpoints a client may publish to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppDestination {
    /// Announce the session after login
    Connect,
    /// A user chat turn
    SendMessage,
    /// Ask for the starter FAQ list
    InitialFaq,
    /// Ask for live suggestions for in-progress input
    Suggestions,
    /// Ask to be handed off to a human agent
    RequestHumanSupport,
}

impl AppDestination {
    pub const fn path(self) -> &'static str {
        match self {
            AppDestination::Connect => "/app/chat.connect",
            AppDestination::SendMessage => "/app/chat.sendMessage",
            AppDestination::InitialFaq => "/app/chat.getInitialFAQ",
            AppDestination::Suggestions => "/app/chat.getSuggestions",
            AppDestination::RequestHumanSupport => "/app/chat.requestHumanSupport",
        }
    }
}

impl std::fmt::Display for AppDestination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

// =============================================================================
// Subscription destinations (server -> client)
// =============================================================================

/// Broadcast topic announcing which chat session was handed to an agent.
pub const SESSION_SWITCH_TOPIC: &str = "/topic/chatSessionSwitch";

/// Per-session queue the bot replies on.
pub fn bot_reply_queue(session_id: &str) -> String {
    format!("/user/queue/reply/{}", session_id)
}

/// Per-session queue a human agent replies on after hand-off.
pub fn agent_queue(session_id: &str) -> String {
    format!("/queue/agent/{}", session_id)
}

// =============================================================================
// HTTP collaborators
// =============================================================================

/// Plain-text base URL of the backend.
pub const BASE_URL_PATH: &str = "/api/config/base-url";

/// Latest persisted messages of the authenticated user.
pub const LATEST_MESSAGES_PATH: &str = "/api/chat-history/latest-messages";

/// Persist the conversation of a session (`?chatSessionId=` query).
pub const SAVE_HISTORY_PATH: &str = "/api/chat-history/save";
