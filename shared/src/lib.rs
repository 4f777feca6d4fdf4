use serde::{Deserialize, Deserializer, Serialize};

// Logical broker destinations and HTTP paths
pub mod endpoints;
pub use endpoints::AppDestination;

// Protocol constants shared by the client crates
pub mod protocol;

// HTTP error type and history payloads
pub mod api;
pub use api::{ApiError, HistoryEntry, HistoryResponse};

// STOMP 1.2 frame codec
pub mod stomp;

/// Who authored a chat message.
///
/// The backend is not strict about sender names (`System` confirmations,
/// lowercase `agent` in persisted history), so anything unrecognised decodes
/// to `Other` rather than failing the whole frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Sender {
    User,
    Bot,
    #[serde(alias = "agent")]
    Agent,
    #[default]
    #[serde(other)]
    Other,
}

impl Sender {
    pub fn is_user(self) -> bool {
        self == Sender::User
    }
}

/// Kind of a server-originated chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    /// Plain conversational turn
    Chat,
    /// Newline-delimited starter questions
    FaqSuggestions,
    /// Newline-delimited live suggestions for the current input
    Suggestions,
    /// Bot reply that also offers a hand-off to a human
    HumanSupportSuggestion,
    /// Any other kind (`REQUEST_AGENT`, `JOIN`, ...); rendered as a plain message
    #[default]
    #[serde(other)]
    Other,
}

/// Message delivered on the bot or agent reply queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,
    #[serde(default)]
    pub sender: Sender,
}

impl InboundMessage {
    pub fn new(kind: MessageKind, content: impl Into<String>, sender: Sender) -> Self {
        Self {
            kind,
            content: content.into(),
            sender,
        }
    }
}

/// Wire value of the `type` field on client-originated messages.
///
/// These must be values the server's message enum accepts; the request kind
/// itself is carried by the destination (see [`AppDestination`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboundKind {
    Connect,
    Chat,
    InitialFaq,
    Suggestions,
}

/// Payload of every client-originated message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    pub chat_session_id: String,
    pub content: String,
    pub sender: String,
    #[serde(rename = "type")]
    pub kind: OutboundKind,
    pub token: String,
}

impl OutboundMessage {
    pub fn new(
        kind: OutboundKind,
        chat_session_id: impl Into<String>,
        content: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            chat_session_id: chat_session_id.into(),
            content: content.into(),
            sender: protocol::USER_SENDER.to_string(),
            kind,
            token: token.into(),
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
