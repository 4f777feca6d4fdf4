//! Error types for the chat client

/// Local failures of the chat client. None of these are shown to the user;
/// callers log them and carry on.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ChatError {
    #[error("No access token in storage")]
    MissingCredential,

    #[error("No chat session identifier")]
    MissingSessionId,

    #[error("Message content is empty")]
    EmptyContent,

    #[error("Not connected to the chat server")]
    NotConnected,

    #[error("Failed to open chat connection: {0}")]
    ConnectFailed(String),

    #[error("Failed to encode outbound message: {0}")]
    Encode(String),
}
