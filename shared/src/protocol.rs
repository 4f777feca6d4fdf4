/// Storage key for the bearer credential written by the login page (profile scope).
pub const ACCESS_TOKEN_KEY: &str = "accessToken";

/// Storage key for the chat session identifier (tab scope).
pub const CHAT_SESSION_ID_KEY: &str = "chatSessionId";

/// Sender name the server expects on every client-originated message.
pub const USER_SENDER: &str = "User";

/// Fixed body of a human-support hand-off request.
pub const HUMAN_SUPPORT_REQUEST: &str = "REQUEST_HUMAN_SUPPORT";

/// Quiet period before a live-suggestion request is sent.
pub const SUGGESTION_DEBOUNCE_MS: u32 = 300;

/// Base URL used when `/api/config/base-url` cannot be fetched.
pub const FALLBACK_BASE_URL: &str = "http://localhost:8080";

/// STOMP protocol version negotiated on connect.
pub const STOMP_VERSION: &str = "1.2";
