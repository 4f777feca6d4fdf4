//! Chat session identifier: `<millis>_<base36 random>`, one per tab.

use crate::storage::TabStorage;
use shared::protocol::CHAT_SESSION_ID_KEY;

/// Length of the random suffix.
const SUFFIX_LEN: usize = 9;

/// Identifier of one logical conversation.
///
/// Uniqueness is probabilistic; a collision only risks cross-talk between
/// tabs of the same browser profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Build an identifier from a millisecond timestamp and random bits.
    pub fn generate(now_millis: i64, entropy: u128) -> Self {
        Self(format!("{}_{}", now_millis, base36(entropy, SUFFIX_LEN)))
    }

    /// Build an identifier from the wall clock and a v4 UUID's random bits.
    pub fn fresh() -> Self {
        Self::generate(
            chrono::Utc::now().timestamp_millis(),
            uuid::Uuid::new_v4().as_u128(),
        )
    }

    /// Reuse the identifier stored for this tab, or create and store one.
    pub fn load_or_create(storage: &dyn TabStorage) -> Self {
        if let Some(existing) = storage
            .get(CHAT_SESSION_ID_KEY)
            .filter(|id| !id.trim().is_empty())
        {
            return Self(existing);
        }
        let id = Self::fresh();
        storage.set(CHAT_SESSION_ID_KEY, id.as_str());
        log::info!("Created chat session {}", id);
        id
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn base36(mut value: u128, len: usize) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut out = vec![b'0'; len];
    for slot in out.iter_mut().rev() {
        *slot = DIGITS[(value % 36) as usize];
        value /= 36;
    }
    // Only ASCII digits were written
    String::from_utf8_lossy(&out).into_owned()
}
