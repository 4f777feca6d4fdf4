//! Client configuration and runtime base-URL discovery.

use crate::utils;
use gloo_net::http::Request;
use serde::Deserialize;
use shared::endpoints::BASE_URL_PATH;
use shared::protocol::{FALLBACK_BASE_URL, SUGGESTION_DEBOUNCE_MS};

/// Tunables and user-facing strings of the chat widget.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// WebSocket path of the STOMP endpoint, relative to the page origin
    pub socket_path: String,
    /// Used when the base URL cannot be fetched
    pub fallback_base_url: String,
    /// Where to send the user after the credential is rejected
    pub login_page: String,
    /// Quiet period before a live-suggestion request goes out
    pub suggestion_debounce_ms: u32,
    pub relogin_alert: String,
    pub handoff_notice: String,
    pub greeting: String,
    pub awaiting_reply_text: String,
    pub human_support_label: String,
    pub load_history_label: String,
    pub skip_history_label: String,
    pub send_label: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            socket_path: "/ws/websocket".to_string(),
            fallback_base_url: FALLBACK_BASE_URL.to_string(),
            login_page: "/account_login.html".to_string(),
            suggestion_debounce_ms: SUGGESTION_DEBOUNCE_MS,
            relogin_alert: "請重新登錄。".to_string(),
            handoff_notice: "您已成功切換到人工客服，請稍候，客服人員即將為您服務。".to_string(),
            greeting: "您好，請問您需要什麼協助？".to_string(),
            awaiting_reply_text: "請稍等回覆...".to_string(),
            human_support_label: "轉接人工客服".to_string(),
            load_history_label: "載入對話紀錄".to_string(),
            skip_history_label: "略過".to_string(),
            send_label: "送出".to_string(),
        }
    }
}

/// Pick the base URL from a fetched body, falling back on an empty one.
pub fn choose_base_url(fetched: Option<&str>, fallback: &str) -> String {
    fetched
        .map(|body| body.trim().trim_end_matches('/'))
        .filter(|body| !body.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

/// Fetch the backend base URL. Never fails: errors are logged and the
/// configured fallback is returned.
pub async fn resolve_base_url(config: &ClientConfig) -> String {
    let fetched = match Request::get(&utils::api_url(BASE_URL_PATH)).send().await {
        Ok(response) if response.ok() => match response.text().await {
            Ok(text) => Some(text),
            Err(e) => {
                log::error!("Error reading base URL: {:?}", e);
                None
            }
        },
        Ok(response) => {
            log::error!("Error fetching base URL: HTTP {}", response.status());
            None
        }
        Err(e) => {
            log::error!("Error fetching base URL: {:?}", e);
            None
        }
    };
    choose_base_url(fetched.as_deref(), &config.fallback_base_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choose_base_url() {
        assert_eq!(
            choose_base_url(Some(" https://chat.example.com/\n"), FALLBACK_BASE_URL),
            "https://chat.example.com"
        );
        assert_eq!(choose_base_url(Some("  "), FALLBACK_BASE_URL), FALLBACK_BASE_URL);
        assert_eq!(choose_base_url(None, FALLBACK_BASE_URL), FALLBACK_BASE_URL);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"suggestion_debounce_ms": 150}"#).unwrap();
        assert_eq!(config.suggestion_debounce_ms, 150);
        assert_eq!(config.socket_path, "/ws/websocket");
        assert_eq!(config.login_page, "/account_login.html");
    }
}
