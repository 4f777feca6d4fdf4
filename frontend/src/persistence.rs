//! Chat history: replay on request, save on page teardown.

use gloo_net::http::Request;
use shared::endpoints::{LATEST_MESSAGES_PATH, SAVE_HISTORY_PATH};
use shared::{ApiError, HistoryEntry, HistoryResponse};
use url::Url;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{Headers, RequestInit, Response};

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Interpret a history response. `204 No Content` or an empty body means the
/// user has no history yet.
pub fn parse_history(status: u16, body: &str) -> Result<Vec<HistoryEntry>, ApiError> {
    if status == 204 || ((200..300).contains(&status) && body.trim().is_empty()) {
        return Ok(Vec::new());
    }
    if !(200..300).contains(&status) {
        return Err(ApiError::from_status(status, body.trim()));
    }
    serde_json::from_str::<HistoryResponse>(body)
        .map(|response| response.data)
        .map_err(|e| ApiError::Parse(e.to_string()))
}

/// Fetch the latest persisted messages of the authenticated user.
pub async fn load_history(base_url: &str, token: &str) -> Result<Vec<HistoryEntry>, ApiError> {
    let url = format!("{}{}", base_url, LATEST_MESSAGES_PATH);
    let response = Request::get(&url)
        .header("Authorization", &bearer(token))
        .send()
        .await
        .map_err(|e| ApiError::Network(e.to_string()))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ApiError::Parse(e.to_string()))?;
    parse_history(status, &body)
}

/// Address of the save endpoint for one conversation.
pub fn save_url(base_url: &str, session_id: &str) -> Result<Url, url::ParseError> {
    Url::parse_with_params(
        &format!("{}{}", base_url, SAVE_HISTORY_PATH),
        [("chatSessionId", session_id)],
    )
}

/// Ask the backend to persist the conversation. Fire-and-forget: the page is
/// going away, so the request is sent with `keepalive` and failures are only
/// logged.
pub fn save_conversation(base_url: &str, session_id: &str, token: Option<String>) {
    let Some(token) = token else {
        log::warn!("No access token, not saving chat history");
        return;
    };
    let url = match save_url(base_url, session_id) {
        Ok(url) => url,
        Err(e) => {
            log::error!("Error saving chat history: bad URL {}: {}", base_url, e);
            return;
        }
    };
    let Some(window) = web_sys::window() else {
        return;
    };
    let request = match keepalive_post(url.as_str(), &token) {
        Ok(request) => request,
        Err(e) => {
            log::error!("Error saving chat history: {:?}", e);
            return;
        }
    };

    // Issued synchronously so the browser owns it before unload completes
    let pending = JsFuture::from(window.fetch_with_request(&request));
    let session_id = session_id.to_string();
    spawn_local(async move {
        match pending.await.and_then(|value| value.dyn_into::<Response>()) {
            Ok(response) if response.ok() => log::info!("Chat history saved for {}", session_id),
            Ok(response) => log::error!(
                "Error saving chat history: {}",
                ApiError::from_status(response.status(), response.status_text())
            ),
            Err(e) => log::error!("Error saving chat history: {:?}", e),
        }
    });
}

/// A bearer-authenticated POST that outlives the page.
fn keepalive_post(url: &str, token: &str) -> Result<web_sys::Request, JsValue> {
    let headers = Headers::new()?;
    headers.set("Authorization", &bearer(token))?;

    let init = RequestInit::new();
    init.set_method("POST");
    web_sys::js_sys::Reflect::set(&init, &JsValue::from_str("keepalive"), &JsValue::TRUE)?;
    init.set_headers(&headers);
    web_sys::Request::new_with_str_and_init(url, &init)
}
