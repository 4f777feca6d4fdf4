use web_sys::window;

fn location_parts() -> (String, String) {
    let location = window().map(|w| w.location());
    let protocol = location
        .as_ref()
        .and_then(|l| l.protocol().ok())
        .unwrap_or_else(|| "http:".to_string());
    let host = location
        .as_ref()
        .and_then(|l| l.host().ok())
        .unwrap_or_else(|| "localhost:8080".to_string());
    (protocol, host)
}

/// Host of the page (e.g., "localhost:8080"), sent as the STOMP `host` header
pub fn host() -> String {
    location_parts().1
}

/// Get the base HTTP URL of the page (e.g., "http://localhost:8080")
pub fn get_base_url() -> String {
    let (protocol, host) = location_parts();
    format!("{}//{}", protocol, host)
}

/// Get the WebSocket URL (e.g., "ws://localhost:8080" or "wss://chat.example.com")
pub fn get_ws_url() -> String {
    let (protocol, host) = location_parts();
    let ws_protocol = if protocol == "https:" { "wss:" } else { "ws:" };
    format!("{}//{}", ws_protocol, host)
}

/// Build a full API URL from a path (e.g., "/api/config/base-url" -> "http://localhost:8080/api/config/base-url")
pub fn api_url(path: &str) -> String {
    format!("{}{}", get_base_url(), path)
}

/// Build a full WebSocket URL from a path (e.g., "/ws/websocket" -> "ws://localhost:8080/ws/websocket")
pub fn ws_url(path: &str) -> String {
    format!("{}{}", get_ws_url(), path)
}

/// Local wall-clock time as `HH:MM`, stamped on rendered messages
pub fn clock_label() -> String {
    chrono::Local::now().format("%H:%M").to_string()
}
