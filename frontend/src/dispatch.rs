//! Classification of inbound chat messages.

use crate::router::ChannelRole;
use shared::{InboundMessage, MessageKind, Sender};

/// What the session should do with one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Our own message echoed back; already rendered on send
    Discard,
    BotMessage(String),
    /// Bot message plus the "request human agent" button
    HumanSupportOffer(String),
    /// Starter buttons shown before the first user turn
    StarterSuggestions(Vec<String>),
    /// Live suggestions under the input box; empty means hide the list
    LiveSuggestions(Vec<String>),
}

/// Handler name the server puts on its inline "talk to a human" button.
const HUMAN_SUPPORT_HANDLER: &str = "requestHumanSupport(";

pub fn classify(message: InboundMessage) -> Dispatch {
    if message.sender.is_user() {
        return Dispatch::Discard;
    }
    match message.kind {
        MessageKind::HumanSupportSuggestion => Dispatch::HumanSupportOffer(
            strip_human_support_button(&message.content).unwrap_or(message.content),
        ),
        MessageKind::FaqSuggestions => {
            Dispatch::StarterSuggestions(split_suggestions(&message.content))
        }
        MessageKind::Suggestions => Dispatch::LiveSuggestions(split_suggestions(&message.content)),
        MessageKind::Chat | MessageKind::Other => {
            match strip_human_support_button(&message.content) {
                Some(text) => Dispatch::HumanSupportOffer(text),
                None => Dispatch::BotMessage(message.content),
            }
        }
    }
}

/// Remove every inline `<button ...requestHumanSupport()...>...</button>`
/// from `content`. `None` when there was no such button.
pub fn strip_human_support_button(content: &str) -> Option<String> {
    let mut rest = content;
    let mut kept = String::with_capacity(content.len());
    let mut found = false;

    while let Some(start) = rest.find("<button") {
        let Some(len) = rest[start..].find("</button>") else {
            break;
        };
        let end = start + len + "</button>".len();
        kept.push_str(&rest[..start]);
        if rest[start..end].contains(HUMAN_SUPPORT_HANDLER) {
            found = true;
        } else {
            kept.push_str(&rest[start..end]);
        }
        rest = &rest[end..];
    }
    kept.push_str(rest);

    found.then(|| kept.trim().to_string())
}

/// Newline-delimited list, blank entries dropped.
pub fn split_suggestions(content: &str) -> Vec<String> {
    content
        .split('\n')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Decode a reply-queue body.
///
/// The agent queue also carries bare text (a JSON string or raw text such as
/// `Agent connected`); that becomes a plain message from the channel's role.
/// Returns `None` for an empty body.
pub fn decode_body(body: &str, role: ChannelRole) -> Option<InboundMessage> {
    if let Ok(message) = serde_json::from_str::<InboundMessage>(body) {
        return Some(message);
    }
    let text = serde_json::from_str::<String>(body).unwrap_or_else(|_| body.to_string());
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let sender = match role {
        ChannelRole::Agent => Sender::Agent,
        _ => Sender::Bot,
    };
    Some(InboundMessage::new(MessageKind::Chat, text, sender))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(kind: MessageKind, content: &str, sender: Sender) -> InboundMessage {
        InboundMessage::new(kind, content, sender)
    }

    #[test]
    fn test_user_messages_are_discarded_for_every_kind() {
        for kind in [
            MessageKind::Chat,
            MessageKind::FaqSuggestions,
            MessageKind::Suggestions,
            MessageKind::HumanSupportSuggestion,
            MessageKind::Other,
        ] {
            assert_eq!(classify(msg(kind, "hi", Sender::User)), Dispatch::Discard);
        }
    }

    #[test]
    fn test_routing_by_kind() {
        assert_eq!(
            classify(msg(MessageKind::Chat, "hello", Sender::Bot)),
            Dispatch::BotMessage("hello".into())
        );
        assert_eq!(
            classify(msg(MessageKind::Other, "queued", Sender::Other)),
            Dispatch::BotMessage("queued".into())
        );
        assert_eq!(
            classify(msg(MessageKind::HumanSupportSuggestion, "sorry", Sender::Bot)),
            Dispatch::HumanSupportOffer("sorry".into())
        );
        assert_eq!(
            classify(msg(MessageKind::FaqSuggestions, "Q1\nQ2\n", Sender::Bot)),
            Dispatch::StarterSuggestions(vec!["Q1".into(), "Q2".into()])
        );
        assert_eq!(
            classify(msg(
                MessageKind::Suggestions,
                "Check refund\nContact support",
                Sender::Bot
            )),
            Dispatch::LiveSuggestions(vec!["Check refund".into(), "Contact support".into()])
        );
    }

    #[test]
    fn test_inline_human_support_button_becomes_an_offer() {
        let content = "很抱歉，我無法回答您的問題。是否需要轉接人工客服？<button onclick='requestHumanSupport()'>轉接人工客服</button>";
        assert_eq!(
            classify(msg(MessageKind::Chat, content, Sender::Bot)),
            Dispatch::HumanSupportOffer("很抱歉，我無法回答您的問題。是否需要轉接人工客服？".into())
        );

        let prompt = "您是否需要轉接人工客服？<button onclick='requestHumanSupport()'>轉接人工客服</button>";
        assert_eq!(
            classify(msg(MessageKind::HumanSupportSuggestion, prompt, Sender::Bot)),
            Dispatch::HumanSupportOffer("您是否需要轉接人工客服？".into())
        );
    }

    #[test]
    fn test_other_buttons_are_left_alone() {
        let content = "Pick one <button onclick='other()'>Go</button>";
        assert_eq!(strip_human_support_button(content), None);
        assert_eq!(
            classify(msg(MessageKind::Chat, content, Sender::Bot)),
            Dispatch::BotMessage(content.into())
        );
        assert_eq!(
            strip_human_support_button(
                "<button onclick='other()'>Go</button> or <button onclick=\"requestHumanSupport()\">Human</button>"
            ),
            Some("<button onclick='other()'>Go</button> or".into())
        );
        assert_eq!(strip_human_support_button("<button onclick='requestHumanSupport()'>"), None);
    }

    #[test]
    fn test_blank_suggestions_are_filtered() {
        assert_eq!(split_suggestions(""), Vec::<String>::new());
        assert_eq!(split_suggestions(" \n\t\n  "), Vec::<String>::new());
        assert_eq!(split_suggestions("a\n \nb\r\n"), vec!["a", "b"]);
    }

    #[test]
    fn test_decode_json_message() {
        let decoded = decode_body(
            r#"{"type":"CHAT","content":"hi","sender":"Bot"}"#,
            ChannelRole::Bot,
        )
        .unwrap();
        assert_eq!(decoded.sender, Sender::Bot);
        assert_eq!(decoded.content, "hi");
    }

    #[test]
    fn test_decode_bare_agent_text() {
        let raw = decode_body("Agent connected", ChannelRole::Agent).unwrap();
        assert_eq!(raw.sender, Sender::Agent);
        assert_eq!(raw.content, "Agent connected");

        let quoted = decode_body("\"summary\"", ChannelRole::Agent).unwrap();
        assert_eq!(quoted.content, "summary");

        assert_eq!(decode_body("  ", ChannelRole::Agent), None);
    }
}
