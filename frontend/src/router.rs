//! Which broker channels the client listens on, and the bot -> agent hand-off.
//!
//! ```text
//! Pending --(bot queue SUBSCRIBE queued)--> BotRouted --(hand-off for us)--> AgentRouted
//! ```
//!
//! Frames leave through one ordered writer, so the bot queue counts as live
//! once its SUBSCRIBE is queued; brokers are not required to answer the
//! receipt request. A hand-off announced while still `Pending` is remembered
//! and applied by the next [`ChannelRouter::start`]. `AgentRouted` is terminal.

use crate::transport::{SubscriptionId, Transport};
use shared::endpoints::{agent_queue, bot_reply_queue, SESSION_SWITCH_TOPIC};
use std::collections::HashMap;

/// Receipt id requested on the bot-queue SUBSCRIBE.
pub const BOT_QUEUE_RECEIPT: &str = "bot-queue-ready";

/// Logical role of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelRole {
    /// Bot replies for this session
    Bot,
    /// Human-agent replies for this session
    Agent,
    /// Broadcast of sessions being handed to agents
    Handoff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteState {
    /// No live bot subscription
    Pending,
    BotRouted,
    AgentRouted,
}

/// Result of feeding the router a hand-off related event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handoff {
    /// Not for this session, or already switched
    Ignored,
    /// Arrived before the bot queue was subscribed; applied on start
    Queued,
    /// Subscriptions moved to the agent queue just now
    Applied,
}

pub struct ChannelRouter {
    session_id: String,
    state: RouteState,
    subscriptions: HashMap<ChannelRole, SubscriptionId>,
    handoff_queued: bool,
}

impl ChannelRouter {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            state: RouteState::Pending,
            subscriptions: HashMap::new(),
            handoff_queued: false,
        }
    }

    pub fn state(&self) -> RouteState {
        self.state
    }

    pub fn subscription(&self, role: ChannelRole) -> Option<&str> {
        self.subscriptions.get(&role).map(String::as_str)
    }

    pub fn role_of(&self, subscription: &str) -> Option<ChannelRole> {
        self.subscriptions
            .iter()
            .find(|(_, id)| id.as_str() == subscription)
            .map(|(role, _)| *role)
    }

    /// Set up subscriptions on a freshly connected transport.
    ///
    /// A conversation that was already escalated goes straight back to the
    /// agent queue. A hand-off queued while disconnected is applied here.
    pub fn start(&mut self, transport: &mut dyn Transport) -> Handoff {
        self.subscriptions.clear();
        if self.state == RouteState::AgentRouted {
            let id = transport.subscribe(&agent_queue(&self.session_id), None);
            self.subscriptions.insert(ChannelRole::Agent, id);
        } else {
            let id = transport.subscribe(
                &bot_reply_queue(&self.session_id),
                Some(BOT_QUEUE_RECEIPT),
            );
            self.subscriptions.insert(ChannelRole::Bot, id);
            self.state = RouteState::BotRouted;
        }
        let id = transport.subscribe(SESSION_SWITCH_TOPIC, None);
        self.subscriptions.insert(ChannelRole::Handoff, id);

        if std::mem::take(&mut self.handoff_queued) && self.state == RouteState::BotRouted {
            self.switch_to_agent(transport);
            Handoff::Applied
        } else {
            Handoff::Ignored
        }
    }

    /// The connection is gone; its subscriptions died with it.
    pub fn reset(&mut self) {
        self.subscriptions.clear();
        if self.state == RouteState::BotRouted {
            self.state = RouteState::Pending;
        }
    }

    /// Broker confirmation of the bot-queue SUBSCRIBE. Only acts if the
    /// route is somehow still `Pending` when it arrives.
    pub fn on_receipt(&mut self, receipt_id: &str, transport: &mut dyn Transport) -> Handoff {
        if receipt_id != BOT_QUEUE_RECEIPT || self.state != RouteState::Pending {
            return Handoff::Ignored;
        }
        if !self.subscriptions.contains_key(&ChannelRole::Bot) {
            return Handoff::Ignored;
        }
        self.state = RouteState::BotRouted;
        log::debug!("Bot queue confirmed for {}", self.session_id);

        if std::mem::take(&mut self.handoff_queued) {
            self.switch_to_agent(transport);
            Handoff::Applied
        } else {
            Handoff::Ignored
        }
    }

    /// Handle a hand-off broadcast naming `announced`.
    pub fn on_handoff(&mut self, announced: &str, transport: &mut dyn Transport) -> Handoff {
        if announced != self.session_id {
            return Handoff::Ignored;
        }
        match self.state {
            RouteState::Pending => {
                log::info!("Hand-off for {} queued until the next connection", announced);
                self.handoff_queued = true;
                Handoff::Queued
            }
            RouteState::BotRouted => {
                self.switch_to_agent(transport);
                Handoff::Applied
            }
            RouteState::AgentRouted => Handoff::Ignored,
        }
    }

    fn switch_to_agent(&mut self, transport: &mut dyn Transport) {
        log::info!("Switching to agent channel for session {}", self.session_id);
        let agent = transport.subscribe(&agent_queue(&self.session_id), None);
        self.subscriptions.insert(ChannelRole::Agent, agent);
        if let Some(bot) = self.subscriptions.remove(&ChannelRole::Bot) {
            transport.unsubscribe(&bot);
        }
        self.state = RouteState::AgentRouted;
    }
}

/// Session id carried by a hand-off broadcast: a JSON string or a bare id.
pub fn parse_handoff_body(body: &str) -> String {
    serde_json::from_str::<String>(body)
        .unwrap_or_else(|_| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Op, RecordingTransport};

    const SESSION: &str = "1700000000000_abc123xyz";

    fn started() -> (ChannelRouter, RecordingTransport) {
        let mut transport = RecordingTransport::new();
        let mut router = ChannelRouter::new(SESSION);
        assert_eq!(router.start(&mut transport), Handoff::Ignored);
        (router, transport)
    }

    #[test]
    fn test_start_subscribes_bot_queue_and_broadcast() {
        let (router, transport) = started();
        assert_eq!(router.state(), RouteState::BotRouted);
        assert_eq!(
            transport.subscribed_destinations(),
            vec![bot_reply_queue(SESSION), SESSION_SWITCH_TOPIC.to_string()]
        );
        let bot = router.subscription(ChannelRole::Bot).unwrap();
        assert_eq!(router.role_of(bot), Some(ChannelRole::Bot));
        assert!(matches!(
            &transport.ops()[0],
            Op::Subscribe { receipt: Some(r), .. } if r == BOT_QUEUE_RECEIPT
        ));
    }

    #[test]
    fn test_handoff_for_this_session_switches_once() {
        let (mut router, mut transport) = started();
        assert_eq!(router.state(), RouteState::BotRouted);
        let bot = router.subscription(ChannelRole::Bot).unwrap().to_string();

        assert_eq!(router.on_handoff(SESSION, &mut transport), Handoff::Applied);
        assert_eq!(router.on_handoff(SESSION, &mut transport), Handoff::Ignored);

        assert_eq!(router.state(), RouteState::AgentRouted);
        assert_eq!(router.subscription(ChannelRole::Bot), None);
        let ops = transport.ops();
        let agent_subs: Vec<_> = ops
            .iter()
            .filter(|op| matches!(op, Op::Subscribe { destination, .. } if *destination == agent_queue(SESSION)))
            .collect();
        assert_eq!(agent_subs.len(), 1);
        // Subscribe to the agent queue before dropping the bot queue
        assert!(matches!(ops[ops.len() - 2], Op::Subscribe { .. }));
        assert_eq!(ops[ops.len() - 1], Op::Unsubscribe(bot));
    }

    #[test]
    fn test_handoff_for_other_session_is_ignored() {
        let (mut router, mut transport) = started();
        let before = transport.ops().len();

        assert_eq!(
            router.on_handoff("1700000000000_other", &mut transport),
            Handoff::Ignored
        );
        assert_eq!(router.state(), RouteState::BotRouted);
        assert_eq!(transport.ops().len(), before);
    }

    #[test]
    fn test_early_handoff_is_applied_on_start() {
        let mut transport = RecordingTransport::new();
        let mut router = ChannelRouter::new(SESSION);
        assert_eq!(router.on_handoff(SESSION, &mut transport), Handoff::Queued);
        assert_eq!(router.state(), RouteState::Pending);
        assert!(transport.ops().is_empty());

        assert_eq!(router.start(&mut transport), Handoff::Applied);
        assert_eq!(router.state(), RouteState::AgentRouted);
        assert!(router.subscription(ChannelRole::Agent).is_some());
        assert_eq!(router.subscription(ChannelRole::Bot), None);
    }

    #[test]
    fn test_bot_queue_is_live_without_receipt() {
        let (mut router, mut transport) = started();
        // No RECEIPT ever arrives; the hand-off still switches channels
        assert_eq!(router.on_handoff(SESSION, &mut transport), Handoff::Applied);
        assert_eq!(router.state(), RouteState::AgentRouted);

        // A late receipt changes nothing
        let before = transport.ops().len();
        assert_eq!(
            router.on_receipt(BOT_QUEUE_RECEIPT, &mut transport),
            Handoff::Ignored
        );
        assert_eq!(transport.ops().len(), before);
    }

    #[test]
    fn test_unrelated_receipt_is_ignored() {
        let (mut router, mut transport) = started();
        assert_eq!(router.on_receipt("other", &mut transport), Handoff::Ignored);
        assert_eq!(router.state(), RouteState::BotRouted);
    }

    #[test]
    fn test_reconnect_after_escalation_uses_agent_queue() {
        let (mut router, mut transport) = started();
        router.on_handoff(SESSION, &mut transport);
        router.reset();

        let mut fresh = RecordingTransport::new();
        router.start(&mut fresh);
        assert_eq!(router.state(), RouteState::AgentRouted);
        assert_eq!(
            fresh.subscribed_destinations(),
            vec![agent_queue(SESSION), SESSION_SWITCH_TOPIC.to_string()]
        );
    }

    #[test]
    fn test_parse_handoff_body() {
        assert_eq!(parse_handoff_body("\"17_abc\""), "17_abc");
        assert_eq!(parse_handoff_body("17_abc\n"), "17_abc");
    }
}
