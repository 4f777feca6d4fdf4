//! The chat session: one object owning the connection handle, the channel
//! router, the conversation flags and the render model.
//!
//! Every browser-side event (socket frame, timer, click, keystroke, HTTP
//! completion) is fed in through a method here. The Yew component only wires
//! DOM events to these methods and draws [`ChatView`].

use crate::composer::{Composer, Outbound, Scheduler};
use crate::config::ClientConfig;
use crate::dispatch::{classify, decode_body, Dispatch};
use crate::error::ChatError;
use crate::identity::SessionId;
use crate::router::{parse_handoff_body, ChannelRole, ChannelRouter, Handoff};
use crate::state::ConversationState;
use crate::storage::{clear_token, load_token, TabStorage};
use crate::transport::{ConnectionId, Transport, TransportEvent};
use crate::view::{Author, ChatView, Effect};
use shared::{ApiError, HistoryEntry, InboundMessage, OutboundMessage};
use std::rc::Rc;

/// Which surface a clicked suggestion came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionSource {
    Starter,
    Live,
}

pub struct ChatSession {
    id: SessionId,
    config: ClientConfig,
    storage: Rc<dyn TabStorage>,
    transport: Option<Box<dyn Transport>>,
    /// Generation of the newest connection; events from older ones are dropped
    connection: ConnectionId,
    router: ChannelRouter,
    state: ConversationState,
    composer: Composer,
    view: ChatView,
    /// Set once the user has been told to log in again
    auth_failure_reported: bool,
}

impl ChatSession {
    pub fn new(
        id: SessionId,
        config: ClientConfig,
        storage: Rc<dyn TabStorage>,
        scheduler: Rc<dyn Scheduler>,
    ) -> Self {
        let router = ChannelRouter::new(id.as_str());
        let composer = Composer::new(scheduler, config.suggestion_debounce_ms);
        Self {
            id,
            config,
            storage,
            transport: None,
            connection: 0,
            router,
            state: ConversationState::new(),
            composer,
            view: ChatView::new(),
            auth_failure_reported: false,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn view(&self) -> &ChatView {
        &self.view
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn router(&self) -> &ChannelRouter {
        &self.router
    }

    pub fn is_attached(&self) -> bool {
        self.transport.is_some()
    }

    pub fn take_effects(&mut self) -> Vec<Effect> {
        self.view.take_effects()
    }

    /// Current credential, if any.
    pub fn token(&self) -> Option<String> {
        load_token(self.storage.as_ref())
    }

    /// Start a new connection generation. Events tagged with any earlier
    /// generation are ignored from now on.
    pub fn open_connection(&mut self) -> ConnectionId {
        self.connection += 1;
        self.connection
    }

    /// Adopt a freshly opened connection. Subscriptions are made once the
    /// broker confirms the login.
    pub fn attach(&mut self, transport: Box<dyn Transport>) {
        self.transport = Some(transport);
    }

    /// The connection could not even be opened (no token, bad URL).
    pub fn connection_failed(&mut self, reason: &str) {
        self.on_failed(reason);
    }

    pub fn handle_transport_event(&mut self, connection: ConnectionId, event: TransportEvent) {
        if connection != self.connection {
            log::debug!(
                "Dropping {:?} from stale connection {} (current {})",
                event,
                connection,
                self.connection
            );
            return;
        }
        match event {
            TransportEvent::Connected => self.on_connected(),
            TransportEvent::Message { subscription, body } => {
                self.on_delivery(&subscription, &body)
            }
            TransportEvent::Receipt(receipt_id) => {
                let Some(transport) = self.transport.as_deref_mut() else {
                    return;
                };
                let outcome = self.router.on_receipt(&receipt_id, transport);
                self.after_handoff(outcome);
            }
            TransportEvent::Failed(reason) => self.on_failed(&reason),
        }
    }

    fn on_connected(&mut self) {
        let Some(transport) = self.transport.as_deref_mut() else {
            return;
        };
        log::info!("Connected to chat server as {}", self.id);
        let outcome = self.router.start(transport);
        self.after_handoff(outcome);

        for outbound in [Outbound::connect_notice(), Outbound::initial_faq()] {
            let destination = outbound.destination;
            if let Err(e) = self.publish(outbound) {
                log::warn!("Skipping {}: {}", destination, e);
            }
        }
    }

    fn on_delivery(&mut self, subscription: &str, body: &str) {
        match self.router.role_of(subscription) {
            Some(ChannelRole::Handoff) => {
                let announced = parse_handoff_body(body);
                let Some(transport) = self.transport.as_deref_mut() else {
                    return;
                };
                let outcome = self.router.on_handoff(&announced, transport);
                self.after_handoff(outcome);
            }
            Some(role) => {
                self.reply_received();
                match decode_body(body, role) {
                    Some(message) => self.dispatch(message),
                    None => log::debug!("Empty message on {:?} channel", role),
                }
            }
            None => log::debug!("Message for stale subscription {}", subscription),
        }
    }

    fn after_handoff(&mut self, outcome: Handoff) {
        if outcome == Handoff::Applied {
            let notice = self.config.handoff_notice.clone();
            self.view.push_message(Author::Bot, notice);
        }
    }

    fn on_failed(&mut self, reason: &str) {
        self.transport = None;
        self.router.reset();
        self.state.reset();
        self.view.set_loading(false);

        if self.auth_failure_reported {
            log::debug!("Suppressing repeated connection error: {}", reason);
            return;
        }
        self.auth_failure_reported = true;
        log::error!("Chat connection error: {}", reason);
        clear_token(self.storage.as_ref());
        self.view
            .push_effect(Effect::Alert(self.config.relogin_alert.clone()));
        self.view
            .push_effect(Effect::Navigate(self.config.login_page.clone()));
    }

    fn reply_received(&mut self) {
        self.state.reply_received();
        self.view.set_loading(false);
    }

    /// Route one decoded message to the render model.
    pub fn dispatch(&mut self, message: InboundMessage) {
        match classify(message) {
            Dispatch::Discard => {}
            Dispatch::BotMessage(content) => self.view.push_message(Author::Bot, content),
            Dispatch::HumanSupportOffer(content) => {
                self.view.push_message(Author::Bot, content);
                self.view.push_human_support_button();
            }
            Dispatch::StarterSuggestions(entries) => {
                if self.state.has_started() || self.view.has_user_message() {
                    self.view.starter = entries;
                    self.view.hide_starter();
                } else {
                    self.view.show_starter(entries);
                }
            }
            Dispatch::LiveSuggestions(entries) => self.show_live_suggestions(entries),
        }
    }

    fn show_live_suggestions(&mut self, entries: Vec<String>) {
        if entries.is_empty() {
            self.hide_live_suggestions();
            return;
        }
        self.view.show_live(entries);
        self.view.hide_starter();
        self.state.set_suggestions_visible(true);
    }

    fn hide_live_suggestions(&mut self) {
        self.view.hide_live();
        self.state.set_suggestions_visible(false);
        if !self.state.has_started() && !self.view.has_user_message() && !self.view.starter.is_empty()
        {
            self.view.starter_visible = true;
        }
    }

    /// Token of the current user, or why nothing may be sent.
    fn credentials(&self) -> Result<String, ChatError> {
        let token = self.token().ok_or(ChatError::MissingCredential)?;
        if self.id.as_str().is_empty() {
            return Err(ChatError::MissingSessionId);
        }
        Ok(token)
    }

    fn publish(&mut self, outbound: Outbound) -> Result<(), ChatError> {
        let token = self.credentials()?;
        let transport = self.transport.as_mut().ok_or(ChatError::NotConnected)?;
        let message = OutboundMessage::new(outbound.kind, self.id.as_str(), outbound.content, token);
        let body = serde_json::to_string(&message).map_err(|e| ChatError::Encode(e.to_string()))?;
        transport.send(outbound.destination.path(), body);
        Ok(())
    }

    /// Send a chat turn from `explicit` text or, failing that, the input box.
    ///
    /// Nothing is rendered unless content, credential and session id are all
    /// present. Without a connection the turn is still rendered and a
    /// reconnect is requested, but the message itself is not sent.
    pub fn send_message(&mut self, explicit: Option<&str>) -> Result<(), ChatError> {
        let content = Composer::resolve_content(explicit, &self.view.input)?;
        self.credentials()?;

        self.view.push_message(Author::User, content.clone());
        self.state.begin_turn();
        self.view.set_loading(true);
        self.view.input.clear();
        self.view.hide_starter();
        self.view.hide_live();
        self.composer.cancel_pending();

        if self.transport.is_none() {
            log::warn!("No chat connection; reconnecting, message not sent");
            self.view.push_effect(Effect::Reconnect);
            return Ok(());
        }
        self.publish(Outbound::chat(content))
    }

    /// A suggestion button was clicked: send its text, then close the
    /// surface it came from.
    pub fn choose_suggestion(
        &mut self,
        text: &str,
        source: SuggestionSource,
    ) -> Result<(), ChatError> {
        let result = self.send_message(Some(text));
        match source {
            SuggestionSource::Starter => self.view.hide_starter(),
            SuggestionSource::Live => self.hide_live_suggestions(),
        }
        result
    }

    /// The input box changed. `on_due` fires with the trimmed text once
    /// typing pauses; it should come back through [`Self::request_suggestions`].
    pub fn input_changed(&mut self, text: &str, on_due: impl FnOnce(String) + 'static) {
        self.view.input = text.to_string();
        if text.trim().is_empty() {
            self.composer.cancel_pending();
            self.hide_live_suggestions();
            return;
        }
        self.composer.input_changed(text, on_due);
    }

    /// Ask for live suggestions for `text`. Empty input hides the list.
    pub fn request_suggestions(&mut self, text: &str) -> Result<(), ChatError> {
        let text = text.trim();
        if text.is_empty() {
            self.hide_live_suggestions();
            return Ok(());
        }
        let result = self.publish(Outbound::suggestions(text));
        if result.is_err() {
            self.view.hide_live();
        }
        result
    }

    pub fn request_human_support(&mut self) -> Result<(), ChatError> {
        if self.transport.is_none() {
            return Err(ChatError::NotConnected);
        }
        self.publish(Outbound::human_support())?;
        log::info!("Requested human support for {}", self.id);
        Ok(())
    }

    /// "Skip" on the history prompt.
    pub fn skip_history(&mut self) {
        self.view.history_prompt_visible = false;
        let greeting = self.config.greeting.clone();
        self.view.push_message(Author::Bot, greeting);
    }

    pub fn history_loaded(&mut self, result: Result<Vec<HistoryEntry>, ApiError>) {
        self.view.history_prompt_visible = false;
        match result {
            Ok(entries) => {
                log::info!("Replaying {} history messages", entries.len());
                self.replay_history(entries);
            }
            Err(e) => log::error!("Failed to load chat history: {}", e),
        }
    }

    /// Render persisted messages through the live rendering path.
    /// Anything not authored by the user gets bot styling.
    pub fn replay_history(&mut self, entries: Vec<HistoryEntry>) {
        for entry in entries {
            if entry.sender.is_user() {
                self.view.push_message(Author::User, entry.content);
                self.state.user_message_rendered();
                self.view.hide_starter();
            } else {
                self.view.push_message(Author::Bot, entry.content);
            }
        }
    }
}
