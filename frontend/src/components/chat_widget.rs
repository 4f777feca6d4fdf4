//! ChatWidget component - draws the chat session and feeds DOM events into it

use crate::composer::GlooScheduler;
use crate::config::{resolve_base_url, ClientConfig};
use crate::identity::SessionId;
use crate::persistence;
use crate::session::{ChatSession, SuggestionSource};
use crate::storage::{load_token, BrowserStorage, TabStorage};
use crate::transport::{self, ConnectionId, TransportEvent};
use crate::utils;
use crate::view::{Author, Effect, TranscriptItem};
use gloo::events::EventListener;
use shared::{ApiError, HistoryEntry};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Element, HtmlTextAreaElement, KeyboardEvent};
use yew::prelude::*;

#[derive(Properties, PartialEq, Default)]
pub struct ChatWidgetProps {
    #[prop_or_default]
    pub config: ClientConfig,
}

pub enum ChatWidgetMsg {
    BaseUrlResolved(String),
    Transport(ConnectionId, TransportEvent),
    InputChanged(String),
    /// Typing paused; ask for live suggestions
    SuggestionDue(String),
    Send,
    PickStarter(String),
    PickSuggestion(String),
    RequestHumanSupport,
    LoadHistory,
    HistoryLoaded(Result<Vec<HistoryEntry>, ApiError>),
    SkipHistory,
}

pub struct ChatWidget {
    session: ChatSession,
    /// Backend base URL; the fallback until `/api/config/base-url` answers
    base_url: Rc<RefCell<String>>,
    messages_ref: NodeRef,
    _unload_listener: Option<EventListener>,
}

impl Component for ChatWidget {
    type Message = ChatWidgetMsg;
    type Properties = ChatWidgetProps;

    fn create(ctx: &Context<Self>) -> Self {
        let config = ctx.props().config.clone();
        let storage: Rc<dyn TabStorage> = Rc::new(BrowserStorage);
        let id = SessionId::load_or_create(storage.as_ref());
        let base_url = Rc::new(RefCell::new(config.fallback_base_url.clone()));

        // Save the conversation when the tab goes away
        let unload_listener = web_sys::window().map(|window| {
            let storage = storage.clone();
            let session_id = id.to_string();
            EventListener::new(&window, "beforeunload", move |_| {
                persistence::save_conversation(
                    &utils::get_base_url(),
                    &session_id,
                    load_token(storage.as_ref()),
                );
            })
        });

        {
            let link = ctx.link().clone();
            let config = config.clone();
            spawn_local(async move {
                let url = resolve_base_url(&config).await;
                link.send_message(ChatWidgetMsg::BaseUrlResolved(url));
            });
        }

        let session = ChatSession::new(id, config, storage, Rc::new(GlooScheduler));
        Self {
            session,
            base_url,
            messages_ref: NodeRef::default(),
            _unload_listener: unload_listener,
        }
    }

    fn rendered(&mut self, _ctx: &Context<Self>, _first_render: bool) {
        if let Some(element) = self.messages_ref.cast::<Element>() {
            element.set_scroll_top(element.scroll_height());
        }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            ChatWidgetMsg::BaseUrlResolved(url) => {
                log::info!("Chat backend at {}", url);
                *self.base_url.borrow_mut() = url;
                self.connect(ctx);
            }
            ChatWidgetMsg::Transport(connection, event) => {
                self.session.handle_transport_event(connection, event)
            }
            ChatWidgetMsg::InputChanged(text) => {
                let link = ctx.link().clone();
                self.session.input_changed(&text, move |due| {
                    link.send_message(ChatWidgetMsg::SuggestionDue(due))
                });
            }
            ChatWidgetMsg::SuggestionDue(text) => {
                if let Err(e) = self.session.request_suggestions(&text) {
                    log::debug!("Live suggestions not requested: {}", e);
                }
            }
            ChatWidgetMsg::Send => {
                if let Err(e) = self.session.send_message(None) {
                    log::warn!("Message not sent: {}", e);
                }
            }
            ChatWidgetMsg::PickStarter(text) => {
                if let Err(e) = self.session.choose_suggestion(&text, SuggestionSource::Starter) {
                    log::warn!("Suggestion not sent: {}", e);
                }
            }
            ChatWidgetMsg::PickSuggestion(text) => {
                if let Err(e) = self.session.choose_suggestion(&text, SuggestionSource::Live) {
                    log::warn!("Suggestion not sent: {}", e);
                }
            }
            ChatWidgetMsg::RequestHumanSupport => {
                if let Err(e) = self.session.request_human_support() {
                    log::warn!("Human support not requested: {}", e);
                }
            }
            ChatWidgetMsg::LoadHistory => self.load_history(ctx),
            ChatWidgetMsg::HistoryLoaded(result) => self.session.history_loaded(result),
            ChatWidgetMsg::SkipHistory => self.session.skip_history(),
        }
        self.run_effects(ctx);
        true
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let link = ctx.link();
        let view = self.session.view();
        let config = self.session.config();

        let handle_input = link.callback(|e: InputEvent| {
            let input: HtmlTextAreaElement = e.target_unchecked_into();
            ChatWidgetMsg::InputChanged(input.value())
        });

        let handle_keydown = link.batch_callback(|e: KeyboardEvent| {
            // Enter without Shift sends, unless an IME is mid-composition
            if e.key() == "Enter" && !e.shift_key() && !e.is_composing() {
                e.prevent_default();
                Some(ChatWidgetMsg::Send)
            } else {
                None
            }
        });

        let handle_send = link.callback(|e: MouseEvent| {
            e.prevent_default();
            ChatWidgetMsg::Send
        });

        html! {
            <div class="chat">
                <div class="chat-messages" ref={self.messages_ref.clone()}>
                    if view.history_prompt_visible {
                        <div class="msg bot history-prompt">
                            <button id="loadHistory" onclick={link.callback(|_| ChatWidgetMsg::LoadHistory)}>
                                { config.load_history_label.clone() }
                            </button>
                            <button id="skipHistory" onclick={link.callback(|_| ChatWidgetMsg::SkipHistory)}>
                                { config.skip_history_label.clone() }
                            </button>
                        </div>
                    }
                    { for view.transcript.iter().map(|item| self.render_item(ctx, item)) }
                    if view.loading {
                        <div class="msg bot loading">{ config.awaiting_reply_text.clone() }</div>
                    }
                </div>

                if view.starter_visible {
                    <div class="float">
                        { for view.starter.iter().map(|text| {
                            let choice = text.clone();
                            html! {
                                <button class="starter" onclick={link.callback(move |_| ChatWidgetMsg::PickStarter(choice.clone()))}>
                                    { text.clone() }
                                </button>
                            }
                        }) }
                    </div>
                }

                if view.live_visible {
                    <ul id="suggestions">
                        { for view.live_suggestions.iter().map(|text| {
                            let choice = text.clone();
                            html! {
                                <li onclick={link.callback(move |_| ChatWidgetMsg::PickSuggestion(choice.clone()))}>
                                    { text.clone() }
                                </li>
                            }
                        }) }
                    </ul>
                }

                <div class="textareaBox">
                    <textarea
                        value={view.input.clone()}
                        oninput={handle_input}
                        onkeydown={handle_keydown}
                        rows="1"
                    />
                    <button onclick={handle_send}>{ config.send_label.clone() }</button>
                </div>
            </div>
        }
    }
}

impl ChatWidget {
    fn render_item(&self, ctx: &Context<Self>, item: &TranscriptItem) -> Html {
        match item {
            TranscriptItem::Message {
                author,
                content,
                time,
            } => {
                let class = match author {
                    Author::User => "user",
                    Author::Bot => "bot",
                };
                html! {
                    <div class={classes!("msg", class)}>
                        <div class="bubble">{ content.clone() }</div>
                        <span class="time">{ time.clone() }</span>
                    </div>
                }
            }
            TranscriptItem::HumanSupportButton => html! {
                <div class="msg bot">
                    <button
                        class="human-support"
                        onclick={ctx.link().callback(|_| ChatWidgetMsg::RequestHumanSupport)}
                    >
                        { self.session.config().human_support_label.clone() }
                    </button>
                </div>
            },
        }
    }

    /// Open the STOMP connection with the stored credential, unless one is
    /// already open.
    fn connect(&mut self, ctx: &Context<Self>) {
        if self.session.is_attached() {
            log::debug!("Chat connection already open");
            return;
        }
        let Some(token) = self.session.token() else {
            self.session.connection_failed("no access token");
            return;
        };
        let connection = self.session.open_connection();
        let url = utils::ws_url(&self.session.config().socket_path);
        let link = ctx.link().clone();
        let on_event = Callback::from(move |event: TransportEvent| {
            link.send_message(ChatWidgetMsg::Transport(connection, event));
        });

        match transport::connect(&url, &utils::host(), &token, on_event) {
            Ok(connection) => {
                log::info!("Connecting to {}", url);
                self.session.attach(Box::new(connection));
            }
            Err(e) => self.session.connection_failed(&e.to_string()),
        }
    }

    fn load_history(&mut self, ctx: &Context<Self>) {
        let Some(token) = self.session.token() else {
            self.session
                .history_loaded(Err(ApiError::Auth("no access token".to_string())));
            return;
        };
        let base_url = self.base_url.borrow().clone();
        let link = ctx.link().clone();
        spawn_local(async move {
            let result = persistence::load_history(&base_url, &token).await;
            link.send_message(ChatWidgetMsg::HistoryLoaded(result));
        });
    }

    fn run_effects(&mut self, ctx: &Context<Self>) {
        loop {
            let effects = self.session.take_effects();
            if effects.is_empty() {
                break;
            }
            for effect in effects {
                match effect {
                    Effect::Alert(text) => {
                        if let Some(window) = web_sys::window() {
                            let _ = window.alert_with_message(&text);
                        }
                    }
                    Effect::Navigate(url) => {
                        if let Some(window) = web_sys::window() {
                            let _ = window.location().set_href(&url);
                        }
                    }
                    Effect::Reconnect => self.connect(ctx),
                }
            }
        }
    }
}
