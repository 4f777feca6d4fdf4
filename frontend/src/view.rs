//! Render model of the chat widget.
//!
//! The session writes here; the Yew component reads it. Nothing in this module
//! touches the DOM, which keeps the session logic testable off-browser.

use crate::utils;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Author {
    User,
    /// Bot, human agent or system notice
    Bot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptItem {
    Message {
        author: Author,
        content: String,
        /// `HH:MM` at render time
        time: String,
    },
    /// The "request human agent" button offered after a bot reply
    HumanSupportButton,
}

/// Side effects the component must carry out on the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Alert(String),
    Navigate(String),
    /// A send found no live connection; open one
    Reconnect,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatView {
    pub transcript: Vec<TranscriptItem>,
    pub loading: bool,
    pub starter: Vec<String>,
    pub starter_visible: bool,
    pub live_suggestions: Vec<String>,
    pub live_visible: bool,
    pub history_prompt_visible: bool,
    pub input: String,
    effects: Vec<Effect>,
}

impl ChatView {
    pub fn new() -> Self {
        Self {
            history_prompt_visible: true,
            ..Self::default()
        }
    }

    pub fn push_message(&mut self, author: Author, content: impl Into<String>) {
        self.transcript.push(TranscriptItem::Message {
            author,
            content: content.into(),
            time: utils::clock_label(),
        });
    }

    pub fn push_human_support_button(&mut self) {
        self.transcript.push(TranscriptItem::HumanSupportButton);
    }

    /// Messages in order, without buttons or timestamps.
    pub fn messages(&self) -> Vec<(Author, &str)> {
        self.transcript
            .iter()
            .filter_map(|item| match item {
                TranscriptItem::Message {
                    author, content, ..
                } => Some((*author, content.as_str())),
                TranscriptItem::HumanSupportButton => None,
            })
            .collect()
    }

    pub fn has_user_message(&self) -> bool {
        self.messages()
            .iter()
            .any(|(author, _)| *author == Author::User)
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn show_starter(&mut self, entries: Vec<String>) {
        self.starter_visible = !entries.is_empty();
        self.starter = entries;
    }

    pub fn hide_starter(&mut self) {
        self.starter_visible = false;
    }

    /// Show the live list; an empty list hides it instead.
    pub fn show_live(&mut self, entries: Vec<String>) {
        self.live_visible = !entries.is_empty();
        self.live_suggestions = entries;
    }

    pub fn hide_live(&mut self) {
        self.live_visible = false;
        self.live_suggestions.clear();
    }

    pub fn push_effect(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }
}
