//! Outbound composer: turns user intent into protocol messages and debounces
//! live-suggestion queries.

use crate::error::ChatError;
use shared::protocol::HUMAN_SUPPORT_REQUEST;
use shared::{AppDestination, OutboundKind};
use std::rc::Rc;

/// Keeps a scheduled task alive; dropping it cancels the task.
pub struct TimerGuard {
    _inner: Box<dyn std::any::Any>,
}

impl TimerGuard {
    pub fn new<T: 'static>(inner: T) -> Self {
        Self {
            _inner: Box::new(inner),
        }
    }
}

/// Source of one-shot timers.
pub trait Scheduler {
    fn schedule(&self, delay_ms: u32, task: Box<dyn FnOnce()>) -> TimerGuard;
}

/// Browser timers (`setTimeout`); dropping the guard clears the timeout.
#[derive(Clone, Copy, Debug, Default)]
pub struct GlooScheduler;

impl Scheduler for GlooScheduler {
    fn schedule(&self, delay_ms: u32, task: Box<dyn FnOnce()>) -> TimerGuard {
        TimerGuard::new(gloo::timers::callback::Timeout::new(delay_ms, task))
    }
}

/// Runs only the most recently armed task, once the delay passes without
/// another call to [`Debouncer::arm`].
pub struct Debouncer {
    scheduler: Rc<dyn Scheduler>,
    delay_ms: u32,
    pending: Option<TimerGuard>,
}

impl Debouncer {
    pub fn new(scheduler: Rc<dyn Scheduler>, delay_ms: u32) -> Self {
        Self {
            scheduler,
            delay_ms,
            pending: None,
        }
    }

    pub fn arm(&mut self, task: impl FnOnce() + 'static) {
        self.pending = None;
        self.pending = Some(self.scheduler.schedule(self.delay_ms, Box::new(task)));
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

/// One message ready to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub destination: AppDestination,
    pub kind: OutboundKind,
    pub content: String,
}

impl Outbound {
    pub fn connect_notice() -> Self {
        Self {
            destination: AppDestination::Connect,
            kind: OutboundKind::Connect,
            content: String::new(),
        }
    }

    pub fn initial_faq() -> Self {
        Self {
            destination: AppDestination::InitialFaq,
            kind: OutboundKind::InitialFaq,
            content: String::new(),
        }
    }

    pub fn chat(content: impl Into<String>) -> Self {
        Self {
            destination: AppDestination::SendMessage,
            kind: OutboundKind::Chat,
            content: content.into(),
        }
    }

    pub fn suggestions(content: impl Into<String>) -> Self {
        Self {
            destination: AppDestination::Suggestions,
            kind: OutboundKind::Suggestions,
            content: content.into(),
        }
    }

    pub fn human_support() -> Self {
        Self {
            destination: AppDestination::RequestHumanSupport,
            kind: OutboundKind::Chat,
            content: HUMAN_SUPPORT_REQUEST.to_string(),
        }
    }
}

pub struct Composer {
    debouncer: Debouncer,
}

impl Composer {
    pub fn new(scheduler: Rc<dyn Scheduler>, debounce_ms: u32) -> Self {
        Self {
            debouncer: Debouncer::new(scheduler, debounce_ms),
        }
    }

    /// Content of a chat turn: the explicit text if it has any, else the
    /// input box, trimmed either way.
    pub fn resolve_content(explicit: Option<&str>, input: &str) -> Result<String, ChatError> {
        let content = explicit
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| input.trim());
        if content.is_empty() {
            Err(ChatError::EmptyContent)
        } else {
            Ok(content.to_string())
        }
    }

    /// Re-arm the live-suggestion timer with the input as it is now.
    /// `on_due` receives the trimmed text once typing pauses.
    pub fn input_changed(&mut self, text: &str, on_due: impl FnOnce(String) + 'static) {
        let text = text.trim().to_string();
        self.debouncer.arm(move || on_due(text));
    }

    pub fn cancel_pending(&mut self) {
        self.debouncer.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ManualScheduler;
    use std::cell::RefCell;

    fn composer(scheduler: &ManualScheduler) -> Composer {
        Composer::new(Rc::new(scheduler.clone()), 300)
    }

    #[test]
    fn test_resolve_content() {
        assert_eq!(
            Composer::resolve_content(Some("  hi "), "ignored"),
            Ok("hi".to_string())
        );
        assert_eq!(
            Composer::resolve_content(None, " from input\n"),
            Ok("from input".to_string())
        );
        assert_eq!(
            Composer::resolve_content(Some("   "), "fallback"),
            Ok("fallback".to_string())
        );
        assert_eq!(
            Composer::resolve_content(None, " \n "),
            Err(ChatError::EmptyContent)
        );
    }

    #[test]
    fn test_burst_of_keystrokes_fires_once_with_last_text() {
        let scheduler = ManualScheduler::new();
        let mut composer = composer(&scheduler);
        let fired = Rc::new(RefCell::new(Vec::new()));

        for text in ["r", "re", "ref", "refund policy "] {
            let fired = fired.clone();
            composer.input_changed(text, move |t| fired.borrow_mut().push(t));
            scheduler.advance(100);
        }
        assert!(fired.borrow().is_empty());
        assert_eq!(scheduler.pending(), 1);

        scheduler.advance(300);
        assert_eq!(*fired.borrow(), vec!["refund policy".to_string()]);
    }

    #[test]
    fn test_pause_between_keystrokes_fires_each() {
        let scheduler = ManualScheduler::new();
        let mut composer = composer(&scheduler);
        let fired = Rc::new(RefCell::new(Vec::new()));

        for text in ["a", "ab"] {
            let fired = fired.clone();
            composer.input_changed(text, move |t| fired.borrow_mut().push(t));
            scheduler.advance(301);
        }
        assert_eq!(*fired.borrow(), vec!["a".to_string(), "ab".to_string()]);
    }

    #[test]
    fn test_cancel_pending() {
        let scheduler = ManualScheduler::new();
        let mut composer = composer(&scheduler);
        let fired = Rc::new(RefCell::new(Vec::<String>::new()));

        let sink = fired.clone();
        composer.input_changed("abc", move |t| sink.borrow_mut().push(t));
        composer.cancel_pending();
        scheduler.advance(1_000);
        assert!(fired.borrow().is_empty());
    }

    #[test]
    fn test_human_support_request_shape() {
        let outbound = Outbound::human_support();
        assert_eq!(outbound.destination, AppDestination::RequestHumanSupport);
        assert_eq!(outbound.kind, OutboundKind::Chat);
        assert_eq!(outbound.content, "REQUEST_HUMAN_SUPPORT");
    }
}
