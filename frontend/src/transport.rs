//! STOMP-over-WebSocket connection to the chat broker.
//!
//! One socket carries one STOMP session. Outgoing frames are queued on an
//! unbounded channel drained by a single writer task, so frames reach the
//! socket in the order they were issued (a SUBSCRIBE is never overtaken by
//! the UNSUBSCRIBE that follows it). Sends are fire-and-forget; delivery is
//! the broker's concern.

use crate::error::ChatError;
use futures_channel::mpsc::{self, UnboundedSender};
use futures_util::{SinkExt, StreamExt};
use gloo_net::websocket::{futures::WebSocket, Message};
use shared::protocol::STOMP_VERSION;
use shared::stomp::{Command, Frame, FrameDecoder};
use wasm_bindgen_futures::spawn_local;
use yew::Callback;

/// Broker-assigned handle of one subscription.
pub type SubscriptionId = String;

/// Generation number of one socket, stamped on every event it produces.
pub type ConnectionId = u64;

/// Publish/subscribe operations the chat session needs from a connection.
pub trait Transport {
    /// Subscribe to `destination`. With `receipt`, a broker that honours
    /// receipts answers with a [`TransportEvent::Receipt`] carrying that id.
    fn subscribe(&mut self, destination: &str, receipt: Option<&str>) -> SubscriptionId;
    fn unsubscribe(&mut self, id: &str);
    fn send(&mut self, destination: &str, body: String);
}

/// Connection events, delivered in socket order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Broker accepted the CONNECT frame
    Connected,
    /// A MESSAGE on one of our subscriptions
    Message { subscription: String, body: String },
    /// A subscription requested with a receipt is live
    Receipt(String),
    /// The broker rejected us or the socket failed
    Failed(String),
}

/// Map a decoded server frame to a connection event.
pub fn frame_to_event(frame: Frame) -> Option<TransportEvent> {
    match frame.command {
        Command::Connected => Some(TransportEvent::Connected),
        Command::Message => match frame.get("subscription") {
            Some(subscription) => Some(TransportEvent::Message {
                subscription: subscription.to_string(),
                body: frame.body,
            }),
            None => {
                log::warn!("MESSAGE frame without subscription header");
                None
            }
        },
        Command::Receipt => frame
            .get("receipt-id")
            .map(|id| TransportEvent::Receipt(id.to_string())),
        Command::Error => {
            let reason = frame
                .get("message")
                .map(str::to_string)
                .unwrap_or_else(|| frame.body.clone());
            Some(TransportEvent::Failed(reason))
        }
        other => {
            log::debug!("Ignoring {} frame from server", other);
            None
        }
    }
}

/// CONNECT frame authenticated with the bearer credential.
pub fn connect_frame(host: &str, token: &str) -> Frame {
    Frame::new(Command::Connect)
        .header("accept-version", STOMP_VERSION)
        .header("host", host)
        .header("heart-beat", "0,0")
        .header("Authorization", format!("Bearer {}", token))
}

/// Handle to a live STOMP session.
pub struct StompTransport {
    outbox: UnboundedSender<Frame>,
    next_subscription: u32,
}

impl StompTransport {
    /// Wrap an outbox whose frames are written to the socket by someone else.
    pub fn with_outbox(outbox: UnboundedSender<Frame>) -> Self {
        Self {
            outbox,
            next_subscription: 0,
        }
    }

    fn push(&self, frame: Frame) {
        if self.outbox.unbounded_send(frame).is_err() {
            log::warn!("Chat connection closed, dropping outbound frame");
        }
    }
}

impl Transport for StompTransport {
    fn subscribe(&mut self, destination: &str, receipt: Option<&str>) -> SubscriptionId {
        let id = format!("sub-{}", self.next_subscription);
        self.next_subscription += 1;

        let mut frame = Frame::new(Command::Subscribe)
            .header("id", id.clone())
            .header("destination", destination);
        if let Some(receipt) = receipt {
            frame = frame.header("receipt", receipt);
        }
        self.push(frame);
        log::info!("Subscribed to {} ({})", destination, id);
        id
    }

    fn unsubscribe(&mut self, id: &str) {
        self.push(Frame::new(Command::Unsubscribe).header("id", id));
        log::info!("Unsubscribed {}", id);
    }

    fn send(&mut self, destination: &str, body: String) {
        self.push(
            Frame::new(Command::Send)
                .header("destination", destination)
                .header("content-type", "application/json")
                .with_body(body),
        );
    }
}

/// Open the socket, queue the CONNECT frame, and start the reader and writer
/// tasks. Returns once the socket object exists; the outcome of the STOMP
/// handshake arrives later as [`TransportEvent::Connected`] or
/// [`TransportEvent::Failed`].
pub fn connect(
    url: &str,
    host: &str,
    token: &str,
    on_event: Callback<TransportEvent>,
) -> Result<StompTransport, ChatError> {
    let ws = WebSocket::open(url).map_err(|e| ChatError::ConnectFailed(format!("{:?}", e)))?;
    let (mut sink, mut stream) = ws.split();
    let (outbox, mut frames) = mpsc::unbounded::<Frame>();

    let transport = StompTransport::with_outbox(outbox);
    transport.push(connect_frame(host, token));

    spawn_local(async move {
        while let Some(frame) = frames.next().await {
            if let Err(e) = sink.send(Message::Text(frame.encode())).await {
                log::error!("Chat socket write failed: {:?}", e);
                break;
            }
        }
    });

    spawn_local(async move {
        let mut decoder = FrameDecoder::new();
        while let Some(msg) = stream.next().await {
            match msg {
                Ok(Message::Text(text)) => decoder.push(text.as_bytes()),
                Ok(Message::Bytes(bytes)) => decoder.push(&bytes),
                Err(e) => {
                    log::error!("Chat socket error: {:?}", e);
                    on_event.emit(TransportEvent::Failed(format!("{:?}", e)));
                    return;
                }
            }
            loop {
                match decoder.next_frame() {
                    Ok(Some(frame)) => {
                        if let Some(event) = frame_to_event(frame) {
                            on_event.emit(event);
                        }
                    }
                    Ok(None) => break,
                    Err(e) => log::warn!("Dropping malformed STOMP frame: {}", e),
                }
            }
        }
        on_event.emit(TransportEvent::Failed("connection closed".to_string()));
    });

    Ok(transport)
}
