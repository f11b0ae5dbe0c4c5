//! The gateway session: demuxes inbound frames into [`Event`]s and
//! multiplexes outbound commands.

mod error;
mod stage;

pub use self::{
    error::{ShardError, ShardErrorType},
    stage::{Stage, StageConversionError},
};

use crate::{
    compression::{self, Compressor},
    event::{decode_close_payload, Close, Event},
    json::{self, Decoder},
    queue::{default_identify_queue, IdentifyQueue},
};
use futures_util::{SinkExt, StreamExt};
use ripple_model::{
    gateway::{
        payload::{Command, Heartbeat, Identify, IdentifyProperties},
        OpCode, Packet,
    },
    token::TokenKind,
    Token,
};
use serde::Deserialize;
use serde_json::value::RawValue;
use std::sync::{
    atomic::{AtomicU8, Ordering},
    Arc,
};
use tokio::{
    net::TcpStream,
    sync::{
        mpsc::{self, UnboundedReceiver, UnboundedSender},
        Mutex,
    },
    time::{interval_at, Duration, Instant, Interval},
};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        protocol::{frame::coding::CloseCode, CloseFrame as TungsteniteCloseFrame},
        Message as TungsteniteMessage,
    },
    MaybeTlsStream, WebSocketStream,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = futures_util::stream::SplitSink<WsStream, TungsteniteMessage>;

const DEFAULT_COMPRESSION: &str = "zlib";
const DEFAULT_ENCODING: &str = "json";
const SUPPORTED_VERSION: &str = "6";

/// The one field of [`OpCode::Hello`]'s payload this crate cares about.
#[derive(Deserialize)]
struct Hello {
    heartbeat_interval: u64,
}

/// Builder for a [`Shard`].
///
/// Refer to each method for its default value.
#[derive(Debug)]
#[must_use = "builder must be completed with `build` to be used"]
pub struct ShardBuilder {
    token: Token,
    display_name: Option<String>,
    large_threshold: u64,
    presence: Option<ripple_model::gateway::payload::UpdatePresence>,
    identify_queue: Arc<dyn IdentifyQueue>,
}

impl ShardBuilder {
    /// Start building a shard that will authenticate with `token`.
    ///
    /// Unless overridden with [`ShardBuilder::identify_queue`], the shard
    /// shares a single process-wide [`LocalQueue`](crate::queue::LocalQueue)
    /// with every other shard built this way, so that the identify gate
    /// actually serializes across them instead of each shard throttling
    /// only itself.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Token::new(token),
            display_name: None,
            large_threshold: 50,
            presence: None,
            identify_queue: default_identify_queue(),
        }
    }

    /// A human-readable name used in log messages. Defaults to `"shard"`.
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Member-count threshold past which `GUILD_CREATE` stops including
    /// offline members. Defaults to `50`, Discord's minimum.
    pub fn large_threshold(mut self, threshold: u64) -> Self {
        self.large_threshold = threshold;
        self
    }

    /// Initial presence to set when identifying.
    pub fn presence(mut self, presence: ripple_model::gateway::payload::UpdatePresence) -> Self {
        self.presence = Some(presence);
        self
    }

    /// Override the identify queue, e.g. with a
    /// [`NoOpQueue`](crate::queue::NoOpQueue) when running behind a
    /// session-managing proxy.
    pub fn identify_queue(mut self, queue: Arc<dyn IdentifyQueue>) -> Self {
        self.identify_queue = queue;
        self
    }

    /// Build the [`Shard`].
    pub fn build(self) -> Shard {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Shard {
            token: self.token,
            display_name: self.display_name.unwrap_or_else(|| "shard".to_owned()),
            large_threshold: self.large_threshold,
            presence: self.presence,
            identify_queue: self.identify_queue,
            stage: AtomicU8::new(Stage::Fresh as u8),
            sink: Mutex::new(None),
            events_tx,
            events_rx: Mutex::new(events_rx),
        }
    }
}

/// A single gateway WebSocket session.
///
/// A `Shard` connects once and runs to termination; it is not reusable
/// after its event stream ends. Construct one with [`Shard::new`] or
/// [`Shard::builder`], call [`Shard::connect`], and read its
/// [`Shard::receive`] stream concurrently from another task.
#[derive(Debug)]
pub struct Shard {
    token: Token,
    display_name: String,
    large_threshold: u64,
    presence: Option<ripple_model::gateway::payload::UpdatePresence>,
    identify_queue: Arc<dyn IdentifyQueue>,
    stage: AtomicU8,
    sink: Mutex<Option<WsSink>>,
    events_tx: UnboundedSender<Event>,
    events_rx: Mutex<UnboundedReceiver<Event>>,
}

impl Shard {
    /// Create a shard with default configuration. Use [`Shard::builder`]
    /// to customize it.
    pub fn new(token: impl Into<String>) -> Self {
        ShardBuilder::new(token).build()
    }

    /// Start building a customized shard.
    pub fn builder(token: impl Into<String>) -> ShardBuilder {
        ShardBuilder::new(token)
    }

    /// The shard's current lifecycle stage.
    #[must_use]
    pub fn stage(&self) -> Stage {
        Stage::try_from(self.stage.load(Ordering::Acquire))
            .unwrap_or_default()
    }

    fn set_stage(&self, stage: Stage) {
        self.stage.store(stage as u8, Ordering::Release);
    }

    /// Connect to `uri`, run the read loop until the connection ends, and
    /// guarantee a close frame and a terminal [`Event::Disconnected`] before
    /// returning.
    ///
    /// The URI's `v` query parameter is advisory — any value other than
    /// `"6"` produces a log warning but does not fail the connection.
    /// `compress` selects a [`Compressor`] (default `"zlib"`); `encoding`
    /// selects a [`Decoder`] (default `"json"`).
    ///
    /// Once a [`Hello`](OpCode::Hello) packet arrives, the shard starts
    /// heartbeating on the interval it carries, echoing back the most
    /// recently observed sequence number. A heartbeat whose
    /// [`HeartbeatAck`](OpCode::HeartbeatAck) hasn't arrived by the time the
    /// next one is due is only logged, never acted on, per spec's
    /// reconnection-policy non-goal.
    ///
    /// # Errors
    ///
    /// Returns [`ShardErrorType::UnknownCompressor`] or
    /// [`ShardErrorType::UnknownDecoder`] if the URI names a strategy this
    /// crate doesn't implement, or [`ShardErrorType::Connecting`] if the
    /// WebSocket handshake itself fails. Once the read loop is running,
    /// I/O and protocol errors are logged and surfaced only as a terminal
    /// [`Event::Disconnected`] — they do not propagate from this method.
    pub async fn connect(&self, uri: &str) -> Result<(), ShardError> {
        let parsed = url::Url::parse(uri).map_err(|source| {
            ShardError::new(ShardErrorType::Connecting, Some(Box::new(source)))
        })?;

        let mut compress = DEFAULT_COMPRESSION.to_owned();
        let mut encoding = DEFAULT_ENCODING.to_owned();

        for (key, value) in parsed.query_pairs() {
            match &*key {
                "v" if &*value != SUPPORTED_VERSION => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        shard = %self.display_name,
                        version = %value,
                        "gateway version is not the one this core targets",
                    );
                }
                "compress" => compress = value.into_owned(),
                "encoding" => encoding = value.into_owned(),
                _ => {}
            }
        }

        let mut compressor: Box<dyn Compressor> = compression::from_name(&compress)
            .map_err(|_source| ShardError::new(ShardErrorType::UnknownCompressor { name: compress.clone() }, None))?;
        let decoder: Box<dyn Decoder> = json::from_name(&encoding)
            .map_err(|_source| ShardError::new(ShardErrorType::UnknownDecoder { name: encoding.clone() }, None))?;

        let (ws_stream, _response) = connect_async(uri).await.map_err(|source| {
            ShardError::new(ShardErrorType::Connecting, Some(Box::new(source)))
        })?;

        let (sink, mut stream) = ws_stream.split();
        *self.sink.lock().await = Some(sink);
        self.set_stage(Stage::Connected);
        let _ = self.events_tx.send(Event::Connected);

        #[cfg(feature = "tracing")]
        tracing::debug!(shard = %self.display_name, %compress, %encoding, "connected");

        let mut last_sequence: Option<u64> = None;
        let mut last_heartbeat_acked = true;
        let mut heartbeat_timer: Option<Interval> = None;

        loop {
            tokio::select! {
                _ = async { heartbeat_timer.as_mut().unwrap().tick().await }, if heartbeat_timer.is_some() => {
                    if !last_heartbeat_acked {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(
                            shard = %self.display_name,
                            "previous heartbeat was not acked before the next was due",
                        );
                    }

                    last_heartbeat_acked = false;

                    if self
                        .send(&Heartbeat { sequence: last_sequence })
                        .await
                        .is_err()
                    {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(shard = %self.display_name, "failed to send a heartbeat, disconnecting");

                        break;
                    }
                }
                message = stream.next() => {
                    match message {
                        Some(Ok(TungsteniteMessage::Text(text))) => {
                            if let Some(packet) = self.decode_packet(&*decoder, text.as_bytes()) {
                                self.observe_packet(&packet, &mut last_sequence, &mut last_heartbeat_acked, &mut heartbeat_timer);
                                let _ = self.events_tx.send(Event::Packet(packet));
                            }
                        }
                        Some(Ok(TungsteniteMessage::Binary(bytes))) => {
                            match compressor.read(&bytes) {
                                Ok(Some(inflated)) => {
                                    if let Some(packet) = self.decode_packet(&*decoder, &inflated) {
                                        self.observe_packet(&packet, &mut last_sequence, &mut last_heartbeat_acked, &mut heartbeat_timer);
                                        let _ = self.events_tx.send(Event::Packet(packet));
                                    }
                                }
                                Ok(None) => {}
                                Err(_source) => {
                                    #[cfg(feature = "tracing")]
                                    tracing::warn!(
                                        shard = %self.display_name,
                                        "failed to decompress a binary frame, dropping it",
                                    );
                                }
                            }
                        }
                        Some(Ok(TungsteniteMessage::Close(frame))) => {
                            let close = frame.map(|frame| Close {
                                code: u16::from(frame.code),
                                reason: (!frame.reason.is_empty()).then(|| frame.reason.into_owned()),
                            });

                            if let Some(close) = close {
                                let _ = self.events_tx.send(Event::Close(close));
                            }

                            break;
                        }
                        Some(Ok(_)) => {
                            // Ping/Pong/raw Frame messages carry no application data.
                        }
                        Some(Err(_source)) => {
                            #[cfg(feature = "tracing")]
                            tracing::warn!(shard = %self.display_name, "websocket read failed, disconnecting");

                            break;
                        }
                        None => break,
                    }
                }
            }
        }

        self.set_stage(Stage::Closing);

        if let Some(mut sink) = self.sink.lock().await.take() {
            let close = TungsteniteMessage::Close(Some(TungsteniteCloseFrame {
                code: CloseCode::from(1000),
                reason: "closing connection".into(),
            }));
            let _ = sink.send(close).await;
            let _ = sink.close().await;
        }

        self.set_stage(Stage::Closed);
        let _ = self.events_tx.send(Event::Disconnected);

        Ok(())
    }

    fn decode_packet(&self, decoder: &dyn Decoder, bytes: &[u8]) -> Option<Packet> {
        match decoder.decode(bytes) {
            Ok(packet) => Some(packet),
            Err(_source) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(shard = %self.display_name, "dropping an unparseable payload");

                None
            }
        }
    }

    /// Update heartbeat bookkeeping from an inbound packet: remember its
    /// sequence number, arm the heartbeat timer on [`OpCode::Hello`], and
    /// clear the unacked flag on [`OpCode::HeartbeatAck`].
    fn observe_packet(
        &self,
        packet: &Packet,
        last_sequence: &mut Option<u64>,
        last_heartbeat_acked: &mut bool,
        heartbeat_timer: &mut Option<Interval>,
    ) {
        if let Some(sequence) = packet.sequence {
            *last_sequence = Some(sequence);
        }

        match packet.op {
            OpCode::Hello => match parse_heartbeat_interval(&packet.data) {
                Some(interval) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        shard = %self.display_name,
                        interval_ms = interval.as_millis(),
                        "arming heartbeat timer",
                    );

                    *heartbeat_timer = Some(interval_at(Instant::now() + interval, interval));
                }
                None => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(shard = %self.display_name, "hello payload carried no heartbeat interval");
                }
            },
            OpCode::HeartbeatAck => *last_heartbeat_acked = true,
            _ => {}
        }
    }

    /// Send a WebSocket close frame with `code` (default 1000).
    ///
    /// # Errors
    ///
    /// Returns [`ShardErrorType::NeverConnected`] if the shard has never
    /// connected, or has already disconnected.
    pub async fn disconnect(&self, code: u16) -> Result<(), ShardError> {
        let mut guard = self.sink.lock().await;
        let sink = guard
            .as_mut()
            .ok_or_else(|| ShardError::new(ShardErrorType::NeverConnected, None))?;

        self.set_stage(Stage::Closing);

        let frame = TungsteniteMessage::Close(Some(TungsteniteCloseFrame {
            code: CloseCode::from(code),
            reason: "".into(),
        }));

        sink.send(frame)
            .await
            .map_err(|source| ShardError::new(ShardErrorType::Sending, Some(Box::new(source))))
    }

    /// Send a command payload. Dispatches on `T`'s fixed opcode.
    ///
    /// Sending an `Identify`-opcode payload consults the identify queue and
    /// is rejected with [`ShardErrorType::BadTokenType`] unless this
    /// shard's token is a `Bot` token.
    ///
    /// # Errors
    ///
    /// Returns [`ShardErrorType::BadTokenType`], [`ShardErrorType::Serializing`],
    /// [`ShardErrorType::Sending`], or [`ShardErrorType::NeverConnected`].
    pub async fn send<T: Command>(&self, payload: &T) -> Result<(), ShardError> {
        if T::OP == OpCode::Identify {
            if self.token.kind() != TokenKind::Bot {
                return Err(ShardError::new(
                    ShardErrorType::BadTokenType {
                        kind: self.token.kind(),
                    },
                    None,
                ));
            }

            self.identify_queue.request().await;
        }

        let data = serde_json::value::to_raw_value(payload)
            .map_err(|source| ShardError::new(ShardErrorType::Serializing, Some(Box::new(source))))?;

        self.send_raw(Packet {
            op: T::OP,
            sequence: None,
            data,
            event_type: None,
        })
        .await
    }

    /// Build and send this shard's `Identify` payload directly, using its
    /// configured token, large-member threshold, and presence.
    ///
    /// # Errors
    ///
    /// Returns [`ShardErrorType::BadTokenType`] if this shard's token is not
    /// a `Bot` token.
    pub async fn identify(&self) -> Result<(), ShardError> {
        let identify = Identify {
            token: self.token.authorization().to_owned(),
            properties: IdentifyProperties::fixed(),
            compress: None,
            large_threshold: Some(self.large_threshold),
            shard: None,
            presence: self.presence.clone(),
        };

        self.send(&identify).await
    }

    /// Send a raw [`Packet`], bypassing the [`Command`] trait. This is the
    /// escape hatch for opcodes this crate doesn't model yet.
    ///
    /// # Errors
    ///
    /// Returns [`ShardErrorType::Sending`] or [`ShardErrorType::NeverConnected`].
    pub async fn send_raw(&self, packet: Packet) -> Result<(), ShardError> {
        let text = serde_json::to_string(&packet)
            .map_err(|source| ShardError::new(ShardErrorType::Serializing, Some(Box::new(source))))?;

        let mut guard = self.sink.lock().await;
        let sink = guard
            .as_mut()
            .ok_or_else(|| ShardError::new(ShardErrorType::NeverConnected, None))?;

        sink.send(TungsteniteMessage::Text(text))
            .await
            .map_err(|source| ShardError::new(ShardErrorType::Sending, Some(Box::new(source))))
    }

    /// Block until the next event is available, or return `None` once the
    /// event stream has permanently closed.
    pub async fn receive(&self) -> Option<Event> {
        self.events_rx.lock().await.recv().await
    }
}

fn parse_heartbeat_interval(data: &RawValue) -> Option<Duration> {
    serde_json::from_str::<Hello>(data.get())
        .ok()
        .map(|hello| Duration::from_millis(hello.heartbeat_interval))
}

/// Decode a close frame payload exactly as it would arrive on the wire, for
/// callers that observe raw bytes rather than going through [`Shard`]'s own
/// tungstenite-backed read loop (e.g. a test harness, or a proxy).
#[must_use]
pub fn decode_close_frame(payload: &[u8]) -> Option<Close> {
    decode_close_payload(payload)
}

#[cfg(test)]
mod tests {
    use super::{Shard, Stage};
    use static_assertions::assert_impl_all;

    assert_impl_all!(Shard: Send, Sync);

    #[test]
    fn fresh_shard_has_not_connected() {
        let shard = Shard::new("Bot x");

        assert_eq!(Stage::Fresh, shard.stage());
    }

    #[tokio::test]
    async fn sending_before_connecting_fails() {
        use ripple_model::gateway::payload::Heartbeat;

        let shard = Shard::new("Bot x");
        let result = shard.send(&Heartbeat { sequence: None }).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn identifying_with_a_bearer_token_is_rejected() {
        let shard = Shard::new("Bearer x");
        let result = shard.identify().await;

        assert!(matches!(
            result.unwrap_err().kind(),
            super::ShardErrorType::BadTokenType { .. }
        ));
    }

    #[tokio::test]
    async fn disconnecting_before_connecting_fails() {
        let shard = Shard::new("Bot x");

        assert!(shard.disconnect(1000).await.is_err());
    }

    #[test]
    fn hello_packet_arms_the_heartbeat_timer() {
        let shard = Shard::new("Bot x");
        let packet: super::Packet =
            serde_json::from_str(r#"{"op":10,"s":null,"d":{"heartbeat_interval":41250},"t":null}"#)
                .unwrap();

        let mut last_sequence = None;
        let mut last_heartbeat_acked = true;
        let mut heartbeat_timer = None;

        shard.observe_packet(&packet, &mut last_sequence, &mut last_heartbeat_acked, &mut heartbeat_timer);

        assert!(heartbeat_timer.is_some());
        assert_eq!(None, last_sequence);
        assert!(last_heartbeat_acked);
    }

    #[test]
    fn heartbeat_ack_clears_the_unacked_flag() {
        let shard = Shard::new("Bot x");
        let packet: super::Packet =
            serde_json::from_str(r#"{"op":11,"s":null,"d":null,"t":null}"#).unwrap();

        let mut last_sequence = None;
        let mut last_heartbeat_acked = false;
        let mut heartbeat_timer = None;

        shard.observe_packet(&packet, &mut last_sequence, &mut last_heartbeat_acked, &mut heartbeat_timer);

        assert!(last_heartbeat_acked);
    }

    #[test]
    fn dispatch_packet_updates_the_last_sequence() {
        let shard = Shard::new("Bot x");
        let packet: super::Packet =
            serde_json::from_str(r#"{"op":0,"s":42,"d":{},"t":"READY"}"#).unwrap();

        let mut last_sequence = None;
        let mut last_heartbeat_acked = true;
        let mut heartbeat_timer = None;

        shard.observe_packet(&packet, &mut last_sequence, &mut last_heartbeat_acked, &mut heartbeat_timer);

        assert_eq!(Some(42), last_sequence);
        assert!(heartbeat_timer.is_none());
    }
}
