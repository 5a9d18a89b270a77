//! Socket.IO client for the transcription server
//!
//! Frames go out as `audio_data` binary events, transcripts come back as
//! `text_data` events. Sends are fire-and-forget: nothing is retried or
//! buffered past the queue.

use super::protocol::{EnginePacket, EngineVersion, SocketEvent, SocketPacket, WireMessage};
use crate::audio::Frame;
use crate::session::FrameSink;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Invalid server URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Failed to connect to {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("Server refused the connection: {0}")]
    Rejected(String),
}

/// Websocket endpoint for a Socket.IO server base URL.
///
/// `http://host:5000` becomes `ws://host:5000/socket.io/?EIO=4&transport=websocket`;
/// an explicit path other than `/` is kept as the Socket.IO path.
pub fn engine_url(server: &str, version: EngineVersion) -> Result<Url, TransportError> {
    let invalid = |reason: String| TransportError::InvalidUrl {
        url: server.to_string(),
        reason,
    };
    let mut url = Url::parse(server).map_err(|e| invalid(e.to_string()))?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(invalid(format!("unsupported scheme '{}'", other))),
    };
    url.set_scheme(scheme)
        .map_err(|_| invalid("cannot switch scheme".into()))?;

    if url.path() == "/" || url.path().is_empty() {
        url.set_path("/socket.io/");
    } else if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.query_pairs_mut()
        .clear()
        .append_pair("EIO", &version.number().to_string())
        .append_pair("transport", "websocket");
    Ok(url)
}

/// Cheap handle for queueing outbound events
#[derive(Clone)]
pub struct SocketClient {
    outbound: mpsc::UnboundedSender<SocketEvent>,
}

impl SocketClient {
    /// Queue an event. Returns false if the connection is gone.
    pub fn send(&self, event: SocketEvent) -> bool {
        self.outbound.send(event).is_ok()
    }

    /// Build a client over a bare queue, without any network behind it
    pub fn detached() -> (Self, mpsc::UnboundedReceiver<SocketEvent>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        (Self { outbound }, rx)
    }
}

impl FrameSink for SocketClient {
    fn emit(&self, frame: Frame) {
        if !self.send(SocketEvent::AudioData(frame.into_samples())) {
            tracing::debug!("Dropping frame, socket closed");
        }
    }
}

/// An open connection: outbound handle, inbound transcripts and the io tasks
pub struct SocketConnection {
    pub client: SocketClient,
    pub transcripts: mpsc::UnboundedReceiver<String>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl SocketConnection {
    /// Connect, complete the Engine.IO and namespace handshakes, then spawn
    /// the reader and writer tasks
    pub async fn connect(server: &str, version: EngineVersion) -> Result<Self, TransportError> {
        let url = engine_url(server, version)?;
        let (ws, _response) =
            connect_async(url.as_str())
                .await
                .map_err(|e| TransportError::ConnectionFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;

        let (mut sink, mut stream) = ws.split();
        let open = tokio::time::timeout(
            HANDSHAKE_TIMEOUT,
            handshake(&mut sink, &mut stream, version),
        )
        .await
        .map_err(|_| TransportError::Handshake("timed out".into()))??;
        tracing::info!("Connected to {} (sid {})", url, open.0);

        let (client, outbound_rx) = SocketClient::detached();
        let (pong_tx, pong_rx) = mpsc::unbounded_channel();
        let (transcript_tx, transcripts) = mpsc::unbounded_channel();

        let ping_every = (version == EngineVersion::V3).then(|| Duration::from_millis(open.1));
        let writer = tokio::spawn(run_writer(sink, outbound_rx, pong_rx, version, ping_every));
        let reader = tokio::spawn(run_reader(stream, transcript_tx, pong_tx));

        Ok(Self {
            client,
            transcripts,
            reader,
            writer,
        })
    }

    /// Tear down both io tasks
    pub fn shutdown(self) {
        self.reader.abort();
        self.writer.abort();
        tracing::info!("Socket connection closed");
    }
}

/// Wait for the open packet and the namespace connect. Returns (sid, ping interval ms).
async fn handshake(
    sink: &mut SplitSink<Ws, Message>,
    stream: &mut SplitStream<Ws>,
    version: EngineVersion,
) -> Result<(String, u64), TransportError> {
    let mut opened = None;
    while let Some(message) = stream.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(frame)) => {
                return Err(TransportError::Handshake(format!("closed: {:?}", frame)))
            }
            Ok(_) => continue,
            Err(e) => return Err(TransportError::Handshake(e.to_string())),
        };
        let packet =
            EnginePacket::decode(&text).map_err(|e| TransportError::Handshake(e.to_string()))?;
        match packet {
            EnginePacket::Open(info) => {
                if version == EngineVersion::V4 {
                    send_text(sink, "40".into()).await?;
                }
                opened = Some((info.sid, info.ping_interval));
            }
            EnginePacket::Ping(data) => send_text(sink, format!("3{}", data)).await?,
            EnginePacket::Message(SocketPacket::Connect) => {
                return opened.ok_or_else(|| TransportError::Handshake("connect before open".into()))
            }
            EnginePacket::Message(SocketPacket::ConnectError(reason)) => {
                return Err(TransportError::Rejected(reason))
            }
            EnginePacket::Close => return Err(TransportError::Handshake("closed by server".into())),
            other => tracing::debug!("Ignoring {:?} during handshake", other),
        }
    }
    Err(TransportError::Handshake("stream ended".into()))
}

async fn send_text(sink: &mut SplitSink<Ws, Message>, text: String) -> Result<(), TransportError> {
    sink.send(Message::Text(text))
        .await
        .map_err(|e| TransportError::Handshake(e.to_string()))
}

async fn run_writer(
    mut sink: SplitSink<Ws, Message>,
    mut outbound_rx: mpsc::UnboundedReceiver<SocketEvent>,
    mut pong_rx: mpsc::UnboundedReceiver<String>,
    version: EngineVersion,
    ping_every: Option<Duration>,
) {
    let mut ticker = ping_every.map(tokio::time::interval);
    if let Some(ticker) = ticker.as_mut() {
        // The first tick fires immediately.
        ticker.tick().await;
    }

    loop {
        let messages = tokio::select! {
            event = outbound_rx.recv() => match event {
                Some(event) => event
                    .encode(version)
                    .into_iter()
                    .map(|m| match m {
                        WireMessage::Text(text) => Message::Text(text),
                        WireMessage::Binary(bytes) => Message::Binary(bytes),
                    })
                    .collect(),
                None => break,
            },
            Some(data) = pong_rx.recv() => vec![Message::Text(format!("3{}", data))],
            _ = async {
                match ticker.as_mut() {
                    Some(ticker) => {
                        ticker.tick().await;
                    }
                    None => std::future::pending::<()>().await,
                }
            } => vec![Message::Text("2".into())],
        };

        let mut failed = false;
        for message in messages {
            if let Err(e) = sink.send(message).await {
                tracing::warn!("Send failed: {}", e);
                failed = true;
                break;
            }
        }
        if failed {
            break;
        }
    }
    let _ = sink.close().await;
    tracing::debug!("Socket writer finished");
}

async fn run_reader(
    mut stream: SplitStream<Ws>,
    transcript_tx: mpsc::UnboundedSender<String>,
    pong_tx: mpsc::UnboundedSender<String>,
) {
    while let Some(message) = stream.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(frame)) => {
                tracing::info!("Server closed the socket: {:?}", frame);
                break;
            }
            Ok(Message::Binary(_)) => {
                tracing::debug!("Ignoring binary attachment");
                continue;
            }
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!("Socket read error: {}", e);
                break;
            }
        };

        match EnginePacket::decode(&text) {
            Ok(EnginePacket::Ping(data)) => {
                let _ = pong_tx.send(data);
            }
            Ok(EnginePacket::Message(packet)) => match SocketEvent::from_packet(&packet) {
                Some(SocketEvent::TextData(text)) => {
                    if transcript_tx.send(text).is_err() {
                        break;
                    }
                }
                Some(other) => tracing::debug!("Unexpected inbound event {}", other.name()),
                None => {
                    if packet == SocketPacket::Disconnect {
                        tracing::info!("Server disconnected the namespace");
                        break;
                    }
                }
            },
            Ok(EnginePacket::Close) => {
                tracing::info!("Server closed the session");
                break;
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("{}", e),
        }
    }
    tracing::debug!("Socket reader finished");
}
