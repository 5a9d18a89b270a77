//! Socket.IO framing over a raw websocket
//!
//! Engine.IO packets carry Socket.IO packets in the default namespace:
//! `42["text_data","..."]` for plain events and a binary event
//! (`451-["audio_data",{"_placeholder":true,"num":0}]` followed by one binary
//! message) for audio frames, the way a browser emits a `Float32Array`.

use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

pub const AUDIO_DATA: &str = "audio_data";
pub const TEXT_DATA: &str = "text_data";

/// Engine.IO protocol revision spoken by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineVersion {
    /// socket.io 2.x / python-socketio 4.x
    V3,
    /// socket.io 3+ / python-socketio 5+
    #[default]
    V4,
}

impl EngineVersion {
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            3 => Some(EngineVersion::V3),
            4 => Some(EngineVersion::V4),
            _ => None,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            EngineVersion::V3 => 3,
            EngineVersion::V4 => 4,
        }
    }
}

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Empty packet")]
    Empty,

    #[error("Unknown packet type '{0}'")]
    UnknownType(char),

    #[error("Malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Malformed event: {0}")]
    BadEvent(String),
}

/// Handshake data sent by the server in the open packet
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenInfo {
    pub sid: String,
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout: u64,
}

fn default_ping_interval() -> u64 {
    25000
}

fn default_ping_timeout() -> u64 {
    20000
}

/// Engine.IO packet received as websocket text
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(OpenInfo),
    Close,
    Ping(String),
    Pong(String),
    Message(SocketPacket),
    Upgrade,
    Noop,
}

/// Socket.IO packet, default namespace only
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect,
    Disconnect,
    Event { name: String, args: Vec<Value> },
    BinaryEvent { attachments: usize, name: String, args: Vec<Value> },
    ConnectError(String),
    Other(String),
}

impl EnginePacket {
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let mut chars = text.chars();
        let kind = chars.next().ok_or(ProtocolError::Empty)?;
        let body = chars.as_str();
        Ok(match kind {
            '0' => EnginePacket::Open(serde_json::from_str(body)?),
            '1' => EnginePacket::Close,
            '2' => EnginePacket::Ping(body.to_string()),
            '3' => EnginePacket::Pong(body.to_string()),
            '4' => EnginePacket::Message(SocketPacket::decode(body)?),
            '5' => EnginePacket::Upgrade,
            '6' => EnginePacket::Noop,
            other => return Err(ProtocolError::UnknownType(other)),
        })
    }
}

impl SocketPacket {
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let mut chars = text.chars();
        let kind = chars.next().ok_or(ProtocolError::Empty)?;
        let body = chars.as_str();
        Ok(match kind {
            '0' => SocketPacket::Connect,
            '1' => SocketPacket::Disconnect,
            '2' => {
                let (name, args) = split_event(body)?;
                SocketPacket::Event { name, args }
            }
            '4' => SocketPacket::ConnectError(body.to_string()),
            '5' => {
                let (count, rest) = body
                    .split_once('-')
                    .ok_or_else(|| ProtocolError::BadEvent(body.to_string()))?;
                let attachments = count
                    .parse()
                    .map_err(|_| ProtocolError::BadEvent(body.to_string()))?;
                let (name, args) = split_event(rest)?;
                SocketPacket::BinaryEvent {
                    attachments,
                    name,
                    args,
                }
            }
            _ => SocketPacket::Other(text.to_string()),
        })
    }
}

/// `["name", arg, ...]`, skipping a namespace prefix or ack id if present
fn split_event(body: &str) -> Result<(String, Vec<Value>), ProtocolError> {
    let start = body
        .find('[')
        .ok_or_else(|| ProtocolError::BadEvent(body.to_string()))?;
    let mut items: Vec<Value> = serde_json::from_str(&body[start..])?;
    if items.is_empty() {
        return Err(ProtocolError::BadEvent(body.to_string()));
    }
    match items.remove(0) {
        Value::String(name) => Ok((name, items)),
        _ => Err(ProtocolError::BadEvent(body.to_string())),
    }
}

/// One websocket message to send
#[derive(Debug, Clone, PartialEq)]
pub enum WireMessage {
    Text(String),
    Binary(Vec<u8>),
}

/// Known socket events
#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    /// One frame of raw mono f32 samples (client → server)
    AudioData(Vec<f32>),
    /// Transcript text (server → client)
    TextData(String),
}

impl SocketEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SocketEvent::AudioData(_) => AUDIO_DATA,
            SocketEvent::TextData(_) => TEXT_DATA,
        }
    }

    /// Websocket messages carrying this event
    pub fn encode(&self, version: EngineVersion) -> Vec<WireMessage> {
        match self {
            SocketEvent::TextData(text) => {
                vec![WireMessage::Text(format!("42{}", json!([TEXT_DATA, text])))]
            }
            SocketEvent::AudioData(samples) => {
                let header = json!([AUDIO_DATA, {"_placeholder": true, "num": 0}]);
                let mut bytes = Vec::with_capacity(samples.len() * 4 + 1);
                if version == EngineVersion::V3 {
                    // Engine.IO 3 prefixes binary websocket messages with the message type.
                    bytes.push(4);
                }
                bytes.extend(samples.iter().flat_map(|s| s.to_le_bytes()));
                vec![
                    WireMessage::Text(format!("451-{}", header)),
                    WireMessage::Binary(bytes),
                ]
            }
        }
    }

    /// Known event from a decoded Socket.IO packet. Unknown ones yield `None`.
    pub fn from_packet(packet: &SocketPacket) -> Option<Self> {
        match packet {
            SocketPacket::Event { name, args } if name == TEXT_DATA => {
                let text = match args.first() {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => String::new(),
                };
                Some(SocketEvent::TextData(text))
            }
            _ => None,
        }
    }
}
