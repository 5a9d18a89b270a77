//! Socket.IO transport to the transcription server

mod client;
mod protocol;

pub use client::{engine_url, SocketClient, SocketConnection, TransportError};
pub use protocol::{
    EnginePacket, EngineVersion, OpenInfo, ProtocolError, SocketEvent, SocketPacket, WireMessage,
    AUDIO_DATA, TEXT_DATA,
};
