//! Vocalink - live microphone transcription client
//!
//! Streams microphone frames to a transcription server over a websocket and
//! shows the text it sends back. Also drives the phrase lookup and audio form
//! flows of the same web server.

pub mod app;
pub mod audio;
pub mod config;
pub mod flows;
pub mod session;
pub mod socket;
pub mod ui;
