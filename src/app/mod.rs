//! Front-end commands over the shared session

mod commands;

pub use commands::{
    get_status, receive_transcript, start_capture, stop_capture, AppState, StatusResponse,
};
