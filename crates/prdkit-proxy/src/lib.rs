#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]

pub mod error;
pub mod frame;
pub mod handlers;
pub mod models;
pub mod ollama;
pub mod relay;
pub mod server;
pub mod sink;
pub mod state;

pub use error::HttpError;
pub use ollama::OllamaClient;
pub use relay::{IN_BAND_ERROR_MARKER, RelayOutcome, RelaySession, SessionState};
pub use server::{ServerConfig, create_router, serve, start_server};
pub use sink::{ChannelSink, CollectSink, OutputSink, RelayFrame, RelayReceiver};
pub use state::AppState;
