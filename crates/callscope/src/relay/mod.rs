//! Streaming relay between the agent and the browser.
//!
//! `wire` defines the event vocabulary and SSE framing, `translate` maps
//! agent messages onto it, `lifecycle` pumps one query into a response
//! channel with a guaranteed terminal sentinel, and `reader` is the
//! consuming side used by `callscopectl` and the integration tests.

pub mod lifecycle;
pub mod reader;
pub mod translate;
pub mod wire;

pub use lifecycle::{relay, FrameSink, SinkError, FRAME_CHANNEL_CAPACITY, STREAM_ERROR_MESSAGE};
pub use reader::{
    DisplayBuffer, FrameDecoder, ReaderEvent, ANALYSIS_ERROR_APOLOGY, REQUEST_FAILED_APOLOGY,
};
pub use translate::Translator;
pub use wire::{WireEvent, DATA_PREFIX, DONE_SENTINEL};
