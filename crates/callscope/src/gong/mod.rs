//! Gong REST integration: client, payload types, transcript rendering.

pub mod client;
pub mod transcript;
pub mod types;

pub use client::{GongClient, GongError};
pub use transcript::format_transcript;
pub use types::{
    ActiveUser, CallDetailsEnvelope, CallMetaData, CallParty, CallSummary, CallsResponse,
    GongCall, GongCallsResponse, GongUser, GongUsersResponse, PartySummary, Sentence,
    TranscriptPayload, TranscriptResponse, TranscriptSegment, UsersResponse,
};
