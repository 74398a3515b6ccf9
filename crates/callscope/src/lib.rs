//! Callscope backend library.
//!
//! Streams agent analyses of sales-call transcripts to browsers over SSE
//! and proxies the Gong REST API for call listings and transcripts.

pub mod agent;
pub mod api;
pub mod config;
pub mod gong;
pub mod prompts;
pub mod relay;
