//! Memocha - conversational backend with long-term memory
//!
//! Accepts chat messages over HTTP, keeps them grouped by session, and
//! forwards the conversation to a chat-completion provider through a
//! retrying, circuit-broken invocation layer.

pub mod api;
pub mod cli;
pub mod config;
pub mod llm;
pub mod logging;
pub mod metrics;
pub mod store;
