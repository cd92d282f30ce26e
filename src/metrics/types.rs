//! # Metrics Types
//!
//! Data structures for the JSON stats response.

use serde::Serialize;

/// JSON response for GET /stats.
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Server uptime in seconds since startup
    pub uptime_seconds: u64,
    /// Model every generation call is sent to
    pub model: String,
    /// Sessions currently held by the store
    pub sessions: u64,
}
