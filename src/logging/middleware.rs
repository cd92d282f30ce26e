//! Request ID generation

use uuid::Uuid;

/// Generate a new request ID using UUID v4
///
/// Attached to the span of each chat request so its retries, breaker
/// decisions and store writes can be correlated.
///
/// # Examples
///
/// ```
/// use memocha::logging::generate_request_id;
///
/// let request_id = generate_request_id();
/// assert_eq!(request_id.len(), 36);
/// ```
pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}
