//! Structured logging helpers
//!
//! Filter directive construction for the subscriber, request ID generation,
//! and small field helpers used by request logging.

pub mod fields;
pub mod middleware;

pub use fields::preview;
pub use middleware::generate_request_id;

/// Crate prefix used for per-component filter directives
const TARGET_PREFIX: &str = "memocha";

/// Build filter directives string from LoggingConfig
///
/// Produces `"<level>,memocha::<component>=<level>,..."`. Components are
/// emitted in sorted order so the result is stable.
///
/// # Examples
///
/// ```
/// use memocha::config::{LogFormat, LoggingConfig};
/// use memocha::logging::build_filter_directives;
/// use std::collections::HashMap;
///
/// let config = LoggingConfig {
///     level: "info".to_string(),
///     format: LogFormat::Pretty,
///     component_levels: Some(HashMap::from([("llm".to_string(), "debug".to_string())])),
/// };
///
/// assert_eq!(build_filter_directives(&config), "info,memocha::llm=debug");
/// ```
pub fn build_filter_directives(config: &crate::config::LoggingConfig) -> String {
    let mut filter_str = config.level.clone();

    if let Some(component_levels) = &config.component_levels {
        let mut components: Vec<_> = component_levels.iter().collect();
        components.sort();
        for (component, level) in components {
            filter_str.push_str(&format!(",{}::{}={}", TARGET_PREFIX, component, level));
        }
    }

    filter_str
}
