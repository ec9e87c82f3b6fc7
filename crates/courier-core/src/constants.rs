//! Package-level constants and backend limits.

/// Current version of the courier client (sourced from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name.
pub const NAME: &str = "courier";

/// Maximum number of messages accepted by one fan-out or batch call.
pub const MAX_BATCH_SIZE: usize = 500;

/// Maximum number of registration tokens in one topic management call.
pub const MAX_TOPIC_MANAGEMENT_TOKENS: usize = 1000;

/// Prefix the backend uses to namespace topic names.
pub const TOPIC_PREFIX: &str = "/topics/";

/// Client identification header value sent with every request.
pub fn client_header() -> String {
    format!("{NAME}-rs/{VERSION}")
}
