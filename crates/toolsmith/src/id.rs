//! Identifiers for function records.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use uuid::Uuid;

/// Generates a short, URL-safe identifier.
///
/// It is the base64url encoding (without padding) of a random v4 UUID,
/// which yields 22 characters from `[A-Za-z0-9_-]`.
pub fn generate_id() -> String {
    URL_SAFE_NO_PAD.encode(Uuid::new_v4().as_bytes())
}

/// Returns `true` if the id only contains URL-safe characters.
pub fn is_url_safe(id: &str) -> bool {
    !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
