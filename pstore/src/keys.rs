//! Namespaced key helpers.
//!
//! ```rust
//! use pstore::{id_to_key, key_to_id};
//!
//! let prefix = "prompt-shell:tools:";
//! assert_eq!(key_to_id("prompt-shell:tools:weather:now", prefix), "weather.now");
//! assert_eq!(id_to_key("weather.now", prefix), "prompt-shell:tools:weather:now");
//! ```

/// Strips `prefix` and turns the remaining `:` separators into dots.
///
/// Keys outside the namespace map to an empty id, which loaders skip.
pub fn key_to_id(key: &str, prefix: &str) -> String {
    match key.strip_prefix(prefix) {
        Some(rest) => rest.replace(':', "."),
        None => String::new(),
    }
}

pub fn id_to_key(id: &str, prefix: &str) -> String {
    format!("{prefix}{}", id.replace('.', ":"))
}
