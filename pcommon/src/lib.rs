//! Shared primitives used by every promptshell crate.
//!
//! ```rust
//! use pcommon::{GenerationOptions, MetadataMap, TraceId};
//!
//! let trace = TraceId::new("trace-1");
//! let mut metadata = MetadataMap::new();
//! metadata.insert("tenant".to_string(), "acme".to_string());
//!
//! let options = GenerationOptions::default().with_temperature(0.3).with_top_p(0.9);
//! assert_eq!(trace.to_string(), "trace-1");
//! assert_eq!(options.top_p, Some(0.9));
//! ```

pub mod future {
    //! Boxed future alias used for object-safe async traits.
    //!
    //! ```rust
    //! use pcommon::BoxFuture;
    //!
    //! fn key_len<'a>(key: &'a str) -> BoxFuture<'a, usize> {
    //!     Box::pin(async move { key.len() })
    //! }
    //!
    //! let _future = key_len("prompt-shell:tools:echo");
    //! ```

    use std::future::Future;
    use std::pin::Pin;

    pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
}

pub mod context {
    //! Request-scoped identifiers and metadata.

    use std::collections::HashMap;
    use std::fmt::{Display, Formatter};
    use std::sync::atomic::{AtomicU64, Ordering};

    pub type MetadataMap = HashMap<String, String>;

    static NEXT_TRACE: AtomicU64 = AtomicU64::new(1);

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    pub struct TraceId(String);

    impl TraceId {
        pub fn new(value: impl Into<String>) -> Self {
            Self(value.into())
        }

        /// Process-unique id for requests that arrive without one.
        pub fn next() -> Self {
            let n = NEXT_TRACE.fetch_add(1, Ordering::Relaxed);
            Self(format!("ps-{n:08x}"))
        }

        pub fn as_str(&self) -> &str {
            self.0.as_str()
        }
    }

    impl Default for TraceId {
        fn default() -> Self {
            Self::next()
        }
    }

    impl Display for TraceId {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl From<String> for TraceId {
        fn from(value: String) -> Self {
            Self(value)
        }
    }

    impl From<&str> for TraceId {
        fn from(value: &str) -> Self {
            Self(value.to_string())
        }
    }
}

pub mod model {
    //! Generation parameters forwarded to the chat-completion collaborator.
    //!
    //! ```rust
    //! use pcommon::GenerationOptions;
    //!
    //! let options = GenerationOptions::default()
    //!     .with_temperature(0.2)
    //!     .with_max_tokens(128);
    //!
    //! assert_eq!(options.temperature, Some(0.2));
    //! assert_eq!(options.max_tokens, Some(128));
    //! assert_eq!(options.top_p, None);
    //! ```

    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
    pub struct GenerationOptions {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub temperature: Option<f32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub max_tokens: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub top_p: Option<f32>,
    }

    impl GenerationOptions {
        pub fn with_temperature(mut self, temperature: f32) -> Self {
            self.temperature = Some(temperature);
            self
        }

        pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
            self.max_tokens = Some(max_tokens);
            self
        }

        pub fn with_top_p(mut self, top_p: f32) -> Self {
            self.top_p = Some(top_p);
            self
        }
    }
}

pub mod registry {
    //! Keyed map wrapper shared by per-tool bookkeeping.
    //!
    //! ```rust
    //! use pcommon::Registry;
    //!
    //! let mut registry = Registry::new();
    //! registry.insert("weather.now".to_string(), 1_u32);
    //!
    //! assert_eq!(registry.get("weather.now"), Some(&1));
    //! assert!(registry.contains_key("weather.now"));
    //! ```

    use std::borrow::Borrow;
    use std::collections::HashMap;
    use std::hash::Hash;

    #[derive(Debug, Clone)]
    pub struct Registry<K, V> {
        items: HashMap<K, V>,
    }

    impl<K, V> Default for Registry<K, V>
    where
        K: Eq + Hash,
    {
        fn default() -> Self {
            Self {
                items: HashMap::new(),
            }
        }
    }

    impl<K, V> Registry<K, V>
    where
        K: Eq + Hash,
    {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&mut self, key: K, value: V) -> Option<V> {
            self.items.insert(key, value)
        }

        pub fn get<Q>(&self, key: &Q) -> Option<&V>
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            self.items.get(key)
        }

        pub fn get_or_insert_with(&mut self, key: K, make: impl FnOnce() -> V) -> &mut V {
            self.items.entry(key).or_insert_with(make)
        }

        pub fn contains_key<Q>(&self, key: &Q) -> bool
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            self.items.contains_key(key)
        }

        pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
            self.items.iter()
        }

        pub fn len(&self) -> usize {
            self.items.len()
        }

        pub fn is_empty(&self) -> bool {
            self.items.is_empty()
        }
    }
}

pub use context::{MetadataMap, TraceId};
pub use future::BoxFuture;
pub use model::GenerationOptions;
pub use registry::Registry;

#[cfg(test)]
mod tests {
    use super::{GenerationOptions, Registry, TraceId};

    #[test]
    fn trace_ids_round_trip_and_generate_unique_values() {
        let trace = TraceId::from("trace-1");
        assert_eq!(trace.as_str(), "trace-1");
        assert_eq!(trace.to_string(), "trace-1");

        let first = TraceId::next();
        let second = TraceId::next();
        assert_ne!(first, second);
        assert!(first.as_str().starts_with("ps-"));
    }

    #[test]
    fn generation_options_skip_unset_fields_when_serialized() {
        let options = GenerationOptions::default().with_max_tokens(64);
        let json = serde_json::to_value(options).expect("options should serialize");

        assert_eq!(json, serde_json::json!({ "max_tokens": 64 }));

        let parsed: GenerationOptions =
            serde_json::from_str(r#"{"temperature":0.5}"#).expect("options should parse");
        assert_eq!(parsed.temperature, Some(0.5));
        assert!(parsed.max_tokens.is_none());
    }

    #[test]
    fn registry_upserts_through_entry_helper() {
        let mut registry: Registry<String, u32> = Registry::new();
        assert!(registry.is_empty());

        *registry.get_or_insert_with("alpha".to_string(), || 0) += 2;
        *registry.get_or_insert_with("alpha".to_string(), || 0) += 3;

        assert_eq!(registry.get("alpha"), Some(&5));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.iter().count(), 1);
    }
}
