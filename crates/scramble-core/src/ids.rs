//! Branded ID newtypes for type safety.
//!
//! Context ids are UUID v7 (time-ordered) generated via [`uuid::Uuid::now_v7`].
//! Ids read back from disk are accepted verbatim: a parent reference may point
//! at an id that was never persisted, so no format validation happens here.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Generate a new UUID v7 string (time-ordered).
fn new_v7() -> String {
    Uuid::now_v7().to_string()
}

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new random ID (UUID v7, time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(new_v7())
            }

            /// Create from an existing string value.
            #[must_use]
            pub fn from_string(s: String) -> Self {
                Self(s)
            }

            /// Return the inner string as a slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// First eight characters, for log lines.
            #[must_use]
            pub fn short(&self) -> &str {
                self.0.get(..8).unwrap_or(&self.0)
            }

            /// Consume self and return the inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

branded_id! {
    /// Unique identifier for a compressed context record.
    ContextId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ids_are_unique() {
        let a = ContextId::new();
        let b = ContextId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn new_ids_are_time_ordered() {
        let a = ContextId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = ContextId::new();
        assert!(a < b);
    }

    #[test]
    fn short_truncates_to_eight() {
        let id = ContextId::from("0123456789abcdef");
        assert_eq!(id.short(), "01234567");
    }

    #[test]
    fn short_keeps_short_ids() {
        let id = ContextId::from("abc");
        assert_eq!(id.short(), "abc");
    }

    #[test]
    fn serde_is_transparent() {
        let id = ContextId::from("ctx-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"ctx-1\"");
        let back: ContextId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn conversions() {
        let id: ContextId = String::from("x").into();
        assert_eq!(id.as_str(), "x");
        assert_eq!(&*id, "x");
        assert_eq!(id.to_string(), "x");
        let s: String = id.into();
        assert_eq!(s, "x");
    }
}
