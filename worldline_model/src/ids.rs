//! Identifier newtypes for save records.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Separator placed between the parts of a derived id so that
/// `["ab", "c"]` and `["a", "bc"]` never hash to the same name.
const PART_SEPARATOR: &str = "\u{1f}";

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Wrap an existing identifier string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Create a fresh random identifier.
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Create a reproducible identifier from a namespace and name parts.
            pub fn derived(namespace: &Uuid, parts: &[&str]) -> Self {
                let name = parts.join(PART_SEPARATOR);
                Self(Uuid::new_v5(namespace, name.as_bytes()).to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id! {
    /// Unique identifier of one stored record.
    RecordId
}

string_id! {
    /// Identifier of a worldline; every node sharing it belongs to one tree.
    TreeId
}

string_id! {
    /// Identifier of a narrative beat, independent of the record carrying it.
    ContentId
}
