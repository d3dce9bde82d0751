//! Identifier newtypes
//!
//! The marketplace issues opaque string identifiers (Mongo-style object ids).
//! The relay never inspects their contents; it only compares and forwards
//! them. Each newtype is serde-transparent so it serializes as a bare string
//! on the wire.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new id from any string-like value
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// View the id as a string slice
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the id, returning the inner string
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id! {
    /// A verified user identity, issued by the external identity provider.
    ///
    /// The relay trusts this value as presented at join time; it performs no
    /// independent verification.
    UserId
}

string_id! {
    /// Identifier of a message record in the durable store.
    ///
    /// Only exists once the store has persisted the message; live relay
    /// events may legitimately carry no message id at all.
    MessageId
}

string_id! {
    /// Identifier of a property listing a conversation is scoped to.
    ListingId
}
