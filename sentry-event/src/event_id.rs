use std::fmt;

use serde::{Serialize, Serializer};
use uuid::{Builder, Uuid};

/// Identifier of a single event: a version 4, variant 1 UUID rendered as 32 lowercase
/// hex characters without hyphens, which is the form Sentry expects in `event_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventId(Uuid);

impl EventId {
    /// Generate a fresh identifier from the thread-local random source.
    pub fn new() -> Self {
        Self::from_random_bytes(rand::random())
    }

    /// Build an identifier out of 16 random bytes, forcing the version and variant bits.
    pub fn from_random_bytes(bytes: [u8; 16]) -> Self {
        Self(Builder::from_random_bytes(bytes).into_uuid())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl Serialize for EventId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}
