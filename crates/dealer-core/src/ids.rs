use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque, client-chosen identifier for a shopper session.
///
/// Wire representation is a bare JSON string; the newtype only buys
/// compile-time separation from [`RepId`] inside the store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShopperId(pub String);

/// Opaque, client-chosen identifier for a representative connection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepId(pub String);

impl fmt::Display for ShopperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ShopperId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<String> for RepId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for ShopperId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for RepId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
