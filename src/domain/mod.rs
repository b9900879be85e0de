//! Domain types for the search assistant.
//!
//! Strong-typed wrappers and shared models used by the store, the gateway
//! and both client surfaces.

pub mod events;
pub mod search;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The authenticated caller.
///
/// Wraps the user row id so it cannot be mixed up with record ids. It is
/// only ever constructed by the auth boundary (HTTP middleware or CLI
/// bootstrap); store and gateway operations take `Option<Identity>` and
/// treat `None` as an unauthenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identity(i32);

impl Identity {
    #[must_use]
    pub const fn new(id: i32) -> Self {
        debug_assert!(id >= 0, "Identity should be non-negative");
        Self(id)
    }

    /// Returns the underlying user row id.
    #[must_use]
    pub const fn value(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Identity> for i32 {
    fn from(id: Identity) -> Self {
        id.0
    }
}

impl From<i32> for Identity {
    fn from(id: i32) -> Self {
        Self::new(id)
    }
}

impl Serialize for Identity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_i32(self.0)
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let id = i32::deserialize(deserializer)?;
        Ok(Self::new(id))
    }
}

/// Errors surfaced by the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Not found")]
    NotFound,

    #[error(transparent)]
    Database(#[from] anyhow::Error),
}
