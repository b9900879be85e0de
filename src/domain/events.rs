//! Store change events.
//!
//! Emitted on the broadcast bus whenever a search record is written or
//! removed. Clients (the CLI controller, the SSE endpoint) subscribe and
//! refresh their views when an event scoped to their identity arrives.

use serde::Serialize;

/// Events sent to connected clients via the event bus and SSE.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum StoreEvent {
    SearchSaved { owner_id: i32, record_id: i32 },
    SearchDeleted { owner_id: i32, record_id: i32 },
}

impl StoreEvent {
    /// The user id this event is scoped to. Events are never delivered
    /// across identities.
    #[must_use]
    pub const fn owner_id(&self) -> i32 {
        match self {
            Self::SearchSaved { owner_id, .. } | Self::SearchDeleted { owner_id, .. } => *owner_id,
        }
    }
}
