use serde::{Deserialize, Serialize};

/// A cited source attached to an answer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub url: String,
}

/// A stored search record as returned by list operations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SearchRecord {
    pub id: i32,
    pub query: String,
    pub response: String,
    pub sources: Vec<Source>,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

/// The result of one completed search: the answer text and its sources,
/// in citation order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SearchOutcome {
    pub response: String,
    pub sources: Vec<Source>,
}
