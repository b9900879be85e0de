//! Client-side state machine for a search session.
//!
//! Drives the interactive `ask` command and mirrors what a web client
//! does over the HTTP API: one submission at a time, result or error in
//! view state, and history views refreshed through store events rather
//! than manual refetching after each mutation.

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::warn;

use crate::db::{DEFAULT_LIST_LIMIT, DEFAULT_RECENT_LIMIT, Store};
use crate::domain::Identity;
use crate::domain::events::StoreEvent;
use crate::domain::search::{SearchOutcome, SearchRecord};
use crate::services::SearchGateway;

pub struct SearchController {
    store: Store,
    gateway: SearchGateway,
    identity: Option<Identity>,
    events: broadcast::Receiver<StoreEvent>,

    pub query_text: String,
    pub is_searching: bool,
    pub current_result: Option<SearchOutcome>,
    pub error_message: Option<String>,
    pub show_history: bool,

    /// Compact recent-history view.
    pub recent: Vec<SearchRecord>,
    /// Full history view.
    pub all: Vec<SearchRecord>,
}

impl SearchController {
    #[must_use]
    pub fn new(store: Store, gateway: SearchGateway, identity: Option<Identity>) -> Self {
        let events = store.subscribe();
        Self {
            store,
            gateway,
            identity,
            events,
            query_text: String::new(),
            is_searching: false,
            current_result: None,
            error_message: None,
            show_history: false,
            recent: Vec::new(),
            all: Vec::new(),
        }
    }

    /// Submit a query. Empty input is a no-op, as is submitting while a
    /// search is already in flight. Both outcome paths clear
    /// `is_searching`.
    pub async fn submit(&mut self, text: &str) {
        if self.is_searching {
            return;
        }

        let query = text.trim();
        if query.is_empty() {
            return;
        }

        self.query_text = query.to_string();
        self.is_searching = true;
        self.error_message = None;
        self.current_result = None;

        match self.gateway.perform_search(self.identity, query).await {
            Ok(outcome) => self.current_result = Some(outcome),
            Err(err) => self.error_message = Some(err.to_string()),
        }

        self.is_searching = false;
    }

    /// Re-run a history entry as a live search. The stored answer stays in
    /// the history list; this produces a fresh provider call and a fresh
    /// record.
    pub async fn select_history_entry(&mut self, record: SearchRecord) {
        self.query_text = record.query.clone();
        self.show_history = false;
        self.submit(&record.query).await;
    }

    /// Delete one of the identity's records. Failures are logged and
    /// surfaced in `error_message` instead of being dropped.
    pub async fn delete_entry(&mut self, record_id: i32) {
        if let Err(err) = self.store.delete_search(self.identity, record_id).await {
            warn!(record_id, "Failed to delete search record: {err}");
            self.error_message = Some(err.to_string());
        }
    }

    pub fn toggle_history(&mut self) {
        self.show_history = !self.show_history;
    }

    /// Drain pending store events and re-query both history views if any
    /// event was scoped to this controller's identity. This is the only
    /// path that refreshes the views after a mutation.
    pub async fn refresh_from_events(&mut self) {
        let mut needs_refresh = false;

        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    if self
                        .identity
                        .is_some_and(|id| id.value() == event.owner_id())
                    {
                        needs_refresh = true;
                    }
                }
                // Missed events could have been ours, refresh to be safe
                Err(TryRecvError::Lagged(_)) => needs_refresh = true,
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }

        if needs_refresh {
            self.refresh_views().await;
        }
    }

    /// Re-query both list views from the store.
    pub async fn refresh_views(&mut self) {
        match self.store.list_recent(self.identity, DEFAULT_RECENT_LIMIT).await {
            Ok(records) => self.recent = records,
            Err(err) => {
                warn!("Failed to refresh recent searches: {err}");
                self.error_message = Some(err.to_string());
                return;
            }
        }

        match self.store.list_all(self.identity, DEFAULT_LIST_LIMIT).await {
            Ok(records) => self.all = records,
            Err(err) => {
                warn!("Failed to refresh search history: {err}");
                self.error_message = Some(err.to_string());
            }
        }
    }
}
