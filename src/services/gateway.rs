//! Domain service that turns a user query into a durable search record.

use thiserror::Error;
use tracing::{debug, info};

use crate::clients::provider::{ProviderClient, ProviderError};
use crate::config::ProviderConfig;
use crate::db::Store;
use crate::domain::search::{SearchOutcome, Source};
use crate::domain::{Identity, StoreError};

/// Environment variable that overrides the configured provider API key.
pub const PROVIDER_API_KEY_ENV: &str = "ASKARR_PROVIDER_API_KEY";

/// Errors specific to the search operation.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Provider API key is not configured")]
    Configuration,

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Orchestrates one search: credential check, provider round trip, source
/// synthesis, durable insert.
#[derive(Clone)]
pub struct SearchGateway {
    store: Store,
    client: ProviderClient,
    provider: ProviderConfig,
}

impl SearchGateway {
    #[must_use]
    pub const fn new(store: Store, client: ProviderClient, provider: ProviderConfig) -> Self {
        Self {
            store,
            client,
            provider,
        }
    }

    /// The effective provider key. The environment variable wins over the
    /// config file; an empty string counts as unset either way.
    fn api_key(&self) -> Option<String> {
        std::env::var(PROVIDER_API_KEY_ENV)
            .ok()
            .filter(|key| !key.is_empty())
            .or_else(|| Some(self.provider.api_key.clone()).filter(|key| !key.is_empty()))
    }

    /// Run one search for the identity and record the result.
    ///
    /// The credential check happens before any network I/O, and a provider
    /// failure leaves the store untouched. The caller only ever receives an
    /// answer that was durably recorded.
    pub async fn perform_search(
        &self,
        identity: Option<Identity>,
        query: &str,
    ) -> Result<SearchOutcome, GatewayError> {
        let Some(identity) = identity else {
            return Err(GatewayError::Unauthenticated);
        };

        let Some(api_key) = self.api_key() else {
            return Err(GatewayError::Configuration);
        };

        debug!(user = %identity, "Dispatching query to search provider");

        let chat = self.client.chat_completion(&api_key, query).await?;

        let response = chat.answer();
        let sources: Vec<Source> = chat
            .citations
            .iter()
            .enumerate()
            .map(|(index, url)| Source {
                title: format!("Source {}", index + 1),
                url: url.clone(),
            })
            .collect();

        self.store
            .insert_search(Some(identity), query, &response, &sources)
            .await?;

        info!(
            user = %identity,
            sources = sources.len(),
            "Search completed and recorded"
        );

        Ok(SearchOutcome { response, sources })
    }
}
