use std::sync::Arc;
use tokio::sync::RwLock;

use crate::clients::provider::ProviderClient;
use crate::config::Config;
use crate::db::Store;
use crate::services::SearchGateway;

/// Build a shared HTTP client with reasonable defaults for API calls.
/// This client should be reused across all HTTP-based services to enable
/// connection pooling and avoid socket exhaustion.
fn build_shared_http_client(timeout_seconds: u64) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_seconds))
        .user_agent("Askarr/1.0")
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build shared HTTP client: {e}"))
}

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub provider: Arc<ProviderClient>,

    pub search_gateway: Arc<SearchGateway>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
            config.general.event_bus_buffer_size,
        )
        .await?;

        let http_client =
            build_shared_http_client(config.provider.request_timeout_seconds.into())?;

        let provider = Arc::new(ProviderClient::new(
            http_client,
            &config.provider.base_url,
            &config.provider.model,
        ));

        let search_gateway = Arc::new(SearchGateway::new(
            store.clone(),
            (*provider).clone(),
            config.provider.clone(),
        ));

        let config = Arc::new(RwLock::new(config));

        Ok(Self {
            config,
            store,
            provider,
            search_gateway,
        })
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }
}
