//! Dependency initialization and wiring for the catalog sync engine.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::admin::DataSyncService;
use crate::config::settings::{ConnectionMode, Settings};
use crate::consumer::KafkaConsumer;
use crate::goods::GoodsService;
use crate::orchestrator::Orchestrator;
use crate::processor::ChangeProcessor;
use crate::reconciler::BulkReconciler;
use crate::sync::SyncManager;
use crate::IndexingError;
use catalog_sync_repository::opensearch::IndexConfig;
use catalog_sync_repository::{
    CatalogStore, MySqlCatalogStore, OpenSearchGoodsStore, SearchIndexStore,
};

/// The sync engine's components, wired over one catalog and one index.
pub struct SyncComponents {
    pub catalog: Arc<dyn CatalogStore>,
    pub index: Arc<dyn SearchIndexStore>,
    pub sync: Arc<SyncManager>,
    pub goods_service: Arc<GoodsService>,
    pub reconciler: Arc<BulkReconciler>,
    pub data_sync: Arc<DataSyncService>,
}

impl SyncComponents {
    /// Wire the components over already-connected stores.
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        index: Arc<dyn SearchIndexStore>,
        enable_service_sync: bool,
    ) -> Self {
        let sync = Arc::new(SyncManager::new(catalog.clone(), index.clone()));
        let goods_service = Arc::new(GoodsService::new(
            catalog.clone(),
            index.clone(),
            enable_service_sync,
        ));
        let reconciler = Arc::new(BulkReconciler::new(
            catalog.clone(),
            index.clone(),
            sync.clone(),
        ));
        let data_sync = Arc::new(DataSyncService::new(reconciler.clone()));

        Self {
            catalog,
            index,
            sync,
            goods_service,
            reconciler,
            data_sync,
        }
    }

    /// Connect to the catalog database and OpenSearch, and make sure the goods index exists.
    ///
    /// # Returns
    ///
    /// * `Ok(SyncComponents)` - Connected components
    /// * `Err(IndexingError)` - If a store cannot be reached (OpenSearch only in fail-fast mode)
    pub async fn connect(settings: &Settings) -> Result<Self, IndexingError> {
        info!(
            opensearch_url = %settings.opensearch_url,
            index_alias = %settings.index_alias,
            index_version = settings.index_version,
            connection_mode = ?settings.connection_mode,
            retry_interval_secs = settings.retry_interval.as_secs(),
            enable_service_sync = settings.enable_service_sync,
            "Initializing stores"
        );

        let catalog = MySqlCatalogStore::connect(&settings.database_url)
            .await
            .map_err(|e| IndexingError::config(format!("Failed to connect to catalog: {}", e)))?;

        let index_config = IndexConfig::new(settings.index_alias.clone(), settings.index_version);
        let index = Self::connect_to_opensearch(
            &settings.opensearch_url,
            index_config,
            settings.connection_mode,
            settings.retry_interval,
        )
        .await?;

        info!("OpenSearch connection established");

        // Exits if index and alias cannot be created
        index
            .ensure_index_exists()
            .await
            .map_err(|e| IndexingError::config(format!("Failed to ensure index exists: {}", e)))?;

        Ok(Self::new(
            Arc::new(catalog),
            Arc::new(index),
            settings.enable_service_sync,
        ))
    }

    /// Connect to OpenSearch with retry logic based on connection mode.
    async fn connect_to_opensearch(
        url: &str,
        index_config: IndexConfig,
        mode: ConnectionMode,
        retry_interval: Duration,
    ) -> Result<OpenSearchGoodsStore, IndexingError> {
        loop {
            match OpenSearchGoodsStore::new(url, index_config.clone()).await {
                Ok(store) => return Ok(store),
                Err(e) => match mode {
                    ConnectionMode::FailFast => {
                        return Err(IndexingError::config(format!(
                            "Failed to connect to OpenSearch: {}",
                            e
                        )));
                    }
                    ConnectionMode::Retry => {
                        warn!(
                            opensearch_url = %url,
                            error = %e,
                            retry_interval_secs = retry_interval.as_secs(),
                            "Failed to connect to OpenSearch, retrying..."
                        );
                        sleep(retry_interval).await;
                    }
                },
            }
        }
    }
}

/// Container for all initialized dependencies of the consumer service.
pub struct Dependencies {
    pub components: SyncComponents,
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
}

impl Dependencies {
    /// Initialize all dependencies from `settings`.
    pub async fn new(settings: &Settings) -> Result<Self, IndexingError> {
        let components = SyncComponents::connect(settings).await?;

        let consumer = KafkaConsumer::new(settings.kafka_consumer_config()).map_err(|e| {
            IndexingError::config(format!("Failed to create Kafka consumer: {}", e))
        })?;

        info!(
            kafka_broker = %settings.kafka_broker,
            topic = %settings.canal_topic,
            database = %settings.canal_database,
            "Kafka consumer created"
        );

        let processor = ChangeProcessor::new(components.sync.clone(), settings.canal_database.clone());
        let orchestrator = Orchestrator::new(Arc::new(consumer), processor);

        Ok(Self {
            components,
            orchestrator,
        })
    }
}
