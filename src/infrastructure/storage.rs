use crate::config::AppConfig;
use crate::services::storage::UploadStore;
use std::sync::Arc;
use tracing::info;

pub async fn setup_storage(config: &AppConfig) -> anyhow::Result<Arc<UploadStore>> {
    let store = UploadStore::new(config.upload_dir.clone(), config.max_file_size);
    store.ensure_dir().await?;

    info!("📁 Upload directory: {}", store.root().display());

    Ok(Arc::new(store))
}
