use crate::config::AppConfig;
use crate::services::tools::PdfProcessor;
use std::sync::Arc;
use tracing::{info, warn};

pub async fn setup_processor(config: &AppConfig) -> Arc<dyn PdfProcessor> {
    let processor = crate::services::tools::create_processor(config);

    // Probe the binaries up front so a missing install shows in the startup log
    for tool in processor.health_check().await {
        if tool.available {
            info!("🔧 {} found at {}", tool.name, tool.path);
        } else {
            warn!(
                "⚠️  {} not found at {}! Operations using it will fail.",
                tool.name, tool.path
            );
        }
    }

    processor.into()
}
