use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Number of pages in a PDF file
pub fn page_count(path: &Path) -> Result<usize> {
    let doc = lopdf::Document::load(path)
        .with_context(|| format!("Failed to parse PDF {}", path.display()))?;
    Ok(doc.get_pages().len())
}

/// Page counts of an input/output pair, read off the async runtime
pub async fn page_counts(input: PathBuf, output: PathBuf) -> Result<(usize, usize)> {
    tokio::task::spawn_blocking(move || -> Result<(usize, usize)> {
        Ok((page_count(&input)?, page_count(&output)?))
    })
    .await?
}

/// Compare OCR input and output page counts in the background.
///
/// Parsing both documents can take a while on large scans, so the response
/// never waits on it; mismatches are only logged.
pub fn spawn_parity_check(
    input: PathBuf,
    output: PathBuf,
) -> JoinHandle<Option<(usize, usize)>> {
    tokio::spawn(async move {
        match page_counts(input.clone(), output).await {
            Ok((before, after)) if before != after => {
                warn!(
                    "⚠️  OCR page count mismatch for {}: {} -> {}",
                    input.display(),
                    before,
                    after
                );
                Some((before, after))
            }
            Ok(counts) => {
                debug!("OCR kept {} pages for {}", counts.0, input.display());
                Some(counts)
            }
            Err(e) => {
                debug!("Page count check skipped for {}: {:#}", input.display(), e);
                None
            }
        }
    })
}
