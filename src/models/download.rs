//! Model file downloads
//!
//! Walks every file of every version in document order and streams each one
//! that is not already on disk into the model directory.

use super::layout::{self, FILES_DIR};
use super::metadata::ModelMetadata;
use super::transfer::{TransferSummary, fetch_to_file};
use crate::config::ArchiverConfig;
use crate::error::{ArchiveError, ArchiveResult};
use std::path::PathBuf;

/// Directory model files are saved to
pub fn files_directory(metadata: &ModelMetadata, config: &ArchiverConfig) -> PathBuf {
    let dir = layout::model_directory(
        &config.destination_root,
        metadata.model_type(),
        metadata.name(),
        metadata.id(),
    );
    if config.use_subfolder {
        dir.join(FILES_DIR)
    } else {
        dir
    }
}

/// Download every model file listed in `metadata`
///
/// The first failure abandons the remaining files of this model. It is logged
/// and recorded in the returned summary rather than returned as an error.
pub async fn download_model_files(
    http: &reqwest::Client,
    metadata: &ModelMetadata,
    config: &ArchiverConfig,
) -> TransferSummary {
    let mut summary = TransferSummary::default();
    if let Err(e) = download_all(http, metadata, config, &mut summary).await {
        tracing::error!(
            model_id = %metadata.id(),
            error = %e,
            "Model file download failed, skipping remaining files"
        );
        summary.abort(&e);
    }
    summary
}

async fn download_all(
    http: &reqwest::Client,
    metadata: &ModelMetadata,
    config: &ArchiverConfig,
    summary: &mut TransferSummary,
) -> ArchiveResult<()> {
    let dir = files_directory(metadata, config);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(ArchiveError::io(&dir))?;

    for file in metadata.files() {
        let path = dir.join(layout::sanitize_component(&file.name));

        if config.skip_duplicate_models
            && tokio::fs::try_exists(&path)
                .await
                .map_err(ArchiveError::io(&path))?
        {
            tracing::debug!(model_id = %metadata.id(), path = ?path, "Model file already present");
            summary.skipped.push(path);
            continue;
        }

        tracing::info!(
            model_id = %metadata.id(),
            model = %metadata.name(),
            url = %file.download_url,
            "Downloading model file"
        );
        let bytes = fetch_to_file(http, &file.download_url, &path, config.show_progress).await?;
        summary.record_download(path, bytes);
    }

    Ok(())
}
