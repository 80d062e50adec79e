//! Preview image downloads
//!
//! Image URLs on the Civitai CDN carry resize options in the path segment just
//! before the file name, e.g.
//! `https://image.civitai.com/{key}/{uuid}/width=450/12345.jpeg`. Requesting an
//! absurd width makes the CDN serve the original upload.

use super::layout::{self, PREVIEWS_DIR};
use super::metadata::ModelMetadata;
use super::transfer::{TransferSummary, fetch_to_file};
use crate::config::ArchiverConfig;
use crate::error::{ArchiveError, ArchiveResult};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Width requested so the CDN never downscales
pub const MAX_WIDTH: u32 = 10000;

/// Extensions a preview is expected to have, matched case-sensitively
pub const IMAGE_EXTENSIONS: [&str; 7] = [".png", ".jpg", ".jpeg", ".jfif", ".webp", ".avif", ".gif"];

/// Extension given to previews whose name has none of the above
pub const DEFAULT_EXTENSION: &str = ".jfif";

/// How to handle one preview given what is already on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewAction {
    /// Nothing on disk yet
    Fetch,
    /// Replace an empty (corrupted) copy
    Overwrite,
    /// Keep the existing copy and save the new one under a timestamped name
    FetchRenamed,
    Skip,
}

/// Rewrite the `width=` option preceding the file name to [`MAX_WIDTH`]
///
/// URLs without an option segment are returned unchanged.
pub fn upscale_image_url(url: &str) -> String {
    let Some((head, file)) = url.rsplit_once('/') else {
        return url.to_string();
    };
    let Some((prefix, options)) = head.rsplit_once('/') else {
        return url.to_string();
    };
    if !options.split(',').any(|opt| opt.starts_with("width=")) {
        return url.to_string();
    }

    let options: Vec<String> = options
        .split(',')
        .map(|opt| {
            if opt.starts_with("width=") {
                format!("width={}", MAX_WIDTH)
            } else {
                opt.to_string()
            }
        })
        .collect();

    format!("{}/{}/{}", prefix, options.join(","), file)
}

/// File name a preview is stored under
///
/// The last URL segment, percent-decoded and stripped of illegal characters,
/// with [`DEFAULT_EXTENSION`] appended when it lacks a known image extension.
pub fn preview_file_name(url: &str) -> String {
    let segment = url.rsplit('/').next().unwrap_or(url);
    let decoded = urlencoding::decode_binary(segment.as_bytes());
    let mut name = layout::sanitize_component(&String::from_utf8_lossy(&decoded));

    if !IMAGE_EXTENSIONS.iter().any(|ext| name.ends_with(ext)) {
        name.push_str(DEFAULT_EXTENSION);
    }
    name
}

/// Decide what to do given the size of an existing copy, if any
pub fn resolve_conflict(existing_size: Option<u64>, config: &ArchiverConfig) -> PreviewAction {
    match existing_size {
        None => PreviewAction::Fetch,
        Some(size) if size > 0 => {
            if config.skip_duplicate_images {
                PreviewAction::Skip
            } else {
                PreviewAction::FetchRenamed
            }
        }
        Some(_) if config.redownload_corrupted => PreviewAction::Overwrite,
        Some(_) if config.skip_duplicate_images => PreviewAction::Skip,
        Some(_) => PreviewAction::Overwrite,
    }
}

/// Locate an existing copy of a preview and return its path and size
///
/// Tries the exact name first, then the same base name (text before the first
/// `.`) with each known extension, which catches previews saved as `.jfif`
/// before their URL carried an extension.
pub async fn find_existing(dir: &Path, name: &str) -> ArchiveResult<Option<(PathBuf, u64)>> {
    let exact = dir.join(name);
    if let Some(size) = file_size(&exact).await? {
        return Ok(Some((exact, size)));
    }

    let base = name.split('.').next().unwrap_or(name);
    for ext in IMAGE_EXTENSIONS {
        let candidate = dir.join(format!("{}{}", base, ext));
        if let Some(size) = file_size(&candidate).await? {
            return Ok(Some((candidate, size)));
        }
    }

    Ok(None)
}

async fn file_size(path: &Path) -> ArchiveResult<Option<u64>> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => Ok(Some(meta.len())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ArchiveError::io(path)(e)),
    }
}

/// Directory previews are saved to
pub fn previews_directory(metadata: &ModelMetadata, config: &ArchiverConfig) -> PathBuf {
    layout::model_directory(
        &config.destination_root,
        metadata.model_type(),
        metadata.name(),
        metadata.id(),
    )
    .join(PREVIEWS_DIR)
}

/// Download every preview image listed in `metadata`
///
/// The first failure abandons the remaining images of this model, across all
/// versions, and is recorded in the returned summary.
pub async fn download_previews(
    http: &reqwest::Client,
    metadata: &ModelMetadata,
    config: &ArchiverConfig,
) -> TransferSummary {
    let mut summary = TransferSummary::default();
    if let Err(e) = download_all(http, metadata, config, &mut summary).await {
        tracing::error!(
            model_id = %metadata.id(),
            error = %e,
            "Preview download failed, skipping remaining images"
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
    let dir = previews_directory(metadata, config);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(ArchiveError::io(&dir))?;

    for image in metadata.images() {
        let url = upscale_image_url(&image.url);
        let name = preview_file_name(&url);

        let existing = find_existing(&dir, &name).await?;
        let action = resolve_conflict(existing.as_ref().map(|(_, size)| *size), config);

        let path = match action {
            PreviewAction::Skip => {
                if let Some((path, _)) = existing {
                    summary.skipped.push(path);
                }
                continue;
            }
            PreviewAction::Fetch => dir.join(&name),
            PreviewAction::Overwrite => {
                tracing::info!(path = ?existing.map(|(p, _)| p), "Redownloading empty preview");
                dir.join(&name)
            }
            PreviewAction::FetchRenamed => {
                let renamed = format!("{} - {}", layout::timestamp(&chrono::Local::now()), name);
                tracing::info!(name = %name, renamed = %renamed, "Preview name taken, saving under new name");
                dir.join(renamed)
            }
        };

        tracing::info!(model = %metadata.name(), url = %url, "Downloading preview");
        let bytes = fetch_to_file(http, &url, &path, config.show_progress).await?;
        summary.record_download(path, bytes);
    }

    Ok(())
}
