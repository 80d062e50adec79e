//! Metadata persistence: metadata.json, backups and the model page shortcut

use super::layout::{self, BACKUP_DIR, METADATA_FILE};
use super::metadata::ModelMetadata;
use crate::config::ArchiverConfig;
use crate::error::{ArchiveError, ArchiveResult};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Public page of a model, the target of the shortcut file
const MODEL_PAGE_BASE: &str = "https://civitai.com/models";

/// What the writer did with a model's metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataOutcome {
    /// metadata.json and the shortcut were (re)written
    Written { backup: Option<PathBuf> },
    /// The model was already archived and updates are disabled
    Unchanged,
}

/// Write content to a file path atomically
async fn write_atomic(path: &Path, content: &[u8]) -> ArchiveResult<()> {
    let temp_file = path.with_extension("json.tmp");

    let mut file = fs::File::create(&temp_file)
        .await
        .map_err(ArchiveError::io(&temp_file))?;
    file.write_all(content)
        .await
        .map_err(ArchiveError::io(&temp_file))?;
    file.sync_all().await.map_err(ArchiveError::io(&temp_file))?;

    fs::rename(&temp_file, path)
        .await
        .map_err(ArchiveError::io(path))?;

    Ok(())
}

/// Copy an existing metadata.json into metadata_backup/, if there is one
async fn backup_existing(dir: &Path, metadata_path: &Path) -> ArchiveResult<Option<PathBuf>> {
    if !fs::try_exists(metadata_path)
        .await
        .map_err(ArchiveError::io(metadata_path))?
    {
        return Ok(None);
    }

    let backup_dir = dir.join(BACKUP_DIR);
    fs::create_dir_all(&backup_dir)
        .await
        .map_err(ArchiveError::io(&backup_dir))?;

    let backup_path = backup_dir.join(layout::backup_file_name(&chrono::Local::now()));
    fs::copy(metadata_path, &backup_path)
        .await
        .map_err(ArchiveError::io(&backup_path))?;

    Ok(Some(backup_path))
}

/// Persist a model's metadata document under its model directory
///
/// The directory is created on first use. For models already on disk the
/// document is only rewritten when `update_metadata` is set; the backup copy
/// and the rewrite are separate steps, only the rewrite itself is atomic.
pub async fn write_metadata(
    metadata: &ModelMetadata,
    config: &ArchiverConfig,
) -> ArchiveResult<MetadataOutcome> {
    let dir = layout::model_directory(
        &config.destination_root,
        metadata.model_type(),
        metadata.name(),
        metadata.id(),
    );

    let existed = fs::try_exists(&dir).await.map_err(ArchiveError::io(&dir))?;
    if existed && !config.update_metadata {
        tracing::debug!(model_id = %metadata.id(), dir = ?dir, "Metadata already present, not updating");
        return Ok(MetadataOutcome::Unchanged);
    }
    if !existed {
        fs::create_dir_all(&dir)
            .await
            .map_err(ArchiveError::io(&dir))?;
    }

    let metadata_path = dir.join(METADATA_FILE);
    let backup = if config.backup_metadata {
        backup_existing(&dir, &metadata_path).await?
    } else {
        None
    };
    if let Some(path) = &backup {
        tracing::info!(model_id = %metadata.id(), backup = ?path, "Backed up previous metadata");
    }

    write_atomic(&metadata_path, &metadata.to_pretty_json()?).await?;

    let shortcut_path = dir.join(layout::shortcut_file_name(metadata.name(), metadata.id()));
    let shortcut = format!(
        "[InternetShortcut]\nURL={}/{}",
        MODEL_PAGE_BASE,
        metadata.id()
    );
    fs::write(&shortcut_path, shortcut)
        .await
        .map_err(ArchiveError::io(&shortcut_path))?;

    tracing::info!(model_id = %metadata.id(), dir = ?dir, "Metadata written");
    Ok(MetadataOutcome::Written { backup })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample() -> ModelMetadata {
        ModelMetadata::from_value(json!({
            "id": 123,
            "name": "Foo/Bar: Test",
            "type": "Checkpoint",
            "description": "<p>ünïcode</p>",
            "modelVersions": []
        }))
        .unwrap()
    }

    fn config_in(dir: &TempDir) -> ArchiverConfig {
        ArchiverConfig {
            destination_root: dir.path().join("models"),
            show_progress: false,
            ..Default::default()
        }
    }

    fn model_dir(dir: &TempDir) -> PathBuf {
        dir.path().join("models/Checkpoint/FooBar Test - id 123")
    }

    #[tokio::test]
    async fn test_first_write_creates_layout() {
        let tmp = TempDir::new().unwrap();
        let outcome = write_metadata(&sample(), &config_in(&tmp)).await.unwrap();

        assert_eq!(outcome, MetadataOutcome::Written { backup: None });
        let dir = model_dir(&tmp);
        assert!(dir.join("metadata.json").exists());
        assert!(!dir.join("metadata.json.tmp").exists());
        assert_eq!(
            std::fs::read_to_string(dir.join("FooBar Test - id 123.url")).unwrap(),
            "[InternetShortcut]\nURL=https://civitai.com/models/123"
        );
        assert!(!dir.join(BACKUP_DIR).exists());
    }

    #[tokio::test]
    async fn test_roundtrip_is_bit_exact() {
        let tmp = TempDir::new().unwrap();
        let metadata = sample();
        write_metadata(&metadata, &config_in(&tmp)).await.unwrap();

        let bytes = std::fs::read(model_dir(&tmp).join("metadata.json")).unwrap();
        let reread = ModelMetadata::from_slice(&bytes).unwrap();
        assert_eq!(reread.raw(), metadata.raw());
        assert_eq!(reread.to_pretty_json().unwrap(), bytes);
    }

    #[tokio::test]
    async fn test_update_backs_up_previous() {
        let tmp = TempDir::new().unwrap();
        let config = config_in(&tmp);
        write_metadata(&sample(), &config).await.unwrap();

        let outcome = write_metadata(&sample(), &config).await.unwrap();
        let backup = match outcome {
            MetadataOutcome::Written { backup: Some(backup) } => backup,
            other => panic!("expected a backup, got {other:?}"),
        };
        assert!(backup.starts_with(model_dir(&tmp).join(BACKUP_DIR)));
        assert!(
            backup
                .file_name()
                .unwrap()
                .to_string_lossy()
                .ends_with(" - metadata.json")
        );
        assert_eq!(
            std::fs::read(&backup).unwrap(),
            std::fs::read(model_dir(&tmp).join("metadata.json")).unwrap()
        );
    }

    #[tokio::test]
    async fn test_backup_disabled() {
        let tmp = TempDir::new().unwrap();
        let config = ArchiverConfig {
            backup_metadata: false,
            ..config_in(&tmp)
        };
        write_metadata(&sample(), &config).await.unwrap();
        let outcome = write_metadata(&sample(), &config).await.unwrap();

        assert_eq!(outcome, MetadataOutcome::Written { backup: None });
        assert!(!model_dir(&tmp).join(BACKUP_DIR).exists());
    }

    #[tokio::test]
    async fn test_no_update_leaves_existing_untouched() {
        let tmp = TempDir::new().unwrap();
        let config = ArchiverConfig {
            update_metadata: false,
            ..config_in(&tmp)
        };

        // New models are still written
        assert!(matches!(
            write_metadata(&sample(), &config).await.unwrap(),
            MetadataOutcome::Written { .. }
        ));

        let path = model_dir(&tmp).join("metadata.json");
        std::fs::write(&path, "old").unwrap();
        assert_eq!(
            write_metadata(&sample(), &config).await.unwrap(),
            MetadataOutcome::Unchanged
        );
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "old");
    }
}
