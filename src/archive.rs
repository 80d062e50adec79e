//! Batch runner: resolve, fetch, write and download, one model at a time

use crate::client::{CivitaiClient, FetchOutcome, MetadataSource};
use crate::config::ArchiverConfig;
use crate::error::ArchiveResult;
use crate::identifier::resolve_model_id;
use crate::models::transfer::error_chain;
use crate::models::{
    MetadataOutcome, ModelMetadata, TransferSummary, download_model_files, download_previews,
    model_directory, write_metadata,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Result of archiving one user-supplied item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemReport {
    pub input: String,
    pub outcome: ItemOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemOutcome {
    /// Neither a model page URL nor a bare id
    InvalidInput,
    NotFoundOrUnparseable { model_id: String },
    HttpError { model_id: String, status: u16 },
    /// The API could not be reached
    FetchFailed { model_id: String, error: String },
    Archived(ModelReport),
}

/// What happened to one model's metadata, files and previews
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelReport {
    pub model_id: String,
    pub name: String,
    pub directory: PathBuf,
    pub metadata: MetadataStatus,
    pub files: TransferSummary,
    pub previews: TransferSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum MetadataStatus {
    Written { backup: Option<PathBuf> },
    Unchanged,
    Failed { error: String },
}

impl From<MetadataOutcome> for MetadataStatus {
    fn from(outcome: MetadataOutcome) -> Self {
        match outcome {
            MetadataOutcome::Written { backup } => Self::Written { backup },
            MetadataOutcome::Unchanged => Self::Unchanged,
        }
    }
}

impl ModelReport {
    pub fn is_complete(&self) -> bool {
        !matches!(self.metadata, MetadataStatus::Failed { .. })
            && self.files.is_complete()
            && self.previews.is_complete()
    }
}

impl ItemReport {
    pub fn is_success(&self) -> bool {
        matches!(&self.outcome, ItemOutcome::Archived(report) if report.is_complete())
    }

    /// One-line human readable summary
    pub fn summary(&self) -> String {
        match &self.outcome {
            ItemOutcome::InvalidInput => format!(
                "{}: invalid URL or ID entered, please double check it",
                self.input
            ),
            ItemOutcome::NotFoundOrUnparseable { model_id } => {
                format!("{}: model {} not found or unreadable", self.input, model_id)
            }
            ItemOutcome::HttpError { model_id, status } => format!(
                "{}: operation failed with code {} for model {}",
                self.input, status, model_id
            ),
            ItemOutcome::FetchFailed { model_id, error } => {
                format!("{}: could not fetch model {}: {}", self.input, model_id, error)
            }
            ItemOutcome::Archived(report) => {
                let mut line = format!(
                    "{}: {} (id {}) -> {:?}: {} file(s) and {} preview(s) downloaded, {} skipped",
                    self.input,
                    report.name,
                    report.model_id,
                    report.directory,
                    report.files.downloaded.len(),
                    report.previews.downloaded.len(),
                    report.files.skipped.len() + report.previews.skipped.len(),
                );
                if let MetadataStatus::Failed { error } = &report.metadata {
                    line.push_str(&format!("; metadata write failed: {}", error));
                }
                if let Some(error) = &report.files.error {
                    line.push_str(&format!("; files aborted: {}", error));
                }
                if let Some(error) = &report.previews.error {
                    line.push_str(&format!("; previews aborted: {}", error));
                }
                line
            }
        }
    }
}

/// Archives models into the configured destination root
pub struct Archiver {
    source: Arc<dyn MetadataSource>,
    http: reqwest::Client,
    config: ArchiverConfig,
}

impl Archiver {
    /// Create an archiver backed by the Civitai API
    pub fn new(config: ArchiverConfig) -> ArchiveResult<Self> {
        let client = CivitaiClient::new(&config)?;
        let http = client.http().clone();
        Ok(Self::with_source(config, Arc::new(client), http))
    }

    /// Create an archiver with a custom metadata source
    pub fn with_source(
        config: ArchiverConfig,
        source: Arc<dyn MetadataSource>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            source,
            http,
            config,
        }
    }

    pub fn config(&self) -> &ArchiverConfig {
        &self.config
    }

    /// Archive each item in order, one report per item
    pub async fn run_batch<S: AsRef<str>>(&self, inputs: &[S]) -> Vec<ItemReport> {
        let mut reports = Vec::with_capacity(inputs.len());
        for input in inputs {
            reports.push(self.archive_item(input.as_ref()).await);
        }
        reports
    }

    /// Resolve, fetch and archive a single URL or id
    pub async fn archive_item(&self, input: &str) -> ItemReport {
        let input = input.trim().to_string();

        let model_id = match resolve_model_id(&input) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(input = %input, error = %e, "Skipping invalid input");
                return ItemReport {
                    input,
                    outcome: ItemOutcome::InvalidInput,
                };
            }
        };

        let outcome = match self.source.fetch_metadata(&model_id).await {
            Ok(FetchOutcome::Success(metadata)) => {
                ItemOutcome::Archived(self.archive_model(&metadata).await)
            }
            Ok(FetchOutcome::NotFoundOrUnparseable) => ItemOutcome::NotFoundOrUnparseable { model_id },
            Ok(FetchOutcome::HttpError(status)) => ItemOutcome::HttpError { model_id, status },
            Err(e) => {
                tracing::error!(model_id = %model_id, error = %e, "Metadata fetch failed");
                ItemOutcome::FetchFailed {
                    model_id,
                    error: error_chain(&e),
                }
            }
        };

        ItemReport { input, outcome }
    }

    /// Write metadata, then download files and previews for one model
    ///
    /// A failed metadata write does not stop the downloads.
    pub async fn archive_model(&self, metadata: &ModelMetadata) -> ModelReport {
        tracing::info!(
            model_id = %metadata.id(),
            model = %metadata.name(),
            "Starting processing of model"
        );

        let metadata_status = match write_metadata(metadata, &self.config).await {
            Ok(outcome) => outcome.into(),
            Err(e) => {
                tracing::error!(model_id = %metadata.id(), error = %e, "Failed to write metadata");
                MetadataStatus::Failed {
                    error: error_chain(&e),
                }
            }
        };

        let files = download_model_files(&self.http, metadata, &self.config).await;
        let previews = download_previews(&self.http, metadata, &self.config).await;

        tracing::info!(
            model_id = %metadata.id(),
            files = files.downloaded.len(),
            previews = previews.downloaded.len(),
            bytes = files.bytes_written + previews.bytes_written,
            "Finished processing of model"
        );

        ModelReport {
            model_id: metadata.id().to_string(),
            name: metadata.name().to_string(),
            directory: model_directory(
                &self.config.destination_root,
                metadata.model_type(),
                metadata.name(),
                metadata.id(),
            ),
            metadata: metadata_status,
            files,
            previews,
        }
    }
}
