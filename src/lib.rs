//! Civitai Archiver - archive model metadata, files and previews
//!
//! Fetches model metadata from the public Civitai API and stores it on local
//! disk together with the model files and preview images, organized as
//! `{root}/{type}/{name} - id {id}/`.

pub mod archive;
pub mod client;
pub mod config;
pub mod error;
pub mod identifier;
pub mod models;

pub use archive::{Archiver, ItemOutcome, ItemReport, MetadataStatus, ModelReport};
pub use client::{CivitaiClient, FetchOutcome, MetadataSource};
pub use config::ArchiverConfig;
pub use error::{ArchiveError, ArchiveResult};
pub use identifier::{extract_model_id, resolve_model_id, split_inputs};
pub use models::{ModelMetadata, TransferSummary, model_directory};
