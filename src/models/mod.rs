//! Model archiving
//!
//! Provides functionality for:
//! - Parsing model metadata documents returned by the Civitai API
//! - Deriving the on-disk layout of an archived model
//! - Writing metadata.json with backups and a model page shortcut
//! - Downloading model files and preview images

pub mod download;
pub mod layout;
pub mod metadata;
pub mod previews;
pub mod transfer;
pub mod writer;

pub use download::{download_model_files, files_directory};
pub use layout::{model_directory, sanitize_component};
pub use metadata::{ModelFile, ModelMetadata, ModelVersion, PreviewImage};
pub use previews::{
    PreviewAction, download_previews, preview_file_name, previews_directory, resolve_conflict,
    upscale_image_url,
};
pub use transfer::{TransferSummary, fetch_to_file};
pub use writer::{MetadataOutcome, write_metadata};
