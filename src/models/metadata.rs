//! Model metadata document
//!
//! The API response is kept verbatim (so it can be persisted unchanged) next to
//! a typed view of the few fields the archiver reads.

use crate::error::{ArchiveError, ArchiveResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A model metadata document as returned by `GET /api/v1/models/{id}`
#[derive(Debug, Clone, PartialEq)]
pub struct ModelMetadata {
    id: String,
    name: String,
    model_type: String,
    versions: Vec<ModelVersion>,
    raw: Value,
}

/// One revision of a model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelVersion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub files: Vec<ModelFile>,

    #[serde(default)]
    pub images: Vec<PreviewImage>,
}

/// A downloadable file attached to a version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFile {
    pub name: String,
    #[serde(rename = "downloadUrl")]
    pub download_url: String,
}

/// A preview image attached to a version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewImage {
    pub url: String,
}

/// Raw top-level structure (partial)
#[derive(Debug, Deserialize)]
struct RawModel {
    id: Option<RawId>,
    name: Option<String>,
    #[serde(rename = "type")]
    model_type: Option<String>,
    #[serde(rename = "modelVersions")]
    model_versions: Option<Vec<ModelVersion>>,
}

/// Ids are numeric on Civitai, but accept strings too
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(u64),
    Text(String),
}

impl ModelMetadata {
    /// Build the typed view over a parsed API document
    ///
    /// Fails when `id`, `name`, `type` or `modelVersions` is absent.
    pub fn from_value(raw: Value) -> ArchiveResult<Self> {
        let parsed: RawModel =
            serde_json::from_value(raw.clone()).map_err(ArchiveError::MalformedMetadata)?;

        let id = match parsed.id.ok_or(ArchiveError::MissingField("id"))? {
            RawId::Number(n) => n.to_string(),
            RawId::Text(s) => s,
        };

        Ok(Self {
            id,
            name: parsed.name.ok_or(ArchiveError::MissingField("name"))?,
            model_type: parsed.model_type.ok_or(ArchiveError::MissingField("type"))?,
            versions: parsed
                .model_versions
                .ok_or(ArchiveError::MissingField("modelVersions"))?,
            raw,
        })
    }

    pub fn from_slice(bytes: &[u8]) -> ArchiveResult<Self> {
        let raw: Value = serde_json::from_slice(bytes).map_err(ArchiveError::MalformedMetadata)?;
        Self::from_value(raw)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model_type(&self) -> &str {
        &self.model_type
    }

    pub fn versions(&self) -> &[ModelVersion] {
        &self.versions
    }

    /// The document exactly as received
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// All files across all versions, in document order
    pub fn files(&self) -> impl Iterator<Item = &ModelFile> {
        self.versions.iter().flat_map(|v| v.files.iter())
    }

    /// All preview images across all versions, in document order
    pub fn images(&self) -> impl Iterator<Item = &PreviewImage> {
        self.versions.iter().flat_map(|v| v.images.iter())
    }

    /// Serialize the raw document pretty-printed with a 4-space indent
    pub fn to_pretty_json(&self) -> ArchiveResult<Vec<u8>> {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.raw.serialize(&mut serializer)?;
        Ok(out)
    }
}
