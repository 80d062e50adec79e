//! Model identifier extraction from user input

use crate::error::{ArchiveError, ArchiveResult};

/// Path segment that precedes the id in a model page URL
const MODEL_PATH_MARKER: &str = "models/";

const SITE_HOST: &str = "civitai.com";

/// Extract the model id from a model page URL
///
/// Returns everything after the first `models/` up to the next `/` (or the end
/// of the string), or `None` when the marker is absent. The id is not checked
/// for being numeric.
///
/// ```
/// use civitai_archiver::identifier::extract_model_id;
///
/// assert_eq!(
///     extract_model_id("https://civitai.com/models/4201/realistic-vision"),
///     Some("4201".to_string())
/// );
/// assert_eq!(extract_model_id("https://civitai.com/images/1"), None);
/// ```
pub fn extract_model_id(url: &str) -> Option<String> {
    let start = url.find(MODEL_PATH_MARKER)? + MODEL_PATH_MARKER.len();
    let rest = &url[start..];
    let end = rest.find('/').unwrap_or(rest.len());
    Some(rest[..end].to_string())
}

/// Resolve one user-supplied item (URL or bare id) to a model id
pub fn resolve_model_id(item: &str) -> ArchiveResult<String> {
    let item = item.trim();
    if item.is_empty() {
        return Err(ArchiveError::InvalidInput(item.to_string()));
    }

    if item.starts_with("http") || item.starts_with(SITE_HOST) {
        return match extract_model_id(item) {
            Some(id) if !id.is_empty() => Ok(id),
            _ => Err(ArchiveError::InvalidInput(item.to_string())),
        };
    }

    Ok(item.to_string())
}

/// Split a comma-separated line into its non-empty items
pub fn split_inputs(line: &str) -> Vec<&str> {
    line.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect()
}
