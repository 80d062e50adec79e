//! On-disk layout of the archive
//!
//! ```text
//! models/
//! └── Checkpoint/
//!     └── Realistic Vision - id 4201/
//!         ├── metadata.json
//!         ├── Realistic Vision - id 4201.url
//!         ├── metadata_backup/
//!         │   └── 10-19-2026 14h03m12s.123456 - metadata.json
//!         ├── files/                 (only with use_subfolder)
//!         │   └── realisticVision_v20.safetensors
//!         └── previews/
//!             └── 0a1b2c.jpeg
//! ```

use chrono::{DateTime, TimeZone};
use std::fmt::Display;
use std::path::{Path, PathBuf};

/// Characters that are illegal in a path component on at least one platform
const ILLEGAL_CHARS: [char; 11] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*', '\t', '\n'];

pub const METADATA_FILE: &str = "metadata.json";
pub const BACKUP_DIR: &str = "metadata_backup";
pub const FILES_DIR: &str = "files";
pub const PREVIEWS_DIR: &str = "previews";

const TIMESTAMP_FORMAT: &str = "%m-%d-%Y %Hh%Mm%Ss.%6f";

/// Strip characters that cannot appear in a path component
pub fn sanitize_component(s: &str) -> String {
    s.chars().filter(|c| !ILLEGAL_CHARS.contains(c)).collect()
}

/// Directory name for a model, e.g. `FooBar Test - id 123`
fn model_dir_name(name: &str, id: impl Display) -> String {
    format!("{} - id {}", sanitize_component(name), id)
}

/// Directory holding everything archived for one model
pub fn model_directory(root: &Path, model_type: &str, name: &str, id: impl Display) -> PathBuf {
    root.join(sanitize_component(model_type))
        .join(model_dir_name(name, id))
}

/// File name of the internet shortcut to the model page
pub fn shortcut_file_name(name: &str, id: impl Display) -> String {
    format!("{}.url", model_dir_name(name, id))
}

/// Collision-resistant timestamp used to prefix backups and renamed previews
pub fn timestamp<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    now.format(TIMESTAMP_FORMAT).to_string()
}

/// File name of a metadata backup taken at `now`
pub fn backup_file_name<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    format!("{} - {}", timestamp(now), METADATA_FILE)
}
