//! Streamed HTTP downloads with a progress readout

use crate::error::{ArchiveError, ArchiveResult};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

/// Granularity of progress updates (1 KiB)
///
/// Blocks go through a buffered writer, so the disk sees larger writes.
pub const BLOCK_SIZE: usize = 1024;

const BAR_TEMPLATE: &str =
    "{msg} [{bar:40.cyan/blue}] {binary_bytes}/{binary_total_bytes} {binary_bytes_per_sec} ({eta})";
const SPINNER_TEMPLATE: &str = "{spinner:.green} {msg} {binary_bytes} {binary_bytes_per_sec}";

/// Per-model tally of a download pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransferSummary {
    pub downloaded: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub bytes_written: u64,
    /// First failure; remaining transfers of the pass were abandoned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TransferSummary {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    pub(crate) fn record_download(&mut self, path: PathBuf, bytes: u64) {
        self.downloaded.push(path);
        self.bytes_written += bytes;
    }

    /// Record the failure that ended the pass
    pub(crate) fn abort(&mut self, err: &ArchiveError) {
        self.error = Some(error_chain(err));
    }
}

/// Render an error with its sources, `outer: inner: root`
pub(crate) fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

/// Progress bar sized from `content-length`; a spinner when the size is unknown
fn progress_bar(total: Option<u64>, visible: bool, label: &str) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let pb = match total {
        Some(len) if len > 0 => ProgressBar::new(len).with_style(
            ProgressStyle::with_template(BAR_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        ),
        _ => ProgressBar::new_spinner().with_style(
            ProgressStyle::with_template(SPINNER_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        ),
    };
    pb.set_message(label.to_string());
    pb
}

/// Write one network chunk in `BLOCK_SIZE` blocks, advancing `pb` per block
async fn write_blocks<W: AsyncWrite + Unpin>(
    writer: &mut W,
    chunk: &[u8],
    pb: &ProgressBar,
) -> std::io::Result<u64> {
    for block in chunk.chunks(BLOCK_SIZE) {
        writer.write_all(block).await?;
        pb.inc(block.len() as u64);
    }
    Ok(chunk.len() as u64)
}

/// Download `url` into `path`, returning the number of bytes written
///
/// The target is created (or truncated) before the body is streamed, so an
/// interrupted transfer leaves a partial file behind.
pub async fn fetch_to_file(
    http: &reqwest::Client,
    url: &str,
    path: &Path,
    show_progress: bool,
) -> ArchiveResult<u64> {
    let response = http
        .get(url)
        .send()
        .await
        .map_err(ArchiveError::http(url))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ArchiveError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let label = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let pb = progress_bar(response.content_length(), show_progress, &label);

    let file = tokio::fs::File::create(path)
        .await
        .map_err(ArchiveError::io(path))?;
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(ArchiveError::http(url))?;
        written += write_blocks(&mut writer, &chunk, &pb)
            .await
            .map_err(ArchiveError::io(path))?;
    }

    writer.flush().await.map_err(ArchiveError::io(path))?;
    pb.finish_and_clear();

    tracing::debug!(url = %url, path = ?path, bytes = written, "Download complete");
    Ok(written)
}
