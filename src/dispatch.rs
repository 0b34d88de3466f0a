//! Response body handlers
//!
//! A successful response body goes either to the string handler (decoded
//! with the resolved charset) or to the file handler (streamed to disk,
//! resume-aware). Both return `Ok(None)` when the execution was stopped
//! mid-body.

use crate::callback::ProgressReporter;
use crate::charset;
use crate::error::Result;
use crate::types::DownloadState;
use crate::utils;
use encoding_rs::Encoding;
use reqwest::StatusCode;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

/// Upper bound for buffer preallocation from an untrusted Content-Length
const MAX_PREALLOCATE: u64 = 1024 * 1024;

/// A finished file download
#[derive(Debug)]
pub(crate) struct FileDownload {
    pub(crate) path: PathBuf,
    pub(crate) resumed: bool,
}

/// Read the whole body and decode it with `encoding`
///
/// Emits a single forced progress update once the body is complete.
pub(crate) async fn read_string(
    mut response: reqwest::Response,
    encoding: &'static Encoding,
    progress: &mut ProgressReporter,
) -> Result<Option<String>> {
    let hint = response.content_length().unwrap_or(0).min(MAX_PREALLOCATE);
    let mut bytes = Vec::with_capacity(hint as usize);

    while let Some(chunk) = response.chunk().await? {
        if progress.is_stopped() {
            return Ok(None);
        }
        bytes.extend_from_slice(&chunk);
    }

    let len = bytes.len() as u64;
    let text = charset::decode(&bytes, encoding);

    if !progress.update(len, len, true) {
        return Ok(None);
    }
    Ok(Some(text))
}

/// Stream the body into `state.path`
///
/// `offset` is the byte position the request asked to resume from (0 for
/// a fresh download). The file is appended only when the server honored the
/// range with `206 Partial Content`; any other success status rewrites the
/// file from the start.
pub(crate) async fn write_file(
    mut response: reqwest::Response,
    state: &mut DownloadState,
    offset: u64,
    auto_rename: bool,
    progress: &mut ProgressReporter,
) -> Result<Option<FileDownload>> {
    let resumed = state.resume && offset > 0 && response.status() == StatusCode::PARTIAL_CONTENT;
    let rename_to = if auto_rename {
        utils::filename_from_content_disposition(response.headers())
    } else {
        None
    };

    if let Some(parent) = state.path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut file = if resumed {
        tokio::fs::OpenOptions::new()
            .append(true)
            .open(&state.path)
            .await?
    } else {
        tokio::fs::File::create(&state.path).await?
    };

    state.current = if resumed { offset } else { 0 };
    state.total = response
        .content_length()
        .map(|len| len + state.current)
        .unwrap_or(0);

    tracing::debug!(
        path = %state.path.display(),
        resumed,
        offset = state.current,
        total = state.total,
        "writing response body to file"
    );

    if !progress.update(state.total, state.current, true) {
        return Ok(None);
    }

    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        state.current += chunk.len() as u64;

        if !progress.update(state.total, state.current, false) {
            file.flush().await?;
            tracing::info!(
                path = %state.path.display(),
                bytes = state.current,
                "download stopped, partial file kept"
            );
            return Ok(None);
        }
    }

    file.flush().await?;
    drop(file);

    if state.total == 0 {
        state.total = state.current;
    }

    if !progress.update(state.total, state.current, true) {
        return Ok(None);
    }

    let path = match rename_to {
        Some(name) => rename_download(&state.path, &name).await?,
        None => state.path.clone(),
    };

    Ok(Some(FileDownload { path, resumed }))
}

async fn rename_download(path: &std::path::Path, name: &str) -> Result<PathBuf> {
    let target = path.with_file_name(name);
    if target == path {
        return Ok(target);
    }

    let target = utils::unique_path(&target)?;
    tokio::fs::rename(path, &target).await?;
    tracing::debug!(from = %path.display(), to = %target.display(), "renamed download");
    Ok(target)
}
