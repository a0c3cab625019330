//! Upload stage: publish the generated bundle back to the icon set's folder.
//!
//! Scans the working area flat (no recursion), filters to recognized bundle
//! file types, and puts each concurrently under its original name with a
//! content type from the fixed extension table. Per-file read or put failures
//! are logged and skipped; the stage joins on every upload before returning,
//! mirroring the download stage's policy.

use std::fs;
use std::path::{Path, PathBuf};

use futures::future::join_all;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::event::IconSetRequest;
use crate::store::ObjectStore;

/// File types that belong to a published bundle; anything else in the working
/// area (source svgs included) stays local.
const OUTPUT_EXTENSIONS: &[&str] = &["eot", "woff2", "woff", "ttf", "css", "html", "scss", "json"];

/// Content type per output extension; unrecognized types fall back to plain text.
pub fn content_type_for(extension: &str) -> &'static str {
    match extension {
        "eot" => "application/vnd.ms-fontobject",
        "woff2" => "font/woff2",
        "woff" => "application/font-woff",
        "ttf" => "application/font-sfnt",
        "css" => "text/css",
        "html" => "text/html",
        "scss" => "text/x-scss",
        "json" => "application/json",
        _ => "text/plain",
    }
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to scan working area {path}: {source}")]
    Scan {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Upload every recognized bundle file from `work_dir` to the set's folder.
/// Returns the keys that were successfully published.
pub async fn upload_bundle<S: ObjectStore>(
    store: &S,
    request: &IconSetRequest,
    work_dir: &Path,
) -> Result<Vec<String>, UploadError> {
    let entries = fs::read_dir(work_dir).map_err(|source| UploadError::Scan {
        path: work_dir.to_path_buf(),
        source,
    })?;

    let mut uploads = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .unwrap_or("");
        if !OUTPUT_EXTENSIONS.contains(&extension) {
            if extension != "svg" {
                debug!(file = %file_name, "not a webfont file, skipping");
            }
            continue;
        }
        let content_type = content_type_for(extension);
        uploads.push(put_one(store, request, file_name, path, content_type));
    }

    let uploaded: Vec<String> = join_all(uploads).await.into_iter().flatten().collect();
    info!(
        count = uploaded.len(),
        bucket = %request.bucket,
        prefix = %request.folder,
        "uploaded webfont bundle"
    );
    Ok(uploaded)
}

async fn put_one<S: ObjectStore>(
    store: &S,
    request: &IconSetRequest,
    file_name: String,
    path: PathBuf,
    content_type: &'static str,
) -> Option<String> {
    let body = match fs::read(&path) {
        Ok(body) => body,
        Err(e) => {
            error!(path = %path.display(), error = %e, "failed to read bundle file, skipping");
            return None;
        }
    };

    let key = format!("{}/{}", request.folder, file_name);
    match store
        .put_object(&request.bucket, &key, body, content_type)
        .await
    {
        Ok(()) => {
            info!(key = %key, content_type = content_type, "uploaded bundle file");
            Some(key)
        }
        Err(e) => {
            error!(key = %key, error = %e, "failed to upload bundle file, skipping");
            None
        }
    }
}
