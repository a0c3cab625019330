//! Download stage: mirror one icon set's folder into the local working area.
//!
//! Lists every object under the folder prefix and fetches them concurrently.
//! Individual fetch or write failures are logged and excluded from the result;
//! the stage only fails if the listing itself fails. The stage joins on every
//! fetch before returning, so later stages see a settled working area.

use std::fs;
use std::path::{Path, PathBuf};

use futures::future::join_all;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::event::IconSetRequest;
use crate::store::{ObjectStore, StoreError};

/// A vector icon staged in the working area, keyed by its base name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconFile {
    /// File name without the `.svg` extension; the glyph's identity.
    pub name: String,
    pub path: PathBuf,
}

/// Result of the download stage.
#[derive(Debug, Default)]
pub struct DownloadedSet {
    pub icons: Vec<IconFile>,
    /// Local path of the persisted codepoint map, when the folder has one.
    pub codepoint_map: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("failed to list objects under {prefix}: {reason}")]
    List { prefix: String, reason: StoreError },
}

enum Fetched {
    Icon(IconFile),
    Map(PathBuf),
}

/// Download all eligible objects of the icon set's folder into `work_dir`.
pub async fn download_set<S: ObjectStore>(
    store: &S,
    request: &IconSetRequest,
    work_dir: &Path,
) -> Result<DownloadedSet, DownloadError> {
    let objects = store
        .list_objects(&request.bucket, &request.folder)
        .await
        .map_err(|reason| DownloadError::List {
            prefix: request.folder.clone(),
            reason,
        })?;

    let map_file_name = format!("{}.json", request.name);
    let fetches = objects
        .iter()
        .map(|object| fetch_one(store, request, &map_file_name, &object.key, work_dir));
    let fetched = join_all(fetches).await;

    let mut set = DownloadedSet::default();
    for item in fetched.into_iter().flatten() {
        match item {
            Fetched::Icon(icon) => set.icons.push(icon),
            Fetched::Map(path) => set.codepoint_map = Some(path),
        }
    }

    info!(
        icons = set.icons.len(),
        bucket = %request.bucket,
        prefix = %request.folder,
        has_map = set.codepoint_map.is_some(),
        "downloaded icon set into working area"
    );
    Ok(set)
}

async fn fetch_one<S: ObjectStore>(
    store: &S,
    request: &IconSetRequest,
    map_file_name: &str,
    key: &str,
    work_dir: &Path,
) -> Option<Fetched> {
    let file_name = key.rsplit('/').next().unwrap_or(key);
    let is_map = file_name == map_file_name;
    if !key.ends_with(".svg") && !is_map {
        debug!(key = %key, "not an svg file, ignoring");
        return None;
    }

    debug!(key = %key, "downloading");
    let body = match store.get_object(&request.bucket, key).await {
        Ok(body) => body,
        Err(e) => {
            error!(key = %key, error = %e, "failed to fetch object, excluding from set");
            return None;
        }
    };

    let path = work_dir.join(file_name);
    if let Err(e) = fs::write(&path, &body) {
        error!(path = %path.display(), error = %e, "failed to write downloaded object");
        return None;
    }

    if is_map {
        info!(key = %key, "codepoint map detected");
        Some(Fetched::Map(path))
    } else {
        let name = file_name
            .strip_suffix(".svg")
            .unwrap_or(file_name)
            .to_string();
        Some(Fetched::Icon(IconFile { name, path }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MockObjectStore, ObjectSummary};

    fn request() -> IconSetRequest {
        IconSetRequest {
            bucket: "assets".into(),
            key: "fonts/social/twitter.svg".into(),
            folder: "fonts/social".into(),
            name: "social".into(),
        }
    }

    #[tokio::test]
    async fn separates_icons_from_codepoint_map_and_ignores_others() {
        let work = tempfile::tempdir().unwrap();
        let mut store = MockObjectStore::new();
        store.expect_list_objects().returning(|_, _| {
            Ok(vec![
                ObjectSummary { key: "fonts/social/twitter.svg".into() },
                ObjectSummary { key: "fonts/social/social.json".into() },
                ObjectSummary { key: "fonts/social/notes.txt".into() },
            ])
        });
        store
            .expect_get_object()
            .returning(|_, key| Ok(key.as_bytes().to_vec()));

        let set = download_set(&store, &request(), work.path()).await.unwrap();
        assert_eq!(set.icons.len(), 1);
        assert_eq!(set.icons[0].name, "twitter");
        assert!(set.codepoint_map.is_some());
        // notes.txt is neither svg nor the map: never fetched nor written.
        assert!(!work.path().join("notes.txt").exists());
    }

    #[tokio::test]
    async fn fetch_failure_excludes_file_but_not_stage() {
        let work = tempfile::tempdir().unwrap();
        let mut store = MockObjectStore::new();
        store.expect_list_objects().returning(|_, _| {
            Ok(vec![
                ObjectSummary { key: "fonts/social/ok.svg".into() },
                ObjectSummary { key: "fonts/social/broken.svg".into() },
            ])
        });
        store.expect_get_object().returning(|_, key| {
            if key.ends_with("broken.svg") {
                Err("connection reset".into())
            } else {
                Ok(b"<svg/>".to_vec())
            }
        });

        let set = download_set(&store, &request(), work.path()).await.unwrap();
        assert_eq!(set.icons.len(), 1);
        assert_eq!(set.icons[0].name, "ok");
    }

    #[tokio::test]
    async fn listing_failure_is_fatal() {
        let work = tempfile::tempdir().unwrap();
        let mut store = MockObjectStore::new();
        store
            .expect_list_objects()
            .returning(|_, _| Err("access denied".into()));

        let result = download_set(&store, &request(), work.path()).await;
        assert!(matches!(result, Err(DownloadError::List { .. })));
    }
}
