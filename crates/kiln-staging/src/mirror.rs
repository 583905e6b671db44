//! Best-effort mirroring of local training outputs into object storage.
//!
//! Two variants with deliberately different failure reporting, inherited
//! from the training scripts this replaces:
//!
//! - [`upload_matching_files`] stops at the first storage error and
//!   reports success as a flag.
//! - [`upload_directory`] logs per-file errors, keeps going, and reports
//!   nothing.
//!
//! Uploads are sequential with no parallelism and no resumability; an
//! interrupted run leaves storage partially updated.

use crate::location::StorageLocation;
use kiln_abstraction::ObjectStore;
use std::path::Path;
use tracing::{error, info};
use walkdir::WalkDir;

/// Uploads every file matching `pattern` to `{location.key}{basename}`.
///
/// Returns `true` when all matches uploaded. The first storage error
/// aborts the remaining matches and returns `false`; so does an invalid
/// pattern. Errors are logged, never propagated.
pub async fn upload_matching_files(
    store: &dyn ObjectStore,
    location: &StorageLocation,
    pattern: &str,
) -> bool {
    let paths = match glob::glob(pattern) {
        Ok(paths) => paths,
        Err(e) => {
            error!(error = %e, pattern = %pattern, "Invalid upload pattern");
            return false;
        }
    };

    for entry in paths {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                error!(error = %e, pattern = %pattern, "Failed to read glob match");
                return false;
            }
        };
        if !path.is_file() {
            continue;
        }

        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let key = location.join_key(file_name);

        info!(path = %path.display(), bucket = %location.bucket, key = %key, "Uploading file");
        if let Err(e) = store.upload_file(&location.bucket, &key, &path).await {
            error!(error = %e, path = %path.display(), key = %key, "Upload failed");
            return false;
        }
    }

    true
}

/// Uploads every file under `root` to `{location.key}/{relative-path}`.
///
/// Per-file errors are logged and the walk continues; the caller is not
/// told about failures. (The glob variant reports; this one does not —
/// inherited behavior, kept as-is.)
pub async fn upload_directory(store: &dyn ObjectStore, location: &StorageLocation, root: &Path) {
    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                error!(error = %e, root = %root.display(), "Failed to walk directory entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let key = format!("{}/{}", location.key, relative.display());

        info!(path = %path.display(), bucket = %location.bucket, key = %key, "Uploading file");
        if let Err(e) = store.upload_file(&location.bucket, &key, path).await {
            error!(error = %e, path = %path.display(), key = %key, "Upload failed, continuing");
        }
    }
}
