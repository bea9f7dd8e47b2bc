use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::{error, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Marker embedded in every temporary file name written by the engine.
pub(crate) const TMP_MARKER: &str = ".flashtmp.";

/// Temp files younger than this may still belong to a live writer.
const STALE_AFTER: Duration = Duration::from_secs(300);

/// The root is often an operator's working directory; never walk it deeply.
const MAX_DEPTH: usize = 2;

pub(crate) async fn purge_tmp(root: &Path) -> usize {
    let root = root.to_path_buf();
    let now = SystemTime::now();

    match tokio::task::spawn_blocking(move || remove_stale(&root, now, STALE_AFTER)).await {
        Ok((removed, failed)) => {
            if removed > 0 || failed > 0 {
                info!(removed, failed, "Cleaned up temporary files");
            }
            removed
        },
        Err(e) => {
            error!(error = %e, "Temp file cleanup task panicked");
            0
        },
    }
}

fn remove_stale(root: &Path, now: SystemTime, threshold: Duration) -> (usize, usize) {
    let mut removed = 0;
    let mut failed = 0;

    WalkDir::new(root)
        .max_depth(MAX_DEPTH)
        .into_iter()
        .flatten()
        .filter(|e| is_tmp(e) && is_stale(e, now, threshold))
        .for_each(|entry| match std::fs::remove_file(entry.path()) {
            Ok(()) => removed += 1,
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "Stale temp file removal failed");
                failed += 1;
            },
        });

    (removed, failed)
}

fn is_tmp(entry: &DirEntry) -> bool {
    entry.file_type().is_file()
        && entry.file_name().to_str().is_some_and(|name| name.contains(TMP_MARKER))
}

fn is_stale(entry: &DirEntry, now: SystemTime, threshold: Duration) -> bool {
    entry
        .metadata()
        .ok()
        .and_then(|m| m.modified().ok())
        .and_then(|modified| now.duration_since(modified).ok())
        .is_none_or(|age| age > threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_old_marked_files_are_removed() {
        let dir = tempfile::tempdir().unwrap();
        let tmp = dir.path().join(format!("auth.bin{TMP_MARKER}1.1"));
        let keep = dir.path().join("auth.bin");
        std::fs::write(&tmp, b"partial").unwrap();
        std::fs::write(&keep, b"final").unwrap();

        let (removed, _) = remove_stale(dir.path(), SystemTime::now(), STALE_AFTER);
        assert_eq!(removed, 0, "fresh temp files belong to a live writer");

        let later = SystemTime::now() + STALE_AFTER + Duration::from_secs(1);
        let (removed, failed) = remove_stale(dir.path(), later, STALE_AFTER);
        assert_eq!((removed, failed), (1, 0));
        assert!(!tmp.exists());
        assert!(keep.exists());
    }
}
