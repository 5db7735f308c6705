//! Durable event log file.
//!
//! The log is opened **append-only** and created if absent; it is never truncated,
//! so restarting the process keeps previously recorded events.

use std::io;
use std::path::Path;

use tokio::fs::{self, File, OpenOptions};

/// Opens (or creates) the event log at `path` for appending.
///
/// Missing parent directories are created. On Unix a new file gets mode `0644`.
pub async fn open_event_log(path: impl AsRef<Path>) -> io::Result<File> {
    let path = path.as_ref();
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).await?;
    }

    let mut opts = OpenOptions::new();
    opts.append(true).create(true);
    #[cfg(unix)]
    opts.mode(0o644);
    opts.open(path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn appends_instead_of_truncating() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("events.txt");

        let mut f = open_event_log(&path).await.unwrap();
        f.write_all(b"first\n").await.unwrap();
        f.shutdown().await.unwrap();
        drop(f);

        let mut f = open_event_log(&path).await.unwrap();
        f.write_all(b"second\n").await.unwrap();
        f.shutdown().await.unwrap();
        drop(f);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "first\nsecond\n");
    }
}
