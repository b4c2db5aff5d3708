//! The default, OS-backed [`ObjectStore`], following `unftp-sbe-fs`'s
//! `Filesystem` backend (`crates/unftp-sbe-fs/src/lib.rs`) — minus its
//! `cap_std`-based directory-descriptor sandboxing, which exists there to
//! defend against a storage backend being handed paths outside a user's
//! root. In this crate the Path Resolver (`crate::auth::User::resolve`)
//! already strips `../` before a path ever reaches here, so the `ObjectStore`
//! layer trusts its input the way `unftp-sbe-fs`'s `cap_fs` helpers trust
//! their already-opened directory handle.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncRead, AsyncSeekExt, AsyncWrite};

use super::{DirEntry, Metadata, ObjectStore, ObjectStoreError, Result, WriteMode};

/// Serves files from a directory on the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct StdFilesystem;

impl StdFilesystem {
    pub fn new() -> Self {
        StdFilesystem
    }
}

fn to_metadata(meta: std::fs::Metadata) -> Metadata {
    Metadata {
        len: meta.len(),
        is_dir: meta.is_dir(),
        is_file: meta.is_file(),
        modified: meta.modified().unwrap_or(std::time::SystemTime::UNIX_EPOCH),
        mode: meta.permissions().mode() & 0o777,
    }
}

#[async_trait]
impl ObjectStore for StdFilesystem {
    #[tracing_attributes::instrument]
    async fn stat(&self, path: &Path) -> Result<Metadata> {
        let meta = tokio::fs::metadata(path).await?;
        Ok(to_metadata(meta))
    }

    async fn open_read(&self, path: &Path, start: u64) -> Result<Box<dyn AsyncRead + Send + Unpin>> {
        let mut file = tokio::fs::File::open(path).await?;
        if start > 0 {
            file.seek(std::io::SeekFrom::Start(start)).await?;
        }
        Ok(Box::new(tokio::io::BufReader::with_capacity(0x1000, file)))
    }

    async fn open_write(&self, path: &Path, mode: WriteMode) -> Result<Box<dyn AsyncWrite + Send + Unpin>> {
        let file = match mode {
            WriteMode::Create => OpenOptions::new().write(true).create(true).truncate(true).open(path).await?,
            WriteMode::Append => OpenOptions::new().append(true).create(true).open(path).await?,
            WriteMode::Resume(offset) => {
                let mut file = OpenOptions::new().write(true).read(true).create(true).open(path).await?;
                file.seek(std::io::SeekFrom::Start(offset)).await?;
                file
            }
        };
        Ok(Box::new(tokio::io::BufWriter::with_capacity(0x1000, file)))
    }

    #[tracing_attributes::instrument]
    async fn list_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let mut read_dir = tokio::fs::read_dir(path).await?;
        let mut entries = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            // Entries that fail `stat` are skipped silently (spec.md §4.6).
            let Ok(meta) = entry.metadata().await else { continue };
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                metadata: to_metadata(meta),
            });
        }
        Ok(entries)
    }

    #[tracing_attributes::instrument]
    async fn mkdir(&self, path: &Path) -> Result<()> {
        tokio::fs::create_dir(path).await.map_err(ObjectStoreError::from)
    }

    #[tracing_attributes::instrument]
    async fn remove_file(&self, path: &Path) -> Result<()> {
        tokio::fs::remove_file(path).await.map_err(ObjectStoreError::from)
    }

    #[tracing_attributes::instrument]
    async fn remove_dir_all(&self, path: &Path) -> Result<()> {
        remove_dir_recursive(path.to_path_buf()).await
    }

    #[tracing_attributes::instrument]
    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        tokio::fs::rename(from, to).await.map_err(ObjectStoreError::from)
    }
}

/// Recursively tears down a directory tree, files before directories,
/// mirroring `ftpd.py`'s `remove_dir` (`os.walk(top, topdown=False)`).
fn remove_dir_recursive(top: PathBuf) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + Send>> {
    Box::pin(async move {
        let mut read_dir = tokio::fs::read_dir(&top).await?;
        while let Some(entry) = read_dir.next_entry().await? {
            let entry_path = entry.path();
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                remove_dir_recursive(entry_path).await?;
            } else {
                tokio::fs::remove_file(entry_path).await?;
            }
        }
        tokio::fs::remove_dir(&top).await?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stat_missing_file_is_not_found() {
        let fs = StdFilesystem::new();
        let err = fs.stat(Path::new("/nonexistent/path/for/miniftpd/tests")).await.unwrap_err();
        assert_eq!(err.kind(), super::super::ObjectStoreErrorKind::NotFound);
    }

    #[tokio::test]
    async fn write_then_read_roundtrips() {
        let dir = std::env::temp_dir().join(format!("miniftpd-fs-test-{:?}", std::thread::current().id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("roundtrip.bin");
        let fs = StdFilesystem::new();

        {
            use tokio::io::AsyncWriteExt;
            let mut w = fs.open_write(&path, WriteMode::Create).await.unwrap();
            w.write_all(b"hello world").await.unwrap();
            w.flush().await.unwrap();
        }

        let meta = fs.stat(&path).await.unwrap();
        assert_eq!(meta.len, 11);

        {
            use tokio::io::AsyncReadExt;
            let mut r = fs.open_read(&path, 6).await.unwrap();
            let mut buf = String::new();
            r.read_to_string(&mut buf).await.unwrap();
            assert_eq!(buf, "world");
        }

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn remove_dir_all_tears_down_nested_tree() {
        let dir = std::env::temp_dir().join(format!("miniftpd-fs-test-rmdir-{:?}", std::thread::current().id()));
        tokio::fs::create_dir_all(dir.join("sub")).await.unwrap();
        tokio::fs::write(dir.join("a.txt"), b"a").await.unwrap();
        tokio::fs::write(dir.join("sub/b.txt"), b"b").await.unwrap();

        let fs = StdFilesystem::new();
        fs.remove_dir_all(&dir).await.unwrap();
        assert!(!dir.exists());
    }
}
