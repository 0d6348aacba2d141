//! Filesystem-backed resource store

use super::store::{BodyStream, ResourceDescriptor, ResourceStore};
use chrono::{DateTime, Utc};
use hyper::body::Bytes;
use std::io::{self, SeekFrom};
use std::ops::Range;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncSeekExt};

const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Resolves paths against the local filesystem
#[derive(Debug, Clone)]
pub struct FsStore {
    chunk_size: usize,
}

impl Default for FsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FsStore {
    pub const fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}

impl ResourceStore for FsStore {
    type Stream = FileStream;

    async fn stat(&self, path: &str) -> io::Result<ResourceDescriptor> {
        let meta = fs::metadata(path).await?;
        let mtime = meta
            .modified()
            .map_or(DateTime::UNIX_EPOCH, DateTime::<Utc>::from);
        Ok(ResourceDescriptor {
            path: path.to_string(),
            length: meta.len(),
            mtime,
            is_directory: meta.is_dir(),
        })
    }

    async fn open(
        &self,
        resource: &ResourceDescriptor,
        window: Range<u64>,
    ) -> io::Result<FileStream> {
        let mut file = File::open(&resource.path).await?;
        file.seek(SeekFrom::Start(window.start)).await?;
        Ok(FileStream {
            file: Some(file),
            remaining: window.end.saturating_sub(window.start),
            chunk_size: self.chunk_size,
        })
    }
}

/// Reads a byte window of an open file
#[derive(Debug)]
pub struct FileStream {
    file: Option<File>,
    remaining: u64,
    chunk_size: usize,
}

impl BodyStream for FileStream {
    async fn next_chunk(&mut self) -> Option<io::Result<Bytes>> {
        if self.remaining == 0 {
            return None;
        }
        let file = self.file.as_mut()?;

        let want = usize::try_from(self.remaining).map_or(self.chunk_size, |r| r.min(self.chunk_size));
        let mut buf = vec![0u8; want];
        match file.read(&mut buf).await {
            // File shrank underneath us
            Ok(0) => Some(Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "file ended before the requested range",
            ))),
            Ok(n) => {
                buf.truncate(n);
                self.remaining -= n as u64;
                Some(Ok(Bytes::from(buf)))
            }
            Err(err) => Some(Err(err)),
        }
    }

    fn close(&mut self) {
        self.file = None;
    }
}
