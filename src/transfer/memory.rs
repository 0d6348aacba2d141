//! In-memory resource store
//!
//! Holds files and directories in a map, serves them in fixed-size chunks and
//! can inject stat or mid-stream failures. Every `close` call on a stream is
//! counted so cleanup guarantees can be asserted.

use super::store::{BodyStream, ResourceDescriptor, ResourceStore};
use chrono::{DateTime, Utc};
use hyper::body::Bytes;
use std::collections::HashMap;
use std::io;
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone)]
enum Entry {
    File {
        content: Bytes,
        mtime: DateTime<Utc>,
        fail_after: Option<usize>,
    },
    Directory {
        mtime: DateTime<Utc>,
    },
    Broken(io::ErrorKind),
}

/// Map-backed store with implicit parent directories
#[derive(Debug, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, Entry>,
    chunk_size: usize,
    close_calls: Arc<AtomicUsize>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// `/a/b/` and `a/b` both become `/a/b`
fn normalize_key(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    format!("/{trimmed}")
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            close_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn insert_file(
        &mut self,
        path: &str,
        content: impl Into<Bytes>,
        mtime: DateTime<Utc>,
    ) -> &mut Self {
        self.entries.insert(
            normalize_key(path),
            Entry::File {
                content: content.into(),
                mtime,
                fail_after: None,
            },
        );
        self
    }

    pub fn insert_dir(&mut self, path: &str, mtime: DateTime<Utc>) -> &mut Self {
        self.entries
            .insert(normalize_key(path), Entry::Directory { mtime });
        self
    }

    /// Make every stat of `path` fail with `kind`
    pub fn fail_stat(&mut self, path: &str, kind: io::ErrorKind) -> &mut Self {
        self.entries.insert(normalize_key(path), Entry::Broken(kind));
        self
    }

    /// Make streams of an existing file fail after `chunks` chunks
    pub fn fail_stream_after(&mut self, path: &str, chunks: usize) -> &mut Self {
        if let Some(Entry::File { fail_after, .. }) = self.entries.get_mut(&normalize_key(path)) {
            *fail_after = Some(chunks);
        }
        self
    }

    /// Total `close` calls across all streams opened by this store
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    fn is_implicit_dir(&self, key: &str) -> bool {
        if key == "/" {
            return true;
        }
        let prefix = format!("{key}/");
        self.entries.keys().any(|k| k.starts_with(&prefix))
    }
}

impl ResourceStore for MemoryStore {
    type Stream = MemoryStream;

    async fn stat(&self, path: &str) -> io::Result<ResourceDescriptor> {
        let key = normalize_key(path);
        match self.entries.get(&key) {
            Some(Entry::File { content, mtime, .. }) => Ok(ResourceDescriptor {
                path: path.to_string(),
                length: content.len() as u64,
                mtime: *mtime,
                is_directory: false,
            }),
            Some(Entry::Directory { mtime }) => Ok(ResourceDescriptor {
                path: path.to_string(),
                length: 0,
                mtime: *mtime,
                is_directory: true,
            }),
            Some(Entry::Broken(kind)) => Err(io::Error::new(*kind, "injected stat failure")),
            None if self.is_implicit_dir(&key) => Ok(ResourceDescriptor {
                path: path.to_string(),
                length: 0,
                mtime: DateTime::UNIX_EPOCH,
                is_directory: true,
            }),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {path}"),
            )),
        }
    }

    async fn open(
        &self,
        resource: &ResourceDescriptor,
        window: Range<u64>,
    ) -> io::Result<MemoryStream> {
        let Some(Entry::File {
            content,
            fail_after,
            ..
        }) = self.entries.get(&normalize_key(&resource.path))
        else {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("not a file: {}", resource.path),
            ));
        };

        let len = content.len();
        let start = usize::try_from(window.start).unwrap_or(len).min(len);
        let end = usize::try_from(window.end).unwrap_or(len).clamp(start, len);

        Ok(MemoryStream {
            remaining: content.slice(start..end),
            chunk_size: self.chunk_size,
            fail_after: *fail_after,
            emitted: 0,
            close_calls: Arc::clone(&self.close_calls),
        })
    }
}

/// Chunked view over a window of an in-memory file
#[derive(Debug)]
pub struct MemoryStream {
    remaining: Bytes,
    chunk_size: usize,
    fail_after: Option<usize>,
    emitted: usize,
    close_calls: Arc<AtomicUsize>,
}

impl BodyStream for MemoryStream {
    async fn next_chunk(&mut self) -> Option<io::Result<Bytes>> {
        tokio::task::yield_now().await;

        if self.fail_after.is_some_and(|limit| self.emitted >= limit) {
            return Some(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "injected stream failure",
            )));
        }
        if self.remaining.is_empty() {
            return None;
        }

        let n = self.chunk_size.min(self.remaining.len());
        self.emitted += 1;
        Some(Ok(self.remaining.split_to(n)))
    }

    fn close(&mut self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new().with_chunk_size(4);
        store
            .insert_file("/docs/a.txt", "0123456789", DateTime::UNIX_EPOCH)
            .insert_dir("/empty", DateTime::UNIX_EPOCH)
            .fail_stat("/locked", io::ErrorKind::PermissionDenied);
        store
    }

    #[tokio::test]
    async fn test_stat_entries() {
        let store = store();
        let file = store.stat("/docs/a.txt").await.unwrap();
        assert_eq!(file.length, 10);
        assert!(!file.is_directory);

        assert!(store.stat("/empty/").await.unwrap().is_directory);
        assert!(store.stat("/docs").await.unwrap().is_directory);
        assert!(store.stat("/").await.unwrap().is_directory);

        let missing = store.stat("/nope").await.unwrap_err();
        assert_eq!(missing.kind(), io::ErrorKind::NotFound);
        let locked = store.stat("/locked").await.unwrap_err();
        assert_eq!(locked.kind(), io::ErrorKind::PermissionDenied);
    }

    #[tokio::test]
    async fn test_windowed_chunks() {
        let store = store();
        let file = store.stat("/docs/a.txt").await.unwrap();
        let mut stream = store.open(&file, 2..9).await.unwrap();

        let mut chunks = Vec::new();
        while let Some(chunk) = stream.next_chunk().await {
            chunks.push(chunk.unwrap());
        }
        assert_eq!(chunks, vec![Bytes::from("2345"), Bytes::from("678")]);

        stream.close();
        stream.close();
        assert_eq!(store.close_calls(), 2);
    }

    #[tokio::test]
    async fn test_injected_stream_failure() {
        let mut store = store();
        store.fail_stream_after("/docs/a.txt", 1);
        let file = store.stat("/docs/a.txt").await.unwrap();
        let mut stream = store.open(&file, 0..10).await.unwrap();

        assert!(stream.next_chunk().await.unwrap().is_ok());
        assert!(stream.next_chunk().await.unwrap().is_err());
    }
}
