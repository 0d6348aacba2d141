//! Resource lookup and body streaming seams
//!
//! A `ResourceStore` answers stat-like lookups and opens windowed body streams.
//! These are the only suspension points of a transfer.

use chrono::{DateTime, Utc};
use hyper::body::Bytes;
use std::future::Future;
use std::io;
use std::ops::Range;

/// Logical file-like entity being transferred
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    pub path: String,
    pub length: u64,
    pub mtime: DateTime<Utc>,
    pub is_directory: bool,
}

/// Chunked body of one resource window
pub trait BodyStream: Send {
    /// Next chunk; `None` once the window is exhausted
    fn next_chunk(&mut self) -> impl Future<Output = Option<io::Result<Bytes>>> + Send;

    /// Release the underlying handle
    fn close(&mut self);
}

/// Stat and open resources by path
pub trait ResourceStore: Send + Sync {
    type Stream: BodyStream;

    fn stat(&self, path: &str) -> impl Future<Output = io::Result<ResourceDescriptor>> + Send;

    /// Open a stream over the half-open byte `window` of `resource`
    fn open(
        &self,
        resource: &ResourceDescriptor,
        window: Range<u64>,
    ) -> impl Future<Output = io::Result<Self::Stream>> + Send;
}
