//! File transfer pipeline
//!
//! Drives one conditional, range-aware transfer of a resource from a
//! `ResourceStore` into a `ResponseContext`:
//!
//! ```text
//! START -> CONDITIONAL_CHECK -> NOT_MODIFIED -> END
//!                            -> PRECONDITION_FAILED -> ERROR
//!                            -> RANGE_SELECT -> FULL | PARTIAL -> STREAMING -> END
//! ```
//!
//! Any non-terminal state may move to `ERROR`. Exactly one of `end`/`error`
//! is reported per transfer, and the body stream is closed exactly once
//! before that happens, including when the transfer future is dropped.

mod events;
mod fs;
mod memory;
pub mod path;
mod state;
mod store;


pub use events::{EventLog, TransferEvent, TransferObserver};
pub use fs::{FileStream, FsStore};
pub use memory::{MemoryStore, MemoryStream};
pub use state::TransferState;
pub use store::{BodyStream, ResourceDescriptor, ResourceStore};

use crate::config::{Dotfiles, SendOptions};
use crate::context::{RequestContext, ResponseContext};
use crate::error::{Error, Result, TransferError};
use crate::http::cache::{self, CachePolicy, Validators};
use crate::http::date::format_http_date;
use crate::http::range::{self, ByteRange, RangeParseResult};
use crate::http::{compute_for_stat, mime, response};
use crate::logger::{self, TransferLogEntry};
use std::io;
use std::ops::Range;
use std::time::Instant;

/// What a finished transfer reports to its caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    /// Terminal state, `End` or `Error`
    pub state: TransferState,
    pub status: u16,
    pub error: Option<TransferError>,
    /// Body bytes written to the response
    pub bytes_sent: u64,
    /// Every state visited, starting with `Start`
    pub trace: Vec<TransferState>,
}

impl TransferOutcome {
    pub fn is_success(&self) -> bool {
        self.state == TransferState::End
    }
}

/// Serves resources of a store under one set of `SendOptions`
///
/// Holds no per-transfer state, so one pipeline can run any number of
/// transfers concurrently.
#[derive(Debug, Clone)]
pub struct TransferPipeline<S> {
    store: S,
    options: SendOptions,
    max_age_ms: u64,
    access_log: Option<String>,
}

impl<S: ResourceStore> TransferPipeline<S> {
    /// Fails with `InvalidDuration` when `max_age` is not a valid duration
    pub fn new(store: S, options: SendOptions) -> Result<Self> {
        let max_age_ms = options.max_age.to_millis()?;
        Ok(Self {
            store,
            options,
            max_age_ms,
            access_log: None,
        })
    }

    /// Log one access line per transfer in `format`
    #[must_use]
    pub fn with_access_log(mut self, format: impl Into<String>) -> Self {
        self.access_log = Some(format.into());
        self
    }

    pub const fn options(&self) -> &SendOptions {
        &self.options
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Run one transfer to completion
    ///
    /// Failures are written to `res` as error documents (or, once headers are
    /// out, by destroying the response) and reported in the outcome.
    pub async fn transfer(
        &self,
        req: &RequestContext,
        res: &mut ResponseContext,
        observer: &mut dyn TransferObserver,
    ) -> TransferOutcome {
        let started = Instant::now();
        let outcome = {
            let mut transfer = Transfer::new(res, observer);
            let result = self.run(req, &mut transfer).await;
            if let Err(err) = &result {
                transfer.write_failure(err, req.is_head());
            }
            transfer.finish(result);
            transfer.outcome()
        };

        if let Some(format) = &self.access_log {
            logger::log_access(&access_entry(req, &outcome, started), format);
        }
        outcome
    }

    async fn run(
        &self,
        req: &RequestContext,
        t: &mut Transfer<'_, S::Stream>,
    ) -> std::result::Result<(), TransferError> {
        let decoded = path::decode_path(req.path())?;
        t.path.clone_from(&decoded);
        t.emit(TransferEvent::Headers {
            path: decoded.clone(),
        });

        if path::is_traversal(&decoded) {
            logger::log_warning(&format!("Rejected traversal in {decoded}"));
            return Err(TransferError::Traversal);
        }

        let relative = path::normalize(&decoded);
        if path::contains_dotfile(&relative) {
            match self.options.dotfiles {
                Dotfiles::Allow => {}
                Dotfiles::Deny => return Err(TransferError::DotfileDenied),
                Dotfiles::Ignore => return Err(TransferError::NotFound),
            }
        }

        let full = match &self.options.root {
            Some(root) => path::join(root, &relative),
            None => relative,
        };

        if !self.options.index.is_empty() && path::has_trailing_slash(&full) {
            return self.send_index(req, t, &full).await;
        }
        self.send_file(req, t, &full).await
    }

    async fn send_index(
        &self,
        req: &RequestContext,
        t: &mut Transfer<'_, S::Stream>,
        dir: &str,
    ) -> std::result::Result<(), TransferError> {
        for index in &self.options.index {
            let candidate = format!("{dir}{index}");
            match self.store.stat(&candidate).await {
                Ok(resource) if !resource.is_directory => {
                    return self.send(req, t, resource).await;
                }
                Ok(_) => {}
                Err(err) => tracing::debug!(path = %candidate, %err, "index candidate missed"),
            }
        }
        Err(TransferError::NotFound)
    }

    async fn send_file(
        &self,
        req: &RequestContext,
        t: &mut Transfer<'_, S::Stream>,
        file: &str,
    ) -> std::result::Result<(), TransferError> {
        match self.store.stat(file).await {
            Ok(resource) if resource.is_directory => self.redirect(req, t, file),
            Ok(_) if path::has_trailing_slash(file) => Err(TransferError::NotFound),
            Ok(resource) => self.send(req, t, resource).await,
            Err(err) if self.may_try_extensions(file, &err) => {
                for ext in &self.options.extensions {
                    let candidate = format!("{file}.{}", ext.trim_start_matches('.'));
                    match self.store.stat(&candidate).await {
                        Ok(resource) if !resource.is_directory => {
                            return self.send(req, t, resource).await;
                        }
                        Ok(_) => {}
                        Err(err) => {
                            tracing::debug!(path = %candidate, %err, "extension candidate missed");
                        }
                    }
                }
                Err(TransferError::from_stat(&err))
            }
            Err(err) => Err(TransferError::from_stat(&err)),
        }
    }

    fn may_try_extensions(&self, file: &str, err: &io::Error) -> bool {
        !self.options.extensions.is_empty()
            && err.kind() == io::ErrorKind::NotFound
            && !path::has_extension(file)
            && !path::has_trailing_slash(file)
    }

    fn redirect(
        &self,
        req: &RequestContext,
        t: &mut Transfer<'_, S::Stream>,
        dir: &str,
    ) -> std::result::Result<(), TransferError> {
        t.emit(TransferEvent::Directory {
            path: dir.to_string(),
        });
        if path::has_trailing_slash(req.path()) {
            return Err(TransferError::DirectoryForbidden);
        }

        let location = path::redirect_location(req.path(), req.query());
        response::write_directory_redirect(t.response, &location, req.is_head())
            .map_err(response_failure)?;
        Ok(())
    }

    /// Conditional check, range selection and streaming of a resolved file
    async fn send(
        &self,
        req: &RequestContext,
        t: &mut Transfer<'_, S::Stream>,
        resource: ResourceDescriptor,
    ) -> std::result::Result<(), TransferError> {
        t.emit(TransferEvent::File {
            path: resource.path.clone(),
            resource: resource.clone(),
        });
        if t.response.headers_sent() {
            return Err(TransferError::HeadersSent);
        }

        t.advance(TransferState::ConditionalCheck);
        self.set_entity_headers(t.response, &resource)
            .map_err(response_failure)?;

        if cache::is_conditional(req.headers()) {
            let validators = validators(t.response);
            if cache::is_precondition_failed(req.headers(), &validators) {
                t.advance(TransferState::PreconditionFailed);
                return Err(TransferError::PreconditionFailed);
            }
            if is_cacheable(t.response.status()) && cache::is_fresh(req.headers(), &validators) {
                t.advance(TransferState::NotModified);
                response::write_not_modified(t.response).map_err(response_failure)?;
                return Ok(());
            }
        }

        t.advance(TransferState::RangeSelect);
        let length = resource.length;
        let window = match self.select_range(req, t.response, length)? {
            Some(range) => {
                t.advance(TransferState::Partial);
                t.response.set_status(206).map_err(response_failure)?;
                t.response
                    .set_header("content-range", &range.content_range(length))
                    .map_err(response_failure)?;
                range.window()
            }
            None => {
                t.advance(TransferState::Full);
                0..length
            }
        };
        t.response
            .set_header("content-length", &(window.end - window.start).to_string())
            .map_err(response_failure)?;

        if req.is_head() {
            t.response.end();
            return Ok(());
        }

        self.stream(req, t, &resource, window).await
    }

    /// The single range to serve, if any
    ///
    /// Ranges that combine into more than one span fall back to the full body.
    fn select_range(
        &self,
        req: &RequestContext,
        res: &ResponseContext,
        length: u64,
    ) -> std::result::Result<Option<ByteRange>, TransferError> {
        if !self.options.accept_ranges {
            return Ok(None);
        }
        let Some(header) = req.header("range").filter(|h| range::is_bytes_range(h)) else {
            return Ok(None);
        };
        if !cache::is_range_fresh(req.headers(), &validators(res)) {
            return Ok(None);
        }

        match range::parse_range_header(length, header, true) {
            RangeParseResult::Unsatisfiable => Err(TransferError::UnsatisfiableRange { length }),
            RangeParseResult::Ranges(set) if set.ranges.len() == 1 => Ok(set.ranges.first().copied()),
            RangeParseResult::Ranges(_) | RangeParseResult::NotARange => Ok(None),
        }
    }

    async fn stream(
        &self,
        req: &RequestContext,
        t: &mut Transfer<'_, S::Stream>,
        resource: &ResourceDescriptor,
        window: Range<u64>,
    ) -> std::result::Result<(), TransferError> {
        t.advance(TransferState::Streaming);
        let stream = self
            .store
            .open(resource, window.clone())
            .await
            .map_err(|e| TransferError::from_stream(&e))?;
        t.stream = Some(stream);
        t.emit(TransferEvent::Stream {
            path: resource.path.clone(),
            window,
        });

        loop {
            if req.abort_signal().is_aborted() || !t.response.is_writable() {
                return Err(TransferError::Aborted);
            }
            let next = match t.stream.as_mut() {
                Some(stream) => stream.next_chunk().await,
                None => return Err(TransferError::Aborted),
            };
            match next {
                Some(Ok(chunk)) => {
                    t.response.write(&chunk).map_err(response_failure)?;
                    t.bytes_sent += chunk.len() as u64;
                }
                Some(Err(err)) => return Err(TransferError::from_stream(&err)),
                None => break,
            }
        }

        t.response.end();
        Ok(())
    }

    /// Entity headers, leaving any value the caller already set
    fn set_entity_headers(&self, res: &mut ResponseContext, resource: &ResourceDescriptor) -> Result<()> {
        if self.options.accept_ranges && !res.has_header("accept-ranges") {
            res.set_header("accept-ranges", "bytes")?;
        }
        if self.options.cache_control && !res.has_header("cache-control") {
            let policy = CachePolicy {
                max_age_ms: self.max_age_ms,
                immutable: self.options.immutable,
            };
            res.set_header("cache-control", &policy.to_header_value())?;
        }
        if self.options.last_modified && !res.has_header("last-modified") {
            res.set_header("last-modified", &format_http_date(resource.mtime))?;
        }
        if self.options.etag && !res.has_header("etag") {
            res.set_header("etag", &compute_for_stat(resource).to_string())?;
        }
        if !res.has_header("content-type") {
            res.set_header("content-type", &mime::content_type_for_path(&resource.path))?;
        }
        Ok(())
    }
}

fn validators(res: &ResponseContext) -> Validators<'_> {
    Validators {
        etag: res.header("etag"),
        last_modified: res.header("last-modified"),
    }
}

fn is_cacheable(status: u16) -> bool {
    (200..300).contains(&status) || status == 304
}

fn response_failure(err: Error) -> TransferError {
    match err {
        Error::HeadersSent => TransferError::HeadersSent,
        other => TransferError::StreamFailure {
            message: other.to_string(),
        },
    }
}

fn access_entry(req: &RequestContext, outcome: &TransferOutcome, started: Instant) -> TransferLogEntry {
    let mut entry = TransferLogEntry::new(
        req.remote_addr().to_string(),
        req.method().to_string(),
        req.path().to_string(),
    );
    entry.query = req.query().map(str::to_string);
    let version = req.version();
    entry.http_version = if version == hyper::Version::HTTP_10 {
        "1.0"
    } else if version == hyper::Version::HTTP_2 {
        "2"
    } else {
        "1.1"
    }
    .to_string();
    entry.status = outcome.status;
    entry.body_bytes = outcome.bytes_sent;
    entry.referer = req.header("referer").map(str::to_string);
    entry.user_agent = req.header("user-agent").map(str::to_string);
    entry.outcome = outcome.state.name().to_string();
    entry.error = outcome.error.as_ref().map(ToString::to_string);
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
    entry
}

/// Per-transfer state; finishing is idempotent and also runs on drop
struct Transfer<'a, B: BodyStream> {
    state: TransferState,
    trace: Vec<TransferState>,
    response: &'a mut ResponseContext,
    observer: &'a mut dyn TransferObserver,
    stream: Option<B>,
    error: Option<TransferError>,
    bytes_sent: u64,
    path: String,
}

impl<'a, B: BodyStream> Transfer<'a, B> {
    fn new(response: &'a mut ResponseContext, observer: &'a mut dyn TransferObserver) -> Self {
        Self {
            state: TransferState::Start,
            trace: vec![TransferState::Start],
            response,
            observer,
            stream: None,
            error: None,
            bytes_sent: 0,
            path: String::new(),
        }
    }

    fn advance(&mut self, next: TransferState) {
        if !self.state.can_advance_to(next) {
            logger::log_warning(&format!(
                "Unexpected transfer transition {} -> {next} for {}",
                self.state, self.path
            ));
        }
        logger::log_transition(&self.path, self.state, next);
        self.state = next;
        self.trace.push(next);
    }

    fn emit(&mut self, event: TransferEvent) {
        self.observer.on_event(&event, self.response);
    }

    /// Report failure on the response itself
    fn write_failure(&mut self, err: &TransferError, is_head: bool) {
        match err {
            // Nobody left to write to
            TransferError::Aborted => {}
            _ if self.response.headers_sent() => {
                logger::log_error(&format!("Transfer of {} failed mid-response: {err}", self.path));
                self.response.destroy();
            }
            _ => {
                if let Err(write_err) = response::write_error_response(self.response, err, is_head) {
                    logger::log_error(&format!("Failed to write error response: {write_err}"));
                    self.response.destroy();
                }
            }
        }
    }

    /// Close the stream and report the terminal event, once
    fn finish(&mut self, result: std::result::Result<(), TransferError>) {
        if self.state.is_terminal() {
            return;
        }
        if let Some(mut stream) = self.stream.take() {
            stream.close();
        }

        let event = match result {
            Ok(()) => {
                self.advance(TransferState::End);
                TransferEvent::End
            }
            Err(err) => {
                self.advance(TransferState::Error);
                self.error = Some(err.clone());
                TransferEvent::Error(err)
            }
        };
        self.emit(event);
    }

    fn outcome(&self) -> TransferOutcome {
        TransferOutcome {
            state: self.state,
            status: self.response.status(),
            error: self.error.clone(),
            bytes_sent: self.bytes_sent,
            trace: self.trace.clone(),
        }
    }
}

impl<B: BodyStream> Drop for Transfer<'_, B> {
    fn drop(&mut self) {
        self.finish(Err(TransferError::Aborted));
    }
}
