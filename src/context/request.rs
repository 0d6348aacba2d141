//! Emulated request side of a transfer
//!
//! Owned by the caller; the engine only reads it.

use super::response::ResponseContext;
use crate::error::{Error, Result};
use crate::http::cache::{self, Validators};
use crate::http::negotiate;
use crate::http::range::{self, RangeParseResult};
use hyper::header::{HeaderName, HeaderValue, COOKIE};
use hyper::{HeaderMap, Method, Version};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// External abort trigger shared between a request and whoever drives it
#[derive(Debug, Clone, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    pub fn abort(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Request context: method, target, and case-insensitive headers
#[derive(Debug, Clone)]
pub struct RequestContext {
    method: Method,
    url: String,
    version: Version,
    headers: HeaderMap,
    remote_addr: String,
    abort: AbortSignal,
}

impl RequestContext {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            remote_addr: "127.0.0.1".to_string(),
            abort: AbortSignal::default(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn head(url: impl Into<String>) -> Self {
        Self::new(Method::HEAD, url)
    }

    /// Add a header line
    ///
    /// A repeated name is folded into the earlier value as one list, the way
    /// HTTP reads repeated list headers (`Cookie` joins with `; `).
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        let invalid = || Error::InvalidHeader {
            name: name.to_string(),
        };
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
        let folded = match cache::header_str(&self.headers, header_name.as_str()) {
            Some(earlier) => {
                let separator = if header_name == COOKIE { "; " } else { ", " };
                format!("{earlier}{separator}{value}")
            }
            None => value.to_string(),
        };
        let header_value = HeaderValue::from_str(&folded).map_err(|_| invalid())?;
        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    #[must_use]
    pub fn with_remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = addr.into();
        self
    }

    #[must_use]
    pub const fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub const fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Target without the query string
    pub fn path(&self) -> &str {
        self.url.split_once('?').map_or(self.url.as_str(), |(path, _)| path)
    }

    pub fn query(&self) -> Option<&str> {
        self.url.split_once('?').map(|(_, query)| query)
    }

    pub const fn version(&self) -> Version {
        self.version
    }

    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        cache::header_str(&self.headers, name)
    }

    pub fn remote_addr(&self) -> &str {
        &self.remote_addr
    }

    pub const fn abort_signal(&self) -> &AbortSignal {
        &self.abort
    }

    pub fn is_head(&self) -> bool {
        self.method == Method::HEAD
    }

    /// First media type (in the given order) the `Accept` header admits
    pub fn accepts<'a>(&self, candidates: &[&'a str]) -> Option<&'a str> {
        negotiate::negotiate_best(self.header("accept"), candidates)
    }

    pub fn accepts_encodings<'a>(&self, candidates: &[&'a str]) -> Option<&'a str> {
        negotiate::negotiate_encoding(self.header("accept-encoding"), candidates)
    }

    pub fn accepts_charsets<'a>(&self, candidates: &[&'a str]) -> Option<&'a str> {
        negotiate::negotiate_charset(self.header("accept-charset"), candidates)
    }

    pub fn accepts_languages<'a>(&self, candidates: &[&'a str]) -> Option<&'a str> {
        negotiate::negotiate_language(self.header("accept-language"), candidates)
    }

    /// Whether the client's cache is valid for the response as it stands
    pub fn is_fresh(&self, response: &ResponseContext) -> bool {
        if self.method != Method::GET && self.method != Method::HEAD {
            return false;
        }
        let status = response.status();
        if !((200..300).contains(&status) || status == 304) {
            return false;
        }
        let validators = Validators {
            etag: response.header("etag"),
            last_modified: response.header("last-modified"),
        };
        cache::is_fresh(&self.headers, &validators)
    }

    pub fn is_stale(&self, response: &ResponseContext) -> bool {
        !self.is_fresh(response)
    }

    /// Parse the `Range` header against a length, combining overlaps
    pub fn range(&self, length: u64) -> Option<RangeParseResult> {
        self.header("range")
            .map(|header| range::parse_range_header(length, header, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_and_query() {
        let req = RequestContext::get("/docs/a.txt?x=1&y=2");
        assert_eq!(req.path(), "/docs/a.txt");
        assert_eq!(req.query(), Some("x=1&y=2"));
        assert_eq!(RequestContext::get("/plain").query(), None);
    }

    #[test]
    fn test_headers_are_case_insensitive() {
        let req = RequestContext::get("/")
            .with_header("If-None-Match", "\"abc\"")
            .unwrap();
        assert_eq!(req.header("if-none-match"), Some("\"abc\""));
        assert_eq!(req.header("IF-NONE-MATCH"), Some("\"abc\""));
        assert!(RequestContext::get("/").with_header("bad header", "x").is_err());
    }

    #[test]
    fn test_repeated_headers_fold_into_one_list() {
        let req = RequestContext::get("/")
            .with_header("If-None-Match", "\"a\"")
            .unwrap()
            .with_header("if-none-match", "\"b\"")
            .unwrap()
            .with_header("cookie", "sid=1")
            .unwrap()
            .with_header("Cookie", "theme=dark")
            .unwrap();
        assert_eq!(req.header("if-none-match"), Some("\"a\", \"b\""));
        assert_eq!(req.header("cookie"), Some("sid=1; theme=dark"));
        assert_eq!(req.headers().get_all("if-none-match").iter().count(), 1);
    }

    #[test]
    fn test_accepts() {
        let req = RequestContext::get("/")
            .with_header("accept", "application/json, text/*;q=0.5")
            .unwrap()
            .with_header("accept-language", "en")
            .unwrap();
        assert_eq!(req.accepts(&["html", "json"]), Some("html"));
        assert_eq!(req.accepts(&["image/png"]), None);
        assert_eq!(req.accepts_languages(&["de", "en-GB"]), Some("en-GB"));
        assert_eq!(req.accepts_encodings(&["gzip"]), Some("gzip"));
    }

    #[test]
    fn test_freshness_requires_get_or_head() {
        let mut res = ResponseContext::new();
        res.set_header("etag", "\"abc\"").unwrap();

        let get = RequestContext::get("/").with_header("if-none-match", "\"abc\"").unwrap();
        assert!(get.is_fresh(&res));

        let post = RequestContext::new(Method::POST, "/")
            .with_header("if-none-match", "\"abc\"")
            .unwrap();
        assert!(post.is_stale(&res));

        res.set_status(500).unwrap();
        assert!(get.is_stale(&res));
    }

    #[test]
    fn test_range() {
        let req = RequestContext::get("/").with_header("range", "bytes=0-4,5-9").unwrap();
        let Some(RangeParseResult::Ranges(set)) = req.range(100) else {
            panic!("Expected ranges");
        };
        assert_eq!(set.ranges.len(), 1);
        assert!(RequestContext::get("/").range(100).is_none());
    }

    #[test]
    fn test_abort_signal_is_shared() {
        let req = RequestContext::get("/");
        let signal = req.abort_signal().clone();
        assert!(!req.abort_signal().is_aborted());
        signal.abort();
        assert!(req.abort_signal().is_aborted());
    }
}
