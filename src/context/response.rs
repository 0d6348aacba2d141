//! Emulated response side of a transfer
//!
//! Records status, headers, body bytes and cookies in memory so tests can
//! assert on exactly what a real server would have put on the wire.

use crate::error::{Error, Result};
use crate::http::cookie::{self, CookieOptions, ParsedCookie};
use crate::http::status;
use chrono::DateTime;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderName, HeaderValue, SET_COOKIE};
use hyper::{HeaderMap, Response, StatusCode};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// A cookie as set on the response, mirrored for introspection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieRecord {
    pub value: String,
    pub options: CookieOptions,
}

/// Response context exclusively owned by one transfer
#[derive(Debug, Clone)]
pub struct ResponseContext {
    status: u16,
    headers: HeaderMap,
    body: Vec<u8>,
    headers_sent: bool,
    ended: bool,
    writable: bool,
    cookies: BTreeMap<String, CookieRecord>,
    cleared_cookies: BTreeMap<String, CookieOptions>,
}

impl Default for ResponseContext {
    fn default() -> Self {
        Self::new()
    }
}

fn header_name(name: &str) -> Result<HeaderName> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|_| Error::InvalidHeader {
        name: name.to_string(),
    })
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|_| Error::InvalidHeader {
        name: name.to_string(),
    })
}

impl ResponseContext {
    pub fn new() -> Self {
        Self {
            status: 200,
            headers: HeaderMap::new(),
            body: Vec::new(),
            headers_sent: false,
            ended: false,
            writable: true,
            cookies: BTreeMap::new(),
            cleared_cookies: BTreeMap::new(),
        }
    }

    fn ensure_headers_unsent(&self) -> Result<()> {
        if self.headers_sent {
            return Err(Error::HeadersSent);
        }
        Ok(())
    }

    pub const fn status(&self) -> u16 {
        self.status
    }

    pub fn status_message(&self) -> Result<&'static str> {
        status::message_for(self.status)
    }

    /// Set the status, which must be a registered code
    pub fn set_status(&mut self, code: u16) -> Result<&mut Self> {
        self.ensure_headers_unsent()?;
        status::message_for(code)?;
        self.status = code;
        Ok(self)
    }

    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of a header
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// All values of a header, in insertion order
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains_key(name)
    }

    /// Replace every value of a header
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        self.ensure_headers_unsent()?;
        let value = header_value(name, value)?;
        self.headers.insert(header_name(name)?, value);
        Ok(())
    }

    /// Add a header value alongside existing ones
    pub fn append_header(&mut self, name: &str, value: &str) -> Result<()> {
        self.ensure_headers_unsent()?;
        let value = header_value(name, value)?;
        self.headers.append(header_name(name)?, value);
        Ok(())
    }

    pub fn remove_header(&mut self, name: &str) -> Result<()> {
        self.ensure_headers_unsent()?;
        self.headers.remove(name);
        Ok(())
    }

    pub fn clear_headers(&mut self) -> Result<()> {
        self.ensure_headers_unsent()?;
        self.headers.clear();
        Ok(())
    }

    /// Append body bytes; the first write commits the headers
    pub fn write(&mut self, chunk: &[u8]) -> Result<()> {
        if self.ended {
            return Err(Error::HeadersSent);
        }
        self.headers_sent = true;
        self.body.extend_from_slice(chunk);
        Ok(())
    }

    /// Finish the response; repeated calls are no-ops
    pub fn end(&mut self) {
        self.headers_sent = true;
        self.ended = true;
    }

    pub fn end_with(&mut self, chunk: &[u8]) -> Result<()> {
        self.write(chunk)?;
        self.end();
        Ok(())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub const fn headers_sent(&self) -> bool {
        self.headers_sent
    }

    pub const fn is_ended(&self) -> bool {
        self.ended
    }

    pub const fn is_writable(&self) -> bool {
        self.writable && !self.ended
    }

    /// Simulate the client socket closing
    pub fn destroy(&mut self) {
        self.writable = false;
    }

    /// Serialize a cookie into an additional `Set-Cookie` header
    pub fn set_cookie(&mut self, name: &str, value: &str, options: &CookieOptions) -> Result<()> {
        let serialized = cookie::serialize(name, value, options)?;
        self.append_header(SET_COOKIE.as_str(), &serialized)?;
        self.cleared_cookies.remove(name);
        self.cookies.insert(
            name.to_string(),
            CookieRecord {
                value: value.to_string(),
                options: options.clone(),
            },
        );
        Ok(())
    }

    /// Expire a cookie on the client
    pub fn clear_cookie(&mut self, name: &str, options: &CookieOptions) -> Result<()> {
        let expired = CookieOptions {
            expires: Some(DateTime::UNIX_EPOCH),
            max_age: None,
            ..options.clone()
        };
        self.set_cookie(name, "", &expired)?;
        self.cookies.remove(name);
        self.cleared_cookies.insert(name.to_string(), expired);
        Ok(())
    }

    pub const fn cookies(&self) -> &BTreeMap<String, CookieRecord> {
        &self.cookies
    }

    pub const fn cleared_cookies(&self) -> &BTreeMap<String, CookieOptions> {
        &self.cleared_cookies
    }

    /// Every `Set-Cookie` value parsed back into its parts
    pub fn parsed_cookies(&self) -> Vec<ParsedCookie> {
        cookie::parse(self.header_values(SET_COOKIE.as_str()))
    }

    /// Convert into a hyper response carrying the recorded status, headers and body
    pub fn into_hyper_response(self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(Bytes::from(self.body)));
        *response.status_mut() =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        *response.headers_mut() = self.headers;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_is_validated() {
        let mut res = ResponseContext::new();
        assert_eq!(res.status(), 200);
        res.set_status(404).unwrap();
        assert_eq!(res.status_message().unwrap(), "Not Found");
        assert!(matches!(res.set_status(299), Err(Error::UnknownStatus(_))));
        assert_eq!(res.status(), 404);
    }

    #[test]
    fn test_headers_lock_after_write() {
        let mut res = ResponseContext::new();
        res.set_header("Content-Type", "text/plain").unwrap();
        assert_eq!(res.header("content-type"), Some("text/plain"));

        res.write(b"hello").unwrap();
        assert!(res.headers_sent());
        assert!(matches!(res.set_header("x-late", "1"), Err(Error::HeadersSent)));

        res.end();
        assert!(res.is_ended());
        assert!(!res.is_writable());
        assert!(res.write(b"more").is_err());
        assert_eq!(res.body_text(), "hello");
    }

    #[test]
    fn test_invalid_header() {
        let mut res = ResponseContext::new();
        assert!(matches!(
            res.set_header("bad name", "x"),
            Err(Error::InvalidHeader { .. })
        ));
        assert!(res.set_header("x-ok", "line\nbreak").is_err());
    }

    #[test]
    fn test_set_cookie_accumulates() {
        let mut res = ResponseContext::new();
        let path = CookieOptions {
            path: Some("/".into()),
            ..Default::default()
        };
        let secure = CookieOptions {
            secure: true,
            ..Default::default()
        };
        res.set_cookie("a", "1", &path).unwrap();
        res.set_cookie("b", "2", &secure).unwrap();

        assert_eq!(res.header_values("set-cookie"), vec!["a=1; Path=/", "b=2; Secure"]);

        let parsed = res.parsed_cookies();
        assert_eq!(parsed.len(), 2);
        assert_eq!((parsed[0].name.as_str(), parsed[0].payload.as_str()), ("a", "1"));
        assert_eq!((parsed[1].name.as_str(), parsed[1].payload.as_str()), ("b", "2"));

        assert_eq!(res.cookies()["a"].options.path.as_deref(), Some("/"));
        assert!(res.cookies()["b"].options.secure);
    }

    #[test]
    fn test_clear_cookie() {
        let mut res = ResponseContext::new();
        res.set_cookie("sid", "abc", &CookieOptions::default()).unwrap();
        res.clear_cookie("sid", &CookieOptions::default()).unwrap();

        assert!(!res.cookies().contains_key("sid"));
        assert!(res.cleared_cookies().contains_key("sid"));
        let values = res.header_values("set-cookie");
        assert_eq!(values[1], "sid=; Expires=Thu, 01 Jan 1970 00:00:00 GMT");
    }

    #[test]
    fn test_into_hyper_response() {
        let mut res = ResponseContext::new();
        res.set_status(206).unwrap();
        res.set_header("content-range", "bytes 0-1/2").unwrap();
        res.end_with(b"ok").unwrap();

        let response = res.into_hyper_response();
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(response.headers()["content-range"], "bytes 0-1/2");
    }
}
