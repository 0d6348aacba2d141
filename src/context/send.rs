//! Body dispatch for `send`, `json` and `redirect`
//!
//! The input is classified once into a `Payload` variant and every later
//! decision branches on that variant.

use super::request::RequestContext;
use super::response::ResponseContext;
use super::{AppContext, EtagMode};
use crate::error::{Error, Result};
use crate::http::{etag, status};
use hyper::body::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::Serialize;

/// Bytes that must be escaped in a `Location` header
const LOCATION_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// A response body, classified once
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Empty,
    Text(String),
    Binary(Bytes),
    Structured(serde_json::Value),
}

impl From<()> for Payload {
    fn from((): ()) -> Self {
        Self::Empty
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Binary(Bytes::from(bytes))
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Self::Binary(bytes)
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Self::Structured(value)
    }
}

fn to_json(app: &AppContext, value: &impl Serialize) -> Result<String> {
    match app.json_spaces {
        Some(spaces) if spaces > 0 => {
            let indent = vec![b' '; spaces];
            let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent);
            let mut out = Vec::new();
            let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
            value.serialize(&mut serializer)?;
            Ok(String::from_utf8_lossy(&out).into_owned())
        }
        _ => Ok(serde_json::to_string(value)?),
    }
}

impl ResponseContext {
    /// Send a body, applying ETag, freshness, empty-status and HEAD rules
    pub fn send(
        &mut self,
        app: &AppContext,
        req: &RequestContext,
        payload: impl Into<Payload>,
    ) -> Result<()> {
        if self.headers_sent() {
            return Err(Error::HeadersSent);
        }

        let body: Option<Vec<u8>> = match payload.into() {
            Payload::Empty => None,
            Payload::Text(text) => {
                if !self.has_header("content-type") {
                    self.set_header("content-type", "text/html; charset=utf-8")?;
                }
                Some(text.into_bytes())
            }
            Payload::Binary(bytes) => {
                if !self.has_header("content-type") {
                    self.set_header("content-type", "application/octet-stream")?;
                }
                Some(bytes.to_vec())
            }
            Payload::Structured(value) => {
                let text = to_json(app, &value)?;
                if !self.has_header("content-type") {
                    self.set_header("content-type", "application/json; charset=utf-8")?;
                }
                Some(text.into_bytes())
            }
        };

        if let Some(powered_by) = &app.powered_by {
            if !self.has_header("x-powered-by") {
                self.set_header("x-powered-by", powered_by)?;
            }
        }

        if let Some(bytes) = &body {
            self.set_header("content-length", &bytes.len().to_string())?;
            if app.etag != EtagMode::Disabled && !self.has_header("etag") {
                let tag = etag::compute_for(bytes);
                let tag = if app.etag == EtagMode::Weak { tag.into_weak() } else { tag };
                self.set_header("etag", &tag.to_string())?;
            }
        }

        if req.is_fresh(self) {
            self.set_status(304)?;
        }

        let mut body = body.unwrap_or_default();
        match self.status() {
            204 | 304 => {
                self.remove_header("content-type")?;
                self.remove_header("content-length")?;
                self.remove_header("transfer-encoding")?;
                body.clear();
            }
            205 => {
                self.set_header("content-length", "0")?;
                self.remove_header("transfer-encoding")?;
                body.clear();
            }
            _ => {}
        }

        if req.is_head() {
            self.end();
        } else {
            self.end_with(&body)?;
        }
        Ok(())
    }

    /// Serialize a value as JSON and send it
    pub fn json(
        &mut self,
        app: &AppContext,
        req: &RequestContext,
        value: &impl Serialize,
    ) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.send(app, req, Payload::Structured(value))
    }

    /// Redirect to `location` with a short plain-text body
    pub fn redirect(&mut self, req: &RequestContext, code: u16, location: &str) -> Result<()> {
        if !status::class_of(code)?.is_redirect {
            return Err(Error::UnknownStatus(format!("{code} is not a redirect")));
        }
        let location = utf8_percent_encode(location, LOCATION_SET).to_string();
        let body = format!("{}. Redirecting to {location}", status::message_for(code)?);

        self.set_status(code)?;
        self.set_header("location", &location)?;
        self.set_header("content-type", "text/plain; charset=utf-8")?;
        self.set_header("content-length", &body.len().to_string())?;

        if req.is_head() {
            self.end();
        } else {
            self.end_with(body.as_bytes())?;
        }
        Ok(())
    }
}
