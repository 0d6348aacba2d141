//! HTTP status registry
//!
//! Bidirectional code/reason-phrase lookup plus the redirect, empty-body and
//! retry classifications used when emulating responses.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::OnceLock;

const STATUS_TABLE: &[(u16, &str)] = &[
    (100, "Continue"),
    (101, "Switching Protocols"),
    (102, "Processing"),
    (103, "Early Hints"),
    (200, "OK"),
    (201, "Created"),
    (202, "Accepted"),
    (203, "Non-Authoritative Information"),
    (204, "No Content"),
    (205, "Reset Content"),
    (206, "Partial Content"),
    (207, "Multi-Status"),
    (208, "Already Reported"),
    (226, "IM Used"),
    (300, "Multiple Choices"),
    (301, "Moved Permanently"),
    (302, "Found"),
    (303, "See Other"),
    (304, "Not Modified"),
    (305, "Use Proxy"),
    (307, "Temporary Redirect"),
    (308, "Permanent Redirect"),
    (400, "Bad Request"),
    (401, "Unauthorized"),
    (402, "Payment Required"),
    (403, "Forbidden"),
    (404, "Not Found"),
    (405, "Method Not Allowed"),
    (406, "Not Acceptable"),
    (407, "Proxy Authentication Required"),
    (408, "Request Timeout"),
    (409, "Conflict"),
    (410, "Gone"),
    (411, "Length Required"),
    (412, "Precondition Failed"),
    (413, "Payload Too Large"),
    (414, "URI Too Long"),
    (415, "Unsupported Media Type"),
    (416, "Range Not Satisfiable"),
    (417, "Expectation Failed"),
    (418, "I'm a Teapot"),
    (421, "Misdirected Request"),
    (422, "Unprocessable Entity"),
    (423, "Locked"),
    (424, "Failed Dependency"),
    (425, "Too Early"),
    (426, "Upgrade Required"),
    (428, "Precondition Required"),
    (429, "Too Many Requests"),
    (431, "Request Header Fields Too Large"),
    (451, "Unavailable For Legal Reasons"),
    (500, "Internal Server Error"),
    (501, "Not Implemented"),
    (502, "Bad Gateway"),
    (503, "Service Unavailable"),
    (504, "Gateway Timeout"),
    (505, "HTTP Version Not Supported"),
    (506, "Variant Also Negotiates"),
    (507, "Insufficient Storage"),
    (508, "Loop Detected"),
    (509, "Bandwidth Limit Exceeded"),
    (510, "Not Extended"),
    (511, "Network Authentication Required"),
];

/// Lower-cased reason phrase -> code, built on first use
static MESSAGE_INDEX: OnceLock<HashMap<String, u16>> = OnceLock::new();

fn message_index() -> &'static HashMap<String, u16> {
    MESSAGE_INDEX.get_or_init(|| {
        STATUS_TABLE
            .iter()
            .map(|(code, message)| (message.to_ascii_lowercase(), *code))
            .collect()
    })
}

/// Classification flags for a known status code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct StatusClass {
    pub is_redirect: bool,
    pub is_empty_body: bool,
    pub is_retryable: bool,
}

/// Reason phrase for a status code
pub fn message_for(code: u16) -> Result<&'static str> {
    STATUS_TABLE
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, message)| *message)
        .ok_or_else(|| Error::UnknownStatus(code.to_string()))
}

/// Status code for a reason phrase or a numeric string
///
/// # Examples
/// ```
/// use httpsim::http::status::code_for;
/// assert_eq!(code_for("Not Found").unwrap(), 404);
/// assert_eq!(code_for("416").unwrap(), 416);
/// assert!(code_for("Totally Fine").is_err());
/// ```
pub fn code_for(message: &str) -> Result<u16> {
    let trimmed = message.trim();
    if let Ok(code) = trimmed.parse::<u16>() {
        return message_for(code).map(|_| code);
    }
    message_index()
        .get(&trimmed.to_ascii_lowercase())
        .copied()
        .ok_or_else(|| Error::UnknownStatus(trimmed.to_string()))
}

/// Classify a known status code
pub fn class_of(code: u16) -> Result<StatusClass> {
    message_for(code)?;
    Ok(StatusClass {
        is_redirect: matches!(code, 300 | 301 | 302 | 303 | 305 | 307 | 308),
        is_empty_body: matches!(code, 204 | 205 | 304),
        is_retryable: matches!(code, 502 | 503 | 504),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_lookup() {
        assert_eq!(message_for(200).unwrap(), "OK");
        assert_eq!(message_for(416).unwrap(), "Range Not Satisfiable");
        assert!(matches!(message_for(299), Err(Error::UnknownStatus(_))));
    }

    #[test]
    fn test_code_lookup() {
        assert_eq!(code_for("Partial Content").unwrap(), 206);
        assert_eq!(code_for("partial content").unwrap(), 206);
        assert_eq!(code_for(" 304 ").unwrap(), 304);
        assert!(code_for("999").is_err());
        assert!(code_for("").is_err());
    }

    #[test]
    fn test_classification() {
        let moved = class_of(301).unwrap();
        assert!(moved.is_redirect);
        assert!(!moved.is_empty_body);

        let not_modified = class_of(304).unwrap();
        assert!(!not_modified.is_redirect);
        assert!(not_modified.is_empty_body);

        assert!(class_of(503).unwrap().is_retryable);
        assert!(!class_of(500).unwrap().is_retryable);
        assert!(class_of(299).is_err());
    }
}
