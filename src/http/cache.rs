//! HTTP cache validation module
//!
//! Evaluates conditional request headers against the validators a response
//! currently carries, and builds the `Cache-Control` header for served files.

use super::date::parse_http_date;
use hyper::HeaderMap;

/// One year, the ceiling for `max-age`
pub const MAX_MAX_AGE_MS: u64 = 365 * 24 * 60 * 60 * 1000;

/// Validators currently set on the response
#[derive(Debug, Clone, Copy, Default)]
pub struct Validators<'a> {
    pub etag: Option<&'a str>,
    pub last_modified: Option<&'a str>,
}

/// Read a header as a string, ignoring non-ASCII values
pub fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Split an `If-Match`/`If-None-Match` list into tokens
fn parse_token_list(value: &str) -> impl Iterator<Item = &str> {
    value
        .split([',', ' '])
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn strip_weak(tag: &str) -> &str {
    tag.strip_prefix("W/").unwrap_or(tag)
}

/// Check if any token of an entity-tag list matches the current `ETag`
///
/// The weak prefix is ignored on either side, and `*` matches anything.
///
/// # Examples
/// ```
/// use httpsim::http::cache::etag_list_matches;
/// assert!(etag_list_matches("\"xyz\", W/\"abc\"", "\"abc\""));
/// assert!(etag_list_matches("*", "\"abc\""));
/// assert!(!etag_list_matches("\"different\"", "\"abc\""));
/// ```
pub fn etag_list_matches(list: &str, etag: &str) -> bool {
    if list.trim() == "*" {
        return true;
    }
    let current = strip_weak(etag.trim());
    parse_token_list(list).any(|token| strip_weak(token) == current)
}

/// `cache-control: no-cache`, matched on directive boundaries
fn has_no_cache(headers: &HeaderMap) -> bool {
    header_str(headers, "cache-control").is_some_and(|value| {
        value
            .split(',')
            .any(|directive| directive.trim().eq_ignore_ascii_case("no-cache"))
    })
}

/// `last_modified <= since`, failing closed when either side is unparsable
fn not_modified_since(last_modified: Option<&str>, since: &str) -> bool {
    match (last_modified.and_then(parse_http_date), parse_http_date(since)) {
        (Some(modified), Some(since)) => modified <= since,
        _ => false,
    }
}

/// Whether the client's cached copy is still valid (a 304 is due)
pub fn is_fresh(request: &HeaderMap, current: &Validators<'_>) -> bool {
    let if_modified_since = header_str(request, "if-modified-since");
    let if_none_match = header_str(request, "if-none-match");

    if if_modified_since.is_none() && if_none_match.is_none() {
        return false;
    }

    if has_no_cache(request) {
        return false;
    }

    if let Some(list) = if_none_match {
        if list.trim() == "*" {
            return true;
        }
        return current.etag.is_some_and(|etag| etag_list_matches(list, etag));
    }

    if_modified_since.is_some_and(|since| not_modified_since(current.last_modified, since))
}

/// Whether `If-Match`/`If-Unmodified-Since` rule out the transfer (412)
pub fn is_precondition_failed(request: &HeaderMap, current: &Validators<'_>) -> bool {
    if let Some(list) = header_str(request, "if-match") {
        return match current.etag {
            None => true,
            Some(etag) => !etag_list_matches(list, etag),
        };
    }

    if let Some(since) = header_str(request, "if-unmodified-since").and_then(parse_http_date) {
        return match current.last_modified.and_then(parse_http_date) {
            None => true,
            Some(modified) => modified > since,
        };
    }

    false
}

/// Whether an `If-Range` validator still allows a partial response
pub fn is_range_fresh(request: &HeaderMap, current: &Validators<'_>) -> bool {
    let Some(if_range) = header_str(request, "if-range") else {
        return true;
    };

    if if_range.contains('"') {
        return current
            .etag
            .is_some_and(|etag| strip_weak(if_range.trim()) == strip_weak(etag.trim()));
    }

    not_modified_since(current.last_modified, if_range)
}

/// Whether the request carries any conditional header
pub fn is_conditional(request: &HeaderMap) -> bool {
    ["if-match", "if-unmodified-since", "if-none-match", "if-modified-since"]
        .iter()
        .any(|name| request.contains_key(*name))
}

/// Public cache policy for served files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CachePolicy {
    /// Milliseconds, clamped to one year when rendered
    pub max_age_ms: u64,
    pub immutable: bool,
}

impl CachePolicy {
    /// Convert to Cache-Control header value
    pub fn to_header_value(self) -> String {
        let max_age = self.max_age_ms.min(MAX_MAX_AGE_MS) / 1000;
        if self.immutable {
            format!("public, max-age={max_age}, immutable")
        } else {
            format!("public, max-age={max_age}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    const LAST_MODIFIED: &str = "Sat, 01 Jan 2000 00:00:00 GMT";

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(*value));
        }
        map
    }

    fn validators() -> Validators<'static> {
        Validators {
            etag: Some("W/\"a-1\""),
            last_modified: Some(LAST_MODIFIED),
        }
    }

    #[test]
    fn test_unconditional_is_never_fresh() {
        assert!(!is_fresh(&HeaderMap::new(), &validators()));
    }

    #[test]
    fn test_if_none_match() {
        assert!(is_fresh(&headers(&[("if-none-match", "\"a-1\"")]), &validators()));
        assert!(is_fresh(&headers(&[("if-none-match", "\"x\", W/\"a-1\"")]), &validators()));
        assert!(is_fresh(&headers(&[("if-none-match", "*")]), &validators()));
        assert!(!is_fresh(&headers(&[("if-none-match", "\"b-2\"")]), &validators()));
        assert!(!is_fresh(
            &headers(&[("if-none-match", "\"a-1\"")]),
            &Validators::default()
        ));
    }

    #[test]
    fn test_no_cache_wins() {
        let req = headers(&[("if-none-match", "\"a-1\""), ("cache-control", "max-age=0, no-cache")]);
        assert!(!is_fresh(&req, &validators()));

        // substring, not a directive
        let req = headers(&[("if-none-match", "\"a-1\""), ("cache-control", "no-cache-please")]);
        assert!(is_fresh(&req, &validators()));
    }

    #[test]
    fn test_if_modified_since() {
        assert!(is_fresh(&headers(&[("if-modified-since", LAST_MODIFIED)]), &validators()));
        assert!(is_fresh(
            &headers(&[("if-modified-since", "Sun, 02 Jan 2000 00:00:00 GMT")]),
            &validators()
        ));
        assert!(!is_fresh(
            &headers(&[("if-modified-since", "Fri, 31 Dec 1999 00:00:00 GMT")]),
            &validators()
        ));
        assert!(!is_fresh(&headers(&[("if-modified-since", "garbage")]), &validators()));
    }

    #[test]
    fn test_precondition_failed() {
        assert!(!is_precondition_failed(&HeaderMap::new(), &validators()));
        assert!(!is_precondition_failed(&headers(&[("if-match", "\"a-1\"")]), &validators()));
        assert!(!is_precondition_failed(&headers(&[("if-match", "*")]), &validators()));
        assert!(is_precondition_failed(&headers(&[("if-match", "\"zzz\"")]), &validators()));
        assert!(is_precondition_failed(
            &headers(&[("if-match", "*")]),
            &Validators::default()
        ));

        assert!(is_precondition_failed(
            &headers(&[("if-unmodified-since", "Fri, 31 Dec 1999 00:00:00 GMT")]),
            &validators()
        ));
        assert!(!is_precondition_failed(
            &headers(&[("if-unmodified-since", LAST_MODIFIED)]),
            &validators()
        ));
        assert!(!is_precondition_failed(
            &headers(&[("if-unmodified-since", "not a date")]),
            &validators()
        ));
    }

    #[test]
    fn test_range_freshness() {
        assert!(is_range_fresh(&HeaderMap::new(), &validators()));
        assert!(is_range_fresh(&headers(&[("if-range", "W/\"a-1\"")]), &validators()));
        assert!(!is_range_fresh(&headers(&[("if-range", "\"old\"")]), &validators()));
        assert!(is_range_fresh(&headers(&[("if-range", LAST_MODIFIED)]), &validators()));
        assert!(!is_range_fresh(
            &headers(&[("if-range", "Fri, 31 Dec 1999 00:00:00 GMT")]),
            &validators()
        ));
    }

    #[test]
    fn test_cache_policy() {
        let policy = CachePolicy {
            max_age_ms: 3_600_000,
            immutable: false,
        };
        assert_eq!(policy.to_header_value(), "public, max-age=3600");

        let clamped = CachePolicy {
            max_age_ms: MAX_MAX_AGE_MS * 3,
            immutable: true,
        };
        assert_eq!(clamped.to_header_value(), "public, max-age=31536000, immutable");
        assert_eq!(CachePolicy::default().to_header_value(), "public, max-age=0");
    }
}
