//! Cookie serialization module
//!
//! Builds `Set-Cookie` header values from a directive set and parses them back
//! into structured entries for assertions.

use super::date::format_http_date;
use super::negotiate::split_unquoted;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fmt::Write;

/// Characters left alone by `encodeURIComponent`
const COOKIE_VALUE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Directives attached to one cookie
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieOptions {
    pub domain: Option<String>,
    pub path: Option<String>,
    pub expires: Option<DateTime<Utc>>,
    /// Seconds
    pub max_age: Option<i64>,
    pub secure: bool,
    pub http_only: bool,
    /// `strict`, `lax` or `none`, case-insensitive
    pub same_site: Option<String>,
}

/// A `Set-Cookie` value split back into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCookie {
    pub name: String,
    /// Percent-decoded value
    pub payload: String,
    /// Remaining directive strings, e.g. `Path=/` or `Secure`
    pub directives: Vec<String>,
}

impl ParsedCookie {
    /// Value of a directive, case-insensitive; flags yield an empty string
    pub fn directive(&self, name: &str) -> Option<&str> {
        self.directives.iter().find_map(|d| {
            let (key, value) = d.split_once('=').unwrap_or((d.as_str(), ""));
            key.trim().eq_ignore_ascii_case(name).then(|| value.trim())
        })
    }

    pub fn has_flag(&self, name: &str) -> bool {
        self.directive(name).is_some()
    }
}

fn is_token(value: &str) -> bool {
    !value.is_empty()
        && value.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
        })
}

fn check_attribute(name: &str, value: &str) -> Result<()> {
    if value.is_empty() || value.bytes().any(|b| b == b';' || b.is_ascii_control()) {
        return Err(Error::InvalidDirective(format!("{name}={value}")));
    }
    Ok(())
}

fn same_site_value(value: &str) -> Result<&'static str> {
    match value.to_ascii_lowercase().as_str() {
        "strict" => Ok("Strict"),
        "lax" => Ok("Lax"),
        "none" => Ok("None"),
        _ => Err(Error::InvalidDirective(format!("SameSite={value}"))),
    }
}

/// Serialize a cookie into a `Set-Cookie` header value
///
/// # Examples
/// ```
/// use httpsim::http::cookie::{serialize, CookieOptions};
///
/// let options = CookieOptions { path: Some("/".into()), http_only: true, ..Default::default() };
/// assert_eq!(serialize("sid", "a b", &options).unwrap(), "sid=a%20b; Path=/; HttpOnly");
/// ```
pub fn serialize(name: &str, value: &str, options: &CookieOptions) -> Result<String> {
    if !is_token(name) {
        return Err(Error::InvalidCookieName(name.to_string()));
    }

    let mut out = format!("{name}={}", utf8_percent_encode(value, COOKIE_VALUE_SET));

    if let Some(max_age) = options.max_age {
        let _ = write!(out, "; Max-Age={max_age}");
    }
    if let Some(domain) = &options.domain {
        check_attribute("Domain", domain)?;
        let _ = write!(out, "; Domain={domain}");
    }
    if let Some(path) = &options.path {
        check_attribute("Path", path)?;
        let _ = write!(out, "; Path={path}");
    }
    if let Some(expires) = options.expires {
        let _ = write!(out, "; Expires={}", format_http_date(expires));
    }
    if options.http_only {
        out.push_str("; HttpOnly");
    }
    if options.secure {
        out.push_str("; Secure");
    }
    if let Some(same_site) = &options.same_site {
        let _ = write!(out, "; SameSite={}", same_site_value(same_site)?);
    }

    Ok(out)
}

/// Parse one `Set-Cookie` value; `None` when the first segment has no `=`
pub fn parse_one(header: &str) -> Option<ParsedCookie> {
    let mut segments = split_unquoted(header, ';').into_iter();
    let (name, raw_value) = segments.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let raw_value = raw_value.trim().trim_matches('"');
    let payload = percent_decode_str(raw_value).decode_utf8_lossy().into_owned();
    let directives = segments
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(ToString::to_string)
        .collect();

    Some(ParsedCookie {
        name: name.to_string(),
        payload,
        directives,
    })
}

/// Parse every `Set-Cookie` value, skipping malformed ones
pub fn parse<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<ParsedCookie> {
    values.into_iter().filter_map(parse_one).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_serialize_all_directives() {
        let options = CookieOptions {
            domain: Some("example.com".into()),
            path: Some("/app".into()),
            expires: Some(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()),
            max_age: Some(3600),
            secure: true,
            http_only: true,
            same_site: Some("LAX".into()),
        };
        assert_eq!(
            serialize("token", "v", &options).unwrap(),
            "token=v; Max-Age=3600; Domain=example.com; Path=/app; \
             Expires=Tue, 01 Jan 2030 00:00:00 GMT; HttpOnly; Secure; SameSite=Lax"
        );
    }

    #[test]
    fn test_value_is_percent_encoded() {
        let cookie = serialize("q", "a;b=c d", &CookieOptions::default()).unwrap();
        assert_eq!(cookie, "q=a%3Bb%3Dc%20d");
        assert_eq!(parse_one(&cookie).unwrap().payload, "a;b=c d");
    }

    #[test]
    fn test_invalid_same_site() {
        let options = CookieOptions {
            same_site: Some("sometimes".into()),
            ..Default::default()
        };
        assert!(matches!(
            serialize("a", "1", &options),
            Err(Error::InvalidDirective(_))
        ));
    }

    #[test]
    fn test_invalid_name_and_path() {
        assert!(matches!(
            serialize("bad name", "1", &CookieOptions::default()),
            Err(Error::InvalidCookieName(_))
        ));
        let options = CookieOptions {
            path: Some("/a;b".into()),
            ..Default::default()
        };
        assert!(matches!(serialize("a", "1", &options), Err(Error::InvalidDirective(_))));
    }

    #[test]
    fn test_parse_directives() {
        let parsed = parse_one("sid=abc; Path=/; Secure; SameSite=Strict").unwrap();
        assert_eq!(parsed.name, "sid");
        assert_eq!(parsed.payload, "abc");
        assert_eq!(parsed.directive("path"), Some("/"));
        assert_eq!(parsed.directive("samesite"), Some("Strict"));
        assert!(parsed.has_flag("secure"));
        assert!(!parsed.has_flag("httponly"));
    }

    #[test]
    fn test_parse_many() {
        let parsed = parse(["a=1; Path=/", "garbage", "b=2; Secure"]);
        assert_eq!(parsed.len(), 2);
        assert_eq!((parsed[0].name.as_str(), parsed[0].payload.as_str()), ("a", "1"));
        assert_eq!((parsed[1].name.as_str(), parsed[1].payload.as_str()), ("b", "2"));
    }
}
