//! Entity tag generation
//!
//! Content tags hash the body with a seeded CRC-32; stat tags are built from the
//! resource size and modification time without touching the content.

use crate::transfer::ResourceDescriptor;
use std::fmt;

/// Tag for zero-length content, fixed so it never needs recomputing
pub const EMPTY_TAG: &str = "\"0-2jmj7l5rSw0yVb/vlWAYkK/YBwk\"";

const BYTE_SEED: u32 = 0x811c_9dc5;
const TEXT_SEED: u32 = 0x0100_0193;

/// Content fed to the hasher
///
/// Text is hashed over its UTF-16 code units so that the same bytes seen as a
/// string and as a buffer produce distinct tags.
#[derive(Debug, Clone, Copy)]
pub enum Content<'a> {
    Bytes(&'a [u8]),
    Text(&'a str),
}

impl<'a> From<&'a [u8]> for Content<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self::Bytes(bytes)
    }
}

impl<'a> From<&'a Vec<u8>> for Content<'a> {
    fn from(bytes: &'a Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl<'a> From<&'a str> for Content<'a> {
    fn from(text: &'a str) -> Self {
        Self::Text(text)
    }
}

impl<'a> From<&'a String> for Content<'a> {
    fn from(text: &'a String) -> Self {
        Self::Text(text)
    }
}

/// A weak or strong entity tag; `tag` keeps its surrounding quotes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityTag {
    weak: bool,
    tag: String,
}

impl EntityTag {
    pub fn strong(tag: impl Into<String>) -> Self {
        Self {
            weak: false,
            tag: quote(tag.into()),
        }
    }

    pub fn weak(tag: impl Into<String>) -> Self {
        Self {
            weak: true,
            tag: quote(tag.into()),
        }
    }

    /// Parse a header token such as `W/"abc"` or `"abc"`
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let (weak, rest) = match value.strip_prefix("W/") {
            Some(rest) => (true, rest),
            None => (false, value),
        };
        if rest.len() < 2 || !rest.starts_with('"') || !rest.ends_with('"') {
            return None;
        }
        Some(Self {
            weak,
            tag: rest.to_string(),
        })
    }

    #[must_use]
    pub fn into_weak(mut self) -> Self {
        self.weak = true;
        self
    }

    pub const fn is_weak(&self) -> bool {
        self.weak
    }

    /// Quoted opaque part, without any `W/` prefix
    pub fn opaque(&self) -> &str {
        &self.tag
    }

    /// Equal after stripping the weak prefix
    pub fn weak_eq(&self, other: &Self) -> bool {
        self.tag == other.tag
    }

    /// Equal and neither side weak
    pub fn strong_eq(&self, other: &Self) -> bool {
        !self.weak && !other.weak && self.tag == other.tag
    }
}

impl fmt::Display for EntityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.weak {
            write!(f, "W/{}", self.tag)
        } else {
            f.write_str(&self.tag)
        }
    }
}

fn quote(tag: String) -> String {
    if tag.len() >= 2 && tag.starts_with('"') && tag.ends_with('"') {
        tag
    } else {
        format!("\"{tag}\"")
    }
}

/// Compute a strong tag for body content
///
/// # Examples
/// ```
/// use httpsim::http::etag::compute_for;
/// assert_eq!(compute_for("").to_string(), "\"0-2jmj7l5rSw0yVb/vlWAYkK/YBwk\"");
/// assert_eq!(compute_for("hello"), compute_for("hello"));
/// ```
pub fn compute_for<'a>(content: impl Into<Content<'a>>) -> EntityTag {
    let content = content.into();
    let (byte_len, hash) = match content {
        Content::Bytes(bytes) => {
            if bytes.is_empty() {
                return EntityTag::strong(EMPTY_TAG);
            }
            let mut hasher = crc32fast::Hasher::new_with_initial(BYTE_SEED);
            hasher.update(bytes);
            (bytes.len(), hasher.finalize())
        }
        Content::Text(text) => {
            if text.is_empty() {
                return EntityTag::strong(EMPTY_TAG);
            }
            let mut hasher = crc32fast::Hasher::new_with_initial(TEXT_SEED);
            for unit in text.encode_utf16() {
                hasher.update(&unit.to_le_bytes());
            }
            (text.len(), hasher.finalize())
        }
    };
    EntityTag::strong(format!("{byte_len:x}-{hash:08x}"))
}

/// Compute a weak structural tag from size and modification time
pub fn compute_for_stat(resource: &ResourceDescriptor) -> EntityTag {
    let mtime = u64::try_from(resource.mtime.timestamp_millis()).unwrap_or(0);
    EntityTag::weak(format!("{:x}-{mtime:x}", resource.length))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_empty_tag_is_fixed() {
        assert_eq!(compute_for("").to_string(), EMPTY_TAG);
        assert_eq!(compute_for(&b""[..]).to_string(), EMPTY_TAG);
    }

    #[test]
    fn test_etag_consistency() {
        let etag1 = compute_for("same content");
        let etag2 = compute_for("same content");
        assert_eq!(etag1, etag2);
        assert!(!etag1.is_weak());
    }

    #[test]
    fn test_etag_difference() {
        assert_ne!(compute_for("content a"), compute_for("content b"));
    }

    #[test]
    fn test_modes_are_seeded_apart() {
        let text = compute_for("hello world");
        let bytes = compute_for(&b"hello world"[..]);
        assert_ne!(text, bytes);
        assert!(text.opaque().starts_with("\"b-"));
        assert!(bytes.opaque().starts_with("\"b-"));
    }

    #[test]
    fn test_text_length_is_utf8_bytes() {
        assert!(compute_for("héllo").opaque().starts_with("\"6-"));
    }

    #[test]
    fn test_stat_tag() {
        let resource = ResourceDescriptor {
            path: "/a.txt".to_string(),
            length: 255,
            mtime: Utc.timestamp_millis_opt(4096).unwrap(),
            is_directory: false,
        };
        assert_eq!(compute_for_stat(&resource).to_string(), "W/\"ff-1000\"");
    }

    #[test]
    fn test_parse_and_compare() {
        let weak = EntityTag::parse("W/\"abc\"").unwrap();
        let strong = EntityTag::parse("\"abc\"").unwrap();
        assert!(weak.is_weak());
        assert!(weak.weak_eq(&strong));
        assert!(!weak.strong_eq(&strong));
        assert!(strong.strong_eq(&EntityTag::strong("abc")));
        assert!(EntityTag::parse("abc").is_none());
        assert_eq!(EntityTag::weak("x").to_string(), "W/\"x\"");
    }
}
