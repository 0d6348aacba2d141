//! Content negotiation module
//!
//! Parses quality-weighted `Accept`-family headers and matches them against
//! server-side candidates. Selection follows server preference order: the
//! first candidate the client accepts wins, regardless of client quality order.

use super::mime;

/// One entry of an `Accept`-like header
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptToken {
    pub value: String,
    pub quality: f32,
    pub params: Vec<(String, String)>,
}

/// Split on `sep` outside of double-quoted strings
pub(crate) fn split_unquoted(input: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            c if c == sep && !in_quotes => {
                parts.push(&input[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

/// Parse an `Accept`-like header into tokens ordered by descending quality
///
/// Ties keep their declaration order. Tokens with an unparsable `q` are dropped.
pub fn parse_accept_like(header: &str) -> Vec<AcceptToken> {
    let mut tokens: Vec<AcceptToken> = split_unquoted(header, ',')
        .into_iter()
        .filter_map(parse_token)
        .collect();
    // stable sort keeps header order for equal qualities
    tokens.sort_by(|a, b| b.quality.total_cmp(&a.quality));
    tokens
}

fn parse_token(raw: &str) -> Option<AcceptToken> {
    let mut segments = split_unquoted(raw, ';').into_iter();
    let value = segments.next()?.trim();
    if value.is_empty() {
        return None;
    }

    let mut quality = 1.0_f32;
    let mut params = Vec::new();
    for segment in segments {
        let Some((key, val)) = segment.split_once('=') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let val = val.trim().trim_matches('"');
        if key == "q" {
            let q: f32 = val.parse().ok()?;
            if !q.is_finite() {
                return None;
            }
            quality = q.clamp(0.0, 1.0);
        } else {
            params.push((key, val.to_string()));
        }
    }

    Some(AcceptToken {
        value: value.to_string(),
        quality,
        params,
    })
}

/// Best (most specific, then highest quality) token accepting a candidate
fn best_quality(
    tokens: &[AcceptToken],
    candidate: &str,
    specificity: impl Fn(&str, &str) -> Option<u8>,
) -> Option<f32> {
    tokens
        .iter()
        .filter_map(|token| specificity(&token.value, candidate).map(|s| (s, token.quality)))
        .max_by(|(sa, qa), (sb, qb)| sa.cmp(sb).then(qa.total_cmp(qb)))
        .map(|(_, q)| q)
}

fn media_specificity(accepted: &str, candidate: &str) -> Option<u8> {
    let accepted = accepted.to_ascii_lowercase();
    let (a_type, a_sub) = accepted.split_once('/')?;
    let (c_type, c_sub) = candidate.split_once('/')?;

    match (a_type, a_sub) {
        ("*", "*") => Some(0),
        (t, "*") if t == c_type => Some(1),
        (t, s) if t == c_type && s == c_sub => Some(2),
        _ => None,
    }
}

fn simple_specificity(accepted: &str, candidate: &str) -> Option<u8> {
    if accepted == "*" {
        Some(0)
    } else if accepted.eq_ignore_ascii_case(candidate) {
        Some(1)
    } else {
        None
    }
}

fn language_specificity(accepted: &str, candidate: &str) -> Option<u8> {
    if accepted == "*" {
        return Some(0);
    }
    let prefix = |tag: &str| tag.split('-').next().unwrap_or_default().to_ascii_lowercase();
    let accepted_lc = accepted.to_ascii_lowercase();
    let candidate_lc = candidate.to_ascii_lowercase();

    if accepted_lc == candidate_lc {
        Some(4)
    } else if prefix(accepted) == candidate_lc {
        Some(2)
    } else if accepted_lc == prefix(candidate) {
        Some(1)
    } else {
        None
    }
}

/// Normalize a candidate (`json`, `text/html; charset=utf-8`) to a bare media type
fn normalize_media_candidate(candidate: &str) -> Option<String> {
    if candidate.contains('/') {
        Some(mime::essence(candidate))
    } else {
        mime::resolve(candidate).map(|t| mime::essence(&t))
    }
}

/// Whether an `Accept` header admits a media type
///
/// The most specific matching token decides, so an explicit `;q=0` excludes a
/// type even when a broader wildcard would accept it.
///
/// # Examples
/// ```
/// use httpsim::http::negotiate::matches;
/// assert!(matches("text/*", "text/html"));
/// assert!(!matches("*/*, text/plain;q=0", "text/plain"));
/// ```
pub fn matches(accept: &str, candidate: &str) -> bool {
    let Some(candidate) = normalize_media_candidate(candidate) else {
        return false;
    };
    let tokens = parse_accept_like(accept);
    best_quality(&tokens, &candidate, media_specificity).is_some_and(|q| q > 0.0)
}

/// First candidate (in server order) admitted by the `Accept` header
///
/// A missing header accepts everything.
pub fn negotiate_best<'a>(accept: Option<&str>, candidates: &[&'a str]) -> Option<&'a str> {
    match accept {
        None => candidates.first().copied(),
        Some(header) => candidates.iter().copied().find(|c| matches(header, c)),
    }
}

/// First acceptable content coding; `identity` is acceptable unless excluded
pub fn negotiate_encoding<'a>(accept: Option<&str>, candidates: &[&'a str]) -> Option<&'a str> {
    let Some(header) = accept else {
        return candidates.first().copied();
    };
    let tokens = parse_accept_like(header);
    candidates.iter().copied().find(|candidate| {
        match best_quality(&tokens, candidate, simple_specificity) {
            Some(q) => q > 0.0,
            None => candidate.eq_ignore_ascii_case("identity"),
        }
    })
}

/// First acceptable charset
pub fn negotiate_charset<'a>(accept: Option<&str>, candidates: &[&'a str]) -> Option<&'a str> {
    let Some(header) = accept else {
        return candidates.first().copied();
    };
    let tokens = parse_accept_like(header);
    candidates
        .iter()
        .copied()
        .find(|c| best_quality(&tokens, c, simple_specificity).is_some_and(|q| q > 0.0))
}

/// First acceptable language, matching primary subtags in either direction
pub fn negotiate_language<'a>(accept: Option<&str>, candidates: &[&'a str]) -> Option<&'a str> {
    let Some(header) = accept else {
        return candidates.first().copied();
    };
    let tokens = parse_accept_like(header);
    candidates
        .iter()
        .copied()
        .find(|c| best_quality(&tokens, c, language_specificity).is_some_and(|q| q > 0.0))
}
