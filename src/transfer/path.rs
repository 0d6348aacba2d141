//! Request path decoding and resolution

use crate::error::TransferError;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters escaped in a redirect `Location`
const LOCATION_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'|')
    .add(b'\\')
    .add(b'^');

fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split(['/', '\\'])
}

/// Percent-decode a URL path; undecodable input or NUL is malformed
pub fn decode_path(raw: &str) -> Result<String, TransferError> {
    let decoded = percent_decode_str(raw)
        .decode_utf8()
        .map_err(|_| TransferError::MalformedPath)?;
    if decoded.contains('\0') {
        return Err(TransferError::MalformedPath);
    }
    Ok(decoded.into_owned())
}

/// Any `..` component, wherever it sits
pub fn is_traversal(path: &str) -> bool {
    components(path).any(|part| part == "..")
}

/// Any component longer than `.` that starts with a dot
pub fn contains_dotfile(path: &str) -> bool {
    components(path).any(|part| part.len() > 1 && part.starts_with('.'))
}

pub fn has_trailing_slash(path: &str) -> bool {
    path.ends_with('/')
}

/// Whether the last component carries an extension
pub fn has_extension(path: &str) -> bool {
    components(path)
        .last()
        .and_then(|last| last.rfind('.'))
        .is_some_and(|dot| dot > 0)
}

/// Collapse empty and `.` components, keeping leading and trailing slashes
pub fn normalize(path: &str) -> String {
    let parts: Vec<&str> = components(path)
        .filter(|part| !part.is_empty() && *part != ".")
        .collect();

    let mut out = String::with_capacity(path.len());
    if path.starts_with('/') {
        out.push('/');
    }
    out.push_str(&parts.join("/"));
    if has_trailing_slash(path) && !parts.is_empty() {
        out.push('/');
    }
    out
}

/// Place a normalized request path under `root`
pub fn join(root: &str, relative: &str) -> String {
    let root = root.trim_end_matches('/');
    let relative = relative.trim_start_matches('/');
    format!("{root}/{relative}")
}

/// `Location` for the slash-terminated form of a directory request
///
/// Leading slashes are collapsed so the result can never be read as a
/// protocol-relative URL.
pub fn redirect_location(request_path: &str, query: Option<&str>) -> String {
    let collapsed = format!("/{}/", request_path.trim_start_matches('/'));
    let mut location = utf8_percent_encode(&collapsed, LOCATION_SET).to_string();
    if let Some(query) = query {
        location.push('?');
        location.push_str(query);
    }
    location
}
