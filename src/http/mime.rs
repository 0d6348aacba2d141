//! MIME type resolution module
//!
//! Maps file extensions to media types and appends a charset for text-like types.

/// Charset appended to text-like media types
pub const DEFAULT_CHARSET: &str = "utf-8";

/// Media type used when an extension is unknown
pub const DEFAULT_TYPE: &str = "application/octet-stream";

/// Look up the bare media type for an extension (without leading dot)
pub fn lookup_extension(extension: &str) -> Option<&'static str> {
    let ext = extension.trim_start_matches('.').to_ascii_lowercase();
    let media_type = match ext.as_str() {
        // Text
        "html" | "htm" | "shtml" => "text/html",
        "css" => "text/css",
        "txt" | "text" | "conf" | "log" | "ini" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "csv" => "text/csv",
        "xml" => "application/xml",
        "xhtml" => "application/xhtml+xml",

        // JavaScript/WASM
        "js" | "mjs" | "cjs" => "text/javascript",
        "json" | "map" => "application/json",
        "jsonld" => "application/ld+json",
        "wasm" => "application/wasm",

        // Images
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        "avif" => "image/avif",

        // Video
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "ogv" => "video/ogg",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",

        // Audio
        "mp3" => "audio/mpeg",
        "ogg" | "oga" => "audio/ogg",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        "m4a" => "audio/mp4",

        // Fonts
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "eot" => "application/vnd.ms-fontobject",

        // Documents
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" | "gzip" => "application/gzip",
        "tar" => "application/x-tar",
        "bin" => DEFAULT_TYPE,

        _ => return None,
    };
    Some(media_type)
}

/// Whether a bare media type should carry a charset parameter
pub fn is_text_like(media_type: &str) -> bool {
    let essence = media_type.to_ascii_lowercase();
    essence.starts_with("text/")
        || essence == "application/json"
        || essence.ends_with("+json")
        || essence == "application/xhtml+xml"
        || essence == "application/pdf"
}

/// Resolve an extension or a full `type/subtype` into a Content-Type value
///
/// Returns `None` for unknown extensions and malformed types.
///
/// # Examples
/// ```
/// use httpsim::http::mime::resolve;
/// assert_eq!(resolve("html").as_deref(), Some("text/html; charset=utf-8"));
/// assert_eq!(resolve(".png").as_deref(), Some("image/png"));
/// assert_eq!(resolve("application/json").as_deref(), Some("application/json; charset=utf-8"));
/// assert_eq!(resolve("nope"), None);
/// ```
pub fn resolve(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if input.contains('/') {
        let (essence, params) = input.split_once(';').unwrap_or((input, ""));
        let (kind, subtype) = essence.trim().split_once('/')?;
        if kind.is_empty() || subtype.is_empty() {
            return None;
        }
        let has_charset = params
            .split(';')
            .any(|p| p.trim().to_ascii_lowercase().starts_with("charset="));
        if is_text_like(essence.trim()) && !has_charset {
            return Some(format!("{input}; charset={DEFAULT_CHARSET}"));
        }
        return Some(input.to_string());
    }

    let media_type = lookup_extension(input)?;
    if is_text_like(media_type) {
        Some(format!("{media_type}; charset={DEFAULT_CHARSET}"))
    } else {
        Some(media_type.to_string())
    }
}

/// Content-Type for a file path, falling back to `application/octet-stream`
pub fn content_type_for_path(path: &str) -> String {
    let file_name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    file_name
        .rsplit_once('.')
        .filter(|(stem, _)| !stem.is_empty())
        .and_then(|(_, ext)| resolve(ext))
        .unwrap_or_else(|| DEFAULT_TYPE.to_string())
}

/// Strip parameters and lower-case a media type
pub fn essence(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_types() {
        assert_eq!(resolve("html").as_deref(), Some("text/html; charset=utf-8"));
        assert_eq!(resolve("css").as_deref(), Some("text/css; charset=utf-8"));
        assert_eq!(resolve("json").as_deref(), Some("application/json; charset=utf-8"));
        assert_eq!(resolve("png").as_deref(), Some("image/png"));
        assert_eq!(resolve("mp4").as_deref(), Some("video/mp4"));
        assert_eq!(resolve("PDF").as_deref(), Some("application/pdf; charset=utf-8"));
    }

    #[test]
    fn test_full_types() {
        assert_eq!(resolve("image/png").as_deref(), Some("image/png"));
        assert_eq!(
            resolve("text/plain; charset=latin1").as_deref(),
            Some("text/plain; charset=latin1")
        );
        assert_eq!(
            resolve("application/vnd.api+json").as_deref(),
            Some("application/vnd.api+json; charset=utf-8")
        );
        assert_eq!(resolve("text/"), None);
    }

    #[test]
    fn test_unknown_extension() {
        assert_eq!(resolve("xyz"), None);
        assert_eq!(resolve(""), None);
    }

    #[test]
    fn test_content_type_for_path() {
        assert_eq!(content_type_for_path("/a/b/page.html"), "text/html; charset=utf-8");
        assert_eq!(content_type_for_path("/a/b/archive"), DEFAULT_TYPE);
        assert_eq!(content_type_for_path("/a/.hidden"), DEFAULT_TYPE);
        assert_eq!(content_type_for_path("/a/data.unknownext"), DEFAULT_TYPE);
    }
}
