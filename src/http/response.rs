//! HTTP response writing module
//!
//! Writes the terminal responses of a transfer (errors, directory redirects,
//! 304) onto a `ResponseContext`, decoupled from the transfer state machine.

use super::status;
use crate::context::ResponseContext;
use crate::error::{Result, TransferError};

const CONTENT_SECURITY_POLICY: &str = "default-src 'none'";
const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Escape text for inclusion in HTML
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Minimal HTML document wrapping a message
pub fn html_document(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n<body>\n<pre>{body}</pre>\n</body>\n</html>\n"
    )
}

fn write_html(res: &mut ResponseContext, code: u16, document: &str, is_head: bool) -> Result<()> {
    res.set_status(code)?;
    res.set_header("content-security-policy", CONTENT_SECURITY_POLICY)?;
    res.set_header("x-content-type-options", "nosniff")?;
    res.set_header("content-type", HTML_CONTENT_TYPE)?;
    res.set_header("content-length", &document.len().to_string())?;
    if is_head {
        res.end();
    } else {
        res.end_with(document.as_bytes())?;
    }
    Ok(())
}

/// Replace everything set so far with an error document for `err`
///
/// Headers mandated by the protocol (e.g. `Content-Range` on 416) survive the
/// reset.
pub fn write_error_response(
    res: &mut ResponseContext,
    err: &TransferError,
    is_head: bool,
) -> Result<()> {
    let code = err.status();
    let message = status::message_for(code)?;

    res.clear_headers()?;
    for (name, value) in err.mandated_headers() {
        res.set_header(name, &value)?;
    }

    let document = html_document("Error", &escape_html(message));
    write_html(res, code, &document, is_head)
}

/// 301 to the slash-terminated form of a directory path
pub fn write_directory_redirect(
    res: &mut ResponseContext,
    location: &str,
    is_head: bool,
) -> Result<()> {
    let href = escape_html(location);
    let document = html_document(
        "Redirecting",
        &format!("Redirecting to <a href=\"{href}\">{href}</a>"),
    );
    res.set_header("location", location)?;
    write_html(res, 301, &document, is_head)
}

/// Turn the response into a bodiless 304, dropping entity headers
pub fn write_not_modified(res: &mut ResponseContext) -> Result<()> {
    let entity_headers: Vec<String> = res
        .headers()
        .keys()
        .map(|name| name.as_str().to_string())
        .filter(|name| name.starts_with("content-") && name != "content-location")
        .collect();
    for name in entity_headers {
        res.remove_header(&name)?;
    }
    res.set_status(304)?;
    res.end();
    Ok(())
}
