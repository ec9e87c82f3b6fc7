//! `multipart/mixed` batch codec.
//!
//! Each sub-request is wrapped in an `application/http` part holding a full
//! HTTP/1.1 request. The reply carries one `application/http` part per
//! sub-request, in request order, each holding a full HTTP/1.1 response.

use uuid::Uuid;

use crate::types::{HttpRequest, HttpResponse, TransportError};

/// A fresh multipart boundary.
pub fn new_boundary() -> String {
    format!("__END_OF_PART__{}__", Uuid::now_v7().simple())
}

/// `Content-Type` header for a batch body using `boundary`.
pub fn content_type(boundary: &str) -> String {
    format!("multipart/mixed; boundary={boundary}")
}

/// Encode `requests` as a multipart body.
pub fn encode_batch(requests: &[HttpRequest], boundary: &str) -> String {
    let mut out = String::new();
    for (index, request) in requests.iter().enumerate() {
        let sub_request = encode_sub_request(request);
        out.push_str(&format!("--{boundary}\r\n"));
        out.push_str(&format!("Content-Length: {}\r\n", sub_request.len()));
        out.push_str("Content-Type: application/http\r\n");
        out.push_str(&format!("Content-ID: {}\r\n", index + 1));
        out.push_str("Content-Transfer-Encoding: binary\r\n\r\n");
        out.push_str(&sub_request);
        out.push_str("\r\n");
    }
    out.push_str(&format!("--{boundary}--\r\n"));
    out
}

fn encode_sub_request(request: &HttpRequest) -> String {
    let body = request.body.as_ref().map(ToString::to_string).unwrap_or_default();
    let mut out = format!("{} {} HTTP/1.1\r\n", request.method, request.url);
    out.push_str(&format!("Content-Length: {}\r\n", body.len()));
    out.push_str("Content-Type: application/json; charset=UTF-8\r\n");
    for (name, value) in &request.headers {
        out.push_str(&format!("{name}: {value}\r\n"));
    }
    out.push_str("\r\n");
    out.push_str(&body);
    out
}

/// Boundary parameter of a multipart `Content-Type`, if it is one.
pub fn multipart_boundary(content_type: &str) -> Option<&str> {
    let mut params = content_type.split(';').map(str::trim);
    let mime = params.next()?;
    if !mime.to_ascii_lowercase().starts_with("multipart/") {
        return None;
    }
    params
        .find_map(|p| p.strip_prefix("boundary="))
        .map(|b| b.trim_matches('"'))
        .filter(|b| !b.is_empty())
}

/// Decode a multipart reply into one response per part.
pub fn decode_batch(boundary: &str, body: &str) -> Result<Vec<HttpResponse>, TransportError> {
    let delimiter = format!("--{boundary}");
    let mut parts = body.split(delimiter.as_str());
    // preamble
    let _ = parts.next();

    let mut responses = Vec::new();
    for part in parts {
        if part.starts_with("--") {
            break;
        }
        let part = part.trim_start_matches(['\r', '\n']);
        if part.trim().is_empty() {
            continue;
        }
        let (_, http) = split_head(part)
            .ok_or_else(|| TransportError::Malformed("part without headers".into()))?;
        responses.push(decode_sub_response(http)?);
    }
    Ok(responses)
}

fn decode_sub_response(http: &str) -> Result<HttpResponse, TransportError> {
    let (head, body) = split_head(http).unwrap_or((http, ""));
    let mut lines = head.lines();
    let status_line = lines
        .next()
        .ok_or_else(|| TransportError::Malformed("empty part".into()))?;
    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| TransportError::Malformed(format!("bad status line: {status_line}")))?;
    let content_type = lines.find_map(|line| {
        let (name, value) = line.split_once(':')?;
        name.trim()
            .eq_ignore_ascii_case("content-type")
            .then(|| value.trim().to_string())
    });
    Ok(HttpResponse {
        status,
        content_type,
        body: body.trim_end_matches(['\r', '\n']).to_string(),
    })
}

/// Split a header block from what follows the first blank line.
fn split_head(s: &str) -> Option<(&str, &str)> {
    s.split_once("\r\n\r\n").or_else(|| s.split_once("\n\n"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
