//! `multipart/form-data` parsing (RFC 2046 boundaries, RFC 7578 fields).
//!
//! # Responsibilities
//! - Extract the boundary from the request's Content-Type
//! - Split the body into parts, tolerating preamble, epilogue and bare LF
//! - Read each part's Content-Disposition (`name`, `filename`, `filename*`)
//! - Sort parts into form fields and uploaded files
//!
//! # Design Decisions
//! - All-or-nothing: any structural error discards the whole form so a
//!   truncated upload never looks like a complete one
//! - Field text honours the part charset, falling back to lossy UTF-8

use std::collections::BTreeMap;

use base64::Engine as _;
use thiserror::Error;

use crate::request::charset::decode_with_charset;
use crate::request::types::{Params, UploadedFile};

/// Content type recorded for a file part that declares none.
const DEFAULT_PART_CONTENT_TYPE: &str = "text/plain";

/// Structural problems with a multipart body.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MultipartError {
    #[error("content type has no boundary parameter")]
    MissingBoundary,

    #[error("body does not contain the opening boundary")]
    NoOpeningDelimiter,

    #[error("boundary is not followed by a line break")]
    BadDelimiterLine,

    #[error("part headers are not terminated by a blank line")]
    UnterminatedHeaders,

    #[error("body ends before the closing boundary")]
    MissingCloseDelimiter,
}

/// Fields and files of a parsed multipart body.
#[derive(Debug, Default, PartialEq)]
pub struct MultipartForm {
    pub fields: Params,
    pub files: BTreeMap<String, UploadedFile>,
}

/// Parse `body` using the boundary from the full `content_type` header value.
pub fn parse_multipart(content_type: &str, body: &[u8]) -> Result<MultipartForm, MultipartError> {
    let (_, params) = parse_header_params(content_type);
    let boundary = param(&params, "boundary")
        .filter(|b| !b.is_empty())
        .ok_or(MultipartError::MissingBoundary)?;

    let delimiter = [b"--", boundary.as_bytes()].concat();
    let mut form = MultipartForm::default();

    let mut pos = find_opening(body, &delimiter).ok_or(MultipartError::NoOpeningDelimiter)?
        + delimiter.len();

    loop {
        if body[pos..].starts_with(b"--") {
            return Ok(form);
        }
        pos = skip_delimiter_line(body, pos).ok_or(MultipartError::BadDelimiterLine)?;

        // The line break that precedes a delimiter belongs to the delimiter.
        let (part_end, next_delimiter) =
            find_next_delimiter(body, &delimiter, pos).ok_or(MultipartError::MissingCloseDelimiter)?;
        add_part(&body[pos..part_end.max(pos)], &mut form)?;
        pos = next_delimiter + delimiter.len();
    }
}

/// Position of the first delimiter that starts a line.
fn find_opening(body: &[u8], delimiter: &[u8]) -> Option<usize> {
    if body.starts_with(delimiter) {
        return Some(0);
    }
    let needle = [b"\n", delimiter].concat();
    find(body, &needle, 0).map(|i| i + 1)
}

/// Skip optional transport padding and the line break after a delimiter.
fn skip_delimiter_line(body: &[u8], mut pos: usize) -> Option<usize> {
    while pos < body.len() && matches!(body[pos], b' ' | b'\t') {
        pos += 1;
    }
    if body[pos..].starts_with(b"\r\n") {
        Some(pos + 2)
    } else if body[pos..].starts_with(b"\n") {
        Some(pos + 1)
    } else {
        None
    }
}

/// Returns (end of the current part, start of the next delimiter).
fn find_next_delimiter(body: &[u8], delimiter: &[u8], from: usize) -> Option<(usize, usize)> {
    let needle = [b"\n", delimiter].concat();
    // Start one byte back so an empty part (delimiter right after the line
    // break we just consumed) is still found.
    let newline = find(body, &needle, from.saturating_sub(1))?;
    let part_end = if newline > 0 && body[newline - 1] == b'\r' {
        newline - 1
    } else {
        newline
    };
    Some((part_end, newline + 1))
}

fn add_part(part: &[u8], form: &mut MultipartForm) -> Result<(), MultipartError> {
    if part.is_empty() {
        return Ok(());
    }
    let (head, content) = split_head(part).ok_or(MultipartError::UnterminatedHeaders)?;
    let headers = parse_part_headers(head);

    let Some(disposition) = header(&headers, "content-disposition") else {
        return Ok(());
    };
    let (_, disposition_params) = parse_header_params(disposition);
    let Some(name) = param(&disposition_params, "name") else {
        return Ok(());
    };

    let content = match header(&headers, "content-transfer-encoding") {
        Some(encoding) if encoding.trim().eq_ignore_ascii_case("base64") => {
            decode_base64(content).unwrap_or_else(|| content.to_vec())
        }
        _ => content.to_vec(),
    };

    let (media_type, type_params) = header(&headers, "content-type")
        .map(parse_header_params)
        .unwrap_or_default();

    match filename(&disposition_params) {
        Some(filename) if !filename.is_empty() => {
            let content_type = if media_type.is_empty() {
                DEFAULT_PART_CONTENT_TYPE.to_string()
            } else {
                media_type
            };
            form.files.insert(
                name,
                UploadedFile {
                    filename,
                    content_type,
                    bytes: content,
                },
            );
        }
        _ => {
            let charset = param(&type_params, "charset");
            let value = decode_with_charset(&content, charset.as_deref());
            form.fields.append(name, value);
        }
    }
    Ok(())
}

/// Split a part into header block and content at the first blank line.
fn split_head(part: &[u8]) -> Option<(&[u8], &[u8])> {
    if let Some(rest) = part.strip_prefix(b"\r\n") {
        return Some((&[], rest));
    }
    if let Some(rest) = part.strip_prefix(b"\n") {
        return Some((&[], rest));
    }
    let crlf = find(part, b"\r\n\r\n", 0).map(|i| (i, i + 4));
    let lf = find(part, b"\n\n", 0).map(|i| (i, i + 2));
    let (head_end, body_start) = match (crlf, lf) {
        (Some(a), Some(b)) => {
            if a.0 <= b.0 {
                a
            } else {
                b
            }
        }
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => return None,
    };
    Some((&part[..head_end], &part[body_start..]))
}

/// Header lines as lower-cased (name, value) pairs, with folded lines joined.
fn parse_part_headers(head: &[u8]) -> Vec<(String, String)> {
    let text = String::from_utf8_lossy(head);
    let mut headers: Vec<(String, String)> = Vec::new();
    for line in text.split('\n') {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        if line.starts_with([' ', '\t']) {
            if let Some((_, value)) = headers.last_mut() {
                value.push(' ');
                value.push_str(line.trim());
            }
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_ascii_lowercase(), value.trim().to_string()));
        }
    }
    headers
}

fn header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.as_str())
}

fn param(params: &[(String, String)], name: &str) -> Option<String> {
    params
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.clone())
}

/// `filename*` (RFC 5987 extended value) wins over `filename`.
fn filename(params: &[(String, String)]) -> Option<String> {
    if let Some(extended) = param(params, "filename*") {
        if let Some(decoded) = decode_extended_value(&extended) {
            return Some(decoded);
        }
    }
    param(params, "filename")
}

/// Decode `charset'language'percent-encoded`.
fn decode_extended_value(value: &str) -> Option<String> {
    let mut pieces = value.splitn(3, '\'');
    let charset = pieces.next()?;
    let _language = pieces.next()?;
    let encoded = pieces.next()?;
    let bytes = urlencoding::decode_binary(encoded.as_bytes());
    let charset = if charset.is_empty() { None } else { Some(charset) };
    Some(decode_with_charset(&bytes, charset))
}

fn decode_base64(content: &[u8]) -> Option<Vec<u8>> {
    let compact: Vec<u8> = content
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    base64::engine::general_purpose::STANDARD.decode(compact).ok()
}

/// Split a header value such as `form-data; name="a;b"; filename=x` into the
/// lower-cased leading token and its parameters.
///
/// Parameter names are lower-cased; quoted values are unquoted with
/// backslash escapes resolved.
pub fn parse_header_params(value: &str) -> (String, Vec<(String, String)>) {
    let mut segments = split_unquoted(value, ';').into_iter();
    let main = segments
        .next()
        .map(|s| s.trim().to_ascii_lowercase())
        .unwrap_or_default();
    let params = segments
        .filter_map(|segment| {
            let (name, raw) = segment.split_once('=')?;
            Some((name.trim().to_ascii_lowercase(), unquote(raw.trim())))
        })
        .collect();
    (main, params)
}

fn split_unquoted(value: &str, separator: char) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;
    for c in value.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => {
                current.push(c);
                escaped = true;
            }
            '"' => {
                current.push(c);
                in_quotes = !in_quotes;
            }
            c if c == separator && !in_quotes => segments.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    segments.push(current);
    segments
}

fn unquote(raw: &str) -> String {
    let Some(inner) = raw
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    else {
        return raw.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|i| i + from)
}
