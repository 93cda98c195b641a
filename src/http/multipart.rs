//! `multipart/form-data` body parsing
//!
//! The whole body is already buffered, so parsing is a single pass over a
//! byte slice that splits on the boundary delimiter.

use std::collections::HashMap;

use thiserror::Error;

/// Parts beyond this count are rejected
const MAX_PARTS: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MultipartError {
    #[error("content type is not multipart/form-data")]
    NotMultipart,
    #[error("missing multipart boundary")]
    MissingBoundary,
    #[error("unexpected end of multipart body")]
    UnexpectedEof,
    #[error("malformed multipart body: {0}")]
    Malformed(&'static str),
    #[error("part is missing Content-Disposition")]
    MissingContentDisposition,
    #[error("Content-Disposition has no name")]
    MissingName,
    #[error("uploaded file is {size} bytes (max: {max})")]
    FileTooLarge { size: usize, max: usize },
    #[error("too many parts (max: {MAX_PARTS})")]
    TooManyParts,
}

/// One decoded body part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub name: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl Part {
    pub const fn is_file(&self) -> bool {
        self.filename.is_some()
    }
}

/// Extract the boundary parameter from a `Content-Type` value.
pub fn parse_boundary(content_type: &str) -> Result<String, MultipartError> {
    let mut params = content_type.split(';');
    let media_type = params.next().unwrap_or_default().trim();
    if !media_type.eq_ignore_ascii_case("multipart/form-data") {
        return Err(MultipartError::NotMultipart);
    }

    for param in params {
        let Some((key, value)) = param.trim().split_once('=') else {
            continue;
        };
        if key.trim().eq_ignore_ascii_case("boundary") {
            let boundary = unquote(value);
            if boundary.is_empty() {
                return Err(MultipartError::MissingBoundary);
            }
            return Ok(boundary);
        }
    }

    Err(MultipartError::MissingBoundary)
}

pub struct MultipartParser {
    delimiter: Vec<u8>,
    max_file_size: usize,
}

impl MultipartParser {
    pub fn new(boundary: &str, max_file_size: usize) -> Self {
        Self {
            delimiter: format!("--{boundary}").into_bytes(),
            max_file_size,
        }
    }

    /// Split `body` into parts, in order.
    pub fn parse(&self, body: &[u8]) -> Result<Vec<Part>, MultipartError> {
        let mut parts = Vec::new();
        let mut pos = self.find_delimiter(body, 0)?;

        loop {
            let after = pos + self.delimiter.len();
            // Closing delimiter `--boundary--`
            if body.get(after..after + 2) == Some(b"--".as_slice()) {
                break;
            }
            if parts.len() == MAX_PARTS {
                return Err(MultipartError::TooManyParts);
            }

            match body.get(after..after + 2) {
                Some(b"\r\n") => {}
                Some(_) => return Err(MultipartError::Malformed("expected CRLF after boundary")),
                None => return Err(MultipartError::UnexpectedEof),
            }

            let (headers, data_start) = parse_part_headers(body, after + 2)?;
            let disposition = headers
                .get("content-disposition")
                .ok_or(MultipartError::MissingContentDisposition)?;
            let (name, filename) = parse_content_disposition(disposition)?;

            let next = self.find_delimiter(body, data_start)?;
            let data_end = if next >= data_start + 2 && &body[next - 2..next] == b"\r\n" {
                next - 2
            } else {
                next
            };
            let data = &body[data_start..data_end];

            if filename.is_some() && data.len() > self.max_file_size {
                return Err(MultipartError::FileTooLarge {
                    size: data.len(),
                    max: self.max_file_size,
                });
            }

            parts.push(Part {
                name,
                filename,
                content_type: headers.get("content-type").cloned(),
                data: data.to_vec(),
            });
            pos = next;
        }

        Ok(parts)
    }

    fn find_delimiter(&self, data: &[u8], start: usize) -> Result<usize, MultipartError> {
        data.get(start..)
            .and_then(|tail| {
                tail.windows(self.delimiter.len())
                    .position(|w| w == self.delimiter.as_slice())
            })
            .map(|offset| start + offset)
            .ok_or(MultipartError::UnexpectedEof)
    }
}

/// Read header lines up to the blank line. Returns lowercase names and the
/// offset where the part data begins.
fn parse_part_headers(
    data: &[u8],
    start: usize,
) -> Result<(HashMap<String, String>, usize), MultipartError> {
    let mut headers = HashMap::new();
    let mut pos = start;

    loop {
        let line_end = find_crlf(data, pos)?;
        let line = &data[pos..line_end];
        if line.is_empty() {
            return Ok((headers, line_end + 2));
        }

        let line = std::str::from_utf8(line)
            .map_err(|_| MultipartError::Malformed("part header is not UTF-8"))?;
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
        pos = line_end + 2;
    }
}

fn find_crlf(data: &[u8], start: usize) -> Result<usize, MultipartError> {
    data.get(start..)
        .and_then(|tail| tail.windows(2).position(|w| w == b"\r\n"))
        .map(|offset| start + offset)
        .ok_or(MultipartError::UnexpectedEof)
}

/// `form-data; name="field"; filename="a.txt"` -> `("field", Some("a.txt"))`
fn parse_content_disposition(value: &str) -> Result<(String, Option<String>), MultipartError> {
    let mut name = None;
    let mut filename = None;

    for param in value.split(';').skip(1) {
        let Some((key, raw)) = param.trim().split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "name" => name = Some(unquote(raw)),
            "filename" => filename = Some(unquote(raw)),
            _ => {}
        }
    }

    let name = name.ok_or(MultipartError::MissingName)?;
    Ok((name, filename))
}

fn unquote(s: &str) -> String {
    let s = s.trim();
    s.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(s)
        .to_string()
}
