// Static responder for stored artifacts, with byte-range support.

use std::io::SeekFrom;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, response::Builder, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, error};

use super::handler::SharedIngestor;
use crate::store::naming::MANIFEST_EXTENSION;
use crate::store::StoredFile;

/// Range request forms the static responder honors.
#[derive(Debug, PartialEq, Eq)]
enum ParsedRange {
    StartEnd {
        start: u64,
        end_inclusive: Option<u64>,
    },
    Suffix {
        len: u64,
    },
}

/// Byte span `[start, end)` to send, and whether it is a partial response.
#[derive(Debug, PartialEq, Eq)]
struct Span {
    start: u64,
    end: u64,
    partial: bool,
}

/// Parse the Range header of a `/files/{filename}` request.
/// Supports:
/// - bytes=start-end
/// - bytes=start-
/// - bytes=-suffix_len
fn parse_range_header(value: &str) -> Option<ParsedRange> {
    let value = value.trim();
    let rest = value.strip_prefix("bytes=")?;
    let mut parts = rest.splitn(2, '-');
    let start_str = parts.next()?.trim();
    let end_str = parts.next()?.trim();

    if start_str.is_empty() {
        let len: u64 = end_str.parse().ok()?;
        if len == 0 {
            return None;
        }
        Some(ParsedRange::Suffix { len })
    } else {
        let start: u64 = start_str.parse().ok()?;
        let end_inclusive = if end_str.is_empty() {
            None
        } else {
            Some(end_str.parse::<u64>().ok()?)
        };
        Some(ParsedRange::StartEnd {
            start,
            end_inclusive,
        })
    }
}

/// Resolve a parsed range against the file size. `None` means unsatisfiable.
fn resolve_span(range: Option<ParsedRange>, total: u64) -> Option<Span> {
    match range {
        None => Some(Span {
            start: 0,
            end: total,
            partial: false,
        }),
        Some(ParsedRange::StartEnd {
            start,
            end_inclusive,
        }) => {
            // Inclusive end in HTTP Range → exclusive end.
            let end = end_inclusive.map_or(total, |e| e.saturating_add(1).min(total));
            if start >= total || end <= start {
                return None;
            }
            Some(Span {
                start,
                end,
                partial: true,
            })
        }
        Some(ParsedRange::Suffix { len }) => {
            if total == 0 {
                return None;
            }
            Some(Span {
                start: total.saturating_sub(len),
                end: total,
                partial: true,
            })
        }
    }
}

fn content_type_for(filename: &str) -> &'static str {
    match filename.rsplit_once('.') {
        Some((_, ext)) if ext.eq_ignore_ascii_case(MANIFEST_EXTENSION) => "application/xml",
        _ => "application/octet-stream",
    }
}

async fn lookup(ingestor: &SharedIngestor, filename: &str) -> Result<StoredFile, Response> {
    match ingestor.store().open(filename).await {
        Ok(Some(stored)) => Ok(stored),
        Ok(None) => Err((StatusCode::NOT_FOUND, "file not found").into_response()),
        Err(e) => {
            error!("open {} failed: {}", filename, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR.into_response())
        }
    }
}

fn range_of(headers: &HeaderMap) -> Option<ParsedRange> {
    headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_range_header)
}

fn unsatisfiable(total: u64) -> Response {
    (
        StatusCode::RANGE_NOT_SATISFIABLE,
        [(header::CONTENT_RANGE, format!("bytes */{}", total))],
        "range not satisfiable",
    )
        .into_response()
}

fn build(filename: &str, span: &Span, total: u64, body: Body) -> Response {
    let status = if span.partial {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };
    let mut builder = Builder::new()
        .status(status)
        .header(header::CONTENT_TYPE, content_type_for(filename))
        .header(header::CONTENT_LENGTH, span.end - span.start)
        .header(header::ACCEPT_RANGES, "bytes");
    if span.partial {
        // Content-Range: bytes start-end/total (end is inclusive in HTTP).
        builder = builder.header(
            header::CONTENT_RANGE,
            format!("bytes {}-{}/{}", span.start, span.end - 1, total),
        );
    }
    builder.body(body).unwrap_or_else(|e| {
        error!("response for {} failed: {}", filename, e);
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    })
}

/// GET /files/{filename}: stream a stored archive or manifest.
pub(super) async fn file_handler(
    State(ingestor): State<SharedIngestor>,
    Path(filename): Path<String>,
    headers: HeaderMap,
) -> Response {
    let stored = match lookup(&ingestor, &filename).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let total = stored.len;
    let Some(span) = resolve_span(range_of(&headers), total) else {
        return unsatisfiable(total);
    };

    debug!(
        "file request {} range=[{}, {}) partial={}",
        filename, span.start, span.end, span.partial
    );

    let mut file = stored.file;
    if span.start > 0 {
        if let Err(e) = file.seek(SeekFrom::Start(span.start)).await {
            error!("seek {} failed: {}", filename, e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }
    let body = Body::from_stream(ReaderStream::new(file.take(span.end - span.start)));
    build(&filename, &span, total, body)
}

/// HEAD /files/{filename}: return headers only.
pub(super) async fn head_handler(
    State(ingestor): State<SharedIngestor>,
    Path(filename): Path<String>,
    headers: HeaderMap,
) -> Response {
    let stored = match lookup(&ingestor, &filename).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let total = stored.len;
    match resolve_span(range_of(&headers), total) {
        Some(span) => build(&filename, &span, total, Body::empty()),
        None => unsatisfiable(total),
    }
}
