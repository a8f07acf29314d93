//! Ranged file delivery
//!
//! Works out status and headers for a download and hands back the byte
//! span to send. The caller streams the span in bounded chunks.

use log::info;
use std::io::{self, SeekFrom};
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, Take};

use crate::error::{FileManagerError, PathError, RangeError};
use crate::storage::validation::Root;

/// Default read size for streamed bodies
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

pub const STATUS_OK: u16 = 200;
pub const STATUS_PARTIAL_CONTENT: u16 = 206;
pub const STATUS_RANGE_NOT_SATISFIABLE: u16 = 416;

/// Everything needed to answer a download request
#[derive(Debug)]
pub struct StreamPlan {
    pub status: u16,
    /// Lowercase header names with their values
    pub headers: Vec<(&'static str, String)>,
    /// `None` for an unsatisfiable range
    pub body: Option<ByteSpan>,
}

/// A span of a confined file
#[derive(Debug, Clone)]
pub struct ByteSpan {
    path: PathBuf,
    pub start: u64,
    pub length: u64,
}

impl StreamPlan {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }
}

impl ByteSpan {
    /// Opens the file positioned at `start`, limited to `length` bytes.
    pub async fn open(&self) -> io::Result<Take<File>> {
        let mut file = File::open(&self.path).await?;
        file.seek(SeekFrom::Start(self.start)).await?;
        Ok(file.take(self.length))
    }
}

/// Plans the response for a download of `relative`, honoring a `Range`
/// header when one is given. Only the first range of a multi-range request
/// is served.
pub fn prepare_stream(
    root: &Root,
    relative: &str,
    range: Option<&str>,
) -> Result<StreamPlan, FileManagerError> {
    let file = root.resolve(relative)?;
    let metadata = std::fs::metadata(file.as_path()).map_err(PathError::Io)?;
    if metadata.is_dir() {
        return Err(PathError::NotFound(file.relative().to_string()).into());
    }

    let total = metadata.len();
    let file_name = file.name().unwrap_or_default();
    let content_type = mime_guess::from_path(file.as_path())
        .first_or_octet_stream()
        .to_string();

    let (status, start, end) = match range {
        None => (STATUS_OK, 0, total.checked_sub(1)),
        Some(header) => match parse_range(header, total) {
            Ok((start, end)) => (STATUS_PARTIAL_CONTENT, start, Some(end)),
            Err(RangeError::NotSatisfiable { size }) => {
                info!("Unsatisfiable range {header:?} for {:?}", file.relative());
                return Ok(StreamPlan {
                    status: STATUS_RANGE_NOT_SATISFIABLE,
                    headers: vec![
                        ("content-range", format!("bytes */{size}")),
                        ("accept-ranges", "bytes".to_string()),
                    ],
                    body: None,
                });
            }
            Err(e) => return Err(e.into()),
        },
    };

    let length = end.map_or(0, |end| end - start + 1);
    let mut headers = vec![
        ("content-type", content_type),
        ("content-length", length.to_string()),
        (
            "content-disposition",
            format!("inline; filename=\"{}\"", header_safe(file_name)),
        ),
        ("accept-ranges", "bytes".to_string()),
        ("cache-control", "public, must-revalidate, max-age=0".to_string()),
    ];
    if let (STATUS_PARTIAL_CONTENT, Some(end)) = (status, end) {
        headers.push(("content-range", format!("bytes {start}-{end}/{total}")));
    }

    info!(
        "Streaming {:?} ({} of {} bytes from offset {})",
        file.relative(),
        length,
        total,
        start
    );

    Ok(StreamPlan {
        status,
        headers,
        body: Some(ByteSpan {
            path: file.as_path().to_path_buf(),
            start,
            length,
        }),
    })
}

/// Parses `bytes=start-end` against a file of `size` bytes.
///
/// A missing or non-numeric start means 0, a missing end means the last
/// byte, and an end past the last byte is clamped to it.
pub fn parse_range(header: &str, size: u64) -> Result<(u64, u64), RangeError> {
    let (unit, ranges) = header
        .split_once('=')
        .ok_or_else(|| RangeError::Malformed(header.to_string()))?;
    if !unit.trim().eq_ignore_ascii_case("bytes") {
        return Err(RangeError::Malformed(header.to_string()));
    }

    let first = ranges.split(',').next().unwrap_or_default();
    let (start, end) = first.split_once('-').unwrap_or((first, ""));

    let Some(last) = size.checked_sub(1) else {
        return Err(RangeError::NotSatisfiable { size });
    };
    let start = start.trim().parse::<u64>().unwrap_or(0);
    let end = end
        .trim()
        .parse::<u64>()
        .map_or(last, |end| end.min(last));

    if start > end || start >= size {
        return Err(RangeError::NotSatisfiable { size });
    }
    Ok((start, end))
}

fn header_safe(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect()
}
