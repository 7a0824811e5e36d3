//! Range header resolution
//!
//! Lenient `bytes=start-end` parsing with the normalization audio
//! players expect: a missing or unparseable start becomes 0, a missing
//! or out-of-bounds end becomes the last byte, and only a start beyond
//! the object is unsatisfiable.

use crate::provider::ByteRange;

/// How a request's Range header maps onto an object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOutcome {
    /// Serve the whole object with 200.
    Full,
    /// Serve the given slice with 206.
    Partial { range: ByteRange, size: u64 },
    /// Reply 416 with `Content-Range: bytes */{size}`.
    Unsatisfiable { size: u64 },
}

/// Resolve a Range header against the object size.
///
/// Without a header, or when the backend does not report a size, the
/// whole object is served.
pub fn resolve(header: Option<&str>, size: Option<u64>) -> RangeOutcome {
    let (header, size) = match (header, size) {
        (Some(header), Some(size)) => (header, size),
        _ => return RangeOutcome::Full,
    };

    let spec = header.strip_prefix("bytes=").unwrap_or(header);
    let (start_part, end_part) = spec.split_once('-').unwrap_or((spec, ""));

    let start = start_part.trim().parse::<u64>().unwrap_or(0);
    if start >= size {
        return RangeOutcome::Unsatisfiable { size };
    }

    // A multi-range header ("bytes=0-1,5-6") lands here with an
    // unparseable end: the first start is kept and the slice runs to
    // the last byte.
    let end = end_part
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|end| *end >= start && *end < size)
        .unwrap_or(size - 1);

    RangeOutcome::Partial {
        range: ByteRange { start, end },
        size,
    }
}
