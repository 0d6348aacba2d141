//! HTTP Range request parsing module
//!
//! Range header parsing against a known resource length, compliant with RFC 7233.
//! Multiple range specs are supported and can be merged into a minimal set.

use std::ops::Range;

/// Inclusive byte span of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered
    #[inline]
    pub const fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Half-open window suitable for slicing and streaming
    pub const fn window(&self) -> Range<u64> {
        self.start..self.end + 1
    }

    /// `Content-Range` header value for a resource of `length` bytes
    pub fn content_range(&self, length: u64) -> String {
        format!("bytes {}-{}/{length}", self.start, self.end)
    }
}

/// Satisfiable ranges of one unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeSet {
    pub unit: String,
    pub ranges: Vec<ByteRange>,
}

/// Range header parse result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeParseResult {
    /// At least one satisfiable range
    Ranges(RangeSet),
    /// Syntactically a range, but nothing inside the resource - should return 416
    Unsatisfiable,
    /// No unit separator; ignore and serve the full content
    NotARange,
}

/// Whether a header uses the byte-range grammar (`bytes=` after optional spaces)
pub fn is_bytes_range(header: &str) -> bool {
    header.trim_start_matches(' ').starts_with("bytes=")
}

/// Parse an HTTP Range header against a resource length
///
/// Supported range specs, comma separated:
/// - `start-end` - Specific range, `end` clamped to the last byte
/// - `start-` - From start to end
/// - `-suffix` - Last suffix bytes
///
/// Unsatisfiable or non-numeric specs are dropped individually.
///
/// # Examples
/// ```
/// use httpsim::http::range::{parse_range_header, RangeParseResult};
///
/// let RangeParseResult::Ranges(set) = parse_range_header(1000, "bytes=0-99", false) else {
///     panic!("expected ranges");
/// };
/// assert_eq!(set.ranges[0].len(), 100);
///
/// assert_eq!(parse_range_header(1000, "0-99", false), RangeParseResult::NotARange);
/// assert_eq!(parse_range_header(1000, "bytes=2000-", false), RangeParseResult::Unsatisfiable);
/// ```
pub fn parse_range_header(length: u64, header: &str, combine: bool) -> RangeParseResult {
    let Some((unit, specs)) = header.split_once('=') else {
        return RangeParseResult::NotARange;
    };

    let ranges: Vec<ByteRange> = specs
        .split(',')
        .filter_map(|spec| parse_spec(spec, length))
        .collect();

    if ranges.is_empty() {
        return RangeParseResult::Unsatisfiable;
    }

    let ranges = if combine { combine_ranges(&ranges) } else { ranges };

    RangeParseResult::Ranges(RangeSet {
        unit: unit.trim().to_string(),
        ranges,
    })
}

/// Parse one `start-end` spec; `None` when it should be discarded
fn parse_spec(spec: &str, length: u64) -> Option<ByteRange> {
    let (start_str, end_str) = spec.split_once('-')?;
    let (start_str, end_str) = (start_str.trim(), end_str.trim());

    let length = i128::from(length);
    let last = length - 1;

    let (start, end) = if start_str.is_empty() {
        // Suffix range: "-500" means last 500 bytes
        let suffix = parse_bound(end_str)?;
        (length - suffix, last)
    } else {
        let start = parse_bound(start_str)?;
        let end = if end_str.is_empty() {
            last
        } else {
            parse_bound(end_str)?.min(last)
        };
        (start, end)
    };

    if start < 0 || start > end {
        return None;
    }

    Some(ByteRange {
        start: u64::try_from(start).ok()?,
        end: u64::try_from(end).ok()?,
    })
}

fn parse_bound(value: &str) -> Option<i128> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

/// Merge overlapping and adjacent ranges
///
/// Ranges are sorted by `start` (ties keep their first-seen order) and swept
/// once; the result is non-overlapping and ascending.
pub fn combine_ranges(ranges: &[ByteRange]) -> Vec<ByteRange> {
    let mut ordered: Vec<(usize, ByteRange)> = ranges.iter().copied().enumerate().collect();
    ordered.sort_by_key(|(index, range)| (range.start, *index));

    let mut merged: Vec<ByteRange> = Vec::with_capacity(ordered.len());
    for (_, range) in ordered {
        match merged.last_mut() {
            Some(current) if range.start <= current.end.saturating_add(1) => {
                current.end = current.end.max(range.end);
            }
            _ => merged.push(range),
        }
    }
    merged
}
