//! HTTP protocol layer module
//!
//! Re-derives the protocol algorithms the emulation relies on: status and MIME
//! tables, entity tags, conditional requests, byte ranges, content negotiation
//! and cookies. Decoupled from the transfer state machine.

pub mod cache;
pub mod cookie;
pub mod date;
pub mod etag;
pub mod mime;
pub mod negotiate;
pub mod range;
pub mod response;
pub mod status;

// Re-export commonly used types
pub use cache::{is_fresh, is_precondition_failed, is_range_fresh, CachePolicy, Validators};
pub use etag::{compute_for, compute_for_stat, EntityTag};
pub use range::{parse_range_header, ByteRange, RangeParseResult, RangeSet};
