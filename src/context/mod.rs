//! Request/response context module
//!
//! In-memory request and response pairs the emulation engine reads and writes,
//! plus the per-app settings that are passed in explicitly rather than held in
//! a process-wide binding.

pub mod request;
pub mod response;
pub mod send;

use serde::{Deserialize, Serialize};

pub use request::{AbortSignal, RequestContext};
pub use response::{CookieRecord, ResponseContext};
pub use send::Payload;

/// How `send` generates entity tags
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EtagMode {
    #[default]
    Weak,
    Strong,
    Disabled,
}

/// Application settings consulted by `send`/`json`
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppContext {
    pub etag: EtagMode,
    /// Indentation for JSON bodies; compact when unset
    pub json_spaces: Option<usize>,
    /// Value for `X-Powered-By`, omitted when unset
    pub powered_by: Option<String>,
}
