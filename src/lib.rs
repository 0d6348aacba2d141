//! HTTP semantics emulation engine
//!
//! Reproduces the request/response behaviour of a web framework without a
//! socket: status and MIME tables, entity tags, conditional requests, byte
//! ranges, content negotiation and cookies, plus a state-machine driven file
//! transfer that streams resources from a pluggable store into an in-memory
//! response.
//!
//! ```no_run
//! use httpsim::config::SendOptions;
//! use httpsim::context::{RequestContext, ResponseContext};
//! use httpsim::transfer::{EventLog, FsStore, TransferPipeline};
//!
//! # async fn demo() -> httpsim::error::Result<()> {
//! let options = SendOptions { root: Some("public".into()), ..SendOptions::default() };
//! let pipeline = TransferPipeline::new(FsStore::new(), options)?;
//!
//! let req = RequestContext::get("/index.html").with_header("range", "bytes=0-99")?;
//! let mut res = ResponseContext::new();
//! let outcome = pipeline.transfer(&req, &mut res, &mut EventLog::new()).await;
//! println!("{} ({} bytes)", outcome.status, outcome.bytes_sent);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod logger;
pub mod transfer;

pub use error::{Error, Result, TransferError};
