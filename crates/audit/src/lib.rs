#![deny(unused)]
//! Audit sinks for Enact.
//!
//! Every sink implements [`enact_core::Auditor`] and is best-effort: the
//! engine isolates sink failures and never buffers or retries on their
//! behalf. Deployers needing durability compose their own queueing sink.
//!
//! Built-ins:
//! - [`JsonLineAuditor`]: one JSON object per line, appended to a file
//! - [`HttpAuditor`]: POST to a webhook or log collector
//! - [`SyslogAuditor`]: RFC 5424 over UDP or TCP
//! - [`CloudLogAuditor`]: batched writes with sequence-token discipline

pub mod cloud;
pub mod http;
pub mod jsonl;
pub mod syslog;

pub use cloud::{CloudLogAuditor, HttpLogStreamClient, LogEvent, LogStreamClient};
pub use http::HttpAuditor;
pub use jsonl::JsonLineAuditor;
pub use syslog::{SyslogAuditor, SyslogTransport};
