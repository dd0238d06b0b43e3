//! Durable sink for job outputs.
//!
//! Objects are addressed by `/`-separated keys and published through a
//! CDN-style base URL. [`FsSink`] keeps them on the local filesystem; the
//! server exposes that directory under `/media`.

mod config;
mod error;
mod fs_sink;
mod traits;

pub use config::SinkConfig;
pub use error::SinkError;
pub use fs_sink::{validate_key, FsSink};
pub use traits::DurableSink;
