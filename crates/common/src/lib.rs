//! Common types for keyprobe

mod error;
mod redact;

pub use error::{Error, Result};
pub use redact::redact;
