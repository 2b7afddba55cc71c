//! Structured error types for the drystack engine.
//!
//! These never cross the public surface of the core: a failed probe
//! degrades to the fallback dimension, a failed fetch degrades to an
//! empty sequence. The types exist for the seams where hosts plug in
//! transports and probe sources, so *their* failures have a shape.

use thiserror::Error;

/// Failure of a single dimension probe. Always absorbed into
/// [`crate::model::FALLBACK_DIMENSION`] by the prober.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The probe source could not produce the asset bytes.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The bytes were fetched but are not a decodable image.
    #[error("decode error: {0}")]
    Decode(String),

    /// The source string was not a data URI, base64 payload, or path.
    #[error("unsupported image source: {0}")]
    UnsupportedSource(String),
}

/// Failure of the byte transport backing a probe source or gallery
/// source. Hosts map their HTTP/file errors into this.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The remote end answered with a non-success status.
    #[error("request failed with status {0}")]
    Status(u16),

    /// The request never completed (connection, DNS, interrupted read).
    #[error("request failed: {0}")]
    Io(String),
}
