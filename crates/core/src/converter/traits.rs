//! Trait definitions for the converter module.

use async_trait::async_trait;
use std::path::Path;

use super::error::EncodeError;

/// An encoder adapter wrapping one external codec.
///
/// `P` is the parameter record for a single attempt. Implementations must not
/// retry internally and must not carry state between calls: the search engine
/// invokes `encode` once per ladder candidate.
#[async_trait]
pub trait Encoder<P>: Send + Sync
where
    P: Send + Sync,
{
    /// Returns the name of this encoder implementation.
    fn name(&self) -> &str;

    /// Encodes `source` into `destination` with the given parameters.
    ///
    /// Returns the number of bytes written to `destination`.
    async fn encode(&self, source: &Path, destination: &Path, params: &P)
        -> Result<u64, EncodeError>;
}
