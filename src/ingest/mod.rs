//! Landmark ingestion sources.
//!
//! Hand landmark extraction from camera images happens upstream; sources here
//! deliver ready-made `LandmarkFrame`s to the live producer:
//! - `stub://...`: synthetic hand alternating between two poses (testing)
//! - local file path: JSON lines, one frame of 21 `[x, y]` pairs per line
//!
//! Network schemes are rejected.

mod jsonl;
mod stub;

pub use jsonl::JsonLinesSource;
pub use stub::StubSource;

use anyhow::{anyhow, Result};

use crate::landmark::LandmarkFrame;

/// Statistics for a landmark source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub url: String,
}

pub trait LandmarkSource: Send {
    /// Open the underlying stream.
    fn connect(&mut self) -> Result<()> {
        Ok(())
    }

    /// Next frame; `Ok(None)` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<LandmarkFrame>>;

    fn is_healthy(&self) -> bool {
        true
    }

    fn stats(&self) -> SourceStats;
}

/// Pick a source implementation for `url`.
pub fn open_source(url: &str) -> Result<Box<dyn LandmarkSource>> {
    let url = url.trim();
    if url.is_empty() {
        return Err(anyhow!("landmark source url is empty"));
    }
    if url.starts_with("stub://") {
        return Ok(Box::new(StubSource::new(url)));
    }
    if url.contains("://") {
        return Err(anyhow!(
            "unsupported landmark source '{}' (expected stub:// or a local file path)",
            url
        ));
    }
    Ok(Box::new(JsonLinesSource::new(url)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_source_dispatches_by_scheme() {
        let mut stub = open_source("stub://hand").unwrap();
        stub.connect().unwrap();
        assert!(stub.next_frame().unwrap().is_some());
        assert_eq!(stub.stats().url, "stub://hand");

        assert!(open_source("rtsp://camera/stream").is_err());
        assert!(open_source("  ").is_err());
        assert!(open_source("/tmp/landmarks.jsonl").is_ok());
    }
}
