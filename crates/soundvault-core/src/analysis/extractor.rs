//! Audio metadata extraction boundary.
//!
//! The library never decodes audio itself. Consumers inject an extractor
//! (typically backed by a tagging/decoding library or an external tool)
//! behind this trait; the enricher only depends on the trait.

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

/// Structured audio attributes for one file.
///
/// Every field is optional: extractors report what they can and leave the
/// rest unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioMetadata {
    /// Duration in seconds.
    pub duration: Option<f64>,
    /// Sample rate in Hz.
    pub sample_rate: Option<u32>,
    /// Bits per sample.
    pub bit_depth: Option<u16>,
    /// Channel count.
    pub channels: Option<u16>,
    /// Tempo in beats per minute.
    pub bpm: Option<f64>,
    /// Pitch class, e.g. "C" or "D#".
    pub detected_key: Option<String>,
    /// "major" or "minor".
    pub detected_scale: Option<String>,
}

/// External collaborator that extracts audio attributes from a file.
///
/// `Ok(None)` means the extractor ran but could not produce metadata for
/// this file; both `Err` and `Ok(None)` count as a per-file enrichment
/// failure, never as a batch failure.
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    async fn extract(&self, path: &Path) -> Result<Option<AudioMetadata>>;
}

static KEY_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-G][#b]?)").expect("valid key regex"));

/// Reduce a raw key string like "D# minor" to its pitch class ("D#").
pub fn normalize_key(raw: &str) -> Option<String> {
    KEY_PREFIX
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Extract the scale ("major"/"minor") from a raw key string.
pub fn normalize_scale(raw: &str) -> Option<&'static str> {
    let lower = raw.to_lowercase();
    if lower.contains("minor") {
        Some("minor")
    } else if lower.contains("major") {
        Some("major")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("C major"), Some("C".to_string()));
        assert_eq!(normalize_key("D# minor"), Some("D#".to_string()));
        assert_eq!(normalize_key("Bb"), Some("Bb".to_string()));
        assert_eq!(normalize_key("unknown"), None);
        assert_eq!(normalize_key(""), None);
    }

    #[test]
    fn test_normalize_scale() {
        assert_eq!(normalize_scale("D# Minor"), Some("minor"));
        assert_eq!(normalize_scale("C major"), Some("major"));
        assert_eq!(normalize_scale("C"), None);
    }
}
