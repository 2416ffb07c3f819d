//! Heuristic tag suggestions from file names and folder structure.
//!
//! Best-effort only: suggestions come from substring matches against the
//! filename and its parent directory, plus a BPM figure embedded in the
//! filename. The caller decides whether to apply or merely surface them,
//! and deduplicates at insert time.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

/// Genre keywords, matched against the filename and the parent directory.
const GENRE_KEYWORDS: &[(&str, &str)] = &[
    ("hardstyle", "Hardstyle"),
    ("rawstyle", "Rawstyle"),
    ("raw", "Rawstyle"),
    ("hardcore", "Hardcore"),
    ("uptempo", "Uptempo"),
    ("euphoric", "Euphoric"),
    ("frenchcore", "Frenchcore"),
];

/// Instrument-role keywords, matched against the filename only.
const INSTRUMENT_KEYWORDS: &[(&str, &str)] = &[
    ("kick", "Kick"),
    ("lead", "Lead"),
    ("screech", "Screech"),
    ("atmosphere", "Atmosphere"),
    ("atmo", "Atmosphere"),
    ("vocal", "Vocal"),
    ("fx", "FX"),
    ("effect", "FX"),
];

/// Inclusive BPM ranges mapped to genre tags. Ranges overlap, so one BPM
/// can contribute several tags.
const BPM_RANGE_TAGS: &[(u32, u32, &str)] = &[
    (140, 155, "Hardstyle"),
    (150, 160, "Rawstyle"),
    (160, 180, "Hardcore"),
    (180, u32::MAX, "Uptempo"),
];

/// Three digits followed by an optional-whitespace "bpm" marker.
static BPM_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d{3})\s*bpm").expect("valid bpm regex"));

/// Derive candidate tag names for a file path.
///
/// The returned list is unordered and may contain duplicates.
pub fn suggest_tags(path: &Path) -> Vec<String> {
    let mut tags = Vec::new();

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let parent = path
        .parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    for (keyword, tag) in GENRE_KEYWORDS {
        if filename.contains(keyword) || parent.contains(keyword) {
            tags.push((*tag).to_string());
        }
    }

    for (keyword, tag) in INSTRUMENT_KEYWORDS {
        if filename.contains(keyword) {
            tags.push((*tag).to_string());
        }
    }

    if let Some(bpm) = parse_bpm(&filename) {
        for (lo, hi, tag) in BPM_RANGE_TAGS {
            if bpm >= *lo && bpm <= *hi {
                tags.push((*tag).to_string());
            }
        }
    }

    tags
}

/// Extract a three-digit BPM figure from a lowercased filename, if present.
fn parse_bpm(filename: &str) -> Option<u32> {
    BPM_PATTERN
        .captures(filename)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn suggest(path: &str) -> Vec<String> {
        suggest_tags(&PathBuf::from(path))
    }

    #[test]
    fn test_keyword_and_bpm_overlap() {
        // 150 sits in both the Hardstyle (140-155) and Rawstyle (150-160)
        // ranges, on top of the two keyword hits.
        let tags = suggest("/packs/Kick_Hardstyle_150bpm.wav");
        assert!(tags.contains(&"Kick".to_string()));
        assert!(tags.contains(&"Hardstyle".to_string()));
        assert!(tags.contains(&"Rawstyle".to_string()));
    }

    #[test]
    fn test_parent_directory_contributes_genres() {
        let tags = suggest("/packs/Uptempo/punchy_01.wav");
        assert!(tags.contains(&"Uptempo".to_string()));
    }

    #[test]
    fn test_instrument_keywords_filename_only() {
        let tags = suggest("/packs/Kick/ambient_pad.wav");
        assert!(!tags.contains(&"Kick".to_string()));
    }

    #[test]
    fn test_bpm_marker_with_space() {
        let tags = suggest("/loops/stomper 170 BPM.wav");
        assert!(tags.contains(&"Hardcore".to_string()));
        assert!(!tags.contains(&"Uptempo".to_string()));
    }

    #[test]
    fn test_bpm_at_uptempo_threshold() {
        let tags = suggest("/loops/gabber_180bpm.wav");
        assert!(tags.contains(&"Uptempo".to_string()));
        assert!(tags.contains(&"Hardcore".to_string()));
    }

    #[test]
    fn test_two_digit_figure_ignored() {
        assert!(suggest("/loops/slow_90bpm.wav").is_empty());
    }

    #[test]
    fn test_duplicates_allowed() {
        // "raw" keyword and 155bpm range both yield Rawstyle; dedup is the
        // caller's job.
        let tags = suggest("/packs/raw_155bpm.wav");
        let raw_count = tags.iter().filter(|t| *t == "Rawstyle").count();
        assert!(raw_count >= 2);
    }

    #[test]
    fn test_no_match() {
        assert!(suggest("/misc/field_recording.wav").is_empty());
    }
}
