//! File classification by extension.
//!
//! The extension tables are configuration data: adding a format means
//! appending to a slice, never touching control flow.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Audio sample extensions.
const SAMPLE_EXTENSIONS: &[&str] = &[".wav", ".mp3", ".flac", ".aiff", ".aif", ".ogg", ".m4a"];
/// DAW project file extensions.
const PROJECT_EXTENSIONS: &[&str] = &[".flp"];
/// MIDI file extensions.
const MIDI_EXTENSIONS: &[&str] = &[".mid", ".midi"];
/// Synth preset extensions.
const PRESET_EXTENSIONS: &[&str] = &[".fst", ".nmsv", ".sylenth1", ".serum", ".fxp", ".vital"];

/// Semantic kind of an indexed file.
///
/// `Kickchain` has no extension mapping; records with that kind only arise
/// from dedicated import surfaces outside this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Sample,
    Project,
    Midi,
    Preset,
    Kickchain,
}

impl FileKind {
    /// Classify a file extension (leading dot included, any case).
    ///
    /// Returns `None` for unsupported extensions; such files never become
    /// records.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        if SAMPLE_EXTENSIONS.contains(&ext.as_str()) {
            Some(FileKind::Sample)
        } else if PROJECT_EXTENSIONS.contains(&ext.as_str()) {
            Some(FileKind::Project)
        } else if MIDI_EXTENSIONS.contains(&ext.as_str()) {
            Some(FileKind::Midi)
        } else if PRESET_EXTENSIONS.contains(&ext.as_str()) {
            Some(FileKind::Preset)
        } else {
            None
        }
    }

    /// Parse the stored name form produced by [`FileKind::as_str`].
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sample" => Some(FileKind::Sample),
            "project" => Some(FileKind::Project),
            "midi" => Some(FileKind::Midi),
            "preset" => Some(FileKind::Preset),
            "kickchain" => Some(FileKind::Kickchain),
            _ => None,
        }
    }

    /// Stored/wire name for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Sample => "sample",
            FileKind::Project => "project",
            FileKind::Midi => "midi",
            FileKind::Preset => "preset",
            FileKind::Kickchain => "kickchain",
        }
    }
}

/// Classify a path by its extension.
///
/// Returns the kind and the normalized (lowercase, dot-prefixed) extension,
/// or `None` when the path has no extension or an unsupported one.
pub fn classify_path(path: &Path) -> Option<(FileKind, String)> {
    let ext = path.extension()?.to_str()?;
    let ext = format!(".{}", ext.to_ascii_lowercase());
    FileKind::from_extension(&ext).map(|kind| (kind, ext))
}
