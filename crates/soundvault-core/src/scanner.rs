//! Folder scanning and indexing.
//!
//! The orchestration per file is: classify by extension (unsupported files
//! are skipped silently), stat, hash, insert, then auto-tag per the
//! configured policy. Per-file failures are counted and never abort the
//! scan; only an unreadable root fails the invocation.

use crate::autotag::suggest_tags;
use crate::cancel::CancellationToken;
use crate::classify::classify_path;
use crate::config::ScanConfig;
use crate::error::{LibraryError, Result};
use crate::hashing::hash_file_async;
use crate::index::{now_ms, seed_category, FileRecord, LibraryIndex, NewFileRecord, TagCategory};
use crate::walker::walk_files;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Scan lifecycle state carried on progress events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Scanning,
    Complete,
    Error,
}

/// Progress event for one scan invocation.
///
/// Emitted at the start, every [`ScanConfig::PROGRESS_INTERVAL`]th file
/// (and the last), and once on completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanProgress {
    pub total: usize,
    pub indexed: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_file: Option<String>,
    pub status: ScanStatus,
}

/// What to do with heuristic tag suggestions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoTagMode {
    /// Skip the heuristic entirely.
    Off,
    /// Compute suggestions and surface them in the scan report.
    #[default]
    Suggest,
    /// Create missing tags and associate them immediately.
    Apply,
}

/// Options for one scan invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanOptions {
    /// Walk the whole subtree; false limits the scan to the root's
    /// immediate children.
    pub recursive: bool,
    pub auto_tag: AutoTagMode,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            auto_tag: AutoTagMode::Suggest,
        }
    }
}

/// Tag suggestions for one newly indexed file (suggest-only mode).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagSuggestion {
    pub file_id: i64,
    pub tags: Vec<String>,
}

/// Aggregate result of a scan invocation.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    /// Newly inserted records.
    pub indexed: usize,
    /// Files whose content hash already existed in the store.
    pub duplicates: usize,
    /// Per-file failures (unreadable, stat/hash/insert errors).
    pub errors: usize,
    pub files: Vec<FileRecord>,
    /// Populated in [`AutoTagMode::Suggest`] only.
    pub suggestions: Vec<TagSuggestion>,
}

impl ScanReport {
    fn merge(&mut self, other: ScanReport) {
        self.indexed += other.indexed;
        self.duplicates += other.duplicates;
        self.errors += other.errors;
        self.files.extend(other.files);
        self.suggestions.extend(other.suggestions);
    }
}

/// Coordinates walking, classification, hashing and insertion for one or
/// more root folders.
pub struct FolderScanner {
    index: Arc<LibraryIndex>,
}

impl FolderScanner {
    pub fn new(index: Arc<LibraryIndex>) -> Self {
        Self { index }
    }

    /// Scan one folder and index every supported file under it.
    ///
    /// Files are processed strictly sequentially in walk order. An
    /// unreadable root is a setup failure: the invocation errors and no
    /// `complete` progress event is emitted.
    pub async fn scan_folder(
        &self,
        root: &Path,
        options: &ScanOptions,
        progress_tx: Option<mpsc::Sender<ScanProgress>>,
        cancel: Option<&CancellationToken>,
    ) -> Result<ScanReport> {
        if !root.is_dir() {
            send_progress(
                &progress_tx,
                ScanProgress {
                    total: 0,
                    indexed: 0,
                    current_file: None,
                    status: ScanStatus::Error,
                },
            )
            .await;
            return Err(LibraryError::NotADirectory(root.to_path_buf()));
        }

        let candidates: Vec<PathBuf> = walk_files(root, options.recursive).collect();
        let total = candidates.len();
        info!("Scanning {} ({} candidate files)", root.display(), total);

        send_progress(
            &progress_tx,
            ScanProgress {
                total,
                indexed: 0,
                current_file: None,
                status: ScanStatus::Scanning,
            },
        )
        .await;

        let mut report = ScanReport::default();

        for (idx, path) in candidates.iter().enumerate() {
            if let Some(token) = cancel {
                token.check()?;
            }

            match self.process_file(path, options, &mut report).await {
                Ok(()) => {}
                Err(err) => {
                    report.errors += 1;
                    warn!("Error processing {}: {}", path.display(), err);
                }
            }

            if idx % ScanConfig::PROGRESS_INTERVAL == 0 || idx == total - 1 {
                let current_file = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string());
                send_progress(
                    &progress_tx,
                    ScanProgress {
                        total,
                        indexed: idx + 1,
                        current_file,
                        status: ScanStatus::Scanning,
                    },
                )
                .await;
            }
        }

        send_progress(
            &progress_tx,
            ScanProgress {
                total,
                indexed: report.indexed,
                current_file: None,
                status: ScanStatus::Complete,
            },
        )
        .await;

        info!(
            "Scan of {} complete: {} indexed, {} duplicates, {} errors",
            root.display(),
            report.indexed,
            report.duplicates,
            report.errors
        );
        Ok(report)
    }

    /// Scan multiple folders and aggregate the results.
    pub async fn scan_folders(
        &self,
        roots: &[PathBuf],
        options: &ScanOptions,
        progress_tx: Option<mpsc::Sender<ScanProgress>>,
        cancel: Option<&CancellationToken>,
    ) -> Result<ScanReport> {
        let mut combined = ScanReport::default();
        for root in roots {
            let report = self
                .scan_folder(root, options, progress_tx.clone(), cancel)
                .await?;
            combined.merge(report);
        }
        Ok(combined)
    }

    /// Classify, stat, hash and insert a single candidate file.
    ///
    /// Unsupported extensions return Ok without touching the report.
    async fn process_file(
        &self,
        path: &Path,
        options: &ScanOptions,
        report: &mut ScanReport,
    ) -> Result<()> {
        let (kind, extension) = match classify_path(path) {
            Some(classified) => classified,
            None => return Ok(()),
        };

        let metadata = std::fs::metadata(path).map_err(|e| LibraryError::io_with_path(e, path))?;
        let hash = hash_file_async(path).await?;

        // Content seen before: flag it, but the path is still indexed.
        if self.index.lookup_by_hash(&hash)?.is_some() {
            report.duplicates += 1;
            debug!("Duplicate content at {}", path.display());
        }

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let record = NewFileRecord {
            file_path: path.to_string_lossy().to_string(),
            filename,
            kind,
            file_extension: extension,
            file_size: metadata.len(),
            created_at: system_time_ms(metadata.created().ok()),
            modified_at: system_time_ms(metadata.modified().ok()),
            last_accessed: metadata.accessed().ok().map(|t| system_time_ms(Some(t))),
            hash: Some(hash),
            indexed_at: now_ms(),
        };

        let file_id = self.index.insert_file(&record)?;

        match options.auto_tag {
            AutoTagMode::Off => {}
            AutoTagMode::Suggest => {
                let tags = dedup_tags(suggest_tags(path));
                if !tags.is_empty() {
                    debug!("Tag suggestions for {}: {:?}", record.filename, tags);
                    report.suggestions.push(TagSuggestion { file_id, tags });
                }
            }
            AutoTagMode::Apply => {
                for name in dedup_tags(suggest_tags(path)) {
                    let category = seed_category(&name).or(Some(TagCategory::Custom));
                    let tag_id = self.index.ensure_tag(&name, category)?;
                    self.index.add_file_tag(file_id, tag_id)?;
                }
            }
        }

        report.indexed += 1;
        if let Some(stored) = self.index.get_file(file_id)? {
            report.files.push(stored);
        }
        Ok(())
    }
}

async fn send_progress(tx: &Option<mpsc::Sender<ScanProgress>>, progress: ScanProgress) {
    if let Some(tx) = tx {
        let _ = tx.send(progress).await;
    }
}

/// Order-preserving dedup of suggested tag names.
fn dedup_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.into_iter().filter(|t| seen.insert(t.clone())).collect()
}

fn system_time_ms(time: Option<std::time::SystemTime>) -> i64 {
    time.and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_scanner() -> (FolderScanner, Arc<LibraryIndex>, TempDir) {
        let temp = TempDir::new().unwrap();
        let index = Arc::new(LibraryIndex::new(temp.path().join("library.db")).unwrap());
        (FolderScanner::new(index.clone()), index, temp)
    }

    fn write(dir: &Path, name: &str, content: &[u8]) {
        let path = dir.join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[tokio::test]
    async fn test_scan_indexes_supported_files_only() {
        let (scanner, index, _temp) = create_scanner();
        let music = TempDir::new().unwrap();
        write(music.path(), "kick.wav", b"kick bytes");
        write(music.path(), "melody/lead.flac", b"lead bytes");
        write(music.path(), "project.flp", b"project bytes");
        write(music.path(), "readme.txt", b"not audio");

        let report = scanner
            .scan_folder(music.path(), &ScanOptions::default(), None, None)
            .await
            .unwrap();

        assert_eq!(report.indexed, 3);
        assert_eq!(report.errors, 0);
        assert_eq!(report.duplicates, 0);
        assert_eq!(report.files.len(), 3);
        for record in &report.files {
            assert!(record.hash.is_some());
            assert_eq!(record.bpm, None);
            assert_eq!(record.duration, None);
        }
        assert_eq!(index.stats().unwrap().total_files, 3);
    }

    #[tokio::test]
    async fn test_shallow_scan_skips_subdirectories() {
        let (scanner, _index, _temp) = create_scanner();
        let music = TempDir::new().unwrap();
        write(music.path(), "top.wav", b"top");
        write(music.path(), "nested/deep.wav", b"deep");

        let options = ScanOptions {
            recursive: false,
            ..Default::default()
        };
        let report = scanner
            .scan_folder(music.path(), &options, None, None)
            .await
            .unwrap();
        assert_eq!(report.indexed, 1);
    }

    #[tokio::test]
    async fn test_duplicate_content_flagged_but_inserted() {
        let (scanner, index, _temp) = create_scanner();
        let music = TempDir::new().unwrap();
        write(music.path(), "a.wav", b"same bytes");
        write(music.path(), "b.wav", b"same bytes");

        let report = scanner
            .scan_folder(music.path(), &ScanOptions::default(), None, None)
            .await
            .unwrap();

        assert_eq!(report.indexed, 2);
        assert_eq!(report.duplicates, 1);
        assert_eq!(index.stats().unwrap().total_files, 2);
    }

    #[tokio::test]
    async fn test_rescan_counts_existing_paths_as_errors() {
        let (scanner, _index, _temp) = create_scanner();
        let music = TempDir::new().unwrap();
        write(music.path(), "a.wav", b"bytes");

        scanner
            .scan_folder(music.path(), &ScanOptions::default(), None, None)
            .await
            .unwrap();
        let second = scanner
            .scan_folder(music.path(), &ScanOptions::default(), None, None)
            .await
            .unwrap();

        assert_eq!(second.indexed, 0);
        assert_eq!(second.errors, 1);
    }

    #[tokio::test]
    async fn test_missing_root_is_setup_failure() {
        let (scanner, _index, _temp) = create_scanner();
        let (tx, mut rx) = mpsc::channel(4);
        let err = scanner
            .scan_folder(
                Path::new("/nonexistent/sample/packs"),
                &ScanOptions::default(),
                Some(tx),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LibraryError::NotADirectory(_)));

        // The stream reports the failure; no complete event follows.
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status, ScanStatus::Error);
    }

    #[tokio::test]
    async fn test_progress_events() {
        let (scanner, _index, _temp) = create_scanner();
        let music = TempDir::new().unwrap();
        for i in 0..3 {
            write(music.path(), &format!("s{i}.wav"), format!("{i}").as_bytes());
        }

        let (tx, mut rx) = mpsc::channel(16);
        scanner
            .scan_folder(music.path(), &ScanOptions::default(), Some(tx), None)
            .await
            .unwrap();

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        let first = events.first().unwrap();
        assert_eq!(first.status, ScanStatus::Scanning);
        assert_eq!(first.indexed, 0);
        assert_eq!(first.total, 3);

        let last = events.last().unwrap();
        assert_eq!(last.status, ScanStatus::Complete);
        assert_eq!(last.indexed, 3);

        // Cadence events carry the current file name.
        assert!(events[1..events.len() - 1]
            .iter()
            .all(|e| e.current_file.is_some()));
    }

    #[tokio::test]
    async fn test_suggest_mode_surfaces_without_persisting() {
        let (scanner, index, _temp) = create_scanner();
        let music = TempDir::new().unwrap();
        write(music.path(), "Kick_Hardstyle_150bpm.wav", b"kick");

        let report = scanner
            .scan_folder(music.path(), &ScanOptions::default(), None, None)
            .await
            .unwrap();

        assert_eq!(report.suggestions.len(), 1);
        let tags = &report.suggestions[0].tags;
        assert!(tags.contains(&"Kick".to_string()));
        assert!(tags.contains(&"Hardstyle".to_string()));
        assert!(tags.contains(&"Rawstyle".to_string()));

        // Nothing persisted in suggest mode.
        assert!(index.file_tags(report.suggestions[0].file_id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_apply_mode_persists_tags() {
        let (scanner, index, _temp) = create_scanner();
        let music = TempDir::new().unwrap();
        write(music.path(), "Kick_Hardstyle_150bpm.wav", b"kick");

        let options = ScanOptions {
            auto_tag: AutoTagMode::Apply,
            ..Default::default()
        };
        let report = scanner
            .scan_folder(music.path(), &options, None, None)
            .await
            .unwrap();

        assert!(report.suggestions.is_empty());
        let file_id = report.files[0].id;
        let names: Vec<String> = index
            .file_tags(file_id)
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert!(names.contains(&"Kick".to_string()));
        assert!(names.contains(&"Hardstyle".to_string()));
        assert!(names.contains(&"Rawstyle".to_string()));
    }

    #[tokio::test]
    async fn test_scan_folders_aggregates() {
        let (scanner, _index, _temp) = create_scanner();
        let pack_a = TempDir::new().unwrap();
        let pack_b = TempDir::new().unwrap();
        write(pack_a.path(), "a.wav", b"aaa");
        write(pack_b.path(), "b.wav", b"bbb");
        write(pack_b.path(), "c.mid", b"ccc");

        let roots = vec![pack_a.path().to_path_buf(), pack_b.path().to_path_buf()];
        let report = scanner
            .scan_folders(&roots, &ScanOptions::default(), None, None)
            .await
            .unwrap();

        assert_eq!(report.indexed, 3);
        assert_eq!(report.files.len(), 3);
    }

    #[tokio::test]
    async fn test_cancelled_scan_returns_error() {
        let (scanner, _index, _temp) = create_scanner();
        let music = TempDir::new().unwrap();
        write(music.path(), "a.wav", b"aaa");

        let token = CancellationToken::new();
        token.cancel();
        let result = scanner
            .scan_folder(music.path(), &ScanOptions::default(), None, Some(&token))
            .await;
        assert!(matches!(result, Err(LibraryError::Cancelled)));
    }
}
