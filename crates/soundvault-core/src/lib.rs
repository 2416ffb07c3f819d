//! SoundVault Core - Headless library for audio production asset management.
//!
//! This crate indexes samples, projects, presets and MIDI files on disk
//! into a SQLite store, enriches them with audio metadata through an
//! injected extractor, and exposes faceted search, tagging and collection
//! organization. It can be used programmatically without any GUI/IPC layer.
//!
//! # Example
//!
//! ```rust,ignore
//! use soundvault_core::{ScanOptions, SoundVault};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> soundvault_core::Result<()> {
//!     let vault = SoundVault::open("/path/to/library.db", Arc::new(MyExtractor))?;
//!
//!     let report = vault
//!         .scan_folder("/path/to/samples".as_ref(), &ScanOptions::default(), None, None)
//!         .await?;
//!     println!("Indexed {} files", report.indexed);
//!
//!     let results = vault.search(&Default::default())?;
//!     println!("Library holds {} files", results.total);
//!
//!     vault.close()
//! }
//! ```

pub mod analysis;
pub mod autotag;
pub mod cancel;
pub mod classify;
pub mod config;
pub mod error;
pub mod hashing;
pub mod index;
pub mod scanner;
pub mod walker;

// Re-export commonly used types
pub use analysis::{
    energy_from_bpm, energy_level, AudioMetadata, BatchEnricher, EnrichProgress, EnrichSummary,
    FileRef, MetadataExtractor,
};
pub use autotag::suggest_tags;
pub use cancel::CancellationToken;
pub use classify::{classify_path, FileKind};
pub use error::{LibraryError, Result};
pub use hashing::{hash_file, hash_file_async};
pub use index::{
    Collection, FileRecord, FileUpdate, LibraryIndex, LibraryStats, NewCollection, NewFileRecord,
    SearchFilters, SearchQuery, SearchResults, SortDirection, SortField, SortSpec, Tag,
    TagCategory, TagSeed, DEFAULT_TAG_SEEDS,
};
pub use scanner::{
    AutoTagMode, FolderScanner, ScanOptions, ScanProgress, ScanReport, ScanStatus, TagSuggestion,
};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Main entry point for library operations.
///
/// Owns the store handle and the scan/enrichment components, with an
/// explicit open/close lifecycle. Store-level CRUD (tags, collections,
/// record updates) is reachable through [`SoundVault::store`].
pub struct SoundVault {
    index: Arc<LibraryIndex>,
    scanner: FolderScanner,
    enricher: BatchEnricher,
}

impl SoundVault {
    /// Open (or create) a library at the given database path.
    ///
    /// Seeds the default tag vocabulary on first initialization; existing
    /// tags are left untouched.
    pub fn open(
        db_path: impl Into<PathBuf>,
        extractor: Arc<dyn MetadataExtractor>,
    ) -> Result<Self> {
        let index = Arc::new(LibraryIndex::new(db_path)?);
        index.seed_tags(DEFAULT_TAG_SEEDS)?;

        Ok(Self {
            scanner: FolderScanner::new(index.clone()),
            enricher: BatchEnricher::new(index.clone(), extractor),
            index,
        })
    }

    /// The underlying record store.
    pub fn store(&self) -> &LibraryIndex {
        &self.index
    }

    /// Scan one folder; see [`FolderScanner::scan_folder`].
    pub async fn scan_folder(
        &self,
        root: &Path,
        options: &ScanOptions,
        progress_tx: Option<mpsc::Sender<ScanProgress>>,
        cancel: Option<&CancellationToken>,
    ) -> Result<ScanReport> {
        self.scanner
            .scan_folder(root, options, progress_tx, cancel)
            .await
    }

    /// Scan several folders and aggregate the results.
    pub async fn scan_folders(
        &self,
        roots: &[PathBuf],
        options: &ScanOptions,
        progress_tx: Option<mpsc::Sender<ScanProgress>>,
        cancel: Option<&CancellationToken>,
    ) -> Result<ScanReport> {
        self.scanner
            .scan_folders(roots, options, progress_tx, cancel)
            .await
    }

    /// Enrich a single indexed file; returns whether it succeeded.
    pub async fn analyze_file(&self, file_id: i64, path: &Path) -> bool {
        self.enricher.analyze_file(file_id, path).await
    }

    /// Enrich a batch of indexed files; see [`BatchEnricher::batch_analyze`].
    pub async fn batch_analyze(
        &self,
        files: &[FileRef],
        progress_tx: Option<mpsc::Sender<EnrichProgress>>,
        cancel: Option<&CancellationToken>,
    ) -> Result<EnrichSummary> {
        self.enricher.batch_analyze(files, progress_tx, cancel).await
    }

    /// Run a faceted search over the library.
    pub fn search(&self, query: &SearchQuery) -> Result<SearchResults> {
        self.index.search(query)
    }

    /// Aggregate library counters.
    pub fn stats(&self) -> Result<LibraryStats> {
        self.index.stats()
    }

    /// Checkpoint and close the library.
    pub fn close(self) -> Result<()> {
        let SoundVault {
            index,
            scanner,
            enricher,
        } = self;
        // Components hold clones of the store handle; release them first
        // so the connection can actually close.
        drop(scanner);
        drop(enricher);
        match Arc::try_unwrap(index) {
            Ok(index) => index.close(),
            Err(index) => index.checkpoint_wal(),
        }
    }
}
