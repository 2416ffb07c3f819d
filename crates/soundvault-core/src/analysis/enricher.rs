//! Batch metadata enrichment for already-indexed files.
//!
//! Each file is independent: extract metadata, derive the energy level
//! from BPM, and write every audio field in one store update. A failing
//! file is counted and skipped; the batch never aborts.

use crate::analysis::energy::energy_level;
use crate::analysis::extractor::MetadataExtractor;
use crate::cancel::CancellationToken;
use crate::index::{FileUpdate, LibraryIndex};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A file scheduled for enrichment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRef {
    pub id: i64,
    pub path: PathBuf,
}

/// Progress update emitted once per file, before extraction begins.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichProgress {
    /// 1-based index of the file about to be processed.
    pub current: usize,
    pub total: usize,
    pub file_name: String,
}

/// Aggregate outcome of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichSummary {
    pub success: usize,
    pub failed: usize,
}

/// Coordinates metadata extraction and store updates for batches of files.
pub struct BatchEnricher {
    index: Arc<LibraryIndex>,
    extractor: Arc<dyn MetadataExtractor>,
}

impl BatchEnricher {
    pub fn new(index: Arc<LibraryIndex>, extractor: Arc<dyn MetadataExtractor>) -> Self {
        Self { index, extractor }
    }

    /// Enrich a single file record from its on-disk content.
    ///
    /// Returns whether the record was updated. Extraction failures and
    /// store failures both count as a per-file failure and are logged,
    /// never propagated.
    pub async fn analyze_file(&self, file_id: i64, path: &Path) -> bool {
        let metadata = match self.extractor.extract(path).await {
            Ok(Some(metadata)) => metadata,
            Ok(None) => {
                debug!("No metadata extracted for {}", path.display());
                return false;
            }
            Err(err) => {
                warn!("Metadata extraction failed for {}: {}", path.display(), err);
                return false;
            }
        };

        let update = FileUpdate {
            duration: metadata.duration,
            sample_rate: metadata.sample_rate,
            bit_depth: metadata.bit_depth,
            channels: metadata.channels,
            bpm: metadata.bpm,
            detected_key: metadata.detected_key,
            detected_scale: metadata.detected_scale,
            energy_level: energy_level(metadata.bpm),
            ..Default::default()
        };

        match self.index.update_file(file_id, &update) {
            Ok(()) => true,
            Err(err) => {
                warn!("Failed to store metadata for file {}: {}", file_id, err);
                false
            }
        }
    }

    /// Enrich a batch of files sequentially.
    ///
    /// The progress channel receives one event per file before its
    /// extraction starts. A cancellation token, when provided, stops the
    /// batch between files; completed updates stay durable.
    pub async fn batch_analyze(
        &self,
        files: &[FileRef],
        progress_tx: Option<mpsc::Sender<EnrichProgress>>,
        cancel: Option<&CancellationToken>,
    ) -> Result<EnrichSummary> {
        let total = files.len();
        let mut summary = EnrichSummary::default();

        for (idx, file) in files.iter().enumerate() {
            if let Some(token) = cancel {
                token.check()?;
            }

            if let Some(ref tx) = progress_tx {
                let file_name = file
                    .path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                let _ = tx
                    .send(EnrichProgress {
                        current: idx + 1,
                        total,
                        file_name,
                    })
                    .await;
            }

            if self.analyze_file(file.id, &file.path).await {
                summary.success += 1;
            } else {
                summary.failed += 1;
            }
        }

        debug!(
            "Batch enrichment finished: {} ok, {} failed",
            summary.success, summary.failed
        );
        Ok(summary)
    }
}
