//! Manifest context: serializable rendering payload built from a
//! [`CanonicalIndex`].
//!
//! Only record data is rendered; there is no "generated at" stamp, so an
//! unchanged index always produces an identical manifest.

use std::path::Path;

use serde::{Deserialize, Serialize};

use artifact_core::{CanonicalIndex, MigrationRecord, MigrationStatus, StatusCounts};

use crate::error::RenderError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestContext {
    pub canonical_root: String,
    pub generator_version: String,
    pub total: usize,
    pub counts: CountsCtx,
    pub records: Vec<RecordCtx>,
    /// CONFLICT and ERROR records, in key order.
    pub attention: Vec<AttentionCtx>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountsCtx {
    pub copied: usize,
    pub skipped_unchanged: usize,
    pub conflict: usize,
    pub error: usize,
}

/// One table row. Cell text is already escaped for a Markdown table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordCtx {
    pub key: String,
    pub status: String,
    /// Relative to the canonical root.
    pub canonical_path: String,
    pub source_path: String,
    pub source_tag: String,
    pub reason: String,
    pub hash_short: String,
    pub migrated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttentionCtx {
    pub key: String,
    pub status: String,
    pub detail: String,
}

impl ManifestContext {
    pub fn from_index(index: &CanonicalIndex, canonical_root: &Path) -> Self {
        let counts = StatusCounts::tally(index.records.values());
        let records = index
            .records
            .values()
            .map(|r| RecordCtx::from_record(r, canonical_root))
            .collect();
        let attention = index
            .records
            .values()
            .filter(|r| r.status.needs_attention())
            .map(AttentionCtx::from_record)
            .collect();

        Self {
            canonical_root: canonical_root.display().to_string(),
            generator_version: env!("CARGO_PKG_VERSION").to_string(),
            total: index.len(),
            counts: CountsCtx {
                copied: counts.copied,
                skipped_unchanged: counts.skipped_unchanged,
                conflict: counts.conflict,
                error: counts.error,
            },
            records,
            attention,
        }
    }

    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        let value = serde_json::to_value(self)?;
        Ok(tera::Context::from_value(value)?)
    }
}

impl RecordCtx {
    fn from_record(record: &MigrationRecord, canonical_root: &Path) -> Self {
        let relative = record
            .canonical_path
            .strip_prefix(canonical_root)
            .unwrap_or(&record.canonical_path);
        Self {
            key: cell(record.logical_key.as_str()),
            status: record.status.to_string(),
            canonical_path: cell(&slash(relative)),
            source_path: cell(&record.source_path.display().to_string()),
            source_tag: cell(&record.source_tag.0),
            reason: record.reason.to_string(),
            hash_short: record
                .content_hash
                .as_ref()
                .map(|h| h.short().to_string())
                .unwrap_or_else(|| "-".to_string()),
            migrated_at: record.migrated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        }
    }
}

impl AttentionCtx {
    fn from_record(record: &MigrationRecord) -> Self {
        let detail = match (&record.detail, record.status) {
            (Some(detail), _) => detail.clone(),
            (None, MigrationStatus::Conflict) => {
                "canonical file differs from the selected source".to_string()
            }
            (None, _) => "no detail recorded".to_string(),
        };
        Self {
            key: record.logical_key.to_string(),
            status: record.status.to_string(),
            detail: detail.replace('\n', " "),
        }
    }
}

/// Escape a value for a Markdown table cell.
fn cell(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}

fn slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
