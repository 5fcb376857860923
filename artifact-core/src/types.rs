//! Domain types for artifact canonicalization.
//!
//! All path fields use `PathBuf`; logical keys are validated newtypes so a key
//! can always be joined under the canonical root without escaping it.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{KeyError, SelectionError};
use crate::hash;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Normalized identifier grouping copies of the same artifact across runs.
///
/// Always a `/`-separated relative path with no `.` / `..` / empty segments.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LogicalKey(String);

impl LogicalKey {
    /// Validate and normalize a key. Leading `./` and `/` separators are
    /// stripped; backslashes are treated as separators.
    pub fn parse(raw: &str) -> Result<Self, KeyError> {
        let unified = raw.replace('\\', "/");
        let trimmed = unified.trim_start_matches("./").trim_start_matches('/');
        if trimmed.is_empty() {
            return Err(KeyError::Empty);
        }

        let mut segments = Vec::new();
        for segment in trimmed.split('/') {
            match segment {
                "" => {
                    return Err(KeyError::EmptySegment {
                        key: raw.to_string(),
                    })
                }
                "." | ".." => {
                    return Err(KeyError::Traversal {
                        key: raw.to_string(),
                    })
                }
                s => segments.push(s),
            }
        }
        Ok(Self(segments.join("/")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path segments in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

impl fmt::Display for LogicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for LogicalKey {
    type Error = KeyError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<LogicalKey> for String {
    fn from(k: LogicalKey) -> Self {
        k.0
    }
}

/// Where a candidate came from: a run identifier or a search-root label.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceTag(pub String);

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for SourceTag {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SourceTag {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Lowercase hex SHA-256 digest of a file's bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl ContentHash {
    /// First 12 hex characters, for tables and log lines.
    pub fn short(&self) -> &str {
        let end = self.0.len().min(12);
        &self.0[..end]
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ---------------------------------------------------------------------------
// Candidates and groups
// ---------------------------------------------------------------------------

/// One discovered copy of an artifact.
///
/// Discovery fills in cheap metadata only; `content_hash` stays `None` until a
/// consumer asks for [`Candidate::hashed`], which returns a new value rather
/// than mutating this one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub logical_key: LogicalKey,
    pub absolute_path: PathBuf,
    pub size_bytes: u64,
    pub modified_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<ContentHash>,
    pub source_tag: SourceTag,
}

impl Candidate {
    /// Return a copy of this candidate with `content_hash` populated.
    ///
    /// Reads the file only when the hash is not already known.
    pub fn hashed(&self) -> std::io::Result<Candidate> {
        if self.content_hash.is_some() {
            return Ok(self.clone());
        }
        let digest = hash::hash_file(&self.absolute_path)?;
        Ok(Candidate {
            content_hash: Some(digest),
            ..self.clone()
        })
    }
}

/// All candidates sharing one logical key. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateGroup {
    key: LogicalKey,
    members: Vec<Candidate>,
}

impl CandidateGroup {
    /// Build a group, enforcing the non-empty and same-key invariants.
    ///
    /// Members with the same absolute path are collapsed to one.
    pub fn from_members(
        key: LogicalKey,
        mut members: Vec<Candidate>,
    ) -> Result<Self, SelectionError> {
        if members.is_empty() {
            return Err(SelectionError::EmptyGroup { key });
        }
        if let Some(stray) = members.iter().find(|c| c.logical_key != key) {
            return Err(SelectionError::KeyMismatch {
                expected: key,
                found: stray.logical_key.clone(),
                path: stray.absolute_path.clone(),
            });
        }
        members.sort_by(|a, b| a.absolute_path.cmp(&b.absolute_path));
        members.dedup_by(|a, b| a.absolute_path == b.absolute_path);
        Ok(Self { key, members })
    }

    pub fn key(&self) -> &LogicalKey {
        &self.key
    }

    pub fn members(&self) -> &[Candidate] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn into_members(self) -> Vec<Candidate> {
        self.members
    }
}

/// A search root that could not be walked. Reported, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootIssue {
    pub root: PathBuf,
    pub message: String,
}

/// Output of the discovery stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    pub candidates: Vec<Candidate>,
    pub root_issues: Vec<RootIssue>,
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Which ranking rule decided a group's winner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SelectionReason {
    ExplicitPriority,
    Newest,
    Largest,
    LexicalTiebreak,
    SoleCandidate,
}

impl fmt::Display for SelectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SelectionReason::ExplicitPriority => "EXPLICIT_PRIORITY",
            SelectionReason::Newest => "NEWEST",
            SelectionReason::Largest => "LARGEST",
            SelectionReason::LexicalTiebreak => "LEXICAL_TIEBREAK",
            SelectionReason::SoleCandidate => "SOLE_CANDIDATE",
        };
        f.write_str(s)
    }
}

/// The authoritative pick for one logical key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionResult {
    pub logical_key: LogicalKey,
    pub winner: Candidate,
    /// Every other group member, sorted by path.
    pub losers: Vec<Candidate>,
    pub reason: SelectionReason,
}

impl SelectionResult {
    pub fn candidate_count(&self) -> usize {
        self.losers.len() + 1
    }
}

// ---------------------------------------------------------------------------
// Migration records and the canonical index
// ---------------------------------------------------------------------------

/// Outcome of migrating one logical key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MigrationStatus {
    Copied,
    SkippedUnchanged,
    Conflict,
    Error,
    /// Dry-run only: the winner would have been copied. Never persisted.
    WouldCopy,
}

impl MigrationStatus {
    /// Conflicts and errors need an operator.
    pub fn needs_attention(self) -> bool {
        matches!(self, MigrationStatus::Conflict | MigrationStatus::Error)
    }
}

impl fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MigrationStatus::Copied => "COPIED",
            MigrationStatus::SkippedUnchanged => "SKIPPED_UNCHANGED",
            MigrationStatus::Conflict => "CONFLICT",
            MigrationStatus::Error => "ERROR",
            MigrationStatus::WouldCopy => "WOULD_COPY",
        };
        f.write_str(s)
    }
}

/// Persisted outcome for one logical key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    pub logical_key: LogicalKey,
    pub canonical_path: PathBuf,
    pub source_path: PathBuf,
    pub source_tag: SourceTag,
    pub migrated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<ContentHash>,
    pub status: MigrationStatus,
    pub reason: SelectionReason,
    pub candidate_count: usize,
    /// Hash of the pre-existing destination when `status` is `Conflict`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_hash: Option<ContentHash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

pub const INDEX_FORMAT_VERSION: u32 = 1;

/// Latest [`MigrationRecord`] per logical key.
///
/// Carries no run-level timestamp so unchanged runs serialize identically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalIndex {
    pub version: u32,
    #[serde(default)]
    pub records: BTreeMap<LogicalKey, MigrationRecord>,
}

impl Default for CanonicalIndex {
    fn default() -> Self {
        Self {
            version: INDEX_FORMAT_VERSION,
            records: BTreeMap::new(),
        }
    }
}

impl CanonicalIndex {
    pub fn get(&self, key: &LogicalKey) -> Option<&MigrationRecord> {
        self.records.get(key)
    }

    /// Replace the record for its key.
    pub fn upsert(&mut self, record: MigrationRecord) {
        self.records.insert(record.logical_key.clone(), record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Per-status tallies for a set of records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub copied: usize,
    pub skipped_unchanged: usize,
    pub conflict: usize,
    pub error: usize,
    pub would_copy: usize,
}

impl StatusCounts {
    pub fn tally<'a>(records: impl IntoIterator<Item = &'a MigrationRecord>) -> Self {
        let mut counts = Self::default();
        for record in records {
            match record.status {
                MigrationStatus::Copied => counts.copied += 1,
                MigrationStatus::SkippedUnchanged => counts.skipped_unchanged += 1,
                MigrationStatus::Conflict => counts.conflict += 1,
                MigrationStatus::Error => counts.error += 1,
                MigrationStatus::WouldCopy => counts.would_copy += 1,
            }
        }
        counts
    }
}

/// Records produced by one migration pass, in key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub records: Vec<MigrationRecord>,
    pub dry_run: bool,
}

impl MigrationReport {
    pub fn counts(&self) -> StatusCounts {
        StatusCounts::tally(&self.records)
    }

    /// Records with status `Conflict` or `Error`.
    pub fn attention(&self) -> impl Iterator<Item = &MigrationRecord> {
        self.records.iter().filter(|r| r.status.needs_attention())
    }

    pub fn needs_attention(&self) -> bool {
        self.attention().next().is_some()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
