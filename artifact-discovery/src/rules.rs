//! Path-matching rules: include globs, ignore rules, and key extraction.
//!
//! All matching works on the root-relative path with `/` separators, so the
//! same file yields the same key on every platform.

use std::collections::HashSet;

use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;

use artifact_core::{paths::TMP_SUFFIX, CanonConfig};

use crate::error::DiscoveryError;

// ---------------------------------------------------------------------------
// Key extraction
// ---------------------------------------------------------------------------

/// Raw output of [`KeyRule::extract`], before key validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedKey {
    pub key: String,
    pub tag: Option<String>,
}

/// Pure mapping from a root-relative path to a logical key.
///
/// The regex's named group `key` (else the first unnamed-or-non-`tag` group,
/// else the whole match) is the key; named group `tag` is the source tag.
/// `strip_prefixes` are then removed from the front of the key until none
/// applies.
#[derive(Debug, Clone)]
pub struct KeyRule {
    pattern: Regex,
    key_group: Option<usize>,
    strip_prefixes: Vec<String>,
}

impl KeyRule {
    pub fn new(pattern: &str, strip_prefixes: &[String]) -> Result<Self, DiscoveryError> {
        let regex = Regex::new(pattern).map_err(|source| DiscoveryError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        let key_group = key_group_index(&regex);
        Ok(Self {
            pattern: regex,
            key_group,
            strip_prefixes: strip_prefixes
                .iter()
                .filter(|p| !p.is_empty())
                .cloned()
                .collect(),
        })
    }

    /// Returns `None` when the pattern does not match `relative_path`.
    pub fn extract(&self, relative_path: &str) -> Option<ExtractedKey> {
        let caps = self.pattern.captures(relative_path)?;
        let raw = self
            .key_group
            .and_then(|i| caps.get(i))
            .or_else(|| caps.get(0))?
            .as_str();
        let tag = caps
            .name("tag")
            .map(|m| m.as_str().to_string())
            .filter(|t| !t.is_empty());

        Some(ExtractedKey {
            key: self.strip(raw).to_string(),
            tag,
        })
    }

    fn strip<'a>(&self, mut key: &'a str) -> &'a str {
        loop {
            let next = self
                .strip_prefixes
                .iter()
                .find(|p| key.starts_with(p.as_str()) && key.len() > p.len())
                .map(|p| &key[p.len()..]);
            match next {
                Some(rest) => key = rest,
                None => return key,
            }
        }
    }
}

fn key_group_index(regex: &Regex) -> Option<usize> {
    let names: Vec<Option<&str>> = regex.capture_names().collect();
    if let Some(i) = names.iter().position(|n| *n == Some("key")) {
        return Some(i);
    }
    names
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, n)| **n != Some("tag"))
        .map(|(i, _)| i)
}

// ---------------------------------------------------------------------------
// Match rules
// ---------------------------------------------------------------------------

/// Which files are candidates and how their keys are derived.
#[derive(Debug, Clone)]
pub struct MatchRules {
    include: GlobSet,
    ignore_files: GlobSet,
    ignore_dirs: HashSet<String>,
    pub key_rule: KeyRule,
    pub max_depth: Option<usize>,
}

impl MatchRules {
    pub fn from_config(config: &CanonConfig) -> Result<Self, DiscoveryError> {
        let mut ignore_files = config.ignore_files.clone();
        ignore_files.push(format!("*{TMP_SUFFIX}"));

        Ok(Self {
            include: build_globset(&config.include)?,
            ignore_files: build_globset(&ignore_files)?,
            ignore_dirs: config.ignore_dirs.iter().cloned().collect(),
            key_rule: KeyRule::new(&config.key_extraction_pattern, &config.strip_prefixes)?,
            max_depth: config.max_depth,
        })
    }

    /// Include globs match the whole root-relative path.
    pub fn includes(&self, relative_path: &str) -> bool {
        self.include.is_match(relative_path)
    }

    /// Ignore globs match the file name only.
    pub fn ignores_file(&self, file_name: &str) -> bool {
        self.ignore_files.is_match(file_name)
    }

    /// Hidden directories are always skipped.
    pub fn ignores_dir(&self, dir_name: &str) -> bool {
        dir_name.starts_with('.') || self.ignore_dirs.contains(dir_name)
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, DiscoveryError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| DiscoveryError::InvalidGlob {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| DiscoveryError::InvalidGlob {
        pattern: patterns.join(", "),
        source,
    })
}
