//! `artifact-canon.yaml` configuration.
//!
//! Every field has a default, so a missing file is equivalent to `{}`.
//! Relative paths inside a config file are resolved against the directory
//! containing that file, not the process working directory.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};
use crate::paths::absolutize;

pub const CONFIG_FILE: &str = "artifact-canon.yaml";

/// Strips everything up to and including the last `agent_<digits>_<id>`
/// directory; that directory becomes the source tag.
pub const DEFAULT_KEY_PATTERN: &str =
    r"^(?:.*/)?(?P<tag>agent_[0-9]+_[A-Za-z0-9]+)/(?P<key>.+)$";

pub const DEFAULT_STRIP_PREFIXES: &[&str] = &["runtime/outputs/", "outputs/"];

pub const DEFAULT_INCLUDE: &[&str] = &[
    "**/*.md", "**/*.json", "**/*.csv", "**/*.tsv", "**/*.txt", "**/*.html",
];

pub const DEFAULT_IGNORE_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
    ".ruff_cache",
    ".venv",
    "venv",
    "env",
    "node_modules",
    "dist",
    "build",
];

pub const DEFAULT_IGNORE_FILES: &[&str] = &["*.pyc", "*.pyo", ".DS_Store", "Thumbs.db"];

/// One directory to search for candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SearchRootCompat")]
pub struct SearchRoot {
    pub path: PathBuf,
    /// Source tag for candidates whose key rule captures no `tag`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl SearchRoot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tag: None,
        }
    }

    pub fn tagged(path: impl Into<PathBuf>, tag: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            tag: Some(tag.into()),
        }
    }

    /// Configured tag, else the root directory's name.
    pub fn effective_tag(&self) -> String {
        if let Some(tag) = &self.tag {
            return tag.clone();
        }
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Roots may be written as a bare path or as `{path, tag}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SearchRootCompat {
    Bare(PathBuf),
    Detailed {
        path: PathBuf,
        #[serde(default)]
        tag: Option<String>,
    },
}

impl From<SearchRootCompat> for SearchRoot {
    fn from(c: SearchRootCompat) -> Self {
        match c {
            SearchRootCompat::Bare(path) => SearchRoot { path, tag: None },
            SearchRootCompat::Detailed { path, tag } => SearchRoot { path, tag },
        }
    }
}

/// Full run configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CanonConfig {
    pub search_roots: Vec<SearchRoot>,
    /// Falls back to `$OUTPUT_DIR` / `./outputs` when unset.
    pub canonical_root: Option<PathBuf>,
    pub trusted_source_tags: BTreeSet<String>,
    pub key_extraction_pattern: String,
    pub strip_prefixes: Vec<String>,
    pub include: Vec<String>,
    pub ignore_dirs: Vec<String>,
    pub ignore_files: Vec<String>,
    pub max_depth: Option<usize>,
    pub parallel_roots: bool,
    /// Directory of `.tera` files overriding the embedded manifest template.
    pub manifest_template_dir: Option<PathBuf>,
}

impl Default for CanonConfig {
    fn default() -> Self {
        Self {
            search_roots: vec![],
            canonical_root: None,
            trusted_source_tags: BTreeSet::new(),
            key_extraction_pattern: DEFAULT_KEY_PATTERN.to_string(),
            strip_prefixes: to_strings(DEFAULT_STRIP_PREFIXES),
            include: to_strings(DEFAULT_INCLUDE),
            ignore_dirs: to_strings(DEFAULT_IGNORE_DIRS),
            ignore_files: to_strings(DEFAULT_IGNORE_FILES),
            max_depth: None,
            parallel_roots: true,
            manifest_template_dir: None,
        }
    }
}

impl CanonConfig {
    /// Resolve every relative path field against `base`.
    pub fn resolve_paths(mut self, base: &Path) -> Self {
        for root in &mut self.search_roots {
            root.path = absolutize(&root.path, base);
        }
        self.canonical_root = self.canonical_root.map(|p| absolutize(&p, base));
        self.manifest_template_dir = self.manifest_template_dir.map(|p| absolutize(&p, base));
        self
    }

    /// Structural checks that need no regex or glob engine.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.search_roots.is_empty() {
            return Err(ConfigError::Invalid(
                "no search roots configured; pass ROOTS or set `search_roots`".to_string(),
            ));
        }
        if self.include.is_empty() {
            return Err(ConfigError::Invalid(
                "`include` must list at least one glob".to_string(),
            ));
        }
        if self.key_extraction_pattern.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "`key_extraction_pattern` must not be empty".to_string(),
            ));
        }
        if self.max_depth == Some(0) {
            return Err(ConfigError::Invalid(
                "`max_depth` must be at least 1".to_string(),
            ));
        }
        if let Some(tag) = self.trusted_source_tags.iter().find(|t| t.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "trusted source tag {tag:?} is blank"
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Load the config file at `path`; relative paths resolve against its parent.
///
/// Returns `ConfigError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(path: &Path) -> Result<CanonConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let config: CanonConfig = serde_yaml::from_str(&contents).map_err(|source| {
        ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        }
    })?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    Ok(config.resolve_paths(base))
}

/// Load `<dir>/artifact-canon.yaml` if present, else defaults.
pub fn load_or_default_at(dir: &Path) -> Result<CanonConfig, ConfigError> {
    let path = dir.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(CanonConfig::default());
    }
    load_at(&path)
}

// ---------------------------------------------------------------------------
// Scaffold
// ---------------------------------------------------------------------------

const DEFAULT_CONFIG_YAML: &str = r#"# artifact-canon configuration.
#
# Directories walked for candidate artifacts. Either a bare path or
# {path, tag}; the tag labels candidates when the key pattern captures none.
search_roots:
  - outputs/code-creation
  - path: runtime/outputs
    tag: runtime

# Where winners are copied. Defaults to $OUTPUT_DIR, else ./outputs.
# canonical_root: outputs/canonical

# Candidates from these tags beat all others for the same key.
trusted_source_tags: []

# Regex over the root-relative path. Named group `key` (or group 1) is the
# logical key; optional named group `tag` is the source tag.
key_extraction_pattern: '^(?:.*/)?(?P<tag>agent_[0-9]+_[A-Za-z0-9]+)/(?P<key>.+)$'

# Removed repeatedly from the front of every extracted key.
strip_prefixes:
  - runtime/outputs/
  - outputs/

include:
  - "**/*.md"
  - "**/*.json"
  - "**/*.csv"
  - "**/*.tsv"
  - "**/*.txt"
  - "**/*.html"

# max_depth: 12
parallel_roots: true
"#;

/// Write a commented default config to `<dir>/artifact-canon.yaml`.
///
/// Write flow: `.yaml.tmp` sibling → `rename`. Refuses to replace an existing
/// file unless `force` is set. Returns the written path.
pub fn write_default_at(dir: &Path, force: bool) -> Result<PathBuf, ConfigError> {
    let path = dir.join(CONFIG_FILE);
    if path.exists() && !force {
        return Err(ConfigError::Invalid(format!(
            "{} already exists (use --force to replace it)",
            path.display()
        )));
    }
    let tmp = dir.join(format!("{CONFIG_FILE}.tmp"));
    std::fs::write(&tmp, DEFAULT_CONFIG_YAML).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok(path)
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
