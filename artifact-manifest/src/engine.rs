//! Tera engine for `ARTIFACT_INDEX.md`.
//!
//! Templates are embedded at compile time. A user template directory may
//! override any of them by relative name, e.g. `artifact_index.md.tera` or
//! `shared/_attention.tera`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tera::Tera;

use artifact_core::CanonicalIndex;

use crate::context::ManifestContext;
use crate::error::RenderError;

/// Entry template name.
pub const MANIFEST_TEMPLATE: &str = "artifact_index.md.tera";

const TPLS: &[(&str, &str)] = &[
    ("shared/_header.tera", include_str!("templates/_partials/header.tera")),
    (
        "shared/_attention.tera",
        include_str!("templates/_partials/attention.tera"),
    ),
    (MANIFEST_TEMPLATE, include_str!("templates/artifact_index.md.tera")),
];

// ---------------------------------------------------------------------------
// Template loading helpers
// ---------------------------------------------------------------------------

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RenderError {
    RenderError::Io {
        path: path.into(),
        source,
    }
}

fn normalize_template_name(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/").to_lowercase()
}

fn collect_template_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), RenderError> {
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        let meta = entry.metadata().map_err(|e| io_err(&path, e))?;
        if meta.is_dir() {
            collect_template_files(&path, out)?;
        } else if meta.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

fn load_user_templates(dir: &Path) -> Result<Vec<(String, String)>, RenderError> {
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut files = Vec::new();
    collect_template_files(dir, &mut files)?;
    files.sort();

    let mut templates = Vec::new();
    for path in files {
        if path.extension().and_then(|s| s.to_str()) != Some("tera") {
            continue;
        }
        let rel = path.strip_prefix(dir).unwrap_or(path.as_path());
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        templates.push((normalize_template_name(rel), contents));
    }
    Ok(templates)
}

fn build_tera(user_template_dir: Option<&Path>) -> Result<Tera, RenderError> {
    let mut templates: HashMap<String, String> = HashMap::new();
    for (name, content) in TPLS {
        templates.insert(normalize_template_name(Path::new(name)), (*content).to_string());
    }
    if let Some(dir) = user_template_dir {
        for (name, content) in load_user_templates(dir)? {
            templates.insert(name, content);
        }
    }

    let mut tera = Tera::default();
    tera.add_raw_templates(templates.into_iter().collect::<Vec<_>>())?;
    Ok(tera)
}

// ---------------------------------------------------------------------------
// ManifestRenderer
// ---------------------------------------------------------------------------

/// Renders the human-readable manifest. Create once and reuse.
pub struct ManifestRenderer {
    tera: Tera,
}

impl ManifestRenderer {
    /// Embedded templates plus any `.tera` overrides in `user_template_dir`.
    /// A missing override directory is not an error.
    pub fn new(user_template_dir: Option<&Path>) -> Result<Self, RenderError> {
        Ok(Self {
            tera: build_tera(user_template_dir)?,
        })
    }

    /// Render the manifest for `index`. Output uses `\n` line endings and
    /// ends with exactly one newline.
    pub fn render(
        &self,
        index: &CanonicalIndex,
        canonical_root: &Path,
    ) -> Result<String, RenderError> {
        let ctx = ManifestContext::from_index(index, canonical_root);
        self.render_with_context(&ctx)
    }

    pub fn render_with_context(&self, ctx: &ManifestContext) -> Result<String, RenderError> {
        let rendered = self.tera.render(MANIFEST_TEMPLATE, &ctx.to_tera_context()?)?;
        Ok(normalize_output(&rendered))
    }
}

/// Collapse runs of blank lines left by template control blocks.
fn normalize_output(rendered: &str) -> String {
    let mut out = String::with_capacity(rendered.len());
    let mut blank_run = 0;
    for line in rendered.replace("\r\n", "\n").lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    let trimmed = out.trim_end_matches('\n').len();
    out.truncate(trimmed);
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_templates_load() {
        ManifestRenderer::new(None).expect("embedded templates should parse");
    }

    #[test]
    fn empty_index_renders_placeholder() {
        let renderer = ManifestRenderer::new(None).unwrap();
        let out = renderer
            .render(&CanonicalIndex::default(), Path::new("/out"))
            .unwrap();
        assert!(out.starts_with("# Artifact Index\n"));
        assert!(out.contains("No artifacts have been migrated yet"));
        assert!(!out.contains("Attention required"));
    }

    #[test]
    fn normalize_collapses_blank_runs() {
        assert_eq!(normalize_output("a\n\n\n\nb\r\n\n"), "a\n\nb\n");
    }
}
