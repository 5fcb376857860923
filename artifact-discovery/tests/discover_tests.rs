//! Filesystem discovery tests. Each test gets an isolated `TempDir`.

use std::fs;
use std::path::{Path, PathBuf};

use artifact_core::{CanonConfig, Discover, SearchRoot};
use artifact_discovery::{Discovery, DiscoveryContext};
use filetime::{set_file_mtime, FileTime};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).expect("mkdir");
    fs::write(&path, content).expect("write fixture");
    path
}

fn config_for(roots: &[&Path]) -> CanonConfig {
    CanonConfig {
        search_roots: roots.iter().map(|r| SearchRoot::new(*r)).collect(),
        ..CanonConfig::default()
    }
}

fn keys(discovery: &Discovery) -> Vec<String> {
    let report = discovery.discover().expect("discover");
    report
        .candidates
        .iter()
        .map(|c| c.logical_key.to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// Matching and keys
// ---------------------------------------------------------------------------

#[test]
fn groups_run_copies_under_one_key() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "agent_1_aaa/outputs/report.md", "v1");
    write(tmp.path(), "agent_2_bbb/runtime/outputs/report.md", "v2");
    write(tmp.path(), "agent_2_bbb/script.py", "print()");

    let discovery = Discovery::from_config(&config_for(&[tmp.path()])).unwrap();
    let report = discovery.discover().unwrap();

    assert_eq!(report.candidates.len(), 2);
    assert!(report.candidates.iter().all(|c| c.logical_key.as_str() == "report.md"));
    let tags: Vec<_> = report.candidates.iter().map(|c| c.source_tag.0.as_str()).collect();
    assert_eq!(tags, vec!["agent_1_aaa", "agent_2_bbb"]);
    assert!(report.root_issues.is_empty());
}

#[test]
fn metadata_is_captured_without_hashing() {
    let tmp = TempDir::new().unwrap();
    let path = write(tmp.path(), "agent_1_a/summary.json", "{\"ok\":true}");
    let mtime = FileTime::from_unix_time(1_700_000_000, 0);
    set_file_mtime(&path, mtime).unwrap();

    let discovery = Discovery::from_config(&config_for(&[tmp.path()])).unwrap();
    let report = discovery.discover().unwrap();
    let candidate = &report.candidates[0];

    assert_eq!(candidate.size_bytes, 11);
    assert_eq!(candidate.modified_time.timestamp(), 1_700_000_000);
    assert!(candidate.content_hash.is_none());
    assert!(candidate.absolute_path.is_absolute());
}

#[test]
fn ignored_and_hidden_directories_are_skipped() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "agent_1_a/report.md", "keep");
    write(tmp.path(), "node_modules/agent_1_a/report.md", "skip");
    write(tmp.path(), ".cache/agent_1_a/other.md", "skip");
    write(tmp.path(), "agent_1_a/report.md.canon.tmp", "skip");

    let discovery = Discovery::from_config(&config_for(&[tmp.path()])).unwrap();
    assert_eq!(keys(&discovery), vec!["report.md"]);
}

#[test]
fn max_depth_limits_walk() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "agent_1_a/top.md", "x");
    write(tmp.path(), "deep/deeper/agent_1_a/low.md", "x");

    let config = CanonConfig {
        max_depth: Some(2),
        ..config_for(&[tmp.path()])
    };
    let discovery = Discovery::from_config(&config).unwrap();
    assert_eq!(keys(&discovery), vec!["top.md"]);
}

#[test]
fn root_tag_used_when_pattern_has_no_tag() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "reports/weekly.md", "x");

    let config = CanonConfig {
        search_roots: vec![SearchRoot::tagged(tmp.path(), "curated")],
        key_extraction_pattern: r"^reports/(?P<key>.+)$".to_string(),
        ..CanonConfig::default()
    };
    let report = Discovery::from_config(&config).unwrap().discover().unwrap();
    assert_eq!(report.candidates[0].source_tag.0, "curated");
    assert_eq!(report.candidates[0].logical_key.as_str(), "weekly.md");
}

// ---------------------------------------------------------------------------
// Roots
// ---------------------------------------------------------------------------

#[test]
fn missing_root_is_reported_not_fatal() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "agent_1_a/report.md", "x");
    let missing = tmp.path().join("does-not-exist");

    let discovery = Discovery::from_config(&config_for(&[&missing, tmp.path()])).unwrap();
    let report = discovery.discover().unwrap();

    assert_eq!(report.candidates.len(), 1);
    assert_eq!(report.root_issues.len(), 1);
    assert_eq!(report.root_issues[0].root, missing);
}

#[test]
fn overlapping_roots_do_not_duplicate_candidates() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "runs/agent_1_a/report.md", "x");
    let inner = tmp.path().join("runs");

    let discovery = Discovery::from_config(&config_for(&[tmp.path(), &inner])).unwrap();
    let mut ctx = DiscoveryContext::new();
    discovery.discover_with(&mut ctx);

    assert_eq!(ctx.duplicates(), 1);
    assert_eq!(ctx.into_report().candidates.len(), 1);
}

#[test]
fn canonical_root_inside_search_root_is_excluded() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "agent_1_a/report.md", "x");
    write(tmp.path(), "canonical/agent_1_a/report.md", "already migrated");

    let discovery = Discovery::from_config(&config_for(&[tmp.path()]))
        .unwrap()
        .exclude(tmp.path().join("canonical"));
    let report = discovery.discover().unwrap();
    assert_eq!(report.candidates.len(), 1);
    assert!(!report.candidates[0]
        .absolute_path
        .to_string_lossy()
        .contains("canonical"));
}

#[test]
fn search_root_at_or_under_canonical_root_is_not_walked() {
    let tmp = TempDir::new().unwrap();
    let canonical = tmp.path().join("canonical");
    write(&canonical, "ARTIFACT_INDEX.json", "{}");
    write(&canonical, "agent_1_a/report.md", "x");
    let nested = canonical.join("agent_1_a");

    let discovery = Discovery::from_config(&config_for(&[canonical.as_path(), nested.as_path()]))
        .unwrap()
        .exclude(&canonical);
    let report = discovery.discover().unwrap();

    assert!(report.candidates.is_empty());
    assert_eq!(report.root_issues.len(), 2);
    assert!(report
        .root_issues
        .iter()
        .all(|issue| issue.message.contains("inside the canonical root")));
}

#[test]
fn parallel_and_sequential_walks_agree() {
    let a = TempDir::new().unwrap();
    let b = TempDir::new().unwrap();
    for i in 0..5 {
        write(a.path(), &format!("agent_{i}_a/r{i}.md"), "a");
        write(b.path(), &format!("agent_{i}_b/r{i}.md"), "b");
    }
    let config = config_for(&[a.path(), b.path()]);
    let sequential = Discovery::from_config(&config).unwrap().parallel(false);
    let parallel = Discovery::from_config(&config).unwrap().parallel(true);

    assert_eq!(
        sequential.discover().unwrap(),
        parallel.discover().unwrap()
    );
}

#[test]
fn walk_root_is_lazy_and_rewalks() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "agent_1_a/one.md", "x");
    let discovery = Discovery::from_config(&config_for(&[tmp.path()])).unwrap();
    let root = SearchRoot::new(tmp.path());

    assert_eq!(discovery.walk_root(&root).unwrap().count(), 1);
    write(tmp.path(), "agent_1_a/two.md", "x");
    assert_eq!(discovery.walk_root(&root).unwrap().count(), 2);
}

#[cfg(unix)]
#[test]
fn symlinks_are_not_followed() {
    let tmp = TempDir::new().unwrap();
    let outside = TempDir::new().unwrap();
    write(outside.path(), "agent_1_a/secret.md", "x");
    write(tmp.path(), "agent_1_a/real.md", "x");
    std::os::unix::fs::symlink(outside.path(), tmp.path().join("linked")).unwrap();
    std::os::unix::fs::symlink(
        tmp.path().join("agent_1_a/real.md"),
        tmp.path().join("agent_1_a/alias.md"),
    )
    .unwrap();

    let discovery = Discovery::from_config(&config_for(&[tmp.path()])).unwrap();
    assert_eq!(keys(&discovery), vec!["real.md"]);
}
