//! Filesystem document loader.
//!
//! Walks `documents.root`, keeps files matching the include globs (and not
//! the exclude globs), extracts their text, and returns them as
//! [`NewDocument`]s sorted by relative path. Files that fail to extract or
//! hold only whitespace are skipped with a warning.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

use finrag_core::models::NewDocument;

use crate::config::DocumentsConfig;
use crate::extract::extract_file;

pub fn scan_documents(config: &DocumentsConfig) -> Result<Vec<NewDocument>> {
    let root = &config.root;
    if !root.exists() {
        bail!("Documents root does not exist: {}", root.display());
    }

    let include_set = build_globset(&config.include_globs)?;

    let mut excludes = vec!["**/.git/**".to_string(), "**/target/**".to_string()];
    excludes.extend(config.exclude_globs.iter().cloned());
    let exclude_set = build_globset(&excludes)?;

    let mut found = Vec::new();
    for entry in WalkDir::new(root).follow_links(config.follow_symlinks) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }
        found.push((rel_str, path.to_path_buf()));
    }

    found.sort_by(|a, b| a.0.cmp(&b.0));

    let mut docs = Vec::with_capacity(found.len());
    for (rel_str, path) in found {
        match load_file(&path) {
            Ok(Some(doc)) => docs.push(doc),
            Ok(None) => debug!(path = %rel_str, "skipping empty file"),
            Err(e) => warn!(path = %rel_str, error = %e, "skipping unreadable file"),
        }
    }

    Ok(docs)
}

/// `Ok(None)` for a file with no visible text.
fn load_file(path: &Path) -> Result<Option<NewDocument>> {
    let body = extract_file(path)?;
    if body.trim().is_empty() {
        return Ok(None);
    }

    let source_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    Ok(Some(NewDocument::new(
        body,
        source_name,
        path.display().to_string(),
    )))
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn config(root: &Path) -> DocumentsConfig {
        DocumentsConfig {
            root: root.to_path_buf(),
            include_globs: vec!["**/*.txt".to_string(), "**/*.pdf".to_string()],
            exclude_globs: Vec::new(),
            follow_symlinks: false,
        }
    }

    #[test]
    fn test_scan_sorted_and_filtered() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("b.txt"), "beta").unwrap();
        fs::write(tmp.path().join("a.txt"), "alpha").unwrap();
        fs::write(tmp.path().join("c.csv"), "1,2,3").unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("sub/d.txt"), "delta").unwrap();

        let docs = scan_documents(&config(tmp.path())).unwrap();
        let names: Vec<&str> = docs.iter().map(|d| d.source_name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "d.txt"]);
        assert_eq!(docs[0].content, "alpha");
        assert!(docs[2].origin_path.ends_with("d.txt"));
    }

    #[test]
    fn test_scan_skips_blank_and_broken_files() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("blank.txt"), "  \n\t ").unwrap();
        fs::write(tmp.path().join("broken.pdf"), "not really a pdf").unwrap();
        fs::write(tmp.path().join("ok.txt"), "content").unwrap();

        let docs = scan_documents(&config(tmp.path())).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].source_name, "ok.txt");
    }

    #[test]
    fn test_exclude_globs() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("keep.txt"), "keep").unwrap();
        fs::write(tmp.path().join("draft.txt"), "draft").unwrap();

        let mut cfg = config(tmp.path());
        cfg.exclude_globs = vec!["draft*".to_string()];
        let docs = scan_documents(&cfg).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].source_name, "keep.txt");
    }

    #[test]
    fn test_missing_root_fails() {
        let cfg = config(Path::new("/nonexistent/finrag-docs"));
        assert!(scan_documents(&cfg).is_err());
    }
}
