//! Atomic file output.
//!
//! Every writer in this crate builds its full output in memory and hands the
//! bytes to [`write_atomic`]. The bytes land in a temporary file in the
//! destination directory, which is then renamed over the target, so readers
//! (the static-site build in particular) never observe a half-written file.
//!
//! External tools that write their own output get a [`staging_path`] instead
//! and the caller persists it once the tool has succeeded.
//!
//! The scrapers publish their results as Jekyll `_data` files through
//! [`write_yaml`] and [`write_json_and_yaml`].

use crate::error::ScrapeError;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::{debug, info};

/// Write `bytes` to `path` via a sibling temp file and a rename.
///
/// Missing parent directories are created.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".siteworks-")
        .suffix(".tmp")
        .tempfile_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    debug!("Wrote {} bytes → {}", bytes.len(), path.display());
    Ok(())
}

/// Reserve a temporary path beside `path`, keeping its extension so tools
/// that pick the format from the file name still do.
///
/// Dropping the returned [`TempPath`] deletes whatever was written there;
/// `TempPath::persist(path)` renames it over the target.
pub fn staging_path(path: &Path) -> std::io::Result<TempPath> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let suffix = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let tmp = tempfile::Builder::new()
        .prefix(".siteworks-")
        .suffix(&suffix)
        .tempfile_in(parent)?;
    Ok(tmp.into_temp_path())
}

// ── Site data files ──────────────────────────────────────────────────────

fn write_data(path: &Path, text: &str) -> Result<(), ScrapeError> {
    write_atomic(path, text.as_bytes()).map_err(|e| ScrapeError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    info!("Data written to {}", path.display());
    Ok(())
}

/// Serialise `value` as YAML into `path`.
pub fn write_yaml<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<(), ScrapeError> {
    write_data(path, &serde_yml::to_string(value)?)
}

/// Write `<stem>.json` (pretty) and `<stem>.yml` into `out_dir`. Returns both paths.
pub fn write_json_and_yaml<T: Serialize + ?Sized>(
    value: &T,
    out_dir: &Path,
    stem: &str,
) -> Result<(PathBuf, PathBuf), ScrapeError> {
    let json = serde_json::to_string_pretty(value)?;
    let yaml = serde_yml::to_string(value)?;

    let json_path = out_dir.join(format!("{stem}.json"));
    let yaml_path = out_dir.join(format!("{stem}.yml"));
    write_data(&json_path, &json)?;
    write_data(&yaml_path, &yaml)?;
    Ok((json_path, yaml_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_parents_and_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("out.json");

        write_atomic(&target, b"first").unwrap();
        write_atomic(&target, b"second").unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "second");
        // Only the target remains; no stray temp files.
        let entries: Vec<_> = std::fs::read_dir(target.parent().unwrap())
            .unwrap()
            .collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn staging_path_keeps_extension_and_vanishes_unless_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out").join("doc_pass1.pdf");

        let abandoned = staging_path(&target).unwrap();
        assert_eq!(abandoned.extension().unwrap(), "pdf");
        assert_eq!(abandoned.parent(), target.parent());
        std::fs::write(&abandoned, b"partial").unwrap();
        drop(abandoned);
        assert_eq!(std::fs::read_dir(target.parent().unwrap()).unwrap().count(), 0);

        let kept = staging_path(&target).unwrap();
        std::fs::write(&kept, b"complete").unwrap();
        kept.persist(&target).unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "complete");
        assert_eq!(std::fs::read_dir(target.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn data_pair_uses_stem_for_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let rows = vec![serde_json::json!({"name": "A. Person", "precinct": 2})];
        let (json, yaml) = write_json_and_yaml(&rows, dir.path(), "elected-officials").unwrap();

        assert_eq!(json, dir.path().join("elected-officials.json"));
        assert_eq!(yaml, dir.path().join("elected-officials.yml"));
        let back: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(json).unwrap()).unwrap();
        assert_eq!(back[0]["precinct"], 2);
        assert!(std::fs::read_to_string(yaml).unwrap().contains("name: A. Person"));
    }
}
