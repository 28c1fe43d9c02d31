//! Walk the site sources and collect unique external links.

use super::{extract_links, ExternalityFilter, LinkRecord, SourceFormat, SourceType, SITE_LAYOUT};
use crate::error::LinkCheckError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Unique links in first-seen order, indexed by lower-cased URL.
#[derive(Debug, Default)]
pub struct LinkCollection {
    records: Vec<LinkRecord>,
    index: HashMap<String, usize>,
}

impl LinkCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a link seen in one file. A repeated URL only records the extra
    /// source file; text and source type stay those of the first sighting.
    pub fn add(&mut self, record: LinkRecord) {
        let key = record.key();
        match self.index.get(&key) {
            Some(&i) => {
                let existing = &mut self.records[i];
                for file in record.source_files {
                    if !existing.source_files.contains(&file) {
                        existing.source_files.push(file);
                    }
                }
            }
            None => {
                self.index.insert(key, self.records.len());
                self.records.push(record);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[LinkRecord] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [LinkRecord] {
        &mut self.records
    }

    pub fn into_records(self) -> Vec<LinkRecord> {
        self.records
    }
}

/// Scan `_pages`, `_posts`, `_includes` and `_layouts` under `root`.
///
/// Missing directories and unreadable files are logged and skipped. Source
/// paths in the records are relative to `root` with `/` separators.
pub fn scan_site(root: &Path, filter: &ExternalityFilter) -> Result<LinkCollection, LinkCheckError> {
    let mut links = LinkCollection::new();

    for (dir_name, source_type) in SITE_LAYOUT {
        let dir = root.join(dir_name);
        if !dir.is_dir() {
            warn!("Directory {} not found, skipping", dir.display());
            continue;
        }
        info!("Scanning {}", dir.display());

        let mut files = Vec::new();
        collect_sources(&dir, &mut files)?;
        files.sort();

        for path in files {
            scan_file(root, &path, *source_type, filter, &mut links);
        }
    }

    info!("Found {} unique external links", links.len());
    Ok(links)
}

fn scan_file(
    root: &Path,
    path: &Path,
    source_type: SourceType,
    filter: &ExternalityFilter,
    links: &mut LinkCollection,
) {
    let Some(format) = SourceFormat::from_path(path) else {
        return;
    };
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Could not read {}: {}", path.display(), e);
            return;
        }
    };

    let source = relative_source(root, path);
    let mut found = 0;
    for link in extract_links(&content, format) {
        if filter.is_external(&link.url) {
            found += 1;
            links.add(LinkRecord::new(link, source.clone(), source_type));
        }
    }
    debug!("{}: {} external links", source, found);
}

fn collect_sources(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), LinkCheckError> {
    let entries = std::fs::read_dir(dir).map_err(|e| LinkCheckError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;
    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Could not list entry in {}: {}", dir.display(), e);
                continue;
            }
        };
        let path = entry.path();
        // Symlinked directories are not descended into.
        let is_dir = match entry.file_type() {
            Ok(t) => t.is_dir(),
            Err(e) => {
                warn!("Could not stat {}: {}", path.display(), e);
                continue;
            }
        };
        if is_dir {
            collect_sources(&path, out)?;
        } else if SourceFormat::from_path(&path).is_some() {
            out.push(path);
        }
    }
    Ok(())
}

fn relative_source(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
