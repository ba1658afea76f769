//! ZIP packaging of converted artifacts.

use std::collections::HashSet;
use std::io::{Cursor, Write};
use tracing::{debug, info};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::core::{Artifact, Registry};
use crate::utils::{ConverterError, ConverterResult};

use super::filename::entry_name;

/// One file destined for the archive.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub name: String,
    pub artifact: Artifact,
}

/// Entries for every completed item, in registry order, named by `pattern`.
pub fn completed_entries(registry: &Registry, pattern: Option<&str>) -> Vec<ArchiveEntry> {
    let mut seen = HashSet::new();
    registry
        .completed()
        .filter_map(|item| item.artifact().map(|artifact| (item.name(), artifact)))
        .enumerate()
        .map(|(idx, (name, artifact))| {
            let candidate = entry_name(pattern, name, idx + 1, artifact.format);
            ArchiveEntry {
                name: unique_name(&mut seen, candidate),
                artifact: artifact.clone(),
            }
        })
        .collect()
}

/// Suffixes repeated names (` (2)`, ` (3)` …) so no entry is shadowed.
fn unique_name(seen: &mut HashSet<String>, candidate: String) -> String {
    if seen.insert(candidate.clone()) {
        return candidate;
    }
    let (stem, ext) = match candidate.rsplit_once('.') {
        Some((stem, ext)) => (stem.to_string(), format!(".{ext}")),
        None => (candidate.clone(), String::new()),
    };
    let mut n = 2;
    loop {
        let name = format!("{stem} ({n}){ext}");
        if seen.insert(name.clone()) {
            return name;
        }
        n += 1;
    }
}

/// Writes all entries into an in-memory deflated ZIP.
pub fn build_archive(entries: &[ArchiveEntry]) -> ConverterResult<Vec<u8>> {
    if entries.is_empty() {
        return Err(ConverterError::archive("No converted files to package"));
    }

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for entry in entries {
        zip.start_file(entry.name.as_str(), options)?;
        zip.write_all(&entry.artifact.bytes)?;
        debug!("Archived {} ({} bytes)", entry.name, entry.artifact.size());
    }
    let bytes = zip.finish()?.into_inner();
    info!("Packaged {} file(s) into {} bytes", entries.len(), bytes.len());
    Ok(bytes)
}
