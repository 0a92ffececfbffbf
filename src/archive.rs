use crate::error::{CompressionError, Result};
use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::sync::Arc;
use zip::write::{FileOptions, ZipWriter};
use zip::{CompressionMethod, DateTime};

const FALLBACK_ENTRY_NAME: &str = "image";

/// One named blob to store in the archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub bytes: Arc<[u8]>,
}

impl ArchiveEntry {
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Serializes the entries into a ZIP archive, one file per entry, in order.
///
/// Payloads are stored without recompression and every entry gets the same
/// fixed timestamp, so identical input yields identical bytes. Duplicate names
/// are disambiguated with [`unique_entry_names`].
///
/// # Returns
/// * `Ok(bytes)` - the complete archive
/// * `Err(CompressionError::EmptyInput)` - there was nothing to package
pub fn build(entries: &[ArchiveEntry]) -> Result<Vec<u8>> {
    if entries.is_empty() {
        return Err(CompressionError::EmptyInput);
    }

    let names = unique_entry_names(entries.iter().map(|entry| entry.name.as_str()));
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644);

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (entry, name) in entries.iter().zip(names) {
        crate::verbose!("Packing {} ({} bytes)", name, entry.bytes.len());
        writer.start_file(name, options)?;
        writer.write_all(&entry.bytes)?;
    }

    Ok(writer.finish()?.into_inner())
}

/// [`build`] on Tokio's blocking pool.
pub async fn build_async(entries: Vec<ArchiveEntry>) -> Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || build(&entries)).await?
}

/// Entry names with directories stripped and collisions resolved.
///
/// The first occurrence keeps its name; later ones become `name (1).ext`,
/// `name (2).ext`, and so on.
pub fn unique_entry_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut used = HashSet::new();
    let mut unique = Vec::new();

    for name in names {
        let base = base_name(name);
        let mut candidate = base.to_string();
        let mut counter = 1;
        while used.contains(&candidate) {
            candidate = with_suffix(base, counter);
            counter += 1;
        }
        used.insert(candidate.clone());
        unique.push(candidate);
    }

    unique
}

fn base_name(name: &str) -> &str {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    match base {
        "" | "." | ".." => FALLBACK_ENTRY_NAME,
        _ => base,
    }
}

fn with_suffix(name: &str, counter: usize) -> String {
    match name.rfind('.') {
        Some(dot) if dot > 0 => format!("{} ({}){}", &name[..dot], counter, &name[dot..]),
        _ => format!("{} ({})", name, counter),
    }
}
