//! Discovery of Doorstop documents from their `.doorstop.yml` marker files.

use std::{
    collections::BTreeMap,
    ffi::OsStr,
    fs,
    path::{Component, Path},
};

use serde::Deserialize;
use walkdir::{DirEntry, WalkDir};

/// Name of the marker file Doorstop keeps in every document directory.
pub const MARKER_FILE: &str = ".doorstop.yml";

/// Directory Doorstop publishes into; never holds documents.
const OUTPUT_DIR: &str = "output";

/// Mapping of document directory (relative to the requirements directory,
/// `/`-separated) to the document's prefix.
pub type Documents = BTreeMap<String, String>;

#[derive(Debug, Default, Deserialize)]
struct Marker {
    #[serde(default)]
    settings: Option<Settings>,
    #[serde(default)]
    prefix: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Settings {
    #[serde(default)]
    prefix: Option<String>,
}

/// Scans `reqs_dir` for Doorstop documents.
///
/// Every directory below `reqs_dir` (at any depth) holding a
/// [`MARKER_FILE`] is a document. Hidden directories and the publish output
/// directory are skipped.
///
/// A missing `reqs_dir`, or one with no marker files, yields an empty mapping.
/// When two documents share a prefix both are kept; they are separate
/// directories.
///
/// The filesystem is re-read on every call.
#[must_use]
pub fn discover_documents(reqs_dir: &Path) -> Documents {
    let mut documents = Documents::new();
    if !reqs_dir.is_dir() {
        tracing::debug!("No requirements directory at {}", reqs_dir.display());
        return documents;
    }

    let walker = WalkDir::new(reqs_dir)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_ignored_dir(entry));

    for entry in walker.filter_map(Result::ok) {
        if !entry.file_type().is_dir() {
            continue;
        }
        let marker = entry.path().join(MARKER_FILE);
        if !marker.is_file() {
            continue;
        }

        let Some(name) = document_name(reqs_dir, entry.path()) else {
            continue;
        };
        let prefix = read_prefix(&marker).unwrap_or_else(|| fallback_prefix(entry.path()));

        if let Some((other, _)) = documents.iter().find(|(_, p)| **p == prefix) {
            tracing::warn!("Documents '{other}' and '{name}' share the prefix '{prefix}'");
        }
        tracing::debug!("Discovered document '{name}' with prefix '{prefix}'");
        documents.insert(name, prefix);
    }

    documents
}

fn is_ignored_dir(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || (entry.depth() == 1 && name == OUTPUT_DIR)
}

fn document_name(reqs_dir: &Path, dir: &Path) -> Option<String> {
    let relative = dir.strip_prefix(reqs_dir).ok()?;
    let parts: Vec<_> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}

/// Reads the prefix from a marker file.
///
/// Doorstop nests it under `settings`; a top-level `prefix` is accepted too.
/// Files that are not valid YAML are scanned line by line instead.
fn read_prefix(marker: &Path) -> Option<String> {
    let content = match fs::read_to_string(marker) {
        Ok(content) => content,
        Err(e) => {
            tracing::debug!("Failed to read {}: {e}", marker.display());
            return None;
        }
    };

    let prefix = match serde_yaml::from_str::<Marker>(&content) {
        Ok(parsed) => parsed
            .settings
            .and_then(|settings| settings.prefix)
            .or(parsed.prefix),
        Err(e) => {
            tracing::debug!("Falling back to a line scan of {}: {e}", marker.display());
            scan_prefix(&content)
        }
    };

    prefix
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
}

fn scan_prefix(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        line.trim()
            .strip_prefix("prefix:")
            .map(|value| value.trim().trim_matches(['"', '\'']).to_string())
    })
}

fn fallback_prefix(dir: &Path) -> String {
    dir.file_name()
        .map(OsStr::to_string_lossy)
        .unwrap_or_default()
        .to_uppercase()
}
