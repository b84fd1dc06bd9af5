//! On-disk snapshot envelope shared by the synchronous stores
//!
//! The fallback and channel stores keep their authoritative data in memory
//! and mirror it to a single JSON file after every mutation. The file is a
//! versioned, checksummed envelope; a corrupt or tampered file is treated as
//! absent data rather than an error the caller has to handle.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

const SNAPSHOT_VERSION: u32 = 1;

/// Versioned snapshot envelope
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    version: u32,
    checksum: String,
    entries: BTreeMap<String, String>,
}

fn checksum(entries: &BTreeMap<String, String>) -> String {
    // BTreeMap serialization is deterministic, so the digest is stable
    // across write and reload.
    let json = serde_json::to_string(entries).unwrap_or_default();
    format!("{:x}", md5::compute(json))
}

/// Load a snapshot file, returning an empty map when the file is missing,
/// unreadable, malformed, or fails its checksum.
pub(crate) fn load(path: &Path) -> BTreeMap<String, String> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(e) => {
            tracing::warn!("Failed to read snapshot {}: {}", path.display(), e);
            return BTreeMap::new();
        }
    };

    let snapshot: Snapshot = match serde_json::from_str(&contents) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::warn!("Malformed snapshot {}: {}", path.display(), e);
            return BTreeMap::new();
        }
    };

    if snapshot.version != SNAPSHOT_VERSION {
        tracing::warn!(
            "Snapshot {} has version {}, expected {}",
            path.display(),
            snapshot.version,
            SNAPSHOT_VERSION
        );
        return BTreeMap::new();
    }

    if checksum(&snapshot.entries) != snapshot.checksum {
        tracing::warn!("Checksum mismatch in snapshot {}", path.display());
        return BTreeMap::new();
    }

    snapshot.entries
}

/// Persist a snapshot file atomically (temp file + rename). Best-effort:
/// failures are logged and the in-memory copy stays authoritative for the
/// rest of the session.
pub(crate) fn persist(path: &Path, entries: &BTreeMap<String, String>) {
    let snapshot = Snapshot {
        version: SNAPSHOT_VERSION,
        checksum: checksum(entries),
        entries: entries.clone(),
    };

    let json = match serde_json::to_string(&snapshot) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!("Failed to serialize snapshot {}: {}", path.display(), e);
            return;
        }
    };

    let temp_path = path.with_extension("tmp");
    if let Err(e) = std::fs::write(&temp_path, &json) {
        tracing::warn!("Failed to write snapshot {}: {}", temp_path.display(), e);
        return;
    }
    if let Err(e) = std::fs::rename(&temp_path, path) {
        tracing::warn!("Failed to replace snapshot {}: {}", path.display(), e);
    }
}
