use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

/// Disk-persisted memoization of remote API responses.
///
/// Entries are keyed by (endpoint, parameter set); parameters are
/// serialized with sorted keys so logically identical requests share an
/// entry regardless of insertion order. Entries are never evicted:
/// responses for pinned revision identifiers cannot go stale, and
/// mutable queries can be refreshed by running with the cache disabled.
pub struct FetchCache {
    dir: Option<PathBuf>,
}

impl FetchCache {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir: Some(dir) }
    }

    /// A cache that never hits and never persists (forced refresh)
    pub fn disabled() -> Self {
        Self { dir: None }
    }

    /// Per-user default location for cache entries
    pub fn default_dir() -> Result<PathBuf> {
        Ok(dirs::cache_dir()
            .context("Could not determine cache directory")?
            .join("bloatwatch"))
    }

    fn entry_path(&self, endpoint: &str, params: &BTreeMap<String, String>) -> Option<PathBuf> {
        let dir = self.dir.as_ref()?;
        // BTreeMap serializes with sorted keys, giving an order-independent digest
        let serialized = serde_json::to_string(params).ok()?;
        let mut hasher = Sha256::new();
        hasher.update(endpoint.as_bytes());
        hasher.update(b"\n");
        hasher.update(serialized.as_bytes());
        let digest = hex::encode(hasher.finalize());
        Some(dir.join(format!("{}_{}.json", endpoint, digest)))
    }

    /// Return the memoized payload for (endpoint, params), invoking
    /// `fetch` only on a miss. Persistence is best-effort: a failed
    /// write degrades that key to always-miss without failing the fetch.
    pub fn get_or_fetch(
        &self,
        endpoint: &str,
        params: &BTreeMap<String, String>,
        fetch: impl FnOnce() -> Result<String>,
    ) -> Result<String> {
        let path = self.entry_path(endpoint, params);

        if let Some(path) = &path {
            if let Ok(cached) = fs::read_to_string(path) {
                return Ok(cached);
            }
        }

        let payload = fetch()?;

        if let Some(path) = &path {
            if let Some(parent) = path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            let _ = fs::write(path, &payload);
        }

        Ok(payload)
    }
}
