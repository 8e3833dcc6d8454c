//! Persistent hash cache (C7 disk half): a user-scoped JSON file recording
//! which node content-hashes have already been inserted, so an unchanged
//! node can be skipped on a later run. Grounded on
//! `original_source/cli/badger/graph/hash_cache.py`.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::path::PathBuf;

const CACHE_FILE: &str = "node_hashes.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    /// `BTreeSet` rather than `HashSet` so the on-disk list has a stable
    /// order (§4.7 "serialized with stable key ordering").
    hashes: BTreeSet<String>,
}

pub struct HashCache {
    path: PathBuf,
    hashes: BTreeSet<String>,
}

impl HashCache {
    /// Opens the cache at `path`, creating an empty one if it doesn't exist
    /// or fails to parse.
    pub fn open(path: PathBuf) -> HashCache {
        let hashes = std::fs::read_to_string(&path)
            .ok()
            .and_then(|raw| serde_json::from_str::<CacheFile>(&raw).ok())
            .map(|f| f.hashes)
            .unwrap_or_default();
        HashCache { path, hashes }
    }

    /// Opens the cache at `~/.codegraph/node_hashes.json` (or the
    /// XDG/platform config dir equivalent).
    pub fn open_user_scoped() -> anyhow::Result<HashCache> {
        let base = dirs::config_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| anyhow::anyhow!("no resolvable user config directory"))?;
        let dir = base.join("codegraph");
        std::fs::create_dir_all(&dir)?;
        Ok(HashCache::open(dir.join(CACHE_FILE)))
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.hashes.contains(hash)
    }

    pub fn insert(&mut self, hash: String) {
        self.hashes.insert(hash);
    }

    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = CacheFile { hashes: self.hashes.clone() };
        std::fs::write(&self.path, serde_json::to_string_pretty(&file)?)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

/// Computes a node's content hash over its shaped wire fields, excluding
/// the embedding and positional (`line`/`column`) fields so that vector
/// regeneration or cosmetic line shifts don't invalidate the cache entry
/// (§4.7). `relationship_endpoint_ids` are the sorted, normalized IDs of
/// whatever this node points at, folded in separately since they don't
/// live in `shaped` itself.
pub fn node_content_hash(shaped: &serde_json::Value, relationship_endpoint_ids: &[String]) -> String {
    let mut fields: Vec<(String, String)> = shaped
        .as_object()
        .into_iter()
        .flatten()
        .filter(|(key, _)| {
            let key = key.as_str();
            !key.ends_with(".embedding") && !key.ends_with(".line") && !key.ends_with(".column")
        })
        .map(|(k, v)| (k.clone(), v.to_string()))
        .collect();
    fields.sort();

    let mut endpoints = relationship_endpoint_ids.to_vec();
    endpoints.sort();

    let mut hasher = Sha256::new();
    for (key, value) in &fields {
        hasher.update(key.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
        hasher.update(b";");
    }
    for id in &endpoints {
        hasher.update(id.as_bytes());
        hasher.update(b";");
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn hash_ignores_embedding_and_positional_fields() {
        let a = json!({"Function.name": "f", "Function.line": 1, "Function.embedding": [0.1, 0.2]});
        let b = json!({"Function.name": "f", "Function.line": 99, "Function.embedding": [9.9]});
        assert_eq!(node_content_hash(&a, &[]), node_content_hash(&b, &[]));
    }

    #[test]
    fn hash_changes_when_content_field_changes() {
        let a = json!({"Function.name": "f", "Function.signature": "f()"});
        let b = json!({"Function.name": "f", "Function.signature": "f(x)"});
        assert_ne!(node_content_hash(&a, &[]), node_content_hash(&b, &[]));
    }

    #[test]
    fn hash_is_order_independent_over_relationship_endpoints() {
        let node = json!({"Function.name": "f"});
        let h1 = node_content_hash(&node, &["b".into(), "a".into()]);
        let h2 = node_content_hash(&node, &["a".into(), "b".into()]);
        assert_eq!(h1, h2);
    }

    #[test]
    fn cache_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("node_hashes.json");

        let mut cache = HashCache::open(path.clone());
        cache.insert("abc123".into());
        cache.save().unwrap();

        let reopened = HashCache::open(path);
        assert!(reopened.contains("abc123"));
    }
}
