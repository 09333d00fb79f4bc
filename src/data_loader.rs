use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::{Result, TrackerError};
use crate::normalizer::{normalize, Normalized};

/// Parses an export. Malformed input becomes `TrackerError::Parse`, never a
/// partial value.
pub fn parse_json(bytes: &[u8]) -> Result<Value> {
    Ok(serde_json::from_slice(bytes)?)
}

type ContentKey = [u8; 32];

fn content_key(bytes: &[u8]) -> ContentKey {
    let digest = Sha256::digest(bytes);
    let mut key = [0u8; 32];
    key.copy_from_slice(&digest);
    key
}

/// Single-slot memo of the last parsed export, keyed by content digest.
#[derive(Debug, Default)]
pub struct SnapshotCache {
    entry: Option<(ContentKey, Arc<Value>)>,
    hits: u64,
    misses: u64,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, bytes: &[u8]) -> Result<Arc<Value>> {
        let key = content_key(bytes);
        if let Some((cached_key, value)) = &self.entry {
            if *cached_key == key {
                self.hits += 1;
                debug!("Snapshot cache hit ({} bytes)", bytes.len());
                return Ok(Arc::clone(value));
            }
        }

        self.misses += 1;
        debug!("Snapshot cache miss ({} bytes)", bytes.len());
        self.invalidate();
        let value = Arc::new(parse_json(bytes)?);
        self.entry = Some((key, Arc::clone(&value)));
        Ok(value)
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

/// A normalized load of one export file.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub source: PathBuf,
    pub normalized: Normalized,
}

/// Reads one export file and runs it through the cache and normalizer.
/// Each dashboard session owns its own loader.
#[derive(Debug)]
pub struct DataLoader {
    path: PathBuf,
    cache: SnapshotCache,
}

impl DataLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: SnapshotCache::new(),
        }
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    pub fn read(&self) -> Result<Vec<u8>> {
        fs::read(&self.path).map_err(|source| TrackerError::Io {
            path: self.path.clone(),
            source,
        })
    }

    pub fn load(&mut self) -> Result<Snapshot> {
        info!("Loading {:?}", self.path);
        let bytes = self.read()?;
        let value = self.cache.load(&bytes)?;
        let normalized = normalize(&value);

        Ok(Snapshot {
            source: self.path.clone(),
            normalized,
        })
    }
}
