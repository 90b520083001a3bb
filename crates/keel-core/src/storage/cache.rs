use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::kernel::constants::{CACHE_DIR, CACHE_FORMAT_VERSION};
use crate::kernel::error::Result;
use crate::plugin_system::manifest::{Artifact, ManifestKind};
use crate::storage::error::StorageSystemError;
use crate::storage::local::LocalStorageProvider;
use crate::storage::provider::StorageProvider;

/// On-disk wrapper around one artifact. Field order is the serialized order.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    format: u32,
    kind: ManifestKind,
    checksum: String,
    payload: Value,
}

/// One checksummed JSON file per manifest kind under `<storage>/cache/`.
///
/// A missing file reads as `None`. A file that exists but fails any check
/// (envelope shape, format version, kind, checksum, payload shape) is
/// [`StorageSystemError::CacheCorrupt`].
#[derive(Clone)]
pub struct CacheStore {
    provider: Arc<dyn StorageProvider>,
    dir: PathBuf,
}

impl CacheStore {
    /// Cache rooted at `<storage_path>/cache`.
    pub fn new(storage_path: impl Into<PathBuf>) -> Self {
        Self::with_provider(Arc::new(LocalStorageProvider::new(storage_path.into())))
    }

    pub fn with_provider(provider: Arc<dyn StorageProvider>) -> Self {
        Self { provider, dir: PathBuf::from(CACHE_DIR) }
    }

    fn relative(&self, kind: ManifestKind) -> PathBuf {
        self.dir.join(format!("{}.json", kind.stem()))
    }

    /// Where `kind`'s artifact lives.
    pub fn path(&self, kind: ManifestKind) -> PathBuf {
        self.provider.resolve(&self.relative(kind))
    }

    pub fn exists(&self, kind: ManifestKind) -> bool {
        self.provider.exists(&self.relative(kind))
    }

    pub fn read(&self, kind: ManifestKind) -> Result<Option<Artifact>> {
        let relative = self.relative(kind);
        let bytes = match self.provider.read_if_exists(&relative)? {
            Some(bytes) => bytes,
            None => {
                log::debug!("Cache miss for '{}'", kind);
                return Ok(None);
            }
        };
        let corrupt = |reason: String| StorageSystemError::corrupt(kind, self.provider.resolve(&relative), reason);

        let envelope: Envelope =
            serde_json::from_slice(&bytes).map_err(|e| corrupt(format!("invalid envelope: {}", e)))?;
        if envelope.format != CACHE_FORMAT_VERSION {
            return Err(corrupt(format!(
                "unsupported format version {} (expected {})",
                envelope.format, CACHE_FORMAT_VERSION
            ))
            .into());
        }
        if envelope.kind != kind {
            return Err(corrupt(format!("holds '{}' data", envelope.kind)).into());
        }
        if checksum(&envelope.payload) != envelope.checksum {
            return Err(corrupt("checksum mismatch".to_string()).into());
        }
        let artifact =
            Artifact::from_value(kind, envelope.payload).map_err(|e| corrupt(format!("invalid payload: {}", e)))?;

        log::debug!("Cache hit for '{}'", kind);
        Ok(Some(artifact))
    }

    /// Write `artifact` atomically. Equal artifacts produce equal bytes.
    pub fn write(&self, artifact: &Artifact) -> Result<()> {
        let kind = artifact.kind();
        let payload = artifact.to_value();
        let envelope = Envelope {
            format: CACHE_FORMAT_VERSION,
            kind,
            checksum: checksum(&payload),
            payload,
        };
        let mut bytes = serde_json::to_vec_pretty(&envelope).map_err(|e| StorageSystemError::SerializationError {
            format: "json".to_string(),
            source: Box::new(e),
        })?;
        bytes.push(b'\n');

        self.provider.write_bytes(&self.relative(kind), &bytes)?;
        log::info!("Cached '{}' at {}", kind, self.path(kind).display());
        Ok(())
    }

    /// Remove `kind`'s artifact. Missing is success; returns whether a file was removed.
    pub fn delete(&self, kind: ManifestKind) -> Result<bool> {
        let removed = self.provider.remove_if_exists(&self.relative(kind))?;
        if removed {
            log::info!("Cleared '{}' cache", kind);
        }
        Ok(removed)
    }
}

impl fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("provider", &self.provider)
            .field("dir", &self.dir)
            .finish()
    }
}

/// Hex SHA-256 of the compact JSON encoding of `payload`.
fn checksum(payload: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}
