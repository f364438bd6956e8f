// src/utils/cache.rs

//! Definition cache for merged purifier policies.
//!
//! Entries are opaque bytes keyed by a fingerprint and validated by an etag.
//! [`NullDefinitionCache`] is the default and never stores anything;
//! [`FileDefinitionCache`] keeps one file per entry:
//!
//! ```text
//! {root}/
//! +-- VERSION          # crate version that wrote the entries
//! +-- 3f2a...e9        # [etag_len: u32 LE][etag bytes][data bytes]
//! ```
//!
//! Every failure is swallowed: a cache miss is always a valid answer.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

pub trait DefinitionCache: Send + Sync {
    /// Returns the stored bytes when `key` exists and was written with `etag`.
    fn get(&self, key: &str, etag: &str) -> Option<Vec<u8>>;

    /// Stores `value`, replacing any previous entry for `key`.
    fn set(&self, key: &str, etag: &str, value: &[u8]);
}

/// Always misses.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDefinitionCache;

impl DefinitionCache for NullDefinitionCache {
    fn get(&self, _key: &str, _etag: &str) -> Option<Vec<u8>> {
        None
    }

    fn set(&self, _key: &str, _etag: &str, _value: &[u8]) {}
}

/// Directory-backed cache shared safely between processes.
///
/// Writes go to a uniquely named temp file that is renamed into place, so
/// readers only ever see complete entries.
#[derive(Debug, Clone)]
pub struct FileDefinitionCache {
    root: PathBuf,
}

impl FileDefinitionCache {
    /// Opens the cache at `root`, creating it if needed.
    ///
    /// Returns `None` when the directory cannot be created or written to.
    /// A `VERSION` mismatch clears stale entries.
    pub fn open(root: impl Into<PathBuf>, version: &str) -> Option<Self> {
        let root = root.into();

        if let Err(e) = fs::create_dir_all(&root) {
            tracing::debug!("purifier cache {:?} unavailable: {}", root, e);
            return None;
        }

        let version_file = root.join("VERSION");
        match fs::read_to_string(&version_file) {
            Ok(stored) if stored == version => {}
            Ok(stored) => {
                tracing::info!(
                    "purifier cache version changed ({} -> {}), clearing entries",
                    stored,
                    version
                );
                clear_entries(&root);
            }
            Err(_) => {}
        }

        // Writing VERSION doubles as the writability probe.
        if let Err(e) = write_atomic(&version_file, version.as_bytes()) {
            tracing::debug!("purifier cache {:?} is not writable: {}", root, e);
            return None;
        }

        Some(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl DefinitionCache for FileDefinitionCache {
    fn get(&self, key: &str, etag: &str) -> Option<Vec<u8>> {
        let mut file = File::open(self.root.join(key)).ok()?;

        let mut len_buf = [0u8; 4];
        file.read_exact(&mut len_buf).ok()?;
        let etag_len = u32::from_le_bytes(len_buf) as usize;

        let mut stored_etag = vec![0u8; etag_len];
        file.read_exact(&mut stored_etag).ok()?;
        if stored_etag != etag.as_bytes() {
            return None;
        }

        let mut data = Vec::new();
        file.read_to_end(&mut data).ok()?;
        Some(data)
    }

    fn set(&self, key: &str, etag: &str, value: &[u8]) {
        let etag_bytes = etag.as_bytes();
        let mut buf = Vec::with_capacity(4 + etag_bytes.len() + value.len());
        buf.extend_from_slice(&(etag_bytes.len() as u32).to_le_bytes());
        buf.extend_from_slice(etag_bytes);
        buf.extend_from_slice(value);

        if let Err(e) = write_atomic(&self.root.join(key), &buf) {
            tracing::debug!("failed to write purifier cache entry {}: {}", key, e);
        }
    }
}

fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    let seq = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    tmp.push(format!(".{}-{}.tmp", std::process::id(), seq));
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path).inspect_err(|_| {
        let _ = fs::remove_file(&tmp);
    })
}

fn clear_entries(root: &Path) {
    let Ok(entries) = fs::read_dir(root) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_file() {
            let _ = fs::remove_file(path);
        }
    }
}
