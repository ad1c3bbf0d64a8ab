//! Directory-backed TTL cache for registry responses
//!
//! Every entry lives in its own gzip-compressed JSON file named
//! `<sha256(key)>_<expiry-ms>.json.gz`, so the in-memory index can always be
//! rebuilt from the directory listing alone. `index.db` keeps the original
//! keys and creation times for entries that were saved before exit.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use rusqlite::Connection;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::version::error::CacheError;

const ENTRY_SUFFIX: &str = ".json.gz";
const TEMP_SUFFIX: &str = ".tmp";
const INDEX_DB: &str = "index.db";
const SCHEMA_VERSION: i32 = 1;

/// Metadata of one cached value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// SHA-256 hex digest of the cache key
    pub key_hash: String,
    /// Original key; unknown for entries adopted from a directory scan
    pub key: Option<String>,
    /// Backing file name relative to the cache directory
    pub file_name: String,
    /// Expiry as milliseconds since UNIX epoch
    pub expires_at: i64,
    /// Creation time as milliseconds since UNIX epoch
    pub created_at: Option<i64>,
}

impl CacheEntry {
    fn file_name_for(key_hash: &str, expires_at: i64) -> String {
        format!("{}_{}{}", key_hash, expires_at, ENTRY_SUFFIX)
    }

    /// Decode `(key_hash, expires_at)` from a backing file name
    fn parse_file_name(file_name: &str) -> Option<(String, i64)> {
        let stem = file_name.strip_suffix(ENTRY_SUFFIX)?;
        let (key_hash, expires_at) = stem.rsplit_once('_')?;
        if key_hash.len() != 64 || !key_hash.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        Some((key_hash.to_ascii_lowercase(), expires_at.parse().ok()?))
    }

    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms > self.expires_at
    }
}

struct CacheState {
    index: HashMap<String, CacheEntry>,
    conn: Connection,
}

impl CacheState {
    /// Drop the index entry and its backing file
    fn remove(&mut self, dir: &Path, key_hash: &str) -> Result<bool, CacheError> {
        let Some(entry) = self.index.remove(key_hash) else {
            return Ok(false);
        };
        remove_file_if_exists(&dir.join(&entry.file_name))?;
        Ok(true)
    }

    fn expired_hashes(&self, now_ms: i64) -> Vec<String> {
        self.index
            .values()
            .filter(|entry| entry.is_expired_at(now_ms))
            .map(|entry| entry.key_hash.clone())
            .collect()
    }
}

/// Persistent TTL cache shared by all resolution workers.
///
/// Every public operation takes the single internal lock, so one `Cache`
/// wrapped in an `Arc` can be handed to any number of threads or tasks.
pub struct Cache {
    dir: PathBuf,
    default_ttl: Duration,
    state: Mutex<CacheState>,
}

impl Cache {
    pub fn new(dir: &Path, default_ttl: Duration) -> Result<Self, CacheError> {
        info!("Initializing cache at {:?}", dir);
        fs::create_dir_all(dir)?;

        let conn = Connection::open(dir.join(INDEX_DB))?;
        Self::create_schema(&conn)?;

        let mut index = Self::scan_directory(dir)?;
        let restored = Self::restore_metadata(&conn, &mut index)?;
        debug!(
            "Rebuilt cache index with {} entries ({} with saved metadata)",
            index.len(),
            restored
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            default_ttl,
            state: Mutex::new(CacheState { index, conn }),
        })
    }

    fn create_schema(conn: &Connection) -> Result<(), CacheError> {
        let current_version: i32 =
            conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        // The record only enriches the directory scan, so an unknown layout is dropped
        if current_version != 0 && current_version != SCHEMA_VERSION {
            debug!(
                "Dropping cache index record with schema v{}",
                current_version
            );
            conn.execute("DROP TABLE IF EXISTS entries", [])?;
        }

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS entries (
                key_hash TEXT PRIMARY KEY,
                cache_key TEXT,
                file_name TEXT NOT NULL,
                expires_at INTEGER NOT NULL,
                created_at INTEGER
            )
            "#,
            [],
        )?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        Ok(())
    }

    /// Build the index from backing file names
    fn scan_directory(dir: &Path) -> Result<HashMap<String, CacheEntry>, CacheError> {
        let mut index: HashMap<String, CacheEntry> = HashMap::new();

        for dir_entry in fs::read_dir(dir)? {
            let dir_entry = dir_entry?;
            let file_name = dir_entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };

            if file_name.ends_with(TEMP_SUFFIX) {
                debug!("Removing interrupted write {}", file_name);
                remove_file_if_exists(&dir_entry.path())?;
                continue;
            }

            let Some((key_hash, expires_at)) = CacheEntry::parse_file_name(file_name) else {
                continue;
            };

            let entry = CacheEntry {
                key_hash: key_hash.clone(),
                key: None,
                file_name: file_name.to_string(),
                expires_at,
                created_at: None,
            };

            match index.entry(key_hash) {
                Entry::Vacant(slot) => {
                    slot.insert(entry);
                }
                Entry::Occupied(mut slot) => {
                    // Keep the newest file for a hash, delete the other one
                    let stale = if slot.get().expires_at >= entry.expires_at {
                        entry.file_name
                    } else {
                        slot.insert(entry).file_name
                    };
                    debug!("Removing duplicate cache file {}", stale);
                    remove_file_if_exists(&dir.join(stale))?;
                }
            }
        }

        Ok(index)
    }

    /// Attach saved keys and creation times to scanned entries
    fn restore_metadata(
        conn: &Connection,
        index: &mut HashMap<String, CacheEntry>,
    ) -> Result<usize, CacheError> {
        let mut stmt =
            conn.prepare("SELECT key_hash, cache_key, file_name, created_at FROM entries")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<i64>>(3)?,
            ))
        })?;

        let mut restored = 0;
        for row in rows {
            let (key_hash, key, file_name, created_at) = row?;
            if let Some(entry) = index.get_mut(&key_hash)
                && entry.file_name == file_name
            {
                entry.key = key;
                entry.created_at = created_at;
                restored += 1;
            }
        }
        Ok(restored)
    }

    /// Acquire the cache lock with proper error handling
    fn lock_state(&self) -> Result<MutexGuard<'_, CacheState>, CacheError> {
        self.state.lock().map_err(|_| CacheError::LockPoisoned)
    }

    fn current_timestamp_ms() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    /// Content hash used as the on-disk identity of `key`
    pub fn key_hash(key: &str) -> String {
        hex::encode(Sha256::digest(key.as_bytes()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Look up `key`; expired, missing or unreadable entries are evicted and
    /// reported as a miss.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        let key_hash = Self::key_hash(key);
        let now = Self::current_timestamp_ms();

        let mut state = self.lock_state()?;
        let Some(entry) = state.index.get(&key_hash).cloned() else {
            return Ok(None);
        };

        if entry.is_expired_at(now) {
            debug!("Cache entry expired: {}", key);
            state.remove(&self.dir, &key_hash)?;
            return Ok(None);
        }

        let bytes = match fs::read(self.dir.join(&entry.file_name)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Backing file missing for {}, dropping entry", key);
                state.index.remove(&key_hash);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        match decode(&bytes) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!("Discarding unreadable cache entry for {}: {}", key, e);
                state.remove(&self.dir, &key_hash)?;
                Ok(None)
            }
        }
    }

    /// Store `value` under `key` with the default TTL
    pub fn add<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        self.add_with_ttl(key, value, self.default_ttl)
    }

    /// Store `value` under `key`, replacing any previous entry completely
    pub fn add_with_ttl<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let payload = encode(value)?;
        let key_hash = Self::key_hash(key);
        let now = Self::current_timestamp_ms();
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at = now.saturating_add(ttl_ms);
        let file_name = CacheEntry::file_name_for(&key_hash, expires_at);

        let mut state = self.lock_state()?;
        state.remove(&self.dir, &key_hash)?;
        write_atomically(&self.dir.join(&file_name), &payload)?;
        state.index.insert(
            key_hash.clone(),
            CacheEntry {
                key_hash,
                key: Some(key.to_string()),
                file_name,
                expires_at,
                created_at: Some(now),
            },
        );

        debug!("Cached {} ({} bytes)", key, payload.len());
        Ok(())
    }

    /// Remove `key`; returns whether an entry existed
    pub fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let key_hash = Self::key_hash(key);
        let mut state = self.lock_state()?;
        state.remove(&self.dir, &key_hash)
    }

    /// Remove every entry whose expiry has passed
    pub fn delete_expired(&self) -> Result<usize, CacheError> {
        let now = Self::current_timestamp_ms();
        let mut state = self.lock_state()?;

        let expired = state.expired_hashes(now);
        for key_hash in &expired {
            state.remove(&self.dir, key_hash)?;
        }

        if !expired.is_empty() {
            info!("Removed {} expired cache entries", expired.len());
        }
        Ok(expired.len())
    }

    /// Remove every entry
    pub fn clear(&self) -> Result<usize, CacheError> {
        let mut state = self.lock_state()?;
        let hashes: Vec<String> = state.index.keys().cloned().collect();
        for key_hash in &hashes {
            state.remove(&self.dir, key_hash)?;
        }
        Ok(hashes.len())
    }

    /// Persist the index record so a later `Cache::new` can restore keys
    pub fn save(&self) -> Result<(), CacheError> {
        let mut guard = self.lock_state()?;
        let state = &mut *guard;

        let tx = state.conn.transaction()?;
        tx.execute("DELETE FROM entries", [])?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO entries (key_hash, cache_key, file_name, expires_at, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )?;
            for entry in state.index.values() {
                stmt.execute((
                    &entry.key_hash,
                    &entry.key,
                    &entry.file_name,
                    entry.expires_at,
                    entry.created_at,
                ))?;
            }
        }
        tx.commit()?;

        debug!("Saved cache index with {} entries", state.index.len());
        Ok(())
    }

    /// Snapshot of all entries ordered by expiry
    pub fn entries(&self) -> Result<Vec<CacheEntry>, CacheError> {
        let state = self.lock_state()?;
        let mut entries: Vec<CacheEntry> = state.index.values().cloned().collect();
        entries.sort_by(|a, b| {
            a.expires_at
                .cmp(&b.expires_at)
                .then_with(|| a.key_hash.cmp(&b.key_hash))
        });
        Ok(entries)
    }

    pub fn len(&self) -> Result<usize, CacheError> {
        Ok(self.lock_state()?.index.len())
    }

    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.lock_state()?.index.is_empty())
    }
}

fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CacheError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    serde_json::to_writer(&mut encoder, value)?;
    Ok(encoder.finish()?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CacheError> {
    Ok(serde_json::from_reader(GzDecoder::new(bytes))?)
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), CacheError> {
    let mut temp = path.as_os_str().to_owned();
    temp.push(TEMP_SUFFIX);
    let temp = PathBuf::from(temp);

    fs::write(&temp, bytes)?;
    fs::rename(&temp, path)?;
    Ok(())
}

fn remove_file_if_exists(path: &Path) -> Result<(), CacheError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
