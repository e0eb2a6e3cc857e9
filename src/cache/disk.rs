//! Disk Tier Module
//!
//! Persistent, byte-bounded entry store rooted at a directory:
//!
//! ```text
//! <root>/objects/<sha256(key)>.entry   one JSON header line, then the payload
//! <root>/tmp/                          in-flight writes and detached objects, emptied on open
//! <root>/tombstones/<sha256(key)>      objects that were dropped but could not be moved away
//! <root>/index.json                    metadata snapshot written by flush()
//! ```
//!
//! Writes land in `tmp/` and are renamed into `objects/`, so a crash never
//! leaves a half-written object under a readable name. Dropped objects are
//! renamed back into `tmp/` under the index lock and unlinked after it is
//! released. The in-memory index is authoritative for liveness, and a
//! tombstone keeps an object that could not be moved from being indexed again
//! on the next open.

use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::expiration::is_expired;
use crate::cache::{
    CacheEntry, CacheKey, EntryMeta, EvictionPolicy, EvictionTracker, KeyLocks, Tier,
};
use crate::error::{CacheError, Result};

const OBJECTS_DIR: &str = "objects";
const TMP_DIR: &str = "tmp";
const TOMBSTONE_DIR: &str = "tombstones";
const INDEX_FILE: &str = "index.json";
const OBJECT_EXT: &str = "entry";
const INDEX_VERSION: u32 = 1;
/// Upper bound on a header line; keys are capped well below this.
const MAX_HEADER_LEN: u64 = 4096;

// == On-disk Records ==
#[derive(Debug, Serialize, Deserialize)]
struct ObjectHeader {
    #[serde(flatten)]
    meta: EntryMeta,
    /// Hex SHA-256 of the payload
    checksum: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedIndex {
    version: u32,
    entries: Vec<EntryMeta>,
}

// == Index ==
#[derive(Debug)]
struct DiskIndex {
    entries: HashMap<CacheKey, EntryMeta>,
    tracker: EvictionTracker,
    used_bytes: u64,
    /// File stems with a tombstone on disk
    tombstones: HashSet<String>,
}

impl DiskIndex {
    fn new(policy: EvictionPolicy) -> Self {
        Self {
            entries: HashMap::new(),
            tracker: EvictionTracker::new(policy),
            used_bytes: 0,
            tombstones: HashSet::new(),
        }
    }

    fn insert(&mut self, meta: EntryMeta) {
        self.tracker.insert(&meta.key, meta.created_at);
        self.used_bytes += meta.size_bytes;
        if let Some(old) = self.entries.insert(meta.key.clone(), meta) {
            self.used_bytes = self.used_bytes.saturating_sub(old.size_bytes);
        }
    }

    fn remove(&mut self, key: &CacheKey) -> Option<EntryMeta> {
        let meta = self.entries.remove(key)?;
        self.tracker.remove(key);
        self.used_bytes = self.used_bytes.saturating_sub(meta.size_bytes);
        Some(meta)
    }

    fn pop_victim(&mut self) -> Option<EntryMeta> {
        let key = self.tracker.pop_victim()?;
        let meta = self.entries.remove(&key)?;
        self.used_bytes = self.used_bytes.saturating_sub(meta.size_bytes);
        Some(meta)
    }
}

// == Temp Object Guard ==
/// Deletes an unpublished temp file when dropped, including when the writing
/// future is cancelled before the rename.
#[derive(Debug)]
struct TempObject {
    path: PathBuf,
    armed: bool,
}

impl TempObject {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for TempObject {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let path = std::mem::take(&mut self.path);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                // Detached: the unlink finishes without blocking this worker
                drop(handle.spawn_blocking(move || std::fs::remove_file(path)));
            }
            Err(_) => {
                let _ = std::fs::remove_file(path);
            }
        }
    }
}

// == Disk Tier ==
/// Durable tier. Cheap to clone; clones share the same directory and index.
#[derive(Debug, Clone)]
pub struct DiskTier {
    inner: Arc<DiskInner>,
}

#[derive(Debug)]
struct DiskInner {
    root: PathBuf,
    objects: PathBuf,
    tmp: PathBuf,
    tombstones: PathBuf,
    capacity_bytes: u64,
    /// Held across renames so accounting matches the directory
    index: Mutex<DiskIndex>,
    /// Held by a publish from before it is spawned until it lands; removals
    /// of the same key wait on it
    publishing: KeyLocks,
    used_bytes: AtomicU64,
    len: AtomicUsize,
    temp_seq: AtomicU64,
    /// True while `index.json` matches the index; cleared by the next mutation
    snapshot_current: AtomicBool,
}

impl DiskTier {
    // == Open ==
    /// Opens (creating if needed) a disk tier at `root` and rebuilds its
    /// accounting from what is already persisted.
    pub async fn open(
        root: impl Into<PathBuf>,
        capacity_bytes: u64,
        policy: EvictionPolicy,
    ) -> Result<Self> {
        let root = root.into();
        let objects = root.join(OBJECTS_DIR);
        let tmp = root.join(TMP_DIR);
        let tombstones = root.join(TOMBSTONE_DIR);

        for dir in [&objects, &tmp, &tombstones] {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| CacheError::storage(format!("create {}", dir.display()), e))?;
        }

        let inner = DiskInner {
            root,
            objects,
            tmp,
            tombstones,
            capacity_bytes,
            index: Mutex::new(DiskIndex::new(policy)),
            publishing: KeyLocks::default(),
            used_bytes: AtomicU64::new(0),
            len: AtomicUsize::new(0),
            temp_seq: AtomicU64::new(0),
            snapshot_current: AtomicBool::new(false),
        };

        inner.clear_tmp().await;
        inner.rebuild().await?;

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Path of the published object for `key`.
    pub fn object_path(&self, key: &CacheKey) -> PathBuf {
        self.inner.object_path(key)
    }
}

impl DiskInner {
    fn object_path(&self, key: &CacheKey) -> PathBuf {
        self.object_path_for_stem(&key.file_stem())
    }

    fn object_path_for_stem(&self, stem: &str) -> PathBuf {
        self.objects.join(format!("{}.{}", stem, OBJECT_EXT))
    }

    fn temp_path(&self, stem: &str) -> PathBuf {
        let seq = self.temp_seq.fetch_add(1, Ordering::Relaxed);
        self.tmp
            .join(format!("{}.{}.{}.tmp", stem, std::process::id(), seq))
    }

    fn sync_counters(&self, index: &DiskIndex) {
        self.used_bytes.store(index.used_bytes, Ordering::Release);
        self.len.store(index.entries.len(), Ordering::Release);
    }

    async fn clear_tmp(&self) {
        let Ok(mut dir) = fs::read_dir(&self.tmp).await else {
            return;
        };
        while let Ok(Some(item)) = dir.next_entry().await {
            if let Err(e) = fs::remove_file(item.path()).await {
                warn!(path = %item.path().display(), error = %e, "failed to remove stale temp file");
            }
        }
    }

    // == Rebuild ==
    /// Reconstructs the index: trusts `index.json` for files it lists, reads
    /// the header of any file it doesn't, and deletes unreadable files.
    async fn rebuild(&self) -> Result<()> {
        let snapshot = self.take_index_snapshot().await;
        let mut index = self.index.lock().await;
        index.tombstones = self.load_tombstones().await?;

        let mut dir = fs::read_dir(&self.objects)
            .await
            .map_err(|e| CacheError::storage(format!("list {}", self.objects.display()), e))?;

        let mut recovered = 0usize;
        let mut scanned = 0usize;
        loop {
            let item = match dir.next_entry().await {
                Ok(Some(item)) => item,
                Ok(None) => break,
                Err(e) => {
                    return Err(CacheError::storage(
                        format!("list {}", self.objects.display()),
                        e,
                    ))
                }
            };
            let path = item.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(OBJECT_EXT) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()).map(str::to_owned) else {
                continue;
            };

            if index.tombstones.contains(&stem) {
                if let Err(e) = fs::remove_file(&path).await {
                    warn!(path = %path.display(), error = %e, "tombstoned disk object is still present");
                }
                continue;
            }

            if let Some(meta) = snapshot.get(&stem) {
                index.insert(meta.clone());
                recovered += 1;
                continue;
            }

            scanned += 1;
            match read_header(&path).await {
                Ok(header) if header.meta.key.file_stem() == stem => {
                    index.insert(header.meta);
                    recovered += 1;
                }
                Ok(_) | Err(_) => {
                    warn!(path = %path.display(), "removing unreadable disk cache object");
                    let _ = fs::remove_file(&path).await;
                }
            }
        }

        while index.used_bytes > self.capacity_bytes {
            let Some(victim) = index.pop_victim() else {
                break;
            };
            self.delete_object(&victim.key).await.ok();
        }

        self.settle_tombstones(&mut index).await;
        self.sync_counters(&index);
        info!(
            root = %self.root.display(),
            entries = recovered,
            headers_read = scanned,
            tombstones = index.tombstones.len(),
            bytes = index.used_bytes,
            "disk tier opened"
        );
        Ok(())
    }

    /// Reads and consumes `index.json`, keyed by object file stem. A missing or
    /// unreadable index yields an empty map and forces header reads.
    async fn take_index_snapshot(&self) -> HashMap<String, EntryMeta> {
        let path = self.root.join(INDEX_FILE);
        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(_) => return HashMap::new(),
        };

        // Consumed on open so a crash before the next flush can't trust a stale copy
        if let Err(e) = fs::remove_file(&path).await {
            warn!(error = %e, "failed to consume disk index, rebuilding from objects");
            return HashMap::new();
        }

        match serde_json::from_slice::<PersistedIndex>(&raw) {
            Ok(persisted) if persisted.version == INDEX_VERSION => persisted
                .entries
                .into_iter()
                .map(|meta| (meta.key.file_stem(), meta))
                .collect(),
            Ok(persisted) => {
                warn!(version = persisted.version, "ignoring disk index with unknown version");
                HashMap::new()
            }
            Err(e) => {
                warn!(error = %e, "disk index is corrupt, rebuilding from objects");
                HashMap::new()
            }
        }
    }

    /// Deletes a flushed `index.json` before the first change that would make
    /// it stale. Callers hold the index lock.
    async fn retire_snapshot(&self) {
        if !self.snapshot_current.swap(false, Ordering::AcqRel) {
            return;
        }
        let path = self.root.join(INDEX_FILE);
        if let Err(e) = fs::remove_file(&path).await {
            if e.kind() != ErrorKind::NotFound {
                warn!(error = %e, "failed to retire disk index snapshot");
            }
        }
    }

    // == Tombstones ==
    async fn load_tombstones(&self) -> Result<HashSet<String>> {
        let mut dir = fs::read_dir(&self.tombstones)
            .await
            .map_err(|e| CacheError::storage(format!("list {}", self.tombstones.display()), e))?;

        let mut stems = HashSet::new();
        while let Some(item) = dir
            .next_entry()
            .await
            .map_err(|e| CacheError::storage(format!("list {}", self.tombstones.display()), e))?
        {
            if let Some(stem) = item.file_name().to_str() {
                stems.insert(stem.to_owned());
            }
        }
        Ok(stems)
    }

    /// Drops tombstones whose object is gone. Runs under the index lock.
    async fn settle_tombstones(&self, index: &mut DiskIndex) {
        let stems: Vec<String> = index.tombstones.iter().cloned().collect();
        for stem in stems {
            if matches!(fs::try_exists(self.object_path_for_stem(&stem)).await, Ok(true)) {
                continue;
            }
            if self.unbury(index, &stem).await {
                debug!(stem = %stem, "tombstone settled");
            }
        }
    }

    /// Records that `key`'s object must never be indexed again. Runs under
    /// the index lock.
    async fn bury(&self, index: &mut DiskIndex, key: &CacheKey) -> Result<()> {
        let stem = key.file_stem();
        let path = self.tombstones.join(&stem);
        fs::write(&path, key.as_str())
            .await
            .map_err(|e| CacheError::storage(format!("write {}", path.display()), e))?;
        index.tombstones.insert(stem);
        Ok(())
    }

    /// Deletes the tombstone for `stem`, if any. Returns false if one is left
    /// behind. Runs under the index lock.
    async fn unbury(&self, index: &mut DiskIndex, stem: &str) -> bool {
        if !index.tombstones.contains(stem) {
            return true;
        }
        let path = self.tombstones.join(stem);
        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to remove tombstone");
                return false;
            }
        }
        index.tombstones.remove(stem);
        true
    }

    // == Detach ==
    /// Moves the object of an unindexed key into `tmp/`, returning the new
    /// path to unlink once the index lock is released. An object that cannot
    /// be moved gets a tombstone; if that fails too the removal is not durable
    /// and `StorageUnavailable` is returned. Runs under the index lock.
    async fn detach(&self, index: &mut DiskIndex, key: &CacheKey) -> Result<Option<PathBuf>> {
        let object = self.object_path(key);
        let detached = self.temp_path(&key.file_stem());
        let err = match fs::rename(&object, &detached).await {
            Ok(()) => return Ok(Some(detached)),
            Err(e) => e,
        };
        if matches!(fs::try_exists(&object).await, Ok(false)) {
            return Ok(None);
        }

        warn!(key = %key, error = %err, "disk object could not be detached, tombstoning");
        self.bury(index, key).await.map(|()| None).map_err(|e| {
            CacheError::StorageUnavailable(format!(
                "removal of '{key}' is not durable: {err}; {e}"
            ))
        })
    }

    async fn delete_object(&self, key: &CacheKey) -> Result<()> {
        let path = self.object_path(key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::storage(format!("remove {}", path.display()), e)),
        }
    }

    // == Publish ==
    /// Makes a fully written temp file the live object for `meta.key`,
    /// evicting other entries first if needed.
    async fn publish(&self, mut temp: TempObject, meta: EntryMeta) -> Result<Vec<CacheKey>> {
        let mut detached = Vec::new();
        let result = {
            let mut guard = self.index.lock().await;
            let index = &mut *guard;
            let key = meta.key.clone();
            self.retire_snapshot().await;

            // The replaced entry no longer competes for space or for victim selection
            let replaced = index.remove(&key);

            let mut evicted = Vec::new();
            while index.used_bytes + meta.size_bytes > self.capacity_bytes {
                let Some(victim) = index.pop_victim() else {
                    break;
                };
                match self.detach(index, &victim.key).await {
                    Ok(path) => detached.extend(path),
                    Err(e) => warn!(key = %victim.key, error = %e, "evicted disk object left behind"),
                }
                debug!(key = %victim.key, "disk tier evicted entry");
                evicted.push(victim.key);
            }

            let object = self.object_path(&key);
            match fs::rename(&temp.path, &object).await {
                Ok(()) => {
                    temp.disarm();
                    self.unbury(index, &key.file_stem()).await;
                    index.insert(meta);
                    self.sync_counters(index);
                    Ok(evicted)
                }
                Err(e) => {
                    // The old object may still be on disk but is no longer indexed
                    if replaced.is_some() {
                        match self.detach(index, &key).await {
                            Ok(path) => detached.extend(path),
                            Err(e) => warn!(key = %key, error = %e, "replaced disk object left behind"),
                        }
                    }
                    self.sync_counters(index);
                    Err(CacheError::storage(format!("publish {}", object.display()), e))
                }
            }
        };

        unlink_detached(detached).await;
        result
    }
}

/// Unlinks objects already moved out of `objects/`. Leftovers sit in `tmp/`
/// and are swept on the next open.
async fn unlink_detached(paths: Vec<PathBuf>) {
    for path in paths {
        if let Err(e) = fs::remove_file(&path).await {
            warn!(path = %path.display(), error = %e, "failed to unlink detached disk object");
        }
    }
}

// == Object Encoding ==
async fn read_header(path: &Path) -> Result<ObjectHeader> {
    let file = fs::File::open(path)
        .await
        .map_err(|e| CacheError::storage(format!("open {}", path.display()), e))?;
    let mut reader = BufReader::new(file.take(MAX_HEADER_LEN));
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .await
        .map_err(|e| CacheError::storage(format!("read {}", path.display()), e))?;

    if !line.ends_with('\n') {
        return Err(CacheError::Corrupt {
            key: path.display().to_string(),
            reason: "header line is unterminated".to_string(),
        });
    }
    serde_json::from_str(line.trim_end()).map_err(|e| CacheError::Corrupt {
        key: path.display().to_string(),
        reason: format!("header is not valid JSON: {e}"),
    })
}

fn checksum(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

/// Splits a raw object into an entry, verifying it belongs to `key`.
fn decode_object(key: &CacheKey, raw: Vec<u8>) -> std::result::Result<CacheEntry, String> {
    let mut raw = Bytes::from(raw);
    let split = raw
        .iter()
        .position(|b| *b == b'\n')
        .ok_or_else(|| "missing header line".to_string())?;
    let payload = raw.split_off(split + 1);

    let header: ObjectHeader = serde_json::from_slice(&raw[..split])
        .map_err(|e| format!("header is not valid JSON: {e}"))?;

    if &header.meta.key != key {
        return Err(format!("object belongs to key '{}'", header.meta.key));
    }
    if payload.len() as u64 != header.meta.size_bytes {
        return Err(format!(
            "payload is {} bytes, header says {}",
            payload.len(),
            header.meta.size_bytes
        ));
    }
    if checksum(&payload) != header.checksum {
        return Err("payload checksum mismatch".to_string());
    }

    Ok(CacheEntry::with_timestamps(
        header.meta.key,
        payload,
        header.meta.created_at,
        header.meta.expires_at,
    ))
}

#[async_trait]
impl Tier for DiskTier {
    fn name(&self) -> &'static str {
        "disk"
    }

    fn capacity_bytes(&self) -> u64 {
        self.inner.capacity_bytes
    }

    fn current_size_bytes(&self) -> u64 {
        self.inner.used_bytes.load(Ordering::Acquire)
    }

    fn len(&self) -> usize {
        self.inner.len.load(Ordering::Acquire)
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        if !self.inner.index.lock().await.entries.contains_key(key) {
            return Ok(None);
        }

        let path = self.inner.object_path(key);
        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(key = %key, "indexed disk object is missing");
                self.remove(key).await.ok();
                return Ok(None);
            }
            Err(e) => return Err(CacheError::storage(format!("read {}", path.display()), e)),
        };

        match decode_object(key, raw) {
            Ok(entry) => Ok(Some(entry)),
            Err(reason) => {
                // Corruption reads as a miss; the object is dropped so it can't recur
                warn!(key = %key, reason = %reason, "corrupt disk object, treating as miss");
                if let Err(e) = self.remove(key).await {
                    warn!(key = %key, error = %e, "failed to remove corrupt disk object");
                }
                Ok(None)
            }
        }
    }

    async fn put(&self, entry: CacheEntry) -> Result<Vec<CacheKey>> {
        let size = entry.size_bytes();
        if size > self.inner.capacity_bytes {
            return Err(CacheError::CapacityExceeded {
                tier: self.name(),
                size_bytes: size,
                capacity_bytes: self.inner.capacity_bytes,
            });
        }

        let meta = entry.meta();
        let header = ObjectHeader {
            meta: meta.clone(),
            checksum: checksum(entry.payload()),
        };
        let mut header_line = serde_json::to_vec(&header)
            .map_err(|e| CacheError::Internal(format!("encode object header: {e}")))?;
        header_line.push(b'\n');

        let temp = TempObject::new(self.inner.temp_path(&meta.key.file_stem()));
        let mut file = fs::File::create(&temp.path)
            .await
            .map_err(|e| CacheError::storage(format!("create {}", temp.path.display()), e))?;
        file.write_all(&header_line)
            .await
            .map_err(|e| CacheError::storage(format!("write {}", temp.path.display()), e))?;
        file.write_all(entry.payload())
            .await
            .map_err(|e| CacheError::storage(format!("write {}", temp.path.display()), e))?;
        file.sync_all()
            .await
            .map_err(|e| CacheError::storage(format!("sync {}", temp.path.display()), e))?;
        drop(file);

        // Once publishing starts it runs to completion even if the caller stops waiting
        let permit = self.inner.publishing.lock_owned(&meta.key).await;
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let _permit = permit;
            inner.publish(temp, meta).await
        })
            .await
            .map_err(|e| CacheError::Internal(format!("disk publish task failed: {e}")))?
    }

    /// Waits for any in-flight publish of `key` first, so a write whose
    /// caller gave up cannot land after the removal.
    async fn remove(&self, key: &CacheKey) -> Result<Option<EntryMeta>> {
        let _publishing = self.inner.publishing.lock(key).await;
        let (meta, detached) = {
            let mut index = self.inner.index.lock().await;
            let Some(meta) = index.remove(key) else {
                return Ok(None);
            };
            self.inner.retire_snapshot().await;
            self.inner.sync_counters(&index);
            let detached = self.inner.detach(&mut index, key).await?;
            (meta, detached)
        };

        unlink_detached(detached.into_iter().collect()).await;
        Ok(Some(meta))
    }

    async fn record_access(&self, key: &CacheKey) {
        self.inner.index.lock().await.tracker.touch(key);
    }

    async fn remove_expired(&self, now: u64) -> Result<Vec<CacheKey>> {
        let mut detached = Vec::new();
        let expired = {
            let mut index = self.inner.index.lock().await;
            let expired: Vec<CacheKey> = index
                .entries
                .values()
                .filter(|meta| is_expired(*meta, now))
                .map(|meta| meta.key.clone())
                .collect();
            if !expired.is_empty() {
                self.inner.retire_snapshot().await;
            }

            for key in &expired {
                index.remove(key);
                match self.inner.detach(&mut index, key).await {
                    Ok(path) => detached.extend(path),
                    Err(e) => warn!(key = %key, error = %e, "expired disk object left behind"),
                }
            }

            self.inner.sync_counters(&index);
            expired
        };

        unlink_detached(detached).await;
        Ok(expired)
    }

    /// Waits for every in-flight publish, then drops all entries.
    async fn clear(&self) -> Result<usize> {
        let _publishing = self.inner.publishing.lock_all().await;
        let mut detached = Vec::new();
        let mut failures = 0usize;
        let keys = {
            let mut index = self.inner.index.lock().await;
            let keys: Vec<CacheKey> = index.entries.keys().cloned().collect();
            self.inner.retire_snapshot().await;

            index.entries.clear();
            index.tracker.clear();
            index.used_bytes = 0;
            self.inner.sync_counters(&index);

            for key in &keys {
                match self.inner.detach(&mut index, key).await {
                    Ok(path) => detached.extend(path),
                    Err(e) => {
                        warn!(key = %key, error = %e, "cleared disk object left behind");
                        failures += 1;
                    }
                }
            }
            keys
        };

        unlink_detached(detached).await;
        if failures > 0 {
            return Err(CacheError::StorageUnavailable(format!(
                "{failures} of {} disk objects could not be deleted",
                keys.len()
            )));
        }
        Ok(keys.len())
    }

    async fn flush(&self) -> Result<()> {
        let index = self.inner.index.lock().await;
        let persisted = PersistedIndex {
            version: INDEX_VERSION,
            entries: index.entries.values().cloned().collect(),
        };
        let raw = serde_json::to_vec(&persisted)
            .map_err(|e| CacheError::Internal(format!("encode disk index: {e}")))?;

        let mut temp = TempObject::new(self.inner.temp_path("index"));
        fs::write(&temp.path, &raw)
            .await
            .map_err(|e| CacheError::storage(format!("write {}", temp.path.display()), e))?;

        let target = self.inner.root.join(INDEX_FILE);
        fs::rename(&temp.path, &target)
            .await
            .map_err(|e| CacheError::storage(format!("publish {}", target.display()), e))?;
        temp.disarm();
        self.inner.snapshot_current.store(true, Ordering::Release);

        debug!(entries = persisted.entries.len(), "disk index flushed");
        Ok(())
    }
}
