use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

use smdb_core::{LogSink, StoreError, TracingLog};
use tracing::{debug, instrument};

use crate::{
    cipher::Cipher,
    config::{ConfigError, StoreConfig},
    query::QueryRule,
};

/// Separator between slice elements in the stored form. By contract it
/// never occurs inside an element; it is not escaped.
const SLICE_SEPARATOR: char = '\u{1}';

/// Longest filename a key may map to.
const MAX_KEY_LEN: usize = 128;

struct Inner {
    /// Encoded values only; plaintext never rests here.
    entries: Mutex<HashMap<String, String>>,
    dir: PathBuf,
    cipher: Cipher,
    log: Arc<dyn LogSink>,
    ready: AtomicBool,
    /// At most one bulk read or write may be in flight per store.
    bulk: tokio::sync::Mutex<()>,
}

/// Handle to one named store. Clones share the same map, cipher, and
/// directory; synchronous operations only touch memory, while `write_*`,
/// `read_*`, and `remove*` reach the per-key files under
/// `<base>/smdb/<name>`.
#[derive(Clone)]
pub struct Smdb {
    inner: Arc<Inner>,
}

/// Configures and opens an [`Smdb`] store.
pub struct SmdbBuilder {
    name: String,
    base: PathBuf,
    prefer_aead: bool,
    preload: bool,
    log: Option<Arc<dyn LogSink>>,
}

impl SmdbBuilder {
    /// Prefer AES-GCM over the stream obfuscator (default true).
    pub fn prefer_aead(mut self, prefer: bool) -> Self {
        self.prefer_aead = prefer;
        self
    }

    /// Load all persisted entries during [`open`](Self::open) (default
    /// true). With preloading off, call `read_all` or `read_key` manually.
    pub fn preload(mut self, preload: bool) -> Self {
        self.preload = preload;
        self
    }

    /// Sink for the cipher-selection narrative; defaults to `tracing`.
    pub fn log(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.log = Some(sink);
        self
    }

    /// Select a cipher, create the store directory, and (unless disabled)
    /// load every persisted entry synchronously.
    pub fn open(self) -> Smdb {
        let log = self.log.unwrap_or_else(|| Arc::new(TracingLog));
        let cipher = Cipher::select(self.name.as_bytes(), self.prefer_aead, log.as_ref());
        let dir = self.base.join("smdb").join(&self.name);
        debug!(dir = %dir.display(), "opening smdb store");
        let _ = fs::create_dir_all(&dir);

        let db = Smdb {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                dir,
                cipher,
                log,
                ready: AtomicBool::new(true),
                bulk: tokio::sync::Mutex::new(()),
            }),
        };
        if self.preload {
            db.read_all();
        }
        db
    }

    /// Open without blocking on the initial load: the store handle returns
    /// immediately with `ready == false` and the load runs on the runtime;
    /// `on_loaded` fires once the store is ready. Must be called from
    /// within a tokio runtime.
    pub fn open_async(self, on_loaded: impl FnOnce() + Send + 'static) -> Smdb {
        let db = self.preload(false).open();
        db.inner.ready.store(false, Ordering::Release);
        db.read_all_async(on_loaded);
        db
    }
}

impl Smdb {
    pub fn builder(name: impl Into<String>, base: impl Into<PathBuf>) -> SmdbBuilder {
        SmdbBuilder {
            name: name.into(),
            base: base.into(),
            prefer_aead: true,
            preload: true,
            log: None,
        }
    }

    /// Builder prefilled from a [`StoreConfig`]; fails only when no base
    /// directory can be resolved.
    pub fn from_config(config: &StoreConfig) -> Result<SmdbBuilder, ConfigError> {
        let base = config.resolve_base_dir()?;
        Ok(Self::builder(&config.name, base)
            .prefer_aead(config.prefer_aead)
            .preload(config.preload))
    }

    /// Directory backing this store.
    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn encode(&self, value: &str) -> Result<String, StoreError> {
        Ok(self.inner.cipher.encode_str(value)?)
    }

    fn decode(&self, value: &str) -> Result<String, StoreError> {
        Ok(self.inner.cipher.decode_str(value)?)
    }

    // ---- memory operations ----

    /// Encode the value and store it in memory only.
    pub fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let encoded = self.encode(value)?;
        self.lock_entries().insert(key.to_string(), encoded);
        Ok(())
    }

    /// [`put`](Self::put) plus an immediate best-effort flush of that key
    /// to its backing file.
    pub fn put_permanent(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.put(key, value)?;
        self.write_key(key);
        Ok(())
    }

    pub fn put_value<T: ToString>(&self, key: &str, value: T) -> Result<(), StoreError> {
        self.put(key, &value.to_string())
    }

    pub fn put_value_permanent<T: ToString>(&self, key: &str, value: T) -> Result<(), StoreError> {
        self.put_permanent(key, &value.to_string())
    }

    /// Store an ordered sequence of strings joined by the (unescaped)
    /// U+0001 separator.
    pub fn put_slice<S: AsRef<str>>(&self, key: &str, items: &[S]) -> Result<(), StoreError> {
        self.put(key, &join_slice(items))
    }

    pub fn put_slice_permanent<S: AsRef<str>>(
        &self,
        key: &str,
        items: &[S],
    ) -> Result<(), StoreError> {
        self.put_permanent(key, &join_slice(items))
    }

    /// Decoded value for `key`, or `default` when the key is absent.
    /// Decode failure (tampered ciphertext) is the one loud path here.
    pub fn get(&self, key: &str, default: &str) -> Result<String, StoreError> {
        match self.lock_entries().get(key).cloned() {
            Some(encoded) => self.decode(&encoded),
            None => Ok(default.to_string()),
        }
    }

    /// Typed getter: parses the stored string, falling back to `default`
    /// on a missing key or any parse failure. Covers the integer, float,
    /// boolean, and byte accessors in one generic.
    pub fn get_parsed<T: FromStr>(&self, key: &str, default: T) -> Result<T, StoreError> {
        match self.lock_entries().get(key).cloned() {
            Some(encoded) => {
                let decoded = self.decode(&encoded)?;
                Ok(decoded.parse().unwrap_or(default))
            }
            None => Ok(default),
        }
    }

    /// Split a slice value back into its elements.
    pub fn get_slice(&self, key: &str, default: Vec<String>) -> Result<Vec<String>, StoreError> {
        match self.lock_entries().get(key).cloned() {
            Some(encoded) => {
                let decoded = self.decode(&encoded)?;
                Ok(decoded.split(SLICE_SEPARATOR).map(String::from).collect())
            }
            None => Ok(default),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.lock_entries().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_entries().is_empty()
    }

    /// Drop every in-memory entry; files stay untouched.
    pub fn clear_ram(&self) {
        self.lock_entries().clear();
    }

    pub fn is_ram_clean(&self) -> bool {
        self.is_empty()
    }

    /// Clone of the encoded in-memory map.
    pub fn dump(&self) -> HashMap<String, String> {
        self.lock_entries().clone()
    }

    /// Replace the in-memory map with an encoded dump.
    pub fn put_dump(&self, dump: HashMap<String, String>) {
        let mut entries = self.lock_entries();
        entries.clear();
        entries.extend(dump);
    }

    /// Keys in map-native (unspecified) order.
    pub fn keys(&self) -> Vec<String> {
        self.lock_entries().keys().cloned().collect()
    }

    /// Keys sorted lexicographically.
    pub fn keys_sorted(&self, descending: bool) -> Vec<String> {
        let mut keys = self.keys();
        keys.sort();
        if descending {
            keys.reverse();
        }
        keys
    }

    /// Match key names against an `OP=value` rule and return the decoded
    /// values for every hit.
    pub fn query(&self, rule: &str) -> Result<HashMap<String, String>, StoreError> {
        let rule = QueryRule::parse(rule)?;
        let mut out = HashMap::new();
        for key in self.keys() {
            if rule.matches(&key) {
                let value = self.get(&key, "")?;
                out.insert(key, value);
            }
        }
        Ok(out)
    }

    // ---- disk operations (best-effort by policy) ----

    /// Flush one key's encoded value to its file. A missing entry, an
    /// empty sanitized key, or any I/O failure makes this a no-op.
    pub fn write_key(&self, key: &str) {
        self.write_key_to(&self.inner.dir, key);
    }

    fn write_key_to(&self, dir: &Path, key: &str) {
        let file_name = sanitize_key(key);
        if file_name.is_empty() {
            return;
        }
        let Some(encoded) = self.lock_entries().get(key).cloned() else {
            return;
        };
        let _ = fs::write(dir.join(file_name), encoded.as_bytes());
    }

    /// Flush every key; one bad key never aborts the batch.
    #[instrument(skip_all)]
    pub fn write_all(&self) {
        self.write_all_to(&self.inner.dir);
    }

    fn write_all_to(&self, dir: &Path) {
        for key in self.keys() {
            self.write_key_to(dir, &key);
        }
    }

    /// Load one key's file into memory, keyed by its sanitized filename.
    pub fn read_key(&self, key: &str) {
        let file_name = sanitize_key(key);
        if file_name.is_empty() {
            return;
        }
        self.load_file(&self.inner.dir.join(file_name));
    }

    /// Clear the map and load every file in the store directory; the
    /// directory is created when missing. Unreadable files are skipped.
    #[instrument(skip_all)]
    pub fn read_all(&self) {
        self.clear_ram();
        let dir = &self.inner.dir;
        if !dir.exists() {
            let _ = fs::create_dir_all(dir);
            return;
        }
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            self.load_file(&entry.path());
        }
    }

    fn load_file(&self, path: &Path) {
        let Ok(content) = fs::read_to_string(path) else {
            return;
        };
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return;
        };
        // the writer never emits line breaks, so joining lines is lossless
        let value: String = content.lines().collect();
        self.lock_entries().insert(name.to_string(), value);
    }

    /// Remove the in-memory entry and best-effort delete its file.
    pub fn remove(&self, key: &str) {
        self.lock_entries().remove(key);
        let file_name = sanitize_key(key);
        if file_name.is_empty() {
            return;
        }
        let _ = fs::remove_file(self.inner.dir.join(file_name));
    }

    /// Clear memory and recursively delete the store's directory tree.
    pub fn remove_all(&self) {
        self.clear_ram();
        let _ = fs::remove_dir_all(&self.inner.dir);
    }

    /// `write_all` followed by `read_all`.
    pub fn refresh(&self) {
        self.write_all();
        self.read_all();
    }

    pub fn refresh_key(&self, key: &str) {
        self.write_key(key);
        self.read_key(key);
    }

    /// Flush every key into a foreign directory. The target must already
    /// exist as a directory; anything else is misuse and fails loudly.
    pub fn export_to_dir(&self, dir: &Path) -> Result<(), StoreError> {
        if !dir.is_dir() {
            return Err(StoreError::NotADirectory {
                path: dir.to_path_buf(),
            });
        }
        self.write_all_to(dir);
        Ok(())
    }

    // ---- async bulk operations ----

    /// False while an asynchronous bulk operation is in flight.
    pub fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::Acquire)
    }

    /// Run [`read_all`](Self::read_all) off the caller's thread of
    /// control. The per-store bulk lock serializes concurrent bulk
    /// operations; `on_finished` fires after the lock is released.
    /// Synchronous memory operations are deliberately not excluded while
    /// the load runs (single-writer target, documented race).
    #[instrument(skip_all)]
    pub fn read_all_async(&self, on_finished: impl FnOnce() + Send + 'static) {
        let db = self.clone();
        tokio::spawn(async move {
            let guard = db.inner.bulk.lock().await;
            db.inner.ready.store(false, Ordering::Release);
            db.read_all();
            db.inner.ready.store(true, Ordering::Release);
            drop(guard);
            on_finished();
        });
    }

    /// Run [`write_all`](Self::write_all) off the caller's thread of
    /// control; same locking and callback contract as
    /// [`read_all_async`](Self::read_all_async).
    #[instrument(skip_all)]
    pub fn write_all_async(&self, on_finished: impl FnOnce() + Send + 'static) {
        let db = self.clone();
        tokio::spawn(async move {
            let guard = db.inner.bulk.lock().await;
            db.inner.ready.store(false, Ordering::Release);
            db.write_all();
            db.inner.ready.store(true, Ordering::Release);
            drop(guard);
            on_finished();
        });
    }

    /// Log-sink access for collaborators that want to share the narrative.
    pub fn log(&self, line: &str) {
        self.inner.log.log(line);
    }
}

fn join_slice<S: AsRef<str>>(items: &[S]) -> String {
    let mut out = String::new();
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(SLICE_SEPARATOR);
        }
        out.push_str(item.as_ref());
    }
    out
}

/// Trim, then cap the filename at 128 characters by keeping the first and
/// last 64. Distinct long keys can collide; accepted limitation.
fn sanitize_key(key: &str) -> String {
    let key = key.trim();
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= MAX_KEY_LEN {
        return key.to_string();
    }
    chars[..MAX_KEY_LEN / 2]
        .iter()
        .chain(&chars[chars.len() - MAX_KEY_LEN / 2..])
        .collect()
}
