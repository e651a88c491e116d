//! Session-scoped storage backends and the visit history value type.

use lb_core::WidgetError;
use lb_core::WidgetResult;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

/// Key/value store with the semantics of per-tab session storage.
///
/// Values are opaque strings; callers own the encoding. Implementations are
/// injected into the widget so it never touches ambient global state.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> WidgetResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> WidgetResult<()>;
    fn remove(&self, key: &str) -> WidgetResult<()>;
}

impl<S: SessionStore + ?Sized> SessionStore for Box<S> {
    fn get(&self, key: &str) -> WidgetResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> WidgetResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> WidgetResult<()> {
        (**self).remove(key)
    }
}

/// In-memory store scoped to the lifetime of the hosting process.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemorySessionStore {
    fn entries(&self) -> WidgetResult<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.entries.lock().map_err(|_| {
            WidgetError::new(
                "storage.memory.lock_poisoned",
                "session store mutex poisoned by a panicking writer",
            )
        })
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> WidgetResult<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> WidgetResult<()> {
        self.entries()?.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> WidgetResult<()> {
        self.entries()?.remove(key);
        Ok(())
    }
}

/// File-backed store for host shells that emulate a tab session spanning
/// several process runs.
///
/// Records are one `key\tvalue` line each, both fields hex-encoded so the
/// separator can never collide with stored data.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> WidgetResult<Option<String>> {
        let records = read_records(&self.path)?;
        Ok(records.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> WidgetResult<()> {
        let mut records = read_records(&self.path)?;
        records.insert(key.to_owned(), value.to_owned());
        write_records(&self.path, &records)
    }

    fn remove(&self, key: &str) -> WidgetResult<()> {
        let mut records = read_records(&self.path)?;
        records.remove(key);

        if records.is_empty() {
            if self.path.exists() {
                fs::remove_file(&self.path).map_err(|error| {
                    WidgetError::new(
                        "storage.file.remove_failed",
                        format!(
                            "failed removing empty session file `{}`: {error}",
                            self.path.display()
                        ),
                    )
                })?;
            }
            return Ok(());
        }

        write_records(&self.path, &records)
    }
}

fn read_records(path: &Path) -> WidgetResult<BTreeMap<String, String>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }

    let content = fs::read_to_string(path).map_err(|error| {
        WidgetError::new(
            "storage.file.read_failed",
            format!("failed to read session file `{}`: {error}", path.display()),
        )
    })?;

    let mut records = BTreeMap::new();
    for (index, line) in content.lines().enumerate() {
        if line.is_empty() {
            continue;
        }

        let (key_hex, value_hex) = line.split_once('\t').ok_or_else(|| {
            WidgetError::new(
                "storage.file.record_invalid",
                format!(
                    "invalid record format at `{}` line {}",
                    path.display(),
                    index + 1
                ),
            )
        })?;

        records.insert(decode_field(key_hex)?, decode_field(value_hex)?);
    }

    Ok(records)
}

fn write_records(path: &Path, records: &BTreeMap<String, String>) -> WidgetResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|error| {
            WidgetError::new(
                "storage.file.dir_create_failed",
                format!(
                    "failed to create session directory `{}`: {error}",
                    parent.display()
                ),
            )
        })?;
    }

    let mut encoded = String::new();
    for (key, value) in records {
        encoded.push_str(&encode_field(key));
        encoded.push('\t');
        encoded.push_str(&encode_field(value));
        encoded.push('\n');
    }

    fs::write(path, encoded).map_err(|error| {
        WidgetError::new(
            "storage.file.write_failed",
            format!("failed to write session file `{}`: {error}", path.display()),
        )
    })
}

fn encode_field(value: &str) -> String {
    let mut out = String::with_capacity(value.len().saturating_mul(2));
    for byte in value.as_bytes() {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

fn decode_field(value: &str) -> WidgetResult<String> {
    if value.len() % 2 != 0 {
        return Err(WidgetError::new(
            "storage.file.hex_invalid",
            "hex field length must be even",
        ));
    }

    let mut bytes = Vec::with_capacity(value.len() / 2);
    for pair in value.as_bytes().chunks(2) {
        let text = std::str::from_utf8(pair).map_err(|_| {
            WidgetError::new("storage.file.hex_invalid", "hex field is not ASCII")
        })?;
        let byte = u8::from_str_radix(text, 16).map_err(|_| {
            WidgetError::new(
                "storage.file.hex_invalid",
                format!("invalid hex pair `{text}`"),
            )
        })?;
        bytes.push(byte);
    }

    String::from_utf8(bytes).map_err(|error| {
        WidgetError::new(
            "storage.file.utf8_invalid",
            format!("session field is not valid UTF-8: {error}"),
        )
    })
}

/// Ordered history of visited product handles, most recent first.
///
/// Stored as a plain JSON array of strings so any other reader of the
/// session slot sees the same shape the browser original wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisitHistory {
    handles: Vec<String>,
}

impl VisitHistory {
    pub fn new() -> Self {
        Self {
            handles: Vec::new(),
        }
    }

    /// Moves `handle` to the front, deduplicating any earlier occurrence,
    /// then truncates to `cap`.
    pub fn record(&mut self, handle: &str, cap: usize) {
        self.handles.retain(|existing| existing != handle);
        self.handles.insert(0, handle.to_owned());
        self.handles.truncate(cap);
    }

    pub fn handles(&self) -> &[String] {
        &self.handles
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Loads the history stored under `key`, treating a missing slot or a
    /// payload that does not parse as an empty history.
    pub fn load<S>(store: &S, key: &str) -> WidgetResult<Self>
    where
        S: SessionStore + ?Sized,
    {
        let Some(raw) = store.get(key)? else {
            return Ok(Self::new());
        };

        match serde_json::from_str(&raw) {
            Ok(history) => Ok(history),
            Err(error) => {
                tracing::debug!("discarding malformed visit history: {error}");
                Ok(Self::new())
            }
        }
    }

    pub fn save<S>(&self, store: &S, key: &str) -> WidgetResult<()>
    where
        S: SessionStore + ?Sized,
    {
        let encoded = serde_json::to_string(self).map_err(|error| {
            WidgetError::new(
                "storage.history.encode_failed",
                format!("failed to encode visit history: {error}"),
            )
        })?;
        store.set(key, &encoded)
    }
}
