//! Session credential storage.
//!
//! The bearer token lives under the key `token` in a persisted key/value
//! store. The API pipeline only ever calls [`CredentialStore::read`], which is
//! synchronous and infallible: anything that can fail (opening a file,
//! talking to the OS keychain) happens when the store is opened.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use keyring::Entry;
use thiserror::Error;
use zeroize::Zeroize;

/// Storage key holding the bearer token.
pub const TOKEN_KEY: &str = "token";

/// Keychain service name for the console.
const SERVICE_NAME: &str = "com.mailer.console";

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Keychain operation failed: {0}")]
    Keychain(String),

    #[error("Credential storage {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Credential storage {path:?} is malformed: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("No configuration directory available for credential storage")]
    NoStorageDir,
}

impl From<keyring::Error> for CredentialError {
    fn from(err: keyring::Error) -> Self {
        CredentialError::Keychain(err.to_string())
    }
}

/// Read access to the session credential, plus the writers used by the
/// login/logout flow.
pub trait CredentialStore: Send + Sync {
    /// Current token, if any.
    fn read(&self) -> Option<String>;

    /// Persist a new token, replacing any previous one.
    fn store(&self, token: &str) -> Result<(), CredentialError>;

    /// Remove the token. Idempotent.
    fn clear(&self) -> Result<(), CredentialError>;
}

/// Which backing store to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Memory,
    File,
    Keychain,
}

impl std::str::FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreKind::Memory),
            "file" => Ok(StoreKind::File),
            "keychain" => Ok(StoreKind::Keychain),
            other => Err(format!("unknown credential store '{}'", other)),
        }
    }
}

/// Open the configured store. `path` only applies to [`StoreKind::File`];
/// `None` means the default location under the user's config directory.
pub fn open_store(
    kind: StoreKind,
    path: Option<&Path>,
) -> Result<Arc<dyn CredentialStore>, CredentialError> {
    let store: Arc<dyn CredentialStore> = match kind {
        StoreKind::Memory => Arc::new(MemoryStore::new()),
        StoreKind::File => {
            let path = match path {
                Some(p) => p.to_path_buf(),
                None => FileStore::default_path()?,
            };
            Arc::new(FileStore::open(path)?)
        }
        StoreKind::Keychain => Arc::new(KeychainStore::open()?),
    };
    Ok(store)
}

// Lock poisoning only means another thread panicked mid-write; the data is
// still a valid token or map, so keep serving it.
fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn wipe(slot: &mut Option<String>) {
    if let Some(ref mut token) = *slot {
        token.zeroize();
    }
    *slot = None;
}

// ── Memory ────────────────────────────────────────────────────────────────────

/// In-process store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    token: RwLock<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl CredentialStore for MemoryStore {
    fn read(&self) -> Option<String> {
        read_lock(&self.token).clone()
    }

    fn store(&self, token: &str) -> Result<(), CredentialError> {
        let mut guard = write_lock(&self.token);
        wipe(&mut guard);
        *guard = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialError> {
        wipe(&mut write_lock(&self.token));
        Ok(())
    }
}

// ── File ──────────────────────────────────────────────────────────────────────

/// JSON key/value file shared by everything the console persists.
///
/// The whole file is loaded on open; reads are served from that snapshot and
/// every write replaces the file. A token written to the file by another
/// process after `open` is not seen until the store is reopened, which suits
/// the one-shot shell. Keys other than `token` are preserved.
///
/// On unix the file is created with mode `0600`.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    /// `<config_dir>/mailer-console/storage.json`
    pub fn default_path() -> Result<PathBuf, CredentialError> {
        dirs::config_dir()
            .map(|dir| dir.join("mailer-console").join("storage.json"))
            .ok_or(CredentialError::NoStorageDir)
    }

    /// Load the store from `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CredentialError> {
        let path = path.into();
        let entries = match fs::read(&path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| {
                CredentialError::Malformed {
                    path: path.clone(),
                    source,
                }
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(CredentialError::Io { path, source }),
        };
        log::debug!("Opened credential storage at {:?}", path);
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `entries` to a sibling temp file, then rename it over the store
    /// so a crash never leaves a truncated file behind.
    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), CredentialError> {
        let io_err = |source: io::Error| CredentialError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let bytes = serde_json::to_vec_pretty(entries).map_err(|source| {
            CredentialError::Malformed {
                path: self.path.clone(),
                source,
            }
        })?;

        let tmp = self.path.with_extension("json.tmp");
        let written = write_private(&tmp, &bytes).and_then(|()| fs::rename(&tmp, &self.path));
        if written.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        written.map_err(io_err)
    }
}

/// Create (or truncate) `path` readable by the owner only and sync `bytes`
/// to disk.
fn write_private(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    // An existing temp file keeps its old mode; tighten it explicitly.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(bytes)?;
    file.sync_all()
}

impl CredentialStore for FileStore {
    fn read(&self) -> Option<String> {
        read_lock(&self.entries).get(TOKEN_KEY).cloned()
    }

    fn store(&self, token: &str) -> Result<(), CredentialError> {
        let mut guard = write_lock(&self.entries);
        let mut next = guard.clone();
        next.insert(TOKEN_KEY.to_string(), token.to_string());
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialError> {
        let mut guard = write_lock(&self.entries);
        if !guard.contains_key(TOKEN_KEY) {
            return Ok(());
        }
        let mut next = guard.clone();
        if let Some(mut old) = next.remove(TOKEN_KEY) {
            old.zeroize();
        }
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }
}

// ── Keychain ──────────────────────────────────────────────────────────────────

/// Token kept in the OS keychain.
///
/// The entry is read once when the store is opened and cached; writes go to
/// the keychain first and update the cache only on success.
pub struct KeychainStore {
    entry: Entry,
    cached: RwLock<Option<String>>,
}

impl KeychainStore {
    pub fn open() -> Result<Self, CredentialError> {
        let entry = Entry::new(SERVICE_NAME, TOKEN_KEY)?;
        let cached = match entry.get_password() {
            Ok(token) => Some(token),
            Err(keyring::Error::NoEntry) => None,
            Err(e) => return Err(CredentialError::from(e)),
        };
        Ok(Self {
            entry,
            cached: RwLock::new(cached),
        })
    }
}

impl CredentialStore for KeychainStore {
    fn read(&self) -> Option<String> {
        read_lock(&self.cached).clone()
    }

    fn store(&self, token: &str) -> Result<(), CredentialError> {
        self.entry.set_password(token)?;
        let mut guard = write_lock(&self.cached);
        wipe(&mut guard);
        *guard = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialError> {
        match self.entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => {}
            Err(e) => return Err(CredentialError::from(e)),
        }
        wipe(&mut write_lock(&self.cached));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_lifecycle() {
        let store = MemoryStore::new();
        assert_eq!(store.read(), None);

        store.store("abc123").unwrap();
        assert_eq!(store.read().as_deref(), Some("abc123"));

        store.store("def456").unwrap();
        assert_eq!(store.read().as_deref(), Some("def456"));

        store.clear().unwrap();
        assert_eq!(store.read(), None);
        // Idempotent
        store.clear().unwrap();
    }

    #[test]
    fn test_file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("storage.json")).unwrap();
        assert_eq!(store.read(), None);
    }

    #[test]
    fn test_file_store_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let store = FileStore::open(&path).unwrap();
        store.store("abc123").unwrap();

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.read().as_deref(), Some("abc123"));

        reopened.clear().unwrap();
        let again = FileStore::open(&path).unwrap();
        assert_eq!(again.read(), None);
    }

    #[test]
    fn test_file_store_preserves_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, r#"{"theme":"dark","token":"old"}"#).unwrap();

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.read().as_deref(), Some("old"));
        store.clear().unwrap();

        let raw: BTreeMap<String, String> =
            serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw.get("theme").map(String::as_str), Some("dark"));
        assert!(!raw.contains_key(TOKEN_KEY));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_token_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        // Pre-existing world-readable file must be tightened on write
        fs::write(&path, "{}").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        let store = FileStore::open(&path).unwrap();
        store.store("abc123").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o077, 0, "token file mode = {:o}", mode & 0o777);
    }

    #[test]
    fn test_file_store_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");

        let store = FileStore::open(&path).unwrap();
        store.store("abc123").unwrap();
        store.store("def456").unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["storage.json"]);
        assert_eq!(
            FileStore::open(&path).unwrap().read().as_deref(),
            Some("def456")
        );
    }

    #[test]
    fn test_file_store_malformed_fails_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, "not json").unwrap();

        let result = FileStore::open(&path);
        assert!(matches!(result, Err(CredentialError::Malformed { .. })));
    }

    #[test]
    fn test_store_kind_parse() {
        assert_eq!("file".parse::<StoreKind>().unwrap(), StoreKind::File);
        assert_eq!(" Keychain ".parse::<StoreKind>().unwrap(), StoreKind::Keychain);
        assert_eq!("memory".parse::<StoreKind>().unwrap(), StoreKind::Memory);
        assert!("redis".parse::<StoreKind>().is_err());
    }

    #[test]
    fn test_open_store_file_with_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        let store = open_store(StoreKind::File, Some(path.as_path())).unwrap();
        store.store("xyz").unwrap();
        assert!(path.exists());
        assert_eq!(store.read().as_deref(), Some("xyz"));
    }
}
