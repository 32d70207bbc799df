//! Durable key-value storage for the session token
//!
//! The session store persists exactly one entry, `auth-token`, through a
//! `TokenStore`. Several backends exist so the same binaries work on a desktop
//! with an OS keyring, on a headless box, and inside tests:
//!
//! - `KeyringStore`: OS-native secure storage (default)
//! - `EncryptedFileStore`: `age` passphrase-encrypted files
//! - `FileStore`: plain files with owner-only permissions
//! - `MemoryStore`: process-local map, nothing survives exit
//! - `StorageManager`: facade that picks and falls back between them
//!
//! # Example
//!
//! ```no_run
//! use libencore::storage::{StorageConfig, StorageManager, TokenStore, TOKEN_KEY};
//!
//! # fn example() -> libencore::Result<()> {
//! let manager = StorageManager::new(StorageConfig::default())?;
//! manager.store(TOKEN_KEY, "eyJhbGciOi...")?;
//! let token = manager.retrieve(TOKEN_KEY)?;
//! manager.delete(TOKEN_KEY)?;
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use crate::error::{Result, StorageError};

/// Namespace for every entry Encore writes
pub const SERVICE: &str = "encore";

/// Key of the persisted bearer token
pub const TOKEN_KEY: &str = "auth-token";

/// Synchronous key-value backend
///
/// Implementations are blocking; async callers go through
/// `tokio::task::spawn_blocking` (see `SessionStore`).
pub trait TokenStore: Send + Sync {
    /// Store a value, replacing any previous one
    fn store(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a value
    ///
    /// # Errors
    ///
    /// `StorageError::NotFound` when the key has never been stored or was deleted.
    fn retrieve(&self, key: &str) -> Result<String>;

    /// Delete a value. Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> Result<()>;

    fn exists(&self, key: &str) -> Result<bool> {
        match self.retrieve(key) {
            Ok(_) => Ok(true),
            Err(crate::EncoreError::Storage(StorageError::NotFound(_))) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Backend identifier for logs ("keyring", "encrypted_file", ...)
    fn backend_name(&self) -> &str;
}

fn qualified(key: &str) -> String {
    format!("{}.{}", SERVICE, key)
}

/// OS-native keyring storage backend
///
/// macOS Keychain, Windows Credential Manager, or the Secret Service on Linux.
/// Headless Linux and containers usually have none, in which case `new`
/// fails with `StorageError::KeyringUnavailable`.
pub struct KeyringStore;

impl KeyringStore {
    pub fn new() -> Result<Self> {
        match keyring::Entry::new(SERVICE, "availability_check") {
            Ok(_) => Ok(Self),
            Err(e) => Err(StorageError::KeyringUnavailable(format!(
                "OS keyring not accessible: {}",
                e
            ))
            .into()),
        }
    }

    fn entry(key: &str) -> Result<keyring::Entry> {
        keyring::Entry::new(SERVICE, key)
            .map_err(|e| StorageError::KeyringUnavailable(e.to_string()).into())
    }
}

impl TokenStore for KeyringStore {
    fn store(&self, key: &str, value: &str) -> Result<()> {
        Self::entry(key)?
            .set_password(value)
            .map_err(|e| StorageError::Keyring(e.to_string()))?;

        tracing::debug!("Stored {} in OS keyring", qualified(key));
        Ok(())
    }

    fn retrieve(&self, key: &str) -> Result<String> {
        match Self::entry(key)?.get_password() {
            Ok(value) => Ok(value),
            Err(keyring::Error::NoEntry) => Err(StorageError::NotFound(qualified(key)).into()),
            Err(e) => Err(StorageError::Keyring(e.to_string()).into()),
        }
    }

    fn delete(&self, key: &str) -> Result<()> {
        match Self::entry(key)?.delete_password() {
            Ok(_) => {
                tracing::debug!("Deleted {} from OS keyring", qualified(key));
                Ok(())
            }
            Err(keyring::Error::NoEntry) => {
                tracing::debug!("{} not found (already deleted)", qualified(key));
                Ok(())
            }
            Err(e) => Err(StorageError::Keyring(e.to_string()).into()),
        }
    }

    fn backend_name(&self) -> &str {
        "keyring"
    }
}

/// Refuse to follow symlinks when reading token files
pub fn validate_not_symlink(path: &Path) -> Result<()> {
    let metadata = std::fs::symlink_metadata(path).map_err(StorageError::Io)?;

    if metadata.is_symlink() {
        return Err(StorageError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!(
                "Token file '{}' is a symbolic link; token files must be regular files",
                path.display()
            ),
        ))
        .into());
    }

    Ok(())
}

fn write_private(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(StorageError::Io)?;
    }

    if path.exists() {
        validate_not_symlink(path)?;
    }

    std::fs::write(path, data).map_err(StorageError::Io)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, perms).map_err(StorageError::Io)?;
    }

    Ok(())
}

fn remove_if_present(path: &Path) -> Result<()> {
    if path.exists() {
        std::fs::remove_file(path).map_err(StorageError::Io)?;
        tracing::debug!("Removed {:?}", path);
    }
    Ok(())
}

/// Encrypted file storage backend
///
/// Files are `{base}/encore.{key}.age`, encrypted with an `age` passphrase,
/// mode 600 on Unix.
pub struct EncryptedFileStore {
    base_path: PathBuf,
    master_password: RwLock<Option<String>>,
}

impl EncryptedFileStore {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            base_path,
            master_password: RwLock::new(None),
        }
    }

    /// Set the master password (minimum 8 characters)
    pub fn set_master_password(&self, password: String) -> Result<()> {
        if password.len() < 8 {
            return Err(StorageError::WeakPassword.into());
        }

        let mut guard = self
            .master_password
            .write()
            .map_err(|_| StorageError::Encryption("master password lock poisoned".to_string()))?;
        *guard = Some(password);
        Ok(())
    }

    fn password(&self) -> Result<String> {
        let guard = self
            .master_password
            .read()
            .map_err(|_| StorageError::Encryption("master password lock poisoned".to_string()))?;
        guard
            .clone()
            .ok_or_else(|| StorageError::MasterPasswordNotSet.into())
    }

    pub(crate) fn encrypt(&self, data: &str) -> Result<Vec<u8>> {
        let password = self.password()?;
        let encryptor = age::Encryptor::with_user_passphrase(age::secrecy::Secret::new(password));

        let mut encrypted = vec![];
        let mut writer = encryptor
            .wrap_output(&mut encrypted)
            .map_err(|e| StorageError::Encryption(e.to_string()))?;

        writer
            .write_all(data.as_bytes())
            .map_err(|e| StorageError::Encryption(e.to_string()))?;

        writer
            .finish()
            .map_err(|e| StorageError::Encryption(e.to_string()))?;

        Ok(encrypted)
    }

    fn decrypt(&self, data: &[u8]) -> Result<String> {
        let password = self.password()?;

        let decryptor = match age::Decryptor::new(data) {
            Ok(age::Decryptor::Passphrase(d)) => d,
            Ok(_) => {
                return Err(StorageError::Encryption(
                    "Invalid encryption format (expected passphrase)".to_string(),
                )
                .into())
            }
            Err(e) => return Err(StorageError::Encryption(e.to_string()).into()),
        };

        let mut decrypted = vec![];
        let mut reader = decryptor
            .decrypt(&age::secrecy::Secret::new(password), None)
            .map_err(|e| match e {
                age::DecryptError::DecryptionFailed | age::DecryptError::InvalidMac => {
                    StorageError::DecryptionFailed
                }
                other => StorageError::Encryption(other.to_string()),
            })?;

        reader
            .read_to_end(&mut decrypted)
            .map_err(|e| StorageError::Encryption(e.to_string()))?;

        String::from_utf8(decrypted)
            .map_err(|e| StorageError::Encryption(format!("Invalid UTF-8: {}", e)).into())
    }

    fn file_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}.age", qualified(key)))
    }
}

impl TokenStore for EncryptedFileStore {
    fn store(&self, key: &str, value: &str) -> Result<()> {
        let encrypted = self.encrypt(value)?;
        let file_path = self.file_path(key);
        write_private(&file_path, &encrypted)?;

        tracing::debug!("Stored encrypted {} at {:?}", qualified(key), file_path);
        Ok(())
    }

    fn retrieve(&self, key: &str) -> Result<String> {
        let file_path = self.file_path(key);

        if !file_path.exists() {
            return Err(StorageError::NotFound(qualified(key)).into());
        }

        validate_not_symlink(&file_path)?;

        let encrypted = std::fs::read(&file_path).map_err(StorageError::Io)?;
        self.decrypt(&encrypted)
    }

    fn delete(&self, key: &str) -> Result<()> {
        remove_if_present(&self.file_path(key))
    }

    fn backend_name(&self) -> &str {
        "encrypted_file"
    }
}

/// Plain file storage backend
///
/// For headless machines without a keyring. The token sits unencrypted in
/// `{base}/encore.{key}` with mode 600.
pub struct FileStore {
    base_path: PathBuf,
}

impl FileStore {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn file_path(&self, key: &str) -> PathBuf {
        self.base_path.join(qualified(key))
    }
}

impl TokenStore for FileStore {
    fn store(&self, key: &str, value: &str) -> Result<()> {
        let file_path = self.file_path(key);
        write_private(&file_path, value.as_bytes())?;
        tracing::debug!("Stored {} at {:?}", qualified(key), file_path);
        Ok(())
    }

    fn retrieve(&self, key: &str) -> Result<String> {
        let file_path = self.file_path(key);

        if !file_path.exists() {
            return Err(StorageError::NotFound(qualified(key)).into());
        }

        validate_not_symlink(&file_path)?;

        let value = std::fs::read_to_string(&file_path).map_err(StorageError::Io)?;
        Ok(value.trim_end().to_string())
    }

    fn delete(&self, key: &str) -> Result<()> {
        remove_if_present(&self.file_path(key))
    }

    fn backend_name(&self) -> &str {
        "file"
    }
}

/// In-process storage; contents vanish with the process
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| StorageError::Io(std::io::Error::other("memory store lock poisoned")).into())
    }
}

impl TokenStore for MemoryStore {
    fn store(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn retrieve(&self, key: &str) -> Result<String> {
        self.lock()?
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(qualified(key)).into())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}

/// Storage backend type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// OS-native keyring
    #[default]
    Keyring,
    /// `age`-encrypted files with master password
    Encrypted,
    /// Plain files, owner-only permissions
    File,
    /// Nothing persisted
    Memory,
}

/// Token storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Directory for file-based backends (keyring doesn't use files)
    #[serde(default = "default_storage_path")]
    pub path: String,

    /// Master password for encrypted storage (never serialized)
    #[serde(skip)]
    pub master_password: Option<String>,
}

fn default_storage_path() -> String {
    "~/.config/encore".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Keyring,
            path: default_storage_path(),
            master_password: None,
        }
    }
}

impl StorageConfig {
    /// Pick up `ENCORE_MASTER_PASSWORD` if set and non-empty
    pub fn load_master_password_from_env(&mut self) {
        if let Ok(password) = std::env::var("ENCORE_MASTER_PASSWORD") {
            if !password.is_empty() {
                self.master_password = Some(password);
                tracing::debug!("Loaded master password from ENCORE_MASTER_PASSWORD");
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.path.is_empty()
            && matches!(self.backend, StorageBackend::Encrypted | StorageBackend::File)
        {
            return Err(crate::error::ConfigError::MissingField("storage.path".to_string()).into());
        }
        Ok(())
    }

    /// Path with `~` expanded
    pub fn expand_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.path).to_string())
    }
}

/// Token storage facade
///
/// Holds the backends in priority order. Writes go to the first one; reads
/// try each in turn so a token written before a backend change is still found;
/// deletes clear all of them.
pub struct StorageManager {
    stores: Vec<Box<dyn TokenStore>>,
}

impl StorageManager {
    /// Build the backend list from configuration
    ///
    /// `keyring` falls back to encrypted files when the OS keyring is
    /// unavailable and a master password can be obtained.
    pub fn new(config: StorageConfig) -> Result<Self> {
        let mut stores: Vec<Box<dyn TokenStore>> = vec![];
        let path = config.expand_path();

        match config.backend {
            StorageBackend::Memory => stores.push(Box::new(MemoryStore::new())),
            StorageBackend::File => {
                tracing::warn!(
                    "Using plain file token storage at {:?}; the token is not encrypted",
                    path
                );
                stores.push(Box::new(FileStore::new(path)));
            }
            StorageBackend::Keyring => match KeyringStore::new() {
                Ok(store) => {
                    tracing::debug!("Using OS keyring for token storage");
                    stores.push(Box::new(store));
                }
                Err(e) => {
                    tracing::warn!("{}. Falling back to encrypted files.", e);
                    if let Some(store) = Self::encrypted_store(path, &config)? {
                        stores.push(Box::new(store));
                    }
                }
            },
            StorageBackend::Encrypted => {
                if let Some(store) = Self::encrypted_store(path, &config)? {
                    stores.push(Box::new(store));
                }
            }
        }

        if stores.is_empty() {
            return Err(StorageError::NoStoreAvailable.into());
        }

        Ok(Self { stores })
    }

    /// Wrap an existing backend, mainly for tests
    pub fn with_store(store: Box<dyn TokenStore>) -> Self {
        Self {
            stores: vec![store],
        }
    }

    fn encrypted_store(path: PathBuf, config: &StorageConfig) -> Result<Option<EncryptedFileStore>> {
        let store = EncryptedFileStore::new(path);

        if let Some(password) = &config.master_password {
            store.set_master_password(password.clone())?;
            return Ok(Some(store));
        }

        if !atty::is(atty::Stream::Stdin) {
            tracing::error!("Master password not set and no TTY available");
            return Ok(None);
        }

        match rpassword::prompt_password("Enter master password for token encryption: ") {
            Ok(password) if !password.is_empty() => {
                store.set_master_password(password)?;
                Ok(Some(store))
            }
            Ok(_) => {
                tracing::error!("Empty master password provided");
                Ok(None)
            }
            Err(e) => {
                tracing::error!("Failed to prompt for master password: {}", e);
                Ok(None)
            }
        }
    }

    /// Names of the active backends, in priority order
    pub fn backends(&self) -> Vec<&str> {
        self.stores.iter().map(|s| s.backend_name()).collect()
    }
}

impl TokenStore for StorageManager {
    fn store(&self, key: &str, value: &str) -> Result<()> {
        let store = self.stores.first().ok_or(StorageError::NoStoreAvailable)?;
        store.store(key, value)?;
        tracing::debug!("Stored {} using {} backend", qualified(key), store.backend_name());
        Ok(())
    }

    fn retrieve(&self, key: &str) -> Result<String> {
        let mut last_error = None;

        for store in &self.stores {
            match store.retrieve(key) {
                Ok(value) => return Ok(value),
                Err(e @ crate::EncoreError::Storage(StorageError::NotFound(_))) => {
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| StorageError::NotFound(qualified(key)).into()))
    }

    fn delete(&self, key: &str) -> Result<()> {
        for store in &self.stores {
            store.delete(key)?;
        }
        Ok(())
    }

    fn backend_name(&self) -> &str {
        self.stores
            .first()
            .map(|s| s.backend_name())
            .unwrap_or("none")
    }
}
