// crates/archon-store/src/secrets.rs
// ============================================================================
// Module: Archon Secret Store
// Description: Per-project AES-256-GCM secret storage.
// Purpose: Keep operator secrets encrypted at rest with tamper detection.
// Dependencies: aes-gcm, base64, rand, scrypt, crate::io, serde, thiserror
// ============================================================================

//! ## Overview
//! Secrets live in `state/secrets.enc.json` as AES-256-GCM ciphertexts with a
//! fresh 12-byte IV per entry and a 16-byte auth tag. Two key modes exist:
//! **device**, a machine-scoped random key at `<archon_home>/device.key`
//! (mode 0600), and **portable**, a key derived from an operator passphrase
//! via scrypt (N=16384, r=8, p=1) over a stored random salt. Tampering with
//! any field fails decryption with an explicit error. Plaintext never reaches
//! disk, logs, or snapshots.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use aes_gcm::Aes256Gcm;
use aes_gcm::Key;
use aes_gcm::Nonce;
use aes_gcm::aead::Aead;
use aes_gcm::aead::KeyInit;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::io::StateIo;
use crate::io::StateIoError;
use crate::io::StateIoExt;

/// State document holding encrypted secrets (`state/secrets.enc.json`).
const SECRETS: &str = "secrets.enc";
/// Device key filename under the Archon home.
const DEVICE_KEY_FILE: &str = "device.key";
/// AES-256 key length in bytes.
const KEY_LEN: usize = 32;
/// GCM IV length in bytes.
const IV_LEN: usize = 12;
/// GCM auth tag length in bytes.
const TAG_LEN: usize = 16;
/// scrypt cost parameter log2(N) for N=16384.
const SCRYPT_LOG_N: u8 = 14;
/// scrypt block size parameter.
const SCRYPT_R: u32 = 8;
/// scrypt parallelism parameter.
const SCRYPT_P: u32 = 1;

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// Secret store key mode.
///
/// # Invariants
/// - Variants are stable for serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretMode {
    /// Machine-scoped random key stored beside the projects.
    #[default]
    Device,
    /// Key derived from an operator passphrase.
    Portable,
}

/// One encrypted entry.
///
/// # Invariants
/// - All fields are standard base64; `tag` is the 16-byte GCM tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SecretEntry {
    /// Base64 12-byte IV.
    iv: String,
    /// Base64 ciphertext (tag excluded).
    ciphertext: String,
    /// Base64 16-byte auth tag.
    tag: String,
}

/// On-disk secrets document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
struct SecretsFile {
    /// Key mode.
    #[serde(default)]
    mode: SecretMode,
    /// Base64 scrypt salt, present in portable mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    salt: Option<String>,
    /// Encrypted entries by key.
    entries: BTreeMap<String, SecretEntry>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Secret store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling; none carries plaintext.
#[derive(Debug, Error)]
pub enum SecretError {
    /// Portable mode requires a passphrase for this operation.
    #[error("portable secret mode requires a passphrase")]
    MissingPassphrase,
    /// No secret is stored under the key.
    #[error("unknown secret key: {key}")]
    UnknownKey {
        /// The missing key.
        key: String,
    },
    /// Decryption failed; ciphertext, IV, tag, or key material was altered.
    #[error("secret decryption failed for {key}: ciphertext or key material tampered")]
    Tampered {
        /// The affected key.
        key: String,
    },
    /// Key derivation failed.
    #[error("key derivation failed: {0}")]
    Kdf(String),
    /// Stored entry is not valid base64 or has a wrong length.
    #[error("secret entry encoding invalid for {key}")]
    Encoding {
        /// The affected key.
        key: String,
    },
    /// Device key file I/O failed.
    #[error("device key error: {0}")]
    DeviceKey(String),
    /// Persistence failed.
    #[error(transparent)]
    Io(#[from] StateIoError),
}

// ============================================================================
// SECTION: Secret Store
// ============================================================================

/// Per-project secret store.
#[derive(Clone)]
pub struct SecretStore {
    /// Project-scoped persistence.
    io: Arc<dyn StateIo>,
    /// Archon home holding the device key.
    home: PathBuf,
}

impl std::fmt::Debug for SecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretStore").field("home", &self.home).finish_non_exhaustive()
    }
}

impl SecretStore {
    /// Creates a store over one project's I/O and the Archon home.
    #[must_use]
    pub fn new(io: Arc<dyn StateIo>, home: impl Into<PathBuf>) -> Self {
        Self {
            io,
            home: home.into(),
        }
    }

    /// Loads the secrets document, defaulting to an empty device-mode file.
    fn load(&self) -> Result<SecretsFile, SecretError> {
        Ok(self.io.read_json(SECRETS, SecretsFile::default())?)
    }

    /// Persists the secrets document.
    fn persist(&self, file: &SecretsFile) -> Result<(), SecretError> {
        self.io.write_json(SECRETS, file)?;
        Ok(())
    }

    /// Returns the current key mode.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError`] when the document cannot be read.
    pub fn mode(&self) -> Result<SecretMode, SecretError> {
        Ok(self.load()?.mode)
    }

    /// Returns the stored secret keys.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError`] when the document cannot be read.
    pub fn list_keys(&self) -> Result<Vec<String>, SecretError> {
        Ok(self.load()?.entries.keys().cloned().collect())
    }

    /// Stores a secret under the key, replacing any prior value.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError`] on key-material or persistence failure.
    pub fn set(
        &self,
        key: &str,
        plaintext: &str,
        passphrase: Option<&str>,
    ) -> Result<(), SecretError> {
        let mut file = self.load()?;
        let material = self.key_material(&mut file, passphrase)?;
        let entry = encrypt_entry(key, &material, plaintext)?;
        file.entries.insert(key.to_string(), entry);
        self.persist(&file)
    }

    /// Retrieves and decrypts a secret.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError::UnknownKey`] when absent and
    /// [`SecretError::Tampered`] when decryption fails.
    pub fn get(&self, key: &str, passphrase: Option<&str>) -> Result<String, SecretError> {
        let mut file = self.load()?;
        let material = self.key_material(&mut file, passphrase)?;
        let entry = file.entries.get(key).ok_or_else(|| SecretError::UnknownKey {
            key: key.to_string(),
        })?;
        decrypt_entry(key, &material, entry)
    }

    /// Deletes a secret.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError::UnknownKey`] when absent.
    pub fn delete(&self, key: &str) -> Result<(), SecretError> {
        let mut file = self.load()?;
        if file.entries.remove(key).is_none() {
            return Err(SecretError::UnknownKey {
                key: key.to_string(),
            });
        }
        self.persist(&file)
    }

    /// Switches key mode, re-encrypting every entry under the new key.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError`] when either key cannot be resolved or any
    /// entry fails decryption.
    pub fn set_mode(
        &self,
        mode: SecretMode,
        current_passphrase: Option<&str>,
        new_passphrase: Option<&str>,
    ) -> Result<(), SecretError> {
        let mut file = self.load()?;
        let old_material = self.key_material(&mut file, current_passphrase)?;
        let mut decrypted: BTreeMap<String, String> = BTreeMap::new();
        for (key, entry) in &file.entries {
            decrypted.insert(key.clone(), decrypt_entry(key, &old_material, entry)?);
        }

        let mut next = SecretsFile {
            mode,
            salt: None,
            entries: BTreeMap::new(),
        };
        let material = self.key_material(&mut next, new_passphrase)?;
        for (key, plaintext) in &decrypted {
            next.entries.insert(key.clone(), encrypt_entry(key, &material, plaintext)?);
        }
        self.persist(&next)
    }

    /// Resolves key material for the file's mode, minting salt or device key
    /// on first use.
    fn key_material(
        &self,
        file: &mut SecretsFile,
        passphrase: Option<&str>,
    ) -> Result<[u8; KEY_LEN], SecretError> {
        match file.mode {
            SecretMode::Device => self.device_key(),
            SecretMode::Portable => {
                let passphrase = passphrase.ok_or(SecretError::MissingPassphrase)?;
                let salt = match &file.salt {
                    Some(salt) => BASE64.decode(salt).map_err(|_| SecretError::Kdf(
                        "stored salt is not valid base64".to_string(),
                    ))?,
                    None => {
                        let mut salt = vec![0_u8; KEY_LEN];
                        OsRng.fill_bytes(&mut salt);
                        file.salt = Some(BASE64.encode(&salt));
                        salt
                    }
                };
                derive_portable_key(passphrase, &salt)
            }
        }
    }

    /// Reads or mints the machine-scoped device key (mode 0600).
    fn device_key(&self) -> Result<[u8; KEY_LEN], SecretError> {
        let path = self.home.join(DEVICE_KEY_FILE);
        if let Ok(raw) = fs::read_to_string(&path) {
            let bytes = BASE64
                .decode(raw.trim())
                .map_err(|_| SecretError::DeviceKey("device key is not valid base64".to_string()))?;
            return bytes.try_into().map_err(|_| {
                SecretError::DeviceKey("device key has wrong length".to_string())
            });
        }
        let mut key = [0_u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| SecretError::DeviceKey(err.to_string()))?;
        }
        fs::write(&path, BASE64.encode(key)).map_err(|err| SecretError::DeviceKey(err.to_string()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))
                .map_err(|err| SecretError::DeviceKey(err.to_string()))?;
        }
        Ok(key)
    }
}

// ============================================================================
// SECTION: Crypto Helpers
// ============================================================================

/// Derives a portable-mode key with scrypt N=16384, r=8, p=1.
fn derive_portable_key(passphrase: &str, salt: &[u8]) -> Result<[u8; KEY_LEN], SecretError> {
    let params = scrypt::Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, KEY_LEN)
        .map_err(|err| SecretError::Kdf(err.to_string()))?;
    let mut key = [0_u8; KEY_LEN];
    scrypt::scrypt(passphrase.as_bytes(), salt, &params, &mut key)
        .map_err(|err| SecretError::Kdf(err.to_string()))?;
    Ok(key)
}

/// Encrypts one entry with a fresh random IV.
fn encrypt_entry(
    key: &str,
    material: &[u8; KEY_LEN],
    plaintext: &str,
) -> Result<SecretEntry, SecretError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(material));
    let mut iv = [0_u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);
    let sealed =
        cipher.encrypt(Nonce::from_slice(&iv), plaintext.as_bytes()).map_err(|_| {
            SecretError::Tampered {
                key: key.to_string(),
            }
        })?;
    // The aead crate appends the 16-byte tag; store it separately.
    let split = sealed.len().saturating_sub(TAG_LEN);
    Ok(SecretEntry {
        iv: BASE64.encode(iv),
        ciphertext: BASE64.encode(&sealed[.. split]),
        tag: BASE64.encode(&sealed[split ..]),
    })
}

/// Decrypts one entry, failing closed on any alteration.
fn decrypt_entry(
    key: &str,
    material: &[u8; KEY_LEN],
    entry: &SecretEntry,
) -> Result<String, SecretError> {
    let encoding = || SecretError::Encoding {
        key: key.to_string(),
    };
    let iv = BASE64.decode(&entry.iv).map_err(|_| encoding())?;
    if iv.len() != IV_LEN {
        return Err(encoding());
    }
    let mut sealed = BASE64.decode(&entry.ciphertext).map_err(|_| encoding())?;
    let tag = BASE64.decode(&entry.tag).map_err(|_| encoding())?;
    if tag.len() != TAG_LEN {
        return Err(encoding());
    }
    sealed.extend_from_slice(&tag);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(material));
    let plaintext = cipher.decrypt(Nonce::from_slice(&iv), sealed.as_ref()).map_err(|_| {
        SecretError::Tampered {
            key: key.to_string(),
        }
    })?;
    String::from_utf8(plaintext).map_err(|_| encoding())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
