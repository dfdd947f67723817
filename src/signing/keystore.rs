//! Ed25519 key storage
//!
//! The signing key is persisted as a single PEM block labelled
//! `ED25519 KEY` whose payload is the 64-byte keypair (32-byte seed followed
//! by the 32-byte public key). A missing key file is generated on first use
//! and written owner-read/write only.

use super::Signer;
use crate::error::KeyError;
use base64::Engine;
use ed25519_dalek::{Signature, SigningKey, VerifyingKey, KEYPAIR_LENGTH};
use rand::rngs::OsRng;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// PEM type label for stored keys
pub const PEM_LABEL: &str = "ED25519 KEY";

/// Key file location under `$HOME`
const DEFAULT_KEY_DIR: &str = ".vkeys";
const DEFAULT_KEY_NAME: &str = "default";

/// A process-wide Ed25519 key pair
pub struct Ed25519KeyStore {
    signing_key: SigningKey,
}

impl Ed25519KeyStore {
    /// Generate a fresh key pair from the OS random source
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Load the key at `path`, or generate and save one if the file does not exist.
    pub fn load_or_generate(path: &Path) -> Result<Self, KeyError> {
        match fs::metadata(path) {
            Ok(_) => {
                let store = Self::load(path)?;
                info!(path = %path.display(), "Loaded signing key");
                Ok(store)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "Key does not exist, generating new ed25519 key");
                let store = Self::generate();
                store.save(path)?;
                Ok(store)
            }
            Err(source) => Err(KeyError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Load a PEM key file
    pub fn load(path: &Path) -> Result<Self, KeyError> {
        let pem = fs::read_to_string(path).map_err(|source| KeyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_pem(&pem)
    }

    /// Write the key as PEM, creating parent directories; mode 0o600 on unix
    pub fn save(&self, path: &Path) -> Result<(), KeyError> {
        let io_err = |source| KeyError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(path).map_err(io_err)?;
        file.write_all(self.to_pem().as_bytes()).map_err(io_err)?;
        Ok(())
    }

    /// Encode the keypair as a PEM block
    pub fn to_pem(&self) -> String {
        encode_pem(PEM_LABEL, &self.signing_key.to_keypair_bytes())
    }

    /// Decode a keypair from a PEM block
    pub fn from_pem(pem: &str) -> Result<Self, KeyError> {
        let (label, bytes) = decode_pem(pem).ok_or(KeyError::InvalidPem)?;
        if label != PEM_LABEL {
            return Err(KeyError::WrongLabel { found: label });
        }

        let keypair: [u8; KEYPAIR_LENGTH] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidLength { len: bytes.len() })?;
        let signing_key = SigningKey::from_keypair_bytes(&keypair)
            .map_err(|e| KeyError::InvalidKey(e.to_string()))?;

        Ok(Self { signing_key })
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }
}

impl Signer for Ed25519KeyStore {
    fn sign(&self, message: &[u8]) -> Signature {
        ed25519_dalek::Signer::sign(&self.signing_key, message)
    }

    fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        self.signing_key
            .verifying_key()
            .verify_strict(message, signature)
            .is_ok()
    }
}

/// `$HOME/.vkeys/default`, if `HOME` is set
pub fn default_key_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| {
        PathBuf::from(home)
            .join(DEFAULT_KEY_DIR)
            .join(DEFAULT_KEY_NAME)
    })
}

// ── PEM helpers ──────────────────────────────────────────────────────

/// Wrap bytes in a PEM block with the given label
pub fn encode_pem(label: &str, bytes: &[u8]) -> String {
    let b64 = base64::engine::general_purpose::STANDARD.encode(bytes);
    let mut pem = format!("-----BEGIN {label}-----\n");

    let mut rest = b64.as_str();
    while !rest.is_empty() {
        let (line, tail) = rest.split_at(rest.len().min(64));
        pem.push_str(line);
        pem.push('\n');
        rest = tail;
    }

    pem.push_str(&format!("-----END {label}-----\n"));
    pem
}

/// Extract the label and payload of the first PEM block
pub fn decode_pem(pem: &str) -> Option<(String, Vec<u8>)> {
    let mut label = None;
    let mut b64 = String::new();

    for line in pem.lines() {
        let trimmed = line.trim();
        if label.is_none() {
            if let Some(rest) = trimmed.strip_prefix("-----BEGIN ") {
                label = Some(rest.strip_suffix("-----")?.to_string());
            }
            continue;
        }
        if trimmed.starts_with("-----END ") {
            let bytes = base64::engine::general_purpose::STANDARD.decode(&b64).ok()?;
            return label.map(|l| (l, bytes));
        }
        b64.push_str(trimmed);
    }

    None
}
