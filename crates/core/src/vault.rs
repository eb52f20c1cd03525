//! Wallet Vault
//!
//! Generates disposable wallets and keeps every one of them in an
//! append-only ledger. Each ledger line is one independently encrypted
//! record: base64(nonce || AES-256-GCM ciphertext || tag) of the JSON
//! `{address, privateKey, createdAt}`.

use base64::engine::general_purpose::STANDARD as BASE64_ENGINE;
use base64::Engine;
use chrono::{DateTime, Utc};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::digest::{digest, SHA256};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{VolumeError, VolumeResult};

/// A signing key pair plus the moment it was created
#[derive(Clone)]
pub struct Wallet {
    keypair: Arc<Keypair>,
    created_at: DateTime<Utc>,
}

impl Wallet {
    pub fn generate() -> Self {
        Self::from_keypair(Keypair::new())
    }

    pub fn from_keypair(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
            created_at: Utc::now(),
        }
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn to_record(&self) -> WalletRecord {
        WalletRecord {
            address: self.pubkey().to_string(),
            private_key: self.keypair.to_base58_string(),
            created_at: self.created_at.to_rfc3339(),
        }
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("pubkey", &self.pubkey())
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Plaintext form of one ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletRecord {
    pub address: String,
    /// Base58 of the 64-byte keypair
    pub private_key: String,
    /// RFC 3339 timestamp
    pub created_at: String,
}

impl WalletRecord {
    pub fn keypair(&self) -> VolumeResult<Keypair> {
        let bytes = bs58::decode(&self.private_key).into_vec().map_err(|e| {
            VolumeError::Wallet(format!("bad private key encoding for {}: {}", self.address, e))
        })?;
        Keypair::from_bytes(&bytes)
            .map_err(|e| VolumeError::Wallet(format!("invalid keypair for {}: {}", self.address, e)))
    }
}

/// Symmetric cipher keyed deterministically from a shared secret
pub struct Cipher {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl Cipher {
    /// Same secret, same key: records written by earlier runs stay readable.
    pub fn from_secret(secret: &str) -> VolumeResult<Self> {
        if secret.is_empty() {
            return Err(VolumeError::Config("ledger secret must not be empty".to_string()));
        }

        let key_bytes = digest(&SHA256, secret.as_bytes());
        let unbound = UnboundKey::new(&AES_256_GCM, key_bytes.as_ref())
            .map_err(|_| VolumeError::Vault("cannot derive ledger key".to_string()))?;

        Ok(Self {
            key: LessSafeKey::new(unbound),
            rng: SystemRandom::new(),
        })
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> VolumeResult<String> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| VolumeError::Vault("system RNG unavailable".to_string()))?;

        let mut in_out = plaintext.to_vec();
        self.key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::empty(),
                &mut in_out,
            )
            .map_err(|_| VolumeError::Vault("encryption failed".to_string()))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + in_out.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&in_out);
        Ok(BASE64_ENGINE.encode(sealed))
    }

    pub fn decrypt(&self, encoded: &str) -> VolumeResult<Vec<u8>> {
        let sealed = BASE64_ENGINE
            .decode(encoded.trim())
            .map_err(|e| VolumeError::Vault(format!("record is not base64: {}", e)))?;

        if sealed.len() < NONCE_LEN + AES_256_GCM.tag_len() {
            return Err(VolumeError::Vault("record is truncated".to_string()));
        }

        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| VolumeError::Vault("bad record nonce".to_string()))?;

        let mut in_out = ciphertext.to_vec();
        let plaintext = self
            .key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| {
                VolumeError::Vault("record failed authentication (wrong secret?)".to_string())
            })?;

        Ok(plaintext.to_vec())
    }

    pub fn encrypt_record(&self, record: &WalletRecord) -> VolumeResult<String> {
        let json = serde_json::to_vec(record)?;
        self.encrypt(&json)
    }

    pub fn decrypt_record(&self, encoded: &str) -> VolumeResult<WalletRecord> {
        let plaintext = self.decrypt(encoded)?;
        Ok(serde_json::from_slice(&plaintext)?)
    }
}

/// Append-only encrypted wallet ledger
pub struct WalletVault {
    path: PathBuf,
    cipher: Cipher,
}

impl WalletVault {
    pub fn new(path: impl Into<PathBuf>, cipher: Cipher) -> Self {
        Self {
            path: path.into(),
            cipher,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn generate(&self) -> Wallet {
        Wallet::generate()
    }

    /// Append one encrypted record. Existing lines are never touched.
    pub fn persist(&self, wallet: &Wallet) -> VolumeResult<()> {
        let line = self.cipher.encrypt_record(&wallet.to_record())?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        file.sync_data()?;

        debug!(address = %wallet.pubkey(), ledger = %self.path.display(), "Wallet persisted");
        Ok(())
    }

    /// Generate and persist before the wallet is ever funded
    pub fn mint(&self) -> VolumeResult<Wallet> {
        let wallet = self.generate();
        self.persist(&wallet)?;
        info!("🔑 New wallet minted: {}", wallet.pubkey());
        Ok(wallet)
    }

    /// Decrypt every record. One bad line fails the whole load.
    pub fn load_all(&self) -> VolumeResult<Vec<WalletRecord>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        raw.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| {
                self.cipher.decrypt_record(line).map_err(|e| {
                    VolumeError::Vault(format!(
                        "{} line {}: {}",
                        self.path.display(),
                        idx + 1,
                        e
                    ))
                })
            })
            .collect()
    }

    /// Write all decrypted records as a JSON array; returns how many
    pub fn export_decoded(&self, out: impl AsRef<Path>) -> VolumeResult<usize> {
        let records = self.load_all()?;
        let json = serde_json::to_string_pretty(&records)?;
        fs::write(out.as_ref(), json)?;
        Ok(records.len())
    }
}
