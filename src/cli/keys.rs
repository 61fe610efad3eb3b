//! Local identities.
//!
//! Every named identity is a secp256k1 key pair saved as JSON under the
//! data directory. Commands refer to callers by name; anywhere an address is
//! expected, a name or a `0x` address is accepted.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{CliError, CliResult};
use crate::utils::crypto::{Address, KeyPair};

/// On-disk form of an identity
#[derive(Debug, Clone, Serialize, Deserialize)]
struct KeyFile {
    name: String,
    address: Address,
    public_key: String,
    secret_key: String,
}

/// Directory of named key pairs
#[derive(Debug, Clone)]
pub struct KeyStore {
    dir: PathBuf,
}

impl KeyStore {
    /// Key store rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory the keys live in
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }

    /// Generate and save a new identity
    pub fn create(&self, name: &str) -> CliResult<KeyPair> {
        validate_name(name)?;
        let path = self.path(name);
        if path.exists() {
            return Err(CliError::InvalidArgument(format!("identity {} already exists", name)));
        }

        let keypair = KeyPair::generate();
        let file = KeyFile {
            name: name.to_string(),
            address: keypair.address(),
            public_key: keypair.public_hex(),
            secret_key: keypair.secret_hex(),
        };
        let content = serde_json::to_string_pretty(&file).map_err(|e| CliError::Io(e.to_string()))?;

        std::fs::create_dir_all(&self.dir).map_err(|e| CliError::Io(e.to_string()))?;
        std::fs::write(&path, content).map_err(|e| CliError::Io(e.to_string()))?;

        tracing::info!(name, address = %keypair.address(), "Created identity");
        Ok(keypair)
    }

    /// Load a saved identity
    pub fn load(&self, name: &str) -> CliResult<KeyPair> {
        let path = self.path(name);
        if !path.exists() {
            return Err(CliError::NotFound(format!("identity {}", name)));
        }
        let content = std::fs::read_to_string(&path).map_err(|e| CliError::Io(e.to_string()))?;
        let file: KeyFile =
            serde_json::from_str(&content).map_err(|e| CliError::Config(e.to_string()))?;

        let keypair = KeyPair::from_secret_hex(&file.secret_key)?;
        if keypair.address() != file.address {
            return Err(CliError::Config(format!(
                "identity {} does not match its recorded address",
                name
            )));
        }
        Ok(keypair)
    }

    /// All saved identities, sorted by name
    pub fn list(&self) -> CliResult<Vec<(String, Address)>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(&self.dir).map_err(|e| CliError::Io(e.to_string()))?;
        let mut identities = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| CliError::Io(e.to_string()))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let content = std::fs::read_to_string(&path).map_err(|e| CliError::Io(e.to_string()))?;
            match serde_json::from_str::<KeyFile>(&content) {
                Ok(file) => identities.push((file.name, file.address)),
                Err(e) => tracing::warn!(path = %path.display(), "Skipping unreadable key file: {}", e),
            }
        }
        identities.sort();
        Ok(identities)
    }

    /// Resolve a `0x` address or an identity name to an address
    pub fn resolve(&self, name_or_address: &str) -> CliResult<Address> {
        if name_or_address.starts_with("0x") {
            return Ok(name_or_address.parse()?);
        }
        Ok(self.load(name_or_address)?.address())
    }
}

fn validate_name(name: &str) -> CliResult<()> {
    let valid = !name.is_empty()
        && !name.starts_with("0x")
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(CliError::InvalidArgument(format!(
            "identity name {:?} must be alphanumeric and not start with 0x",
            name
        )));
    }
    Ok(())
}
