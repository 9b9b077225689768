//! Persistent identity storage.
//!
//! One JSON file holds the keyset. It is written once, on first use, with
//! owner-only permissions and is never rewritten afterwards.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::crypto::SignatureScheme;
use crate::error::{Error, Result};
use crate::keyset::Keyset;
use crate::platform;

pub const KEY_FILE_NAME: &str = ".nostrkeys";

#[derive(Debug, Clone)]
pub struct IdentityStore {
    path: PathBuf,
}

impl IdentityStore {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.nostrkeys`.
    pub fn default_location() -> Result<Self> {
        let home = platform::home_dir().ok_or_else(|| {
            Error::storage(
                KEY_FILE_NAME,
                std::io::Error::new(ErrorKind::NotFound, "home directory not set"),
            )
        })?;
        Ok(Self::at(home.join(KEY_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get_or_init(&self, scheme: &impl SignatureScheme) -> Result<Keyset> {
        if let Some(keyset) = self.load(scheme)? {
            tracing::debug!(path = %self.path.display(), "identity loaded");
            return Ok(keyset);
        }

        let keyset = Keyset::generate(scheme)?;
        let raw = serde_json::to_vec(&keyset).map_err(|e| Error::SignatureScheme(format!("keyset encode failed: {}", e)))?;

        match self.create_exclusive(&raw) {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), pubkey = %keyset.public, "new identity created");
                Ok(keyset)
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                // Another process won the first-run race; its identity is the one on disk.
                tracing::warn!(path = %self.path.display(), "identity created concurrently; using stored keyset");
                self.load(scheme)?.ok_or_else(|| Error::storage(&self.path, err))
            }
            Err(err) => Err(Error::storage(&self.path, err)),
        }
    }

    /// `None` only when the file does not exist.
    fn load(&self, scheme: &impl SignatureScheme) -> Result<Option<Keyset>> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(Error::storage(&self.path, err)),
        };
        let keyset: Keyset = serde_json::from_slice(&raw)
            .map_err(|e| Error::Decode(format!("{}: {}", self.path.display(), e)))?;
        keyset.check(scheme)?;
        Ok(Some(keyset))
    }

    fn create_exclusive(&self, raw: &[u8]) -> std::io::Result<()> {
        let mut opts = OpenOptions::new();
        opts.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            opts.mode(0o600);
        }
        let mut file = opts.open(&self.path)?;
        let written = file.write_all(raw).and_then(|_| file.sync_all());
        if let Err(err) = written {
            drop(file);
            // A partial file would be read back as a corrupt identity on the next run.
            let _ = std::fs::remove_file(&self.path);
            return Err(err);
        }
        Ok(())
    }
}
