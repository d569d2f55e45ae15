//! On-disk state the relay reads: the live-editable voice config and the
//! meeting credentials.

use anyhow::Context;
use meet_relay_core::collaborators::VoiceConfigStore;
use meet_relay_core::voice::{VoiceConfig, VoiceRecord};
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Credentials file not found: {0}")]
    MissingCredentials(PathBuf),
    #[error("Malformed JSON in {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The voice settings file. Re-read on every poll so edits take effect
/// while the relay is running.
#[derive(Debug, Clone)]
pub struct JsonConfigStore {
    path: PathBuf,
}

impl JsonConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the record, writing the default one first if the file is absent.
    pub fn load_or_init(&self) -> Result<VoiceRecord, StoreError> {
        if !self.path.exists() {
            self.write_default()?;
        }
        let raw = fs::read_to_string(&self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str::<VoiceRecord>(&raw).map_err(|source| StoreError::Malformed {
            path: self.path.clone(),
            source,
        })
    }

    fn write_default(&self) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let record = VoiceConfig::default().to_record();
        let pretty = serde_json::to_string_pretty(&record).map_err(|source| {
            StoreError::Malformed {
                path: self.path.clone(),
                source,
            }
        })?;
        fs::write(&self.path, pretty).map_err(io_err)?;
        tracing::info!("Wrote default voice config to {}", self.path.display());
        Ok(())
    }
}

impl VoiceConfigStore for JsonConfigStore {
    fn load(&self) -> anyhow::Result<VoiceRecord> {
        self.load_or_init()
            .with_context(|| format!("Failed to load voice config from {}", self.path.display()))
    }
}

/// Account and meeting the relay signs in with.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: SecretString,
    pub meeting_link: String,
}

pub fn load_credentials(path: &Path) -> Result<Credentials, StoreError> {
    if !path.exists() {
        return Err(StoreError::MissingCredentials(path.to_path_buf()));
    }
    let raw = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| StoreError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}
