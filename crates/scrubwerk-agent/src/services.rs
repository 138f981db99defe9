// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer — wires the classifier, engine, signer, certificate
// store, and audit log together for the HTTP request layer.
//
// The audit log is rusqlite-based and `Send` but not `Sync`, so it sits
// behind `Arc<Mutex<>>`; everything else is immutable after init and shares
// via plain `Arc`. Contention is minimal: audit writes are sub-millisecond
// and status reads clone a small snapshot.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use scrubwerk_attest::{AttestationSigner, AuditLog, CertificateStore};
use scrubwerk_core::AgentConfig;
use scrubwerk_core::error::Result;
use scrubwerk_engine::{EraseEngine, OsVolumeTools, PathClassifier, VolumeTools};
use tracing::{info, warn};

const CONFIG_FILE: &str = "config.json";

/// Shared agent services, cheaply cloneable into every connection task.
#[derive(Clone)]
pub struct AgentServices {
    engine: Arc<EraseEngine>,
    signer: Arc<AttestationSigner>,
    store: Arc<CertificateStore>,
    config: Arc<AgentConfig>,
    data_dir: PathBuf,
}

impl AgentServices {
    /// Initialise all services. Call once at agent startup.
    ///
    /// Loads or generates the signing key, opens the certificate store and
    /// audit database, and builds the engine. The agent's own data
    /// directory joins the protected roots so a wipe request can never eat
    /// the key, certificates, or audit trail out from under the agent.
    pub fn init(config: AgentConfig, data_dir: PathBuf) -> Result<Self> {
        info!(path = %data_dir.display(), "initialising agent services");

        let signer = Arc::new(AttestationSigner::load_or_generate(
            &data_dir.join("keys").join("signing_key.pkcs8"),
        )?);
        let store = Arc::new(CertificateStore::open(data_dir.join("certificates"))?);

        let audit = if config.audit_enabled {
            Some(Arc::new(Mutex::new(AuditLog::open(
                data_dir.join("audit.db"),
            )?)))
        } else {
            warn!("audit trail disabled by config");
            None
        };

        let mut protected = config.protected_roots.clone();
        protected.push(data_dir.clone());
        let classifier = PathClassifier::new(&protected);

        let tools: Arc<dyn VolumeTools> = Arc::new(OsVolumeTools);
        let engine = Arc::new(EraseEngine::new(
            classifier,
            Arc::clone(&signer),
            Arc::clone(&store),
            audit,
            tools,
            config.overwrite_block_size,
        ));

        info!("agent services initialised");
        Ok(Self {
            engine,
            signer,
            store,
            config: Arc::new(config),
            data_dir,
        })
    }

    pub fn engine(&self) -> &EraseEngine {
        &self.engine
    }

    pub fn signer(&self) -> &AttestationSigner {
        &self.signer
    }

    pub fn store(&self) -> &CertificateStore {
        &self.store
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

// -- Config file persistence -------------------------------------------------

/// Load the persisted config, or persist and return the defaults on first
/// run so operators have a file to edit.
pub fn load_or_create_config(data_dir: &Path) -> AgentConfig {
    let path = data_dir.join(CONFIG_FILE);
    match std::fs::read_to_string(&path) {
        Ok(data) => match serde_json::from_str(&data) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "config unreadable, using defaults");
                AgentConfig::default()
            }
        },
        Err(_) => {
            let config = AgentConfig::default();
            if let Err(e) = persist_config(data_dir, &config) {
                warn!(error = %e, "could not write default config");
            } else {
                info!(path = %path.display(), "wrote default config");
            }
            config
        }
    }
}

fn persist_config(data_dir: &Path, config: &AgentConfig) -> Result<()> {
    let path = data_dir.join(CONFIG_FILE);
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn first_run_persists_defaults() {
        let dir = TempDir::new().expect("tempdir");
        let config = load_or_create_config(dir.path());
        assert_eq!(config.port, 5050);
        assert!(dir.path().join(CONFIG_FILE).exists());

        // Second load reads the file back rather than rewriting it.
        let reloaded = load_or_create_config(dir.path());
        assert_eq!(reloaded.api_key, config.api_key);
    }

    #[test]
    fn corrupt_config_falls_back_to_defaults() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(dir.path().join(CONFIG_FILE), b"{not json").expect("write");
        let config = load_or_create_config(dir.path());
        assert_eq!(config.port, AgentConfig::default().port);
    }

    #[test]
    fn init_protects_the_data_directory() {
        let dir = TempDir::new().expect("tempdir");
        let services =
            AgentServices::init(AgentConfig::default(), dir.path().to_path_buf()).expect("init");

        let err = services
            .engine()
            .start(
                &dir.path().display().to_string(),
                scrubwerk_core::types::EraseMethod::Quick,
            )
            .expect_err("own data dir must be refused");
        assert!(err.to_string().contains("protected"));
        assert!(dir.path().join("keys").join("signing_key.pkcs8").exists());
    }
}
