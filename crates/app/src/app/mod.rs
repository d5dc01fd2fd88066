use std::path::PathBuf;

use quota_core::QuotaLimits;
use quota_db::Db;

use crate::config::validate_limits;
use crate::engines::Engines;
use crate::error::{AppError, Result};
use crate::services::{AppServices, TurnService};

/// Where the ledger lives and which limits apply to it.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub limits: QuotaLimits,
}

/// Application state shared by the request-handling shell. Clones share the
/// same per-user locks.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub services: AppServices,
}

impl AppState {
    pub fn new(db_path: PathBuf, limits: QuotaLimits) -> Self {
        let config = AppConfig { db_path, limits };
        let services = AppServices::new(&config);
        Self { config, services }
    }

    pub fn is_fresh_db(&self) -> bool {
        !self.config.db_path.exists()
    }

    pub fn setup_db(&self) -> Result<()> {
        setup_db(&self.config.db_path)
    }

    /// Validates limits and creates the ledger if it does not exist yet.
    pub fn initialize(&self) -> Result<()> {
        validate_limits(&self.config.limits)?;
        self.setup_db()
            .map_err(|err| AppError::Message(format!("initialize db: {}", err)))?;
        Ok(())
    }

    pub fn open_db(&self) -> Result<Db> {
        Ok(Db::open(&self.config.db_path)?)
    }

    pub fn turns(&self, engines: Engines) -> TurnService {
        self.services.turns(engines)
    }
}

pub fn setup_db(path: &std::path::Path) -> Result<()> {
    let mut db = Db::open(path)?;
    db.migrate()?;
    Ok(())
}
