mod admission;
mod context;
mod ledger;
mod limits;
mod session;
mod turns;

use std::sync::Arc;

use crate::app::AppConfig;
use crate::engines::Engines;
use crate::error::Result;
use crate::util::locks::UserLocks;
use quota_db::Db;

pub use admission::AdmissionService;
pub use context::ContextService;
pub use ledger::LedgerService;
pub use limits::LimitsService;
pub use session::{SessionService, UserSession};
pub use turns::{TurnReply, TurnService};

type SharedConfig = Arc<AppConfig>;

/// Service registry for quota operations.
#[derive(Clone)]
pub struct AppServices {
    pub admission: AdmissionService,
    pub limits: LimitsService,
    pub context: ContextService,
    pub ledger: LedgerService,
    pub sessions: SessionService,
}

impl AppServices {
    pub fn new(config: &AppConfig) -> Self {
        let shared = Arc::new(config.clone());
        let locks = Arc::new(UserLocks::new());
        Self {
            admission: AdmissionService::new(shared.clone()),
            limits: LimitsService::new(shared.clone()),
            context: ContextService::new(shared.clone()),
            ledger: LedgerService::new(shared.clone()),
            sessions: SessionService::new(shared, locks),
        }
    }

    pub fn turns(&self, engines: Engines) -> TurnService {
        TurnService::new(self.sessions.clone(), self.ledger.clone(), engines)
    }
}

fn open_db(config: &SharedConfig) -> Result<Db> {
    Ok(Db::open(&config.db_path)?)
}
