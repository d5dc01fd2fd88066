use quota_core::{ContextWindow, ResourceKind};
use quota_db::Db;

use crate::error::Result;
use crate::services::{SharedConfig, open_db};

#[derive(Clone)]
pub struct ContextService {
    config: SharedConfig,
}

impl ContextService {
    pub(super) fn new(config: SharedConfig) -> Self {
        Self { config }
    }

    fn db(&self) -> Result<Db> {
        open_db(&self.config)
    }

    /// The user's last `n` turns, oldest first, with the running token total.
    pub fn window(&self, user_id: i64, n: usize) -> Result<ContextWindow> {
        let db = self.db()?;
        build_window(&db, user_id, n)
    }
}

/// The running total never drops below the lifetime high-water mark, even
/// when the newest rows were written with a stale total.
pub(crate) fn build_window(db: &Db, user_id: i64, n: usize) -> Result<ContextWindow> {
    let mut window = ContextWindow::from_ledger(db.last_turns(user_id, n)?);
    let lifetime = db.sum_resource(user_id, ResourceKind::ConversationTokens)?;
    window.running_token_total = window.running_token_total.max(lifetime);
    Ok(window)
}
