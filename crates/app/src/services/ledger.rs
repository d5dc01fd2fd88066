use quota_core::{NewUsageRecord, Role, UserUsage};
use quota_db::Db;
use tracing::{info, warn};

use crate::error::Result;
use crate::services::{SharedConfig, open_db};

#[derive(Clone)]
pub struct LedgerService {
    config: SharedConfig,
}

impl LedgerService {
    pub(super) fn new(config: SharedConfig) -> Self {
        Self { config }
    }

    fn db(&self) -> Result<Db> {
        open_db(&self.config)
    }

    /// Appends one record. Callers gating a resource should commit through a
    /// [`UserSession`](crate::UserSession) instead so the check and the
    /// append are serialized.
    pub fn record_turn(
        &self,
        user_id: i64,
        content: &str,
        role: Role,
        cumulative_tokens: u64,
        synthesis_chars: u64,
        transcription_blocks: u64,
    ) -> Result<i64> {
        let record = NewUsageRecord::new(user_id, content, role, cumulative_tokens)
            .with_synthesis_chars(synthesis_chars)
            .with_transcription_blocks(transcription_blocks);
        let mut db = self.db()?;
        let ids = commit_records(&mut db, &[record])?;
        Ok(ids.into_iter().next().unwrap_or_default())
    }

    /// Lifetime totals for logging. Never used to enforce a limit: store
    /// errors degrade to zero.
    pub fn usage_or_default(&self, user_id: i64) -> UserUsage {
        match self.db().and_then(|db| Ok(db.user_usage(user_id)?)) {
            Ok(usage) => usage,
            Err(err) => {
                warn!(user_id, error = %err, "usage lookup failed");
                UserUsage::default()
            }
        }
    }
}

pub(crate) fn commit_records(db: &mut Db, records: &[NewUsageRecord]) -> Result<Vec<i64>> {
    let ids = db.append_records(records)?;
    for record in records {
        info!(
            user_id = record.user_id,
            role = %record.role,
            cumulative_tokens = record.cumulative_tokens,
            synthesis_chars = record.synthesis_chars,
            transcription_blocks = record.transcription_blocks,
            "usage recorded"
        );
    }
    Ok(ids)
}
