use std::sync::Arc;

use quota_core::{
    ContextWindow, Decision, NewUsageRecord, QuotaLimits, Reservation, ResourceKind,
};
use quota_db::Db;

use crate::error::{AppError, Result};
use crate::services::{SharedConfig, admission, context, ledger, limits, open_db};
use crate::util::locks::UserLocks;

/// Runs check, external call and commit for one user under that user's lock.
#[derive(Clone)]
pub struct SessionService {
    config: SharedConfig,
    locks: Arc<UserLocks>,
}

impl SessionService {
    pub(super) fn new(config: SharedConfig, locks: Arc<UserLocks>) -> Self {
        Self { config, locks }
    }

    /// Holds the lock for `user_id` for the whole of `f`. Concurrent calls for
    /// the same user queue up; other users proceed in parallel.
    pub fn run<T>(&self, user_id: i64, f: impl FnOnce(&mut UserSession) -> Result<T>) -> Result<T> {
        self.locks.with_user(user_id, || {
            let db = open_db(&self.config)?;
            let mut session = UserSession {
                user_id,
                db,
                limits: self.config.limits,
            };
            f(&mut session)
        })
    }
}

/// A serialized view of one user's ledger. Every check re-reads the store.
pub struct UserSession {
    user_id: i64,
    db: Db,
    limits: QuotaLimits,
}

impl UserSession {
    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn limits(&self) -> &QuotaLimits {
        &self.limits
    }

    pub fn check_admission(&self) -> Result<Decision<()>> {
        admission::check_admission(&self.db, &self.limits, self.user_id)
    }

    pub fn check_transcription(&self, duration_seconds: u32) -> Result<Decision<Reservation>> {
        limits::check_transcription(&self.db, &self.limits, self.user_id, duration_seconds)
    }

    pub fn check_synthesis(&self, text: &str) -> Result<Decision<Reservation>> {
        limits::check_synthesis(&self.db, &self.limits, self.user_id, text)
    }

    pub fn check_tokens(&self, window: &ContextWindow, proposed_tokens: u64) -> Decision<u64> {
        limits::check_tokens(&self.limits, window, proposed_tokens)
    }

    /// The configured number of most recent turns.
    pub fn context_window(&self) -> Result<ContextWindow> {
        context::build_window(&self.db, self.user_id, self.limits.context_turns)
    }

    /// Token spend so far; records that consume no tokens carry it forward.
    pub fn high_water_mark(&self) -> Result<u64> {
        Ok(self
            .db
            .sum_resource(self.user_id, ResourceKind::ConversationTokens)?)
    }

    /// Writes the records of one turn atomically.
    pub fn commit(&mut self, records: &[NewUsageRecord]) -> Result<Vec<i64>> {
        if let Some(foreign) = records.iter().find(|record| record.user_id != self.user_id) {
            return Err(AppError::InvalidInput(format!(
                "record for user {} cannot be committed for user {}",
                foreign.user_id, self.user_id
            )));
        }
        ledger::commit_records(&mut self.db, records)
    }
}
