use quota_core::{Decision, Denial, QuotaLimits};
use quota_db::Db;
use tracing::warn;

use crate::error::Result;
use crate::services::{SharedConfig, open_db};

#[derive(Clone)]
pub struct AdmissionService {
    config: SharedConfig,
}

impl AdmissionService {
    pub(super) fn new(config: SharedConfig) -> Self {
        Self { config }
    }

    fn db(&self) -> Result<Db> {
        open_db(&self.config)
    }

    /// Whether `user_id` may be served. A store error is returned as `Err`
    /// and must be handled as a denial.
    pub fn check(&self, user_id: i64) -> Result<Decision<()>> {
        let db = self.db()?;
        check_admission(&db, &self.config.limits, user_id)
    }
}

pub(crate) fn check_admission(
    db: &Db,
    limits: &QuotaLimits,
    user_id: i64,
) -> Result<Decision<()>> {
    // Counts every other user ever seen, so a returning user is turned away
    // once the rest of the population reaches the cap.
    let others = db.count_distinct_users_excluding(user_id)?;
    if others >= limits.max_users {
        warn!(
            user_id,
            others,
            max_users = limits.max_users,
            "admission denied"
        );
        return Ok(Decision::Denied(Denial::AdmissionDenied {
            message: format!(
                "The service has reached its limit of {} users",
                limits.max_users
            ),
        }));
    }
    Ok(Decision::Allowed(()))
}
