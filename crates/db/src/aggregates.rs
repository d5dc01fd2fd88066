use quota_core::{ResourceKind, UserUsage};
use rusqlite::params;

use crate::Db;
use crate::error::Result;
use crate::helpers::{resource_total_sql, total_from_sql};

impl Db {
    /// Lifetime consumption of `kind` for a user. A user without records has
    /// consumed nothing.
    pub fn sum_resource(&self, user_id: i64, kind: ResourceKind) -> Result<u64> {
        let total: Option<i64> =
            self.conn
                .query_row(resource_total_sql(kind), params![user_id], |row| row.get(0))?;
        Ok(total_from_sql(total))
    }

    /// Number of distinct users with at least one record, not counting
    /// `user_id` itself.
    pub fn count_distinct_users_excluding(&self, user_id: i64) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT user_id) FROM usage_record WHERE user_id <> ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    pub fn user_exists(&self, user_id: i64) -> Result<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM usage_record WHERE user_id = ?1)",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(exists != 0)
    }

    pub fn user_usage(&self, user_id: i64) -> Result<UserUsage> {
        let usage = self.conn.query_row(
            r#"
            SELECT SUM(transcription_blocks), SUM(synthesis_chars), MAX(cumulative_tokens)
            FROM usage_record
            WHERE user_id = ?1
            "#,
            params![user_id],
            |row| {
                Ok(UserUsage {
                    transcription_blocks: total_from_sql(row.get(0)?),
                    synthesis_chars: total_from_sql(row.get(1)?),
                    cumulative_tokens: total_from_sql(row.get(2)?),
                })
            },
        )?;
        Ok(usage)
    }
}
