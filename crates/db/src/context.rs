use quota_core::LedgerTurn;
use rusqlite::params;

use crate::Db;
use crate::error::Result;
use crate::helpers::row_to_ledger_turn;

impl Db {
    /// The user's `n` most recent records, oldest first. Returns all of them
    /// when the user has fewer than `n`.
    pub fn last_turns(&self, user_id: i64, n: usize) -> Result<Vec<LedgerTurn>> {
        let limit = i64::try_from(n).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(
            r#"
            SELECT content, role, cumulative_tokens
            FROM usage_record
            WHERE user_id = ?1
            ORDER BY id DESC
            LIMIT ?2
            "#,
        )?;
        let rows = stmt.query_map(params![user_id, limit], row_to_ledger_turn)?;
        let mut turns = rows.collect::<std::result::Result<Vec<_>, _>>()?;
        turns.reverse();
        Ok(turns)
    }
}
