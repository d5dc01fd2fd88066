use quota_core::{NewUsageRecord, UsageRecord};
use rusqlite::{Connection, TransactionBehavior, params};

use crate::Db;
use crate::error::Result;
use crate::helpers::{row_to_usage_record, to_sql_count};

const INSERT_RECORD: &str = r#"
    INSERT INTO usage_record (
      user_id, content, role, cumulative_tokens, synthesis_chars, transcription_blocks
    ) VALUES (
      ?1, ?2, ?3, ?4, ?5, ?6
    )
"#;

impl Db {
    /// Appends one record and returns the id the store assigned to it.
    pub fn append_record(&mut self, record: &NewUsageRecord) -> Result<i64> {
        let mut ids = self.append_records(std::slice::from_ref(record))?;
        Ok(ids.pop().unwrap_or_default())
    }

    /// Appends all records in one immediate transaction: either every record
    /// lands, in order, or none does.
    pub fn append_records(&mut self, records: &[NewUsageRecord]) -> Result<Vec<i64>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            ids.push(insert_record(&tx, record)?);
        }
        tx.commit()?;
        Ok(ids)
    }

    /// Every record of a user, oldest first.
    pub fn list_records(&self, user_id: i64) -> Result<Vec<UsageRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, user_id, content, role, cumulative_tokens, synthesis_chars,
                   transcription_blocks
            FROM usage_record
            WHERE user_id = ?1
            ORDER BY id ASC
            "#,
        )?;
        let rows = stmt.query_map(params![user_id], row_to_usage_record)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }
}

fn insert_record(conn: &Connection, record: &NewUsageRecord) -> Result<i64> {
    conn.execute(
        INSERT_RECORD,
        params![
            record.user_id,
            record.content,
            record.role.as_str(),
            to_sql_count("cumulative_tokens", record.cumulative_tokens)?,
            to_sql_count("synthesis_chars", record.synthesis_chars)?,
            to_sql_count("transcription_blocks", record.transcription_blocks)?,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}
