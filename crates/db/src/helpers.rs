use quota_core::{LedgerTurn, ResourceKind, Role, UsageRecord};
use rusqlite::Row;
use rusqlite::types::Type;

use crate::error::{DbError, Result};

pub(crate) fn to_sql_count(column: &'static str, value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| DbError::ValueOutOfRange { column, value })
}

fn count_from_sql(value: i64) -> u64 {
    value.max(0) as u64
}

fn role_at(row: &Row<'_>, idx: usize) -> std::result::Result<Role, rusqlite::Error> {
    let raw: String = row.get(idx)?;
    raw.parse::<Role>()
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into()))
}

pub(crate) fn row_to_usage_record(
    row: &Row<'_>,
) -> std::result::Result<UsageRecord, rusqlite::Error> {
    Ok(UsageRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        content: row.get(2)?,
        role: role_at(row, 3)?,
        cumulative_tokens: count_from_sql(row.get(4)?),
        synthesis_chars: count_from_sql(row.get(5)?),
        transcription_blocks: count_from_sql(row.get(6)?),
    })
}

pub(crate) fn row_to_ledger_turn(
    row: &Row<'_>,
) -> std::result::Result<LedgerTurn, rusqlite::Error> {
    Ok(LedgerTurn {
        content: row.get(0)?,
        role: role_at(row, 1)?,
        cumulative_tokens: count_from_sql(row.get(2)?),
    })
}

pub(crate) fn total_from_sql(value: Option<i64>) -> u64 {
    value.map(count_from_sql).unwrap_or(0)
}

/// Lifetime total for a resource. Blocks and characters are charged per
/// record and summed; tokens are a high-water mark, so the total is the max.
pub(crate) fn resource_total_sql(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Transcription => {
            "SELECT SUM(transcription_blocks) FROM usage_record WHERE user_id = ?1"
        }
        ResourceKind::Synthesis => {
            "SELECT SUM(synthesis_chars) FROM usage_record WHERE user_id = ?1"
        }
        ResourceKind::ConversationTokens => {
            "SELECT MAX(cumulative_tokens) FROM usage_record WHERE user_id = ?1"
        }
    }
}
