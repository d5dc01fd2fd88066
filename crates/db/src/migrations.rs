use rusqlite::Connection;

use crate::Db;
use crate::error::Result;

const MIGRATION_0001: &str = include_str!("../migrations/0001_init.sql");
const MIGRATION_0002: &str = include_str!("../migrations/0002_import_legacy_messages.sql");

const MIGRATIONS: &[(&str, &str)] = &[
    ("0001_init", MIGRATION_0001),
    ("0002_import_legacy_messages", MIGRATION_0002),
];

const LEGACY_TABLE: &str = "messages";
const LEGACY_COLUMNS: &[&str] = &[
    "id",
    "user_id",
    "message",
    "role",
    "total_gpt_tokens",
    "tts_symbols",
    "stt_blocks",
];

impl Db {
    /// Creates the ledger if needed. Safe to run on every startup.
    pub fn migrate(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        for (name, sql) in MIGRATIONS {
            if *name == "0002_import_legacy_messages" {
                if legacy_import_pending(&tx)? {
                    tx.execute_batch(sql)?;
                }
                continue;
            }
            tx.execute_batch(sql)?;
        }
        tx.commit()?;
        Ok(())
    }
}

/// Rows from the old `messages` table are copied once, into an empty ledger.
/// Token totals are raised to each user's running max so they never decrease.
fn legacy_import_pending(conn: &Connection) -> Result<bool> {
    if !table_exists(conn, LEGACY_TABLE)? {
        return Ok(false);
    }
    for column in LEGACY_COLUMNS {
        if !table_has_column(conn, LEGACY_TABLE, column)? {
            return Ok(false);
        }
    }
    let existing: i64 =
        conn.query_row("SELECT COUNT(*) FROM usage_record", [], |row| row.get(0))?;
    Ok(existing == 0)
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
