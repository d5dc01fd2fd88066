mod aggregates;
mod context;
mod error;
mod helpers;
mod ledger;
mod migrations;

use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;

pub use error::{DbError, Result};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// One connection to the usage ledger. Cheap enough to open per request;
/// concurrent connections coordinate through SQLite's own locking.
pub struct Db {
    conn: Connection,
}

impl Db {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "temp_store", "MEMORY")?;
        Ok(Self { conn })
    }
}
