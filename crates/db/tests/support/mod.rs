#![allow(dead_code)]

use std::path::PathBuf;

use quota_core::NewUsageRecord;
use quota_db::Db;
use tempfile::TempDir;

pub struct TestDb {
    pub _dir: TempDir,
    pub db: Db,
    pub path: PathBuf,
}

pub fn setup_db() -> TestDb {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("test.sqlite");
    let mut db = Db::open(&path).expect("open db");
    db.migrate().expect("migrate db");
    TestDb {
        _dir: dir,
        db,
        path,
    }
}

pub fn insert_records(db: &mut Db, records: Vec<NewUsageRecord>) -> Vec<i64> {
    db.append_records(&records).expect("append records")
}

/// A completed text exchange: user message then assistant reply.
pub fn exchange(user_id: i64, prompt: &str, reply: &str, total_tokens: u64) -> Vec<NewUsageRecord> {
    vec![
        NewUsageRecord::user(user_id, prompt, 0),
        NewUsageRecord::assistant(user_id, reply, total_tokens),
    ]
}
