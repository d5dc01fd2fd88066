use quota_core::Role;
use quota_db::Db;
use rusqlite::Connection;

#[test]
fn migrate_is_idempotent() {
    let dir = tempfile::tempdir().expect("temp dir");
    let db_path = dir.path().join("twice.sqlite");
    let mut db = Db::open(&db_path).expect("open db");
    db.migrate().expect("first migrate");
    db.migrate().expect("second migrate");

    let conn = Connection::open(&db_path).expect("open conn");
    let tables: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'usage_record'",
            [],
            |row| row.get(0),
        )
        .expect("count tables");
    assert_eq!(tables, 1);
}

#[test]
fn migrate_imports_legacy_messages_once() {
    let dir = tempfile::tempdir().expect("temp dir");
    let db_path = dir.path().join("legacy.sqlite");
    {
        let conn = Connection::open(&db_path).expect("open conn");
        conn.execute_batch(
            r#"
            CREATE TABLE messages (
              id INTEGER PRIMARY KEY,
              user_id INTEGER,
              message TEXT,
              role TEXT,
              total_gpt_tokens INTEGER,
              tts_symbols INTEGER,
              stt_blocks INTEGER
            );
            INSERT INTO messages (user_id, message, role, total_gpt_tokens, tts_symbols, stt_blocks)
            VALUES (10, 'voice question', 'user', 0, 0, 2);
            INSERT INTO messages (user_id, message, role, total_gpt_tokens, tts_symbols, stt_blocks)
            VALUES (10, 'voice answer', 'assistant', 57, NULL, 0);
            "#,
        )
        .expect("seed legacy table");
    }

    let mut db = Db::open(&db_path).expect("open db");
    db.migrate().expect("migrate");
    db.migrate().expect("migrate again");

    let records = db.list_records(10).expect("list");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].transcription_blocks, 2);
    assert_eq!(records[1].role, Role::Assistant);
    assert_eq!(records[1].cumulative_tokens, 57);
    assert_eq!(records[1].synthesis_chars, 0);
}

#[test]
fn legacy_token_totals_never_decrease() {
    let dir = tempfile::tempdir().expect("temp dir");
    let db_path = dir.path().join("retries.sqlite");
    {
        let conn = Connection::open(&db_path).expect("open conn");
        conn.execute_batch(
            r#"
            CREATE TABLE messages (
              id INTEGER PRIMARY KEY,
              user_id INTEGER,
              message TEXT,
              role TEXT,
              total_gpt_tokens INTEGER,
              tts_symbols INTEGER,
              stt_blocks INTEGER
            );
            INSERT INTO messages (user_id, message, role, total_gpt_tokens, tts_symbols, stt_blocks)
            VALUES
              (1, 'question', 'user', 0, 0, 0),
              (2, 'other user', 'user', 0, 0, 0),
              (1, 'answer', 'assistant', 1990, 0, 0),
              (1, 'retry 1', 'user', 0, 0, 0),
              (1, 'retry 2', 'user', 0, 0, 0),
              (1, 'retry 3', 'user', 0, 0, 0),
              (1, 'retry 4', 'user', 0, 0, 0);
            "#,
        )
        .expect("seed legacy table");
    }

    let mut db = Db::open(&db_path).expect("open db");
    db.migrate().expect("migrate");

    let totals: Vec<u64> = db
        .list_records(1)
        .expect("list")
        .iter()
        .map(|record| record.cumulative_tokens)
        .collect();
    assert_eq!(totals, vec![0, 1990, 1990, 1990, 1990, 1990]);

    let newest = db.last_turns(1, 4).expect("last turns");
    assert!(newest.iter().all(|turn| turn.cumulative_tokens == 1990));
    assert_eq!(db.list_records(2).expect("list")[0].cumulative_tokens, 0);
}

#[test]
fn legacy_table_without_id_is_left_alone() {
    let dir = tempfile::tempdir().expect("temp dir");
    let db_path = dir.path().join("no_id.sqlite");
    {
        let conn = Connection::open(&db_path).expect("open conn");
        conn.execute_batch(
            r#"
            CREATE TABLE messages (
              user_id INTEGER,
              message TEXT,
              role TEXT,
              total_gpt_tokens INTEGER,
              tts_symbols INTEGER,
              stt_blocks INTEGER
            );
            INSERT INTO messages (user_id, message, role, total_gpt_tokens, tts_symbols, stt_blocks)
            VALUES (1, 'hi', 'user', 0, 0, 0);
            "#,
        )
        .expect("seed legacy table");
    }

    let mut db = Db::open(&db_path).expect("open db");
    db.migrate().expect("migrate");

    assert!(db.list_records(1).expect("list").is_empty());
}
