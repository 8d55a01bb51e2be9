use diarystore_core::db::migrations::current_user_version;
use diarystore_core::db::{
    open_connection, prepare_connection, DbError, DbResult, StoreSchema, DEFAULT_BUSY_TIMEOUT,
    DIARY_SCHEMA, REPORT_SCHEMA,
};
use rusqlite::Connection;
use std::path::Path;

#[test]
fn prepared_in_memory_store_has_all_migrations() {
    let conn = prepared_in_memory(&DIARY_SCHEMA).unwrap();
    assert_eq!(schema_version(&conn), DIARY_SCHEMA.latest_version());
    assert_table_exists(&conn, "diary_entries");
    assert_table_exists(&conn, "entry_attachments");
    assert_column_exists(&conn, "diary_entries", "exported_at");

    let conn = prepared_in_memory(&REPORT_SCHEMA).unwrap();
    assert_eq!(schema_version(&conn), REPORT_SCHEMA.latest_version());
    assert_table_exists(&conn, "report_snapshots");
    assert_table_exists(&conn, "report_series");
}

#[test]
fn opening_same_store_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("diary.sqlite");

    let conn_first = open_store(&path, &DIARY_SCHEMA).unwrap();
    conn_first
        .execute(
            "INSERT INTO diary_entries (uuid, recorded_at, pain_level) VALUES (?1, ?2, ?3);",
            rusqlite::params!["entry-1", 1_700_000_000_000_i64, 4],
        )
        .unwrap();
    drop(conn_first);

    let conn_second = open_store(&path, &DIARY_SCHEMA).unwrap();
    assert_eq!(schema_version(&conn_second), DIARY_SCHEMA.latest_version());
    let rows: i64 = conn_second
        .query_row("SELECT COUNT(*) FROM diary_entries;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn partial_store_is_upgraded_and_keeps_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("diary.sqlite");

    let mut conn = Connection::open(&path).unwrap();
    DIARY_SCHEMA.migrate_to(&mut conn, 1).unwrap();
    conn.execute(
        "INSERT INTO diary_entries (uuid, recorded_at, pain_level, note) VALUES ('old', 1, 7, 'v1 row');",
        [],
    )
    .unwrap();
    drop(conn);

    let conn = open_store(&path, &DIARY_SCHEMA).unwrap();
    assert_eq!(current_user_version(&conn).unwrap(), DIARY_SCHEMA.latest_version());
    let (note, deleted): (String, i64) = conn
        .query_row(
            "SELECT note, is_deleted FROM diary_entries WHERE uuid = 'old';",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(note, "v1 row");
    assert_eq!(deleted, 0);
}

#[test]
fn opening_store_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_store(&path, &REPORT_SCHEMA).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            schema,
            db_version,
            latest_supported,
        } => {
            assert_eq!(schema, "report");
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, REPORT_SCHEMA.latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn open_store(path: &Path, schema: &StoreSchema) -> DbResult<Connection> {
    let mut conn = open_connection(path)?;
    prepare_connection(&mut conn, schema, DEFAULT_BUSY_TIMEOUT)?;
    Ok(conn)
}

fn prepared_in_memory(schema: &StoreSchema) -> DbResult<Connection> {
    let mut conn = Connection::open_in_memory()?;
    prepare_connection(&mut conn, schema, DEFAULT_BUSY_TIMEOUT)?;
    Ok(conn)
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}

fn assert_column_exists(conn: &Connection, table_name: &str, column: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM pragma_table_info(?1) WHERE name = ?2);",
            [table_name, column],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "column {table_name}.{column} does not exist");
}
