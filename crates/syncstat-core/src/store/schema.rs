use rusqlite::Connection;

pub(super) fn apply_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA busy_timeout=5000;
         PRAGMA temp_store=MEMORY;
         PRAGMA cache_size=-32000;",
    )
}

pub(super) fn apply_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS files (
            id INTEGER PRIMARY KEY,
            file TEXT NOT NULL UNIQUE,
            modified_at INTEGER NOT NULL,
            checked INTEGER NOT NULL DEFAULT 0,
            file_status TEXT NOT NULL,
            synced INTEGER NOT NULL DEFAULT 0,
            synced_at INTEGER,
            sync_status TEXT,
            remote_copy INTEGER NOT NULL DEFAULT 0
         );
         CREATE INDEX IF NOT EXISTS idx_files_unchecked
            ON files(id) WHERE checked = 0;
         CREATE INDEX IF NOT EXISTS idx_files_pending
            ON files(file_status, id) WHERE synced = 0;",
    )?;
    migrate_remote_copy(conn)
}

/// `remote_copy` tracks whether the last successful transfer left an
/// object on the remote. Stores created before the column existed assume
/// every synced record has one.
fn migrate_remote_copy(conn: &Connection) -> rusqlite::Result<()> {
    let columns = {
        let mut stmt = conn.prepare("SELECT name FROM pragma_table_info('files')")?;
        stmt.query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?
    };
    let has_column = columns.iter().any(|name| name == "remote_copy");
    if has_column {
        return Ok(());
    }
    conn.execute_batch(
        "ALTER TABLE files ADD COLUMN remote_copy INTEGER NOT NULL DEFAULT 0;
         UPDATE files SET remote_copy = 1 WHERE synced_at IS NOT NULL;",
    )
}

/// Column list shared by every query that materialises a `FileRecord`.
pub(super) const RECORD_COLUMNS: &str =
    "id, file, modified_at, checked, file_status, synced, synced_at, sync_status";
