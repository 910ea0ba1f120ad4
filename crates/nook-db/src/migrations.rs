use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (users, folders, items)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id                  TEXT PRIMARY KEY,
                email               TEXT NOT NULL UNIQUE,
                private_pin_hash    TEXT,
                last_active_at      TEXT,
                created_at          TEXT NOT NULL
            );

            CREATE TABLE folders (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                kind        TEXT NOT NULL CHECK (kind IN ('NOTES', 'URLS')),
                name        TEXT NOT NULL,
                is_private  INTEGER NOT NULL DEFAULT 0,
                is_starred  INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL,
                UNIQUE(user_id, kind, name),
                -- the private partition holds notes only
                CHECK (kind = 'NOTES' OR is_private = 0)
            );

            CREATE INDEX idx_folders_user
                ON folders(user_id, kind, is_private);

            CREATE TABLE items (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                type        TEXT NOT NULL CHECK (type IN ('NOTE', 'URL')),
                title       TEXT,
                content     TEXT,
                url         TEXT,
                folder_id   TEXT REFERENCES folders(id) ON DELETE SET NULL,
                is_starred  INTEGER NOT NULL DEFAULT 0,
                is_draft    INTEGER NOT NULL DEFAULT 0,
                deleted_at  TEXT,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE INDEX idx_items_user_type
                ON items(user_id, type, updated_at);

            CREATE INDEX idx_items_folder
                ON items(folder_id);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
