use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        // Timestamps are RFC 3339 UTC with millisecond precision so that
        // text ordering matches chronological ordering.
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE users (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                email           TEXT NOT NULL UNIQUE,
                username        TEXT NOT NULL,
                password_hash   TEXT NOT NULL,
                avatar_url      TEXT,
                created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE servers (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                name            TEXT NOT NULL CHECK (length(trim(name)) > 0),
                icon            TEXT NOT NULL DEFAULT '🚀',
                owner_id        INTEGER NOT NULL REFERENCES users(id),
                created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE server_members (
                server_id       INTEGER NOT NULL REFERENCES servers(id) ON DELETE CASCADE,
                user_id         INTEGER NOT NULL REFERENCES users(id),
                joined_at       TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                PRIMARY KEY (server_id, user_id)
            );

            CREATE INDEX idx_server_members_user
                ON server_members(user_id);

            CREATE TABLE channels (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                server_id       INTEGER NOT NULL REFERENCES servers(id) ON DELETE CASCADE,
                name            TEXT NOT NULL,
                type            TEXT NOT NULL CHECK (type IN ('text', 'voice')),
                position        INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX idx_channels_server
                ON channels(server_id, position, created_at);

            CREATE TABLE messages (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                channel_id      INTEGER NOT NULL REFERENCES channels(id) ON DELETE CASCADE,
                user_id         INTEGER NOT NULL REFERENCES users(id),
                content         TEXT NOT NULL CHECK (length(trim(content)) > 0),
                created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX idx_messages_channel
                ON messages(channel_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
