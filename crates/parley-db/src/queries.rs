use crate::Database;
use crate::models::{
    ChannelRow, InsertedMessage, MemberRow, MessageRow, NewChannel, ServerRow, UserRow,
};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row};

impl Database {
    // -- Users --

    /// Inserts a user. Returns `None` when the email is already registered.
    pub fn create_user(
        &self,
        email: &str,
        username: &str,
        password_hash: &str,
    ) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "INSERT INTO users (email, username, password_hash) VALUES (?1, ?2, ?3)
                     ON CONFLICT(email) DO NOTHING
                     RETURNING id, email, username, password_hash, avatar_url, created_at",
                    (email, username, password_hash),
                    user_from_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_email(conn, email))
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    pub fn update_password_hash(&self, user_id: i64, password_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET password_hash = ?1 WHERE id = ?2",
                (password_hash, user_id),
            )?;
            Ok(())
        })
    }

    // -- Servers --

    /// Servers the user is a member of, oldest first.
    pub fn list_servers_for_user(&self, user_id: i64) -> Result<Vec<ServerRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT s.id, s.name, s.icon, s.owner_id, s.created_at
                 FROM servers s
                 INNER JOIN server_members sm ON s.id = sm.server_id
                 WHERE sm.user_id = ?1
                 ORDER BY s.created_at, s.id",
            )?;

            let rows = stmt
                .query_map([user_id], server_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Creates a server together with its owner's membership and the given
    /// channels. Either every row is written or none is.
    pub fn create_server(
        &self,
        owner_id: i64,
        name: &str,
        icon: &str,
        channels: &[NewChannel<'_>],
    ) -> Result<ServerRow> {
        self.with_tx(|tx| {
            let server = tx.query_row(
                "INSERT INTO servers (name, icon, owner_id) VALUES (?1, ?2, ?3)
                 RETURNING id, name, icon, owner_id, created_at",
                (name, icon, owner_id),
                server_from_row,
            )?;

            tx.execute(
                "INSERT INTO server_members (server_id, user_id) VALUES (?1, ?2)",
                (server.id, owner_id),
            )?;

            for channel in channels {
                tx.execute(
                    "INSERT INTO channels (server_id, name, type, position) VALUES (?1, ?2, ?3, ?4)",
                    (server.id, channel.name, channel.kind, channel.position),
                )?;
            }

            Ok(server)
        })
    }

    /// Adds a user to a server. Returns false if they were already a member.
    /// Server creation adds the owner itself; this is the entry point for
    /// anyone joining later.
    pub fn add_member(&self, server_id: i64, user_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO server_members (server_id, user_id) VALUES (?1, ?2)",
                (server_id, user_id),
            )?;
            Ok(inserted > 0)
        })
    }

    // -- Channels --

    /// Channels of a server, in display order. Empty unless `viewer_id` is a member.
    pub fn list_channels(&self, server_id: i64, viewer_id: i64) -> Result<Vec<ChannelRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.server_id, c.name, c.type, c.position, c.created_at
                 FROM channels c
                 INNER JOIN server_members sm
                     ON sm.server_id = c.server_id AND sm.user_id = ?2
                 WHERE c.server_id = ?1
                 ORDER BY c.position, c.created_at, c.id",
            )?;

            let rows = stmt
                .query_map((server_id, viewer_id), |row| {
                    Ok(ChannelRow {
                        id: row.get(0)?,
                        server_id: row.get(1)?,
                        name: row.get(2)?,
                        kind: row.get(3)?,
                        position: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Messages --

    /// The latest `limit` messages of a channel, returned oldest first.
    /// Empty unless `viewer_id` is a member of the channel's server.
    pub fn recent_messages(
        &self,
        channel_id: i64,
        viewer_id: i64,
        limit: u32,
    ) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut rows = query_recent_messages(conn, channel_id, viewer_id, limit)?;
            rows.reverse();
            Ok(rows)
        })
    }

    /// Appends a message. Returns `None` when the channel does not exist or
    /// the author is not a member of its server.
    pub fn insert_message(
        &self,
        channel_id: i64,
        author_id: i64,
        content: &str,
    ) -> Result<Option<InsertedMessage>> {
        self.with_tx(|tx| {
            if !can_view_channel(tx, channel_id, author_id)? {
                return Ok(None);
            }

            let inserted = tx.query_row(
                "INSERT INTO messages (channel_id, user_id, content) VALUES (?1, ?2, ?3)
                 RETURNING id, created_at",
                (channel_id, author_id, content),
                |row| {
                    Ok(InsertedMessage {
                        id: row.get(0)?,
                        created_at: row.get(1)?,
                    })
                },
            )?;

            Ok(Some(inserted))
        })
    }

    // -- Members --

    /// Members of a server ordered by username. Empty unless `viewer_id` is a member.
    pub fn list_members(&self, server_id: i64, viewer_id: i64) -> Result<Vec<MemberRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.username, u.avatar_url
                 FROM users u
                 INNER JOIN server_members sm ON u.id = sm.user_id
                 WHERE sm.server_id = ?1
                   AND EXISTS (
                       SELECT 1 FROM server_members me
                       WHERE me.server_id = ?1 AND me.user_id = ?2
                   )
                 ORDER BY u.username COLLATE NOCASE, u.id",
            )?;

            let rows = stmt
                .query_map((server_id, viewer_id), |row| {
                    Ok(MemberRow {
                        user_id: row.get(0)?,
                        username: row.get(1)?,
                        avatar_url: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        username: row.get(2)?,
        password_hash: row.get(3)?,
        avatar_url: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn server_from_row(row: &Row<'_>) -> rusqlite::Result<ServerRow> {
    Ok(ServerRow {
        id: row.get(0)?,
        name: row.get(1)?,
        icon: row.get(2)?,
        owner_id: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn query_user_by_email(conn: &Connection, email: &str) -> Result<Option<UserRow>> {
    let row = conn
        .query_row(
            "SELECT id, email, username, password_hash, avatar_url, created_at
             FROM users WHERE email = ?1",
            [email],
            user_from_row,
        )
        .optional()?;

    Ok(row)
}

fn query_user_by_id(conn: &Connection, id: i64) -> Result<Option<UserRow>> {
    let row = conn
        .query_row(
            "SELECT id, email, username, password_hash, avatar_url, created_at
             FROM users WHERE id = ?1",
            [id],
            user_from_row,
        )
        .optional()?;

    Ok(row)
}

fn can_view_channel(conn: &Connection, channel_id: i64, user_id: i64) -> Result<bool> {
    let visible = conn
        .query_row(
            "SELECT 1
             FROM channels c
             INNER JOIN server_members sm ON sm.server_id = c.server_id
             WHERE c.id = ?1 AND sm.user_id = ?2",
            (channel_id, user_id),
            |_| Ok(()),
        )
        .optional()?;

    Ok(visible.is_some())
}

fn query_recent_messages(
    conn: &Connection,
    channel_id: i64,
    viewer_id: i64,
    limit: u32,
) -> Result<Vec<MessageRow>> {
    // JOIN users so author display fields are resolved at read time
    let mut stmt = conn.prepare(
        "SELECT m.id, m.channel_id, m.user_id, u.username, u.avatar_url, m.content, m.created_at
         FROM messages m
         INNER JOIN users u ON m.user_id = u.id
         INNER JOIN channels c ON m.channel_id = c.id
         INNER JOIN server_members sm ON sm.server_id = c.server_id AND sm.user_id = ?2
         WHERE m.channel_id = ?1
         ORDER BY m.created_at DESC, m.id DESC
         LIMIT ?3",
    )?;

    let rows = stmt
        .query_map((channel_id, viewer_id, limit), |row| {
            Ok(MessageRow {
                id: row.get(0)?,
                channel_id: row.get(1)?,
                author_id: row.get(2)?,
                author_username: row.get(3)?,
                author_avatar: row.get(4)?,
                content: row.get(5)?,
                created_at: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}
