//! Row types as read from SQLite. The API layer maps these onto the wire
//! types in `parley-types`.

pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub avatar_url: Option<String>,
    pub created_at: String,
}

pub struct ServerRow {
    pub id: i64,
    pub name: String,
    pub icon: String,
    pub owner_id: i64,
    pub created_at: String,
}

pub struct ChannelRow {
    pub id: i64,
    pub server_id: i64,
    pub name: String,
    pub kind: String,
    pub position: i64,
    pub created_at: String,
}

/// A message joined with its author's display fields.
pub struct MessageRow {
    pub id: i64,
    pub channel_id: i64,
    pub author_id: i64,
    pub author_username: String,
    pub author_avatar: Option<String>,
    pub content: String,
    pub created_at: String,
}

pub struct MemberRow {
    pub user_id: i64,
    pub username: String,
    pub avatar_url: Option<String>,
}

/// Channel to create alongside a new server.
pub struct NewChannel<'a> {
    pub name: &'a str,
    pub kind: &'a str,
    pub position: i64,
}

/// Identity of a freshly inserted message.
pub struct InsertedMessage {
    pub id: i64,
    pub created_at: String,
}
