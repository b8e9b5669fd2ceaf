use anyhow::anyhow;
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{info, warn};

use parley_db::Database;
use parley_types::api::{MessageCreated, MessageList, MessageResponse};
use parley_types::models::MESSAGE_PAGE_SIZE;

use crate::error::{ApiError, ApiResult};

/// Latest page of a channel's history, oldest first.
pub fn list(db: &Database, channel_id: i64, user_id: i64) -> ApiResult<MessageList> {
    let messages = db
        .recent_messages(channel_id, user_id, MESSAGE_PAGE_SIZE)?
        .into_iter()
        .map(|row| MessageResponse {
            id: row.id.to_string(),
            timestamp: clock_time(&row.created_at, row.id),
            created_at: row.created_at,
            content: row.content,
            author: row.author_username,
            author_id: row.author_id,
            avatar: row.author_avatar,
        })
        .collect();

    Ok(MessageList { messages })
}

/// Appends a message as `user_id`. The author's display fields are read back
/// from the users table, never taken from the request.
pub fn post(db: &Database, channel_id: i64, user_id: i64, content: &str) -> ApiResult<MessageCreated> {
    let inserted = db
        .insert_message(channel_id, user_id, content)?
        .ok_or_else(|| ApiError::NotFound("Channel not found".into()))?;

    let author = db
        .get_user_by_id(user_id)?
        .ok_or_else(|| anyhow!("author {} of message {} not found", user_id, inserted.id))?;

    info!("User {} posted message {} in channel {}", user_id, inserted.id, channel_id);

    Ok(MessageCreated {
        message: MessageResponse {
            id: inserted.id.to_string(),
            content: content.to_string(),
            timestamp: clock_time(&inserted.created_at, inserted.id),
            created_at: inserted.created_at,
            author: author.username,
            author_id: user_id,
            avatar: author.avatar_url,
        },
    })
}

/// `HH:MM` (UTC) of a stored timestamp, or an empty string if it cannot be read.
fn clock_time(created_at: &str, message_id: i64) -> String {
    parse_timestamp(created_at)
        .map(|ts| ts.format("%H:%M").to_string())
        .unwrap_or_else(|| {
            warn!("Corrupt created_at '{}' on message {}", created_at, message_id);
            String::new()
        })
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .ok()
        .or_else(|| {
            // Rows written with SQLite's datetime('now') carry no zone.
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|ndt| ndt.and_utc())
        })
}
