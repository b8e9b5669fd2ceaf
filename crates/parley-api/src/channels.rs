use tracing::warn;

use parley_db::Database;
use parley_types::api::{ChannelList, ChannelResponse};
use parley_types::models::ChannelKind;

use crate::error::ApiResult;

/// Channels of `server_id` in display order; empty for non-members.
pub fn list(db: &Database, server_id: i64, user_id: i64) -> ApiResult<ChannelList> {
    let channels = db
        .list_channels(server_id, user_id)?
        .into_iter()
        .map(|row| ChannelResponse {
            id: row.id.to_string(),
            kind: row.kind.parse().unwrap_or_else(|e| {
                warn!("Corrupt type on channel {}: {}", row.id, e);
                ChannelKind::Text
            }),
            name: row.name,
            position: row.position,
        })
        .collect();

    Ok(ChannelList { channels })
}
