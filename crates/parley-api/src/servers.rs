use tracing::info;

use parley_db::Database;
use parley_db::models::{NewChannel, ServerRow};
use parley_types::api::{ServerCreated, ServerList, ServerResponse};
use parley_types::models::DEFAULT_CHANNELS;

use crate::error::ApiResult;

pub fn list(db: &Database, user_id: i64) -> ApiResult<ServerList> {
    let servers = db
        .list_servers_for_user(user_id)?
        .into_iter()
        .map(to_response)
        .collect();

    Ok(ServerList { servers })
}

/// Creates the server, the owner's membership and the default channels in
/// one transaction.
pub fn create(db: &Database, owner_id: i64, name: &str, icon: &str) -> ApiResult<ServerCreated> {
    let channels: Vec<NewChannel<'_>> = DEFAULT_CHANNELS
        .iter()
        .map(|c| NewChannel {
            name: c.name,
            kind: c.kind.as_str(),
            position: c.position,
        })
        .collect();

    let row = db.create_server(owner_id, name, icon, &channels)?;
    info!("User {} created server {} ({})", owner_id, row.id, row.name);

    Ok(ServerCreated {
        server: to_response(row),
    })
}

fn to_response(row: ServerRow) -> ServerResponse {
    ServerResponse {
        id: row.id,
        name: row.name,
        icon: row.icon,
        owner_id: row.owner_id,
        created_at: row.created_at,
    }
}
