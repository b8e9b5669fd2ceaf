use parley_db::Database;
use parley_types::api::{MemberList, MemberResponse};

use crate::error::ApiResult;

pub fn list(db: &Database, server_id: i64, user_id: i64) -> ApiResult<MemberList> {
    let members = db
        .list_members(server_id, user_id)?
        .into_iter()
        .map(|row| MemberResponse {
            id: row.user_id,
            name: row.username,
            avatar: row.avatar_url,
            online: true,
        })
        .collect();

    Ok(MemberList { members })
}
