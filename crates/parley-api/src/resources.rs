use tracing::{debug, warn};

use parley_types::api::Claims;
use parley_types::envelope::{ApiRequest, ApiResponse};

use crate::error::{ApiError, ApiResult};
use crate::routes::{Operation, Route};
use crate::state::AppState;
use crate::{channels, members, messages, servers};

pub const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";

/// Entry point for `servers`, `channels`, `messages` and `members`.
///
/// Order of checks: pre-flight, authentication, route lookup, input
/// validation, then the data store. Nothing touches the database before the
/// token has been verified.
pub fn handle(state: &AppState, req: &ApiRequest) -> ApiResponse {
    if req.method() == "OPTIONS" {
        return ApiResponse::preflight(ALLOWED_METHODS);
    }

    dispatch(state, req).unwrap_or_else(ApiError::into_response)
}

fn dispatch(state: &AppState, req: &ApiRequest) -> ApiResult<ApiResponse> {
    let claims = authenticate(state, req)?;

    let method = req.method();
    let route = Route::resolve(req.logical_path(), &method)
        .ok_or_else(|| ApiError::NotFound("Not found".into()))?;

    let operation = Operation::parse(route, req)?;
    debug!("User {} -> {:?}", claims.user_id, route);

    execute(state, &claims, operation)
}

/// Verifies the `x-auth-token` header and returns the caller's claims.
pub fn authenticate(state: &AppState, req: &ApiRequest) -> ApiResult<Claims> {
    let token = req.auth_token().ok_or_else(|| {
        warn!("Request to '{}' without a session token", req.logical_path());
        ApiError::Unauthorized
    })?;

    state.credentials.verify_token(token)
}

/// Runs a validated operation on behalf of `claims.user_id`.
pub fn execute(state: &AppState, claims: &Claims, operation: Operation) -> ApiResult<ApiResponse> {
    let user_id = claims.user_id;
    let db = &state.db;

    let response = match operation {
        Operation::ListServers => ApiResponse::json(200, &servers::list(db, user_id)?),
        Operation::CreateServer { name, icon } => {
            ApiResponse::json(201, &servers::create(db, user_id, &name, &icon)?)
        }
        Operation::ListChannels { server_id } => {
            ApiResponse::json(200, &channels::list(db, server_id, user_id)?)
        }
        Operation::ListMessages { channel_id } => {
            ApiResponse::json(200, &messages::list(db, channel_id, user_id)?)
        }
        Operation::PostMessage {
            channel_id,
            content,
        } => ApiResponse::json(201, &messages::post(db, channel_id, user_id, &content)?),
        Operation::ListMembers { server_id } => {
            ApiResponse::json(200, &members::list(db, server_id, user_id)?)
        }
    };

    Ok(response)
}
