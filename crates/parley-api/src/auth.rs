use tracing::{info, warn};

use parley_db::models::UserRow;
use parley_types::api::{AuthRequest, AuthResponse, UserResponse};
use parley_types::envelope::{ApiRequest, ApiResponse};

use crate::credentials::{hash_password, needs_rehash, verify_password};
use crate::error::{ApiError, ApiResult};
use crate::routes::parse_body;
use crate::state::AppState;

pub const ALLOWED_METHODS: &str = "POST, OPTIONS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Register,
    Login,
}

impl Action {
    fn parse(raw: Option<&str>) -> Option<Self> {
        match raw? {
            "register" => Some(Self::Register),
            "login" => Some(Self::Login),
            _ => None,
        }
    }
}

/// Entry point for registration and login.
pub fn handle(state: &AppState, req: &ApiRequest) -> ApiResponse {
    match req.method().as_str() {
        "OPTIONS" => ApiResponse::preflight(ALLOWED_METHODS),
        "POST" => dispatch(state, req).unwrap_or_else(ApiError::into_response),
        _ => ApiError::MethodNotAllowed.into_response(),
    }
}

fn dispatch(state: &AppState, req: &ApiRequest) -> ApiResult<ApiResponse> {
    let body: AuthRequest = parse_body(req)?;

    let email = body.email.as_deref().unwrap_or_default().trim().to_lowercase();
    let password = body.password.as_deref().unwrap_or_default();
    if email.is_empty() || password.is_empty() {
        return Err(ApiError::Validation("Email and password are required".into()));
    }

    match Action::parse(body.action.as_deref()) {
        Some(Action::Register) => {
            let username = body.username.as_deref().unwrap_or_default().trim();
            register(state, &email, username, password)
        }
        Some(Action::Login) => login(state, &email, password),
        None => Err(ApiError::Validation("Invalid action".into())),
    }
}

fn register(state: &AppState, email: &str, username: &str, password: &str) -> ApiResult<ApiResponse> {
    if username.is_empty() {
        return Err(ApiError::Validation("Username is required".into()));
    }

    let password_hash = hash_password(password)?;

    let user = state
        .db
        .create_user(email, username, &password_hash)?
        .ok_or_else(|| ApiError::Conflict("Email already exists".into()))?;

    let token = state.credentials.issue_token(user.id, &user.email)?;
    info!("Registered user {} ({})", user.id, user.username);

    Ok(ApiResponse::json(
        201,
        &AuthResponse {
            token,
            user: to_response(user),
        },
    ))
}

fn login(state: &AppState, email: &str, password: &str) -> ApiResult<ApiResponse> {
    let user = state
        .db
        .get_user_by_email(email)?
        .filter(|user| verify_password(password, &user.password_hash))
        .ok_or_else(|| {
            warn!("Failed login for {}", email);
            ApiError::InvalidCredentials
        })?;

    if needs_rehash(&user.password_hash) {
        upgrade_verifier(state, user.id, password);
    }

    let token = state.credentials.issue_token(user.id, &user.email)?;

    Ok(ApiResponse::json(
        200,
        &AuthResponse {
            token,
            user: to_response(user),
        },
    ))
}

/// Replaces a legacy verifier after a successful login. Failure only costs
/// another attempt on the next login.
fn upgrade_verifier(state: &AppState, user_id: i64, password: &str) {
    let result = hash_password(password)
        .and_then(|verifier| state.db.update_password_hash(user_id, &verifier));

    match result {
        Ok(()) => info!("Upgraded password verifier for user {}", user_id),
        Err(e) => warn!("Could not upgrade password verifier for user {}: {:#}", user_id, e),
    }
}

fn to_response(user: UserRow) -> UserResponse {
    UserResponse {
        id: user.id,
        email: user.email,
        username: user.username,
        avatar_url: user.avatar_url,
    }
}
