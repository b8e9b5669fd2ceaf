use serde::{Deserialize, Serialize};

use crate::models::ChannelKind;

// -- JWT Claims --

/// Session token payload. `user_id` here is the only identity a request is
/// allowed to act as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub email: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Default, Deserialize)]
pub struct AuthRequest {
    pub action: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub avatar_url: Option<String>,
}

// -- Servers --

#[derive(Debug, Default, Deserialize)]
pub struct CreateServerRequest {
    pub name: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ServerResponse {
    pub id: i64,
    pub name: String,
    pub icon: String,
    pub owner_id: i64,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct ServerList {
    pub servers: Vec<ServerResponse>,
}

#[derive(Debug, Serialize)]
pub struct ServerCreated {
    pub server: ServerResponse,
}

// -- Channels --

#[derive(Debug, Serialize)]
pub struct ChannelResponse {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ChannelKind,
    pub position: i64,
}

#[derive(Debug, Serialize)]
pub struct ChannelList {
    pub channels: Vec<ChannelResponse>,
}

// -- Messages --

/// Ids arrive either as JSON numbers or as the stringified ids the list
/// endpoints hand out.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum IdValue {
    Int(i64),
    Text(String),
}

impl IdValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(id) => Some(*id),
            Self::Text(raw) => raw.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PostMessageRequest {
    pub channel_id: Option<IdValue>,
    pub content: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: String,
    pub content: String,
    /// Wall-clock `HH:MM` for display.
    pub timestamp: String,
    pub created_at: String,
    pub author: String,
    pub author_id: i64,
    pub avatar: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageList {
    pub messages: Vec<MessageResponse>,
}

#[derive(Debug, Serialize)]
pub struct MessageCreated {
    pub message: MessageResponse,
}

// -- Members --

#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub id: i64,
    pub name: String,
    pub avatar: Option<String>,
    /// Always `true`: there is no presence tracking behind this field.
    pub online: bool,
}

#[derive(Debug, Serialize)]
pub struct MemberList {
    pub members: Vec<MemberResponse>,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
