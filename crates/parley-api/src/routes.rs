use serde::de::DeserializeOwned;

use parley_types::api::{CreateServerRequest, IdValue, PostMessageRequest};
use parley_types::envelope::ApiRequest;
use parley_types::models::DEFAULT_SERVER_ICON;

use crate::error::{ApiError, ApiResult};

/// Resource operations reachable through the `path` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    ListServers,
    CreateServer,
    ListChannels,
    ListMessages,
    PostMessage,
    ListMembers,
}

impl Route {
    /// `method` is expected upper-case.
    pub fn resolve(path: &str, method: &str) -> Option<Self> {
        match (path, method) {
            ("servers", "GET") => Some(Self::ListServers),
            ("servers", "POST") => Some(Self::CreateServer),
            ("channels", "GET") => Some(Self::ListChannels),
            ("messages", "GET") => Some(Self::ListMessages),
            ("messages", "POST") => Some(Self::PostMessage),
            ("members", "GET") => Some(Self::ListMembers),
            _ => None,
        }
    }
}

/// A route together with its validated input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    ListServers,
    CreateServer { name: String, icon: String },
    ListChannels { server_id: i64 },
    ListMessages { channel_id: i64 },
    PostMessage { channel_id: i64, content: String },
    ListMembers { server_id: i64 },
}

impl Operation {
    pub fn parse(route: Route, req: &ApiRequest) -> ApiResult<Self> {
        match route {
            Route::ListServers => Ok(Self::ListServers),
            Route::CreateServer => {
                let body: CreateServerRequest = parse_body(req)?;
                let name = body.name.as_deref().map(str::trim).unwrap_or_default();
                if name.is_empty() {
                    return Err(ApiError::Validation("Server name is required".into()));
                }
                let icon = body
                    .icon
                    .as_deref()
                    .map(str::trim)
                    .filter(|icon| !icon.is_empty())
                    .unwrap_or(DEFAULT_SERVER_ICON);

                Ok(Self::CreateServer {
                    name: name.to_string(),
                    icon: icon.to_string(),
                })
            }
            Route::ListChannels => Ok(Self::ListChannels {
                server_id: query_id(req, "server_id")?,
            }),
            Route::ListMessages => Ok(Self::ListMessages {
                channel_id: query_id(req, "channel_id")?,
            }),
            Route::PostMessage => {
                let body: PostMessageRequest = parse_body(req)?;
                let channel_id = body_id(body.channel_id.as_ref(), "channel_id")?;
                let content = body.content.as_deref().map(str::trim).unwrap_or_default();
                if content.is_empty() {
                    return Err(ApiError::required("content"));
                }

                Ok(Self::PostMessage {
                    channel_id,
                    content: content.to_string(),
                })
            }
            Route::ListMembers => Ok(Self::ListMembers {
                server_id: query_id(req, "server_id")?,
            }),
        }
    }
}

/// Decodes a JSON body. An absent or blank body decodes as `T::default()`.
pub(crate) fn parse_body<T>(req: &ApiRequest) -> ApiResult<T>
where
    T: DeserializeOwned + Default,
{
    match req.body.as_deref().map(str::trim) {
        None | Some("") => Ok(T::default()),
        Some(raw) => {
            serde_json::from_str(raw).map_err(|_| ApiError::Validation("Invalid JSON body".into()))
        }
    }
}

fn query_id(req: &ApiRequest, field: &str) -> ApiResult<i64> {
    let raw = req
        .query(field)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::required(field))?;

    raw.parse().map_err(|_| not_an_integer(field))
}

fn body_id(value: Option<&IdValue>, field: &str) -> ApiResult<i64> {
    match value {
        None => Err(ApiError::required(field)),
        Some(IdValue::Text(raw)) if raw.trim().is_empty() => Err(ApiError::required(field)),
        Some(id) => id.as_i64().ok_or_else(|| not_an_integer(field)),
    }
}

fn not_an_integer(field: &str) -> ApiError {
    ApiError::Validation(format!("{} must be an integer", field))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(err: ApiError) -> String {
        err.to_string()
    }

    #[test]
    fn resolves_only_known_pairs() {
        assert_eq!(Route::resolve("servers", "GET"), Some(Route::ListServers));
        assert_eq!(Route::resolve("servers", "POST"), Some(Route::CreateServer));
        assert_eq!(Route::resolve("messages", "POST"), Some(Route::PostMessage));
        assert_eq!(Route::resolve("channels", "POST"), None);
        assert_eq!(Route::resolve("servers", "DELETE"), None);
        assert_eq!(Route::resolve("", "GET"), None);
    }

    #[test]
    fn create_server_trims_and_defaults_icon() {
        let req = ApiRequest::new("POST").with_body(r#"{"name": "  Guild  "}"#);
        assert_eq!(
            Operation::parse(Route::CreateServer, &req).unwrap(),
            Operation::CreateServer {
                name: "Guild".into(),
                icon: DEFAULT_SERVER_ICON.into()
            }
        );
    }

    #[test]
    fn create_server_requires_a_name() {
        for body in [r#"{"name": "   "}"#, r#"{"icon": "x"}"#, ""] {
            let req = ApiRequest::new("POST").with_body(body);
            let err = Operation::parse(Route::CreateServer, &req).unwrap_err();
            assert_eq!(message(err), "Server name is required");
        }
    }

    #[test]
    fn query_ids_are_required_and_numeric() {
        let req = ApiRequest::new("GET");
        let err = Operation::parse(Route::ListChannels, &req).unwrap_err();
        assert_eq!(message(err), "server_id is required");

        let req = ApiRequest::new("GET").with_query("channel_id", "abc");
        let err = Operation::parse(Route::ListMessages, &req).unwrap_err();
        assert_eq!(message(err), "channel_id must be an integer");

        let req = ApiRequest::new("GET").with_query("server_id", "7");
        assert_eq!(
            Operation::parse(Route::ListMembers, &req).unwrap(),
            Operation::ListMembers { server_id: 7 }
        );
    }

    #[test]
    fn post_message_validates_channel_then_content() {
        let req = ApiRequest::new("POST").with_body(r#"{"content": "hi"}"#);
        let err = Operation::parse(Route::PostMessage, &req).unwrap_err();
        assert_eq!(message(err), "channel_id is required");

        let req = ApiRequest::new("POST").with_body(r#"{"channel_id": "3", "content": "  "}"#);
        let err = Operation::parse(Route::PostMessage, &req).unwrap_err();
        assert_eq!(message(err), "content is required");

        let req = ApiRequest::new("POST").with_body(r#"{"channel_id": "3", "content": " hi "}"#);
        assert_eq!(
            Operation::parse(Route::PostMessage, &req).unwrap(),
            Operation::PostMessage {
                channel_id: 3,
                content: "hi".into()
            }
        );
    }

    #[test]
    fn malformed_body_is_a_validation_error() {
        let req = ApiRequest::new("POST").with_body("{not json");
        let err = Operation::parse(Route::CreateServer, &req).unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(message(err), "Invalid JSON body");
    }
}
