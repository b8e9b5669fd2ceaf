#![allow(dead_code)]

use serde_json::{Value, json};
use tempfile::TempDir;

use parley_api::credentials::Credentials;
use parley_api::{AppState, auth, resources};
use parley_db::{Database, PoolOptions};
use parley_types::envelope::{ApiRequest, ApiResponse};

pub const SECRET: &str = "integration-test-secret";

pub struct TestApp {
    _dir: TempDir,
    pub state: AppState,
}

pub struct Registered {
    pub id: i64,
    pub token: String,
}

impl TestApp {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("parley.db"), &PoolOptions::default()).unwrap();
        let state = AppState::new(db, Credentials::new(SECRET));
        Self { _dir: dir, state }
    }

    pub fn auth(&self, req: ApiRequest) -> (u16, Value) {
        decode(auth::handle(&self.state, &req))
    }

    pub fn api(&self, req: ApiRequest) -> (u16, Value) {
        decode(resources::handle(&self.state, &req))
    }

    pub fn register(&self, email: &str, username: &str, password: &str) -> Registered {
        let (status, body) = self.auth(ApiRequest::new("POST").with_body(
            json!({
                "action": "register",
                "email": email,
                "username": username,
                "password": password,
            })
            .to_string(),
        ));
        assert_eq!(status, 201, "register failed: {}", body);

        Registered {
            id: body["user"]["id"].as_i64().unwrap(),
            token: body["token"].as_str().unwrap().to_string(),
        }
    }

    pub fn count(&self, table: &str) -> i64 {
        self.scalar(&format!("SELECT COUNT(*) FROM {}", table))
    }

    pub fn scalar(&self, sql: &str) -> i64 {
        self.state
            .db
            .with_conn(|conn| Ok(conn.query_row(sql, [], |row| row.get(0))?))
            .unwrap()
    }
}

/// Builds a resource request for `path` carrying `token`.
pub fn request(method: &str, path: &str, token: &str) -> ApiRequest {
    ApiRequest::new(method)
        .with_query("path", path)
        .with_header("X-Auth-Token", token)
}

fn decode(resp: ApiResponse) -> (u16, Value) {
    let body = if resp.body.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&resp.body).unwrap()
    };
    (resp.status_code, body)
}
