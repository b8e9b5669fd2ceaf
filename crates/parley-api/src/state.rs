use std::sync::Arc;

use parley_db::Database;

use crate::credentials::Credentials;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub db: Database,
    pub credentials: Credentials,
}

impl AppState {
    pub fn new(db: Database, credentials: Credentials) -> Self {
        Self { db, credentials }
    }
}
