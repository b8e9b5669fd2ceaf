pub mod auth;
pub mod channels;
pub mod config;
pub mod credentials;
pub mod error;
pub mod members;
pub mod messages;
pub mod resources;
pub mod routes;
pub mod servers;
pub mod state;

pub use state::{AppState, SharedState};
