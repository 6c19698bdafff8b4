pub mod api;
pub mod broadcast;
pub mod checkin;
pub mod config;
pub mod db;
pub mod export;
pub mod geo;
pub mod handlers;
pub mod keyboards;
pub mod models;
pub mod parsing;
pub mod ranks;
pub mod scheduler;
pub mod server;
pub mod session;
pub mod utils;

use sqlx::{Any, Pool};

#[derive(Clone)]
pub struct AppState {
    pub db: Pool<Any>,
    pub telegram: api::TelegramApi,
    pub bot_username: String,
    pub campus: config::CampusConfig,
    pub sessions: session::SessionStore,
}
