pub mod config;
pub mod database;
pub mod gateway;
pub mod handlers;
pub mod models;
pub mod openapi;
pub mod session;
pub mod utils;
pub mod view;
pub mod workspace;

pub use config::AppConfig;
pub use database::Database;
pub use session::AppState;
