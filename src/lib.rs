pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod join;
pub mod meeting;
pub mod models;
pub mod redis;
pub mod security;
pub mod state;

pub use config::Config;
pub use error::{AppError, Result};
pub use state::AppState;
