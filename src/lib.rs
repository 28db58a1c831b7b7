pub mod channel;
pub mod config;
pub mod errors;
pub mod export;
pub mod matcher;
pub mod models;
pub mod providers;
pub mod session;
pub mod spotify;
pub mod text;
pub mod youtube;

pub use errors::{AppError, AppResult};
pub use matcher::MatchingController;
