pub mod client;
pub mod models;

pub use client::YoutubeClient;
pub use models::{SearchResult, YoutubeError};
