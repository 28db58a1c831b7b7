pub mod client;
pub mod models;

pub use client::ChannelClient;
pub use models::ChannelError;
