pub mod telegram;

use crate::config::Destination;
use async_trait::async_trait;
use thiserror::Error;

pub use telegram::{MockChatProvider, TelegramProvider};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Send error: {0}")]
    SendFailed(String),
}

/// A chat service that can deliver one HTML message to one destination.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn send(&self, destination: &Destination, message: &str) -> Result<(), ProviderError>;

    fn name(&self) -> &'static str;
}
