use super::{ChatProvider, ProviderError};
use crate::config::Destination;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

/// Telegram Bot API `sendMessage` client.
pub struct TelegramProvider {
    api_url: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

impl TelegramProvider {
    pub fn new(api_url: impl Into<String>, client: Client) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[async_trait]
impl ChatProvider for TelegramProvider {
    async fn send(&self, destination: &Destination, message: &str) -> Result<(), ProviderError> {
        let url = format!(
            "{}/bot{}/sendMessage",
            self.api_url,
            destination.token.expose_secret()
        );

        let request = SendMessageRequest {
            chat_id: &destination.chat_id,
            text: message,
            parse_mode: "HTML",
        };

        // The request URL embeds the bot token, so it is stripped from any
        // transport error before the error leaves this function.
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                ProviderError::Connection(format!(
                    "Failed to connect to Telegram: {}",
                    e.without_url()
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::SendFailed(format!(
                "Telegram API returned error status {}: {}",
                status, body
            )));
        }

        tracing::info!(
            chat_id = %destination.chat_id,
            "Message sent successfully via Telegram"
        );

        Ok(())
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}

/// Mock chat provider for testing
pub struct MockChatProvider {
    failing_chats: Mutex<Vec<String>>,
    fail_all: AtomicBool,
    send_count: AtomicU64,
    sent: Mutex<Vec<(String, String)>>,
}

impl MockChatProvider {
    pub fn new() -> Self {
        Self {
            failing_chats: Mutex::new(Vec::new()),
            fail_all: AtomicBool::new(false),
            send_count: AtomicU64::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        let provider = Self::new();
        provider.fail_all.store(true, Ordering::SeqCst);
        provider
    }

    /// Reject every send addressed to `chat_id`.
    pub fn fail_chat(&self, chat_id: &str) {
        if let Ok(mut chats) = self.failing_chats.lock() {
            chats.push(chat_id.to_string());
        }
    }

    pub fn send_count(&self) -> u64 {
        self.send_count.load(Ordering::SeqCst)
    }

    /// `(chat_id, message)` pairs that were accepted.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Default for MockChatProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatProvider for MockChatProvider {
    async fn send(&self, destination: &Destination, message: &str) -> Result<(), ProviderError> {
        self.send_count.fetch_add(1, Ordering::SeqCst);

        let rejected = self.fail_all.load(Ordering::SeqCst)
            || self
                .failing_chats
                .lock()
                .map(|chats| chats.contains(&destination.chat_id))
                .unwrap_or(false);

        if rejected {
            return Err(ProviderError::SendFailed(format!(
                "[MOCK] chat {} rejected the message",
                destination.chat_id
            )));
        }

        if let Ok(mut sent) = self.sent.lock() {
            sent.push((destination.chat_id.clone(), message.to_string()));
        }

        tracing::info!(
            chat_id = %destination.chat_id,
            message_length = %message.len(),
            "[MOCK] Message would be sent"
        );

        Ok(())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
