//! Shared harness for the integration suites. Not every suite uses every
//! helper.
#![allow(dead_code)]

use relay_service::config::{
    Destination, GeolocationConfig, ObservabilityConfig, OutboundConfig, RelayConfig,
    TelegramConfig,
};
use relay_service::startup::Application;
use secrecy::Secret;
use service_core::config::Config as CoreConfig;
use std::time::Duration;
use wiremock::MockServer;

pub struct TestApp {
    pub address: String,
    pub telegram: MockServer,
    pub geolocation: MockServer,
}

pub fn destination(token: &str, chat_id: &str) -> Destination {
    Destination {
        token: Secret::new(token.to_string()),
        chat_id: chat_id.to_string(),
    }
}

impl TestApp {
    /// Spawn the relay on a random port, pointed at mock Telegram and
    /// geolocation servers.
    pub async fn spawn(destinations: Vec<Destination>) -> Self {
        let telegram = MockServer::start().await;
        let geolocation = MockServer::start().await;

        let config = RelayConfig {
            common: CoreConfig { port: 0 },
            destinations,
            telegram: TelegramConfig {
                api_url: telegram.uri(),
            },
            geolocation: GeolocationConfig {
                api_url: geolocation.uri(),
            },
            outbound: OutboundConfig {
                timeout: Duration::from_secs(2),
            },
            observability: ObservabilityConfig {
                log_level: "debug".to_string(),
                otlp_endpoint: None,
            },
        };

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to be ready by polling the health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            telegram,
            geolocation,
        }
    }

    pub async fn post_send(&self, body: &str, forwarded_for: Option<&str>) -> reqwest::Response {
        let mut request = reqwest::Client::new()
            .post(format!("{}/send", self.address))
            .header("content-type", "application/json")
            .body(body.to_string());

        if let Some(ip) = forwarded_for {
            request = request.header("x-forwarded-for", ip);
        }

        request.send().await.expect("Failed to execute request")
    }

    /// Bodies of every `sendMessage` call the mock Telegram server received.
    pub async fn telegram_messages(&self) -> Vec<serde_json::Value> {
        self.telegram
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter_map(|r| serde_json::from_slice(&r.body).ok())
            .collect()
    }
}
