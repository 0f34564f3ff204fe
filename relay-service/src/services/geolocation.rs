//! Country lookup for client IP addresses.

use async_trait::async_trait;
use metrics::counter;
use reqwest::Client;
use std::net::IpAddr;

/// Returned whenever the country cannot be determined.
pub const UNKNOWN_COUNTRY: &str = "Unknown";

#[async_trait]
pub trait GeoLocator: Send + Sync {
    /// Resolve `ip` to a country name. Never fails: lookup problems degrade to
    /// [`UNKNOWN_COUNTRY`].
    async fn country_for(&self, ip: &str) -> String;
}

/// ipapi.co-compatible lookup: `GET {base}/{ip}/country_name/` returning the
/// country as plain text.
pub struct IpapiLocator {
    base_url: String,
    client: Client,
}

impl IpapiLocator {
    pub fn new(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    async fn lookup(&self, ip: IpAddr) -> Result<String, String> {
        let url = format!("{}/{}/country_name/", self.base_url, ip);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(format!("lookup returned status {}", response.status()));
        }

        response
            .text()
            .await
            .map_err(|e| format!("failed to read response: {}", e))
    }
}

#[async_trait]
impl GeoLocator for IpapiLocator {
    async fn country_for(&self, ip: &str) -> String {
        // The address may come from a client-controlled header; only a
        // well-formed IP is allowed into the lookup URL.
        let Ok(addr) = ip.parse::<IpAddr>() else {
            counter!("relay_geolocation_lookups_total", "outcome" => "invalid").increment(1);
            tracing::debug!(ip = %ip, "Skipping geolocation for malformed address");
            return UNKNOWN_COUNTRY.to_string();
        };

        match self.lookup(addr).await {
            Ok(body) => {
                let country = body.trim();
                if country.is_empty() {
                    counter!("relay_geolocation_lookups_total", "outcome" => "empty").increment(1);
                    tracing::debug!(ip = %ip, "Geolocation returned an empty body");
                    UNKNOWN_COUNTRY.to_string()
                } else {
                    counter!("relay_geolocation_lookups_total", "outcome" => "resolved")
                        .increment(1);
                    country.to_string()
                }
            }
            Err(e) => {
                counter!("relay_geolocation_lookups_total", "outcome" => "failed").increment(1);
                tracing::warn!(ip = %ip, error = %e, "Geolocation lookup failed");
                UNKNOWN_COUNTRY.to_string()
            }
        }
    }
}

/// Fixed-answer locator for tests.
pub struct StaticLocator {
    country: String,
}

impl StaticLocator {
    pub fn new(country: impl Into<String>) -> Self {
        Self {
            country: country.into(),
        }
    }
}

#[async_trait]
impl GeoLocator for StaticLocator {
    async fn country_for(&self, _ip: &str) -> String {
        self.country.clone()
    }
}
