use anyhow::{anyhow, Context};
use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::time::Duration;

const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";
const DEFAULT_GEOLOCATION_API_URL: &str = "https://ipapi.co";
const DEFAULT_OUTBOUND_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub common: core_config::Config,
    pub destinations: Vec<Destination>,
    pub telegram: TelegramConfig,
    pub geolocation: GeolocationConfig,
    pub outbound: OutboundConfig,
    pub observability: ObservabilityConfig,
}

/// One chat that receives every relayed message.
#[derive(Debug, Clone)]
pub struct Destination {
    pub token: Secret<String>,
    pub chat_id: String,
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub api_url: String,
}

#[derive(Debug, Clone)]
pub struct GeolocationConfig {
    pub api_url: String,
}

#[derive(Debug, Clone)]
pub struct OutboundConfig {
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
}

impl RelayConfig {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let common = core_config::Config::load()?;

        let timeout = parse_timeout(env::var("OUTBOUND_TIMEOUT_SECS").ok().as_deref())?;

        Ok(RelayConfig {
            common,
            destinations: load_destinations(env::vars_os().filter_map(|(key, value)| {
                Some((key.into_string().ok()?, value.into_string().ok()?))
            }))?,
            telegram: TelegramConfig {
                api_url: env_or("TELEGRAM_API_URL", DEFAULT_TELEGRAM_API_URL),
            },
            geolocation: GeolocationConfig {
                api_url: env_or("GEOLOCATION_API_URL", DEFAULT_GEOLOCATION_API_URL),
            },
            outbound: OutboundConfig {
                timeout,
            },
            observability: ObservabilityConfig {
                log_level: env_or("LOG_LEVEL", "info"),
                otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|v| !v.is_empty()),
            },
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Per-call timeout for outbound requests. Zero is rejected: it would make
/// every lookup and send fail immediately.
pub fn parse_timeout(raw: Option<&str>) -> Result<Duration, AppError> {
    let Some(raw) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(Duration::from_secs(DEFAULT_OUTBOUND_TIMEOUT_SECS));
    };

    let secs = raw
        .parse::<u64>()
        .with_context(|| format!("OUTBOUND_TIMEOUT_SECS is not a number: {raw}"))
        .map_err(AppError::ConfigError)?;

    if secs == 0 {
        return Err(AppError::ConfigError(anyhow!(
            "OUTBOUND_TIMEOUT_SECS must be greater than zero"
        )));
    }

    Ok(Duration::from_secs(secs))
}

/// Destination index encoded in a variable name: `APIKEY`/`CHATID` are 1,
/// `APIKEY2`/`CHATID2` are 2, and so on.
fn destination_index(key: &str, prefix: &str) -> Option<usize> {
    let suffix = key.strip_prefix(prefix)?;
    if suffix.is_empty() {
        return Some(1);
    }
    if suffix.starts_with('0') || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse::<usize>().ok().filter(|index| *index >= 2)
}

fn suffix_for(index: usize) -> String {
    if index == 1 {
        String::new()
    } else {
        index.to_string()
    }
}

/// Collects `APIKEY`/`CHATID`, `APIKEY2`/`CHATID2`, `APIKEY3`/`CHATID3`, ...
/// from `vars`.
///
/// Indices must be contiguous from 1 and every token needs its chat id (and
/// the reverse); anything else is a configuration error, so no configured
/// destination is ever silently left out.
pub fn load_destinations<I>(vars: I) -> Result<Vec<Destination>, AppError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut tokens = BTreeMap::new();
    let mut chat_ids = BTreeMap::new();

    for (key, value) in vars {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        if let Some(index) = destination_index(&key, "APIKEY") {
            tokens.insert(index, value.to_string());
        } else if let Some(index) = destination_index(&key, "CHATID") {
            chat_ids.insert(index, value.to_string());
        }
    }

    let indices: BTreeSet<usize> = tokens.keys().chain(chat_ids.keys()).copied().collect();
    let mut destinations = Vec::with_capacity(indices.len());

    for (position, index) in indices.into_iter().enumerate() {
        let suffix = suffix_for(index);
        let expected = position + 1;
        if index != expected {
            let missing = suffix_for(expected);
            return Err(AppError::ConfigError(anyhow!(
                "APIKEY{suffix}/CHATID{suffix} is set but APIKEY{missing}/CHATID{missing} is missing"
            )));
        }

        match (tokens.remove(&index), chat_ids.remove(&index)) {
            (Some(token), Some(chat_id)) => destinations.push(Destination {
                token: Secret::new(token),
                chat_id,
            }),
            (Some(_), None) => {
                return Err(AppError::ConfigError(anyhow!(
                    "APIKEY{suffix} is set but CHATID{suffix} is missing"
                )))
            }
            (None, _) => {
                return Err(AppError::ConfigError(anyhow!(
                    "CHATID{suffix} is set but APIKEY{suffix} is missing"
                )))
            }
        }
    }

    Ok(destinations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn no_destinations_configured() {
        let destinations = load_destinations(vars(&[("PATH", "/usr/bin")])).unwrap();
        assert!(destinations.is_empty());
    }

    #[test]
    fn reads_primary_and_secondary_pairs() {
        let destinations = load_destinations(vars(&[
            ("CHATID2", "-200"),
            ("APIKEY", "111:aaa"),
            ("APIKEY2", "222:bbb"),
            ("CHATID", " -100 "),
        ]))
        .unwrap();

        assert_eq!(destinations.len(), 2);
        assert_eq!(destinations[0].token.expose_secret(), "111:aaa");
        assert_eq!(destinations[0].chat_id, "-100");
        assert_eq!(destinations[1].token.expose_secret(), "222:bbb");
        assert_eq!(destinations[1].chat_id, "-200");
    }

    #[test]
    fn secondary_without_primary_is_rejected() {
        let result = load_destinations(vars(&[("APIKEY2", "222:bbb"), ("CHATID2", "-200")]));
        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }

    #[test]
    fn gap_between_indices_is_rejected() {
        let result = load_destinations(vars(&[
            ("APIKEY", "111:aaa"),
            ("CHATID", "-100"),
            ("APIKEY3", "333:ccc"),
            ("CHATID3", "-300"),
        ]));

        let err = result.unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
        assert!(err.to_string().contains("APIKEY2/CHATID2 is missing"));
    }

    #[test]
    fn rejects_token_without_chat_id() {
        let result = load_destinations(vars(&[
            ("APIKEY", "111:aaa"),
            ("CHATID", "-100"),
            ("APIKEY2", "222:bbb"),
        ]));

        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }

    #[test]
    fn rejects_chat_id_without_token() {
        let result = load_destinations(vars(&[("CHATID", "-100")]));
        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }

    #[test]
    fn unrelated_and_blank_variables_are_ignored() {
        let destinations = load_destinations(vars(&[
            ("APIKEY", "111:aaa"),
            ("CHATID", "-100"),
            ("APIKEY2", "  "),
            ("APIKEY_BACKUP", "x"),
            ("CHATID02", "-2"),
        ]))
        .unwrap();

        assert_eq!(destinations.len(), 1);
    }

    #[test]
    fn token_is_redacted_in_debug_output() {
        let destinations =
            load_destinations(vars(&[("APIKEY", "111:aaa"), ("CHATID", "-100")])).unwrap();

        let debug = format!("{:?}", destinations[0]);
        assert!(!debug.contains("111:aaa"));
        assert!(debug.contains("-100"));
    }

    #[test]
    fn timeout_defaults_when_unset() {
        assert_eq!(
            parse_timeout(None).unwrap(),
            Duration::from_secs(DEFAULT_OUTBOUND_TIMEOUT_SECS)
        );
        assert_eq!(parse_timeout(Some(" 3 ")).unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn timeout_rejects_zero_and_garbage() {
        assert!(matches!(parse_timeout(Some("0")), Err(AppError::ConfigError(_))));
        assert!(matches!(parse_timeout(Some("ten")), Err(AppError::ConfigError(_))));
        assert!(matches!(parse_timeout(Some("-5")), Err(AppError::ConfigError(_))));
    }
}
