//! Fan-out of one message to every configured destination.

use super::providers::{ChatProvider, ProviderError};
use crate::config::Destination;
use futures::future::join_all;
use metrics::counter;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{failed} of {attempted} destinations rejected the message")]
pub struct DispatchError {
    pub attempted: usize,
    pub failed: usize,
    pub errors: Vec<(String, ProviderError)>,
}

/// Send `message` to all `destinations` concurrently, one attempt each.
///
/// Every send runs to completion regardless of its siblings; deliveries that
/// succeeded are not undone when another fails. Failures are logged per chat
/// and returned together.
pub async fn dispatch_all(
    provider: &dyn ChatProvider,
    destinations: &[Destination],
    message: &str,
) -> Result<(), DispatchError> {
    let sends = destinations.iter().map(|destination| async move {
        let result = provider.send(destination, message).await;
        (destination, result)
    });
    let results = join_all(sends).await;

    let mut errors = Vec::new();
    for (destination, result) in results {
        match result {
            Ok(()) => {
                counter!("relay_dispatch_total", "provider" => provider.name(), "status" => "sent")
                    .increment(1);
            }
            Err(e) => {
                counter!("relay_dispatch_total", "provider" => provider.name(), "status" => "failed")
                    .increment(1);
                tracing::error!(
                    chat_id = %destination.chat_id,
                    provider = provider.name(),
                    error = %e,
                    "Failed to deliver message"
                );
                errors.push((destination.chat_id.clone(), e));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(DispatchError {
            attempted: destinations.len(),
            failed: errors.len(),
            errors,
        })
    }
}
