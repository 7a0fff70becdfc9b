//! Parallel HTTP fan-out to storage nodes.
//!
//! All node requests of one broadcast are issued concurrently; each carries
//! the configured timeout, so the aggregate wall-clock of a broadcast is
//! bounded by it. Failures stay per-node: a slow or dead node yields an
//! error entry, never a global failure.

use futures::future::join_all;
use serde::Serialize;
use shardvault_types::api::{ApiFailure, ApiResponse, error_codes};

/// Outcome of one node call within a broadcast.
pub struct NodeReply {
    /// The node address the request went to.
    pub address: String,
    /// Decoded payload on success, the failure otherwise.
    pub result: Result<Option<serde_json::Value>, ApiFailure>,
}

/// Fan-out HTTP client.
#[derive(Clone)]
pub struct Broadcaster {
    client: reqwest::Client,
}

impl Broadcaster {
    /// Builds the fan-out client with a per-request timeout.
    pub fn new(timeout: std::time::Duration) -> eyre::Result<Self> {
        Ok(Broadcaster {
            client: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }

    async fn post_one<T: Serialize>(&self, address: &str, endpoint: &str, payload: &T) -> NodeReply {
        let base = if address.starts_with("http://") || address.starts_with("https://") {
            address.to_owned()
        } else {
            format!("http://{address}")
        };
        let url = format!("{}/{}", base.trim_end_matches('/'), endpoint);

        let outcome = self.client.post(&url).json(payload).send().await;
        let result = match outcome {
            Err(err) if err.is_timeout() => Err(ApiFailure {
                code: error_codes::NETWORK_TIMEOUT,
                message: format!("request to {url} timed out"),
            }),
            Err(err) => Err(ApiFailure {
                code: error_codes::SERVER_ERROR,
                message: err.to_string(),
            }),
            Ok(response) if response.status() == reqwest::StatusCode::NOT_FOUND => {
                Err(ApiFailure {
                    code: error_codes::RESOURCE_NOT_FOUND,
                    message: format!("{url} not found"),
                })
            }
            Ok(response) => match response.json::<ApiResponse<serde_json::Value>>().await {
                Ok(envelope) => envelope.into_result(),
                Err(err) => Err(ApiFailure {
                    code: error_codes::INVALID_JSON,
                    message: err.to_string(),
                }),
            },
        };

        NodeReply {
            address: address.to_owned(),
            result,
        }
    }

    /// Posts a distinct payload to each target, concurrently.
    pub async fn post_each<T: Serialize>(
        &self,
        endpoint: &str,
        targets: &[(String, T)],
    ) -> Vec<NodeReply> {
        join_all(
            targets
                .iter()
                .map(|(address, payload)| self.post_one(address, endpoint, payload)),
        )
        .await
    }

    /// Posts the same payload to every address, concurrently.
    pub async fn post_all<T: Serialize>(
        &self,
        endpoint: &str,
        addresses: &[String],
        payload: &T,
    ) -> Vec<NodeReply> {
        join_all(
            addresses
                .iter()
                .map(|address| self.post_one(address, endpoint, payload)),
        )
        .await
    }
}
