//! Bootstrap against the coordinator: parameter fetch and registration.

use eyre::Context as _;
use shardvault_types::api::ApiResponse;
use shardvault_types::api::v1::{ServerRegisterRequest, ServerRegisterResponse, ServerUpdateRequest};
use shardvault_types::params::SystemParameters;

/// Fetches the system parameters from the coordinator.
pub async fn fetch_parameters(
    client: &reqwest::Client,
    coordinator_url: &str,
) -> eyre::Result<SystemParameters> {
    let envelope: ApiResponse<SystemParameters> = client
        .get(format!("{}/system/parameters", coordinator_url.trim_end_matches('/')))
        .send()
        .await
        .context("while requesting system parameters")?
        .json()
        .await
        .context("while decoding system parameters")?;
    envelope
        .into_result()
        .map_err(eyre::Report::from)?
        .ok_or_else(|| eyre::eyre!("coordinator returned empty parameters"))
}

/// Registers a fresh node and returns the assigned id.
pub async fn register(
    client: &reqwest::Client,
    coordinator_url: &str,
    request: &ServerRegisterRequest,
) -> eyre::Result<String> {
    let envelope: ApiResponse<ServerRegisterResponse> = client
        .post(format!("{}/server/register", coordinator_url.trim_end_matches('/')))
        .json(request)
        .send()
        .await
        .context("while registering at the coordinator")?
        .json()
        .await
        .context("while decoding the registration response")?;
    let response = envelope
        .into_result()
        .map_err(eyre::Report::from)?
        .ok_or_else(|| eyre::eyre!("coordinator returned empty registration response"))?;
    Ok(response.server_id)
}

/// Announces an updated address for an already registered node.
pub async fn update_info(
    client: &reqwest::Client,
    coordinator_url: &str,
    request: &ServerUpdateRequest,
) -> eyre::Result<()> {
    let envelope: ApiResponse<serde_json::Value> = client
        .post(format!("{}/server/update_info", coordinator_url.trim_end_matches('/')))
        .json(request)
        .send()
        .await
        .context("while updating node info")?
        .json()
        .await
        .context("while decoding the update response")?;
    envelope.into_result().map_err(eyre::Report::from)?;
    Ok(())
}
