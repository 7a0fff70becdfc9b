#![deny(missing_docs)]
//! Storage node of the shardvault threshold file-storage system.
//!
//! A node holds one signcrypted key share per uploaded file. It never sees a
//! plaintext share: intake stores the coordinator's ECC ciphertext after
//! verifying the SM2 signature, and downloads run the double-encryption
//! transform — add a layer under the downloader's public key, strip the
//! node's own layer — so the returned ciphertext is decryptable only by the
//! downloader.
//!
//! [`init`] bootstraps the node: it fetches the system parameters from the
//! coordinator, loads or generates the long-term keypair, registers (or
//! re-announces its address), opens the share store and returns the `axum`
//! router for the hosting binary to serve.

use std::sync::Arc;
use std::time::Duration;

use eyre::Context as _;
use num_bigint::BigUint;
use shardvault_core::curve::{Group, Point};
use shardvault_core::ecies::Ecies;
use shardvault_core::sm2::Sm2;
use shardvault_types::api::v1::{ServerRegisterRequest, ServerUpdateRequest};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod metrics;

pub(crate) mod api;
pub(crate) mod services;

use config::NodeConfig;
use services::enrol;
use services::keystore::{Keystore, NodeInfo};
use services::share_store::ShareStore;

/// Shared state of all node handlers.
#[derive(Clone)]
pub(crate) struct NodeContext {
    pub(crate) group: Group,
    pub(crate) ecies: Ecies,
    pub(crate) sm2: Sm2,
    pub(crate) coordinator_public_key: Point,
    pub(crate) coordinator_za: Arc<Vec<u8>>,
    pub(crate) node_id: String,
    pub(crate) private_key: Arc<BigUint>,
    pub(crate) store: ShareStore,
    pub(crate) share_ttl_ms: i64,
}

/// A bootstrapped node, ready to serve.
pub struct NodeService {
    /// The router the hosting binary mounts.
    pub router: axum::Router,
    /// The id the coordinator assigned to this node.
    pub node_id: String,
}

/// Initializes the storage node.
///
/// 1. Fetches the system parameters from the coordinator.
/// 2. Loads the keypair and `info.json` from the storage directory, or
///    generates a keypair and registers as a fresh node.
/// 3. On re-start, re-announces the (possibly changed) address.
/// 4. Opens the node-local share collection.
pub async fn init(config: NodeConfig) -> eyre::Result<NodeService> {
    let http = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()
        .context("while building the http client")?;

    tracing::info!("fetching system parameters from {}", config.coordinator_url);
    let params = enrol::fetch_parameters(&http, &config.coordinator_url).await?;
    let coordinator_public_key = params
        .sm2_public_key
        .clone()
        .ok_or_else(|| eyre::eyre!("coordinator parameters carry no SM2 public key"))?;
    let group = params.group();

    let keystore = Keystore::open(config.storage_dir.clone())?;
    let (node_id, private_key) = enrol_node(&http, &config, &group, &keystore).await?;
    tracing::info!("we are node {node_id}");

    let db = sled::open(config.storage_dir.join("db")).context("while opening the share db")?;
    let store = ShareStore::open(&db, &node_id)?;

    let sm2 = Sm2::new(group.clone(), params.id.clone());
    let coordinator_za = Arc::new(sm2.compute_za(&coordinator_public_key));

    let ctx = NodeContext {
        ecies: Ecies::new(group.clone()),
        group,
        sm2,
        coordinator_public_key,
        coordinator_za,
        node_id: node_id.clone(),
        private_key: Arc::new(private_key),
        store,
        share_ttl_ms: duration_to_ms(config.share_ttl),
    };

    let router = api::shares::routes(ctx)
        .merge(api::info::routes())
        .layer(TraceLayer::new_for_http());

    Ok(NodeService { router, node_id })
}

fn duration_to_ms(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

/// Loads registration state or performs a fresh registration.
async fn enrol_node(
    http: &reqwest::Client,
    config: &NodeConfig,
    group: &Group,
    keystore: &Keystore,
) -> eyre::Result<(String, BigUint)> {
    let address = config.advertised_address();
    let existing = keystore.load_keypair(&group.curve, |d| group.mul_generator(d))?;
    let info = keystore.load_info()?;

    if let (Some((private_key, _)), Some(mut info)) = (existing, info) {
        if info.address != address {
            tracing::info!("address changed, announcing {address}");
            enrol::update_info(
                http,
                &config.coordinator_url,
                &ServerUpdateRequest {
                    sid: info.server_id.clone(),
                    address: address.clone(),
                },
            )
            .await?;
            info.address = address;
            keystore.save_info(&info)?;
        }
        return Ok((info.server_id, private_key));
    }

    tracing::info!("no local state, registering as a new node");
    let mut rng = rand::thread_rng();
    let (private_key, public_key) = group.generate_keypair(&mut rng);
    let server_id = enrol::register(
        http,
        &config.coordinator_url,
        &ServerRegisterRequest {
            address: address.clone(),
            public_key: public_key.clone(),
        },
    )
    .await?;

    keystore.save_keypair(&private_key, &public_key, &group.curve)?;
    keystore.save_info(&NodeInfo {
        server_id: server_id.clone(),
        address,
    })?;
    Ok((server_id, private_key))
}
