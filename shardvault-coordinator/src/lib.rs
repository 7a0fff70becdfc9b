#![deny(missing_docs)]
//! Coordinator of the shardvault threshold file-storage system.
//!
//! The coordinator owns the immutable system parameters, the node and user
//! registries and the file records. At upload it splits the file key into a
//! masked secret-sharing polynomial, commits to the coefficients, signcrypts
//! one share per storage node and fans them out. At download it selects `t`
//! random active nodes, relays the downloader's public key and forwards the
//! re-encrypted shares untouched — it never sees a plaintext share.
//!
//! [`init`] loads or creates the parameter document and SM2 keypair, opens
//! the database and returns the `axum` router for the hosting binary.

use std::sync::Arc;

use eyre::Context as _;
use num_bigint::BigUint;
use shardvault_core::curve::Group;
use shardvault_core::sm2::Sm2;
use shardvault_types::params::{CurveParameters, SystemParameters};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

pub mod config;
pub mod metrics;

pub(crate) mod api;
pub(crate) mod services;

use config::CoordinatorConfig;
use services::broadcast::Broadcaster;
use services::database::Collection;
use services::dealer::ShareDealer;
use services::files::FileStore;
use services::keystore::Keystore;
use services::rate_limit::RateLimiter;
use services::registry::NodeRegistry;
use services::users::UserStore;

/// Key of the single parameter document in the `system_params` collection.
const PARAMS_DOC: &str = "params";

/// Shared state of all coordinator handlers.
#[derive(Clone)]
pub(crate) struct CoordinatorContext {
    pub(crate) params: Arc<SystemParameters>,
    pub(crate) group: Group,
    pub(crate) registry: NodeRegistry,
    pub(crate) users: UserStore,
    pub(crate) files: FileStore,
    pub(crate) dealer: ShareDealer,
    pub(crate) broadcaster: Broadcaster,
    pub(crate) rate_limiter: RateLimiter,
}

/// A bootstrapped coordinator, ready to serve.
pub struct CoordinatorService {
    /// The router the hosting binary mounts.
    pub router: axum::Router,
    /// The coordinator instance id.
    pub coordinator_id: String,
}

/// Generates a fresh entity id: 32 uppercase hex chars, interpretable as an
/// integer evaluation point for share arithmetic.
pub(crate) fn new_entity_id() -> String {
    Uuid::new_v4().simple().to_string().to_uppercase()
}

/// Initializes the coordinator.
///
/// Parameters are created once: an existing document in `system_params`
/// wins over the configured curve/`n`/`t`. The SM2 keypair is loaded from
/// the storage directory or generated and persisted together with the
/// public key inside the parameter document.
pub async fn init(config: CoordinatorConfig) -> eyre::Result<CoordinatorService> {
    std::fs::create_dir_all(&config.storage_dir).context("while creating the storage dir")?;
    let db = sled::open(config.storage_dir.join("db")).context("while opening the db")?;

    let params_collection = Collection::open(&db, "system_params")?;
    let mut params = match params_collection.get::<SystemParameters>(PARAMS_DOC)? {
        Some(existing) => {
            tracing::info!("loaded existing system parameters (id {})", existing.id);
            existing
        }
        None => {
            let fresh = fresh_parameters(&config)?;
            tracing::info!("created system parameters (id {})", fresh.id);
            fresh
        }
    };
    let group = params.group();

    let keystore = Keystore::open(config.storage_dir.clone())?;
    let keypair = keystore.load_keypair(&group.curve, |d| group.mul_generator(d))?;
    let (signing_key, public_key) = match keypair {
        Some(pair) => pair,
        None => {
            if params.sm2_public_key.is_some() {
                eyre::bail!("parameters carry an SM2 public key but private.pem is missing");
            }
            let mut rng = rand::thread_rng();
            let pair = group.generate_keypair(&mut rng);
            keystore.save_keypair(&pair.0, &pair.1, &group.curve)?;
            pair
        }
    };
    if params.sm2_public_key.is_none() {
        params.sm2_public_key = Some(public_key.clone());
    }
    params_collection.put(PARAMS_DOC, &params)?;

    let sm2 = Sm2::new(group.clone(), params.id.clone());
    let signer_za = Arc::new(sm2.compute_za(&public_key));
    let dealer = ShareDealer::new(
        group.clone(),
        params.t,
        sm2,
        Arc::new(signing_key),
        signer_za,
    );

    let ctx = CoordinatorContext {
        registry: NodeRegistry::new(Collection::open(&db, "servers")?),
        users: UserStore::new(Collection::open(&db, "users")?),
        files: FileStore::new(
            Collection::open(&db, "files")?,
            config.storage_dir.join("blobs"),
        )?,
        dealer,
        broadcaster: Broadcaster::new(config.request_timeout)?,
        rate_limiter: RateLimiter::default(),
        group,
        params: Arc::new(params.clone()),
    };

    let router = api::system::routes(ctx.clone())
        .merge(api::servers::routes(ctx.clone()))
        .merge(api::users::routes(ctx.clone()))
        .merge(api::files::routes(ctx))
        .layer(TraceLayer::new_for_http());

    Ok(CoordinatorService {
        router,
        coordinator_id: params.id,
    })
}

/// Builds a fresh parameter document from the configured curve and sizes.
fn fresh_parameters(config: &CoordinatorConfig) -> eyre::Result<SystemParameters> {
    if config.threshold < 2 || config.threshold > config.node_count {
        eyre::bail!(
            "threshold must satisfy 2 <= t <= n, got t={} n={}",
            config.threshold,
            config.node_count
        );
    }
    let curve: CurveParameters = CurveParameters::named(&config.curve)
        .ok_or_else(|| eyre::eyre!("unknown curve {:?}", config.curve))?;

    Ok(SystemParameters {
        id: new_entity_id(),
        curve: config.curve.clone(),
        n: config.node_count,
        t: config.threshold,
        p: curve.p,
        a: curve.a,
        b: curve.b,
        gx: curve.gx,
        gy: curve.gy,
        order: curve.order,
        hash: "sha256".into(),
        sm2_public_key: None,
    })
}
