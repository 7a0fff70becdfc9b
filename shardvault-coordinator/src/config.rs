//! Configuration for the coordinator, parsed from command-line arguments or
//! environment variables via `clap`.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// Coordinator configuration.
///
/// The curve, node count and threshold only matter on the very first start:
/// once a parameter document exists in the database it wins, matching the
/// immutable-after-init lifecycle of the system parameters.
#[derive(Parser, Debug, Clone)]
pub struct CoordinatorConfig {
    /// The socket address the HTTP server binds to.
    #[clap(
        long,
        env = "SHARDVAULT_COORDINATOR_BIND_ADDR",
        default_value = "0.0.0.0:9000"
    )]
    pub bind_addr: SocketAddr,

    /// Directory holding key material, the database and offloaded blobs.
    #[clap(
        long,
        env = "SHARDVAULT_COORDINATOR_STORAGE_DIR",
        default_value = "./shardvault-coordinator-data"
    )]
    pub storage_dir: PathBuf,

    /// Named curve used when creating fresh system parameters.
    #[clap(
        long,
        env = "SHARDVAULT_COORDINATOR_CURVE",
        default_value = "secp192r1"
    )]
    pub curve: String,

    /// Targeted number of storage nodes.
    #[clap(long, env = "SHARDVAULT_COORDINATOR_NODE_COUNT", default_value = "5")]
    pub node_count: u32,

    /// Reconstruction threshold `t` (`2 ≤ t ≤ n`).
    #[clap(long, env = "SHARDVAULT_COORDINATOR_THRESHOLD", default_value = "3")]
    pub threshold: u32,

    /// Timeout for outbound HTTP calls to storage nodes.
    #[clap(
        long,
        env = "SHARDVAULT_COORDINATOR_REQUEST_TIMEOUT",
        default_value = "30s",
        value_parser = humantime::parse_duration
    )]
    pub request_timeout: Duration,

    /// TLS certificate path, for operators terminating TLS in front of the
    /// daemon. The server itself speaks plain HTTP.
    #[clap(long, env = "SHARDVAULT_COORDINATOR_SSL_CERT")]
    pub ssl_cert_path: Option<PathBuf>,

    /// TLS private-key path, see `ssl_cert_path`.
    #[clap(long, env = "SHARDVAULT_COORDINATOR_SSL_KEY")]
    pub ssl_key_path: Option<PathBuf>,
}
