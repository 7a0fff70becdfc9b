//! Configuration for a storage node, parsed from command-line arguments or
//! environment variables via `clap`.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// Storage node configuration.
#[derive(Parser, Debug, Clone)]
pub struct NodeConfig {
    /// The socket address the HTTP server binds to.
    #[clap(long, env = "SHARDVAULT_NODE_BIND_ADDR", default_value = "0.0.0.0:9101")]
    pub bind_addr: SocketAddr,

    /// The base URL this node is reachable at by the coordinator.
    ///
    /// Defaults to `http://{bind_addr}`.
    #[clap(long, env = "SHARDVAULT_NODE_PUBLIC_ADDRESS")]
    pub public_address: Option<String>,

    /// Base URL of the coordinator.
    #[clap(
        long,
        env = "SHARDVAULT_NODE_COORDINATOR_URL",
        default_value = "http://127.0.0.1:9000"
    )]
    pub coordinator_url: String,

    /// Directory holding the key material, `info.json` and the share store.
    #[clap(
        long,
        env = "SHARDVAULT_NODE_STORAGE_DIR",
        default_value = "./shardvault-node-data"
    )]
    pub storage_dir: PathBuf,

    /// Timeout for outbound HTTP calls to the coordinator.
    #[clap(
        long,
        env = "SHARDVAULT_NODE_REQUEST_TIMEOUT",
        default_value = "30s",
        value_parser = humantime::parse_duration
    )]
    pub request_timeout: Duration,

    /// How long stored shares stay valid before they may be expired.
    #[clap(
        long,
        env = "SHARDVAULT_NODE_SHARE_TTL",
        default_value = "30days",
        value_parser = humantime::parse_duration
    )]
    pub share_ttl: Duration,

    /// TLS certificate path, kept next to the key material for operators
    /// terminating TLS in front of the daemon. The server itself speaks
    /// plain HTTP.
    #[clap(long, env = "SHARDVAULT_NODE_SSL_CERT")]
    pub ssl_cert_path: Option<PathBuf>,

    /// TLS private-key path, see `ssl_cert_path`.
    #[clap(long, env = "SHARDVAULT_NODE_SSL_KEY")]
    pub ssl_key_path: Option<PathBuf>,
}

impl NodeConfig {
    /// The address this node registers at the coordinator.
    pub fn advertised_address(&self) -> String {
        self.public_address
            .clone()
            .unwrap_or_else(|| format!("http://{}", self.bind_addr))
    }
}
