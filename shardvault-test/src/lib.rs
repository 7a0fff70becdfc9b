//! Harness for spinning up a full shardvault deployment in-process: one
//! coordinator and N storage nodes on ephemeral ports with throwaway
//! storage directories.

use std::net::SocketAddr;
use std::time::Duration;

use eyre::Context as _;
use tempfile::TempDir;
use tokio::task::JoinHandle;

/// A running in-process deployment.
pub struct TestCluster {
    /// Base URL of the coordinator.
    pub coordinator_url: String,
    /// Base URLs of the storage nodes, in start order.
    pub node_urls: Vec<String>,
    node_tasks: Vec<Option<JoinHandle<()>>>,
    _coordinator_task: JoinHandle<()>,
    _dirs: Vec<TempDir>,
}

impl TestCluster {
    /// Starts a coordinator and `n` nodes with threshold `t` on the
    /// secp192r1 curve.
    pub async fn start(n: u32, t: u32) -> eyre::Result<TestCluster> {
        let mut dirs = Vec::new();

        let coordinator_dir = TempDir::new()?;
        let coordinator_listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("while binding the coordinator listener")?;
        let coordinator_addr = coordinator_listener.local_addr()?;
        let coordinator_url = format!("http://{coordinator_addr}");

        let config = shardvault_coordinator::config::CoordinatorConfig {
            bind_addr: coordinator_addr,
            storage_dir: coordinator_dir.path().to_path_buf(),
            curve: "secp192r1".into(),
            node_count: n,
            threshold: t,
            request_timeout: Duration::from_secs(5),
            ssl_cert_path: None,
            ssl_key_path: None,
        };
        dirs.push(coordinator_dir);

        let service = shardvault_coordinator::init(config)
            .await
            .context("while initializing the coordinator")?;
        let coordinator_task = tokio::spawn(async move {
            axum::serve(
                coordinator_listener,
                service
                    .router
                    .into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("coordinator serves until the cluster is dropped");
        });

        let mut node_urls = Vec::new();
        let mut node_tasks = Vec::new();
        for _ in 0..n {
            let node_dir = TempDir::new()?;
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                .await
                .context("while binding a node listener")?;
            let addr = listener.local_addr()?;
            let url = format!("http://{addr}");

            let config = shardvault_node::config::NodeConfig {
                bind_addr: addr,
                public_address: Some(url.clone()),
                coordinator_url: coordinator_url.clone(),
                storage_dir: node_dir.path().to_path_buf(),
                request_timeout: Duration::from_secs(5),
                share_ttl: Duration::from_secs(30 * 24 * 60 * 60),
                ssl_cert_path: None,
                ssl_key_path: None,
            };
            dirs.push(node_dir);

            let service = shardvault_node::init(config)
                .await
                .context("while initializing a node")?;
            node_tasks.push(Some(tokio::spawn(async move {
                axum::serve(listener, service.router)
                    .await
                    .expect("node serves until the cluster is dropped");
            })));
            node_urls.push(url);
        }

        Ok(TestCluster {
            coordinator_url,
            node_urls,
            node_tasks,
            _coordinator_task: coordinator_task,
            _dirs: dirs,
        })
    }

    /// Kills node `index`, releasing its port. The node stays registered at
    /// the coordinator, so broadcasts to it fail like a crashed node's.
    pub fn kill_node(&mut self, index: usize) {
        if let Some(task) = self.node_tasks[index].take() {
            task.abort();
        }
    }
}

impl Drop for TestCluster {
    fn drop(&mut self) {
        self._coordinator_task.abort();
        for task in self.node_tasks.iter_mut().flatten() {
            task.abort();
        }
    }
}
