use tracing::{info, warn};

use br_agent_client::AgentPool;
use br_core::{ServiceInfo, Topology};
use br_meta_client::MetaClient;
use br_store::{open_store, ExternalStore};

use crate::config::CleanupConfig;
use crate::error::OrchestratorResult;
use crate::paths::join_uri;

fn to_service_info(wire: &br_meta_client::wire::ServiceInfoWire) -> OrchestratorResult<ServiceInfo> {
    let (root_dir, data_dirs) = match &wire.dir {
        Some(dir) => (dir.root.clone(), dir.data.clone()),
        None => (String::new(), Vec::new()),
    };
    Ok(ServiceInfo::new(wire.addr.clone(), wire.role, root_dir, data_dirs)?)
}

/// Removes a named backup from both the cluster and the external store.
///
/// Implements §4.9: drop the server-side snapshot best-effort, remove the
/// store's copy, and for `local://` stores additionally ask each host's
/// agent to remove its own copy (a local store's "backup" lives spread
/// across the cluster's disks, not in one place the orchestrator can see).
pub struct CleanupOrchestrator {
    meta: MetaClient,
    agents: AgentPool,
    store: Box<dyn ExternalStore>,
    store_uri: String,
    backup_name: String,
}

impl CleanupOrchestrator {
    pub async fn connect(config: &CleanupConfig) -> OrchestratorResult<Self> {
        let meta = MetaClient::connect(config.common.meta_addr.clone()).await?;
        let store = open_store(&config.common.store_uri, &config.common.s3_flags).await?;
        Ok(Self {
            meta,
            agents: AgentPool::new(),
            store,
            store_uri: config.common.store_uri.clone(),
            backup_name: config.backup_name.clone(),
        })
    }

    pub async fn run(&self) -> OrchestratorResult<()> {
        if let Err(err) = self.meta.drop_backup(self.backup_name.clone()).await {
            warn!(backup = %self.backup_name, error = %err, "drop_backup failed, continuing with cleanup");
        } else {
            info!(backup = %self.backup_name, "dropped server-side snapshot");
        }

        let root_uri = join_uri(&[self.store_uri.as_str(), self.backup_name.as_str()]);
        self.store.remove_dir(&root_uri).await?;
        info!(uri = %root_uri, "removed backup from external store");

        if self.store.scheme() == "local" {
            self.remove_local_copies(&root_uri).await?;
        }
        Ok(())
    }

    async fn remove_local_copies(&self, root_uri: &str) -> OrchestratorResult<()> {
        let list = self.meta.list_cluster().await?;
        let mut services = Vec::new();
        for host_services in list.host_services.values() {
            for svc in host_services {
                services.push(to_service_info(svc)?);
            }
        }
        let topology = Topology::from_services(services)?;

        for agent_info in topology.agents() {
            let agent = self.agents.get(agent_info.addr.clone()).await?;
            agent.remove_dir(root_uri.to_string()).await?;
            info!(host = %agent_info.addr, "removed local backup copy");
        }
        Ok(())
    }
}
