use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use br_core::{HostAddr, Topology};

use crate::client::AgentClient;
use crate::error::{AgentClientError, AgentClientResult};

/// Caches one [`AgentClient`] per host, reusing the same connection for
/// every service co-located on that host.
///
/// Grounded in the original tool's `AgentManager`: a host legitimately
/// running two distinct agents is a misconfiguration, not something to
/// silently pick one of, so `get` hard-errors on the mismatch instead of
/// replacing the cached client.
pub struct AgentPool {
    agents: RwLock<HashMap<String, Arc<AgentClient>>>,
}

impl AgentPool {
    pub fn new() -> Self {
        Self { agents: RwLock::new(HashMap::new()) }
    }

    /// Resolves the agent colocated with `service_addr` via `topology`,
    /// then hands back a pooled client for it.
    pub async fn for_service(
        &self,
        topology: &Topology,
        service_addr: &HostAddr,
    ) -> AgentClientResult<Arc<AgentClient>> {
        let agent_addr = topology
            .agent_for(service_addr)
            .map_err(|_| AgentClientError::NoAgentForService(service_addr.clone()))?;
        self.get(agent_addr).await
    }

    pub async fn get(&self, agent_addr: HostAddr) -> AgentClientResult<Arc<AgentClient>> {
        {
            let agents = self.agents.read().await;
            if let Some(existing) = agents.get(&agent_addr.host) {
                if *existing.addr() != agent_addr {
                    return Err(AgentClientError::ConflictingAgent {
                        host: agent_addr.host.clone(),
                        existing: existing.addr().clone(),
                        requested: agent_addr,
                    });
                }
                return Ok(existing.clone());
            }
        }

        let client = Arc::new(AgentClient::connect(agent_addr.clone()).await?);
        let mut agents = self.agents.write().await;
        if let Some(existing) = agents.get(&agent_addr.host) {
            if *existing.addr() != agent_addr {
                return Err(AgentClientError::ConflictingAgent {
                    host: agent_addr.host.clone(),
                    existing: existing.addr().clone(),
                    requested: agent_addr,
                });
            }
            return Ok(existing.clone());
        }
        agents.insert(agent_addr.host.clone(), client.clone());
        Ok(client)
    }
}

impl Default for AgentPool {
    fn default() -> Self {
        Self::new()
    }
}
