use std::collections::{BTreeMap, HashMap};

use crate::error::{BrError, BrResult};
use crate::host_addr::HostAddr;
use crate::role::ServiceRole;
use crate::service::ServiceInfo;

/// A root directory shared by one or more services on a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostDir {
    pub host: String,
    pub dir: String,
}

/// Snapshot of the cluster's service layout, grouped by host.
///
/// Built once per orchestration run from a `ListClusterInfo` response and
/// treated as immutable afterwards; every phase of backup/restore/cleanup
/// consults the same `Topology` rather than re-querying meta mid-flight.
#[derive(Debug, Clone)]
pub struct Topology {
    hosts: HashMap<String, Vec<ServiceInfo>>,
}

impl Topology {
    /// Builds a topology from a flat list of services, grouping by host and
    /// rejecting a layout with more than one agent on the same host.
    pub fn from_services(services: Vec<ServiceInfo>) -> BrResult<Self> {
        let mut hosts: HashMap<String, Vec<ServiceInfo>> = HashMap::new();
        for svc in services {
            hosts.entry(svc.addr.host.clone()).or_default().push(svc);
        }

        for (host, services) in &hosts {
            let agent_count = services.iter().filter(|s| s.role == ServiceRole::Agent).count();
            if agent_count > 1 {
                return Err(BrError::Topology(format!(
                    "host {host} has {agent_count} agents, expected at most one"
                )));
            }
        }

        Ok(Self { hosts })
    }

    pub fn has_service(&self, addr: &HostAddr) -> bool {
        self.hosts
            .get(&addr.host)
            .map(|services| services.iter().any(|s| s.addr.port == addr.port))
            .unwrap_or(false)
    }

    /// Finds the agent address running on the same host as `addr`.
    pub fn agent_for(&self, addr: &HostAddr) -> BrResult<HostAddr> {
        if !self.has_service(addr) {
            return Err(BrError::Topology(format!("service {addr} not found")));
        }
        self.hosts
            .get(&addr.host)
            .and_then(|services| services.iter().find(|s| s.role == ServiceRole::Agent))
            .map(|s| s.addr.clone())
            .ok_or_else(|| BrError::Topology(format!("no agent found for service {addr}")))
    }

    pub fn host_services(&self, host: &str) -> &[ServiceInfo] {
        self.hosts.get(host).map(|v| v.as_slice()).unwrap_or(&[])
    }

    fn by_role(&self, role: ServiceRole) -> Vec<&ServiceInfo> {
        self.hosts
            .values()
            .flatten()
            .filter(|s| s.role == role)
            .collect()
    }

    pub fn metas(&self) -> Vec<&ServiceInfo> {
        self.by_role(ServiceRole::Meta)
    }

    pub fn storages(&self) -> Vec<&ServiceInfo> {
        self.by_role(ServiceRole::Storage)
    }

    pub fn graphs(&self) -> Vec<&ServiceInfo> {
        self.by_role(ServiceRole::Graph)
    }

    pub fn agents(&self) -> Vec<&ServiceInfo> {
        self.by_role(ServiceRole::Agent)
    }

    pub fn storage_count(&self) -> usize {
        self.storages().len()
    }

    /// Distribution of storage services by number of data dirs: maps
    /// data-dir count to the number of storage services having that count.
    pub fn storage_path_distribution(&self) -> BTreeMap<usize, usize> {
        let mut distribution = BTreeMap::new();
        for s in self.storages() {
            *distribution.entry(s.data_dirs.len()).or_insert(0) += 1;
        }
        distribution
    }

    /// Root dirs in use per host, deduplicated.
    pub fn root_dirs(&self) -> HashMap<String, Vec<HostDir>> {
        let mut result: HashMap<String, Vec<HostDir>> = HashMap::new();
        for (host, services) in &self.hosts {
            let mut seen = std::collections::HashSet::new();
            for s in services {
                if s.root_dir.is_empty() {
                    continue;
                }
                if seen.insert(s.root_dir.clone()) {
                    result.entry(host.clone()).or_default().push(HostDir {
                        host: host.clone(),
                        dir: s.root_dir.clone(),
                    });
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn svc(host: &str, port: u16, role: ServiceRole, dirs: &[&str]) -> ServiceInfo {
        ServiceInfo::new(
            HostAddr::new(host, port),
            role,
            "/usr/local/nebula",
            dirs.iter().map(|d| d.to_string()).collect(),
        )
        .unwrap()
    }

    fn sample() -> Topology {
        Topology::from_services(vec![
            svc("10.0.0.1", 9559, ServiceRole::Meta, &["/data/meta"]),
            svc("10.0.0.1", 8888, ServiceRole::Agent, &[]),
            svc("10.0.0.2", 9779, ServiceRole::Storage, &["/data/storage/0", "/data/storage/1"]),
            svc("10.0.0.2", 8888, ServiceRole::Agent, &[]),
            svc("10.0.0.3", 9669, ServiceRole::Graph, &[]),
        ])
        .unwrap()
    }

    #[test]
    fn rejects_two_agents_on_one_host() {
        let err = Topology::from_services(vec![
            svc("10.0.0.1", 8888, ServiceRole::Agent, &[]),
            svc("10.0.0.1", 8889, ServiceRole::Agent, &[]),
        ]);
        assert!(err.is_err());
    }

    #[test]
    fn finds_agent_colocated_with_a_service() {
        let topo = sample();
        let agent = topo.agent_for(&HostAddr::new("10.0.0.2", 9779)).unwrap();
        assert_eq!(agent, HostAddr::new("10.0.0.2", 8888));
    }

    #[test]
    fn agent_for_unknown_service_is_an_error() {
        let topo = sample();
        assert!(topo.agent_for(&HostAddr::new("10.0.0.9", 1)).is_err());
    }

    #[test]
    fn role_filters_and_counts() {
        let topo = sample();
        assert_eq!(topo.storage_count(), 1);
        assert_eq!(topo.metas().len(), 1);
        assert_eq!(topo.graphs().len(), 1);
        assert_eq!(topo.agents().len(), 2);
        let dist = topo.storage_path_distribution();
        assert_eq!(dist.get(&2), Some(&1));
    }
}
