use std::time::Duration;

use tracing::{info, warn};

use br_agent_client::{AgentPool, ServiceKind};
use br_core::{HostAddr, ServiceInfo, ServiceRole, SideCopySuffix, Topology};
use br_manifest::Manifest;
use br_meta_client::wire::HostPair;
use br_meta_client::MetaClient;
use br_store::{open_store, ExternalStore};

use crate::config::RestoreConfig;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::paths::join_uri;
use crate::task_group::TaskGroup;

const META_ELECTION_SETTLE: Duration = Duration::from_secs(3);

pub(crate) fn to_kind(role: ServiceRole) -> OrchestratorResult<ServiceKind> {
    match role {
        ServiceRole::Meta => Ok(ServiceKind::Metad),
        ServiceRole::Storage => Ok(ServiceKind::Storaged),
        ServiceRole::Graph => Ok(ServiceKind::Graphd),
        ServiceRole::Agent => {
            Err(br_core::BrError::Topology("agent has no service kind".into()).into())
        }
    }
}

fn to_service_info(wire: &br_meta_client::wire::ServiceInfoWire) -> OrchestratorResult<ServiceInfo> {
    let (root_dir, data_dirs) = match &wire.dir {
        Some(dir) => (dir.root.clone(), dir.data.clone()),
        None => (String::new(), Vec::new()),
    };
    Ok(ServiceInfo::new(wire.addr.clone(), wire.role, root_dir, data_dirs)?)
}

/// Installs a previously taken backup onto the currently running cluster,
/// including the host-to-host address remap when the storage topology has
/// moved. Implements the 12-step pipeline of the Restore Orchestrator.
pub struct RestoreOrchestrator {
    meta: MetaClient,
    agents: AgentPool,
    store: Box<dyn ExternalStore>,
    store_uri: String,
    backup_name: String,
    suffix: SideCopySuffix,
}

impl RestoreOrchestrator {
    pub async fn connect(config: &RestoreConfig) -> OrchestratorResult<Self> {
        let meta = MetaClient::connect(config.common.meta_addr.clone()).await?;
        let store = open_store(&config.common.store_uri, &config.common.s3_flags).await?;
        Ok(Self {
            meta,
            agents: AgentPool::new(),
            store,
            store_uri: config.common.store_uri.clone(),
            backup_name: config.backup_name.clone(),
            suffix: SideCopySuffix::generate(),
        })
    }

    fn topology_from(&self, resp: &br_meta_client::wire::ListClusterInfoResp) -> OrchestratorResult<Topology> {
        let mut services = Vec::new();
        for host_services in resp.host_services.values() {
            for svc in host_services {
                services.push(to_service_info(svc)?);
            }
        }
        Ok(Topology::from_services(services)?)
    }

    /// Parameters `fix.rs` needs if a restore attempt fails mid-flight:
    /// the topology, agent pool and the suffix picked for this attempt.
    /// Collapses the source's Fix-from-Restore coupling into a value
    /// handed forward rather than a back-reference.
    pub fn fix_context(&self, topology: Topology) -> crate::fix::FixContext<'_> {
        crate::fix::FixContext { topology, agents: &self.agents, suffix: self.suffix.clone() }
    }

    pub async fn run(&self) -> OrchestratorResult<Topology> {
        let root_uri = join_uri(&[self.store_uri.as_str(), self.backup_name.as_str()]);
        if !self.store.exist_dir(&root_uri).await? {
            return Err(OrchestratorError::BackupNotFound(self.backup_name.clone()));
        }
        info!(backup = %self.backup_name, "located backup directory");

        let manifest = self.fetch_manifest(&root_uri).await?;

        let list = self.meta.list_cluster().await?;
        let topology = self.topology_from(&list)?;

        match self.run_with_topology(&topology, &manifest, &root_uri).await {
            Ok(()) => Ok(topology),
            Err(err) => {
                warn!(error = %err, "restore failed mid-flight, attempting compensating fix");
                let fix = crate::fix::Fix::new(self.fix_context(topology.clone()));
                if let Err(fix_err) = fix.run().await {
                    warn!(error = %fix_err, "compensating fix also failed");
                }
                Err(err)
            }
        }
    }

    async fn run_with_topology(
        &self,
        topology: &Topology,
        manifest: &Manifest,
        root_uri: &str,
    ) -> OrchestratorResult<()> {
        Self::check_topology(topology, manifest)?;
        if !manifest.all_spaces {
            self.check_and_drop_spaces(manifest).await?;
        }

        self.stop_cluster(topology).await?;
        info!("cluster stopped");

        self.side_copy_original(topology, manifest.all_spaces).await?;

        let remap = Self::address_remap(topology, manifest);
        self.download_meta(topology, root_uri).await?;
        self.download_storage(topology, manifest, root_uri).await?;

        self.start_meta(topology).await?;
        tokio::time::sleep(META_ELECTION_SETTLE).await;

        self.restore_meta(topology, manifest, &remap).await?;

        self.start_storage(topology).await?;
        self.start_graph(topology).await?;
        info!("storage and graph services started");

        self.cleanup_side_copies(topology).await?;
        info!(backup = %self.backup_name, "restore completed");
        Ok(())
    }

    async fn fetch_manifest(&self, root_uri: &str) -> OrchestratorResult<Manifest> {
        let manifest_name = format!("{}.meta", self.backup_name);
        let manifest_uri = join_uri(&[root_uri, manifest_name.as_str()]);
        let tmp_dir = std::env::temp_dir().join("nebula-br-restore");
        tokio::fs::create_dir_all(&tmp_dir).await?;
        let tmp_path = tmp_dir.join(&manifest_name);

        self.store.download(&tmp_path, &manifest_uri, true).await?;
        let bytes = tokio::fs::read(&tmp_path).await?;
        let manifest = br_manifest::parse(&bytes)?;

        if let Err(err) = tokio::fs::remove_dir_all(&tmp_dir).await {
            warn!(dir = %tmp_dir.display(), error = %err, "failed to remove restore temp dir");
        }
        Ok(manifest)
    }

    fn check_topology(topology: &Topology, manifest: &Manifest) -> OrchestratorResult<()> {
        let mut backup_hosts = std::collections::HashSet::new();
        let mut backup_distribution: std::collections::BTreeMap<usize, usize> = std::collections::BTreeMap::new();
        for space in &manifest.space_backups {
            for hb in &space.host_backups {
                if backup_hosts.insert(hb.host.clone()) {
                    *backup_distribution.entry(hb.checkpoints.len()).or_insert(0) += 1;
                }
            }
        }

        let cluster_distribution = topology.storage_path_distribution();
        if topology.storage_count() != backup_hosts.len() || cluster_distribution != backup_distribution {
            return Err(OrchestratorError::TopologyMismatch {
                cluster_storage_count: topology.storage_count(),
                backup_storage_count: backup_hosts.len(),
                cluster_distribution,
                backup_distribution,
            });
        }
        Ok(())
    }

    async fn check_and_drop_spaces(&self, manifest: &Manifest) -> OrchestratorResult<()> {
        for space in &manifest.space_backups {
            let resp = self.meta.get_space(space.space_name.clone()).await?;
            match resp.space_id {
                Some(id) if id != space.space_id => {
                    return Err(OrchestratorError::SpaceMismatch {
                        name: space.space_name.clone(),
                        cluster_id: id,
                        backup_id: space.space_id,
                    });
                }
                _ => {}
            }
        }
        for space in &manifest.space_backups {
            self.meta.drop_space(space.space_name.clone(), true).await?;
        }
        Ok(())
    }

    async fn stop_cluster(&self, topology: &Topology) -> OrchestratorResult<()> {
        let root_dirs = topology.root_dirs();
        for agent_info in topology.agents() {
            let agent = self.agents.get(agent_info.addr.clone()).await?;
            let Some(dirs) = root_dirs.get(&agent_info.addr.host) else {
                continue;
            };
            for hostdir in dirs {
                for role in [ServiceRole::Meta, ServiceRole::Storage, ServiceRole::Graph] {
                    agent
                        .stop_service(to_kind(role)?, hostdir.dir.clone())
                        .await
                        .map_err(|e| OrchestratorError::from(e).host_context("stop_cluster", &agent_info.addr))?;
                }
            }
        }
        Ok(())
    }

    /// Renames `D/nebula` to `D/nebula<suffix>` for every storage data dir,
    /// and (for a full restore) the single meta data dir too.
    async fn side_copy_original(&self, topology: &Topology, all_spaces: bool) -> OrchestratorResult<()> {
        for s in topology.storages() {
            let agent = self.agents.for_service(topology, &s.addr).await?;
            for d in &s.data_dirs {
                let original = join_uri(&[d.as_str(), "nebula"]);
                let side = self.suffix.apply_to(&original);
                agent.move_dir(original, side).await?;
            }
        }

        if all_spaces {
            for m in topology.metas() {
                let agent = self.agents.for_service(topology, &m.addr).await?;
                let data_dir = m
                    .data_dirs
                    .first()
                    .ok_or_else(|| br_core::BrError::Topology(format!("meta {} has no data dir", m.addr)))?;
                let original = join_uri(&[data_dir.as_str(), "nebula"]);
                let side = self.suffix.apply_to(&original);
                agent.move_dir(original, side).await?;
            }
        }
        Ok(())
    }

    /// Pairs sorted backup storage hosts with sorted current storage hosts
    /// positionally, keeping only pairs whose endpoints actually differ.
    fn address_remap(topology: &Topology, manifest: &Manifest) -> Vec<HostPair> {
        let mut current: Vec<HostAddr> = topology.storages().iter().map(|s| s.addr.clone()).collect();
        current.sort();

        let mut prev: Vec<HostAddr> = manifest.storage_hosts.clone();
        prev.sort();

        prev.into_iter()
            .zip(current.into_iter())
            .filter(|(from, to)| from != to)
            .map(|(from_host, to_host)| HostPair { from_host, to_host })
            .collect()
    }

    async fn download_meta(&self, topology: &Topology, root_uri: &str) -> OrchestratorResult<()> {
        let meta_uri = join_uri(&[root_uri, "meta"]);
        let backend = self.store.get_dir(&meta_uri);

        for s in topology.metas() {
            let agent = self.agents.for_service(topology, &s.addr).await?;
            let local_dir = s
                .data_dirs
                .first()
                .ok_or_else(|| br_core::BrError::Topology(format!("meta {} has no data dir", s.addr)))?;
            agent
                .download_file(backend.uri.clone(), local_dir.clone(), self.store_uri.clone(), true)
                .await?;
        }
        Ok(())
    }

    /// Downloads storage checkpoints from the backup's sorted host list
    /// into the current cluster's sorted host list, positionally paired
    /// (the same pairing `address_remap` uses).
    async fn download_storage(
        &self,
        topology: &Topology,
        manifest: &Manifest,
        root_uri: &str,
    ) -> OrchestratorResult<()> {
        let mut current: Vec<ServiceInfo> = topology.storages().into_iter().cloned().collect();
        current.sort_by(|a, b| a.addr.cmp(&b.addr));

        let mut prev: Vec<HostAddr> = manifest.storage_hosts.clone();
        prev.sort();

        let data_uri = join_uri(&[root_uri, "data"]);

        let mut group: TaskGroup<()> = TaskGroup::new();
        for (idx, current_svc) in current.iter().enumerate() {
            let prev_host = prev
                .get(idx)
                .ok_or_else(|| br_core::BrError::Topology("fewer backup storage hosts than current".into()))?
                .clone();
            let agent = self.agents.for_service(topology, &current_svc.addr).await?;
            let prev_tag = prev_host.to_string();

            for (i, data_dir) in current_svc.data_dirs.iter().enumerate() {
                let remote = join_uri(&[data_uri.as_str(), prev_tag.as_str(), format!("data{i}").as_str()]);
                let backend = self.store.get_dir(&remote);
                let local_dir = join_uri(&[data_dir.as_str(), "nebula"]);
                let agent = agent.clone();
                let store_uri = self.store_uri.clone();
                group.spawn(async move {
                    agent
                        .download_file(backend.uri, local_dir, store_uri, true)
                        .await
                        .map_err(OrchestratorError::from)
                });
            }
        }
        group.join_all().await?;
        Ok(())
    }

    async fn start_meta(&self, topology: &Topology) -> OrchestratorResult<()> {
        for m in topology.metas() {
            let agent = self.agents.for_service(topology, &m.addr).await?;
            agent.start_service(ServiceKind::Metad, m.root_dir.clone()).await?;
        }
        Ok(())
    }

    async fn restore_meta(
        &self,
        topology: &Topology,
        manifest: &Manifest,
        remap: &[HostPair],
    ) -> OrchestratorResult<()> {
        for m in topology.metas() {
            let data_dir = m
                .data_dirs
                .first()
                .ok_or_else(|| br_core::BrError::Topology(format!("meta {} has no data dir", m.addr)))?;
            let files: Vec<String> = manifest
                .meta_files
                .iter()
                .map(|f| join_uri(&[data_dir.as_str(), f.as_str()]))
                .collect();
            self.meta.restore_meta(m.addr.clone(), remap.to_vec(), files).await?;
        }
        Ok(())
    }

    async fn start_storage(&self, topology: &Topology) -> OrchestratorResult<()> {
        for s in topology.storages() {
            let agent = self.agents.for_service(topology, &s.addr).await?;
            agent.start_service(ServiceKind::Storaged, s.root_dir.clone()).await?;
        }
        Ok(())
    }

    async fn start_graph(&self, topology: &Topology) -> OrchestratorResult<()> {
        for g in topology.graphs() {
            let agent = self.agents.for_service(topology, &g.addr).await?;
            agent.start_service(ServiceKind::Graphd, g.root_dir.clone()).await?;
        }
        Ok(())
    }

    async fn cleanup_side_copies(&self, topology: &Topology) -> OrchestratorResult<()> {
        for m in topology.metas() {
            let agent = self.agents.for_service(topology, &m.addr).await?;
            if let Some(d) = m.data_dirs.first() {
                let side = self.suffix.apply_to(&join_uri(&[d.as_str(), "nebula"]));
                agent.remove_dir(side).await?;
            }
        }
        for s in topology.storages() {
            let agent = self.agents.for_service(topology, &s.addr).await?;
            for d in &s.data_dirs {
                let side = self.suffix.apply_to(&join_uri(&[d.as_str(), "nebula"]));
                agent.remove_dir(side).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use br_manifest::{Checkpoint, HostBackup, SpaceBackup};

    fn storage(host: &str, port: u16, dirs: usize) -> ServiceInfo {
        let data_dirs = (0..dirs).map(|i| format!("/data/storage/data{i}")).collect();
        ServiceInfo::new(HostAddr::new(host, port), ServiceRole::Storage, "/data/storage", data_dirs).unwrap()
    }

    fn agent(host: &str, port: u16) -> ServiceInfo {
        ServiceInfo::new(HostAddr::new(host, port), ServiceRole::Agent, "/data/agent", vec![]).unwrap()
    }

    fn space_backup(host: HostAddr, checkpoints: usize) -> SpaceBackup {
        SpaceBackup {
            space_id: 1,
            space_name: "default".to_string(),
            partition_num: 3,
            replica_factor: 1,
            host_backups: vec![HostBackup {
                host,
                checkpoints: (0..checkpoints)
                    .map(|i| Checkpoint { path: format!("data{i}/1"), partition_info: vec![] })
                    .collect(),
            }],
        }
    }

    #[test]
    fn address_remap_skips_identical_pairs() {
        let topology = Topology::from_services(vec![
            storage("10.0.0.2", 9779, 1),
            agent("10.0.0.2", 8888),
            storage("10.0.0.1", 9779, 1),
            agent("10.0.0.1", 8888),
        ])
        .unwrap();

        let manifest = Manifest {
            backup_name: "BACKUP_1".to_string(),
            create_time_ms: 0,
            full: true,
            all_spaces: true,
            base_backup_name: String::new(),
            meta_files: vec![],
            space_backups: vec![],
            storage_hosts: vec![HostAddr::new("10.0.0.1", 9779), HostAddr::new("10.0.0.3", 9779)],
        };

        let remap = RestoreOrchestrator::address_remap(&topology, &manifest);
        // sorted backup hosts: [10.0.0.1, 10.0.0.3], sorted current hosts: [10.0.0.1, 10.0.0.2]
        // pair 0 (10.0.0.1 -> 10.0.0.1) is identical and dropped; pair 1 differs.
        assert_eq!(remap.len(), 1);
        assert_eq!(remap[0].from_host, HostAddr::new("10.0.0.3", 9779));
        assert_eq!(remap[0].to_host, HostAddr::new("10.0.0.2", 9779));
    }

    #[test]
    fn check_topology_accepts_matching_distribution() {
        let topology = Topology::from_services(vec![
            storage("10.0.0.1", 9779, 2),
            agent("10.0.0.1", 8888),
        ])
        .unwrap();
        let manifest = Manifest {
            backup_name: "BACKUP_1".to_string(),
            create_time_ms: 0,
            full: true,
            all_spaces: true,
            base_backup_name: String::new(),
            meta_files: vec![],
            space_backups: vec![space_backup(HostAddr::new("10.0.0.1", 9779), 2)],
            storage_hosts: vec![HostAddr::new("10.0.0.1", 9779)],
        };

        assert!(RestoreOrchestrator::check_topology(&topology, &manifest).is_ok());
    }

    #[test]
    fn check_topology_rejects_mismatched_storage_count() {
        let topology = Topology::from_services(vec![
            storage("10.0.0.1", 9779, 1),
            agent("10.0.0.1", 8888),
        ])
        .unwrap();
        let manifest = Manifest {
            backup_name: "BACKUP_1".to_string(),
            create_time_ms: 0,
            full: true,
            all_spaces: true,
            base_backup_name: String::new(),
            meta_files: vec![],
            space_backups: vec![
                space_backup(HostAddr::new("10.0.0.1", 9779), 1),
                space_backup(HostAddr::new("10.0.0.2", 9779), 1),
            ],
            storage_hosts: vec![HostAddr::new("10.0.0.1", 9779), HostAddr::new("10.0.0.2", 9779)],
        };

        let err = RestoreOrchestrator::check_topology(&topology, &manifest).unwrap_err();
        assert!(matches!(err, OrchestratorError::TopologyMismatch { .. }));
    }
}
