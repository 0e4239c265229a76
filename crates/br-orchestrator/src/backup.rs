use std::path::PathBuf;

use tracing::{info, warn};

use br_agent_client::AgentPool;
use br_core::{HostAddr, ServiceInfo, Topology};
use br_manifest::Manifest;
use br_meta_client::MetaClient;
use br_store::{open_store, ExternalStore};

use crate::config::BackupConfig;
use crate::error::{BackupOutcome, OrchestratorError, OrchestratorResult};
use crate::paths::join_uri;
use crate::task_group::TaskGroup;

fn to_service_info(
    addr: HostAddr,
    wire: &br_meta_client::wire::ServiceInfoWire,
) -> OrchestratorResult<ServiceInfo> {
    let (root_dir, data_dirs) = match &wire.dir {
        Some(dir) => (dir.root.clone(), dir.data.clone()),
        None => (String::new(), Vec::new()),
    };
    Ok(ServiceInfo::new(addr, wire.role, root_dir, data_dirs)?)
}

/// Takes a cluster-wide snapshot and uploads it to the external store,
/// leaving the cluster's own checkpoint files reaped on success.
///
/// Implements the 8-phase pipeline of the Backup Orchestrator: discover,
/// create snapshot, ensure root, upload meta, upload storage, write
/// manifest, drop server-side snapshot (best-effort), return name.
pub struct BackupOrchestrator {
    meta: MetaClient,
    agents: AgentPool,
    store: Box<dyn ExternalStore>,
    store_uri: String,
    spaces: Vec<String>,
}

impl BackupOrchestrator {
    pub async fn connect(config: &BackupConfig) -> OrchestratorResult<Self> {
        let meta = MetaClient::connect(config.common.meta_addr.clone()).await?;
        let store = open_store(&config.common.store_uri, &config.common.s3_flags).await?;
        Ok(Self {
            meta,
            agents: AgentPool::new(),
            store,
            store_uri: config.common.store_uri.clone(),
            spaces: config.spaces.clone(),
        })
    }

    fn discover(resp: &br_meta_client::wire::ListClusterInfoResp) -> OrchestratorResult<Topology> {
        let mut services = Vec::new();
        for host_services in resp.host_services.values() {
            for svc in host_services {
                services.push(to_service_info(svc.addr.clone(), svc)?);
            }
        }
        Ok(Topology::from_services(services)?)
    }

    /// Runs the full pipeline. The backup name travels back to the caller
    /// even on failure once `create_backup` has succeeded, so Cleanup can
    /// always target the right name (spec's partial-failure design).
    pub async fn run(self) -> BackupOutcome {
        match self.run_inner().await {
            Ok((name, manifest)) => {
                if let Err(err) = self.drop_snapshot_best_effort(&name).await {
                    warn!(backup = %name, error = %err, "drop_snapshot after backup failed, continuing");
                }
                info!(backup = %name, spaces = manifest.space_backups.len(), "backup completed");
                BackupOutcome { backup_name: Some(name), result: Ok(()) }
            }
            Err((name, err)) => BackupOutcome { backup_name: name, result: Err(err) },
        }
    }

    async fn drop_snapshot_best_effort(&self, name: &str) -> OrchestratorResult<()> {
        self.meta.drop_backup(name.to_string()).await?;
        Ok(())
    }

    async fn run_inner(&self) -> Result<(String, Manifest), (Option<String>, OrchestratorError)> {
        let list = self.meta.list_cluster().await.map_err(|e| (None, e.into()))?;
        let topology = Self::discover(&list).map_err(|e| (None, e))?;
        info!(storages = topology.storage_count(), "discovered cluster topology");

        let create_resp = self
            .meta
            .create_backup(self.spaces.clone())
            .await
            .map_err(|e| (None, e.into()))?;

        let partial_name = create_resp.meta.as_ref().map(|m| m.backup_name.clone());
        if create_resp.code != br_meta_client::wire::ErrorCode::Succeeded {
            let code = create_resp.code;
            return Err((
                partial_name,
                OrchestratorError::Core(br_core::BrError::MetaRejected { code: format!("{code:?}") }),
            ));
        }
        let mut manifest = create_resp
            .meta
            .ok_or((None, OrchestratorError::BackupNotFound("<unnamed>".into())))?;
        let backup_name = manifest.backup_name.clone();

        let result: OrchestratorResult<()> = async {
            let root_uri = join_uri(&[self.store_uri.as_str(), backup_name.as_str()]);
            self.store.ensure_dir(&root_uri, true).await?;

            self.upload_meta(&topology, &manifest, &root_uri).await?;
            self.upload_storage(&topology, &manifest, &root_uri).await?;

            manifest.storage_hosts = topology.storages().iter().map(|s| s.addr.clone()).collect();
            self.write_manifest(&manifest, &root_uri).await?;
            Ok(())
        }
        .await;

        match result {
            Ok(()) => Ok((backup_name, manifest)),
            Err(err) => Err((Some(backup_name), err)),
        }
    }

    async fn upload_meta(
        &self,
        topology: &Topology,
        manifest: &Manifest,
        root_uri: &str,
    ) -> OrchestratorResult<()> {
        let leader_addr = self.meta.leader_addr().await;
        let leader = topology
            .metas()
            .into_iter()
            .find(|s| s.addr == leader_addr)
            .ok_or_else(|| br_core::BrError::Topology(format!("meta leader {leader_addr} not in topology")))?;

        let agent = self.agents.for_service(topology, &leader.addr).await?;
        let meta_dir = leader
            .data_dirs
            .first()
            .ok_or_else(|| br_core::BrError::Topology(format!("meta {leader_addr} has no data dir")))?;
        let target = join_uri(&[root_uri, "meta"]);
        let target_backend = self.store.get_dir(&target);

        info!(addr = %leader.addr, files = manifest.meta_files.len(), "uploading meta checkpoint");
        agent.upload_file(meta_dir.clone(), target_backend.uri.clone(), self.store_uri.clone(), true).await?;
        Ok(())
    }

    async fn upload_storage(
        &self,
        topology: &Topology,
        manifest: &Manifest,
        root_uri: &str,
    ) -> OrchestratorResult<()> {
        let data_uri = join_uri(&[root_uri, "data"]);

        let mut group: TaskGroup<()> = TaskGroup::new();
        for space in &manifest.space_backups {
            for host_backup in &space.host_backups {
                let agent = self.agents.for_service(topology, &host_backup.host).await?;
                let host_tag = host_backup.host.to_string();
                for (i, checkpoint) in host_backup.checkpoints.iter().enumerate() {
                    let target = join_uri(&[data_uri.as_str(), host_tag.as_str(), format!("data{i}").as_str(), space.space_id.to_string().as_str()]);
                    let target_backend = self.store.get_dir(&target);
                    let agent = agent.clone();
                    let store_uri = self.store_uri.clone();
                    let source_path = checkpoint.path.clone();
                    group.spawn(async move {
                        agent
                            .upload_file(source_path, target_backend.uri, store_uri, true)
                            .await
                            .map_err(OrchestratorError::from)
                    });
                }
            }
        }
        group.join_all().await?;
        Ok(())
    }

    async fn write_manifest(&self, manifest: &Manifest, root_uri: &str) -> OrchestratorResult<()> {
        let bytes = br_manifest::dump(manifest)?;
        let tmp_path = PathBuf::from(std::env::temp_dir()).join(format!("{}.meta", manifest.backup_name));
        tokio::fs::write(&tmp_path, &bytes).await?;

        let manifest_uri = join_uri(&[root_uri, format!("{}.meta", manifest.backup_name).as_str()]);
        self.store.upload(&manifest_uri, &tmp_path, false).await?;
        let _ = tokio::fs::remove_file(&tmp_path).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use br_core::ServiceRole;
    use br_meta_client::wire::{DirInfo, ErrorCode, ListClusterInfoResp, ServiceInfoWire};

    use super::*;

    #[test]
    fn discover_groups_services_by_host() {
        let mut host_services = HashMap::new();
        host_services.insert(
            "10.0.0.1".to_string(),
            vec![
                ServiceInfoWire {
                    addr: HostAddr::new("10.0.0.1", 9559),
                    role: ServiceRole::Meta,
                    dir: Some(DirInfo { root: "/data/meta".into(), data: vec!["/data/meta/0".into()] }),
                },
                ServiceInfoWire {
                    addr: HostAddr::new("10.0.0.1", 8888),
                    role: ServiceRole::Agent,
                    dir: Some(DirInfo { root: "/data/agent".into(), data: vec![] }),
                },
            ],
        );
        let resp = ListClusterInfoResp {
            code: ErrorCode::Succeeded,
            leader: Some(HostAddr::new("10.0.0.1", 9559)),
            host_services,
        };

        let topology = BackupOrchestrator::discover(&resp).unwrap();
        assert_eq!(topology.metas().len(), 1);
        assert_eq!(topology.agents().len(), 1);
        assert!(topology.has_service(&HostAddr::new("10.0.0.1", 9559)));
    }

    #[test]
    fn discover_rejects_duplicate_agents_on_one_host() {
        let mut host_services = HashMap::new();
        host_services.insert(
            "10.0.0.1".to_string(),
            vec![
                ServiceInfoWire {
                    addr: HostAddr::new("10.0.0.1", 8888),
                    role: ServiceRole::Agent,
                    dir: Some(DirInfo { root: "/data/agent".into(), data: vec![] }),
                },
                ServiceInfoWire {
                    addr: HostAddr::new("10.0.0.1", 8889),
                    role: ServiceRole::Agent,
                    dir: Some(DirInfo { root: "/data/agent2".into(), data: vec![] }),
                },
            ],
        );
        let resp = ListClusterInfoResp { code: ErrorCode::Succeeded, leader: None, host_services };

        assert!(BackupOrchestrator::discover(&resp).is_err());
    }
}
