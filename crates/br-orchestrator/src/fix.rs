use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

use br_agent_client::{AgentPool, ServiceStatusValue};
use br_core::{ServiceInfo, ServiceRole, SideCopySuffix, Topology};

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::restore::to_kind;

const FIX_RETRY_TIMES: u32 = 3;

/// Everything a fix attempt needs from the restore that triggered it:
/// the topology it observed, the pooled agent connections, and the side
/// copy suffix that attempt used.
pub struct FixContext<'a> {
    pub topology: Topology,
    pub agents: &'a AgentPool,
    pub suffix: SideCopySuffix,
}

/// Best-effort reconciliation after a restore fails partway through:
/// move the original data back and bring the cluster back up.
pub struct Fix<'a> {
    ctx: FixContext<'a>,
}

impl<'a> Fix<'a> {
    pub fn new(ctx: FixContext<'a>) -> Self {
        Self { ctx }
    }

    /// Checks whether anything is dead; if so, stops the cluster, moves
    /// the side-copied data back into place, and restarts whatever was
    /// found dead. Each step gets three attempts with linear backoff.
    pub async fn run(&self) -> OrchestratorResult<()> {
        let dead = retry(|| self.get_dead(), "get dead services", FIX_RETRY_TIMES).await?;
        if dead.is_empty() {
            info!("all services are ok, nothing to fix");
            return Ok(());
        }
        warn!(dead = dead.len(), "found dead services, attempting to fix");

        retry(|| self.stop_cluster(), "stop all services", FIX_RETRY_TIMES).await?;
        retry(|| self.fix_data(), "fix data", FIX_RETRY_TIMES).await?;
        retry(|| self.get_dead_then_start(), "get dead services then start", FIX_RETRY_TIMES).await?;
        Ok(())
    }

    async fn get_dead(&self) -> OrchestratorResult<Vec<ServiceInfo>> {
        let mut dead = Vec::new();
        for agent_info in self.ctx.topology.agents() {
            let agent = self.ctx.agents.get(agent_info.addr.clone()).await?;
            for svc in self.ctx.topology.host_services(&agent_info.addr.host) {
                if svc.role == ServiceRole::Agent {
                    continue;
                }
                let status = agent.service_status(to_kind(svc.role)?, svc.root_dir.clone()).await?;
                if status != ServiceStatusValue::Running {
                    dead.push(svc.clone());
                }
            }
        }
        Ok(dead)
    }

    async fn stop_cluster(&self) -> OrchestratorResult<()> {
        let root_dirs = self.ctx.topology.root_dirs();
        for agent_info in self.ctx.topology.agents() {
            let agent = self.ctx.agents.get(agent_info.addr.clone()).await?;
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

    /// Removes the newly restored `D/nebula` and moves `D/nebula<suffix>`
    /// back in its place, for every storage and meta data dir that still
    /// has a side copy on disk.
    async fn fix_data(&self) -> OrchestratorResult<()> {
        let mut services = self.ctx.topology.storages();
        services.extend(self.ctx.topology.metas());

        for svc in services {
            let agent = self.ctx.agents.for_service(&self.ctx.topology, &svc.addr).await?;
            for d in &svc.data_dirs {
                let original = format!("{d}/nebula");
                let side = self.ctx.suffix.apply_to(&original);

                if !agent.exist_dir(side.clone()).await? {
                    info!(path = %side, "no side copy to fix from, skipping");
                    continue;
                }

                agent.remove_dir(original.clone()).await?;
                agent.move_dir(side, original).await?;
                info!(role = ?svc.role, addr = %svc.addr, "moved original data back into place");
            }
        }
        Ok(())
    }

    async fn get_dead_then_start(&self) -> OrchestratorResult<()> {
        let dead = self.get_dead().await?;
        for svc in &dead {
            let agent = self.ctx.agents.for_service(&self.ctx.topology, &svc.addr).await?;
            agent.start_service(to_kind(svc.role)?, svc.root_dir.clone()).await?;
            info!(role = ?svc.role, addr = %svc.addr, "started dead service");
        }
        Ok(())
    }
}

/// Linear backoff retry: sleeps `attempt` seconds after each failure,
/// mirroring the fixed-step retry used throughout the original tool's
/// reconciliation flow.
async fn retry<F, Fut, T>(mut action: F, name: &str, times: u32) -> OrchestratorResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = OrchestratorResult<T>>,
{
    let mut last_err = None;
    for attempt in 1..=times {
        match action().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                warn!(action = name, attempt, error = %err, "retrying");
                last_err = Some(err);
                tokio::time::sleep(Duration::from_secs(attempt as u64)).await;
            }
        }
    }
    Err(OrchestratorError::RetriesExhausted {
        action: name.to_string(),
        attempts: times,
        last_error: last_err.map(|e| e.to_string()).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test]
    async fn retry_succeeds_after_transient_failures() {
        let attempts = AtomicU32::new(0);
        let result = retry(
            || async {
                let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 2 {
                    Err(OrchestratorError::BackupNotFound("x".to_string()))
                } else {
                    Ok(42)
                }
            },
            "flaky action",
            FIX_RETRY_TIMES,
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn retry_gives_up_after_exhausting_attempts() {
        let attempts = AtomicU32::new(0);
        let result: OrchestratorResult<()> = retry(
            || async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(OrchestratorError::BackupNotFound("x".to_string()))
            },
            "always fails",
            FIX_RETRY_TIMES,
        )
        .await;

        assert!(matches!(
            result,
            Err(OrchestratorError::RetriesExhausted { attempts: a, .. }) if a == FIX_RETRY_TIMES
        ));
        assert_eq!(attempts.load(Ordering::SeqCst), FIX_RETRY_TIMES);
    }
}
