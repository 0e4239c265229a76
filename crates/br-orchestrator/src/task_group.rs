use std::future::Future;

use tokio::task::JoinSet;

use crate::error::{OrchestratorError, OrchestratorResult};

/// A barrier for fan-out work within one orchestration phase.
///
/// Mirrors the design note in spec.md §9: the group awaits all tasks: the
/// first error cancels the remaining siblings and is returned; if every
/// task succeeds the group returns all results together.
pub struct TaskGroup<T> {
    set: JoinSet<OrchestratorResult<T>>,
}

impl<T: Send + 'static> TaskGroup<T> {
    pub fn new() -> Self {
        Self { set: JoinSet::new() }
    }

    pub fn spawn<F>(&mut self, fut: F)
    where
        F: Future<Output = OrchestratorResult<T>> + Send + 'static,
    {
        self.set.spawn(fut);
    }

    /// Awaits every spawned task. On the first `Err`, aborts the remaining
    /// tasks and returns that error; callers never see partial results from
    /// a failed group.
    pub async fn join_all(mut self) -> OrchestratorResult<Vec<T>> {
        let mut results = Vec::with_capacity(self.set.len());
        while let Some(joined) = self.set.join_next().await {
            match joined {
                Ok(Ok(value)) => results.push(value),
                Ok(Err(err)) => {
                    self.set.abort_all();
                    return Err(err);
                }
                Err(join_err) => {
                    self.set.abort_all();
                    return Err(OrchestratorError::TaskGroup(join_err.to_string()));
                }
            }
        }
        Ok(results)
    }
}

impl<T: Send + 'static> Default for TaskGroup<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn collects_all_results_on_success() {
        let mut group = TaskGroup::new();
        for i in 0..5 {
            group.spawn(async move { Ok(i) });
        }
        let mut results = group.join_all().await.unwrap();
        results.sort();
        assert_eq!(results, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn first_error_is_returned() {
        let mut group: TaskGroup<()> = TaskGroup::new();
        group.spawn(async { Ok(()) });
        group.spawn(async { Err(OrchestratorError::BackupNotFound("BACKUP_1".to_string())) });
        let err = group.join_all().await.unwrap_err();
        assert!(matches!(err, OrchestratorError::BackupNotFound(name) if name == "BACKUP_1"));
    }
}
