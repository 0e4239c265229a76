use chrono::{Local, TimeZone};
use comfy_table::Table;
use tracing::{error, warn};

use br_manifest::Manifest;
use br_store::{open_store, ExternalStore};

use crate::config::ShowConfig;
use crate::error::OrchestratorResult;
use crate::paths::join_uri;

const BACKUP_PREFIX: &str = "BACKUP";

/// One row of the rendered table, either a parsed manifest or a "broken"
/// placeholder for a directory whose manifest could not be read.
struct Row {
    name: String,
    create_time: String,
    spaces: String,
    full_backup: String,
    all_spaces: String,
}

impl Row {
    fn broken(name: &str) -> Self {
        Self {
            name: name.to_string(),
            create_time: "backup is broken".to_string(),
            spaces: "N/A".to_string(),
            full_backup: "N/A".to_string(),
            all_spaces: "N/A".to_string(),
        }
    }

    fn from_manifest(manifest: &Manifest) -> Self {
        let spaces = manifest
            .space_backups
            .iter()
            .map(|s| s.space_name.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let create_time = Local
            .timestamp_millis_opt(manifest.create_time_ms)
            .single()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| manifest.create_time_ms.to_string());

        Self {
            name: manifest.backup_name.clone(),
            create_time,
            spaces,
            full_backup: manifest.full.to_string(),
            all_spaces: manifest.all_spaces.to_string(),
        }
    }
}

/// Lists every backup under a store root as a table.
///
/// Implements §4.10: only `BACKUP*`-prefixed entries are considered;
/// a manifest that fails to download or parse renders as a broken row
/// instead of aborting the whole listing.
pub struct ShowOrchestrator {
    store: Box<dyn ExternalStore>,
    store_uri: String,
}

impl ShowOrchestrator {
    pub async fn connect(config: &ShowConfig) -> OrchestratorResult<Self> {
        let store = open_store(&config.store_uri, &config.s3_flags).await?;
        Ok(Self { store, store_uri: config.store_uri.clone() })
    }

    pub async fn run(&self) -> OrchestratorResult<String> {
        let names = self.store.list_dir(&self.store_uri).await?;
        let backup_names: Vec<&String> =
            names.iter().filter(|n| n.starts_with(BACKUP_PREFIX)).collect();

        let mut rows = Vec::with_capacity(backup_names.len());
        for name in backup_names {
            rows.push(self.load_row(name).await);
        }

        let mut table = Table::new();
        table.set_header(vec!["name", "create_time", "spaces", "full_backup", "all_spaces"]);
        for row in &rows {
            table.add_row(vec![
                row.name.as_str(),
                row.create_time.as_str(),
                row.spaces.as_str(),
                row.full_backup.as_str(),
                row.all_spaces.as_str(),
            ]);
        }
        Ok(table.to_string())
    }

    async fn load_row(&self, name: &str) -> Row {
        match self.fetch_manifest(name).await {
            Ok(manifest) => Row::from_manifest(&manifest),
            Err(err) => {
                warn!(backup = %name, error = %err, "failed to read manifest, rendering broken row");
                Row::broken(name)
            }
        }
    }

    async fn fetch_manifest(&self, name: &str) -> OrchestratorResult<Manifest> {
        let manifest_uri = join_uri(&[self.store_uri.as_str(), name, format!("{name}.meta").as_str()]);
        let tmp_dir = std::env::temp_dir().join("nebula-br-show");
        tokio::fs::create_dir_all(&tmp_dir).await?;
        let tmp_path = tmp_dir.join(format!("{name}.meta"));

        self.store.download(&tmp_path, &manifest_uri, true).await?;
        let bytes = tokio::fs::read(&tmp_path).await?;
        let manifest = br_manifest::parse(&bytes)?;

        if let Err(err) = tokio::fs::remove_file(&tmp_path).await {
            error!(path = %tmp_path.display(), error = %err, "failed to remove show temp file");
        }
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use br_manifest::Manifest;

    use super::*;

    fn manifest() -> Manifest {
        Manifest {
            backup_name: "BACKUP_1".to_string(),
            create_time_ms: 1_700_000_000_000,
            full: true,
            all_spaces: true,
            base_backup_name: String::new(),
            meta_files: vec![],
            space_backups: vec![],
            storage_hosts: vec![],
        }
    }

    #[test]
    fn broken_row_carries_the_name_and_no_other_data() {
        let row = Row::broken("BACKUP_2");
        assert_eq!(row.name, "BACKUP_2");
        assert_eq!(row.create_time, "backup is broken");
        assert_eq!(row.spaces, "N/A");
    }

    #[test]
    fn row_from_manifest_joins_space_names() {
        let mut m = manifest();
        m.space_backups = vec![
            br_manifest::SpaceBackup {
                space_id: 1,
                space_name: "a".to_string(),
                partition_num: 1,
                replica_factor: 1,
                host_backups: vec![],
            },
            br_manifest::SpaceBackup {
                space_id: 2,
                space_name: "b".to_string(),
                partition_num: 1,
                replica_factor: 1,
                host_backups: vec![],
            },
        ];
        let row = Row::from_manifest(&m);
        assert_eq!(row.name, "BACKUP_1");
        assert_eq!(row.spaces, "a,b");
        assert_eq!(row.full_backup, "true");
        assert_eq!(row.all_spaces, "true");
    }
}
