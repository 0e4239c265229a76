use serde::{Deserialize, Serialize};

use crate::error::{BrError, BrResult};
use crate::host_addr::HostAddr;
use crate::role::ServiceRole;

/// A single service instance discovered from the cluster topology.
///
/// A META service always has exactly one data dir; STORAGE and GRAPH
/// services may have several (one per disk). AGENT entries carry no
/// data dirs at all, just a root dir used as its working directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub addr: HostAddr,
    pub role: ServiceRole,
    pub root_dir: String,
    pub data_dirs: Vec<String>,
}

impl ServiceInfo {
    pub fn new(
        addr: HostAddr,
        role: ServiceRole,
        root_dir: impl Into<String>,
        data_dirs: Vec<String>,
    ) -> BrResult<Self> {
        let root_dir = root_dir.into();
        if matches!(role, ServiceRole::Meta) && data_dirs.len() != 1 {
            return Err(BrError::Topology(format!(
                "meta service at {addr} must have exactly one data dir, got {}",
                data_dirs.len()
            )));
        }
        Ok(Self { addr, role, root_dir, data_dirs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_requires_exactly_one_data_dir() {
        let addr = HostAddr::new("10.0.0.1", 9559);
        assert!(ServiceInfo::new(addr.clone(), ServiceRole::Meta, "/data/meta", vec![]).is_err());
        assert!(ServiceInfo::new(
            addr.clone(),
            ServiceRole::Meta,
            "/data/meta",
            vec!["/data/meta/0".into(), "/data/meta/1".into()]
        )
        .is_err());
        assert!(ServiceInfo::new(addr, ServiceRole::Meta, "/data/meta", vec!["/data/meta/0".into()])
            .is_ok());
    }

    #[test]
    fn storage_allows_multiple_data_dirs() {
        let addr = HostAddr::new("10.0.0.2", 9779);
        let info = ServiceInfo::new(
            addr,
            ServiceRole::Storage,
            "/data/storage",
            vec!["/data/storage/0".into(), "/data/storage/1".into()],
        )
        .unwrap();
        assert_eq!(info.data_dirs.len(), 2);
    }
}
