use std::fmt;

use serde::{Deserialize, Serialize};

/// Role a service plays within the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceRole {
    Meta,
    Storage,
    Graph,
    Agent,
}

impl fmt::Display for ServiceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServiceRole::Meta => "META",
            ServiceRole::Storage => "STORAGE",
            ServiceRole::Graph => "GRAPH",
            ServiceRole::Agent => "AGENT",
        };
        f.write_str(s)
    }
}
