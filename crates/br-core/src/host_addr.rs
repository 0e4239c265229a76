use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BrError;

/// A host/port pair addressing a service or agent.
///
/// Canonical textual form is `host:port` decimal with no leading zeros,
/// per spec.md §4.6 ("Host addresses in log/path formatting are
/// canonicalized as `host:port` decimal").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HostAddr {
    pub host: String,
    pub port: u16,
}

impl HostAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }
}

impl fmt::Display for HostAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for HostAddr {
    type Err = BrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| BrError::Configuration(format!("bad host address: {s}")))?;
        let port: u16 = port
            .parse()
            .map_err(|_| BrError::Configuration(format!("bad port in host address: {s}")))?;
        if host.is_empty() {
            return Err(BrError::Configuration(format!("bad host address: {s}")));
        }
        Ok(HostAddr::new(host, port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_display_and_parse() {
        let addr = HostAddr::new("10.0.0.1", 9779);
        assert_eq!(addr.to_string(), "10.0.0.1:9779");
        assert_eq!("10.0.0.1:9779".parse::<HostAddr>().unwrap(), addr);
    }

    #[test]
    fn rejects_missing_port() {
        assert!("10.0.0.1".parse::<HostAddr>().is_err());
    }

    #[test]
    fn orders_lexicographically_by_host_then_port() {
        let mut addrs = vec![
            HostAddr::new("10.0.0.2", 9779),
            HostAddr::new("10.0.0.1", 9780),
            HostAddr::new("10.0.0.1", 9779),
        ];
        addrs.sort();
        assert_eq!(
            addrs,
            vec![
                HostAddr::new("10.0.0.1", 9779),
                HostAddr::new("10.0.0.1", 9780),
                HostAddr::new("10.0.0.2", 9779),
            ]
        );
    }
}
