use br_core::HostAddr;

/// Joins URI path segments with `/`, trimming any redundant slashes at the
/// seams. Mirrors `pkg/utils.UriJoin`'s segment-joining behavior.
pub fn join_uri(segments: &[&str]) -> String {
    segments
        .iter()
        .map(|s| s.trim_matches('/'))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Canonical `host:port` form used in external-store paths and logs.
pub fn addr_segment(addr: &HostAddr) -> String {
    addr.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_and_trims_slashes() {
        assert_eq!(join_uri(&["s3://bucket/", "/BACKUP_1", "meta/"]), "s3://bucket/BACKUP_1/meta");
    }
}
