use thiserror::Error;

use crate::model::Manifest;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to encode manifest: {0}")]
    Encode(#[source] bincode::Error),

    #[error("failed to decode manifest: {0}")]
    Decode(#[source] bincode::Error),

    #[error("manifest frame is truncated or corrupt")]
    Truncated,
}

pub type CodecResult<T> = Result<T, CodecError>;

/// Serializes `manifest` to its on-disk framed binary form: a 4-byte
/// big-endian length prefix followed by the `bincode`-encoded manifest,
/// mirroring the original tool's length-framed Thrift transport (§6.1).
/// Meta-sst entries are basename-normalized before encoding.
pub fn dump(manifest: &Manifest) -> CodecResult<Vec<u8>> {
    let manifest = manifest.clone().normalize();
    let payload = bincode::serialize(&manifest).map_err(CodecError::Encode)?;
    let mut framed = Vec::with_capacity(payload.len() + 4);
    framed.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    framed.extend_from_slice(&payload);
    Ok(framed)
}

/// Parses a manifest previously produced by [`dump`]. `parse(dump(m)) == m`
/// holds for any manifest whose meta-sst entries were already basenames.
pub fn parse(bytes: &[u8]) -> CodecResult<Manifest> {
    if bytes.len() < 4 {
        return Err(CodecError::Truncated);
    }
    let (len_bytes, rest) = bytes.split_at(4);
    let len = u32::from_be_bytes(len_bytes.try_into().expect("4 byte slice")) as usize;
    if rest.len() < len {
        return Err(CodecError::Truncated);
    }
    bincode::deserialize(&rest[..len]).map_err(CodecError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Checkpoint, HostBackup, SpaceBackup};
    use br_core::HostAddr;

    fn sample() -> Manifest {
        Manifest {
            backup_name: "BACKUP_1700000000".into(),
            create_time_ms: 1_700_000_000_000,
            full: true,
            all_spaces: true,
            base_backup_name: String::new(),
            meta_files: vec!["/data/meta/0/__tags__.sst".into()],
            space_backups: vec![SpaceBackup {
                space_id: 1,
                space_name: "S".into(),
                partition_num: 3,
                replica_factor: 1,
                host_backups: vec![HostBackup {
                    host: HostAddr::new("10.0.0.1", 9779),
                    checkpoints: vec![Checkpoint { path: "data0/1/".into(), partition_info: vec![1, 2, 3] }],
                }],
            }],
            storage_hosts: vec![HostAddr::new("10.0.0.1", 9779)],
        }
    }

    #[test]
    fn round_trips_after_normalization() {
        let manifest = sample();
        let framed = dump(&manifest).unwrap();
        let parsed = parse(&framed).unwrap();
        assert_eq!(parsed.meta_files, vec!["__tags__.sst".to_string()]);
        assert_eq!(parsed, manifest.normalize());
    }

    #[test]
    fn dump_is_deterministic() {
        let manifest = sample();
        assert_eq!(dump(&manifest).unwrap(), dump(&manifest).unwrap());
    }

    #[test]
    fn parse_rejects_truncated_input() {
        let manifest = sample();
        let mut framed = dump(&manifest).unwrap();
        framed.truncate(framed.len() - 2);
        assert!(matches!(parse(&framed), Err(CodecError::Truncated)));
    }
}
