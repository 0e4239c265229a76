use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{RpcError, RpcResult};

/// Frames larger than this are rejected outright; guards against a
/// corrupted or hostile length prefix driving an unbounded allocation.
pub const MAX_FRAME_BYTES: u32 = 64 * 1024 * 1024;

/// Writes `payload` as a single frame: a 4-byte big-endian length prefix
/// followed by the payload bytes.
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    addr: &str,
    payload: &[u8],
) -> RpcResult<()> {
    let len = u32::try_from(payload.len())
        .map_err(|_| RpcError::FrameTooLarge { len: u32::MAX, max: MAX_FRAME_BYTES })?;
    if len > MAX_FRAME_BYTES {
        return Err(RpcError::FrameTooLarge { len, max: MAX_FRAME_BYTES });
    }
    writer
        .write_all(&len.to_be_bytes())
        .await
        .map_err(|source| RpcError::Io { addr: addr.to_string(), source })?;
    writer
        .write_all(payload)
        .await
        .map_err(|source| RpcError::Io { addr: addr.to_string(), source })?;
    writer
        .flush()
        .await
        .map_err(|source| RpcError::Io { addr: addr.to_string(), source })?;
    Ok(())
}

/// Reads a single length-prefixed frame, returning its payload.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R, addr: &str) -> RpcResult<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(source) if source.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(RpcError::ClosedByPeer { addr: addr.to_string() });
        }
        Err(source) => return Err(RpcError::Io { addr: addr.to_string(), source }),
    }
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_BYTES {
        return Err(RpcError::FrameTooLarge { len, max: MAX_FRAME_BYTES });
    }
    let mut payload = vec![0u8; len as usize];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|source| RpcError::Io { addr: addr.to_string(), source })?;
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_a_frame() {
        let mut buf = Vec::new();
        write_frame(&mut buf, "test", b"hello").await.unwrap();
        let mut cursor = std::io::Cursor::new(buf);
        let payload = read_frame(&mut cursor, "test").await.unwrap();
        assert_eq!(payload, b"hello");
    }

    #[tokio::test]
    async fn rejects_oversized_frame() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(MAX_FRAME_BYTES + 1).to_be_bytes());
        let mut cursor = std::io::Cursor::new(buf);
        let err = read_frame(&mut cursor, "test").await.unwrap_err();
        assert!(matches!(err, RpcError::FrameTooLarge { .. }));
    }

    #[tokio::test]
    async fn empty_stream_reads_as_closed_by_peer() {
        let mut cursor = std::io::Cursor::new(Vec::<u8>::new());
        let err = read_frame(&mut cursor, "test").await.unwrap_err();
        assert!(matches!(err, RpcError::ClosedByPeer { .. }));
    }
}
