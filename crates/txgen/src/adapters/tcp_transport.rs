//! # TCP Transport
//!
//! One connection per message. Each message is a single frame:
//!
//! ```text
//! [length: u32 BE][envelope bytes: length]
//! ```

use async_trait::async_trait;
use shared_types::{CodecError, Peer, MAX_FRAME_SIZE};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::domain::TransportError;
use crate::ports::Transport;

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Write one length-prefixed frame.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_FRAME_SIZE {
        return Err(CodecError::FrameTooLarge {
            size: payload.len(),
            max: MAX_FRAME_SIZE,
        }
        .into());
    }
    let len = u32::try_from(payload.len()).map_err(|e| TransportError::Io(e.to_string()))?;
    writer
        .write_all(&len.to_be_bytes())
        .await
        .map_err(|e| TransportError::Io(e.to_string()))?;
    writer
        .write_all(payload)
        .await
        .map_err(|e| TransportError::Io(e.to_string()))?;
    writer
        .flush()
        .await
        .map_err(|e| TransportError::Io(e.to_string()))
}

/// Read one length-prefixed frame. `Ok(None)` on a clean end of stream.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>, TransportError>
where
    R: AsyncRead + Unpin,
{
    let mut len = [0u8; 4];
    match reader.read_exact(&mut len).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(TransportError::Io(e.to_string())),
    }
    let len = u32::from_be_bytes(len) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(CodecError::FrameTooLarge {
            size: len,
            max: MAX_FRAME_SIZE,
        }
        .into());
    }
    let mut buf = vec![0u8; len];
    reader
        .read_exact(&mut buf)
        .await
        .map_err(|e| TransportError::Io(e.to_string()))?;
    Ok(Some(buf))
}

/// `Transport` over plain TCP.
#[derive(Clone, Debug)]
pub struct TcpTransport {
    connect_timeout: Duration,
}

impl TcpTransport {
    /// Create a transport with the given connect timeout.
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT)
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send(&self, peer: &Peer, payload: &[u8]) -> Result<(), TransportError> {
        let endpoint = peer.endpoint();
        let mut stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&endpoint))
            .await
            .map_err(|_| TransportError::Timeout(self.connect_timeout.as_millis() as u64))?
            .map_err(|e| TransportError::Connect {
                peer: endpoint.clone(),
                reason: e.to_string(),
            })?;
        write_frame(&mut stream, payload).await?;
        stream
            .shutdown()
            .await
            .map_err(|e| TransportError::Io(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{construct_stop_message, decode_message, NodeMessage, PeerRole};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_frame_round_trip_over_duplex() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        write_frame(&mut a, b"hello").await.unwrap();
        drop(a);
        assert_eq!(read_frame(&mut b).await.unwrap().unwrap(), b"hello");
        assert!(read_frame(&mut b).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_oversized_length_rejected() {
        let (mut a, mut b) = tokio::io::duplex(64);
        a.write_all(&u32::MAX.to_be_bytes()).await.unwrap();
        assert!(matches!(
            read_frame(&mut b).await,
            Err(TransportError::Codec(CodecError::FrameTooLarge { .. }))
        ));
    }

    #[tokio::test]
    async fn test_send_delivers_one_frame() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            read_frame(&mut stream).await.unwrap().unwrap()
        });

        let peer = Peer {
            ip: "127.0.0.1".to_string(),
            port,
            role: PeerRole::Leader,
            shard_id: 0,
        };
        TcpTransport::default()
            .send(&peer, &construct_stop_message().unwrap())
            .await
            .unwrap();

        let frame = server.await.unwrap();
        assert_eq!(decode_message(&frame).unwrap(), NodeMessage::Stop);
    }

    #[tokio::test]
    async fn test_send_to_closed_port_fails() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let peer = Peer {
            ip: "127.0.0.1".to_string(),
            port,
            role: PeerRole::Validator,
            shard_id: 0,
        };
        assert!(TcpTransport::default().send(&peer, b"x").await.is_err());
    }
}
