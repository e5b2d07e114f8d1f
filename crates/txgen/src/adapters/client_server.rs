//! # Client Server
//!
//! TCP endpoint leaders push confirmed blocks to. Each connection carries
//! one or more length-prefixed envelopes; `BlocksConfirmed` frames are handed
//! to the [`BlockSink`], everything else is logged and ignored.

use shared_types::{decode_message, NodeMessage};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::tcp_transport::read_frame;
use crate::domain::TransportError;
use crate::ports::BlockSink;

/// Listener for the client role.
pub struct ClientServer {
    listener: TcpListener,
    sink: Arc<dyn BlockSink>,
}

impl ClientServer {
    /// Bind on all interfaces at `port` (0 picks a free port).
    pub async fn bind(port: u16, sink: Arc<dyn BlockSink>) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(("0.0.0.0", port))
            .await
            .map_err(|e| TransportError::Io(format!("bind port {port}: {e}")))?;
        Ok(Self { listener, sink })
    }

    /// Address actually bound.
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.listener
            .local_addr()
            .map_err(|e| TransportError::Io(e.to_string()))
    }

    /// Accept connections until `shutdown` fires or its sender is dropped.
    pub async fn run(self, mut shutdown: oneshot::Receiver<()>) {
        match self.listener.local_addr() {
            Ok(addr) => info!(addr = %addr, "Client server listening"),
            Err(e) => warn!(error = %e, "Client server listening on unknown address"),
        }

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Client server stopping");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, remote)) => {
                        let sink = self.sink.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, sink).await {
                                debug!(remote = %remote, error = %e, "Client connection closed with error");
                            }
                        });
                    }
                    Err(e) => warn!(error = %e, "Accept failed"),
                }
            }
        }
    }
}

async fn handle_connection(mut stream: TcpStream, sink: Arc<dyn BlockSink>) -> Result<(), TransportError> {
    while let Some(frame) = read_frame(&mut stream).await? {
        match decode_message(&frame)? {
            NodeMessage::BlocksConfirmed(blocks) => {
                debug!(count = blocks.len(), "Received blocks from leader");
                let outcome = sink.on_blocks(blocks);
                debug!(
                    applied = outcome.applied,
                    skipped = outcome.skipped,
                    resolved = outcome.resolved.len(),
                    "Blocks synced"
                );
            }
            other => {
                debug!(message = message_kind(&other), "Ignoring message on client endpoint");
            }
        }
    }
    Ok(())
}

fn message_kind(message: &NodeMessage) -> &'static str {
    match message {
        NodeMessage::TransactionList(_) => "transaction_list",
        NodeMessage::BlocksConfirmed(_) => "blocks_confirmed",
        NodeMessage::Stop => "stop",
    }
}
