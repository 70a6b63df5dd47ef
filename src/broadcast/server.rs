use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;

use super::registry::SubscriberRegistry;

pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind WebSocket listener on {}", addr))
}

/// Accept subscribers forever. Each connection gets its own task.
pub async fn serve(listener: TcpListener, registry: SubscriberRegistry) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                tokio::spawn(handle_connection(stream, peer, registry.clone()));
            }
            Err(e) => log::warn!("Failed to accept WebSocket connection: {}", e),
        }
    }
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, registry: SubscriberRegistry) {
    let socket = match tokio_tungstenite::accept_async(stream).await {
        Ok(socket) => socket,
        Err(e) => {
            log::warn!("WebSocket handshake with {} failed: {}", peer, e);
            return;
        }
    };
    let (mut sender, mut receiver) = socket.split();
    let (id, mut queue) = registry.register(peer);
    log::info!("WebSocket client connected: {} ({} total)", peer, registry.len());

    let writer = async {
        while let Some(msg) = queue.recv().await {
            sender.send(msg).await?;
        }
        Ok::<_, tokio_tungstenite::tungstenite::Error>(())
    };

    // Server-to-client only: inbound traffic is read just to notice closes.
    let reader = async {
        while let Some(msg) = receiver.next().await {
            if let Message::Close(_) = msg? {
                break;
            }
        }
        Ok::<_, tokio_tungstenite::tungstenite::Error>(())
    };

    let result = tokio::select! {
        r = writer => r,
        r = reader => r,
    };
    if let Err(e) = result {
        log::warn!("WebSocket error for {}: {}", peer, e);
    }

    registry.unregister(id);
    log::info!("WebSocket client disconnected: {} ({} total)", peer, registry.len());
}
