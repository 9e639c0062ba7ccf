//! Server network layer handling WebSocket connections and event dispatch

use crate::game::{GameServer, ServerEvent};
use crate::session::ConnectionId;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{ClientMessage, ServerMessage};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Accepts WebSocket clients and feeds their events to a [`GameServer`].
pub struct Server {
    listener: Arc<TcpListener>,
    game: GameServer,
}

impl Server {
    pub async fn bind(addr: &str, game: GameServer) -> Result<Self> {
        let listener = Arc::new(TcpListener::bind(addr).await?);
        info!("Server listening on {}", listener.local_addr()?);

        Ok(Server { listener, game })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Spawns task that accepts connections and starts a handler for each.
    /// The acceptor and the connection handlers hold the only event senders.
    fn spawn_acceptor(&self, event_tx: mpsc::UnboundedSender<ServerEvent>) -> JoinHandle<()> {
        let listener = Arc::clone(&self.listener);

        tokio::spawn(async move {
            let mut next_connection_id: ConnectionId = 1;

            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        let connection_id = next_connection_id;
                        next_connection_id += 1;
                        tokio::spawn(handle_connection(
                            stream,
                            addr,
                            connection_id,
                            event_tx.clone(),
                        ));
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        })
    }

    /// Runs the event loop until the process is stopped.
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Runs the event loop until `shutdown` completes.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let acceptor = self.spawn_acceptor(event_tx);
        info!("Server started successfully");

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                event = event_rx.recv() => {
                    match event {
                        Some(event) => self.game.handle_event(event),
                        None => {
                            error!("Connection acceptor stopped unexpectedly");
                            break;
                        }
                    }
                },
                _ = &mut shutdown => {
                    info!(
                        "Server shutting down with {} players connected",
                        self.game.connection_count()
                    );
                    break;
                },
            }
        }

        acceptor.abort();
        Ok(())
    }
}

/// Drives one connection: performs the handshake, forwards inbound frames as
/// events and writes queued outbound messages.
///
/// Exactly one `Disconnected` event is sent for every `Connected` event,
/// whichever way the connection ends.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    connection_id: ConnectionId,
    event_tx: mpsc::UnboundedSender<ServerEvent>,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake failed for {}: {}", addr, e);
            return;
        }
    };

    let (mut ws_sink, mut ws_receiver) = ws_stream.split();
    let (outbox, mut outbox_rx) = mpsc::unbounded_channel::<ServerMessage>();

    if event_tx
        .send(ServerEvent::Connected {
            connection_id,
            addr,
            outbox,
        })
        .is_err()
    {
        return;
    }

    // Ends once the session's outbox is dropped or the peer stops accepting writes.
    tokio::spawn(async move {
        while let Some(message) = outbox_rx.recv().await {
            let text = match message.to_json() {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to encode message for {}: {}", connection_id, e);
                    continue;
                }
            };

            if let Err(e) = ws_sink.send(Message::Text(text)).await {
                debug!("Write to connection {} failed: {}", connection_id, e);
                break;
            }
        }
        let _ = ws_sink.close().await;
    });

    while let Some(frame) = ws_receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => match ClientMessage::from_json(&text) {
                Ok(message) => {
                    if event_tx
                        .send(ServerEvent::Message {
                            connection_id,
                            message,
                        })
                        .is_err()
                    {
                        break;
                    }
                }
                Err(e) => {
                    warn!(
                        "Ignoring malformed message from connection {}: {}",
                        connection_id, e
                    );
                }
            },
            Ok(Message::Close(_)) => break,
            // tungstenite queues pong replies on its own
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(_) => {
                warn!(
                    "Ignoring unsupported frame from connection {}",
                    connection_id
                );
            }
            Err(e) => {
                debug!("Connection {} read error: {}", connection_id, e);
                break;
            }
        }
    }

    let _ = event_tx.send(ServerEvent::Disconnected { connection_id });
}
