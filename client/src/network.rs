//! WebSocket connection to the game server

use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use shared::{ClientMessage, ServerMessage};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

pub struct Connection {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Connection {
    pub async fn connect(url: &str) -> Result<Self> {
        info!("Connecting to {}...", url);
        let (ws, _) = connect_async(url).await?;
        info!("Connected to {}", url);
        Ok(Connection { ws })
    }

    pub async fn send(&mut self, message: &ClientMessage) -> Result<()> {
        let text = message.to_json()?;
        self.ws.send(Message::Text(text)).await?;
        Ok(())
    }

    pub async fn join(&mut self) -> Result<()> {
        self.send(&ClientMessage::Join).await
    }

    pub async fn send_move(&mut self, x: f64, y: f64) -> Result<()> {
        debug!("Requesting move to ({:.1}, {:.1})", x, y);
        self.send(&ClientMessage::Move { x, y }).await
    }

    pub async fn place_obstacle(&mut self) -> Result<()> {
        self.send(&ClientMessage::PlaceObstacle).await
    }

    /// Waits for the next server message. Returns `None` once the server
    /// closes the connection. Frames that do not decode are skipped.
    pub async fn next_message(&mut self) -> Result<Option<ServerMessage>> {
        while let Some(frame) = self.ws.next().await {
            match frame? {
                Message::Text(text) => match ServerMessage::from_json(&text) {
                    Ok(message) => return Ok(Some(message)),
                    Err(e) => warn!("Ignoring malformed server message: {}", e),
                },
                Message::Close(_) => return Ok(None),
                Message::Ping(_) | Message::Pong(_) => {}
                other => warn!("Ignoring unexpected frame: {:?}", other),
            }
        }
        Ok(None)
    }

    pub async fn close(&mut self) -> Result<()> {
        self.ws.close(None).await?;
        Ok(())
    }
}
