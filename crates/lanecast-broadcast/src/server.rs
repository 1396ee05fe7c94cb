use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::broadcast::Receiver;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{BroadcastError, Result};
use crate::hub::Hub;

/// Request path served when none is configured.
pub const DEFAULT_PATH: &str = "/ws";

/// WebSocket endpoint streaming hub frames to display clients.
#[derive(Debug)]
pub struct WsServer {
    listener: TcpListener,
    path: Arc<str>,
    hub: Hub,
}

impl WsServer {
    /// Bind the listener. Clients must upgrade on `path`.
    pub async fn bind(addr: SocketAddr, path: &str, hub: Hub) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| BroadcastError::Bind { addr, source })?;
        Ok(Self {
            listener,
            path: Arc::from(path),
            hub,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Accept clients until `cancel` fires. Open connections are closed on
    /// the way out.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let addr = self.local_addr()?;
        info!(%addr, path = %self.path, "websocket server listening");

        loop {
            let accepted = tokio::select! {
                _ = cancel.cancelled() => break,
                accepted = self.listener.accept() => accepted.map_err(BroadcastError::Accept),
            };

            match accepted {
                Ok((stream, peer)) => {
                    let client = Client {
                        peer,
                        path: Arc::clone(&self.path),
                        hub: self.hub.clone(),
                        cancel: cancel.child_token(),
                    };
                    tokio::spawn(async move {
                        if let Err(err) = client.serve(stream).await {
                            debug!(%peer, error = %err, "client connection ended");
                        }
                    });
                }
                Err(err) => warn!(error = %err, "accept failed"),
            }
        }

        info!(%addr, "websocket server stopped");
        Ok(())
    }
}

struct Client {
    peer: SocketAddr,
    path: Arc<str>,
    hub: Hub,
    cancel: CancellationToken,
}

impl Client {
    async fn serve(self, stream: TcpStream) -> Result<()> {
        let path = Arc::clone(&self.path);
        let socket = tokio_tungstenite::accept_hdr_async(
            stream,
            move |request: &Request, response: Response| {
                if request.uri().path() == &*path {
                    Ok(response)
                } else {
                    Err(not_found())
                }
            },
        )
        .await?;

        let (latest, mut frames) = self.hub.subscribe();
        let (mut outgoing, mut incoming) = socket.split();
        debug!(peer = %self.peer, "client connected");

        if let Some(payload) = latest {
            outgoing.send(text(&payload)).await?;
        }

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    let _ = outgoing.send(Message::Close(None)).await;
                    break;
                }
                frame = frames.recv() => match frame {
                    Ok(payload) => outgoing.send(text(&payload)).await?,
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(peer = %self.peer, skipped, "client lagging");
                        if let Some(payload) = newest(&mut frames).or_else(|| self.hub.latest()) {
                            outgoing.send(text(&payload)).await?;
                        }
                    }
                    Err(RecvError::Closed) => break,
                },
                message = incoming.next() => match message {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => return Err(err.into()),
                },
            }
        }

        debug!(peer = %self.peer, "client disconnected");
        Ok(())
    }
}

/// Drain everything queued and keep only the last frame.
fn newest(frames: &mut Receiver<Bytes>) -> Option<Bytes> {
    let mut last = None;
    loop {
        match frames.try_recv() {
            Ok(payload) => last = Some(payload),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty | TryRecvError::Closed) => return last,
        }
    }
}

fn text(payload: &Bytes) -> Message {
    Message::Text(String::from_utf8_lossy(payload).into_owned())
}

fn not_found() -> ErrorResponse {
    let mut response = ErrorResponse::new(Some("not found".to_string()));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}
