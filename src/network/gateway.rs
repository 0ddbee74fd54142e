//! WebSocket gateway.
//!
//! Accepts connections, assigns each a fresh connection id, decodes JSON
//! client commands, invokes the engine and routes the resulting effects.
//! Engine errors become a caller-only `error` event; they never fan out.

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};

use crate::broadcast::FanoutRouter;
use crate::engine::ChatEngine;
use crate::events::{ClientCommand, Effect, ServerEvent};

pub struct Gateway {
    listener: TcpListener,
    engine: Arc<ChatEngine>,
    router: Arc<FanoutRouter>,
}

impl Gateway {
    /// Bind the WebSocket listener.
    pub async fn bind(
        addr: SocketAddr,
        engine: Arc<ChatEngine>,
        router: Arc<FanoutRouter>,
    ) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "gateway listening");
        Ok(Self {
            listener,
            engine,
            router,
        })
    }

    /// Accept loop. Each connection runs in its own task.
    pub async fn run(self) -> anyhow::Result<()> {
        loop {
            let (stream, peer) = self.listener.accept().await?;
            let engine = self.engine.clone();
            let router = self.router.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, peer, engine, router).await {
                    debug!(peer = %peer, error = %e, "connection ended with error");
                }
            });
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    engine: Arc<ChatEngine>,
    router: Arc<FanoutRouter>,
) -> anyhow::Result<()> {
    let ws = tokio_tungstenite::accept_async(stream).await?;
    let connection_id = uuid::Uuid::new_v4().to_string();
    info!(peer = %peer, connection = %connection_id, "client connected");

    let (mut sink, mut source) = ws.split();
    let mut outbound = router.register(&connection_id);

    // Writer task: drain the fan-out queue into the socket.
    let writer = tokio::spawn(async move {
        while let Some(event) = outbound.recv().await {
            let frame = match serde_json::to_string(&*event) {
                Ok(json) => WsMessage::Text(json),
                Err(e) => {
                    warn!(error = %e, "failed to encode event");
                    continue;
                }
            };
            if sink.send(frame).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    // Read loop: decode commands, dispatch, route effects.
    while let Some(frame) = source.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                debug!(connection = %connection_id, error = %e, "socket error");
                break;
            }
        };
        match frame {
            WsMessage::Text(text) => {
                let command: ClientCommand = match serde_json::from_str(&text) {
                    Ok(command) => command,
                    Err(e) => {
                        debug!(connection = %connection_id, error = %e, "undecodable command");
                        let effect = Effect::caller(ServerEvent::Error {
                            code: "bad_request".to_string(),
                            message: format!("could not decode command: {e}"),
                        });
                        router.deliver(&connection_id, effect).await;
                        continue;
                    }
                };
                match engine.dispatch(&connection_id, command).await {
                    Ok(effects) => router.deliver_all(&connection_id, effects).await,
                    Err(e) => {
                        warn!(connection = %connection_id, code = e.code(), error = %e, "operation failed");
                        let effect = Effect::caller(ServerEvent::Error {
                            code: e.code().to_string(),
                            message: e.to_string(),
                        });
                        router.deliver(&connection_id, effect).await;
                    }
                }
            }
            WsMessage::Close(_) => break,
            // tungstenite answers pings itself; binary frames are ignored.
            _ => {}
        }
    }

    // Disconnect cleanup runs exactly once per socket; the engine treats a
    // repeated unbind as a no-op either way.
    match engine.disconnect(&connection_id).await {
        Ok(effects) => router.deliver_all(&connection_id, effects).await,
        Err(e) => warn!(connection = %connection_id, error = %e, "disconnect cleanup failed"),
    }
    router.unregister(&connection_id);
    writer.abort();
    info!(connection = %connection_id, "client disconnected");
    Ok(())
}
