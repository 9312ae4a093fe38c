//! WebSocket Game Server
//!
//! Async WebSocket server for player connections.
//! Each text frame is one request; its reply goes back on the same socket.
//! Frames are dispatched concurrently, so replies may arrive out of order
//! across different players' requests.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, RwLock, broadcast};
use tokio::time::interval;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use futures_util::{SinkExt, StreamExt};
use tracing::{info, warn, error, debug, instrument};

use crate::network::dispatch::Dispatcher;
use crate::network::protocol::Reply;
use crate::store::UserStore;

/// How long a closing connection waits for in-flight replies.
const CLOSE_GRACE: Duration = Duration::from_secs(5);

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Close connections silent for this long.
    pub idle_timeout: Option<Duration>,
    /// Fail store calls that take longer than this.
    pub store_timeout: Option<Duration>,
    /// Period of the lock pruning loop.
    pub lock_prune_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 1000,
            idle_timeout: Some(Duration::from_secs(300)),
            store_timeout: None,
            lock_prune_interval: Duration::from_secs(60),
        }
    }
}

impl ServerConfig {
    /// Create config from environment variables, falling back to defaults.
    ///
    /// Zero disables `BANANA_IDLE_TIMEOUT_SECS` and `BANANA_STORE_TIMEOUT_MS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let secs = |key: &str, default: Option<Duration>| {
            env_or(key, default.map_or(0, |d| d.as_secs()))
        };

        Self {
            bind_addr: env_or("BANANA_BIND_ADDR", defaults.bind_addr),
            max_connections: env_or("BANANA_MAX_CONNECTIONS", defaults.max_connections),
            idle_timeout: non_zero(secs("BANANA_IDLE_TIMEOUT_SECS", defaults.idle_timeout))
                .map(Duration::from_secs),
            store_timeout: non_zero(env_or("BANANA_STORE_TIMEOUT_MS", 0))
                .map(Duration::from_millis),
            lock_prune_interval: Duration::from_secs(
                env_or("BANANA_LOCK_PRUNE_SECS", defaults.lock_prune_interval.as_secs()).max(1),
            ),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid {}={:?}", key, raw);
            default
        }),
        Err(_) => default,
    }
}

fn non_zero(value: u64) -> Option<u64> {
    (value > 0).then_some(value)
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),
}

/// Connected client state.
struct ConnectedClient {
    /// Connection time.
    connected_at: Instant,
    /// Last frame received.
    last_activity: Instant,
    /// Frames received.
    frames: u64,
}

type Clients = Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>;

/// The game server.
pub struct GameServer<S> {
    /// Server configuration.
    config: ServerConfig,
    /// Request router.
    dispatcher: Arc<Dispatcher<S>>,
    /// Connected clients.
    clients: Clients,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl<S: UserStore> GameServer<S> {
    /// Create a new game server.
    pub fn new(config: ServerConfig, dispatcher: Arc<Dispatcher<S>>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            dispatcher,
            clients: Arc::new(RwLock::new(BTreeMap::new())),
            shutdown_tx,
        }
    }

    /// Request router shared by all connections.
    pub fn dispatcher(&self) -> &Arc<Dispatcher<S>> {
        &self.dispatcher
    }

    /// Number of open connections.
    pub async fn connection_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Stop accepting and close every connection.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Bind the configured address and run until shutdown.
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        self.run_on(listener).await
    }

    /// Run on an already bound listener until shutdown.
    #[instrument(skip_all)]
    pub async fn run_on(&self, listener: TcpListener) -> Result<(), GameServerError> {
        info!("Game server listening on {}", listener.local_addr()?);

        let maintenance_handle = tokio::spawn(Self::run_maintenance_loop(
            self.dispatcher.clone(),
            self.clients.clone(),
            self.config.lock_prune_interval,
        ));

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let clients_count = self.clients.read().await.len();
                            if clients_count >= self.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            }

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        maintenance_handle.abort();

        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let clients = self.clients.clone();
        let dispatcher = self.dispatcher.clone();
        let idle_timeout = self.config.idle_timeout;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<Reply>(64);

            // Register client
            {
                let mut clients = clients.write().await;
                clients.insert(addr, ConnectedClient {
                    connected_at: Instant::now(),
                    last_activity: Instant::now(),
                    frames: 0,
                });
            }

            // Spawn reply writer task
            let mut sender_task = tokio::spawn(async move {
                while let Some(reply) = msg_rx.recv().await {
                    let text = match reply.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize reply: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                let _ = ws_sender.close().await;
            });

            let idle = tokio::time::sleep(idle_timeout.unwrap_or(Duration::ZERO));
            tokio::pin!(idle);

            // Handle incoming frames
            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        let frame = match msg {
                            Some(Ok(Message::Text(text))) => Some(text),
                            Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                                Ok(text) => Some(text),
                                Err(_) => {
                                    debug!("Ignoring non UTF-8 binary frame from {}", addr);
                                    None
                                }
                            },
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                error!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            // Ping/pong are answered by tungstenite
                            Some(Ok(_)) => None,
                        };

                        if let Some(timeout) = idle_timeout {
                            idle.as_mut().reset(tokio::time::Instant::now() + timeout);
                        }

                        let Some(frame) = frame else { continue };

                        // Update activity
                        {
                            let mut clients = clients.write().await;
                            if let Some(client) = clients.get_mut(&addr) {
                                client.last_activity = Instant::now();
                                client.frames += 1;
                            }
                        }

                        let dispatcher = dispatcher.clone();
                        let reply_tx = msg_tx.clone();
                        tokio::spawn(async move {
                            let reply = dispatcher.dispatch(&frame).await;
                            let _ = reply_tx.send(reply).await;
                        });
                    }
                    _ = &mut idle, if idle_timeout.is_some() => {
                        info!("Closing idle connection {}", addr);
                        break;
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }

            // Let in-flight replies drain, then close
            drop(msg_tx);
            if tokio::time::timeout(CLOSE_GRACE, &mut sender_task).await.is_err() {
                sender_task.abort();
            }

            // Remove client
            if let Some(client) = clients.write().await.remove(&addr) {
                info!(
                    frames = client.frames,
                    connected_secs = client.connected_at.elapsed().as_secs(),
                    "Client {} cleaned up", addr
                );
            }
        });
    }

    /// Periodically drop per-player locks nobody holds.
    async fn run_maintenance_loop(dispatcher: Arc<Dispatcher<S>>, clients: Clients, period: Duration) {
        let mut interval = interval(period);

        loop {
            interval.tick().await;

            let pruned = dispatcher.locks().prune();
            let (connections, idlest) = {
                let clients = clients.read().await;
                let idlest = clients
                    .values()
                    .map(|c| c.last_activity.elapsed().as_secs())
                    .max()
                    .unwrap_or(0);
                (clients.len(), idlest)
            };

            debug!(pruned, connections, idlest_secs = idlest, "Maintenance pass");
        }
    }
}
