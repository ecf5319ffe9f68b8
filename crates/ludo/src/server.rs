//! `LudoServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → presence → room.

use std::sync::Arc;
use std::time::Duration;

use ludo_presence::SessionRegistry;
use ludo_protocol::{Codec, JsonCodec};
use ludo_room::{MemoryRoomStore, RoomCoordinator, RoomStore};
use ludo_transport::{Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{LudoError, ServerConfig};

/// The coordinator as the server shares it: one instance, one registry.
pub type SharedCoordinator<S> = Arc<RoomCoordinator<S, Arc<SessionRegistry>>>;

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<S: RoomStore, C: Codec> {
    pub(crate) coordinator: SharedCoordinator<S>,
    pub(crate) presence: Arc<SessionRegistry>,
    pub(crate) codec: C,
    pub(crate) idle_timeout: Duration,
}

/// Builder for configuring and starting a Ludo server.
///
/// # Example
///
/// ```rust,ignore
/// use ludo::prelude::*;
///
/// let server = LudoServer::builder()
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct LudoServerBuilder {
    config: ServerConfig,
}

impl LudoServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config = self.config.bind(addr);
        self
    }

    /// Sets how long a silent connection is kept open.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.idle_timeout(timeout);
        self
    }

    /// Binds the listener with the in-memory room store.
    pub async fn build(self) -> Result<LudoServer<MemoryRoomStore, JsonCodec>, LudoError> {
        self.build_with_store(MemoryRoomStore::new()).await
    }

    /// Binds the listener with a caller-supplied room store.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build_with_store<S: RoomStore>(
        self,
        store: S,
    ) -> Result<LudoServer<S, JsonCodec>, LudoError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let presence = Arc::new(SessionRegistry::new());
        let coordinator = Arc::new(RoomCoordinator::with_config(
            store,
            Arc::clone(&presence),
            self.config.coordinator(),
        ));

        let state = Arc::new(ServerState {
            coordinator,
            presence,
            codec: JsonCodec,
            idle_timeout: self.config.idle_timeout,
        });

        Ok(LudoServer { transport, state })
    }
}

impl Default for LudoServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Ludo server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct LudoServer<S: RoomStore, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<S, C>>,
}

impl LudoServer<MemoryRoomStore, JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> LudoServerBuilder {
        LudoServerBuilder::new()
    }
}

impl<S, C> LudoServer<S, C>
where
    S: RoomStore,
    C: Codec,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The coordinator every connection shares. Lifecycle moves that do
    /// not come from a client go through here.
    pub fn coordinator(&self) -> SharedCoordinator<S> {
        Arc::clone(&self.state.coordinator)
    }

    /// The live-session registry.
    pub fn presence(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.state.presence)
    }

    /// Runs the accept loop until the process is terminated.
    ///
    /// Each accepted connection gets its own handler task.
    pub async fn run(mut self) -> Result<(), LudoError> {
        tracing::info!(addr = ?self.local_addr().ok(), "Ludo server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
