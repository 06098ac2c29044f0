//! The session manager — lifecycle owner for tool-provider connections.
//!
//! Each connection owns a scoped resource stack. Resources are pushed as
//! they are acquired and released in reverse order, both on the connect
//! failure path and on disconnect, so a half-built connection never leaks
//! a handle.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use falconer_core::error::SessionError;

use crate::session::Session;
use crate::transport::{LaunchParams, Transport, TransportFactory};

/// A resource acquired during connection setup, releasable exactly once.
#[async_trait]
pub trait ScopedResource: Send + Sync {
    /// Label used in release logging.
    fn label(&self) -> &str;

    /// Release the resource.
    async fn release(&self) -> Result<(), SessionError>;
}

/// A LIFO stack of scoped resources.
///
/// `release_all` tolerates and logs individual failures so one bad
/// resource cannot block cleanup of the rest.
#[derive(Default)]
pub struct ResourceStack {
    resources: Vec<Box<dyn ScopedResource>>,
}

impl ResourceStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, resource: Box<dyn ScopedResource>) {
        self.resources.push(resource);
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Release every resource in reverse acquisition order.
    pub async fn release_all(&mut self) {
        while let Some(resource) = self.resources.pop() {
            if let Err(e) = resource.release().await {
                warn!(resource = resource.label(), error = %e, "resource release failed");
            } else {
                debug!(resource = resource.label(), "released resource");
            }
        }
    }
}

struct TransportResource {
    transport: Arc<dyn Transport>,
}

#[async_trait]
impl ScopedResource for TransportResource {
    fn label(&self) -> &str {
        "transport"
    }
    async fn release(&self) -> Result<(), SessionError> {
        self.transport.close().await
    }
}

struct SessionResource {
    session: Arc<Session>,
}

#[async_trait]
impl ScopedResource for SessionResource {
    fn label(&self) -> &str {
        "session"
    }
    async fn release(&self) -> Result<(), SessionError> {
        self.session.close();
        Ok(())
    }
}

/// A live connection to one tool provider.
struct Connection {
    transport: Arc<dyn Transport>,
    session: Option<Arc<Session>>,
    resources: ResourceStack,
}

/// Owns the lifecycle of provider connections and their sessions.
///
/// A provider_id maps to at most one live connection, and each connection
/// to at most one live session.
pub struct SessionManager {
    factory: Arc<dyn TransportFactory>,
    connections: RwLock<HashMap<String, Connection>>,
}

impl SessionManager {
    pub fn new(factory: Arc<dyn TransportFactory>) -> Self {
        Self {
            factory,
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Connect to a provider: launch and open a transport.
    ///
    /// On any failure after a resource was acquired, already-acquired
    /// resources are released (LIFO) before the error propagates — the
    /// failure path leaks no handles.
    pub async fn connect(
        &self,
        provider_id: &str,
        params: &LaunchParams,
    ) -> Result<(), SessionError> {
        let mut resources = ResourceStack::new();

        let transport = self.factory.launch(provider_id, params).await?;
        resources.push(Box::new(TransportResource {
            transport: transport.clone(),
        }));

        if let Err(e) = transport.open().await {
            warn!(provider_id, error = %e, "transport open failed, releasing partial resources");
            resources.release_all().await;
            return Err(SessionError::ConnectFailed {
                provider_id: provider_id.to_string(),
                reason: e.to_string(),
            });
        }

        info!(provider_id, "connected to tool provider");
        let previous = self.connections.write().await.insert(
            provider_id.to_string(),
            Connection {
                transport,
                session: None,
                resources,
            },
        );
        if let Some(mut previous) = previous {
            warn!(provider_id, "replacing existing connection");
            previous.resources.release_all().await;
        }
        Ok(())
    }

    /// Whether a live connection exists for the provider.
    pub async fn is_connected(&self, provider_id: &str) -> bool {
        self.connections.read().await.contains_key(provider_id)
    }

    /// Create a session on an existing connection: perform the protocol
    /// handshake and store the session against the connection.
    ///
    /// Fails with [`SessionError::NoConnection`] if `connect` has not
    /// succeeded for this provider. A handshake failure leaves the
    /// connection itself intact.
    pub async fn create_session(&self, provider_id: &str) -> Result<Arc<Session>, SessionError> {
        let transport = {
            let connections = self.connections.read().await;
            let conn = connections
                .get(provider_id)
                .ok_or_else(|| SessionError::NoConnection(provider_id.to_string()))?;
            conn.transport.clone()
        };

        let session = Arc::new(Session::new(provider_id, transport));
        session.initialize().await?;

        let mut connections = self.connections.write().await;
        let conn = connections
            .get_mut(provider_id)
            .ok_or_else(|| SessionError::NoConnection(provider_id.to_string()))?;
        conn.resources.push(Box::new(SessionResource {
            session: session.clone(),
        }));
        conn.session = Some(session.clone());

        debug!(provider_id, "session created");
        Ok(session)
    }

    /// Return the existing live session for the provider, or create one.
    ///
    /// Not idempotent under concurrent callers: two tasks racing on the
    /// same provider_id can both run the handshake, and the later one
    /// wins. Callers must serialize access per provider_id.
    pub async fn get_or_create_session(
        &self,
        provider_id: &str,
    ) -> Result<Arc<Session>, SessionError> {
        {
            let connections = self.connections.read().await;
            let conn = connections
                .get(provider_id)
                .ok_or_else(|| SessionError::NoConnection(provider_id.to_string()))?;
            if let Some(session) = &conn.session {
                if !session.is_closed() {
                    return Ok(session.clone());
                }
            }
        }
        self.create_session(provider_id).await
    }

    /// The existing live session for a provider, if any.
    pub async fn session(&self, provider_id: &str) -> Option<Arc<Session>> {
        let connections = self.connections.read().await;
        connections
            .get(provider_id)
            .and_then(|c| c.session.clone())
            .filter(|s| !s.is_closed())
    }

    /// Disconnect one provider, releasing its resources in reverse
    /// acquisition order.
    pub async fn disconnect(&self, provider_id: &str) {
        let conn = self.connections.write().await.remove(provider_id);
        if let Some(mut conn) = conn {
            conn.resources.release_all().await;
            info!(provider_id, "disconnected tool provider");
        }
    }

    /// Disconnect every provider. Individual release failures are logged
    /// and tolerated so one bad provider cannot block cleanup of the rest.
    pub async fn disconnect_all(&self) {
        let drained: Vec<(String, Connection)> =
            self.connections.write().await.drain().collect();
        for (provider_id, mut conn) in drained {
            conn.resources.release_all().await;
            info!(provider_id = %provider_id, "disconnected tool provider");
        }
    }

    /// IDs of all connected providers.
    pub async fn provider_ids(&self) -> Vec<String> {
        self.connections.read().await.keys().cloned().collect()
    }
}
