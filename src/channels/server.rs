//! HTTP server host for the front-end routers.
//!
//! Front ends contribute route fragments; a single `start()` merges them,
//! binds the listener and spawns the server task.

use std::net::SocketAddr;

use axum::Router;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::error::ChannelError;

/// Configuration for the HTTP server.
pub struct HttpServerConfig {
    /// Name used in logs and errors.
    pub name: &'static str,
    /// Address to bind the server to.
    pub addr: SocketAddr,
}

/// A single HTTP server that hosts the routes of one front end.
pub struct HttpServer {
    config: HttpServerConfig,
    routes: Vec<Router>,
    local_addr: Option<SocketAddr>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl HttpServer {
    pub fn new(config: HttpServerConfig) -> Self {
        Self {
            config,
            routes: Vec::new(),
            local_addr: None,
            shutdown_tx: None,
            handle: None,
        }
    }

    /// Accumulate a route fragment. Each fragment should already have its
    /// state applied via `.with_state()`.
    pub fn add_routes(&mut self, router: Router) {
        self.routes.push(router);
    }

    /// Bind the listener, merge all route fragments, and spawn the server.
    pub async fn start(&mut self) -> Result<SocketAddr, ChannelError> {
        let mut app = Router::new();
        for fragment in self.routes.drain(..) {
            app = app.merge(fragment);
        }
        let app = app.layer(TraceLayer::new_for_http());

        let listener = tokio::net::TcpListener::bind(self.config.addr)
            .await
            .map_err(|e| ChannelError::StartupFailed {
                name: self.config.name.to_string(),
                reason: format!("Failed to bind to {}: {}", self.config.addr, e),
            })?;
        let local_addr = listener.local_addr()?;
        self.local_addr = Some(local_addr);

        tracing::info!("{} listening on http://{}", self.config.name, local_addr);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        self.shutdown_tx = Some(shutdown_tx);

        let name = self.config.name;
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                    tracing::info!("{} shutting down", name);
                })
                .await
            {
                tracing::error!("{} server error: {}", name, e);
            }
        });

        self.handle = Some(handle);
        Ok(local_addr)
    }

    /// The bound address, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Start, then serve until Ctrl-C.
    pub async fn run_until_ctrl_c(mut self) -> Result<(), ChannelError> {
        self.start().await?;
        tokio::signal::ctrl_c().await?;
        self.shutdown().await;
        Ok(())
    }

    /// Signal graceful shutdown and wait for the server task to finish.
    pub async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::routing::get;

    use super::*;

    #[tokio::test]
    async fn test_start_serves_merged_routes() {
        let mut server = HttpServer::new(HttpServerConfig {
            name: "test",
            addr: "127.0.0.1:0".parse().unwrap(),
        });
        server.add_routes(Router::new().route("/a", get(|| async { "a" })));
        server.add_routes(Router::new().route("/b", get(|| async { "b" })));

        let addr = server.start().await.unwrap();
        assert_eq!(server.local_addr(), Some(addr));

        let body = reqwest::get(format!("http://{}/b", addr))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "b");

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut server = HttpServer::new(HttpServerConfig {
            name: "test",
            addr: taken.local_addr().unwrap(),
        });

        let err = server.start().await.unwrap_err();
        assert!(matches!(err, ChannelError::StartupFailed { .. }));
    }
}
