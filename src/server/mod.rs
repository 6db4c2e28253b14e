// Server module - hyper HTTP/1.1 accept loop with graceful shutdown

use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::api::{ApiRequest, RenderApi};
use crate::config::ServerConfig;
use crate::error::RenderError;

/// Per-request limits applied before the API sees a request
#[derive(Debug, Clone, Copy)]
struct Limits {
    max_body_size: usize,
    request_timeout: Duration,
}

pub struct RenderServer {
    api: Arc<RenderApi>,
    address: String,
    limits: Limits,
}

impl RenderServer {
    pub fn new(api: RenderApi, config: &ServerConfig) -> Self {
        Self {
            api: Arc::new(api),
            address: format!("{}:{}", config.address, config.port),
            limits: Limits {
                max_body_size: config.max_body_size,
                request_timeout: Duration::from_secs(config.request_timeout),
            },
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub async fn bind(&self) -> std::io::Result<TcpListener> {
        TcpListener::bind(&self.address).await
    }

    /// Binds the configured address and serves until Ctrl-C or SIGTERM.
    pub async fn run(self) -> std::io::Result<()> {
        let listener = self.bind().await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Accepts connections until `shutdown` resolves, then waits for
    /// in-flight connections to finish.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()>,
    ) -> std::io::Result<()> {
        let local_addr = listener.local_addr()?;
        tracing::info!(address = %local_addr, render_path = %self.api.render_path(), "Listening");

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            tracing::warn!(error = %e, "Failed to accept connection");
                            continue;
                        }
                    };
                    let api = Arc::clone(&self.api);
                    let limits = self.limits;
                    let mut shutdown_rx = shutdown_rx.clone();

                    tokio::spawn(async move {
                        let service = service_fn(move |req| {
                            let api = Arc::clone(&api);
                            async move { Ok::<_, Infallible>(handle(&api, req, peer, limits).await) }
                        });
                        let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
                        tokio::pin!(conn);

                        let result = tokio::select! {
                            result = conn.as_mut() => result,
                            _ = shutdown_rx.changed() => {
                                conn.as_mut().graceful_shutdown();
                                conn.as_mut().await
                            }
                        };
                        if let Err(e) = result {
                            tracing::debug!(peer = %peer, error = %e, "Connection closed with error");
                        }
                    });
                }
                _ = &mut shutdown => {
                    tracing::info!("Shutdown signal received, draining connections");
                    break;
                }
            }
        }

        drop(listener);
        drop(shutdown_rx);
        let _ = shutdown_tx.send(true);
        shutdown_tx.closed().await;
        tracing::info!("Server stopped");
        Ok(())
    }
}

async fn handle(
    api: &RenderApi,
    req: Request<Incoming>,
    peer: SocketAddr,
    limits: Limits,
) -> Response<Full<Bytes>> {
    let (parts, body) = req.into_parts();

    let body = match Limited::new(body, limits.max_body_size).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            let err = if e.downcast_ref::<http_body_util::LengthLimitError>().is_some() {
                RenderError::BadRequest(format!(
                    "Request body exceeds the maximum of {} bytes",
                    limits.max_body_size
                ))
            } else {
                RenderError::BadRequest(format!("Failed to read request body: {}", e))
            };
            return api.error_response(&err).map(Full::new);
        }
    };

    let request = ApiRequest {
        method: parts.method,
        uri: parts.uri,
        headers: parts.headers,
        body,
        peer_addr: Some(peer),
    };

    match tokio::time::timeout(limits.request_timeout, api.handle(request)).await {
        Ok(response) => response.map(Full::new),
        Err(_) => {
            tracing::warn!(peer = %peer, timeout_secs = limits.request_timeout.as_secs(), "Request timed out");
            api.error_response(&RenderError::Processing(format!(
                "Request timed out after {} seconds",
                limits.request_timeout.as_secs()
            )))
            .map(Full::new)
        }
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
