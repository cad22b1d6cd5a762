//! HTTP serving shell: landing page, metrics endpoint and health check.

use std::fs::File;
use std::io::BufReader;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use hyper_util::service::TowerToHyperService;
use sonic_exporter_common::CONTENT_TYPE as EXPOSITION_CONTENT_TYPE;
use sonic_exporter_framework::Scraper;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tokio_rustls::TlsAcceptor;
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio_rustls::rustls::server::WebPkiClientVerifier;
use tokio_rustls::rustls::{self, RootCertStore, ServerConfig};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use crate::config::{TlsConfig, WebConfig};

/// Fatal errors while starting or running the HTTP server.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("Failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
    #[error("Invalid listen address: {0}")]
    Address(String),
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("No certificate found in {}", .0.display())]
    NoCertificate(PathBuf),
    #[error("No private key found in {}", .0.display())]
    NoPrivateKey(PathBuf),
    #[error("Invalid TLS configuration: {0}")]
    Tls(#[from] rustls::Error),
    #[error("Invalid client CA: {0}")]
    ClientVerifier(#[from] rustls::server::VerifierBuilderError),
    #[error("HTTP server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    scraper: Arc<Scraper>,
    metrics_path: Arc<str>,
    in_flight: Option<Arc<Semaphore>>,
}

/// Create the HTTP router.
pub fn create_router(scraper: Arc<Scraper>, metrics_path: &str, max_in_flight: usize) -> Router {
    let state = AppState {
        scraper,
        metrics_path: Arc::from(metrics_path),
        in_flight: (max_in_flight > 0).then(|| Arc::new(Semaphore::new(max_in_flight))),
    };

    Router::new()
        .route("/", get(index_handler))
        .route(metrics_path, get(metrics_handler))
        .route("/health", get(health_handler))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Handler for the landing page.
async fn index_handler(State(state): State<AppState>) -> Html<String> {
    Html(format!(
        "<html>\n\
         <head><title>Sonic Exporter</title></head>\n\
         <body>\n\
         <h1>Sonic Exporter</h1>\n\
         <p><a href=\"{path}\">Metrics</a></p>\n\
         </body>\n\
         </html>\n",
        path = state.metrics_path
    ))
}

/// Handler for the metrics endpoint.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    let _permit = match &state.in_flight {
        Some(semaphore) => match semaphore.clone().try_acquire_owned() {
            Ok(permit) => Some(permit),
            Err(_) => {
                warn!("Rejecting scrape: too many requests in flight");
                return (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "too many scrapes in flight\n",
                )
                    .into_response();
            }
        },
        None => None,
    };

    let body = state.scraper.render().await;

    (
        StatusCode::OK,
        [(CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
        body,
    )
        .into_response()
}

/// Handler for the /health endpoint.
async fn health_handler() -> Response {
    (StatusCode::OK, "healthy\n").into_response()
}

/// Build the TLS acceptor from PEM files.
pub fn tls_acceptor(tls: &TlsConfig) -> Result<TlsAcceptor, ServeError> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());

    let certs = load_certs(&tls.cert_file)?;
    let key = load_private_key(&tls.key_file)?;

    let builder =
        ServerConfig::builder_with_provider(provider.clone()).with_safe_default_protocol_versions()?;

    let builder = match &tls.client_ca_file {
        Some(ca_file) => {
            let mut roots = RootCertStore::empty();
            for cert in load_certs(ca_file)? {
                roots.add(cert)?;
            }
            let verifier =
                WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider).build()?;
            builder.with_client_cert_verifier(verifier)
        }
        None => builder.with_no_client_auth(),
    };

    let mut config = builder.with_single_cert(certs, key)?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
    Ok(TlsAcceptor::from(Arc::new(config)))
}

fn open(path: &Path) -> Result<BufReader<File>, ServeError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| ServeError::Read {
            path: path.to_path_buf(),
            source,
        })
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, ServeError> {
    let certs = rustls_pemfile::certs(&mut open(path)?)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| ServeError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    if certs.is_empty() {
        return Err(ServeError::NoCertificate(path.to_path_buf()));
    }
    Ok(certs)
}

fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, ServeError> {
    rustls_pemfile::private_key(&mut open(path)?)
        .map_err(|source| ServeError::Read {
            path: path.to_path_buf(),
            source,
        })?
        .ok_or_else(|| ServeError::NoPrivateKey(path.to_path_buf()))
}

/// Wait until the shutdown flag is raised or its sender is gone.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            break;
        }
        if shutdown.changed().await.is_err() {
            break;
        }
    }
}

/// HTTP server bound to its listener.
///
/// Binding and TLS setup happen in [`HttpServer::bind`] so that startup
/// failures surface before the server is spawned.
pub struct HttpServer {
    listener: TcpListener,
    router: Router,
    tls: Option<TlsAcceptor>,
    metrics_path: String,
}

impl HttpServer {
    /// Bind the listener and load TLS material.
    ///
    /// Hostnames are resolved here; the first resolved address that binds wins.
    pub async fn bind(scraper: Arc<Scraper>, web: &WebConfig) -> Result<Self, ServeError> {
        let addr = web
            .bind_address()
            .map_err(|_| ServeError::Address(web.listen_address.clone()))?;

        let tls = web.tls.as_ref().map(tls_acceptor).transpose()?;

        let listener = TcpListener::bind(addr.as_str())
            .await
            .map_err(|source| ServeError::Bind { addr, source })?;

        Ok(Self {
            listener,
            router: create_router(scraper, &web.metrics_path, web.max_requests_in_flight),
            tls,
            metrics_path: web.metrics_path.clone(),
        })
    }

    /// Address the server is listening on.
    pub fn local_addr(&self) -> Result<SocketAddr, ServeError> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the HTTP server until the shutdown signal is received.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<(), ServeError> {
        let addr = self.local_addr()?;
        info!(
            addr = %addr,
            path = %self.metrics_path,
            tls = self.tls.is_some(),
            "HTTP server listening"
        );

        match self.tls {
            None => {
                axum::serve(self.listener, self.router)
                    .with_graceful_shutdown(async move {
                        shutdown_requested(&mut shutdown).await;
                        info!("HTTP server shutting down");
                    })
                    .await?;
            }
            Some(acceptor) => {
                let mut connections = JoinSet::new();
                loop {
                    tokio::select! {
                        accepted = self.listener.accept() => match accepted {
                            Ok((stream, peer)) => {
                                connections.spawn(serve_tls(
                                    stream,
                                    peer,
                                    acceptor.clone(),
                                    self.router.clone(),
                                    shutdown.clone(),
                                ));
                            }
                            Err(e) => warn!(error = %e, "Failed to accept connection"),
                        },
                        Some(_) = connections.join_next(), if !connections.is_empty() => {}
                        _ = shutdown_requested(&mut shutdown) => {
                            info!("HTTP server shutting down");
                            break;
                        }
                    }
                }
                drop(self.listener);
                // Open connections finish their in-flight requests.
                while connections.join_next().await.is_some() {}
            }
        }

        info!("HTTP server stopped");
        Ok(())
    }
}

/// Serve one TLS connection, draining it gracefully on shutdown.
async fn serve_tls(
    stream: TcpStream,
    peer: SocketAddr,
    acceptor: TlsAcceptor,
    router: Router,
    mut shutdown: watch::Receiver<bool>,
) {
    let stream = match acceptor.accept(stream).await {
        Ok(stream) => stream,
        Err(e) => {
            debug!(peer = %peer, error = %e, "TLS handshake failed");
            return;
        }
    };

    let builder = auto::Builder::new(TokioExecutor::new());
    let connection =
        builder.serve_connection(TokioIo::new(stream), TowerToHyperService::new(router));
    tokio::pin!(connection);

    let result = tokio::select! {
        result = connection.as_mut() => result,
        _ = shutdown_requested(&mut shutdown) => {
            connection.as_mut().graceful_shutdown();
            connection.await
        }
    };

    // A scrape whose client went away surfaces here as a failed body write.
    if let Err(e) = result {
        debug!(
            peer = %peer,
            error = %e,
            "Connection failed while reading a request or writing a response"
        );
    }
}
