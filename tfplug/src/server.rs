//! Server module for running Terraform providers
//!
//! This module provides functionality to start a Terraform provider server
//! with TLS support and proper protocol handshake.

use crate::error::{Result, TfplugError};
use crate::grpc::GrpcProviderServer;
use crate::proto::ProviderServer;
use crate::provider::Provider;
use std::path::PathBuf;
use std::time::Duration;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::{Identity, Server, ServerTlsConfig};

/// Environment variables that override the TLS file locations.
pub const CERT_PATH_ENV: &str = "TF_PLUGIN_CERT_PATH";
pub const KEY_PATH_ENV: &str = "TF_PLUGIN_KEY_PATH";

/// Server configuration for running a Terraform provider
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path to TLS certificate file
    pub cert_path: PathBuf,
    /// Path to TLS key file
    pub key_path: PathBuf,
    /// Maximum message size in bytes
    pub max_message_size: usize,
    /// Timeout for graceful shutdown after a stop request
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            cert_path: PathBuf::from("./certs/localhost.pem"),
            key_path: PathBuf::from("./certs/localhost-key.pem"),
            max_message_size: 256 << 20, // 256MB
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    /// Create a new server configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `TF_PLUGIN_CERT_PATH` / `TF_PLUGIN_KEY_PATH` when set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(path) = std::env::var(CERT_PATH_ENV) {
            self.cert_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var(KEY_PATH_ENV) {
            self.key_path = PathBuf::from(path);
        }
        self
    }

    /// Set the certificate path
    pub fn with_cert_path(mut self, path: PathBuf) -> Self {
        self.cert_path = path;
        self
    }

    /// Set the key path
    pub fn with_key_path(mut self, path: PathBuf) -> Self {
        self.key_path = path;
        self
    }

    /// Set the maximum message size
    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Set the shutdown timeout
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

/// Main entry point for running a provider
///
/// Prints the go-plugin handshake line on stdout once the listener is bound.
/// Nothing else may be written to stdout; logs belong on stderr.
pub async fn serve<P: Provider + 'static>(provider: P, config: ServerConfig) -> Result<()> {
    // Several crypto providers can be linked in; pick one explicitly.
    // A second install attempt (e.g. in tests) is harmless.
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let cert = tokio::fs::read(&config.cert_path).await.map_err(|e| {
        TfplugError::TlsError(format!(
            "Failed to read certificate {}: {}",
            config.cert_path.display(),
            e
        ))
    })?;
    let key = tokio::fs::read(&config.key_path).await.map_err(|e| {
        TfplugError::TlsError(format!(
            "Failed to read key {}: {}",
            config.key_path.display(),
            e
        ))
    })?;

    let identity = Identity::from_pem(cert, key);
    let tls_config = ServerTlsConfig::new().identity(identity);

    let grpc_server = GrpcProviderServer::new(provider);
    let ctx = grpc_server.context();
    let provider_service = ProviderServer::new(grpc_server)
        .max_decoding_message_size(config.max_message_size)
        .max_encoding_message_size(config.max_message_size);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    println!("1|6|tcp|127.0.0.1:{}|grpc", addr.port());
    tracing::info!(port = addr.port(), "provider server listening");

    let shutdown_ctx = ctx.clone();
    let shutdown = async move {
        shutdown_ctx.run(std::future::pending::<()>()).await;
        tracing::info!("provider stop received, shutting down");
    };

    let server = Server::builder()
        .tls_config(tls_config)?
        .add_service(provider_service)
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown);

    // Graceful shutdown waits for open connections; bound that wait.
    let shutdown_timeout = config.shutdown_timeout;
    let deadline = async move {
        ctx.run(std::future::pending::<()>()).await;
        tokio::time::sleep(shutdown_timeout).await;
    };

    tokio::select! {
        result = server => result.map_err(|e| {
            tracing::error!(error = %e, "provider server failed");
            TfplugError::from(e)
        }),
        _ = deadline => {
            tracing::warn!(?shutdown_timeout, "graceful shutdown timed out");
            Ok(())
        }
    }
}
