//! Core server-related functionality.

use crate::config::{ServerConfig, WebConfig};
use crate::error::{convert_error, ErrorPtr};
use crate::future::{BoxFuture, FutureExt};
use crate::router::RouterBootstrap;
use derive_more::Constructor;
use futures::future::try_join_all;
use hyper::server::conn::AddrIncoming;
use hyper::server::Builder;
use hyper::Error as HyperError;
#[cfg(test)]
use mockall::automock;
use std::future::Future;
use std::net::AddrParseError;
use std::sync::Arc;
use thiserror::Error;
use tokio::signal;
use tokio::sync::broadcast::{self, Sender};
use tracing::{info, warn};

/// Errors related to bootstrapping servers.
#[derive(Error, Debug)]
pub enum ServerBootstrapError {
    #[error("Error parsing listen address: {0}")]
    ListenAddressParseError(AddrParseError),
    #[error("Error binding server: {0}")]
    BindError(#[source] HyperError),
    #[error("Error configuring router: {0}")]
    RouterError(#[source] ErrorPtr),
    #[error("Error registering shutdown signal: {0}")]
    ShutdownSignalError(#[source] ErrorPtr),
}

/// Trait for creating web servers from [ServerConfig]. Implement this trait to override the
/// default bootstrap.
pub trait ServerBootstrap {
    /// Create a [Builder] which will them be used to create a web server.
    fn bootstrap_server(
        &self,
        config: &ServerConfig,
    ) -> BoxFuture<'_, Result<Builder<AddrIncoming>, ServerBootstrapError>>;
}

/// Binds servers to their configured listen addresses.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultServerBootstrap;

impl ServerBootstrap for DefaultServerBootstrap {
    fn bootstrap_server(
        &self,
        config: &ServerConfig,
    ) -> BoxFuture<'_, Result<Builder<AddrIncoming>, ServerBootstrapError>> {
        let listen_address = config.listen_address.clone();

        async move {
            axum::Server::try_bind(
                &listen_address
                    .parse()
                    .map_err(ServerBootstrapError::ListenAddressParseError)?,
            )
            .map_err(ServerBootstrapError::BindError)
        }
        .boxed()
    }
}

/// Sender used to gracefully shut down all running servers.
pub type ShutdownSignalSender = Sender<()>;

/// Source of the signal to shut down running servers.
#[cfg_attr(test, automock)]
pub trait ShutdownSignalSource {
    /// Registers given sender, which should be used to send the shutdown signal.
    fn register_shutdown(&self, shutdown_sender: ShutdownSignalSender) -> Result<(), ErrorPtr>;
}

/// Shuts down servers on Ctrl-C.
#[derive(Clone, Copy, Debug, Default)]
pub struct CtrlCSignalSource;

impl ShutdownSignalSource for CtrlCSignalSource {
    fn register_shutdown(&self, shutdown_sender: ShutdownSignalSender) -> Result<(), ErrorPtr> {
        tokio::spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => {
                    info!("Shutting down servers...");
                    let _ = shutdown_sender.send(());
                }
                Err(error) => warn!(%error, "Cannot listen for shutdown signal"),
            }
        });

        Ok(())
    }
}

/// Runs all configured servers until they're shut down.
#[derive(Constructor)]
pub struct ServerRunner {
    server_bootstrap: Arc<dyn ServerBootstrap + Send + Sync>,
    router_bootstrap: Arc<dyn RouterBootstrap + Send + Sync>,
    shutdown_signal_source: Arc<dyn ShutdownSignalSource + Send + Sync>,
}

impl ServerRunner {
    pub async fn run(&self, config: &WebConfig) -> Result<(), ErrorPtr> {
        let (shutdown_sender, _) = broadcast::channel(1);

        let servers = self
            .create_servers(config, &shutdown_sender)
            .await
            .map_err(convert_error)?;

        self.shutdown_signal_source
            .register_shutdown(shutdown_sender.clone())
            .map_err(ServerBootstrapError::ShutdownSignalError)
            .map_err(convert_error)?;

        info!("Running {} server(s)...", servers.len());

        try_join_all(servers.into_iter()).await.map(|_| ())
    }

    async fn create_server(
        &self,
        config: &ServerConfig,
        server_name: &str,
        shutdown_sender: &ShutdownSignalSender,
    ) -> Result<impl Future<Output = Result<(), ErrorPtr>>, ServerBootstrapError> {
        let router = self
            .router_bootstrap
            .bootstrap_router(server_name)
            .map_err(ServerBootstrapError::RouterError)?;

        let mut shutdown_receiver = shutdown_sender.subscribe();
        let server_name = server_name.to_string();

        self.server_bootstrap
            .bootstrap_server(config)
            .await
            .map(move |builder| async move {
                info!(%server_name, "Server started");

                builder
                    .serve(router.into_make_service())
                    .with_graceful_shutdown(async move {
                        let _ = shutdown_receiver.recv().await;
                    })
                    .await
                    .map_err(convert_error)
            })
    }

    async fn create_servers(
        &self,
        config: &WebConfig,
        shutdown_sender: &ShutdownSignalSender,
    ) -> Result<Vec<impl Future<Output = Result<(), ErrorPtr>>>, ServerBootstrapError> {
        let mut result = Vec::with_capacity(config.servers.len());
        for (server_name, config) in config.servers.iter() {
            result.push(
                self.create_server(config, server_name, shutdown_sender)
                    .await?,
            );
        }

        Ok(result)
    }
}
