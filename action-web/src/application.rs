//! Core application framework functionality.

use crate::config::ApplicationConfig;
use crate::context::ServerContext;
use crate::dispatcher::Dispatcher;
use crate::error::ErrorPtr;
use crate::registry::{ControllerRegistry, RegistryError};
use crate::router::DispatcherRouterBootstrap;
use crate::routes::{RouteTable, RouteTableBuilder};
use crate::server::{
    CtrlCSignalSource, DefaultServerBootstrap, ServerBootstrap, ServerRunner, ShutdownSignalSource,
};
use crate::view::{DefaultErrorRenderer, ErrorRenderer, FileViewResolver, ViewResolver};
use config::ConfigError;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("Error loading configuration: {0}")]
    ConfigError(#[source] ConfigError),
    #[error("Error registering controllers: {0}")]
    RegistryError(#[source] RegistryError),
    #[error("Error running servers: {0}")]
    ServerError(#[source] ErrorPtr),
}

/// Creates an [Application] with configuration loaded from the environment and all controllers
/// registered with the `#[controller]` attribute.
pub fn create_default() -> Result<Application, ApplicationError> {
    let config =
        ApplicationConfig::init_from_environment().map_err(ApplicationError::ConfigError)?;
    let registry = ControllerRegistry::from_static().map_err(ApplicationError::RegistryError)?;

    Ok(Application::new(config, registry))
}

/// Main entrypoint for the application. Builds routes from configured action mappings and runs
/// servers dispatching requests to them. Collaborators can be replaced before running.
pub struct Application {
    config: ApplicationConfig,
    registry: ControllerRegistry,
    view_resolver: Option<Arc<dyn ViewResolver + Send + Sync>>,
    error_renderer: Option<Arc<dyn ErrorRenderer + Send + Sync>>,
    server_bootstrap: Option<Arc<dyn ServerBootstrap + Send + Sync>>,
    shutdown_signal_source: Option<Arc<dyn ShutdownSignalSource + Send + Sync>>,
}

impl Application {
    pub fn new(config: ApplicationConfig, registry: ControllerRegistry) -> Self {
        Self {
            config,
            registry,
            view_resolver: None,
            error_renderer: None,
            server_bootstrap: None,
            shutdown_signal_source: None,
        }
    }

    pub fn config(&self) -> &ApplicationConfig {
        &self.config
    }

    pub fn registry(&self) -> &ControllerRegistry {
        &self.registry
    }

    /// Replaces the default [FileViewResolver].
    pub fn with_view_resolver(
        mut self,
        view_resolver: Arc<dyn ViewResolver + Send + Sync>,
    ) -> Self {
        self.view_resolver = Some(view_resolver);
        self
    }

    /// Replaces the default [DefaultErrorRenderer].
    pub fn with_error_renderer(
        mut self,
        error_renderer: Arc<dyn ErrorRenderer + Send + Sync>,
    ) -> Self {
        self.error_renderer = Some(error_renderer);
        self
    }

    pub fn with_server_bootstrap(
        mut self,
        server_bootstrap: Arc<dyn ServerBootstrap + Send + Sync>,
    ) -> Self {
        self.server_bootstrap = Some(server_bootstrap);
        self
    }

    /// Replaces the default Ctrl-C shutdown.
    pub fn with_shutdown_signal_source(
        mut self,
        shutdown_signal_source: Arc<dyn ShutdownSignalSource + Send + Sync>,
    ) -> Self {
        self.shutdown_signal_source = Some(shutdown_signal_source);
        self
    }

    /// Builds routes from the configured action mappings.
    pub fn build_routes(&self) -> RouteTable {
        RouteTableBuilder::new(&self.registry).build(self.config.web.actions.init_params())
    }

    pub fn create_server_context(&self) -> ServerContext {
        let view_resolver = self.view_resolver.clone().unwrap_or_else(|| {
            Arc::new(FileViewResolver::new(self.config.web.view_root.clone()))
        });
        let error_renderer = self
            .error_renderer
            .clone()
            .unwrap_or_else(|| Arc::new(DefaultErrorRenderer));

        ServerContext::new(self.config.web.clone(), view_resolver, error_renderer)
    }

    pub fn create_dispatcher(&self) -> Dispatcher {
        Dispatcher::new(
            Arc::new(self.build_routes()),
            Arc::new(self.create_server_context()),
        )
    }

    /// Runs all configured servers until they're shut down.
    pub async fn run(&mut self) -> Result<(), ApplicationError> {
        if self.config.install_tracing_logger {
            install_tracing_logger();
        }

        info!("Building routes...");

        let dispatcher = self.create_dispatcher();
        info!("Mapped {} action(s)", dispatcher.routes().len());

        let runner = ServerRunner::new(
            self.server_bootstrap
                .clone()
                .unwrap_or_else(|| Arc::new(DefaultServerBootstrap)),
            Arc::new(DispatcherRouterBootstrap::new(Arc::new(dispatcher))),
            self.shutdown_signal_source
                .clone()
                .unwrap_or_else(|| Arc::new(CtrlCSignalSource)),
        );

        runner
            .run(&self.config.web)
            .await
            .map_err(ApplicationError::ServerError)
    }
}

// a subscriber might already be installed by the application itself
fn install_tracing_logger() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .try_init();
}
