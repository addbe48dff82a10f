//! Request-scoped [ActionContext] given to controllers, and the [ServerContext] shared by all
//! requests.
//!
//! The context gives actions access to the request and lets them build the response by handing
//! control over to pages. All page URLs are relative to the base URL of the context (`/` by
//! default, configurable via `web.base_url` or [ActionContext::set_base_url]):
//!
//! * [ActionContext::forward] - renders the page as the response body
//! * [ActionContext::include] - appends the rendered page to the response body
//! * [ActionContext::redirect] - sends a redirect to the page
//! * [ActionContext::error] - sends an error status with optional message

use crate::attributes::Attributes;
use crate::config::WebConfig;
use crate::error::ErrorPtr;
use crate::view::{DefaultErrorRenderer, ErrorRenderer, FileViewResolver, ViewResolver};
use axum::body::Bytes;
use axum::http::header::{CONTENT_TYPE, LOCATION};
use axum::http::{HeaderMap, HeaderValue, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use derivative::Derivative;
use derive_more::Constructor;
use once_cell::sync::Lazy;
use std::any::Any;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors related to handing control over to pages.
#[derive(Error, Debug)]
pub enum PageError {
    #[error("Cannot forward to page '{url}': {cause}")]
    Forward {
        url: String,
        #[source]
        cause: ErrorPtr,
    },
    #[error("Cannot include page '{url}': {cause}")]
    Include {
        url: String,
        #[source]
        cause: ErrorPtr,
    },
    #[error("Cannot redirect to page '{0}': invalid location")]
    Redirect(String),
}

/// State shared by all requests handled by a server - configuration and rendering collaborators.
#[derive(Derivative, Constructor)]
#[derivative(Debug)]
pub struct ServerContext {
    config: WebConfig,
    #[derivative(Debug = "ignore")]
    view_resolver: Arc<dyn ViewResolver + Send + Sync>,
    #[derivative(Debug = "ignore")]
    error_renderer: Arc<dyn ErrorRenderer + Send + Sync>,
}

impl ServerContext {
    /// Creates a context with the default collaborators: pages are read from the configured view
    /// root and failures are rendered as plain text.
    pub fn from_config(config: WebConfig) -> Self {
        let view_resolver = Arc::new(FileViewResolver::new(config.view_root.clone()));
        Self::new(config, view_resolver, Arc::new(DefaultErrorRenderer))
    }

    pub fn config(&self) -> &WebConfig {
        &self.config
    }

    pub fn view_resolver(&self) -> &Arc<dyn ViewResolver + Send + Sync> {
        &self.view_resolver
    }

    pub fn error_renderer(&self) -> &Arc<dyn ErrorRenderer + Send + Sync> {
        &self.error_renderer
    }
}

impl Default for ServerContext {
    fn default() -> Self {
        Self::from_config(Default::default())
    }
}

/// Response built by an action.
#[derive(Clone, Debug)]
pub struct ActionResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Default for ActionResponse {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: Default::default(),
            body: Default::default(),
        }
    }
}

impl IntoResponse for ActionResponse {
    fn into_response(self) -> Response {
        (self.status, self.headers, self.body).into_response()
    }
}

/// Context of a single request - the request itself, the response being built, request attributes
/// and the owning [ServerContext].
#[derive(Derivative)]
#[derivative(Debug)]
pub struct ActionContext {
    request: Request<Bytes>,
    response: ActionResponse,
    attributes: Attributes,
    base_url: String,
    #[derivative(Debug = "ignore")]
    server: Arc<ServerContext>,
}

// shared by all contexts which are not bound to a running server
static DETACHED_SERVER: Lazy<Arc<ServerContext>> = Lazy::new(Default::default);

impl Default for ActionContext {
    fn default() -> Self {
        Self::new(Default::default(), DETACHED_SERVER.clone())
    }
}

impl ActionContext {
    pub fn new(request: Request<Bytes>, server: Arc<ServerContext>) -> Self {
        Self {
            request,
            response: Default::default(),
            attributes: Default::default(),
            base_url: server.config().base_url.clone(),
            server,
        }
    }

    pub fn request(&self) -> &Request<Bytes> {
        &self.request
    }

    pub fn response(&self) -> &ActionResponse {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut ActionResponse {
        &mut self.response
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    pub fn server(&self) -> &Arc<ServerContext> {
        &self.server
    }

    /// Sets a request attribute, which will be available to rendered pages.
    pub fn set<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) {
        self.attributes.set(name, value);
    }

    /// Returns a request attribute of given type.
    pub fn attribute<T: Any + Send + Sync>(&self, name: &str) -> Option<&T> {
        self.attributes.get(name)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sets the base URL prepended to pages. Should include a trailing slash.
    pub fn set_base_url(&mut self, base_url: impl Into<String>) {
        self.base_url = base_url.into();
    }

    /// Returns the URL of a page under the base URL.
    pub fn page_url(&self, page: &str) -> String {
        let url = format!("{}{}", self.base_url, page);
        match url.strip_prefix("//") {
            Some(rest) => format!("/{rest}"),
            None => url,
        }
    }

    /// Renders given page (under the base URL) as the response body.
    pub async fn forward(&mut self, page: &str) -> Result<(), PageError> {
        let url = self.page_url(page);
        debug!(%url, "Forwarding to page");

        let view_resolver = self.server.view_resolver().clone();
        let view = view_resolver
            .render(&url, &self.attributes)
            .await
            .map_err(|cause| PageError::Forward { url, cause })?;

        if let Some(content_type) = view.content_type {
            self.response.headers.insert(CONTENT_TYPE, content_type);
        }

        self.response.body = view.body.to_vec();
        Ok(())
    }

    /// Renders given page (under the base URL) and appends it to the response body.
    pub async fn include(&mut self, page: &str) -> Result<(), PageError> {
        let url = self.page_url(page);
        debug!(%url, "Including page");

        let view_resolver = self.server.view_resolver().clone();
        let view = view_resolver
            .render(&url, &self.attributes)
            .await
            .map_err(|cause| PageError::Include { url, cause })?;

        if let Some(content_type) = view.content_type {
            self.response
                .headers
                .entry(CONTENT_TYPE)
                .or_insert(content_type);
        }

        self.response.body.extend_from_slice(&view.body);
        Ok(())
    }

    /// Redirects to given page (under the base URL). Attributes set for this request will not be
    /// available to the page.
    pub fn redirect(&mut self, page: &str) -> Result<(), PageError> {
        let url = self.page_url(page);
        let location =
            HeaderValue::from_str(&url).map_err(|_| PageError::Redirect(url.clone()))?;

        debug!(%url, "Redirecting to page");

        self.response.status = StatusCode::FOUND;
        self.response.headers.insert(LOCATION, location);
        self.response.body.clear();
        Ok(())
    }

    /// Sends an error status with an optional message as the body.
    pub fn error(&mut self, status: StatusCode, message: Option<&str>) {
        self.response.status = status;
        self.response.body = message
            .filter(|message| !message.is_empty())
            .map(|message| message.as_bytes().to_vec())
            .unwrap_or_default();
    }

    /// Converts the context into the built response.
    pub fn into_response(self) -> Response {
        self.response.into_response()
    }
}
