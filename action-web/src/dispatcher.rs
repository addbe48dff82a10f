//! Request-time resolution and invocation of actions.

use crate::attributes::ERROR_ATTRIBUTE;
use crate::context::{ActionContext, ServerContext};
use crate::error::ErrorPtr;
use crate::routes::{trim_extension, RouteTable};
use axum::body::Bytes;
use axum::http::Request;
use derive_more::Constructor;
use percent_encoding::percent_decode_str;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors aborting the processing of a request.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Action for '{path}' failed: {cause}")]
    ActionFailed {
        path: String,
        #[source]
        cause: ErrorPtr,
        /// Context of the failed request, with the cause set under
        /// [ERROR_ATTRIBUTE](crate::attributes::ERROR_ATTRIBUTE).
        context: Box<ActionContext>,
    },
}

impl DispatchError {
    /// Returns the original cause of the failure.
    pub fn cause(&self) -> &ErrorPtr {
        match self {
            DispatchError::ActionFailed { cause, .. } => cause,
        }
    }

    pub fn context(&self) -> &ActionContext {
        match self {
            DispatchError::ActionFailed { context, .. } => context,
        }
    }

    pub fn into_context(self) -> ActionContext {
        match self {
            DispatchError::ActionFailed { context, .. } => *context,
        }
    }
}

/// Successful result of dispatching a request.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// An action handled the request and the context contains the response.
    Handled(ActionContext),
    /// No action is mapped for the request path.
    NotFound,
}

/// Dispatches requests to actions from an immutable [RouteTable].
#[derive(Constructor, Debug)]
pub struct Dispatcher {
    routes: Arc<RouteTable>,
    server: Arc<ServerContext>,
}

impl Dispatcher {
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn server(&self) -> &Arc<ServerContext> {
        &self.server
    }

    /// Finds the action mapped to the percent-decoded request path (ignoring any file extension)
    /// and invokes it on a fresh controller. Any error or panic coming from the controller results
    /// in [DispatchError::ActionFailed].
    pub async fn dispatch(&self, request: Request<Bytes>) -> Result<DispatchOutcome, DispatchError> {
        let path = request_path(&request);
        let Some(entry) = self.routes.get(&path) else {
            debug!(%path, "No action mapped");
            return Ok(DispatchOutcome::NotFound);
        };

        debug!(
            %path,
            controller = entry.controller(),
            action = entry.action(),
            "Invoking action"
        );

        let context = ActionContext::new(request, self.server.clone());
        let (mut context, result) = entry.invoker().perform(context).await;

        match result {
            Ok(()) => Ok(DispatchOutcome::Handled(context)),
            Err(cause) => {
                let cause = ErrorPtr::from(cause);
                warn!(
                    %path,
                    controller = entry.controller(),
                    action = entry.action(),
                    %cause,
                    "Action failed"
                );

                context.set(ERROR_ATTRIBUTE, cause.clone());
                Err(DispatchError::ActionFailed {
                    path,
                    cause,
                    context: Box::new(context),
                })
            }
        }
    }
}

fn request_path(request: &Request<Bytes>) -> String {
    let path = percent_decode_str(request.uri().path()).decode_utf8_lossy();
    trim_extension(&path).to_string()
}
