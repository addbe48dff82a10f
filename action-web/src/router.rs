//! Axum routing handling. By default, every request is passed to the [Dispatcher], which then
//! selects the action based on the request path.

use crate::dispatcher::{DispatchOutcome, Dispatcher};
use crate::error::ErrorPtr;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use derive_more::Constructor;
use std::sync::Arc;
use tracing::{debug, warn};

/// Trait for creating a [Router], usually passing requests to a [Dispatcher].
pub trait RouterBootstrap {
    /// Creates a new [Router].
    fn bootstrap_router(&self, server_name: &str) -> Result<Router, ErrorPtr>;
}

/// Creates routers passing all requests to the same [Dispatcher].
#[derive(Constructor)]
pub struct DispatcherRouterBootstrap {
    dispatcher: Arc<Dispatcher>,
}

impl RouterBootstrap for DispatcherRouterBootstrap {
    fn bootstrap_router(&self, server_name: &str) -> Result<Router, ErrorPtr> {
        debug!(
            server_name,
            actions = self.dispatcher.routes().len(),
            "Creating dispatcher router"
        );

        Ok(Router::new()
            .fallback(dispatch_request)
            .with_state(self.dispatcher.clone()))
    }
}

async fn dispatch_request(
    State(dispatcher): State<Arc<Dispatcher>>,
    request: Request<Body>,
) -> Response {
    let (parts, body) = request.into_parts();
    let body = match hyper::body::to_bytes(body).await {
        Ok(body) => body,
        Err(error) => {
            warn!(%error, "Error reading request body");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    match dispatcher.dispatch(Request::from_parts(parts, body)).await {
        Ok(DispatchOutcome::Handled(context)) => context.into_response(),
        Ok(DispatchOutcome::NotFound) => StatusCode::NOT_FOUND.into_response(),
        Err(error) => dispatcher.server().error_renderer().render(error),
    }
}

#[cfg(test)]
mod tests {
    use crate::config::WebConfig;
    use crate::context::{ActionContext, ServerContext};
    use crate::controller::{ActionResult, ActionSource, Controller, DeclaredMethod};
    use crate::dispatcher::Dispatcher;
    use crate::future::{BoxFuture, FutureExt};
    use crate::registry::ControllerRegistry;
    use crate::router::{DispatcherRouterBootstrap, RouterBootstrap};
    use crate::routes::RouteTableBuilder;
    use crate::view::{FileViewResolver, MockErrorRenderer};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::IntoResponse;
    use std::io;
    use std::sync::Arc;
    use tower::ServiceExt;

    #[derive(Default)]
    struct EchoController {
        context: ActionContext,
    }

    impl Controller for EchoController {
        fn action_context(&self) -> &ActionContext {
            &self.context
        }

        fn action_context_mut(&mut self) -> &mut ActionContext {
            &mut self.context
        }
    }

    impl ActionSource for EchoController {
        fn declared_methods() -> Vec<DeclaredMethod<Self>> {
            vec![
                DeclaredMethod::action("doEcho", Self::echo),
                DeclaredMethod::action("doFail", Self::fail),
            ]
        }
    }

    impl EchoController {
        fn echo(&mut self) -> BoxFuture<'_, ActionResult> {
            async {
                let body = self.context.request().body().to_vec();
                self.context.response_mut().body = body;
                Ok(())
            }
            .boxed()
        }

        fn fail(&mut self) -> BoxFuture<'_, ActionResult> {
            async { Err(io::Error::new(io::ErrorKind::Other, "failed").into()) }.boxed()
        }
    }

    fn create_bootstrap(server: ServerContext) -> DispatcherRouterBootstrap {
        let registry = ControllerRegistry::builder()
            .register::<EchoController>()
            .unwrap()
            .build()
            .unwrap();

        let routes =
            RouteTableBuilder::new(&registry).build([("/echo", EchoController::type_name())]);

        DispatcherRouterBootstrap::new(Arc::new(Dispatcher::new(
            Arc::new(routes),
            Arc::new(server),
        )))
    }

    async fn call(bootstrap: &DispatcherRouterBootstrap, path: &str) -> (StatusCode, Vec<u8>) {
        call_server(bootstrap, "default", path).await
    }

    async fn call_server(
        bootstrap: &DispatcherRouterBootstrap,
        server_name: &str,
        path: &str,
    ) -> (StatusCode, Vec<u8>) {
        let response = bootstrap
            .bootstrap_router(server_name)
            .unwrap()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(path)
                    .body(Body::from("payload"))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn should_route_to_action() {
        let bootstrap = create_bootstrap(ServerContext::default());

        let (status, body) = call(&bootstrap, "/echo/echo.html").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"payload");
    }

    #[tokio::test]
    async fn should_share_dispatcher_between_servers() {
        let bootstrap = create_bootstrap(ServerContext::default());

        for server_name in ["public", "admin"] {
            let (status, body) = call_server(&bootstrap, server_name, "/echo/echo").await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, b"payload");
        }
    }

    #[tokio::test]
    async fn should_respond_not_found() {
        let bootstrap = create_bootstrap(ServerContext::default());

        let (status, _) = call(&bootstrap, "/echo/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn should_render_failure_with_default_renderer() {
        let bootstrap = create_bootstrap(ServerContext::default());

        let (status, body) = call(&bootstrap, "/echo/fail").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(String::from_utf8(body).unwrap(), "Action failed: failed");
    }

    #[tokio::test]
    async fn should_pass_failure_to_error_renderer() {
        let mut error_renderer = MockErrorRenderer::new();
        error_renderer
            .expect_render()
            .withf(|error| error.cause().to_string() == "failed")
            .times(1)
            .returning(|_| StatusCode::SERVICE_UNAVAILABLE.into_response());

        let config = WebConfig::default();
        let view_resolver = Arc::new(FileViewResolver::new(config.view_root.clone()));
        let bootstrap = create_bootstrap(ServerContext::new(
            config,
            view_resolver,
            Arc::new(error_renderer),
        ));

        let (status, _) = call(&bootstrap, "/echo/fail").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
