// note: this example assumes you've analyzed the previous one

use action_web::application;
use action_web::attributes::ERROR_ATTRIBUTE;
use action_web::axum::http::StatusCode;
use action_web::axum::response::{IntoResponse, Response};
use action_web::context::ActionContext;
use action_web::controller::ActionResult;
use action_web::dispatcher::DispatchError;
use action_web::error::ErrorPtr;
use action_web::view::ErrorRenderer;
use action_web::{controller, Controller};
use std::sync::Arc;

// the context field can have any name, as long as it's marked
#[derive(Controller, Default)]
struct PageController {
    #[action_context]
    request: ActionContext,
    user: Option<String>,
}

// mapped in action-web.json with: { "web": { "actions": { "/pages": "pages" } } }
#[controller(name = "pages")]
impl PageController {
    // init is called after the context is set, but before every action
    fn init(&mut self) {
        self.user = self.request.request().uri().query().map(str::to_string);
    }

    // pages are resolved relative to the base url and read from the "views" directory by default
    async fn do_index(&mut self) -> ActionResult {
        // attributes are available to view resolvers which support them
        self.request.set("user", self.user.clone());

        self.request.forward("index.html").await?;
        self.request.include("footer.html").await?;
        Ok(())
    }

    // redirects send the browser to the page, so attributes are lost
    fn do_logout(&mut self) -> ActionResult {
        self.request.redirect("pages/index.action")?;
        Ok(())
    }

    // any error fails the action and gets rendered by the ErrorRenderer
    async fn do_broken(&mut self) -> ActionResult {
        self.request.forward("no-such-page.html").await?;
        Ok(())
    }
}

// custom error pages can be rendered by replacing the default ErrorRenderer
struct PlainErrorRenderer;

impl ErrorRenderer for PlainErrorRenderer {
    fn render(&self, error: DispatchError) -> Response {
        let cause = error
            .context()
            .attribute::<ErrorPtr>(ERROR_ATTRIBUTE)
            .map(|cause| cause.to_string())
            .unwrap_or_default();

        (StatusCode::INTERNAL_SERVER_ERROR, format!("Sorry: {cause}")).into_response()
    }
}

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
#[tokio::main]
async fn main() {
    let mut application = application::create_default()
        .expect("unable to create application")
        .with_error_renderer(Arc::new(PlainErrorRenderer));

    application.run().await.expect("error running application");
}
