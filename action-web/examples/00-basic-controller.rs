use action_web::application::Application;
use action_web::axum::http::StatusCode;
use action_web::config::ApplicationConfig;
use action_web::context::ActionContext;
use action_web::registry::ControllerRegistry;
use action_web::{controller, Controller};

// create a struct which will serve as our Controller - it needs a place to hold the context of
// the request being handled, and a fresh instance is created for every request
#[derive(Controller, Default)]
struct ExampleController {
    context: ActionContext,
}

// mark the impl block as a controller - all methods without arguments starting with "do_" become
// actions, and the controller gets registered under its type name and the given alias
#[controller(name = "example")]
impl ExampleController {
    // this action will respond to http://localhost/example/hello (or /example/hello.action, since
    // extensions are ignored)
    fn do_hello(&mut self) {
        self.context.response_mut().body = b"Hello world!".to_vec();
    }

    // multiple words are separated by "-" in the path: http://localhost/example/hello-user
    fn do_hello_user(&mut self) {
        let user = self
            .context
            .request()
            .uri()
            .query()
            .unwrap_or("anonymous")
            .to_string();

        self.context.response_mut().body = format!("Hello {user}!").into_bytes();
    }

    // methods with arguments are not actions, but can be freely used by them
    fn do_forbidden(&mut self) {
        self.deny("Not allowed!");
    }

    fn deny(&mut self, message: &str) {
        self.context.error(StatusCode::FORBIDDEN, Some(message));
    }
}

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
#[tokio::main]
async fn main() {
    // action mappings usually come from the configuration file, but can also be added in code
    let mut config = ApplicationConfig::init_from_environment().expect("unable to load config");
    config.web.actions.insert("/example", "example");

    // all controllers marked with #[controller] are available in the static registry
    let registry = ControllerRegistry::from_static().expect("unable to register controllers");

    let mut application = Application::new(config, registry);

    // run our server - requests should be dispatched to ExampleController
    application.run().await.expect("error running application");
}
