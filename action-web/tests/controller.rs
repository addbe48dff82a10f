use action_web::axum::body::Bytes;
use action_web::axum::http::header::LOCATION;
use action_web::axum::http::{Request, StatusCode};
use action_web::context::{ActionContext, PageError, ServerContext};
use action_web::controller::{ActionResult, ActionSource};
use action_web::dispatcher::{DispatchOutcome, Dispatcher};
use action_web::error::ControllerPanic;
use action_web::registry::ControllerRegistry;
use action_web::routes::RouteTableBuilder;
use action_web::{controller, Controller};
use std::io;
use std::sync::Arc;

#[derive(Controller, Default)]
struct BlogController {
    context: ActionContext,
    posts: Vec<String>,
}

#[controller(name = "blog")]
impl BlogController {
    fn init(&mut self) {
        self.posts = vec!["first".to_string(), "second".to_string()];
    }

    async fn do_list(&mut self) -> ActionResult {
        let body = self.posts.join(",");
        self.context.response_mut().body = body.into_bytes();
        Ok(())
    }

    fn do_show_item(&mut self) -> Result<(), PageError> {
        self.context.redirect("blog/list.action")
    }

    fn do_select(&mut self, index: usize) {
        self.posts.truncate(index);
    }

    fn helper(&self) -> usize {
        self.posts.len()
    }

    async fn do_fail(&mut self) -> Result<(), io::Error> {
        Err(io::Error::new(io::ErrorKind::Other, "no posts"))
    }

    fn do_panic(&self) {
        if self.helper() > 0 {
            panic!("too many posts");
        }
    }
}

#[derive(Controller, Default)]
struct AdminController {
    #[action_context]
    request_context: ActionContext,
    initialized: bool,
}

#[controller]
impl AdminController {
    async fn init(&mut self) -> ActionResult {
        self.initialized = true;
        Ok(())
    }

    fn do_status(&mut self) {
        let status = if self.initialized {
            StatusCode::NO_CONTENT
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };

        self.request_context.error(status, None);
    }

    fn do_ping() {}

    fn label() -> &'static str {
        "admin"
    }
}

fn create_dispatcher(init_params: &[(&str, &str)]) -> Dispatcher {
    let registry = ControllerRegistry::from_static().unwrap();
    let routes = RouteTableBuilder::new(&registry).build(init_params.iter().copied());

    Dispatcher::new(Arc::new(routes), Arc::new(ServerContext::default()))
}

fn request(path: &str) -> Request<Bytes> {
    Request::builder().uri(path).body(Bytes::new()).unwrap()
}

async fn handle(dispatcher: &Dispatcher, path: &str) -> ActionContext {
    match dispatcher.dispatch(request(path)).await.unwrap() {
        DispatchOutcome::Handled(context) => context,
        DispatchOutcome::NotFound => panic!("no action for {path}"),
    }
}

#[test]
fn should_declare_methods() {
    let methods = BlogController::declared_methods();
    let names: Vec<_> = methods.iter().map(|method| method.name()).collect();

    assert_eq!(
        names,
        vec![
            "init",
            "doList",
            "doShowItem",
            "doSelect",
            "helper",
            "doFail",
            "doPanic"
        ]
    );

    let select = methods
        .iter()
        .find(|method| method.name() == "doSelect")
        .unwrap();
    assert_eq!(select.arity(), 1);
    assert!(select.action_fn().is_none());

    let helper = methods
        .iter()
        .find(|method| method.name() == "helper")
        .unwrap();
    assert_eq!(helper.arity(), 0);
    assert!(helper.action_fn().is_none());
}

#[test]
fn should_declare_associated_functions() {
    let methods = AdminController::declared_methods();
    let names: Vec<_> = methods.iter().map(|method| method.name()).collect();

    assert_eq!(names, vec!["init", "doStatus", "doPing", "label"]);
    assert!(methods[2].action_fn().is_some());
    assert!(methods[3].action_fn().is_none());
    assert_eq!(AdminController::label(), "admin");
}

#[test]
fn should_register_controllers_statically() {
    let registry = ControllerRegistry::from_static().unwrap();

    assert!(registry.contains("blog"));
    assert!(registry.contains(BlogController::type_name()));
    assert!(registry.contains(AdminController::type_name()));
    assert_eq!(registry.len(), 3);
}

#[test]
fn should_map_actions_by_convention() {
    let registry = ControllerRegistry::from_static().unwrap();
    let routes = RouteTableBuilder::new(&registry).build([
        ("/blog", "blog"),
        ("/admin/", AdminController::type_name()),
        ("/missing", "app::MissingController"),
    ]);

    let mut paths: Vec<_> = routes.iter().map(|entry| entry.path()).collect();
    paths.sort_unstable();

    assert_eq!(
        paths,
        vec![
            "/admin/ping",
            "/admin/status",
            "/blog/fail",
            "/blog/list",
            "/blog/panic",
            "/blog/show-item"
        ]
    );
}

#[tokio::test]
async fn should_initialize_controller_before_action() {
    let dispatcher = create_dispatcher(&[("/blog", "blog")]);

    let context = handle(&dispatcher, "/blog/list.action").await;
    assert_eq!(context.response().body, b"first,second");
}

#[tokio::test]
async fn should_run_async_init() {
    let dispatcher = create_dispatcher(&[("/admin", AdminController::type_name())]);

    let context = handle(&dispatcher, "/admin/status").await;
    assert_eq!(context.response().status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn should_invoke_associated_function_action() {
    let dispatcher = create_dispatcher(&[("/admin", AdminController::type_name())]);

    let context = handle(&dispatcher, "/admin/ping").await;
    assert_eq!(context.response().status, StatusCode::OK);
    assert!(context.response().body.is_empty());
}

#[tokio::test]
async fn should_match_decoded_paths() {
    let dispatcher = create_dispatcher(&[("/blog", "blog")]);

    let context = handle(&dispatcher, "/blog/show%2Ditem.action").await;
    assert_eq!(context.response().status, StatusCode::FOUND);
}

#[tokio::test]
async fn should_redirect_under_base_url() {
    let dispatcher = create_dispatcher(&[("/blog", "blog")]);

    let context = handle(&dispatcher, "/blog/show-item.html").await;
    assert_eq!(context.response().status, StatusCode::FOUND);
    assert_eq!(context.response().headers[LOCATION], "/blog/list.action");
}

#[tokio::test]
async fn should_not_route_methods_with_arguments_or_without_prefix() {
    let dispatcher = create_dispatcher(&[("/blog", "blog")]);

    for path in ["/blog/select", "/blog/helper", "/blog/init", "/blog/do-list"] {
        assert!(matches!(
            dispatcher.dispatch(request(path)).await.unwrap(),
            DispatchOutcome::NotFound
        ));
    }
}

#[tokio::test]
async fn should_report_action_errors() {
    let dispatcher = create_dispatcher(&[("/blog", "blog")]);

    let error = dispatcher
        .dispatch(request("/blog/fail"))
        .await
        .unwrap_err();
    assert_eq!(
        error.cause().downcast_ref::<io::Error>().unwrap().to_string(),
        "no posts"
    );

    let error = dispatcher
        .dispatch(request("/blog/panic"))
        .await
        .unwrap_err();
    assert_eq!(
        error
            .cause()
            .downcast_ref::<ControllerPanic>()
            .unwrap()
            .message,
        "too many posts"
    );
}
