//! Convention-based action dispatch for server-rendered web applications, built on axum.
//!
//! Applications are composed of [*Controllers*](controller::Controller) - plain structs whose
//! zero-argument `do_*` methods become *actions*. Controllers are mounted under path prefixes in
//! configuration, and every action is reachable under `prefix/segment`, where the segment is
//! derived from the action name: `do_show_item` (exposed as `doShowItem`) is served at
//! `prefix/show-item`. A trailing file extension in the request path is ignored, so
//! `/blog/show-item.action` reaches the same action.
//!
//! For every request a fresh controller is created, given the
//! [ActionContext](context::ActionContext) of the request, initialized, and finally the action is
//! invoked. Actions build the response by forwarding to pages, including pages, redirecting or
//! sending errors.
//!
//! ### Simple usage example
//!
//! ```no_run
//! use action_web::application;
//! use action_web::context::ActionContext;
//! use action_web::controller::ActionResult;
//! use action_web::{controller, Controller};
//!
//! // a controller needs a place to hold the context of the current request
//! #[derive(Controller, Default)]
//! struct BlogController {
//!     context: ActionContext,
//! }
//!
//! // all do_* methods without arguments become actions
//! #[controller]
//! impl BlogController {
//!     // served at /blog/list, given "/blog" = "my_app::BlogController" in web.actions
//!     async fn do_list(&mut self) -> ActionResult {
//!         self.context.set("posts", vec!["First post".to_string()]);
//!         self.context.forward("blog/list.html").await?;
//!         Ok(())
//!     }
//! }
//!
//! // note: for the sake of simplicity, errors are unwrapped, rather than
//! // gracefully handled
//! #[tokio::main]
//! async fn main() {
//!     let mut application =
//!         application::create_default().expect("unable to create application");
//!
//!     application.run().await.expect("error running application");
//! }
//! ```
//!
//! ### Features
//!
//! * `derive` - automatically import helper proc macros

pub mod application;
pub mod attributes;
pub mod config;
pub mod context;
pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod registry;
pub mod router;
pub mod routes;
pub mod server;
pub mod view;

pub use axum;

/// Boxed futures used by asynchronous traits.
pub mod future {
    pub use futures::future::{BoxFuture, FutureExt};
}

#[cfg(feature = "derive")]
pub use action_web_derive::*;
