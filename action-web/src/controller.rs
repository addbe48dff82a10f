//! Functionality related to defining [Controller]s.
//!
//! A controller is a plain struct holding the [ActionContext] of the request being handled, and
//! exposing *actions* - methods without arguments, whose names start with [ACTION_PREFIX]. For
//! every request, a fresh controller instance is created with [Default], given the context of
//! the request, initialized with [ActionSource::init] and finally, the action method is invoked.
//!
//! Both traits are usually implemented with the help of the `derive` feature:
//!
//! ```
//! use action_web::context::ActionContext;
//! use action_web::controller::ActionResult;
//! use action_web::{controller, Controller};
//!
//! #[derive(Controller, Default)]
//! struct ItemController {
//!     context: ActionContext,
//!     items: Vec<String>,
//! }
//!
//! #[controller]
//! impl ItemController {
//!     // called before every action
//!     fn init(&mut self) {
//!         self.items = vec!["first".to_string()];
//!     }
//!
//!     // exposed as "doShowItem", mapped to "/prefix/show-item"
//!     async fn do_show_item(&mut self) -> ActionResult {
//!         self.context.set("item", self.items[0].clone());
//!         self.context.forward("item.html").await?;
//!         Ok(())
//!     }
//!
//!     // not an action - requires an argument
//!     fn do_select(&mut self, _index: usize) {}
//!
//!     // not an action - the name doesn't start with "do"
//!     fn count(&self) -> usize {
//!         self.items.len()
//!     }
//! }
//! ```
//!
//! `#[controller]` declares all methods taking `&self`, `&mut self` or no receiver at all. Those
//! without arguments, whose names start with `do`, become actions and must return `()` or a
//! `Result<(), E>` with `E` convertible to [BoxError]. A method named `init` taking only the
//! receiver becomes the [ActionSource::init] hook.
//!
//! ### Supported `#[controller]` arguments
//!
//! * `name = "name"` - register the controller under an additional identifier, which can be used
//! in action mappings instead of the full type path
//!
//! ### Supported `#[derive(Controller)]` field attributes
//!
//! * `#[action_context]` - marks the field holding the [ActionContext]; when not present, a field
//! named `context` is used

use crate::context::ActionContext;
use crate::error::{BoxError, ControllerPanic};
use crate::future::{BoxFuture, FutureExt};
use std::any::type_name;
use std::borrow::Cow;
use std::fmt::{Debug, Formatter};
use std::mem;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Name prefix of all action methods.
pub const ACTION_PREFIX: &str = "do";

/// Result of running an action or the initialization hook.
pub type ActionResult = Result<(), BoxError>;

/// Type-erased pointer to a zero-argument action method.
pub type ActionFn<C> = for<'a> fn(&'a mut C) -> BoxFuture<'a, ActionResult>;

/// Main trait for controllers - collections of actions contained in typical structs, which have
/// access to the current request via their [ActionContext]. Each request gets its own, default
/// constructed instance.
pub trait Controller: Default + Send + 'static {
    /// Returns the context of the current request.
    fn action_context(&self) -> &ActionContext;

    /// Returns the mutable context of the current request.
    fn action_context_mut(&mut self) -> &mut ActionContext;

    /// Supplies the context of the request about to be handled.
    fn set_action_context(&mut self, context: ActionContext) {
        *self.action_context_mut() = context;
    }

    /// Takes back the context after the request has been handled.
    fn take_action_context(&mut self) -> ActionContext {
        mem::take(self.action_context_mut())
    }
}

/// Describes the methods a [Controller] exposes, which are candidates for actions.
pub trait ActionSource: Controller {
    /// Identifier of the controller used in action mappings.
    fn type_name() -> &'static str {
        type_name::<Self>()
    }

    /// Returns all methods declared by this controller.
    fn declared_methods() -> Vec<DeclaredMethod<Self>>;

    /// Initialization hook called after the context is set, but before the action is invoked.
    fn init(&mut self) -> BoxFuture<'_, ActionResult> {
        async { Ok(()) }.boxed()
    }
}

/// Conversion of action return values to [ActionResult].
pub trait IntoActionResult {
    fn into_action_result(self) -> ActionResult;
}

impl IntoActionResult for () {
    fn into_action_result(self) -> ActionResult {
        Ok(())
    }
}

impl<E: Into<BoxError>> IntoActionResult for Result<(), E> {
    fn into_action_result(self) -> ActionResult {
        self.map_err(Into::into)
    }
}

enum MethodKind<C> {
    Action(ActionFn<C>),
    Declared(usize),
}

/// A method declared by a controller. Only methods declared with [DeclaredMethod::action] can
/// become actions; all others are known only by name and arity.
pub struct DeclaredMethod<C> {
    name: Cow<'static, str>,
    kind: MethodKind<C>,
}

impl<C> DeclaredMethod<C> {
    /// Declares a method invocable without arguments.
    pub fn action(name: impl Into<Cow<'static, str>>, action: ActionFn<C>) -> Self {
        Self {
            name: name.into(),
            kind: MethodKind::Action(action),
        }
    }

    /// Declares a method which cannot be invoked as an action, e.g. because it requires
    /// arguments or isn't named like one.
    pub fn declared(name: impl Into<Cow<'static, str>>, arity: usize) -> Self {
        Self {
            name: name.into(),
            kind: MethodKind::Declared(arity),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of arguments, excluding the receiver.
    pub fn arity(&self) -> usize {
        match self.kind {
            MethodKind::Action(_) => 0,
            MethodKind::Declared(arity) => arity,
        }
    }

    /// Returns the method pointer, if the method can be invoked without arguments.
    pub fn action_fn(&self) -> Option<ActionFn<C>> {
        match self.kind {
            MethodKind::Action(action) => Some(action),
            MethodKind::Declared(_) => None,
        }
    }
}

impl<C> Debug for DeclaredMethod<C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeclaredMethod")
            .field("name", &self.name)
            .field("arity", &self.arity())
            .finish()
    }
}

/// Type-erased invocation of a single action.
pub trait ActionInvoker {
    /// Creates a fresh controller, supplies the context, initializes the controller and runs the
    /// action. The context is always given back, even if any step failed or panicked.
    fn perform(&self, context: ActionContext) -> BoxFuture<'static, (ActionContext, ActionResult)>;
}

/// [ActionInvoker] for a concrete controller type.
pub struct TypedActionInvoker<C> {
    action: ActionFn<C>,
}

impl<C> TypedActionInvoker<C> {
    pub fn new(action: ActionFn<C>) -> Self {
        Self { action }
    }
}

impl<C: ActionSource> ActionInvoker for TypedActionInvoker<C> {
    fn perform(&self, context: ActionContext) -> BoxFuture<'static, (ActionContext, ActionResult)> {
        invoke(self.action, context).boxed()
    }
}

async fn invoke<C: ActionSource>(
    action: ActionFn<C>,
    context: ActionContext,
) -> (ActionContext, ActionResult) {
    let mut controller = match catch_unwind(C::default) {
        Ok(controller) => controller,
        Err(payload) => return (context, Err(ControllerPanic::from_payload(payload).into())),
    };

    controller.set_action_context(context);

    let result = AssertUnwindSafe(async {
        controller.init().await?;
        (action)(&mut controller).await
    })
    .catch_unwind()
    .await
    .unwrap_or_else(|payload| Err(ControllerPanic::from_payload(payload).into()));

    (controller.take_action_context(), result)
}
