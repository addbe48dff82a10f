//! Building the [RouteTable] from action mappings.
//!
//! Routes are created in two steps. First, every init param whose name starts with `/` is treated
//! as a path prefix mapped to a controller identifier, which gets resolved in the
//! [ControllerRegistry]. Unresolvable controllers are logged and skipped. Then, every resolved
//! controller is inspected for action methods - those without arguments, whose names start with
//! [ACTION_PREFIX] - and each action is mapped under the prefix, using a segment derived from the
//! action name: `doShowItem` becomes `show-item`, so with the `/blog` prefix, the final route is
//! `/blog/show-item`.
//!
//! When multiple actions end up with the same route, the one processed last wins.

use crate::controller::{ActionInvoker, ACTION_PREFIX};
use crate::registry::{ControllerDescriptor, ControllerRegistry};
use derivative::Derivative;
use derive_more::Constructor;
use fxhash::FxHashMap;
use indexmap::IndexMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

/// Errors related to building routes.
#[derive(Error, Clone, Eq, PartialEq, Debug)]
pub enum RouteBuildError {
    #[error("Failed to load action mapping: {prefix} -> {identifier}")]
    UnresolvableController { prefix: String, identifier: String },
}

/// Single route - a request path mapped to a controller action.
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct RouteEntry {
    path: String,
    controller: &'static str,
    action: String,
    #[derivative(Debug = "ignore")]
    invoker: Arc<dyn ActionInvoker + Send + Sync>,
}

impl RouteEntry {
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Type name of the target controller.
    pub fn controller(&self) -> &'static str {
        self.controller
    }

    /// Name of the target action.
    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn invoker(&self) -> &Arc<dyn ActionInvoker + Send + Sync> {
        &self.invoker
    }
}

/// Exact-match map from request paths to [RouteEntries](RouteEntry).
#[derive(Clone, Debug, Default)]
pub struct RouteTable {
    routes: FxHashMap<String, RouteEntry>,
}

impl RouteTable {
    pub fn get(&self, path: &str) -> Option<&RouteEntry> {
        self.routes.get(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteEntry> {
        self.routes.values()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    fn insert(&mut self, entry: RouteEntry) {
        self.routes.insert(entry.path.clone(), entry);
    }
}

/// Derives the URL segment for an action name, or returns `None` if the name doesn't start with
/// [ACTION_PREFIX]. The prefix is stripped and every uppercase letter is lowercased and, unless
/// it's the first character, preceded by `-`.
pub fn derive_segment(action: &str) -> Option<String> {
    let name = action.strip_prefix(ACTION_PREFIX)?;
    let mut segment = String::with_capacity(name.len() + 4);

    for (index, c) in name.chars().enumerate() {
        if c.is_uppercase() {
            if index > 0 {
                segment.push('-');
            }

            segment.extend(c.to_lowercase());
        } else {
            segment.push(c);
        }
    }

    Some(segment)
}

/// Joins a path prefix with an action segment.
pub fn compose_route(prefix: &str, segment: &str) -> String {
    let mut route = String::with_capacity(prefix.len() + segment.len() + 1);
    route.push_str(prefix);

    if !prefix.ends_with('/') {
        route.push('/');
    }

    route.push_str(segment);
    route
}

/// Removes the file extension from the last segment of a path, if present.
pub fn trim_extension(path: &str) -> &str {
    match (path.rfind('.'), path.rfind('/')) {
        (Some(dot), Some(slash)) if dot > slash => &path[..dot],
        (Some(dot), None) => &path[..dot],
        _ => path,
    }
}

/// Builds [RouteTable]s using controllers from a [ControllerRegistry].
#[derive(Constructor)]
pub struct RouteTableBuilder<'r> {
    registry: &'r ControllerRegistry,
}

impl<'r> RouteTableBuilder<'r> {
    /// Resolves controllers for all init params naming a path prefix. Controllers which cannot be
    /// resolved are skipped.
    pub fn resolve_controllers<'p>(
        &self,
        init_params: impl IntoIterator<Item = (&'p str, &'p str)>,
    ) -> IndexMap<String, ControllerDescriptor> {
        let mut result = IndexMap::new();

        for (prefix, identifier) in init_params {
            if !prefix.starts_with('/') {
                continue;
            }

            match self.try_resolve(prefix, identifier) {
                Ok(descriptor) => {
                    debug!(prefix, identifier, "Loaded action mapping");
                    result.insert(prefix.to_string(), descriptor);
                }
                Err(error) => error!("{error}"),
            }
        }

        result
    }

    fn try_resolve(
        &self,
        prefix: &str,
        identifier: &str,
    ) -> Result<ControllerDescriptor, RouteBuildError> {
        self.registry
            .resolve(identifier)
            .ok_or_else(|| RouteBuildError::UnresolvableController {
                prefix: prefix.to_string(),
                identifier: identifier.to_string(),
            })
    }

    /// Resolves controllers and maps their actions.
    pub fn build<'p>(
        &self,
        init_params: impl IntoIterator<Item = (&'p str, &'p str)>,
    ) -> RouteTable {
        map_actions(self.resolve_controllers(init_params))
    }
}

/// Maps actions of given controllers under their prefixes, in iteration order.
pub fn map_actions(controllers: IndexMap<String, ControllerDescriptor>) -> RouteTable {
    let mut table = RouteTable::default();

    for (prefix, descriptor) in &controllers {
        for method in descriptor.methods() {
            let (Some(segment), Some(invoker)) = (derive_segment(method.name()), method.invoker())
            else {
                continue;
            };

            let path = compose_route(prefix, &segment);
            debug!(
                %path,
                controller = descriptor.type_name(),
                action = method.name(),
                "Mapped action"
            );

            table.insert(RouteEntry {
                path,
                controller: descriptor.type_name(),
                action: method.name().to_string(),
                invoker: invoker.clone(),
            });
        }
    }

    table
}
