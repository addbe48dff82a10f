//! Registry of controllers, which can be resolved by their identifiers when building routes.
//! Controllers can be registered manually with [ControllerRegistryBuilder], or automatically when
//! using the `#[controller]` attribute, which submits them to a static registry.
//!
//! Every controller is registered under its type name (as in [std::any::type_name]) and any
//! number of additional aliases.

use crate::controller::{ActionInvoker, ActionSource, TypedActionInvoker};
use derivative::Derivative;
use fxhash::FxHashMap;
use std::any::TypeId;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors related to registering controllers.
#[derive(Error, Clone, Eq, PartialEq, Debug)]
pub enum RegistryError {
    #[error("Identifier {identifier} is already registered for controller {existing}, cannot register it for {new}")]
    DuplicateIdentifier {
        identifier: String,
        existing: &'static str,
        new: &'static str,
    },
}

/// Type-erased description of a method declared by a controller.
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct MethodDescriptor {
    name: String,
    arity: usize,
    #[derivative(Debug = "ignore")]
    invoker: Option<Arc<dyn ActionInvoker + Send + Sync>>,
}

impl MethodDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Returns the invoker for methods callable without arguments.
    pub fn invoker(&self) -> Option<&Arc<dyn ActionInvoker + Send + Sync>> {
        self.invoker.as_ref()
    }
}

/// Loaded controller type, along with all its declared methods.
#[derive(Clone, Debug)]
pub struct ControllerDescriptor {
    type_name: &'static str,
    methods: Vec<MethodDescriptor>,
}

impl ControllerDescriptor {
    /// Creates a descriptor for given controller type.
    pub fn of<C: ActionSource>() -> Self {
        Self {
            type_name: C::type_name(),
            methods: C::declared_methods()
                .into_iter()
                .map(|method| MethodDescriptor {
                    name: method.name().to_string(),
                    arity: method.arity(),
                    invoker: method.action_fn().map(|action| {
                        Arc::new(TypedActionInvoker::<C>::new(action))
                            as Arc<dyn ActionInvoker + Send + Sync>
                    }),
                })
                .collect(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }
}

/// Registration information for a single controller type.
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct ControllerDefinition {
    pub type_id: TypeId,
    pub type_name: &'static str,
    #[derivative(Debug = "ignore")]
    pub descriptor: fn() -> ControllerDescriptor,
}

impl ControllerDefinition {
    pub fn of<C: ActionSource>() -> Self {
        Self {
            type_id: TypeId::of::<C>(),
            type_name: C::type_name(),
            descriptor: ControllerDescriptor::of::<C>,
        }
    }
}

/// Controllers available for action mappings.
#[derive(Clone, Debug, Default)]
pub struct ControllerRegistry {
    definitions: FxHashMap<String, ControllerDefinition>,
}

impl ControllerRegistry {
    pub fn builder() -> ControllerRegistryBuilder {
        Default::default()
    }

    /// Creates a registry containing all controllers registered with the `#[controller]`
    /// attribute.
    pub fn from_static() -> Result<Self, RegistryError> {
        Self::builder().register_static()?.build()
    }

    /// Loads the descriptor of the controller registered under given identifier.
    pub fn resolve(&self, identifier: &str) -> Option<ControllerDescriptor> {
        self.definitions
            .get(identifier)
            .map(|definition| (definition.descriptor)())
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.definitions.contains_key(identifier)
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Builder for [ControllerRegistry]. Registering the same controller under the same identifier
/// multiple times is allowed, while registering different controllers under the same identifier
/// is an error.
#[derive(Debug, Default)]
pub struct ControllerRegistryBuilder {
    definitions: FxHashMap<String, ControllerDefinition>,
}

impl ControllerRegistryBuilder {
    /// Registers a controller under its type name.
    pub fn register<C: ActionSource>(self) -> Result<Self, RegistryError> {
        self.register_definition(ControllerDefinition::of::<C>(), &[])
    }

    /// Registers a controller under its type name and an additional alias.
    pub fn register_as<C: ActionSource>(self, alias: &str) -> Result<Self, RegistryError> {
        self.register_definition(ControllerDefinition::of::<C>(), &[alias])
    }

    /// Registers all controllers submitted by the `#[controller]` attribute.
    pub fn register_static(self) -> Result<Self, RegistryError> {
        inventory::iter::<internal::ControllerRegisterer>
            .into_iter()
            .map(|registerer| (registerer.register)())
            .try_fold(self, |builder, definition| {
                builder.register_definition(definition.definition, definition.aliases)
            })
    }

    /// Registers a definition under its type name and given aliases.
    pub fn register_definition(
        mut self,
        definition: ControllerDefinition,
        aliases: &[&str],
    ) -> Result<Self, RegistryError> {
        for identifier in [definition.type_name].iter().chain(aliases) {
            self.try_register(identifier, &definition)?;
        }

        Ok(self)
    }

    fn try_register(
        &mut self,
        identifier: &str,
        definition: &ControllerDefinition,
    ) -> Result<(), RegistryError> {
        if let Some(existing) = self.definitions.get(identifier) {
            return if existing.type_id == definition.type_id {
                Ok(())
            } else {
                Err(RegistryError::DuplicateIdentifier {
                    identifier: identifier.to_string(),
                    existing: existing.type_name,
                    new: definition.type_name,
                })
            };
        }

        debug!(
            identifier,
            controller = definition.type_name,
            "Registering controller"
        );

        self.definitions
            .insert(identifier.to_string(), definition.clone());
        Ok(())
    }

    pub fn build(self) -> Result<ControllerRegistry, RegistryError> {
        Ok(ControllerRegistry {
            definitions: self.definitions,
        })
    }
}

#[doc(hidden)]
pub mod internal {
    use crate::registry::ControllerDefinition;
    use inventory::collect;
    pub use inventory::submit;

    pub struct StaticControllerDefinition {
        pub definition: ControllerDefinition,
        pub aliases: &'static [&'static str],
    }

    pub struct ControllerRegisterer {
        pub register: fn() -> StaticControllerDefinition,
    }

    collect!(ControllerRegisterer);
}

#[cfg(test)]
mod tests {
    use crate::context::ActionContext;
    use crate::controller::{ActionResult, ActionSource, Controller, DeclaredMethod};
    use crate::future::{BoxFuture, FutureExt};
    use crate::registry::{ControllerRegistry, RegistryError};

    macro_rules! test_controller {
        ($name:ident) => {
            #[derive(Default)]
            struct $name {
                context: ActionContext,
            }

            impl Controller for $name {
                fn action_context(&self) -> &ActionContext {
                    &self.context
                }

                fn action_context_mut(&mut self) -> &mut ActionContext {
                    &mut self.context
                }
            }

            impl ActionSource for $name {
                fn declared_methods() -> Vec<DeclaredMethod<Self>> {
                    vec![
                        DeclaredMethod::action("doList", Self::list),
                        DeclaredMethod::declared("doShow", 1),
                    ]
                }
            }

            impl $name {
                fn list(&mut self) -> BoxFuture<'_, ActionResult> {
                    async { Ok(()) }.boxed()
                }
            }
        };
    }

    test_controller!(FirstController);
    test_controller!(SecondController);

    #[test]
    fn should_resolve_by_type_name_and_alias() {
        let registry = ControllerRegistry::builder()
            .register_as::<FirstController>("first")
            .unwrap()
            .build()
            .unwrap();

        let by_name = registry.resolve(FirstController::type_name()).unwrap();
        let by_alias = registry.resolve("first").unwrap();

        assert_eq!(by_name.type_name(), by_alias.type_name());
        assert_eq!(by_name.methods().len(), 2);
        assert!(by_name.methods()[0].invoker().is_some());
        assert_eq!(by_name.methods()[1].arity(), 1);
        assert!(by_name.methods()[1].invoker().is_none());
        assert!(registry.resolve("second").is_none());
    }

    #[test]
    fn should_allow_registering_same_controller_twice() {
        let registry = ControllerRegistry::builder()
            .register::<FirstController>()
            .unwrap()
            .register_as::<FirstController>("first")
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn should_reject_duplicate_alias() {
        let error = ControllerRegistry::builder()
            .register_as::<FirstController>("shared")
            .unwrap()
            .register_as::<SecondController>("shared")
            .unwrap_err();

        assert!(matches!(
            error,
            RegistryError::DuplicateIdentifier { ref identifier, .. } if identifier == "shared"
        ));
    }
}
