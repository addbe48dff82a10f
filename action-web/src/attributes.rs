//! Request attributes - named, arbitrarily typed values attached to a request while it's being
//! handled. Actions use them to pass data to rendered pages, and the dispatcher uses them to expose
//! action failures to error rendering under [ERROR_ATTRIBUTE].

use downcast::{downcast_sync, AnySync};
use fxhash::FxHashMap;
use std::any::Any;
use std::fmt::{Debug, Formatter};

/// Name of the attribute holding the [ErrorPtr](crate::error::ErrorPtr) cause of a failed action.
pub const ERROR_ATTRIBUTE: &str = "action_web.exception";

/// Value which can be stored as an attribute.
pub trait AttributeValue: AnySync {}

downcast_sync!(dyn AttributeValue);

impl<T: Any + Send + Sync> AttributeValue for T {}

/// Named attribute values of a single request.
#[derive(Default)]
pub struct Attributes {
    values: FxHashMap<String, Box<dyn AttributeValue>>,
}

impl Attributes {
    /// Sets an attribute, replacing any previous value with the same name.
    pub fn set<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) {
        self.values.insert(name.into(), Box::new(value));
    }

    /// Returns the attribute with given name, if it exists and is of type `T`.
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Option<&T> {
        self.values
            .get(name)
            .and_then(|value| (**value).downcast_ref::<T>().ok())
    }

    /// Mutable version of [Attributes::get].
    pub fn get_mut<T: Any + Send + Sync>(&mut self, name: &str) -> Option<&mut T> {
        self.values
            .get_mut(name)
            .and_then(|value| (**value).downcast_mut::<T>().ok())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Removes an attribute, returning `true` if it was present.
    pub fn remove(&mut self, name: &str) -> bool {
        self.values.remove(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Debug for Attributes {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::attributes::Attributes;

    #[test]
    fn should_get_typed_attribute() {
        let mut attributes = Attributes::default();
        attributes.set("items", vec![1, 2, 3]);

        assert_eq!(attributes.get::<Vec<i32>>("items"), Some(&vec![1, 2, 3]));
        assert!(attributes.get::<String>("items").is_none());
        assert!(attributes.get::<Vec<i32>>("missing").is_none());
    }

    #[test]
    fn should_replace_attribute() {
        let mut attributes = Attributes::default();
        attributes.set("title", "first".to_string());
        attributes.set("title", 2u8);

        assert_eq!(attributes.len(), 1);
        assert_eq!(attributes.get::<u8>("title"), Some(&2));
    }

    #[test]
    fn should_modify_and_remove_attribute() {
        let mut attributes = Attributes::default();
        attributes.set("count", 1usize);
        *attributes.get_mut::<usize>("count").unwrap() += 1;

        assert_eq!(attributes.get::<usize>("count"), Some(&2));
        assert!(attributes.remove("count"));
        assert!(!attributes.remove("count"));
        assert!(attributes.is_empty());
    }
}
