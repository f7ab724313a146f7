//! Controller metadata registry.
//!
//! Rust has no runtime attribute reflection, so controllers describe
//! themselves once at startup: a [`ControllerClass`] lists its class-level
//! attributes and, per action method, the method-level ones. The registry
//! is immutable after startup and shared behind `Arc`.
//!
//! ```rust
//! use restparam::{ControllerClass, ControllerRegistry, ParamDeclaration};
//!
//! let mut registry = ControllerRegistry::new();
//! registry.register(
//!     ControllerClass::new("UserController")
//!         .param(ParamDeclaration::query("locale").nullable(true))
//!         .method("list", [ParamDeclaration::query("page").default("1")]),
//! );
//! let action = registry.action("UserController", "list").unwrap();
//! assert_eq!(action.method(), "list");
//! ```

use std::sync::Arc;

use indexmap::IndexMap;

use crate::annotation::Annotation;
use crate::error::Error;
use crate::param::ParamDeclaration;

/// Reflected description of a controller type.
#[derive(Clone, Debug, Default)]
pub struct ControllerClass {
    name: String,
    attributes: Vec<Annotation>,
    methods: IndexMap<String, Vec<Annotation>>,
}

impl ControllerClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    /// Adds a class-level attribute.
    pub fn attribute(mut self, attribute: Annotation) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Adds a class-level param declaration.
    pub fn param(self, param: ParamDeclaration) -> Self {
        self.attribute(Annotation::Param(param))
    }

    /// Declares an action method with its param declarations.
    ///
    /// Declaring the same method twice appends to its attributes.
    pub fn method<I>(self, name: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = ParamDeclaration>,
    {
        self.method_attributes(name, params.into_iter().map(Annotation::Param))
    }

    /// Declares an action method with arbitrary attributes.
    pub fn method_attributes<I>(mut self, name: impl Into<String>, attributes: I) -> Self
    where
        I: IntoIterator<Item = Annotation>,
    {
        self.methods.entry(name.into()).or_default().extend(attributes);
        self
    }

    pub fn name(&self) -> &str { &self.name }

    pub fn has_method(&self, method: &str) -> bool {
        self.methods.contains_key(method)
    }

    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    /// Class-level attributes, in declaration order.
    pub fn attributes(&self) -> &[Annotation] {
        &self.attributes
    }

    /// Attributes of `method`, or `None` if the class has no such method.
    pub fn attributes_of(&self, method: &str) -> Option<&[Annotation]> {
        self.methods.get(method).map(Vec::as_slice)
    }
}

/// A controller method bound to a route.
#[derive(Clone, Debug)]
pub struct Action {
    class: Arc<ControllerClass>,
    method: String,
}

impl Action {
    pub fn new(class: Arc<ControllerClass>, method: impl Into<String>) -> Self {
        Self { class, method: method.into() }
    }

    pub fn class(&self) -> &ControllerClass { &self.class }
    pub fn method(&self) -> &str { &self.method }
}

/// Name-keyed set of controller classes.
#[derive(Clone, Debug, Default)]
pub struct ControllerRegistry {
    classes: IndexMap<String, Arc<ControllerClass>>,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `class`, replacing any class of the same name.
    pub fn register(&mut self, class: ControllerClass) -> Arc<ControllerClass> {
        let class = Arc::new(class);
        self.classes.insert(class.name().to_owned(), Arc::clone(&class));
        class
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ControllerClass>> {
        self.classes.get(name)
    }

    /// Binds `class::method` for routing. The method itself is checked when
    /// params are read, as a missing method is a reader error.
    pub fn action(&self, class: &str, method: &str) -> Result<Action, Error> {
        let class = self
            .get(class)
            .ok_or_else(|| Error::invalid_argument(format!("Class \"{class}\" does not exist.")))?;
        Ok(Action::new(Arc::clone(class), method))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn methods_are_tracked_even_without_params() {
        let class = ControllerClass::new("C").method("empty", std::iter::empty());
        assert!(class.has_method("empty"));
        assert_eq!(class.attributes_of("empty").map(<[_]>::len), Some(0));
        assert!(class.attributes_of("missing").is_none());
    }

    #[test]
    fn repeated_method_declarations_append() {
        let class = ControllerClass::new("C")
            .method("a", [ParamDeclaration::query("x")])
            .method("a", [ParamDeclaration::query("y")]);
        assert_eq!(class.attributes_of("a").map(<[_]>::len), Some(2));
        assert_eq!(class.methods().collect::<Vec<_>>(), ["a"]);
    }

    #[test]
    fn unknown_class_is_rejected() {
        let registry = ControllerRegistry::new();
        assert!(matches!(registry.action("Nope", "a"), Err(Error::InvalidArgument(_))));
    }
}
