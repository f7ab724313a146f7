//! Radix-tree request router.
//!
//! One tree per HTTP method, O(path-length) lookup. A route may be bound to
//! a controller [`Action`], which is what lets the param fetcher find the
//! declarations of the handler serving the request.

use std::collections::HashMap;

use http::Method;
use matchit::Router as MatchitRouter;

use crate::handler::{BoxedHandler, Handler};
use crate::reflection::Action;

#[derive(Clone)]
pub(crate) struct Route {
    pub handler: BoxedHandler,
    pub action: Option<Action>,
}

/// Result of a successful lookup.
pub(crate) struct Matched {
    pub route: Route,
    pub params: HashMap<String, String>,
}

/// The application router. Build it once at startup and hand it to a
/// [`Kernel`](crate::Kernel).
pub struct Router {
    routes: HashMap<Method, MatchitRouter<Route>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Registers a plain handler. Path parameters use `{name}` syntax.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or conflicts with another one.
    pub fn on(self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.add(method, path, None, handler)
    }

    /// Registers a handler serving a controller action.
    ///
    /// ```rust
    /// # use restparam::{ControllerClass, ControllerRegistry, Method, Request, Router};
    /// # async fn list(_: Request) -> &'static str { "" }
    /// let mut registry = ControllerRegistry::new();
    /// registry.register(ControllerClass::new("UserController").method("list", std::iter::empty()));
    ///
    /// Router::new()
    ///     .action(Method::GET, "/users", registry.action("UserController", "list").unwrap(), list);
    /// ```
    ///
    /// # Panics
    ///
    /// Same as [`Router::on`].
    pub fn action(self, method: Method, path: &str, action: Action, handler: impl Handler) -> Self {
        self.add(method, path, Some(action), handler)
    }

    fn add(mut self, method: Method, path: &str, action: Option<Action>, handler: impl Handler) -> Self {
        let route = Route { handler: handler.into_boxed_handler(), action };
        self.routes
            .entry(method)
            .or_default()
            .insert(path, route)
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub(crate) fn lookup(&self, method: &Method, path: &str) -> Option<Matched> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let route = matched.value.clone();
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some(Matched { route, params })
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}
