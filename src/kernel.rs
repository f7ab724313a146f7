//! Request kernel: routing, action binding and sub-requests.
//!
//! The kernel is what both the [`Server`](crate::Server) and the in-process
//! [`TestClient`](crate::testing::TestClient) hand requests to. It is a
//! cheap `Arc` handle, so handlers can hold one and issue sub-requests:
//!
//! ```rust,no_run
//! # use restparam::{Error, Json, Method, Request};
//! async fn aggregate(req: Request) -> Result<Json<serde_json::Value>, Error> {
//!     let sub = Request::builder(Method::GET, "/inner").build()?;
//!     let inner = req.kernel()?.handle(sub).await;
//!     Ok(Json(serde_json::from_slice(inner.body()).unwrap_or_default()))
//! }
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::config::{Config, ListenerMode};
use crate::error::Error;
use crate::reader::ParamReader;
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::router::Router;

struct Inner {
    router: Router,
    reader: ParamReader,
    config: Config,
}

#[derive(Clone)]
pub struct Kernel {
    inner: Arc<Inner>,
}

impl Kernel {
    pub fn new(router: Router, reader: ParamReader, config: Config) -> Self {
        Self { inner: Arc::new(Inner { router, reader, config }) }
    }

    pub fn reader(&self) -> &ParamReader { &self.inner.reader }
    pub fn config(&self) -> &Config { &self.inner.config }

    /// Routes `req` and runs its handler. Never fails: routing misses and
    /// handler errors are rendered as responses.
    pub async fn handle(&self, mut req: Request) -> Response {
        let Some(matched) = self.inner.router.lookup(&req.method, req.uri.path()) else {
            debug!(method = %req.method, path = req.uri.path(), "no route");
            return Error::NotFound(req.uri.path().to_owned()).into_response();
        };

        req.params = matched.params;
        if let Some(action) = matched.route.action {
            req.action = Some(action);
        }
        req.kernel = Some(self.clone());

        if self.inner.config.param_fetcher_listener == ListenerMode::Force && req.action.is_some() {
            let fetched = req.param_fetcher().and_then(|fetcher| fetcher.all(None));
            match fetched {
                Ok(values) => req.attributes.extend(values),
                Err(err) => return err.into_response(),
            }
        }

        matched.route.handler.call(req).await
    }
}

impl std::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernel")
            .field("reader", &self.inner.reader)
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::ParamDeclaration;
    use crate::reflection::ControllerRegistry;
    use crate::response::Json;
    use http::{Method, StatusCode};

    async fn echo_attributes(req: Request) -> Json<serde_json::Value> {
        Json(serde_json::to_value(req.attributes()).unwrap_or_default())
    }

    fn kernel(mode: ListenerMode) -> Kernel {
        let mut registry = ControllerRegistry::new();
        registry.register(crate::ControllerClass::new("C").method(
            "m",
            [ParamDeclaration::query("page").requirements(r"\d+").default("1").strict(true)],
        ));
        let router = Router::new().action(
            Method::GET,
            "/items",
            registry.action("C", "m").unwrap(),
            echo_attributes,
        );
        Kernel::new(router, ParamReader::new(), Config::default().with_listener(mode))
    }

    #[tokio::test]
    async fn unknown_routes_are_404() {
        let req = Request::builder(Method::GET, "/nope").build().unwrap();
        let response = kernel(ListenerMode::Enabled).handle(req).await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn force_mode_fills_attributes() {
        let req = Request::builder(Method::GET, "/items?page=3").build().unwrap();
        let response = kernel(ListenerMode::Force).handle(req).await;
        assert_eq!(response.body(), br#"{"page":"3"}"#);

        let req = Request::builder(Method::GET, "/items").build().unwrap();
        let response = kernel(ListenerMode::Enabled).handle(req).await;
        assert_eq!(response.body(), b"{}");
    }

    #[tokio::test]
    async fn force_mode_rejects_invalid_params() {
        let req = Request::builder(Method::GET, "/items?page=x").build().unwrap();
        let response = kernel(ListenerMode::Force).handle(req).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    }
}
