//! # restparam
//!
//! Declarative request parameters for controller actions on a small hyper
//! framework.
//!
//! Controllers declare the query, body and file params they accept, either
//! as attributes on a [`ControllerClass`] or as doc-comment annotations read
//! by a [`DocAnnotationReader`]. The [`ParamReader`] merges class-wide and
//! method-level declarations (method wins), and the [`ParamFetcher`] pulls
//! each value out of the request, validates it and applies defaults.
//!
//! - Radix-tree routing via [`matchit`], routes bound to controller actions
//! - Query, urlencoded, JSON and multipart decoding with bracket nesting
//! - Strict params reject the request; lenient ones fall back to defaults
//! - `%name%` placeholders in defaults and requirements from [`Config`]
//! - Graceful shutdown on SIGTERM / Ctrl-C
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use restparam::{
//!     Config, ControllerClass, ControllerRegistry, Error, Json, Kernel, Method,
//!     ParamDeclaration, ParamReader, Request, Router, Server,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let mut registry = ControllerRegistry::new();
//!     registry.register(ControllerClass::new("UserController").method(
//!         "list",
//!         [
//!             ParamDeclaration::query("page").requirements(r"\d+").default("1"),
//!             ParamDeclaration::query("sort").requirements("asc|desc").strict(true).nullable(true),
//!         ],
//!     ));
//!
//!     let router = Router::new()
//!         .action(Method::GET, "/users", registry.action("UserController", "list")?, list_users);
//!
//!     let config = Config::from_env()?;
//!     let server = Server::from_config(&config);
//!     server.serve(Kernel::new(router, ParamReader::new(), config)).await
//! }
//!
//! async fn list_users(req: Request) -> Result<Json<restparam::ParamBag>, Error> {
//!     Ok(Json(req.param_fetcher()?.all(None)?))
//! }
//! ```

mod annotation;
mod body;
mod config;
mod constraint;
mod error;
mod fetcher;
mod handler;
mod kernel;
mod param;
mod parameters;
mod reader;
mod reflection;
mod request;
mod response;
mod router;
mod server;
mod value;

pub mod testing;

pub use annotation::{parse_doc, Annotation, AnnotationReader, DocAnnotationReader};
pub use body::parse_urlencoded;
pub use config::{Config, ListenerMode};
pub use constraint::{sniff_image, validate, Constraint, FileOptions, InvalidParameter, Violation};
pub use error::Error;
pub use fetcher::ParamFetcher;
pub use handler::Handler;
pub use kernel::Kernel;
pub use param::{ParamDeclaration, ParamSource, Requirement};
pub use parameters::Parameters;
pub use reader::{ParamMap, ParamReader};
pub use reflection::{Action, ControllerClass, ControllerRegistry};
pub use request::{Request, RequestBuilder};
pub use response::{IntoResponse, Json, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
pub use value::{ParamBag, ParamValue, UploadError, UploadedFile};

pub use http::{Method, StatusCode};
