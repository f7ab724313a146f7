//! In-process test client.
//!
//! Sends [`Request`]s straight to a [`Kernel`] without opening a socket:
//!
//! ```rust
//! # use restparam::{Config, Kernel, Method, ParamReader, Request, Router};
//! # use restparam::testing::TestClient;
//! # async fn hello(_: Request) -> &'static str { "hello" }
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), restparam::Error> {
//! let kernel = Kernel::new(
//!     Router::new().on(Method::GET, "/", hello),
//!     ParamReader::new(),
//!     Config::default(),
//! );
//! let client = TestClient::new(kernel);
//! let response = client.get("/").await?;
//! assert!(response.is_successful());
//! assert_eq!(response.text(), "hello");
//! # Ok(())
//! # }
//! ```

use http::{Method, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::Error;
use crate::kernel::Kernel;
use crate::request::Request;
use crate::response::Response;
use crate::value::ParamBag;

pub struct TestClient {
    kernel: Kernel,
}

impl TestClient {
    pub fn new(kernel: Kernel) -> Self {
        Self { kernel }
    }

    pub fn kernel(&self) -> &Kernel { &self.kernel }

    pub async fn request(&self, request: Request) -> TestResponse {
        TestResponse(self.kernel.handle(request).await)
    }

    pub async fn get(&self, uri: &str) -> Result<TestResponse, Error> {
        Ok(self.request(Request::builder(Method::GET, uri).build()?).await)
    }

    /// Posts `form` as already-decoded body fields.
    pub async fn post(&self, uri: &str, form: ParamBag) -> Result<TestResponse, Error> {
        Ok(self.request(Request::builder(Method::POST, uri).form_bag(form).build()?).await)
    }
}

/// A response captured by [`TestClient`].
#[derive(Debug)]
pub struct TestResponse(Response);

impl TestResponse {
    pub fn status(&self) -> StatusCode { self.0.status_code() }

    pub fn is_successful(&self) -> bool { self.0.status_code().is_success() }

    pub fn header(&self, name: &str) -> Option<&str> { self.0.header(name) }

    /// Body as UTF-8, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(self.0.body()).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(self.0.body())
    }

    pub fn into_inner(self) -> Response { self.0 }
}
