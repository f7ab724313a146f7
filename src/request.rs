//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri};

use crate::body::{self, insert_nested};
use crate::error::Error;
use crate::fetcher::ParamFetcher;
use crate::kernel::Kernel;
use crate::reflection::Action;
use crate::value::{ParamBag, ParamValue, UploadedFile};

/// An incoming HTTP request with its query string and body decoded.
pub struct Request {
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) query: ParamBag,
    pub(crate) form: ParamBag,
    pub(crate) files: ParamBag,
    pub(crate) attributes: ParamBag,
    pub(crate) params: HashMap<String, String>,
    pub(crate) action: Option<Action>,
    pub(crate) kernel: Option<Kernel>,
}

impl Request {
    /// Starts a request built in-process (tests, sub-requests).
    pub fn builder(method: Method, uri: &str) -> RequestBuilder {
        RequestBuilder {
            method,
            uri: uri.to_owned(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            form: ParamBag::new(),
            files: ParamBag::new(),
            action: None,
        }
    }

    /// Decodes a request received off the wire.
    pub(crate) async fn decode(parts: http::request::Parts, body: Bytes) -> Result<Self, Error> {
        let query = parse_query(&parts.uri)?;
        let content_type = parts.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
        let decoded = body::decode(content_type, body.clone()).await?;
        Ok(Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            query,
            form: decoded.form,
            files: decoded.files,
            attributes: ParamBag::new(),
            params: HashMap::new(),
            action: None,
            kernel: None,
        })
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Decoded query string.
    pub fn query(&self) -> &ParamBag { &self.query }

    /// Decoded body fields (urlencoded, JSON object, or multipart text parts).
    pub fn form(&self) -> &ParamBag { &self.form }

    /// Uploaded files.
    pub fn files(&self) -> &ParamBag { &self.files }

    /// Values attached while routing, e.g. fetched params in `force` mode.
    pub fn attributes(&self) -> &ParamBag { &self.attributes }

    pub fn attribute(&self, name: &str) -> Option<&ParamValue> {
        self.attributes.get(name)
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// The controller action this request was routed to.
    pub fn action(&self) -> Option<&Action> {
        self.action.as_ref()
    }

    /// The kernel handling this request, for sub-requests.
    pub fn kernel(&self) -> Result<&Kernel, Error> {
        self.kernel
            .as_ref()
            .ok_or_else(|| Error::invalid_argument("The request is not being handled by a kernel."))
    }

    /// Param fetcher for the routed action.
    pub fn param_fetcher(&self) -> Result<ParamFetcher<'_>, Error> {
        let kernel = self.kernel()?;
        ParamFetcher::new(kernel.reader(), self, &kernel.config().parameters)
    }
}

fn parse_query(uri: &Uri) -> Result<ParamBag, Error> {
    match uri.query() {
        Some(q) => body::parse_urlencoded(q.as_bytes()),
        None => Ok(ParamBag::new()),
    }
}

/// Builder for in-process requests. Body bags are set directly, the way a
/// test client posts parameters without encoding them.
pub struct RequestBuilder {
    method: Method,
    uri: String,
    headers: HeaderMap,
    body: Bytes,
    form: ParamBag,
    files: ParamBag,
    action: Option<Action>,
}

impl RequestBuilder {
    pub fn header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
        self
    }

    /// Sets a body field. `key` may use bracket nesting.
    pub fn form(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        insert_nested(&mut self.form, key, value.into());
        self
    }

    /// Replaces every body field.
    pub fn form_bag(mut self, bag: ParamBag) -> Self {
        self.form = bag;
        self
    }

    pub fn file(mut self, key: &str, file: UploadedFile) -> Self {
        insert_nested(&mut self.files, key, file.into());
        self
    }

    pub fn files(mut self, key: &str, files: Vec<UploadedFile>) -> Self {
        insert_nested(&mut self.files, key, files.into());
        self
    }

    pub fn raw_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Binds the request to an action without routing.
    pub fn action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    pub fn build(self) -> Result<Request, Error> {
        let uri: Uri = self
            .uri
            .parse()
            .map_err(|e| Error::invalid_argument(format!("invalid uri `{}`: {e}", self.uri)))?;
        Ok(Request {
            method: self.method,
            query: parse_query(&uri)?,
            uri,
            headers: self.headers,
            body: self.body,
            form: self.form,
            files: self.files,
            attributes: ParamBag::new(),
            params: HashMap::new(),
            action: self.action,
            kernel: None,
        })
    }
}
