//! Param declaration reader.
//!
//! Collects the [`ParamDeclaration`]s that apply to one controller action.
//! Each scope (the method, then the class) is discovered from two sources,
//! in order: attributes registered on the [`ControllerClass`], then the
//! optional [`AnnotationReader`]. Within a scope a later declaration
//! replaces an earlier one of the same name. Across scopes, method-level
//! declarations win over class-level ones.
//!
//! ```rust
//! use restparam::{ControllerClass, ParamDeclaration, ParamReader};
//!
//! let class = ControllerClass::new("ParamsController")
//!     .param(ParamDeclaration::request("raw").default("class"))
//!     .param(ParamDeclaration::request("bar").nullable(true))
//!     .method("params", [ParamDeclaration::request("raw").default("method")]);
//!
//! let params = ParamReader::new().read(&class, "params").unwrap();
//! assert_eq!(params.len(), 2);
//! assert_eq!(params["raw"].default_value().as_str(), Some("method"));
//! ```

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::annotation::{Annotation, AnnotationReader};
use crate::error::Error;
use crate::param::ParamDeclaration;
use crate::reflection::ControllerClass;

/// Name-keyed declarations. Order carries no meaning.
pub type ParamMap = IndexMap<String, ParamDeclaration>;

/// Reads and merges param declarations. Cheap to clone.
#[derive(Clone, Default)]
pub struct ParamReader {
    annotation_reader: Option<Arc<dyn AnnotationReader>>,
}

impl ParamReader {
    /// A reader that only sees registered attributes.
    pub fn new() -> Self {
        Self::default()
    }

    /// A reader that also consults `annotation_reader`.
    pub fn with_annotation_reader(annotation_reader: impl AnnotationReader + 'static) -> Self {
        Self { annotation_reader: Some(Arc::new(annotation_reader)) }
    }

    /// Merged declarations of `class::method`.
    ///
    /// Fails with [`Error::InvalidArgument`] if the class has no such method;
    /// nothing is discovered in that case.
    pub fn read(&self, class: &ControllerClass, method: &str) -> Result<ParamMap, Error> {
        let mut params = self.params_from_method(class, method)?;
        for (name, param) in self.params_from_class(class) {
            params.entry(name).or_insert(param);
        }
        debug!(class = class.name(), method, count = params.len(), "read param declarations");
        Ok(params)
    }

    /// Method-scope declarations only.
    pub fn params_from_method(&self, class: &ControllerClass, method: &str) -> Result<ParamMap, Error> {
        let attributes = class.attributes_of(method).ok_or_else(|| {
            Error::invalid_argument(format!(
                "Class \"{}\" has no method \"{method}\".",
                class.name()
            ))
        })?;
        let annotations = self
            .annotation_reader
            .as_ref()
            .map(|reader| reader.method_annotations(class, method))
            .unwrap_or_default();
        Ok(collect(attributes.iter().chain(&annotations)))
    }

    /// Class-scope declarations only.
    pub fn params_from_class(&self, class: &ControllerClass) -> ParamMap {
        let annotations = self
            .annotation_reader
            .as_ref()
            .map(|reader| reader.class_annotations(class))
            .unwrap_or_default();
        collect(class.attributes().iter().chain(&annotations))
    }
}

impl fmt::Debug for ParamReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamReader")
            .field("annotation_reader", &self.annotation_reader.is_some())
            .finish()
    }
}

/// Keeps param annotations only; the last one of each name wins.
fn collect<'a>(annotations: impl Iterator<Item = &'a Annotation>) -> ParamMap {
    let mut params = ParamMap::new();
    for param in annotations.filter_map(Annotation::as_param) {
        params.insert(param.name().to_owned(), param.clone());
    }
    params
}
