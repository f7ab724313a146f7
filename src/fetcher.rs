//! Param fetcher: reads declared params out of a request and validates them.
//!
//! For each declaration the fetcher takes the value from its source bag
//! (falling back to the default when absent), then:
//!
//! 1. rejects the request with [`Error::BadRequest`] if the param and one of
//!    its declared incompatibles were both sent;
//! 2. returns a non-null default untouched when the value *is* the default;
//! 3. validates the value against the declaration's constraints.
//!
//! A violation on a strict param is an [`Error::InvalidParameter`]. A
//! non-strict param silently falls back to its default, or to `""` when it
//! has none.

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::constraint::{self, Constraint, InvalidParameter};
use crate::error::Error;
use crate::param::ParamDeclaration;
use crate::parameters::Parameters;
use crate::reader::ParamReader;
use crate::request::Request;
use crate::value::{ParamBag, ParamValue};

struct Resolved {
    param: ParamDeclaration,
    constraints: Vec<Constraint>,
}

impl Resolved {
    fn new(param: &ParamDeclaration, parameters: &Parameters) -> Result<Self, Error> {
        let param = param.resolved(parameters)?;
        let constraints = param.constraints()?;
        Ok(Self { param, constraints })
    }
}

/// Per-request view of the params declared for the routed action.
pub struct ParamFetcher<'r> {
    request: &'r Request,
    parameters: &'r Parameters,
    params: IndexMap<String, Resolved>,
}

impl<'r> ParamFetcher<'r> {
    /// Reads the declarations of the action bound to `request`.
    pub fn new(reader: &ParamReader, request: &'r Request, parameters: &'r Parameters) -> Result<Self, Error> {
        let action = request.action().ok_or_else(|| {
            Error::invalid_argument("No controller action is bound to the request.")
        })?;
        let declared = reader.read(action.class(), action.method())?;
        let params = declared
            .values()
            .map(|param| Ok((param.name().to_owned(), Resolved::new(param, parameters)?)))
            .collect::<Result<_, Error>>()?;
        Ok(Self { request, parameters, params })
    }

    /// Adds or replaces a declaration for the rest of this request.
    pub fn add_param(&mut self, param: ParamDeclaration) -> Result<(), Error> {
        let resolved = Resolved::new(&param, self.parameters)?;
        self.params.insert(param.name().to_owned(), resolved);
        Ok(())
    }

    /// Declarations visible to this fetcher, with placeholders resolved.
    pub fn params(&self) -> impl Iterator<Item = &ParamDeclaration> {
        self.params.values().map(|r| &r.param)
    }

    /// Cleaned value of one param. `strict` overrides the declaration.
    pub fn get(&self, name: &str, strict: Option<bool>) -> Result<ParamValue, Error> {
        let resolved = self.params.get(name).ok_or_else(|| {
            Error::invalid_argument(format!("No param configuration for parameter '{name}'."))
        })?;
        let param = &resolved.param;
        let default = param.default_value().clone();
        let strict = strict.unwrap_or(param.is_strict());
        let value = param.value(self.request, &default);
        self.clean(resolved, value, strict, default)
    }

    /// Cleaned values of every declared param.
    pub fn all(&self, strict: Option<bool>) -> Result<ParamBag, Error> {
        self.params
            .keys()
            .map(|name| Ok((name.clone(), self.get(name, strict)?)))
            .collect()
    }

    fn clean(
        &self,
        resolved: &Resolved,
        value: ParamValue,
        strict: bool,
        default: ParamValue,
    ) -> Result<ParamValue, Error> {
        let param = &resolved.param;
        self.check_not_incompatible(param)?;

        if !default.is_null() && default.identical(&value) {
            return Ok(value);
        }
        if resolved.constraints.is_empty() {
            return Ok(value);
        }

        let violations = constraint::validate(&value, &resolved.constraints);
        if violations.is_empty() {
            return Ok(value);
        }
        if strict {
            warn!(param = param.name(), violations = violations.len(), "strict param rejected");
            return Err(InvalidParameter::new(param.request_key(), violations).into());
        }
        debug!(param = param.name(), "invalid value replaced by default");
        Ok(if default.is_null() { ParamValue::String(String::new()) } else { default })
    }

    fn check_not_incompatible(&self, param: &ParamDeclaration) -> Result<(), Error> {
        if param.value(self.request, &ParamValue::Null).is_null() {
            return Ok(());
        }
        for name in param.incompatible_names() {
            let other = self.params.get(name).ok_or_else(|| {
                Error::invalid_argument(format!("No param configuration for parameter '{name}'."))
            })?;
            if !other.param.value(self.request, &ParamValue::Null).is_null() {
                return Err(Error::BadRequest(format!(
                    "\"{}\" param is incompatible with {} param.",
                    other.param.name(),
                    param.name()
                )));
            }
        }
        Ok(())
    }
}
