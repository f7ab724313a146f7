//! Parameter declarations.
//!
//! A [`ParamDeclaration`] describes one request parameter of a controller
//! action: where it is read from, what it must look like, and what to use
//! when it is missing or invalid.
//!
//! ```rust
//! use restparam::{Constraint, ParamDeclaration};
//!
//! let page = ParamDeclaration::query("page")
//!     .requirements(r"\d+")
//!     .default("1")
//!     .description("Page of the listing");
//!
//! let avatar = ParamDeclaration::file("avatar")
//!     .image(true)
//!     .nullable(true);
//!
//! let raw = ParamDeclaration::request("raw")
//!     .requirements(Constraint::identical_to("expected"))
//!     .strict(false);
//! # let _ = (page, avatar, raw);
//! ```

use crate::constraint::{Constraint, FileOptions};
use crate::error::Error;
use crate::parameters::Parameters;
use crate::request::Request;
use crate::value::{ParamBag, ParamValue};

/// Which request bag a param is read from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParamSource {
    /// The query string.
    Query,
    /// The decoded request body.
    Request,
    /// Uploaded files.
    File,
}

/// Declared requirements of a param.
#[derive(Clone, Debug)]
pub enum Requirement {
    /// A regex the whole value must match.
    Pattern(String),
    /// A regex with a custom violation message.
    Rule { rule: String, error_message: String },
    /// Explicit constraints, used as-is.
    Constraints(Vec<Constraint>),
}

impl From<&str> for Requirement {
    fn from(pattern: &str) -> Self {
        Self::Pattern(pattern.to_owned())
    }
}

impl From<String> for Requirement {
    fn from(pattern: String) -> Self {
        Self::Pattern(pattern)
    }
}

impl From<Constraint> for Requirement {
    fn from(constraint: Constraint) -> Self {
        Self::Constraints(vec![constraint])
    }
}

impl From<Vec<Constraint>> for Requirement {
    fn from(constraints: Vec<Constraint>) -> Self {
        Self::Constraints(constraints)
    }
}

/// A named descriptor of one request parameter.
#[derive(Clone, Debug)]
pub struct ParamDeclaration {
    name: String,
    key: Option<String>,
    source: ParamSource,
    requirements: Option<Requirement>,
    default: ParamValue,
    description: Option<String>,
    strict: bool,
    nullable: bool,
    allow_blank: bool,
    map: bool,
    incompatibles: Vec<String>,
    image: bool,
    file_options: FileOptions,
}

impl ParamDeclaration {
    fn new(name: impl Into<String>, source: ParamSource, strict: bool) -> Self {
        Self {
            name: name.into(),
            key: None,
            source,
            requirements: None,
            default: ParamValue::Null,
            description: None,
            strict,
            nullable: false,
            allow_blank: true,
            map: false,
            incompatibles: Vec::new(),
            image: false,
            file_options: FileOptions::default(),
        }
    }

    /// A query-string param. Non-strict by default.
    pub fn query(name: impl Into<String>) -> Self {
        Self::new(name, ParamSource::Query, false)
    }

    /// A request-body param. Strict by default.
    pub fn request(name: impl Into<String>) -> Self {
        Self::new(name, ParamSource::Request, true)
    }

    /// An uploaded-file param. Strict by default.
    pub fn file(name: impl Into<String>) -> Self {
        Self::new(name, ParamSource::File, true)
    }

    // ── Builder ──────────────────────────────────────────────────────────────

    /// Reads the value from `key` instead of the param name.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn requirements(mut self, requirements: impl Into<Requirement>) -> Self {
        self.requirements = Some(requirements.into());
        self
    }

    /// A requirement pattern with a custom violation message.
    pub fn rule(mut self, rule: impl Into<String>, error_message: impl Into<String>) -> Self {
        self.requirements = Some(Requirement::Rule {
            rule: rule.into(),
            error_message: error_message.into(),
        });
        self
    }

    /// Default value. String defaults may contain `%name%` placeholders.
    pub fn default(mut self, default: impl Into<ParamValue>) -> Self {
        self.default = default.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn allow_blank(mut self, allow_blank: bool) -> Self {
        self.allow_blank = allow_blank;
        self
    }

    /// Expects a list or map; constraints apply to every element.
    pub fn map(mut self, map: bool) -> Self {
        self.map = map;
        self
    }

    /// Params that must not be sent together with this one.
    pub fn incompatibles<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.incompatibles = names.into_iter().map(Into::into).collect();
        self
    }

    /// File params only: require image content.
    pub fn image(mut self, image: bool) -> Self {
        self.image = image;
        self
    }

    /// File params only.
    pub fn max_size(mut self, bytes: u64) -> Self {
        self.file_options.max_size = Some(bytes);
        self
    }

    /// File params only.
    pub fn mime_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.file_options.mime_types = types.into_iter().map(Into::into).collect();
        self
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn name(&self) -> &str { &self.name }
    pub fn source(&self) -> ParamSource { self.source }
    pub fn default_value(&self) -> &ParamValue { &self.default }
    pub fn description_text(&self) -> Option<&str> { self.description.as_deref() }
    pub fn requirement(&self) -> Option<&Requirement> { self.requirements.as_ref() }
    pub fn is_strict(&self) -> bool { self.strict }
    pub fn is_nullable(&self) -> bool { self.nullable }
    pub fn allows_blank(&self) -> bool { self.allow_blank }
    pub fn is_map(&self) -> bool { self.map }
    pub fn is_image(&self) -> bool { self.image }
    pub fn incompatible_names(&self) -> &[String] { &self.incompatibles }

    /// Key looked up in the request bag.
    pub fn request_key(&self) -> &str {
        self.key.as_deref().unwrap_or(&self.name)
    }

    /// The raw value sent for this param, or `default` when absent or null.
    pub fn value(&self, request: &Request, default: &ParamValue) -> ParamValue {
        let bag: &ParamBag = match self.source {
            ParamSource::Query => request.query(),
            ParamSource::Request => request.form(),
            ParamSource::File => request.files(),
        };
        match bag.get(self.request_key()) {
            Some(value) if !value.is_null() => value.clone(),
            _ => default.clone(),
        }
    }

    /// Copy with placeholders in the default and requirement pattern resolved.
    pub(crate) fn resolved(&self, parameters: &Parameters) -> Result<Self, Error> {
        let mut param = self.clone();
        param.default = parameters.resolve_value(&self.default)?;
        param.requirements = match &self.requirements {
            Some(Requirement::Pattern(p)) => Some(Requirement::Pattern(parameters.resolve(p)?)),
            Some(Requirement::Rule { rule, error_message }) => Some(Requirement::Rule {
                rule: parameters.resolve(rule)?,
                error_message: error_message.clone(),
            }),
            other => other.clone(),
        };
        Ok(param)
    }

    /// Constraints a value of this param is validated against.
    pub fn constraints(&self) -> Result<Vec<Constraint>, Error> {
        match self.source {
            ParamSource::File => self.file_constraints(),
            ParamSource::Query | ParamSource::Request => self.scalar_constraints(),
        }
    }

    fn scalar_constraints(&self) -> Result<Vec<Constraint>, Error> {
        let mut constraints = Vec::new();
        if !self.nullable {
            constraints.push(Constraint::NotNull);
        }
        match &self.requirements {
            Some(Requirement::Pattern(pattern)) => constraints.push(Constraint::regex(
                pattern,
                format!(
                    "Parameter '{}' value, does not match requirements '{pattern}'",
                    self.name
                ),
            )?),
            Some(Requirement::Rule { rule, error_message }) => {
                constraints.push(Constraint::regex(rule, error_message.clone())?);
            }
            Some(Requirement::Constraints(explicit)) => constraints.extend(explicit.iter().cloned()),
            None => {}
        }
        if !self.allow_blank {
            constraints.push(Constraint::NotBlank);
        }
        if self.map {
            let mut mapped = vec![Constraint::All(constraints)];
            if !self.nullable {
                mapped.push(Constraint::NotNull);
            }
            return Ok(mapped);
        }
        Ok(constraints)
    }

    fn file_constraints(&self) -> Result<Vec<Constraint>, Error> {
        let mut constraints = Vec::new();
        if !self.nullable {
            constraints.push(Constraint::NotNull);
        }
        match &self.requirements {
            Some(Requirement::Constraints(explicit)) => constraints.extend(explicit.iter().cloned()),
            Some(_) => {
                return Err(Error::invalid_argument(format!(
                    "File param '{}' only accepts constraint requirements.",
                    self.name
                )));
            }
            None => {}
        }
        constraints.push(if self.image {
            Constraint::Image(self.file_options.clone())
        } else {
            Constraint::File(self.file_options.clone())
        });
        if self.map {
            return Ok(vec![Constraint::All(constraints)]);
        }
        Ok(constraints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_defaults() {
        assert!(!ParamDeclaration::query("q").is_strict());
        assert!(ParamDeclaration::request("r").is_strict());
        assert!(ParamDeclaration::file("f").is_strict());
        let p = ParamDeclaration::query("q");
        assert!(!p.is_nullable() && p.allows_blank() && !p.is_map());
    }

    #[test]
    fn key_falls_back_to_name() {
        assert_eq!(ParamDeclaration::query("q").request_key(), "q");
        assert_eq!(ParamDeclaration::query("q").key("query").request_key(), "query");
    }

    #[test]
    fn scalar_constraint_order() {
        let c = ParamDeclaration::query("foz")
            .requirements("[a-z]+")
            .allow_blank(false)
            .constraints()
            .unwrap();
        assert!(matches!(c[0], Constraint::NotNull));
        assert!(matches!(&c[1], Constraint::Regex { message, .. }
            if message == "Parameter 'foz' value, does not match requirements '[a-z]+'"));
        assert!(matches!(c[2], Constraint::NotBlank));
    }

    #[test]
    fn nullable_params_have_no_not_null() {
        let c = ParamDeclaration::query("bar").nullable(true).constraints().unwrap();
        assert!(c.is_empty());
    }

    #[test]
    fn map_wraps_constraints() {
        let c = ParamDeclaration::request("map").map(true).requirements(r"\d+").constraints().unwrap();
        assert_eq!(c.len(), 2);
        assert!(matches!(&c[0], Constraint::All(inner) if inner.len() == 2));
        assert!(matches!(c[1], Constraint::NotNull));
    }

    #[test]
    fn rule_uses_custom_message() {
        let c = ParamDeclaration::query("id").nullable(true).rule(r"\d+", "id must be numeric")
            .constraints()
            .unwrap();
        assert!(matches!(&c[0], Constraint::Regex { message, .. } if message == "id must be numeric"));
    }

    #[test]
    fn file_constraints() {
        let c = ParamDeclaration::file("img").image(true).map(true).constraints().unwrap();
        let [Constraint::All(inner)] = c.as_slice() else { panic!("expected All") };
        assert!(matches!(inner[0], Constraint::NotNull));
        assert!(matches!(inner[1], Constraint::Image(_)));
        assert!(ParamDeclaration::file("f").requirements(r"\d+").constraints().is_err());
    }
}
