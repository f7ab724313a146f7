//! Constraints and the validator that checks request values against them.
//!
//! Every constraint except [`Constraint::NotNull`] and
//! [`Constraint::NotBlank`] accepts a null value, so optional params only
//! need a `NotNull` to become required.

use std::fmt;

use regex::{Regex, RegexBuilder};
use thiserror::Error;

use crate::error::Error;
use crate::value::{ParamValue, UploadedFile};

/// A single validation rule.
#[derive(Clone, Debug)]
pub enum Constraint {
    NotNull,
    NotBlank,
    Regex { regex: Regex, message: String },
    IdenticalTo(ParamValue),
    File(FileOptions),
    Image(FileOptions),
    /// Applies the inner constraints to every element of a list or map.
    All(Vec<Constraint>),
}

/// Size and type limits shared by [`Constraint::File`] and [`Constraint::Image`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FileOptions {
    pub max_size: Option<u64>,
    /// Accepted mime types; `image/*` style wildcards allowed. Empty accepts all.
    pub mime_types: Vec<String>,
}

impl Constraint {
    /// Compiles an anchored, verbose, dot-matches-newline pattern.
    pub fn regex(pattern: &str, message: impl Into<String>) -> Result<Self, Error> {
        let regex = RegexBuilder::new(&format!("^(?:{pattern})$"))
            .ignore_whitespace(true)
            .dot_matches_new_line(true)
            .build()
            .map_err(|e| Error::invalid_argument(format!("invalid requirement `{pattern}`: {e}")))?;
        Ok(Self::Regex { regex, message: message.into() })
    }

    pub fn identical_to(value: impl Into<ParamValue>) -> Self {
        Self::IdenticalTo(value.into())
    }
}

/// One failed constraint.
#[derive(Clone, Debug, PartialEq)]
pub struct Violation {
    /// Empty for the value itself, `[key]` segments for nested elements.
    pub property_path: String,
    pub message: String,
    pub invalid_value: ParamValue,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.property_path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.property_path, self.message)
        }
    }
}

/// Validates `value` against every constraint, collecting all violations.
pub fn validate(value: &ParamValue, constraints: &[Constraint]) -> Vec<Violation> {
    let mut violations = Vec::new();
    for constraint in constraints {
        check(value, constraint, "", &mut violations);
    }
    violations
}

fn check(value: &ParamValue, constraint: &Constraint, path: &str, out: &mut Vec<Violation>) {
    let mut fail = |message: &str| {
        out.push(Violation {
            property_path: path.to_owned(),
            message: message.to_owned(),
            invalid_value: value.clone(),
        });
    };

    match constraint {
        Constraint::NotNull => {
            if value.is_null() {
                fail("This value should not be null.");
            }
        }
        Constraint::NotBlank => {
            if is_blank(value) {
                fail("This value should not be blank.");
            }
        }
        Constraint::Regex { regex, message } => {
            if value.is_null() {
                return;
            }
            match value.scalar_string() {
                Some(s) if s.is_empty() || regex.is_match(&s) => {}
                Some(_) => fail(message),
                None => fail("This value should be of type string."),
            }
        }
        Constraint::IdenticalTo(expected) => {
            if !value.is_null() && !value.identical(expected) {
                fail(&format!("This value should be identical to {expected}."));
            }
        }
        Constraint::File(options) => {
            if let Some(message) = check_file(value, options) {
                fail(message);
            }
        }
        Constraint::Image(options) => {
            let message = check_file(value, options).or_else(|| match value.as_file() {
                Some(file) if sniff_image(file.data()).is_none() => {
                    Some("This file is not a valid image.")
                }
                _ => None,
            });
            if let Some(message) = message {
                fail(message);
            }
        }
        Constraint::All(inner) => {
            if value.is_null() {
                return;
            }
            let Some(entries) = value.entries() else {
                fail("This value should be of type iterable.");
                return;
            };
            for (key, element) in entries {
                let element_path = format!("{path}[{key}]");
                for c in inner {
                    check(element, c, &element_path, out);
                }
            }
        }
    }
}

fn is_blank(value: &ParamValue) -> bool {
    match value {
        ParamValue::Null | ParamValue::Bool(false) => true,
        ParamValue::String(s) => s.is_empty(),
        ParamValue::List(items) => items.is_empty(),
        ParamValue::Map(map) => map.is_empty(),
        ParamValue::Number(_) | ParamValue::Bool(true) | ParamValue::File(_) => false,
    }
}

/// `None` when `value` is an acceptable upload (or null / empty).
fn check_file(value: &ParamValue, options: &FileOptions) -> Option<&'static str> {
    let file = match value {
        ParamValue::Null => return None,
        ParamValue::String(s) if s.is_empty() => return None,
        ParamValue::String(_) => return Some("The file could not be found."),
        ParamValue::File(file) => file,
        _ => return Some("This value should be of type file."),
    };
    if !file.is_valid() {
        return Some(file.error().message());
    }
    if options.max_size.is_some_and(|max| file.size() > max) {
        return Some("The file is too large.");
    }
    if !options.mime_types.is_empty() && !mime_accepted(file, &options.mime_types) {
        return Some("The mime type of the file is invalid.");
    }
    None
}

fn mime_accepted(file: &UploadedFile, accepted: &[String]) -> bool {
    let Some(actual) = sniff_image(file.data()).or(file.mime_type()) else {
        return false;
    };
    accepted.iter().any(|pattern| match pattern.strip_suffix("/*") {
        Some(prefix) => actual.split('/').next() == Some(prefix),
        None => pattern == actual,
    })
}

/// Detects common image formats from their leading bytes.
pub fn sniff_image(data: &[u8]) -> Option<&'static str> {
    match data {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some("image/png"),
        [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some("image/gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        [b'B', b'M', ..] => Some("image/bmp"),
        _ => None,
    }
}

// ── Strict failures ───────────────────────────────────────────────────────────

/// A strict param whose value violated one or more constraints.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct InvalidParameter {
    key: String,
    violations: Vec<Violation>,
    message: String,
}

impl InvalidParameter {
    pub(crate) fn new(key: &str, violations: Vec<Violation>) -> Self {
        let message = violations
            .iter()
            .map(|v| {
                format!(
                    "Parameter \"{key}\" of value \"{}\" violated a constraint \"{}\"",
                    v.invalid_value, v.message
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        Self { key: key.to_owned(), violations, message }
    }

    /// Request key of the offending param.
    pub fn key(&self) -> &str { &self.key }
    pub fn violations(&self) -> &[Violation] { &self.violations }
}
