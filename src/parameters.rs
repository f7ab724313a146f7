//! Named configuration parameters and `%name%` placeholder resolution.
//!
//! Param defaults and requirement patterns may reference configuration
//! values: `default("%app.locale%")`. A doubled `%%` is a literal percent
//! sign. A `%` not followed by a whitespace-free name and a closing `%` is
//! kept as-is.

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::Error;
use crate::value::ParamValue;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct Parameters(IndexMap<String, String>);

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn insert(&mut self, name: String, value: String) {
        self.0.insert(name, value);
    }

    /// Replaces every placeholder in `input`.
    pub fn resolve(&self, input: &str) -> Result<String, Error> {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;
        while let Some(start) = rest.find('%') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            if let Some(tail) = after.strip_prefix('%') {
                out.push('%');
                rest = tail;
                continue;
            }
            match after.find('%') {
                Some(end) if end > 0 && !after[..end].contains(char::is_whitespace) => {
                    let name = &after[..end];
                    let value = self.get(name).ok_or_else(|| {
                        Error::invalid_argument(format!(
                            "You have requested a non-existent parameter \"{name}\"."
                        ))
                    })?;
                    out.push_str(value);
                    rest = &after[end + 1..];
                }
                _ => {
                    out.push('%');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        Ok(out)
    }

    /// Resolves strings anywhere inside `value`.
    pub fn resolve_value(&self, value: &ParamValue) -> Result<ParamValue, Error> {
        Ok(match value {
            ParamValue::String(s) => ParamValue::String(self.resolve(s)?),
            ParamValue::List(items) => ParamValue::List(
                items.iter().map(|v| self.resolve_value(v)).collect::<Result<_, _>>()?,
            ),
            ParamValue::Map(map) => ParamValue::Map(
                map.iter()
                    .map(|(k, v)| Ok((k.clone(), self.resolve_value(v)?)))
                    .collect::<Result<_, Error>>()?,
            ),
            other => other.clone(),
        })
    }
}
