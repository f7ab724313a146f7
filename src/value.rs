//! Request value model.
//!
//! Everything a client can send (query strings, form fields, JSON bodies,
//! uploaded files) is decoded into [`ParamValue`] trees stored in
//! [`ParamBag`]s, one bag per source.

use std::fmt;

use bytes::Bytes;
use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// Name-keyed, insertion-ordered collection of request values.
pub type ParamBag = IndexMap<String, ParamValue>;

/// One decoded request value.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum ParamValue {
    #[default]
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    List(Vec<ParamValue>),
    Map(IndexMap<String, ParamValue>),
    File(UploadedFile),
}

impl ParamValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<&UploadedFile> {
        match self {
            Self::File(f) => Some(f),
            _ => None,
        }
    }

    /// Elements of a list or map, with their keys. `None` for anything else.
    pub fn entries(&self) -> Option<Vec<(String, &ParamValue)>> {
        match self {
            Self::List(items) => Some(
                items.iter().enumerate().map(|(i, v)| (i.to_string(), v)).collect(),
            ),
            Self::Map(map) => Some(map.iter().map(|(k, v)| (k.clone(), v)).collect()),
            _ => None,
        }
    }

    /// String form of a scalar, as a regex sees it.
    pub(crate) fn scalar_string(&self) -> Option<String> {
        match self {
            Self::String(s) => Some(s.clone()),
            Self::Number(n) => Some(n.to_string()),
            Self::Bool(true) => Some("1".to_owned()),
            Self::Bool(false) => Some(String::new()),
            _ => None,
        }
    }

    /// Strict identity: same variant, same contents, same key order.
    pub fn identical(&self, other: &ParamValue) -> bool {
        match (self, other) {
            (Self::Map(a), Self::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b.iter())
                        .all(|((ka, va), (kb, vb))| ka == kb && va.identical(vb))
            }
            (Self::List(a), Self::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.identical(y))
            }
            _ => self == other,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => serde_json::Value::Number(n.clone()),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::List(items) => items.iter().map(ParamValue::to_json).collect(),
            Self::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Self::File(f) => serde_json::Value::String(f.client_name.clone()),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::File(file) => f.write_str(&file.client_name),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

/// Files serialize as their client-side file name.
impl Serialize for ParamValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => n.serialize(serializer),
            Self::String(s) => serializer.serialize_str(s),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            Self::File(file) => serializer.serialize_str(&file.client_name),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for ParamValue {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<UploadedFile> for ParamValue {
    fn from(f: UploadedFile) -> Self {
        Self::File(f)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<IndexMap<String, ParamValue>> for ParamValue {
    fn from(map: IndexMap<String, ParamValue>) -> Self {
        Self::Map(map)
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl From<serde_json::Value> for ParamValue {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Into::into).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

// ── Uploaded files ────────────────────────────────────────────────────────────

/// Outcome of receiving one uploaded file.
///
/// Mirrors the classic CGI upload status codes so front-ends that stage
/// uploads elsewhere can report why a file is missing or truncated.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum UploadError {
    #[default]
    Ok,
    IniSize,
    FormSize,
    Partial,
    NoFile,
    NoTmpDir,
    CantWrite,
    Extension,
}

impl UploadError {
    /// Maps a numeric upload status (0–8, 5 unused). Unknown codes map to
    /// `CantWrite`.
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Ok,
            1 => Self::IniSize,
            2 => Self::FormSize,
            3 => Self::Partial,
            4 => Self::NoFile,
            6 => Self::NoTmpDir,
            8 => Self::Extension,
            _ => Self::CantWrite,
        }
    }

    pub(crate) fn message(self) -> &'static str {
        match self {
            Self::Ok => "",
            Self::IniSize | Self::FormSize => "The file is too large.",
            Self::Partial => "The file was only partially uploaded.",
            Self::NoFile => "No file was uploaded.",
            Self::NoTmpDir => "No temporary folder was configured.",
            Self::CantWrite => "Cannot write temporary file to disk.",
            Self::Extension => "An extension stopped the file upload.",
        }
    }
}

/// A file received in a `multipart/form-data` body.
#[derive(Clone, Debug, PartialEq)]
pub struct UploadedFile {
    pub(crate) client_name: String,
    pub(crate) mime_type: Option<String>,
    pub(crate) data: Bytes,
    pub(crate) error: UploadError,
}

impl UploadedFile {
    pub fn new(client_name: impl Into<String>, mime_type: Option<&str>, data: impl Into<Bytes>) -> Self {
        Self {
            client_name: client_name.into(),
            mime_type: mime_type.map(str::to_owned),
            data: data.into(),
            error: UploadError::Ok,
        }
    }

    pub fn with_error(mut self, error: UploadError) -> Self {
        self.error = error;
        self
    }

    /// File name as sent by the client.
    pub fn client_name(&self) -> &str { &self.client_name }
    /// Mime type as declared by the client. Not trusted by validation.
    pub fn mime_type(&self) -> Option<&str> { self.mime_type.as_deref() }
    pub fn data(&self) -> &Bytes { &self.data }
    pub fn size(&self) -> u64 { self.data.len() as u64 }
    pub fn error(&self) -> UploadError { self.error }

    pub fn is_valid(&self) -> bool {
        self.error == UploadError::Ok
    }
}
