//! Annotation sources.
//!
//! Besides the attributes registered on a
//! [`ControllerClass`](crate::ControllerClass), params can come from an
//! [`AnnotationReader`]: any collaborator that returns annotations for a
//! class or one of its methods. [`DocAnnotationReader`] is the bundled
//! implementation; it parses doc-block style annotations such as
//!
//! ```text
//! @QueryParam(name="foz", requirements="[a-z]+", incompatibles={"baz"})
//! @RequestParam(name="id", requirements={"rule"="\d+", "error_message"="numeric id expected"})
//! @FileParam(name="avatar", image=true, nullable=true)
//! ```
//!
//! Only param annotations take part in param discovery; anything else is
//! kept as [`Annotation::Other`] and skipped.

use std::collections::HashMap;

use crate::error::Error;
use crate::param::{ParamDeclaration, Requirement};
use crate::reflection::ControllerClass;
use crate::value::ParamValue;

/// One piece of metadata attached to a class or method.
#[derive(Clone, Debug)]
pub enum Annotation {
    Param(ParamDeclaration),
    /// Any non-param annotation, by name.
    Other(String),
}

impl Annotation {
    pub fn as_param(&self) -> Option<&ParamDeclaration> {
        match self {
            Self::Param(param) => Some(param),
            Self::Other(_) => None,
        }
    }
}

impl From<ParamDeclaration> for Annotation {
    fn from(param: ParamDeclaration) -> Self {
        Self::Param(param)
    }
}

/// External source of annotations.
pub trait AnnotationReader: Send + Sync {
    fn method_annotations(&self, class: &ControllerClass, method: &str) -> Vec<Annotation>;
    fn class_annotations(&self, class: &ControllerClass) -> Vec<Annotation>;
}

/// Annotations parsed from doc-block text, keyed by class and method name.
#[derive(Debug, Default)]
pub struct DocAnnotationReader {
    classes: HashMap<String, Vec<Annotation>>,
    methods: HashMap<(String, String), Vec<Annotation>>,
}

impl DocAnnotationReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and stores the doc block of class `class`.
    pub fn class_doc(mut self, class: &str, doc: &str) -> Result<Self, Error> {
        let parsed = parse_doc(doc)?;
        self.classes.entry(class.to_owned()).or_default().extend(parsed);
        Ok(self)
    }

    /// Parses and stores the doc block of `class::method`.
    pub fn method_doc(mut self, class: &str, method: &str, doc: &str) -> Result<Self, Error> {
        let parsed = parse_doc(doc)?;
        self.methods
            .entry((class.to_owned(), method.to_owned()))
            .or_default()
            .extend(parsed);
        Ok(self)
    }
}

impl AnnotationReader for DocAnnotationReader {
    fn method_annotations(&self, class: &ControllerClass, method: &str) -> Vec<Annotation> {
        self.methods
            .get(&(class.name().to_owned(), method.to_owned()))
            .cloned()
            .unwrap_or_default()
    }

    fn class_annotations(&self, class: &ControllerClass) -> Vec<Annotation> {
        self.classes.get(class.name()).cloned().unwrap_or_default()
    }
}

// ── Parsing ───────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
enum Literal {
    Str(String),
    Number(String),
    Bool(bool),
    Null,
    List(Vec<Literal>),
    Map(Vec<(String, Literal)>),
}

/// Parses every `@Name(...)` annotation in a doc block.
pub fn parse_doc(doc: &str) -> Result<Vec<Annotation>, Error> {
    let mut cursor = Cursor { chars: doc.chars().collect(), pos: 0 };
    let mut annotations = Vec::new();
    while let Some(c) = cursor.peek() {
        let at_word_start = cursor.pos == 0
            || cursor.chars[cursor.pos - 1].is_whitespace()
            || cursor.chars[cursor.pos - 1] == '*';
        if c != '@' || !at_word_start {
            cursor.pos += 1;
            continue;
        }
        cursor.pos += 1;
        let name = cursor.identifier();
        if name.is_empty() {
            continue;
        }
        let args = if cursor.peek() == Some('(') {
            cursor.pos += 1;
            cursor.arguments()?
        } else {
            Vec::new()
        };
        annotations.push(build(&name, args)?);
    }
    Ok(annotations)
}

fn build(name: &str, args: Vec<(Option<String>, Literal)>) -> Result<Annotation, Error> {
    let short = name.rsplit('\\').next().unwrap_or(name);
    let declare: fn(String) -> ParamDeclaration = match short {
        "QueryParam" => |n| ParamDeclaration::query(n),
        "RequestParam" => |n| ParamDeclaration::request(n),
        "FileParam" => |n| ParamDeclaration::file(n),
        _ => return Ok(Annotation::Other(short.to_owned())),
    };

    let mut param_name = None;
    let mut options = Vec::new();
    for (key, value) in args {
        match key.as_deref() {
            None | Some("name") => param_name = Some(expect_str(short, "name", value)?),
            Some(key) => options.push((key.to_owned(), value)),
        }
    }
    let param_name = param_name
        .ok_or_else(|| Error::invalid_argument(format!("@{short} requires a \"name\".")))?;

    let mut param = declare(param_name);
    for (key, value) in options {
        param = apply(short, param, &key, value)?;
    }
    Ok(Annotation::Param(param))
}

fn apply(annotation: &str, param: ParamDeclaration, key: &str, value: Literal) -> Result<ParamDeclaration, Error> {
    Ok(match key {
        "key" => param.key(expect_str(annotation, key, value)?),
        "description" => param.description(expect_str(annotation, key, value)?),
        "default" => param.default(to_value(value)),
        "strict" => param.strict(expect_bool(annotation, key, value)?),
        "nullable" => param.nullable(expect_bool(annotation, key, value)?),
        "allowBlank" => param.allow_blank(expect_bool(annotation, key, value)?),
        "map" => param.map(expect_bool(annotation, key, value)?),
        "image" => param.image(expect_bool(annotation, key, value)?),
        "maxSize" => match value {
            Literal::Number(n) => param.max_size(n.parse().map_err(|_| invalid(annotation, key))?),
            _ => return Err(invalid(annotation, key)),
        },
        "mimeTypes" => param.mime_types(expect_strings(annotation, key, value)?),
        "incompatibles" => param.incompatibles(expect_strings(annotation, key, value)?),
        "requirements" => match value {
            Literal::Str(pattern) => param.requirements(Requirement::Pattern(pattern)),
            Literal::Map(entries) => {
                let mut rule = None;
                let mut message = None;
                for (k, v) in entries {
                    match k.as_str() {
                        "rule" => rule = Some(expect_str(annotation, "rule", v)?),
                        "error_message" => message = Some(expect_str(annotation, "error_message", v)?),
                        _ => return Err(invalid(annotation, key)),
                    }
                }
                match (rule, message) {
                    (Some(rule), Some(message)) => param.rule(rule, message),
                    _ => return Err(invalid(annotation, key)),
                }
            }
            _ => return Err(invalid(annotation, key)),
        },
        _ => {
            return Err(Error::invalid_argument(format!(
                "@{annotation} has no option \"{key}\"."
            )));
        }
    })
}

fn invalid(annotation: &str, key: &str) -> Error {
    Error::invalid_argument(format!("@{annotation}: invalid value for \"{key}\"."))
}

fn expect_str(annotation: &str, key: &str, value: Literal) -> Result<String, Error> {
    match value {
        Literal::Str(s) => Ok(s),
        _ => Err(invalid(annotation, key)),
    }
}

fn expect_bool(annotation: &str, key: &str, value: Literal) -> Result<bool, Error> {
    match value {
        Literal::Bool(b) => Ok(b),
        _ => Err(invalid(annotation, key)),
    }
}

fn expect_strings(annotation: &str, key: &str, value: Literal) -> Result<Vec<String>, Error> {
    match value {
        Literal::Str(s) => Ok(vec![s]),
        Literal::List(items) => items.into_iter().map(|i| expect_str(annotation, key, i)).collect(),
        _ => Err(invalid(annotation, key)),
    }
}

fn to_value(literal: Literal) -> ParamValue {
    match literal {
        Literal::Str(s) => ParamValue::String(s),
        Literal::Number(n) => serde_json::from_str::<serde_json::Number>(&n)
            .map_or(ParamValue::String(n), ParamValue::Number),
        Literal::Bool(b) => ParamValue::Bool(b),
        Literal::Null => ParamValue::Null,
        Literal::List(items) => ParamValue::List(items.into_iter().map(to_value).collect()),
        Literal::Map(entries) => {
            ParamValue::Map(entries.into_iter().map(|(k, v)| (k, to_value(v))).collect())
        }
    }
}

struct Cursor {
    chars: Vec<char>,
    pos: usize,
}

impl Cursor {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn error(&self, what: &str) -> Error {
        Error::invalid_argument(format!("annotation syntax error at offset {}: {what}", self.pos))
    }

    /// Skips whitespace and the `*` gutters of doc blocks.
    fn skip_blank(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace() || c == '*') {
            self.pos += 1;
        }
    }

    fn identifier(&mut self) -> String {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_' || c == '\\') {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn expect(&mut self, c: char) -> Result<(), Error> {
        self.skip_blank();
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected `{c}`")))
        }
    }

    /// `key=value, value, ...)` after the opening parenthesis.
    fn arguments(&mut self) -> Result<Vec<(Option<String>, Literal)>, Error> {
        let mut args = Vec::new();
        loop {
            self.skip_blank();
            if self.peek() == Some(')') {
                self.pos += 1;
                return Ok(args);
            }
            let first = self.literal()?;
            self.skip_blank();
            let arg = if self.peek() == Some('=') {
                self.pos += 1;
                let Literal::Str(key) = first else {
                    return Err(self.error("option names must be identifiers"));
                };
                (Some(key), self.literal()?)
            } else {
                (None, first)
            };
            args.push(arg);
            self.skip_blank();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(')') => {}
                _ => return Err(self.error("expected `,` or `)`")),
            }
        }
    }

    fn literal(&mut self) -> Result<Literal, Error> {
        self.skip_blank();
        match self.peek() {
            Some('"') => self.string().map(Literal::Str),
            Some('{') => self.braces(),
            Some(c) if c == '-' || c.is_ascii_digit() => {
                let start = self.pos;
                self.pos += 1;
                while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '.') {
                    self.pos += 1;
                }
                Ok(Literal::Number(self.chars[start..self.pos].iter().collect()))
            }
            Some(c) if c.is_alphabetic() || c == '_' => {
                let word = self.identifier();
                Ok(match word.to_ascii_lowercase().as_str() {
                    "true" => Literal::Bool(true),
                    "false" => Literal::Bool(false),
                    "null" => Literal::Null,
                    _ => Literal::Str(word),
                })
            }
            _ => Err(self.error("expected a value")),
        }
    }

    /// A double-quoted string; `""` is an escaped quote, backslashes are literal.
    fn string(&mut self) -> Result<String, Error> {
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated string")),
                Some('"') if self.chars.get(self.pos + 1) == Some(&'"') => {
                    out.push('"');
                    self.pos += 2;
                }
                Some('"') => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some(c) => {
                    out.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    /// `{"a", "b"}` is a list, `{"k"="v"}` (or `:`) a map.
    fn braces(&mut self) -> Result<Literal, Error> {
        self.pos += 1;
        let mut items = Vec::new();
        let mut entries = Vec::new();
        loop {
            self.skip_blank();
            if self.peek() == Some('}') {
                self.pos += 1;
                break;
            }
            let first = self.literal()?;
            self.skip_blank();
            if matches!(self.peek(), Some('=' | ':')) {
                self.pos += 1;
                let (Literal::Str(key) | Literal::Number(key)) = first else {
                    return Err(self.error("map keys must be strings"));
                };
                entries.push((key, self.literal()?));
            } else {
                items.push(first);
            }
            self.skip_blank();
            if self.peek() == Some(',') {
                self.pos += 1;
            } else {
                self.expect('}')?;
                break;
            }
        }
        match (items.is_empty(), entries.is_empty()) {
            (_, true) => Ok(Literal::List(items)),
            (true, false) => Ok(Literal::Map(entries)),
            (false, false) => Err(self.error("cannot mix list items and map entries")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::ParamSource;

    fn params(doc: &str) -> Vec<ParamDeclaration> {
        parse_doc(doc)
            .unwrap()
            .into_iter()
            .filter_map(|a| a.as_param().cloned())
            .collect()
    }

    #[test]
    fn parses_a_doc_block() {
        let doc = r#"
            /**
             * Lists things.
             *
             * @Route("/things")
             * @QueryParam(name="foz", requirements="[a-z]+", incompatibles={"baz"})
             * @RequestParam(name="raw", default="invalid", strict=false)
             * @FileParam(name="images", image=true, map=true, maxSize=1024)
             */
        "#;
        let annotations = parse_doc(doc).unwrap();
        assert_eq!(annotations.len(), 4);
        assert!(matches!(&annotations[0], Annotation::Other(n) if n == "Route"));

        let p = params(doc);
        assert_eq!(p[0].name(), "foz");
        assert_eq!(p[0].source(), ParamSource::Query);
        assert_eq!(p[0].incompatible_names(), ["baz"]);
        assert!(matches!(p[0].requirement(), Some(Requirement::Pattern(r)) if r == "[a-z]+"));
        assert_eq!(p[1].default_value(), &ParamValue::from("invalid"));
        assert!(!p[1].is_strict());
        assert!(p[2].is_image() && p[2].is_map());
    }

    #[test]
    fn backslashes_and_escaped_quotes_survive() {
        let p = params(r#"@QueryParam(name="id", requirements="\d+", description="say ""hi""")"#);
        assert!(matches!(p[0].requirement(), Some(Requirement::Pattern(r)) if r == r"\d+"));
        assert_eq!(p[0].description_text(), Some(r#"say "hi""#));
    }

    #[test]
    fn rule_requirements() {
        let p = params(r#"@QueryParam(name="id", requirements={"rule"="\d+", "error_message"="bad id"})"#);
        assert!(matches!(p[0].requirement(),
            Some(Requirement::Rule { rule, error_message }) if rule == r"\d+" && error_message == "bad id"));
    }

    #[test]
    fn positional_name_and_namespaces() {
        let p = params(r#"@Rest\RequestParam("bar", nullable=true, default=null)"#);
        assert_eq!(p[0].name(), "bar");
        assert!(p[0].is_nullable());
        assert!(p[0].default_value().is_null());
    }

    #[test]
    fn email_addresses_are_not_annotations() {
        assert!(parse_doc("contact: someone@example.com").unwrap().is_empty());
    }

    #[test]
    fn errors() {
        assert!(parse_doc(r#"@QueryParam(requirements="x")"#).is_err());
        assert!(parse_doc(r#"@QueryParam(name="x", bogus=true)"#).is_err());
        assert!(parse_doc(r#"@QueryParam(name="x""#).is_err());
        assert!(parse_doc(r#"@QueryParam(name="x", strict="yes")"#).is_err());
    }

    #[test]
    fn reader_serves_registered_docs() {
        let reader = DocAnnotationReader::new()
            .class_doc("C", r#"@QueryParam(name="a")"#)
            .unwrap()
            .method_doc("C", "m", r#"@QueryParam(name="b") @QueryParam(name="c")"#)
            .unwrap();
        let class = ControllerClass::new("C").method("m", std::iter::empty());
        assert_eq!(reader.class_annotations(&class).len(), 1);
        assert_eq!(reader.method_annotations(&class, "m").len(), 2);
        assert!(reader.method_annotations(&class, "other").is_empty());
    }
}
