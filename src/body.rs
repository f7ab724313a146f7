//! Query-string and request-body decoding.
//!
//! Keys use bracket nesting: `raw[foo]=1` builds a map under `raw`,
//! `files[]=…` appends to a list. A malformed key (`a[b`), or one nested
//! deeper than [`MAX_NESTING`] levels, is taken literally.

use bytes::Bytes;
use futures_util::future::ready;
use futures_util::stream::once;
use indexmap::IndexMap;
use tracing::debug;

use crate::error::Error;
use crate::value::{ParamBag, ParamValue, UploadedFile};

/// Deepest bracket nesting honoured in a key.
pub const MAX_NESTING: usize = 64;

/// Decoded body: the `request` bag and the `files` bag.
#[derive(Debug, Default)]
pub(crate) struct DecodedBody {
    pub form: ParamBag,
    pub files: ParamBag,
}

/// Decodes a urlencoded string (query string or form body).
pub fn parse_urlencoded(input: &[u8]) -> Result<ParamBag, Error> {
    let pairs: Vec<(String, String)> =
        serde_urlencoded::from_bytes(input).map_err(|e| Error::Body(e.to_string()))?;
    let mut bag = ParamBag::new();
    for (key, value) in pairs {
        insert_nested(&mut bag, &key, ParamValue::String(value));
    }
    Ok(bag)
}

/// Decodes a body according to its `content-type`. Unknown types yield
/// empty bags.
pub(crate) async fn decode(content_type: Option<&str>, body: Bytes) -> Result<DecodedBody, Error> {
    let Some(content_type) = content_type else {
        return Ok(DecodedBody::default());
    };
    let essence = content_type.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    match essence.as_str() {
        "application/x-www-form-urlencoded" => Ok(DecodedBody {
            form: parse_urlencoded(&body)?,
            files: ParamBag::new(),
        }),
        "application/json" => decode_json(&body),
        "multipart/form-data" => decode_multipart(content_type, body).await,
        other => {
            debug!(content_type = other, "body left undecoded");
            Ok(DecodedBody::default())
        }
    }
}

fn decode_json(body: &[u8]) -> Result<DecodedBody, Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(DecodedBody::default());
    }
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| Error::Body(format!("invalid json: {e}")))?;
    match ParamValue::from(value) {
        ParamValue::Map(form) => Ok(DecodedBody { form, files: ParamBag::new() }),
        _ => Err(Error::Body("json body must be an object".to_owned())),
    }
}

async fn decode_multipart(content_type: &str, body: Bytes) -> Result<DecodedBody, Error> {
    let boundary = multer::parse_boundary(content_type).map_err(|e| Error::Body(e.to_string()))?;
    let stream = once(ready(Ok::<_, std::io::Error>(body)));
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut decoded = DecodedBody::default();
    while let Some(field) = multipart.next_field().await.map_err(|e| Error::Body(e.to_string()))? {
        let name = field.name().unwrap_or_default().to_owned();
        match field.file_name().map(str::to_owned) {
            Some(file_name) => {
                let mime = field.content_type().map(ToString::to_string);
                let data = field.bytes().await.map_err(|e| Error::Body(e.to_string()))?;
                // An untouched file input still sends an empty part.
                if file_name.is_empty() && data.is_empty() {
                    continue;
                }
                let file = UploadedFile::new(file_name, mime.as_deref(), data);
                insert_nested(&mut decoded.files, &name, file.into());
            }
            None => {
                let text = field.text().await.map_err(|e| Error::Body(e.to_string()))?;
                insert_nested(&mut decoded.form, &name, ParamValue::String(text));
            }
        }
    }
    Ok(decoded)
}

/// Splits `a[b][]` into `a` and `[Some("b"), None]`.
fn split_key(key: &str) -> (&str, Vec<Option<&str>>) {
    let Some(open) = key.find('[') else {
        return (key, Vec::new());
    };
    if open == 0 {
        return (key, Vec::new());
    }
    let (root, mut rest) = key.split_at(open);
    let mut segments = Vec::new();
    while let Some(inner) = rest.strip_prefix('[') {
        let Some(close) = inner.find(']') else {
            return (key, Vec::new());
        };
        let segment = &inner[..close];
        if segments.len() == MAX_NESTING {
            return (key, Vec::new());
        }
        segments.push((!segment.is_empty()).then_some(segment));
        rest = &inner[close + 1..];
    }
    if !rest.is_empty() {
        return (key, Vec::new());
    }
    (root, segments)
}

pub(crate) fn insert_nested(bag: &mut ParamBag, key: &str, value: ParamValue) {
    let (root, segments) = split_key(key);
    if segments.is_empty() {
        bag.insert(root.to_owned(), value);
        return;
    }
    let slot = bag.entry(root.to_owned()).or_insert(ParamValue::Null);
    insert_path(slot, &segments, value);
}

/// One past the largest integer key, or 0.
fn next_index(map: &IndexMap<String, ParamValue>) -> u64 {
    map.keys()
        .filter_map(|k| k.parse::<u64>().ok())
        .max()
        .map_or(0, |max| max.saturating_add(1))
}

fn insert_path(slot: &mut ParamValue, segments: &[Option<&str>], value: ParamValue) {
    let Some((segment, rest)) = segments.split_first() else {
        *slot = value;
        return;
    };
    match segment {
        None => {
            if !matches!(slot, ParamValue::List(_) | ParamValue::Map(_)) {
                *slot = ParamValue::List(Vec::new());
            }
            let mut child = ParamValue::Null;
            insert_path(&mut child, rest, value);
            match slot {
                ParamValue::List(items) => items.push(child),
                ParamValue::Map(map) => {
                    map.insert(next_index(map).to_string(), child);
                }
                _ => unreachable!("slot was just made a container"),
            }
        }
        Some(key) => {
            let map = match slot {
                ParamValue::Map(map) => map,
                ParamValue::List(items) => {
                    let converted: IndexMap<String, ParamValue> = std::mem::take(items)
                        .into_iter()
                        .enumerate()
                        .map(|(i, v)| (i.to_string(), v))
                        .collect();
                    *slot = ParamValue::Map(converted);
                    let ParamValue::Map(map) = slot else { unreachable!() };
                    map
                }
                _ => {
                    *slot = ParamValue::Map(IndexMap::new());
                    let ParamValue::Map(map) = slot else { unreachable!() };
                    map
                }
            };
            let child = map.entry((*key).to_owned()).or_insert(ParamValue::Null);
            insert_path(child, rest, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decoded(input: &str) -> serde_json::Value {
        ParamValue::Map(parse_urlencoded(input.as_bytes()).unwrap()).to_json()
    }

    #[test]
    fn flat_pairs() {
        assert_eq!(decoded("foz=val1&baz=a%20b"), json!({"foz": "val1", "baz": "a b"}));
    }

    #[test]
    fn bracket_maps_keep_order() {
        let bag = parse_urlencoded(b"raw[foo]=raw&raw[bar]=foo").unwrap();
        let expected = ParamValue::from(json!({"foo": "raw", "bar": "foo"}));
        assert!(bag["raw"].identical(&expected));
    }

    #[test]
    fn nested_maps_and_lists() {
        assert_eq!(
            decoded("map[foo][foo]=map&map[foo][foobar]=foo&ids[]=1&ids[]=2"),
            json!({"map": {"foo": {"foo": "map", "foobar": "foo"}}, "ids": ["1", "2"]})
        );
    }

    #[test]
    fn malformed_keys_are_literal() {
        assert_eq!(decoded("a[b=1&[x]=2&c]=3"), json!({"a[b": "1", "[x]": "2", "c]": "3"}));
    }

    #[test]
    fn appends_after_the_largest_index() {
        assert_eq!(decoded("a[1]=x&a[]=y"), json!({"a": {"1": "x", "2": "y"}}));
        assert_eq!(decoded("a[k]=x&a[]=y"), json!({"a": {"k": "x", "0": "y"}}));
    }

    #[test]
    fn overly_deep_keys_are_literal() {
        let deep = format!("a{}", "[x]".repeat(200_000));
        let bag = parse_urlencoded(format!("{deep}=1").as_bytes()).unwrap();
        assert_eq!(bag.len(), 1);
        assert_eq!(bag[deep.as_str()], ParamValue::from("1"));

        let limit = format!("a{}=1", "[x]".repeat(MAX_NESTING));
        let bag = parse_urlencoded(limit.as_bytes()).unwrap();
        let mut value = &bag["a"];
        for _ in 1..MAX_NESTING {
            value = value.entries().unwrap()[0].1;
        }
        assert_eq!(value.to_json(), json!({"x": "1"}));
    }

    #[test]
    fn scalar_is_replaced_by_nested_value() {
        assert_eq!(decoded("a=1&a[b]=2"), json!({"a": {"b": "2"}}));
    }

    #[tokio::test]
    async fn json_bodies() {
        let body = decode(Some("application/json"), Bytes::from_static(br#"{"raw": {"foo": "raw"}, "n": 1}"#))
            .await
            .unwrap();
        assert_eq!(ParamValue::Map(body.form).to_json(), json!({"raw": {"foo": "raw"}, "n": 1}));
        assert!(decode(Some("application/json"), Bytes::from_static(b"[1]")).await.is_err());
        assert!(decode(Some("application/json"), Bytes::from_static(b"{")).await.is_err());
    }

    #[tokio::test]
    async fn multipart_bodies() {
        let body = "--XX\r\n\
            Content-Disposition: form-data; name=\"title\"\r\n\r\n\
            cats\r\n\
            --XX\r\n\
            Content-Disposition: form-data; name=\"array_files[]\"; filename=\"bar.txt\"\r\n\
            Content-Type: text/plain\r\n\r\n\
            bar\r\n\
            --XX\r\n\
            Content-Disposition: form-data; name=\"empty\"; filename=\"\"\r\n\
            Content-Type: application/octet-stream\r\n\r\n\
            \r\n\
            --XX--\r\n";
        let decoded = decode(Some("multipart/form-data; boundary=XX"), Bytes::from(body))
            .await
            .unwrap();
        assert_eq!(decoded.form["title"], ParamValue::from("cats"));
        let ParamValue::List(files) = &decoded.files["array_files"] else {
            panic!("expected a list of files");
        };
        let file = files[0].as_file().unwrap();
        assert_eq!(file.client_name(), "bar.txt");
        assert_eq!(file.mime_type(), Some("text/plain"));
        assert_eq!(file.data().as_ref(), b"bar");
        assert!(!decoded.files.contains_key("empty"));
    }

    #[tokio::test]
    async fn unknown_content_types_are_ignored() {
        let body = decode(Some("text/plain"), Bytes::from_static(b"a=1")).await.unwrap();
        assert!(body.form.is_empty() && body.files.is_empty());
    }
}
