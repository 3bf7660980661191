//! Wire representations: the structured record and the `exception:` URI.
//!
//! # URI Form
//!
//! ```text
//! exception://{module}/{type}/{name}?code={int}&msg={pct}&meta={pct-json}[&stack={pct}&origin={pct-json}]
//! ```
//!
//! - `code`, `msg` and `meta` are always present.
//! - `stack` and `origin` are omitted in data-only mode; otherwise `origin`
//!   is `null` when the exception has none.
//! - Components are percent-encoded with the same unreserved set as
//!   ECMAScript `encodeURIComponent`, so URIs produced here and by other
//!   implementations of the format decode identically.
//!
//! # Structured Form
//!
//! [`ExceptionRecord`] is the serde model of
//! `{code, name, message, module, type, metadata, stack?, origin?}`.
//!
//! # Failure Model
//!
//! Decoding never panics. [`decode_uri`] reports why input was rejected via
//! [`UriError`]; the registry turns any rejection into `None`.

use crate::exception::{Exception, Metadata};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smallvec::SmallVec;
use std::borrow::Cow;
use std::fmt;
use std::fmt::Write as _;
use url::Url;

/// URI scheme of encoded exceptions.
pub const SCHEME: &str = "exception";

/// Everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

// ============================================================================
// Structured Record
// ============================================================================

/// The raw data of an exception, as produced by [`Exception::to_json`].
///
/// `stack` and `origin` are `None` for data-only records. A full record
/// always carries `origin`, `null` when the exception has none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionRecord {
    /// Numeric code.
    pub code: i64,
    /// Exception name.
    pub name: String,
    /// Human-readable message.
    pub message: String,
    /// Module namespace.
    pub module: String,
    /// Type (category) name, serialized as `type`.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Instance metadata.
    #[serde(default)]
    pub metadata: Metadata,
    /// Trace, absent in data-only records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    /// Origin payload, absent in data-only records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Value>,
}

impl ExceptionRecord {
    /// Convert into a JSON object value.
    pub fn into_value(self) -> Value {
        let mut obj = Metadata::new();
        obj.insert("code".into(), Value::from(self.code));
        obj.insert("name".into(), Value::String(self.name));
        obj.insert("message".into(), Value::String(self.message));
        obj.insert("module".into(), Value::String(self.module));
        obj.insert("type".into(), Value::String(self.type_name));
        obj.insert("metadata".into(), Value::Object(self.metadata));
        if let Some(stack) = self.stack {
            obj.insert("stack".into(), Value::String(stack));
        }
        if let Some(origin) = self.origin {
            obj.insert("origin".into(), origin);
        }
        Value::Object(obj)
    }
}

impl From<ExceptionRecord> for Value {
    fn from(record: ExceptionRecord) -> Self {
        record.into_value()
    }
}

// ============================================================================
// URI Encoding
// ============================================================================

#[inline]
fn component(s: &str) -> percent_encoding::PercentEncode<'_> {
    utf8_percent_encode(s, COMPONENT)
}

/// Encode an exception as an `exception:` URI.
pub(crate) fn encode_uri(e: &Exception, data_only: bool) -> String {
    let meta = Value::Object(e.metadata().clone()).to_string();

    let mut uri = String::with_capacity(64 + e.message().len() + meta.len());
    // Writing into a String cannot fail.
    let _ = write!(
        uri,
        "{}://{}/{}/{}?code={}&msg={}&meta={}",
        SCHEME,
        component(e.module()),
        component(e.type_name()),
        component(e.name()),
        e.code(),
        component(e.message()),
        component(&meta),
    );

    if !data_only {
        let origin = e.origin().unwrap_or(&Value::Null).to_string();
        let _ = write!(
            uri,
            "&stack={}&origin={}",
            component(e.stack()),
            component(&origin)
        );
    }

    uri
}

// ============================================================================
// URI Decoding
// ============================================================================

/// Why a string is not a decodable exception URI.
#[derive(Debug)]
pub enum UriError {
    /// Not a syntactically valid URI.
    Syntax(url::ParseError),
    /// Scheme is not `exception`.
    WrongScheme {
        /// The scheme found instead.
        scheme: String,
    },
    /// No module in the authority part.
    MissingModule,
    /// The authority carries a port or user info, or the module is not
    /// valid percent-encoded UTF-8.
    InvalidAuthority,
    /// Path lacks the `/{type}/{name}` segments.
    MissingPath,
    /// A path segment is not valid percent-encoded UTF-8.
    InvalidPath,
    /// One of `code`, `msg`, `meta` is missing.
    MissingParameter {
        /// Name of the missing parameter.
        name: &'static str,
    },
    /// `code` is not an integer.
    InvalidCode {
        /// The raw decoded value.
        value: String,
    },
    /// `meta` or `origin` is not valid JSON.
    InvalidJson {
        /// Name of the offending parameter.
        name: &'static str,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
    /// `meta` is valid JSON but not an object.
    MetadataNotObject,
}

impl fmt::Display for UriError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax(e) => write!(f, "malformed URI: {}", e),
            Self::WrongScheme { scheme } => {
                write!(f, "unexpected scheme '{}' (expected '{}')", scheme, SCHEME)
            }
            Self::MissingModule => f.write_str("URI has no module authority"),
            Self::InvalidAuthority => {
                f.write_str("URI authority must be a bare percent-encoded module")
            }
            Self::MissingPath => f.write_str("URI path lacks /{type}/{name}"),
            Self::InvalidPath => f.write_str("URI path is not valid UTF-8"),
            Self::MissingParameter { name } => write!(f, "missing parameter '{}'", name),
            Self::InvalidCode { value } => write!(f, "code '{}' is not an integer", value),
            Self::InvalidJson { name, source } => {
                write!(f, "parameter '{}' is not valid JSON: {}", name, source)
            }
            Self::MetadataNotObject => f.write_str("parameter 'meta' is not a JSON object"),
        }
    }
}

impl std::error::Error for UriError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Syntax(e) => Some(e),
            Self::InvalidJson { source, .. } => Some(source),
            _ => None,
        }
    }
}

fn decode_component(raw: &str) -> Option<String> {
    percent_decode_str(raw)
        .decode_utf8()
        .ok()
        .map(Cow::into_owned)
}

fn path_segment(raw: &str) -> Result<String, UriError> {
    decode_component(raw).ok_or(UriError::InvalidPath)
}

fn json_param(name: &'static str, raw: &str) -> Result<Value, UriError> {
    serde_json::from_str(raw).map_err(|source| UriError::InvalidJson { name, source })
}

/// Decode an `exception:` URI into its raw record.
///
/// The record's `stack` and `origin` are `None` when the parameters are
/// absent (data-only URIs). A present `origin=null` also yields `None`.
pub fn decode_uri(input: &str) -> Result<ExceptionRecord, UriError> {
    let url = Url::parse(input).map_err(UriError::Syntax)?;

    if url.scheme() != SCHEME {
        return Err(UriError::WrongScheme {
            scheme: url.scheme().to_owned(),
        });
    }

    let module = match url.host_str() {
        Some(host) if !host.is_empty() => host,
        _ => return Err(UriError::MissingModule),
    };
    if url.port().is_some() || !url.username().is_empty() || url.password().is_some() {
        return Err(UriError::InvalidAuthority);
    }
    let module = decode_component(module).ok_or(UriError::InvalidAuthority)?;

    let segments: SmallVec<[&str; 4]> = url.path().split('/').collect();
    let (type_name, name) = match segments.as_slice() {
        [_, t, n, ..] if !t.is_empty() && !n.is_empty() => (path_segment(t)?, path_segment(n)?),
        _ => return Err(UriError::MissingPath),
    };

    let mut code = None;
    let mut msg = None;
    let mut meta = None;
    let mut stack = None;
    let mut origin = None;
    for (key, value) in url.query_pairs() {
        let slot = match key.as_ref() {
            "code" => &mut code,
            "msg" => &mut msg,
            "meta" => &mut meta,
            "stack" => &mut stack,
            "origin" => &mut origin,
            _ => continue,
        };
        // First occurrence wins.
        if slot.is_none() {
            *slot = Some(value);
        }
    }

    let code = code.ok_or(UriError::MissingParameter { name: "code" })?;
    let message = msg.ok_or(UriError::MissingParameter { name: "msg" })?;
    let meta = meta.ok_or(UriError::MissingParameter { name: "meta" })?;

    let code = code
        .trim()
        .parse::<i64>()
        .map_err(|_| UriError::InvalidCode {
            value: code.clone().into_owned(),
        })?;

    let metadata = match json_param("meta", &meta)? {
        Value::Object(map) => map,
        _ => return Err(UriError::MetadataNotObject),
    };

    let origin = match origin {
        Some(raw) => Some(json_param("origin", &raw)?).filter(|v| !v.is_null()),
        None => None,
    };

    Ok(ExceptionRecord {
        code,
        name,
        message: message.into_owned(),
        module,
        type_name,
        metadata,
        stack: stack.map(Cow::into_owned),
        origin,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn component_matches_encode_uri_component() {
        let encoded = component("a b+c/d?e&f=g'h(i)*!~._-é").to_string();
        assert_eq!(encoded, "a%20b%2Bc%2Fd%3Fe%26f%3Dg'h(i)*!~._-%C3%A9");
    }

    #[test]
    fn decode_full_uri() {
        let uri = "exception://svc.example/public/not_found?code=1&msg=missing%20thing\
                   &meta=%7B%22id%22%3A42%7D&stack=trace%0Aline&origin=%7B%22x%22%3A1%7D";
        let record = decode_uri(uri).expect("decodes");
        assert_eq!(record.module, "svc.example");
        assert_eq!(record.type_name, "public");
        assert_eq!(record.name, "not_found");
        assert_eq!(record.code, 1);
        assert_eq!(record.message, "missing thing");
        assert_eq!(record.metadata["id"], 42);
        assert_eq!(record.stack.as_deref(), Some("trace\nline"));
        assert_eq!(record.origin, Some(json!({"x": 1})));
    }

    #[test]
    fn decode_data_only_uri() {
        let uri = "exception://svc.example/public/not_found?code=-3&msg=m&meta=%7B%7D";
        let record = decode_uri(uri).expect("decodes");
        assert_eq!(record.code, -3);
        assert!(record.stack.is_none());
        assert!(record.origin.is_none());
    }

    #[test]
    fn null_origin_decodes_to_none() {
        let uri = "exception://a/b/c?code=1&msg=m&meta=%7B%7D&stack=&origin=null";
        let record = decode_uri(uri).expect("decodes");
        assert!(record.origin.is_none());
        assert_eq!(record.stack.as_deref(), Some(""));
    }

    #[test]
    fn rejections() {
        assert!(matches!(decode_uri("not a uri"), Err(UriError::Syntax(_))));
        assert!(matches!(
            decode_uri("https://a/b/c?code=1&msg=m&meta=%7B%7D"),
            Err(UriError::WrongScheme { .. })
        ));
        assert!(matches!(
            decode_uri("exception://a/b?code=1&msg=m&meta=%7B%7D"),
            Err(UriError::MissingPath)
        ));
        assert!(matches!(
            decode_uri("exception://a/b/c?msg=m&meta=%7B%7D"),
            Err(UriError::MissingParameter { name: "code" })
        ));
        assert!(matches!(
            decode_uri("exception://a/b/c?code=1&meta=%7B%7D"),
            Err(UriError::MissingParameter { name: "msg" })
        ));
        assert!(matches!(
            decode_uri("exception://a/b/c?code=1&msg=m"),
            Err(UriError::MissingParameter { name: "meta" })
        ));
        assert!(matches!(
            decode_uri("exception://a/b/c?code=x&msg=m&meta=%7B%7D"),
            Err(UriError::InvalidCode { .. })
        ));
        assert!(matches!(
            decode_uri("exception://a/b/c?code=1&msg=m&meta=%7B"),
            Err(UriError::InvalidJson { name: "meta", .. })
        ));
        assert!(matches!(
            decode_uri("exception://a/b/c?code=1&msg=m&meta=%5B%5D"),
            Err(UriError::MetadataNotObject)
        ));
        assert!(matches!(
            decode_uri("exception://a/b/c?code=1&msg=m&meta=%7B%7D&origin=%7B"),
            Err(UriError::InvalidJson { name: "origin", .. })
        ));
    }

    #[test]
    fn authority_must_be_bare_module() {
        for uri in [
            "exception://svc.example:8080/public/x?code=1&msg=m&meta=%7B%7D",
            "exception://user@svc.example/public/x?code=1&msg=m&meta=%7B%7D",
            "exception://user:pw@svc.example/public/x?code=1&msg=m&meta=%7B%7D",
        ] {
            assert!(
                matches!(decode_uri(uri), Err(UriError::InvalidAuthority)),
                "{uri}"
            );
        }
    }

    #[test]
    fn unsafe_module_survives_encoding() {
        let e = Exception::untyped(ExceptionRecord {
            code: 1,
            name: "n".into(),
            message: "m".into(),
            module: "Other Mod".into(),
            type_name: "t".into(),
            metadata: Metadata::new(),
            stack: None,
            origin: None,
        });

        let uri = encode_uri(&e, true);
        assert!(uri.starts_with("exception://Other%20Mod/t/n?"));

        let record = decode_uri(&uri).expect("decodes");
        assert_eq!(record.module, "Other Mod");
        assert_eq!(record.type_name, "t");
        assert_eq!(record.name, "n");
    }

    #[test]
    fn record_serde_shape() {
        let record = ExceptionRecord {
            code: 1,
            name: "not_found".into(),
            message: "missing".into(),
            module: "svc.example".into(),
            type_name: "public".into(),
            metadata: Metadata::new(),
            stack: None,
            origin: None,
        };
        let text = serde_json::to_string(&record).expect("serializes");
        assert_eq!(
            text,
            r#"{"code":1,"name":"not_found","message":"missing","module":"svc.example","type":"public","metadata":{}}"#
        );

        let value = record.clone().into_value();
        assert_eq!(value["type"], "public");
        assert!(value.get("stack").is_none());

        let back: ExceptionRecord = serde_json::from_value(value).expect("deserializes");
        assert_eq!(back, record);
    }
}
