//! Structured log view of an exception.
//!
//! # Properties
//!
//! - Borrows from the [`Exception`] with an explicit lifetime and cannot
//!   outlive it
//! - Accessors are allocation-free
//! - [`ExceptionLog::write_to`] bounds every field so a hostile message or
//!   metadata value cannot blow up a log line
//!
//! The registry itself reports through the `tracing` facade (registration
//! at `debug`, rejections at `warn`, parse soft-failures at `trace`). It
//! never installs a subscriber; hosts decide where events go.

use crate::exception::{Exception, Metadata};
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;

/// Maximum length for any individual field in formatted output.
pub const MAX_FIELD_OUTPUT_LEN: usize = 1024;

/// Truncation indicator appended to truncated strings.
const TRUNCATION_INDICATOR: &str = "...[TRUNCATED]";

/// Structured log entry borrowing from an [`Exception`].
///
/// # Example
///
/// ```rust
/// # use exception_registry::{ExceptionRegistry, IncreasingIndex, Registration, RegistryOptions};
/// # let mut registry = ExceptionRegistry::new(
/// #     RegistryOptions::new("svc.example").with_type("public", IncreasingIndex::new(1)),
/// # ).unwrap();
/// # let kind = registry.register(Registration::new("public", "not_found", "missing")).unwrap();
/// let err = kind.create().with_metadata("id", 42);
///
/// let mut line = String::new();
/// err.log().write_to(&mut line).unwrap();
/// assert_eq!(line, "[svc.example/public/not_found#1] message='missing' id='42'");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ExceptionLog<'a> {
    exception: &'a Exception,
}

impl<'a> ExceptionLog<'a> {
    #[inline]
    pub(crate) const fn new(exception: &'a Exception) -> Self {
        Self { exception }
    }

    /// Write a single-line, length-bounded rendering of the exception.
    ///
    /// Format: `[module/type/name#code] message='..' key='value' ... origin='..'`
    ///
    /// String metadata values are written raw, others as compact JSON. The
    /// trace is never included; use [`ExceptionLog::stack`] for it.
    pub fn write_to(&self, f: &mut impl fmt::Write) -> fmt::Result {
        let e = self.exception;
        write!(
            f,
            "[{}/{}/{}#{}] message='{}'",
            e.module(),
            e.type_name(),
            e.name(),
            e.code(),
            truncate_with_indicator(e.message())
        )?;

        for (key, value) in e.metadata() {
            let rendered = render_value(value);
            write!(
                f,
                " {}='{}'",
                truncate_with_indicator(key),
                truncate_with_indicator(&rendered)
            )?;
        }

        if let Some(origin) = e.origin() {
            let rendered = render_value(origin);
            write!(f, " origin='{}'", truncate_with_indicator(&rendered))?;
        }

        Ok(())
    }

    /// Numeric code.
    #[inline]
    pub const fn code(&self) -> i64 {
        self.exception.code()
    }

    /// Module namespace.
    #[inline]
    pub fn module(&self) -> &'a str {
        self.exception.module()
    }

    /// Type name.
    #[inline]
    pub fn type_name(&self) -> &'a str {
        self.exception.type_name()
    }

    /// Exception name.
    #[inline]
    pub fn name(&self) -> &'a str {
        self.exception.name()
    }

    /// Message, untruncated.
    #[inline]
    pub fn message(&self) -> &'a str {
        self.exception.message()
    }

    /// Metadata fields, untruncated.
    #[inline]
    pub fn metadata(&self) -> &'a Metadata {
        self.exception.metadata()
    }

    /// Origin payload, if any.
    #[inline]
    pub fn origin(&self) -> Option<&'a Value> {
        self.exception.origin()
    }

    /// Full trace, never part of [`write_to`](Self::write_to).
    #[inline]
    pub fn stack(&self) -> &'a str {
        self.exception.stack()
    }

    /// Whether the exception belongs to a registered kind.
    #[inline]
    pub fn is_typed(&self) -> bool {
        self.exception.is_typed()
    }
}

impl fmt::Display for ExceptionLog<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_to(f)
    }
}

fn render_value(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        other => Cow::Owned(other.to_string()),
    }
}

/// Truncate a string for display, respecting UTF-8 boundaries.
///
/// Returns a `Cow` to avoid allocation when no truncation is needed.
fn truncate_with_indicator(s: &str) -> Cow<'_, str> {
    if s.len() <= MAX_FIELD_OUTPUT_LEN {
        return Cow::Borrowed(s);
    }

    let max_content_len = MAX_FIELD_OUTPUT_LEN.saturating_sub(TRUNCATION_INDICATOR.len());

    let mut idx = max_content_len;
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }

    if idx == 0 {
        return Cow::Borrowed(TRUNCATION_INDICATOR);
    }

    let mut result = String::with_capacity(idx + TRUNCATION_INDICATOR.len());
    result.push_str(&s[..idx]);
    result.push_str(TRUNCATION_INDICATOR);
    Cow::Owned(result)
}
