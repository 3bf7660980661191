//! Exception kinds and exception instances.
//!
//! # Identity Layer
//!
//! An [`ExceptionDefinition`] is the immutable record produced by a
//! successful registration: code, name, message, module, type and default
//! metadata. It has no mutation API; once the registry builds it, it is
//! frozen for the lifetime of the process.
//!
//! An [`ExceptionKind`] is a cheap, clonable handle (`Arc`) to one
//! definition. It acts as the constructor of that kind: every
//! [`Exception`] created through it remembers the handle, so "was this
//! produced by exactly that kind?" is a pointer comparison rather than a
//! runtime type check.
//!
//! # Instance Layer
//!
//! An [`Exception`] owns copies of the kind's identity fields plus its own
//! metadata (kind defaults merged with call-site values, call-site wins),
//! an optional origin payload, and a trace string captured at construction
//! or restored by the parser. Instances never hold a reference to the
//! registry itself.
//!
//! Exceptions reconstructed from foreign or unknown URIs carry no kind
//! handle; they are structured but untyped.

use crate::logging::ExceptionLog;
use crate::record::{ExceptionRecord, encode_uri};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Key-value payload of kinds and instances.
pub type Metadata = serde_json::Map<String, Value>;

// ============================================================================
// Definition (Frozen Identity)
// ============================================================================

/// The immutable descriptor of a registered exception kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionDefinition {
    code: i64,
    name: String,
    message: String,
    module: String,
    type_name: String,
    metadata: Metadata,
}

impl ExceptionDefinition {
    pub(crate) fn new(
        code: i64,
        name: String,
        message: String,
        module: String,
        type_name: String,
        metadata: Metadata,
    ) -> Self {
        Self {
            code,
            name,
            message,
            module,
            type_name,
            metadata,
        }
    }

    /// Code, unique within the owning registry.
    #[inline]
    pub const fn code(&self) -> i64 {
        self.code
    }

    /// Name, unique within the owning registry.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Default human-readable message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Namespace of the owning registry.
    #[inline]
    pub fn module(&self) -> &str {
        &self.module
    }

    /// The type (category) the kind was registered under.
    #[inline]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Default metadata merged into every instance.
    #[inline]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Whether `(type, name, module)` matches this definition.
    #[inline]
    pub fn matches(&self, type_name: &str, name: &str, module: &str) -> bool {
        self.type_name == type_name && self.name == name && self.module == module
    }
}

// ============================================================================
// Kind (Constructor Handle)
// ============================================================================

/// Handle to a registered kind, used to instantiate exceptions of it.
///
/// Cloning is cheap and all clones refer to the same kind.
#[derive(Clone)]
pub struct ExceptionKind {
    definition: Arc<ExceptionDefinition>,
}

impl ExceptionKind {
    pub(crate) fn new(definition: ExceptionDefinition) -> Self {
        Self {
            definition: Arc::new(definition),
        }
    }

    /// The frozen definition behind this handle.
    #[inline]
    pub fn definition(&self) -> &ExceptionDefinition {
        &self.definition
    }

    /// Whether both handles came from the same registration.
    #[inline]
    pub fn same_kind(&self, other: &ExceptionKind) -> bool {
        Arc::ptr_eq(&self.definition, &other.definition)
    }

    /// Instantiate with the default metadata and no origin.
    pub fn create(&self) -> Exception {
        self.create_with(Metadata::new(), None)
    }

    /// Instantiate with call-site metadata and an optional origin.
    ///
    /// Call-site metadata wins over the kind's defaults on key collision.
    pub fn create_with(&self, metadata: Metadata, origin: Option<Value>) -> Exception {
        let stack = crate::trace::capture(&self.definition);
        self.instantiate(metadata, origin, stack)
    }

    /// Build an instance with an already known trace (used by the parser).
    pub(crate) fn instantiate(
        &self,
        metadata: Metadata,
        origin: Option<Value>,
        stack: String,
    ) -> Exception {
        let def = &*self.definition;
        let mut merged = def.metadata.clone();
        merged.extend(metadata);

        Exception {
            code: def.code,
            name: def.name.clone(),
            message: def.message.clone(),
            module: def.module.clone(),
            type_name: def.type_name.clone(),
            metadata: merged,
            origin: normalize_origin(origin),
            stack,
            kind: Some(self.clone()),
        }
    }
}

impl std::ops::Deref for ExceptionKind {
    type Target = ExceptionDefinition;

    #[inline]
    fn deref(&self) -> &ExceptionDefinition {
        &self.definition
    }
}

impl fmt::Debug for ExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExceptionKind")
            .field("code", &self.code)
            .field("module", &self.module)
            .field("type", &self.type_name)
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{} ({})",
            self.module, self.type_name, self.name, self.code
        )
    }
}

#[inline]
fn normalize_origin(origin: Option<Value>) -> Option<Value> {
    origin.filter(|v| !v.is_null())
}

// ============================================================================
// Exception (Instance)
// ============================================================================

/// A concrete exception occurrence.
#[derive(Clone)]
pub struct Exception {
    code: i64,
    name: String,
    message: String,
    module: String,
    type_name: String,
    metadata: Metadata,
    origin: Option<Value>,
    stack: String,
    kind: Option<ExceptionKind>,
}

impl Exception {
    /// Build an untyped exception from raw decoded fields.
    pub(crate) fn untyped(record: ExceptionRecord) -> Self {
        Self {
            code: record.code,
            name: record.name,
            message: record.message,
            module: record.module,
            type_name: record.type_name,
            metadata: record.metadata,
            origin: normalize_origin(record.origin),
            stack: record.stack.unwrap_or_default(),
            kind: None,
        }
    }

    /// Numeric code of the kind.
    #[inline]
    pub const fn code(&self) -> i64 {
        self.code
    }

    /// Name of the kind.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Module namespace the exception belongs to.
    #[inline]
    pub fn module(&self) -> &str {
        &self.module
    }

    /// The type (category) of the exception.
    #[inline]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Instance metadata (kind defaults merged with call-site values).
    #[inline]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Causal payload, if any.
    #[inline]
    pub fn origin(&self) -> Option<&Value> {
        self.origin.as_ref()
    }

    /// Trace captured at construction or restored from serialized data.
    #[inline]
    pub fn stack(&self) -> &str {
        &self.stack
    }

    /// The kind this exception was built from, `None` for untyped
    /// reconstructions of unknown exceptions.
    #[inline]
    pub fn kind(&self) -> Option<&ExceptionKind> {
        self.kind.as_ref()
    }

    /// Whether the exception carries a registered kind handle.
    #[inline]
    pub fn is_typed(&self) -> bool {
        self.kind.is_some()
    }

    /// Add or replace one metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Attach an origin payload. `null` clears it.
    pub fn with_origin(mut self, origin: impl Into<Value>) -> Self {
        self.origin = normalize_origin(Some(origin.into()));
        self
    }

    /// Attach another exception as origin, stored as its full structured record.
    pub fn caused_by(self, cause: &Exception) -> Self {
        let origin = cause.to_json(false).into_value();
        self.with_origin(origin)
    }

    /// Check whether the exception is of `kind`.
    ///
    /// True when it was built by exactly that kind's handle, or when its
    /// `(type, name, module)` triple matches the kind's (reconstructed
    /// instances, or kinds re-registered in another registry object).
    pub fn is(&self, kind: &ExceptionKind) -> bool {
        match &self.kind {
            Some(own) if own.same_kind(kind) => true,
            _ => kind.matches(&self.type_name, &self.name, &self.module),
        }
    }

    /// Encode as an `exception:` URI.
    ///
    /// With `data_only`, the `stack` and `origin` parameters are omitted.
    pub fn to_uri(&self, data_only: bool) -> String {
        encode_uri(self, data_only)
    }

    /// Encode as a structured record.
    ///
    /// With `data_only`, `stack` and `origin` are left out.
    pub fn to_json(&self, data_only: bool) -> ExceptionRecord {
        ExceptionRecord {
            code: self.code,
            name: self.name.clone(),
            message: self.message.clone(),
            module: self.module.clone(),
            type_name: self.type_name.clone(),
            metadata: self.metadata.clone(),
            stack: (!data_only).then(|| self.stack.clone()),
            origin: (!data_only).then(|| self.origin.clone().unwrap_or(Value::Null)),
        }
    }

    /// Borrowed structured view for logging.
    ///
    /// The view cannot outlive the exception.
    #[inline]
    pub fn log(&self) -> ExceptionLog<'_> {
        ExceptionLog::new(self)
    }

    /// Callback-style access to the log view.
    #[inline]
    pub fn with_log<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&ExceptionLog<'_>) -> R,
    {
        let log = self.log();
        f(&log)
    }
}

impl fmt::Debug for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exception")
            .field("code", &self.code)
            .field("module", &self.module)
            .field("type", &self.type_name)
            .field("name", &self.name)
            .field("message", &self.message)
            .field("metadata", &self.metadata)
            .field("origin", &self.origin)
            .field("typed", &self.kind.is_some())
            .finish()
    }
}

impl fmt::Display for Exception {
    /// Full URI form, including `stack` and `origin`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uri(false))
    }
}

impl std::error::Error for Exception {}

impl PartialEq<ExceptionKind> for Exception {
    fn eq(&self, kind: &ExceptionKind) -> bool {
        self.is(kind)
    }
}
