//! Builders for the registry construction and registration contracts.
//!
//! - [`RegistryOptions`]: the module namespace plus the declared types,
//!   each with its own [`CodeIndex`].
//! - [`Registration`]: one exception definition to add to a registry.
//!
//! # Example
//!
//! ```rust
//! use exception_registry::{ExceptionRegistry, IncreasingIndex, DecreasingIndex, Registration, RegistryOptions};
//!
//! let mut registry = ExceptionRegistry::new(
//!     RegistryOptions::new("svc.example")
//!         .with_type("public", IncreasingIndex::new(1))
//!         .with_type("private", DecreasingIndex::new(-1)),
//! )?;
//!
//! let not_found = registry.register(
//!     Registration::new("public", "not_found", "missing")
//!         .with_default("http_status", 404),
//! )?;
//! assert_eq!(not_found.code(), 1);
//! # Ok::<(), exception_registry::Exception>(())
//! ```

use crate::exception::Metadata;
use crate::index::CodeIndex;
use serde_json::Value;
use smallvec::SmallVec;

// ============================================================================
// Registry Options
// ============================================================================

/// One declared exception type and its code allocator.
pub(crate) struct TypeDeclaration {
    pub(crate) name: String,
    pub(crate) index: Box<dyn CodeIndex>,
}

/// Construction options of an [`ExceptionRegistry`](crate::ExceptionRegistry).
///
/// Types keep their declaration order. Declaring the same type name twice
/// replaces the earlier allocator.
///
/// # Capacity Choice
///
/// Registries usually declare two or three types (public/private/internal),
/// so the table is a `SmallVec` searched linearly.
pub struct RegistryOptions {
    module: String,
    types: SmallVec<[TypeDeclaration; 4]>,
}

impl RegistryOptions {
    /// Start options for the given module namespace.
    #[inline]
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            types: SmallVec::new(),
        }
    }

    /// Declare a type with its code allocator.
    pub fn with_type(mut self, name: impl Into<String>, index: impl CodeIndex + 'static) -> Self {
        self.push_type(name.into(), Box::new(index));
        self
    }

    /// Declare a type with an already boxed allocator.
    pub fn with_boxed_type(mut self, name: impl Into<String>, index: Box<dyn CodeIndex>) -> Self {
        self.push_type(name.into(), index);
        self
    }

    fn push_type(&mut self, name: String, index: Box<dyn CodeIndex>) {
        match self.types.iter_mut().find(|t| t.name == name) {
            Some(existing) => existing.index = index,
            None => self.types.push(TypeDeclaration { name, index }),
        }
    }

    /// The module namespace.
    #[inline]
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Declared type names, in declaration order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(|t| t.name.as_str())
    }

    pub(crate) fn into_parts(self) -> (String, SmallVec<[TypeDeclaration; 4]>) {
        (self.module, self.types)
    }
}

impl std::fmt::Debug for RegistryOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryOptions")
            .field("module", &self.module)
            .field("types", &self.type_names().collect::<Vec<_>>())
            .finish()
    }
}

// ============================================================================
// Registration
// ============================================================================

/// The definition of a new exception, as submitted to `register`.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    type_name: String,
    name: String,
    message: String,
    metadata: Metadata,
    code: Option<i64>,
}

impl Registration {
    /// Describe an exception of type `type_name` with an empty default metadata.
    pub fn new(
        type_name: impl Into<String>,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            name: name.into(),
            message: message.into(),
            metadata: Metadata::new(),
            code: None,
        }
    }

    /// Use an explicit code instead of asking the type's allocator.
    #[inline]
    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }

    /// Replace the whole default metadata.
    #[inline]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Add one default metadata entry.
    pub fn with_default(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The type the exception is registered under.
    #[inline]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Name of the new kind.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Default message of the new kind.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Default metadata of the new kind.
    #[inline]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// The explicit code, if any.
    #[inline]
    pub const fn code(&self) -> Option<i64> {
        self.code
    }

    /// Registration fields as a metadata object (`code` only when explicit).
    pub(crate) fn to_metadata(&self) -> Metadata {
        let mut meta = Metadata::new();
        meta.insert("type".into(), Value::String(self.type_name.clone()));
        meta.insert("name".into(), Value::String(self.name.clone()));
        meta.insert("message".into(), Value::String(self.message.clone()));
        meta.insert("metadata".into(), Value::Object(self.metadata.clone()));
        if let Some(code) = self.code {
            meta.insert("code".into(), Value::from(code));
        }
        meta
    }

    pub(crate) fn into_parts(self) -> (String, String, String, Metadata) {
        (self.type_name, self.name, self.message, self.metadata)
    }
}
