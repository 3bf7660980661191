//! Syntax rules for registry namespaces and the internal violation taxonomy.
//!
//! # Rules
//!
//! - **Module**: dot-separated segments; every segment is made of
//!   `[-a-z0-9]` and neither starts nor ends with `-`.
//!   (`svc.example`, `my-app.v2`)
//! - **Type / Name**: `[_a-z0-9]`, neither starting nor ending with `_`.
//!   (`public`, `not_found`)
//!
//! All checks are byte-level `const fn`s. The only accepted characters are
//! ASCII, so any multi-byte UTF-8 input is rejected on its first byte.
//!
//! # Violations
//!
//! [`Violation`] is the registry's internal failure vocabulary. It is never
//! returned from the public API directly: the registry converts it into an
//! [`Exception`] of the built-in registry at the boundary, so callers see the
//! same exception machinery they use for their own errors.

use crate::builtin::BuiltIns;
use crate::exception::{Exception, Metadata};
use crate::options::Registration;
use serde_json::Value;
use std::fmt;

// ============================================================================
// Syntax Checks
// ============================================================================

#[inline]
const fn is_identifier_byte(b: u8) -> bool {
    matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'_')
}

#[inline]
const fn is_segment_byte(b: u8) -> bool {
    matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'-')
}

/// Check a type or exception name: `^(?!_)[_a-z0-9]+(?<!_)$`.
pub const fn is_valid_identifier(s: &str) -> bool {
    let bytes = s.as_bytes();
    let len = bytes.len();
    if len == 0 || bytes[0] == b'_' || bytes[len - 1] == b'_' {
        return false;
    }

    let mut i = 0;
    while i < len {
        if !is_identifier_byte(bytes[i]) {
            return false;
        }
        i += 1;
    }
    true
}

/// Check a module namespace:
/// `^(?!-)[-a-z0-9]+(?<!-)(\.(?!-)[-a-z0-9]+(?<!-))*$`.
pub const fn is_valid_module(s: &str) -> bool {
    let bytes = s.as_bytes();
    let len = bytes.len();
    let mut start = 0;
    let mut i = 0;

    while i <= len {
        if i == len || bytes[i] == b'.' {
            // segment is bytes[start..i]
            if i == start || bytes[start] == b'-' || bytes[i - 1] == b'-' {
                return false;
            }
            start = i + 1;
        } else if !is_segment_byte(bytes[i]) {
            return false;
        }
        i += 1;
    }
    true
}

// ============================================================================
// Violations
// ============================================================================

/// Reasons the registry refuses a construction or a registration.
///
/// Variants carry owned copies of the offending input so they can be turned
/// into exception metadata after the fact.
#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    /// Module namespace does not satisfy [`is_valid_module`].
    MalformedModule {
        /// The rejected namespace.
        module: String,
    },
    /// A declared type name does not satisfy [`is_valid_identifier`].
    MalformedType {
        /// The rejected type name.
        type_name: String,
    },
    /// Registration references a type the registry never declared.
    TypeNotFound {
        /// The rejected registration.
        registration: Registration,
        /// Module of the registry.
        module: String,
    },
    /// Registration name does not satisfy [`is_valid_identifier`].
    MalformedName {
        /// The rejected registration.
        registration: Registration,
        /// Module of the registry.
        module: String,
    },
    /// Registration name is already taken in the registry.
    DuplicateName {
        /// The rejected registration.
        registration: Registration,
        /// Module of the registry.
        module: String,
    },
    /// Registration code (explicit or allocated) is already taken.
    DuplicateCode {
        /// The rejected registration.
        registration: Registration,
        /// Module of the registry.
        module: String,
        /// The colliding code.
        code: i64,
    },
}

impl Violation {
    /// Name of the built-in exception kind this violation is raised as.
    pub const fn builtin_name(&self) -> &'static str {
        match self {
            Self::MalformedModule { .. } => crate::builtin::MALFORMED_MODULE,
            Self::MalformedType { .. } => crate::builtin::MALFORMED_TYPE,
            Self::TypeNotFound { .. } => crate::builtin::TYPE_NOT_FOUND,
            Self::MalformedName { .. } => crate::builtin::MALFORMED_NAME,
            Self::DuplicateName { .. } => crate::builtin::DUP_EXCEPTION_NAME,
            Self::DuplicateCode { .. } => crate::builtin::DUP_EXCEPTION_CODE,
        }
    }

    /// Metadata attached to the raised exception.
    ///
    /// Construction violations carry the offending value; registration
    /// violations carry every registration field plus the registry module.
    pub fn metadata(&self) -> Metadata {
        let mut meta = Metadata::new();
        match self {
            Self::MalformedModule { module } => {
                meta.insert("module".into(), Value::String(module.clone()));
            }
            Self::MalformedType { type_name } => {
                meta.insert("type".into(), Value::String(type_name.clone()));
            }
            Self::TypeNotFound { registration, module }
            | Self::MalformedName { registration, module }
            | Self::DuplicateName { registration, module }
            | Self::DuplicateCode {
                registration,
                module,
                ..
            } => {
                meta = registration.to_metadata();
                meta.insert("module".into(), Value::String(module.clone()));
            }
        }
        meta
    }

    /// Raise this violation as an exception of the built-in registry.
    pub fn raise(&self, builtins: &BuiltIns) -> Exception {
        builtins.raise(self.builtin_name(), self.metadata())
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedModule { module } => {
                write!(f, "module name '{}' is malformed", module)
            }
            Self::MalformedType { type_name } => {
                write!(f, "type name '{}' is malformed", type_name)
            }
            Self::TypeNotFound {
                registration,
                module,
            } => write!(
                f,
                "type '{}' is not declared in module '{}'",
                registration.type_name(),
                module
            ),
            Self::MalformedName {
                registration,
                module,
            } => write!(
                f,
                "exception name '{}' is malformed (module '{}')",
                registration.name(),
                module
            ),
            Self::DuplicateName {
                registration,
                module,
            } => write!(
                f,
                "exception name '{}' is already registered in module '{}'",
                registration.name(),
                module
            ),
            Self::DuplicateCode {
                registration,
                module,
                code,
            } => write!(
                f,
                "exception code {} (for '{}') is already registered in module '{}'",
                code,
                registration.name(),
                module
            ),
        }
    }
}

impl std::error::Error for Violation {}
