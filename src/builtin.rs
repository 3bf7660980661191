//! The built-in registry and the registry-independent helpers.
//!
//! # Self-Hosting
//!
//! The registry reports its own failures (malformed names, unknown types,
//! collisions) as ordinary [`Exception`]s. Those kinds live in a dedicated
//! registry under module [`BUILTIN_MODULE`], type [`BUILTIN_TYPE`], whose
//! codes count down from `-0xFFFF_FFFF` so they never collide with
//! application codes in practice.
//!
//! The built-in registry is a lazily initialised, process-wide singleton
//! reachable only through [`builtins()`]. Registry code receives it as an
//! explicit `&BuiltIns` when converting a [`Violation`](crate::Violation)
//! into an exception.
//!
//! # Kinds
//!
//! | Name                 | Raised when                                       |
//! |----------------------|---------------------------------------------------|
//! | `type_not_found`     | registration names an undeclared type             |
//! | `malformed_type`     | a declared type name breaks the identifier rule   |
//! | `malformed_module`   | the module namespace breaks the module rule       |
//! | `malformed_name`     | a registration name breaks the identifier rule    |
//! | `dup_exception_name` | the name is already registered                    |
//! | `dup_exception_code` | the code is already registered                    |

use crate::exception::{Exception, ExceptionKind, Metadata};
use crate::index::DecreasingIndex;
use crate::options::{Registration, RegistryOptions};
use crate::registry::ExceptionRegistry;
use std::sync::OnceLock;

/// Module namespace of the built-in registry.
pub const BUILTIN_MODULE: &str = "exceptions.litert.org";

/// The only type of the built-in registry.
pub const BUILTIN_TYPE: &str = "built_in";

/// First code handed out by the built-in allocator.
pub const BUILTIN_CODE_BASE: i64 = -0xFFFF_FFFF;

/// Registration names an undeclared type.
pub const TYPE_NOT_FOUND: &str = "type_not_found";
/// A declared type name is malformed.
pub const MALFORMED_TYPE: &str = "malformed_type";
/// The module namespace is malformed.
pub const MALFORMED_MODULE: &str = "malformed_module";
/// A registration name is malformed.
pub const MALFORMED_NAME: &str = "malformed_name";
/// Name collision at registration.
pub const DUP_EXCEPTION_NAME: &str = "dup_exception_name";
/// Code collision at registration.
pub const DUP_EXCEPTION_CODE: &str = "dup_exception_code";

const DEFINITIONS: [(&str, &str); 6] = [
    (
        TYPE_NOT_FOUND,
        "The type of new exception definition is not defined.",
    ),
    (
        MALFORMED_TYPE,
        "The type of new exception definition is malformed.",
    ),
    (
        MALFORMED_MODULE,
        "The module name of new exception registry is malformed.",
    ),
    (MALFORMED_NAME, "The name of new exception is malformed."),
    (
        DUP_EXCEPTION_NAME,
        "The name of new exception has been used already.",
    ),
    (
        DUP_EXCEPTION_CODE,
        "The code of new exception has been used already.",
    ),
];

/// The built-in registry plus a handle to each of its kinds.
#[derive(Debug)]
pub struct BuiltIns {
    registry: ExceptionRegistry,
    /// [`TYPE_NOT_FOUND`]
    pub type_not_found: ExceptionKind,
    /// [`MALFORMED_TYPE`]
    pub malformed_type: ExceptionKind,
    /// [`MALFORMED_MODULE`]
    pub malformed_module: ExceptionKind,
    /// [`MALFORMED_NAME`]
    pub malformed_name: ExceptionKind,
    /// [`DUP_EXCEPTION_NAME`]
    pub dup_exception_name: ExceptionKind,
    /// [`DUP_EXCEPTION_CODE`]
    pub dup_exception_code: ExceptionKind,
}

impl BuiltIns {
    /// Bootstrap the built-in registry.
    ///
    /// # Panics
    ///
    /// Panics if a built-in definition is rejected. The definitions are
    /// constants, so this only happens if the validation rules or the
    /// constants above are edited inconsistently.
    fn bootstrap() -> Self {
        let options = RegistryOptions::new(BUILTIN_MODULE)
            .with_type(BUILTIN_TYPE, DecreasingIndex::new(BUILTIN_CODE_BASE));

        let mut registry = match ExceptionRegistry::try_new(options) {
            Ok(registry) => registry,
            Err(v) => panic!("built-in registry rejected: {v}"),
        };

        let kinds = DEFINITIONS.map(|(name, message)| {
            match registry.try_register(Registration::new(BUILTIN_TYPE, name, message)) {
                Ok(kind) => kind,
                Err(v) => panic!("built-in exception '{name}' rejected: {v}"),
            }
        });
        let [
            type_not_found,
            malformed_type,
            malformed_module,
            malformed_name,
            dup_exception_name,
            dup_exception_code,
        ] = kinds;

        Self {
            registry,
            type_not_found,
            malformed_type,
            malformed_module,
            malformed_name,
            dup_exception_name,
            dup_exception_code,
        }
    }

    /// The built-in registry itself (for `parse`, `from_json`, lookups).
    #[inline]
    pub fn registry(&self) -> &ExceptionRegistry {
        &self.registry
    }

    /// Instantiate a built-in kind by name.
    ///
    /// # Panics
    ///
    /// Panics on an unknown name; callers pass the constants of this module.
    pub(crate) fn raise(&self, name: &str, metadata: Metadata) -> Exception {
        match self.registry.raise(name, metadata, None) {
            Some(e) => e,
            None => panic!("'{name}' is not a built-in exception"),
        }
    }
}

static BUILTINS: OnceLock<BuiltIns> = OnceLock::new();

/// The process-wide built-in registry, initialised on first use.
pub fn builtins() -> &'static BuiltIns {
    BUILTINS.get_or_init(BuiltIns::bootstrap)
}

// ============================================================================
// Registry-Independent Helpers
// ============================================================================

/// Identify whether an error is an exception of this library.
///
/// Without `type_name`, any [`Exception`] matches. With it, the type must
/// match, and `name` / `module` are additional optional filters.
///
/// ```rust
/// use exception_registry::{builtins, identify, ExceptionRegistry, RegistryOptions};
///
/// let err = ExceptionRegistry::new(RegistryOptions::new("Bad Module")).unwrap_err();
/// let kind = &builtins().malformed_module;
/// assert!(identify(&err, Some(kind.type_name()), Some(kind.name()), None));
/// ```
pub fn identify(
    e: &(dyn std::error::Error + 'static),
    type_name: Option<&str>,
    name: Option<&str>,
    module: Option<&str>,
) -> bool {
    let Some(e) = e.downcast_ref::<Exception>() else {
        return false;
    };

    match type_name {
        None => true,
        Some(t) => {
            t == e.type_name()
                && name.is_none_or(|n| n == e.name())
                && module.is_none_or(|m| m == e.module())
        }
    }
}

/// Check whether an error is an exception of `kind`.
///
/// True when it was built by exactly that kind, or when its
/// `(type, name, module)` triple matches (e.g. after `parse`/`from_json`).
pub fn equals(e: &(dyn std::error::Error + 'static), kind: &ExceptionKind) -> bool {
    e.downcast_ref::<Exception>().is_some_and(|e| e.is(kind))
}
