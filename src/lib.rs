//! # Exception Registry
//!
//! Uniquely identified, typed exception kinds that survive process and
//! network boundaries.
//!
//! ## Design Philosophy
//!
//! 1. **Every exception has an identity**: module + type + name, plus a
//!    numeric code unique within its registry
//! 2. **Identities are allocated, not hand-picked**: each type owns a code
//!    allocator, so independent modules never coordinate numbering
//! 3. **Kinds are frozen**: a registered definition never changes
//! 4. **Exceptions travel as URIs**: a compact, percent-encoded
//!    `exception:` URI (or a JSON record) round-trips back into a typed
//!    exception on the receiving side
//! 5. **Untrusted input never panics**: parsing degrades to `None` or to an
//!    untyped exception, never to an error
//! 6. **The registry eats its own cooking**: its own failures are
//!    exceptions of a built-in registry
//!
//! ## Quick Start
//!
//! ```rust
//! use exception_registry::{
//!     DecreasingIndex, ExceptionRegistry, IncreasingIndex, Registration, RegistryOptions,
//! };
//!
//! let mut registry = ExceptionRegistry::new(
//!     RegistryOptions::new("test.litert.org")
//!         .with_type("private", DecreasingIndex::new(-1))
//!         .with_type("public", IncreasingIndex::new(1)),
//! )?;
//!
//! let no_user = registry.register(Registration::new("public", "no_user", "No such a user."))?;
//!
//! let err = no_user.create().with_metadata("id", 42);
//! let uri = err.to_string();
//! assert!(uri.starts_with("exception://test.litert.org/public/no_user?code=1&msg=No%20such%20a%20user."));
//!
//! let back = registry.parse(&uri).expect("well-formed");
//! assert!(registry.identify(&back, Some("public"), Some("no_user")));
//! assert_eq!(back.metadata()["id"], 42);
//! # Ok::<(), exception_registry::Exception>(())
//! ```
//!
//! ## Handling Registry Failures
//!
//! ```rust
//! use exception_registry::{builtins, equals, ExceptionRegistry, IncreasingIndex, Registration, RegistryOptions};
//!
//! let mut registry = ExceptionRegistry::new(
//!     RegistryOptions::new("test.litert.org").with_type("public", IncreasingIndex::new(1)),
//! )?;
//!
//! let err = registry
//!     .register(Registration::new("-public", "no_user", "No such a user."))
//!     .unwrap_err();
//! assert!(equals(&err, &builtins().type_not_found));
//! # Ok::<(), exception_registry::Exception>(())
//! ```
//!
//! ## Features
//!
//! - `capture_stack` (default): capture a `std::backtrace::Backtrace` into
//!   the trace of every newly constructed exception

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builtin;
pub mod exception;
pub mod index;
pub mod logging;
pub mod options;
pub mod record;
pub mod registry;
mod trace;
pub mod validate;

pub use builtin::{builtins, equals, identify, BuiltIns};
pub use exception::{Exception, ExceptionDefinition, ExceptionKind, Metadata};
pub use index::{
    decreasing_code_index, increasing_code_index, CodeIndex, DecreasingIndex, IncreasingIndex,
};
pub use logging::ExceptionLog;
pub use options::{Registration, RegistryOptions};
pub use record::{decode_uri, ExceptionRecord, UriError, SCHEME};
pub use registry::{ExceptionRegistry, Identity};
pub use validate::{is_valid_identifier, is_valid_module, Violation};

/// Type alias for results of registry construction and registration.
pub type Result<T> = std::result::Result<T, Exception>;
