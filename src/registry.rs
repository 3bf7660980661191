//! The exception registry - one namespace ("module") of registered kinds.
//!
//! # Responsibilities
//!
//! - Validate the module and type names at construction
//! - Allocate codes through each type's [`CodeIndex`](crate::CodeIndex)
//! - Reject malformed names and name/code collisions at registration
//! - Index kinds by name and by code (both indices always hold the same set)
//! - Reconstruct exceptions from URIs and structured records
//!
//! # Failure Model
//!
//! Construction and registration are fail-fast: they return the built-in
//! [`Exception`] describing the problem and leave the registry untouched.
//! Parsing works on untrusted input and is fail-soft: any malformed URI
//! yields `None`. `from_json` trusts its input.
//!
//! # Concurrency
//!
//! `register` takes `&mut self` and every read takes `&self`, so the borrow
//! checker enforces "no reader while a registration is in flight". Share a
//! fully registered registry as `Arc<ExceptionRegistry>`, or wrap it in a
//! lock if registrations continue after startup.
//!
//! # Example
//!
//! ```rust
//! use exception_registry::{ExceptionRegistry, IncreasingIndex, Registration, RegistryOptions};
//!
//! let mut registry = ExceptionRegistry::new(
//!     RegistryOptions::new("svc.example").with_type("public", IncreasingIndex::new(1)),
//! )?;
//! let not_found = registry.register(Registration::new("public", "not_found", "missing"))?;
//!
//! let err = not_found.create().with_metadata("id", 42);
//! let back = registry.parse(&err.to_string()).expect("valid URI");
//!
//! assert!(back.is(&not_found));
//! assert_eq!(back.metadata()["id"], 42);
//! # Ok::<(), exception_registry::Exception>(())
//! ```

use crate::builtin::builtins;
use crate::exception::{Exception, ExceptionDefinition, ExceptionKind, Metadata};
use crate::options::{Registration, RegistryOptions, TypeDeclaration};
use crate::record::{ExceptionRecord, decode_uri};
use crate::validate::{Violation, is_valid_identifier, is_valid_module};
use serde_json::Value;
use smallvec::SmallVec;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::{debug, trace, warn};

/// Lookup key for [`ExceptionRegistry::has`] and [`ExceptionRegistry::get`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity<'a> {
    /// Look up by numeric code.
    Code(i64),
    /// Look up by exception name.
    Name(&'a str),
}

impl From<i64> for Identity<'_> {
    fn from(code: i64) -> Self {
        Self::Code(code)
    }
}

impl From<i32> for Identity<'_> {
    fn from(code: i32) -> Self {
        Self::Code(i64::from(code))
    }
}

impl<'a> From<&'a str> for Identity<'a> {
    fn from(name: &'a str) -> Self {
        Self::Name(name)
    }
}

impl<'a> From<&'a String> for Identity<'a> {
    fn from(name: &'a String) -> Self {
        Self::Name(name.as_str())
    }
}

/// A registry of exception kinds bound to one module namespace.
pub struct ExceptionRegistry {
    module: String,
    types: SmallVec<[TypeDeclaration; 4]>,
    by_name: HashMap<String, ExceptionKind>,
    by_code: BTreeMap<i64, ExceptionKind>,
}

impl ExceptionRegistry {
    /// Create a registry.
    ///
    /// # Errors
    ///
    /// - `malformed_module` if the module namespace is invalid
    /// - `malformed_type` for the first invalid type name
    pub fn new(options: RegistryOptions) -> Result<Self, Exception> {
        Self::try_new(options).map_err(|v| {
            warn!(violation = %v, "exception registry rejected");
            v.raise(builtins())
        })
    }

    pub(crate) fn try_new(options: RegistryOptions) -> Result<Self, Violation> {
        let (module, types) = options.into_parts();

        if !is_valid_module(&module) {
            return Err(Violation::MalformedModule { module });
        }

        if let Some(bad) = types.iter().find(|t| !is_valid_identifier(&t.name)) {
            return Err(Violation::MalformedType {
                type_name: bad.name.clone(),
            });
        }

        debug!(
            module = %module,
            types = types.len(),
            "exception registry created"
        );

        Ok(Self {
            module,
            types,
            by_name: HashMap::new(),
            by_code: BTreeMap::new(),
        })
    }

    /// The module namespace of the registry.
    #[inline]
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Declared type names, in declaration order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(|t| t.name.as_str())
    }

    /// Number of registered kinds.
    #[inline]
    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    /// Whether nothing has been registered yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }

    /// Register a new exception kind and return its handle.
    ///
    /// Without an explicit code, the type's allocator is invoked exactly
    /// once, before collision checks; a rejected registration may therefore
    /// consume a code, but never touches the indices.
    ///
    /// Registering identical content twice is not idempotent: the second
    /// attempt collides on the name.
    ///
    /// # Errors
    ///
    /// - `type_not_found` if the type was not declared
    /// - `malformed_name` if the name is invalid
    /// - `dup_exception_name` if the name is taken
    /// - `dup_exception_code` if the code is taken
    pub fn register(&mut self, registration: Registration) -> Result<ExceptionKind, Exception> {
        self.try_register(registration).map_err(|v| {
            warn!(violation = %v, "exception registration rejected");
            v.raise(builtins())
        })
    }

    pub(crate) fn try_register(
        &mut self,
        registration: Registration,
    ) -> Result<ExceptionKind, Violation> {
        let Some(ty) = self
            .types
            .iter_mut()
            .find(|t| t.name == registration.type_name())
        else {
            return Err(Violation::TypeNotFound {
                registration,
                module: self.module.clone(),
            });
        };

        if !is_valid_identifier(registration.name()) {
            return Err(Violation::MalformedName {
                registration,
                module: self.module.clone(),
            });
        }

        let code = match registration.code() {
            Some(code) => code,
            None => ty.index.next_code(),
        };

        if self.by_name.contains_key(registration.name()) {
            return Err(Violation::DuplicateName {
                registration,
                module: self.module.clone(),
            });
        }

        if self.by_code.contains_key(&code) {
            return Err(Violation::DuplicateCode {
                registration,
                module: self.module.clone(),
                code,
            });
        }

        let (type_name, name, message, metadata) = registration.into_parts();
        let kind = ExceptionKind::new(ExceptionDefinition::new(
            code,
            name.clone(),
            message,
            self.module.clone(),
            type_name,
            metadata,
        ));

        self.by_name.insert(name, kind.clone());
        self.by_code.insert(code, kind.clone());

        debug!(
            module = %self.module,
            type_name = %kind.type_name(),
            name = %kind.name(),
            code = code,
            "exception registered"
        );

        Ok(kind)
    }

    /// Whether a kind with the given code or name is registered.
    pub fn has<'a>(&self, identity: impl Into<Identity<'a>>) -> bool {
        self.get(identity).is_some()
    }

    /// Look up a kind by code or name.
    pub fn get<'a>(&self, identity: impl Into<Identity<'a>>) -> Option<&ExceptionKind> {
        match identity.into() {
            Identity::Code(code) => self.by_code.get(&code),
            Identity::Name(name) => self.by_name.get(name),
        }
    }

    /// Iterate registered kinds in ascending code order.
    pub fn kinds(&self) -> impl Iterator<Item = &ExceptionKind> {
        self.by_code.values()
    }

    /// Snapshot of every registered definition, in ascending code order.
    ///
    /// The returned records are independent copies.
    pub fn definitions(&self) -> Vec<ExceptionDefinition> {
        self.kinds().map(|k| k.definition().clone()).collect()
    }

    /// Instantiate a registered kind by name, `None` if unknown.
    pub fn raise(&self, name: &str, metadata: Metadata, origin: Option<Value>) -> Option<Exception> {
        self.by_name
            .get(name)
            .map(|kind| kind.create_with(metadata, origin))
    }

    /// Identify whether an error is an exception of this library.
    ///
    /// Without `type_name`, any [`Exception`] matches, whatever registry it
    /// came from. With it, the exception must also belong to this registry's
    /// module and have that type (and `name`, when given).
    pub fn identify(
        &self,
        e: &(dyn std::error::Error + 'static),
        type_name: Option<&str>,
        name: Option<&str>,
    ) -> bool {
        let Some(e) = e.downcast_ref::<Exception>() else {
            return false;
        };

        match type_name {
            None => true,
            Some(t) => {
                self.module == e.module()
                    && t == e.type_name()
                    && name.is_none_or(|n| n == e.name())
            }
        }
    }

    /// Parse an `exception:` URI.
    ///
    /// Returns `None` for anything that is not a well-formed exception URI.
    /// A URI naming one of this registry's kinds (same module, registered
    /// name) yields a typed exception carrying that kind; anything else
    /// yields an untyped exception built from the decoded fields.
    pub fn parse(&self, uri: &str) -> Option<Exception> {
        match decode_uri(uri) {
            Ok(record) => Some(self.reconstruct(record)),
            Err(reason) => {
                trace!(reason = %reason, "exception URI rejected");
                None
            }
        }
    }

    /// Rebuild an exception from a structured record.
    ///
    /// Same typed/untyped split as [`parse`](Self::parse). The record is
    /// trusted; no validation is performed.
    pub fn from_json(&self, record: ExceptionRecord) -> Exception {
        self.reconstruct(record)
    }

    fn reconstruct(&self, record: ExceptionRecord) -> Exception {
        match self.by_name.get(&record.name) {
            Some(kind) if record.module == self.module => kind.instantiate(
                record.metadata,
                record.origin,
                record.stack.unwrap_or_default(),
            ),
            _ => Exception::untyped(record),
        }
    }
}

impl fmt::Debug for ExceptionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExceptionRegistry")
            .field("module", &self.module)
            .field("types", &self.type_names().collect::<Vec<_>>())
            .field("kinds", &self.by_code.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{BUILTIN_MODULE, BUILTIN_TYPE};
    use crate::index::{DecreasingIndex, IncreasingIndex};
    use serde_json::json;

    fn registry() -> ExceptionRegistry {
        ExceptionRegistry::new(
            RegistryOptions::new("svc.example")
                .with_type("public", IncreasingIndex::new(1))
                .with_type("private", DecreasingIndex::new(-1)),
        )
        .expect("valid options")
    }

    #[test]
    fn codes_follow_type_allocators() {
        let mut r = registry();
        let a = r.register(Registration::new("public", "a", "A")).unwrap();
        let b = r.register(Registration::new("private", "b", "B")).unwrap();
        let c = r.register(Registration::new("public", "c", "C")).unwrap();
        let d = r.register(Registration::new("private", "d", "D")).unwrap();
        assert_eq!((a.code(), b.code(), c.code(), d.code()), (1, -1, 2, -2));
        assert_eq!(a.module(), "svc.example");
        assert_eq!(r.len(), 4);
    }

    #[test]
    fn explicit_code_skips_allocator() {
        let mut r = registry();
        let a = r
            .register(Registration::new("public", "a", "A").with_code(100))
            .unwrap();
        let b = r.register(Registration::new("public", "b", "B")).unwrap();
        assert_eq!(a.code(), 100);
        assert_eq!(b.code(), 1);
    }

    #[test]
    fn malformed_module() {
        let err = ExceptionRegistry::new(RegistryOptions::new("Svc.example")).unwrap_err();
        assert!(err.is(&builtins().malformed_module));
        assert_eq!(err.metadata()["module"], "Svc.example");
    }

    #[test]
    fn malformed_type() {
        let err = ExceptionRegistry::new(
            RegistryOptions::new("svc.example")
                .with_type("public", IncreasingIndex::new(1))
                .with_type("-public", IncreasingIndex::new(1)),
        )
        .unwrap_err();
        assert!(err.is(&builtins().malformed_type));
        assert_eq!(err.metadata()["type"], "-public");
    }

    #[test]
    fn type_not_found_carries_registration() {
        let mut r = registry();
        let err = r
            .register(Registration::new("-public", "no_user", "No such a user."))
            .unwrap_err();
        assert!(err.is(&builtins().type_not_found));
        assert_eq!(err.module(), BUILTIN_MODULE);
        assert_eq!(err.type_name(), BUILTIN_TYPE);
        assert_eq!(err.metadata()["type"], "-public");
        assert_eq!(err.metadata()["name"], "no_user");
        assert_eq!(err.metadata()["module"], "svc.example");
        assert!(r.is_empty());
    }

    #[test]
    fn malformed_name() {
        let mut r = registry();
        for bad in ["", "_a", "a_", "NotFound", "not-found"] {
            let err = r.register(Registration::new("public", bad, "x")).unwrap_err();
            assert!(err.is(&builtins().malformed_name), "{bad}");
        }
        assert!(r.is_empty());
    }

    #[test]
    fn duplicate_name_leaves_first_intact() {
        let mut r = registry();
        let first = r.register(Registration::new("public", "a", "first")).unwrap();
        let err = r
            .register(Registration::new("private", "a", "second"))
            .unwrap_err();
        assert!(err.is(&builtins().dup_exception_name));
        assert_eq!(r.len(), 1);
        assert!(r.get("a").unwrap().same_kind(&first));
        assert_eq!(r.get("a").unwrap().message(), "first");
    }

    #[test]
    fn duplicate_code() {
        let mut r = registry();
        r.register(Registration::new("public", "a", "A").with_code(7))
            .unwrap();
        let err = r
            .register(Registration::new("private", "b", "B").with_code(7))
            .unwrap_err();
        assert!(err.is(&builtins().dup_exception_code));
        assert_eq!(err.metadata()["code"], 7);
        assert!(!r.has("b"));
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn allocated_code_may_collide_with_explicit_one() {
        let mut r = registry();
        r.register(Registration::new("public", "a", "A").with_code(1))
            .unwrap();
        let err = r.register(Registration::new("public", "b", "B")).unwrap_err();
        assert!(err.is(&builtins().dup_exception_code));
        // The allocator moved on; the next registration succeeds.
        let c = r.register(Registration::new("public", "c", "C")).unwrap();
        assert_eq!(c.code(), 2);
    }

    #[test]
    fn has_and_get() {
        let mut r = registry();
        let kind = r
            .register(Registration::new("public", "a", "A").with_default("k", "v"))
            .unwrap();
        assert!(r.has(1));
        assert!(r.has("a"));
        assert!(r.has(&String::from("a")));
        assert!(!r.has(2));
        assert!(!r.has("b"));
        assert_eq!(r.get(1).unwrap().definition(), kind.definition());
        assert!(r.get("missing").is_none());
    }

    #[test]
    fn definitions_are_snapshots_in_code_order() {
        let mut r = registry();
        r.register(Registration::new("public", "a", "A")).unwrap();
        r.register(Registration::new("private", "b", "B")).unwrap();
        r.register(Registration::new("public", "c", "C")).unwrap();

        let defs = r.definitions();
        let codes: Vec<i64> = defs.iter().map(|d| d.code()).collect();
        assert_eq!(codes, [-1, 1, 2]);

        drop(defs);
        assert_eq!(r.definitions().len(), 3);
    }

    #[test]
    fn identify_asymmetry() {
        let mut r = registry();
        let kind = r.register(Registration::new("public", "a", "A")).unwrap();

        let mut other = ExceptionRegistry::new(
            RegistryOptions::new("other.example").with_type("public", IncreasingIndex::new(1)),
        )
        .unwrap();
        let lookalike = other.register(Registration::new("public", "a", "A")).unwrap();

        let own = kind.create();
        let foreign = lookalike.create();

        // No type filter: any exception of the library.
        assert!(r.identify(&foreign, None, None));
        // With a type filter, the module must match.
        assert!(r.identify(&own, Some("public"), Some("a")));
        assert!(r.identify(&own, Some("public"), None));
        assert!(!r.identify(&foreign, Some("public"), Some("a")));
        assert!(!r.identify(&own, Some("private"), None));
        assert!(!r.identify(&own, Some("public"), Some("b")));

        let io = std::io::Error::other("x");
        assert!(!r.identify(&io, None, None));
    }

    #[test]
    fn parse_typed_roundtrip() {
        let mut r = registry();
        let kind = r
            .register(Registration::new("public", "a", "A").with_default("d", true))
            .unwrap();
        let e = kind
            .create()
            .with_metadata("id", 42)
            .with_origin(json!({"cause": "db"}));

        let back = r.parse(&e.to_uri(false)).expect("parses");
        assert!(back.is_typed());
        assert!(back.kind().unwrap().same_kind(&kind));
        assert_eq!(back.metadata(), e.metadata());
        assert_eq!(back.origin(), e.origin());
        assert_eq!(back.stack(), e.stack());
    }

    #[test]
    fn parse_foreign_module_is_untyped() {
        let mut r = registry();
        r.register(Registration::new("public", "a", "A")).unwrap();

        let uri = "exception://other.example/public/a?code=9&msg=Other&meta=%7B%7D";
        let e = r.parse(uri).expect("parses");
        assert!(!e.is_typed());
        assert_eq!(e.code(), 9);
        assert_eq!(e.message(), "Other");
        assert_eq!(e.module(), "other.example");
        assert_eq!(e.stack(), "");
    }

    #[test]
    fn parse_unknown_name_is_untyped() {
        let r = registry();
        let uri = "exception://svc.example/public/nope?code=3&msg=m&meta=%7B%22x%22%3A1%7D";
        let e = r.parse(uri).expect("parses");
        assert!(!e.is_typed());
        assert_eq!(e.metadata()["x"], 1);
    }

    #[test]
    fn parse_soft_fails() {
        let r = registry();
        assert!(r.parse("").is_none());
        assert!(r.parse("http://svc.example/public/a?code=1&msg=m&meta=%7B%7D").is_none());
        assert!(r.parse("exception://svc.example/public/a?code=1&msg=m").is_none());
        assert!(r.parse("exception://svc.example/public/a?code=1&msg=m&meta=oops").is_none());
    }

    #[test]
    fn from_json_typed_and_untyped() {
        let mut r = registry();
        let kind = r.register(Registration::new("public", "a", "A")).unwrap();
        let e = kind.create().with_metadata("id", 1);

        let typed = r.from_json(e.to_json(false));
        assert!(typed.is(&kind));
        assert!(typed.is_typed());
        assert_eq!(typed.stack(), e.stack());

        let mut record = e.to_json(true);
        record.module = "other.example".into();
        let untyped = r.from_json(record);
        assert!(!untyped.is_typed());
        assert!(!untyped.is(&kind));
        assert_eq!(untyped.stack(), "");
        assert!(untyped.origin().is_none());
    }

    #[test]
    fn raise_by_name() {
        let mut r = registry();
        let kind = r.register(Registration::new("public", "a", "A")).unwrap();
        let e = r.raise("a", Metadata::new(), Some(json!(1))).unwrap();
        assert!(e.is(&kind));
        assert_eq!(e.origin(), Some(&json!(1)));
        assert!(r.raise("b", Metadata::new(), None).is_none());
    }

    #[test]
    fn registry_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ExceptionRegistry>();
        assert_send_sync::<ExceptionKind>();
        assert_send_sync::<Exception>();
    }
}
