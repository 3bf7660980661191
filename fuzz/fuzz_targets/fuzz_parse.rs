#![no_main]

use exception_registry::{ExceptionRegistry, IncreasingIndex, Registration, RegistryOptions};
use libfuzzer_sys::fuzz_target;
use std::sync::OnceLock;

fn registry() -> &'static ExceptionRegistry {
    static REGISTRY: OnceLock<ExceptionRegistry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut registry = ExceptionRegistry::new(
            RegistryOptions::new("fuzz.example").with_type("public", IncreasingIndex::new(1)),
        )
        .unwrap();
        registry
            .register(Registration::new("public", "target", "Fuzz target."))
            .unwrap();
        registry
    })
}

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    // Whatever parses must re-encode into something that parses to the same identity.
    if let Some(e) = registry().parse(input) {
        let again = registry()
            .parse(&e.to_uri(false))
            .expect("re-encoded exception must parse");
        assert_eq!(again.code(), e.code());
        assert_eq!(again.name(), e.name());
        assert_eq!(again.module(), e.module());
        assert_eq!(again.metadata().len(), e.metadata().len());
    }
});
