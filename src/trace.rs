//! Capture-time trace strings.
//!
//! The trace is opaque to the registry: a header line naming the kind,
//! followed by whatever `std::backtrace` captured at construction. Frame
//! capture obeys `RUST_BACKTRACE` / `RUST_LIB_BACKTRACE` and is compiled out
//! entirely without the `capture_stack` feature.

use crate::exception::ExceptionDefinition;

/// Header line identifying the kind an instance was built from.
pub(crate) fn header(def: &ExceptionDefinition) -> String {
    format!(
        "{}/{}/{}: {}",
        def.module(),
        def.type_name(),
        def.name(),
        def.message()
    )
}

#[cfg(feature = "capture_stack")]
pub(crate) fn capture(def: &ExceptionDefinition) -> String {
    use std::backtrace::{Backtrace, BacktraceStatus};

    let mut trace = header(def);
    let backtrace = Backtrace::capture();
    if backtrace.status() == BacktraceStatus::Captured {
        trace.push('\n');
        trace.push_str(&backtrace.to_string());
    }
    trace
}

#[cfg(not(feature = "capture_stack"))]
pub(crate) fn capture(def: &ExceptionDefinition) -> String {
    header(def)
}
