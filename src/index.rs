//! Code index allocators - hand out successive unique codes within a type.
//!
//! Every exception type declared on a registry owns exactly one allocator.
//! The registry invokes it once per registration that does not carry an
//! explicit code, so the allocator only ever sees a single registration
//! sequence.
//!
//! # Provided Allocators
//!
//! - [`IncreasingIndex`]: `base, base + 1, base + 2, ...`
//! - [`DecreasingIndex`]: `base, base - 1, base - 2, ...`
//! - Any `FnMut() -> i64` closure, for custom sequences.
//!
//! # Example
//!
//! ```rust
//! use exception_registry::{CodeIndex, IncreasingIndex};
//!
//! let mut index = IncreasingIndex::new(100);
//! assert_eq!(index.next_code(), 100);
//! assert_eq!(index.next_code(), 101);
//! ```
//!
//! Overflow is not checked for; codes wrap silently on the (practically
//! unreachable) 64-bit boundary.

use std::fmt;

/// The exception code indexing contract.
///
/// Implementors must return a value that differs from every value they
/// returned before. The registry still rejects colliding codes, so a
/// misbehaving allocator produces `dup_exception_code` errors rather than
/// silent corruption.
pub trait CodeIndex: Send + Sync {
    /// Produce the next code of the sequence.
    fn next_code(&mut self) -> i64;
}

impl<F> CodeIndex for F
where
    F: FnMut() -> i64 + Send + Sync,
{
    #[inline]
    fn next_code(&mut self) -> i64 {
        self()
    }
}

/// Allocator returning the next bigger integer on every call.
///
/// The first call returns `base` itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncreasingIndex {
    next: i64,
}

impl IncreasingIndex {
    /// Create an allocator whose first code is `base`.
    #[inline]
    pub const fn new(base: i64) -> Self {
        Self { next: base }
    }

    /// Peek at the code the next call will produce.
    #[inline]
    pub const fn peek(&self) -> i64 {
        self.next
    }
}

impl CodeIndex for IncreasingIndex {
    #[inline]
    fn next_code(&mut self) -> i64 {
        let code = self.next;
        self.next = self.next.wrapping_add(1);
        code
    }
}

/// Allocator returning the next smaller integer on every call.
///
/// The first call returns `base` itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecreasingIndex {
    next: i64,
}

impl DecreasingIndex {
    /// Create an allocator whose first code is `base`.
    #[inline]
    pub const fn new(base: i64) -> Self {
        Self { next: base }
    }

    /// Peek at the code the next call will produce.
    #[inline]
    pub const fn peek(&self) -> i64 {
        self.next
    }
}

impl CodeIndex for DecreasingIndex {
    #[inline]
    fn next_code(&mut self) -> i64 {
        let code = self.next;
        self.next = self.next.wrapping_sub(1);
        code
    }
}

/// Shorthand for [`IncreasingIndex::new`], boxed for registry options.
#[inline]
pub fn increasing_code_index(base: i64) -> Box<dyn CodeIndex> {
    Box::new(IncreasingIndex::new(base))
}

/// Shorthand for [`DecreasingIndex::new`], boxed for registry options.
#[inline]
pub fn decreasing_code_index(base: i64) -> Box<dyn CodeIndex> {
    Box::new(DecreasingIndex::new(base))
}

impl fmt::Debug for dyn CodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CodeIndex { .. }")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increasing_starts_at_base() {
        let mut index = IncreasingIndex::new(1);
        assert_eq!(index.next_code(), 1);
        assert_eq!(index.next_code(), 2);
        assert_eq!(index.next_code(), 3);
        assert_eq!(index.peek(), 4);
    }

    #[test]
    fn decreasing_starts_at_base() {
        let mut index = DecreasingIndex::new(-1);
        assert_eq!(index.next_code(), -1);
        assert_eq!(index.next_code(), -2);
        assert_eq!(index.peek(), -3);
    }

    #[test]
    fn closures_are_allocators() {
        let mut n: i64 = 0;
        let mut index = move || {
            n += 10;
            n
        };
        assert_eq!(CodeIndex::next_code(&mut index), 10);
        assert_eq!(CodeIndex::next_code(&mut index), 20);
    }

    #[test]
    fn boxed_shorthands() {
        let mut up = increasing_code_index(7);
        let mut down = decreasing_code_index(7);
        assert_eq!(up.next_code(), 7);
        assert_eq!(up.next_code(), 8);
        assert_eq!(down.next_code(), 7);
        assert_eq!(down.next_code(), 6);
    }

    #[test]
    fn large_negative_base() {
        let mut index = DecreasingIndex::new(-0xFFFF_FFFF);
        assert_eq!(index.next_code(), -4_294_967_295);
        assert_eq!(index.next_code(), -4_294_967_296);
    }
}
