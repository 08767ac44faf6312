//! Error types for fallible table operations.

use core::alloc::Layout;

/// The error returned by `try_*` operations when a table cannot obtain the
/// storage it needs.
///
/// A table that reports this error is left exactly as it was before the call:
/// no entry has been moved, dropped, or lost.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum TryReserveError {
    /// The requested bucket count, or the byte size of one of its buffers,
    /// does not fit in `usize`.
    #[error("capacity overflow")]
    CapacityOverflow,

    /// The allocator refused to satisfy a request for `layout`.
    #[error("memory allocation of {} bytes failed", layout.size())]
    AllocError {
        /// The layout of the refused allocation.
        layout: Layout,
    },
}

/// Unwraps the result of a fallible storage operation the same way `alloc`
/// collections do for their infallible APIs.
#[inline]
pub(crate) fn infallible<T>(result: Result<T, TryReserveError>) -> T {
    match result {
        Ok(value) => value,
        Err(TryReserveError::CapacityOverflow) => panic!("capacity overflow"),
        Err(TryReserveError::AllocError { layout }) => alloc::alloc::handle_alloc_error(layout),
    }
}
