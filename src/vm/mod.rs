//! The interface a runtime implements to host the collector.
//!
//! The collector owns the heap but not the roots: thread stacks, handles, compiled code and
//! class loader data live in the runtime and are reached through [`Scanning`]. Stopping the
//! world and the JNI critical state come from [`Collection`], and string deduplication is
//! delegated to [`StringDedup`]. A runtime ties its implementations together in one
//! [`VMBinding`].

mod collection;
mod scanning;
mod string_dedup;
mod vmbinding;

#[cfg(test)]
mod tests;

pub use self::collection::Collection;
pub use self::scanning::{CldHandleVisitor, CldScope, CodeRootScope, RootVisitor, Scanning};
pub use self::string_dedup::StringDedup;
pub use self::vmbinding::VMBinding;
