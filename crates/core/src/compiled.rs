// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Type-erased compile-once cache for expressions owned by the data model
//! but compiled and evaluated by the expression layer.
//!
//! `Step::if_` is compiled at most once and the compiled program is then
//! reused by every later evaluation, including every iteration of a `for`
//! loop over the same step. Expressing this as an opaque handle (rather than
//! a public mutable field holding the parsed AST) avoids `atkins-core`
//! depending on `atkins-expr`'s AST type while still caching the result on
//! the step itself.

use std::any::Any;
use std::sync::OnceLock;

/// Holds at most one compiled value, of a type chosen by the first caller.
#[derive(Default)]
pub struct CompiledSlot {
    inner: OnceLock<Box<dyn Any + Send + Sync>>,
}

impl CompiledSlot {
    pub fn new() -> Self {
        Self {
            inner: OnceLock::new(),
        }
    }

    /// Returns the cached value, compiling it with `init` on first access.
    ///
    /// `init` runs at most once even under concurrent access; if two callers
    /// race, one `init` result is kept and the other discarded, but both
    /// callers observe a consistent, successfully compiled value on return.
    /// `init` failures are never cached: they return an error, and the next
    /// call attempts compilation again.
    #[allow(clippy::expect_used)]
    pub fn get_or_try_init<T, E>(
        &self,
        init: impl FnOnce() -> Result<T, E>,
    ) -> Result<&T, E>
    where
        T: Send + Sync + 'static,
    {
        if let Some(existing) = self.inner.get() {
            // Safety of the downcast is guaranteed by construction: only this
            // method ever writes into `inner`, and it is monomorphized per
            // call site over `T`, so every write for a given `CompiledSlot`
            // instance is of the same concrete type.
            return Ok(downcast(existing));
        }
        let value = init()?;
        let boxed: Box<dyn Any + Send + Sync> = Box::new(value);
        let _ = self.inner.set(boxed);
        // Re-read regardless of whether `set` above won the race, so every
        // caller observes the one winning value.
        Ok(downcast(
            self.inner.get().expect("value was just set above"),
        ))
    }
}

#[allow(clippy::expect_used)]
fn downcast<T: 'static>(boxed: &(dyn Any + Send + Sync)) -> &T {
    boxed
        .downcast_ref::<T>()
        .expect("CompiledSlot used with more than one type")
}

impl std::fmt::Debug for CompiledSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledSlot")
            .field("compiled", &self.inner.get().is_some())
            .finish()
    }
}

// Steps are cloned when an execution context forks for an iteration; the
// compiled program is immutable once set; sharing (not re-compiling) the
// cached value across clones is intentional, so `Clone` starts empty and
// recompiles in the clone the first time it's needed instead of trying to
// clone a `dyn Any`.
impl Clone for CompiledSlot {
    fn clone(&self) -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "compiled_tests.rs"]
mod tests;
