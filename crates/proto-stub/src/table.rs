//! Method table and the index-to-mutator stub.

use crate::mutator::StructuralMutator;
use std::ffi::CStr;
use std::marker::PhantomData;

/// A closed set of RPC methods, each bound to its request message type.
///
/// `METHODS` and `dispatch` must cover the same slots: every index below
/// `METHODS.len()` has to dispatch to the request type of the method at that
/// position. Generated tables uphold this; a table that drifts is detected at
/// call time and the process aborts.
pub trait RpcTable {
    /// Method paths in table order, `/<package>.<Service>/<Method>`
    const METHODS: &'static [&'static CStr];

    /// Run `mutator` against the request type of the method in `slot`.
    ///
    /// Returns `None` when no method occupies `slot`.
    fn dispatch<S: StructuralMutator>(
        slot: usize,
        mutator: &S,
        data: &mut [u8],
        size: usize,
        max_size: usize,
        seed: u32,
    ) -> Option<usize>;
}

/// Maps an arbitrary index onto a method table and forwards mutation requests.
///
/// Indices are reduced modulo the table size, so any `u32` is accepted and
/// out-of-range indices alias onto valid methods.
pub struct ProtoStub<T, S> {
    mutator: S,
    table: PhantomData<fn() -> T>,
}

impl<T, S> ProtoStub<T, S>
where
    T: RpcTable,
    S: StructuralMutator,
{
    /// Bind a mutator to a table
    pub const fn new(mutator: S) -> Self {
        Self {
            mutator,
            table: PhantomData,
        }
    }

    /// The mutator requests are forwarded to
    pub const fn mutator(&self) -> &S {
        &self.mutator
    }

    /// Number of methods in the table
    #[must_use]
    pub fn len(&self) -> usize {
        T::METHODS.len()
    }

    /// Whether the table is empty (never true for a usable table)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        T::METHODS.is_empty()
    }

    fn slot(index: u32) -> usize {
        match (index as usize).checked_rem(T::METHODS.len()) {
            Some(slot) => slot,
            None => std::process::abort(),
        }
    }

    /// Path of the method at `index mod len`
    #[must_use]
    pub fn get_method(&self, index: u32) -> &'static CStr {
        match T::METHODS.get(Self::slot(index)) {
            Some(&path) => path,
            None => std::process::abort(),
        }
    }

    /// Mutate `data[..size]` as the request type of the method at `index mod len`.
    ///
    /// Returns the number of bytes written, at most `max_size`. The stub always
    /// tells the mutator to expect a valid encoding.
    pub fn mutate(
        &self,
        index: u32,
        data: &mut [u8],
        size: usize,
        max_size: usize,
        seed: u32,
    ) -> usize {
        let slot = Self::slot(index);
        match T::dispatch(slot, &self.mutator, data, size, max_size, seed) {
            Some(written) => written,
            None => std::process::abort(),
        }
    }
}

impl<T, S: Default> Default for ProtoStub<T, S> {
    fn default() -> Self {
        Self {
            mutator: S::default(),
            table: PhantomData,
        }
    }
}

impl<T, S: std::fmt::Debug> std::fmt::Debug for ProtoStub<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtoStub")
            .field("table", &std::any::type_name::<T>())
            .field("mutator", &self.mutator)
            .finish()
    }
}
