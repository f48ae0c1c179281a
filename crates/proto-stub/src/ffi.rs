//! C entry points for fuzz drivers.
//!
//! Both functions are thin wrappers over a process-wide `ProtoStub` bound to the
//! Greeter table. The stub's mutator is configured from `PROTO_STUB_*`
//! environment variables on first use.

use crate::greeter::Greeter;
use crate::mutator::ProtoMutator;
use crate::table::ProtoStub;
use common::config::MutatorConfig;
use common::error::Result;
use std::ffi::c_char;
use std::sync::OnceLock;
use tracing::{debug, warn};

static STUB: OnceLock<ProtoStub<Greeter, ProtoMutator>> = OnceLock::new();

fn stub() -> &'static ProtoStub<Greeter, ProtoMutator> {
    STUB.get_or_init(|| ProtoStub::new(ProtoMutator::new(configured(MutatorConfig::from_env()))))
}

/// Mutator tunables from a load result, falling back to defaults on error
fn configured(loaded: Result<MutatorConfig>) -> MutatorConfig {
    match loaded {
        Ok(config) => {
            debug!(?config, "Loaded mutator configuration");
            config
        }
        Err(e) => {
            warn!(error = %e, "Invalid mutator configuration, using defaults");
            MutatorConfig::DEFAULT
        }
    }
}

/// Method path for `index`, reduced modulo the table size.
///
/// The returned pointer refers to a static NUL-terminated string and is never
/// null.
#[no_mangle]
pub extern "C" fn proto_stub_get_method(index: u32) -> *const c_char {
    stub().get_method(index).as_ptr()
}

/// Mutate `data[..size]` in place as the request type of the method at `index`.
///
/// Returns the number of bytes written, at most `max_size`. Returns 0 without
/// touching the buffer when `data` is null or `max_size` is 0. `size` is
/// clamped to `max_size`.
///
/// # Safety
///
/// `data` must be null or valid for reads and writes of `max_size` bytes for
/// the duration of the call, and must not be aliased elsewhere meanwhile.
#[no_mangle]
pub unsafe extern "C" fn proto_stub_mutate(
    index: u32,
    data: *mut u8,
    size: usize,
    max_size: usize,
    seed: u32,
) -> usize {
    if data.is_null() || max_size == 0 {
        return 0;
    }

    // SAFETY: non-null, and the caller guarantees `max_size` writable bytes.
    let buf = unsafe { std::slice::from_raw_parts_mut(data, max_size) };
    stub().mutate(index, buf, size.min(max_size), max_size, seed)
}
