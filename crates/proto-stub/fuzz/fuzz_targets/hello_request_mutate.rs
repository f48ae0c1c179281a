#![no_main]

use libfuzzer_sys::{fuzz_mutator, fuzz_target};
use prost::Message;
use proto_gen::helloworld::HelloRequest;
use proto_stub::ffi::{proto_stub_get_method, proto_stub_mutate};
use std::ffi::CStr;

fuzz_target!(|data: &[u8]| {
    // Every input reaching the target went through the structural mutator
    // (or is a corpus seed), so it should be a valid request.
    if let Ok(request) = HelloRequest::decode(data) {
        assert_eq!(request.encode_to_vec().len(), request.encoded_len());
    }

    // SAFETY: proto_stub_get_method returns a static NUL-terminated string.
    let path = unsafe { CStr::from_ptr(proto_stub_get_method(data.len() as u32)) };
    assert!(path.to_bytes().starts_with(b"/"));
});

fuzz_mutator!(|data: &mut [u8], size: usize, max_size: usize, seed: u32| {
    // Route every mutation through the stub. The index only picks the method,
    // so the seed doubles as the index.
    //
    // SAFETY: `data` is valid for `max_size` bytes for the duration of the call.
    unsafe { proto_stub_mutate(seed, data.as_mut_ptr(), size, max_size.min(data.len()), seed) }
});
