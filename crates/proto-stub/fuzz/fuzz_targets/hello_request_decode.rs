#![no_main]

use libfuzzer_sys::fuzz_target;
use prost::Message;
use proto_gen::helloworld::HelloRequest;

fuzz_target!(|data: &[u8]| {
    // Decoding arbitrary bytes must never panic, only return Err
    if let Ok(request) = HelloRequest::decode(data) {
        // Anything that decodes must survive a round-trip unchanged
        let encoded = request.encode_to_vec();
        let again = HelloRequest::decode(encoded.as_slice()).expect("re-encoded request must decode");
        assert_eq!(request, again);
    }
});
