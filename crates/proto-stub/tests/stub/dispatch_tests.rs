//! Integration tests for dispatch from index to request type

use crate::support::{Call, Catalog, RecordingMutator};
use proto_stub::{Greeter, ProtoStub};

#[test]
fn test_greeter_dispatches_hello_request() {
    // Arrange
    let stub = ProtoStub::<Greeter, _>::new(RecordingMutator::default());
    let mut buf = [0u8; 32];

    // Act
    let written = stub.mutate(5, &mut buf, 4, 32, 11);

    // Assert
    assert_eq!(written, 4);
    assert_eq!(
        *stub.mutator().calls.borrow(),
        vec![Call {
            message: "helloworld.HelloRequest".to_string(),
            message_was_empty: true,
            assume_valid: true,
            size: 4,
            max_size: 32,
            seed: 11,
        }]
    );
}

#[test]
fn test_catalog_dispatches_by_slot() {
    let stub = ProtoStub::<Catalog, _>::new(RecordingMutator::default());
    let mut buf = [0u8; 8];

    for index in [0, 1, 2, 3, u32::MAX] {
        stub.mutate(index, &mut buf, 0, 8, index);
    }

    let dispatched: Vec<String> = stub
        .mutator()
        .calls
        .borrow()
        .iter()
        .map(|call| call.message.clone())
        .collect();
    assert_eq!(
        dispatched,
        vec![
            "shop.GetItemRequest",
            "shop.ListItemsRequest",
            "shop.GetItemRequest",
            "shop.ListItemsRequest",
            "shop.ListItemsRequest",
        ]
    );
}

#[test]
fn test_stub_returns_mutator_result_unchanged() {
    let stub = ProtoStub::<Catalog, _>::new(RecordingMutator::default());
    let mut buf = [0u8; 64];

    // The recording mutator reports min(size, max_size)
    assert_eq!(stub.mutate(1, &mut buf, 40, 16, 0), 16);
    assert_eq!(stub.mutate(1, &mut buf, 3, 16, 0), 3);

    let calls = stub.mutator().calls.borrow();
    assert!(calls.iter().all(|call| call.assume_valid && call.message_was_empty));
    assert_eq!(calls.iter().map(|call| call.seed).sum::<u32>(), 0);
}
