//! A table that lists more methods than it dispatches must abort the process.
//!
//! The abort runs in a child process: the test re-executes its own binary with
//! an environment variable set, filtered down to this single test.

use crate::support::{OutOfSyncTable, RecordingMutator};
use proto_stub::ProtoStub;
use std::process::Command;

const CHILD_ENV: &str = "PROTO_STUB_ABORT_CHILD";
const TEST_NAME: &str = "abort_tests::test_out_of_sync_table_aborts_process";

#[test]
fn test_out_of_sync_table_aborts_process() {
    if std::env::var_os(CHILD_ENV).is_some() {
        // Child: slot 1 is listed but has no dispatch branch.
        let stub = ProtoStub::<OutOfSyncTable, _>::new(RecordingMutator::default());
        let mut buf = [0u8; 8];
        stub.mutate(1, &mut buf, 0, 8, 0);
        return;
    }

    // Arrange
    let exe = std::env::current_exe().expect("test binary path");

    // Act
    let status = Command::new(exe)
        .args([TEST_NAME, "--exact", "--nocapture", "--test-threads=1"])
        .env(CHILD_ENV, "1")
        .status()
        .expect("failed to spawn child test process");

    // Assert
    assert!(!status.success(), "child should terminate abnormally");
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        assert_eq!(status.signal(), Some(6), "child should die from SIGABRT");
    }
}

#[test]
fn test_out_of_sync_table_still_serves_listed_slots() {
    let stub = ProtoStub::<OutOfSyncTable, _>::new(RecordingMutator::default());
    let mut buf = [0u8; 8];

    assert_eq!(stub.mutate(0, &mut buf, 2, 8, 0), 2);
    assert_eq!(stub.get_method(1).to_str().unwrap(), "/shop.Catalog/DeleteItem");
}
