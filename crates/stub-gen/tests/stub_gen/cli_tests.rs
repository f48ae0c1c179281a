//! End-to-end tests that run the `stub-gen` binary

use std::process::Command;

const HELLOWORLD: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../proto/helloworld.proto");
const SHOP: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/shop.proto");
const EMPTY_IMPORT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/empty_import.proto");

fn stub_gen() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_stub-gen"));
    command.env_remove("RUST_LOG").env("PROTO_STUB_LOG_LEVEL", "warn");
    command
}

#[test]
fn test_list_prints_rpc_json() {
    // Act
    let output = stub_gen().arg(HELLOWORLD).arg("--list").output().unwrap();

    // Assert
    assert!(output.status.success());
    let listing: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        listing,
        serde_json::json!([{"service": "Greeter", "rpc": "SayHello", "request": "HelloRequest"}])
    );
}

#[test]
fn test_list_accepts_imported_types() {
    // Act
    let output = stub_gen().arg(EMPTY_IMPORT).arg("--list").output().unwrap();

    // Assert
    assert!(output.status.success(), "stderr was: {}", String::from_utf8_lossy(&output.stderr));
    let listing: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        listing,
        serde_json::json!([
            {"service": "Health", "rpc": "Check", "request": "CheckRequest"},
            {"service": "Health", "rpc": "Ping", "request": "CheckRequest"},
            {"service": "Admin", "rpc": "Drain", "request": "google.protobuf.Empty"}
        ])
    );
}

#[test]
fn test_imported_request_type_fails_generation() {
    // Act
    let output = stub_gen().arg(EMPTY_IMPORT).output().unwrap();

    // Assert
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("google.protobuf.Empty"), "stderr was: {stderr}");
}

#[test]
fn test_out_writes_generated_stub() {
    // Arrange
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("greeter.rs");

    // Act
    let status = stub_gen()
        .arg(HELLOWORLD)
        .arg("--out")
        .arg(&out)
        .status()
        .unwrap();

    // Assert
    assert!(status.success());
    let generated = std::fs::read_to_string(&out).unwrap();
    assert!(generated.contains("/helloworld.Greeter/SayHello"));
    syn::parse_file(&generated).unwrap();
}

#[test]
fn test_found_rpcs_are_logged_with_http_rule() {
    // Act
    let output = stub_gen()
        .arg(SHOP)
        .env("PROTO_STUB_LOG_LEVEL", "info")
        .output()
        .unwrap();

    // Assert
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("GetItem"), "stderr was: {stderr}");
    assert!(stderr.contains("/v1/items/{id}"), "stderr was: {stderr}");
    assert!(stderr.contains("/v1/items/{item.id}"), "stderr was: {stderr}");
}

#[test]
fn test_parse_error_fails_with_line() {
    // Arrange
    let dir = tempfile::tempdir().unwrap();
    let proto = dir.path().join("broken.proto");
    std::fs::write(&proto, "syntax = \"proto3\";\nmessage {\n").unwrap();

    // Act
    let output = stub_gen().arg(&proto).output().unwrap();

    // Assert
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("line 2"), "stderr was: {stderr}");
}

#[test]
fn test_missing_input_is_a_usage_error() {
    let output = stub_gen().output().unwrap();

    assert!(!output.status.success());
}
