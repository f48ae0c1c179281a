//! Integration tests for descriptor conversion and stub generation

use prost::Message;
use prost_types::FileDescriptorSet;
use stub_gen::{
    descriptor_from_set, generate_stub, parse_proto, to_descriptor, GenerateError, StubOptions,
};

const HELLOWORLD: &str = include_str!("../../../../proto/helloworld.proto");
const SHOP: &str = include_str!("../fixtures/shop.proto");
const NO_PACKAGE: &str = include_str!("../fixtures/nopackage.proto");
const EMPTY_IMPORT: &str = include_str!("../fixtures/empty_import.proto");
const CHECKED_IN_GREETER: &str = include_str!("../../../proto-stub/src/greeter.rs");

fn generate(source: &str, file_name: &str, options: &StubOptions) -> String {
    let file = parse_proto(source).unwrap();
    let descriptor = to_descriptor(&file, file_name).unwrap();
    generate_stub(&descriptor, options).unwrap()
}

/// Reformat through syn so comparisons ignore layout and plain comments
fn normalized(source: &str) -> String {
    prettyplease::unparse(&syn::parse_file(source).unwrap())
}

// ============================================================================
// helloworld.proto
// ============================================================================

#[test]
fn test_checked_in_greeter_is_up_to_date() {
    // Arrange
    let options = StubOptions {
        source: "proto/helloworld.proto".to_string(),
        ..StubOptions::default()
    };

    // Act
    let generated = generate(HELLOWORLD, "helloworld.proto", &options);

    // Assert
    assert!(generated.starts_with("// @generated by stub-gen from proto/helloworld.proto."));
    assert_eq!(
        normalized(&generated),
        normalized(CHECKED_IN_GREETER),
        "crates/proto-stub/src/greeter.rs is stale; regenerate it with stub-gen"
    );
}

#[test]
fn test_helloworld_output_shape() {
    let generated = generate(HELLOWORLD, "helloworld.proto", &StubOptions::default());

    let file = syn::parse_file(&generated).unwrap();
    assert!(!file.items.is_empty());
    assert!(generated.contains(r#""/helloworld.Greeter/SayHello""#));
    assert!(generated.contains(r#"c"/helloworld.Greeter/SayHello""#));
    assert!(generated.contains("SayHello,"));
    assert!(generated.contains("proto_gen::helloworld::HelloRequest::default()"));
    assert!(generated.contains("impl RpcTable for Greeter"));
    // Message reflection comes from the prost-reflect derive, not the stub
    assert!(!generated.contains("ProtoSchema"));
    assert!(!generated.contains("proto_gen::helloworld::HelloReply"));
}

// ============================================================================
// Richer files
// ============================================================================

#[test]
fn test_shop_output_covers_every_rpc_and_reachable_message() {
    let options = StubOptions {
        messages_module: Some("crate::shop".to_string()),
        crate_path: "proto_stub".to_string(),
        table_name: Some("ShopTable".to_string()),
        source: "shop.proto".to_string(),
    };

    let generated = generate(SHOP, "shop.proto", &options);

    syn::parse_file(&generated).unwrap();
    for path in [
        "/shop.v1.Catalog/GetItem",
        "/shop.v1.Catalog/ListItems",
        "/shop.v1.Catalog/UpdateItem",
        "/shop.v1.Catalog/DeleteItem",
        "/shop.v1.Admin/Reindex",
    ] {
        assert!(generated.contains(path), "missing {path}");
    }
    assert!(generated.contains("use proto_stub::table::RpcTable;"));
    assert!(generated.contains("pub struct ShopTable;"));
    assert!(generated.contains("crate::shop::UpdateItemRequest::default()"));
    assert!(generated.contains("crate::shop::GetItemRequest::default()"));
    assert!(generated.contains("crate::shop::ListItemsRequest::default()"));
    assert!(!generated.contains("MessageSchema"));
    // Response types never reach the generated dispatch
    assert!(!generated.contains("crate::shop::ListItemsResponse"));
}

#[test]
fn test_missing_package_uses_file_stem() {
    let generated = generate(NO_PACKAGE, "nopackage.proto", &StubOptions::default());

    assert!(generated.contains(r#""/nopackage.Health/Check""#));
    assert!(generated.contains("proto_gen::nopackage::Ping::default()"));
}

#[test]
fn test_duplicate_rpc_names_are_prefixed_with_service() {
    let source = "syntax = \"proto3\"; message R {}
        service A { rpc Get (R) returns (R); }
        service B { rpc Get (R) returns (R); }";

    let generated = generate(source, "dup.proto", &StubOptions::default());

    assert!(generated.contains("AGet,"));
    assert!(generated.contains("BGet,"));
}

#[test]
fn test_file_without_rpcs_is_rejected() {
    let descriptor = to_descriptor(&parse_proto("message Only {}").unwrap(), "only.proto").unwrap();

    let result = generate_stub(&descriptor, &StubOptions::default());

    assert!(matches!(result, Err(GenerateError::NoRpcs)));
}

#[test]
fn test_invalid_table_name_is_rejected() {
    let descriptor = to_descriptor(&parse_proto(HELLOWORLD).unwrap(), "helloworld.proto").unwrap();
    let options = StubOptions {
        table_name: Some("not a name".to_string()),
        ..StubOptions::default()
    };

    let result = generate_stub(&descriptor, &options);

    assert!(matches!(result, Err(GenerateError::InvalidIdentifier(_))));
}

#[test]
fn test_imported_response_types_are_allowed() {
    // Arrange: only the Health service, whose requests are local
    let source = EMPTY_IMPORT.replace(
        "service Admin {\n  rpc Drain (google.protobuf.Empty) returns (CheckResponse);\n}",
        "",
    );

    // Act
    let generated = generate(&source, "empty_import.proto", &StubOptions::default());

    // Assert
    syn::parse_file(&generated).unwrap();
    assert!(generated.contains(r#""/health.v1.Health/Ping""#));
    assert!(!generated.contains("Empty"));
}

#[test]
fn test_imported_request_type_is_foreign() {
    let file = parse_proto(EMPTY_IMPORT).unwrap();
    let descriptor = to_descriptor(&file, "empty_import.proto").unwrap();

    let result = generate_stub(&descriptor, &StubOptions::default());

    assert!(matches!(
        result,
        Err(GenerateError::ForeignType { ref type_name, .. }) if type_name == ".google.protobuf.Empty"
    ));
}

#[test]
fn test_keyword_message_names_are_escaped() {
    let source = "syntax = \"proto3\"; package game;
        message Match { message Arm { uint32 id = 1; } }
        service Arena { rpc Pick (Match.Arm) returns (Match); }";

    let generated = generate(source, "game.proto", &StubOptions::default());

    syn::parse_file(&generated).unwrap();
    assert!(generated.contains("proto_gen::game::r#match::Arm::default()"), "{generated}");
}

// ============================================================================
// Descriptor-set input
// ============================================================================

#[test]
fn test_descriptor_set_round_trip() {
    // Arrange: a set holding two files, as protoc emits with dependencies
    let hello = to_descriptor(&parse_proto(HELLOWORLD).unwrap(), "helloworld.proto").unwrap();
    let shop = to_descriptor(&parse_proto(SHOP).unwrap(), "shop/v1/shop.proto").unwrap();
    let bytes = FileDescriptorSet {
        file: vec![hello.clone(), shop.clone()],
    }
    .encode_to_vec();

    // Act
    let by_name = descriptor_from_set(&bytes, Some("helloworld.proto")).unwrap();
    let last = descriptor_from_set(&bytes, None).unwrap();

    // Assert
    assert_eq!(by_name, hello);
    assert_eq!(last, shop);
    assert!(descriptor_from_set(&bytes, Some("missing.proto")).is_err());
    assert!(descriptor_from_set(&[0xff, 0xff], None).is_err());
}
