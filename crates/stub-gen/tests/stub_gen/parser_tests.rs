//! Integration tests for `.proto` parsing and RPC listing

use stub_gen::ast::{Constant, FieldType, HttpMethod, Label};
use stub_gen::{parse_proto, rpcs, ParseError, RpcEntry};

const HELLOWORLD: &str = include_str!("../../../../proto/helloworld.proto");
const SHOP: &str = include_str!("../fixtures/shop.proto");

// ============================================================================
// helloworld.proto
// ============================================================================

#[test]
fn test_helloworld_listing_matches_legacy_json() {
    // Arrange
    let file = parse_proto(HELLOWORLD).unwrap();

    // Act
    let listing = rpcs(&file);

    // Assert
    assert_eq!(
        serde_json::to_string(&listing).unwrap(),
        r#"[{"service":"Greeter","rpc":"SayHello","request":"HelloRequest"}]"#
    );
}

#[test]
fn test_helloworld_declarations() {
    let file = parse_proto(HELLOWORLD).unwrap();

    assert_eq!(file.syntax.as_deref(), Some("proto3"));
    assert_eq!(file.package.as_deref(), Some("helloworld"));

    let names: Vec<&str> = file.messages.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, ["HelloRequest", "HelloReply"]);

    let rpc = &file.services[0].rpcs[0];
    assert_eq!(rpc.response, "HelloReply");
    assert!(rpc.http.is_none());
}

// ============================================================================
// HTTP-annotated services, nesting and comments
// ============================================================================

#[test]
fn test_http_rules() {
    let file = parse_proto(SHOP).unwrap();
    let catalog = &file.services[0];

    let rules: Vec<(String, Option<(HttpMethod, String, Option<String>)>)> = catalog
        .rpcs
        .iter()
        .map(|rpc| {
            (
                rpc.name.clone(),
                rpc.http
                    .clone()
                    .map(|h| (h.method, h.endpoint, h.body)),
            )
        })
        .collect();

    assert_eq!(
        rules,
        vec![
            (
                "GetItem".to_string(),
                Some((HttpMethod::Get, "/v1/items/{id}".to_string(), None))
            ),
            (
                "ListItems".to_string(),
                Some((HttpMethod::Get, "/v1/items".to_string(), None))
            ),
            (
                "UpdateItem".to_string(),
                Some((
                    HttpMethod::Patch,
                    "/v1/items/{item.id}".to_string(),
                    Some("item".to_string())
                ))
            ),
            ("DeleteItem".to_string(), None),
        ]
    );
}

#[test]
fn test_listing_spans_every_service() {
    let file = parse_proto(SHOP).unwrap();

    let listing = rpcs(&file);

    assert_eq!(listing.len(), 5);
    assert_eq!(
        listing.last(),
        Some(&RpcEntry {
            service: "Admin".to_string(),
            rpc: "Reindex".to_string(),
            request: "GetItemRequest".to_string(),
        })
    );
}

#[test]
fn test_nested_messages_maps_and_labels() {
    let file = parse_proto(SHOP).unwrap();
    let item = file.messages.iter().find(|m| m.name == "Item").unwrap();

    assert_eq!(item.messages[0].name, "Price");
    assert_eq!(item.messages[0].fields.len(), 3);

    let by_name = |name: &str| item.fields.iter().find(|f| f.name == name).unwrap();
    assert_eq!(by_name("tags").label, Label::Repeated);
    assert_eq!(by_name("thumbnail").label, Label::Optional);
    assert_eq!(
        by_name("regional_prices").ty,
        FieldType::Map {
            key: "string".to_string(),
            value: "Price".to_string()
        }
    );
    // reserved statements do not produce fields
    assert_eq!(item.fields.len(), 7);
}

#[test]
fn test_oneof_members_are_fields() {
    let file = parse_proto(SHOP).unwrap();
    let list = file
        .messages
        .iter()
        .find(|m| m.name == "ListItemsRequest")
        .unwrap();

    assert_eq!(list.oneofs, ["filter"]);
    let oneof_members: Vec<&str> = list
        .fields
        .iter()
        .filter(|f| f.oneof == Some(0))
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(oneof_members, ["tag", "visibility"]);
}

#[test]
fn test_comments_enums_imports_and_options() {
    let file = parse_proto(SHOP).unwrap();

    assert_eq!(file.package.as_deref(), Some("shop.v1"));
    assert_eq!(file.imports, ["google/api/annotations.proto"]);
    assert_eq!(file.options[0].name, "go_package");
    assert_eq!(
        file.options[0].value,
        Constant::Str("example.com/shop/v1;shopv1".to_string())
    );

    let visibility = &file.enums[0];
    assert_eq!(visibility.name, "Visibility");
    let numbers: Vec<i32> = visibility.values.iter().map(|v| v.number).collect();
    assert_eq!(numbers, [0, 1, 2]);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_error_carries_line_number() {
    let source = "syntax = \"proto3\";\n\nservice S {\n  rpc Broken (A) (B);\n}\n";

    let err = parse_proto(source).unwrap_err();

    assert_eq!(err.line(), Some(4));
    assert!(err.to_string().starts_with("line 4:"));
}

#[test]
fn test_unexpected_character() {
    let err = parse_proto("message A { int32 a = 1; }\n@").unwrap_err();
    assert_eq!(err, ParseError::UnexpectedChar { line: 2, ch: '@' });
}
