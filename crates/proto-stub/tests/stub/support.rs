//! Shared fixtures: a fake mutator and a small two-method table.

use prost_reflect::DescriptorPool;
use prost_types::FileDescriptorSet;
use proto_stub::{ProtoSchema, RpcTable, StructuralMutator};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::ffi::CStr;
use std::sync::LazyLock;

// ============================================================================
// Recording mutator
// ============================================================================

/// One observed call to `RecordingMutator::mutate`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub message: String,
    pub message_was_empty: bool,
    pub assume_valid: bool,
    pub size: usize,
    pub max_size: usize,
    pub seed: u32,
}

/// Records every request and echoes the input back unchanged
#[derive(Debug, Default)]
pub struct RecordingMutator {
    pub calls: RefCell<Vec<Call>>,
}

impl StructuralMutator for RecordingMutator {
    fn mutate<M: ProtoSchema>(
        &self,
        message: &mut M,
        assume_valid: bool,
        _data: &mut [u8],
        size: usize,
        max_size: usize,
        seed: u32,
    ) -> usize {
        self.calls.borrow_mut().push(Call {
            message: M::message_descriptor().full_name().to_string(),
            message_was_empty: message.encoded_len() == 0,
            assume_valid,
            size,
            max_size,
            seed,
        });
        size.min(max_size)
    }
}

// ============================================================================
// Catalog: a two-method table with richer request types
// ============================================================================

const SHOP_PROTO: &str = r#"
    syntax = "proto3";
    package shop;

    enum Visibility {
      VISIBILITY_UNSPECIFIED = 0;
      VISIBILITY_PUBLIC = 1;
      VISIBILITY_HIDDEN = 2;
    }

    message Filter {
      string key = 1;
      repeated string values = 2;
      Filter and_then = 3;
    }

    message GetItemRequest {
      uint64 id = 1;
      bytes etag = 2;
    }

    message ListItemsRequest {
      uint32 page_size = 1;
      string page_token = 2;
      repeated Filter filters = 3;
      Visibility visibility = 4;
      repeated sfixed64 ids = 5;
      float min_score = 6;
      map<string, string> labels = 7;
      oneof order {
        string order_by = 8;
        bool newest_first = 9;
      }
    }
"#;

/// Descriptors for the Catalog request types, built from `SHOP_PROTO`
pub static POOL: LazyLock<DescriptorPool> = LazyLock::new(|| {
    let file = stub_gen::parse_proto(SHOP_PROTO).unwrap();
    let descriptor = stub_gen::to_descriptor(&file, "shop.proto").unwrap();
    DescriptorPool::from_file_descriptor_set(FileDescriptorSet {
        file: vec![descriptor],
    })
    .unwrap()
});

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum Visibility {
    Unspecified = 0,
    Public = 1,
    Hidden = 2,
}

#[derive(Clone, PartialEq, prost::Message, prost_reflect::ReflectMessage)]
#[prost_reflect(descriptor_pool = "crate::support::POOL", message_name = "shop.Filter")]
pub struct Filter {
    #[prost(string, tag = "1")]
    pub key: String,
    #[prost(string, repeated, tag = "2")]
    pub values: Vec<String>,
    #[prost(message, optional, boxed, tag = "3")]
    pub and_then: Option<Box<Filter>>,
}

#[derive(Clone, PartialEq, prost::Message, prost_reflect::ReflectMessage)]
#[prost_reflect(descriptor_pool = "crate::support::POOL", message_name = "shop.GetItemRequest")]
pub struct GetItemRequest {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(bytes = "vec", tag = "2")]
    pub etag: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message, prost_reflect::ReflectMessage)]
#[prost_reflect(descriptor_pool = "crate::support::POOL", message_name = "shop.ListItemsRequest")]
pub struct ListItemsRequest {
    #[prost(uint32, tag = "1")]
    pub page_size: u32,
    #[prost(string, tag = "2")]
    pub page_token: String,
    #[prost(message, repeated, tag = "3")]
    pub filters: Vec<Filter>,
    #[prost(enumeration = "Visibility", tag = "4")]
    pub visibility: i32,
    #[prost(sfixed64, repeated, tag = "5")]
    pub ids: Vec<i64>,
    #[prost(float, tag = "6")]
    pub min_score: f32,
    #[prost(btree_map = "string, string", tag = "7")]
    pub labels: BTreeMap<String, String>,
    #[prost(oneof = "Order", tags = "8, 9")]
    pub order: Option<Order>,
}

#[derive(Clone, PartialEq, prost::Oneof)]
pub enum Order {
    #[prost(string, tag = "8")]
    OrderBy(String),
    #[prost(bool, tag = "9")]
    NewestFirst(bool),
}

/// `/shop.Catalog/GetItem` then `/shop.Catalog/ListItems`
pub struct Catalog;

impl RpcTable for Catalog {
    const METHODS: &'static [&'static CStr] =
        &[c"/shop.Catalog/GetItem", c"/shop.Catalog/ListItems"];

    fn dispatch<S: StructuralMutator>(
        slot: usize,
        mutator: &S,
        data: &mut [u8],
        size: usize,
        max_size: usize,
        seed: u32,
    ) -> Option<usize> {
        match slot {
            0 => Some(mutator.mutate(
                &mut GetItemRequest::default(),
                true,
                data,
                size,
                max_size,
                seed,
            )),
            1 => Some(mutator.mutate(
                &mut ListItemsRequest::default(),
                true,
                data,
                size,
                max_size,
                seed,
            )),
            _ => None,
        }
    }
}

/// Lists two methods but only dispatches the first
pub struct OutOfSyncTable;

impl RpcTable for OutOfSyncTable {
    const METHODS: &'static [&'static CStr] =
        &[c"/shop.Catalog/GetItem", c"/shop.Catalog/DeleteItem"];

    fn dispatch<S: StructuralMutator>(
        slot: usize,
        mutator: &S,
        data: &mut [u8],
        size: usize,
        max_size: usize,
        seed: u32,
    ) -> Option<usize> {
        (slot == 0).then(|| {
            mutator.mutate(
                &mut GetItemRequest::default(),
                true,
                data,
                size,
                max_size,
                seed,
            )
        })
    }
}
