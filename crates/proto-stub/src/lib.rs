//! Fuzzing entry-point stub for gRPC request messages.
//!
//! The stub maps an integer index onto a fixed table of RPC methods and hands
//! mutation of that method's request message to a structure-aware mutator:
//!
//! - `table`: the `RpcTable` trait and the `ProtoStub` that reduces indices
//!   onto it
//! - `greeter`: the generated table for `helloworld.proto`
//! - `mutator`: the `StructuralMutator` capability and its default,
//!   `ProtoMutator`, which edits `prost_reflect::DynamicMessage`s
//! - `schema` / `values` / `wire`: descriptor binding, field value generation
//!   and field boundaries for salvaging malformed input
//! - `ffi`: `proto_stub_get_method` and `proto_stub_mutate` for C drivers

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod ffi;
pub mod greeter;
pub mod mutator;
pub mod schema;
pub mod table;
pub mod values;
pub mod wire;

pub use greeter::{Greeter, Method};
pub use mutator::{ProtoMutator, StructuralMutator};
pub use schema::ProtoSchema;
pub use table::{ProtoStub, RpcTable};
