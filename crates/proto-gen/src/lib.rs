//! Generated Protocol Buffer code for the fuzzing targets.
//!
//! This crate contains the compiled Protocol Buffer definitions whose request
//! messages the stub mutates, plus the descriptor pool their `ReflectMessage`
//! impls resolve against.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)] // Generated code has various doc formatting

use prost_reflect::DescriptorPool;
use std::sync::LazyLock;

// Re-export prost traits for convenience
pub use prost::Message;
pub use prost_reflect::ReflectMessage;

/// Encoded `FileDescriptorSet` for every compiled .proto file
pub const FILE_DESCRIPTOR_SET: &[u8] = include_bytes!("generated/file_descriptor_set.bin");

/// Descriptors for the generated messages
// The set is written by the same protoc run as the generated code, so it
// always decodes.
#[allow(clippy::expect_used)]
pub static DESCRIPTOR_POOL: LazyLock<DescriptorPool> = LazyLock::new(|| {
    DescriptorPool::decode(FILE_DESCRIPTOR_SET).expect("embedded descriptor set is valid")
});

// Generated protobuf modules
pub mod helloworld {
    //! Greeter service messages
    include!("generated/helloworld.rs");
}
