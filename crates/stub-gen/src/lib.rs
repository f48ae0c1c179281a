//! `.proto` parsing and stub generation.
//!
//! Pipeline: `parse_proto` -> `to_descriptor` -> `generate_stub`. A compiled
//! `FileDescriptorSet` from protoc can enter the pipeline at the descriptor
//! stage instead.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod ast;
pub mod codegen;
pub mod config;
pub mod descriptor;
pub mod listing;
pub mod parser;

pub use codegen::{generate_stub, GenerateError, StubOptions};
pub use descriptor::{to_descriptor, DescriptorError};
pub use listing::{rpcs, RpcEntry};
pub use parser::{parse_proto, ParseError};

use prost::Message;
use prost_types::{FileDescriptorProto, FileDescriptorSet};
use std::path::Path;

/// Pick a file out of a protoc `FileDescriptorSet`.
///
/// With `name`, the file whose name ends with it; otherwise the last file,
/// which protoc emits after its dependencies.
///
/// # Errors
///
/// Returns a decode error for malformed input, or `InvalidData` when no file
/// matches.
pub fn descriptor_from_set(bytes: &[u8], name: Option<&str>) -> std::io::Result<FileDescriptorProto> {
    let set = FileDescriptorSet::decode(bytes)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    let file = match name {
        Some(name) => set.file.into_iter().find(|f| f.name().ends_with(name)),
        None => set.file.into_iter().last(),
    };
    file.ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("descriptor set has no file matching {name:?}"),
        )
    })
}

/// Compile prost message types for `proto` into `out_dir` (no gRPC code).
///
/// Every message derives `ReflectMessage` against `crate::DESCRIPTOR_POOL`,
/// and the matching descriptor set is written next to the generated module
/// as `file_descriptor_set.bin` for the caller to load into that pool.
///
/// # Errors
///
/// Returns the I/O error from `prost-reflect-build` or `tonic-build`,
/// including a missing `protoc`.
pub fn compile_messages(proto: &Path, out_dir: &Path) -> std::io::Result<()> {
    let include = proto
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(out_dir)?;

    let mut config = prost_build::Config::new();
    prost_reflect_build::Builder::new()
        .descriptor_pool("crate::DESCRIPTOR_POOL")
        .file_descriptor_set_path(out_dir.join("file_descriptor_set.bin"))
        .configure(&mut config, &[proto], &[include])?;

    tonic_build::configure()
        .build_server(false)
        .build_client(false)
        .out_dir(out_dir)
        .compile_protos_with_config(config, &[proto], &[include])
}
