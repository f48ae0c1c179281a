//! Flat RPC listing, one entry per method across all services.

use crate::ast::ProtoFile;
use prost_types::FileDescriptorProto;
use serde::{Deserialize, Serialize};

/// One RPC and the request message it takes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcEntry {
    pub service: String,
    pub rpc: String,
    /// Request type as written in the source (or relative to the package for
    /// descriptor input)
    pub request: String,
}

/// List every RPC of every service in declaration order
#[must_use]
pub fn rpcs(file: &ProtoFile) -> Vec<RpcEntry> {
    file.services
        .iter()
        .flat_map(|service| {
            service.rpcs.iter().map(|rpc| RpcEntry {
                service: service.name.clone(),
                rpc: rpc.name.clone(),
                request: rpc.request.clone(),
            })
        })
        .collect()
}

/// Same listing, taken from a compiled descriptor
#[must_use]
pub fn rpcs_in_descriptor(file: &FileDescriptorProto) -> Vec<RpcEntry> {
    let prefix = match file.package() {
        "" => ".".to_string(),
        package => format!(".{package}."),
    };

    file.service
        .iter()
        .flat_map(|service| {
            service.method.iter().map(|method| {
                let input = method.input_type();
                RpcEntry {
                    service: service.name().to_string(),
                    rpc: method.name().to_string(),
                    request: input.strip_prefix(prefix.as_str()).unwrap_or(input).to_string(),
                }
            })
        })
        .collect()
}
