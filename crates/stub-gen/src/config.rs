//! Command-line configuration.

use clap::Parser;
use common::config::ObservabilityConfig;
use std::path::PathBuf;

/// Generate a fuzzing stub from a `.proto` file
#[derive(Debug, Clone, Parser)]
#[command(name = "stub-gen", version, about)]
pub struct Args {
    /// `.proto` source to read; optional with `--descriptor-set`
    #[arg(required_unless_present = "descriptor_set")]
    pub proto: Option<PathBuf>,

    /// Write the generated stub here instead of stdout
    #[arg(short, long, env = "STUB_GEN_OUT")]
    pub out: Option<PathBuf>,

    /// Print the RPC listing as JSON and exit
    #[arg(long)]
    pub list: bool,

    /// Rust path of the prost message module [default: proto_gen::<package>]
    #[arg(long, env = "STUB_GEN_MESSAGES_MODULE")]
    pub messages_module: Option<String>,

    /// Path of the proto-stub crate as seen from the generated module
    #[arg(long, default_value = "crate")]
    pub crate_path: String,

    /// Name of the generated table type [default: first service name]
    #[arg(long)]
    pub table_name: Option<String>,

    /// Also compile prost message types into this directory (needs protoc)
    #[arg(long, value_name = "DIR")]
    pub compile_messages: Option<PathBuf>,

    /// Read a protoc `FileDescriptorSet` instead of parsing `.proto` source
    #[arg(long, value_name = "FILE")]
    pub descriptor_set: Option<PathBuf>,

    /// Log filter used when `RUST_LOG` is unset
    #[arg(long, env = "PROTO_STUB_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long, env = "PROTO_STUB_JSON_LOGS")]
    pub json_logs: bool,
}

impl Args {
    /// Logging settings carried by the arguments
    #[must_use]
    pub fn observability(&self) -> ObservabilityConfig {
        ObservabilityConfig {
            log_level: self.log_level.clone(),
            json_logs: self.json_logs,
        }
    }
}
