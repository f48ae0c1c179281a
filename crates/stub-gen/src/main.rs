use anyhow::{Context, Result};
use clap::Parser;
use common::observability::init_tracing;
use prost_types::FileDescriptorProto;
use std::path::Path;
use stub_gen::ast::ProtoFile;
use stub_gen::config::Args;
use stub_gen::listing::{rpcs, rpcs_in_descriptor};
use stub_gen::{
    compile_messages, descriptor_from_set, generate_stub, parse_proto, to_descriptor, RpcEntry,
    StubOptions,
};
use tracing::{error, info};

fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(&args.observability()).context("Failed to initialize tracing")?;

    run(&args).map_err(|e| {
        error!("stub-gen failed: {:#}", e);
        e
    })
}

fn run(args: &Args) -> Result<()> {
    let descriptor = match &args.descriptor_set {
        Some(set_path) => {
            let descriptor = load_descriptor_set(set_path, args.proto.as_deref())?;
            let listing = rpcs_in_descriptor(&descriptor);
            if args.list {
                return print_listing(&listing);
            }
            for entry in &listing {
                info!(service = %entry.service, rpc = %entry.rpc, request = %entry.request, "Found RPC");
            }
            descriptor
        }
        None => {
            let proto = args
                .proto
                .as_ref()
                .context("A .proto file is required without --descriptor-set")?;
            let file = parse_file(proto)?;

            // Listing needs no type resolution, so imported types are fine here
            if args.list {
                return print_listing(&rpcs(&file));
            }
            for service in &file.services {
                for rpc in &service.rpcs {
                    let http = rpc.http.as_ref();
                    info!(
                        service = %service.name,
                        rpc = %rpc.name,
                        request = %rpc.request,
                        http_method = http.map(|rule| rule.method.as_str()),
                        http_endpoint = http.map(|rule| rule.endpoint.as_str()),
                        "Found RPC"
                    );
                }
            }

            let file_name = proto
                .file_name()
                .map_or_else(|| proto.display().to_string(), |n| n.to_string_lossy().into_owned());
            to_descriptor(&file, &file_name)
                .with_context(|| format!("Failed to resolve types in {}", proto.display()))?
        }
    };

    if let (Some(dir), Some(proto)) = (&args.compile_messages, &args.proto) {
        info!(out_dir = %dir.display(), "Compiling message types");
        compile_messages(proto, dir)
            .with_context(|| format!("Failed to compile messages for {}", proto.display()))?;
    }

    let options = StubOptions {
        messages_module: args.messages_module.clone(),
        crate_path: args.crate_path.clone(),
        table_name: args.table_name.clone(),
        source: args
            .proto
            .as_ref()
            .or(args.descriptor_set.as_ref())
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
    };
    let stub = generate_stub(&descriptor, &options).context("Failed to generate stub")?;

    match &args.out {
        Some(out) => {
            std::fs::write(out, stub)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            let methods: usize = descriptor.service.iter().map(|s| s.method.len()).sum();
            info!(out = %out.display(), methods, "Stub written");
        }
        None => print!("{stub}"),
    }

    Ok(())
}

fn print_listing(listing: &[RpcEntry]) -> Result<()> {
    println!("{}", serde_json::to_string(listing)?);
    Ok(())
}

/// Pick the file to generate for out of a protoc descriptor set
fn load_descriptor_set(set_path: &Path, proto: Option<&Path>) -> Result<FileDescriptorProto> {
    let bytes = std::fs::read(set_path)
        .with_context(|| format!("Failed to read {}", set_path.display()))?;
    let wanted = proto.and_then(Path::file_name).and_then(|n| n.to_str());
    descriptor_from_set(&bytes, wanted)
        .with_context(|| format!("Invalid descriptor set {}", set_path.display()))
}

fn parse_file(proto: &Path) -> Result<ProtoFile> {
    let source = std::fs::read_to_string(proto)
        .with_context(|| format!("Failed to read {}", proto.display()))?;
    parse_proto(&source).with_context(|| format!("Failed to parse {}", proto.display()))
}
