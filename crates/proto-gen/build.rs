// Build script to compile Protocol Buffer definitions
//
// The generated module and its descriptor set are checked in under
// src/generated so that building the workspace does not require protoc. Set
// PROTO_GEN_REGENERATE=1 to refresh them after editing a .proto file.

const PROTOS: &[&str] = &["../../proto/helloworld.proto"];
const INCLUDES: &[&str] = &["../../proto/"];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=../../proto/helloworld.proto");
    println!("cargo:rerun-if-env-changed=PROTO_GEN_REGENERATE");

    if std::env::var_os("PROTO_GEN_REGENERATE").is_none() {
        return Ok(());
    }

    // Writes the descriptor set and adds a ReflectMessage derive to every
    // message, bound to crate::DESCRIPTOR_POOL.
    let mut config = prost_build::Config::new();
    prost_reflect_build::Builder::new()
        .descriptor_pool("crate::DESCRIPTOR_POOL")
        .file_descriptor_set_path("src/generated/file_descriptor_set.bin")
        .configure(&mut config, PROTOS, INCLUDES)?;

    // Messages only: the stub never serves or calls the Greeter service.
    tonic_build::configure()
        .build_server(false)
        .build_client(false)
        .out_dir("src/generated")
        .compile_protos_with_config(config, PROTOS, INCLUDES)?;

    Ok(())
}
