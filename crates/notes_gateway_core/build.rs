fn main() {
    // Vendored protoc keeps the build independent of a system installation.
    let protoc = protoc_bin_vendored::protoc_bin_path().expect("vendored protoc not found");
    std::env::set_var("PROTOC", protoc);

    println!("cargo:rerun-if-changed=proto/notes.proto");
    tonic_build::configure()
        .build_server(false)
        .compile_protos(&["proto/notes.proto"], &["proto/"])
        .expect("failed to compile proto/notes.proto");
}
