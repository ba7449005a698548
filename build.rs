fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=proto/gtfs-realtime.proto");

    let protoc_path = protoc_bin_vendored::protoc_bin_path()?;

    unsafe {
        std::env::set_var("PROTOC", protoc_path);
    }

    // Arrivals embed the decoded messages, so they need to serialize as JSON.
    prost_build::Config::new()
        .type_attribute(".transit_realtime", "#[derive(serde::Serialize)]")
        .message_attribute(".transit_realtime", "#[serde(rename_all = \"camelCase\")]")
        .compile_protos(&["proto/gtfs-realtime.proto"], &["proto/"])?;

    Ok(())
}
