fn main() {
    println!("Run `cargo test -p panel-compat` to execute panel compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use craftdeploy_installer::detect_server_config;
    use craftdeploy_protocol::Loader;
    use craftdeploy_protocol::panel::{
        CreateFolderRequest, DeleteRequest, FileObject, ListResponse, RenameRequest, ServerDetails,
        SignedUrl,
    };

    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    fn load_fixture(name: &str) -> serde_json::Value {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    fn parse<T: serde::de::DeserializeOwned>(name: &str) -> T {
        serde_json::from_value(load_fixture(name))
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"))
    }

    /// Request bodies must serialize to exactly what the panel expects.
    fn request_roundtrip<T>(name: &str)
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));
        assert_eq!(
            fixture, reserialized,
            "roundtrip mismatch for {name}:\n  panel: {fixture}\n  ours:  {reserialized}"
        );
    }

    // --- Responses ---

    #[test]
    fn fixture_files_list() {
        let list: ListResponse<FileObject> = parse("files_list.json");
        assert_eq!(list.data.len(), 2);

        let jar = &list.data[0].attributes;
        assert_eq!(jar.name, "sodium-fabric-mc1.20.1-0.5.4.jar");
        assert!(jar.is_file);
        assert_eq!(jar.size, 917504);
        assert_eq!(jar.modified_at.as_deref(), Some("2024-03-02T18:11:05+00:00"));

        let dir = &list.data[1].attributes;
        assert_eq!(dir.name, "config");
        assert!(!dir.is_file);
    }

    #[test]
    fn fixture_upload_url() {
        let signed: SignedUrl = parse("upload_url.json");
        assert!(
            signed
                .attributes
                .url
                .starts_with("https://node1.example.com:8080/upload/file?token=")
        );
    }

    #[test]
    fn fixture_server_details() {
        let details: ServerDetails = parse("server_details.json");
        assert_eq!(details.attributes.identifier.as_deref(), Some("1a7ce997"));

        let ctx = details.context();
        assert_eq!(ctx.environment["SERVER_MEMORY"], "4096");
        assert_eq!(ctx.environment["EULA"], "true");
        assert_eq!(ctx.environment["STARTUP"], "");
        assert!(ctx.mod_loader.is_none());
        assert!(ctx.version.is_none());

        let config = detect_server_config(&ctx);
        assert_eq!(config.loader, Loader::Fabric);
        assert_eq!(config.game_version, "1.20.1");
    }

    #[test]
    fn fixture_server_details_predetected() {
        let details: ServerDetails = parse("server_details_predetected.json");
        let ctx = details.context();
        assert_eq!(ctx.mod_loader, Some(Loader::NeoForge));
        assert_eq!(ctx.version.as_deref(), Some("1.21.1"));

        let config = detect_server_config(&ctx);
        assert_eq!(config.loader, Loader::NeoForge);
        assert_eq!(config.game_version, "1.21.1");
    }

    // --- Requests ---

    #[test]
    fn fixture_rename_request() {
        request_roundtrip::<RenameRequest>("rename_request.json");
    }

    #[test]
    fn fixture_delete_request() {
        request_roundtrip::<DeleteRequest>("delete_request.json");
    }

    #[test]
    fn fixture_create_folder_request() {
        request_roundtrip::<CreateFolderRequest>("create_folder_request.json");
    }
}
