use std::time::Duration;

/// Game version assumed when the server environment names none.
pub const DEFAULT_GAME_VERSION: &str = "1.20.1";

/// Wall-clock bound for one resolver invocation.
pub const RESOLVER_TIMEOUT: Duration = Duration::from_secs(120);

/// File extension of installable package archives (compared case-insensitively).
pub const ARTIFACT_EXTENSION: &str = "jar";

/// Directory on the remote file store where mods must end up.
pub const DEFAULT_MODS_DIRECTORY: &str = "/mods";

/// Multipart part name the panel's upload endpoint reads files from.
pub const UPLOAD_FORM_FIELD: &str = "files";

/// Prefix of the per-install transient working directory.
pub const WORK_DIR_PREFIX: &str = "craftdeploy-";
