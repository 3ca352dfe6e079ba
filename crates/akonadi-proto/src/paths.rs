use std::{env, path::PathBuf};

const SOCKET_FILE: &str = "akonadiserver.socket";

/// Resolves the server socket path from environment and platform defaults.
pub fn default_socket_path() -> PathBuf {
    if let Some(override_path) = env::var_os("AKONADI_SOCKET") {
        return PathBuf::from(override_path);
    }

    if let Some(runtime_dir) = env::var_os("XDG_RUNTIME_DIR") {
        return PathBuf::from(runtime_dir).join("akonadi").join(SOCKET_FILE);
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home)
            .join(".local/share/akonadi")
            .join(SOCKET_FILE);
    }

    PathBuf::from(SOCKET_FILE)
}
