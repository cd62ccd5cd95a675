use directories::ProjectDirs;
use std::path::PathBuf;

/// Resolves `fluidvoice/<file>` under the user's config directory, the way
/// the teacher family resolves its own per-platform config path.
pub fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "fluidvoice").map(|dirs| dirs.config_dir().to_path_buf())
}

pub fn config_file_path(file_name: &str) -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(file_name))
}
