//! Config file locations.

use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// `config.toml` under the platform config directory, when one exists.
pub(crate) fn user_config_file() -> Option<PathBuf> {
    ProjectDirs::from("org", "Lanyard", "lanyard").map(|dirs| dirs.config_dir().join("config.toml"))
}

pub(crate) fn project_config_file(project_dir: &Path) -> PathBuf {
    project_dir.join("lanyard.toml")
}

/// Gitignored overrides next to the project file.
pub(crate) fn local_config_file(project_dir: &Path) -> PathBuf {
    project_dir.join("lanyard.local.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_user_config_file_names_application() {
        // platform dependent; absent when no home directory is known
        if let Some(config_file) = user_config_file() {
            assert!(config_file.to_string_lossy().contains("lanyard"));
            assert!(config_file.ends_with("config.toml"));
        }
    }

    #[test]
    fn test_project_paths() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        assert_eq!(project_config_file(project_dir), project_dir.join("lanyard.toml"));
        assert_eq!(
            local_config_file(project_dir),
            project_dir.join("lanyard.local.toml")
        );
    }
}
