//! Configuration loader with multi-source merging

use crate::paths;
use crate::{ConfigError, LanyardConfig};
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration loader with builder pattern
pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
    include_user_config: bool,
}

impl ConfigLoader {
    /// Create a new config loader with default project directory (current dir)
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "LANYARD".to_string(),
            include_user_config: true,
        }
    }

    /// Set the project directory
    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the environment variable prefix (default: "LANYARD")
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Skip ~/.config/lanyard/config.toml
    pub fn without_user_config(mut self) -> Self {
        self.include_user_config = false;
        self
    }

    /// Config files in ascending precedence: user, project, local.
    fn files(&self) -> Vec<PathBuf> {
        let user = self
            .include_user_config
            .then(paths::user_config_file)
            .flatten();
        user.into_iter()
            .chain([
                paths::project_config_file(&self.project_dir),
                paths::local_config_file(&self.project_dir),
            ])
            .collect()
    }

    /// Merges defaults, the config files and `<prefix>_*` environment
    /// variables, later sources overriding earlier ones.
    pub fn load(self) -> Result<LanyardConfig, ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&LanyardConfig::default())?);

        for file in self.files() {
            if !file.exists() {
                continue;
            }
            debug!(path = %file.display(), "loading config file");
            builder = builder.add_source(
                config::File::from(file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // LANYARD_LOGGING__LEVEL=debug
        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        Ok(builder.build()?.try_deserialize()?)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
