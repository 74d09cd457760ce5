use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("Plugin descriptor not found: {path}")]
    DescriptorNotFound { path: PathBuf },

    #[error("Invalid plugin descriptor at {path}: {reason}")]
    InvalidDescriptor { path: PathBuf, reason: String },

    #[error("Invalid API version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    #[error("No registered loader accepts {path}")]
    NoLoader { path: PathBuf },

    #[error("Failed to load plugin '{plugin}': {message}")]
    LoadFailed { plugin: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml_bw::Error),
}
