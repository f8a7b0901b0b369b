use std::io;
use std::path::PathBuf;

/// Errors from loading or saving the org registry.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not {op} '{}': {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no config file at '{}'", .path.display())]
    NotFound { path: PathBuf },

    #[error("invalid config '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl ConfigError {
    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { op, path, source }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
