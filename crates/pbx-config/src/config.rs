use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

/// Environment variable that overrides the default config location.
pub const CONFIG_ENV: &str = "PBX_CONFIG";

/// A named store base directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Org {
    pub name: String,
    pub path: PathBuf,
}

/// On-disk shape of the config file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default, rename = "org")]
    orgs: Vec<Org>,
}

/// The org registry together with the file it is persisted to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    path: PathBuf,
    data: ConfigFile,
}

impl Config {
    /// An empty registry bound to `path`. Nothing is read or written.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            data: ConfigFile::default(),
        }
    }

    /// Read the registry at `path`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NotFound`] if the file does not exist,
    /// [`ConfigError::Parse`] if it is not valid TOML of the expected shape.
    pub fn load(path: impl Into<PathBuf>) -> ConfigResult<Self> {
        let path = path.into();
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(ConfigError::NotFound { path }),
            Err(e) => return Err(ConfigError::io("read", path)(e)),
        };
        let data = match toml::from_str(&text) {
            Ok(data) => data,
            Err(source) => return Err(ConfigError::Parse { path, source }),
        };
        debug!(path = %path.display(), "loaded config");
        Ok(Self { path, data })
    }

    /// Like [`Config::load`], but a missing file yields an empty registry.
    pub fn load_or_default(path: impl Into<PathBuf>) -> ConfigResult<Self> {
        let path = path.into();
        match Self::load(path.clone()) {
            Err(ConfigError::NotFound { .. }) => Ok(Self::new(path)),
            other => other,
        }
    }

    /// Write the registry to its path, creating parent directories.
    ///
    /// The file is replaced atomically and left readable only by its owner.
    pub fn save(&self) -> ConfigResult<()> {
        let text = toml::to_string(&self.data)?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(ConfigError::io("create directory", dir))?;

        let mut staged = tempfile::Builder::new()
            .prefix(".config-")
            .tempfile_in(dir)
            .map_err(ConfigError::io("stage a file in", dir))?;
        let staged_path = staged.path().to_path_buf();
        staged
            .write_all(text.as_bytes())
            .and_then(|()| staged.flush())
            .map_err(ConfigError::io("write", staged_path))?;
        restrict_to_owner(staged.as_file()).map_err(ConfigError::io("set permissions on", &self.path))?;
        staged
            .persist(&self.path)
            .map_err(|e| ConfigError::io("write", &self.path)(e.error))?;

        debug!(path = %self.path.display(), orgs = self.data.orgs.len(), "saved config");
        Ok(())
    }

    /// Register `name` at `path`, replacing any org already using that name.
    pub fn add_org(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) {
        let org = Org {
            name: name.into(),
            path: path.into(),
        };
        match self.data.orgs.iter_mut().find(|o| o.name == org.name) {
            Some(existing) => *existing = org,
            None => self.data.orgs.push(org),
        }
    }

    /// Forget `name`. Returns whether it was registered.
    pub fn remove_org(&mut self, name: &str) -> bool {
        let before = self.data.orgs.len();
        self.data.orgs.retain(|o| o.name != name);
        self.data.orgs.len() != before
    }

    pub fn org(&self, name: &str) -> Option<&Org> {
        self.data.orgs.iter().find(|o| o.name == name)
    }

    /// Registered orgs in insertion order.
    pub fn orgs(&self) -> &[Org] {
        &self.data.orgs
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `$PBX_CONFIG`, else `$HOME/.pbx/config.toml`. `None` when neither
    /// variable is set.
    pub fn default_path() -> Option<PathBuf> {
        resolve_default_path(std::env::var_os(CONFIG_ENV), std::env::var_os("HOME"))
    }
}

fn resolve_default_path(explicit: Option<OsString>, home: Option<OsString>) -> Option<PathBuf> {
    match explicit {
        Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
        _ => home
            .filter(|h| !h.is_empty())
            .map(|h| PathBuf::from(h).join(".pbx").join("config.toml")),
    }
}

#[cfg(unix)]
fn restrict_to_owner(file: &fs::File) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_to_owner(_file: &fs::File) -> io::Result<()> {
    Ok(())
}
