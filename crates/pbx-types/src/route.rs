use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Which side of a party's mailbox a queue belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Messages addressed to the owner.
    Incoming,
    /// Messages deposited by the owner for a relay to collect.
    Outgoing,
}

impl Direction {
    /// Directory name used on disk.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Incoming => "incoming",
            Self::Outgoing => "outgoing",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "incoming" => Ok(Self::Incoming),
            "outgoing" => Ok(Self::Outgoing),
            other => Err(TypeError::UnknownDirection(other.to_string())),
        }
    }
}

/// Storage tier of an object, which fixes both its location and its
/// permission bits.
///
/// | Tier      | Location                     | Dir mode | File mode |
/// |-----------|------------------------------|----------|-----------|
/// | `Local`   | `{root}/{name}`              | 0755     | 0600      |
/// | `Public`  | `{root}/public/{id}/{name}`  | 0755     | 0644      |
/// | `Private` | `{root}/private/{id}/{name}` | 0700     | 0600      |
///
/// Queue storage always uses the private tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Local,
    Public,
    Private,
}

impl Visibility {
    pub const PUBLIC_DIR_MODE: u32 = 0o755;
    pub const PUBLIC_FILE_MODE: u32 = 0o644;
    pub const PRIVATE_DIR_MODE: u32 = 0o700;
    pub const PRIVATE_FILE_MODE: u32 = 0o600;

    /// Subdirectory of the root that partitions this tier by owner, if any.
    pub const fn tier_dir(self) -> Option<&'static str> {
        match self {
            Self::Local => None,
            Self::Public => Some("public"),
            Self::Private => Some("private"),
        }
    }

    /// Permission bits for directories created in this tier.
    pub const fn dir_mode(self) -> u32 {
        match self {
            Self::Local | Self::Public => Self::PUBLIC_DIR_MODE,
            Self::Private => Self::PRIVATE_DIR_MODE,
        }
    }

    /// Permission bits for files written in this tier.
    pub const fn file_mode(self) -> u32 {
        match self {
            Self::Public => Self::PUBLIC_FILE_MODE,
            Self::Local | Self::Private => Self::PRIVATE_FILE_MODE,
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Public => f.write_str("public"),
            Self::Private => f.write_str("private"),
        }
    }
}
