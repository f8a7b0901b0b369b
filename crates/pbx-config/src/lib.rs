//! Organization registry for Postbox.
//!
//! An *org* is a name bound to a base directory under which a Postbox store
//! lives. The registry is a small TOML file, by default
//! `$HOME/.pbx/config.toml`:
//!
//! ```toml
//! [[org]]
//! name = "acme"
//! path = "/srv/postbox/acme"
//! ```

pub mod config;
pub mod error;

pub use config::{Config, Org, CONFIG_ENV};
pub use error::{ConfigError, ConfigResult};
