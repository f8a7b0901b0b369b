//! Deterministic path layout under a store root.
//!
//! ```text
//! {root}/{name}                                              local objects
//! {root}/public/{id}/{name}                                  public addressed objects
//! {root}/private/{id}/{name}                                 private addressed objects
//! {root}/private/{id}/{incoming|outgoing}/{queue}/{token}    queue entries
//! {root}/private/{id}/{incoming|outgoing}/{queue}/.claimed/  entries taken by pop
//! ```
//!
//! Every caller-supplied component is validated before it is joined, so no
//! resolved path can escape the root.

use std::path::{Path, PathBuf};

use pbx_types::{validate_component, Direction, EntryToken, PartyId, Visibility};

use crate::error::{StoreError, StoreResult};

/// Directory inside a queue that holds entries claimed by a pop.
pub const CLAIMED_DIR: &str = ".claimed";

/// Maps (tier, owner, name, direction) onto filesystem paths.
#[derive(Clone, Debug)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `{root}/{name}`.
    ///
    /// The tier directory names are reserved and cannot be used as local
    /// object names.
    pub fn local(&self, name: &str) -> StoreResult<PathBuf> {
        validate_component(name)?;
        let reserved = [Visibility::Public, Visibility::Private]
            .iter()
            .filter_map(|v| v.tier_dir())
            .any(|dir| dir == name);
        if reserved {
            return Err(StoreError::InvalidName {
                name: name.to_string(),
                reason: "reserved for the public/private tiers".into(),
            });
        }
        Ok(self.root.join(name))
    }

    /// `{root}/{tier}/{owner}`, or the root itself for the local tier.
    pub fn owner_dir(&self, visibility: Visibility, owner: &PartyId) -> PathBuf {
        match visibility.tier_dir() {
            Some(tier) => self.root.join(tier).join(owner.as_str()),
            None => self.root.clone(),
        }
    }

    /// `{root}/{tier}/{owner}/{name}`.
    pub fn object(&self, visibility: Visibility, owner: &PartyId, name: &str) -> StoreResult<PathBuf> {
        if visibility == Visibility::Local {
            return self.local(name);
        }
        validate_component(name)?;
        Ok(self.owner_dir(visibility, owner).join(name))
    }

    /// `{root}/private/{owner}/{direction}/{queue}`.
    pub fn queue_dir(&self, owner: &PartyId, direction: Direction, queue: &str) -> StoreResult<PathBuf> {
        validate_component(queue)?;
        Ok(self
            .owner_dir(Visibility::Private, owner)
            .join(direction.as_str())
            .join(queue))
    }

    /// `{queue_dir}/{token}`.
    pub fn entry(queue_dir: &Path, token: &EntryToken) -> PathBuf {
        queue_dir.join(token.as_str())
    }

    /// `{queue_dir}/.claimed`.
    pub fn claimed_dir(queue_dir: &Path) -> PathBuf {
        queue_dir.join(CLAIMED_DIR)
    }
}
