use std::fmt;
use std::path::Path;
use std::sync::Arc;

use pbx_types::{PartyId, TokenSource, UuidV7Tokens, Visibility};
use tracing::debug;

use crate::disk;
use crate::error::{StoreError, StoreResult};
use crate::paths::PathResolver;

/// Handle to a mailbox directory tree.
///
/// A `Store` is a root path, an optional self identity, and a token source.
/// None of these change after construction: [`Store::with_identity`] returns
/// a new handle rather than mutating a shared one, so a single store can be
/// cloned and rebound for differently-identified callers. Clones are cheap
/// and safe to share across threads.
#[derive(Clone)]
pub struct Store {
    pub(crate) paths: PathResolver,
    identity: Option<PartyId>,
    pub(crate) tokens: Arc<dyn TokenSource>,
}

impl Store {
    /// Open a store rooted at `base` or, when `sub_name` is non-empty, at
    /// `base/sub_name`.
    ///
    /// The root and any missing parents are created with public directory
    /// permissions (0755).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the root cannot be created.
    pub fn open(base: impl AsRef<Path>, sub_name: Option<&str>) -> StoreResult<Self> {
        let base = base.as_ref();
        let root = match sub_name {
            Some(name) if !name.is_empty() => base.join(name),
            _ => base.to_path_buf(),
        };
        disk::ensure_dir(&root, Visibility::Public.dir_mode())?;
        debug!(root = %root.display(), "opened store");

        Ok(Self {
            paths: PathResolver::new(root),
            identity: None,
            tokens: Arc::new(UuidV7Tokens::new()),
        })
    }

    /// A handle on the same root acting as `identity`.
    pub fn with_identity(&self, identity: PartyId) -> Self {
        Self {
            identity: Some(identity),
            ..self.clone()
        }
    }

    /// A handle on the same root with no self identity.
    pub fn anonymous(&self) -> Self {
        Self {
            identity: None,
            ..self.clone()
        }
    }

    /// Replace the token source used to name queue entries.
    pub fn with_token_source(mut self, tokens: Arc<dyn TokenSource>) -> Self {
        self.tokens = tokens;
        self
    }

    /// The effective root directory.
    pub fn root(&self) -> &Path {
        self.paths.root()
    }

    /// The self identity, if any.
    pub fn identity(&self) -> Option<&PartyId> {
        self.identity.as_ref()
    }

    /// The self identity, or [`StoreError::InvalidState`] when unset.
    pub(crate) fn self_id(&self) -> StoreResult<&PartyId> {
        self.identity
            .as_ref()
            .ok_or(StoreError::InvalidState("store has no self identity"))
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("root", &self.root())
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}
