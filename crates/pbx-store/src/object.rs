//! Single named blobs: local, public and private.
//!
//! Writes replace the whole object atomically. Public objects are readable
//! by every OS user; local and private objects only by the owning user.

use pbx_types::{PartyId, Visibility};
use tracing::debug;

use crate::disk;
use crate::error::StoreResult;
use crate::store::Store;

impl Store {
    /// Write `content` to `{root}/{name}` (mode 0600), replacing any
    /// existing object.
    pub fn write_local(&self, name: &str, content: impl AsRef<[u8]>) -> StoreResult<()> {
        let path = self.paths.local(name)?;
        disk::write_replace(&path, content.as_ref(), Visibility::Local.file_mode())?;
        debug!(path = %path.display(), "wrote local object");
        Ok(())
    }

    /// Read `{root}/{name}`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`](crate::StoreError::NotFound) if the object
    /// was never written.
    pub fn read_local(&self, name: &str) -> StoreResult<Vec<u8>> {
        disk::read(&self.paths.local(name)?)
    }

    /// Write a world-readable object for `target`.
    pub fn send_public(&self, target: &PartyId, name: &str, content: impl AsRef<[u8]>) -> StoreResult<()> {
        self.send(Visibility::Public, target, name, content.as_ref())
    }

    /// Read a public object of `target`.
    pub fn get_public(&self, target: &PartyId, name: &str) -> StoreResult<Vec<u8>> {
        self.get(Visibility::Public, target, name)
    }

    /// Write an owner-only object for `target`.
    pub fn send_private(&self, target: &PartyId, name: &str, content: impl AsRef<[u8]>) -> StoreResult<()> {
        self.send(Visibility::Private, target, name, content.as_ref())
    }

    /// Read a private object of `target`.
    pub fn get_private(&self, target: &PartyId, name: &str) -> StoreResult<Vec<u8>> {
        self.get(Visibility::Private, target, name)
    }

    /// [`send_public`](Self::send_public) to this store's own identity.
    pub fn store_public(&self, name: &str, content: impl AsRef<[u8]>) -> StoreResult<()> {
        let me = self.self_id()?;
        self.send(Visibility::Public, me, name, content.as_ref())
    }

    /// [`get_public`](Self::get_public) from this store's own identity.
    pub fn load_public(&self, name: &str) -> StoreResult<Vec<u8>> {
        let me = self.self_id()?;
        self.get(Visibility::Public, me, name)
    }

    /// [`send_private`](Self::send_private) to this store's own identity.
    pub fn store_private(&self, name: &str, content: impl AsRef<[u8]>) -> StoreResult<()> {
        let me = self.self_id()?;
        self.send(Visibility::Private, me, name, content.as_ref())
    }

    /// [`get_private`](Self::get_private) from this store's own identity.
    pub fn load_private(&self, name: &str) -> StoreResult<Vec<u8>> {
        let me = self.self_id()?;
        self.get(Visibility::Private, me, name)
    }

    fn send(&self, visibility: Visibility, target: &PartyId, name: &str, content: &[u8]) -> StoreResult<()> {
        let path = self.paths.object(visibility, target, name)?;
        disk::ensure_dir(&self.paths.owner_dir(visibility, target), visibility.dir_mode())?;
        disk::write_replace(&path, content, visibility.file_mode())?;
        debug!(%visibility, %target, name, "sent object");
        Ok(())
    }

    fn get(&self, visibility: Visibility, target: &PartyId, name: &str) -> StoreResult<Vec<u8>> {
        disk::read(&self.paths.object(visibility, target, name)?)
    }
}
