//! Directed pop-once queues on the private tier.
//!
//! A queue is a directory of entry files named by time-ordered tokens.
//! Pushing stages the payload in a hidden file and links it under a fresh
//! token without overwriting anything. Popping sorts the visible entry names
//! explicitly, then claims the earliest by renaming it into the hidden
//! `.claimed/` directory before reading it. Rename is atomic, so when two
//! pops race for one entry only one of them gets it; the other moves on to
//! the next entry or reports [`StoreError::ClaimLost`].
//!
//! Delivery is at-most-once. If the claimed file cannot be read it is
//! renamed back into the queue. If it is read but cannot be removed, the
//! error is returned and the file stays in `.claimed/`, where neither pop nor
//! size will see it again.

use std::fs;
use std::io;
use std::path::Path;

use pbx_types::{Direction, EntryToken, PartyId, Visibility};
use tracing::{debug, warn};

use crate::disk;
use crate::error::{StoreError, StoreResult};
use crate::paths::PathResolver;
use crate::store::Store;

impl Store {
    /// Append `content` to `owner`'s `direction`/`queue` and return the
    /// token naming the new entry.
    pub fn push(
        &self,
        owner: &PartyId,
        direction: Direction,
        queue: &str,
        content: impl AsRef<[u8]>,
    ) -> StoreResult<EntryToken> {
        let dir = self.paths.queue_dir(owner, direction, queue)?;
        let token = self.tokens.next_token();

        disk::ensure_dir(&dir, Visibility::Private.dir_mode())?;
        let path = PathResolver::entry(&dir, &token);
        disk::write_new(&path, content.as_ref(), Visibility::Private.file_mode())?;

        debug!(%owner, %direction, queue, %token, "pushed entry");
        Ok(token)
    }

    /// Deposit a message in `target`'s incoming queue.
    pub fn push_incoming(&self, target: &PartyId, queue: &str, content: impl AsRef<[u8]>) -> StoreResult<EntryToken> {
        self.push(target, Direction::Incoming, queue, content)
    }

    /// Deposit a message in this store's own outgoing queue.
    pub fn push_outgoing(&self, queue: &str, content: impl AsRef<[u8]>) -> StoreResult<EntryToken> {
        let me = self.self_id()?;
        self.push(me, Direction::Outgoing, queue, content)
    }

    /// Remove and return the earliest entry of `owner`'s `direction`/`queue`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::EmptyQueue`] if the queue has no entries.
    /// - [`StoreError::ClaimLost`] if concurrent pops claimed every entry
    ///   that was listed.
    /// - [`StoreError::Io`] if listing, claiming, reading or removing fails.
    pub fn pop(&self, owner: &PartyId, direction: Direction, queue: &str) -> StoreResult<Vec<u8>> {
        let dir = self.paths.queue_dir(owner, direction, queue)?;
        let pending = list_entries(&dir)?;
        if pending.is_empty() {
            return Err(StoreError::EmptyQueue { path: dir });
        }

        let claimed_dir = PathResolver::claimed_dir(&dir);
        disk::ensure_dir(&claimed_dir, Visibility::Private.dir_mode())?;

        for token in &pending {
            let entry = PathResolver::entry(&dir, token);
            let claimed = PathResolver::entry(&claimed_dir, token);
            match fs::rename(&entry, &claimed) {
                Ok(()) => {
                    let content = take_claimed(&entry, &claimed)?;
                    debug!(%owner, %direction, queue, %token, "popped entry");
                    return Ok(content);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!(%token, "entry claimed by a concurrent pop");
                }
                Err(e) => return Err(StoreError::io("claim", entry)(e)),
            }
        }

        Err(StoreError::ClaimLost { path: dir })
    }

    /// Drain messages addressed to this store's own identity.
    pub fn pop_incoming(&self, queue: &str) -> StoreResult<Vec<u8>> {
        let me = self.self_id()?;
        self.pop(me, Direction::Incoming, queue)
    }

    /// Drain `source`'s outgoing queue, as a relay does.
    pub fn pop_outgoing(&self, source: &PartyId, queue: &str) -> StoreResult<Vec<u8>> {
        self.pop(source, Direction::Outgoing, queue)
    }

    /// Number of entries currently waiting. A queue that was never pushed to
    /// has size 0.
    pub fn size(&self, owner: &PartyId, direction: Direction, queue: &str) -> StoreResult<usize> {
        let dir = self.paths.queue_dir(owner, direction, queue)?;
        Ok(list_entries(&dir)?.len())
    }

    /// Size of this store's own incoming queue.
    pub fn incoming_size(&self, queue: &str) -> StoreResult<usize> {
        let me = self.self_id()?;
        self.size(me, Direction::Incoming, queue)
    }

    /// Size of `owner`'s outgoing queue.
    pub fn outgoing_size(&self, owner: &PartyId, queue: &str) -> StoreResult<usize> {
        self.size(owner, Direction::Outgoing, queue)
    }

    /// Tokens of the waiting entries, earliest first.
    pub fn peek_tokens(&self, owner: &PartyId, direction: Direction, queue: &str) -> StoreResult<Vec<EntryToken>> {
        let dir = self.paths.queue_dir(owner, direction, queue)?;
        list_entries(&dir)
    }
}

/// Visible entries of a queue directory, sorted ascending.
///
/// Hidden names (staging files, `.claimed/`) and anything that is not a
/// regular file are skipped. A missing directory is an empty queue.
fn list_entries(dir: &Path) -> StoreResult<Vec<EntryToken>> {
    let read_dir = match fs::read_dir(dir) {
        Ok(read_dir) => read_dir,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::io("list", dir)(e)),
    };

    let mut tokens = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(StoreError::io("list", dir))?;
        let is_file = match entry.file_type() {
            Ok(file_type) => file_type.is_file(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => return Err(StoreError::io("inspect", entry.path())(e)),
        };
        if !is_file {
            continue;
        }
        if let Some(token) = entry.file_name().to_str().and_then(|n| EntryToken::new(n).ok()) {
            tokens.push(token);
        }
    }

    // Directory iteration order is unspecified; FIFO order comes from here.
    tokens.sort();
    Ok(tokens)
}

/// Read a claimed entry and remove it.
fn take_claimed(entry: &Path, claimed: &Path) -> StoreResult<Vec<u8>> {
    let content = match fs::read(claimed) {
        Ok(content) => content,
        Err(e) => {
            restore(claimed, entry);
            return Err(StoreError::io("read claimed entry", claimed)(e));
        }
    };

    fs::remove_file(claimed).map_err(StoreError::io("remove claimed entry", claimed))?;
    Ok(content)
}

/// Put an unread claimed entry back in its queue.
fn restore(claimed: &Path, entry: &Path) {
    if let Err(e) = fs::rename(claimed, entry) {
        warn!(
            claimed = %claimed.display(),
            error = %e,
            "could not return unread entry to its queue"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pbx_types::{SequentialTokens, TokenSource};
    use std::path::PathBuf;
    use std::sync::{Arc, Barrier, Mutex};
    use std::thread;

    /// Claimed entries left behind by pops that failed to remove them.
    fn claimed_residue(dir: &Path) -> Vec<PathBuf> {
        match fs::read_dir(PathResolver::claimed_dir(dir)) {
            Ok(read_dir) => read_dir.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }

    fn party(id: &str) -> PartyId {
        PartyId::new(id).unwrap()
    }

    fn open(dir: &Path) -> Store {
        Store::open(dir, None).unwrap()
    }

    /// Token source that replays a fixed list, to force collisions.
    struct FixedTokens(Mutex<Vec<&'static str>>);

    impl TokenSource for FixedTokens {
        fn next_token(&self) -> EntryToken {
            let next = self.0.lock().unwrap().remove(0);
            EntryToken::new(next).unwrap()
        }
    }

    // -----------------------------------------------------------------------
    // Push / pop basics
    // -----------------------------------------------------------------------

    #[test]
    fn push_then_pop_returns_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let alice = party("alice");

        store.push(&alice, Direction::Incoming, "mail", "hello").unwrap();
        assert_eq!(store.size(&alice, Direction::Incoming, "mail").unwrap(), 1);
        assert_eq!(store.pop(&alice, Direction::Incoming, "mail").unwrap(), b"hello");
        assert_eq!(store.size(&alice, Direction::Incoming, "mail").unwrap(), 0);
    }

    #[test]
    fn pop_on_missing_queue_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let err = store.pop(&party("alice"), Direction::Incoming, "mail").unwrap_err();
        assert!(err.is_empty_queue(), "{err}");
    }

    #[test]
    fn size_counts_and_drains() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let bob = party("bob");

        for i in 0..25 {
            store.push(&bob, Direction::Outgoing, "jobs", format!("job-{i}")).unwrap();
        }
        assert_eq!(store.outgoing_size(&bob, "jobs").unwrap(), 25);

        for _ in 0..25 {
            store.pop_outgoing(&bob, "jobs").unwrap();
        }
        assert_eq!(store.outgoing_size(&bob, "jobs").unwrap(), 0);
        assert!(store.pop_outgoing(&bob, "jobs").unwrap_err().is_empty_queue());
    }

    #[test]
    fn pops_follow_push_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let alice = party("alice");

        store.push_incoming(&alice, "mail", "a").unwrap();
        store.push_incoming(&alice, "mail", "b").unwrap();

        let me = store.with_identity(alice);
        assert_eq!(me.pop_incoming("mail").unwrap(), b"a");
        assert_eq!(me.pop_incoming("mail").unwrap(), b"b");
    }

    #[test]
    fn order_comes_from_tokens_not_creation_time() {
        let dir = tempfile::tempdir().unwrap();
        let tokens = FixedTokens(Mutex::new(vec!["0003", "0001", "0002"]));
        let store = open(dir.path()).with_token_source(Arc::new(tokens));
        let alice = party("alice");

        store.push_incoming(&alice, "mail", "third").unwrap();
        store.push_incoming(&alice, "mail", "first").unwrap();
        store.push_incoming(&alice, "mail", "second").unwrap();

        let popped: Vec<Vec<u8>> = (0..3)
            .map(|_| store.pop(&alice, Direction::Incoming, "mail").unwrap())
            .collect();
        assert_eq!(popped, vec![b"first".to_vec(), b"second".to_vec(), b"third".to_vec()]);
    }

    #[test]
    fn push_returns_the_entry_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path()).with_token_source(Arc::new(SequentialTokens::new()));
        let alice = party("alice");

        let token = store.push_incoming(&alice, "mail", "x").unwrap();
        assert_eq!(token.as_str(), "entry-00000000000000000000");
        assert!(dir
            .path()
            .join("private/alice/incoming/mail/entry-00000000000000000000")
            .is_file());
        assert_eq!(store.peek_tokens(&alice, Direction::Incoming, "mail").unwrap(), vec![token]);
    }

    #[test]
    fn token_collision_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let tokens = FixedTokens(Mutex::new(vec!["same", "same"]));
        let store = open(dir.path()).with_token_source(Arc::new(tokens));
        let alice = party("alice");

        store.push_incoming(&alice, "mail", "original").unwrap();
        let err = store.push_incoming(&alice, "mail", "intruder").unwrap_err();
        assert!(matches!(err, StoreError::TokenCollision { .. }));
        assert_eq!(store.pop(&alice, Direction::Incoming, "mail").unwrap(), b"original");
    }

    #[test]
    fn directions_and_queues_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let alice = party("alice");

        store.push(&alice, Direction::Incoming, "mail", "in").unwrap();
        store.push(&alice, Direction::Outgoing, "mail", "out").unwrap();
        store.push(&alice, Direction::Incoming, "alerts", "alert").unwrap();

        assert_eq!(store.pop(&alice, Direction::Outgoing, "mail").unwrap(), b"out");
        assert_eq!(store.pop(&alice, Direction::Incoming, "alerts").unwrap(), b"alert");
        assert_eq!(store.pop(&alice, Direction::Incoming, "mail").unwrap(), b"in");
    }

    #[test]
    fn listing_ignores_hidden_files_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let alice = party("alice");

        store.push_incoming(&alice, "mail", "real").unwrap();
        let qdir = dir.path().join("private/alice/incoming/mail");
        fs::write(qdir.join(".pending-leftover"), b"partial").unwrap();
        fs::create_dir(qdir.join("nested")).unwrap();

        assert_eq!(store.size(&alice, Direction::Incoming, "mail").unwrap(), 1);
        assert_eq!(store.pop(&alice, Direction::Incoming, "mail").unwrap(), b"real");
        assert!(store.pop(&alice, Direction::Incoming, "mail").unwrap_err().is_empty_queue());
    }

    #[test]
    fn pop_leaves_no_residue() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let alice = party("alice");

        store.push_incoming(&alice, "mail", "x").unwrap();
        store.pop(&alice, Direction::Incoming, "mail").unwrap();

        let qdir = dir.path().join("private/alice/incoming/mail");
        assert!(claimed_residue(&qdir).is_empty());
    }

    #[test]
    fn unreadable_claim_is_returned_to_the_queue() {
        let dir = tempfile::tempdir().unwrap();
        let qdir = dir.path().join("mail");
        let claimed_dir = PathResolver::claimed_dir(&qdir);
        fs::create_dir_all(&claimed_dir).unwrap();

        // A directory where the claimed file should be makes the read fail.
        let token = EntryToken::new("0001").unwrap();
        let entry = PathResolver::entry(&qdir, &token);
        let claimed = PathResolver::entry(&claimed_dir, &token);
        fs::create_dir(&claimed).unwrap();

        let err = take_claimed(&entry, &claimed).unwrap_err();
        assert!(matches!(err, StoreError::Io { op: "read claimed entry", .. }), "{err}");
        assert!(entry.exists());
        assert!(!claimed.exists());
    }

    #[test]
    fn stranded_claims_are_never_redelivered() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let alice = party("alice");

        store.push_incoming(&alice, "mail", "live").unwrap();
        let qdir = dir.path().join("private/alice/incoming/mail");
        let claimed_dir = PathResolver::claimed_dir(&qdir);
        fs::create_dir_all(&claimed_dir).unwrap();
        fs::write(claimed_dir.join("0000-stranded"), b"already delivered").unwrap();

        assert_eq!(store.size(&alice, Direction::Incoming, "mail").unwrap(), 1);
        assert_eq!(store.pop(&alice, Direction::Incoming, "mail").unwrap(), b"live");
        assert!(store.pop(&alice, Direction::Incoming, "mail").unwrap_err().is_empty_queue());
        assert_eq!(store.size(&alice, Direction::Incoming, "mail").unwrap(), 0);
        assert_eq!(claimed_residue(&qdir), vec![claimed_dir.join("0000-stranded")]);
    }

    #[test]
    fn custom_token_prefix_lands_inside_the_queue() {
        let dir = tempfile::tempdir().unwrap();
        let tokens = SequentialTokens::starting_at("msg-", 5).unwrap();
        let store = open(dir.path()).with_token_source(Arc::new(tokens));
        let alice = party("alice");

        let token = store.push_incoming(&alice, "mail", "x").unwrap();
        assert_eq!(token.as_str(), "msg-00000000000000000005");
        let qdir = dir.path().join("private/alice/incoming/mail");
        assert!(qdir.join(token.as_str()).is_file());
        assert_eq!(store.peek_tokens(&alice, Direction::Incoming, "mail").unwrap(), vec![token]);
    }

    #[test]
    #[cfg(unix)]
    fn queue_storage_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;

        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path()).with_token_source(Arc::new(SequentialTokens::new()));
        let token = store.push_incoming(&party("alice"), "mail", "x").unwrap();

        let root = dir.path();
        assert_eq!(mode(&root.join("private")), 0o700);
        assert_eq!(mode(&root.join("private/alice")), 0o700);
        assert_eq!(mode(&root.join("private/alice/incoming")), 0o700);
        assert_eq!(mode(&root.join("private/alice/incoming/mail")), 0o700);
        assert_eq!(
            mode(&root.join("private/alice/incoming/mail").join(token.as_str())),
            0o600
        );
    }

    // -----------------------------------------------------------------------
    // Self-addressed helpers
    // -----------------------------------------------------------------------

    #[test]
    fn self_addressed_queue_ops_need_identity() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());

        assert!(matches!(store.push_outgoing("mail", "x"), Err(StoreError::InvalidState(_))));
        assert!(matches!(store.pop_incoming("mail"), Err(StoreError::InvalidState(_))));
        assert!(matches!(store.incoming_size("mail"), Err(StoreError::InvalidState(_))));
        assert!(!dir.path().join("private").exists());
    }

    #[test]
    fn outbox_relay_flow() {
        let dir = tempfile::tempdir().unwrap();
        let base = open(dir.path());
        let alice = base.with_identity(party("alice"));
        let relay = base.anonymous();

        alice.push_outgoing("mail", "to bob").unwrap();
        assert_eq!(relay.outgoing_size(&party("alice"), "mail").unwrap(), 1);

        let msg = relay.pop_outgoing(&party("alice"), "mail").unwrap();
        relay.push_incoming(&party("bob"), "mail", &msg).unwrap();

        let bob = base.with_identity(party("bob"));
        assert_eq!(bob.incoming_size("mail").unwrap(), 1);
        assert_eq!(bob.pop_incoming("mail").unwrap(), b"to bob");
        assert_eq!(relay.outgoing_size(&party("alice"), "mail").unwrap(), 0);
    }

    #[test]
    fn end_to_end_incoming_mail() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("store");

        let sender = Store::open(&root, None).unwrap();
        sender.push_incoming(&party("alice"), "mail", "hello").unwrap();

        let qdir = root.join("private/alice/incoming/mail");
        let files: Vec<PathBuf> = fs::read_dir(&qdir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.is_file())
            .collect();
        assert_eq!(files.len(), 1);
        assert_eq!(fs::read(&files[0]).unwrap(), b"hello");

        let alice = Store::open(&root, None).unwrap().with_identity(party("alice"));
        assert_eq!(alice.pop_incoming("mail").unwrap(), b"hello");
        assert_eq!(alice.incoming_size("mail").unwrap(), 0);
    }

    // -----------------------------------------------------------------------
    // Concurrency
    // -----------------------------------------------------------------------

    #[test]
    fn racing_pops_deliver_single_entry_once() {
        for _ in 0..50 {
            let dir = tempfile::tempdir().unwrap();
            let store = open(dir.path());
            let alice = party("alice");
            store.push_incoming(&alice, "mail", "only").unwrap();

            let barrier = Arc::new(Barrier::new(2));
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let store = store.clone();
                    let alice = alice.clone();
                    let barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        barrier.wait();
                        store.pop(&alice, Direction::Incoming, "mail")
                    })
                })
                .collect();

            let results: Vec<StoreResult<Vec<u8>>> =
                handles.into_iter().map(|h| h.join().unwrap()).collect();

            let delivered: Vec<&Vec<u8>> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
            assert_eq!(delivered, vec![&b"only".to_vec()]);

            let loser = results.iter().find_map(|r| r.as_ref().err()).unwrap();
            assert!(
                matches!(loser, StoreError::EmptyQueue { .. } | StoreError::ClaimLost { .. }),
                "unexpected error: {loser:?}"
            );
        }
    }

    #[test]
    fn concurrent_producers_and_consumers_deliver_everything_once() {
        const PRODUCERS: usize = 4;
        const PER_PRODUCER: usize = 50;
        const CONSUMERS: usize = 4;

        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let alice = party("alice");

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let store = store.clone();
                let alice = alice.clone();
                thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        store.push_incoming(&alice, "mail", format!("{p}:{i}")).unwrap();
                    }
                })
            })
            .collect();
        for handle in producers {
            handle.join().unwrap();
        }

        let consumers: Vec<_> = (0..CONSUMERS)
            .map(|_| {
                let store = store.clone();
                let alice = alice.clone();
                thread::spawn(move || {
                    let mut got = Vec::new();
                    loop {
                        match store.pop(&alice, Direction::Incoming, "mail") {
                            Ok(content) => got.push(String::from_utf8(content).unwrap()),
                            Err(StoreError::ClaimLost { .. }) => continue,
                            Err(StoreError::EmptyQueue { .. }) => break,
                            Err(other) => panic!("unexpected error: {other}"),
                        }
                    }
                    got
                })
            })
            .collect();

        let mut all: Vec<String> = consumers
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(all.len(), PRODUCERS * PER_PRODUCER);
        all.sort();
        all.dedup();
        assert_eq!(all.len(), PRODUCERS * PER_PRODUCER);
        assert_eq!(store.size(&alice, Direction::Incoming, "mail").unwrap(), 0);
    }
}
