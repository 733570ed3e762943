// SPDX-License-Identifier: MPL-2.0

//! The lock record (spec §3, component C2): an immutable-after-creation
//! descriptor of one granted or pending lock, carrying identity, range,
//! timing, and the dependency links the wait/wake coordinator (C5) walks.

use std::{
    collections::HashSet,
    hash::{Hash, Hasher},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Condvar, Mutex, MutexGuard, Weak,
    },
    time::Instant,
};

use crate::{identity::Identity, lock_type::LockType, range::ByteRange};

/// A record's position in its lifecycle (spec §3 invariant 1-2, §3
/// "Lifecycle").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// Waiting to be granted; parked in exactly one blocker's `dependents`
    /// (or not yet parked at all).
    Pending,
    /// Installed in a file node's lock list.
    Granted,
    /// Unlocked or the owning handle closed; waking dependents and
    /// draining before final deallocation (spec §4.7).
    Releasing,
}

fn next_record_id() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

/// A dependent parked on this record, compared and hashed by the parked
/// record's identity rather than its contents — the set only needs
/// membership, not ordering (spec §9 Design Notes: "a set keyed by record
/// identity is equivalent [to a linked list] and avoids O(n) scans during
/// cancel").
#[derive(Clone)]
struct DependentKey(Arc<LockRecord>);

impl PartialEq for DependentKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}
impl Eq for DependentKey {}
impl Hash for DependentKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

struct Inner {
    state: RecordState,
    dependents: HashSet<DependentKey>,
}

/// One granted or pending lock (spec §3, component C2).
pub struct LockRecord {
    id: u64,
    range: ByteRange,
    lock_type: LockType,
    identity: Identity,
    /// `None` means an indefinite wait (spec §3 `deadline: Option<AbsoluteTime>`).
    deadline: Option<Instant>,
    inner: Mutex<Inner>,
    cv: Condvar,
    /// Advisory only; correctness never depends on it (spec §3 invariant 3).
    blocked_by: Mutex<Option<Weak<LockRecord>>>,
}

impl LockRecord {
    pub fn new(
        range: ByteRange,
        lock_type: LockType,
        identity: Identity,
        deadline: Option<Instant>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: next_record_id(),
            range,
            lock_type,
            identity,
            deadline,
            inner: Mutex::new(Inner {
                state: RecordState::Pending,
                dependents: HashSet::new(),
            }),
            cv: Condvar::new(),
            blocked_by: Mutex::new(None),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn range(&self) -> ByteRange {
        self.range
    }

    pub fn lock_type(&self) -> LockType {
        self.lock_type
    }

    pub fn identity(&self) -> Identity {
        self.identity
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn state(&self) -> RecordState {
        self.inner.lock().unwrap().state
    }

    pub(crate) fn set_state(&self, state: RecordState) {
        self.inner.lock().unwrap().state = state;
    }

    /// Advisory back-pointer to the record this one is (or was) parked on
    /// (spec §3 `blocked_by`, §9 Design Notes). May be stale after a wake;
    /// never consulted for correctness.
    pub fn blocked_by(&self) -> Option<Arc<LockRecord>> {
        self.blocked_by.lock().unwrap().as_ref().and_then(Weak::upgrade)
    }

    pub(crate) fn set_blocked_by(&self, blocker: Option<&Arc<LockRecord>>) {
        *self.blocked_by.lock().unwrap() = blocker.map(Arc::downgrade);
    }

    /// Number of pending dependents currently parked on this record. For
    /// diagnostics and the conflict-graph view (spec §9 Design Notes).
    pub fn dependent_count(&self) -> usize {
        self.inner.lock().unwrap().dependents.len()
    }

    /// Parks `dependent` on `self` (spec §4.4 step 2: "insert `pending`
    /// into `blocker.dependents`"). Must be called while `self` is
    /// `Granted`.
    pub(crate) fn add_dependent(self: &Arc<Self>, dependent: &Arc<LockRecord>) {
        let mut inner = self.inner.lock().unwrap();
        inner.dependents.insert(DependentKey(dependent.clone()));
    }

    /// Removes `dependent` from `self`'s conflict list (spec §4.4 step 5).
    /// Returns `true` if it was present.
    pub(crate) fn remove_dependent(&self, dependent: &Arc<LockRecord>) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let removed = inner.dependents.remove(&DependentKey(dependent.clone()));
        if inner.dependents.is_empty() {
            drop(inner);
            self.cv.notify_all();
        }
        removed
    }

    /// Broadcasts this record's condition variable, waking any thread
    /// parked in [`LockRecord::wait_for_release`] or
    /// [`LockRecord::wait_dependents_drained`] (spec §4.7 step 1).
    pub(crate) fn wake_all(&self) {
        self.cv.notify_all();
    }

    /// Parks the calling thread on `self`'s condition variable until
    /// either a wakeup arrives or `deadline` elapses. Returns `true` if
    /// awoken before the deadline (or there is no deadline), `false` on
    /// timeout.
    ///
    /// Precondition/postcondition: does not touch `dependents` itself —
    /// callers add/remove the dependent entry around this call per the
    /// protocol in spec §4.4.
    pub(crate) fn wait_for_release(&self, deadline: Option<Instant>) -> bool {
        let guard = self.inner.lock().unwrap();
        match deadline {
            None => {
                // `wait` itself is spurious-wake safe; the caller's
                // acquire loop re-evaluates `try_grant` regardless.
                let _ = self.cv.wait(guard).unwrap();
                true
            }
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return false;
                }
                let (_guard, timeout_result) = self
                    .cv
                    .wait_timeout(guard, deadline - now)
                    .unwrap();
                !timeout_result.timed_out()
            }
        }
    }

    /// Blocks until `dependents` drains to empty (spec §4.7 step 2).
    pub(crate) fn wait_dependents_drained(&self) {
        let mut guard = self.inner.lock().unwrap();
        while !guard.dependents.is_empty() {
            guard = self.cv.wait(guard).unwrap();
        }
    }
}

impl Drop for LockRecord {
    /// A safety net mirroring the teacher's `FlockItem::drop`: wakes any
    /// leftover waiters if a record is ever dropped through a path other
    /// than the explicit destroy protocol of spec §4.7 (e.g. a panic
    /// unwind). It is not a substitute for that protocol.
    fn drop(&mut self) {
        self.cv.notify_all();
    }
}

impl std::fmt::Debug for LockRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockRecord")
            .field("id", &self.id)
            .field("range", &self.range)
            .field("lock_type", &self.lock_type)
            .field("identity", &self.identity)
            .field("state", &self.state())
            .finish()
    }
}

/// Helper used only by tests in this module; real callers always go
/// through [`LockRecord::inner`]'s mutex via the methods above.
#[cfg(test)]
fn locked_inner(record: &LockRecord) -> MutexGuard<'_, Inner> {
    record.inner.lock().unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_identity() -> Identity {
        Identity::new(1, 2, 3, 4)
    }

    #[test]
    fn new_record_starts_pending_with_no_dependents() {
        let r = LockRecord::new(ByteRange::new(0, 10), LockType::Exclusive, sample_identity(), None);
        assert_eq!(r.state(), RecordState::Pending);
        assert_eq!(r.dependent_count(), 0);
        assert!(r.blocked_by().is_none());
    }

    #[test]
    fn add_and_remove_dependent_tracks_count() {
        let blocker =
            LockRecord::new(ByteRange::new(0, 10), LockType::Exclusive, sample_identity(), None);
        let dependent =
            LockRecord::new(ByteRange::new(0, 10), LockType::Exclusive, sample_identity(), None);
        blocker.add_dependent(&dependent);
        assert_eq!(blocker.dependent_count(), 1);
        assert!(locked_inner(&blocker)
            .dependents
            .contains(&DependentKey(dependent.clone())));
        assert!(blocker.remove_dependent(&dependent));
        assert_eq!(blocker.dependent_count(), 0);
    }

    #[test]
    fn blocked_by_is_advisory_and_may_upgrade() {
        let blocker =
            LockRecord::new(ByteRange::new(0, 10), LockType::Exclusive, sample_identity(), None);
        let pending =
            LockRecord::new(ByteRange::new(0, 10), LockType::Shared, sample_identity(), None);
        pending.set_blocked_by(Some(&blocker));
        assert_eq!(pending.blocked_by().unwrap().id(), blocker.id());
        drop(blocker);
        assert!(pending.blocked_by().is_none());
    }
}
