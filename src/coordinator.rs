// SPDX-License-Identifier: MPL-2.0

//! The wait/wake coordinator (spec §4.3-§4.8, component C5): the only
//! module that drives blocking, the conflict graph, and destruction. Every
//! public entry point here is the crate's public API surface (re-exported
//! from `lib.rs`).

use std::{sync::Arc, time::Instant};

use log::{debug, trace};

use crate::{
    handle::{should_remap_to_conflict, FileHandle},
    identity::Identity,
    list::LockList,
    lock_type::{DesiredAccess, LockType},
    range::ByteRange,
    record::{LockRecord, RecordState},
    request::Request,
    rules::{check_access, match_unlock, try_grant, GrantOutcome},
    status::Status,
    timeout::Timeout,
};

/// Acquires a byte-range lock (spec §4.3).
///
/// `request` is the caller's cancellable context (see [`crate::request`]
/// for why it carries no session gate); `list` is the target file's lock
/// list; `handle` is the file handle the candidate range is taken
/// against.
///
/// Per spec §5/§9, any caller passing a `timeout` other than
/// [`Timeout::NoWait`] must have already released its own session gate:
/// this function may block the calling thread for the full duration of
/// the wait.
pub fn acquire(
    request: &Arc<Request>,
    list: &LockList,
    handle: &dyn FileHandle,
    range: ByteRange,
    lock_type: LockType,
    timeout: Timeout,
) -> Status {
    let now = Instant::now();
    let deadline = timeout.deadline_from(now);
    let candidate = LockRecord::new(range, lock_type, request.identity(), deadline);
    trace!(
        "acquire: record {} range={:?} type={:?} timeout={:?}",
        candidate.id(),
        range,
        lock_type,
        timeout
    );

    loop {
        // Hold the writer guard across the scan and the install so a
        // grant decision can never be invalidated by a racing writer
        // between the two (spec §4.3: "the list gate is held as writer
        // for the duration of a grant attempt").
        let mut guard = list.write();
        let outcome = try_grant(&guard, range, lock_type, request.identity(), handle);

        match outcome {
            GrantOutcome::Success => {
                candidate.set_state(RecordState::Granted);
                guard.push_back(candidate.clone());
                drop(guard);
                debug!("acquire: granted record {}", candidate.id());
                return Status::Success;
            }
            GrantOutcome::HandleClosed => {
                debug!("acquire: handle closed for record {}", candidate.id());
                return Status::RangeNotLocked;
            }
            GrantOutcome::Conflict(blocker) => {
                if timeout.is_no_wait() {
                    return remap_conflict(handle, range.start(), false);
                }
                // `wait_on` blocks; the list gate must not be held while
                // parked (spec §4.4 step 3).
                drop(guard);
                match wait_on(request, &candidate, &blocker) {
                    WaitOutcome::Success => {
                        // Woken; loop and re-evaluate try_grant. Not a
                        // guarantee of grant (spec §4.4: "a wakeup is not
                        // a grant, merely permission to re-check").
                        continue;
                    }
                    WaitOutcome::TimedOut => {
                        // Spec §8 scenario 3: a deadline expiry with a
                        // nonzero timeout always remaps to
                        // `FileLockConflict`, never a bare `Cancelled`.
                        candidate.set_state(RecordState::Releasing);
                        return remap_conflict(handle, range.start(), true);
                    }
                    WaitOutcome::Canceled => {
                        // An explicit external cancel (spec §5
                        // "Cancellation") is reported verbatim, never
                        // remapped — only a deadline expiry goes through
                        // §4.5's remap table.
                        candidate.set_state(RecordState::Releasing);
                        return Status::Cancelled;
                    }
                }
            }
        }
    }
}

/// Applies the spec §4.5 remap rule to a non-blocking or exhausted-wait
/// conflict.
fn remap_conflict(handle: &dyn FileHandle, start: u64, waited: bool) -> Status {
    if should_remap_to_conflict(handle, start, waited) {
        Status::FileLockConflict
    } else {
        Status::LockNotGranted
    }
}

/// Why `wait_on` ended, distinguishing a deadline expiry from an explicit
/// external cancel: spec §8 scenario 3 remaps the former through §4.5's
/// remap table, while spec §4.3 step 2d reports the latter verbatim as
/// `Cancelled`. `Status` alone cannot carry that distinction since both
/// collapse to the same externally-visible `Cancelled` value coming out of
/// [`Request::finish_wait`].
enum WaitOutcome {
    Success,
    TimedOut,
    Canceled,
}

/// The blocking wait protocol (spec §4.4), run with the file-list gate
/// released for its duration:
///
/// 1. refuse immediately if `request` is already canceled;
/// 2. park `pending` in `blocker.dependents` and mark the request
///    `Waiting`;
/// 3. release the file-list gate (already released by the caller: this
///    function never holds it);
/// 4. wait on `blocker`'s condition variable up to `pending`'s deadline;
/// 5. remove `pending` from `blocker.dependents`;
/// 6. (gate re-acquisition is the caller's concern, not this function's);
/// 7. restore `Active` or report cancellation.
fn wait_on(
    request: &Arc<Request>,
    pending: &Arc<LockRecord>,
    blocker: &Arc<LockRecord>,
) -> WaitOutcome {
    if request.try_begin_wait(pending).is_err() {
        // Cancel arrived before park (spec §5): never reaches the
        // condition variable at all, so it can only be an explicit cancel.
        return WaitOutcome::Canceled;
    }
    pending.set_blocked_by(Some(blocker));
    blocker.add_dependent(pending);

    let woken = blocker.wait_for_release(pending.deadline());

    blocker.remove_dependent(pending);
    pending.set_blocked_by(None);

    let status = request.finish_wait();
    if status == Status::Cancelled {
        return WaitOutcome::Canceled;
    }
    if !woken {
        return WaitOutcome::TimedOut;
    }
    WaitOutcome::Success
}

/// Releases a held lock by exact range match (spec §4.6).
///
/// `match_unlock` and the removal from the list happen under the same
/// writer guard (spec §4.6: "take list gate as writer, run `match_unlock`;
/// on hit remove from list"), so a concurrent `release`/`destroy_by_handle`
/// racing on the same record cannot slip in between the match and the
/// removal and cause a double destroy.
pub fn release(list: &LockList, identity: Identity, range: ByteRange) -> Status {
    let record = {
        let mut guard = list.write();
        match match_unlock(&guard, range, identity) {
            Some(record) => {
                guard.retain(|r| r.id() != record.id());
                record
            }
            None => return Status::RangeNotLocked,
        }
    };
    destroy(&record);
    Status::Success
}

/// Checks whether `desired` access on `range` is compatible with every
/// granted record that overlaps it (spec §4.2, §6). Takes the list gate
/// only as a reader.
pub fn check_access_to(
    list: &LockList,
    identity: Identity,
    range: ByteRange,
    desired: DesiredAccess,
) -> Status {
    let guard = list.read();
    if check_access(&guard, range, desired, identity) {
        Status::Success
    } else {
        // Spec §4.2's access rule fails closed with `FILE_LOCK_CONFLICT`
        // directly ("Otherwise → FILE_LOCK_CONFLICT"); `LockNotGranted` is
        // the grant-path's non-blocking-conflict status (spec §6), not an
        // access-check outcome.
        Status::FileLockConflict
    }
}

/// Destroys a single record (spec §4.7): marks it `Releasing`, wakes
/// every dependent, waits for them all to have observed the wake and
/// detached themselves, then lets the `Arc` drop.
///
/// Must be called with the record already detached from its file's
/// `LockList` (spec §4.7 precondition).
fn destroy(record: &Arc<LockRecord>) {
    record.set_state(RecordState::Releasing);
    record.wake_all();
    record.wait_dependents_drained();
    trace!("destroy: record {} drained", record.id());
}

/// Bulk-detaches and destroys every record in `list` owned by `identity`
/// on `handle` (spec §4.8): used when a handle is closed out from under
/// whatever locks it held.
///
/// The detach step runs under the write gate; destruction (the
/// potentially-blocking drain wait) runs after the gate is released, so a
/// slow waiter cannot hold up unrelated lock-list operations (spec §4.8:
/// "detach-then-destroy-outside-gate").
pub fn destroy_by_handle(list: &LockList, identity: Identity) {
    let detached: Vec<Arc<LockRecord>> = {
        let mut guard = list.write();
        let mut detached = Vec::new();
        guard.retain(|r| {
            if r.identity() == identity {
                detached.push(r.clone());
                false
            } else {
                true
            }
        });
        detached
    };
    debug!(
        "destroy_by_handle: detached {} record(s) for identity {:?}",
        detached.len(),
        identity
    );
    for record in &detached {
        destroy(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::LastFailedOffset;
    use std::{sync::Barrier, thread, time::Duration};

    struct TestHandle {
        open: std::sync::atomic::AtomicBool,
        marker: LastFailedOffset,
    }
    impl FileHandle for TestHandle {
        fn is_open(&self) -> bool {
            self.open.load(std::sync::atomic::Ordering::SeqCst)
        }
        fn last_failed_offset(&self) -> &LastFailedOffset {
            &self.marker
        }
    }
    fn handle() -> TestHandle {
        TestHandle {
            open: std::sync::atomic::AtomicBool::new(true),
            marker: LastFailedOffset::new(),
        }
    }
    fn identity(n: u64) -> Identity {
        Identity::new(n, n, n as u32, n as u32)
    }

    #[test]
    fn shared_locks_grant_without_waiting() {
        let list = LockList::new();
        let h = handle();
        let r1 = Request::new(identity(1));
        let r2 = Request::new(identity(2));
        assert_eq!(
            acquire(
                &r1,
                &list,
                &h,
                ByteRange::new(0, 100),
                LockType::Shared,
                Timeout::NoWait
            ),
            Status::Success
        );
        assert_eq!(
            acquire(
                &r2,
                &list,
                &h,
                ByteRange::new(50, 50),
                LockType::Shared,
                Timeout::NoWait
            ),
            Status::Success
        );
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn no_wait_conflict_returns_immediately() {
        let list = LockList::new();
        let h = handle();
        let r1 = Request::new(identity(1));
        let r2 = Request::new(identity(2));
        acquire(
            &r1,
            &list,
            &h,
            ByteRange::new(0, 100),
            LockType::Exclusive,
            Timeout::NoWait,
        );
        let status = acquire(
            &r2,
            &list,
            &h,
            ByteRange::new(50, 10),
            LockType::Exclusive,
            Timeout::NoWait,
        );
        assert!(matches!(
            status,
            Status::LockNotGranted | Status::FileLockConflict
        ));
    }

    #[test]
    fn bounded_wait_times_out_when_never_released() {
        // Spec §8 scenario 3: a bounded wait that expires remaps to
        // `FileLockConflict` (the timeout was nonzero), not a bare
        // `Cancelled`.
        let list = LockList::new();
        let h = handle();
        let r1 = Request::new(identity(1));
        let r2 = Request::new(identity(2));
        acquire(
            &r1,
            &list,
            &h,
            ByteRange::new(0, 100),
            LockType::Exclusive,
            Timeout::NoWait,
        );
        let start = Instant::now();
        let status = acquire(
            &r2,
            &list,
            &h,
            ByteRange::new(0, 100),
            LockType::Exclusive,
            Timeout::Bounded(Duration::from_millis(50)),
        );
        assert_eq!(status, Status::FileLockConflict);
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn explicit_cancel_while_waiting_is_reported_verbatim() {
        // Unlike a deadline expiry, an external cancel is never remapped
        // through §4.5 — it is reported as `Cancelled` even though the
        // timeout was nonzero (spec §4.3 step 2d).
        let list = Arc::new(LockList::new());
        let h = Arc::new(handle());
        let r1 = Request::new(identity(1));
        let r2 = Request::new(identity(2));
        acquire(
            &r1,
            &list,
            h.as_ref(),
            ByteRange::new(0, 100),
            LockType::Exclusive,
            Timeout::NoWait,
        );

        let barrier = Arc::new(Barrier::new(2));
        let waiter = {
            let list = list.clone();
            let h = h.clone();
            let r2 = r2.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                acquire(
                    &r2,
                    &list,
                    h.as_ref(),
                    ByteRange::new(0, 100),
                    LockType::Exclusive,
                    Timeout::Indefinite,
                )
            })
        };

        barrier.wait();
        thread::sleep(Duration::from_millis(20));
        r2.cancel();

        assert_eq!(waiter.join().unwrap(), Status::Cancelled);
    }

    #[test]
    fn waiter_wakes_promptly_on_release() {
        let list = Arc::new(LockList::new());
        let h = Arc::new(handle());
        let r1 = Request::new(identity(1));
        let r2 = Request::new(identity(2));
        acquire(
            &r1,
            &list,
            h.as_ref(),
            ByteRange::new(0, 100),
            LockType::Exclusive,
            Timeout::NoWait,
        );

        let barrier = Arc::new(Barrier::new(2));
        let waiter = {
            let list = list.clone();
            let h = h.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                let start = Instant::now();
                let status = acquire(
                    &r2,
                    &list,
                    h.as_ref(),
                    ByteRange::new(0, 100),
                    LockType::Exclusive,
                    Timeout::Indefinite,
                );
                (status, start.elapsed())
            })
        };

        barrier.wait();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(release(&list, identity(1), ByteRange::new(0, 100)), Status::Success);

        let (status, elapsed) = waiter.join().unwrap();
        assert_eq!(status, Status::Success);
        assert!(elapsed < Duration::from_secs(1));
    }

    #[test]
    fn same_owner_shared_over_own_exclusive_does_not_block() {
        let list = LockList::new();
        let h = handle();
        let r1 = Request::new(identity(1));
        acquire(
            &r1,
            &list,
            &h,
            ByteRange::new(0, 100),
            LockType::Exclusive,
            Timeout::NoWait,
        );
        let status = acquire(
            &r1,
            &list,
            &h,
            ByteRange::new(10, 10),
            LockType::Shared,
            Timeout::NoWait,
        );
        assert_eq!(status, Status::Success);
    }

    #[test]
    fn destroy_by_handle_drains_waiters() {
        let list = Arc::new(LockList::new());
        // r1 and r2 hold distinct handles on the same file node; only r1's
        // handle closes (spec §8 scenario 6).
        let h1 = Arc::new(handle());
        let h2 = Arc::new(handle());
        let r1 = Request::new(identity(1));
        let r2 = Request::new(identity(2));
        acquire(
            &r1,
            &list,
            h1.as_ref(),
            ByteRange::new(0, 100),
            LockType::Exclusive,
            Timeout::NoWait,
        );

        let barrier = Arc::new(Barrier::new(2));
        let waiter = {
            let list = list.clone();
            let h2 = h2.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                acquire(
                    &r2,
                    &list,
                    h2.as_ref(),
                    ByteRange::new(0, 100),
                    LockType::Exclusive,
                    Timeout::Indefinite,
                )
            })
        };

        barrier.wait();
        thread::sleep(Duration::from_millis(20));
        h1.open.store(false, std::sync::atomic::Ordering::SeqCst);
        destroy_by_handle(&list, identity(1));

        let status = waiter.join().unwrap();
        assert_eq!(status, Status::Success);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn unlock_requires_exact_match() {
        let list = LockList::new();
        let h = handle();
        let r1 = Request::new(identity(1));
        acquire(
            &r1,
            &list,
            &h,
            ByteRange::new(0, 100),
            LockType::Exclusive,
            Timeout::NoWait,
        );
        assert_eq!(
            release(&list, identity(1), ByteRange::new(0, 50)),
            Status::RangeNotLocked
        );
        assert_eq!(
            release(&list, identity(1), ByteRange::new(0, 100)),
            Status::Success
        );
        assert!(list.is_empty());
    }
}
