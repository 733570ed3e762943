// SPDX-License-Identifier: MPL-2.0

//! The file-handle collaborator spec §6 requires: `is_open()`, and a
//! mutex-guarded "last-failed offset" marker used by the §4.5 remap rule.

use std::sync::Mutex;

use crate::config::{LEGACY_WINDOWS_OFFSET_THRESHOLD, SIGN_BIT};

/// Per-handle "last failed offset" marker (spec §4.5, glossary). Guarded
/// by its own mutex, independent of the file-list gate and any lock
/// record's mutex.
#[derive(Default)]
pub struct LastFailedOffset {
    inner: Mutex<Option<u64>>,
}

impl LastFailedOffset {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    /// `true` iff the marker is currently valid and equal to `start`
    /// (spec §4.5's third remap condition), checked *before* the
    /// unconditional update spec §4.5 mandates ("Regardless of the
    /// remap, update the file handle's last-failed offset to `start`").
    pub fn matches_then_update(&self, start: u64) -> bool {
        let mut guard = self.inner.lock().unwrap();
        let matched = *guard == Some(start);
        *guard = Some(start);
        matched
    }
}

/// The file-handle collaborator the core requires (spec §6).
///
/// Implemented by the server's real open-file-handle type; this crate
/// only ever calls `is_open` and `last_failed_offset`. The `flags` field
/// spec §6 lists alongside these is part of the wider open-file-handle
/// contract but is never read by the lock core itself, so it is not part
/// of this trait.
pub trait FileHandle: Send + Sync {
    /// Whether the handle is still open. Must be checked under the
    /// file-list gate during `try_grant` (spec §4.2) to prevent a
    /// concurrent close from racing with a grant.
    fn is_open(&self) -> bool;

    /// The handle's last-failed-offset marker (spec §4.5).
    fn last_failed_offset(&self) -> &LastFailedOffset;
}

/// Decides whether a `LOCK_NOT_GRANTED` outcome should be remapped to
/// `FILE_LOCK_CONFLICT` (spec §4.5), and unconditionally updates the
/// handle's last-failed-offset marker as a side effect.
///
/// `start` is the failing candidate's range start; `waited` is whether
/// the caller asked for anything other than a zero (`NoWait`) timeout.
pub(crate) fn should_remap_to_conflict(handle: &dyn FileHandle, start: u64, waited: bool) -> bool {
    let legacy_offset_heuristic =
        start >= LEGACY_WINDOWS_OFFSET_THRESHOLD && start & SIGN_BIT == 0;
    // Evaluate the marker match before unconditionally updating it; both
    // sides of `||` must run regardless of short-circuiting, since the
    // update must always happen (spec §4.5).
    let repeated_failure = handle.last_failed_offset().matches_then_update(start);
    waited || legacy_offset_heuristic || repeated_failure
}
