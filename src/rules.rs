// SPDX-License-Identifier: MPL-2.0

//! The rule engine (spec §4.2, component C4): grant, unlock-match, and
//! access-check rules. Strictly non-blocking: all three functions only
//! ever scan the list under a gate the caller already holds.

use std::{collections::VecDeque, sync::Arc};

use crate::{
    handle::FileHandle,
    identity::Identity,
    lock_type::{DesiredAccess, LockType},
    range::ByteRange,
    record::LockRecord,
};

/// Outcome of [`try_grant`].
pub enum GrantOutcome {
    /// No conflicting, incompatible record was found; the caller may
    /// install the candidate.
    Success,
    /// `blocker` conflicts with the candidate under the §4.2 compatibility
    /// rules.
    Conflict(Arc<LockRecord>),
    /// The candidate's file handle is closed.
    HandleClosed,
}

/// Two granted records are compatible (spec §4.2 grant rule) iff:
/// - both are `Shared`, or
/// - the candidate is `Shared`, the existing record is `Exclusive`, and
///   they share the same owner identity (Windows same-owner exception).
///
/// Note the asymmetry spec §4.2 calls out: an `Exclusive` candidate never
/// coexists with anything it overlaps, even under the same owner.
fn compatible(existing: &LockRecord, candidate_type: LockType, candidate_identity: Identity) -> bool {
    match (existing.lock_type(), candidate_type) {
        (LockType::Shared, LockType::Shared) => true,
        (LockType::Exclusive, LockType::Shared) => existing.identity() == candidate_identity,
        _ => false,
    }
}

/// `try_grant` (spec §4.2): scans `list` for an overlapping, incompatible
/// record. The open-file check happens here too, under whatever gate the
/// caller holds the list with, "to prevent a concurrent close racing with
/// grant" (spec §4.2).
pub fn try_grant(
    list: &VecDeque<Arc<LockRecord>>,
    candidate_range: ByteRange,
    candidate_type: LockType,
    candidate_identity: Identity,
    handle: &dyn FileHandle,
) -> GrantOutcome {
    if !handle.is_open() {
        return GrantOutcome::HandleClosed;
    }
    for existing in list {
        if !existing.range().overlaps(&candidate_range) {
            continue;
        }
        if !compatible(existing, candidate_type, candidate_identity) {
            return GrantOutcome::Conflict(existing.clone());
        }
    }
    GrantOutcome::Success
}

/// `match_unlock` (spec §4.2): finds the record with *exactly* equal
/// start, length, and identity. Partial/overlapping unlocks are not
/// permitted — unlike POSIX `fcntl` locks, SMB/Windows range unlocks
/// never split or merge ranges.
pub fn match_unlock(
    list: &VecDeque<Arc<LockRecord>>,
    range: ByteRange,
    identity: Identity,
) -> Option<Arc<LockRecord>> {
    list.iter()
        .find(|r| r.range().exactly_matches(&range) && r.identity() == identity)
        .cloned()
}

/// `check_access` (spec §4.2): is `desired` access on `range` compatible
/// with every overlapping granted record?
pub fn check_access(
    list: &VecDeque<Arc<LockRecord>>,
    range: ByteRange,
    desired: DesiredAccess,
    caller: Identity,
) -> bool {
    list.iter()
        .filter(|r| r.range().overlaps(&range))
        .all(|r| match r.lock_type() {
            LockType::Shared => desired == DesiredAccess::READ_DATA,
            LockType::Exclusive => r.identity().same_session_and_process(&caller),
        })
}
