// SPDX-License-Identifier: MPL-2.0

//! Explicit timeout variants, replacing the source's magic-integer sentinels
//! (spec §9, Open Question 2: "source treats `0xFFFF_FFFF` as indefinite and
//! `0` as no-wait. Any reimplementation should surface these as explicit
//! variants rather than magic integers.").

use std::time::{Duration, Instant};

/// How long `acquire` (spec §4.3) is willing to wait for a conflicting
/// lock to clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// Do not wait at all; a conflict is reported immediately
    /// (`timeout == 0` in the source).
    NoWait,
    /// Wait for up to the given duration.
    Bounded(Duration),
    /// Wait indefinitely, woken only by the blocker's release or explicit
    /// cancellation (`timeout == 0xFFFF_FFFF` in the source).
    Indefinite,
}

impl Timeout {
    /// Constructs the legacy wire representation used by the original
    /// SMB server: `0` means no-wait, `0xFFFF_FFFF` means indefinite,
    /// anything else is a millisecond count. Kept only as an explicit,
    /// documented decode step at the protocol boundary — internal code
    /// should construct `Timeout` variants directly.
    pub fn from_millis_sentinel(value: u32) -> Self {
        match value {
            0 => Timeout::NoWait,
            0xFFFF_FFFF => Timeout::Indefinite,
            ms => Timeout::Bounded(Duration::from_millis(ms as u64)),
        }
    }

    /// Whether `acquire` should return immediately on first conflict
    /// rather than parking (spec §4.3 step 2c).
    pub fn is_no_wait(self) -> bool {
        matches!(self, Timeout::NoWait)
    }

    /// Computes the absolute deadline to store on the pending record
    /// (spec §3 `deadline: Option<AbsoluteTime>`), taken once at
    /// `acquire` entry (spec §5: "re-entering the wait loop after a
    /// spurious wake uses the same original deadline, not a fresh one").
    pub fn deadline_from(self, now: Instant) -> Option<Instant> {
        match self {
            Timeout::NoWait => Some(now),
            Timeout::Bounded(d) => Some(now + d),
            Timeout::Indefinite => None,
        }
    }
}
