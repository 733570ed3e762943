// SPDX-License-Identifier: MPL-2.0

//! The abstract status taxonomy of spec §6, returned verbatim by the core
//! and mapped to the server's error channel only at the boundary
//! (`raise_lock_error`/`raise_unlock_error`).

use std::fmt;

use crate::error::{Errno, Error, Result};

/// Outcome of a lock-core operation.
///
/// Unlike [`crate::error::Error`], this is not wrapped in a `Result`:
/// `LockNotGranted`, `FileLockConflict`, `RangeNotLocked` and `Cancelled`
/// are ordinary, expected outcomes of `acquire`/`release`/`check_access`,
/// not failures of the Rust call itself (spec §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The operation completed as requested.
    Success,
    /// Non-blocking conflict: a `try_grant` failed and the caller asked
    /// not to wait (spec §4.2, §4.5).
    LockNotGranted,
    /// A conflict remapped per spec §4.5's remap table.
    FileLockConflict,
    /// The unlock target was absent, or the handle was already closed at
    /// grant time (spec §4.2, §4.6).
    RangeNotLocked,
    /// The wait timed out or the request was canceled (spec §4.4, §5).
    Cancelled,
}

impl Status {
    pub fn is_success(self) -> bool {
        matches!(self, Status::Success)
    }

    /// Converts a status from the `acquire` lock path into a `Result`,
    /// via [`raise_lock_error`], so a caller that prefers `?`-propagation
    /// over matching on `Status` directly can do so at the boundary
    /// spec §6 describes.
    pub fn into_lock_result(self) -> Result<()> {
        match raise_lock_error(self) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Converts a status from the `release` unlock path into a `Result`,
    /// via [`raise_unlock_error`].
    pub fn into_unlock_result(self) -> Result<()> {
        match raise_unlock_error(self) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Success => "success",
            Status::LockNotGranted => "lock not granted",
            Status::FileLockConflict => "file lock conflict",
            Status::RangeNotLocked => "range not locked",
            Status::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Translates a lock-path `Status` to the server's user-visible error
/// channel (spec §6, `raise_lock_error`).
///
/// Returns `None` for `Status::Success`, since there is nothing to raise.
pub fn raise_lock_error(status: Status) -> Option<Error> {
    match status {
        Status::Success => None,
        Status::LockNotGranted => Some(Error::with_message(
            Errno::EAGAIN,
            "the requested byte range is locked by another owner",
        )),
        Status::FileLockConflict => Some(Error::with_message(
            Errno::EDEADLK,
            "the requested byte range conflicts with an existing lock",
        )),
        Status::RangeNotLocked => Some(Error::with_message(
            Errno::EBADF,
            "the file handle is not open",
        )),
        Status::Cancelled => Some(Error::with_message(
            Errno::ECANCELED,
            "the lock wait was canceled or timed out",
        )),
    }
}

/// Translates an unlock-path `Status` to the server's user-visible error
/// channel (spec §6, `raise_unlock_error`).
pub fn raise_unlock_error(status: Status) -> Option<Error> {
    match status {
        Status::Success => None,
        Status::RangeNotLocked => Some(Error::with_message(
            Errno::ENOLCK,
            "no matching lock range is held",
        )),
        // The unlock path (spec §4.6) never produces the other variants;
        // map them defensively rather than assume the caller never will.
        other => Some(Error::with_message(
            Errno::EINVAL,
            match other {
                Status::LockNotGranted => "unexpected LockNotGranted on the unlock path",
                Status::FileLockConflict => "unexpected FileLockConflict on the unlock path",
                Status::Cancelled => "unexpected Cancelled on the unlock path",
                Status::Success | Status::RangeNotLocked => unreachable!(),
            },
        )),
    }
}
