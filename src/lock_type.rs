// SPDX-License-Identifier: MPL-2.0

//! Lock and access-desire types (spec §3, §4.2).

use bitflags::bitflags;

/// Whether a lock is a "read" (shared) or "write" (exclusive) lock, in
/// SMB parlance (spec glossary).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockType {
    Shared,
    Exclusive,
}

bitflags! {
    /// The access an I/O request desires, checked against the lock list
    /// by `check_access` (spec §4.2, §6). Non-empty per spec §6.
    pub struct DesiredAccess: u8 {
        const READ_DATA = 0b01;
        const WRITE_DATA = 0b10;
    }
}
