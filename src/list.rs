// SPDX-License-Identifier: MPL-2.0

//! The per-file lock list (spec §3, §4, component C3): an ordered
//! collection of granted lock records attached to a file node, serialized
//! by a single readers-writer gate.
//!
//! Ownership note (spec §3): in the full server this list is a field of
//! the file node object, not of the lock core. This crate exposes it as a
//! standalone type the file node embeds, exactly as the teacher's
//! `FlockList` is embedded via `fs_lock_context` rather than owned by the
//! lock subsystem itself.

use std::{
    collections::VecDeque,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::record::LockRecord;

/// Ordered collection of granted lock records for one file.
///
/// Grants and unlocks take the gate as writer; pure access checks
/// (`check_access`) take it as reader (spec §3 "File node lock list").
pub struct LockList {
    inner: RwLock<VecDeque<Arc<LockRecord>>>,
}

impl LockList {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(VecDeque::new()),
        }
    }

    /// Number of granted records currently in the list.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, VecDeque<Arc<LockRecord>>> {
        self.inner.read().unwrap()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, VecDeque<Arc<LockRecord>>> {
        self.inner.write().unwrap()
    }
}

impl Default for LockList {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{identity::Identity, lock_type::LockType, range::ByteRange};

    #[test]
    fn new_list_is_empty() {
        let list = LockList::new();
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);
    }

    #[test]
    fn writer_can_install_records() {
        let list = LockList::new();
        let record = LockRecord::new(
            ByteRange::new(0, 10),
            LockType::Exclusive,
            Identity::new(1, 1, 1, 1),
            None,
        );
        list.write().push_back(record);
        assert_eq!(list.len(), 1);
    }
}
