// SPDX-License-Identifier: MPL-2.0

//! The owner identity tuple spec §3 defines: "`(file_handle, session_id,
//! process_id, user_id)` supplied by the caller, used for the SMB
//! same-owner compatibility rule."

/// Uniquely identifies the owner of a lock request for the purposes of
/// the SMB same-owner compatibility rules (spec §4.2, §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identity {
    pub file_handle: u64,
    pub session_id: u64,
    pub process_id: u32,
    pub user_id: u32,
}

impl Identity {
    pub const fn new(file_handle: u64, session_id: u64, process_id: u32, user_id: u32) -> Self {
        Self {
            file_handle,
            session_id,
            process_id,
            user_id,
        }
    }

    /// `true` iff `self` and `other` share the same session and process,
    /// irrespective of file handle — the relation spec §4.2's access rule
    /// uses ("same session+pid, irrespective of file handle").
    pub fn same_session_and_process(&self, other: &Identity) -> bool {
        self.session_id == other.session_id && self.process_id == other.process_id
    }
}
