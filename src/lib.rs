// SPDX-License-Identifier: MPL-2.0

//! Byte-range lock manager core for an SMB/CIFS file server.
//!
//! This crate is the lock subsystem only: the rule engine that decides
//! whether a candidate byte-range lock may be granted (component C4, see
//! [`rules`]), and the wait/wake coordinator that blocks a caller until a
//! conflicting lock clears, wakes it again, and tears down released or
//! abandoned locks (component C5, see [`coordinator`]).
//!
//! # Collaborators this crate does not own
//!
//! The server's dispatch layer is expected to supply, per call:
//! - a [`request::Request`], the cancellable context for one in-flight
//!   lock/unlock/access-check call;
//! - a [`list::LockList`], normally embedded as a field of the server's
//!   file node type;
//! - a [`handle::FileHandle`] implementation, normally the server's open
//!   file handle type.
//!
//! Notably absent: a session gate. Spec-compliant servers that serialize
//! per-session state behind their own reader/writer gate must release it
//! before calling [`coordinator::acquire`] with anything other than
//! [`timeout::Timeout::NoWait`] — see the module docs on [`request`] for
//! why this crate does not model that gate itself.
//!
//! # Status vs. Error
//!
//! Every operation here returns a [`status::Status`], not a
//! [`error::Result`]: `LockNotGranted`, `FileLockConflict`,
//! `RangeNotLocked`, and `Cancelled` are expected, everyday outcomes of a
//! lock negotiation, not failures of the Rust call itself. Translate a
//! `Status` to the server's user-visible error channel with
//! [`status::raise_lock_error`] or [`status::raise_unlock_error`] only at
//! the boundary where that distinction actually matters to the caller.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod handle;
pub mod identity;
pub mod list;
pub mod lock_type;
pub mod range;
pub mod record;
mod rules;
pub mod status;
pub mod timeout;

pub mod request;

pub use coordinator::{acquire, check_access_to as check_access, destroy_by_handle, release};
pub use error::{Errno, Error, Result};
pub use handle::{FileHandle, LastFailedOffset};
pub use identity::Identity;
pub use list::LockList;
pub use lock_type::{DesiredAccess, LockType};
pub use range::ByteRange;
pub use record::{LockRecord, RecordState};
pub use request::{Request, RequestState};
pub use status::{raise_lock_error, raise_unlock_error, Status};
pub use timeout::Timeout;
