// SPDX-License-Identifier: MPL-2.0

//! The POSIX-flavored error codes this crate surfaces at its boundary.
//!
//! This is the "user-visible error channel" spec §6/§7 refers to:
//! `Status` (see [`crate::status`]) is the value the rule engine and the
//! wait/wake coordinator actually compute with; `Error`/`Errno` is what a
//! caller sees once `raise_lock_error`/`raise_unlock_error` translate a
//! `Status` at the boundary.

use core::fmt;

/// Error number, trimmed to the codes this subsystem can actually produce.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Errno {
    /// Operation not permitted.
    EPERM = 1,
    /// Bad file number (the file handle is closed or invalid).
    EBADF = 9,
    /// Try again (non-blocking conflict).
    EAGAIN = 11,
    /// Invalid argument.
    EINVAL = 22,
    /// Resource deadlock would occur.
    EDEADLK = 35,
    /// No record locks available.
    ENOLCK = 37,
    /// Operation canceled (timed out or explicitly canceled while waiting).
    ECANCELED = 125,
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Errno::EPERM => "operation not permitted",
            Errno::EBADF => "bad file number",
            Errno::EAGAIN => "try again",
            Errno::EINVAL => "invalid argument",
            Errno::EDEADLK => "resource deadlock would occur",
            Errno::ENOLCK => "no record locks available",
            Errno::ECANCELED => "operation canceled",
        };
        f.write_str(msg)
    }
}

/// Error returned at the crate's external boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Error {
    errno: Errno,
    msg: Option<&'static str>,
}

impl Error {
    pub const fn new(errno: Errno) -> Self {
        Error { errno, msg: None }
    }

    pub const fn with_message(errno: Errno, msg: &'static str) -> Self {
        Error {
            errno,
            msg: Some(msg),
        }
    }

    pub const fn errno(&self) -> Errno {
        self.errno
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.msg {
            Some(msg) => write!(f, "{}: {}", self.errno, msg),
            None => write!(f, "{}", self.errno),
        }
    }
}

impl std::error::Error for Error {}

impl From<Errno> for Error {
    fn from(errno: Errno) -> Self {
        Error::new(errno)
    }
}

pub type Result<T> = core::result::Result<T, Error>;
