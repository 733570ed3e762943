// SPDX-License-Identifier: MPL-2.0

//! The request collaborator spec §3/§6 requires: an opaque handle
//! exposing identity, a cancellable state machine, and (externally) a
//! session gate.
//!
//! Session-gate handling (spec §5, §9 Design Notes): the original drops
//! and re-acquires a session-wide readers-writer gate around the blocking
//! wait so that a concurrent close on the same session can make progress
//! and cancel the waiter. Spec §9 flags this as "noted as a hack in the
//! original" and recommends lifting the gate out of the lock core
//! entirely, with the dispatch layer releasing it before calling
//! `acquire` whenever a wait is possible. This crate adopts that
//! recommendation (recorded in `DESIGN.md`): `Request` carries no session
//! gate at all, and [`crate::coordinator::acquire`] never touches one.
//! Callers that hold a session gate must release it before calling
//! `acquire` with a non-`NoWait` timeout.

use std::sync::{Arc, Mutex, Weak};

use crate::{identity::Identity, record::LockRecord, status::Status};

/// A request's cancellable state (spec §3 "Request (external)").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Active,
    Waiting,
    Canceled,
}

struct Inner {
    state: RequestState,
    awaiting: Option<Weak<LockRecord>>,
}

/// The requesting context the lock core parks on its target lock record.
///
/// One `Request` is created per in-flight call into the core; the
/// server's dispatch layer is expected to hold it for the duration of the
/// call so that an external cancel (protocol cancel, session teardown)
/// can reach it via [`Request::cancel`].
pub struct Request {
    identity: Identity,
    inner: Mutex<Inner>,
}

impl Request {
    pub fn new(identity: Identity) -> Arc<Self> {
        Arc::new(Self {
            identity,
            inner: Mutex::new(Inner {
                state: RequestState::Active,
                awaiting: None,
            }),
        })
    }

    pub fn identity(&self) -> Identity {
        self.identity
    }

    pub fn state(&self) -> RequestState {
        self.inner.lock().unwrap().state
    }

    /// The record this request is currently parked on, if any. Advisory,
    /// mirroring [`LockRecord::blocked_by`].
    pub fn awaiting(&self) -> Option<Arc<LockRecord>> {
        self.inner
            .lock()
            .unwrap()
            .awaiting
            .as_ref()
            .and_then(Weak::upgrade)
    }

    /// Marks the request canceled and, if it is currently parked on a
    /// record, wakes that record's waiters so `wait_on` observes the
    /// cancellation promptly (spec §4.4, §5 "Cancellation").
    ///
    /// Called by the request's owner (a protocol cancel or session
    /// teardown), never by the lock core itself.
    pub fn cancel(&self) {
        let blocker = {
            let mut inner = self.inner.lock().unwrap();
            inner.state = RequestState::Canceled;
            inner.awaiting.as_ref().and_then(Weak::upgrade)
        };
        if let Some(blocker) = blocker {
            blocker.wake_all();
        }
    }

    /// Attempts to transition `Active -> Waiting` and record `blocker` as
    /// the record being awaited (spec §4.4 step 1: "refuse if the request
    /// is already `CANCELED`; otherwise set it `WAITING`").
    ///
    /// Returns `Status::Cancelled` without changing state if the request
    /// was already canceled ("If cancel arrives before park, `wait_on`
    /// returns immediately", spec §5).
    pub(crate) fn try_begin_wait(&self, blocker: &Arc<LockRecord>) -> Result<(), Status> {
        let mut inner = self.inner.lock().unwrap();
        if inner.state == RequestState::Canceled {
            return Err(Status::Cancelled);
        }
        inner.state = RequestState::Waiting;
        inner.awaiting = Some(Arc::downgrade(blocker));
        Ok(())
    }

    /// Ends the wait (spec §4.4 step 7): restores `Active` unless the
    /// request was canceled while parked, in which case it stays
    /// `Canceled` and the wait reports `Cancelled`.
    pub(crate) fn finish_wait(&self) -> Status {
        let mut inner = self.inner.lock().unwrap();
        inner.awaiting = None;
        match inner.state {
            RequestState::Canceled => Status::Cancelled,
            RequestState::Waiting => {
                inner.state = RequestState::Active;
                Status::Success
            }
            RequestState::Active => {
                // Internal contract violation (spec §7): a request that
                // was never marked `Waiting` cannot legitimately finish a
                // wait.
                unreachable!("finish_wait called on a request that was never parked")
            }
        }
    }
}
