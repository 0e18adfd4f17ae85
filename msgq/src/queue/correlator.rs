//! Request-response correlation table.
//!
//! Maps the UID of each outstanding request to a wait record holding an empty
//! response slot and a condition variable owned by that request alone. A
//! responder fills the slot and wakes exactly one thread; nobody else is
//! disturbed.
//!
//! The table has its own mutex, separate from the storage mutex. Every
//! condition variable here is only ever waited on with this mutex.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::msg::MsgUid;
use crate::trace::debug;

type Table<M> = HashMap<MsgUid, WaitRecord<M>>;

/// Bookkeeping for one blocked requester.
struct WaitRecord<M> {
    /// Filled at most once by [`Correlator::respond`].
    response: Option<M>,
    /// Shared with the [`Pending`] handle of the blocked requester.
    signal: Arc<Condvar>,
}

pub(crate) struct Correlator<M> {
    table: Mutex<Table<M>>,
}

impl<M> Correlator<M> {
    pub(crate) fn new() -> Self {
        Self {
            table: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a wait record for `uid` and returns the handle the requester
    /// blocks on.
    ///
    /// The returned [`Pending`] keeps the table locked until it starts
    /// waiting, so no response can slip in between registration and wait.
    ///
    /// Returns `None` if `uid` already has an outstanding record.
    pub(crate) fn register(&self, uid: MsgUid) -> Option<Pending<'_, M>> {
        let mut table = self.table.lock();
        if table.contains_key(&uid) {
            return None;
        }

        let signal = Arc::new(Condvar::new());
        table.insert(
            uid,
            WaitRecord {
                response: None,
                signal: Arc::clone(&signal),
            },
        );
        debug!(%uid, pending = table.len(), "request registered");

        Some(Pending { table, uid, signal })
    }

    /// Attaches `response` to the record for `uid` and wakes its requester.
    ///
    /// Returns `false` and drops the response if there is no such record, or
    /// if it was already answered.
    pub(crate) fn respond(&self, uid: MsgUid, response: M) -> bool {
        let mut table = self.table.lock();
        match table.get_mut(&uid) {
            Some(record) if record.response.is_none() => {
                record.response = Some(response);
                record.signal.notify_one();
                debug!(%uid, "response delivered");
                true
            }
            Some(_) => {
                debug!(%uid, "request already answered, response dropped");
                false
            }
            None => {
                debug!(%uid, "no outstanding request, response dropped");
                false
            }
        }
    }

    /// Returns `true` if `uid` has an outstanding wait record.
    pub(crate) fn contains(&self, uid: MsgUid) -> bool {
        self.table.lock().contains_key(&uid)
    }

    /// Number of requests currently blocked waiting for a response.
    pub(crate) fn len(&self) -> usize {
        self.table.lock().len()
    }
}

/// A registered request waiting for its response.
///
/// Holds the correlator lock except while blocked in [`wait`](Pending::wait).
/// The wait record is removed when the handle drops, on every exit path.
pub(crate) struct Pending<'a, M> {
    table: MutexGuard<'a, Table<M>>,
    uid: MsgUid,
    signal: Arc<Condvar>,
}

impl<M> Pending<'_, M> {
    /// Blocks until a response arrives or `deadline` passes.
    ///
    /// `None` deadline waits indefinitely. Returns `None` on timeout.
    pub(crate) fn wait(mut self, deadline: Option<Instant>) -> Option<M> {
        loop {
            if let Some(response) = self.take_response() {
                return Some(response);
            }
            match deadline {
                None => self.signal.wait(&mut self.table),
                Some(deadline) => {
                    if self.signal.wait_until(&mut self.table, deadline).timed_out() {
                        // Last look: a response may have landed right at the deadline.
                        let response = self.take_response();
                        if response.is_none() {
                            debug!(uid = %self.uid, "request timed out");
                        }
                        return response;
                    }
                }
            }
        }
    }

    fn take_response(&mut self) -> Option<M> {
        self.table
            .get_mut(&self.uid)
            .and_then(|record| record.response.take())
    }
}

impl<M> Drop for Pending<'_, M> {
    fn drop(&mut self) {
        self.table.remove(&self.uid);
    }
}
