//! The alarm list shared between submitters and the alarm coordinator.
//!
//! Submitters insert requests under the list mutex and signal the
//! "list changed" condition variable. The coordinator wakes up, picks the
//! most recently created request it hasn't processed yet and applies it to
//! the list (see [`AlarmList::next_step`]).

use std::collections::BTreeSet;

use log::{debug, trace};
use parking_lot::{Condvar, Mutex};

use crate::{
    alarm::{AlarmKind, AlarmRequest},
    error::{EngineError, SubmitError},
    list::SortedAlarms,
};

#[derive(Debug, Default)]
struct ListState {
    alarms: SortedAlarms,
    /// sequence numbers of accepted requests the coordinator hasn't applied
    pending: BTreeSet<u64>,
    next_seq: u64,
    in_flight: bool,
    closed: bool,
}

#[derive(Debug, Default)]
pub struct AlarmList {
    state: Mutex<ListState>,
    changed: Condvar,
    settled: Condvar,
}

/// One request applied to the alarm list by the coordinator.
#[derive(Debug, Clone)]
pub struct Step {
    pub selected: AlarmRequest,
    /// entries the request displaced
    pub removed: Vec<AlarmRequest>,
    /// periods no remaining entry uses since this step
    pub vanished: BTreeSet<u32>,
    /// the whole list right after the step
    pub listing: SortedAlarms,
}

impl AlarmList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates `request` against the current entries and inserts it.
    ///
    /// A start needs a fresh id, a change or cancel an existing one. A cancel
    /// takes its period and message from the newest entry for that id,
    /// whether or not it has been processed yet. Returns the accepted request
    /// as it now sits in the list.
    pub fn submit(&self, mut request: AlarmRequest) -> Result<AlarmRequest, SubmitError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(SubmitError::Closed);
        }
        let existing = state.alarms.newest(request.id);
        match (request.kind, existing) {
            (AlarmKind::Start, Some(_)) => return Err(SubmitError::AlreadyExists(request.id)),
            (AlarmKind::Change | AlarmKind::Cancel, None) => {
                return Err(SubmitError::DoesNotExist(request.id))
            }
            (AlarmKind::Cancel, Some(existing)) => {
                request.period = existing.period;
                request.message = existing.message.clone();
            }
            _ => {}
        }

        state.next_seq += 1;
        request.seq = state.next_seq;
        state.pending.insert(request.seq);
        state.alarms.insert(request.clone());
        debug!("alarm list after insert: {}", state.alarms);
        self.changed.notify_one();
        Ok(request)
    }

    /// Blocks until there is a request to process, then applies the newest
    /// one. Returns `Ok(None)` once the list is closed and nothing is left
    /// pending. Every `Some` has to be followed by [`finish_step`].
    ///
    /// [`finish_step`]: Self::finish_step
    pub(crate) fn next_step(&self) -> Result<Option<Step>, EngineError> {
        let mut state = self.state.lock();
        while state.pending.is_empty() && !state.closed {
            self.changed.wait(&mut state);
        }
        let Some(seq) = state.pending.pop_last() else {
            return Ok(None);
        };
        state.in_flight = true;

        let selected = state.alarms.find_sequence(seq).cloned().ok_or_else(|| {
            EngineError::Inconsistent(format!("pending request #{seq} is not in the alarm list"))
        })?;
        trace!("coordinator selected {selected}");

        let removed = match selected.kind {
            AlarmKind::Start => Vec::new(),
            AlarmKind::Change => state.alarms.remove_id_except(selected.id, Some(seq)),
            AlarmKind::Cancel => state.alarms.remove_id(selected.id),
        };
        for alarm in &removed {
            // a displaced request that was still waiting is never applied
            state.pending.remove(&alarm.seq);
        }
        let vanished = state
            .alarms
            .unused_periods(removed.iter().map(|alarm| alarm.period));

        let expected = usize::from(selected.kind != AlarmKind::Cancel);
        let remaining = state.alarms.count_id(selected.id);
        if remaining != expected {
            return Err(EngineError::Inconsistent(format!(
                "{remaining} entries for alarm {} after applying {}",
                selected.id, selected.kind
            )));
        }

        Ok(Some(Step {
            selected,
            removed,
            vanished,
            listing: state.alarms.clone(),
        }))
    }

    /// Marks the step returned by [`next_step`](Self::next_step) as done.
    pub(crate) fn finish_step(&self) {
        let mut state = self.state.lock();
        state.in_flight = false;
        if state.pending.is_empty() {
            self.settled.notify_all();
        }
    }

    /// Waits until every accepted request has been processed.
    pub fn wait_settled(&self) {
        let mut state = self.state.lock();
        while !state.pending.is_empty() || state.in_flight {
            self.settled.wait(&mut state);
        }
    }

    /// Gives up on everything still pending after a fatal error. Submits are
    /// refused from now on and every [`wait_settled`](Self::wait_settled)
    /// caller is released.
    pub(crate) fn abort(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.in_flight = false;
        let dropped = std::mem::take(&mut state.pending);
        if !dropped.is_empty() {
            debug!("dropped {} pending requests after a fatal error", dropped.len());
        }
        self.changed.notify_all();
        self.settled.notify_all();
    }

    /// Refuses further submits and lets the coordinator run dry.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.changed.notify_all();
    }

    pub fn snapshot(&self) -> SortedAlarms {
        self.state.lock().alarms.clone()
    }

    /// Puts `alarm` in the list as is, skipping validation and the pending
    /// set.
    #[cfg(test)]
    pub(crate) fn insert_unchecked(&self, alarm: AlarmRequest) {
        self.state.lock().alarms.insert(alarm);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(id: u32, period: u32, message: &str) -> AlarmRequest {
        AlarmRequest::new(id, AlarmKind::Start, period, message)
    }

    fn drain(list: &AlarmList) -> Vec<Step> {
        list.close();
        let mut steps = Vec::new();
        while let Some(step) = list.next_step().unwrap() {
            list.finish_step();
            steps.push(step);
        }
        steps
    }

    #[test]
    fn duplicate_start_is_rejected() {
        let list = AlarmList::new();
        list.submit(start(1, 5, "wake up")).unwrap();
        assert_eq!(
            list.submit(start(1, 7, "x")),
            Err(SubmitError::AlreadyExists(1))
        );
        let snapshot = list.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.newest(1).map(|a| a.period), Some(5));
    }

    #[test]
    fn change_and_cancel_need_an_existing_alarm() {
        let list = AlarmList::new();
        assert_eq!(
            list.submit(AlarmRequest::cancel(9)),
            Err(SubmitError::DoesNotExist(9))
        );
        assert_eq!(
            list.submit(AlarmRequest::new(9, AlarmKind::Change, 1, "x")),
            Err(SubmitError::DoesNotExist(9))
        );
        assert!(list.snapshot().is_empty());
    }

    #[test]
    fn cancel_inherits_period_and_message() {
        let list = AlarmList::new();
        list.submit(start(1, 5, "wake up")).unwrap();
        let cancel = list.submit(AlarmRequest::cancel(1)).unwrap();
        assert_eq!(cancel.period, 5);
        assert_eq!(cancel.message, "wake up");
    }

    #[test]
    fn cancel_inherits_from_the_newest_pending_change() {
        for changed_period in [3, 20] {
            let list = AlarmList::new();
            list.submit(start(1, 10, "start")).unwrap();
            list.next_step().unwrap().unwrap();
            list.finish_step();

            list.submit(AlarmRequest::new(1, AlarmKind::Change, changed_period, "changed"))
                .unwrap();
            let cancel = list.submit(AlarmRequest::cancel(1)).unwrap();
            assert_eq!(cancel.period, changed_period);
            assert_eq!(cancel.message, "changed");
        }
    }

    #[test]
    fn submit_stamps_increasing_sequence_numbers() {
        let list = AlarmList::new();
        let a = list.submit(start(1, 5, "a")).unwrap();
        let b = list.submit(start(2, 1, "b")).unwrap();
        assert!(a.sequence() < b.sequence());
        assert!(list.snapshot().is_sorted());
    }

    #[test]
    fn newest_request_is_processed_first() {
        let list = AlarmList::new();
        list.submit(start(1, 5, "a")).unwrap();
        list.submit(start(2, 1, "b")).unwrap();
        let ids: Vec<_> = drain(&list).iter().map(|s| s.selected.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn change_replaces_and_reports_vanished_period() {
        let list = AlarmList::new();
        list.submit(start(2, 3, "go")).unwrap();
        list.submit(AlarmRequest::new(2, AlarmKind::Change, 10, "go2"))
            .unwrap();

        let steps = drain(&list);
        // the change displaced the unprocessed start, so only one step runs
        assert_eq!(steps.len(), 1);
        let step = &steps[0];
        assert_eq!(step.selected.kind, AlarmKind::Change);
        assert_eq!(step.removed.len(), 1);
        assert_eq!(step.vanished, BTreeSet::from([3]));

        let snapshot = list.snapshot();
        assert_eq!(snapshot.len(), 1);
        let entry = snapshot.newest(2).unwrap();
        assert_eq!((entry.period, entry.message.as_str()), (10, "go2"));
    }

    #[test]
    fn cancel_empties_the_list() {
        let list = AlarmList::new();
        list.submit(start(1, 5, "wake up")).unwrap();
        list.next_step().unwrap().unwrap();
        list.finish_step();

        list.submit(AlarmRequest::cancel(1)).unwrap();
        let step = list.next_step().unwrap().unwrap();
        list.finish_step();
        assert_eq!(step.removed.len(), 2);
        assert_eq!(step.vanished, BTreeSet::from([5]));
        assert!(step.listing.is_empty());
        assert!(list.snapshot().is_empty());
    }

    #[test]
    fn shared_period_does_not_vanish() {
        let list = AlarmList::new();
        list.submit(start(1, 5, "a")).unwrap();
        list.submit(start(2, 5, "b")).unwrap();
        list.next_step().unwrap().unwrap();
        list.finish_step();
        list.next_step().unwrap().unwrap();
        list.finish_step();

        list.submit(AlarmRequest::cancel(1)).unwrap();
        let step = list.next_step().unwrap().unwrap();
        list.finish_step();
        assert!(step.vanished.is_empty());
    }

    #[test]
    fn closed_list_refuses_submits() {
        let list = AlarmList::new();
        list.close();
        assert_eq!(list.submit(start(1, 1, "x")), Err(SubmitError::Closed));
        assert!(list.next_step().unwrap().is_none());
    }

    #[test]
    fn abort_releases_waiters_and_refuses_submits() {
        let list = AlarmList::new();
        list.submit(start(1, 5, "a")).unwrap();
        let mut duplicate = start(1, 7, "b");
        duplicate.seq = 99;
        list.insert_unchecked(duplicate);

        assert!(matches!(list.next_step(), Err(EngineError::Inconsistent(_))));
        list.abort();
        // would block forever if the failed step were still in flight
        list.wait_settled();
        assert_eq!(list.submit(start(2, 1, "c")), Err(SubmitError::Closed));
        assert!(list.next_step().unwrap().is_none());
    }

    #[test]
    fn wait_settled_returns_after_processing() {
        let list = std::sync::Arc::new(AlarmList::new());
        list.submit(start(1, 1, "x")).unwrap();
        let worker = {
            let list = std::sync::Arc::clone(&list);
            std::thread::spawn(move || {
                while let Some(_step) = list.next_step().unwrap() {
                    list.finish_step();
                }
            })
        };
        list.wait_settled();
        list.close();
        worker.join().unwrap();
    }
}
