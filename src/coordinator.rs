//! The alarm coordinator: applies accepted requests to the alarm list,
//! keeps one periodic display thread per period in use and forwards a copy
//! of every processed request to the display updater.

use std::{
    sync::Arc,
    thread::{self, JoinHandle},
};

use log::{debug, error, info};
use parking_lot::Mutex;

use crate::{
    alarm::AlarmKind,
    alarm_list::{AlarmList, Step},
    buffer::BoundedBuffer,
    communication::{post, MessageType, Outbox},
    display::Handoff,
    error::EngineError,
    period::PeriodRegistry,
};

#[derive(Debug)]
pub struct Coordinator {
    list: Arc<AlarmList>,
    buffer: Arc<BoundedBuffer<Handoff>>,
    registry: Arc<Mutex<PeriodRegistry>>,
    outbox: Outbox,
}

impl Coordinator {
    #[must_use]
    pub const fn new(
        list: Arc<AlarmList>,
        buffer: Arc<BoundedBuffer<Handoff>>,
        registry: Arc<Mutex<PeriodRegistry>>,
        outbox: Outbox,
    ) -> Self {
        Self {
            list,
            buffer,
            registry,
            outbox,
        }
    }

    pub fn spawn(self) -> Result<JoinHandle<Result<(), EngineError>>, EngineError> {
        thread::Builder::new()
            .name("alarm-coordinator".to_string())
            .spawn(move || self.run())
            .map_err(|e| EngineError::spawn("alarm coordinator", e))
    }

    /// Processes requests until the alarm list is closed and drained, then
    /// retires every periodic display thread and closes the buffer.
    ///
    /// A fatal error abandons whatever is still pending and is reported to
    /// the outbox before it is returned. The buffer is closed either way so
    /// the display updater can exit.
    pub fn run(self) -> Result<(), EngineError> {
        info!("alarm coordinator started");
        let result = self.process_all();
        if result.is_err() {
            self.list.abort();
        }
        let retired = self.registry.lock().retire_all();
        let result = result.and(retired.map(|retired| {
            for (thread, period) in retired {
                post(&self.outbox, MessageType::PeriodThreadRetired { thread, period });
            }
        }));
        self.buffer.push(Handoff::Closed);
        match &result {
            Ok(()) => info!("alarm coordinator stopped"),
            Err(e) => {
                error!("alarm coordinator aborted: {e}");
                post(&self.outbox, e.into());
            }
        }
        result
    }

    fn process_all(&self) -> Result<(), EngineError> {
        while let Some(step) = self.list.next_step()? {
            let result = self.process(step);
            self.list.finish_step();
            result?;
        }
        Ok(())
    }

    fn process(&self, step: Step) -> Result<(), EngineError> {
        let Step {
            selected,
            removed,
            vanished,
            listing,
        } = step;
        debug!("coordinator processing {selected}");

        for alarm in removed {
            post(&self.outbox, MessageType::Removed(alarm));
        }
        {
            let mut registry = self.registry.lock();
            for period in vanished {
                if let Some(thread) = registry.retire(period)? {
                    post(&self.outbox, MessageType::PeriodThreadRetired { thread, period });
                }
            }
            if selected.kind != AlarmKind::Cancel {
                if let Some(thread) = registry.ensure(selected.period)? {
                    post(
                        &self.outbox,
                        MessageType::PeriodThreadCreated {
                            thread,
                            period: selected.period,
                        },
                    );
                }
            }
        }

        // the display list gets its own copy, never the alarm list's entry
        self.buffer.push(Handoff::Snapshot(selected.clone()));
        post(&self.outbox, MessageType::Forwarded(selected));
        post(&self.outbox, MessageType::AlarmList(listing));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;
    use crate::{
        alarm::AlarmRequest,
        communication::Message,
        display::DisplayList,
    };

    struct Harness {
        list: Arc<AlarmList>,
        buffer: Arc<BoundedBuffer<Handoff>>,
        registry: Arc<Mutex<PeriodRegistry>>,
        rx: mpsc::Receiver<Message>,
        handle: JoinHandle<Result<(), EngineError>>,
    }

    fn harness() -> Harness {
        let list = Arc::new(AlarmList::new());
        // large enough that the coordinator never blocks without a consumer
        let buffer = Arc::new(BoundedBuffer::new(64));
        let (tx, rx) = mpsc::channel();
        let registry = Arc::new(Mutex::new(PeriodRegistry::new(
            Arc::new(DisplayList::new()),
            tx.clone(),
        )));
        let handle = Coordinator::new(
            Arc::clone(&list),
            Arc::clone(&buffer),
            Arc::clone(&registry),
            tx,
        )
        .spawn()
        .unwrap();
        Harness {
            list,
            buffer,
            registry,
            rx,
            handle,
        }
    }

    #[test]
    fn start_creates_period_thread_and_forwards_copy() {
        let h = harness();
        h.list
            .submit(AlarmRequest::new(1, AlarmKind::Start, 5, "wake up"))
            .unwrap();
        h.list.wait_settled();
        assert_eq!(h.registry.lock().periods(), vec![5]);

        match h.buffer.pop() {
            Handoff::Snapshot(snapshot) => {
                assert_eq!(snapshot.id, 1);
                assert_eq!(snapshot.kind, AlarmKind::Start);
            }
            Handoff::Closed => panic!("buffer closed early"),
        }

        h.list.close();
        h.handle.join().unwrap().unwrap();
        assert!(h.registry.lock().is_empty());
        assert_eq!(h.buffer.pop(), Handoff::Closed);
    }

    #[test]
    fn change_moves_the_period_thread() {
        let h = harness();
        h.list
            .submit(AlarmRequest::new(2, AlarmKind::Start, 3, "go"))
            .unwrap();
        h.list.wait_settled();
        h.list
            .submit(AlarmRequest::new(2, AlarmKind::Change, 10, "go2"))
            .unwrap();
        h.list.wait_settled();
        assert_eq!(h.registry.lock().periods(), vec![10]);

        h.list.close();
        h.handle.join().unwrap().unwrap();
        let messages: Vec<_> = h.rx.try_iter().map(|m| m.kind).collect();
        assert!(messages.iter().any(|m| matches!(
            m,
            MessageType::PeriodThreadRetired { period: 3, .. }
        )));
        assert!(messages.iter().any(|m| matches!(
            m,
            MessageType::PeriodThreadCreated { period: 10, .. }
        )));
    }

    #[test]
    fn inconsistent_list_is_fatal() {
        let list = Arc::new(AlarmList::new());
        let buffer = Arc::new(BoundedBuffer::new(64));
        let (tx, rx) = mpsc::channel();
        let registry = Arc::new(Mutex::new(PeriodRegistry::new(
            Arc::new(DisplayList::new()),
            tx.clone(),
        )));

        // a second entry for the same id that never went through submit
        list.submit(AlarmRequest::new(1, AlarmKind::Start, 5, "a"))
            .unwrap();
        let mut duplicate = AlarmRequest::new(1, AlarmKind::Start, 7, "b");
        duplicate.seq = 99;
        list.insert_unchecked(duplicate);

        let handle = Coordinator::new(
            Arc::clone(&list),
            Arc::clone(&buffer),
            Arc::clone(&registry),
            tx,
        )
        .spawn()
        .unwrap();

        list.wait_settled();
        assert!(matches!(
            handle.join().unwrap(),
            Err(EngineError::Inconsistent(_))
        ));
        assert_eq!(buffer.pop(), Handoff::Closed);
        assert!(registry.lock().is_empty());
        assert!(rx.try_iter().any(|m| m.kind.is_fatal()));
        assert_eq!(
            list.submit(AlarmRequest::new(2, AlarmKind::Start, 1, "c")),
            Err(crate::error::SubmitError::Closed)
        );
    }

    #[test]
    fn cancel_keeps_a_period_still_in_use() {
        let h = harness();
        h.list
            .submit(AlarmRequest::new(1, AlarmKind::Start, 4, "a"))
            .unwrap();
        h.list
            .submit(AlarmRequest::new(2, AlarmKind::Start, 4, "b"))
            .unwrap();
        h.list.wait_settled();
        h.list.submit(AlarmRequest::cancel(1)).unwrap();
        h.list.wait_settled();
        assert_eq!(h.registry.lock().periods(), vec![4]);

        h.list.submit(AlarmRequest::cancel(2)).unwrap();
        h.list.wait_settled();
        assert!(h.registry.lock().is_empty());

        h.list.close();
        h.handle.join().unwrap().unwrap();
    }
}
