//! The display list and the thread that keeps it up to date.
//!
//! The display updater is the single writer: it drains snapshots from the
//! bounded buffer and projects them onto the list. Periodic display threads
//! are the readers.

use std::{
    sync::Arc,
    thread::{self, JoinHandle},
};

use log::{debug, info, log_enabled, Level};

use crate::{
    alarm::AlarmRequest,
    buffer::BoundedBuffer,
    communication::{post, MessageType, Outbox},
    error::EngineError,
    list::{Projection, SortedAlarms},
    sync::FairRwLock,
};

/// What travels through the bounded buffer. Snapshots are owned copies, so
/// the alarm list and the display list never share an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handoff {
    Snapshot(AlarmRequest),
    /// no more snapshots will follow
    Closed,
}

#[derive(Debug, Default)]
pub struct DisplayList {
    alarms: FairRwLock<SortedAlarms>,
}

impl DisplayList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Projects `snapshot` onto the list under the writer lock. Returns the
    /// changes and the list as it is afterwards.
    pub fn apply(&self, snapshot: AlarmRequest) -> (Projection, SortedAlarms) {
        let mut alarms = self.alarms.write();
        if log_enabled!(Level::Debug) {
            debug!("display list before {snapshot}: {}", *alarms);
        }
        let projection = alarms.project(snapshot);
        if log_enabled!(Level::Debug) {
            debug!("display list after: {}", *alarms);
        }
        (projection, alarms.clone())
    }

    /// Copies of the alarms due for a thread rendering `period`.
    pub fn alarms_with_period(&self, period: u32) -> Vec<AlarmRequest> {
        self.alarms.read().with_period(period).cloned().collect()
    }

    pub fn snapshot(&self) -> SortedAlarms {
        self.alarms.read().clone()
    }
}

#[derive(Debug)]
pub struct DisplayUpdater {
    buffer: Arc<BoundedBuffer<Handoff>>,
    display: Arc<DisplayList>,
    outbox: Outbox,
}

impl DisplayUpdater {
    #[must_use]
    pub const fn new(
        buffer: Arc<BoundedBuffer<Handoff>>,
        display: Arc<DisplayList>,
        outbox: Outbox,
    ) -> Self {
        Self {
            buffer,
            display,
            outbox,
        }
    }

    pub fn spawn(self) -> Result<JoinHandle<()>, EngineError> {
        thread::Builder::new()
            .name("display-updater".to_string())
            .spawn(move || self.run())
            .map_err(|e| EngineError::spawn("display updater", e))
    }

    /// Drains the buffer until it hands over [`Handoff::Closed`].
    pub fn run(self) {
        info!("display updater started");
        while let Handoff::Snapshot(snapshot) = self.buffer.pop() {
            post(&self.outbox, MessageType::Retrieved(snapshot.clone()));
            let (projection, listing) = self.display.apply(snapshot);
            for alarm in projection.removed {
                post(&self.outbox, MessageType::DisplayRemoved(alarm));
            }
            if let Some(alarm) = projection.inserted {
                post(&self.outbox, MessageType::DisplayInserted(alarm));
            }
            post(&self.outbox, MessageType::DisplayList(listing));
        }
        info!("display updater stopped");
    }
}
