#![warn(clippy::pedantic, clippy::nursery, clippy::cargo)]
#![deny(clippy::use_self, rust_2018_idioms)]
#![allow(clippy::multiple_crate_versions, clippy::module_name_repetitions)]

//! A threaded engine for periodic alarms driven by text commands.
//!
//! ```text
//! input -> parser -> AlarmList -> Coordinator -> BoundedBuffer -> DisplayUpdater
//!                                     |                                 |
//!                               PeriodRegistry                     DisplayList
//!                                     '--- periodic display threads ---'
//! ```
//!
//! [`Engine`] wires the pieces together and owns the worker threads.

use std::{sync::Arc, thread::JoinHandle};

use log::{info, warn};
use parking_lot::Mutex;

pub mod alarm;
pub mod alarm_list;
pub mod buffer;
pub mod communication;
pub mod config;
pub mod coordinator;
pub mod display;
pub mod error;
pub mod list;
pub mod parser;
pub mod period;
pub mod sync;

use alarm::AlarmRequest;
use alarm_list::AlarmList;
use buffer::{BoundedBuffer, BUFFER_CAPACITY};
use communication::{post, MessageType, Outbox};
use coordinator::Coordinator;
use display::{DisplayList, DisplayUpdater, Handoff};
use error::{EngineError, SubmitError};
use list::SortedAlarms;
use period::PeriodRegistry;

/// The running pipeline: alarm coordinator, display updater and the
/// periodic display threads they manage.
///
/// Call [`shutdown`](Self::shutdown) to stop it; dropping an engine leaves
/// its threads running until the process exits.
#[derive(Debug)]
pub struct Engine {
    list: Arc<AlarmList>,
    display: Arc<DisplayList>,
    registry: Arc<Mutex<PeriodRegistry>>,
    outbox: Outbox,
    coordinator: JoinHandle<Result<(), EngineError>>,
    updater: JoinHandle<()>,
}

impl Engine {
    /// Spawns the worker threads. Console messages go to `outbox`.
    pub fn start(outbox: Outbox) -> Result<Self, EngineError> {
        let list = Arc::new(AlarmList::new());
        let buffer = Arc::new(BoundedBuffer::<Handoff>::new(BUFFER_CAPACITY));
        let display = Arc::new(DisplayList::new());
        let registry = Arc::new(Mutex::new(PeriodRegistry::new(
            Arc::clone(&display),
            outbox.clone(),
        )));

        let updater =
            DisplayUpdater::new(Arc::clone(&buffer), Arc::clone(&display), outbox.clone())
                .spawn()?;
        let coordinator = match Coordinator::new(
            Arc::clone(&list),
            Arc::clone(&buffer),
            Arc::clone(&registry),
            outbox.clone(),
        )
        .spawn()
        {
            Ok(coordinator) => coordinator,
            Err(e) => {
                buffer.push(Handoff::Closed);
                if updater.join().is_err() {
                    warn!("display updater panicked while unwinding a failed start");
                }
                return Err(e);
            }
        };
        info!("engine started");

        Ok(Self {
            list,
            display,
            registry,
            outbox,
            coordinator,
            updater,
        })
    }

    /// Hands a parsed request to the alarm list. Acceptance and rejection
    /// are both reported to the outbox as well.
    pub fn submit(&self, request: AlarmRequest) -> Result<(), SubmitError> {
        match self.list.submit(request) {
            Ok(accepted) => {
                post(&self.outbox, MessageType::Inserted(accepted));
                Ok(())
            }
            Err(reason) => {
                warn!("rejected request: {reason}");
                post(&self.outbox, MessageType::Rejected(reason));
                Err(reason)
            }
        }
    }

    /// Blocks until the coordinator has processed every accepted request.
    pub fn wait_settled(&self) {
        self.list.wait_settled();
    }

    pub fn alarms(&self) -> SortedAlarms {
        self.list.snapshot()
    }

    pub fn display_alarms(&self) -> SortedAlarms {
        self.display.snapshot()
    }

    /// Periods that currently have a periodic display thread.
    pub fn active_periods(&self) -> Vec<u32> {
        self.registry.lock().periods()
    }

    /// Closes the alarm list, lets the coordinator process what is pending,
    /// stops every periodic display thread and joins the workers.
    pub fn shutdown(self) -> Result<(), EngineError> {
        info!("engine shutting down");
        self.list.close();
        let coordinator = self
            .coordinator
            .join()
            .map_err(|_| EngineError::ThreadPanicked("alarm coordinator".to_string()))?;
        self.updater
            .join()
            .map_err(|_| EngineError::ThreadPanicked("display updater".to_string()))?;
        coordinator
    }
}
