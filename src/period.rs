//! Periodic display threads, one per trigger period in use.
//!
//! Each thread wakes up every `period` seconds, takes reader access to the
//! display list and reports the alarms sharing its period. The
//! [`PeriodRegistry`] owns the threads: retiring a period raises the
//! thread's [`StopSignal`] and joins it.

use std::{
    collections::BTreeMap,
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

use log::{debug, info};

use crate::{
    communication::{post, MessageType, Outbox},
    display::DisplayList,
    error::EngineError,
    sync::StopSignal,
};

/// How often a thread for `period` renders. A zero period renders every
/// second rather than spinning.
#[must_use]
pub fn cadence(period: u32) -> Duration {
    Duration::from_secs(u64::from(period.max(1)))
}

#[derive(Debug)]
struct PeriodThread {
    number: u32,
    stop: Arc<StopSignal>,
    handle: JoinHandle<()>,
}

#[derive(Debug)]
pub struct PeriodRegistry {
    threads: BTreeMap<u32, PeriodThread>,
    next_number: u32,
    display: Arc<DisplayList>,
    outbox: Outbox,
}

impl PeriodRegistry {
    #[must_use]
    pub const fn new(display: Arc<DisplayList>, outbox: Outbox) -> Self {
        Self {
            threads: BTreeMap::new(),
            next_number: 1,
            display,
            outbox,
        }
    }

    /// Starts a thread for `period` unless one is already running. Returns
    /// the new thread's number.
    pub fn ensure(&mut self, period: u32) -> Result<Option<u32>, EngineError> {
        if self.threads.contains_key(&period) {
            return Ok(None);
        }
        let number = self.next_number;
        let stop = Arc::new(StopSignal::new());
        let handle = {
            let stop = Arc::clone(&stop);
            let display = Arc::clone(&self.display);
            let outbox = self.outbox.clone();
            thread::Builder::new()
                .name(format!("period-{period}"))
                .spawn(move || run(number, period, &display, &stop, &outbox))
                .map_err(|e| EngineError::spawn(format!("periodic display ({period}s)"), e))?
        };
        self.next_number += 1;
        self.threads.insert(
            period,
            PeriodThread {
                number,
                stop,
                handle,
            },
        );
        info!("started periodic display thread {number} for period {period}");
        Ok(Some(number))
    }

    /// Stops and joins the thread for `period`. Returns its number if there
    /// was one.
    pub fn retire(&mut self, period: u32) -> Result<Option<u32>, EngineError> {
        let Some(thread) = self.threads.remove(&period) else {
            return Ok(None);
        };
        thread.stop.stop();
        thread
            .handle
            .join()
            .map_err(|_| EngineError::ThreadPanicked(format!("periodic display ({period}s)")))?;
        info!(
            "retired periodic display thread {} for period {period}",
            thread.number
        );
        Ok(Some(thread.number))
    }

    /// Retires every thread, returning `(number, period)` of each.
    pub fn retire_all(&mut self) -> Result<Vec<(u32, u32)>, EngineError> {
        let periods: Vec<u32> = self.threads.keys().copied().collect();
        let mut retired = Vec::with_capacity(periods.len());
        for period in periods {
            if let Some(number) = self.retire(period)? {
                retired.push((number, period));
            }
        }
        Ok(retired)
    }

    pub fn periods(&self) -> Vec<u32> {
        self.threads.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }
}

fn run(number: u32, period: u32, display: &DisplayList, stop: &StopSignal, outbox: &Outbox) {
    debug!("periodic display thread {number} running every {period}s");
    let cadence = cadence(period);
    while !stop.wait_timeout(cadence) {
        for alarm in display.alarms_with_period(period) {
            post(
                outbox,
                MessageType::Printed {
                    thread: number,
                    alarm,
                },
            );
        }
    }
    debug!("periodic display thread {number} stopped");
}
