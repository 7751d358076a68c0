//! Messages the engine's threads send to whoever prints the console.
//!
//! Every accepted transition becomes one [`Message`]. The engine only ever
//! sends; rendering and writing the text is left to the receiver, usually a
//! [`Console`].

use std::{
    io::{self, Write},
    sync::mpsc::Sender,
};

use chrono::{DateTime, Local};

use crate::{
    alarm::AlarmRequest,
    config::Config,
    error::{EngineError, SubmitError},
    list::SortedAlarms,
};

/// Sending half the engine writes its messages to.
pub type Outbox = Sender<Message>;

#[derive(Debug, Clone)]
pub struct Message {
    pub kind: MessageType,
    pub at: DateTime<Local>,
}

impl Message {
    #[must_use]
    pub fn new(kind: MessageType) -> Self {
        Self {
            kind,
            at: Local::now(),
        }
    }

    /// One console line, timestamps rendered with `time_format`
    /// (a chrono strftime string).
    #[must_use]
    pub fn render(&self, time_format: &str) -> String {
        let at = self.at.format(time_format);
        match &self.kind {
            MessageType::BadCommand => "Bad command".to_string(),
            MessageType::Rejected(reason) => reason.to_string(),
            MessageType::Inserted(alarm) => format!(
                "Main Thread has Inserted {} into Alarm List",
                request_at(alarm, &at)
            ),
            MessageType::PeriodThreadCreated { thread, period } => format!(
                "Alarm Thread Created New Periodic Display Thread ({thread}) For Alarm Time = {period} at {at}"
            ),
            MessageType::PeriodThreadRetired { thread, period } => format!(
                "Alarm Thread Retired Periodic Display Thread ({thread}) For Alarm Time = {period} at {at}"
            ),
            MessageType::Removed(alarm) => format!(
                "Alarm Thread has Removed {} from Alarm List",
                request_at(alarm, &at)
            ),
            MessageType::Forwarded(alarm) => format!(
                "Alarm Thread has Forwarded {} into Circular Buffer",
                request_at(alarm, &at)
            ),
            MessageType::Retrieved(alarm) => format!(
                "Consumer Thread has Retrieved {} from Circular Buffer",
                request_at(alarm, &at)
            ),
            MessageType::DisplayInserted(alarm) => format!(
                "Consumer Thread has Inserted {} into Alarm Display List",
                request_at(alarm, &at)
            ),
            MessageType::DisplayRemoved(alarm) => format!(
                "Consumer Thread has Removed {} from Alarm Display List",
                request_at(alarm, &at)
            ),
            MessageType::Printed { thread, alarm } => format!(
                "Alarm({}) Printed by Periodic Display Thread ({thread}) at {at}: Time = {} Message = {}",
                alarm.id, alarm.period, alarm.message
            ),
            MessageType::AlarmList(list) => format!("Alarm List: {list}"),
            MessageType::DisplayList(list) => format!("Alarm Display List: {list}"),
            MessageType::Fatal(reason) => format!("Fatal error: {reason}"),
            MessageType::Prompt => String::new(),
        }
    }
}

fn request_at(alarm: &AlarmRequest, at: &impl std::fmt::Display) -> String {
    format!(
        "Alarm_Request_Type {} Request({}) at {at}: Time = {} Message = {}",
        alarm.kind, alarm.id, alarm.period, alarm.message
    )
}

#[derive(Debug, Clone)]
pub enum MessageType {
    /// input matched none of the command grammars
    BadCommand,
    Rejected(SubmitError),
    Inserted(AlarmRequest),
    PeriodThreadCreated {
        thread: u32,
        period: u32,
    },
    PeriodThreadRetired {
        thread: u32,
        period: u32,
    },
    /// dropped from the alarm list by a change or cancel
    Removed(AlarmRequest),
    Forwarded(AlarmRequest),
    Retrieved(AlarmRequest),
    DisplayInserted(AlarmRequest),
    DisplayRemoved(AlarmRequest),
    /// periodic rendering of an alarm
    Printed {
        thread: u32,
        alarm: AlarmRequest,
    },
    AlarmList(SortedAlarms),
    DisplayList(SortedAlarms),
    Fatal(String),
    /// the input loop is waiting for the next command line
    Prompt,
}

impl MessageType {
    /// Whole-list dumps, only shown when asked for.
    #[must_use]
    pub const fn is_listing(&self) -> bool {
        matches!(self, Self::AlarmList(_) | Self::DisplayList(_))
    }

    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }

    /// The direct answer to a command line, sent before the next prompt.
    #[must_use]
    pub const fn is_reply(&self) -> bool {
        matches!(self, Self::BadCommand | Self::Rejected(_) | Self::Inserted(_))
    }
}

impl From<&EngineError> for MessageType {
    fn from(error: &EngineError) -> Self {
        Self::Fatal(error.to_string())
    }
}

/// Sends `kind`, ignoring a receiver that has gone away: losing console
/// output must never stall the engine.
pub(crate) fn post(outbox: &Outbox, kind: MessageType) {
    if outbox.send(Message::new(kind)).is_err() {
        log::trace!("console receiver dropped, message discarded");
    }
}

/// Writes messages and the input prompt to one writer.
///
/// Output from background threads can arrive while the prompt waits for
/// input. Such a line gets a line of its own and the prompt is repeated
/// after it.
#[derive(Debug)]
pub struct Console<W> {
    out: W,
    config: Config,
    at_prompt: bool,
}

impl<W: Write> Console<W> {
    pub fn new(out: W, config: Config) -> Self {
        Self {
            out,
            config,
            at_prompt: false,
        }
    }

    pub fn show(&mut self, message: &Message) -> io::Result<()> {
        if matches!(message.kind, MessageType::Prompt) {
            self.at_prompt = true;
            write!(self.out, "{}", self.config.prompt)?;
            return self.out.flush();
        }
        if message.kind.is_reply() {
            // the user's newline already ended the prompt line
            self.at_prompt = false;
        }
        if message.kind.is_listing() && !self.config.show_lists {
            return Ok(());
        }
        if self.at_prompt {
            writeln!(self.out)?;
        }
        writeln!(self.out, "{}", message.render(&self.config.time_format))?;
        if self.at_prompt {
            write!(self.out, "{}", self.config.prompt)?;
        }
        self.out.flush()
    }
}
