use std::fmt;

use chrono::{DateTime, Local};

/// Size of an alarm's message buffer, terminator included.
pub const MESSAGE_CAPACITY: usize = 128;

/// Longest message an alarm carries, in bytes. Longer messages are truncated.
pub const MAX_MESSAGE_LEN: usize = MESSAGE_CAPACITY - 1;

/// What a request asks the engine to do with an alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlarmKind {
    Start,
    Change,
    Cancel,
}

impl fmt::Display for AlarmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Start => "Start_Alarm",
            Self::Change => "Change_Alarm",
            Self::Cancel => "Cancel_Alarm",
        })
    }
}

/// represents a single alarm request
/// the same value is used for the entry in the alarm list and, as a copy,
/// for the snapshot that travels to the display list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmRequest {
    pub id: u32,
    pub kind: AlarmKind,
    /// trigger period in seconds
    pub period: u32,
    pub message: String,
    pub created_at: DateTime<Local>,
    /// submission order, stamped by the alarm list
    pub(crate) seq: u64,
}

impl AlarmRequest {
    #[must_use]
    pub fn new(id: u32, kind: AlarmKind, period: u32, message: &str) -> Self {
        Self {
            id,
            kind,
            period,
            message: truncate_message(message).to_string(),
            created_at: Local::now(),
            seq: 0,
        }
    }

    /// a cancel carries no payload, the alarm list fills period and message in
    #[must_use]
    pub fn cancel(id: u32) -> Self {
        Self::new(id, AlarmKind::Cancel, 0, "")
    }

    /// Position of this request in submission order. Zero until the alarm
    /// list has accepted it.
    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.seq
    }
}

impl fmt::Display for AlarmRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Alarm_Request_Type {} Request({}): Time = {} Message = {}",
            self.kind, self.id, self.period, self.message
        )
    }
}

/// cuts `message` down to [`MAX_MESSAGE_LEN`] bytes without splitting a char
#[must_use]
pub fn truncate_message(message: &str) -> &str {
    if message.len() <= MAX_MESSAGE_LEN {
        return message;
    }
    let mut end = MAX_MESSAGE_LEN;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    &message[..end]
}
