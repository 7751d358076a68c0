use std::{collections::BTreeSet, fmt};

use crate::alarm::{AlarmKind, AlarmRequest};

/// Alarms kept in ascending order of their trigger period.
///
/// Both the alarm list and the display list are one of these behind their
/// own lock. Equal periods keep insertion order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SortedAlarms {
    alarms: Vec<AlarmRequest>,
}

/// What [`SortedAlarms::project`] did to the list.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Projection {
    pub inserted: Option<AlarmRequest>,
    pub removed: Vec<AlarmRequest>,
}

impl SortedAlarms {
    #[must_use]
    pub const fn new() -> Self {
        Self { alarms: Vec::new() }
    }

    /// Inserts before the first alarm with a strictly greater period and
    /// returns the position.
    pub fn insert(&mut self, alarm: AlarmRequest) -> usize {
        let position = self
            .alarms
            .iter()
            .position(|existing| alarm.period < existing.period)
            .unwrap_or(self.alarms.len());
        self.alarms.insert(position, alarm);
        position
    }

    /// most recently submitted entry carrying `id`
    pub fn newest(&self, id: u32) -> Option<&AlarmRequest> {
        self.alarms
            .iter()
            .filter(|alarm| alarm.id == id)
            .max_by_key(|alarm| alarm.seq)
    }

    pub fn find_sequence(&self, seq: u64) -> Option<&AlarmRequest> {
        self.alarms.iter().find(|alarm| alarm.seq == seq)
    }

    pub fn count_id(&self, id: u32) -> usize {
        self.alarms.iter().filter(|alarm| alarm.id == id).count()
    }

    pub fn contains_period(&self, period: u32) -> bool {
        self.alarms.iter().any(|alarm| alarm.period == period)
    }

    /// Removes every entry with `id` except the one stamped `keep`.
    pub fn remove_id_except(&mut self, id: u32, keep: Option<u64>) -> Vec<AlarmRequest> {
        let (removed, kept) = std::mem::take(&mut self.alarms)
            .into_iter()
            .partition(|alarm| alarm.id == id && Some(alarm.seq) != keep);
        self.alarms = kept;
        removed
    }

    pub fn remove_id(&mut self, id: u32) -> Vec<AlarmRequest> {
        self.remove_id_except(id, None)
    }

    /// Periods among `candidates` no entry uses anymore.
    pub fn unused_periods(&self, candidates: impl IntoIterator<Item = u32>) -> BTreeSet<u32> {
        candidates
            .into_iter()
            .filter(|&period| !self.contains_period(period))
            .collect()
    }

    pub fn with_period(&self, period: u32) -> impl Iterator<Item = &AlarmRequest> {
        self.alarms.iter().filter(move |alarm| alarm.period == period)
    }

    /// Applies a snapshot the way the display list wants it: a start adds
    /// the alarm, a change replaces every entry with the same id, a cancel
    /// drops them.
    pub fn project(&mut self, snapshot: AlarmRequest) -> Projection {
        match snapshot.kind {
            AlarmKind::Start => {
                self.insert(snapshot.clone());
                Projection {
                    inserted: Some(snapshot),
                    removed: Vec::new(),
                }
            }
            AlarmKind::Change => {
                let removed = self.remove_id(snapshot.id);
                self.insert(snapshot.clone());
                Projection {
                    inserted: Some(snapshot),
                    removed,
                }
            }
            AlarmKind::Cancel => Projection {
                inserted: None,
                removed: self.remove_id(snapshot.id),
            },
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AlarmRequest> {
        self.alarms.iter()
    }

    pub fn len(&self) -> usize {
        self.alarms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alarms.is_empty()
    }

    pub fn is_sorted(&self) -> bool {
        self.alarms.windows(2).all(|pair| pair[0].period <= pair[1].period)
    }
}

impl<'a> IntoIterator for &'a SortedAlarms {
    type Item = &'a AlarmRequest;
    type IntoIter = std::slice::Iter<'a, AlarmRequest>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// renders as `[Start_Alarm(1): 5 wake up, ...]`
impl fmt::Display for SortedAlarms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, alarm) in self.alarms.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}({}): {} {}", alarm.kind, alarm.id, alarm.period, alarm.message)?;
        }
        f.write_str("]")
    }
}
