use serde::Serialize;

use tracing::debug;

use crate::attendance::{
    AttendanceBook, AttendanceKey, AttendanceMap, AttendanceStatus, AttendanceSummary, PendingWrite,
    SubjectIndex,
};
use crate::models::Attendee;
use crate::realtime::AttendanceUpdate;

/// Issued when an attendee is selected. Work started under an old ticket is
/// discarded once a newer selection exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub generation: u64,
    pub attendee: Attendee,
}

/// The attendance map of whoever is currently selected.
#[derive(Debug, Default)]
pub struct AttendanceBoard {
    generation: u64,
    selected: Option<Attendee>,
    book: AttendanceBook,
    subjects: SubjectIndex,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordView {
    pub key: AttendanceKey,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct BoardSnapshot {
    pub selected: Option<Attendee>,
    pub records: Vec<RecordView>,
    pub summary: AttendanceSummary,
}

impl AttendanceBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, attendee: Attendee) -> Ticket {
        self.generation += 1;
        self.selected = Some(attendee);
        self.book.clear();
        self.subjects.clear();
        Ticket {
            generation: self.generation,
            attendee,
        }
    }

    pub fn selected(&self) -> Option<Attendee> {
        self.selected
    }

    pub fn current_ticket(&self) -> Option<Ticket> {
        self.selected.map(|attendee| Ticket {
            generation: self.generation,
            attendee,
        })
    }

    /// The current ticket, if `attendee` is the one selected.
    pub fn ticket_for(&self, attendee: Attendee) -> Option<Ticket> {
        self.current_ticket().filter(|t| t.attendee == attendee)
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.generation == ticket.generation && self.selected == Some(ticket.attendee)
    }

    pub fn book(&self) -> &AttendanceBook {
        &self.book
    }

    /// Replaces the map and the schedule index with fetched ones, unless
    /// the fetch is stale.
    pub fn install(&mut self, ticket: &Ticket, records: AttendanceMap, subjects: SubjectIndex) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.book.replace_all(records);
        self.subjects = subjects;
        true
    }

    pub fn apply_speculative(
        &mut self,
        ticket: &Ticket,
        key: AttendanceKey,
        status: AttendanceStatus,
    ) -> Option<PendingWrite> {
        if !self.is_current(ticket) {
            return None;
        }
        Some(self.book.apply_speculative(key, status))
    }

    pub fn rollback(&mut self, ticket: &Ticket, pending: &PendingWrite) -> bool {
        self.is_current(ticket) && self.book.rollback(pending)
    }

    pub fn remove(&mut self, ticket: &Ticket, key: &AttendanceKey) -> bool {
        self.is_current(ticket) && self.book.remove(key).is_some()
    }

    /// Upserts a pushed status if it concerns the current selection.
    pub fn apply_push(&mut self, update: &AttendanceUpdate) -> bool {
        if self.selected != Some(update.attendee) {
            return false;
        }
        let Some(key) = self.resolve_key(update) else {
            debug!("dropping push for unknown schedule {:?}", update.schedule_id);
            return false;
        };
        self.book.upsert(key, update.status);
        true
    }

    /// Student pushes carry no subject. It is taken from a record already
    /// held for the same date and schedule, or else from the schedule index.
    fn resolve_key(&self, update: &AttendanceUpdate) -> Option<AttendanceKey> {
        if let Some(subject_id) = update.subject_id {
            return Some(AttendanceKey::new(update.date, subject_id, update.schedule_id));
        }
        let schedule_id = update.schedule_id?;
        let subject_id = self
            .book
            .records()
            .keys()
            .find(|k| k.date == update.date && k.schedule_id == Some(schedule_id))
            .map(|k| k.subject_id)
            .or_else(|| self.subjects.get(&schedule_id).copied())?;
        Some(AttendanceKey::new(update.date, subject_id, Some(schedule_id)))
    }

    pub fn summary(&self) -> AttendanceSummary {
        self.book.summary()
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            selected: self.selected,
            records: self
                .book
                .records()
                .iter()
                .map(|(key, status)| RecordView {
                    key: *key,
                    status: *status,
                })
                .collect(),
            summary: self.book.summary(),
        }
    }
}
