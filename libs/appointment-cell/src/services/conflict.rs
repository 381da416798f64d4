use chrono::{Duration, NaiveDateTime};

use crate::models::Appointment;

pub const CONFLICT_WINDOW_MINUTES: i64 = 60;

/// Decides whether a candidate slot start collides with a patient's existing appointments.
///
/// Two starts conflict when they fall on the same calendar date and are strictly less than the
/// window apart. Dates are compared as written; slots either side of midnight never conflict.
#[derive(Debug, Clone, Copy)]
pub struct ConflictDetector {
    window: Duration,
}

impl Default for ConflictDetector {
    fn default() -> Self {
        Self::with_window_minutes(CONFLICT_WINDOW_MINUTES)
    }
}

impl ConflictDetector {
    pub fn with_window_minutes(minutes: i64) -> Self {
        Self {
            window: Duration::minutes(minutes),
        }
    }

    pub fn slots_conflict(&self, first: NaiveDateTime, second: NaiveDateTime) -> bool {
        if first.date() != second.date() {
            return false;
        }

        let gap = if first >= second {
            first - second
        } else {
            second - first
        };
        gap < self.window
    }

    pub fn has_conflict(&self, existing: &Appointment, candidate: NaiveDateTime) -> bool {
        self.slots_conflict(existing.appointment_date_time, candidate)
    }

    /// First existing appointment that conflicts with `candidate`, if any.
    pub fn find_conflict<'a>(
        &self,
        existing: &'a [Appointment],
        candidate: NaiveDateTime,
    ) -> Option<&'a Appointment> {
        existing.iter().find(|a| self.has_conflict(a, candidate))
    }

    /// Like [`find_conflict`](Self::find_conflict) but ignores the appointment being moved.
    pub fn find_conflict_excluding<'a>(
        &self,
        existing: &'a [Appointment],
        candidate: NaiveDateTime,
        exclude_id: &str,
    ) -> Option<&'a Appointment> {
        existing
            .iter()
            .filter(|a| a.id != exclude_id)
            .find(|a| self.has_conflict(a, candidate))
    }
}
