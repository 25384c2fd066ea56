use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use tracing::debug;

use doctor_cell::Doctor;

use crate::models::{Appointment, AppointmentError, TimeSlot};

const MAX_GRANULARITY_MINUTES: i64 = 24 * 60;

/// Splits a doctor's open hours for one date into fixed-size slots.
#[derive(Debug, Clone, Copy)]
pub struct SlotGenerator {
    granularity: Duration,
}

impl SlotGenerator {
    /// `granularity_minutes` must be between 1 and a full day.
    pub fn new(granularity_minutes: i64) -> Result<Self, AppointmentError> {
        let granularity = (1..=MAX_GRANULARITY_MINUTES)
            .contains(&granularity_minutes)
            .then(|| Duration::try_minutes(granularity_minutes))
            .flatten()
            .ok_or_else(|| {
                AppointmentError::ValidationError(format!(
                    "Slot granularity must be between 1 and {} minutes, got {}",
                    MAX_GRANULARITY_MINUTES, granularity_minutes
                ))
            })?;

        Ok(Self { granularity })
    }

    /// Ordered slots for `date`. A slot is taken when its start falls inside an
    /// active booking; trailing partial slots are dropped.
    pub fn generate(&self, doctor: &Doctor, date: NaiveDate, bookings: &[Appointment]) -> Vec<TimeSlot> {
        if !doctor.is_bookable() {
            return Vec::new();
        }

        let mut slots: Vec<TimeSlot> = doctor
            .availability_model()
            .open_windows_on(date.weekday())
            .flat_map(|window| self.walk(window.start_time, window.end_time))
            .map(|(start, end)| TimeSlot {
                date,
                start_time: start,
                end_time: end,
                is_available: !Self::is_occupied(doctor, date, start, bookings),
            })
            .collect();

        slots.sort_by_key(|slot| slot.start_time);
        debug!("Generated {} slots for doctor {} on {}", slots.len(), doctor.id, date);
        slots
    }

    fn walk(&self, from: NaiveTime, until: NaiveTime) -> Vec<(NaiveTime, NaiveTime)> {
        let mut steps = Vec::new();
        let mut cursor = from;
        loop {
            let (next, wrapped) = cursor.overflowing_add_signed(self.granularity);
            if wrapped != 0 || next > until {
                break;
            }
            steps.push((cursor, next));
            cursor = next;
        }
        steps
    }

    fn is_occupied(doctor: &Doctor, date: NaiveDate, start: NaiveTime, bookings: &[Appointment]) -> bool {
        bookings.iter().any(|b| {
            b.doctor_id == doctor.id
                && b.window.date == date
                && b.blocks_schedule()
                && b.window.start <= start
                && b.window.end > start
        })
    }
}
