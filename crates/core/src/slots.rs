//! # Slot Lattice
//!
//! A template's operating window `[day_start, day_end)` is cut into
//! consecutive slots of `slot_minutes`. The lattice is the backbone of both
//! availability snapshots and booking validation: appointments may only start
//! and end on lattice boundaries.

use chrono::{Duration, NaiveDate, NaiveTime};

use crate::models::{
    template::{RemainderPolicy, WorkingHoursTemplate},
    time_slot::{Interval, TimeSlot},
};

/// Ordered lattice boundaries of a template, starting at `day_start`.
///
/// The final boundary is `day_end` when the window divides evenly or the
/// template keeps a partial tail slot; otherwise it is the last full slot end.
/// Invalid templates produce no boundaries.
pub fn boundaries(template: &WorkingHoursTemplate) -> Vec<NaiveTime> {
    let window = template.window_seconds();
    let step = template.slot_seconds();
    if window <= 0 || step <= 0 {
        return Vec::new();
    }

    let full_slots = window / step;
    let mut points: Vec<NaiveTime> = (0..=full_slots)
        .map(|k| template.day_start + Duration::seconds(k * step))
        .collect();

    if window % step != 0 && template.remainder == RemainderPolicy::PartialSlot {
        points.push(template.day_end);
    }

    points
}

/// Produces the day's slot lattice for `date`, every slot marked available.
///
/// The result tiles the window with no gaps or overlaps. Blackout dates yield
/// an empty lattice.
pub fn generate_slots(template: &WorkingHoursTemplate, date: NaiveDate) -> Vec<TimeSlot> {
    if template.is_blackout(date) {
        return Vec::new();
    }

    boundaries(template)
        .windows(2)
        .map(|pair| TimeSlot {
            start_time: pair[0],
            end_time: pair[1],
            available: true,
        })
        .collect()
}

/// True iff `start < end` and both fall on the template's slot boundaries,
/// i.e. the interval spans a whole number of lattice slots.
pub fn is_aligned(start: NaiveTime, end: NaiveTime, template: &WorkingHoursTemplate) -> bool {
    if start >= end {
        return false;
    }

    let points = boundaries(template);
    points.binary_search(&start).is_ok() && points.binary_search(&end).is_ok()
}

/// Start times of the lattice slots an aligned interval covers.
pub fn covered_slot_starts(template: &WorkingHoursTemplate, interval: &Interval) -> Vec<NaiveTime> {
    boundaries(template)
        .windows(2)
        .filter(|pair| interval.start_time <= pair[0] && pair[1] <= interval.end_time)
        .map(|pair| pair[0])
        .collect()
}
