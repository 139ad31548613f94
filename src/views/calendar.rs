//! Calendar projection: dated notes by day, with a lane layout for
//! timed entries so overlaps render side by side.

use chrono::{Datelike, NaiveDate, Timelike};
use serde::Serialize;

use crate::note::Note;

/// Length used when a timed note has no end time.
pub const DEFAULT_SLOT_MINUTES: u32 = 60;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// A timed note placed on the day timeline.
#[derive(Debug, Clone, Serialize)]
pub struct TimelineEntry {
    pub note: Note,
    /// Minutes after midnight.
    pub start_minute: u32,
    pub end_minute: u32,
    /// Horizontal lane; entries in the same lane never overlap.
    pub lane: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    /// Dated notes without a start time.
    pub all_day: Vec<Note>,
    /// Notes with a start time, sorted by start then end.
    pub timed: Vec<TimelineEntry>,
}

fn calendar_eligible(note: &Note) -> bool {
    note.due_date.is_some() && !note.archived && !note.trashed
}

/// Group every dated, non-archived, non-trashed note by due date,
/// days ascending.
pub fn build_calendar(notes: &[Note]) -> Vec<CalendarDay> {
    let mut dates: Vec<NaiveDate> = notes
        .iter()
        .filter(|n| calendar_eligible(n))
        .filter_map(|n| n.due_date)
        .collect();
    dates.sort();
    dates.dedup();

    dates
        .into_iter()
        .map(|date| build_day(notes, date))
        .collect()
}

/// The days of one month that carry notes.
pub fn month_view(notes: &[Note], year: i32, month: u32) -> Vec<CalendarDay> {
    build_calendar(notes)
        .into_iter()
        .filter(|day| day.date.year() == year && day.date.month() == month)
        .collect()
}

/// A single day, empty when nothing is due.
pub fn day_view(notes: &[Note], date: NaiveDate) -> CalendarDay {
    build_day(notes, date)
}

fn build_day(notes: &[Note], date: NaiveDate) -> CalendarDay {
    let of_day: Vec<&Note> = notes
        .iter()
        .filter(|n| calendar_eligible(n) && n.due_date == Some(date))
        .collect();

    let mut all_day: Vec<Note> = of_day
        .iter()
        .filter(|n| n.start_time.is_none())
        .map(|n| (*n).clone())
        .collect();
    all_day.sort_by(|a, b| {
        a.order
            .cmp(&b.order)
            .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
    });

    let mut spans: Vec<(u32, u32, Note)> = of_day
        .iter()
        .filter_map(|n| {
            let start = n.start_time?;
            let start_minute = start.hour() * 60 + start.minute();
            let end_minute = match n.end_time {
                Some(end) => {
                    let m = end.hour() * 60 + end.minute();
                    // A zero or inverted span still renders as one slot.
                    if m > start_minute {
                        m
                    } else {
                        start_minute + DEFAULT_SLOT_MINUTES
                    }
                }
                None => start_minute + DEFAULT_SLOT_MINUTES,
            };
            Some((start_minute, end_minute.min(MINUTES_PER_DAY), (*n).clone()))
        })
        .collect();
    spans.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    // Greedy lane assignment: first lane whose previous entry has ended.
    let mut lane_ends: Vec<u32> = Vec::new();
    let timed = spans
        .into_iter()
        .map(|(start_minute, end_minute, note)| {
            let lane = match lane_ends.iter().position(|end| *end <= start_minute) {
                Some(lane) => {
                    lane_ends[lane] = end_minute;
                    lane
                }
                None => {
                    lane_ends.push(end_minute);
                    lane_ends.len() - 1
                }
            };
            TimelineEntry {
                note,
                start_minute,
                end_minute,
                lane,
            }
        })
        .collect();

    CalendarDay {
        date,
        all_day,
        timed,
    }
}
