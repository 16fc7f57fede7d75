//! Weekly timetable logic: day spellings, slot resolution, overlap checks.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Timelike};
use serde::Serialize;

use crate::models::ScheduleEntry;

const SECONDS_PER_DAY: u32 = 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Day {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
}

/// Known spellings of each school day, as they show up in backend rows.
const DAY_ALIASES: [(Day, &[&str]); 5] = [
    (Day::Mon, &["MON", "Monday"]),
    (Day::Tue, &["TUE", "Tuesday"]),
    (Day::Wed, &["WED", "Wednesday"]),
    (Day::Thu, &["THU", "Thursday"]),
    (Day::Fri, &["FRI", "Friday"]),
];

impl Day {
    pub const WEEK: [Day; 5] = [Day::Mon, Day::Tue, Day::Wed, Day::Thu, Day::Fri];

    /// Case-insensitive lookup against the alias table.
    pub fn parse(raw: &str) -> Option<Day> {
        let raw = raw.trim();
        DAY_ALIASES
            .iter()
            .find(|(_, spellings)| spellings.iter().any(|s| s.eq_ignore_ascii_case(raw)))
            .map(|(day, _)| *day)
    }

    pub fn code(self) -> &'static str {
        match self {
            Day::Mon => "MON",
            Day::Tue => "TUE",
            Day::Wed => "WED",
            Day::Thu => "THU",
            Day::Fri => "FRI",
        }
    }
}

/// Parses `H:MM`, `HH:MM` or `HH:MM:SS`, padding missing parts with zeros.
pub fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    let mut parts = raw.trim().split(':');
    let hours: u32 = parts.next()?.trim().parse().ok()?;
    let minutes: u32 = match parts.next() {
        Some(m) => m.trim().parse().ok()?,
        None => 0,
    };
    let seconds: u32 = match parts.next() {
        Some(s) => s.trim().parse().ok()?,
        None => 0,
    };
    if parts.next().is_some() {
        return None;
    }
    NaiveTime::from_hms_opt(hours, minutes, seconds)
}

/// Half-open window in seconds from midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window {
    start: u32,
    end: u32,
}

impl Window {
    fn of_entry(entry: &ScheduleEntry) -> Option<Window> {
        let start = parse_time_of_day(&entry.start_time)?;
        let end = parse_time_of_day(&entry.end_time)?;
        Some(Window {
            start: start.num_seconds_from_midnight(),
            end: end.num_seconds_from_midnight(),
        })
    }

    fn of_slot(start: NaiveTime, width: Duration) -> Window {
        let start = start.num_seconds_from_midnight();
        let width = u32::try_from(width.num_seconds().max(0)).unwrap_or(SECONDS_PER_DAY);
        Window {
            start,
            end: start.saturating_add(width).min(SECONDS_PER_DAY),
        }
    }

    fn overlaps(self, other: Window) -> bool {
        (self.start >= other.start && self.start < other.end)
            || (self.end > other.start && self.end <= other.end)
            || (self.start <= other.start && self.end >= other.end)
    }
}

/// The fixed grid the timetable screens render.
#[derive(Debug, Clone)]
pub struct SlotGrid {
    pub days: Vec<Day>,
    pub slots: Vec<NaiveTime>,
    pub slot_width: Duration,
}

impl SlotGrid {
    pub fn with_width(slot_width: Duration) -> Self {
        Self {
            slot_width,
            ..Self::default()
        }
    }
}

impl Default for SlotGrid {
    fn default() -> Self {
        let slots = [8, 10, 12, 14, 16]
            .into_iter()
            .filter_map(|h| NaiveTime::from_hms_opt(h, 0, 0))
            .collect();
        Self {
            days: Day::WEEK.to_vec(),
            slots,
            slot_width: Duration::hours(2),
        }
    }
}

fn day_matches(entry: &ScheduleEntry, day: Day) -> bool {
    Day::parse(&entry.day) == Some(day)
}

/// Every entry on `day` whose interval overlaps the slot starting at
/// `slot_time`, ordered earliest start first, then lowest id.
pub fn resolve_all<'a>(
    entries: &'a [ScheduleEntry],
    day: Day,
    slot_time: NaiveTime,
    slot_width: Duration,
) -> Vec<&'a ScheduleEntry> {
    let slot = Window::of_slot(slot_time, slot_width);
    let mut hits: Vec<(Window, &ScheduleEntry)> = entries
        .iter()
        .filter(|e| day_matches(e, day))
        .filter_map(|e| Window::of_entry(e).map(|w| (w, e)))
        .filter(|(w, _)| w.overlaps(slot))
        .collect();
    hits.sort_by_key(|(w, e)| (w.start, e.id));
    hits.into_iter().map(|(_, e)| e).collect()
}

/// The entry shown in one grid cell. Double bookings resolve to the
/// earliest-starting entry, then the lowest id.
pub fn resolve_slot<'a>(
    entries: &'a [ScheduleEntry],
    day: Day,
    slot_time: NaiveTime,
    slot_width: Duration,
) -> Option<&'a ScheduleEntry> {
    resolve_all(entries, day, slot_time, slot_width)
        .into_iter()
        .next()
}

/// First existing entry on `day` that overlaps `[start, end)`, ignoring the
/// entry being edited.
pub fn find_conflict<'a>(
    entries: &'a [ScheduleEntry],
    day: Day,
    start: NaiveTime,
    end: NaiveTime,
    exclude_id: Option<i64>,
) -> Option<&'a ScheduleEntry> {
    let wanted = Window {
        start: start.num_seconds_from_midnight(),
        end: end.num_seconds_from_midnight(),
    };
    entries
        .iter()
        .filter(|e| Some(e.id) != exclude_id)
        .filter(|e| day_matches(e, day))
        .find(|e| Window::of_entry(e).is_some_and(|w| wanted.overlaps(w)))
}

/// Monday through Friday of the week containing `date`. Sunday belongs to
/// the week that started six days earlier.
pub fn week_dates(date: NaiveDate) -> [NaiveDate; 5] {
    let monday = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
    [0, 1, 2, 3, 4].map(|offset| monday + Duration::days(offset))
}

#[derive(Debug, Clone, Serialize)]
pub struct GridCell {
    pub day: Day,
    pub date: NaiveDate,
    pub slot: String,
    pub entry: Option<ScheduleEntry>,
    /// Other entries double-booked into the same cell.
    pub conflicts: Vec<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeekGrid {
    pub slot_width_minutes: i64,
    pub cells: Vec<GridCell>,
}

impl WeekGrid {
    pub fn cell(&self, day: Day, slot: &str) -> Option<&GridCell> {
        self.cells.iter().find(|c| c.day == day && c.slot == slot)
    }
}

/// Lays `entries` out over the week containing `week_of`.
pub fn build_week_grid(entries: &[ScheduleEntry], grid: &SlotGrid, week_of: NaiveDate) -> WeekGrid {
    let dates = week_dates(week_of);
    let mut cells = Vec::with_capacity(grid.days.len() * grid.slots.len());
    for day in &grid.days {
        for slot in &grid.slots {
            let mut hits = resolve_all(entries, *day, *slot, grid.slot_width).into_iter();
            let entry = hits.next().cloned();
            cells.push(GridCell {
                day: *day,
                date: dates[*day as usize],
                slot: slot.format("%H:%M").to_string(),
                entry,
                conflicts: hits.map(|e| e.id).collect(),
            });
        }
    }
    WeekGrid {
        slot_width_minutes: grid.slot_width.num_minutes(),
        cells,
    }
}
