//! Per-day opening-hours records and the "open at instant" / "overlaps window"
//! evaluators. A POI whose record is absent or malformed is treated as always
//! open; an interval whose end is not after its start crosses midnight.

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeRange {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DayHours {
    pub day: String,
    #[serde(default)]
    pub hours: Vec<TimeRange>,
}

/// Ordered per-day entries as stored in the POI table's `open_hours` column.
/// An empty collection means "no data".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct OpeningHours(pub Vec<DayHours>);

/// Opening-hours summary for one calendar date, attached to arrival times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaySummary {
    pub day: String,
    pub date: String,
    pub is_open: bool,
    pub hours: Vec<TimeRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

pub fn day_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Parse "HH:MM" into minutes since midnight.
fn parse_minutes(s: &str) -> Option<u32> {
    let (h, m) = s.split_once(':')?;
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    if h > 23 || m > 59 {
        return None;
    }
    Some(h * 60 + m)
}

impl OpeningHours {
    pub fn is_absent(&self) -> bool {
        self.0.is_empty()
    }

    /// True when any interval fails to parse; such records fall back to the
    /// always-open policy rather than silently closing the POI.
    fn is_malformed(&self) -> bool {
        self.0.iter().any(|d| {
            d.hours
                .iter()
                .any(|r| parse_minutes(&r.start).is_none() || parse_minutes(&r.end).is_none())
        })
    }

    fn day_entry(&self, name: &str) -> Option<&DayHours> {
        self.0.iter().find(|d| d.day == name)
    }

    /// Is the POI open at instant `t`? Checks the intervals of t's day plus
    /// the previous day's overnight intervals reaching into t's early hours.
    pub fn is_open_at(&self, t: NaiveDateTime) -> bool {
        if self.is_absent() || self.is_malformed() {
            return true;
        }

        let minute = t.hour() * 60 + t.minute();

        if let Some(today) = self.day_entry(day_name(t.weekday())) {
            for range in &today.hours {
                let (start, end) = match (parse_minutes(&range.start), parse_minutes(&range.end)) {
                    (Some(s), Some(e)) => (s, e),
                    _ => return true,
                };
                if end > start {
                    if (start..=end).contains(&minute) {
                        return true;
                    }
                } else if minute >= start {
                    // interval runs past midnight; the early-morning half is
                    // handled below from the previous day's perspective
                    return true;
                }
            }
        }

        let prev_day = day_name(t.weekday().pred());
        if let Some(yesterday) = self.day_entry(prev_day) {
            for range in &yesterday.hours {
                let (start, end) = match (parse_minutes(&range.start), parse_minutes(&range.end)) {
                    (Some(s), Some(e)) => (s, e),
                    _ => return true,
                };
                if end <= start && minute <= end {
                    return true;
                }
            }
        }

        false
    }

    /// Does any open interval intersect `[a, b]`? Supports overnight
    /// intervals by extending them into the following date.
    pub fn overlaps_window(&self, a: NaiveDateTime, b: NaiveDateTime) -> bool {
        if self.is_absent() || self.is_malformed() {
            return true;
        }
        if b < a {
            return false;
        }

        let mut date = a.date();
        let end_date = b.date();

        while date <= end_date {
            if let Some(entry) = self.day_entry(day_name(date.weekday())) {
                for range in &entry.hours {
                    let (start, end) =
                        match (parse_minutes(&range.start), parse_minutes(&range.end)) {
                            (Some(s), Some(e)) => (s, e),
                            _ => return true,
                        };

                    let open = at_minute(date, start);
                    let close = if end > start {
                        at_minute(date, end)
                    } else {
                        at_minute(date + Days::new(1), end)
                    };

                    if a.max(open) < b.min(close) {
                        return true;
                    }
                }
            }
            date = match date.succ_opt() {
                Some(d) => d,
                None => break,
            };
        }

        false
    }

    /// Per-day summary used to annotate projected arrival times.
    pub fn summary_for_date(&self, date: NaiveDate) -> DaySummary {
        let name = day_name(date.weekday()).to_string();
        let date_str = date.format("%Y-%m-%d").to_string();

        if self.is_absent() || self.is_malformed() {
            return DaySummary {
                day: name,
                date: date_str,
                is_open: true,
                hours: vec![TimeRange {
                    start: "00:00".to_string(),
                    end: "23:59".to_string(),
                }],
                note: Some("No opening hours data (assumed always open)".to_string()),
            };
        }

        match self.day_entry(&name) {
            Some(entry) => DaySummary {
                day: name,
                date: date_str,
                is_open: !entry.hours.is_empty(),
                hours: entry.hours.clone(),
                note: None,
            },
            None => DaySummary {
                day: name,
                date: date_str,
                is_open: false,
                hours: vec![],
                note: None,
            },
        }
    }
}

fn at_minute(date: NaiveDate, minutes: u32) -> NaiveDateTime {
    date.and_hms_opt(minutes / 60, minutes % 60, 0)
        .expect("minutes since midnight are in range")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hours(entries: &[(&str, &[(&str, &str)])]) -> OpeningHours {
        OpeningHours(
            entries
                .iter()
                .map(|(day, ranges)| DayHours {
                    day: day.to_string(),
                    hours: ranges
                        .iter()
                        .map(|(s, e)| TimeRange {
                            start: s.to_string(),
                            end: e.to_string(),
                        })
                        .collect(),
                })
                .collect(),
        )
    }

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    // 2026-02-05 is a Thursday

    #[test]
    fn open_within_interval() {
        let h = hours(&[("Thursday", &[("08:00", "22:00")])]);
        assert!(h.is_open_at(dt("2026-02-05T08:00:00")));
        assert!(h.is_open_at(dt("2026-02-05T12:30:00")));
        assert!(h.is_open_at(dt("2026-02-05T22:00:00")));
        assert!(!h.is_open_at(dt("2026-02-05T07:30:00")));
        assert!(!h.is_open_at(dt("2026-02-05T22:01:00")));
    }

    #[test]
    fn closed_day_without_entry() {
        let h = hours(&[("Monday", &[("08:00", "22:00")])]);
        assert!(!h.is_open_at(dt("2026-02-05T12:00:00"))); // Thursday
    }

    #[test]
    fn empty_day_entry_means_closed() {
        let h = hours(&[("Thursday", &[])]);
        assert!(!h.is_open_at(dt("2026-02-05T12:00:00")));
    }

    #[test]
    fn absent_record_always_open() {
        let h = OpeningHours::default();
        assert!(h.is_open_at(dt("2026-02-05T03:00:00")));
        assert!(h.overlaps_window(dt("2026-02-05T03:00:00"), dt("2026-02-05T04:00:00")));
    }

    #[test]
    fn malformed_record_always_open() {
        let h = hours(&[("Thursday", &[("8am", "22:00")])]);
        assert!(h.is_open_at(dt("2026-02-05T03:00:00")));
    }

    #[test]
    fn overnight_interval_late_evening() {
        let h = hours(&[("Thursday", &[("22:00", "02:00")])]);
        assert!(h.is_open_at(dt("2026-02-05T23:30:00")));
        assert!(!h.is_open_at(dt("2026-02-05T12:00:00")));
    }

    #[test]
    fn overnight_interval_early_morning_next_day() {
        // Thursday 22:00-02:00 keeps the POI open Friday 01:00
        let h = hours(&[("Thursday", &[("22:00", "02:00")])]);
        assert!(h.is_open_at(dt("2026-02-06T01:00:00")));
        assert!(!h.is_open_at(dt("2026-02-06T03:00:00")));
    }

    #[test]
    fn twenty_four_hour_representation() {
        let h = hours(&[("Thursday", &[("00:00", "23:59")])]);
        assert!(h.is_open_at(dt("2026-02-05T00:00:00")));
        assert!(h.is_open_at(dt("2026-02-05T23:59:00")));
    }

    #[test]
    fn window_overlap_basic() {
        let h = hours(&[("Thursday", &[("08:00", "12:00")])]);
        assert!(h.overlaps_window(dt("2026-02-05T11:00:00"), dt("2026-02-05T14:00:00")));
        assert!(!h.overlaps_window(dt("2026-02-05T12:30:00"), dt("2026-02-05T14:00:00")));
    }

    #[test]
    fn window_overlap_spanning_days() {
        let h = hours(&[("Friday", &[("08:00", "12:00")])]);
        // Window starts Thursday evening, runs into Friday morning
        assert!(h.overlaps_window(dt("2026-02-05T20:00:00"), dt("2026-02-06T09:00:00")));
    }

    #[test]
    fn window_overlap_overnight_interval() {
        let h = hours(&[("Thursday", &[("22:00", "02:00")])]);
        assert!(h.overlaps_window(dt("2026-02-06T00:30:00"), dt("2026-02-06T01:30:00")));
    }

    #[test]
    fn summary_open_day() {
        let h = hours(&[("Thursday", &[("08:00", "22:00")])]);
        let s = h.summary_for_date(dt("2026-02-05T10:00:00").date());
        assert_eq!(s.day, "Thursday");
        assert_eq!(s.date, "2026-02-05");
        assert!(s.is_open);
        assert_eq!(s.hours.len(), 1);
        assert!(s.note.is_none());
    }

    #[test]
    fn summary_absent_record() {
        let h = OpeningHours::default();
        let s = h.summary_for_date(dt("2026-02-05T10:00:00").date());
        assert!(s.is_open);
        assert_eq!(s.hours[0].start, "00:00");
        assert!(s.note.is_some());
    }

    #[test]
    fn summary_missing_day_is_closed() {
        let h = hours(&[("Monday", &[("08:00", "22:00")])]);
        let s = h.summary_for_date(dt("2026-02-05T10:00:00").date());
        assert!(!s.is_open);
        assert!(s.hours.is_empty());
    }

    #[test]
    fn serde_shape_matches_store() {
        let json = r#"[{"day":"Monday","hours":[{"start":"08:00","end":"22:00"}]}]"#;
        let h: OpeningHours = serde_json::from_str(json).unwrap();
        assert_eq!(h.0[0].day, "Monday");
        assert_eq!(h.0[0].hours[0].end, "22:00");
        let back = serde_json::to_string(&h).unwrap();
        assert_eq!(back, json);
    }
}
