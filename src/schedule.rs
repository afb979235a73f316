//! Compiled schedule matchers and the next-firing-time computation.

use crate::bounds::STAR_BIT;
use crate::Timestamp;
use chrono::{Datelike, Days, Duration, Local, LocalResult, Months, TimeZone, Timelike};

/// A compiled schedule: either a cron field matcher or a fixed delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Bit-per-value masks over the six cron fields.
    Spec(SpecSchedule),
    /// A fixed delay from the reference instant.
    Every(EverySchedule),
}

impl Schedule {
    /// The soonest instant strictly after `after` that satisfies this
    /// schedule, at second granularity. `None` means the schedule will
    /// never fire (nothing matches within five years of `after`).
    pub fn next(&self, after: Timestamp) -> Option<Timestamp> {
        match self {
            Schedule::Spec(spec) => spec.next(after),
            Schedule::Every(every) => Some(every.next(after)),
        }
    }
}

/// Bitmask matcher over second, minute, hour, day-of-month, month and
/// day-of-week. A set bit at position `i` means value `i` matches; bit 63
/// records whether the source token was a bare `*`/`?`, which switches day
/// matching between conjunction and disjunction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecSchedule {
    pub second: u64,
    pub minute: u64,
    pub hour: u64,
    pub dom: u64,
    pub month: u64,
    pub dow: u64,
}

impl SpecSchedule {
    fn next(&self, after: Timestamp) -> Option<Timestamp> {
        // Work at second granularity, strictly after the reference instant.
        let mut t = (after + Duration::seconds(1)).with_nanosecond(0)?;
        let year_limit = t.year() + 5;

        // Set once per call: after the first advance the lower units have
        // already been normalized, so later fields must not truncate again.
        let mut advanced = false;

        while t.year() <= year_limit {
            let mut wrapped = false;

            while self.month & (1 << t.month()) == 0 {
                if !advanced {
                    advanced = true;
                    t = local_midnight(t.year(), t.month(), 1)?;
                }
                t = t.checked_add_months(Months::new(1))?;
                if t.month() == 1 {
                    wrapped = true;
                }
            }
            if wrapped {
                continue;
            }

            while !self.day_matches(&t) {
                if !advanced {
                    advanced = true;
                    t = local_midnight(t.year(), t.month(), t.day())?;
                }
                t = t.checked_add_days(Days::new(1))?;
                if t.day() == 1 {
                    wrapped = true;
                }
            }
            if wrapped {
                continue;
            }

            while self.hour & (1 << t.hour()) == 0 {
                if !advanced {
                    advanced = true;
                    t = t.with_minute(0)?.with_second(0)?;
                }
                t = t + Duration::hours(1);
                if t.hour() == 0 {
                    wrapped = true;
                }
            }
            if wrapped {
                continue;
            }

            while self.minute & (1 << t.minute()) == 0 {
                if !advanced {
                    advanced = true;
                    t = t.with_second(0)?;
                }
                t = t + Duration::minutes(1);
                if t.minute() == 0 {
                    wrapped = true;
                }
            }
            if wrapped {
                continue;
            }

            while self.second & (1 << t.second()) == 0 {
                advanced = true;
                t = t + Duration::seconds(1);
                if t.second() == 0 {
                    wrapped = true;
                }
            }
            if wrapped {
                continue;
            }

            return Some(t);
        }
        None
    }

    /// With a star on either day field the two constraints are a
    /// conjunction; with both restricted, classical cron fires on either.
    fn day_matches(&self, t: &Timestamp) -> bool {
        let dom_match = self.dom & (1 << t.day()) > 0;
        let dow_match = self.dow & (1 << t.weekday().num_days_from_sunday()) > 0;
        if self.dom & STAR_BIT > 0 || self.dow & STAR_BIT > 0 {
            dom_match && dow_match
        } else {
            dom_match || dow_match
        }
    }
}

/// Local midnight of the given date. A DST fold resolves to the earlier
/// instant; a nonexistent local time reports as unschedulable.
fn local_midnight(year: i32, month: u32, day: u32) -> Option<Timestamp> {
    match Local.with_ymd_and_hms(year, month, day, 0, 0, 0) {
        LocalResult::Single(t) => Some(t),
        LocalResult::Ambiguous(earlier, _) => Some(earlier),
        LocalResult::None => None,
    }
}

/// Fires a fixed delay after the reference instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EverySchedule {
    delay: Duration,
}

impl EverySchedule {
    /// Delays are truncated to whole seconds and never drop below one
    /// second.
    pub fn new(delay: Duration) -> Self {
        let delay = if delay < Duration::seconds(1) {
            Duration::seconds(1)
        } else {
            Duration::seconds(delay.num_seconds())
        };
        EverySchedule { delay }
    }

    fn next(&self, after: Timestamp) -> Timestamp {
        let t = after + self.delay;
        t.with_nanosecond(0).unwrap_or(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{ParseOptions, Parser, SpecParser};
    use pretty_assertions::assert_eq;

    fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> Timestamp {
        Local.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    fn parse_all(spec: &str) -> Schedule {
        SpecParser::new(ParseOptions::ALL).parse(spec).unwrap()
    }

    fn walk(schedule: &Schedule, from: Timestamp, steps: usize) -> Vec<Timestamp> {
        let mut out = Vec::with_capacity(steps);
        let mut t = from;
        for _ in 0..steps {
            t = schedule.next(t).unwrap();
            out.push(t);
        }
        out
    }

    #[test]
    fn both_day_fields_restricted_fire_on_either() {
        let schedule = parse_all("0 30 8 3-5 * 0");
        assert_eq!(
            walk(&schedule, local(2021, 6, 1, 12, 0, 0), 7),
            vec![
                local(2021, 6, 3, 8, 30, 0),
                local(2021, 6, 4, 8, 30, 0),
                local(2021, 6, 5, 8, 30, 0),
                local(2021, 6, 6, 8, 30, 0),
                local(2021, 6, 13, 8, 30, 0),
                local(2021, 6, 20, 8, 30, 0),
                local(2021, 6, 27, 8, 30, 0),
            ]
        );
    }

    #[test]
    fn every_truncates_to_whole_seconds() {
        let schedule = SpecParser::default().parse("@every 5s60ms").unwrap();
        let expected: Vec<Timestamp> = (1..=8)
            .map(|i| local(2021, 6, 1, 12, 0, 5 * i))
            .collect();
        assert_eq!(walk(&schedule, local(2021, 6, 1, 12, 0, 0), 8), expected);
    }

    #[test]
    fn hourly_snaps_to_top_of_hour() {
        let schedule = SpecParser::default().parse("@hourly").unwrap();
        assert_eq!(
            schedule.next(local(2021, 6, 1, 12, 34, 56)),
            Some(local(2021, 6, 1, 13, 0, 0))
        );
    }

    #[test]
    fn yearly_fires_on_new_year() {
        let schedule = SpecParser::default().parse("@yearly").unwrap();
        assert_eq!(
            schedule.next(local(2021, 6, 1, 12, 0, 0)),
            Some(local(2022, 1, 1, 0, 0, 0))
        );
    }

    #[test]
    fn leap_day_found_within_guard() {
        let schedule = parse_all("0 0 0 29 2 *");
        assert_eq!(
            schedule.next(local(2020, 3, 1, 0, 0, 0)),
            Some(local(2024, 2, 29, 0, 0, 0))
        );
        assert_eq!(
            schedule.next(local(2021, 1, 1, 0, 0, 0)),
            Some(local(2024, 2, 29, 0, 0, 0))
        );
    }

    #[test]
    fn impossible_spec_reports_never() {
        // February 30th, with the weekday unrestricted: the conjunction can
        // never hold, and the five-year guard gives up.
        let schedule = parse_all("0 0 0 30 2 *");
        assert_eq!(schedule.next(local(2021, 6, 1, 12, 0, 0)), None);
    }

    #[test]
    fn single_star_day_field_is_a_conjunction() {
        // Day-of-month unrestricted, Sundays only.
        let schedule = parse_all("0 0 12 * * 0");
        assert_eq!(
            walk(&schedule, local(2021, 6, 1, 0, 0, 0), 3),
            vec![
                local(2021, 6, 6, 12, 0, 0),
                local(2021, 6, 13, 12, 0, 0),
                local(2021, 6, 20, 12, 0, 0),
            ]
        );
    }

    #[test]
    fn next_is_strictly_after_matching_instant() {
        let schedule = parse_all("0 30 8 * * *");
        let t = local(2021, 6, 1, 8, 30, 0);
        assert_eq!(schedule.next(t), Some(local(2021, 6, 2, 8, 30, 0)));
    }
}
