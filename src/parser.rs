//! Compiles textual schedule expressions into [`Schedule`] matchers.

use crate::bounds::{bits, Bounds, STAR_BIT};
use crate::error::{Error, Result};
use crate::schedule::{EverySchedule, Schedule, SpecSchedule};
use chrono::Duration;

/// The set of fields a parser accepts, as a bitmask of flags.
///
/// Enabled positional fields are consumed left to right from the expression;
/// disabled ones take their defaults (`0` for the time-of-day fields, `*`
/// for the calendar fields).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions(u8);

impl ParseOptions {
    pub const SECOND: ParseOptions = ParseOptions(1);
    pub const MINUTE: ParseOptions = ParseOptions(1 << 1);
    pub const HOUR: ParseOptions = ParseOptions(1 << 2);
    pub const DAY_OF_MONTH: ParseOptions = ParseOptions(1 << 3);
    pub const MONTH: ParseOptions = ParseOptions(1 << 4);
    pub const DAY_OF_WEEK: ParseOptions = ParseOptions(1 << 5);
    /// Allow `@`-prefixed shorthands (`@daily`, `@every 90s`, …).
    pub const DESCRIPTOR: ParseOptions = ParseOptions(1 << 6);

    /// Classic five-field cron (no seconds), descriptors allowed.
    pub const STANDARD: ParseOptions = ParseOptions(
        Self::MINUTE.0
            | Self::HOUR.0
            | Self::DAY_OF_MONTH.0
            | Self::MONTH.0
            | Self::DAY_OF_WEEK.0
            | Self::DESCRIPTOR.0,
    );
    /// Every field, seconds included.
    pub const ALL: ParseOptions = ParseOptions(Self::SECOND.0 | Self::STANDARD.0);

    pub fn contains(self, other: ParseOptions) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for ParseOptions {
    type Output = ParseOptions;

    fn bitor(self, rhs: ParseOptions) -> ParseOptions {
        ParseOptions(self.0 | rhs.0)
    }
}

/// The six positional fields, in expression order.
const PLACES: [ParseOptions; 6] = [
    ParseOptions::SECOND,
    ParseOptions::MINUTE,
    ParseOptions::HOUR,
    ParseOptions::DAY_OF_MONTH,
    ParseOptions::MONTH,
    ParseOptions::DAY_OF_WEEK,
];

/// Defaults for fields the parser's configuration leaves out.
const DEFAULTS: [&str; 6] = ["0", "0", "0", "*", "*", "*"];

/// A schedule compiler. Replace the scheduler's with
/// [`Cron::with_parser`](crate::Cron::with_parser) to accept a different
/// grammar.
pub trait Parser: Send + Sync {
    fn parse(&self, spec: &str) -> Result<Schedule>;
}

/// The default [`Parser`]: cron field lists plus `@`-descriptors.
#[derive(Debug, Clone, Copy)]
pub struct SpecParser {
    options: ParseOptions,
}

impl SpecParser {
    pub fn new(options: ParseOptions) -> Self {
        SpecParser {
            options: ParseOptions(options.0 & ParseOptions::ALL.0),
        }
    }
}

impl Default for SpecParser {
    fn default() -> Self {
        Self::new(ParseOptions::STANDARD)
    }
}

impl Parser for SpecParser {
    fn parse(&self, spec: &str) -> Result<Schedule> {
        let spec = spec.trim();
        if spec.starts_with('@') {
            if !self.options.contains(ParseOptions::DESCRIPTOR) {
                return Err(Error::DisabledDescriptor(spec.to_string()));
            }
            return parse_descriptor(spec);
        }
        let fields: Vec<&str> = spec.split_whitespace().collect();
        let normalized = normalize_fields(&fields, self.options)?;
        parse_fields(normalized)
    }
}

/// Compile six normalized field strings into a [`SpecSchedule`].
fn parse_fields(fields: [&str; 6]) -> Result<Schedule> {
    Ok(Schedule::Spec(SpecSchedule {
        second: field_mask(fields[0], Bounds::seconds())?,
        minute: field_mask(fields[1], Bounds::minutes())?,
        hour: field_mask(fields[2], Bounds::hours())?,
        dom: field_mask(fields[3], Bounds::day_of_month())?,
        month: field_mask(fields[4], Bounds::months())?,
        dow: field_mask(fields[5], Bounds::day_of_week())?,
    }))
}

/// Map the provided tokens into the enabled slots, filling the rest from the
/// defaults vector.
fn normalize_fields<'a>(fields: &[&'a str], options: ParseOptions) -> Result<[&'a str; 6]> {
    let expected = PLACES.iter().filter(|p| options.contains(**p)).count();
    if expected != fields.len() {
        return Err(Error::FieldCountMismatch {
            expected,
            found: fields.len(),
            spec: fields.join(" "),
        });
    }
    let mut normalized: [&'a str; 6] = DEFAULTS;
    let mut n = 0;
    for (i, place) in PLACES.iter().enumerate() {
        if options.contains(*place) {
            normalized[i] = fields[n];
            n += 1;
        }
    }
    Ok(normalized)
}

/// One field: comma-separated items, OR-ed together.
fn field_mask(field: &str, b: Bounds) -> Result<u64> {
    let mut mask = 0;
    for item in field.split(',').filter(|s| !s.is_empty()) {
        mask |= parse_expr(item, b)?;
    }
    Ok(mask)
}

/// One comma-item: `*`, `N`, `N-M`, optionally followed by `/step`.
///
/// A step on a single value extends the range to the field maximum, so
/// `3/2` means `3-max/2`. A step greater than one forfeits star semantics.
fn parse_expr(expr: &str, b: Bounds) -> Result<u64> {
    let range_and_step: Vec<&str> = expr.split('/').collect();
    let low_to_high: Vec<&str> = range_and_step[0].split('-').collect();
    let single_value = low_to_high.len() == 1;

    let mut extra = 0;
    let (low, mut high) = if low_to_high[0] == "*" || low_to_high[0] == "?" {
        extra = STAR_BIT;
        (b.min, b.max)
    } else {
        let low = parse_int_or_name(low_to_high[0], b.names)?;
        let high = match low_to_high.len() {
            1 => low,
            2 => parse_int_or_name(low_to_high[1], b.names)?,
            _ => return Err(Error::TooManyHyphens(expr.to_string())),
        };
        (low, high)
    };

    let step = match range_and_step.len() {
        1 => 1,
        2 => {
            let step = parse_int_or_name(range_and_step[1], None)?;
            if single_value {
                high = b.max;
            }
            if step > 1 {
                extra = 0;
            }
            step
        }
        _ => return Err(Error::TooManySlashes(expr.to_string())),
    };

    if low < b.min || high > b.max {
        return Err(Error::RangeOutOfBounds {
            min: b.min,
            max: b.max,
            low,
            high,
            expr: expr.to_string(),
        });
    }
    if low > high {
        return Err(Error::InvertedRange {
            low,
            high,
            expr: expr.to_string(),
        });
    }
    if step == 0 {
        return Err(Error::ZeroStep(expr.to_string()));
    }
    Ok(bits(low, high, step) | extra)
}

/// A base-10 unsigned value, or a lookup in the field's name table
/// (case-insensitive).
fn parse_int_or_name(
    expr: &str,
    names: Option<&'static std::collections::HashMap<&'static str, u32>>,
) -> Result<u32> {
    if let Some(names) = names {
        if let Some(&value) = names.get(expr.to_lowercase().as_str()) {
            return Ok(value);
        }
    }
    expr.parse::<u32>()
        .map_err(|_| Error::InvalidNumberOrName(expr.to_string()))
}

/// `@`-shorthands expand to their six-field equivalents and go through the
/// regular field compiler, so `@yearly` matches exactly like `0 0 0 1 1 *`.
fn parse_descriptor(expr: &str) -> Result<Schedule> {
    let equivalent = match expr {
        "@yearly" | "@annually" => ["0", "0", "0", "1", "1", "*"],
        "@monthly" => ["0", "0", "0", "1", "*", "*"],
        "@weekly" => ["0", "0", "0", "*", "*", "0"],
        "@daily" | "@midnight" => ["0", "0", "0", "*", "*", "*"],
        "@hourly" => ["0", "0", "*", "*", "*", "*"],
        _ => {
            if let Some(duration) = expr.strip_prefix("@every ") {
                return Ok(Schedule::Every(EverySchedule::new(parse_duration(
                    duration,
                )?)));
            }
            return Err(Error::InvalidDescriptor(expr.to_string()));
        }
    };
    parse_fields(equivalent)
}

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// A signed human duration: a sequence of `<number><unit>` terms with units
/// `ns`, `us`/`µs`, `ms`, `s`, `m`, `h` and optional fractions, e.g.
/// `1h30m`, `5s60ms`, `-90s`.
fn parse_duration(s: &str) -> Result<Duration> {
    let original = s;
    let s = s.trim();
    let (negative, mut rest) = match s.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    if rest == "0" {
        return Ok(Duration::zero());
    }
    if rest.is_empty() {
        return Err(Error::InvalidDuration(original.to_string()));
    }

    let mut nanos = 0.0;
    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(rest.len());
        let value: f64 = rest[..number_end]
            .parse()
            .map_err(|_| Error::InvalidDuration(original.to_string()))?;
        rest = &rest[number_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let per_unit = match &rest[..unit_end] {
            "ns" => 1.0,
            "us" | "µs" => 1_000.0,
            "ms" => 1_000_000.0,
            "s" => NANOS_PER_SEC,
            "m" => 60.0 * NANOS_PER_SEC,
            "h" => 3_600.0 * NANOS_PER_SEC,
            _ => return Err(Error::InvalidDuration(original.to_string())),
        };
        rest = &rest[unit_end..];
        nanos += value * per_unit;
    }

    let nanos = nanos as i64;
    Ok(Duration::nanoseconds(if negative { -nanos } else { nanos }))
}
