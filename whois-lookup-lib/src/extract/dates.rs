//! Date normalization for WHOIS values.
//!
//! Registrars print dates in every layout imaginable. [`normalize_date`]
//! maps the ones it recognizes onto a single ISO-8601 UTC instant and hands
//! anything else back untouched.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use lazy_static::lazy_static;
use regex::Regex;

/// Optional time-of-day suffix accepted after any structural date shape.
const TIME_SUFFIX: &str = r"(?:[ T](\d{1,2}):(\d{2})(?::(\d{2}))?(?:\.\d+)?)?";

lazy_static! {
    static ref CANONICAL_PREFIX: Regex =
        Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}").expect("canonical prefix pattern");
    static ref TZ_NAME: Regex = Regex::new(r"(?:\s+\(?[A-Z]{1,5}\)?|(?P<time>\d{2}(?:\.\d+)?)Z)$")
        .expect("timezone name pattern");
    static ref TZ_OFFSET: Regex = Regex::new(
        r"(?:\s+|(?P<time>\d{2}:\d{2}(?::\d{2})?(?:\.\d+)?))(?:UTC|GMT)?[+-]\d{2}:?\d{2}$"
    )
    .expect("timezone offset pattern");

    /// Structural shapes, tried in order.
    static ref SHAPES: Vec<(Regex, Order)> = vec![
        (shape(r"(\d{4})-(\d{1,2})-(\d{1,2})"), Order::Ymd),
        (shape(r"(\d{1,2})/(\d{1,2})/(\d{4}|\d{2})"), Order::SlashAmbiguous),
        (shape(r"(\d{1,2})\.(\d{1,2})\.(\d{4}|\d{2})"), Order::Dmy),
        (shape(r"(\d{4})\.(\d{1,2})\.(\d{1,2})"), Order::Ymd),
        (shape(r"(\d{1,2})-(\d{1,2})-(\d{4}|\d{2})"), Order::Dmy),
        (shape(r"(\d{4})/(\d{1,2})/(\d{1,2})"), Order::Ymd),
    ];
}

/// Layouts handed to chrono when no structural shape matched.
const GENERAL_DATETIME_FORMATS: &[&str] = &[
    "%d-%b-%Y %H:%M:%S",
    "%d-%b-%Y %H:%M",
    "%a %b %d %H:%M:%S %Y",
    "%Y%m%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %I:%M:%S %p",
    "%Y-%m-%d %I:%M %p",
    "%d-%b-%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M:%S %p",
];

const GENERAL_DATE_FORMATS: &[&str] = &[
    "%d-%b-%Y",
    "%d-%B-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d %Y",
    "%B %d %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%Y-%b-%d",
    "%Y%m%d",
];

#[derive(Debug, Clone, Copy)]
enum Order {
    Ymd,
    Dmy,
    /// `NN/NN/YYYY`: day-first unless only month-first yields a valid date
    SlashAmbiguous,
}

fn shape(date: &str) -> Regex {
    Regex::new(&format!("^{}{}$", date, TIME_SUFFIX)).expect("date shape pattern")
}

/// Normalize a WHOIS date string to `YYYY-MM-DDThh:mm:ss.mmmZ`.
///
/// Values that already start with `YYYY-MM-DDThh:mm:ss` are returned as-is.
/// Unrecognized values are returned unchanged; this function never fails.
///
/// Two-digit years below 30 are read as 20xx, the rest as 19xx. That cutoff
/// is a heuristic, not a registry rule.
pub fn normalize_date(raw: &str) -> String {
    let value = raw.trim();

    if value.is_empty() || CANONICAL_PREFIX.is_match(value) {
        return raw.to_string();
    }

    let stripped = strip_timezone(value);

    for (regex, order) in SHAPES.iter() {
        if let Some(caps) = regex.captures(stripped) {
            let numbers: Vec<u32> = (1..=6)
                .map(|i| {
                    caps.get(i)
                        .and_then(|m| m.as_str().parse().ok())
                        .unwrap_or(0)
                })
                .collect();
            let year_digits = match order {
                Order::Ymd => caps.get(1),
                _ => caps.get(3),
            }
            .map(|m| m.as_str().len())
            .unwrap_or(4);

            if let Some(parsed) = build_datetime(*order, &numbers, year_digits) {
                return format_instant(parsed);
            }
            // Shape matched but the calendar date is impossible; try the general parser.
            break;
        }
    }

    match parse_general(value, stripped) {
        Some(parsed) => format_instant(parsed),
        None => raw.to_string(),
    }
}

fn strip_timezone(value: &str) -> &str {
    let mut stripped = value;

    if let Some(caps) = TZ_NAME
        .captures(stripped)
        .filter(|caps| !is_meridiem(&caps[0]))
    {
        let end = caps
            .name("time")
            .map(|t| t.end())
            .or_else(|| caps.get(0).map(|m| m.start()));
        if let Some(end) = end {
            stripped = stripped[..end].trim_end();
        }
    }

    if let Some(caps) = TZ_OFFSET.captures(stripped) {
        let end = caps
            .name("time")
            .map(|t| t.end())
            .or_else(|| caps.get(0).map(|m| m.start()));
        if let Some(end) = end {
            stripped = stripped[..end].trim_end();
        }
    }

    stripped
}

/// `AM`/`PM` fits the timezone abbreviation shape but belongs to the time.
fn is_meridiem(token: &str) -> bool {
    matches!(
        token.trim().trim_start_matches('(').trim_end_matches(')'),
        "AM" | "PM"
    )
}

fn build_datetime(order: Order, numbers: &[u32], year_digits: usize) -> Option<NaiveDateTime> {
    let (year, month, day) = match order {
        Order::Ymd => (numbers[0], numbers[1], numbers[2]),
        Order::Dmy => (numbers[2], numbers[1], numbers[0]),
        Order::SlashAmbiguous => {
            let (first, second, year) = (numbers[0], numbers[1], numbers[2]);
            if first <= 12 && second > 12 {
                (year, first, second)
            } else {
                (year, second, first)
            }
        }
    };

    let year = expand_year(year, year_digits);
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    date.and_hms_opt(numbers[3], numbers[4], numbers[5])
}

fn expand_year(year: u32, digits: usize) -> i32 {
    let year = year as i32;
    if digits == 2 {
        if year < 30 {
            2000 + year
        } else {
            1900 + year
        }
    } else {
        year
    }
}

fn parse_general(original: &str, stripped: &str) -> Option<NaiveDateTime> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(original) {
        return Some(parsed.naive_utc());
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(original) {
        return Some(parsed.naive_utc());
    }

    for format in GENERAL_DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(stripped, format) {
            return Some(parsed);
        }
    }

    for format in GENERAL_DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(stripped, format) {
            return parsed.and_hms_opt(0, 0, 0);
        }
    }

    None
}

fn format_instant(parsed: NaiveDateTime) -> String {
    Utc.from_utc_datetime(&parsed)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_values_unchanged() {
        assert_eq!(normalize_date("1995-08-14T04:00:00Z"), "1995-08-14T04:00:00Z");
        assert_eq!(
            normalize_date("2024-07-13T04:00:00.123+02:00"),
            "2024-07-13T04:00:00.123+02:00"
        );
    }

    #[test]
    fn test_structural_shapes() {
        assert_eq!(normalize_date("1995-08-14"), "1995-08-14T00:00:00.000Z");
        assert_eq!(normalize_date("14.08.1995"), "1995-08-14T00:00:00.000Z");
        assert_eq!(normalize_date("1995.08.14"), "1995-08-14T00:00:00.000Z");
        assert_eq!(normalize_date("14-08-1995"), "1995-08-14T00:00:00.000Z");
        assert_eq!(normalize_date("1995/08/14"), "1995-08-14T00:00:00.000Z");
        assert_eq!(normalize_date("14/08/1995"), "1995-08-14T00:00:00.000Z");
    }

    #[test]
    fn test_slash_dates_resolve_ambiguity() {
        // month-first only when the day-first reading is impossible
        assert_eq!(normalize_date("08/14/1995"), "1995-08-14T00:00:00.000Z");
        assert_eq!(normalize_date("05/03/2021"), "2021-03-05T00:00:00.000Z");
    }

    #[test]
    fn test_two_digit_years() {
        assert_eq!(normalize_date("01.02.21"), "2021-02-01T00:00:00.000Z");
        assert_eq!(normalize_date("01.02.95"), "1995-02-01T00:00:00.000Z");
        assert_eq!(normalize_date("01-02-29"), "2029-02-01T00:00:00.000Z");
        assert_eq!(normalize_date("01-02-30"), "1930-02-01T00:00:00.000Z");
    }

    #[test]
    fn test_timezone_tokens_stripped() {
        assert_eq!(normalize_date("2020-01-15 UTC"), "2020-01-15T00:00:00.000Z");
        assert_eq!(normalize_date("2020-01-15 (GMT)"), "2020-01-15T00:00:00.000Z");
        assert_eq!(
            normalize_date("2020-01-15 12:30:00 +0000"),
            "2020-01-15T12:30:00.000Z"
        );
        assert_eq!(
            normalize_date("2020-01-15 12:30:00+01:00"),
            "2020-01-15T12:30:00.000Z"
        );
    }

    #[test]
    fn test_meridiem_is_not_a_timezone() {
        assert_eq!(
            normalize_date("2020-01-15 01:30:00 PM"),
            "2020-01-15T13:30:00.000Z"
        );
        assert_eq!(
            normalize_date("2020-01-15 01:30:00 AM"),
            "2020-01-15T01:30:00.000Z"
        );
        assert_eq!(
            normalize_date("2020-01-15 12:05 PM UTC"),
            "2020-01-15T12:05:00.000Z"
        );
        // unknown layout with a meridiem stays untouched rather than losing the hour
        assert_eq!(normalize_date("15.01.2020 01:30 PM"), "15.01.2020 01:30 PM");
    }

    #[test]
    fn test_general_parse_fallback() {
        assert_eq!(normalize_date("14-aug-1995"), "1995-08-14T00:00:00.000Z");
        assert_eq!(normalize_date("Aug 14 1995"), "1995-08-14T00:00:00.000Z");
        assert_eq!(
            normalize_date("Mon, 14 Aug 1995 04:00:00 +0000"),
            "1995-08-14T04:00:00.000Z"
        );
    }

    #[test]
    fn test_unparseable_values_returned_unchanged() {
        assert_eq!(normalize_date("not a date"), "not a date");
        assert_eq!(normalize_date("31.02.2020"), "31.02.2020");
        assert_eq!(normalize_date(""), "");
    }
}
