//! Textual calendar intervals: `"5 seconds"`, `"1 day 02:00:00"`, `"2 mons -00:30:00"`

use crate::error::{EngineError, Result};
use crate::types::{Interval, USECS_PER_SEC};
use regex::Regex;
use std::str::FromStr;
use std::sync::OnceLock;

const USECS_PER_MINUTE: i64 = 60 * USECS_PER_SEC;
const USECS_PER_HOUR: i64 = 60 * USECS_PER_MINUTE;

enum Unit {
    Months(i32),
    Days(i32),
    Micros(i64),
}

fn unit(name: &str) -> Option<Unit> {
    Some(match name {
        "year" | "years" | "yr" | "yrs" | "y" => Unit::Months(12),
        "mon" | "mons" | "month" | "months" => Unit::Months(1),
        "week" | "weeks" | "w" => Unit::Days(7),
        "day" | "days" | "d" => Unit::Days(1),
        "hour" | "hours" | "hr" | "hrs" | "h" => Unit::Micros(USECS_PER_HOUR),
        "min" | "mins" | "minute" | "minutes" | "m" => Unit::Micros(USECS_PER_MINUTE),
        "sec" | "secs" | "second" | "seconds" | "s" => Unit::Micros(USECS_PER_SEC),
        "ms" | "millisecond" | "milliseconds" => Unit::Micros(1_000),
        "us" | "microsecond" | "microseconds" => Unit::Micros(1),
        _ => return None,
    })
}

static CLOCK_RE: OnceLock<Regex> = OnceLock::new();
static QUANTITY_RE: OnceLock<Regex> = OnceLock::new();

fn compiled(cell: &'static OnceLock<Regex>, pattern: &str) -> Result<&'static Regex> {
    if let Some(re) = cell.get() {
        return Ok(re);
    }
    let re = Regex::new(pattern).map_err(|e| EngineError::validation(e.to_string()))?;
    Ok(cell.get_or_init(|| re))
}

/// `amount * scale` as an i32 day or month count, `None` when out of range
fn whole(amount: f64, scale: i32) -> Option<i32> {
    if amount.abs() > i32::MAX as f64 {
        return None;
    }
    (amount as i32).checked_mul(scale)
}

fn parse_clock(caps: &regex::Captures<'_>) -> Result<i64> {
    let field = |i: usize| -> Result<i64> {
        caps.get(i)
            .map_or(Ok(0), |m| m.as_str().parse::<i64>())
            .map_err(|e| EngineError::validation(e.to_string()))
    };
    // right-pad to six digits: ".5" is 500000us
    let frac = match caps.get(5) {
        Some(m) => format!("{:0<6}", m.as_str())
            .parse::<i64>()
            .map_err(|e| EngineError::validation(e.to_string()))?,
        None => 0,
    };
    let micros = field(2)?
        .checked_mul(USECS_PER_HOUR)
        .and_then(|h| h.checked_add(field(3).ok()? * USECS_PER_MINUTE))
        .and_then(|m| m.checked_add(field(4).ok()? * USECS_PER_SEC))
        .and_then(|s| s.checked_add(frac))
        .ok_or_else(|| EngineError::validation("clock component is out of range"))?;
    Ok(if caps.get(1).is_some() { -micros } else { micros })
}

impl FromStr for Interval {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let bad = |reason: String| EngineError::validation(format!("invalid interval {s:?}: {reason}"));
        let clock_re = compiled(&CLOCK_RE, r"^(-)?(\d+):(\d{2})(?::(\d{2})(?:\.(\d{1,6}))?)?$")?;
        let quantity_re = compiled(&QUANTITY_RE, r"^(-?\d+(?:\.\d+)?)([a-z]*)$")?;

        let text = s.trim().to_lowercase();
        let mut tokens = text.split_whitespace().peekable();
        if tokens.peek().is_none() {
            return Err(bad("empty".to_string()));
        }

        let mut interval = Interval::default();
        while let Some(token) = tokens.next() {
            if let Some(caps) = clock_re.captures(token) {
                interval.micros = interval
                    .micros
                    .checked_add(parse_clock(&caps)?)
                    .ok_or_else(|| bad("clock component overflows".to_string()))?;
                continue;
            }
            let caps = quantity_re
                .captures(token)
                .ok_or_else(|| bad(format!("unexpected token {token:?}")))?;
            let amount: f64 = caps[1].parse().map_err(|_| bad(format!("bad number {token:?}")))?;
            let name = match &caps[2] {
                "" => tokens
                    .next()
                    .ok_or_else(|| bad(format!("missing unit after {amount}")))?,
                attached => attached,
            };
            let overflow = || bad(format!("{amount} {name} is out of range"));
            match unit(name).ok_or_else(|| bad(format!("unknown unit {name:?}")))? {
                Unit::Micros(scale) => {
                    let micros = (amount * scale as f64).round();
                    if micros.abs() >= i64::MAX as f64 {
                        return Err(overflow());
                    }
                    interval.micros = interval.micros.checked_add(micros as i64).ok_or_else(overflow)?;
                }
                Unit::Days(scale) if amount.fract() == 0.0 => {
                    interval.days = whole(amount, scale)
                        .and_then(|d| interval.days.checked_add(d))
                        .ok_or_else(overflow)?;
                }
                Unit::Months(scale) if amount.fract() == 0.0 => {
                    interval.months = whole(amount, scale)
                        .and_then(|m| interval.months.checked_add(m))
                        .ok_or_else(overflow)?;
                }
                _ => return Err(bad(format!("fractional {name} are not supported"))),
            }
        }
        Ok(interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_units() {
        assert_eq!("5 seconds".parse::<Interval>().unwrap(), Interval::from_secs(5));
        assert_eq!("3 days".parse::<Interval>().unwrap(), Interval::from_days(3));
        assert_eq!("2 mons".parse::<Interval>().unwrap(), Interval::from_months(2));
        assert_eq!("1 year".parse::<Interval>().unwrap(), Interval::from_months(12));
        assert_eq!("90s".parse::<Interval>().unwrap(), Interval::from_secs(90));
    }

    #[test]
    fn test_mixed_with_clock() {
        let interval: Interval = "1 day 02:00:00".parse().unwrap();
        assert_eq!(interval, Interval::new(0, 1, 2 * USECS_PER_HOUR));

        let interval: Interval = "1 mon -00:30".parse().unwrap();
        assert_eq!(interval, Interval::new(1, 0, -30 * USECS_PER_MINUTE));

        let interval: Interval = "00:00:01.5".parse().unwrap();
        assert_eq!(interval, Interval::from_micros(1_500_000));
    }

    #[test]
    fn test_fractional_time_units() {
        let interval: Interval = "1.5 minutes".parse().unwrap();
        assert_eq!(interval, Interval::from_secs(90));
        assert!("1.5 days".parse::<Interval>().is_err());
    }

    #[test]
    fn test_rejects_garbage() {
        assert!("".parse::<Interval>().is_err());
        assert!("5 fortnights".parse::<Interval>().is_err());
        assert!("5".parse::<Interval>().is_err());
        assert!("soon".parse::<Interval>().unwrap_err().is_validation());
    }

    #[test]
    fn test_out_of_range_amounts() {
        assert!("400000000 years".parse::<Interval>().unwrap_err().is_validation());
        assert!("3000000000 days".parse::<Interval>().is_err());
        let huge = format!("1{} seconds", "0".repeat(300));
        assert!(huge.parse::<Interval>().is_err());
        assert!("99999999999999 hours".parse::<Interval>().is_err());
        assert!("9999999999999:00:00".parse::<Interval>().is_err());
    }

    #[test]
    fn test_large_years_parse_but_fail_conversion() {
        let interval: Interval = "400000 years".parse().unwrap();
        assert_eq!(interval, Interval::from_months(4_800_000));
        let err = interval.retention_micros().unwrap_err();
        assert!(matches!(err, EngineError::InvalidInterval { .. }));
    }
}
