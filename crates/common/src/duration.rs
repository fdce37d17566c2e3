//! ISO-8601 duration parsing and calendar arithmetic.
//!
//! Recurring schedules are described with durations like `P1M`, `P2W` or
//! `PT12H`. Calendar components (years, months) shift by calendar rules
//! (Jan 31 + P1M = Feb 28/29); fixed components (weeks and below) shift by
//! exact seconds.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PaymentError;

/// A parsed ISO-8601 duration. Components are kept separate because months
/// and years have no fixed length in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IsoDuration {
    pub years: u32,
    pub months: u32,
    pub weeks: u32,
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl IsoDuration {
    /// Parse a duration of the form `P[nY][nM][nW][nD][T[nH][nM][nS]]`.
    /// At least one component is required; fractional components are not
    /// supported.
    pub fn parse(input: &str) -> Result<Self, PaymentError> {
        let invalid = || PaymentError::Validation(format!("invalid ISO-8601 duration: {input:?}"));

        let rest = input.strip_prefix('P').ok_or_else(invalid)?;
        if rest.is_empty() {
            return Err(invalid());
        }

        let (date_part, time_part) = match rest.split_once('T') {
            Some((date, time)) if !time.is_empty() => (date, Some(time)),
            Some(_) => return Err(invalid()),
            None => (rest, None),
        };

        let mut out = IsoDuration::default();
        let mut any = false;

        // Designators must appear in order and at most once.
        let mut parse_section =
            |section: &str, designators: &[(char, fn(&mut IsoDuration, u32))]| -> Result<(), PaymentError> {
                let mut value = String::new();
                let mut next_designator = 0usize;
                for ch in section.chars() {
                    if ch.is_ascii_digit() {
                        value.push(ch);
                        continue;
                    }
                    let pos = designators[next_designator..]
                        .iter()
                        .position(|(d, _)| *d == ch)
                        .ok_or_else(invalid)?;
                    if value.is_empty() {
                        return Err(invalid());
                    }
                    let parsed: u32 = value.parse().map_err(|_| invalid())?;
                    (designators[next_designator + pos].1)(&mut out, parsed);
                    next_designator += pos + 1;
                    value.clear();
                    any = true;
                }
                if !value.is_empty() {
                    return Err(invalid());
                }
                Ok(())
            };

        parse_section(
            date_part,
            &[
                ('Y', |d, v| d.years = v),
                ('M', |d, v| d.months = v),
                ('W', |d, v| d.weeks = v),
                ('D', |d, v| d.days = v),
            ],
        )?;
        if let Some(time) = time_part {
            parse_section(
                time,
                &[
                    ('H', |d, v| d.hours = v),
                    ('M', |d, v| d.minutes = v),
                    ('S', |d, v| d.seconds = v),
                ],
            )?;
        }

        if !any {
            return Err(invalid());
        }
        Ok(out)
    }

    /// Advance `from` by this duration: calendar months first, then the
    /// fixed-length remainder.
    pub fn add_to(&self, from: DateTime<Utc>) -> Result<DateTime<Utc>, PaymentError> {
        let total_months = self
            .years
            .checked_mul(12)
            .and_then(|y| y.checked_add(self.months))
            .ok_or_else(|| PaymentError::Validation("duration months overflow".to_string()))?;

        let shifted = from
            .checked_add_months(Months::new(total_months))
            .ok_or_else(|| {
                PaymentError::Validation("duration exceeds representable date range".to_string())
            })?;

        let fixed = Duration::weeks(i64::from(self.weeks))
            + Duration::days(i64::from(self.days))
            + Duration::hours(i64::from(self.hours))
            + Duration::minutes(i64::from(self.minutes))
            + Duration::seconds(i64::from(self.seconds));

        shifted.checked_add_signed(fixed).ok_or_else(|| {
            PaymentError::Validation("duration exceeds representable date range".to_string())
        })
    }

    /// True when every component is zero. A zero-length interval would make
    /// a recurring schedule spin.
    pub fn is_zero(&self) -> bool {
        *self == IsoDuration::default()
    }
}

impl FromStr for IsoDuration {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IsoDuration::parse(s)
    }
}

impl fmt::Display for IsoDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P")?;
        if self.years > 0 {
            write!(f, "{}Y", self.years)?;
        }
        if self.months > 0 {
            write!(f, "{}M", self.months)?;
        }
        if self.weeks > 0 {
            write!(f, "{}W", self.weeks)?;
        }
        if self.days > 0 {
            write!(f, "{}D", self.days)?;
        }
        if self.hours > 0 || self.minutes > 0 || self.seconds > 0 {
            write!(f, "T")?;
            if self.hours > 0 {
                write!(f, "{}H", self.hours)?;
            }
            if self.minutes > 0 {
                write!(f, "{}M", self.minutes)?;
            }
            if self.seconds > 0 {
                write!(f, "{}S", self.seconds)?;
            }
        }
        if self.is_zero() {
            write!(f, "0D")?;
        }
        Ok(())
    }
}

impl Serialize for IsoDuration {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for IsoDuration {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        IsoDuration::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_common_intervals() {
        assert_eq!(
            IsoDuration::parse("P1M").unwrap(),
            IsoDuration {
                months: 1,
                ..Default::default()
            }
        );
        assert_eq!(
            IsoDuration::parse("P2W").unwrap(),
            IsoDuration {
                weeks: 2,
                ..Default::default()
            }
        );
        assert_eq!(
            IsoDuration::parse("PT12H").unwrap(),
            IsoDuration {
                hours: 12,
                ..Default::default()
            }
        );
        assert_eq!(
            IsoDuration::parse("P1Y2M3DT4H5M6S").unwrap(),
            IsoDuration {
                years: 1,
                months: 2,
                days: 3,
                hours: 4,
                minutes: 5,
                seconds: 6,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for input in ["", "P", "PT", "1M", "P1", "PXD", "P1M2Y", "P1MT", "P-1D", "P1.5D"] {
            assert!(
                IsoDuration::parse(input).is_err(),
                "{input:?} should not parse"
            );
        }
    }

    #[test]
    fn test_month_designator_is_positional() {
        // M before T is months; after T it is minutes.
        let months = IsoDuration::parse("P3M").unwrap();
        let minutes = IsoDuration::parse("PT3M").unwrap();
        assert_eq!(months.months, 3);
        assert_eq!(minutes.minutes, 3);
        assert_eq!(months.minutes, 0);
    }

    #[test]
    fn test_calendar_month_clamps_end_of_month() {
        let interval = IsoDuration::parse("P1M").unwrap();
        assert_eq!(
            interval.add_to(date("2026-01-31T10:00:00Z")).unwrap(),
            date("2026-02-28T10:00:00Z")
        );
        // Leap year.
        assert_eq!(
            interval.add_to(date("2024-01-31T10:00:00Z")).unwrap(),
            date("2024-02-29T10:00:00Z")
        );
    }

    #[test]
    fn test_fixed_components_add_exact_seconds() {
        let interval = IsoDuration::parse("P1WT36H").unwrap();
        assert_eq!(
            interval.add_to(date("2026-03-01T00:00:00Z")).unwrap(),
            date("2026-03-09T12:00:00Z")
        );
    }

    #[test]
    fn test_display_round_trips() {
        for input in ["P1M", "P2W", "P1Y2M3DT4H5M6S", "PT30S"] {
            let parsed = IsoDuration::parse(input).unwrap();
            assert_eq!(parsed.to_string(), input);
        }
    }
}
