//! Time periods and cadences of raster time slices.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Temporal frequency of the input rasters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    Yearly,
    Monthly,
    Daily,
}

impl Cadence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cadence::Yearly => "yearly",
            Cadence::Monthly => "monthly",
            Cadence::Daily => "daily",
        }
    }

    /// chrono format of the date token embedded in slice filenames.
    pub fn token_format(&self) -> &'static str {
        match self {
            Cadence::Yearly => "%Y",
            Cadence::Monthly => "%Y%m",
            Cadence::Daily => "%Y%m%d",
        }
    }

    fn token_len(&self) -> usize {
        match self {
            Cadence::Yearly => 4,
            Cadence::Monthly => 6,
            Cadence::Daily => 8,
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Cadence {
    type Err = TimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yearly" => Ok(Cadence::Yearly),
            "monthly" => Ok(Cadence::Monthly),
            "daily" => Ok(Cadence::Daily),
            _ => Err(TimeParseError::UnknownCadence(s.to_string())),
        }
    }
}

/// The period a time slice represents.
///
/// Periods of the same cadence order chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Period {
    Year(i32),
    Month { year: i32, month: u32 },
    Day(NaiveDate),
}

impl Period {
    /// Parse the date token of a slice filename for the given cadence.
    pub fn from_token(token: &str, cadence: Cadence) -> Result<Self, TimeParseError> {
        let invalid = |reason: &str| TimeParseError::InvalidToken {
            token: token.to_string(),
            format: cadence.token_format(),
            reason: reason.to_string(),
        };

        if token.len() != cadence.token_len() || !token.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("unexpected length or non-digit characters"));
        }

        match cadence {
            Cadence::Yearly => token
                .parse()
                .map(Period::Year)
                .map_err(|e| invalid(&e.to_string())),
            Cadence::Monthly => {
                let date = NaiveDate::parse_from_str(&format!("{}01", token), "%Y%m%d")
                    .map_err(|e| invalid(&e.to_string()))?;
                Ok(Period::Month {
                    year: date.year(),
                    month: date.month(),
                })
            }
            Cadence::Daily => NaiveDate::parse_from_str(token, "%Y%m%d")
                .map(Period::Day)
                .map_err(|e| invalid(&e.to_string())),
        }
    }

    pub fn year(&self) -> i32 {
        match self {
            Period::Year(year) => *year,
            Period::Month { year, .. } => *year,
            Period::Day(date) => date.year(),
        }
    }

    /// Month number, if the period is finer than a year.
    pub fn month(&self) -> Option<u32> {
        match self {
            Period::Year(_) => None,
            Period::Month { month, .. } => Some(*month),
            Period::Day(date) => Some(date.month()),
        }
    }

    pub fn cadence(&self) -> Cadence {
        match self {
            Period::Year(_) => Cadence::Yearly,
            Period::Month { .. } => Cadence::Monthly,
            Period::Day(_) => Cadence::Daily,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Year(year) => write!(f, "{:04}", year),
            Period::Month { year, month } => write!(f, "{:04}-{:02}", year, month),
            Period::Day(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TimeParseError {
    #[error("Invalid date token '{token}' (expected {format}): {reason}")]
    InvalidToken {
        token: String,
        format: &'static str,
        reason: String,
    },

    #[error("Unknown cadence: {0}. Expected yearly, monthly or daily")]
    UnknownCadence(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tokens() {
        assert_eq!(
            Period::from_token("2015", Cadence::Yearly).unwrap(),
            Period::Year(2015)
        );
        assert_eq!(
            Period::from_token("201503", Cadence::Monthly).unwrap(),
            Period::Month {
                year: 2015,
                month: 3
            }
        );
        let day = Period::from_token("20150228", Cadence::Daily).unwrap();
        assert_eq!(day, Period::Day(NaiveDate::from_ymd_opt(2015, 2, 28).unwrap()));
        assert_eq!(day.to_string(), "2015-02-28");
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        assert!(Period::from_token("201513", Cadence::Monthly).is_err());
        assert!(Period::from_token("20150230", Cadence::Daily).is_err());
        assert!(Period::from_token("2015-01", Cadence::Monthly).is_err());
        assert!(Period::from_token("20150101", Cadence::Monthly).is_err());
        assert!(Period::from_token("", Cadence::Yearly).is_err());
    }

    #[test]
    fn test_period_ordering() {
        let mut periods = vec![
            Period::Month { year: 2016, month: 1 },
            Period::Month { year: 2015, month: 12 },
            Period::Month { year: 2015, month: 2 },
        ];
        periods.sort();
        assert_eq!(periods[0], Period::Month { year: 2015, month: 2 });
        assert_eq!(periods[2], Period::Month { year: 2016, month: 1 });
    }

    #[test]
    fn test_cadence_from_str() {
        assert_eq!("Monthly".parse::<Cadence>().unwrap(), Cadence::Monthly);
        assert!("weekly".parse::<Cadence>().is_err());
    }
}
