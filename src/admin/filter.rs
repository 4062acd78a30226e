use serde::Deserialize;
use time::{Date, Duration};

use crate::{error::ApiError, store::types::iso_date};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeKind {
    #[default]
    Today,
    Yesterday,
    #[serde(alias = "last_7_days", alias = "last7days")]
    Last7,
    Custom,
}

/// `?range=today|yesterday|last7|custom&start=YYYY-MM-DD&end=YYYY-MM-DD`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DateFilterQuery {
    #[serde(default)]
    pub range: RangeKind,
    #[serde(default, with = "iso_date::option")]
    pub start: Option<Date>,
    #[serde(default, with = "iso_date::option")]
    pub end: Option<Date>,
}

/// Inclusive local-date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: Date,
    pub end: Date,
}

impl DateRange {
    pub fn contains(&self, d: Date) -> bool {
        self.start <= d && d <= self.end
    }
}

impl DateFilterQuery {
    /// Custom ranges default to the last 7 days on whichever side is missing.
    pub fn resolve(&self, today: Date) -> Result<DateRange, ApiError> {
        let week_ago = today - Duration::days(7);
        let range = match self.range {
            RangeKind::Today => DateRange {
                start: today,
                end: today,
            },
            RangeKind::Yesterday => {
                let y = today - Duration::days(1);
                DateRange { start: y, end: y }
            }
            RangeKind::Last7 => DateRange {
                start: week_ago,
                end: today,
            },
            RangeKind::Custom => DateRange {
                start: self.start.unwrap_or(week_ago),
                end: self.end.unwrap_or(today),
            },
        };
        if range.start > range.end {
            return Err(ApiError::BadRequest(
                "start date must not be after end date".into(),
            ));
        }
        Ok(range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    const TODAY: Date = date!(2025 - 03 - 15);

    fn q(range: RangeKind) -> DateFilterQuery {
        DateFilterQuery {
            range,
            ..Default::default()
        }
    }

    #[test]
    fn presets_resolve_relative_to_today() {
        assert_eq!(
            q(RangeKind::Today).resolve(TODAY).unwrap(),
            DateRange {
                start: TODAY,
                end: TODAY
            }
        );
        let y = q(RangeKind::Yesterday).resolve(TODAY).unwrap();
        assert_eq!((y.start, y.end), (date!(2025 - 03 - 14), date!(2025 - 03 - 14)));
    }

    #[test]
    fn last_seven_days_spans_today_minus_seven_to_today() {
        let r = q(RangeKind::Last7).resolve(TODAY).unwrap();
        assert!(r.contains(date!(2025 - 03 - 08)));
        assert!(r.contains(TODAY));
        assert!(!r.contains(date!(2025 - 03 - 07)));
        assert!(!r.contains(date!(2025 - 03 - 16)));
    }

    #[test]
    fn custom_range_is_inclusive_and_validated() {
        let mut f = q(RangeKind::Custom);
        f.start = Some(date!(2025 - 02 - 01));
        f.end = Some(date!(2025 - 02 - 28));
        let r = f.resolve(TODAY).unwrap();
        assert!(r.contains(date!(2025 - 02 - 01)) && r.contains(date!(2025 - 02 - 28)));

        f.start = Some(date!(2025 - 03 - 01));
        assert!(matches!(f.resolve(TODAY), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn query_string_parses() {
        let f: DateFilterQuery =
            serde_json::from_str(r#"{"range":"custom","start":"2025-01-01","end":"2025-01-31"}"#)
                .unwrap();
        assert_eq!(f.range, RangeKind::Custom);
        assert_eq!(f.start, Some(date!(2025 - 01 - 01)));

        let f: DateFilterQuery = serde_json::from_str(r#"{"range":"last_7_days"}"#).unwrap();
        assert_eq!(f.range, RangeKind::Last7);
    }
}
