//! Date-indexed numeric series and the aligned axis they are reindexed onto.
//!
//! A `TimeSeries` is strictly increasing by date with one finite value per
//! date. Cleaning (sorting, de-duplication) is the store's job; construction
//! here only verifies it happened.

use crate::domain::error::InvquantError;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frequency {
    /// Business days, Monday to Friday.
    Daily,
    /// One observation per week, anchored to Friday.
    Weekly,
}

impl Frequency {
    pub fn parse(tag: &str) -> Result<Self, InvquantError> {
        match tag.trim().to_lowercase().as_str() {
            "daily" | "d" | "b" => Ok(Frequency::Daily),
            "weekly" | "w" | "w-fri" => Ok(Frequency::Weekly),
            other => Err(InvquantError::invalid_parameter(
                "frequency",
                format!("unsupported frequency tag '{other}'"),
            )),
        }
    }

    /// Trading periods in one year at this frequency.
    pub fn periods_per_year(self) -> usize {
        match self {
            Frequency::Daily => 252,
            Frequency::Weekly => 52,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Daily => write!(f, "daily"),
            Frequency::Weekly => write!(f, "weekly"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: f64,
}

impl Observation {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    pub name: String,
    pub frequency: Frequency,
    pub unit: String,
    points: Vec<Observation>,
}

impl TimeSeries {
    /// Builds a series, rejecting unsorted, duplicated or non-finite input.
    pub fn new(
        name: impl Into<String>,
        frequency: Frequency,
        unit: impl Into<String>,
        points: Vec<Observation>,
    ) -> Result<Self, InvquantError> {
        let name = name.into();
        for pair in points.windows(2) {
            if pair[1].date == pair[0].date {
                return Err(InvquantError::malformed(
                    &name,
                    format!("duplicate date {}", pair[1].date),
                ));
            }
            if pair[1].date < pair[0].date {
                return Err(InvquantError::malformed(
                    &name,
                    format!("date {} follows {}", pair[1].date, pair[0].date),
                ));
            }
        }
        if let Some(bad) = points.iter().find(|p| !p.value.is_finite()) {
            return Err(InvquantError::malformed(
                &name,
                format!("non-finite value on {}", bad.date),
            ));
        }
        Ok(Self {
            name,
            frequency,
            unit: unit.into(),
            points,
        })
    }

    pub fn empty(name: impl Into<String>, frequency: Frequency, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            frequency,
            unit: unit.into(),
            points: Vec::new(),
        }
    }

    pub fn points(&self) -> &[Observation] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Values on `axis` using the latest observation dated on or before each
    /// axis date. Axis dates ahead of the first observation take the first
    /// observed value; a series with no observations yields zeros.
    pub fn reindex_as_of(&self, axis: &[NaiveDate]) -> Vec<f64> {
        let Some(first) = self.points.first() else {
            return vec![0.0; axis.len()];
        };

        let mut out = Vec::with_capacity(axis.len());
        let mut cursor = 0usize;
        let mut current = first.value;
        for &date in axis {
            while cursor < self.points.len() && self.points[cursor].date <= date {
                current = self.points[cursor].value;
                cursor += 1;
            }
            out.push(current);
        }
        out
    }
}

/// Reindexing axis for `frequency` between `start` and `end`, both inclusive.
pub fn date_axis(frequency: Frequency, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut axis = Vec::new();
    if start > end {
        return axis;
    }
    match frequency {
        Frequency::Daily => {
            let mut date = start;
            while date <= end {
                if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                    axis.push(date);
                }
                date += Duration::days(1);
            }
        }
        Frequency::Weekly => {
            let offset = (Weekday::Fri.num_days_from_monday() + 7
                - start.weekday().num_days_from_monday())
                % 7;
            let mut date = start + Duration::days(offset as i64);
            while date <= end {
                axis.push(date);
                date += Duration::days(7);
            }
        }
    }
    axis
}

/// First date of a trailing display window of `years` ending at `end`.
pub fn display_start(end: NaiveDate, years: u32) -> NaiveDate {
    end - Duration::days(365 * years as i64)
}

/// Named member series sharing one reindexed, forward-filled date axis.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedSeriesSet {
    pub frequency: Frequency,
    pub axis: Vec<NaiveDate>,
    pub members: Vec<(String, Vec<f64>)>,
}

impl AlignedSeriesSet {
    pub fn align(
        frequency: Frequency,
        start: NaiveDate,
        end: NaiveDate,
        series: &[TimeSeries],
    ) -> Self {
        let axis = date_axis(frequency, start, end);
        let members = series
            .iter()
            .map(|s| {
                if s.is_empty() {
                    tracing::warn!(series = %s.name, "no observations, member is zero-filled");
                }
                (s.name.clone(), s.reindex_as_of(&axis))
            })
            .collect();
        Self {
            frequency,
            axis,
            members,
        }
    }

    pub fn len(&self) -> usize {
        self.axis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axis.is_empty()
    }

    pub fn member(&self, name: &str) -> Option<&[f64]> {
        self.members
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    pub fn member_names(&self) -> Vec<&str> {
        self.members.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Element-wise sum across members.
    pub fn total(&self) -> Vec<f64> {
        (0..self.axis.len())
            .map(|i| self.members.iter().map(|(_, v)| v[i]).sum())
            .collect()
    }
}
