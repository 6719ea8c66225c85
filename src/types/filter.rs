//! Structured payload filters
//!
//! A filter is a conjunction of field conditions. Stores translate it to
//! their native query language; `matches` evaluates it locally.

use serde::{Deserialize, Serialize};

use crate::types::document::Payload;

/// Exclusive upper bound of the year range used for policy lookups
pub const DEFAULT_YEAR_UPPER_BOUND: i32 = 2100;
/// Earliest year a policy lookup enumerates; lower thresholds are raised to it
pub const MIN_POLICY_YEAR: i32 = 0;

/// A single field condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    /// Field equals value
    Exact { key: String, value: String },
    /// Field value is one of an enumerated set
    AnyOf { key: String, values: Vec<String> },
}

impl Condition {
    pub fn key(&self) -> &str {
        match self {
            Condition::Exact { key, .. } | Condition::AnyOf { key, .. } => key,
        }
    }

    fn matches(&self, payload: &Payload) -> bool {
        match self {
            Condition::Exact { key, value } => payload.attribute(key) == Some(value.as_str()),
            Condition::AnyOf { key, values } => payload
                .attribute(key)
                .map_or(false, |v| values.iter().any(|candidate| candidate == v)),
        }
    }
}

/// Conjunction of conditions; every one must hold
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub must: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exact(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.must.push(Condition::Exact {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn any_of<I, S>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.must.push(Condition::AnyOf {
            key: key.into(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Evaluate against a payload
    pub fn matches(&self, payload: &Payload) -> bool {
        self.must.iter().all(|c| c.matches(payload))
    }

    /// True when some membership set is empty, so no document can match
    pub fn is_unsatisfiable(&self) -> bool {
        self.must
            .iter()
            .any(|c| matches!(c, Condition::AnyOf { values, .. } if values.is_empty()))
    }
}

/// Filter for a country's policies from `year_threshold` up to (not including)
/// `upper_bound`.
///
/// Years are stored as strings, so the range is spelled out as a membership
/// set. A threshold at or past the bound yields an empty set; one below
/// `MIN_POLICY_YEAR` starts the set there.
pub fn country_policy_filter(country: &str, year_threshold: i32, upper_bound: i32) -> Filter {
    let years = (year_threshold.max(MIN_POLICY_YEAR)..upper_bound).map(|year| year.to_string());
    Filter::new().exact("country", country).any_of("year", years)
}
