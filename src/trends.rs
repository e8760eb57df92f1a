use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use tracing::debug;

use crate::records::{PinRecord, DATE_FORMAT};
use crate::style::Style;

/// Per-style counters, indexed in `Style::ALL` order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StyleCounts([usize; Style::COUNT]);

impl StyleCounts {
    pub fn get(&self, style: Style) -> usize {
        self.0[style.index()]
    }

    pub fn add(&mut self, style: Style, n: usize) {
        self.0[style.index()] += n;
    }

    pub fn total(&self) -> usize {
        self.0.iter().sum()
    }

    pub fn max(&self) -> usize {
        self.0.iter().copied().max().unwrap_or(0)
    }

    /// Style with the highest non-zero count; ties go to the earlier style.
    pub fn dominant(&self) -> Option<(Style, usize)> {
        Style::ALL
            .into_iter()
            .map(|s| (s, self.get(s)))
            .filter(|&(_, n)| n > 0)
            .fold(None, |best, (s, n)| match best {
                Some((_, top)) if top >= n => best,
                _ => Some((s, n)),
            })
    }

    fn merge(&mut self, other: &StyleCounts) {
        for style in Style::ALL {
            self.add(style, other.get(style));
        }
    }
}

impl Serialize for StyleCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Style::COUNT))?;
        for style in Style::ALL {
            map.serialize_entry(style.label(), &self.get(style))?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateBucket {
    #[serde(serialize_with = "serialize_day")]
    pub date: NaiveDate,
    pub counts: StyleCounts,
}

impl DateBucket {
    pub fn label(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearStats {
    pub year: i32,
    pub total: usize,
    pub dominant_style: Option<Style>,
    /// Share of the dominant style, one decimal place
    pub percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub by_date: Vec<DateBucket>,
    pub yearly: Vec<YearStats>,
}

impl ChartData {
    /// Largest single per-date style count.
    pub fn max_count(&self) -> usize {
        self.by_date.iter().map(|b| b.counts.max()).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }
}

fn serialize_day<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&date.format(DATE_FORMAT).to_string())
}

/// Buckets classified pins by creation date and summarizes each year.
///
/// Pins without a date are left out. Pins with a date but no style still
/// open a (zero) bucket for that date.
pub fn prepare_chart_data(records: &[PinRecord]) -> ChartData {
    let mut by_date: BTreeMap<NaiveDate, StyleCounts> = BTreeMap::new();

    for record in records {
        let Some(date) = record.created_at else {
            debug!(pin = %record.pin_url, "Skipping pin without creation date");
            continue;
        };
        let counts = by_date.entry(date).or_default();
        if let Some(style) = record.style {
            counts.add(style, 1);
        }
    }

    let mut by_year: BTreeMap<i32, StyleCounts> = BTreeMap::new();
    for (date, counts) in &by_date {
        by_year.entry(date.year()).or_default().merge(counts);
    }

    let yearly = by_year
        .into_iter()
        .map(|(year, counts)| {
            let total = counts.total();
            let (dominant_style, percentage) = match counts.dominant() {
                Some((style, n)) => (Some(style), round_one_decimal(n as f64 * 100.0 / total as f64)),
                None => (None, 0.0),
            };
            YearStats {
                year,
                total,
                dominant_style,
                percentage,
            }
        })
        .collect();

    ChartData {
        by_date: by_date
            .into_iter()
            .map(|(date, counts)| DateBucket { date, counts })
            .collect(),
        yearly,
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
