use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::Trade;
use crate::stats::summary::{summarize, Summary};

const MONTHS: [&str; 12] = [
    "gennaio", "febbraio", "marzo", "aprile", "maggio", "giugno",
    "luglio", "agosto", "settembre", "ottobre", "novembre", "dicembre",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Day,
    Week,
    Month,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodBucket {
    pub key: String,
    /// Display label only.
    pub period: String,
    #[serde(flatten)]
    pub summary: Summary,
}

impl Period {
    /// First day of the period containing `date`. Weeks start on Monday.
    pub fn anchor(self, date: NaiveDate) -> NaiveDate {
        match self {
            Period::Day => date,
            Period::Week => date
                .checked_sub_days(Days::new(date.weekday().num_days_from_monday() as u64))
                .unwrap_or(date),
            Period::Month => date.with_day(1).unwrap_or(date),
        }
    }

    pub fn key(self, anchor: NaiveDate) -> String {
        match self {
            Period::Day | Period::Week => anchor.format("%Y-%m-%d").to_string(),
            Period::Month => anchor.format("%Y-%m").to_string(),
        }
    }

    pub fn label(self, anchor: NaiveDate) -> String {
        match self {
            Period::Day => anchor.format("%d/%m/%Y").to_string(),
            Period::Week => format!("Settimana del {}", anchor.format("%d/%m/%Y")),
            Period::Month => format!("{} {}", MONTHS[anchor.month0() as usize], anchor.year()),
        }
    }
}

/// Group dated trades into period buckets and summarize each one.
/// Undated trades belong to no period and are left out.
pub fn bucketize(trades: &[Trade], period: Period, order: SortOrder) -> Vec<PeriodBucket> {
    let mut groups: BTreeMap<NaiveDate, Vec<&Trade>> = BTreeMap::new();
    for trade in trades {
        if let Some(date) = trade.date {
            groups.entry(period.anchor(date.date())).or_default().push(trade);
        }
    }

    let mut buckets: Vec<PeriodBucket> = groups
        .into_iter()
        .map(|(anchor, members)| PeriodBucket {
            key: period.key(anchor),
            period: period.label(anchor),
            summary: summarize(members),
        })
        .collect();

    if order == SortOrder::Desc {
        buckets.reverse();
    }
    buckets
}
