use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub id: i64,
    pub trade_number: Option<i64>,
    pub import_order: i64,

    pub date: Option<NaiveDateTime>,
    pub day_of_week: Option<String>,
    pub currency_pair: Option<String>,
    pub position_type: Option<String>,
    pub open_time: Option<String>,
    pub group_type: Option<String>,

    pub result: Option<String>,
    pub amount: Option<f64>,
    pub risk_reward: Option<f64>, // percent applied to the stake on a win

    // Derived, always recomputed server-side
    pub pnl: f64,
    pub equity: f64,
    pub numeric_result: i64,

    pub notes: String,

    pub created_at: i64,
    pub updated_at: i64,
}

/// Canonical creation request handed to the ledger, from manual entry or import.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewTrade {
    pub trade_number: Option<i64>,
    pub date: Option<NaiveDateTime>,
    pub day_of_week: Option<String>,
    pub currency_pair: Option<String>,
    pub position_type: Option<String>,
    pub open_time: Option<String>,
    pub group_type: Option<String>,
    pub result: Option<String>,
    pub amount: Option<f64>,
    pub risk_reward: Option<f64>,
    pub notes: String,
}

/// Body of a manual create. Any `pnl`/`equity` keys sent by a client are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTradeInput {
    pub date: Option<String>,
    pub day_of_week: Option<String>,
    pub currency_pair: Option<String>,
    pub position_type: Option<String>,
    pub open_time: Option<String>,
    pub group_type: Option<String>,
    pub result: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub risk_reward: Option<f64>,
    pub notes: Option<String>,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTradeInput {
    pub trade_number: Option<i64>,
    pub date: Option<String>,
    pub day_of_week: Option<String>,
    pub currency_pair: Option<String>,
    pub position_type: Option<String>,
    pub open_time: Option<String>,
    pub group_type: Option<String>,
    pub result: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub risk_reward: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeFilters {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub symbol: Option<String>,
    pub group_type: Option<String>,
    pub result: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl CreateTradeInput {
    /// Validate a manual entry. The whole request is rejected on the first problem.
    pub fn into_new_trade(self) -> Result<NewTrade, AppError> {
        let result = non_blank(self.result)
            .ok_or_else(|| AppError::Validation("result is required".to_string()))?;
        let amount = self
            .amount
            .ok_or_else(|| AppError::Validation("amount is required".to_string()))?;
        validate_amount(amount)?;
        if let Some(rr) = self.risk_reward {
            validate_risk_reward(rr)?;
        }

        let open_time = non_blank(self.open_time);
        let date = match non_blank(self.date) {
            Some(raw) => Some(parse_datetime(&raw, open_time.as_deref())?),
            None => None,
        };
        let day_of_week = non_blank(self.day_of_week).or_else(|| date.map(|d| weekday_label(d.date()).to_string()));

        Ok(NewTrade {
            trade_number: None,
            date,
            day_of_week,
            currency_pair: non_blank(self.currency_pair),
            position_type: non_blank(self.position_type),
            open_time,
            group_type: non_blank(self.group_type),
            result: Some(result),
            amount: Some(amount),
            risk_reward: self.risk_reward,
            notes: self.notes.unwrap_or_default(),
        })
    }
}

impl UpdateTradeInput {
    /// Apply the provided fields onto a stored trade. Derived columns are left
    /// for the ledger to recompute.
    pub fn apply_to(self, trade: &mut Trade) -> Result<(), AppError> {
        if let Some(amount) = self.amount {
            validate_amount(amount)?;
            trade.amount = Some(amount);
        }
        if let Some(rr) = self.risk_reward {
            validate_risk_reward(rr)?;
            trade.risk_reward = Some(rr);
        }
        let time_changed = self.open_time.is_some();
        if let Some(open_time) = self.open_time {
            trade.open_time = non_blank(Some(open_time));
        }
        let date_changed = self.date.is_some();
        match self.date {
            Some(raw) => {
                trade.date = match non_blank(Some(raw)) {
                    Some(raw) => Some(parse_datetime(&raw, trade.open_time.as_deref())?),
                    None => None,
                };
            }
            // Same day, new opening time.
            None if time_changed => {
                trade.date = trade
                    .date
                    .map(|d| d.date().and_time(time_of_day(trade.open_time.as_deref())));
            }
            None => {}
        }
        if let Some(day) = self.day_of_week {
            trade.day_of_week = non_blank(Some(day));
        } else if date_changed || trade.day_of_week.is_none() {
            trade.day_of_week = trade.date.map(|d| weekday_label(d.date()).to_string());
        }
        if let Some(n) = self.trade_number {
            trade.trade_number = Some(n);
        }
        if let Some(v) = self.currency_pair {
            trade.currency_pair = non_blank(Some(v));
        }
        if let Some(v) = self.position_type {
            trade.position_type = non_blank(Some(v));
        }
        if let Some(v) = self.group_type {
            trade.group_type = non_blank(Some(v));
        }
        if let Some(v) = self.result {
            trade.result = non_blank(Some(v));
        }
        if let Some(notes) = self.notes {
            trade.notes = notes;
        }
        Ok(())
    }
}

fn validate_amount(amount: f64) -> Result<(), AppError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(AppError::Validation(format!(
            "amount must be a non-negative number, got {}",
            amount
        )));
    }
    Ok(())
}

fn validate_risk_reward(rr: f64) -> Result<(), AppError> {
    if !rr.is_finite() {
        return Err(AppError::Validation("riskReward must be a finite number".to_string()));
    }
    Ok(())
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM[:SS]`, `YYYY-MM-DD HH:MM[:SS]` or a bare
/// `YYYY-MM-DD`. A bare date takes `open_time` (`HH:MM`) when given, else midnight.
pub fn parse_datetime(raw: &str, open_time: Option<&str>) -> Result<NaiveDateTime, AppError> {
    let raw = raw.trim();
    // Keep the wall-clock time the trader entered, not its UTC equivalent.
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.naive_local());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(dt);
        }
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("invalid date: {}", raw)))?;
    Ok(date.and_time(time_of_day(open_time)))
}

/// `HH:MM` opening time, midnight when missing or unreadable.
fn time_of_day(open_time: Option<&str>) -> NaiveTime {
    open_time
        .and_then(|t| NaiveTime::parse_from_str(t.trim(), "%H:%M").ok())
        .unwrap_or(NaiveTime::MIN)
}

/// Italian weekday name, matching the labels found in imported journals.
pub fn weekday_label(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Mon => "Lunedì",
        Weekday::Tue => "Martedì",
        Weekday::Wed => "Mercoledì",
        Weekday::Thu => "Giovedì",
        Weekday::Fri => "Venerdì",
        Weekday::Sat => "Sabato",
        Weekday::Sun => "Domenica",
    }
}

/// Numbers may arrive as JSON numbers or as strings ("50", "12,5").
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => Ok(n.as_f64()),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(serde_json::Value::String(s)) => s
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("not a number: {}", s))),
        Some(other) => Err(serde::de::Error::custom(format!("not a number: {}", other))),
    }
}
