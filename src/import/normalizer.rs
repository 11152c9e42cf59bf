use serde_json::{Map, Value};
use std::collections::BTreeSet;

use crate::error::{AppError, Result};
use crate::import::columns::ColumnMap;
use crate::import::parse::{parse_date_time, parse_euro_number, parse_percent, parse_trade_number};
use crate::models::NewTrade;

/// One loosely-typed source row, keyed by the original column header.
pub type RawRow = Map<String, Value>;

#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    pub trades: Vec<NewTrade>,
    pub skipped: usize,
    pub total: usize,
}

/// Map every row onto a trade creation request. Incomplete rows are counted
/// and dropped; the batch itself only fails when it is empty.
pub fn normalize_rows(rows: &[RawRow]) -> Result<NormalizedBatch> {
    if rows.is_empty() {
        return Err(AppError::Validation("import contains no rows".to_string()));
    }

    let headers: BTreeSet<&str> = rows.iter().flat_map(|r| r.keys().map(String::as_str)).collect();
    let columns = ColumnMap::detect(headers);

    let missing = columns.missing();
    if !missing.is_empty() {
        log::warn!("Import header lacks required columns: {}", missing.join(", "));
    }

    let mut batch = NormalizedBatch {
        total: rows.len(),
        ..Default::default()
    };

    for (index, row) in rows.iter().enumerate() {
        match normalize_row(row, &columns) {
            Ok(trade) => batch.trades.push(trade),
            Err(column) => {
                log::debug!("Skipping import row {}: missing {}", index + 1, column);
                batch.skipped += 1;
            }
        }
    }

    log::info!(
        "Normalized import: {} accepted, {} skipped of {}",
        batch.trades.len(),
        batch.skipped,
        batch.total
    );
    Ok(batch)
}

/// Returns the name of the first required column that is blank or does not
/// parse when the row is unusable.
fn normalize_row(row: &RawRow, columns: &ColumnMap) -> std::result::Result<NewTrade, &'static str> {
    for (name, header) in columns.required() {
        if cell(row, header).is_none() {
            return Err(name);
        }
    }

    let open_time = cell(row, columns.open_time.as_deref());
    let date = cell(row, columns.date.as_deref())
        .and_then(|d| parse_date_time(&d, open_time.as_deref()))
        .ok_or("date")?;
    let amount = number_cell(row, columns.amount.as_deref(), parse_euro_number).ok_or("amount")?;
    let risk_reward = number_cell(row, columns.risk_reward.as_deref(), parse_percent).ok_or("riskReward")?;

    Ok(NewTrade {
        trade_number: cell(row, columns.trade.as_deref()).and_then(|n| parse_trade_number(&n)),
        date: Some(date),
        day_of_week: cell(row, columns.day.as_deref()),
        currency_pair: cell(row, columns.currency.as_deref()),
        position_type: cell(row, columns.position.as_deref()),
        open_time,
        group_type: cell(row, columns.group.as_deref()),
        result: cell(row, columns.result.as_deref()),
        amount: Some(amount.abs()),
        risk_reward: Some(risk_reward),
        notes: cell(row, columns.notes.as_deref()).unwrap_or_default(),
    })
}

/// Trimmed text of a cell; blank, null and absent cells are all `None`.
fn cell(row: &RawRow, header: Option<&str>) -> Option<String> {
    let text = match row.get(header?)? {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

/// JSON numbers are taken as they are; only text goes through the
/// European-format parser.
fn number_cell(row: &RawRow, header: Option<&str>, parse: fn(&str) -> Option<f64>) -> Option<f64> {
    match row.get(header?)? {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse(s.trim()),
        _ => None,
    }
}

/// Read a delimited export with a header row into raw rows.
pub fn rows_from_csv(text: &str) -> Result<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers().map_err(invalid_csv)?.clone();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(invalid_csv)?;
        if record.iter().all(|f| f.is_empty()) {
            continue;
        }
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.to_string(), Value::String(v.to_string())))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

fn invalid_csv(err: csv::Error) -> AppError {
    AppError::Validation(format!("invalid CSV: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> RawRow {
        match value {
            Value::Object(map) => map,
            _ => panic!("row must be an object"),
        }
    }

    fn complete(result: &str, amount: &str, rr: &str) -> RawRow {
        row(json!({
            "Trade": "7",
            "Data": "17/11/2025",
            "Apertura Giorno": "Lunedì",
            "Valuta": "EUR/USD",
            "Posizione": "Call",
            "Orario Apertura": "14:30",
            "Tipo Gruppo": "Gruppo Live",
            "Risultato": result,
            "Importo (€)": amount,
            "Risk Reward %": rr,
            "Guadagno/Perdita": "99999,00 €",
            "Note": "",
        }))
    }

    #[test]
    fn test_complete_row_becomes_trade() {
        let batch = normalize_rows(&[complete("Presa", "50,00 €", "20%")]).unwrap();
        assert_eq!(batch.skipped, 0);

        let trade = &batch.trades[0];
        assert_eq!(trade.trade_number, Some(7));
        assert_eq!(trade.amount, Some(50.0));
        assert_eq!(trade.risk_reward, Some(20.0));
        assert_eq!(trade.day_of_week.as_deref(), Some("Lunedì"));
        assert_eq!(trade.group_type.as_deref(), Some("Gruppo Live"));
        assert_eq!(trade.date.map(|d| d.to_string()).as_deref(), Some("2025-11-17 14:30:00"));
        assert_eq!(trade.notes, "");
    }

    #[test]
    fn test_incomplete_rows_are_counted_not_created() {
        let mut blank_rr = complete("Persa", "30,00 €", "");
        blank_rr.insert("Risk Reward %".to_string(), Value::String("  ".to_string()));
        let mut no_group = complete("Persa", "30,00 €", "10%");
        no_group.remove("Tipo Gruppo");
        let mut null_result = complete("Persa", "30,00 €", "10%");
        null_result.insert("Risultato".to_string(), Value::Null);
        // filled in, but not parseable
        let spreadsheet_error = complete("Presa", "#VALUE!", "20%");
        let mut iso_date = complete("Presa", "50,00 €", "20%");
        iso_date.insert("Data".to_string(), json!("2025-11-17"));
        let text_rr = complete("Presa", "50,00 €", "n/a");

        let rows = vec![
            complete("Presa", "50,00 €", "20%"),
            blank_rr,
            no_group,
            null_result,
            spreadsheet_error,
            iso_date,
            text_rr,
            complete("Persa", "30,00 €", "0%"),
        ];
        let batch = normalize_rows(&rows).unwrap();

        assert_eq!(batch.trades.len(), 2);
        assert_eq!(batch.skipped, 6);
        assert!(batch.trades.iter().all(|t| t.amount.is_some() && t.date.is_some()));
        assert_eq!(batch.trades.len() + batch.skipped, batch.total);
    }

    #[test]
    fn test_numeric_cells_and_negative_amounts() {
        let mut r = complete("Persa", "", "10%");
        r.insert("Importo (€)".to_string(), json!(-25));
        let batch = normalize_rows(&[r]).unwrap();
        assert_eq!(batch.trades[0].amount, Some(25.0));
    }

    #[test]
    fn test_fractional_json_numbers_keep_their_decimals() {
        let mut r = complete("Presa", "", "");
        r.insert("Importo (€)".to_string(), json!(12.5));
        r.insert("Risk Reward %".to_string(), json!(37.5));
        let batch = normalize_rows(&[r]).unwrap();
        assert_eq!(batch.trades[0].amount, Some(12.5));
        assert_eq!(batch.trades[0].risk_reward, Some(37.5));

        // the same value as text is read the European way
        let batch = normalize_rows(&[complete("Presa", "1.234,50", "12,5%")]).unwrap();
        assert_eq!(batch.trades[0].amount, Some(1234.5));
        assert_eq!(batch.trades[0].risk_reward, Some(12.5));
    }

    #[test]
    fn test_empty_import_is_rejected() {
        assert!(matches!(normalize_rows(&[]), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_rows_from_csv() {
        let text = "Data,Risultato,Importo\n17/11/2025,Presa,\"50,00\"\n,,\n18/11/2025,Persa,30\n";
        let rows = rows_from_csv(text).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Importo"], json!("50,00"));
        assert_eq!(rows[1]["Risultato"], json!("Persa"));
    }
}
