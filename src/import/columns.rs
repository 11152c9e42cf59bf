//! Header detection for journal spreadsheets exported with Italian labels.

const TRADE: &str = "Trade";
const DATE: &str = "Data";
const DAY: &str = "Apertura Giorno";
const CURRENCY: &str = "Valuta";
const POSITION: &str = "Posizione";
const OPEN_TIME: &str = "Orario Apertura";
const GROUP: &str = "Tipo Gruppo";
const RESULT: &str = "Risultato";
const NOTES: &str = "Note";

const AMOUNT_MARKER: &str = "Importo";
const RISK_REWARD_MARKER: &str = "Risk Reward";
const PNL_MARKER: &str = "Guadagno/Perdita";
const NUMERIC_RESULT_MARKER: &str = "Esito Numerico";

/// Strip replacement characters left by a wrong encoding, turn non-breaking
/// spaces into plain ones and trim.
pub fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| *c != '\u{FFFD}' && !c.is_control())
        .map(|c| if c == '\u{00A0}' { ' ' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Which source header feeds each canonical field. Values are the original,
/// unnormalized header strings so rows can be indexed directly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMap {
    pub trade: Option<String>,
    pub date: Option<String>,
    pub day: Option<String>,
    pub currency: Option<String>,
    pub position: Option<String>,
    pub open_time: Option<String>,
    pub group: Option<String>,
    pub result: Option<String>,
    pub amount: Option<String>,
    pub risk_reward: Option<String>,
    pub pnl: Option<String>,
    pub equity: Option<String>,
    pub notes: Option<String>,
    pub numeric_result: Option<String>,
}

impl ColumnMap {
    pub fn detect<'a, I>(headers: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let headers: Vec<(&str, String)> = headers
            .into_iter()
            .map(|h| (h, normalize_header(h)))
            .collect();

        let exact = |label: &str| {
            headers
                .iter()
                .find(|(_, n)| n == label)
                .map(|(h, _)| h.to_string())
        };
        let containing = |marker: &str| {
            headers
                .iter()
                .find(|(_, n)| n.contains(marker))
                .map(|(h, _)| h.to_string())
        };

        let amount = containing(AMOUNT_MARKER);
        let pnl = containing(PNL_MARKER);

        // The running balance column is the one titled with a euro amount,
        // e.g. "700,00 €". A broken encoding turns the sign into U+FFFD.
        let equity = headers
            .iter()
            .find(|(h, _)| {
                (h.contains('€') || h.contains('\u{FFFD}'))
                    && h.contains(',')
                    && Some(h.to_string()) != amount
                    && Some(h.to_string()) != pnl
            })
            .map(|(h, _)| h.to_string());

        ColumnMap {
            trade: exact(TRADE),
            date: exact(DATE),
            day: exact(DAY),
            currency: exact(CURRENCY),
            position: exact(POSITION),
            open_time: exact(OPEN_TIME),
            group: exact(GROUP),
            result: exact(RESULT),
            amount,
            risk_reward: containing(RISK_REWARD_MARKER),
            pnl,
            equity,
            notes: exact(NOTES),
            numeric_result: containing(NUMERIC_RESULT_MARKER),
        }
    }

    /// Columns a row must fill to be imported, by canonical name.
    pub fn required(&self) -> [(&'static str, Option<&str>); 9] {
        [
            ("date", self.date.as_deref()),
            ("dayOfWeek", self.day.as_deref()),
            ("currencyPair", self.currency.as_deref()),
            ("positionType", self.position.as_deref()),
            ("openTime", self.open_time.as_deref()),
            ("groupType", self.group.as_deref()),
            ("result", self.result.as_deref()),
            ("amount", self.amount.as_deref()),
            ("riskReward", self.risk_reward.as_deref()),
        ]
    }

    /// Required columns absent from the header row altogether.
    pub fn missing(&self) -> Vec<&'static str> {
        self.required()
            .iter()
            .filter(|(_, header)| header.is_none())
            .map(|(name, _)| *name)
            .collect()
    }
}
