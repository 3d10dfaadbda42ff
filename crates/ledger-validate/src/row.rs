//! Journal rows after header mapping.

use std::collections::BTreeMap;

use ledger_model::FieldId;
use serde::Serialize;

use crate::amount::parse_amount;

/// Side of a journal line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Debit,
    Credit,
}

impl Side {
    /// Parse a debit/credit indicator cell.
    ///
    /// `D`, `S` (Soll), `DEBE`, `DR`, `DEBIT` and `+` are debits; `H`
    /// (Haber/Haben), `C`, `HABER`, `CR`, `CREDIT` and `-` are credits.
    pub fn from_indicator(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "D" | "S" | "DEBE" | "DR" | "DEBIT" | "+" => Some(Self::Debit),
            "H" | "C" | "HABER" | "CR" | "CREDIT" | "-" => Some(Self::Credit),
            _ => None,
        }
    }

    /// Indicator letter written for derived rows.
    pub fn indicator(&self) -> &'static str {
        match self {
            Self::Debit => "D",
            Self::Credit => "H",
        }
    }
}

/// One journal line expressed in canonical fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MappedRow {
    pub journal_entry_id: Option<String>,
    pub debit_amount: Option<f64>,
    pub credit_amount: Option<f64>,
    pub amount: Option<f64>,
    pub debit_credit_indicator: Option<String>,
}

impl MappedRow {
    /// Row with separate debit and credit columns.
    pub fn debit_credit(entry: impl Into<String>, debit: f64, credit: f64) -> Self {
        Self {
            journal_entry_id: Some(entry.into()),
            debit_amount: Some(debit),
            credit_amount: Some(credit),
            ..Self::default()
        }
    }

    /// Row with a single amount column and optional indicator.
    pub fn with_amount(entry: impl Into<String>, amount: f64, indicator: Option<&str>) -> Self {
        Self {
            journal_entry_id: Some(entry.into()),
            amount: Some(amount),
            debit_credit_indicator: indicator.map(str::to_string),
            ..Self::default()
        }
    }

    /// Debit minus credit for this line, if the row carries any amount.
    ///
    /// Debit/credit columns take precedence (a missing side counts as zero).
    /// Otherwise `amount` is signed by the indicator, or taken as-is when
    /// the indicator is absent or unrecognized.
    pub fn signed_amount(&self) -> Option<f64> {
        if self.debit_amount.is_some() || self.credit_amount.is_some() {
            return Some(self.debit_amount.unwrap_or(0.0) - self.credit_amount.unwrap_or(0.0));
        }
        let amount = self.amount?;
        let side = self
            .debit_credit_indicator
            .as_deref()
            .and_then(Side::from_indicator);
        Some(match side {
            Some(Side::Debit) => amount.abs(),
            Some(Side::Credit) => -amount.abs(),
            None => amount,
        })
    }

    /// Side implied by the signed amount; zero lines have none.
    pub fn side(&self) -> Option<Side> {
        let signed = self.signed_amount()?;
        if signed > 0.0 {
            Some(Side::Debit)
        } else if signed < 0.0 {
            Some(Side::Credit)
        } else {
            None
        }
    }
}

/// Column positions of the balance-relevant fields in a tabular source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    columns: BTreeMap<FieldId, usize>,
}

impl ColumnMap {
    pub fn new(fields: impl IntoIterator<Item = (FieldId, usize)>) -> Self {
        Self {
            columns: fields.into_iter().collect(),
        }
    }

    pub fn column(&self, field: FieldId) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    /// True when rows can carry an amount at all.
    pub fn has_amounts(&self) -> bool {
        [FieldId::DebitAmount, FieldId::CreditAmount, FieldId::Amount]
            .iter()
            .any(|f| self.columns.contains_key(f))
    }

    /// Build a row from one record of cells.
    pub fn row<S: AsRef<str>>(&self, record: &[S]) -> MappedRow {
        let cell = |field: FieldId| {
            self.column(field)
                .and_then(|idx| record.get(idx))
                .map(|s| s.as_ref().trim())
                .filter(|s| !s.is_empty())
        };
        MappedRow {
            journal_entry_id: cell(FieldId::JournalEntryId).map(str::to_string),
            debit_amount: cell(FieldId::DebitAmount).and_then(parse_amount),
            credit_amount: cell(FieldId::CreditAmount).and_then(parse_amount),
            amount: cell(FieldId::Amount).and_then(parse_amount),
            debit_credit_indicator: cell(FieldId::DebitCreditIndicator).map(str::to_string),
        }
    }
}
