//! Debit/credit balance checks per journal entry and per file.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{info, trace, warn};

use crate::row::MappedRow;

/// Residual below which an entry counts as balanced, in currency units.
pub const DEFAULT_EPSILON: f64 = 0.01;

/// A journal entry whose debits and credits differ.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnbalancedEntry {
    pub journal_entry_id: String,
    /// Debits minus credits.
    pub difference: f64,
    pub total_debit: f64,
    pub total_credit: f64,
    pub line_count: usize,
}

/// Outcome of [`BalanceValidator::validate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceReport {
    pub epsilon: f64,
    pub entries_count: usize,
    pub balanced_entries: usize,
    /// Ordered by journal entry id.
    pub unbalanced: Vec<UnbalancedEntry>,
    pub total_debit: f64,
    pub total_credit: f64,
    /// File-level debits minus credits.
    pub difference: f64,
    pub is_balanced: bool,
    /// Rows with an amount but no journal entry id; counted in file totals only.
    pub ungrouped_rows: usize,
    /// Rows with no usable amount.
    pub skipped_rows: usize,
}

impl BalanceReport {
    /// Fraction of journal entries that balance, in [0, 1].
    pub fn balance_rate(&self) -> f64 {
        if self.entries_count == 0 {
            0.0
        } else {
            self.balanced_entries as f64 / self.entries_count as f64
        }
    }
}

#[derive(Debug, Default)]
struct Totals {
    debit: f64,
    credit: f64,
    lines: usize,
}

impl Totals {
    fn add(&mut self, signed: f64) {
        if signed >= 0.0 {
            self.debit += signed;
        } else {
            self.credit -= signed;
        }
        self.lines += 1;
    }

    fn difference(&self) -> f64 {
        self.debit - self.credit
    }
}

/// Checks that debits equal credits within a tolerance.
///
/// Purely diagnostic: input rows are never modified and an unbalanced
/// result is reported, not raised.
#[derive(Debug, Clone, Copy)]
pub struct BalanceValidator {
    epsilon: f64,
}

impl Default for BalanceValidator {
    fn default() -> Self {
        Self::new(DEFAULT_EPSILON)
    }
}

impl BalanceValidator {
    pub fn new(epsilon: f64) -> Self {
        Self {
            epsilon: epsilon.abs(),
        }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Strictly below the tolerance.
    pub fn is_balanced(&self, difference: f64) -> bool {
        difference.abs() < self.epsilon
    }

    pub fn validate(&self, rows: &[MappedRow]) -> BalanceReport {
        let mut entries: BTreeMap<&str, Totals> = BTreeMap::new();
        let mut file = Totals::default();
        let mut ungrouped_rows = 0;
        let mut skipped_rows = 0;

        for row in rows {
            let Some(signed) = row.signed_amount() else {
                skipped_rows += 1;
                continue;
            };
            trace!(entry = ?row.journal_entry_id, signed, "balance line");
            file.add(signed);
            match row.journal_entry_id.as_deref().map(str::trim) {
                Some(id) if !id.is_empty() => entries.entry(id).or_default().add(signed),
                _ => ungrouped_rows += 1,
            }
        }

        let mut unbalanced = Vec::new();
        for (id, totals) in &entries {
            let difference = totals.difference();
            if !self.is_balanced(difference) {
                warn!(entry = %id, difference, "unbalanced journal entry");
                unbalanced.push(UnbalancedEntry {
                    journal_entry_id: (*id).to_string(),
                    difference,
                    total_debit: totals.debit,
                    total_credit: totals.credit,
                    line_count: totals.lines,
                });
            }
        }

        let difference = file.difference();
        let report = BalanceReport {
            epsilon: self.epsilon,
            entries_count: entries.len(),
            balanced_entries: entries.len() - unbalanced.len(),
            unbalanced,
            total_debit: file.debit,
            total_credit: file.credit,
            difference,
            is_balanced: self.is_balanced(difference),
            ungrouped_rows,
            skipped_rows,
        };
        info!(
            entries = report.entries_count,
            unbalanced = report.unbalanced.len(),
            file_balanced = report.is_balanced,
            "balance validation complete"
        );
        report
    }
}
