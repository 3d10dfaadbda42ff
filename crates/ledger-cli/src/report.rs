//! Per-file results of the read-only commands.

use anyhow::{Result, bail};
use ledger_map::{AmbiguousMatch, ErpDetection, ErpDetector, FieldMatcher, HeaderMapping, ambiguity};
use ledger_model::{DetectionSummary, FieldId, KnowledgeBase, MatchCandidate, is_generic_erp};
use ledger_train::ErpSelector;
use ledger_validate::{BalanceReport, BalanceValidator, ColumnMap, MappedRow};
use serde::Serialize;
use tracing::{info, trace};

use crate::input::TabularFile;

/// Candidates of one header.
#[derive(Debug, Clone, Serialize)]
pub struct HeaderReport {
    pub header: String,
    pub candidates: Vec<MatchCandidate>,
}

impl HeaderReport {
    pub fn top(&self) -> Option<&MatchCandidate> {
        self.candidates.first()
    }
}

/// Output of `detect` for one file.
#[derive(Debug, Clone, Serialize)]
pub struct DetectReport {
    pub file: String,
    pub erp_name: String,
    /// Present when the ERP was inferred.
    pub erp_detection: Option<ErpDetection>,
    pub headers: Vec<HeaderReport>,
    pub mapping: HeaderMapping,
    pub summary: DetectionSummary,
    pub ambiguities: Vec<AmbiguousMatch>,
}

/// Resolve the ERP for `headers`, returning its name and the detection if inferred.
pub fn resolve_erp<S: AsRef<str>>(
    kb: &KnowledgeBase,
    headers: &[S],
    erp: &ErpSelector,
) -> (String, Option<ErpDetection>) {
    match erp {
        ErpSelector::Named(name) => (name.clone(), None),
        ErpSelector::Auto => {
            let detection = ErpDetector::new(FieldMatcher::new(kb)).auto_detect_erp(headers);
            (detection.erp_name.clone(), Some(detection))
        }
    }
}

/// Matcher hint for an ERP name; `generic` matches against every ERP.
pub fn erp_hint(erp_name: &str) -> Option<&str> {
    (!is_generic_erp(erp_name)).then_some(erp_name)
}

pub fn detect(kb: &KnowledgeBase, file: &TabularFile, erp: &ErpSelector) -> DetectReport {
    let matcher = FieldMatcher::new(kb);
    let (erp_name, erp_detection) = resolve_erp(kb, &file.headers, erp);
    let hint = erp_hint(&erp_name);

    let headers: Vec<HeaderReport> = file
        .headers
        .iter()
        .map(|h| HeaderReport {
            header: h.clone(),
            candidates: matcher.match_header(h, hint),
        })
        .collect();
    let mut ambiguities: Vec<AmbiguousMatch> = headers
        .iter()
        .filter_map(|h| ambiguity(&h.header, &h.candidates))
        .collect();
    if let Some(found) = erp_detection.as_ref().and_then(|d| d.ambiguity.clone()) {
        ambiguities.push(found);
    }
    // Coverage counts a header mapped by any ERP, whatever the hint.
    let summary = ErpDetector::new(FieldMatcher::new(kb)).detection_summary(&file.headers);

    DetectReport {
        file: file.name(),
        mapping: matcher.suggest_mapping(&file.headers, hint),
        summary,
        erp_name,
        erp_detection,
        headers,
        ambiguities,
    }
}

/// Output of `balance` for one file.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceCheck {
    pub file: String,
    pub erp_name: String,
    /// (header, field) pairs used to build rows.
    pub columns: Vec<(String, FieldId)>,
    pub report: BalanceReport,
}

/// Map headers one-to-one and validate the file's journal entries.
///
/// Fails when no amount column can be mapped.
pub fn check_balance(
    kb: &KnowledgeBase,
    file: &TabularFile,
    erp: &ErpSelector,
    epsilon: f64,
) -> Result<BalanceCheck> {
    let (erp_name, _) = resolve_erp(kb, &file.headers, erp);
    let mapping = FieldMatcher::new(kb).suggest_mapping(&file.headers, erp_hint(&erp_name));

    let mut columns = Vec::new();
    let mut positions = Vec::new();
    for assignment in &mapping.assignments {
        let candidate = &assignment.candidate;
        columns.push((candidate.header_text.clone(), candidate.field_id));
        positions.push((candidate.field_id, assignment.column));
    }
    let column_map = ColumnMap::new(positions);
    if !column_map.has_amounts() {
        bail!("{}: no debit, credit or amount column could be mapped", file.name());
    }
    if column_map.column(FieldId::JournalEntryId).is_none() {
        info!(file = %file.name(), "no journal entry column, checking file totals only");
    }

    let rows: Vec<MappedRow> = file
        .records
        .iter()
        .map(|record| column_map.row(record.as_slice()))
        .collect();
    trace!(file = %file.name(), rows = rows.len(), "mapped rows");
    let report = BalanceValidator::new(epsilon).validate(&rows);

    Ok(BalanceCheck {
        file: file.name(),
        erp_name,
        columns,
        report,
    })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use ledger_model::SynonymEntry;

    use super::*;

    fn table(headers: &[&str], records: &[&[&str]]) -> TabularFile {
        TabularFile {
            path: PathBuf::from("diario.csv"),
            delimiter: b';',
            headers: headers.iter().map(|h| h.to_string()).collect(),
            records: records
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn detect_infers_erp_and_counts_mapped_headers() {
        let kb = KnowledgeBase::with_default_catalog();
        let file = table(&["BELNR", "BUDAT", "HKONT", "Texto libre xyz"], &[]);
        let report = detect(&kb, &file, &ErpSelector::Auto);
        assert_eq!(report.erp_name, "SAP");
        assert_eq!(report.headers[0].top().unwrap().field_id, FieldId::JournalEntryId);
        assert_eq!(report.summary.total_headers, 4);
        assert!(report.summary.mapped_headers >= 3);
        assert_eq!(report.file, "diario.csv");
    }

    #[test]
    fn balance_needs_an_amount_column() {
        let kb = KnowledgeBase::with_default_catalog();
        let file = table(&["Asiento", "Concepto"], &[&["1", "x"]]);
        assert!(check_balance(&kb, &file, &ErpSelector::Auto, 0.01).is_err());
    }

    #[test]
    fn balance_reports_residuals() {
        let kb = KnowledgeBase::with_default_catalog();
        let file = table(
            &["Asiento", "Debe", "Haber"],
            &[&["1", "10", "0"], &["1", "0", "10"], &["2", "5", "0"]],
        );
        let check = check_balance(&kb, &file, &ErpSelector::Auto, 0.01).unwrap();
        assert_eq!(check.erp_name, "generic");
        assert_eq!(check.report.entries_count, 2);
        assert_eq!(check.report.unbalanced.len(), 1);
        assert_eq!(check.report.unbalanced[0].difference, 5.0);
    }

    #[test]
    fn repeated_headers_read_their_own_columns() {
        let mut kb = KnowledgeBase::with_default_catalog();
        kb.upsert_synonym(
            FieldId::CreditAmount,
            SynonymEntry::new("ContaPlus", "Debe", 0.9),
        )
        .unwrap();
        let file = table(&["Asiento", "Debe", "Debe"], &[&["1", "10", "4"]]);
        let check =
            check_balance(&kb, &file, &ErpSelector::Named("SAP".into()), 0.01).unwrap();
        assert_eq!(
            check.columns,
            vec![
                ("Asiento".to_string(), FieldId::JournalEntryId),
                ("Debe".to_string(), FieldId::DebitAmount),
                ("Debe".to_string(), FieldId::CreditAmount),
            ]
        );
        assert_eq!(check.report.unbalanced.len(), 1);
        assert_eq!(check.report.unbalanced[0].difference, 6.0);
    }
}
