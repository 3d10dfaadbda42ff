//! Scoring a single header against the field catalog.

use std::collections::{BTreeMap, BTreeSet};

use ledger_model::{
    FieldDefinition, FieldId, KnowledgeBase, MatchCandidate, MatchKind, header_key,
    is_generic_erp,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::score::{cross_erp_confidence, exact_confidence, partial_confidence, similarity};

/// Confidences closer than this are treated as a tie.
pub(crate) const TIE_EPSILON: f64 = 1e-9;

/// Two or more options tied at the top after scoring.
///
/// Non-fatal: the deterministic tie-break already picked a winner; this is
/// reported so the choice can be reviewed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AmbiguousMatch {
    /// One header scored equally against several fields.
    Fields {
        header: String,
        fields: Vec<FieldId>,
        confidence: f64,
    },
    /// Several ERPs reached the same detection score.
    Erps { erps: Vec<String>, score: f64 },
}

/// Scores headers against one immutable knowledge base snapshot.
#[derive(Debug, Clone, Copy)]
pub struct FieldMatcher<'a> {
    kb: &'a KnowledgeBase,
}

impl<'a> FieldMatcher<'a> {
    pub fn new(kb: &'a KnowledgeBase) -> Self {
        Self { kb }
    }

    pub fn knowledge_base(&self) -> &'a KnowledgeBase {
        self.kb
    }

    /// Ranked candidates for `header`, highest confidence first.
    ///
    /// With an ERP hint, synonyms of that ERP and of `generic` match exactly;
    /// synonyms of other ERPs only produce `synonym`-kind candidates. A
    /// synonym of the hinted ERP shadows a `generic` one with the same text,
    /// which then also counts as `synonym`. Without a hint every synonym is
    /// in scope. Only candidates at or above
    /// `min_confidence_threshold` are returned, one per field.
    pub fn match_header(&self, header: &str, erp_hint: Option<&str>) -> Vec<MatchCandidate> {
        let key = header_key(header);
        if key.is_empty() {
            return Vec::new();
        }
        let min = self.kb.system.min_confidence_threshold;
        let scope = Scope {
            erp_hint,
            generic_shadowed: self.hinted_synonym_exists(&key, erp_hint),
        };

        let mut candidates: Vec<MatchCandidate> = self
            .kb
            .active_definitions()
            .filter_map(|def| self.best_for_field(header, &key, def, scope))
            .filter(|c| c.confidence >= min)
            .collect();
        candidates.sort_by(MatchCandidate::rank_cmp);

        for c in &candidates {
            debug!(
                header,
                field = %c.field_id,
                kind = c.match_kind.as_str(),
                confidence = c.confidence,
                matched = %c.matched_text,
                "candidate"
            );
        }
        if let Some(AmbiguousMatch::Fields { fields, confidence, .. }) =
            ambiguity(header, &candidates)
        {
            warn!(header, ?fields, confidence, "ambiguous header match");
        }
        candidates
    }

    /// True when an active field has a synonym of the (non-generic) hinted
    /// ERP whose key equals `key`.
    fn hinted_synonym_exists(&self, key: &str, erp_hint: Option<&str>) -> bool {
        erp_hint.is_some_and(|hint| {
            !is_generic_erp(hint)
                && self
                    .kb
                    .active_definitions()
                    .any(|def| def.synonyms.iter().any(|s| s.matches(hint, key)))
        })
    }

    /// Best candidate a single field offers for `header`, before thresholding.
    fn best_for_field(
        &self,
        header: &str,
        key: &str,
        def: &FieldDefinition,
        scope: Scope<'_>,
    ) -> Option<MatchCandidate> {
        let settings = &self.kb.system;
        let candidate = |confidence: f64,
                         match_kind: MatchKind,
                         boost: f64,
                         matched_text: &str,
                         source_erp: Option<&str>| MatchCandidate {
            header_text: header.to_string(),
            field_id: def.id,
            confidence,
            match_kind,
            confidence_boost: boost,
            matched_text: matched_text.to_string(),
            source_erp: source_erp.map(str::to_string),
        };

        let mut best: Option<MatchCandidate> = None;
        let mut offer = |c: MatchCandidate| {
            if best.as_ref().is_none_or(|b| c.rank_cmp(b).is_lt()) {
                best = Some(c);
            }
        };

        for name in [def.id.as_str(), def.name.as_str()] {
            let name_key = header_key(name);
            if name_key == key {
                offer(candidate(exact_confidence(settings, 0.0), MatchKind::Exact, 0.0, name, None));
            } else {
                let sim = similarity(key, &name_key);
                offer(candidate(
                    partial_confidence(settings, sim, 0.0),
                    MatchKind::Partial,
                    0.0,
                    name,
                    None,
                ));
            }
        }

        for entry in &def.synonyms {
            let hinted = scope
                .erp_hint
                .is_none_or(|hint| entry.erp_name.eq_ignore_ascii_case(hint));
            let generic = is_generic_erp(&entry.erp_name);
            let in_scope = hinted || generic;
            let boost = entry.confidence_boost;
            let erp = Some(entry.erp_name.as_str());
            let entry_key = entry.key();
            if entry_key == key {
                let (confidence, kind) = if hinted || (generic && !scope.generic_shadowed) {
                    (exact_confidence(settings, boost), MatchKind::Exact)
                } else {
                    (cross_erp_confidence(settings, boost), MatchKind::Synonym)
                };
                offer(candidate(confidence, kind, boost, &entry.raw_text, erp));
            } else if in_scope {
                let sim = similarity(key, &entry_key);
                offer(candidate(
                    partial_confidence(settings, sim, boost),
                    MatchKind::Partial,
                    boost,
                    &entry.raw_text,
                    erp,
                ));
            }
        }

        best
    }

    /// Greedy one-to-one assignment of headers to fields.
    ///
    /// All (header, field) candidates are ranked together; each header and
    /// each field is used at most once. Headers that end up without a field
    /// are listed in `unmapped` in input order.
    pub fn suggest_mapping(&self, headers: &[String], erp_hint: Option<&str>) -> HeaderMapping {
        let mut ranked: Vec<(usize, MatchCandidate)> = headers
            .iter()
            .enumerate()
            .flat_map(|(idx, h)| {
                self.match_header(h, erp_hint)
                    .into_iter()
                    .map(move |c| (idx, c))
            })
            .collect();
        ranked.sort_by(|a, b| a.1.rank_cmp(&b.1).then(a.0.cmp(&b.0)));

        let mut used_headers = BTreeSet::new();
        let mut used_fields = BTreeSet::new();
        let mut assigned: BTreeMap<usize, MatchCandidate> = BTreeMap::new();
        for (idx, candidate) in ranked {
            if used_headers.contains(&idx) || used_fields.contains(&candidate.field_id) {
                continue;
            }
            used_headers.insert(idx);
            used_fields.insert(candidate.field_id);
            assigned.insert(idx, candidate);
        }

        let unmapped = headers
            .iter()
            .enumerate()
            .filter(|(idx, _)| !assigned.contains_key(idx))
            .map(|(_, h)| h.clone())
            .collect();
        HeaderMapping {
            assignments: assigned
                .into_iter()
                .map(|(column, candidate)| ColumnAssignment { column, candidate })
                .collect(),
            unmapped,
        }
    }
}

/// Which synonyms match exactly for one query.
#[derive(Debug, Clone, Copy)]
struct Scope<'h> {
    erp_hint: Option<&'h str>,
    /// The hinted ERP has its own synonym for the header.
    generic_shadowed: bool,
}

/// A header, by column position, assigned to a field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnAssignment {
    /// Zero-based position in the header row; header texts may repeat.
    pub column: usize,
    #[serde(flatten)]
    pub candidate: MatchCandidate,
}

/// Result of [`FieldMatcher::suggest_mapping`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct HeaderMapping {
    /// One assignment per mapped header, in column order.
    pub assignments: Vec<ColumnAssignment>,
    pub unmapped: Vec<String>,
}

impl HeaderMapping {
    fn assignment_for(&self, field: FieldId) -> Option<&ColumnAssignment> {
        self.assignments.iter().find(|a| a.candidate.field_id == field)
    }

    /// Header mapped onto `field`, if any.
    pub fn header_for(&self, field: FieldId) -> Option<&str> {
        self.assignment_for(field)
            .map(|a| a.candidate.header_text.as_str())
    }

    /// Column mapped onto `field`, if any.
    pub fn column_for(&self, field: FieldId) -> Option<usize> {
        self.assignment_for(field).map(|a| a.column)
    }
}

/// Fields tied with the top candidate, if more than one.
pub fn ambiguity(header: &str, ranked: &[MatchCandidate]) -> Option<AmbiguousMatch> {
    let top = ranked.first()?;
    let fields: Vec<FieldId> = ranked
        .iter()
        .take_while(|c| (c.confidence - top.confidence).abs() < TIE_EPSILON)
        .map(|c| c.field_id)
        .collect();
    (fields.len() > 1).then(|| AmbiguousMatch::Fields {
        header: header.to_string(),
        fields,
        confidence: top.confidence,
    })
}

#[cfg(test)]
mod tests {
    use ledger_model::{Extensions, SynonymEntry, SystemSettings};

    use super::*;

    fn kb() -> KnowledgeBase {
        let mut kb = KnowledgeBase::from_parts(
            SystemSettings::default(),
            FieldId::ALL.iter().map(|id| FieldDefinition::new(*id)).collect(),
            Extensions::new(),
        )
        .unwrap()
        .0;
        kb.upsert_synonym(FieldId::JournalEntryId, SynonymEntry::new("SAP", "BELNR", 0.9))
            .unwrap();
        kb.upsert_synonym(FieldId::PostingDate, SynonymEntry::new("generic", "Fecha", 0.9))
            .unwrap();
        kb
    }

    #[test]
    fn canonical_id_and_display_name_match_exactly() {
        let kb = kb();
        let matcher = FieldMatcher::new(&kb);
        for header in ["gl_account_number", "GL Account Number", "GLAccountNumber"] {
            let top = &matcher.match_header(header, None)[0];
            assert_eq!(top.field_id, FieldId::GlAccountNumber);
            assert_eq!(top.match_kind, MatchKind::Exact);
            assert_eq!(top.confidence, 0.95);
        }
    }

    #[test]
    fn other_erp_synonym_is_a_synonym_candidate() {
        let kb = kb();
        let matcher = FieldMatcher::new(&kb);
        let top = &matcher.match_header("BELNR", Some("ContaPlus"))[0];
        assert_eq!(top.field_id, FieldId::JournalEntryId);
        assert_eq!(top.match_kind, MatchKind::Synonym);
        assert!((top.confidence - 0.94).abs() < 1e-9);

        let top = &matcher.match_header("BELNR", Some("sap"))[0];
        assert_eq!(top.match_kind, MatchKind::Exact);
        assert_eq!(top.confidence, 1.0);
    }

    #[test]
    fn generic_synonyms_apply_under_any_hint() {
        let kb = kb();
        let matcher = FieldMatcher::new(&kb);
        let top = &matcher.match_header("FECHA", Some("SAP"))[0];
        assert_eq!(top.field_id, FieldId::PostingDate);
        assert_eq!(top.match_kind, MatchKind::Exact);
    }

    #[test]
    fn erp_synonym_shadows_generic_one_with_same_text() {
        let mut kb = kb();
        kb.upsert_synonym(FieldId::EntryDate, SynonymEntry::new("SAP", "Fecha", 0.5))
            .unwrap();
        let matcher = FieldMatcher::new(&kb);

        let ranked = matcher.match_header("Fecha", Some("SAP"));
        assert_eq!(ranked[0].field_id, FieldId::EntryDate);
        assert_eq!(ranked[0].match_kind, MatchKind::Exact);
        assert_eq!(ranked[0].source_erp.as_deref(), Some("SAP"));
        let generic = ranked
            .iter()
            .find(|c| c.field_id == FieldId::PostingDate)
            .unwrap();
        assert_eq!(generic.match_kind, MatchKind::Synonym);
        assert!(generic.confidence < ranked[0].confidence);

        // Other ERPs still see the generic synonym as exact.
        let top = &matcher.match_header("Fecha", Some("ContaPlus"))[0];
        assert_eq!(top.field_id, FieldId::PostingDate);
        assert_eq!(top.match_kind, MatchKind::Exact);
    }

    #[test]
    fn unrelated_or_empty_headers_yield_nothing() {
        let kb = kb();
        let matcher = FieldMatcher::new(&kb);
        assert!(matcher.match_header("   ", None).is_empty());
        assert!(matcher.match_header("zzqx", None).is_empty());
    }

    #[test]
    fn inactive_fields_are_skipped() {
        let mut kb = kb();
        let mut def = kb.definition(FieldId::VendorId).unwrap().clone();
        def.active = false;
        kb.insert_definition(def).unwrap();
        let matcher = FieldMatcher::new(&kb);
        assert!(
            matcher
                .match_header("vendor_id", None)
                .iter()
                .all(|c| c.field_id != FieldId::VendorId)
        );
    }

    #[test]
    fn one_to_one_mapping_prefers_strongest_claim() {
        let kb = kb();
        let matcher = FieldMatcher::new(&kb);
        let headers = vec![
            "Posting Date".to_string(),
            "Fecha".to_string(),
            "Amount".to_string(),
        ];
        let mapping = matcher.suggest_mapping(&headers, None);
        assert_eq!(mapping.header_for(FieldId::PostingDate), Some("Fecha"));
        assert_eq!(mapping.header_for(FieldId::Amount), Some("Amount"));
        assert!(
            mapping
                .assignments
                .iter()
                .all(|a| a.column != 0 || a.candidate.field_id != FieldId::PostingDate)
        );
        assert_eq!(mapping.assignments.len() + mapping.unmapped.len(), headers.len());
    }

    #[test]
    fn repeated_header_text_keeps_its_own_column() {
        let mut kb = kb();
        kb.upsert_synonym(FieldId::Amount, SynonymEntry::new("generic", "Importe", 0.9))
            .unwrap();
        kb.upsert_synonym(FieldId::DebitAmount, SynonymEntry::new("ContaPlus", "Importe", 0.9))
            .unwrap();
        let matcher = FieldMatcher::new(&kb);
        let headers = vec![
            "Importe".to_string(),
            "BELNR".to_string(),
            "Importe".to_string(),
        ];
        let mapping = matcher.suggest_mapping(&headers, Some("SAP"));
        assert_eq!(mapping.column_for(FieldId::Amount), Some(0));
        assert_eq!(mapping.column_for(FieldId::JournalEntryId), Some(1));
        assert_eq!(mapping.column_for(FieldId::DebitAmount), Some(2));
        assert!(mapping.unmapped.is_empty());
    }

    #[test]
    fn ties_are_reported() {
        let candidates: Vec<MatchCandidate> = [FieldId::Amount, FieldId::DebitAmount]
            .into_iter()
            .map(|field_id| MatchCandidate {
                header_text: "Importe".into(),
                field_id,
                confidence: 0.8,
                match_kind: MatchKind::Partial,
                confidence_boost: 0.0,
                matched_text: "x".into(),
                source_erp: None,
            })
            .collect();
        let found = ambiguity("Importe", &candidates).unwrap();
        assert_eq!(
            found,
            AmbiguousMatch::Fields {
                header: "Importe".into(),
                fields: vec![FieldId::Amount, FieldId::DebitAmount],
                confidence: 0.8,
            }
        );
        assert!(ambiguity("Importe", &candidates[..1]).is_none());
    }
}
