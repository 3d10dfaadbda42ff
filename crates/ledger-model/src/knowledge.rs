//! The synonym knowledge base: field catalog, synonyms and thresholds.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ModelError, Result};
use crate::field::{FieldDefinition, FieldId};
use crate::normalize::header_key;
use crate::synonym::SynonymEntry;

/// Document keys preserved verbatim across a load/persist round trip.
pub type Extensions = BTreeMap<String, serde_json::Value>;

/// ERP name used when no specific ERP is detected or requested.
pub const GENERIC_ERP: &str = "generic";

/// True for the generic pseudo-ERP (case-insensitive).
pub fn is_generic_erp(erp: &str) -> bool {
    erp.eq_ignore_ascii_case(GENERIC_ERP)
}

/// System thresholds stored alongside the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSettings {
    pub version: String,
    /// Candidates below this confidence are dropped.
    pub min_confidence_threshold: f64,
    /// Base confidence of an exact match.
    pub exact_match_threshold: f64,
    /// Factor applied to similarity for partial matches.
    pub partial_match_threshold: f64,
    /// Re-read the backing store at session start when it changed on disk.
    pub auto_reload_enabled: bool,
    #[serde(default, skip_serializing_if = "Extensions::is_empty")]
    pub extensions: Extensions,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            version: "2.0.0".to_string(),
            min_confidence_threshold: 0.6,
            exact_match_threshold: 0.95,
            partial_match_threshold: 0.85,
            auto_reload_enabled: false,
            extensions: Extensions::new(),
        }
    }
}

impl SystemSettings {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("min_confidence_threshold", self.min_confidence_threshold),
            ("exact_match_threshold", self.exact_match_threshold),
            ("partial_match_threshold", self.partial_match_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ModelError::InvalidThreshold { name, value });
            }
        }
        Ok(())
    }
}

/// Two fields claimed the same (ERP, header) pair; the later write won.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SynonymConflict {
    pub erp_name: String,
    pub raw_text: String,
    pub kept: FieldId,
    pub dropped: FieldId,
}

/// Result of [`KnowledgeBase::upsert_synonym`].
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertOutcome {
    /// The entry it replaced, if one existed under the same field.
    pub previous: Option<SynonymEntry>,
    /// Entries removed from other fields to keep (ERP, header) unique.
    pub displaced: Vec<SynonymConflict>,
}

impl UpsertOutcome {
    pub fn created(&self) -> bool {
        self.previous.is_none()
    }
}

/// In-memory knowledge base.
///
/// Invariant: within one ERP, a normalized header maps to at most one field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnowledgeBase {
    pub system: SystemSettings,
    definitions: BTreeMap<FieldId, FieldDefinition>,
    #[serde(skip_serializing_if = "Extensions::is_empty")]
    pub extensions: Extensions,
}

impl KnowledgeBase {
    /// An empty catalog with the given settings.
    pub fn new(system: SystemSettings) -> Self {
        Self {
            system,
            definitions: BTreeMap::new(),
            extensions: Extensions::new(),
        }
    }

    /// Build from loaded parts, validating values and enforcing synonym
    /// uniqueness. Conflicting entries resolve in favour of the field that
    /// comes later in catalog order.
    pub fn from_parts(
        system: SystemSettings,
        definitions: Vec<FieldDefinition>,
        extensions: Extensions,
    ) -> Result<(Self, Vec<SynonymConflict>)> {
        system.validate()?;
        let mut kb = Self {
            system,
            definitions: BTreeMap::new(),
            extensions,
        };
        let mut conflicts = Vec::new();
        let mut ordered = definitions;
        ordered.sort_by_key(|d| d.id);
        for definition in ordered {
            conflicts.extend(kb.insert_definition(definition)?);
        }
        Ok((kb, conflicts))
    }

    /// Add or replace a definition, inserting its synonyms one by one.
    pub fn insert_definition(
        &mut self,
        mut definition: FieldDefinition,
    ) -> Result<Vec<SynonymConflict>> {
        let synonyms = std::mem::take(&mut definition.synonyms);
        for entry in &synonyms {
            validate_entry(entry)?;
        }
        let id = definition.id;
        self.definitions.insert(id, definition);
        let mut conflicts = Vec::new();
        for entry in synonyms {
            conflicts.extend(self.upsert_synonym(id, entry)?.displaced);
        }
        Ok(conflicts)
    }

    /// Insert a definition whose synonyms are already known to be unique.
    pub(crate) fn insert_seed(&mut self, definition: FieldDefinition) {
        self.definitions.insert(definition.id, definition);
    }

    pub fn definitions(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.definitions.values()
    }

    pub fn active_definitions(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.definitions.values().filter(|d| d.active)
    }

    pub fn definition(&self, id: FieldId) -> Option<&FieldDefinition> {
        self.definitions.get(&id)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Distinct ERP names that own at least one synonym, sorted.
    pub fn erp_names(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut names = Vec::new();
        for entry in self.definitions.values().flat_map(|d| d.synonyms.iter()) {
            if seen.insert(entry.erp_name.to_lowercase()) {
                names.push(entry.erp_name.clone());
            }
        }
        names.sort();
        names
    }

    /// Synonyms registered under `erp` whose text normalizes like `text`.
    pub fn find_synonyms(&self, erp: &str, text: &str) -> Vec<(FieldId, &SynonymEntry)> {
        let key = header_key(text);
        self.definitions
            .values()
            .flat_map(|d| d.synonyms.iter().map(move |s| (d.id, s)))
            .filter(|(_, s)| s.matches(erp, &key))
            .collect()
    }

    /// Create or replace the synonym for (`entry.erp_name`, `entry.raw_text`)
    /// under `field`. Validation happens before any mutation, so an error
    /// leaves the knowledge base untouched.
    pub fn upsert_synonym(&mut self, field: FieldId, entry: SynonymEntry) -> Result<UpsertOutcome> {
        validate_entry(&entry)?;
        if !self.definitions.contains_key(&field) {
            return Err(ModelError::UndefinedField(field));
        }
        let key = entry.key();

        let mut displaced = Vec::new();
        for (id, definition) in &mut self.definitions {
            if *id == field {
                continue;
            }
            let before = definition.synonyms.len();
            definition
                .synonyms
                .retain(|s| !s.matches(&entry.erp_name, &key));
            if definition.synonyms.len() != before {
                warn!(
                    erp = %entry.erp_name,
                    header = %entry.raw_text,
                    kept = %field,
                    dropped = %id,
                    "synonym conflict, last write wins"
                );
                displaced.push(SynonymConflict {
                    erp_name: entry.erp_name.clone(),
                    raw_text: entry.raw_text.clone(),
                    kept: field,
                    dropped: *id,
                });
            }
        }

        let definition = self
            .definitions
            .get_mut(&field)
            .ok_or(ModelError::UndefinedField(field))?;
        let previous = match definition
            .synonyms
            .iter()
            .position(|s| s.matches(&entry.erp_name, &key))
        {
            // Same spelling keeps its slot; a re-cased ERP name is re-sorted.
            Some(idx) if definition.synonyms[idx].erp_name == entry.erp_name => {
                Some(std::mem::replace(&mut definition.synonyms[idx], entry))
            }
            Some(idx) => {
                let old = definition.synonyms.remove(idx);
                definition.insert_synonym(entry);
                Some(old)
            }
            None => {
                definition.insert_synonym(entry);
                None
            }
        };
        Ok(UpsertOutcome {
            previous,
            displaced,
        })
    }
}

fn validate_entry(entry: &SynonymEntry) -> Result<()> {
    if entry.erp_name.trim().is_empty() {
        return Err(ModelError::EmptyErpName(entry.raw_text.clone()));
    }
    if entry.key().is_empty() {
        return Err(ModelError::EmptySynonym(entry.raw_text.clone()));
    }
    if !(0.0..=1.0).contains(&entry.confidence_boost) {
        return Err(ModelError::InvalidBoost {
            raw_text: entry.raw_text.clone(),
            boost: entry.confidence_boost,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kb_with(fields: &[FieldId]) -> KnowledgeBase {
        let definitions = fields.iter().map(|id| FieldDefinition::new(*id)).collect();
        KnowledgeBase::from_parts(SystemSettings::default(), definitions, Extensions::new())
            .unwrap()
            .0
    }

    #[test]
    fn upsert_replaces_same_field_entry() {
        let mut kb = kb_with(&[FieldId::JournalEntryId]);
        let first = kb
            .upsert_synonym(FieldId::JournalEntryId, SynonymEntry::new("SAP", "BELNR", 0.5))
            .unwrap();
        assert!(first.created());
        let second = kb
            .upsert_synonym(FieldId::JournalEntryId, SynonymEntry::new("sap", "belnr", 0.7))
            .unwrap();
        assert!(!second.created());
        let def = kb.definition(FieldId::JournalEntryId).unwrap();
        assert_eq!(def.synonyms.len(), 1);
        assert_eq!(def.synonyms[0].confidence_boost, 0.7);
    }

    #[test]
    fn upsert_moves_conflicting_entry_between_fields() {
        let mut kb = kb_with(&[FieldId::Amount, FieldId::DebitAmount]);
        kb.upsert_synonym(FieldId::Amount, SynonymEntry::new("SAP", "DMBTR", 0.8))
            .unwrap();
        let outcome = kb
            .upsert_synonym(FieldId::DebitAmount, SynonymEntry::new("SAP", "dmbtr", 0.6))
            .unwrap();
        assert_eq!(outcome.displaced.len(), 1);
        assert_eq!(outcome.displaced[0].dropped, FieldId::Amount);
        assert!(kb.definition(FieldId::Amount).unwrap().synonyms.is_empty());
        let found = kb.find_synonyms("SAP", "DMBTR");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, FieldId::DebitAmount);
    }

    #[test]
    fn same_text_under_different_erps_is_allowed() {
        let mut kb = kb_with(&[FieldId::Amount, FieldId::DebitAmount]);
        kb.upsert_synonym(FieldId::Amount, SynonymEntry::new("SAP", "Importe", 0.8))
            .unwrap();
        let outcome = kb
            .upsert_synonym(FieldId::DebitAmount, SynonymEntry::new("ContaPlus", "Importe", 0.8))
            .unwrap();
        assert!(outcome.displaced.is_empty());
        assert_eq!(kb.erp_names(), vec!["ContaPlus".to_string(), "SAP".to_string()]);
    }

    #[test]
    fn invalid_upsert_leaves_state_unchanged() {
        let mut kb = kb_with(&[FieldId::Amount]);
        let before = kb.clone();
        let err = kb
            .upsert_synonym(FieldId::Amount, SynonymEntry::new("SAP", "DMBTR", 1.5))
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidBoost { .. }));
        assert!(kb.upsert_synonym(FieldId::VendorId, SynonymEntry::new("SAP", "LIFNR", 0.5)).is_err());
        assert!(kb.upsert_synonym(FieldId::Amount, SynonymEntry::new("SAP", " - ", 0.5)).is_err());
        assert_eq!(kb, before);
    }

    #[test]
    fn duplicate_pairs_in_loaded_parts_resolve_to_later_field() {
        let mut amount = FieldDefinition::new(FieldId::Amount);
        amount.synonyms.push(SynonymEntry::new("SAP", "WRBTR", 0.8));
        let mut debit = FieldDefinition::new(FieldId::DebitAmount);
        debit.synonyms.push(SynonymEntry::new("SAP", "WRBTR", 0.8));
        let (kb, conflicts) = KnowledgeBase::from_parts(
            SystemSettings::default(),
            vec![debit, amount],
            Extensions::new(),
        )
        .unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kept, FieldId::DebitAmount);
        assert_eq!(kb.find_synonyms("SAP", "WRBTR")[0].0, FieldId::DebitAmount);
    }

    #[test]
    fn settings_outside_unit_range_are_rejected() {
        let settings = SystemSettings {
            min_confidence_threshold: 1.2,
            ..SystemSettings::default()
        };
        assert!(
            KnowledgeBase::from_parts(settings, Vec::new(), Extensions::new()).is_err()
        );
    }
}
