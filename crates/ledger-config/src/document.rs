//! On-disk YAML layout of the knowledge base and its conversion to the model.
//!
//! Every section carries a flattened `extra` map so keys written by newer
//! versions (or by hand) survive a load/persist round trip.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use ledger_model::{
    DataType, Extensions, FieldDefinition, FieldId, KnowledgeBase, SynonymConflict,
    SynonymEntry, SystemSettings,
};
use serde::{Deserialize, Serialize};

/// Root of the YAML document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigDocument {
    #[serde(default)]
    pub system: SystemSection,
    pub field_definitions: BTreeMap<String, FieldSection>,
    #[serde(flatten)]
    pub extra: Extensions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemSection {
    #[serde(default = "defaults::version")]
    pub version: String,
    #[serde(default = "defaults::min_confidence")]
    pub min_confidence_threshold: f64,
    #[serde(default = "defaults::exact_match")]
    pub exact_match_threshold: f64,
    #[serde(default = "defaults::partial_match")]
    pub partial_match_threshold: f64,
    #[serde(default)]
    pub auto_reload_enabled: bool,
    #[serde(flatten)]
    pub extra: Extensions,
}

impl Default for SystemSection {
    fn default() -> Self {
        SystemSettings::default().into()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSection {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default = "defaults::active")]
    pub active: bool,
    /// ERP name -> synonym records.
    #[serde(default)]
    pub synonyms: BTreeMap<String, Vec<SynonymRecord>>,
    #[serde(flatten)]
    pub extra: Extensions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynonymRecord {
    pub name: String,
    pub confidence_boost: f64,
    #[serde(default)]
    pub usage_count: u32,
    #[serde(default)]
    pub last_confirmed: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Extensions,
}

mod defaults {
    use ledger_model::SystemSettings;

    pub fn version() -> String {
        SystemSettings::default().version
    }

    pub fn min_confidence() -> f64 {
        SystemSettings::default().min_confidence_threshold
    }

    pub fn exact_match() -> f64 {
        SystemSettings::default().exact_match_threshold
    }

    pub fn partial_match() -> f64 {
        SystemSettings::default().partial_match_threshold
    }

    pub fn active() -> bool {
        true
    }
}

impl From<SystemSettings> for SystemSection {
    fn from(settings: SystemSettings) -> Self {
        Self {
            version: settings.version,
            min_confidence_threshold: settings.min_confidence_threshold,
            exact_match_threshold: settings.exact_match_threshold,
            partial_match_threshold: settings.partial_match_threshold,
            auto_reload_enabled: settings.auto_reload_enabled,
            extra: settings.extensions,
        }
    }
}

impl From<SystemSection> for SystemSettings {
    fn from(section: SystemSection) -> Self {
        Self {
            version: section.version,
            min_confidence_threshold: section.min_confidence_threshold,
            exact_match_threshold: section.exact_match_threshold,
            partial_match_threshold: section.partial_match_threshold,
            auto_reload_enabled: section.auto_reload_enabled,
            extensions: section.extra,
        }
    }
}

impl From<&KnowledgeBase> for ConfigDocument {
    fn from(kb: &KnowledgeBase) -> Self {
        let field_definitions = kb
            .definitions()
            .map(|def| (def.id.as_str().to_string(), field_section(def)))
            .collect();
        Self {
            system: kb.system.clone().into(),
            field_definitions,
            extra: kb.extensions.clone(),
        }
    }
}

fn field_section(def: &FieldDefinition) -> FieldSection {
    let mut synonyms: BTreeMap<String, Vec<SynonymRecord>> = BTreeMap::new();
    for entry in &def.synonyms {
        synonyms
            .entry(entry.erp_name.clone())
            .or_default()
            .push(SynonymRecord {
                name: entry.raw_text.clone(),
                confidence_boost: entry.confidence_boost,
                usage_count: entry.usage_count,
                last_confirmed: entry.last_confirmed,
                extra: entry.extensions.clone(),
            });
    }
    FieldSection {
        name: Some(def.name.clone()),
        description: def.description.clone(),
        data_type: Some(def.data_type.as_str().to_string()),
        active: def.active,
        synonyms,
        extra: def.extensions.clone(),
    }
}

impl ConfigDocument {
    /// Convert into the model, validating identifiers and value ranges.
    ///
    /// Returns the synonym conflicts that were resolved while building.
    /// The error string is a human-readable reason for a format error.
    pub fn into_knowledge_base(
        self,
    ) -> std::result::Result<(KnowledgeBase, Vec<SynonymConflict>), String> {
        let mut definitions = Vec::with_capacity(self.field_definitions.len());
        for (key, section) in self.field_definitions {
            let id: FieldId = key.parse().map_err(|e| format!("{e}"))?;
            definitions.push(field_definition(id, section)?);
        }
        KnowledgeBase::from_parts(self.system.into(), definitions, self.extra)
            .map_err(|e| e.to_string())
    }
}

fn field_definition(id: FieldId, section: FieldSection) -> std::result::Result<FieldDefinition, String> {
    let data_type = match section.data_type {
        Some(raw) => raw
            .parse::<DataType>()
            .map_err(|e| format!("field {id}: {e}"))?,
        None => id.default_data_type(),
    };
    let mut definition = FieldDefinition::new(id).with_description(section.description);
    if let Some(name) = section.name {
        definition.name = name;
    }
    definition.data_type = data_type;
    definition.active = section.active;
    definition.extensions = section.extra;
    for (erp, records) in section.synonyms {
        for record in records {
            definition.synonyms.push(SynonymEntry {
                erp_name: erp.clone(),
                raw_text: record.name,
                confidence_boost: record.confidence_boost,
                usage_count: record.usage_count,
                last_confirmed: record.last_confirmed,
                extensions: record.extra,
            });
        }
    }
    Ok(definition)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
system:
  version: "2.0.0"
  min_confidence_threshold: 0.6
  exact_match_threshold: 0.95
  partial_match_threshold: 0.85
  auto_reload_enabled: false
  owner: finance
field_definitions:
  journal_entry_id:
    name: Journal Entry ID
    description: Entry identifier
    data_type: numeric
    active: true
    validation_rules:
      required: true
    synonyms:
      SAP:
        - name: BELNR
          confidence_boost: 0.95
          usage_count: 3
          language: de
generated_by: setup script
"#;

    #[test]
    fn unknown_keys_land_in_extra_maps() {
        let doc: ConfigDocument = serde_yaml::from_str(SAMPLE).unwrap();
        assert!(doc.extra.contains_key("generated_by"));
        assert!(doc.system.extra.contains_key("owner"));
        let field = &doc.field_definitions["journal_entry_id"];
        assert!(field.extra.contains_key("validation_rules"));
        assert!(field.synonyms["SAP"][0].extra.contains_key("language"));
    }

    #[test]
    fn converts_into_model() {
        let doc: ConfigDocument = serde_yaml::from_str(SAMPLE).unwrap();
        let (kb, conflicts) = doc.into_knowledge_base().unwrap();
        assert!(conflicts.is_empty());
        let def = kb.definition(FieldId::JournalEntryId).unwrap();
        assert_eq!(def.data_type, DataType::Numeric);
        assert_eq!(def.synonyms[0].usage_count, 3);
        assert_eq!(kb.system.extensions["owner"], serde_json::json!("finance"));
    }

    #[test]
    fn unknown_field_id_is_rejected() {
        let yaml = "field_definitions:\n  cost_center:\n    name: Cost Center\n";
        let doc: ConfigDocument = serde_yaml::from_str(yaml).unwrap();
        let err = doc.into_knowledge_base().unwrap_err();
        assert!(err.contains("cost_center"));
    }

    #[test]
    fn out_of_range_boost_is_rejected() {
        let yaml = "field_definitions:\n  amount:\n    synonyms:\n      SAP:\n        - name: DMBTR\n          confidence_boost: 1.4\n";
        let doc: ConfigDocument = serde_yaml::from_str(yaml).unwrap();
        assert!(doc.into_knowledge_base().is_err());
    }
}
