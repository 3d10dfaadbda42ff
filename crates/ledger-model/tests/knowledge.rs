use ledger_model::{
    FieldId, GENERIC_ERP, KnowledgeBase, SynonymEntry, header_key, normalize_header,
};
use proptest::prelude::*;

#[test]
fn default_catalog_finds_sap_synonyms() {
    let kb = KnowledgeBase::with_default_catalog();
    let hits = kb.find_synonyms("sap", "belnr");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].0, FieldId::JournalEntryId);
    assert!(kb.find_synonyms("ContaPlus", "BELNR").is_empty());
}

#[test]
fn generic_synonyms_are_found_with_accents_folded() {
    let kb = KnowledgeBase::with_default_catalog();
    let hits = kb.find_synonyms(GENERIC_ERP, "ano fiscal");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].0, FieldId::FiscalYear);
}

#[test]
fn upsert_is_visible_to_subsequent_reads() {
    let mut kb = KnowledgeBase::with_default_catalog();
    kb.upsert_synonym(FieldId::VendorId, SynonymEntry::new("A3", "CodProv", 0.5))
        .unwrap();
    let hits = kb.find_synonyms("a3", "Cod_Prov");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].0, FieldId::VendorId);
    assert!(kb.erp_names().iter().any(|e| e == "A3"));
}

proptest! {
    #[test]
    fn normalization_is_idempotent(raw in "\\PC{0,24}") {
        let once = normalize_header(&raw);
        prop_assert_eq!(normalize_header(&once), once.clone());
        prop_assert_eq!(header_key(&once), header_key(&raw));
    }
}
