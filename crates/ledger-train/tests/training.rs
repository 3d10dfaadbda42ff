use std::path::Path;

use ledger_config::ConfigStore;
use ledger_model::{
    Extensions, FieldDefinition, FieldId, KnowledgeBase, MatchCandidate, SystemSettings,
};
use ledger_train::{
    Confirmer, Decision, ErpSelector, HeaderState, LearningEngine, TrainerMode, TrainerPolicy,
    TrainingSession,
};
use proptest::prelude::*;
use tempfile::tempdir;

fn catalog_store(dir: &Path) -> ConfigStore {
    ConfigStore::create(dir.join("kb.yaml"), KnowledgeBase::with_default_catalog()).unwrap()
}

fn sap() -> ErpSelector {
    ErpSelector::Named("SAP".into())
}

fn train(
    store: &ConfigStore,
    headers: &[&str],
    erp: &ErpSelector,
    policy: &TrainerPolicy,
    confirmer: Option<&mut dyn Confirmer>,
) -> TrainingSession {
    LearningEngine::new(store)
        .run(headers, &[], erp, policy, confirmer)
        .unwrap()
}

fn boost_of(store: &ConfigStore, erp: &str, header: &str) -> (FieldId, f64, u32) {
    let found = store.find_synonyms(erp, header);
    assert_eq!(found.len(), 1, "expected one synonym for {erp}:{header}");
    let (field, entry) = &found[0];
    (*field, entry.confidence_boost, entry.usage_count)
}

#[test]
fn manual_mode_waits_for_confirmation_below_threshold() {
    let dir = tempdir().unwrap();
    let settings = SystemSettings {
        min_confidence_threshold: 0.0,
        ..SystemSettings::default()
    };
    let definitions = FieldId::ALL.iter().map(|id| FieldDefinition::new(*id)).collect();
    let kb = KnowledgeBase::from_parts(settings, definitions, Extensions::new())
        .unwrap()
        .0;
    let path = dir.path().join("kb.yaml");
    let store = ConfigStore::create(&path, kb).unwrap();
    let headers = ["Ref Doc Nr"];
    let policy = TrainerPolicy::manual().with_threshold(0.8);

    // Without a confirmation step the suggestion is parked, not accepted.
    let before = std::fs::read(&path).unwrap();
    let session = train(&store, &headers, &sap(), &policy.with_batch(true), None);
    let decision = &session.decisions[0];
    assert!(decision.top().unwrap().confidence < 0.8);
    assert_eq!(
        decision.history,
        vec![HeaderState::Unmapped, HeaderState::Suggested, HeaderState::Skipped]
    );
    assert!(decision.field_id.is_none());
    assert_eq!(std::fs::read(&path).unwrap(), before);

    let mut asked = 0;
    let mut accept = |header: &str, candidates: &[MatchCandidate]| {
        asked += 1;
        assert_eq!(header, "Ref Doc Nr");
        assert!(!candidates.is_empty());
        Decision::Accept
    };
    let session = train(&store, &headers, &sap(), &policy, Some(&mut accept));
    assert_eq!(asked, 1);
    let decision = &session.decisions[0];
    assert_eq!(
        decision.history,
        vec![
            HeaderState::Unmapped,
            HeaderState::Suggested,
            HeaderState::Confirmed,
            HeaderState::Learned
        ]
    );
    let field = decision.field_id.unwrap();
    assert_eq!(boost_of(&store, "SAP", "Ref Doc Nr"), (field, 0.5, 1));
}

#[test]
fn automatic_mode_does_not_accept_below_threshold() {
    let dir = tempdir().unwrap();
    let store = catalog_store(dir.path());
    let session = train(
        &store,
        &["Fecha Asient"],
        &sap(),
        &TrainerPolicy::automatic().with_threshold(0.99),
        None,
    );
    let decision = &session.decisions[0];
    assert_eq!(decision.state(), HeaderState::Skipped);
    assert!(decision.note.as_deref().unwrap().contains("below threshold"));
    assert_eq!(session.summary.mapped_headers, 0);
}

#[test]
fn confirmed_exact_match_reinforces_its_entry() {
    let dir = tempdir().unwrap();
    let store = catalog_store(dir.path());
    let session = train(
        &store,
        &["BELNR", "Fecha", "Debit Amount", "zzqx"],
        &sap(),
        &TrainerPolicy::automatic(),
        None,
    );

    let (field, boost, usage) = boost_of(&store, "SAP", "BELNR");
    assert_eq!(field, FieldId::JournalEntryId);
    assert!((boost - 0.96).abs() < 1e-9);
    assert_eq!(usage, 1);
    assert!(store.find_synonyms("SAP", "BELNR")[0].1.last_confirmed.is_some());

    // A generic synonym is reinforced where it lives, not copied under SAP.
    assert_eq!(boost_of(&store, "generic", "Fecha").2, 1);
    assert!(store.find_synonyms("SAP", "Fecha").is_empty());

    // Canonical names need no synonym.
    let canonical = session.decision("Debit Amount").unwrap();
    assert_eq!(canonical.state(), HeaderState::Learned);
    assert!(canonical.learned.is_empty());
    assert!(store.find_synonyms("SAP", "Debit Amount").is_empty());

    assert_eq!(session.decision("zzqx").unwrap().state(), HeaderState::Unmapped);
    assert_eq!(session.summary.total_headers, 4);
    assert_eq!(session.summary.mapped_headers, 3);
}

#[test]
fn partial_match_is_learned_and_exact_next_time() {
    let dir = tempdir().unwrap();
    let store = catalog_store(dir.path());
    let policy = TrainerPolicy::automatic();

    let first = train(&store, &["FechaAsient"], &sap(), &policy, None);
    let decision = &first.decisions[0];
    assert_eq!(decision.field_id, Some(FieldId::PostingDate));
    assert_eq!(decision.state(), HeaderState::Learned);
    assert!(decision.learned[0].created());
    assert_eq!(boost_of(&store, "SAP", "FechaAsient"), (FieldId::PostingDate, 0.5, 1));

    let second = train(&store, &["FechaAsient"], &sap(), &policy, None);
    let top = second.decisions[0].top().unwrap();
    assert_eq!(top.source_erp.as_deref(), Some("SAP"));
    assert_eq!(top.confidence, 1.0);
    let (_, boost, usage) = boost_of(&store, "SAP", "FechaAsient");
    // One prior confirmation weighs 1.1.
    assert!((boost - 0.61).abs() < 1e-9);
    assert_eq!(usage, 2);
}

#[test]
fn two_headers_for_one_field_keep_the_first() {
    let dir = tempdir().unwrap();
    let store = catalog_store(dir.path());
    let session = train(
        &store,
        &["Fecha", "FechaAsiento"],
        &sap(),
        &TrainerPolicy::automatic(),
        None,
    );
    assert_eq!(session.decisions[0].field_id, Some(FieldId::PostingDate));
    let loser = &session.decisions[1];
    assert_eq!(loser.state(), HeaderState::Skipped);
    assert!(loser.note.as_deref().unwrap().contains("'Fecha'"));
    assert_eq!(session.mapping(), vec![(0, FieldId::PostingDate)]);
    // The loser taught nothing.
    assert_eq!(boost_of(&store, "generic", "FechaAsiento").2, 0);
}

#[test]
fn rejection_attenuates_without_deleting() {
    let dir = tempdir().unwrap();
    let store = catalog_store(dir.path());
    let mut reject = |_: &str, _: &[MatchCandidate]| Decision::Reject;
    let session = train(
        &store,
        &["BELNR"],
        &sap(),
        &TrainerPolicy::manual(),
        Some(&mut reject),
    );
    let decision = &session.decisions[0];
    assert_eq!(
        decision.history[2..],
        [HeaderState::Rejected, HeaderState::Discarded]
    );
    assert!(decision.field_id.is_none());
    let (field, boost, usage) = boost_of(&store, "SAP", "BELNR");
    assert_eq!(field, FieldId::JournalEntryId);
    assert!((boost - 0.85).abs() < 1e-9);
    assert_eq!(usage, 0);
}

#[test]
fn correction_moves_the_synonym() {
    let dir = tempdir().unwrap();
    let store = catalog_store(dir.path());
    let mut chosen = None;
    let mut correct = |_: &str, candidates: &[MatchCandidate]| {
        let field = FieldId::ALL
            .iter()
            .copied()
            .find(|f| candidates.iter().all(|c| c.field_id != *f))
            .unwrap();
        chosen = Some(field);
        Decision::Choose(field)
    };
    let session = train(
        &store,
        &["BELNR"],
        &sap(),
        &TrainerPolicy::manual(),
        Some(&mut correct),
    );
    let chosen = chosen.unwrap();
    let decision = &session.decisions[0];
    assert_eq!(decision.state(), HeaderState::Discarded);
    assert_eq!(decision.correction, Some(chosen));
    assert_eq!(decision.field_id, Some(chosen));
    assert_eq!(boost_of(&store, "SAP", "BELNR"), (chosen, 0.5, 1));
    let kb = store.snapshot();
    let journal = kb.definition(FieldId::JournalEntryId).unwrap();
    assert!(journal.synonyms_for("SAP").all(|s| s.raw_text != "BELNR"));
}

#[test]
fn erp_correction_overrides_generic_synonym() {
    let dir = tempdir().unwrap();
    let store = catalog_store(dir.path());
    let mut choose_entry_date =
        |_: &str, _: &[MatchCandidate]| Decision::Choose(FieldId::EntryDate);
    train(
        &store,
        &["Fecha"],
        &sap(),
        &TrainerPolicy::manual(),
        Some(&mut choose_entry_date),
    );
    assert_eq!(boost_of(&store, "SAP", "Fecha"), (FieldId::EntryDate, 0.5, 1));

    let session = train(&store, &["Fecha"], &sap(), &TrainerPolicy::automatic(), None);
    let decision = &session.decisions[0];
    assert_eq!(decision.field_id, Some(FieldId::EntryDate));
    assert_eq!(decision.state(), HeaderState::Learned);
    assert_eq!(decision.top().unwrap().source_erp.as_deref(), Some("SAP"));

    // The SAP entry is reinforced; the generic one is left alone.
    let (field, boost, usage) = boost_of(&store, "SAP", "Fecha");
    assert_eq!(field, FieldId::EntryDate);
    assert!((boost - 0.61).abs() < 1e-9);
    assert_eq!(usage, 2);
    assert_eq!(boost_of(&store, "generic", "Fecha").2, 0);

    // Sessions for other ERPs keep the generic mapping.
    let contaplus = ErpSelector::Named("ContaPlus".into());
    let session = train(&store, &["Fecha"], &contaplus, &TrainerPolicy::automatic(), None);
    assert_eq!(session.decisions[0].field_id, Some(FieldId::PostingDate));
}

#[test]
fn complete_mode_checks_balance() {
    let dir = tempdir().unwrap();
    let store = catalog_store(dir.path());
    let records: Vec<Vec<String>> = [
        ["1", "100,00", "0"],
        ["1", "0", "100,00"],
        ["2", "50", ""],
        ["2", "", "40"],
    ]
    .iter()
    .map(|r| r.iter().map(|c| c.to_string()).collect())
    .collect();
    let session = LearningEngine::new(&store)
        .run(
            &["Asiento", "Debe", "Haber"],
            &records,
            &ErpSelector::Auto,
            &TrainerPolicy::complete(0.9),
            None,
        )
        .unwrap();

    assert_eq!(session.mode, TrainerMode::Complete);
    assert!(session.erp_detection.as_ref().unwrap().is_generic());
    assert_eq!(session.summary.mapped_headers, 3);
    let report = session.balance.unwrap();
    assert_eq!(report.entries_count, 2);
    assert_eq!(report.unbalanced.len(), 1);
    assert_eq!(report.unbalanced[0].journal_entry_id, "2");
    assert!((report.unbalanced[0].difference - 10.0).abs() < 1e-9);
    assert!(!report.is_balanced);
}

#[test]
fn automatic_mode_has_no_balance_pass() {
    let dir = tempdir().unwrap();
    let store = catalog_store(dir.path());
    let records = vec![vec!["1".to_string(), "5".to_string(), "0".to_string()]];
    let session = LearningEngine::new(&store)
        .run(
            &["Asiento", "Debe", "Haber"],
            &records,
            &ErpSelector::Auto,
            &TrainerPolicy::automatic(),
            None,
        )
        .unwrap();
    assert!(session.balance.is_none());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn learning_is_monotonic(decisions in proptest::collection::vec(any::<bool>(), 1..8)) {
        let dir = tempdir().unwrap();
        let store = catalog_store(dir.path());
        let policy = TrainerPolicy::manual();
        for accept in decisions {
            let (_, before, _) = boost_of(&store, "SAP", "BELNR");
            let mut confirmer = |_: &str, _: &[MatchCandidate]| {
                if accept { Decision::Accept } else { Decision::Reject }
            };
            train(&store, &["BELNR"], &sap(), &policy, Some(&mut confirmer));
            let (_, after, _) = boost_of(&store, "SAP", "BELNR");
            prop_assert!((0.0..=1.0).contains(&after));
            if accept {
                prop_assert!(after >= before);
            } else {
                prop_assert!(after <= before);
            }
        }
    }
}
