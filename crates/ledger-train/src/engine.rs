//! The learning loop: suggest, decide, learn.

use std::collections::BTreeMap;

use chrono::Utc;
use ledger_config::{ConfigError, ConfigStore};
use ledger_map::{ErpDetector, FieldMatcher};
use ledger_model::{DetectionSummary, FieldId, MatchCandidate, MatchKind, SynonymEntry, is_generic_erp};
use ledger_validate::{BalanceReport, BalanceValidator, ColumnMap, MappedRow};
use tracing::{debug, info, warn};

use crate::boost::BoostPolicy;
use crate::error::Result;
use crate::policy::{Confirmer, Decision, ErpSelector, TrainerMode, TrainerPolicy};
use crate::session::{HeaderDecision, HeaderState, LearnedSynonym, TrainingSession};

/// Outcome of the decision step for one suggested header.
#[derive(Debug)]
enum Verdict {
    /// Accept the candidate at this position.
    Accept(usize),
    /// The user mapped the header onto a field that was not suggested.
    Correct(FieldId),
    Reject,
    Skip(String),
}

/// Runs training sessions against a shared [`ConfigStore`].
///
/// One engine can serve many sessions. Each session matches against the
/// snapshot taken when it starts; its own learning writes go through
/// [`ConfigStore::update_synonym`] and only show up in later sessions.
#[derive(Debug)]
pub struct LearningEngine<'s> {
    store: &'s ConfigStore,
    boost: BoostPolicy,
    validator: BalanceValidator,
}

impl<'s> LearningEngine<'s> {
    pub fn new(store: &'s ConfigStore) -> Self {
        Self {
            store,
            boost: BoostPolicy::default(),
            validator: BalanceValidator::default(),
        }
    }

    pub fn with_boost_policy(mut self, boost: BoostPolicy) -> Self {
        self.boost = boost;
        self
    }

    pub fn with_validator(mut self, validator: BalanceValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn store(&self) -> &'s ConfigStore {
        self.store
    }

    /// Train on one file.
    ///
    /// `records` are the data rows in header column order; they are only
    /// read by the balance pass of complete mode. `confirmer` is consulted
    /// in manual mode unless the policy is batch; without one, manual
    /// suggestions are skipped.
    pub fn run<S: AsRef<str>>(
        &self,
        headers: &[S],
        records: &[Vec<String>],
        erp: &ErpSelector,
        policy: &TrainerPolicy,
        mut confirmer: Option<&mut dyn Confirmer>,
    ) -> Result<TrainingSession> {
        policy.validate()?;
        let started_at = Utc::now();

        if self.store.snapshot().system.auto_reload_enabled && self.store.reload_if_changed()? {
            info!(path = %self.store.path().display(), "picked up knowledge base changes");
        }
        let kb = self.store.snapshot();
        let matcher = FieldMatcher::new(&kb);

        let (erp_name, erp_detection) = match erp {
            ErpSelector::Named(name) => (name.clone(), None),
            ErpSelector::Auto => {
                let detection = ErpDetector::new(matcher).auto_detect_erp(headers);
                (detection.erp_name.clone(), Some(detection))
            }
        };
        let hint = (!is_generic_erp(&erp_name)).then_some(erp_name.as_str());
        info!(
            erp = %erp_name,
            mode = %policy.mode,
            threshold = policy.confidence_threshold,
            batch = policy.batch,
            headers = headers.len(),
            "training session started"
        );

        let mut decisions = Vec::with_capacity(headers.len());
        let mut verdicts = Vec::with_capacity(headers.len());
        for (index, header) in headers.iter().enumerate() {
            let mut decision = HeaderDecision::new(index, header.as_ref());
            decision.candidates = matcher.match_header(header.as_ref(), hint);
            let verdict = if decision.candidates.is_empty() {
                debug!(header = %decision.header, "no candidates, header stays unmapped");
                None
            } else {
                decision.advance(HeaderState::Suggested);
                Some(decide(&decision, policy, confirmer.as_deref_mut()))
            };
            decisions.push(decision);
            verdicts.push(verdict);
        }

        resolve_conflicts(&decisions, &mut verdicts);

        for (decision, verdict) in decisions.iter_mut().zip(verdicts) {
            if let Some(verdict) = verdict {
                self.apply(decision, verdict, &erp_name);
            }
        }

        let balance = if policy.mode == TrainerMode::Complete {
            self.balance(&decisions, records)
        } else {
            None
        };
        let mapped = decisions.iter().filter(|d| d.is_mapped()).count();
        let session = TrainingSession {
            mode: policy.mode,
            confidence_threshold: policy.confidence_threshold,
            batch: policy.batch,
            erp_name,
            erp_detection,
            decisions,
            summary: DetectionSummary::new(mapped, headers.len()),
            balance,
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            erp = %session.erp_name,
            mapped,
            learned = session.count(HeaderState::Learned),
            skipped = session.count(HeaderState::Skipped),
            discarded = session.count(HeaderState::Discarded),
            unmapped = session.count(HeaderState::Unmapped),
            rate = %session.summary.display_rate(),
            "training session finished"
        );
        Ok(session)
    }

    fn apply(&self, decision: &mut HeaderDecision, verdict: Verdict, erp: &str) {
        match verdict {
            Verdict::Accept(position) => {
                let candidate = decision.candidates[position].clone();
                decision.advance(HeaderState::Confirmed);
                decision.field_id = Some(candidate.field_id);
                decision.confidence = Some(candidate.confidence);
                self.learn_confirmed(decision, &candidate, erp);
            }
            Verdict::Correct(field) => {
                decision.advance(HeaderState::Rejected);
                decision.correction = Some(field);
                decision.field_id = Some(field);
                self.discard(decision, erp);
                let header = decision.header.clone();
                match self.reinforce_or_create(field, erp, &header) {
                    Ok(Some(learned)) => decision.learned.push(learned),
                    Ok(None) => {}
                    Err(err) => learning_failed(decision, &err),
                }
            }
            Verdict::Reject => {
                decision.advance(HeaderState::Rejected);
                self.discard(decision, erp);
            }
            Verdict::Skip(reason) => {
                debug!(header = %decision.header, %reason, "header skipped");
                decision.advance(HeaderState::Skipped);
                decision.note(reason);
            }
        }
    }

    /// `Confirmed -> Learned`.
    fn learn_confirmed(&self, decision: &mut HeaderDecision, candidate: &MatchCandidate, erp: &str) {
        // Reinforce the entry that produced an in-scope exact match; anything
        // else becomes a new synonym under the session ERP.
        let target_erp = match (&candidate.source_erp, candidate.match_kind) {
            (None, MatchKind::Exact) => {
                decision.advance(HeaderState::Learned);
                decision.note("matches the canonical name");
                return;
            }
            (Some(source), MatchKind::Exact) => source.clone(),
            _ => erp.to_string(),
        };
        let header = decision.header.clone();
        match self.reinforce_or_create(candidate.field_id, &target_erp, &header) {
            Ok(learned) => {
                decision.learned.extend(learned);
                decision.advance(HeaderState::Learned);
            }
            Err(err) => learning_failed(decision, &err),
        }
    }

    /// `Rejected -> Discarded`, attenuating the entry behind the suggestion.
    fn discard(&self, decision: &mut HeaderDecision, erp: &str) {
        let target = decision.top().and_then(|top| match (&top.source_erp, top.match_kind) {
            (Some(source), MatchKind::Exact) => Some((top.field_id, source.clone())),
            _ => None,
        });
        if let Some((field, source)) = target {
            let header = decision.header.clone();
            let boost = self.boost;
            let mut written = None;
            let result = self.store.update_synonym(field, &source, &header, |current| {
                written = current.map(|entry| boost.rejected(entry));
                written.clone()
            });
            match result {
                Ok(outcome) => {
                    if let (Some(outcome), Some(entry)) = (outcome, written) {
                        decision
                            .learned
                            .push(learned(field, &entry, outcome.previous.as_ref()));
                    }
                }
                Err(err) => learning_failed(decision, &err),
            }
        } else {
            debug!(header = %decision.header, erp, "no synonym to attenuate");
        }
        decision.advance(HeaderState::Discarded);
    }

    fn reinforce_or_create(
        &self,
        field: FieldId,
        erp: &str,
        header: &str,
    ) -> std::result::Result<Option<LearnedSynonym>, ConfigError> {
        let boost = self.boost;
        let now = Utc::now();
        let mut written: Option<SynonymEntry> = None;
        let outcome = self.store.update_synonym(field, erp, header, |current| {
            let next = match current {
                Some(entry) => boost.confirmed(entry, now),
                None => boost.learned_entry(erp, header, now),
            };
            written = Some(next.clone());
            Some(next)
        })?;
        let learned = outcome
            .zip(written)
            .map(|(outcome, entry)| learned(field, &entry, outcome.previous.as_ref()));
        if let Some(l) = &learned {
            info!(
                field = %l.field_id,
                erp = %l.erp_name,
                header = %l.raw_text,
                boost = l.confidence_boost,
                usage = l.usage_count,
                created = l.created(),
                "learned synonym"
            );
        }
        Ok(learned)
    }

    fn balance(&self, decisions: &[HeaderDecision], records: &[Vec<String>]) -> Option<BalanceReport> {
        let columns = ColumnMap::new(
            decisions
                .iter()
                .filter_map(|d| d.field_id.map(|field| (field, d.index))),
        );
        if !columns.has_amounts() {
            info!("no amount column mapped, balance check skipped");
            return None;
        }
        let rows: Vec<MappedRow> = records.iter().map(|r| columns.row(r.as_slice())).collect();
        Some(self.validator.validate(&rows))
    }
}

fn decide(
    decision: &HeaderDecision,
    policy: &TrainerPolicy,
    confirmer: Option<&mut (dyn Confirmer + '_)>,
) -> Verdict {
    let Some(top) = decision.top() else {
        return Verdict::Skip("no candidates".into());
    };
    match policy.mode {
        TrainerMode::Manual => {
            let Some(confirmer) = confirmer.filter(|_| !policy.batch) else {
                return Verdict::Skip("awaiting confirmation".into());
            };
            match confirmer.confirm(&decision.header, &decision.candidates) {
                Decision::Accept => Verdict::Accept(0),
                Decision::Choose(field) => decision
                    .candidates
                    .iter()
                    .position(|c| c.field_id == field)
                    .map_or(Verdict::Correct(field), Verdict::Accept),
                Decision::Reject => Verdict::Reject,
                Decision::Skip => Verdict::Skip("skipped at confirmation".into()),
            }
        }
        TrainerMode::Automatic | TrainerMode::Complete => {
            if top.confidence >= policy.confidence_threshold {
                Verdict::Accept(0)
            } else {
                Verdict::Skip(format!(
                    "confidence {:.3} below threshold {:.3}",
                    top.confidence, policy.confidence_threshold
                ))
            }
        }
    }
}

/// Field and confidence a verdict claims, if it maps the header.
fn claim(decision: &HeaderDecision, verdict: Option<&Verdict>) -> Option<(FieldId, f64)> {
    match verdict? {
        Verdict::Accept(position) => decision
            .candidates
            .get(*position)
            .map(|c| (c.field_id, c.confidence)),
        // An explicit correction outranks any score.
        Verdict::Correct(field) => Some((*field, f64::INFINITY)),
        Verdict::Reject | Verdict::Skip(_) => None,
    }
}

/// Keep one header per field: highest confidence, then earliest column.
fn resolve_conflicts(decisions: &[HeaderDecision], verdicts: &mut [Option<Verdict>]) {
    let mut owners: BTreeMap<FieldId, usize> = BTreeMap::new();
    for idx in 0..decisions.len() {
        let Some((field, confidence)) = claim(&decisions[idx], verdicts[idx].as_ref()) else {
            continue;
        };
        let Some(&owner) = owners.get(&field) else {
            owners.insert(field, idx);
            continue;
        };
        let owner_confidence = claim(&decisions[owner], verdicts[owner].as_ref())
            .map_or(f64::NEG_INFINITY, |(_, c)| c);
        let (winner, loser) = if confidence > owner_confidence {
            (idx, owner)
        } else {
            (owner, idx)
        };
        warn!(
            field = %field,
            kept = %decisions[winner].header,
            dropped = %decisions[loser].header,
            "two headers confirmed for one field"
        );
        verdicts[loser] = Some(Verdict::Skip(format!(
            "{field} already mapped from '{}'",
            decisions[winner].header
        )));
        owners.insert(field, winner);
    }
}

fn learned(field: FieldId, entry: &SynonymEntry, previous: Option<&SynonymEntry>) -> LearnedSynonym {
    LearnedSynonym {
        field_id: field,
        erp_name: entry.erp_name.clone(),
        raw_text: entry.raw_text.clone(),
        previous_boost: previous.map(|p| p.confidence_boost),
        confidence_boost: entry.confidence_boost,
        usage_count: entry.usage_count,
    }
}

fn learning_failed(decision: &mut HeaderDecision, err: &ConfigError) {
    warn!(header = %decision.header, error = %err, "learning write failed");
    decision.note(format!("learning failed: {}", err.user_message()));
}
