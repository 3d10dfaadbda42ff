//! Bounded update rules for synonym confidence boosts.

use chrono::{DateTime, Utc};
use ledger_model::SynonymEntry;

/// Increment and decrement magnitudes for learned synonyms.
///
/// Reinforcement closes a fraction of the gap to 1.0, weighted by how often
/// the entry was already confirmed:
///
/// ```text
/// w  = min(1 + usage_count / 10, max_usage_weight)
/// b' = min(1, b + (1 - b) * reinforce_rate * w)
/// ```
///
/// Attenuation subtracts a fixed step and floors at zero. Both keep the
/// boost in [0, 1]; reinforcement never lowers it and attenuation never
/// raises it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoostPolicy {
    /// Boost of an entry created from a partial match or a correction.
    pub initial: f64,
    pub reinforce_rate: f64,
    pub max_usage_weight: f64,
    pub attenuation: f64,
}

impl Default for BoostPolicy {
    fn default() -> Self {
        Self {
            initial: 0.5,
            reinforce_rate: 0.2,
            max_usage_weight: 2.0,
            attenuation: 0.1,
        }
    }
}

impl BoostPolicy {
    pub fn reinforce(&self, boost: f64, usage_count: u32) -> f64 {
        let boost = boost.clamp(0.0, 1.0);
        let weight = (1.0 + f64::from(usage_count) / 10.0).min(self.max_usage_weight);
        (boost + (1.0 - boost) * self.reinforce_rate * weight)
            .min(1.0)
            .max(boost)
    }

    pub fn attenuate(&self, boost: f64) -> f64 {
        let boost = boost.clamp(0.0, 1.0);
        (boost - self.attenuation).max(0.0).min(boost)
    }

    /// New entry for a header learned for the first time.
    pub fn learned_entry(&self, erp: &str, header: &str, now: DateTime<Utc>) -> SynonymEntry {
        let mut entry = SynonymEntry::new(erp, header.trim(), self.initial);
        entry.usage_count = 1;
        entry.last_confirmed = Some(now);
        entry
    }

    /// `entry` after one more confirmation.
    pub fn confirmed(&self, entry: &SynonymEntry, now: DateTime<Utc>) -> SynonymEntry {
        let mut next = entry.clone();
        next.confidence_boost = self.reinforce(entry.confidence_boost, entry.usage_count);
        next.usage_count = entry.usage_count.saturating_add(1);
        next.last_confirmed = Some(now);
        next
    }

    /// `entry` after a rejection. Usage history is left alone.
    pub fn rejected(&self, entry: &SynonymEntry) -> SynonymEntry {
        let mut next = entry.clone();
        next.confidence_boost = self.attenuate(entry.confidence_boost);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn first_reinforcement_of_a_new_entry() {
        let policy = BoostPolicy::default();
        assert!((policy.reinforce(0.5, 0) - 0.6).abs() < 1e-12);
        assert!((policy.reinforce(0.5, 10) - 0.7).abs() < 1e-12);
        assert!((policy.reinforce(0.5, 500) - 0.7).abs() < 1e-12);
        assert_eq!(policy.reinforce(1.0, 3), 1.0);
    }

    #[test]
    fn attenuation_floors_at_zero() {
        let policy = BoostPolicy::default();
        assert!((policy.attenuate(0.95) - 0.85).abs() < 1e-12);
        assert_eq!(policy.attenuate(0.05), 0.0);
        assert_eq!(policy.attenuate(0.0), 0.0);
    }

    #[test]
    fn learned_entry_counts_the_confirmation() {
        let now = Utc::now();
        let entry = BoostPolicy::default().learned_entry("SAP", " Buchungstext ", now);
        assert_eq!(entry.raw_text, "Buchungstext");
        assert_eq!(entry.usage_count, 1);
        assert_eq!(entry.last_confirmed, Some(now));
        assert_eq!(entry.confidence_boost, 0.5);
    }

    proptest! {
        #[test]
        fn updates_stay_bounded_and_monotonic(boost in 0.0f64..=1.0, usage in 0u32..1000) {
            let policy = BoostPolicy::default();
            let up = policy.reinforce(boost, usage);
            let down = policy.attenuate(boost);
            prop_assert!((0.0..=1.0).contains(&up));
            prop_assert!((0.0..=1.0).contains(&down));
            prop_assert!(up >= boost);
            prop_assert!(down <= boost);
        }
    }
}
