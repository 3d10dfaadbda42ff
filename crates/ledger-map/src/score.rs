//! Confidence formulas shared by the matcher.
//!
//! Uses Jaro-Winkler similarity on separator-free normalized keys, so
//! `Num_Asiento`, `num asiento` and `NumAsiento` compare identically.

use ledger_model::SystemSettings;
use rapidfuzz::distance::jaro_winkler;

/// Weight applied to a synonym's boost when it did not match exactly.
pub const NON_EXACT_BOOST_WEIGHT: f64 = 0.1;

/// Jaro-Winkler similarity of two normalized keys, in [0, 1].
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    jaro_winkler::similarity(a.chars(), b.chars())
}

/// Header equals a canonical name or an in-scope synonym.
pub fn exact_confidence(settings: &SystemSettings, boost: f64) -> f64 {
    (settings.exact_match_threshold + boost).min(1.0)
}

/// Header equals a synonym registered under a different ERP.
pub fn cross_erp_confidence(settings: &SystemSettings, boost: f64) -> f64 {
    cap_below_exact(
        settings,
        settings.partial_match_threshold + boost * NON_EXACT_BOOST_WEIGHT,
    )
}

/// Header is similar to a known name.
pub fn partial_confidence(settings: &SystemSettings, similarity: f64, boost: f64) -> f64 {
    cap_below_exact(
        settings,
        similarity * settings.partial_match_threshold + boost * NON_EXACT_BOOST_WEIGHT,
    )
}

// Equal confidences rank exact first, so capping at the exact base is enough.
fn cap_below_exact(settings: &SystemSettings, confidence: f64) -> f64 {
    confidence.min(settings.exact_match_threshold).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_is_capped_at_one() {
        let settings = SystemSettings::default();
        assert_eq!(exact_confidence(&settings, 0.0), 0.95);
        assert_eq!(exact_confidence(&settings, 0.9), 1.0);
    }

    #[test]
    fn non_exact_never_exceeds_exact_base() {
        let settings = SystemSettings::default();
        assert!(partial_confidence(&settings, 1.0, 1.0) <= settings.exact_match_threshold);
        assert!(cross_erp_confidence(&settings, 1.0) <= settings.exact_match_threshold);
    }

    #[test]
    fn identical_keys_have_full_similarity() {
        assert_eq!(similarity("belnr", "belnr"), 1.0);
        assert_eq!(similarity("", "belnr"), 0.0);
        assert!(similarity("fechaasiento", "fechaasient") > 0.9);
        assert!(similarity("total", "proveedor") < 0.6);
    }
}
