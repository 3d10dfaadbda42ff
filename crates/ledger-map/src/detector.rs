//! ERP source detection over a whole header row.

use std::cmp::Ordering;

use ledger_model::{DetectionSummary, GENERIC_ERP, is_generic_erp};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::matcher::{AmbiguousMatch, FieldMatcher, TIE_EPSILON};

/// Detection score of one ERP.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErpScore {
    pub erp_name: String,
    /// Sum of evidence confidences divided by header count, in [0, 1].
    pub score: f64,
    /// Headers whose top candidate came from this ERP's synonyms.
    pub match_count: usize,
}

impl ErpScore {
    /// Score descending, then match count descending, then name.
    fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| other.match_count.cmp(&self.match_count))
            .then_with(|| self.erp_name.cmp(&other.erp_name))
    }
}

/// Outcome of [`ErpDetector::auto_detect_erp`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErpDetection {
    /// Winning ERP, or `generic` when none cleared the threshold.
    pub erp_name: String,
    pub score: f64,
    pub match_count: usize,
    /// Every known ERP, ranked.
    pub ranking: Vec<ErpScore>,
    pub ambiguity: Option<AmbiguousMatch>,
}

impl ErpDetection {
    pub fn is_generic(&self) -> bool {
        is_generic_erp(&self.erp_name)
    }
}

/// Infers the source ERP of a header row.
#[derive(Debug, Clone, Copy)]
pub struct ErpDetector<'a> {
    matcher: FieldMatcher<'a>,
}

impl<'a> ErpDetector<'a> {
    pub fn new(matcher: FieldMatcher<'a>) -> Self {
        Self { matcher }
    }

    /// Score every known ERP against `headers` and pick the best.
    ///
    /// A header is evidence for an ERP when, matched with that ERP as hint,
    /// its top candidate is an exact match produced by one of the ERP's own
    /// synonyms. Canonical-name and `generic` matches look the same under
    /// every hint and are not counted.
    pub fn auto_detect_erp<S: AsRef<str>>(&self, headers: &[S]) -> ErpDetection {
        let kb = self.matcher.knowledge_base();
        let min = kb.system.min_confidence_threshold;

        let mut ranking: Vec<ErpScore> = kb
            .erp_names()
            .into_iter()
            .filter(|erp| !is_generic_erp(erp))
            .map(|erp| self.score_erp(erp, headers))
            .collect();
        ranking.sort_by(ErpScore::rank_cmp);

        let ambiguity = match ranking.as_slice() {
            [first, second, ..]
                if first.score >= min && (first.score - second.score).abs() < TIE_EPSILON =>
            {
                let erps: Vec<String> = ranking
                    .iter()
                    .take_while(|s| (s.score - first.score).abs() < TIE_EPSILON)
                    .map(|s| s.erp_name.clone())
                    .collect();
                warn!(?erps, score = first.score, "ambiguous ERP detection");
                Some(AmbiguousMatch::Erps {
                    erps,
                    score: first.score,
                })
            }
            _ => None,
        };

        let detection = match ranking.first() {
            Some(best) if best.score >= min => ErpDetection {
                erp_name: best.erp_name.clone(),
                score: best.score,
                match_count: best.match_count,
                ranking: ranking.clone(),
                ambiguity,
            },
            best => ErpDetection {
                erp_name: GENERIC_ERP.to_string(),
                score: best.map_or(0.0, |b| b.score),
                match_count: best.map_or(0, |b| b.match_count),
                ranking: ranking.clone(),
                ambiguity: None,
            },
        };
        info!(
            erp = %detection.erp_name,
            score = detection.score,
            matches = detection.match_count,
            headers = headers.len(),
            "detected ERP"
        );
        detection
    }

    fn score_erp<S: AsRef<str>>(&self, erp: String, headers: &[S]) -> ErpScore {
        let mut sum = 0.0;
        let mut match_count = 0;
        for header in headers {
            let candidates = self.matcher.match_header(header.as_ref(), Some(&erp));
            let Some(top) = candidates.first() else {
                continue;
            };
            let own_synonym = top
                .source_erp
                .as_deref()
                .is_some_and(|source| source.eq_ignore_ascii_case(&erp));
            if top.match_kind.is_equality() && own_synonym {
                sum += top.confidence;
                match_count += 1;
            }
        }
        let score = if headers.is_empty() {
            0.0
        } else {
            sum / headers.len() as f64
        };
        debug!(erp = %erp, score, match_count, "ERP score");
        ErpScore {
            erp_name: erp,
            score,
            match_count,
        }
    }

    /// Coverage of `headers` by the catalog, using every ERP's synonyms.
    pub fn detection_summary<S: AsRef<str>>(&self, headers: &[S]) -> DetectionSummary {
        let mapped = headers
            .iter()
            .filter(|h| !self.matcher.match_header(h.as_ref(), None).is_empty())
            .count();
        DetectionSummary::new(mapped, headers.len())
    }
}
