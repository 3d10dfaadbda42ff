use serde::Serialize;

/// Header coverage of one detection or training session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DetectionSummary {
    pub total_headers: usize,
    pub mapped_headers: usize,
    /// Unrounded percentage; use [`DetectionSummary::display_rate`] for output.
    pub detection_rate_percent: f64,
}

impl DetectionSummary {
    pub fn new(mapped_headers: usize, total_headers: usize) -> Self {
        let detection_rate_percent = if total_headers == 0 {
            0.0
        } else {
            mapped_headers as f64 / total_headers as f64 * 100.0
        };
        Self {
            total_headers,
            mapped_headers,
            detection_rate_percent,
        }
    }

    pub fn unmapped_headers(&self) -> usize {
        self.total_headers - self.mapped_headers
    }

    /// Rate rounded to one decimal, e.g. `"66.7%"`.
    pub fn display_rate(&self) -> String {
        format!("{:.1}%", self.detection_rate_percent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_is_kept_unrounded() {
        let summary = DetectionSummary::new(2, 3);
        assert!((summary.detection_rate_percent - 66.666_666).abs() < 1e-4);
        assert_eq!(summary.display_rate(), "66.7%");
        assert_eq!(summary.unmapped_headers(), 1);
    }

    #[test]
    fn empty_header_set_has_zero_rate() {
        let summary = DetectionSummary::new(0, 0);
        assert_eq!(summary.detection_rate_percent, 0.0);
    }
}
