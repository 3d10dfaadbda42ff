//! Terminal confirmation for manual training sessions.

use std::io::{self, BufRead, Write};

use ledger_model::{ConfidenceLevel, FieldId, MatchCandidate};
use ledger_train::{Confirmer, Decision};

/// Candidates listed per prompt.
const SHOWN_CANDIDATES: usize = 5;

/// Asks on a line-oriented terminal.
///
/// Answers: empty or `y` accepts the top candidate, a number picks a listed
/// candidate, a field id maps onto that field, `n` rejects, `s` skips.
/// End of input skips every remaining header.
pub struct ConsoleConfirmer<R, W> {
    input: R,
    output: W,
    exhausted: bool,
}

impl ConsoleConfirmer<io::StdinLock<'static>, io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> ConsoleConfirmer<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            exhausted: false,
        }
    }

    fn ask(&mut self, header: &str, candidates: &[MatchCandidate]) -> io::Result<Decision> {
        writeln!(self.output)?;
        writeln!(self.output, "Header '{header}'")?;
        for (idx, c) in candidates.iter().take(SHOWN_CANDIDATES).enumerate() {
            writeln!(
                self.output,
                "  {}. {:<26} {:>5.1}%  {:<8} {:<7} via '{}'",
                idx + 1,
                c.field_id.as_str(),
                c.confidence * 100.0,
                c.match_kind.as_str(),
                level_label(c.confidence),
                c.matched_text
            )?;
        }
        loop {
            write!(self.output, "[Enter/y] accept 1, [1-9] pick, [field id] correct, [n] reject, [s] skip: ")?;
            self.output.flush()?;
            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                self.exhausted = true;
                writeln!(self.output)?;
                return Ok(Decision::Skip);
            }
            match parse_answer(&line, candidates) {
                Some(decision) => return Ok(decision),
                None => writeln!(self.output, "Unrecognized answer '{}'", line.trim())?,
            }
        }
    }
}

impl<R: BufRead, W: Write> Confirmer for ConsoleConfirmer<R, W> {
    fn confirm(&mut self, header: &str, candidates: &[MatchCandidate]) -> Decision {
        if self.exhausted {
            return Decision::Skip;
        }
        self.ask(header, candidates).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "confirmation prompt failed, skipping remaining headers");
            self.exhausted = true;
            Decision::Skip
        })
    }
}

/// Interpret one answer line; `None` when it is not understood.
pub fn parse_answer(line: &str, candidates: &[MatchCandidate]) -> Option<Decision> {
    let answer = line.trim();
    match answer.to_ascii_lowercase().as_str() {
        "" | "y" | "yes" | "s\u{ed}" => return Some(Decision::Accept),
        "n" | "no" | "r" => return Some(Decision::Reject),
        "s" | "skip" => return Some(Decision::Skip),
        _ => {}
    }
    if let Ok(pick) = answer.parse::<usize>() {
        return pick
            .checked_sub(1)
            .and_then(|idx| candidates.get(idx))
            .map(|c| Decision::Choose(c.field_id));
    }
    answer.parse::<FieldId>().ok().map(Decision::Choose)
}

fn level_label(confidence: f64) -> &'static str {
    match ConfidenceLevel::categorize(confidence) {
        ConfidenceLevel::High => "high",
        ConfidenceLevel::Medium => "medium",
        ConfidenceLevel::Low => "low",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_model::MatchKind;

    fn candidates() -> Vec<MatchCandidate> {
        [FieldId::PostingDate, FieldId::EntryDate]
            .into_iter()
            .enumerate()
            .map(|(idx, field_id)| MatchCandidate {
                header_text: "Fecha".into(),
                field_id,
                confidence: 0.9 - idx as f64 * 0.1,
                match_kind: MatchKind::Partial,
                confidence_boost: 0.0,
                matched_text: field_id.default_display_name().into(),
                source_erp: None,
            })
            .collect()
    }

    #[test]
    fn parses_answers() {
        let c = candidates();
        assert_eq!(parse_answer("\n", &c), Some(Decision::Accept));
        assert_eq!(parse_answer(" Y ", &c), Some(Decision::Accept));
        assert_eq!(parse_answer("n", &c), Some(Decision::Reject));
        assert_eq!(parse_answer("s", &c), Some(Decision::Skip));
        assert_eq!(parse_answer("2", &c), Some(Decision::Choose(FieldId::EntryDate)));
        assert_eq!(parse_answer("9", &c), None);
        assert_eq!(parse_answer("0", &c), None);
        assert_eq!(
            parse_answer("vendor_id", &c),
            Some(Decision::Choose(FieldId::VendorId))
        );
        assert_eq!(parse_answer("maybe", &c), None);
    }

    #[test]
    fn reprompts_then_stops_at_end_of_input() {
        let input = b"what\n2\n".as_slice();
        let mut output = Vec::new();
        let mut confirmer = ConsoleConfirmer::new(input, &mut output);
        let c = candidates();
        assert_eq!(confirmer.confirm("Fecha", &c), Decision::Choose(FieldId::EntryDate));
        assert_eq!(confirmer.confirm("Fecha", &c), Decision::Skip);
        assert_eq!(confirmer.confirm("Fecha", &c), Decision::Skip);
        drop(confirmer);
        let shown = String::from_utf8(output).unwrap();
        assert!(shown.contains("Unrecognized answer 'what'"));
        assert!(shown.contains("posting_date"));
    }
}
