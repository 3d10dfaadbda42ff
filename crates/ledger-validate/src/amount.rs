//! Lenient parsing of monetary cells from accounting exports.

/// Parse an amount cell.
///
/// Accepts Anglo (`1,234.56`) and European (`1.234,56`, `25.000.00`)
/// separators, currency symbols and other decoration, leading or trailing
/// minus signs (`-12.5`, `12.5-`) and parenthesized negatives (`(12.50)`).
/// Returns `None` for empty or digit-free cells.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let text = raw.trim();
    if !text.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let parenthesized = text.contains('(') && text.contains(')');
    let kept: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    let negative = parenthesized || kept.starts_with('-') || kept.ends_with('-');
    let digits = kept.trim_matches('-');

    let normalized = normalize_separators(digits);
    let value: f64 = normalized.parse().ok()?;
    Some(if negative { -value.abs() } else { value })
}

/// Rewrite thousands/decimal separators into a plain `1234.56` form.
fn normalize_separators(s: &str) -> String {
    let last_comma = s.rfind(',');
    let last_dot = s.rfind('.');
    match (last_comma, last_dot) {
        (Some(comma), Some(dot)) if comma > dot => decimal_at(s, comma),
        (Some(_), Some(dot)) => decimal_at(s, dot),
        (Some(comma), None) => {
            // "12,5", "12,50" and "0,125" are decimals; "1,234" groups thousands.
            let tail = s.len() - comma - 1;
            let single = s.matches(',').count() == 1;
            if single && (tail <= 2 || (tail == 3 && !leads_group(&s[..comma]))) {
                decimal_at(s, comma)
            } else {
                s.replace(',', "")
            }
        }
        (None, Some(dot)) => {
            let dots = s.matches('.').count();
            let tail = s.len() - dot - 1;
            if (dots > 1 && tail > 2) || (dots == 1 && tail == 3 && leads_group(&s[..dot])) {
                // "1.234" and "1.234.567" group thousands; "0.125" does not.
                s.replace('.', "")
            } else {
                decimal_at(s, dot)
            }
        }
        (None, None) => s.to_string(),
    }
}

/// Whether `head` can be the leading group of a thousands-grouped number:
/// one to three digits without a leading zero.
fn leads_group(head: &str) -> bool {
    (1..=3).contains(&head.len())
        && head.bytes().all(|b| b.is_ascii_digit())
        && !head.starts_with('0')
}

/// Treat the separator at byte `idx` as the decimal point and drop the others.
fn decimal_at(s: &str, idx: usize) -> String {
    let integer: String = s[..idx].chars().filter(char::is_ascii_digit).collect();
    let fraction: String = s[idx + 1..].chars().filter(char::is_ascii_digit).collect();
    if integer.is_empty() {
        format!("0.{fraction}")
    } else {
        format!("{integer}.{fraction}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(raw: &str, expected: f64) {
        let parsed = parse_amount(raw).unwrap_or_else(|| panic!("{raw} did not parse"));
        assert!((parsed - expected).abs() < 1e-9, "{raw} -> {parsed}, want {expected}");
    }

    #[test]
    fn plain_and_signed() {
        close("1234.56", 1234.56);
        close("-42", -42.0);
        close("42-", -42.0);
        close(" 0 ", 0.0);
    }

    #[test]
    fn anglo_and_european_grouping() {
        close("1,234.56", 1234.56);
        close("1.234,56", 1234.56);
        close("25.000.00", 25000.0);
        close("1.234.567", 1_234_567.0);
        close("1.234", 1234.0);
        close("1,234", 1234.0);
        close("12,5", 12.5);
        close("0.5", 0.5);
    }

    #[test]
    fn three_decimals_after_a_non_group_head() {
        close("0.125", 0.125);
        close("0,125", 0.125);
        close("-0.125", -0.125);
        close("1234.567", 1234.567);
        close("1234,567", 1234.567);
        close("012.500", 12.5);
    }

    #[test]
    fn decorations() {
        close("€ 1.500,00", 1500.0);
        close("$(2,000.10)", -2000.10);
        close("(15)", -15.0);
    }

    #[test]
    fn empty_and_textual_cells() {
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("   "), None);
        assert_eq!(parse_amount("n/a"), None);
        assert_eq!(parse_amount("-"), None);
    }
}
