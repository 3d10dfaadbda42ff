//! Header text normalization.
//!
//! Two forms are produced from a raw header:
//! - [`normalize_header`]: lowercase, accent-folded, punctuation collapsed to
//!   single spaces (`"Núm. Asiento"` -> `"num asiento"`).
//! - [`header_key`]: the same text with all separators removed
//!   (`"Num_Asiento"` and `"NumAsiento"` both give `"numasiento"`), used for
//!   exact comparison and synonym uniqueness.

/// Normalizes a header for display-level comparison.
pub fn normalize_header(raw: &str) -> String {
    let mut folded = String::with_capacity(raw.len());
    for c in raw.trim().chars() {
        push_folded(&mut folded, c);
    }
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Separator-free comparison key for a header.
pub fn header_key(raw: &str) -> String {
    normalize_header(raw).replace(' ', "")
}

fn push_folded(out: &mut String, c: char) {
    for lower in c.to_lowercase() {
        match lower {
            'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => out.push('a'),
            'é' | 'è' | 'ê' | 'ë' => out.push('e'),
            'í' | 'ì' | 'î' | 'ï' => out.push('i'),
            'ó' | 'ò' | 'ô' | 'ö' | 'õ' | 'ø' => out.push('o'),
            'ú' | 'ù' | 'û' | 'ü' => out.push('u'),
            'ñ' => out.push('n'),
            'ç' => out.push('c'),
            'ß' => out.push_str("ss"),
            // "Nº" / "N°" abbreviations
            'º' | 'ª' | '°' => out.push('o'),
            c if c.is_alphanumeric() => out.push(c),
            _ => out.push(' '),
        }
    }
}
