//! Delimited text input: one header row followed by data rows.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{debug, warn};

/// Delimiters tried when none is given, in tie-break order.
const CANDIDATE_DELIMITERS: [u8; 4] = [b';', b',', b'\t', b'|'];

/// Header row and records of one input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabularFile {
    pub path: PathBuf,
    pub delimiter: u8,
    pub headers: Vec<String>,
    /// Data rows, padded or truncated to the header width.
    pub records: Vec<Vec<String>>,
}

impl TabularFile {
    /// Display name for tables and log lines.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map_or_else(|| self.path.display().to_string(), |n| n.to_string_lossy().into_owned())
    }
}

/// Read a delimited file with a header row.
///
/// Without an explicit `delimiter` the one that splits the header line into
/// the most columns wins (`;` first on ties, the usual choice of Spanish
/// exports). A UTF-8 byte order mark is stripped.
pub fn read_table(path: &Path, delimiter: Option<u8>) -> Result<TabularFile> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let content = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(&bytes);
    if content.iter().all(u8::is_ascii_whitespace) {
        bail!("{} is empty", path.display());
    }
    let delimiter = delimiter.unwrap_or_else(|| sniff_delimiter(content));

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content);

    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("parse header row of {}", path.display()))?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.iter().all(String::is_empty) {
        bail!("{} has an empty header row", path.display());
    }

    let width = headers.len();
    let mut records = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| {
            format!("parse record {} of {}", line + 1, path.display())
        })?;
        if record.len() != width {
            warn!(
                path = %path.display(),
                record = line + 1,
                cells = record.len(),
                expected = width,
                "record width differs from header"
            );
        }
        let mut cells: Vec<String> = record.iter().take(width).map(str::to_string).collect();
        cells.resize(width, String::new());
        records.push(cells);
    }
    debug!(
        path = %path.display(),
        delimiter = %char::from(delimiter).escape_default(),
        columns = width,
        records = records.len(),
        "read input file"
    );

    Ok(TabularFile {
        path: path.to_path_buf(),
        delimiter,
        headers,
        records,
    })
}

fn sniff_delimiter(content: &[u8]) -> u8 {
    let first_line = content.split(|b| *b == b'\n').next().unwrap_or_default();
    let mut best = CANDIDATE_DELIMITERS[0];
    let mut best_count = 0;
    for delimiter in CANDIDATE_DELIMITERS {
        let count = first_line.iter().filter(|b| **b == delimiter).count();
        if count > best_count {
            best = delimiter;
            best_count = count;
        }
    }
    best
}

/// Parse a `--delimiter` value: a single character, or `tab`.
pub fn parse_delimiter(raw: &str) -> std::result::Result<u8, String> {
    match raw {
        "tab" | "\\t" => Ok(b'\t'),
        _ => match raw.as_bytes() {
            [byte] if byte.is_ascii() => Ok(*byte),
            _ => Err(format!("delimiter must be a single ASCII character, got '{raw}'")),
        },
    }
}
