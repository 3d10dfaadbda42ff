use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use ledger_cli::report::{BalanceCheck, DetectReport};
use ledger_map::AmbiguousMatch;
use ledger_model::{ConfidenceLevel, KnowledgeBase, MatchCandidate};
use ledger_train::{HeaderState, TrainingSession};
use ledger_validate::BalanceReport;

pub fn print_fields(kb: &KnowledgeBase) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Field"),
        header_cell("Name"),
        header_cell("Type"),
        header_cell("Active"),
        header_cell("Synonyms"),
        header_cell("ERPs"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 3, CellAlignment::Center);
    align_column(&mut table, 4, CellAlignment::Right);
    for def in kb.definitions() {
        let mut erps: Vec<&str> = def.synonyms.iter().map(|s| s.erp_name.as_str()).collect();
        erps.dedup();
        table.add_row(vec![
            Cell::new(def.id.as_str())
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(&def.name),
            Cell::new(def.data_type.as_str()),
            if def.active {
                Cell::new("✓").fg(Color::Green)
            } else {
                dim_cell("-")
            },
            Cell::new(def.synonyms.len()),
            Cell::new(erps.join(", ")),
        ]);
    }
    println!("{table}");
    println!(
        "Thresholds: min {:.2}, exact {:.2}, partial {:.2}",
        kb.system.min_confidence_threshold,
        kb.system.exact_match_threshold,
        kb.system.partial_match_threshold
    );
}

pub fn print_detection(report: &DetectReport) {
    println!("File: {}", report.file);
    match &report.erp_detection {
        Some(detection) => println!(
            "ERP: {} (score {:.2}, {} matching headers)",
            detection.erp_name, detection.score, detection.match_count
        ),
        None => println!("ERP: {}", report.erp_name),
    }

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Header"),
        header_cell("Field"),
        header_cell("Confidence"),
        header_cell("Kind"),
        header_cell("Matched"),
        header_cell("Alternatives"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    for header in &report.headers {
        let Some(top) = header.top() else {
            table.add_row(vec![
                Cell::new(&header.header),
                dim_cell("unmapped"),
                dim_cell("-"),
                dim_cell("-"),
                dim_cell("-"),
                dim_cell("-"),
            ]);
            continue;
        };
        let alternatives: Vec<String> = header
            .candidates
            .iter()
            .skip(1)
            .take(3)
            .map(|c| format!("{} {:.0}%", c.field_id, c.confidence * 100.0))
            .collect();
        table.add_row(vec![
            Cell::new(&header.header),
            Cell::new(top.field_id.as_str()).add_attribute(Attribute::Bold),
            confidence_cell(top),
            Cell::new(top.match_kind.as_str()),
            Cell::new(matched_label(top)),
            if alternatives.is_empty() {
                dim_cell("-")
            } else {
                Cell::new(alternatives.join(", "))
            },
        ]);
    }
    println!("{table}");
    print_ambiguities(&report.ambiguities);
    println!(
        "Detected {} of {} headers ({})",
        report.summary.mapped_headers,
        report.summary.total_headers,
        report.summary.display_rate()
    );
}

pub fn print_session(file: &str, session: &TrainingSession) {
    println!("File: {file}");
    println!(
        "Mode: {} (threshold {:.2}{}), ERP: {}",
        session.mode,
        session.confidence_threshold,
        if session.batch { ", batch" } else { "" },
        session.erp_name
    );
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Header"),
        header_cell("State"),
        header_cell("Field"),
        header_cell("Confidence"),
        header_cell("Learned"),
        header_cell("Note"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 3, CellAlignment::Right);
    for decision in &session.decisions {
        let learned: Vec<String> = decision
            .learned
            .iter()
            .map(|l| match l.previous_boost {
                Some(prev) => format!("{}:{} {:.2}→{:.2}", l.erp_name, l.field_id, prev, l.confidence_boost),
                None => format!("{}:{} new {:.2}", l.erp_name, l.field_id, l.confidence_boost),
            })
            .collect();
        table.add_row(vec![
            Cell::new(&decision.header),
            state_cell(decision.state()),
            decision
                .field_id
                .map_or_else(|| dim_cell("-"), |f| Cell::new(f.as_str())),
            decision
                .confidence
                .map_or_else(|| dim_cell("-"), |c| Cell::new(format!("{:.1}%", c * 100.0))),
            if learned.is_empty() {
                dim_cell("-")
            } else {
                Cell::new(learned.join("\n"))
            },
            decision
                .note
                .as_deref()
                .map_or_else(|| dim_cell("-"), Cell::new),
        ]);
    }
    println!("{table}");
    println!(
        "Mapped {} of {} headers ({}); learned {}, skipped {}, discarded {}, unmapped {}",
        session.summary.mapped_headers,
        session.summary.total_headers,
        session.summary.display_rate(),
        session.count(HeaderState::Learned),
        session.count(HeaderState::Skipped),
        session.count(HeaderState::Discarded),
        session.count(HeaderState::Unmapped),
    );
    if let Some(report) = &session.balance {
        print_balance_report(report);
    }
}

pub fn print_balance(check: &BalanceCheck) {
    println!("File: {} (ERP: {})", check.file, check.erp_name);
    let columns: Vec<String> = check
        .columns
        .iter()
        .map(|(header, field)| format!("{header} → {field}"))
        .collect();
    println!("Columns: {}", columns.join(", "));
    print_balance_report(&check.report);
}

fn print_balance_report(report: &BalanceReport) {
    let status = if report.is_balanced {
        "balanced"
    } else {
        "NOT balanced"
    };
    println!(
        "Balance: {status}; debit {:.2}, credit {:.2}, difference {:.2}",
        report.total_debit, report.total_credit, report.difference
    );
    println!(
        "Entries: {} of {} balanced ({:.1}%)",
        report.balanced_entries,
        report.entries_count,
        report.balance_rate() * 100.0
    );
    if report.ungrouped_rows > 0 || report.skipped_rows > 0 {
        println!(
            "Rows without entry id: {}, rows without amount: {}",
            report.ungrouped_rows, report.skipped_rows
        );
    }
    if report.unbalanced.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Entry"),
        header_cell("Debit"),
        header_cell("Credit"),
        header_cell("Difference"),
        header_cell("Lines"),
    ]);
    apply_table_style(&mut table);
    for idx in 1..=4 {
        align_column(&mut table, idx, CellAlignment::Right);
    }
    for entry in &report.unbalanced {
        table.add_row(vec![
            Cell::new(&entry.journal_entry_id),
            Cell::new(format!("{:.2}", entry.total_debit)),
            Cell::new(format!("{:.2}", entry.total_credit)),
            Cell::new(format!("{:+.2}", entry.difference))
                .fg(Color::Red)
                .add_attribute(Attribute::Bold),
            Cell::new(entry.line_count),
        ]);
    }
    println!("{table}");
}

fn print_ambiguities(ambiguities: &[AmbiguousMatch]) {
    for found in ambiguities {
        match found {
            AmbiguousMatch::Fields {
                header,
                fields,
                confidence,
            } => {
                let fields: Vec<&str> = fields.iter().map(|f| f.as_str()).collect();
                eprintln!(
                    "warning: '{header}' ties between {} at {:.1}%",
                    fields.join(", "),
                    confidence * 100.0
                );
            }
            AmbiguousMatch::Erps { erps, score } => {
                eprintln!("warning: ERPs tie at score {score:.2}: {}", erps.join(", "));
            }
        }
    }
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(140);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn confidence_cell(candidate: &MatchCandidate) -> Cell {
    let text = format!("{:.1}%", candidate.confidence * 100.0);
    match ConfidenceLevel::categorize(candidate.confidence) {
        ConfidenceLevel::High => Cell::new(text).fg(Color::Green),
        ConfidenceLevel::Medium => Cell::new(text).fg(Color::Yellow),
        ConfidenceLevel::Low => Cell::new(text).fg(Color::Red),
    }
}

fn matched_label(candidate: &MatchCandidate) -> String {
    match &candidate.source_erp {
        Some(erp) => format!("{} ({erp})", candidate.matched_text),
        None => candidate.matched_text.clone(),
    }
}

fn state_cell(state: HeaderState) -> Cell {
    let cell = Cell::new(state.as_str());
    match state {
        HeaderState::Learned => cell.fg(Color::Green).add_attribute(Attribute::Bold),
        HeaderState::Confirmed => cell.fg(Color::Green),
        HeaderState::Skipped | HeaderState::Suggested => cell.fg(Color::Yellow),
        HeaderState::Rejected | HeaderState::Discarded => cell.fg(Color::Red),
        HeaderState::Unmapped => cell.fg(Color::DarkGrey),
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
